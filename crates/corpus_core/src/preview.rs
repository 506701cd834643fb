pub const DEFAULT_PREVIEW_CHARS: usize = 120;

/// Builds the single-line manifest preview: the first `max_chars` characters
/// of `text`, with line breaks escaped.
pub fn build_preview(text: &str, max_chars: usize) -> String {
    let end = text
        .char_indices()
        .nth(max_chars)
        .map(|(idx, _)| idx)
        .unwrap_or(text.len());
    escape_line_breaks(&text[..end])
}

/// Number of Unicode scalar values in `text`.
pub fn char_count(text: &str) -> u64 {
    text.chars().count() as u64
}

fn escape_line_breaks(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            _ => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::{build_preview, char_count};

    #[test]
    fn short_text_kept_as_is() {
        assert_eq!(build_preview("short preview", 120), "short preview");
    }

    #[test]
    fn truncates_on_char_boundaries() {
        assert_eq!(build_preview("犬が歩く", 2), "犬が");
        assert_eq!(char_count("犬が歩く"), 4);
    }

    #[test]
    fn escapes_line_breaks() {
        assert_eq!(build_preview("a\r\nb\nc", 120), "a\\r\\nb\\nc");
    }

    #[test]
    fn zero_length_preview_is_empty() {
        assert_eq!(build_preview("abc", 0), "");
    }
}
