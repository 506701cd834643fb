use chardetng::EncodingDetector;
use encoding_rs::{Encoding, UTF_8};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedText {
    pub text: String,
    pub encoding_label: String,
    pub had_replacements: bool,
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum DecodeError {
    #[error("unknown encoding label {0:?}")]
    UnknownEncoding(String),
    #[error("malformed {encoding} byte sequence")]
    Malformed { encoding: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EncodingChoice {
    Fixed(&'static Encoding),
    /// BOM, then chardetng guess.
    Auto,
}

/// How source file bytes become text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecodePolicy {
    pub encoding: EncodingChoice,
    /// Fail instead of substituting U+FFFD for malformed sequences.
    pub strict: bool,
}

impl Default for DecodePolicy {
    fn default() -> Self {
        Self {
            encoding: EncodingChoice::Fixed(UTF_8),
            strict: false,
        }
    }
}

impl DecodePolicy {
    /// Parses an encoding label such as `utf-8`, `shift_jis` or `auto`.
    pub fn from_label(label: &str, strict: bool) -> Result<Self, DecodeError> {
        let encoding = if label.trim().eq_ignore_ascii_case("auto") {
            EncodingChoice::Auto
        } else {
            let enc = Encoding::for_label(label.trim().as_bytes())
                .ok_or_else(|| DecodeError::UnknownEncoding(label.to_string()))?;
            EncodingChoice::Fixed(enc)
        };
        Ok(Self { encoding, strict })
    }
}

/// Decode raw file bytes using: BOM -> configured encoding (or chardetng guess).
pub fn decode_text(bytes: &[u8], policy: &DecodePolicy) -> Result<DecodedText, DecodeError> {
    let encoding = match Encoding::for_bom(bytes) {
        Some((enc, _)) => enc,
        None => match policy.encoding {
            EncodingChoice::Fixed(enc) => enc,
            EncodingChoice::Auto => {
                let mut detector = EncodingDetector::new();
                detector.feed(bytes, true);
                detector.guess(None, true)
            }
        },
    };

    let (text, used, had_errors) = encoding.decode(bytes);
    if had_errors && policy.strict {
        return Err(DecodeError::Malformed {
            encoding: used.name().to_string(),
        });
    }
    Ok(DecodedText {
        text: text.into_owned(),
        encoding_label: used.name().to_string(),
        had_replacements: had_errors,
    })
}
