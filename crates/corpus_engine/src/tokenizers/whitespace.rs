use corpus_core::TokenRecord;

use super::{is_noise, token_auxiliary, WordForm};
use crate::strategy::{meaningful_text, StrategyError, Tokenizer};

/// Splits on Unicode whitespace and trims surrounding punctuation.
///
/// POS is `numeral`, `symbol` (punctuation-only chunks) or `word`.
#[derive(Debug, Default, Clone, Copy)]
pub struct WhitespaceTokenizer {
    word_form: WordForm,
    include_auxiliary: bool,
}

impl WhitespaceTokenizer {
    pub fn new(word_form: WordForm) -> Self {
        Self {
            word_form,
            include_auxiliary: false,
        }
    }

    pub fn with_auxiliary(mut self, include: bool) -> Self {
        self.include_auxiliary = include;
        self
    }

    fn record(&self, surface: &str, pos: &str) -> TokenRecord {
        let record = TokenRecord::new(self.word_form.apply(surface), pos);
        if self.include_auxiliary {
            record.with_auxiliary(token_auxiliary(surface, pos))
        } else {
            record
        }
    }
}

impl Tokenizer for WhitespaceTokenizer {
    fn tokenize(&self, text: Option<&str>) -> Result<Vec<TokenRecord>, StrategyError> {
        let Some(text) = meaningful_text(text) else {
            return Ok(Vec::new());
        };

        let mut tokens = Vec::new();
        for chunk in text.split_whitespace() {
            let cleaned: String = chunk.chars().filter(|c| !is_noise(*c)).collect();
            if cleaned.is_empty() {
                continue;
            }
            let core = cleaned.trim_matches(|c: char| !c.is_alphanumeric());
            if core.is_empty() {
                tokens.push(self.record(&cleaned, "symbol"));
            } else if core.chars().all(char::is_numeric) {
                tokens.push(self.record(core, "numeral"));
            } else {
                tokens.push(self.record(core, "word"));
            }
        }
        Ok(tokens)
    }
}
