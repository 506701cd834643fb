use std::collections::BTreeMap;

use corpus_core::TokenRecord;
use thiserror::Error;

/// A tokenization strategy reported that it could not handle a text.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct StrategyError {
    pub message: String,
}

impl StrategyError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Invalid strategy configuration, detected before any row is processed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StrategyConfigError {
    #[error("unknown tokenizer {0:?}")]
    UnknownTokenizer(String),
    #[error("unknown option {key:?} for tokenizer {tokenizer:?}")]
    UnknownOption { tokenizer: String, key: String },
    #[error("invalid value {value:?} for option {key:?}")]
    InvalidValue { key: String, value: String },
    #[error("pos_keep and pos_exclude are both set but share no label; one of them is likely a mistake")]
    PosFilterConflict,
}

/// Opaque keyword configuration forwarded to a tokenizer adapter.
pub type StrategyOptions = BTreeMap<String, String>;

/// Text in, ordered tokens out.
///
/// Implementations return an empty sequence for absent, empty or
/// whitespace-only text, and report malformed input as fewer (or zero)
/// tokens rather than an error. `Err` is reserved for a strategy that
/// genuinely cannot produce a result.
pub trait Tokenizer: Send + Sync {
    fn tokenize(&self, text: Option<&str>) -> Result<Vec<TokenRecord>, StrategyError>;
}

impl<F> Tokenizer for F
where
    F: Fn(Option<&str>) -> Result<Vec<TokenRecord>, StrategyError> + Send + Sync,
{
    fn tokenize(&self, text: Option<&str>) -> Result<Vec<TokenRecord>, StrategyError> {
        self(text)
    }
}

/// Text worth handing to an adapter: `None` for absent or blank input.
pub(crate) fn meaningful_text(text: Option<&str>) -> Option<&str> {
    text.map(str::trim).filter(|s| !s.is_empty())
}
