use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::DocId;

/// Engine-specific token detail. Keys and value shapes depend on the adapter.
pub type Auxiliary = BTreeMap<String, serde_json::Value>;

/// One token produced by a tokenization strategy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TokenRecord {
    pub word: String,
    pub pos: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auxiliary: Option<Auxiliary>,
}

impl TokenRecord {
    pub fn new(word: impl Into<String>, pos: impl Into<String>) -> Self {
        Self {
            word: word.into(),
            pos: pos.into(),
            auxiliary: None,
        }
    }

    pub fn with_auxiliary(mut self, auxiliary: Auxiliary) -> Self {
        self.auxiliary = Some(auxiliary);
        self
    }
}

/// The token sequence of one successfully processed document, as stored in the sink.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentTokens {
    pub doc_id: DocId,
    pub relative_path: String,
    pub tokens: Vec<TokenRecord>,
}

impl DocumentTokens {
    /// Joins the `word` of every token with `sep`.
    pub fn to_text(&self, sep: &str) -> String {
        self.tokens
            .iter()
            .map(|t| t.word.as_str())
            .collect::<Vec<_>>()
            .join(sep)
    }
}
