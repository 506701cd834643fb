use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

pub type DocId = u64;

/// Processing state of one tracked file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RowStatus {
    #[default]
    Pending,
    Done,
    Failed,
}

impl RowStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            RowStatus::Pending => "pending",
            RowStatus::Done => "done",
            RowStatus::Failed => "failed",
        }
    }
}

impl fmt::Display for RowStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RowStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "pending" => Ok(RowStatus::Pending),
            "done" => Ok(RowStatus::Done),
            "failed" => Ok(RowStatus::Failed),
            other => Err(format!("unknown row status {other:?}")),
        }
    }
}

/// One tracked file in the manifest.
///
/// Field order matches the persisted column order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManifestRow {
    pub doc_id: DocId,
    pub relative_path: String,
    pub status: RowStatus,
    pub error: Option<String>,
    pub n_chars: Option<u64>,
    pub n_tokens: Option<u64>,
    #[serde(default)]
    pub preview: String,
    #[serde(default)]
    pub updated_at: Option<String>,
}

impl ManifestRow {
    pub fn pending(doc_id: DocId, relative_path: impl Into<String>, updated_at: &str) -> Self {
        Self {
            doc_id,
            relative_path: relative_path.into(),
            status: RowStatus::Pending,
            error: None,
            n_chars: None,
            n_tokens: None,
            preview: String::new(),
            updated_at: Some(updated_at.to_string()).filter(|s| !s.is_empty()),
        }
    }

    pub fn is_done(&self) -> bool {
        self.status == RowStatus::Done
    }
}

/// Result metadata recorded when a row completes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RowSuccess {
    pub n_chars: u64,
    pub n_tokens: u64,
    pub preview: String,
}
