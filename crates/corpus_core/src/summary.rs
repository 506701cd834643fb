use crate::{ManifestRow, RowStatus};

/// Aggregate counts over a manifest, for status reporting.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ManifestSummary {
    pub total: usize,
    pub pending: usize,
    pub done: usize,
    pub failed: usize,
    pub total_chars: u64,
    pub total_tokens: u64,
}

impl ManifestSummary {
    pub(crate) fn from_rows(rows: &[ManifestRow]) -> Self {
        let mut summary = Self {
            total: rows.len(),
            ..Self::default()
        };
        for row in rows {
            match row.status {
                RowStatus::Pending => summary.pending += 1,
                RowStatus::Failed => summary.failed += 1,
                RowStatus::Done => {
                    summary.done += 1;
                    summary.total_chars += row.n_chars.unwrap_or(0);
                    summary.total_tokens += row.n_tokens.unwrap_or(0);
                }
            }
        }
        summary
    }

    pub fn remaining(&self) -> usize {
        self.pending + self.failed
    }
}
