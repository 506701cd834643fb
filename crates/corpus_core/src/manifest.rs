use std::collections::HashSet;

use thiserror::Error;

use crate::{DocId, ManifestRow, ManifestSummary, RowStatus, RowSuccess};

/// Rows cannot form a valid manifest.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ManifestError {
    #[error("duplicate doc_id {0}")]
    DuplicateDocId(DocId),
    #[error("duplicate relative_path {0:?}")]
    DuplicatePath(String),
    #[error("no doc_id left above {last} for {wanted} new rows")]
    IdsExhausted { last: DocId, wanted: usize },
}

/// A status change the manifest refused to apply.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransitionError {
    #[error("no row with doc_id {0}")]
    UnknownDoc(DocId),
    #[error("row {0} is already done")]
    AlreadyDone(DocId),
}

/// In-memory ledger of per-file processing state, ordered by `doc_id`.
///
/// Rows are only ever added (by [`Manifest::bootstrap`]) or transitioned
/// (by [`Manifest::mark_done`] / [`Manifest::mark_failed`]); a `done` row is
/// frozen.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Manifest {
    rows: Vec<ManifestRow>,
    paths: HashSet<String>,
}

impl Manifest {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuilds a manifest from persisted rows, in any order.
    pub fn from_rows(mut rows: Vec<ManifestRow>) -> Result<Self, ManifestError> {
        rows.sort_by_key(|row| row.doc_id);
        let mut paths = HashSet::with_capacity(rows.len());
        for pair in rows.windows(2) {
            if pair[0].doc_id == pair[1].doc_id {
                return Err(ManifestError::DuplicateDocId(pair[0].doc_id));
            }
        }
        for row in &rows {
            if !paths.insert(row.relative_path.clone()) {
                return Err(ManifestError::DuplicatePath(row.relative_path.clone()));
            }
        }
        Ok(Self { rows, paths })
    }

    pub fn rows(&self) -> &[ManifestRow] {
        &self.rows
    }

    pub fn into_rows(self) -> Vec<ManifestRow> {
        self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn get(&self, doc_id: DocId) -> Option<&ManifestRow> {
        self.position(doc_id).map(|idx| &self.rows[idx])
    }

    pub fn contains_path(&self, relative_path: &str) -> bool {
        self.paths.contains(relative_path)
    }

    /// Appends a pending row for every path not yet tracked, in the given
    /// order. Existing rows are never removed or renumbered. Returns the
    /// number of rows added.
    ///
    /// Nothing is added when the new ids would not fit in a `DocId`.
    pub fn bootstrap<I, S>(&mut self, paths: I, updated_at: &str) -> Result<usize, ManifestError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut fresh: Vec<String> = Vec::new();
        let mut fresh_set = HashSet::new();
        for path in paths {
            let path = path.into();
            if self.paths.contains(&path) || !fresh_set.insert(path.clone()) {
                continue;
            }
            fresh.push(path);
        }
        if fresh.is_empty() {
            return Ok(0);
        }

        let last = self.rows.last().map(|row| row.doc_id);
        let exhausted = || ManifestError::IdsExhausted {
            last: last.unwrap_or(0),
            wanted: fresh.len(),
        };
        let first = match last {
            Some(id) => id.checked_add(1).ok_or_else(exhausted)?,
            None => 1,
        };
        first
            .checked_add(fresh.len() as u64 - 1)
            .ok_or_else(exhausted)?;

        let added = fresh.len();
        for (offset, path) in fresh.into_iter().enumerate() {
            let doc_id = first + offset as u64;
            self.paths.insert(path.clone());
            self.rows.push(ManifestRow::pending(doc_id, path, updated_at));
        }
        Ok(added)
    }

    pub fn mark_done(
        &mut self,
        doc_id: DocId,
        success: RowSuccess,
        updated_at: &str,
    ) -> Result<(), TransitionError> {
        let row = self.open_row_mut(doc_id)?;
        row.status = RowStatus::Done;
        row.error = None;
        row.n_chars = Some(success.n_chars);
        row.n_tokens = Some(success.n_tokens);
        row.preview = success.preview;
        row.updated_at = Some(updated_at.to_string());
        Ok(())
    }

    pub fn mark_failed(
        &mut self,
        doc_id: DocId,
        error: impl Into<String>,
        updated_at: &str,
    ) -> Result<(), TransitionError> {
        let row = self.open_row_mut(doc_id)?;
        row.status = RowStatus::Failed;
        row.error = Some(error.into());
        row.updated_at = Some(updated_at.to_string());
        Ok(())
    }

    /// Rows still needing work (`pending` or `failed`), ascending by `doc_id`.
    pub fn select_pending(&self) -> Vec<ManifestRow> {
        self.select_with(&[RowStatus::Pending, RowStatus::Failed])
    }

    /// Rows whose status is in `statuses`, ascending by `doc_id`. `done` rows
    /// are never selected.
    pub fn select_with(&self, statuses: &[RowStatus]) -> Vec<ManifestRow> {
        self.rows
            .iter()
            .filter(|row| !row.is_done() && statuses.contains(&row.status))
            .cloned()
            .collect()
    }

    pub fn is_complete(&self) -> bool {
        self.rows.iter().all(ManifestRow::is_done)
    }

    pub fn summary(&self) -> ManifestSummary {
        ManifestSummary::from_rows(&self.rows)
    }

    fn position(&self, doc_id: DocId) -> Option<usize> {
        self.rows.binary_search_by_key(&doc_id, |row| row.doc_id).ok()
    }

    fn open_row_mut(&mut self, doc_id: DocId) -> Result<&mut ManifestRow, TransitionError> {
        let idx = self
            .position(doc_id)
            .ok_or(TransitionError::UnknownDoc(doc_id))?;
        let row = &mut self.rows[idx];
        if row.is_done() {
            return Err(TransitionError::AlreadyDone(doc_id));
        }
        Ok(row)
    }
}
