use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use corpus_core::{DocId, Manifest, RowStatus};

use crate::decode::DecodePolicy;
use crate::discover::ExtensionFilter;

/// Source of the `updated_at` timestamps written to the manifest.
pub type Clock = Arc<dyn Fn() -> String + Send + Sync>;

pub fn utc_clock() -> Clock {
    Arc::new(|| chrono::Utc::now().to_rfc3339())
}

/// Everything one batch invocation needs besides the tokenizer.
#[derive(Clone)]
pub struct RunConfig {
    pub root: PathBuf,
    pub manifest_path: PathBuf,
    pub output_path: PathBuf,
    pub extensions: ExtensionFilter,
    /// Save the manifest after every `save_every` processed rows. Must be >= 1.
    pub save_every: usize,
    pub preview_chars: usize,
    pub decode: DecodePolicy,
    /// Select `failed` rows as well as `pending` ones.
    pub retry_failed: bool,
    /// Run discovery against an existing manifest and append new files.
    pub rediscover: bool,
    /// `sync_data` after every sink append.
    pub durable_appends: bool,
    pub clock: Clock,
}

impl RunConfig {
    pub fn new(
        root: impl Into<PathBuf>,
        manifest_path: impl Into<PathBuf>,
        output_path: impl Into<PathBuf>,
    ) -> Self {
        Self {
            root: root.into(),
            manifest_path: manifest_path.into(),
            output_path: output_path.into(),
            extensions: ExtensionFilter::default(),
            save_every: 1,
            preview_chars: corpus_core::DEFAULT_PREVIEW_CHARS,
            decode: DecodePolicy::default(),
            retry_failed: true,
            rediscover: false,
            durable_appends: false,
            clock: utc_clock(),
        }
    }

    pub fn statuses_to_process(&self) -> Vec<RowStatus> {
        if self.retry_failed {
            vec![RowStatus::Pending, RowStatus::Failed]
        } else {
            vec![RowStatus::Pending]
        }
    }
}

impl fmt::Debug for RunConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RunConfig")
            .field("root", &self.root)
            .field("manifest_path", &self.manifest_path)
            .field("output_path", &self.output_path)
            .field("extensions", &self.extensions)
            .field("save_every", &self.save_every)
            .field("preview_chars", &self.preview_chars)
            .field("decode", &self.decode)
            .field("retry_failed", &self.retry_failed)
            .field("rediscover", &self.rediscover)
            .field("durable_appends", &self.durable_appends)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunEvent {
    /// Emitted once, before the first row, with the number of rows to process.
    BatchSelected { count: usize },
    RowStarted { doc_id: DocId, relative_path: String },
    RowDone { doc_id: DocId, n_tokens: u64 },
    RowFailed { doc_id: DocId, error: String },
    ManifestSaved { processed: usize },
}

pub trait ProgressSink: Send + Sync {
    fn emit(&self, event: RunEvent);
}

#[derive(Debug, Default, Clone, Copy)]
pub struct NoopProgress;

impl ProgressSink for NoopProgress {
    fn emit(&self, _event: RunEvent) {}
}

/// Outcome of one batch invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunReport {
    pub manifest: Manifest,
    /// The manifest was created by discovery during this run.
    pub bootstrapped: bool,
    /// Rows added by discovery during this run.
    pub discovered: usize,
    pub selected: usize,
    pub succeeded: usize,
    pub failed: usize,
}
