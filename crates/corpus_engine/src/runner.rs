//! The batch runner: drives every not-yet-done manifest row through
//! read -> decode -> tokenize -> sink append -> manifest update.
//!
//! Row-level failures are recorded on the row and never abort the batch.
//! Configuration and persistence failures abort it.

use std::any::Any;
use std::fs;
use std::io;
use std::panic::{self, AssertUnwindSafe};

use corpus_core::{build_preview, char_count, DocumentTokens, ManifestRow, RowSuccess, TokenRecord};
use pipeline_logging::{pipeline_debug, pipeline_info, pipeline_warn, DocContext};
use thiserror::Error;

use crate::decode::{decode_text, DecodeError};
use crate::discover::{discover_files, is_inside_root, validate_root, DiscoverError};
use crate::manifest_store::{load_manifest, save_manifest, ManifestStoreError};
use crate::sink::{JsonlSink, SinkError};
use crate::strategy::{StrategyError, Tokenizer};
use crate::types::{NoopProgress, ProgressSink, RunConfig, RunEvent, RunReport};

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("invalid configuration: {0}")]
    Config(String),
    #[error(transparent)]
    Discover(#[from] DiscoverError),
    #[error(transparent)]
    Manifest(#[from] ManifestStoreError),
    #[error(transparent)]
    Sink(#[from] SinkError),
}

/// Why a single row failed; its display text is stored on the row.
#[derive(Debug, Error)]
enum RowFailure {
    #[error("read error: {0}")]
    Read(#[from] io::Error),
    #[error("read error: {0:?} is not a path inside the root")]
    OutsideRoot(String),
    #[error("decode error: {0}")]
    Decode(#[from] DecodeError),
    #[error("tokenizer error: {0}")]
    Strategy(#[from] StrategyError),
    #[error("tokenizer panicked: {0}")]
    Panic(String),
}

pub struct BatchRunner<'a> {
    config: &'a RunConfig,
    tokenizer: &'a dyn Tokenizer,
    progress: &'a dyn ProgressSink,
}

impl<'a> BatchRunner<'a> {
    pub fn new(config: &'a RunConfig, tokenizer: &'a dyn Tokenizer) -> Self {
        Self {
            config,
            tokenizer,
            progress: &NoopProgress,
        }
    }

    pub fn with_progress(mut self, progress: &'a dyn ProgressSink) -> Self {
        self.progress = progress;
        self
    }

    /// Processes every selectable row once and returns the final manifest.
    pub fn run(&self) -> Result<RunReport, PipelineError> {
        let config = self.config;
        if config.save_every == 0 {
            return Err(PipelineError::Config("save_every must be at least 1".into()));
        }
        validate_root(&config.root)?;

        let manifest_existed = config.manifest_path.exists();
        let mut manifest = load_manifest(&config.manifest_path)?;
        let mut discovered = 0;
        if !manifest_existed || config.rediscover {
            let paths = discover_files(&config.root, &config.extensions)?;
            discovered = manifest
                .bootstrap(paths, &(config.clock)())
                .map_err(ManifestStoreError::Invalid)?;
            if !manifest_existed || discovered > 0 {
                save_manifest(&manifest, &config.manifest_path)?;
            }
            pipeline_info!(
                "Discovery added {} rows to {:?} ({} total)",
                discovered,
                config.manifest_path,
                manifest.len()
            );
        }

        let selected = manifest.select_with(&config.statuses_to_process());
        pipeline_info!(
            "Processing {} of {} rows from {:?}",
            selected.len(),
            manifest.len(),
            config.root
        );
        self.progress.emit(RunEvent::BatchSelected {
            count: selected.len(),
        });

        let mut sink = JsonlSink::open(&config.output_path, config.durable_appends)?;
        let mut processed = 0;
        let mut succeeded = 0;
        let mut failed = 0;

        for row in &selected {
            let _ctx = DocContext::enter(row.doc_id);
            self.progress.emit(RunEvent::RowStarted {
                doc_id: row.doc_id,
                relative_path: row.relative_path.clone(),
            });

            match self.process_row(row) {
                Ok((doc, success)) => {
                    sink.append(&doc)?;
                    let n_tokens = success.n_tokens;
                    if let Err(err) = manifest.mark_done(row.doc_id, success, &(config.clock)()) {
                        pipeline_warn!("Could not mark row done: {}", err);
                    }
                    pipeline_debug!("{} -> {} tokens", row.relative_path, n_tokens);
                    succeeded += 1;
                    self.progress.emit(RunEvent::RowDone {
                        doc_id: row.doc_id,
                        n_tokens,
                    });
                }
                Err(failure) => {
                    let error = failure.to_string();
                    pipeline_warn!("{} failed: {}", row.relative_path, error);
                    if let Err(err) = manifest.mark_failed(row.doc_id, &error, &(config.clock)()) {
                        pipeline_warn!("Could not mark row failed: {}", err);
                    }
                    failed += 1;
                    self.progress.emit(RunEvent::RowFailed {
                        doc_id: row.doc_id,
                        error,
                    });
                }
            }

            processed += 1;
            if processed % config.save_every == 0 {
                save_manifest(&manifest, &config.manifest_path)?;
                self.progress.emit(RunEvent::ManifestSaved { processed });
            }
        }

        save_manifest(&manifest, &config.manifest_path)?;
        let summary = manifest.summary();
        pipeline_info!(
            "Batch finished: {} succeeded, {} failed; manifest has {} done, {} remaining",
            succeeded,
            failed,
            summary.done,
            summary.remaining()
        );

        Ok(RunReport {
            manifest,
            bootstrapped: !manifest_existed,
            discovered,
            selected: selected.len(),
            succeeded,
            failed,
        })
    }

    fn process_row(&self, row: &ManifestRow) -> Result<(DocumentTokens, RowSuccess), RowFailure> {
        if !is_inside_root(&row.relative_path) {
            return Err(RowFailure::OutsideRoot(row.relative_path.clone()));
        }
        let path = self.config.root.join(&row.relative_path);
        let bytes = fs::read(&path)?;
        let decoded = decode_text(&bytes, &self.config.decode)?;
        if decoded.had_replacements {
            pipeline_debug!(
                "{} contained malformed {} sequences; replaced",
                row.relative_path,
                decoded.encoding_label
            );
        }

        let tokens = self.invoke_tokenizer(&decoded.text)?;
        let success = RowSuccess {
            n_chars: char_count(&decoded.text),
            n_tokens: tokens.len() as u64,
            preview: build_preview(&decoded.text, self.config.preview_chars),
        };
        let doc = DocumentTokens {
            doc_id: row.doc_id,
            relative_path: row.relative_path.clone(),
            tokens,
        };
        Ok((doc, success))
    }

    fn invoke_tokenizer(&self, text: &str) -> Result<Vec<TokenRecord>, RowFailure> {
        let tokenizer = self.tokenizer;
        match panic::catch_unwind(AssertUnwindSafe(|| tokenizer.tokenize(Some(text)))) {
            Ok(result) => Ok(result?),
            Err(payload) => Err(RowFailure::Panic(panic_message(payload.as_ref()))),
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(msg) = payload.downcast_ref::<&str>() {
        (*msg).to_string()
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg.clone()
    } else {
        "unknown panic payload".to_string()
    }
}
