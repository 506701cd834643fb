use std::sync::atomic::{AtomicUsize, Ordering};

use corpus_engine::{ProgressSink, RunEvent};
use pipeline_logging::{pipeline_debug, pipeline_info};

/// Logs a running tally every `every` finished rows.
pub struct LogProgress {
    every: usize,
    total: AtomicUsize,
    done: AtomicUsize,
    failed: AtomicUsize,
}

impl LogProgress {
    pub fn new(every: usize) -> Self {
        Self {
            every: every.max(1),
            total: AtomicUsize::new(0),
            done: AtomicUsize::new(0),
            failed: AtomicUsize::new(0),
        }
    }

    fn finished(&self) -> usize {
        self.done.load(Ordering::Relaxed) + self.failed.load(Ordering::Relaxed)
    }

    fn tally(&self) {
        let finished = self.finished();
        let total = self.total.load(Ordering::Relaxed);
        if finished % self.every == 0 || finished == total {
            pipeline_info!(
                "{}/{} files processed ({} failed)",
                finished,
                total,
                self.failed.load(Ordering::Relaxed)
            );
        }
    }
}

impl ProgressSink for LogProgress {
    fn emit(&self, event: RunEvent) {
        match event {
            RunEvent::BatchSelected { count } => {
                self.total.store(count, Ordering::Relaxed);
            }
            RunEvent::RowStarted { .. } => {}
            RunEvent::RowDone { .. } => {
                self.done.fetch_add(1, Ordering::Relaxed);
                self.tally();
            }
            RunEvent::RowFailed { .. } => {
                self.failed.fetch_add(1, Ordering::Relaxed);
                self.tally();
            }
            RunEvent::ManifestSaved { processed } => {
                pipeline_debug!("manifest checkpoint after {} files", processed);
            }
        }
    }
}
