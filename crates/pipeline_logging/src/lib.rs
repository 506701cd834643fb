#![deny(missing_docs)]
//! Shared logging utilities for the corpus pipeline workspace.
//!
//! This crate provides the `pipeline_*` logging macros used across the
//! codebase, a per-thread document context that those macros prefix onto
//! every message, and a minimal test initializer for the global logger.

use std::cell::Cell;

thread_local! {
    /// Document currently being processed on this thread, if any.
    static CURRENT_DOC: Cell<Option<u64>> = const { Cell::new(None) };
}

/// Sets the document id reported by the logging macros on this thread.
pub fn set_current_doc(doc_id: Option<u64>) {
    CURRENT_DOC.with(|v| v.set(doc_id));
}

/// Returns the document id reported by the logging macros on this thread.
pub fn current_doc() -> Option<u64> {
    CURRENT_DOC.with(|v| v.get())
}

/// Message prefix for the current document, e.g. `"[doc 12] "`.
///
/// Empty when no document is in progress.
pub fn doc_prefix() -> String {
    match current_doc() {
        Some(doc_id) => format!("[doc {doc_id}] "),
        None => String::new(),
    }
}

/// Scoped document context: sets the current document on creation and
/// restores the previous one when dropped.
#[must_use = "the context is cleared as soon as the guard is dropped"]
pub struct DocContext {
    previous: Option<u64>,
}

impl DocContext {
    /// Enters the context of `doc_id` until the returned guard is dropped.
    pub fn enter(doc_id: u64) -> Self {
        let previous = current_doc();
        set_current_doc(Some(doc_id));
        Self { previous }
    }
}

impl Drop for DocContext {
    fn drop(&mut self) {
        set_current_doc(self.previous);
    }
}

/// Logs a trace-level message using the global logging facade.
#[macro_export]
macro_rules! pipeline_trace {
    ($($arg:tt)*) => {{
        log::trace!("{}{}", $crate::doc_prefix(), format_args!($($arg)*));
    }};
}

/// Logs an info-level message using the global logging facade.
#[macro_export]
macro_rules! pipeline_info {
    ($($arg:tt)*) => {{
        log::info!("{}{}", $crate::doc_prefix(), format_args!($($arg)*));
    }};
}

/// Logs a debug-level message using the global logging facade.
#[macro_export]
macro_rules! pipeline_debug {
    ($($arg:tt)*) => {{
        log::debug!("{}{}", $crate::doc_prefix(), format_args!($($arg)*));
    }};
}

/// Logs a warn-level message using the global logging facade.
#[macro_export]
macro_rules! pipeline_warn {
    ($($arg:tt)*) => {{
        log::warn!("{}{}", $crate::doc_prefix(), format_args!($($arg)*));
    }};
}

/// Logs an error-level message using the global logging facade.
#[macro_export]
macro_rules! pipeline_error {
    ($($arg:tt)*) => {{
        log::error!("{}{}", $crate::doc_prefix(), format_args!($($arg)*));
    }};
}

/// Initializes a simple terminal logger for use in unit tests.
///
/// This safely no-ops if another logger has already been initialized.
pub fn initialize_for_tests() {
    use simplelog::{ColorChoice, CombinedLogger, Config, TermLogger, TerminalMode};

    // Use debug level in debug builds, info in release builds.
    let level = if cfg!(debug_assertions) {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Info
    };

    // Ignore the error if a logger was already set by another test.
    let _ = CombinedLogger::init(vec![TermLogger::new(
        level,
        Config::default(),
        TerminalMode::Mixed,
        ColorChoice::Auto,
    )]);
}
