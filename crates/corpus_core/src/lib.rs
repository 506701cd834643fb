//! Corpus core: pure manifest state machine and token data model.
mod manifest;
mod preview;
mod row;
mod summary;
mod token;

pub use manifest::{Manifest, ManifestError, TransitionError};
pub use preview::{build_preview, char_count, DEFAULT_PREVIEW_CHARS};
pub use row::{DocId, ManifestRow, RowStatus, RowSuccess};
pub use summary::ManifestSummary;
pub use token::{Auxiliary, DocumentTokens, TokenRecord};
