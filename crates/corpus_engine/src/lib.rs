//! Corpus engine: discovery, manifest and sink persistence, tokenizer
//! adapters, and the resumable batch runner.
mod decode;
mod discover;
mod manifest_store;
mod persist;
mod runner;
mod sink;
mod strategy;
mod tokenizers;
mod types;

pub use decode::{decode_text, DecodeError, DecodePolicy, DecodedText, EncodingChoice};
pub use discover::{
    discover_files, is_inside_root, normalize_relative, validate_root, DiscoverError,
    ExtensionFilter,
};
pub use manifest_store::{load_manifest, save_manifest, ManifestStoreError, MANIFEST_COLUMNS};
pub use persist::{ensure_output_dir, AtomicFileWriter, PersistError};
pub use runner::{BatchRunner, PipelineError};
pub use sink::{latest_by_doc, read_sink, JsonlSink, SinkContents, SinkError};
pub use strategy::{StrategyConfigError, StrategyError, StrategyOptions, Tokenizer};
pub use tokenizers::{
    build_tokenizer, CharClass, FilteredTokenizer, ScriptTokenizer, WhitespaceTokenizer, WordForm,
    TOKENIZER_NAMES,
};
pub use types::{utc_clock, Clock, NoopProgress, ProgressSink, RunConfig, RunEvent, RunReport};
