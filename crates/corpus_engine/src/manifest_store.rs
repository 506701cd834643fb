//! CSV persistence for the manifest.
//!
//! Saving goes through [`AtomicFileWriter`], so an interrupted save leaves
//! the previous snapshot intact.

use std::fs::File;
use std::io;
use std::path::{Path, PathBuf};

use corpus_core::{Manifest, ManifestError, ManifestRow};
use pipeline_logging::pipeline_debug;
use thiserror::Error;

use crate::persist::{AtomicFileWriter, PersistError};

/// Persisted column order.
pub const MANIFEST_COLUMNS: [&str; 8] = [
    "doc_id",
    "relative_path",
    "status",
    "error",
    "n_chars",
    "n_tokens",
    "preview",
    "updated_at",
];

const REQUIRED_COLUMNS: [&str; 3] = ["doc_id", "relative_path", "status"];

#[derive(Debug, Error)]
pub enum ManifestStoreError {
    #[error("failed to read manifest {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("manifest csv error: {0}")]
    Csv(#[from] csv::Error),
    #[error("manifest is missing columns: {0:?}")]
    MissingColumns(Vec<String>),
    #[error("invalid manifest: {0}")]
    Invalid(#[from] ManifestError),
    #[error("manifest path has no file name: {0}")]
    InvalidPath(PathBuf),
    #[error("failed to write manifest: {0}")]
    Persist(#[from] PersistError),
}

/// Loads the manifest at `path`. A missing file is an empty manifest.
pub fn load_manifest(path: &Path) -> Result<Manifest, ManifestStoreError> {
    let file = match File::open(path) {
        Ok(file) => file,
        Err(err) if err.kind() == io::ErrorKind::NotFound => {
            pipeline_debug!("No manifest at {:?}; starting empty", path);
            return Ok(Manifest::new());
        }
        Err(source) => {
            return Err(ManifestStoreError::Read {
                path: path.to_path_buf(),
                source,
            });
        }
    };

    let mut reader = csv::ReaderBuilder::new().has_headers(true).from_reader(file);
    let headers = reader.headers()?.clone();
    let missing: Vec<String> = REQUIRED_COLUMNS
        .iter()
        .filter(|col| !headers.iter().any(|h| h.trim() == **col))
        .map(|col| col.to_string())
        .collect();
    if !missing.is_empty() {
        return Err(ManifestStoreError::MissingColumns(missing));
    }

    let rows = reader
        .deserialize::<ManifestRow>()
        .collect::<Result<Vec<_>, _>>()?;
    let manifest = Manifest::from_rows(rows)?;
    pipeline_debug!("Loaded manifest {:?} with {} rows", path, manifest.len());
    Ok(manifest)
}

/// Writes a complete snapshot of `manifest` to `path`, replacing the
/// previous one atomically.
pub fn save_manifest(manifest: &Manifest, path: &Path) -> Result<(), ManifestStoreError> {
    let filename = path
        .file_name()
        .and_then(|name| name.to_str())
        .ok_or_else(|| ManifestStoreError::InvalidPath(path.to_path_buf()))?;

    let content = encode_manifest(manifest)?;
    AtomicFileWriter::for_target(path).write(filename, &content)?;
    Ok(())
}

fn encode_manifest(manifest: &Manifest) -> Result<Vec<u8>, ManifestStoreError> {
    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(Vec::new());
    writer.write_record(MANIFEST_COLUMNS)?;
    for row in manifest.rows() {
        writer.serialize(row)?;
    }
    writer.into_inner().map_err(|err| {
        let io_err = io::Error::new(err.error().kind(), err.error().to_string());
        ManifestStoreError::Csv(csv::Error::from(io_err))
    })
}
