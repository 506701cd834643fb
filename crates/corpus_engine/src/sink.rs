//! Append-only JSON Lines output: one [`DocumentTokens`] record per line.
//!
//! Complete records are never rewritten. An incomplete trailing line left by
//! a crash is cut off when the sink is reopened for appending, and skipped
//! by [`read_sink`].

use std::collections::BTreeMap;
use std::fs::{File, OpenOptions};
use std::io::{self, BufRead, BufReader, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use corpus_core::{DocId, DocumentTokens};
use pipeline_logging::{pipeline_debug, pipeline_warn};
use thiserror::Error;

use crate::persist::{ensure_output_dir, parent_dir, PersistError};

const TAIL_SCAN_CHUNK: u64 = 8 * 1024;

#[derive(Debug, Error)]
pub enum SinkError {
    #[error("sink io error: {0}")]
    Io(#[from] io::Error),
    #[error("failed to encode sink record: {0}")]
    Json(#[from] serde_json::Error),
    #[error("sink line {line} is corrupt: {message}")]
    Corrupt { line: usize, message: String },
    #[error("sink directory unavailable: {0}")]
    Persist(#[from] PersistError),
}

pub struct JsonlSink {
    file: File,
    path: PathBuf,
    durable: bool,
    appended: usize,
}

impl JsonlSink {
    /// Opens `path` for appending, creating it and its parent directories.
    ///
    /// With `durable`, every append is followed by `sync_data`.
    pub fn open(path: &Path, durable: bool) -> Result<Self, SinkError> {
        ensure_output_dir(&parent_dir(path))?;
        if let Some(removed) = repair_torn_tail(path)? {
            pipeline_warn!(
                "Discarded {} bytes of incomplete trailing record in {:?}",
                removed,
                path
            );
        }
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self {
            file,
            path: path.to_path_buf(),
            durable,
            appended: 0,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Number of records appended through this handle.
    pub fn appended(&self) -> usize {
        self.appended
    }

    pub fn append(&mut self, doc: &DocumentTokens) -> Result<(), SinkError> {
        let mut line = serde_json::to_string(doc)?;
        line.push('\n');
        self.file.write_all(line.as_bytes())?;
        self.file.flush()?;
        if self.durable {
            self.file.sync_data()?;
        }
        self.appended += 1;
        Ok(())
    }
}

/// Truncates `path` back to its last newline if it ends mid-record.
/// Returns the number of bytes removed, `None` when nothing was cut.
fn repair_torn_tail(path: &Path) -> io::Result<Option<u64>> {
    let mut file = match OpenOptions::new().read(true).write(true).open(path) {
        Ok(file) => file,
        Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(None),
        Err(err) => return Err(err),
    };
    let len = file.metadata()?.len();
    if len == 0 {
        return Ok(None);
    }

    let mut end = len;
    let mut buf = vec![0u8; TAIL_SCAN_CHUNK as usize];
    let keep = loop {
        let start = end.saturating_sub(TAIL_SCAN_CHUNK);
        let chunk = &mut buf[..(end - start) as usize];
        file.seek(SeekFrom::Start(start))?;
        file.read_exact(chunk)?;
        if end == len && chunk.last() == Some(&b'\n') {
            return Ok(None);
        }
        if let Some(pos) = chunk.iter().rposition(|b| *b == b'\n') {
            break start + pos as u64 + 1;
        }
        if start == 0 {
            break 0;
        }
        end = start;
    };

    file.set_len(keep)?;
    file.sync_all()?;
    Ok(Some(len - keep))
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct SinkContents {
    pub records: Vec<DocumentTokens>,
    /// A malformed final line was skipped.
    pub discarded_tail: bool,
}

/// Reads every record in the sink. A missing file reads as empty.
///
/// Only the final line may be malformed; a malformed line followed by more
/// content is reported as [`SinkError::Corrupt`].
pub fn read_sink(path: &Path) -> Result<SinkContents, SinkError> {
    let file = match File::open(path) {
        Ok(file) => file,
        Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(SinkContents::default()),
        Err(err) => return Err(err.into()),
    };

    let mut contents = SinkContents::default();
    let mut malformed: Option<(usize, String)> = None;
    for (idx, line) in BufReader::new(file).split(b'\n').enumerate() {
        let line = line?;
        if line.iter().all(u8::is_ascii_whitespace) {
            continue;
        }
        if let Some((line, message)) = malformed.take() {
            return Err(SinkError::Corrupt { line, message });
        }
        match serde_json::from_slice::<DocumentTokens>(&line) {
            Ok(doc) => contents.records.push(doc),
            Err(err) => malformed = Some((idx + 1, err.to_string())),
        }
    }
    if let Some((line, message)) = malformed {
        pipeline_warn!("Ignoring malformed final sink line {} in {:?}: {}", line, path, message);
        contents.discarded_tail = true;
    }
    pipeline_debug!("Read {} sink records from {:?}", contents.records.len(), path);
    Ok(contents)
}

/// Keeps the most recent record per `doc_id`.
pub fn latest_by_doc(records: Vec<DocumentTokens>) -> BTreeMap<DocId, DocumentTokens> {
    let mut latest = BTreeMap::new();
    for doc in records {
        latest.insert(doc.doc_id, doc);
    }
    latest
}
