//! Deterministic recursive discovery of source files under a root.
//!
//! Only paths are collected here; file contents are read later by the
//! runner, where a read failure is a per-row error rather than a fatal one.

use std::fs;
use std::io;
use std::path::{Component, Path, PathBuf};

use pipeline_logging::{pipeline_debug, pipeline_warn};
use thiserror::Error;
use walkdir::{DirEntry, WalkDir};

#[derive(Debug, Error)]
pub enum DiscoverError {
    #[error("root directory not found: {0}")]
    RootNotFound(PathBuf),
    #[error("root is not a directory: {0}")]
    NotADirectory(PathBuf),
    #[error("root directory {path} is not readable: {source}")]
    Unreadable {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Case-insensitive file-extension filter. A leading dot is optional.
///
/// An empty filter accepts every file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtensionFilter {
    extensions: Vec<String>,
}

impl Default for ExtensionFilter {
    fn default() -> Self {
        Self::new(["txt"])
    }
}

impl ExtensionFilter {
    pub fn new<I, S>(extensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut extensions: Vec<String> = extensions
            .into_iter()
            .map(|ext| ext.as_ref().trim().trim_start_matches('.').to_lowercase())
            .filter(|ext| !ext.is_empty())
            .collect();
        extensions.sort();
        extensions.dedup();
        Self { extensions }
    }

    pub fn extensions(&self) -> &[String] {
        &self.extensions
    }

    pub fn matches(&self, path: &Path) -> bool {
        if self.extensions.is_empty() {
            return true;
        }
        path.extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| ext.to_lowercase())
            .is_some_and(|ext| self.extensions.contains(&ext))
    }
}

/// Fails unless `root` exists, is a directory and can be listed.
pub fn validate_root(root: &Path) -> Result<(), DiscoverError> {
    let meta = match fs::metadata(root) {
        Ok(meta) => meta,
        Err(err) if err.kind() == io::ErrorKind::NotFound => {
            return Err(DiscoverError::RootNotFound(root.to_path_buf()));
        }
        Err(source) => {
            return Err(DiscoverError::Unreadable {
                path: root.to_path_buf(),
                source,
            });
        }
    };
    if !meta.is_dir() {
        return Err(DiscoverError::NotADirectory(root.to_path_buf()));
    }
    fs::read_dir(root).map_err(|source| DiscoverError::Unreadable {
        path: root.to_path_buf(),
        source,
    })?;
    Ok(())
}

/// Recursively lists files under `root` accepted by `filter`, as
/// forward-slash relative paths sorted lexicographically.
///
/// Symlinks to files are listed, and so are dangling links, which then fail
/// to read. Linked directories are not entered. Names that are not valid
/// UTF-8 are kept in lossy form so that they still get a row.
/// Subdirectories that cannot be listed are skipped with a warning.
pub fn discover_files(root: &Path, filter: &ExtensionFilter) -> Result<Vec<String>, DiscoverError> {
    validate_root(root)?;

    let mut paths = Vec::new();
    for entry in WalkDir::new(root).follow_links(false) {
        let entry = match entry {
            Ok(entry) => entry,
            Err(err) if err.depth() == 0 => {
                return Err(DiscoverError::Unreadable {
                    path: root.to_path_buf(),
                    source: err.into(),
                });
            }
            Err(err) => {
                pipeline_warn!("Skipping unreadable entry under {:?}: {}", root, err);
                continue;
            }
        };
        if !is_file_like(&entry) || !filter.matches(entry.path()) {
            continue;
        }
        let Ok(relative) = entry.path().strip_prefix(root) else {
            continue;
        };
        if relative.to_str().is_none() {
            pipeline_warn!(
                "Path {:?} is not valid UTF-8; it is tracked under a lossy name and will fail to read",
                entry.path()
            );
        }
        paths.push(normalize_relative(relative));
    }
    paths.sort();
    paths.dedup();

    pipeline_debug!("Discovered {} files under {:?}", paths.len(), root);
    Ok(paths)
}

/// Regular files, plus symlinks that do not resolve to a directory.
fn is_file_like(entry: &DirEntry) -> bool {
    if entry.file_type().is_file() {
        return true;
    }
    if !entry.path_is_symlink() {
        return false;
    }
    match fs::metadata(entry.path()) {
        Ok(target) => !target.is_dir(),
        Err(_) => true,
    }
}

/// Joins path components with `/`. Non UTF-8 components are converted
/// lossily.
pub fn normalize_relative(path: &Path) -> String {
    let mut parts = Vec::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            other => parts.push(other.as_os_str().to_string_lossy()),
        }
    }
    parts.join("/")
}

/// `true` when `relative_path` names something below the root: non-empty,
/// not absolute, and free of `..`.
pub fn is_inside_root(relative_path: &str) -> bool {
    let mut named = false;
    for component in Path::new(relative_path).components() {
        match component {
            Component::Normal(_) => named = true,
            Component::CurDir => {}
            _ => return false,
        }
    }
    named
}
