//! Durable storage for the gate's four documents.
//!
//! Each document (forest, corpus, guide, transition chain) is a standalone
//! JSON file. Writes go to `<path>.tmp` first and are renamed over the target,
//! so a reader sees either the previous or the new version, never a partial one.
//! A crash between the two steps leaves a `.tmp` behind that
//! [`recover_tmp_files`] resolves before the next load.

use std::ffi::OsString;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::error::{StorageError, StorageResult};

/// Load/save contract for persisted documents.
pub trait DocumentStore {
    /// Load a document. A missing document yields `T::default()`.
    fn load<T: DeserializeOwned + Default>(&self, path: &Path) -> StorageResult<T>;

    /// Replace a document atomically.
    fn save<T: Serialize>(&self, path: &Path, value: &T) -> StorageResult<()>;

    /// Delete a document. A missing document is not an error.
    fn remove(&self, path: &Path) -> StorageResult<()>;

    /// Load a document, falling back to the default when it cannot be read.
    fn load_or_default<T: DeserializeOwned + Default>(&self, path: &Path) -> T {
        self.load(path).unwrap_or_else(|e| {
            warn!(path = %path.display(), error = %e, "Failed to load document, starting empty");
            T::default()
        })
    }
}

/// Pretty-printed JSON files on the local filesystem.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonFileStore;

impl JsonFileStore {
    /// Create a store.
    pub fn new() -> Self {
        Self
    }
}

impl DocumentStore for JsonFileStore {
    fn load<T: DeserializeOwned + Default>(&self, path: &Path) -> StorageResult<T> {
        let data = match fs::read(path) {
            Ok(data) => data,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!(path = %path.display(), "Document missing, using default");
                return Ok(T::default());
            }
            Err(source) => {
                return Err(StorageError::Io {
                    path: path.to_path_buf(),
                    source,
                })
            }
        };
        serde_json::from_slice(&data).map_err(|source| StorageError::Corrupt {
            path: path.to_path_buf(),
            source,
        })
    }

    fn save<T: Serialize>(&self, path: &Path, value: &T) -> StorageResult<()> {
        let io_err = |source| StorageError::Io {
            path: path.to_path_buf(),
            source,
        };

        if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
            fs::create_dir_all(dir).map_err(io_err)?;
        }

        let data = serde_json::to_vec_pretty(value).map_err(|source| StorageError::Serialize {
            path: path.to_path_buf(),
            source,
        })?;

        let tmp = tmp_path(path);
        fs::write(&tmp, data).map_err(io_err)?;

        // Windows refuses to rename over an existing file.
        if cfg!(windows) {
            let _ = fs::remove_file(path);
        }
        fs::rename(&tmp, path).map_err(io_err)?;
        debug!(path = %path.display(), "Document saved");
        Ok(())
    }

    fn remove(&self, path: &Path) -> StorageResult<()> {
        match fs::remove_file(path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(source) => Err(StorageError::Io {
                path: path.to_path_buf(),
                source,
            }),
        }
    }
}

/// `<path>.tmp`, the staging file used by [`JsonFileStore::save`].
pub fn tmp_path(path: &Path) -> PathBuf {
    let mut name = OsString::from(path.as_os_str());
    name.push(".tmp");
    PathBuf::from(name)
}

/// Resolve staging files left by interrupted saves.
///
/// A `.tmp` without its target is promoted; a `.tmp` next to an existing
/// target is stale and removed. Failures are logged and skipped.
pub fn recover_tmp_files<P: AsRef<Path>>(paths: &[P]) {
    for path in paths {
        let path = path.as_ref();
        let tmp = tmp_path(path);
        if !tmp.exists() {
            continue;
        }

        if path.exists() {
            if let Err(e) = fs::remove_file(&tmp) {
                warn!(path = %tmp.display(), error = %e, "Failed to remove stale tmp file");
            }
        } else {
            match fs::rename(&tmp, path) {
                Ok(()) => info!(path = %path.display(), "Recovered document from tmp file"),
                Err(e) => warn!(path = %path.display(), error = %e, "Failed to recover tmp file"),
            }
        }
    }
}
