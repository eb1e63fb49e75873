//! Write-only persistence of single entries, used by `SAVE`.
//!
//! Nothing in this crate reads a snapshot back. The on-disk format is an
//! implementation detail of [`FileSnapshotSink`].

use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;
use thiserror::Error;

use crate::entry::Entry;

/// Errors raised while persisting an entry
#[derive(Error, Debug)]
pub enum SnapshotError {
    /// The key cannot be used as a file name
    #[error("key `{0}` cannot be used as a snapshot file name")]
    InvalidKey(String),

    #[error("snapshot I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("snapshot serialization error: {0}")]
    Serialization(#[source] serde_json::Error),
}

/// Durable, write-only target for single entries
pub trait SnapshotSink: Send + Sync {
    fn persist(&self, key: &str, entry: &Entry) -> Result<(), SnapshotError>;
}

impl<S: SnapshotSink + ?Sized> SnapshotSink for std::sync::Arc<S> {
    fn persist(&self, key: &str, entry: &Entry) -> Result<(), SnapshotError> {
        (**self).persist(key, entry)
    }
}

/// Directory used when nothing else is configured
pub const DEFAULT_SNAPSHOT_DIR: &str = "generated";

#[derive(Serialize)]
struct SnapshotRecord<'a> {
    key: &'a str,
    username: &'a str,
    userdata: &'a str,
    expires_in_ms: u64,
}

/// Writes each saved entry to `<dir>/<key>.json`, overwriting earlier saves of the same key
#[derive(Debug, Clone)]
pub struct FileSnapshotSink {
    dir: PathBuf,
}

impl FileSnapshotSink {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path the entry for `key` is written to
    pub fn path_for(&self, key: &str) -> Result<PathBuf, SnapshotError> {
        let unusable = key.is_empty()
            || key == "."
            || key == ".."
            || key.contains(['/', '\\', '\0']);
        if unusable {
            return Err(SnapshotError::InvalidKey(key.to_string()));
        }

        Ok(self.dir.join(format!("{key}.json")))
    }
}

impl Default for FileSnapshotSink {
    fn default() -> Self {
        Self::new(DEFAULT_SNAPSHOT_DIR)
    }
}

impl SnapshotSink for FileSnapshotSink {
    fn persist(&self, key: &str, entry: &Entry) -> Result<(), SnapshotError> {
        let path = self.path_for(key)?;
        let record = SnapshotRecord {
            key,
            username: entry.username(),
            userdata: entry.userdata(),
            expires_in_ms: u64::try_from(entry.remaining_ttl(Instant::now()).as_millis())
                .unwrap_or(u64::MAX),
        };
        let bytes = serde_json::to_vec(&record).map_err(SnapshotError::Serialization)?;

        fs::create_dir_all(&self.dir)?;
        fs::write(&path, bytes)?;

        tracing::debug!(path = %path.display(), "snapshot written");
        Ok(())
    }
}
