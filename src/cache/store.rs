//! Durable cache tier
//!
//! Persists the server-list snapshot as a JSON file so a restarted process
//! can pick up where the previous one left off. Writes go through a
//! temporary file followed by a rename, so a crash mid-write can never
//! leave a half-written snapshot observable to `load`.

use std::fs;
use std::io;
use std::path::PathBuf;

use thiserror::Error;
use tracing::warn;

use super::entry::CacheEntry;
use crate::config::{file_present, StorageLayout};

/// Errors that can occur while persisting or deleting the snapshot
///
/// Carries rendered messages so the type stays `Clone` for fan-out through
/// the single-flight refresh path.
#[derive(Debug, Clone, Error)]
pub enum StoreError {
    /// Snapshot could not be serialized
    #[error("failed to encode snapshot: {0}")]
    Encode(String),

    /// Disk write, rename or delete failed
    #[error("snapshot I/O failed: {0}")]
    Io(String),
}

impl From<io::Error> for StoreError {
    fn from(e: io::Error) -> Self {
        StoreError::Io(e.to_string())
    }
}

/// Existence flags for the sibling state files, reported for monitoring
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StorageFlags {
    pub config: bool,
    pub servers: bool,
    pub logs: bool,
    pub queue: bool,
    pub history: bool,
}

/// Disk-backed store for the server-list snapshot
#[derive(Debug, Clone)]
pub struct PersistentStore {
    layout: StorageLayout,
}

impl PersistentStore {
    /// Creates a store over the given layout
    pub fn new(layout: StorageLayout) -> Self {
        Self { layout }
    }

    fn snapshot_path(&self) -> PathBuf {
        self.layout.snapshot_path()
    }

    fn tmp_path(&self) -> PathBuf {
        let mut path = self.snapshot_path().into_os_string();
        path.push(".tmp");
        PathBuf::from(path)
    }

    /// Reads the persisted snapshot
    ///
    /// A missing, unreadable or corrupt file is never fatal: it is logged
    /// and treated as no snapshot, so the process cold-starts instead of
    /// crashing.
    pub fn load(&self) -> Option<CacheEntry> {
        let path = self.snapshot_path();
        let content = match fs::read_to_string(&path) {
            Ok(content) => content,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return None,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "snapshot unreadable, starting cold");
                return None;
            }
        };

        match serde_json::from_str(&content) {
            Ok(entry) => Some(entry),
            Err(e) => {
                warn!(path = %path.display(), error = %e, "snapshot corrupt, starting cold");
                None
            }
        }
    }

    /// Persists the entry atomically
    ///
    /// The entry is written to a sibling `.tmp` file and renamed into
    /// place; `load` observes either the old snapshot or the new one,
    /// never a torn write.
    pub fn save(&self, entry: &CacheEntry) -> Result<(), StoreError> {
        fs::create_dir_all(&self.layout.cache_dir)?;

        let json =
            serde_json::to_string_pretty(entry).map_err(|e| StoreError::Encode(e.to_string()))?;

        let tmp = self.tmp_path();
        fs::write(&tmp, json)?;
        fs::rename(&tmp, self.snapshot_path())?;
        Ok(())
    }

    /// Removes the persisted snapshot; succeeds if it was already absent
    pub fn delete(&self) -> Result<(), StoreError> {
        match fs::remove_file(self.snapshot_path()) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    /// Whether a snapshot file currently exists on disk
    pub fn snapshot_exists(&self) -> bool {
        file_present(&self.snapshot_path())
    }

    /// Presence flags for all tracked state files
    pub fn storage_flags(&self) -> StorageFlags {
        StorageFlags {
            config: file_present(&self.layout.config_path()),
            servers: self.snapshot_exists(),
            logs: file_present(&self.layout.log_path()),
            queue: file_present(&self.layout.queue_path()),
            history: file_present(&self.layout.history_path()),
        }
    }

    /// The layout this store was built over
    pub fn layout(&self) -> &StorageLayout {
        &self.layout
    }
}
