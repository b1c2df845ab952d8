//! In-process cache tier
//!
//! Holds the current [`CacheEntry`] behind a read-write lock. Readers
//! proceed concurrently; a writer takes the lock only for the swap itself,
//! never across fetch or disk I/O.

use std::sync::RwLock;

use chrono::{DateTime, Utc};

use super::entry::CacheEntry;

/// Single-slot in-memory holder of the current cache entry
#[derive(Debug, Default)]
pub struct MemoryTier {
    current: RwLock<Option<CacheEntry>>,
}

impl MemoryTier {
    /// Creates an empty tier
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a tier seeded with an entry (restart seeding from disk)
    pub fn seeded(entry: CacheEntry) -> Self {
        Self {
            current: RwLock::new(Some(entry)),
        }
    }

    /// Returns a clone of the current entry, if any
    pub fn load(&self) -> Option<CacheEntry> {
        self.current.read().unwrap_or_else(|e| e.into_inner()).clone()
    }

    /// Replaces the current entry wholesale
    pub fn replace(&self, entry: CacheEntry) {
        *self.current.write().unwrap_or_else(|e| e.into_inner()) = Some(entry);
    }

    /// Drops the current entry, returning whether one was present
    pub fn clear(&self) -> bool {
        self.current
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .take()
            .is_some()
    }

    /// Whether an entry exists and is within its TTL at `now`
    pub fn is_valid(&self, now: DateTime<Utc>) -> bool {
        self.current
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .as_ref()
            .map(|entry| entry.is_valid(now))
            .unwrap_or(false)
    }

    /// Server count of the current entry, or 0 when empty
    pub fn server_count(&self) -> usize {
        self.current
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .as_ref()
            .map(CacheEntry::server_count)
            .unwrap_or(0)
    }
}
