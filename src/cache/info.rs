//! Read-only monitoring snapshot
//!
//! Composes coordinator state, the scheduler countdown and disk presence
//! flags into the [`CacheSnapshot`] served at `GET /cache/info`. Pure
//! function of current state; the only I/O is cheap existence checks.

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::coordinator::CacheCoordinator;
use super::scheduler::RefreshScheduler;
use std::sync::Arc;

/// Backend cache state as reported to the dashboard
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BackendInfo {
    /// Whether any entry (valid or stale) is currently held
    pub has_cached_data: bool,
    /// When the current entry was fetched, `null` while cold
    pub timestamp: Option<DateTime<Utc>>,
    /// Age of the current entry in seconds, `null` while cold
    pub cache_age: Option<u64>,
    /// Configured TTL in seconds
    pub cache_duration: u64,
    /// Server count of the current entry (0 when empty)
    pub server_count: usize,
    /// Whether the current entry is within its TTL
    pub cache_valid: bool,
    /// Seconds until the next scheduled automatic refresh, `null` while
    /// the scheduler is parked. Serialized even when absent so the
    /// dashboard always sees the same set of keys.
    pub refresh_remaining: Option<u64>,
}

/// Presence flags for the tracked state files
#[derive(Debug, Clone, Serialize)]
pub struct StorageFilesInfo {
    pub config: bool,
    pub servers: bool,
    pub logs: bool,
    pub queue: bool,
    pub history: bool,
}

/// Storage directories and file presence as reported to the dashboard
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StorageInfo {
    pub data_dir: String,
    pub cache_dir: String,
    pub logs_dir: String,
    pub files: StorageFilesInfo,
}

/// Complete monitoring view, recomputed on every query and never persisted
#[derive(Debug, Clone, Serialize)]
pub struct CacheSnapshot {
    pub backend: BackendInfo,
    pub storage: StorageInfo,
}

/// Builds [`CacheSnapshot`]s from the live cache components
#[derive(Clone)]
pub struct InfoReporter {
    coordinator: CacheCoordinator,
    scheduler: Arc<RefreshScheduler>,
}

impl InfoReporter {
    /// Creates a reporter over the given coordinator and scheduler
    pub fn new(coordinator: CacheCoordinator, scheduler: Arc<RefreshScheduler>) -> Self {
        Self {
            coordinator,
            scheduler,
        }
    }

    /// Builds a point-in-time snapshot of cache and storage state
    pub fn snapshot(&self) -> CacheSnapshot {
        let coordinator = &self.coordinator;
        let store = coordinator.store();
        let layout = store.layout();
        let flags = store.storage_flags();

        CacheSnapshot {
            backend: BackendInfo {
                has_cached_data: coordinator.get().is_some(),
                timestamp: coordinator.created_at(),
                cache_age: coordinator.age_seconds(),
                cache_duration: coordinator.ttl_seconds(),
                server_count: coordinator.server_count(),
                cache_valid: coordinator.is_valid(),
                refresh_remaining: self.scheduler.remaining_seconds(),
            },
            storage: StorageInfo {
                data_dir: layout.data_dir.display().to_string(),
                cache_dir: layout.cache_dir.display().to_string(),
                logs_dir: layout.logs_dir.display().to_string(),
                files: StorageFilesInfo {
                    config: flags.config,
                    servers: flags.servers,
                    logs: flags.logs,
                    queue: flags.queue,
                    history: flags.history,
                },
            },
        }
    }
}
