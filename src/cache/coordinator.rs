//! Cache coordination across the memory and disk tiers
//!
//! The [`CacheCoordinator`] owns both tiers and exposes the contract the
//! API layer and the refresh scheduler consume: cache-aside reads, a
//! single-flight refresh, and scoped invalidation.
//!
//! Locking discipline: the upstream fetch and all disk I/O happen outside
//! any lock; only the final swap into the memory tier is serialized.
//! Concurrent refreshes collapse into one upstream call through a shared
//! future — every waiter receives the same result.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use futures::future::{BoxFuture, FutureExt, Shared};
use serde::Deserialize;
use thiserror::Error;
use tokio::sync::{Mutex, Notify};
use tracing::{debug, info, warn};

use super::entry::CacheEntry;
use super::memory::MemoryTier;
use super::store::{PersistentStore, StoreError};
use crate::data::{FetchError, InventoryFetcher, ServerOffer};

/// Which tier(s) an invalidation affects
///
/// Unknown wire values fail deserialization, so the coordinator itself
/// never sees an unrecognized scope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InvalidateScope {
    /// Clear both tiers
    All,
    /// Clear the in-process tier only; disk reseeds on restart
    Memory,
    /// Delete the disk snapshot only; memory keeps serving until expiry
    Files,
}

/// Errors surfaced by `refresh` and `invalidate`
///
/// `Clone` because a single refresh outcome is handed to every caller
/// that joined the in-flight call.
#[derive(Debug, Clone, Error)]
pub enum CacheError {
    /// Upstream fetch failed; any existing entry was left untouched
    #[error(transparent)]
    Fetch(#[from] FetchError),

    /// Disk write or delete failed; the memory tier remains authoritative
    #[error(transparent)]
    Store(#[from] StoreError),
}

type SharedRefresh = Shared<BoxFuture<'static, Result<usize, CacheError>>>;

struct CoordinatorInner {
    memory: MemoryTier,
    store: PersistentStore,
    fetcher: Arc<dyn InventoryFetcher>,
    ttl_seconds: u64,
    /// Slot holding the in-flight refresh, if any
    inflight: Mutex<Option<SharedRefresh>>,
    /// Pinged whenever the entry lifecycle changes, so the scheduler
    /// recomputes its deadline
    reschedule: Notify,
}

impl CoordinatorInner {
    /// The actual refresh: fetch, swap memory, persist
    async fn run_refresh(self: Arc<Self>) -> Result<usize, CacheError> {
        let servers = self.fetcher.fetch().await.map_err(|e| {
            warn!(error = %e, "inventory fetch failed, keeping existing entry");
            e
        })?;

        let entry = CacheEntry::new(servers, self.ttl_seconds);
        let count = entry.server_count();

        // Memory first: it is authoritative for the running process even
        // if the disk write below fails.
        self.memory.replace(entry.clone());
        self.reschedule.notify_one();
        info!(server_count = count, "inventory cache refreshed");

        self.store.save(&entry).map_err(|e| {
            warn!(error = %e, "snapshot save failed, memory tier still fresh");
            e
        })?;
        Ok(count)
    }
}

/// Orchestrates reads, refreshes and invalidation across both cache tiers
///
/// Cheap to clone; all clones share the same state.
#[derive(Clone)]
pub struct CacheCoordinator {
    inner: Arc<CoordinatorInner>,
}

impl CacheCoordinator {
    /// Creates a coordinator, seeding memory from the disk snapshot
    ///
    /// A persisted entry that is already past its TTL is discarded so the
    /// process starts cold rather than serving long-stale data from a
    /// previous run.
    pub fn new(
        store: PersistentStore,
        fetcher: Arc<dyn InventoryFetcher>,
        ttl_seconds: u64,
    ) -> Self {
        let memory = match store.load() {
            Some(entry) if entry.is_valid(Utc::now()) => {
                info!(
                    server_count = entry.server_count(),
                    age_seconds = entry.age_seconds(Utc::now()),
                    "seeded memory tier from disk snapshot"
                );
                MemoryTier::seeded(entry)
            }
            Some(entry) => {
                debug!(
                    age_seconds = entry.age_seconds(Utc::now()),
                    "disk snapshot expired, starting cold"
                );
                MemoryTier::new()
            }
            None => MemoryTier::new(),
        };

        Self {
            inner: Arc::new(CoordinatorInner {
                memory,
                store,
                fetcher,
                ttl_seconds,
                inflight: Mutex::new(None),
                reschedule: Notify::new(),
            }),
        }
    }

    /// Returns the current payload with its validity flag
    ///
    /// Cache-aside: an expired entry is still returned (flagged stale) and
    /// no fetch is triggered — callers wanting fresh data call `refresh`.
    pub fn get(&self) -> Option<(Vec<ServerOffer>, bool)> {
        let now = Utc::now();
        self.inner.memory.load().map(|entry| {
            let valid = entry.is_valid(now);
            (entry.servers, valid)
        })
    }

    /// Whether an entry exists and is within its TTL
    pub fn is_valid(&self) -> bool {
        self.inner.memory.is_valid(Utc::now())
    }

    /// Server count of the current entry, or 0 when empty
    pub fn server_count(&self) -> usize {
        self.inner.memory.server_count()
    }

    /// Timestamp of the current entry's fetch, if any
    pub fn created_at(&self) -> Option<DateTime<Utc>> {
        self.inner.memory.load().map(|entry| entry.created_at)
    }

    /// Age of the current entry in seconds, if any
    pub fn age_seconds(&self) -> Option<u64> {
        self.inner
            .memory
            .load()
            .map(|entry| entry.age_seconds(Utc::now()))
    }

    /// When the current entry expires, if any
    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        self.inner.memory.load().map(|entry| entry.expires_at())
    }

    /// The configured TTL in seconds
    pub fn ttl_seconds(&self) -> u64 {
        self.inner.ttl_seconds
    }

    /// Fetches fresh inventory and installs it in both tiers
    ///
    /// Single-flight: if a refresh is already in progress the caller joins
    /// it and receives its result instead of triggering a second upstream
    /// fetch. On fetch failure the existing entry (if any) is untouched.
    /// Returns the new entry's server count on success.
    pub async fn refresh(&self) -> Result<usize, CacheError> {
        let shared = {
            let mut slot = self.inner.inflight.lock().await;
            match slot.as_ref() {
                Some(inflight) => {
                    debug!("joining in-flight refresh");
                    inflight.clone()
                }
                None => {
                    let inner = Arc::clone(&self.inner);
                    let fut = async move {
                        let result = Arc::clone(&inner).run_refresh().await;
                        // Free the slot before waiters observe the result
                        // so the next refresh starts a new flight.
                        inner.inflight.lock().await.take();
                        result
                    }
                    .boxed()
                    .shared();
                    *slot = Some(fut.clone());
                    fut
                }
            }
        };
        shared.await
    }

    /// Installs a pre-built entry in the memory tier
    ///
    /// Whole-entry replacement like a refresh, but without touching the
    /// disk tier. Used to warm the cache from an external source and to
    /// drive age-dependent behavior in tests.
    #[allow(dead_code)]
    pub fn install_entry(&self, entry: CacheEntry) {
        self.inner.memory.replace(entry);
        self.inner.reschedule.notify_one();
    }

    /// Clears the given tier(s)
    ///
    /// Memory-affecting scopes also cancel the pending scheduler timer.
    /// A disk delete failure is surfaced, but memory state is already
    /// applied by then and remains usable.
    pub fn invalidate(&self, scope: InvalidateScope) -> Result<(), CacheError> {
        match scope {
            InvalidateScope::Memory => {
                self.inner.memory.clear();
                self.inner.reschedule.notify_one();
                info!("memory tier cleared");
                Ok(())
            }
            InvalidateScope::Files => {
                self.inner.store.delete()?;
                info!("disk snapshot deleted");
                Ok(())
            }
            InvalidateScope::All => {
                self.inner.memory.clear();
                self.inner.reschedule.notify_one();
                self.inner.store.delete()?;
                info!("both cache tiers cleared");
                Ok(())
            }
        }
    }

    /// Waits until the entry lifecycle changes (refresh or invalidation)
    ///
    /// Used by the scheduler to recompute its deadline; reporting code
    /// must not rely on this for correctness.
    pub async fn lifecycle_changed(&self) {
        self.inner.reschedule.notified().await;
    }

    /// The disk tier, for reporting presence flags
    pub fn store(&self) -> &PersistentStore {
        &self.inner.store
    }
}
