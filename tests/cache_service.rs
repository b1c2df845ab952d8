//! Integration tests for the cache subsystem
//!
//! Exercises the end-to-end behavior of the coordinator over real
//! temporary directories: TTL validity, single-flight refresh, scope
//! isolation, crash-safe persistence, restart seeding and the
//! serve-stale-on-error policy.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{Duration, Utc};
use tempfile::TempDir;
use tokio::sync::Semaphore;

use invory::cache::{CacheCoordinator, CacheEntry, InvalidateScope, PersistentStore};
use invory::config::StorageLayout;
use invory::data::{FetchError, InventoryFetcher, ServerOffer};

/// Fetcher whose result count and failure mode can be flipped mid-test
struct TestFetcher {
    calls: AtomicUsize,
    count: AtomicUsize,
    fail: AtomicBool,
    gate: Option<Arc<Semaphore>>,
}

impl TestFetcher {
    fn returning(count: usize) -> Arc<Self> {
        Arc::new(Self {
            calls: AtomicUsize::new(0),
            count: AtomicUsize::new(count),
            fail: AtomicBool::new(false),
            gate: None,
        })
    }

    fn gated(count: usize, gate: Arc<Semaphore>) -> Arc<Self> {
        Arc::new(Self {
            calls: AtomicUsize::new(0),
            count: AtomicUsize::new(count),
            fail: AtomicBool::new(false),
            gate: Some(gate),
        })
    }

    fn set_count(&self, count: usize) {
        self.count.store(count, Ordering::SeqCst);
    }

    fn set_failing(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl InventoryFetcher for TestFetcher {
    async fn fetch(&self) -> Result<Vec<ServerOffer>, FetchError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(gate) = &self.gate {
            let _permit = gate.acquire().await.expect("gate open");
        }
        if self.fail.load(Ordering::SeqCst) {
            return Err(FetchError::Status(502));
        }
        Ok(offers(self.count.load(Ordering::SeqCst)))
    }
}

fn offers(count: usize) -> Vec<ServerOffer> {
    (0..count)
        .map(|i| ServerOffer {
            plan_code: format!("24ska{i:02}"),
            name: format!("KS-A {i}"),
            cpu: "Intel i7-6700k".to_string(),
            memory: "64GB DDR4".to_string(),
            storage: "2x 480GB SSD".to_string(),
            bandwidth: "1Gbps".to_string(),
            price: Some("€19.99/mo".to_string()),
            datacenters: vec!["gra".to_string(), "bhs".to_string()],
        })
        .collect()
}

fn store_in(temp: &TempDir) -> PersistentStore {
    PersistentStore::new(StorageLayout::new(
        temp.path().join("data"),
        temp.path().join("cache"),
        temp.path().join("logs"),
    ))
}

fn backdated_entry(count: usize, age_secs: i64, ttl: u64) -> CacheEntry {
    let mut entry = CacheEntry::new(offers(count), ttl);
    entry.created_at = Utc::now() - Duration::seconds(age_secs);
    entry
}

// Validity is exactly `age < ttl` and flips once, monotonically.
#[tokio::test]
async fn test_validity_flips_once_at_ttl_boundary() {
    let entry = backdated_entry(1, 0, 7200);
    let t0 = entry.created_at;

    let mut last_valid = true;
    let mut flips = 0;
    for age in [0i64, 1, 3600, 7199, 7200, 7201, 7300, 100_000] {
        let valid = entry.is_valid(t0 + Duration::seconds(age));
        assert_eq!(valid, age < 7200, "age={age}");
        if valid != last_valid {
            flips += 1;
            assert!(!valid, "validity never flips back to true");
        }
        last_valid = valid;
    }
    assert_eq!(flips, 1);
}

#[tokio::test]
async fn test_coordinator_flags_backdated_entry_stale() {
    let temp = TempDir::new().expect("temp");
    let coordinator = CacheCoordinator::new(store_in(&temp), TestFetcher::returning(3), 7200);

    coordinator.install_entry(backdated_entry(3, 7300, 7200));
    assert!(!coordinator.is_valid());

    let (payload, valid) = coordinator.get().expect("stale entry still served");
    assert_eq!(payload.len(), 3);
    assert!(!valid);
}

// N concurrent refreshes collapse into one upstream fetch and every
// caller observes the same resulting entry.
#[tokio::test]
async fn test_concurrent_refreshes_share_one_fetch() {
    let temp = TempDir::new().expect("temp");
    let gate = Arc::new(Semaphore::new(0));
    let fetcher = TestFetcher::gated(6, Arc::clone(&gate));
    let coordinator = CacheCoordinator::new(store_in(&temp), Arc::clone(&fetcher) as _, 7200);

    let mut joins = Vec::new();
    for _ in 0..16 {
        let coordinator = coordinator.clone();
        joins.push(tokio::spawn(async move { coordinator.refresh().await }));
    }
    tokio::time::sleep(std::time::Duration::from_millis(50)).await;
    gate.add_permits(1);

    for join in joins {
        assert_eq!(join.await.expect("task").expect("refresh"), 6);
    }
    assert_eq!(fetcher.calls(), 1);
}

// Failure half of single-flight: all waiters observe the same error.
#[tokio::test]
async fn test_concurrent_refreshes_share_one_error() {
    let temp = TempDir::new().expect("temp");
    let gate = Arc::new(Semaphore::new(0));
    let fetcher = TestFetcher::gated(0, Arc::clone(&gate));
    fetcher.set_failing(true);
    let coordinator = CacheCoordinator::new(store_in(&temp), Arc::clone(&fetcher) as _, 7200);

    let mut joins = Vec::new();
    for _ in 0..8 {
        let coordinator = coordinator.clone();
        joins.push(tokio::spawn(async move { coordinator.refresh().await }));
    }
    tokio::time::sleep(std::time::Duration::from_millis(50)).await;
    gate.add_permits(1);

    for join in joins {
        let err = join.await.expect("task").expect_err("shared failure");
        assert!(err.to_string().contains("502"), "got: {err}");
    }
    assert_eq!(fetcher.calls(), 1);
}

// Invalidation scopes are isolated from each other.
#[tokio::test]
async fn test_memory_scope_leaves_disk_intact() {
    let temp = TempDir::new().expect("temp");
    let store = store_in(&temp);
    let coordinator = CacheCoordinator::new(store.clone(), TestFetcher::returning(5), 7200);
    coordinator.refresh().await.expect("populate");

    coordinator.invalidate(InvalidateScope::Memory).expect("clear");

    assert!(coordinator.get().is_none());
    assert_eq!(store.load().expect("disk entry intact").server_count(), 5);
}

#[tokio::test]
async fn test_files_scope_leaves_memory_serving() {
    let temp = TempDir::new().expect("temp");
    let store = store_in(&temp);
    let coordinator = CacheCoordinator::new(store.clone(), TestFetcher::returning(5), 7200);
    coordinator.refresh().await.expect("populate");

    coordinator.invalidate(InvalidateScope::Files).expect("clear");

    let (payload, valid) = coordinator.get().expect("memory keeps serving");
    assert_eq!(payload.len(), 5);
    assert!(valid);
    assert!(store.load().is_none());
}

#[tokio::test]
async fn test_all_scope_clears_both_tiers() {
    let temp = TempDir::new().expect("temp");
    let store = store_in(&temp);
    let coordinator = CacheCoordinator::new(store.clone(), TestFetcher::returning(5), 7200);
    coordinator.refresh().await.expect("populate");

    coordinator.invalidate(InvalidateScope::All).expect("clear");

    assert!(coordinator.get().is_none());
    assert!(store.load().is_none());
}

// An interruption between tmp write and rename leaves the previous
// snapshot fully readable, never a torn one.
#[tokio::test]
async fn test_interrupted_save_preserves_previous_snapshot() {
    let temp = TempDir::new().expect("temp");
    let store = store_in(&temp);
    let old = backdated_entry(5, 10, 7200);
    store.save(&old).expect("save old");

    // Crash simulation: the new snapshot made it only into the tmp file.
    let torn = temp.path().join("cache").join("servers.json.tmp");
    std::fs::write(&torn, "{\"servers\":[{\"planCo").expect("torn tmp write");

    let loaded = store.load().expect("old snapshot readable");
    assert_eq!(loaded.server_count(), 5);
    assert_eq!(loaded.created_at, old.created_at);
}

// Restart seeding honors the persisted entry's age.
#[tokio::test]
async fn test_valid_snapshot_seeds_without_fetch() {
    let temp = TempDir::new().expect("temp");
    let store = store_in(&temp);
    store
        .save(&backdated_entry(5, 3600, 7200))
        .expect("persist snapshot");

    let fetcher = TestFetcher::returning(99);
    let coordinator = CacheCoordinator::new(store, Arc::clone(&fetcher) as _, 7200);

    let (payload, valid) = coordinator.get().expect("seeded immediately");
    assert_eq!(payload.len(), 5);
    assert!(valid);
    assert_eq!(fetcher.calls(), 0);
}

#[tokio::test]
async fn test_expired_snapshot_starts_cold_until_refresh() {
    let temp = TempDir::new().expect("temp");
    let store = store_in(&temp);
    store
        .save(&backdated_entry(5, 8000, 7200))
        .expect("persist expired snapshot");

    let fetcher = TestFetcher::returning(8);
    let coordinator = CacheCoordinator::new(store, Arc::clone(&fetcher) as _, 7200);

    assert!(coordinator.get().is_none(), "expired snapshot not served");

    coordinator.refresh().await.expect("refresh");
    let (payload, valid) = coordinator.get().expect("fresh after refresh");
    assert_eq!(payload.len(), 8);
    assert!(valid);
}

// A failed refresh leaves the pre-failure payload untouched.
#[tokio::test]
async fn test_failed_refresh_serves_prior_payload() {
    let temp = TempDir::new().expect("temp");
    let fetcher = TestFetcher::returning(5);
    let coordinator = CacheCoordinator::new(store_in(&temp), Arc::clone(&fetcher) as _, 7200);
    coordinator.refresh().await.expect("populate");

    fetcher.set_failing(true);
    coordinator.refresh().await.expect_err("fetch fails");

    let (payload, valid) = coordinator.get().expect("prior entry survives");
    assert_eq!(payload.len(), 5);
    assert!(valid, "a failed refresh never invalidates a valid entry");
}

// Full lifecycle: TTL 7200, entry of 5 servers.
// At age 3600 it reports age/validity; past TTL it flags stale; a refresh
// returning 8 servers resets age to 0 with the new count.
#[tokio::test]
async fn test_lifecycle_five_then_eight_servers() {
    let temp = TempDir::new().expect("temp");
    let fetcher = TestFetcher::returning(5);
    let coordinator = CacheCoordinator::new(store_in(&temp), Arc::clone(&fetcher) as _, 7200);

    // t=3600
    coordinator.install_entry(backdated_entry(5, 3600, 7200));
    assert_eq!(coordinator.age_seconds(), Some(3600));
    assert!(coordinator.is_valid());
    assert_eq!(coordinator.server_count(), 5);

    // t=7300
    coordinator.install_entry(backdated_entry(5, 7300, 7200));
    assert!(!coordinator.is_valid());
    assert_eq!(coordinator.server_count(), 5);

    // refresh with 8 servers
    fetcher.set_count(8);
    assert_eq!(coordinator.refresh().await.expect("refresh"), 8);
    assert_eq!(coordinator.server_count(), 8);
    assert_eq!(coordinator.age_seconds(), Some(0));
    assert!(coordinator.is_valid());
}
