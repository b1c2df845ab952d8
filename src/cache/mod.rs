//! Dual-tier server-inventory cache
//!
//! This module provides the TTL-bounded cache the monitoring API sits on:
//! an in-process tier for fast reads, a disk tier that survives restarts,
//! a coordinator tying the two together, and a background scheduler that
//! refreshes the inventory shortly before it expires. Stale entries keep
//! serving (flagged invalid) so a flaky upstream degrades gracefully
//! instead of blanking the dashboard.

mod coordinator;
mod entry;
mod info;
mod memory;
mod scheduler;
mod store;

pub use coordinator::{CacheCoordinator, CacheError, InvalidateScope};
pub use entry::CacheEntry;
pub use info::{BackendInfo, CacheSnapshot, InfoReporter, StorageFilesInfo, StorageInfo};
pub use memory::MemoryTier;
pub use scheduler::{RefreshScheduler, SchedulerConfig};
pub use store::{PersistentStore, StorageFlags, StoreError};
