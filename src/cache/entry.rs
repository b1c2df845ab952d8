//! Cache entry and validity math
//!
//! A [`CacheEntry`] is the unit the whole subsystem trades in: the full
//! server list plus the timestamp of the fetch that produced it. Entries
//! are only ever replaced wholesale, never mutated field by field.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::data::ServerOffer;

/// A fetched server list with its freshness metadata
///
/// This is also the persisted snapshot shape — the on-disk file is exactly
/// this struct serialized as JSON.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheEntry {
    /// The cached server list
    pub servers: Vec<ServerOffer>,
    /// When the list was fetched
    pub created_at: DateTime<Utc>,
    /// How long the list stays valid, in seconds
    pub ttl_seconds: u64,
}

impl CacheEntry {
    /// Creates an entry stamped with the current time
    pub fn new(servers: Vec<ServerOffer>, ttl_seconds: u64) -> Self {
        Self {
            servers,
            created_at: Utc::now(),
            ttl_seconds,
        }
    }

    /// Age of the entry at `now`, in whole seconds (never negative)
    pub fn age_seconds(&self, now: DateTime<Utc>) -> u64 {
        now.signed_duration_since(self.created_at)
            .num_seconds()
            .max(0) as u64
    }

    /// Whether the entry is still within its TTL at `now`
    pub fn is_valid(&self, now: DateTime<Utc>) -> bool {
        self.age_seconds(now) < self.ttl_seconds
    }

    /// Number of servers in the payload
    pub fn server_count(&self) -> usize {
        self.servers.len()
    }

    /// When the entry crosses from valid to stale
    pub fn expires_at(&self) -> DateTime<Utc> {
        self.created_at + Duration::seconds(self.ttl_seconds as i64)
    }
}
