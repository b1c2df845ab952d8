//! Core data models for the server-inventory cache
//!
//! This module contains the server offer descriptors cached by the service
//! and the fetch seam through which fresh inventory is obtained from the
//! upstream provider.

pub mod upstream;

pub use upstream::UpstreamClient;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A single purchasable server offer as advertised by the upstream provider
///
/// The cache treats offers as opaque beyond count and identity; the fields
/// below mirror what the upstream catalog exposes so the dashboard can
/// render them without a second fetch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerOffer {
    /// Provider catalog code uniquely identifying the offer (e.g. "25skle01")
    pub plan_code: String,
    /// Human-readable name (e.g. "KS-2 | Intel Xeon-D 1540")
    pub name: String,
    /// CPU description
    pub cpu: String,
    /// Memory description
    pub memory: String,
    /// Storage description
    pub storage: String,
    /// Bandwidth description
    pub bandwidth: String,
    /// Monthly price text, if the catalog included one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price: Option<String>,
    /// Datacenters where the offer is currently listed
    #[serde(default)]
    pub datacenters: Vec<String>,
}

/// Errors that can occur while fetching inventory from the upstream provider
///
/// Variants carry rendered messages rather than source errors so the type
/// stays `Clone` — refresh results are fanned out to every caller waiting
/// on the same in-flight refresh.
#[derive(Debug, Clone, Error)]
pub enum FetchError {
    /// HTTP request failed or timed out
    #[error("upstream request failed: {0}")]
    Request(String),

    /// Upstream answered with a non-success status
    #[error("upstream returned status {0}")]
    Status(u16),

    /// Response body could not be parsed into a server list
    #[error("failed to parse upstream response: {0}")]
    Parse(String),
}

/// Source of fresh server inventory
///
/// The production implementation is [`UpstreamClient`]; tests substitute
/// stubs to drive refresh outcomes deterministically.
#[async_trait]
pub trait InventoryFetcher: Send + Sync {
    /// Fetches the current list of purchasable servers
    async fn fetch(&self) -> Result<Vec<ServerOffer>, FetchError>;
}
