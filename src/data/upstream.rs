//! Upstream inventory API client
//!
//! This module provides the reqwest-based [`InventoryFetcher`] used in
//! production. It fetches the provider's server catalog as JSON and maps
//! transport and decoding failures into [`FetchError`].

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;

use super::{FetchError, InventoryFetcher, ServerOffer};

/// Default timeout for a single catalog fetch
///
/// `Refresh` must surface a timeout error rather than hang, so the bound
/// is enforced here on every request.
const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_secs(30);

/// Client for fetching the server catalog from the upstream provider
#[derive(Debug, Clone)]
pub struct UpstreamClient {
    client: Client,
    catalog_url: String,
}

impl UpstreamClient {
    /// Create a new UpstreamClient for the given catalog URL
    ///
    /// Fails if the TLS backend cannot be initialized; the per-request
    /// timeout is not negotiable, so there is no untimed fallback client.
    ///
    /// # Arguments
    /// * `catalog_url` - Full URL of the provider's server catalog endpoint
    pub fn new(catalog_url: impl Into<String>) -> Result<Self, FetchError> {
        let client = Client::builder()
            .timeout(DEFAULT_FETCH_TIMEOUT)
            .build()
            .map_err(|e| FetchError::Request(e.to_string()))?;

        Ok(Self {
            client,
            catalog_url: catalog_url.into(),
        })
    }

    /// Create a new UpstreamClient with a custom HTTP client
    ///
    /// Useful when the caller wants to control timeouts or proxies.
    #[allow(dead_code)]
    pub fn with_client(client: Client, catalog_url: impl Into<String>) -> Self {
        Self {
            client,
            catalog_url: catalog_url.into(),
        }
    }
}

#[async_trait]
impl InventoryFetcher for UpstreamClient {
    async fn fetch(&self) -> Result<Vec<ServerOffer>, FetchError> {
        let response = self
            .client
            .get(&self.catalog_url)
            .send()
            .await
            .map_err(|e| FetchError::Request(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status(status.as_u16()));
        }

        let text = response
            .text()
            .await
            .map_err(|e| FetchError::Request(e.to_string()))?;

        serde_json::from_str(&text).map_err(|e| FetchError::Parse(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_yields_a_client_with_the_default_timeout() {
        let client = UpstreamClient::new("http://127.0.0.1:9/catalog");
        assert!(client.is_ok(), "builder failure must be surfaced, not hidden");
    }

    #[test]
    fn test_parse_error_for_malformed_catalog() {
        let result: Result<Vec<ServerOffer>, _> =
            serde_json::from_str("{\"not\": \"a list\"}")
                .map_err(|e: serde_json::Error| FetchError::Parse(e.to_string()));

        assert!(matches!(result, Err(FetchError::Parse(_))));
    }

    #[tokio::test]
    async fn test_fetch_unreachable_host_is_request_error() {
        // Port 9 (discard) on localhost is a safe dead end for tests.
        let client = UpstreamClient::with_client(
            Client::builder()
                .timeout(Duration::from_millis(200))
                .build()
                .expect("build client"),
            "http://127.0.0.1:9/catalog",
        );

        let result = client.fetch().await;
        assert!(matches!(result, Err(FetchError::Request(_))));
    }
}
