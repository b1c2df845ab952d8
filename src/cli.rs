//! Command-line interface parsing for the cache service
//!
//! This module handles parsing of CLI arguments using clap and turns them
//! into the [`ServiceConfig`] the rest of the service runs on.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use thiserror::Error;

use crate::config::{
    ServiceConfig, StorageLayout, DEFAULT_REFRESH_LEAD_SECS, DEFAULT_RETRY_BACKOFF_SECS,
    DEFAULT_TTL_SECS,
};

/// Error types for CLI argument handling
#[derive(Debug, Error)]
pub enum CliError {
    /// No storage directories given and no home directory to derive them from
    #[error("no storage directories specified and no home directory found; pass --data-dir, --cache-dir and --logs-dir")]
    NoStorageDirs,

    /// TTL must leave room for at least one refresh cycle
    #[error("invalid ttl: must be greater than zero")]
    ZeroTtl,
}

/// Server-inventory cache service with a monitoring API
#[derive(Parser, Debug)]
#[command(name = "invory")]
#[command(about = "Dual-tier TTL cache for upstream server inventory")]
#[command(version)]
pub struct Cli {
    /// Address the monitoring API listens on
    #[arg(long, default_value = "127.0.0.1:19998")]
    pub listen: SocketAddr,

    /// Shared secret expected in the X-API-Key header
    #[arg(long, env = "INVORY_API_KEY")]
    pub api_key: String,

    /// Upstream server catalog URL
    #[arg(long, env = "INVORY_CATALOG_URL")]
    pub catalog_url: String,

    /// Directory for config, queue and history files
    #[arg(long, value_name = "DIR")]
    pub data_dir: Option<PathBuf>,

    /// Directory for the server-list cache snapshot
    #[arg(long, value_name = "DIR")]
    pub cache_dir: Option<PathBuf>,

    /// Directory for log files
    #[arg(long, value_name = "DIR")]
    pub logs_dir: Option<PathBuf>,

    /// Cache time-to-live in seconds
    #[arg(long, default_value_t = DEFAULT_TTL_SECS)]
    pub ttl_secs: u64,

    /// How many seconds before expiry the background refresh fires
    #[arg(long, default_value_t = DEFAULT_REFRESH_LEAD_SECS)]
    pub refresh_lead_secs: u64,

    /// Seconds between retries after a failed scheduled refresh
    #[arg(long, default_value_t = DEFAULT_RETRY_BACKOFF_SECS)]
    pub retry_backoff_secs: u64,

    /// Skip the immediate refresh on startup
    #[arg(long)]
    pub no_initial_refresh: bool,
}

impl Cli {
    /// Builds the runtime configuration from parsed arguments
    ///
    /// Directories not given explicitly fall back to the platform's
    /// project directories; mixing explicit and derived dirs is allowed.
    pub fn service_config(&self) -> Result<ServiceConfig, CliError> {
        if self.ttl_secs == 0 {
            return Err(CliError::ZeroTtl);
        }

        let storage = match (&self.data_dir, &self.cache_dir, &self.logs_dir) {
            (Some(data), Some(cache), Some(logs)) => {
                StorageLayout::new(data.clone(), cache.clone(), logs.clone())
            }
            _ => {
                let defaults =
                    StorageLayout::from_project_dirs().ok_or(CliError::NoStorageDirs)?;
                StorageLayout::new(
                    self.data_dir.clone().unwrap_or(defaults.data_dir),
                    self.cache_dir.clone().unwrap_or(defaults.cache_dir),
                    self.logs_dir.clone().unwrap_or(defaults.logs_dir),
                )
            }
        };

        let mut config = ServiceConfig::new(storage);
        config.ttl = Duration::from_secs(self.ttl_secs);
        config.refresh_lead = Duration::from_secs(self.refresh_lead_secs);
        config.retry_backoff = Duration::from_secs(self.retry_backoff_secs);
        Ok(config)
    }
}
