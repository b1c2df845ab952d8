//! Service configuration and on-disk storage layout
//!
//! Directories and cache timing are fixed at process startup and read-only
//! afterwards; the rest of the service borrows them through
//! [`ServiceConfig`].

use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::ProjectDirs;

/// Default time-to-live for a cached server list (2 hours)
pub const DEFAULT_TTL_SECS: u64 = 7200;

/// Default lead time before expiry at which the scheduler refreshes
pub const DEFAULT_REFRESH_LEAD_SECS: u64 = 300;

/// Default delay between retries after a failed scheduled refresh
pub const DEFAULT_RETRY_BACKOFF_SECS: u64 = 60;

/// Fixed directory layout for all persisted state
///
/// `data` holds config, the pending order queue and purchase history;
/// `cache` holds the server-list snapshot; `logs` holds the rolling log
/// file. Only presence of the sibling files is tracked by this service —
/// their contents belong to other parts of the backend.
#[derive(Debug, Clone)]
pub struct StorageLayout {
    /// Directory for config, queue and history files
    pub data_dir: PathBuf,
    /// Directory for the server-list cache snapshot
    pub cache_dir: PathBuf,
    /// Directory for log files
    pub logs_dir: PathBuf,
}

impl StorageLayout {
    /// Creates a layout rooted at explicit directories
    pub fn new(data_dir: PathBuf, cache_dir: PathBuf, logs_dir: PathBuf) -> Self {
        Self {
            data_dir,
            cache_dir,
            logs_dir,
        }
    }

    /// Creates a layout under XDG-style project directories
    ///
    /// Uses `~/.local/share/invory`, `~/.cache/invory` and a `logs`
    /// subdirectory of the data dir on Linux, or the platform equivalents.
    /// Returns `None` if no home directory can be determined.
    pub fn from_project_dirs() -> Option<Self> {
        let project_dirs = ProjectDirs::from("", "", "invory")?;
        let data_dir = project_dirs.data_dir().to_path_buf();
        Some(Self {
            logs_dir: data_dir.join("logs"),
            cache_dir: project_dirs.cache_dir().to_path_buf(),
            data_dir,
        })
    }

    /// Path of the persisted server-list snapshot
    pub fn snapshot_path(&self) -> PathBuf {
        self.cache_dir.join("servers.json")
    }

    /// Path of the backend config file (presence tracked only)
    pub fn config_path(&self) -> PathBuf {
        self.data_dir.join("config.json")
    }

    /// Path of the pending order queue (presence tracked only)
    pub fn queue_path(&self) -> PathBuf {
        self.data_dir.join("queue.json")
    }

    /// Path of the purchase history (presence tracked only)
    pub fn history_path(&self) -> PathBuf {
        self.data_dir.join("history.json")
    }

    /// Path of the rolling application log (presence tracked only)
    pub fn log_path(&self) -> PathBuf {
        self.logs_dir.join("app.log")
    }

    /// Creates the three root directories if they are missing
    pub fn ensure_dirs(&self) -> std::io::Result<()> {
        std::fs::create_dir_all(&self.data_dir)?;
        std::fs::create_dir_all(&self.cache_dir)?;
        std::fs::create_dir_all(&self.logs_dir)
    }
}

/// Complete runtime configuration for the cache service
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    /// On-disk layout for snapshot and sibling state files
    pub storage: StorageLayout,
    /// How long a fetched server list stays valid
    pub ttl: Duration,
    /// How long before expiry the scheduler proactively refreshes
    pub refresh_lead: Duration,
    /// Delay between retries after a failed scheduled refresh
    pub retry_backoff: Duration,
}

impl ServiceConfig {
    /// Creates a config with default timings rooted at the given layout
    pub fn new(storage: StorageLayout) -> Self {
        Self {
            storage,
            ttl: Duration::from_secs(DEFAULT_TTL_SECS),
            refresh_lead: Duration::from_secs(DEFAULT_REFRESH_LEAD_SECS),
            retry_backoff: Duration::from_secs(DEFAULT_RETRY_BACKOFF_SECS),
        }
    }

    /// The TTL in whole seconds, as reported over the wire
    pub fn ttl_seconds(&self) -> u64 {
        self.ttl.as_secs()
    }

    /// Lead time clamped so it never exceeds the TTL
    ///
    /// With a pathological lead >= ttl the scheduler would fire
    /// immediately forever; clamping makes it fire at expiry instead.
    pub fn effective_refresh_lead(&self) -> Duration {
        self.refresh_lead.min(self.ttl)
    }
}

/// Returns whether a file exists at the given path
///
/// Cheap existence probe used by the reporting snapshot; any error
/// (permissions, dangling symlink) counts as absent.
pub fn file_present(path: &Path) -> bool {
    path.is_file()
}
