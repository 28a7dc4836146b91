//! # Sync Configuration
//!
//! Configuration management for the sync engine.
//!
//! ## Configuration Sources
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Configuration Priority                               │
//! │                                                                         │
//! │  1. Environment Variables (highest priority)                           │
//! │     SIMPLESS_CATALOG_URL=https://example.com/products                  │
//! │     SIMPLESS_DB_PATH=/var/lib/simpless/cache.db                        │
//! │                                                                         │
//! │  2. TOML Config File                                                   │
//! │     ~/.config/simpless/sync.toml (Linux)                               │
//! │     ~/Library/Application Support/com.simpless.simpless/sync.toml      │
//! │                                                                         │
//! │  3. Default Values (lowest priority)                                   │
//! │     fakestoreapi.com catalog, probe derived from the catalog host      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Configuration File Format
//! ```toml
//! # sync.toml
//! [catalog]
//! url = "https://fakestoreapi.com/products"
//! request_timeout_secs = 30
//!
//! [connectivity]
//! # probe_host / probe_port default to the catalog URL's host and port
//! probe_host = "fakestoreapi.com"
//! probe_port = 443
//! poll_interval_secs = 5
//! probe_timeout_ms = 3000
//!
//! [cache]
//! database_path = "/home/me/.local/share/simpless/cache.db"
//! ```

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use tracing::{debug, info, warn};
use url::Url;

use crate::error::{SyncError, SyncResult};

/// Catalog endpoint used when nothing else is configured.
pub const DEFAULT_CATALOG_URL: &str = "https://fakestoreapi.com/products";

/// Database file name inside the platform data directory.
const DEFAULT_DB_FILE: &str = "cache.db";

// =============================================================================
// Catalog Settings
// =============================================================================

/// Where the product catalog lives and how long to wait for it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogSettings {
    /// HTTP(S) endpoint returning a JSON array of products.
    #[serde(default = "default_catalog_url")]
    pub url: String,

    /// Whole-request timeout (seconds).
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

fn default_catalog_url() -> String {
    DEFAULT_CATALOG_URL.to_string()
}

fn default_request_timeout() -> u64 {
    30
}

impl Default for CatalogSettings {
    fn default() -> Self {
        CatalogSettings {
            url: default_catalog_url(),
            request_timeout_secs: default_request_timeout(),
        }
    }
}

// =============================================================================
// Connectivity Settings
// =============================================================================

/// Reachability probe settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConnectivitySettings {
    /// Host to open a TCP connection to. Defaults to the catalog host.
    #[serde(default)]
    pub probe_host: Option<String>,

    /// Port for the probe. Defaults to the catalog URL's port.
    #[serde(default)]
    pub probe_port: Option<u16>,

    /// Interval between probes (seconds).
    #[serde(default = "default_poll_interval")]
    pub poll_interval_secs: u64,

    /// Timeout for a single probe (milliseconds).
    #[serde(default = "default_probe_timeout")]
    pub probe_timeout_ms: u64,
}

fn default_poll_interval() -> u64 {
    5
}

fn default_probe_timeout() -> u64 {
    3000
}

impl Default for ConnectivitySettings {
    fn default() -> Self {
        ConnectivitySettings {
            probe_host: None,
            probe_port: None,
            poll_interval_secs: default_poll_interval(),
            probe_timeout_ms: default_probe_timeout(),
        }
    }
}

// =============================================================================
// Cache Settings
// =============================================================================

/// Local product cache settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CacheSettings {
    /// SQLite file. Defaults to `cache.db` in the platform data directory.
    #[serde(default)]
    pub database_path: Option<PathBuf>,
}

// =============================================================================
// Main Sync Configuration
// =============================================================================

/// Complete sync configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SyncConfig {
    /// Remote catalog settings.
    #[serde(default)]
    pub catalog: CatalogSettings,

    /// Reachability probe settings.
    #[serde(default)]
    pub connectivity: ConnectivitySettings,

    /// Local cache settings.
    #[serde(default)]
    pub cache: CacheSettings,
}

impl SyncConfig {
    /// Creates a new config with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads configuration from file, environment, and defaults.
    ///
    /// ## Load Order (later overrides earlier)
    /// 1. Default values
    /// 2. Config file (sync.toml)
    /// 3. Environment variables
    pub fn load(config_path: Option<PathBuf>) -> SyncResult<Self> {
        let mut config = Self::default();

        if let Some(path) = config_path.or_else(Self::default_config_path) {
            if path.exists() {
                info!(?path, "Loading sync config from file");
                let contents = std::fs::read_to_string(&path)?;
                config = toml::from_str(&contents)?;
            } else {
                debug!(?path, "Config file not found, using defaults");
            }
        }

        config.apply_env_overrides();

        config.validate()?;

        Ok(config)
    }

    /// Loads config or returns default if load fails.
    pub fn load_or_default(config_path: Option<PathBuf>) -> Self {
        Self::load(config_path).unwrap_or_else(|e| {
            warn!("Failed to load sync config: {}. Using defaults.", e);
            Self::default()
        })
    }

    /// Saves configuration to file.
    pub fn save(&self, config_path: Option<PathBuf>) -> SyncResult<()> {
        let path = config_path
            .or_else(Self::default_config_path)
            .ok_or_else(|| SyncError::ConfigSaveFailed("No config path available".into()))?;

        let save_failed = |e: std::io::Error| {
            SyncError::ConfigSaveFailed(format!("{}: {e}", path.display()))
        };

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(save_failed)?;
        }

        let contents = toml::to_string_pretty(self)?;
        std::fs::write(&path, contents).map_err(save_failed)?;

        info!(?path, "Sync config saved");
        Ok(())
    }

    /// Validates the configuration.
    pub fn validate(&self) -> SyncResult<()> {
        let url = self.catalog_url()?;
        if url.scheme() != "http" && url.scheme() != "https" {
            return Err(SyncError::InvalidUrl(format!(
                "Catalog URL must start with http:// or https://, got: {}",
                self.catalog.url
            )));
        }
        if url.host_str().is_none() {
            return Err(SyncError::InvalidUrl(format!(
                "Catalog URL has no host: {}",
                self.catalog.url
            )));
        }

        if self.catalog.request_timeout_secs == 0 {
            return Err(SyncError::InvalidConfig(
                "request_timeout_secs must be greater than 0".into(),
            ));
        }
        if self.connectivity.poll_interval_secs == 0 {
            return Err(SyncError::InvalidConfig(
                "poll_interval_secs must be greater than 0".into(),
            ));
        }
        if self.connectivity.probe_timeout_ms == 0 {
            return Err(SyncError::InvalidConfig(
                "probe_timeout_ms must be greater than 0".into(),
            ));
        }
        if let Some(host) = &self.connectivity.probe_host {
            if host.trim().is_empty() {
                return Err(SyncError::InvalidConfig("probe_host must not be empty".into()));
            }
        }

        Ok(())
    }

    /// Applies environment variable overrides.
    fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    /// Applies overrides from any key lookup. Unparseable numbers are
    /// ignored with a warning.
    fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(url) = lookup("SIMPLESS_CATALOG_URL") {
            debug!(url = %url, "Overriding catalog URL from environment");
            self.catalog.url = url;
        }

        if let Some(timeout) = lookup("SIMPLESS_REQUEST_TIMEOUT") {
            match timeout.parse::<u64>() {
                Ok(secs) => self.catalog.request_timeout_secs = secs,
                Err(_) => warn!(value = %timeout, "Ignoring invalid SIMPLESS_REQUEST_TIMEOUT"),
            }
        }

        if let Some(host) = lookup("SIMPLESS_PROBE_HOST") {
            debug!(host = %host, "Overriding probe host from environment");
            self.connectivity.probe_host = Some(host);
        }

        if let Some(interval) = lookup("SIMPLESS_POLL_INTERVAL") {
            match interval.parse::<u64>() {
                Ok(secs) => self.connectivity.poll_interval_secs = secs,
                Err(_) => warn!(value = %interval, "Ignoring invalid SIMPLESS_POLL_INTERVAL"),
            }
        }

        if let Some(path) = lookup("SIMPLESS_DB_PATH") {
            debug!(path = %path, "Overriding database path from environment");
            self.cache.database_path = Some(PathBuf::from(path));
        }
    }

    fn project_dirs() -> Option<directories::ProjectDirs> {
        directories::ProjectDirs::from("com", "simpless", "simpless")
    }

    /// Returns the default config file path.
    pub fn default_config_path() -> Option<PathBuf> {
        Self::project_dirs().map(|dirs| dirs.config_dir().join("sync.toml"))
    }

    // =========================================================================
    // Convenience Methods
    // =========================================================================

    /// Parsed catalog URL.
    pub fn catalog_url(&self) -> SyncResult<Url> {
        Ok(Url::parse(&self.catalog.url)?)
    }

    /// Whole-request timeout for the catalog fetch.
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.catalog.request_timeout_secs)
    }

    /// Interval between reachability probes.
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.connectivity.poll_interval_secs)
    }

    /// Timeout for one reachability probe.
    pub fn probe_timeout(&self) -> Duration {
        Duration::from_millis(self.connectivity.probe_timeout_ms)
    }

    /// `(host, port)` the reachability probe connects to.
    ///
    /// Missing pieces are taken from the catalog URL.
    pub fn probe_target(&self) -> SyncResult<(String, u16)> {
        let url = self.catalog_url()?;

        let host = match &self.connectivity.probe_host {
            Some(host) => host.clone(),
            None => url
                .host_str()
                .ok_or_else(|| SyncError::InvalidUrl("Catalog URL has no host".into()))?
                .to_string(),
        };
        let port = match self.connectivity.probe_port {
            Some(port) => port,
            None => url.port_or_known_default().ok_or_else(|| {
                SyncError::InvalidUrl("Catalog URL has no known port".into())
            })?,
        };

        Ok((host, port))
    }

    /// Resolved SQLite file for the product cache.
    ///
    /// Falls back to the working directory when the platform has no
    /// data directory.
    pub fn database_path(&self) -> PathBuf {
        if let Some(path) = &self.cache.database_path {
            return path.clone();
        }
        Self::project_dirs()
            .map(|dirs| dirs.data_dir().join(DEFAULT_DB_FILE))
            .unwrap_or_else(|| PathBuf::from(DEFAULT_DB_FILE))
    }
}
