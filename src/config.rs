//! Engine configuration.
//!
//! A [`SyncConfig`] is constructed once at startup and passed explicitly to
//! the remote adapter, engine, and scheduler; there are no module-level
//! singletons. Lifecycle is app startup to shutdown, one instance per
//! process.

use std::path::{Path, PathBuf};
use std::time::Duration;

use thiserror::Error;

/// Default server URL
const DEFAULT_SERVER_URL: &str = "https://api.lexio.app";

/// Sync engine configuration.
#[derive(Debug, Clone)]
pub struct SyncConfig {
    server_url: String,
    token: Option<String>,
    data_dir: Option<PathBuf>,
    /// Periodic sync interval while foregrounded and online
    pub sync_interval: Duration,
    /// Delay between process start and the first sync attempt
    pub startup_delay: Duration,
    /// Delay between a queue drain and the full sync that follows a
    /// connectivity-restored edge
    pub reconnect_delay: Duration,
    /// Interval between active connectivity probes
    pub probe_interval: Duration,
}

impl Default for SyncConfig {
    fn default() -> Self {
        let server_url =
            std::env::var("LEXIO_API_URL").unwrap_or_else(|_| DEFAULT_SERVER_URL.to_string());
        Self {
            server_url,
            token: None,
            data_dir: None,
            sync_interval: Duration::from_secs(5 * 60),
            startup_delay: Duration::from_secs(3),
            reconnect_delay: Duration::from_secs(2),
            probe_interval: Duration::from_secs(30),
        }
    }
}

impl SyncConfig {
    /// Create a configuration with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a new SyncConfigBuilder
    pub fn builder() -> SyncConfigBuilder {
        SyncConfigBuilder::default()
    }

    /// Get the session token
    pub fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }

    pub fn server_url(&self) -> &str {
        &self.server_url
    }

    /// Get the full URL for an API endpoint
    pub fn api_url(&self, path: &str) -> String {
        format!("{}{}", self.server_url.trim_end_matches('/'), path)
    }

    /// Path of the local sync database.
    ///
    /// Uses the configured data directory when set, otherwise the
    /// platform-specific data directory.
    pub fn db_path(&self) -> PathBuf {
        let mut path = self
            .data_dir
            .clone()
            .or_else(dirs::data_dir)
            .unwrap_or_else(std::env::temp_dir);
        path.push("lexio");
        path.push("sync.db");
        path
    }
}

/// Builder for SyncConfig
#[derive(Debug, Default)]
pub struct SyncConfigBuilder {
    server_url: Option<String>,
    token: Option<String>,
    data_dir: Option<PathBuf>,
    sync_interval: Option<Duration>,
    startup_delay: Option<Duration>,
    reconnect_delay: Option<Duration>,
    probe_interval: Option<Duration>,
}

impl SyncConfigBuilder {
    /// Set the server URL
    pub fn server_url(mut self, url: String) -> Self {
        self.server_url = Some(url);
        self
    }

    /// Set the session token
    pub fn token(mut self, token: String) -> Self {
        self.token = Some(token);
        self
    }

    /// Set the directory holding the local sync database
    pub fn data_dir(mut self, dir: impl AsRef<Path>) -> Self {
        self.data_dir = Some(dir.as_ref().to_path_buf());
        self
    }

    pub fn sync_interval(mut self, interval: Duration) -> Self {
        self.sync_interval = Some(interval);
        self
    }

    pub fn startup_delay(mut self, delay: Duration) -> Self {
        self.startup_delay = Some(delay);
        self
    }

    pub fn reconnect_delay(mut self, delay: Duration) -> Self {
        self.reconnect_delay = Some(delay);
        self
    }

    pub fn probe_interval(mut self, interval: Duration) -> Self {
        self.probe_interval = Some(interval);
        self
    }

    /// Build the configuration
    pub fn build(self) -> Result<SyncConfig, ConfigError> {
        let defaults = SyncConfig::default();
        let server_url = self.server_url.unwrap_or(defaults.server_url);
        if !server_url.starts_with("http://") && !server_url.starts_with("https://") {
            return Err(ConfigError::InvalidUrl(server_url));
        }

        Ok(SyncConfig {
            server_url,
            token: self.token,
            data_dir: self.data_dir,
            sync_interval: self.sync_interval.unwrap_or(defaults.sync_interval),
            startup_delay: self.startup_delay.unwrap_or(defaults.startup_delay),
            reconnect_delay: self.reconnect_delay.unwrap_or(defaults.reconnect_delay),
            probe_interval: self.probe_interval.unwrap_or(defaults.probe_interval),
        })
    }
}

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid URL: {0}")]
    InvalidUrl(String),
    #[error("missing value: {0}")]
    MissingValue(&'static str),
}
