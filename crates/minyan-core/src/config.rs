//! Configuration loading and typed config structures.
//!
//! The configuration lives in `minyan-config.yaml` next to the binary. Every
//! section is optional and falls back to the defaults below, so an empty
//! file (or no file) is a valid configuration.

use std::path::{Path, PathBuf};

use serde::Deserialize;

use minyan_ledger::{DEFAULT_MAX_AGE_HOURS, DEFAULT_STORAGE_KEY, RetentionPolicy};
use minyan_types::{ProximityConfig, SamplingPolicy};

/// Errors that can occur when loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read the configuration file from disk.
    #[error("failed to read config file: {source}")]
    Io {
        /// The underlying I/O error.
        #[from]
        source: std::io::Error,
    },

    /// Failed to parse YAML content.
    #[error("failed to parse config YAML: {source}")]
    Yaml {
        /// The underlying YAML parse error.
        source: serde_yml::Error,
    },
}

impl From<serde_yml::Error> for ConfigError {
    fn from(source: serde_yml::Error) -> Self {
        Self::Yaml { source }
    }
}

/// Top-level configuration, mirroring `minyan-config.yaml`.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct WatcherConfig {
    /// Proximity switch and radius.
    #[serde(default)]
    pub proximity: ProximityConfig,

    /// Location sampling thresholds.
    #[serde(default)]
    pub sampling: SamplingPolicy,

    /// Dedup ledger settings.
    #[serde(default)]
    pub ledger: LedgerConfig,

    /// Where the ledger is persisted.
    #[serde(default)]
    pub storage: StorageConfig,

    /// Remote event service.
    #[serde(default)]
    pub api: ApiConfig,

    /// Recorded location track fed to the watcher.
    #[serde(default)]
    pub replay: ReplayConfig,

    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl WatcherConfig {
    /// Load configuration from a YAML file at the given path.
    ///
    /// Environment variables override YAML values:
    /// - `MINYAN_API_URL` overrides `api.base_url`
    /// - `MINYAN_API_TOKEN` overrides `api.access_token`
    /// - `DRAGONFLY_URL` overrides `storage.dragonfly_url`
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] if the file cannot be read, or
    /// [`ConfigError::Yaml`] if the content is not valid YAML.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        let mut config = Self::parse(&contents)?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Parse configuration from a YAML string, without env overrides.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Yaml`] if the string is not valid YAML.
    pub fn parse(yaml: &str) -> Result<Self, ConfigError> {
        if yaml.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yml::from_str(yaml)?)
    }

    /// Apply the environment overrides documented on [`from_file`](Self::from_file).
    pub fn apply_env_overrides(&mut self) {
        if let Ok(val) = std::env::var("MINYAN_API_URL") {
            self.api.base_url = val;
        }
        if let Ok(val) = std::env::var("MINYAN_API_TOKEN") {
            self.api.access_token = Some(val);
        }
        if let Ok(val) = std::env::var("DRAGONFLY_URL") {
            self.storage.dragonfly_url = val;
        }
    }
}

/// Dedup ledger configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct LedgerConfig {
    /// Key under which the records are stored.
    #[serde(default = "default_storage_key")]
    pub storage_key: String,

    /// Hours a record is kept after its notification.
    #[serde(default = "default_retention_hours")]
    pub retention_hours: u32,
}

impl LedgerConfig {
    /// The retention rule described by this section.
    pub fn retention(&self) -> RetentionPolicy {
        RetentionPolicy::from_hours(self.retention_hours)
    }
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            storage_key: default_storage_key(),
            retention_hours: default_retention_hours(),
        }
    }
}

/// Which key-value backend holds the ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StorageBackend {
    /// Keep records in memory only.
    Memory,
    /// One file per key under `storage.path`.
    #[default]
    File,
    /// `Dragonfly`/Redis at `storage.dragonfly_url`.
    Dragonfly,
}

/// Storage configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct StorageConfig {
    /// Selected backend.
    #[serde(default)]
    pub backend: StorageBackend,

    /// State directory for the file backend.
    #[serde(default = "default_state_path")]
    pub path: PathBuf,

    /// `Dragonfly` (Redis-compatible) connection URL.
    #[serde(default = "default_dragonfly_url")]
    pub dragonfly_url: String,

    /// Prefix prepended to every `Dragonfly` key.
    #[serde(default = "default_key_prefix")]
    pub key_prefix: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: StorageBackend::default(),
            path: default_state_path(),
            dragonfly_url: default_dragonfly_url(),
            key_prefix: default_key_prefix(),
        }
    }
}

/// Remote event service configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ApiConfig {
    /// Base URL, without trailing slash.
    #[serde(default = "default_api_url")]
    pub base_url: String,

    /// Bearer token sent with every request, if any.
    #[serde(default)]
    pub access_token: Option<String>,

    /// Per-request timeout in milliseconds.
    #[serde(default = "default_api_timeout_ms")]
    pub timeout_ms: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_api_url(),
            access_token: None,
            timeout_ms: default_api_timeout_ms(),
        }
    }
}

/// Recorded location track configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ReplayConfig {
    /// CSV file with one `latitude,longitude` pair per line.
    #[serde(default = "default_track_path")]
    pub track_path: PathBuf,

    /// Real-time milliseconds between two raw fixes of the track.
    #[serde(default = "default_replay_interval_ms")]
    pub interval_ms: u64,
}

impl Default for ReplayConfig {
    fn default() -> Self {
        Self {
            track_path: default_track_path(),
            interval_ms: default_replay_interval_ms(),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_storage_key() -> String {
    DEFAULT_STORAGE_KEY.to_owned()
}

const fn default_retention_hours() -> u32 {
    DEFAULT_MAX_AGE_HOURS
}

fn default_state_path() -> PathBuf {
    PathBuf::from(".minyan-state")
}

fn default_dragonfly_url() -> String {
    "redis://localhost:6379".to_owned()
}

fn default_key_prefix() -> String {
    "minyan:".to_owned()
}

fn default_api_url() -> String {
    "http://localhost:8080/api".to_owned()
}

const fn default_api_timeout_ms() -> u64 {
    10_000
}

fn default_track_path() -> PathBuf {
    PathBuf::from("minyan-track.csv")
}

const fn default_replay_interval_ms() -> u64 {
    1_000
}

fn default_log_level() -> String {
    "info".to_owned()
}
