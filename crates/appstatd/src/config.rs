//! appstatd configuration: defaults, TOML file, and CLI overrides.
//!
//! Precedence is CLI flag > config file > built-in default.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;

use appstat_metrics::{MetricSchema, SchemaError, DEFAULT_PREFIX};

pub const DEFAULT_PORT: u16 = 8082;
pub const DEFAULT_RESYNC_SECS: u64 = 30;
pub const DEFAULT_LOG_LEVEL: &str = "info";

const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("port must be non-zero")]
    InvalidPort,

    #[error("metrics path {0:?} must be '/' or '/'-separated segments of [A-Za-z0-9._~-]")]
    InvalidPath(String),

    #[error("resync interval must be at least one second")]
    InvalidInterval,

    #[error("unknown log level {0:?}, expected one of trace|debug|info|warn|error")]
    InvalidLogLevel(String),

    #[error(transparent)]
    Schema(#[from] SchemaError),
}

/// Partial settings, as read from a file or collected from CLI flags.
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields, rename_all = "kebab-case")]
pub struct Settings {
    pub port: Option<u16>,
    pub metrics_path: Option<String>,
    pub data_dir: Option<PathBuf>,
    pub manifests_dir: Option<PathBuf>,
    pub resync_interval: Option<u64>,
    pub metric_prefix: Option<String>,
    pub loglevel: Option<String>,
}

impl Settings {
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(toml::from_str(&content)?)
    }

    /// Layer `over` on top of `self`; set fields in `over` win.
    pub fn merge(self, over: Settings) -> Settings {
        Settings {
            port: over.port.or(self.port),
            metrics_path: over.metrics_path.or(self.metrics_path),
            data_dir: over.data_dir.or(self.data_dir),
            manifests_dir: over.manifests_dir.or(self.manifests_dir),
            resync_interval: over.resync_interval.or(self.resync_interval),
            metric_prefix: over.metric_prefix.or(self.metric_prefix),
            loglevel: over.loglevel.or(self.loglevel),
        }
    }
}

/// Fully resolved and validated daemon configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct ExporterConfig {
    pub port: u16,
    pub metrics_path: String,
    /// redb file location; `None` keeps the store in memory.
    pub data_dir: Option<PathBuf>,
    pub manifests_dir: Option<PathBuf>,
    pub resync_interval: Duration,
    pub metric_prefix: String,
    pub log_level: String,
}

impl ExporterConfig {
    pub fn resolve(settings: Settings) -> Result<Self, ConfigError> {
        let port = settings.port.unwrap_or(DEFAULT_PORT);
        if port == 0 {
            return Err(ConfigError::InvalidPort);
        }

        let metrics_path = settings
            .metrics_path
            .unwrap_or_else(|| appstat_api::DEFAULT_METRICS_PATH.to_string());
        if !is_plain_path(&metrics_path) {
            return Err(ConfigError::InvalidPath(metrics_path));
        }

        let resync_secs = settings.resync_interval.unwrap_or(DEFAULT_RESYNC_SECS);
        if resync_secs == 0 {
            return Err(ConfigError::InvalidInterval);
        }

        let log_level = settings
            .loglevel
            .unwrap_or_else(|| DEFAULT_LOG_LEVEL.to_string())
            .to_ascii_lowercase();
        if !LOG_LEVELS.contains(&log_level.as_str()) {
            return Err(ConfigError::InvalidLogLevel(log_level));
        }

        let metric_prefix = settings
            .metric_prefix
            .unwrap_or_else(|| DEFAULT_PREFIX.to_string());
        // Reject a bad prefix here rather than at first scrape.
        MetricSchema::new(&metric_prefix)?;

        Ok(Self {
            port,
            metrics_path,
            data_dir: settings.data_dir,
            manifests_dir: settings.manifests_dir,
            resync_interval: Duration::from_secs(resync_secs),
            metric_prefix,
            log_level,
        })
    }

    pub fn schema(&self) -> Result<MetricSchema, SchemaError> {
        MetricSchema::new(&self.metric_prefix)
    }

    /// False when the store is in memory and nothing feeds it.
    pub fn has_application_source(&self) -> bool {
        self.data_dir.is_some() || self.manifests_dir.is_some()
    }
}

/// `/`, or non-empty segments of unreserved characters. The router treats
/// `{..}` and `*` as captures, so those never get through.
fn is_plain_path(path: &str) -> bool {
    if path == "/" {
        return true;
    }
    path.strip_prefix('/').is_some_and(|rest| {
        rest.split('/').all(|segment| {
            !segment.is_empty()
                && segment
                    .chars()
                    .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '.' | '_' | '~'))
        })
    })
}
