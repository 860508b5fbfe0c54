//! Engine configuration.
//!
//! Settings are read from a TOML file. Every key is optional; missing keys
//! fall back to the defaults documented on each field.

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

/// Environment variable naming the configuration file.
pub const CONFIG_PATH_ENV: &str = "TASKPULSE_CONFIG";

/// Errors raised while loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The configuration file could not be read.
    #[error("failed to read config file {path}: {source}")]
    Read {
        /// Path that was read.
        path: String,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// The file is not valid TOML for [`EngineConfig`].
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    /// A value parsed but is out of range.
    #[error("invalid config value for `{key}`: {reason}")]
    Invalid {
        /// Offending key.
        key: &'static str,
        /// Why the value was rejected.
        reason: String,
    },
}

/// Runtime configuration for the task and notification engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Seconds between deadline scans. Defaults to one hour.
    pub scan_interval_secs: u64,
    /// Timeout in milliseconds for best-effort notifier and directory calls.
    pub notifier_timeout_ms: u64,
    /// How many times a status or metadata update re-reads the task after a
    /// version conflict before giving up.
    pub transition_retries: u32,
    /// Page size used when a notification listing does not specify one.
    pub default_page_size: usize,
    /// Per-recipient buffer of the realtime fanout channel.
    pub fanout_capacity: usize,
    /// `PostgreSQL` connection string used by the daemon.
    pub database_url: Option<String>,
    /// Endpoint receiving cross-service task change events, if any.
    pub event_sink_url: Option<String>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            scan_interval_secs: 3600,
            notifier_timeout_ms: 2000,
            transition_retries: 3,
            default_page_size: 50,
            fanout_capacity: 64,
            database_url: None,
            event_sink_url: None,
        }
    }
}

impl EngineConfig {
    /// Parses configuration from TOML text.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] for malformed TOML and
    /// [`ConfigError::Invalid`] for out-of-range values.
    pub fn from_toml_str(raw: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    /// Reads configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Read`] when the file cannot be read, otherwise
    /// the same errors as [`Self::from_toml_str`].
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml_str(&raw)
    }

    /// Loads the file named by [`CONFIG_PATH_ENV`], or defaults when unset.
    ///
    /// # Errors
    ///
    /// Propagates errors from [`Self::load`].
    pub fn from_env() -> Result<Self, ConfigError> {
        match std::env::var_os(CONFIG_PATH_ENV) {
            Some(path) => Self::load(Path::new(&path)),
            None => Ok(Self::default()),
        }
    }

    /// Checks value ranges.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] naming the first offending key.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.scan_interval_secs == 0 {
            return Err(ConfigError::Invalid {
                key: "scan_interval_secs",
                reason: "must be greater than zero".to_owned(),
            });
        }
        if self.default_page_size == 0 {
            return Err(ConfigError::Invalid {
                key: "default_page_size",
                reason: "must be greater than zero".to_owned(),
            });
        }
        if self.fanout_capacity == 0 {
            return Err(ConfigError::Invalid {
                key: "fanout_capacity",
                reason: "must be greater than zero".to_owned(),
            });
        }
        Ok(())
    }

    /// Returns the scan interval as a [`Duration`].
    #[must_use]
    pub const fn scan_interval(&self) -> Duration {
        Duration::from_secs(self.scan_interval_secs)
    }

    /// Returns the best-effort call timeout as a [`Duration`].
    #[must_use]
    pub const fn notifier_timeout(&self) -> Duration {
        Duration::from_millis(self.notifier_timeout_ms)
    }
}
