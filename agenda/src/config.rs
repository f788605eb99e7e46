//! Agenda configuration
//!
//! Loaded from TOML; every field has a default so an empty file is valid.
//! `AGENDA_*` environment variables override file values.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Floor for `decision.min_reason_length`
pub const MIN_REASON_LENGTH: usize = 10;

/// Error type for configuration loading
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid value for {key}: {message}")]
    Invalid { key: &'static str, message: String },
}

/// Top-level configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AgendaConfig {
    #[serde(default)]
    pub decision: DecisionConfig,
    #[serde(default)]
    pub queries: QueryConfig,
    #[serde(default)]
    pub notifications: NotificationConfig,
    #[serde(default)]
    pub store: StoreConfig,
}

/// Decision validation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecisionConfig {
    /// Minimum reason length in characters, after trimming
    #[serde(default = "default_min_reason_length")]
    pub min_reason_length: usize,
}

impl Default for DecisionConfig {
    fn default() -> Self {
        Self {
            min_reason_length: default_min_reason_length(),
        }
    }
}

/// Page sizes for the expired-escalation queries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryConfig {
    #[serde(default = "default_history_limit")]
    pub history_limit: usize,
    #[serde(default = "default_pending_limit")]
    pub pending_limit: usize,
    /// Requested limits are clamped to this
    #[serde(default = "default_max_limit")]
    pub max_limit: usize,
}

impl Default for QueryConfig {
    fn default() -> Self {
        Self {
            history_limit: default_history_limit(),
            pending_limit: default_pending_limit(),
            max_limit: default_max_limit(),
        }
    }
}

impl QueryConfig {
    /// Effective page size for a requested limit, never below 1.
    pub fn clamp(&self, requested: Option<usize>, default: usize) -> usize {
        requested.unwrap_or(default).clamp(1, self.max_limit.max(1))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NotificationConfig {
    /// Broadcast channel capacity
    #[serde(default = "default_channel_capacity")]
    pub channel_capacity: usize,
}

impl Default for NotificationConfig {
    fn default() -> Self {
        Self {
            channel_capacity: default_channel_capacity(),
        }
    }
}

/// Where state lives. Both unset means in-memory only.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StoreConfig {
    /// JSON snapshot for the in-memory store
    #[serde(default)]
    pub snapshot_path: Option<PathBuf>,
    /// RocksDB directory (requires the `rocksdb-store` feature)
    #[serde(default)]
    pub rocksdb_path: Option<PathBuf>,
}

fn default_min_reason_length() -> usize {
    MIN_REASON_LENGTH
}

fn default_history_limit() -> usize {
    50
}

fn default_pending_limit() -> usize {
    20
}

fn default_max_limit() -> usize {
    200
}

fn default_channel_capacity() -> usize {
    256
}

impl AgendaConfig {
    /// Load from a TOML file, apply env overrides, validate.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::from_toml(&content)?.with_env_overrides()?;
        config.validate()?;
        Ok(config)
    }

    /// Parse and validate TOML content. No env overrides.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Apply `AGENDA_*` environment overrides.
    pub fn with_env_overrides(mut self) -> Result<Self, ConfigError> {
        if let Some(v) = env_usize("AGENDA_MIN_REASON_LENGTH")? {
            self.decision.min_reason_length = v;
        }
        if let Some(v) = env_usize("AGENDA_HISTORY_LIMIT")? {
            self.queries.history_limit = v;
        }
        if let Some(v) = env_usize("AGENDA_PENDING_LIMIT")? {
            self.queries.pending_limit = v;
        }
        if let Some(v) = env_usize("AGENDA_MAX_LIMIT")? {
            self.queries.max_limit = v;
        }
        if let Some(v) = env_usize("AGENDA_CHANNEL_CAPACITY")? {
            self.notifications.channel_capacity = v;
        }
        if let Ok(path) = std::env::var("AGENDA_SNAPSHOT_PATH") {
            self.store.snapshot_path = Some(PathBuf::from(path));
        }
        if let Ok(path) = std::env::var("AGENDA_ROCKSDB_PATH") {
            self.store.rocksdb_path = Some(PathBuf::from(path));
        }
        Ok(self)
    }

    /// Reject values the engine and resolver cannot honour.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.decision.min_reason_length < MIN_REASON_LENGTH {
            return Err(ConfigError::Invalid {
                key: "decision.min_reason_length",
                message: format!("must be at least {}", MIN_REASON_LENGTH),
            });
        }
        if self.queries.max_limit == 0 {
            return Err(ConfigError::Invalid {
                key: "queries.max_limit",
                message: "must be at least 1".into(),
            });
        }
        if self.notifications.channel_capacity == 0 {
            return Err(ConfigError::Invalid {
                key: "notifications.channel_capacity",
                message: "must be at least 1".into(),
            });
        }
        if self.store.snapshot_path.is_some() && self.store.rocksdb_path.is_some() {
            return Err(ConfigError::Invalid {
                key: "store",
                message: "set snapshot_path or rocksdb_path, not both".into(),
            });
        }
        Ok(())
    }
}

fn env_usize(key: &'static str) -> Result<Option<usize>, ConfigError> {
    match std::env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|e: std::num::ParseIntError| ConfigError::Invalid {
                key,
                message: e.to_string(),
            }),
        Err(_) => Ok(None),
    }
}
