//! # Gateway Configuration
//!
//! Unified configuration for the subsystems and the runtime.
//!
//! ## Sources
//!
//! 1. Defaults
//! 2. TOML file named by `TG_CONFIG`, if set
//! 3. `TG_*` environment variables
//!
//! Later sources win. The result is validated before anything is wired.
//!
//! ```toml
//! default_topic = "telemetry"
//! credentials_file = "devices.toml"
//!
//! [storage]
//! backend = "rocksdb"
//! data_dir = "/var/lib/telemetry-gateway"
//!
//! [ingestion]
//! worker_count = 32
//! key_rotation_grace_secs = 3600
//! ```

use gateway_telemetry::{LogFormat, TelemetryConfig};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tg_03_ingestion::{ConfigError as IngestionConfigError, IngestionConfig};
use thiserror::Error;

/// Environment variable naming the TOML config file.
pub const CONFIG_PATH_VAR: &str = "TG_CONFIG";

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read config file {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("invalid config file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("{var}={value:?} is not a valid value")]
    InvalidEnv { var: String, value: String },

    #[error(transparent)]
    Ingestion(#[from] IngestionConfigError),

    #[error("invalid {field}: {reason}")]
    Invalid { field: &'static str, reason: String },
}

/// Which `KeyValueStore` backs the event store and idempotency index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StorageBackend {
    #[default]
    Memory,
    Rocksdb,
}

impl FromStr for StorageBackend {
    type Err = ();

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "memory" => Ok(Self::Memory),
            "rocksdb" => Ok(Self::Rocksdb),
            _ => Err(()),
        }
    }
}

/// Storage configuration.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub backend: StorageBackend,
    /// Directory for the RocksDB database.
    pub data_dir: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: StorageBackend::Memory,
            data_dir: PathBuf::from("./data"),
        }
    }
}

/// Logging section of the file. Environment variables still win.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub log_level: Option<String>,
    pub log_format: Option<String>,
    pub metrics_enabled: Option<bool>,
}

/// Complete gateway configuration.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct GatewayConfig {
    pub ingestion: IngestionConfig,
    pub storage: StorageConfig,
    pub telemetry: LoggingConfig,
    /// Device credential file (TOML or JSON). Without one every device is
    /// unknown.
    pub credentials_file: Option<PathBuf>,
    /// JSON-lines dead letter file. Without one dead letters are kept in
    /// memory.
    pub dead_letter_path: Option<PathBuf>,
    /// Topic for transport lines that do not name one.
    pub default_topic: String,
    /// Seconds between idempotency pruning passes.
    pub prune_interval_secs: u64,
    /// Attempts the line transport makes before giving up on a requeued
    /// delivery.
    pub max_redeliveries: u32,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            ingestion: IngestionConfig::default(),
            storage: StorageConfig::default(),
            telemetry: LoggingConfig::default(),
            credentials_file: None,
            dead_letter_path: None,
            default_topic: "telemetry".to_string(),
            prune_interval_secs: 3600,
            max_redeliveries: 3,
        }
    }
}

impl GatewayConfig {
    /// Load from `TG_CONFIG` (if set) and the process environment.
    pub fn load() -> Result<Self, ConfigError> {
        let mut config = match std::env::var_os(CONFIG_PATH_VAR) {
            Some(path) => Self::from_file(Path::new(&path))?,
            None => Self::default(),
        };
        config.apply_env(|var| std::env::var(var).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Parse a TOML file. Missing keys keep their defaults.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&text)
    }

    pub fn from_toml(text: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(text)?)
    }

    /// Override settings from `TG_*` variables, read through `lookup`.
    pub fn apply_env(
        &mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<(), ConfigError> {
        if let Some(value) = lookup("TG_STORAGE_BACKEND") {
            self.storage.backend = value.parse().map_err(|()| ConfigError::InvalidEnv {
                var: "TG_STORAGE_BACKEND".to_string(),
                value,
            })?;
        }
        if let Some(dir) = lookup("TG_DATA_DIR") {
            self.storage.data_dir = PathBuf::from(dir);
        }
        if let Some(path) = lookup("TG_CREDENTIALS_FILE") {
            self.credentials_file = Some(PathBuf::from(path));
        }
        if let Some(path) = lookup("TG_DEAD_LETTER_PATH") {
            self.dead_letter_path = Some(PathBuf::from(path));
        }
        if let Some(topic) = lookup("TG_DEFAULT_TOPIC") {
            self.default_topic = topic;
        }

        let ingestion = &mut self.ingestion;
        parse_env(&lookup, "TG_PRUNE_INTERVAL_SECS", &mut self.prune_interval_secs)?;
        parse_env(&lookup, "TG_MAX_REDELIVERIES", &mut self.max_redeliveries)?;
        parse_env(&lookup, "TG_WORKER_COUNT", &mut ingestion.worker_count)?;
        parse_env(&lookup, "TG_STAGE_TIMEOUT_MS", &mut ingestion.stage_timeout_ms)?;
        parse_env(
            &lookup,
            "TG_KEY_ROTATION_GRACE_SECS",
            &mut ingestion.key_rotation_grace_secs,
        )?;
        parse_env(
            &lookup,
            "TG_CLOCK_SKEW_TOLERANCE_SECS",
            &mut ingestion.clock_skew_tolerance_secs,
        )?;
        parse_env(
            &lookup,
            "TG_IDEMPOTENCY_RETENTION_SECS",
            &mut ingestion.idempotency_retention_secs,
        )?;
        parse_env(&lookup, "TG_ALERT_THRESHOLD", &mut ingestion.alert_threshold)?;
        Ok(())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.ingestion.validate()?;
        if self.prune_interval_secs == 0 {
            return Err(ConfigError::Invalid {
                field: "prune_interval_secs",
                reason: "must be greater than zero".to_string(),
            });
        }
        if self.default_topic.trim().is_empty() {
            return Err(ConfigError::Invalid {
                field: "default_topic",
                reason: "must not be empty".to_string(),
            });
        }
        if self.storage.backend == StorageBackend::Rocksdb && !cfg!(feature = "rocksdb") {
            return Err(ConfigError::Invalid {
                field: "storage.backend",
                reason: "built without the rocksdb feature".to_string(),
            });
        }
        Ok(())
    }

    /// Telemetry settings: defaults, then the file, then the environment.
    pub fn telemetry_config(&self) -> TelemetryConfig {
        let mut telemetry = TelemetryConfig::default();
        if let Some(level) = &self.telemetry.log_level {
            telemetry.log_level = level.clone();
        }
        if let Some(format) = self.telemetry.log_format.as_deref().and_then(LogFormat::parse) {
            telemetry.log_format = format;
        }
        if let Some(enabled) = self.telemetry.metrics_enabled {
            telemetry.metrics_enabled = enabled;
        }
        telemetry.apply_env();
        telemetry
    }

    pub fn prune_interval(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.prune_interval_secs)
    }
}

fn parse_env<T: FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    var: &str,
    target: &mut T,
) -> Result<(), ConfigError> {
    if let Some(value) = lookup(var) {
        *target = value.trim().parse().map_err(|_| ConfigError::InvalidEnv {
            var: var.to_string(),
            value,
        })?;
    }
    Ok(())
}
