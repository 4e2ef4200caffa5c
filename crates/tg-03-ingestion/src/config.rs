//! # Ingestion Configuration
//!
//! Everything the pipeline consumes but does not own: sensor ranges, time
//! tolerances, retention, rotation grace, concurrency.
//!
//! # Example
//!
//! ```ignore
//! let config = IngestionConfig::builder()
//!     .worker_count(32)
//!     .key_rotation_grace_secs(3600)
//!     .build()?;
//! ```

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

/// Configuration errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// A setting is out of its allowed domain.
    #[error("invalid {field}: {reason}")]
    Invalid {
        /// Setting name
        field: String,
        /// What is wrong
        reason: String,
    },
}

/// Longest duration any second-valued setting may hold (100 years).
pub const MAX_DURATION_SECS: u64 = 100 * 365 * 24 * 60 * 60;

fn invalid(field: impl Into<String>, reason: impl Into<String>) -> ConfigError {
    ConfigError::Invalid {
        field: field.into(),
        reason: reason.into(),
    }
}

/// Accepted range for one sensor kind. Open ends are `None`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SensorRange {
    /// Inclusive lower bound
    #[serde(default)]
    pub min: Option<f64>,
    /// Inclusive upper bound
    #[serde(default)]
    pub max: Option<f64>,
    /// Value must be a whole number
    #[serde(default)]
    pub integral: bool,
}

impl SensorRange {
    /// Closed range `[min, max]`.
    pub fn between(min: f64, max: f64) -> Self {
        Self {
            min: Some(min),
            max: Some(max),
            integral: false,
        }
    }

    /// Half-open range `[min, ∞)`.
    pub fn at_least(min: f64) -> Self {
        Self {
            min: Some(min),
            max: None,
            integral: false,
        }
    }

    /// Require whole numbers.
    pub fn integral(mut self) -> Self {
        self.integral = true;
        self
    }

    /// Whether `value` is acceptable.
    pub fn contains(&self, value: f64) -> bool {
        self.min.map_or(true, |min| value >= min)
            && self.max.map_or(true, |max| value <= max)
            && (!self.integral || value.fract() == 0.0)
    }
}

/// Sensor kinds recognised out of the box: DHT11 climate, GPS fix and
/// tracker state.
pub fn default_sensor_ranges() -> BTreeMap<String, SensorRange> {
    [
        ("temperature", SensorRange::between(-50.0, 150.0)),
        ("humidity", SensorRange::between(0.0, 100.0)),
        ("latitude", SensorRange::between(-90.0, 90.0)),
        ("longitude", SensorRange::between(-180.0, 180.0)),
        ("satellites", SensorRange::at_least(0.0).integral()),
        ("battery_level", SensorRange::between(0.0, 100.0)),
        ("speed", SensorRange::at_least(0.0)),
    ]
    .into_iter()
    .map(|(name, range)| (name.to_string(), range))
    .collect()
}

/// Pipeline configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IngestionConfig {
    /// Recognised sensors and their valid ranges
    pub sensor_ranges: BTreeMap<String, SensorRange>,
    /// How far in the future a sample timestamp may be
    pub clock_skew_tolerance_secs: u64,
    /// How old a sample timestamp may be
    pub staleness_bound_secs: u64,
    /// Width of the ingest-time bucket used in event ids when a reading
    /// has no sample timestamp
    pub dedup_bucket_secs: u64,
    /// How long idempotency records are kept
    pub idempotency_retention_secs: u64,
    /// Age after which an uncommitted reservation may be reclaimed
    pub reservation_ttl_secs: u64,
    /// How long a rotated-out key still opens payloads; 0 disables
    pub key_rotation_grace_secs: u64,
    /// Maximum concurrently executing ingest calls
    pub worker_count: usize,
    /// Bound on every collaborator call
    pub stage_timeout_ms: u64,
    /// Decryption failures per device that raise a security alert
    pub alert_threshold: u32,
    /// Sliding window for `alert_threshold`
    pub alert_window_secs: u64,
}

impl Default for IngestionConfig {
    fn default() -> Self {
        Self {
            sensor_ranges: default_sensor_ranges(),
            clock_skew_tolerance_secs: 30,
            staleness_bound_secs: 24 * 60 * 60,
            dedup_bucket_secs: 60,
            idempotency_retention_secs: 7 * 24 * 60 * 60,
            reservation_ttl_secs: 30,
            key_rotation_grace_secs: 0,
            worker_count: 16,
            stage_timeout_ms: 5_000,
            alert_threshold: 5,
            alert_window_secs: 60,
        }
    }
}

impl IngestionConfig {
    /// Start a builder from the defaults.
    pub fn builder() -> IngestionConfigBuilder {
        IngestionConfigBuilder::default()
    }

    /// Check every setting.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.sensor_ranges.is_empty() {
            return Err(invalid("sensor_ranges", "at least one sensor is required"));
        }
        for (name, range) in &self.sensor_ranges {
            let bounds = [range.min, range.max];
            if bounds.iter().flatten().any(|b| b.is_nan()) {
                return Err(invalid(format!("sensor_ranges.{name}"), "bound is NaN"));
            }
            if let (Some(min), Some(max)) = (range.min, range.max) {
                if min > max {
                    return Err(invalid(
                        format!("sensor_ranges.{name}"),
                        format!("min {min} is greater than max {max}"),
                    ));
                }
            }
        }

        let positive = [
            ("dedup_bucket_secs", self.dedup_bucket_secs),
            ("idempotency_retention_secs", self.idempotency_retention_secs),
            ("reservation_ttl_secs", self.reservation_ttl_secs),
            ("stage_timeout_ms", self.stage_timeout_ms),
            ("alert_window_secs", self.alert_window_secs),
            ("staleness_bound_secs", self.staleness_bound_secs),
        ];
        for (field, value) in positive {
            if value == 0 {
                return Err(invalid(field, "must be greater than zero"));
            }
        }
        let durations = [
            ("clock_skew_tolerance_secs", self.clock_skew_tolerance_secs),
            ("staleness_bound_secs", self.staleness_bound_secs),
            ("dedup_bucket_secs", self.dedup_bucket_secs),
            ("idempotency_retention_secs", self.idempotency_retention_secs),
            ("reservation_ttl_secs", self.reservation_ttl_secs),
            ("key_rotation_grace_secs", self.key_rotation_grace_secs),
            ("alert_window_secs", self.alert_window_secs),
            ("stage_timeout_ms", self.stage_timeout_ms / 1_000),
        ];
        for (field, value) in durations {
            if value > MAX_DURATION_SECS {
                return Err(invalid(
                    field,
                    format!("must not exceed {MAX_DURATION_SECS}s"),
                ));
            }
        }
        if self.worker_count == 0 {
            return Err(invalid("worker_count", "must be greater than zero"));
        }
        if self.alert_threshold == 0 {
            return Err(invalid("alert_threshold", "must be greater than zero"));
        }
        if self.idempotency_retention_secs <= self.reservation_ttl_secs {
            return Err(invalid(
                "idempotency_retention_secs",
                "must exceed reservation_ttl_secs",
            ));
        }
        if self.worker_count > u32::MAX as usize {
            return Err(invalid("worker_count", "too large"));
        }
        Ok(())
    }

    /// Clock-skew tolerance.
    pub fn clock_skew_tolerance(&self) -> chrono::Duration {
        secs(self.clock_skew_tolerance_secs)
    }

    /// Staleness bound.
    pub fn staleness_bound(&self) -> chrono::Duration {
        secs(self.staleness_bound_secs)
    }

    /// Idempotency retention window.
    pub fn idempotency_retention(&self) -> chrono::Duration {
        secs(self.idempotency_retention_secs)
    }

    /// Reservation TTL.
    pub fn reservation_ttl(&self) -> chrono::Duration {
        secs(self.reservation_ttl_secs)
    }

    /// Key rotation grace.
    pub fn key_rotation_grace(&self) -> chrono::Duration {
        secs(self.key_rotation_grace_secs)
    }

    /// Alert window.
    pub fn alert_window(&self) -> chrono::Duration {
        secs(self.alert_window_secs)
    }

    /// Per-call stage timeout.
    pub fn stage_timeout(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.stage_timeout_ms)
    }
}

fn secs(value: u64) -> chrono::Duration {
    chrono::Duration::seconds(value.min(MAX_DURATION_SECS) as i64)
}

/// Builder for `IngestionConfig`; `build` validates.
#[derive(Default)]
pub struct IngestionConfigBuilder {
    config: IngestionConfig,
}

impl IngestionConfigBuilder {
    /// Replace or add one sensor range.
    pub fn sensor_range(mut self, name: impl Into<String>, range: SensorRange) -> Self {
        self.config.sensor_ranges.insert(name.into(), range);
        self
    }

    /// Set the clock-skew tolerance.
    pub fn clock_skew_tolerance_secs(mut self, secs: u64) -> Self {
        self.config.clock_skew_tolerance_secs = secs;
        self
    }

    /// Set the staleness bound.
    pub fn staleness_bound_secs(mut self, secs: u64) -> Self {
        self.config.staleness_bound_secs = secs;
        self
    }

    /// Set the dedup bucket width.
    pub fn dedup_bucket_secs(mut self, secs: u64) -> Self {
        self.config.dedup_bucket_secs = secs;
        self
    }

    /// Set the idempotency retention window.
    pub fn idempotency_retention_secs(mut self, secs: u64) -> Self {
        self.config.idempotency_retention_secs = secs;
        self
    }

    /// Set the reservation TTL.
    pub fn reservation_ttl_secs(mut self, secs: u64) -> Self {
        self.config.reservation_ttl_secs = secs;
        self
    }

    /// Set the key rotation grace.
    pub fn key_rotation_grace_secs(mut self, secs: u64) -> Self {
        self.config.key_rotation_grace_secs = secs;
        self
    }

    /// Set the worker count.
    pub fn worker_count(mut self, workers: usize) -> Self {
        self.config.worker_count = workers;
        self
    }

    /// Set the stage timeout.
    pub fn stage_timeout_ms(mut self, ms: u64) -> Self {
        self.config.stage_timeout_ms = ms;
        self
    }

    /// Set alert threshold and window.
    pub fn alerting(mut self, threshold: u32, window_secs: u64) -> Self {
        self.config.alert_threshold = threshold;
        self.config.alert_window_secs = window_secs;
        self
    }

    /// Validate and return the configuration.
    pub fn build(self) -> Result<IngestionConfig, ConfigError> {
        self.config.validate()?;
        Ok(self.config)
    }
}
