//! # Payload Validation
//!
//! Pure and total: any parseable payload yields either a
//! `ValidatedPayload` or a `ValidationError` naming the offending field.
//! Unknown reading names are dropped, not rejected.

use crate::config::{IngestionConfig, SensorRange};
use chrono::Duration;
use shared_types::{PayloadError, Readings, TelemetryPayload, Timestamp};
use std::collections::BTreeMap;
use thiserror::Error;

/// Field name reported when nothing recognisable was sent.
pub const READINGS_FIELD: &str = "readings";
/// Field name reported for sample timestamp problems.
pub const SAMPLE_TIMESTAMP_FIELD: &str = "sampleTimestamp";

/// A structured validation rejection.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{field}: {reason}")]
pub struct ValidationError {
    /// Offending field (reading name, `sampleTimestamp`, `readings` or
    /// `payload`)
    pub field: String,
    /// What is wrong with it
    pub reason: String,
}

impl ValidationError {
    /// Build an error for `field`.
    pub fn new(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            reason: reason.into(),
        }
    }
}

impl From<PayloadError> for ValidationError {
    fn from(err: PayloadError) -> Self {
        Self::new(err.field(), err.to_string())
    }
}

/// Telemetry that passed validation. Only recognised readings remain.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedPayload {
    readings: Readings,
    sample_timestamp: Option<Timestamp>,
}

impl ValidatedPayload {
    /// Recognised, in-range readings.
    pub fn readings(&self) -> &Readings {
        &self.readings
    }

    /// Device-asserted sample time, within tolerance.
    pub fn sample_timestamp(&self) -> Option<Timestamp> {
        self.sample_timestamp
    }

    pub(crate) fn into_parts(self) -> (Readings, Option<Timestamp>) {
        (self.readings, self.sample_timestamp)
    }
}

/// Range and freshness checks.
#[derive(Debug, Clone)]
pub struct PayloadValidator {
    ranges: BTreeMap<String, SensorRange>,
    clock_skew_tolerance: Duration,
    staleness_bound: Duration,
}

impl PayloadValidator {
    /// Build from explicit settings.
    pub fn new(
        ranges: BTreeMap<String, SensorRange>,
        clock_skew_tolerance: Duration,
        staleness_bound: Duration,
    ) -> Self {
        Self {
            ranges,
            clock_skew_tolerance,
            staleness_bound,
        }
    }

    /// Build from the pipeline configuration.
    pub fn from_config(config: &IngestionConfig) -> Self {
        Self::new(
            config.sensor_ranges.clone(),
            config.clock_skew_tolerance(),
            config.staleness_bound(),
        )
    }

    /// Validate `payload` as of `now`.
    pub fn validate(
        &self,
        payload: &TelemetryPayload,
        now: Timestamp,
    ) -> Result<ValidatedPayload, ValidationError> {
        let mut readings = Readings::new();
        for (name, &value) in &payload.readings {
            let Some(range) = self.ranges.get(name) else {
                continue;
            };
            if !value.is_finite() {
                return Err(ValidationError::new(name, "must be a finite number"));
            }
            if !range.contains(value) {
                return Err(ValidationError::new(name, describe_violation(range, value)));
            }
            readings.insert(name.clone(), value);
        }

        if readings.is_empty() {
            return Err(ValidationError::new(
                READINGS_FIELD,
                "no recognised sensor reading",
            ));
        }

        if let Some(sampled) = payload.sample_timestamp {
            // A bound past the end of the calendar never rejects.
            let latest = now.checked_add_signed(self.clock_skew_tolerance);
            let earliest = now.checked_sub_signed(self.staleness_bound);
            if latest.is_some_and(|latest| sampled > latest) {
                return Err(ValidationError::new(
                    SAMPLE_TIMESTAMP_FIELD,
                    format!(
                        "{} is more than {}s in the future",
                        sampled.to_rfc3339(),
                        self.clock_skew_tolerance.num_seconds()
                    ),
                ));
            }
            if earliest.is_some_and(|earliest| sampled < earliest) {
                return Err(ValidationError::new(
                    SAMPLE_TIMESTAMP_FIELD,
                    format!(
                        "{} is older than {}s",
                        sampled.to_rfc3339(),
                        self.staleness_bound.num_seconds()
                    ),
                ));
            }
        }

        Ok(ValidatedPayload {
            readings,
            sample_timestamp: payload.sample_timestamp,
        })
    }
}

fn describe_violation(range: &SensorRange, value: f64) -> String {
    if range.integral && value.fract() != 0.0 {
        return format!("{value} is not a whole number");
    }
    let lower = range.min.map_or("-inf".to_string(), |v| v.to_string());
    let upper = range.max.map_or("inf".to_string(), |v| v.to_string());
    format!("{value} outside [{lower}, {upper}]")
}
