//! # Telemetry Payload
//!
//! The decrypted content of an envelope. Two shapes are accepted:
//!
//! - structured: `{"readings": {"temperature": 23.5}, "sampleTimestamp": "..."}`
//! - flat (legacy firmware): `{"temperature": 23.5, "humidity": 48, "timestamp": "..."}`
//!
//! In the flat shape every numeric top-level field is a reading and other
//! fields are ignored.

use crate::entities::{Readings, Timestamp};
use crate::errors::PayloadError;
use chrono::{DateTime, NaiveDateTime, Utc};
use serde::Serialize;
use serde_json::{Map, Value};

const READINGS_FIELD: &str = "readings";
const SAMPLE_TIMESTAMP_FIELD: &str = "sampleTimestamp";
const LEGACY_TIMESTAMP_FIELD: &str = "timestamp";
const LEGACY_TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Decrypted telemetry, consumed immediately by validation.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct TelemetryPayload {
    /// Raw readings as sent, recognised or not.
    pub readings: Readings,
    /// Device-asserted sample time.
    pub sample_timestamp: Option<Timestamp>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct StructuredPayload<'a> {
    readings: &'a Readings,
    sample_timestamp: Option<String>,
}

impl TelemetryPayload {
    /// Build a payload from readings and an optional sample time.
    pub fn new(readings: Readings, sample_timestamp: Option<Timestamp>) -> Self {
        Self {
            readings,
            sample_timestamp,
        }
    }

    /// Parse decrypted plaintext.
    pub fn from_json_bytes(bytes: &[u8]) -> Result<Self, PayloadError> {
        let value: Value =
            serde_json::from_slice(bytes).map_err(|e| PayloadError::InvalidJson(e.to_string()))?;
        let Value::Object(mut object) = value else {
            return Err(PayloadError::InvalidJson("expected a JSON object".to_string()));
        };

        let structured_ts = object.remove(SAMPLE_TIMESTAMP_FIELD);
        let legacy_ts = object.remove(LEGACY_TIMESTAMP_FIELD);
        let sample_timestamp = match structured_ts.or(legacy_ts) {
            None | Some(Value::Null) => None,
            Some(Value::String(s)) => Some(parse_timestamp(&s)?),
            Some(other) => {
                return Err(PayloadError::InvalidTimestamp {
                    value: other.to_string(),
                })
            }
        };

        let readings = match object.remove(READINGS_FIELD) {
            Some(Value::Object(readings)) => structured_readings(readings)?,
            Some(other) => {
                return Err(PayloadError::InvalidJson(format!(
                    "readings must be an object, got {other}"
                )))
            }
            None => flat_readings(object),
        };

        Ok(Self {
            readings,
            sample_timestamp,
        })
    }

    /// Encode in the structured shape.
    pub fn to_json_bytes(&self) -> Vec<u8> {
        let wire = StructuredPayload {
            readings: &self.readings,
            sample_timestamp: self.sample_timestamp.map(|ts| ts.to_rfc3339()),
        };
        serde_json::to_vec(&wire).unwrap_or_default()
    }
}

fn structured_readings(object: Map<String, Value>) -> Result<Readings, PayloadError> {
    object
        .into_iter()
        .map(|(name, value)| match value.as_f64() {
            Some(v) => Ok((name, v)),
            None => Err(PayloadError::NonNumericReading { name }),
        })
        .collect()
}

fn flat_readings(object: Map<String, Value>) -> Readings {
    object
        .into_iter()
        .filter_map(|(name, value)| value.as_f64().map(|v| (name, v)))
        .collect()
}

fn parse_timestamp(value: &str) -> Result<Timestamp, PayloadError> {
    if let Ok(ts) = DateTime::parse_from_rfc3339(value) {
        return Ok(ts.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(value, LEGACY_TIMESTAMP_FORMAT)
        .map(|naive| naive.and_utc())
        .map_err(|_| PayloadError::InvalidTimestamp {
            value: value.to_string(),
        })
}
