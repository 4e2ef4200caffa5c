//! # Core Domain Entities
//!
//! Defines the telemetry entities that flow through the ingestion pipeline.
//!
//! ## Lifecycle
//!
//! - **Inbound**: `DeviceMessage` (see `envelope`), `TelemetryPayload`
//!   (see `telemetry`)
//! - **Durable**: `EnrichedEvent`, keyed by `EventId`

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Wall-clock timestamp (UTC).
pub type Timestamp = DateTime<Utc>;

/// Sensor readings keyed by sensor name.
///
/// A `BTreeMap` so iteration is always sorted by name; the event id
/// derivation depends on that ordering.
pub type Readings = BTreeMap<String, f64>;

/// Identifier a device presents in its envelope.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DeviceId(String);

impl DeviceId {
    /// Wrap a raw device identifier.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Borrow the identifier.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DeviceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for DeviceId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

/// Deterministic identifier of one logical reading.
///
/// Lowercase hex of a 32-byte content hash. Redelivery of the same reading
/// produces the same id.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EventId(String);

impl EventId {
    /// Build an event id from a 32-byte digest.
    pub fn from_digest(digest: &[u8; 32]) -> Self {
        Self(hex::encode(digest))
    }

    /// Wrap an already-encoded id (e.g. read back from storage).
    pub fn from_hex(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Borrow the hex encoding.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EventId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Where an event came from on the transport.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Provenance {
    /// Transport topic the envelope arrived on.
    pub source_topic: String,
    /// Envelope format version the device used.
    pub envelope_version: u32,
}

/// The durable unit of ingestion.
///
/// Created by the enricher, written once by the event store, never mutated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnrichedEvent {
    /// Content-derived idempotency key.
    pub event_id: EventId,
    /// Authenticated device that produced the reading.
    pub device_id: DeviceId,
    /// Server wall-clock time at acceptance.
    pub ingest_timestamp: Timestamp,
    /// Server monotonic clock at acceptance, milliseconds since process start.
    pub ingest_monotonic_ms: u64,
    /// Time the device says it sampled the reading.
    pub sample_timestamp: Option<Timestamp>,
    /// Validated readings.
    pub readings: Readings,
    /// Transport provenance.
    pub provenance: Provenance,
}
