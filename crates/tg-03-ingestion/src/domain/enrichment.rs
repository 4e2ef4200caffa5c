//! # Enrichment
//!
//! Turns a validated payload into the durable `EnrichedEvent`. Total:
//! there is no failure path.
//!
//! ## Event Id
//!
//! BLAKE3 over length-framed fields:
//!
//! ```text
//! "tg-event-id/v1" | deviceId | time component | (name, value)* sorted by name
//! ```
//!
//! The time component is `"s"` + sample seconds + nanos when the device
//! sent a sample timestamp, otherwise `"b"` + the ingest bucket
//! `floor(ingest_secs / bucket_secs)`. Values are IEEE-754 bits with `-0.0`
//! folded into `0.0`.

use crate::domain::validation::ValidatedPayload;
use shared_crypto::Blake3Hasher;
use shared_types::{
    DeviceId, DeviceMessage, EnrichedEvent, EventId, Provenance, Readings, Timestamp,
};

const DOMAIN_TAG: &[u8] = b"tg-event-id/v1";

/// Derive the idempotency key of one logical reading.
pub fn derive_event_id(
    device_id: &DeviceId,
    sample_timestamp: Option<Timestamp>,
    ingest_timestamp: Timestamp,
    bucket_secs: u64,
    readings: &Readings,
) -> EventId {
    let mut hasher = Blake3Hasher::new();
    hasher.update_field(DOMAIN_TAG);
    hasher.update_field(device_id.as_str().as_bytes());

    match sample_timestamp {
        Some(ts) => {
            let mut time = Vec::with_capacity(13);
            time.push(b's');
            time.extend_from_slice(&ts.timestamp().to_le_bytes());
            time.extend_from_slice(&ts.timestamp_subsec_nanos().to_le_bytes());
            hasher.update_field(&time);
        }
        None => {
            let bucket = ingest_timestamp
                .timestamp()
                .div_euclid(i64::try_from(bucket_secs.max(1)).unwrap_or(i64::MAX));
            let mut time = Vec::with_capacity(9);
            time.push(b'b');
            time.extend_from_slice(&bucket.to_le_bytes());
            hasher.update_field(&time);
        }
    }

    for (name, value) in readings {
        hasher.update_field(name.as_bytes());
        hasher.update_field(&canonical_bits(*value).to_le_bytes());
    }

    EventId::from_digest(&hasher.finalize())
}

fn canonical_bits(value: f64) -> u64 {
    if value == 0.0 {
        0.0f64.to_bits()
    } else {
        value.to_bits()
    }
}

/// Attaches server-side metadata.
#[derive(Debug, Clone)]
pub struct Enricher {
    bucket_secs: u64,
}

impl Enricher {
    /// Create an enricher with the given dedup bucket width.
    pub fn new(bucket_secs: u64) -> Self {
        Self { bucket_secs }
    }

    /// Build the durable event.
    ///
    /// `ingest_timestamp` is wall clock; `ingest_monotonic_ms` is the
    /// process-monotonic reading taken at the same moment.
    pub fn enrich(
        &self,
        payload: ValidatedPayload,
        message: &DeviceMessage,
        topic: &str,
        ingest_timestamp: Timestamp,
        ingest_monotonic_ms: u64,
    ) -> EnrichedEvent {
        let (readings, sample_timestamp) = payload.into_parts();
        let event_id = derive_event_id(
            &message.device_id,
            sample_timestamp,
            ingest_timestamp,
            self.bucket_secs,
            &readings,
        );

        EnrichedEvent {
            event_id,
            device_id: message.device_id.clone(),
            ingest_timestamp,
            ingest_monotonic_ms,
            sample_timestamp,
            readings,
            provenance: Provenance {
                source_topic: topic.to_string(),
                envelope_version: message.envelope_version,
            },
        }
    }
}
