//! # Security Alerts and Dead Letters
//!
//! Records the pipeline emits when a message cannot be processed or a
//! device behaves suspiciously.

use crate::domain::outcome::{IngestError, RejectionKind};
use chrono::Duration;
use serde::Serialize;
use serde_with::{hex::Hex, serde_as};
use shared_types::{DeviceId, Timestamp};
use uuid::Uuid;

/// Burst of decryption failures from one claimed device.
///
/// May indicate key compromise, tampering or a misprovisioned device.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SecurityAlert {
    pub device_id: DeviceId,
    /// Failures counted inside the window.
    pub failures: u32,
    /// Window length in seconds.
    pub window_secs: i64,
    pub first_failure_at: Timestamp,
    pub raised_at: Timestamp,
}

impl SecurityAlert {
    /// Build an alert for `failures` inside `window`.
    pub fn new(
        device_id: DeviceId,
        failures: u32,
        window: Duration,
        first_failure_at: Timestamp,
        raised_at: Timestamp,
    ) -> Self {
        Self {
            device_id,
            failures,
            window_secs: window.num_seconds(),
            first_failure_at,
            raised_at,
        }
    }
}

/// A permanently rejected message, kept for inspection.
#[serde_as]
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DeadLetter {
    pub id: Uuid,
    pub topic: String,
    /// Transport bytes exactly as delivered.
    #[serde_as(as = "Hex")]
    pub raw: Vec<u8>,
    pub kind: RejectionKind,
    pub detail: String,
    pub rejected_at: Timestamp,
}

impl DeadLetter {
    /// Capture a rejection.
    pub fn new(topic: &str, raw: &[u8], error: &IngestError, rejected_at: Timestamp) -> Self {
        Self {
            id: Uuid::new_v4(),
            topic: topic.to_string(),
            raw: raw.to_vec(),
            kind: error.kind(),
            detail: error.detail(),
            rejected_at,
        }
    }
}
