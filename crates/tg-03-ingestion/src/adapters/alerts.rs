//! Alert sinks.

use crate::domain::alerts::SecurityAlert;
use crate::ports::outbound::AlertSink;
use async_trait::async_trait;
use gateway_telemetry::SECURITY_ALERTS;
use parking_lot::Mutex;
use tracing::error;

/// Logs alerts at `error` with `security_alert = true` and counts them.
#[derive(Debug, Default)]
pub struct LoggingAlertSink;

#[async_trait]
impl AlertSink for LoggingAlertSink {
    async fn raise(&self, alert: &SecurityAlert) {
        SECURITY_ALERTS.inc();
        error!(
            security_alert = true,
            device_id = %alert.device_id,
            failures = alert.failures,
            window_secs = alert.window_secs,
            first_failure_at = %alert.first_failure_at,
            "Decryption failure burst"
        );
    }
}

/// Keeps every alert; for tests and embedding.
#[derive(Debug, Default)]
pub struct RecordingAlertSink {
    alerts: Mutex<Vec<SecurityAlert>>,
}

impl RecordingAlertSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn alerts(&self) -> Vec<SecurityAlert> {
        self.alerts.lock().clone()
    }
}

#[async_trait]
impl AlertSink for RecordingAlertSink {
    async fn raise(&self, alert: &SecurityAlert) {
        self.alerts.lock().push(alert.clone());
    }
}
