//! # Decryption Failure Monitor
//!
//! Sliding-window count of decryption failures per claimed device. When a
//! device reaches the threshold inside the window one `SecurityAlert` is
//! produced; further failures stay quiet until a full window has passed
//! since that alert.
//!
//! Windows run on the monotonic clock so wall-clock jumps neither hide nor
//! fabricate bursts. Only devices with a failure inside the current window
//! are tracked.

use crate::domain::alerts::SecurityAlert;
use chrono::Duration;
use parking_lot::Mutex;
use shared_types::{DeviceId, Timestamp};
use std::collections::{HashMap, VecDeque};

#[derive(Debug, Default)]
struct DeviceWindow {
    // (monotonic ms, wall clock) per failure, oldest first
    failures: VecDeque<(u64, Timestamp)>,
    last_alert_ms: Option<u64>,
}

/// Per-device decryption failure tracker.
#[derive(Debug)]
pub struct DecryptFailureMonitor {
    threshold: u32,
    window: Duration,
    window_ms: u64,
    devices: Mutex<HashMap<DeviceId, DeviceWindow>>,
}

impl DecryptFailureMonitor {
    /// Alert when `threshold` failures land inside `window`.
    pub fn new(threshold: u32, window: Duration) -> Self {
        let window_ms = u64::try_from(window.num_milliseconds()).unwrap_or(0);
        Self {
            threshold: threshold.max(1),
            window,
            window_ms,
            devices: Mutex::new(HashMap::new()),
        }
    }

    /// Record one failure. Returns an alert when this failure crosses the
    /// threshold and no alert was raised for the device in the last window.
    pub fn record_failure(
        &self,
        device_id: &DeviceId,
        now: Timestamp,
        now_ms: u64,
    ) -> Option<SecurityAlert> {
        let mut devices = self.devices.lock();
        let horizon = now_ms.saturating_sub(self.window_ms);
        devices.retain(|_, window| {
            window
                .failures
                .back()
                .is_some_and(|(at, _)| *at > horizon)
        });

        let window = devices.entry(device_id.clone()).or_default();
        while window.failures.front().is_some_and(|(at, _)| *at <= horizon) {
            window.failures.pop_front();
        }
        window.failures.push_back((now_ms, now));

        let count = u32::try_from(window.failures.len()).unwrap_or(u32::MAX);
        if count < self.threshold {
            return None;
        }
        if window
            .last_alert_ms
            .is_some_and(|at| now_ms.saturating_sub(at) < self.window_ms)
        {
            return None;
        }

        window.last_alert_ms = Some(now_ms);
        let first_failure_at = window.failures.front().map_or(now, |(_, wall)| *wall);
        Some(SecurityAlert::new(
            device_id.clone(),
            count,
            self.window,
            first_failure_at,
            now,
        ))
    }

    /// Devices currently tracked.
    pub fn tracked_devices(&self) -> usize {
        self.devices.lock().len()
    }
}
