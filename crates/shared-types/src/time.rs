//! # Time Sources
//!
//! Wall-clock and monotonic time behind one trait so that staleness checks,
//! reservation expiry and pruning can be driven by a manual clock in tests.

use crate::entities::Timestamp;
use chrono::{Duration, Utc};
use parking_lot::Mutex;
use std::time::Instant;

/// Abstract interface for time operations (for testability).
pub trait TimeSource: Send + Sync {
    /// Current wall-clock time (UTC).
    fn now(&self) -> Timestamp;

    /// Milliseconds on a process-monotonic clock. Never goes backwards.
    fn monotonic_ms(&self) -> u64;
}

/// Default time source using system time.
pub struct SystemTimeSource {
    started: Instant,
}

impl SystemTimeSource {
    /// Create a source whose monotonic clock starts at zero now.
    pub fn new() -> Self {
        Self {
            started: Instant::now(),
        }
    }
}

impl Default for SystemTimeSource {
    fn default() -> Self {
        Self::new()
    }
}

impl TimeSource for SystemTimeSource {
    fn now(&self) -> Timestamp {
        Utc::now()
    }

    fn monotonic_ms(&self) -> u64 {
        u64::try_from(self.started.elapsed().as_millis()).unwrap_or(u64::MAX)
    }
}

/// Time source that only moves when told to.
pub struct ManualTimeSource {
    state: Mutex<(Timestamp, u64)>,
}

impl ManualTimeSource {
    /// Start at `now` with the monotonic clock at zero.
    pub fn new(now: Timestamp) -> Self {
        Self {
            state: Mutex::new((now, 0)),
        }
    }

    /// Move both clocks forward.
    pub fn advance(&self, by: Duration) {
        let mut state = self.state.lock();
        state.0 += by;
        state.1 += u64::try_from(by.num_milliseconds()).unwrap_or(0);
    }

    /// Set the wall clock only (models skew; monotonic time is untouched).
    pub fn set_wall_clock(&self, now: Timestamp) {
        self.state.lock().0 = now;
    }
}

impl TimeSource for ManualTimeSource {
    fn now(&self) -> Timestamp {
        self.state.lock().0
    }

    fn monotonic_ms(&self) -> u64 {
        self.state.lock().1
    }
}
