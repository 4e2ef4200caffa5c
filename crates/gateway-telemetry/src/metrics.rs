//! Prometheus metrics for the ingestion pipeline.
//!
//! All metrics follow the naming convention: `tg_<area>_<metric>_<unit>`
//!
//! ## Metric Types
//!
//! - **Counter**: Monotonically increasing value (e.g., ingest_outcomes_total)
//! - **Gauge**: Value that can go up or down (e.g., ingest_in_flight)
//! - **Histogram**: Distribution of values (e.g., stage_duration_seconds)

use lazy_static::lazy_static;
use prometheus::{
    exponential_buckets, Encoder, HistogramOpts, HistogramVec, IntCounter, IntCounterVec,
    IntGauge, Opts, Registry, TextEncoder,
};
use std::time::Instant;

use crate::TelemetryError;

lazy_static! {
    /// Global metrics registry
    pub static ref REGISTRY: Registry = Registry::new();

    // =========================================================================
    // PIPELINE OUTCOMES
    // =========================================================================

    /// Ingest outcomes by result and rejection kind
    pub static ref INGEST_OUTCOMES: IntCounterVec = IntCounterVec::new(
        Opts::new("tg_ingest_outcomes_total", "Ingest outcomes by result and kind"),
        &["outcome", "kind"]  // outcome: accepted/duplicate/rejected
    ).expect("metric creation failed");

    /// Per-stage latency
    pub static ref STAGE_DURATION: HistogramVec = HistogramVec::new(
        HistogramOpts::new(
            "tg_ingest_stage_duration_seconds",
            "Time spent in each pipeline stage"
        ).buckets(exponential_buckets(0.0001, 2.0, 16).expect("valid bucket layout")),
        &["stage"]
    ).expect("metric creation failed");

    /// Ingest calls currently executing in the worker pool
    pub static ref INGEST_IN_FLIGHT: IntGauge = IntGauge::new(
        "tg_ingest_in_flight",
        "Ingest invocations currently executing"
    ).expect("metric creation failed");

    // =========================================================================
    // SECURITY
    // =========================================================================

    /// Payloads that failed authenticated decryption
    pub static ref DECRYPT_FAILURES: IntCounter = IntCounter::new(
        "tg_security_decrypt_failures_total",
        "Payloads that failed authenticated decryption"
    ).expect("metric creation failed");

    /// Decryption-failure bursts escalated as alerts
    pub static ref SECURITY_ALERTS: IntCounter = IntCounter::new(
        "tg_security_alerts_total",
        "Security alerts raised for decryption failure bursts"
    ).expect("metric creation failed");

    // =========================================================================
    // TRANSPORT AND STORAGE
    // =========================================================================

    /// Transport dispositions (ack/requeue/dead_letter)
    pub static ref TRANSPORT_DISPOSITIONS: IntCounterVec = IntCounterVec::new(
        Opts::new("tg_transport_dispositions_total", "Dispositions returned to the transport"),
        &["disposition"]
    ).expect("metric creation failed");

    /// Downstream republish failures
    pub static ref FANOUT_FAILURES: IntCounter = IntCounter::new(
        "tg_fanout_failures_total",
        "Accepted events that could not be republished downstream"
    ).expect("metric creation failed");

    /// Idempotency records removed by retention pruning
    pub static ref IDEMPOTENCY_PRUNED: IntCounter = IntCounter::new(
        "tg_idempotency_pruned_total",
        "Idempotency records removed by retention pruning"
    ).expect("metric creation failed");
}

/// Register all metrics with the global registry.
///
/// Safe to call more than once.
pub fn register_metrics() -> Result<(), TelemetryError> {
    let metrics: Vec<Box<dyn prometheus::core::Collector>> = vec![
        Box::new(INGEST_OUTCOMES.clone()),
        Box::new(STAGE_DURATION.clone()),
        Box::new(INGEST_IN_FLIGHT.clone()),
        Box::new(DECRYPT_FAILURES.clone()),
        Box::new(SECURITY_ALERTS.clone()),
        Box::new(TRANSPORT_DISPOSITIONS.clone()),
        Box::new(FANOUT_FAILURES.clone()),
        Box::new(IDEMPOTENCY_PRUNED.clone()),
    ];

    for metric in metrics {
        match REGISTRY.register(metric) {
            Ok(()) | Err(prometheus::Error::AlreadyReg) => {}
            Err(e) => return Err(TelemetryError::MetricsInit(e.to_string())),
        }
    }
    Ok(())
}

/// Encode all metrics as Prometheus text format.
pub fn encode_metrics() -> Result<String, TelemetryError> {
    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();
    let mut buffer = Vec::new();
    encoder
        .encode(&metric_families, &mut buffer)
        .map_err(|e| TelemetryError::MetricsInit(e.to_string()))?;
    String::from_utf8(buffer).map_err(|e| TelemetryError::MetricsInit(e.to_string()))
}

/// Records the elapsed time of one pipeline stage on drop.
pub struct StageTimer {
    stage: &'static str,
    start: Instant,
}

impl StageTimer {
    /// Start timing `stage`.
    pub fn start(stage: &'static str) -> Self {
        Self {
            stage,
            start: Instant::now(),
        }
    }
}

impl Drop for StageTimer {
    fn drop(&mut self) {
        STAGE_DURATION
            .with_label_values(&[self.stage])
            .observe(self.start.elapsed().as_secs_f64());
    }
}

/// Tracks one in-flight ingest call; decrements on drop.
pub struct InFlightGuard(());

impl InFlightGuard {
    /// Increment the in-flight gauge.
    pub fn enter() -> Self {
        INGEST_IN_FLIGHT.inc();
        Self(())
    }
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        INGEST_IN_FLIGHT.dec();
    }
}
