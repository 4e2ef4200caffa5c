//! # Gateway Telemetry
//!
//! Observability for the telemetry gateway.
//!
//! ## Components
//!
//! - **Logs**: `tracing` with a `tracing-subscriber` JSON or pretty layer
//! - **Metrics**: Prometheus counters, gauges and histograms
//!
//! ## Usage
//!
//! ```rust,ignore
//! use gateway_telemetry::{init_telemetry, TelemetryConfig};
//!
//! let config = TelemetryConfig::from_env();
//! init_telemetry(&config)?;
//! ```
//!
//! ## Environment Variables
//!
//! | Variable | Default | Description |
//! |----------|---------|-------------|
//! | `TG_LOG_LEVEL` | `info` | Log level filter |
//! | `TG_LOG_FORMAT` | `pretty` | `json` or `pretty` |
//! | `TG_CONSOLE_OUTPUT` | `true` | Write logs to stdout |
//! | `TG_METRICS_ENABLED` | `true` | Register Prometheus metrics |

#![warn(missing_docs)]

mod config;
mod logging;
pub mod metrics;

pub use config::{LogFormat, TelemetryConfig};
pub use logging::init_logging;
pub use metrics::{
    encode_metrics, register_metrics, InFlightGuard, StageTimer, DECRYPT_FAILURES,
    FANOUT_FAILURES, IDEMPOTENCY_PRUNED, INGEST_IN_FLIGHT, INGEST_OUTCOMES, SECURITY_ALERTS,
    STAGE_DURATION, TRANSPORT_DISPOSITIONS,
};

use thiserror::Error;

/// Telemetry initialization errors
#[derive(Error, Debug)]
pub enum TelemetryError {
    /// Subscriber could not be installed
    #[error("Failed to initialize logging: {0}")]
    LoggingInit(String),

    /// Metric registration failed
    #[error("Failed to initialize Prometheus metrics: {0}")]
    MetricsInit(String),

    /// Bad filter directive or other setting
    #[error("Invalid configuration: {0}")]
    Config(String),
}

/// Initialize logging and, when enabled, metrics.
pub fn init_telemetry(config: &TelemetryConfig) -> Result<(), TelemetryError> {
    if config.metrics_enabled {
        register_metrics()?;
    }
    init_logging(config)
}
