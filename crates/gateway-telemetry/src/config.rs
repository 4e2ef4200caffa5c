//! Telemetry configuration from environment variables.

use std::env;

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    /// Human-readable, ANSI coloured.
    Pretty,
    /// One JSON object per line.
    Json,
}

impl LogFormat {
    /// Parse `json` or `pretty`, case-insensitive.
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "json" => Some(Self::Json),
            "pretty" | "text" => Some(Self::Pretty),
            _ => None,
        }
    }
}

/// Configuration for logging and metrics.
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    /// Service name attached to startup logs
    pub service_name: String,

    /// Log level filter (trace, debug, info, warn, error) or a full
    /// `EnvFilter` directive
    pub log_level: String,

    /// Output format
    pub log_format: LogFormat,

    /// Whether to write logs to stdout at all
    pub console_output: bool,

    /// Whether to register Prometheus metrics
    pub metrics_enabled: bool,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            service_name: "telemetry-gateway".to_string(),
            log_level: "info".to_string(),
            log_format: LogFormat::Pretty,
            console_output: true,
            metrics_enabled: true,
        }
    }
}

impl TelemetryConfig {
    /// Create configuration from environment variables.
    ///
    /// # Environment Variables
    ///
    /// - `TG_SERVICE_NAME`: Service name (default: telemetry-gateway)
    /// - `TG_LOG_LEVEL` or `RUST_LOG`: Log level (default: info)
    /// - `TG_LOG_FORMAT`: `json` or `pretty` (default: json in containers)
    /// - `TG_CONSOLE_OUTPUT`: Enable console output (default: true)
    /// - `TG_METRICS_ENABLED`: Register Prometheus metrics (default: true)
    pub fn from_env() -> Self {
        let mut config = Self::default();
        config.apply_env();
        config
    }

    /// Override fields that are set in the environment.
    pub fn apply_env(&mut self) {
        let is_container =
            env::var("KUBERNETES_SERVICE_HOST").is_ok() || env::var("DOCKER_CONTAINER").is_ok();
        if is_container {
            self.log_format = LogFormat::Json;
        }

        if let Ok(name) = env::var("TG_SERVICE_NAME") {
            self.service_name = name;
        }
        if let Ok(level) = env::var("TG_LOG_LEVEL").or_else(|_| env::var("RUST_LOG")) {
            self.log_level = level;
        }
        if let Some(format) = env::var("TG_LOG_FORMAT")
            .ok()
            .and_then(|v| LogFormat::parse(&v))
        {
            self.log_format = format;
        }
        if let Ok(v) = env::var("TG_CONSOLE_OUTPUT") {
            self.console_output = parse_flag(&v);
        }
        if let Ok(v) = env::var("TG_METRICS_ENABLED") {
            self.metrics_enabled = parse_flag(&v);
        }
    }
}

fn parse_flag(value: &str) -> bool {
    let value = value.trim().to_ascii_lowercase();
    value != "false" && value != "0" && value != "no"
}
