//! # Telemetry Gateway Runtime
//!
//! ## Startup Sequence
//!
//! 1. Load configuration (`TG_CONFIG` file, then `TG_*` environment)
//! 2. Initialise logging and metrics
//! 3. Wire subsystems (credentials, storage, pipeline, worker pool)
//! 4. Start the idempotency pruner
//! 5. Read deliveries from stdin until EOF or Ctrl+C
//!
//! ## Shutdown Sequence
//!
//! 1. Stop reading input
//! 2. Let every in-flight delivery finish
//! 3. Stop the pruner

use anyhow::{Context, Result};
use gateway_runtime::container::{Gateway, GatewayConfig};
use gateway_runtime::maintenance::spawn_pruner;
use gateway_runtime::transport::{run_line_transport, LineTransportOptions};
use gateway_telemetry::{encode_metrics, init_telemetry};
use std::sync::Arc;
use tokio::io::BufReader;
use tracing::{debug, error, info};

#[tokio::main]
async fn main() -> Result<()> {
    let config = GatewayConfig::load().context("Failed to load configuration")?;
    let telemetry = config.telemetry_config();
    init_telemetry(&telemetry).context("Failed to initialise telemetry")?;

    info!(
        service = %telemetry.service_name,
        version = env!("CARGO_PKG_VERSION"),
        "Starting telemetry gateway"
    );

    let gateway = Gateway::build(config).context("Failed to wire gateway")?;
    let (shutdown_tx, shutdown_rx) = tokio::sync::watch::channel(false);

    let pruner = spawn_pruner(
        Arc::clone(&gateway.idempotency),
        Arc::clone(&gateway.time_source),
        gateway.config.ingestion.idempotency_retention(),
        gateway.config.prune_interval(),
        shutdown_rx.clone(),
    );

    let options = LineTransportOptions {
        default_topic: gateway.config.default_topic.clone(),
        max_attempts: gateway.config.max_redeliveries,
        max_pending: gateway.config.ingestion.worker_count * 2,
    };
    let mut transport = tokio::spawn(run_line_transport(
        BufReader::new(tokio::io::stdin()),
        Arc::clone(&gateway.transport),
        options,
        shutdown_rx,
    ));

    info!("Gateway is running. Press Ctrl+C to stop.");
    let finished = tokio::select! {
        result = &mut transport => Some(result),
        signal = tokio::signal::ctrl_c() => {
            signal.context("Failed to listen for Ctrl+C")?;
            info!("Shutdown signal received");
            None
        }
    };

    if let Err(e) = shutdown_tx.send(true) {
        error!("Failed to send shutdown signal: {}", e);
    }
    let finished = match finished {
        Some(result) => result,
        None => transport.await,
    };
    match finished.context("Transport task panicked")? {
        Ok(stats) => info!(
            acked = stats.acked,
            dead_lettered = stats.dead_lettered,
            abandoned = stats.abandoned,
            "Transport finished"
        ),
        Err(e) => error!(error = %e, "Transport failed reading input"),
    }

    gateway.shutdown().await;
    let _ = pruner.await;
    if telemetry.metrics_enabled {
        match encode_metrics() {
            Ok(snapshot) => debug!(metrics = %snapshot, "Final metrics snapshot"),
            Err(e) => error!(error = %e, "Failed to encode metrics"),
        }
    }
    info!("Shutdown complete");
    Ok(())
}
