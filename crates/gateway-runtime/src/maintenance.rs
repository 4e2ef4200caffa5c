//! # Maintenance Tasks
//!
//! Periodic pruning of idempotency records past the retention window.

use chrono::Duration;
use gateway_telemetry::IDEMPOTENCY_PRUNED;
use shared_types::TimeSource;
use std::sync::Arc;
use tg_02_event_store::{IdempotencyGuard, StoreError};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, error, info};

/// Remove records first seen more than `retention` ago.
pub async fn prune_once<G: IdempotencyGuard + ?Sized>(
    guard: &G,
    clock: &dyn TimeSource,
    retention: Duration,
) -> Result<usize, StoreError> {
    let cutoff = clock.now() - retention;
    let pruned = guard.prune(cutoff).await?;
    IDEMPOTENCY_PRUNED.inc_by(pruned as u64);
    if pruned > 0 {
        info!(pruned, cutoff = %cutoff, "Idempotency records pruned");
    } else {
        debug!(cutoff = %cutoff, "Nothing to prune");
    }
    Ok(pruned)
}

/// Run `prune_once` every `interval` until `shutdown` flips.
pub fn spawn_pruner<G: IdempotencyGuard + ?Sized + 'static>(
    guard: Arc<G>,
    clock: Arc<dyn TimeSource>,
    retention: Duration,
    interval: std::time::Duration,
    mut shutdown: watch::Receiver<bool>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    if let Err(err) = prune_once(guard.as_ref(), clock.as_ref(), retention).await {
                        error!(error = %err, "Idempotency pruning failed");
                    }
                }
                _ = shutdown.changed() => {
                    debug!("Pruner stopping");
                    break;
                }
            }
        }
    })
}
