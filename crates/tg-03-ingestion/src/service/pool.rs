//! # Worker Pool
//!
//! Bounds the number of concurrently executing `ingest` calls. Each call
//! runs on its own task holding a permit, so a caller that gives up
//! waiting never interrupts a write halfway through.
//!
//! Shutdown stops admission first, then waits for every permit to come
//! back.

use crate::domain::outcome::IngestOutcome;
use crate::ports::inbound::IngestApi;
use gateway_telemetry::InFlightGuard;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::Semaphore;
use tracing::info;

/// Submission failed before or outside the pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PoolError {
    #[error("worker pool is shutting down")]
    ShuttingDown,
    #[error("worker task failed: {0}")]
    WorkerFailed(String),
}

/// Bounded executor for one ingest API.
pub struct WorkerPool<P: IngestApi + 'static> {
    pipeline: Arc<P>,
    permits: Arc<Semaphore>,
    workers: u32,
    shutting_down: AtomicBool,
}

impl<P: IngestApi + 'static> WorkerPool<P> {
    /// A pool running at most `workers` ingest calls at once.
    pub fn new(pipeline: Arc<P>, workers: usize) -> Self {
        let workers = u32::try_from(workers.max(1)).unwrap_or(u32::MAX);
        Self {
            pipeline,
            permits: Arc::new(Semaphore::new(workers as usize)),
            workers,
            shutting_down: AtomicBool::new(false),
        }
    }

    pub fn pipeline(&self) -> &Arc<P> {
        &self.pipeline
    }

    /// Run one delivery, waiting for a free worker.
    pub async fn submit(&self, topic: String, raw: Vec<u8>) -> Result<IngestOutcome, PoolError> {
        if self.is_shutting_down() {
            return Err(PoolError::ShuttingDown);
        }
        let permit = Arc::clone(&self.permits)
            .acquire_owned()
            .await
            .map_err(|_| PoolError::ShuttingDown)?;
        // Shutdown may have started while this call was queued.
        if self.is_shutting_down() {
            return Err(PoolError::ShuttingDown);
        }

        let pipeline = Arc::clone(&self.pipeline);
        let task = tokio::spawn(async move {
            let _permit = permit;
            let _in_flight = InFlightGuard::enter();
            pipeline.ingest(&topic, &raw).await
        });
        task.await
            .map_err(|e| PoolError::WorkerFailed(e.to_string()))
    }

    pub fn is_shutting_down(&self) -> bool {
        self.shutting_down.load(Ordering::Acquire)
    }

    /// Calls currently holding a worker.
    pub fn in_flight(&self) -> usize {
        (self.workers as usize).saturating_sub(self.permits.available_permits())
    }

    /// Stop admitting work and wait for in-flight calls to finish.
    pub async fn shutdown(&self) {
        if self.shutting_down.swap(true, Ordering::AcqRel) {
            return;
        }
        info!(in_flight = self.in_flight(), "Draining worker pool");
        let drained = self.permits.acquire_many(self.workers).await;
        self.permits.close();
        drop(drained);
        info!("Worker pool drained");
    }
}
