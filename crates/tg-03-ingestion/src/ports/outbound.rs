//! # Outbound Ports (Driven Ports / SPI)
//!
//! Sinks the pipeline writes to after it has decided an outcome. None of
//! them can change that outcome.

use crate::domain::alerts::{DeadLetter, SecurityAlert};
use shared_types::EnrichedEvent;
use thiserror::Error;

/// Downstream republish failed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PublishError {
    #[error("no downstream subscribers")]
    NoSubscribers,
    #[error("publish failed: {0}")]
    Failed(String),
}

/// Republishes accepted events to downstream consumers.
#[async_trait::async_trait]
pub trait EventPublisher: Send + Sync {
    /// Publish one accepted event. Returns the number of receivers.
    async fn publish(&self, event: &EnrichedEvent) -> Result<usize, PublishError>;
}

/// Dead-letter write failed; the message must not be acknowledged.
#[derive(Debug, Error)]
pub enum DeadLetterError {
    #[error("dead letter I/O: {0}")]
    Io(#[from] std::io::Error),
    #[error("dead letter encoding: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Audit trail for permanently rejected messages.
#[async_trait::async_trait]
pub trait DeadLetterSink: Send + Sync {
    async fn write(&self, letter: DeadLetter) -> Result<(), DeadLetterError>;
}

/// Receives security alerts. Infallible from the pipeline's view.
#[async_trait::async_trait]
pub trait AlertSink: Send + Sync {
    async fn raise(&self, alert: &SecurityAlert);
}
