//! # Broadcast Publisher
//!
//! In-process fan-out over `tokio::sync::broadcast`. A subscriber that
//! falls more than `capacity` events behind loses the oldest ones.

use crate::ports::outbound::{EventPublisher, PublishError};
use async_trait::async_trait;
use shared_types::EnrichedEvent;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::broadcast;
use tokio_stream::wrappers::BroadcastStream;
use tracing::debug;

/// Default channel capacity.
pub const DEFAULT_CHANNEL_CAPACITY: usize = 1024;

/// Broadcast-channel event publisher.
pub struct BroadcastEventPublisher {
    sender: broadcast::Sender<EnrichedEvent>,
    published: AtomicU64,
}

impl BroadcastEventPublisher {
    #[must_use]
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CHANNEL_CAPACITY)
    }

    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self {
            sender,
            published: AtomicU64::new(0),
        }
    }

    /// New receiver for events published from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<EnrichedEvent> {
        self.sender.subscribe()
    }

    /// Receiver wrapped as a `Stream`. Lag shows up as `Err` items.
    pub fn stream(&self) -> BroadcastStream<EnrichedEvent> {
        BroadcastStream::new(self.subscribe())
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }

    /// Events successfully handed to at least one subscriber.
    pub fn events_published(&self) -> u64 {
        self.published.load(Ordering::Relaxed)
    }
}

impl Default for BroadcastEventPublisher {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl EventPublisher for BroadcastEventPublisher {
    async fn publish(&self, event: &EnrichedEvent) -> Result<usize, PublishError> {
        match self.sender.send(event.clone()) {
            Ok(receivers) => {
                self.published.fetch_add(1, Ordering::Relaxed);
                debug!(event_id = %event.event_id, receivers, "Event republished");
                Ok(receivers)
            }
            Err(_) => Err(PublishError::NoSubscribers),
        }
    }
}
