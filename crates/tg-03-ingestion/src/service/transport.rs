//! # Transport Adapter
//!
//! Maps ingest outcomes onto what a broker understands:
//!
//! | Outcome | Disposition |
//! |---|---|
//! | `Accepted`, `Duplicate` | `Ack` |
//! | transient `Rejected`, pool shutting down | `Requeue` |
//! | permanent `Rejected` | `DeadLetter` after the dead letter is written |
//!
//! A dead letter that cannot be written is requeued rather than lost.

use crate::domain::alerts::DeadLetter;
use crate::domain::outcome::IngestOutcome;
use crate::ports::inbound::IngestApi;
use crate::ports::outbound::DeadLetterSink;
use crate::service::pool::{PoolError, WorkerPool};
use gateway_telemetry::TRANSPORT_DISPOSITIONS;
use shared_types::TimeSource;
use std::fmt;
use std::sync::Arc;
use tracing::{error, warn};

/// What the transport should do with a delivery.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    Ack,
    Requeue,
    DeadLetter,
}

impl Disposition {
    pub fn as_str(&self) -> &'static str {
        match self {
            Disposition::Ack => "ack",
            Disposition::Requeue => "requeue",
            Disposition::DeadLetter => "dead_letter",
        }
    }
}

impl fmt::Display for Disposition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Front door for a message transport.
pub struct TransportAdapter<P: IngestApi + 'static> {
    pool: Arc<WorkerPool<P>>,
    dead_letters: Arc<dyn DeadLetterSink>,
    time_source: Arc<dyn TimeSource>,
}

impl<P: IngestApi + 'static> TransportAdapter<P> {
    pub fn new(
        pool: Arc<WorkerPool<P>>,
        dead_letters: Arc<dyn DeadLetterSink>,
        time_source: Arc<dyn TimeSource>,
    ) -> Self {
        Self {
            pool,
            dead_letters,
            time_source,
        }
    }

    pub fn pool(&self) -> &Arc<WorkerPool<P>> {
        &self.pool
    }

    /// Process one delivery and decide its fate.
    pub async fn deliver(&self, topic: &str, raw: &[u8]) -> Disposition {
        let disposition = match self.pool.submit(topic.to_string(), raw.to_vec()).await {
            Ok(IngestOutcome::Accepted(_) | IngestOutcome::Duplicate(_)) => Disposition::Ack,
            Ok(IngestOutcome::Rejected(err)) if err.is_transient() => Disposition::Requeue,
            Ok(IngestOutcome::Rejected(err)) => {
                let letter = DeadLetter::new(topic, raw, &err, self.time_source.now());
                match self.dead_letters.write(letter).await {
                    Ok(()) => Disposition::DeadLetter,
                    Err(write_err) => {
                        error!(topic, error = %write_err, "Dead letter write failed; requeueing");
                        Disposition::Requeue
                    }
                }
            }
            Err(PoolError::ShuttingDown) => Disposition::Requeue,
            Err(err @ PoolError::WorkerFailed(_)) => {
                error!(topic, error = %err, "Ingest worker failed");
                Disposition::Requeue
            }
        };

        if disposition == Disposition::Requeue {
            warn!(topic, "Delivery requeued");
        }
        TRANSPORT_DISPOSITIONS
            .with_label_values(&[disposition.as_str()])
            .inc();
        disposition
    }
}
