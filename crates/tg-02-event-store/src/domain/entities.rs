//! # Store Entities

use serde::{Deserialize, Serialize};
use shared_types::{EventId, Timestamp};

/// Lifecycle of an idempotency record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReservationState {
    /// Claimed by an in-flight ingest; the event may not be stored yet.
    Reserved,
    /// The event is durably stored.
    Committed,
}

/// Proof that an event id has been claimed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdempotencyRecord {
    /// The claimed id.
    pub event_id: EventId,
    /// When the id was first reserved (or last reclaimed).
    pub first_seen: Timestamp,
    /// Reserved or committed.
    pub state: ReservationState,
}

/// Result of an atomic reservation attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReserveOutcome {
    /// This caller now owns the id and must store the event.
    Fresh,
    /// Another delivery holds an uncommitted reservation. The event may or
    /// may not be stored; the caller has to check before calling it a
    /// duplicate.
    InFlight,
    /// The id is committed: its event is stored.
    AlreadySeen,
}

/// Index entry pointing at the newest event for a scope.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub(crate) struct LatestPointer {
    pub event_id: EventId,
    pub ingest_timestamp: Timestamp,
}
