//! # Inbound Ports (Driving Ports / API)
//!
//! What the ingestion pipeline and query callers use.

use crate::domain::entities::{IdempotencyRecord, ReserveOutcome};
use crate::domain::errors::StoreError;
use shared_types::{DeviceId, EnrichedEvent, EventId, Timestamp};

/// Durable append-only store of enriched events, keyed by `EventId`.
#[async_trait::async_trait]
pub trait EventStore: Send + Sync {
    /// Persist an event.
    ///
    /// # Errors
    /// * `StoreError::DuplicateKey` - an event with this id already exists;
    ///   nothing was written
    /// * `StoreError::StorageUnavailable` - transient backend failure
    async fn save(&self, event: &EnrichedEvent) -> Result<(), StoreError>;

    /// Fetch an event by id.
    async fn get(&self, event_id: &EventId) -> Result<Option<EnrichedEvent>, StoreError>;

    /// Whether an event with this id is stored.
    async fn exists(&self, event_id: &EventId) -> Result<bool, StoreError>;

    /// Event with the greatest ingest timestamp across all devices.
    async fn latest(&self) -> Result<Option<EnrichedEvent>, StoreError>;

    /// Event with the greatest ingest timestamp for one device.
    async fn latest_for_device(
        &self,
        device_id: &DeviceId,
    ) -> Result<Option<EnrichedEvent>, StoreError>;

    /// Up to `limit` events for one device, newest first.
    async fn events_for_device(
        &self,
        device_id: &DeviceId,
        limit: usize,
    ) -> Result<Vec<EnrichedEvent>, StoreError>;

    /// Number of stored events.
    async fn count(&self) -> Result<usize, StoreError>;
}

/// Atomic claim on event ids.
///
/// Two concurrent `check_and_reserve` calls for the same id yield exactly
/// one `Fresh`.
#[async_trait::async_trait]
pub trait IdempotencyGuard: Send + Sync {
    /// Claim `event_id` if nobody holds it.
    ///
    /// `InFlight` means another delivery holds an uncommitted claim and the
    /// event may or may not be stored yet. `AlreadySeen` means it is.
    async fn check_and_reserve(&self, event_id: &EventId) -> Result<ReserveOutcome, StoreError>;

    /// Mark a reservation as backed by a stored event.
    async fn commit(&self, event_id: &EventId) -> Result<(), StoreError>;

    /// Drop a reservation whose event was never stored.
    async fn release(&self, event_id: &EventId) -> Result<(), StoreError>;

    /// Current record for `event_id`.
    async fn record(&self, event_id: &EventId) -> Result<Option<IdempotencyRecord>, StoreError>;

    /// Remove records first seen before `cutoff`. Returns how many.
    ///
    /// A pruned id that is redelivered later is treated as new by the
    /// guard; the event store's key uniqueness still prevents a second
    /// stored copy.
    async fn prune(&self, cutoff: Timestamp) -> Result<usize, StoreError>;
}
