use super::{decode, encode, run_blocking};
use crate::domain::entities::{IdempotencyRecord, ReservationState, ReserveOutcome};
use crate::domain::errors::StoreError;
use crate::domain::keys;
use crate::ports::inbound::IdempotencyGuard;
use crate::ports::outbound::{BatchOperation, KeyValueStore};
use chrono::Duration;
use parking_lot::Mutex;
use shared_types::{EventId, TimeSource, Timestamp};
use std::sync::Arc;
use tracing::{debug, warn};

/// Idempotency guard over a key-value backend.
///
/// `check_and_reserve` is insert-if-absent under a lock, never a read
/// followed by an unguarded write. A held `Reserved` record is reported as
/// `InFlight`, a `Committed` one as `AlreadySeen`. A `Reserved` record older
/// than the reservation TTL belongs to an ingest that died between reserve
/// and save and may be reclaimed.
pub struct KvIdempotencyGuard<S: KeyValueStore + ?Sized> {
    index: Arc<ReservationIndex<S>>,
}

struct ReservationIndex<S: KeyValueStore + ?Sized> {
    kv: Arc<S>,
    clock: Arc<dyn TimeSource>,
    reservation_ttl: Duration,
    lock: Mutex<()>,
}

impl<S: KeyValueStore + ?Sized> KvIdempotencyGuard<S> {
    /// Create a guard over `kv`.
    pub fn new(kv: Arc<S>, clock: Arc<dyn TimeSource>, reservation_ttl: Duration) -> Self {
        Self {
            index: Arc::new(ReservationIndex {
                kv,
                clock,
                reservation_ttl,
                lock: Mutex::new(()),
            }),
        }
    }
}

impl<S: KeyValueStore + ?Sized> ReservationIndex<S> {
    fn load(&self, key: &[u8]) -> Result<Option<IdempotencyRecord>, StoreError> {
        self.kv.get(key)?.map(|bytes| decode(&bytes)).transpose()
    }

    fn is_abandoned(&self, record: &IdempotencyRecord, now: Timestamp) -> bool {
        record.state == ReservationState::Reserved && now - record.first_seen > self.reservation_ttl
    }

    fn reserve(&self, event_id: &EventId) -> Result<ReserveOutcome, StoreError> {
        let key = keys::idempotency_key(event_id);
        let now = self.clock.now();

        let _guard = self.lock.lock();
        if let Some(existing) = self.load(&key)? {
            match existing.state {
                ReservationState::Committed => return Ok(ReserveOutcome::AlreadySeen),
                ReservationState::Reserved if !self.is_abandoned(&existing, now) => {
                    return Ok(ReserveOutcome::InFlight)
                }
                ReservationState::Reserved => {
                    warn!(event_id = %event_id, reserved_at = %existing.first_seen, "reclaiming abandoned reservation");
                }
            }
        }

        let record = IdempotencyRecord {
            event_id: event_id.clone(),
            first_seen: now,
            state: ReservationState::Reserved,
        };
        self.kv.put(&key, &encode(&record)?)?;
        Ok(ReserveOutcome::Fresh)
    }

    fn commit(&self, event_id: &EventId) -> Result<(), StoreError> {
        let key = keys::idempotency_key(event_id);

        let _guard = self.lock.lock();
        let record = match self.load(&key)? {
            Some(mut record) => {
                record.state = ReservationState::Committed;
                record
            }
            // Pruned between reserve and commit; the stored event stands.
            None => IdempotencyRecord {
                event_id: event_id.clone(),
                first_seen: self.clock.now(),
                state: ReservationState::Committed,
            },
        };
        self.kv.put(&key, &encode(&record)?)?;
        Ok(())
    }

    fn release(&self, event_id: &EventId) -> Result<(), StoreError> {
        let key = keys::idempotency_key(event_id);

        let _guard = self.lock.lock();
        match self.load(&key)? {
            Some(record) if record.state == ReservationState::Reserved => {
                self.kv.delete(&key)?;
                debug!(event_id = %event_id, "reservation released");
            }
            _ => {}
        }
        Ok(())
    }

    fn prune(&self, cutoff: Timestamp) -> Result<usize, StoreError> {
        let _guard = self.lock.lock();
        let mut ops = Vec::new();
        for (key, value) in self.kv.prefix_scan(keys::IDEMPOTENCY_PREFIX)? {
            let record: IdempotencyRecord = decode(&value)?;
            if record.first_seen < cutoff {
                ops.push(BatchOperation::delete(key));
            }
        }

        let pruned = ops.len();
        if pruned > 0 {
            self.kv.atomic_batch_write(ops)?;
            debug!(pruned, cutoff = %cutoff, "idempotency records pruned");
        }
        Ok(pruned)
    }
}

#[async_trait::async_trait]
impl<S: KeyValueStore + ?Sized + 'static> IdempotencyGuard for KvIdempotencyGuard<S> {
    async fn check_and_reserve(&self, event_id: &EventId) -> Result<ReserveOutcome, StoreError> {
        let event_id = event_id.clone();
        run_blocking(&self.index, move |index| index.reserve(&event_id)).await
    }

    async fn commit(&self, event_id: &EventId) -> Result<(), StoreError> {
        let event_id = event_id.clone();
        run_blocking(&self.index, move |index| index.commit(&event_id)).await
    }

    async fn release(&self, event_id: &EventId) -> Result<(), StoreError> {
        let event_id = event_id.clone();
        run_blocking(&self.index, move |index| index.release(&event_id)).await
    }

    async fn record(&self, event_id: &EventId) -> Result<Option<IdempotencyRecord>, StoreError> {
        let key = keys::idempotency_key(event_id);
        run_blocking(&self.index, move |index| index.load(&key)).await
    }

    async fn prune(&self, cutoff: Timestamp) -> Result<usize, StoreError> {
        run_blocking(&self.index, move |index| index.prune(cutoff)).await
    }
}
