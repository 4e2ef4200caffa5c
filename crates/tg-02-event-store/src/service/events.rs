use super::{decode, encode, run_blocking};
use crate::domain::entities::LatestPointer;
use crate::domain::errors::StoreError;
use crate::domain::keys;
use crate::ports::inbound::EventStore;
use crate::ports::outbound::{BatchOperation, KeyValueStore};
use parking_lot::Mutex;
use shared_types::{DeviceId, EnrichedEvent, EventId};
use std::sync::Arc;
use tracing::debug;

/// Event store over a key-value backend.
///
/// `save` checks for the key and writes the event, its history entry and
/// the latest-reading pointers in one batch, under a writer lock. Two
/// concurrent saves of the same id therefore yield one success and one
/// `DuplicateKey`.
pub struct KvEventStore<S: KeyValueStore + ?Sized> {
    table: Arc<EventTable<S>>,
}

struct EventTable<S: KeyValueStore + ?Sized> {
    kv: Arc<S>,
    write_lock: Mutex<()>,
}

impl<S: KeyValueStore + ?Sized> KvEventStore<S> {
    /// Create a store over `kv`.
    pub fn new(kv: Arc<S>) -> Self {
        Self {
            table: Arc::new(EventTable {
                kv,
                write_lock: Mutex::new(()),
            }),
        }
    }
}

impl<S: KeyValueStore + ?Sized> EventTable<S> {
    fn load(&self, event_id: &EventId) -> Result<Option<EnrichedEvent>, StoreError> {
        self.kv
            .get(&keys::event_key(event_id))?
            .map(|bytes| decode(&bytes))
            .transpose()
    }

    fn load_pointer(&self, key: &[u8]) -> Result<Option<LatestPointer>, StoreError> {
        self.kv
            .get(key)?
            .map(|bytes| decode(&bytes))
            .transpose()
    }

    fn follow_pointer(&self, key: &[u8]) -> Result<Option<EnrichedEvent>, StoreError> {
        match self.load_pointer(key)? {
            Some(pointer) => self.load(&pointer.event_id),
            None => Ok(None),
        }
    }

    /// Put `pointer` at `key` unless the current one is at least as new.
    fn advance_pointer(
        &self,
        key: Vec<u8>,
        pointer: &LatestPointer,
        ops: &mut Vec<BatchOperation>,
    ) -> Result<(), StoreError> {
        let newer = match self.load_pointer(&key)? {
            Some(current) => pointer.ingest_timestamp > current.ingest_timestamp,
            None => true,
        };
        if newer {
            ops.push(BatchOperation::put(key, encode(pointer)?));
        }
        Ok(())
    }

    fn save(&self, event: &EnrichedEvent) -> Result<(), StoreError> {
        let event_key = keys::event_key(&event.event_id);
        let value = encode(event)?;
        let pointer = LatestPointer {
            event_id: event.event_id.clone(),
            ingest_timestamp: event.ingest_timestamp,
        };

        let _guard = self.write_lock.lock();
        if self.kv.exists(&event_key)? {
            return Err(StoreError::DuplicateKey(event.event_id.clone()));
        }

        let mut ops = vec![
            BatchOperation::put(event_key, value),
            BatchOperation::put(
                keys::device_index_key(&event.device_id, event.ingest_timestamp, &event.event_id),
                Vec::new(),
            ),
        ];
        self.advance_pointer(keys::latest_device_key(&event.device_id), &pointer, &mut ops)?;
        self.advance_pointer(keys::LATEST_ALL_KEY.to_vec(), &pointer, &mut ops)?;
        self.kv.atomic_batch_write(ops)?;

        debug!(event_id = %event.event_id, device_id = %event.device_id, "event stored");
        Ok(())
    }

    fn events_for_device(
        &self,
        device_id: &DeviceId,
        limit: usize,
    ) -> Result<Vec<EnrichedEvent>, StoreError> {
        let entries = self.kv.prefix_scan(&keys::device_index_prefix(device_id))?;
        let mut events = Vec::with_capacity(limit.min(entries.len()));
        for (key, _) in entries.iter().rev().take(limit) {
            let event_id = keys::event_id_from_index_key(key).ok_or_else(|| {
                StoreError::Serialization("malformed device index key".to_string())
            })?;
            if let Some(event) = self.load(&event_id)? {
                events.push(event);
            }
        }
        Ok(events)
    }
}

#[async_trait::async_trait]
impl<S: KeyValueStore + ?Sized + 'static> EventStore for KvEventStore<S> {
    async fn save(&self, event: &EnrichedEvent) -> Result<(), StoreError> {
        let event = event.clone();
        run_blocking(&self.table, move |table| table.save(&event)).await
    }

    async fn get(&self, event_id: &EventId) -> Result<Option<EnrichedEvent>, StoreError> {
        let event_id = event_id.clone();
        run_blocking(&self.table, move |table| table.load(&event_id)).await
    }

    async fn exists(&self, event_id: &EventId) -> Result<bool, StoreError> {
        let key = keys::event_key(event_id);
        run_blocking(&self.table, move |table| Ok(table.kv.exists(&key)?)).await
    }

    async fn latest(&self) -> Result<Option<EnrichedEvent>, StoreError> {
        run_blocking(&self.table, |table| table.follow_pointer(keys::LATEST_ALL_KEY)).await
    }

    async fn latest_for_device(
        &self,
        device_id: &DeviceId,
    ) -> Result<Option<EnrichedEvent>, StoreError> {
        let key = keys::latest_device_key(device_id);
        run_blocking(&self.table, move |table| table.follow_pointer(&key)).await
    }

    async fn events_for_device(
        &self,
        device_id: &DeviceId,
        limit: usize,
    ) -> Result<Vec<EnrichedEvent>, StoreError> {
        let device_id = device_id.clone();
        run_blocking(&self.table, move |table| {
            table.events_for_device(&device_id, limit)
        })
        .await
    }

    async fn count(&self) -> Result<usize, StoreError> {
        run_blocking(&self.table, |table| {
            Ok(table.kv.prefix_scan(keys::EVENT_PREFIX)?.len())
        })
        .await
    }
}
