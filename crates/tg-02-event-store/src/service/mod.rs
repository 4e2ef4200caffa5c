//! # Store Services
//!
//! `EventStore` and `IdempotencyGuard` implemented over any
//! `KeyValueStore`. Both may share one backend; their key spaces do not
//! overlap.
//!
//! Backend calls are synchronous and may block on disk, so every trait
//! method runs its backend work on the blocking pool. A caller that stops
//! waiting (a stage timeout) gets control back at once; the detached write
//! still completes or fails on its own.

mod events;
mod idempotency;

pub use events::KvEventStore;
pub use idempotency::KvIdempotencyGuard;

use crate::domain::errors::StoreError;
use serde::{de::DeserializeOwned, Serialize};
use std::sync::Arc;

pub(crate) fn encode<T: Serialize>(value: &T) -> Result<Vec<u8>, StoreError> {
    Ok(bincode::serialize(value)?)
}

pub(crate) fn decode<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, StoreError> {
    Ok(bincode::deserialize(bytes)?)
}

/// Run `op` against `table` on the blocking pool.
pub(crate) async fn run_blocking<C, T, F>(table: &Arc<C>, op: F) -> Result<T, StoreError>
where
    C: Send + Sync + 'static,
    T: Send + 'static,
    F: FnOnce(&C) -> Result<T, StoreError> + Send + 'static,
{
    let table = Arc::clone(table);
    tokio::task::spawn_blocking(move || op(&table))
        .await
        .map_err(|e| StoreError::StorageUnavailable(format!("storage task failed: {e}")))?
}
