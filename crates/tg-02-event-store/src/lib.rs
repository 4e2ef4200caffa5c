//! # Event Store Subsystem (TG-02)
//!
//! Durable storage of enriched events and the idempotency index that
//! collapses redelivered messages.
//!
//! ## Architecture
//!
//! - **Domain Layer** (`domain/`): records, errors, key layout
//! - **Ports Layer** (`ports/`): `EventStore` and `IdempotencyGuard` in,
//!   `KeyValueStore` out
//! - **Adapters** (`adapters/`): in-memory and RocksDB (feature `rocksdb`)
//! - **Service Layer** (`service/`): both inbound ports over one backend
//!
//! ## Correctness
//!
//! The event key is the `EventId`, so a retried `save` can never create a
//! second copy even if the idempotency record was lost or pruned. The
//! guard is the fast path and audit record; key uniqueness is the backstop.

pub mod adapters;
pub mod domain;
pub mod ports;
pub mod service;

// Re-export public API
pub use adapters::InMemoryKVStore;
#[cfg(feature = "rocksdb")]
pub use adapters::{RocksDbConfig, RocksDbStore};
pub use domain::entities::{IdempotencyRecord, ReservationState, ReserveOutcome};
pub use domain::errors::{KVStoreError, StoreError};
pub use ports::inbound::{EventStore, IdempotencyGuard};
pub use ports::outbound::{BatchOperation, KeyValueStore, ScanResult};
pub use service::{KvEventStore, KvIdempotencyGuard};
