//! Cross-subsystem scenarios.

#[cfg(feature = "rocksdb")]
mod durability;
mod idempotency;
mod ingestion;
mod security;
mod transport;
