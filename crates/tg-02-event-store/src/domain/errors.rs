//! # Store Errors

use shared_types::EventId;
use thiserror::Error;

/// Errors from the event store and idempotency guard.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    /// An event with this id is already stored. Callers treat it as an
    /// idempotent success.
    #[error("event {0} already stored")]
    DuplicateKey(EventId),

    /// Backend failed; retrying later may succeed.
    #[error("storage unavailable: {0}")]
    StorageUnavailable(String),

    /// A stored value could not be decoded or encoded.
    #[error("serialization failed: {0}")]
    Serialization(String),
}

impl StoreError {
    /// Whether a redelivery could succeed.
    pub fn is_transient(&self) -> bool {
        matches!(self, StoreError::StorageUnavailable(_))
    }
}

/// Key-value backend errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum KVStoreError {
    /// I/O error during read/write.
    #[error("KV store I/O error: {message}")]
    IOError {
        /// Backend message
        message: String,
    },

    /// Data corruption in the store.
    #[error("KV store corruption: {message}")]
    CorruptionError {
        /// Backend message
        message: String,
    },
}

impl From<KVStoreError> for StoreError {
    fn from(err: KVStoreError) -> Self {
        match err {
            KVStoreError::IOError { .. } => StoreError::StorageUnavailable(err.to_string()),
            KVStoreError::CorruptionError { .. } => StoreError::Serialization(err.to_string()),
        }
    }
}

impl From<bincode::Error> for StoreError {
    fn from(err: bincode::Error) -> Self {
        StoreError::Serialization(err.to_string())
    }
}
