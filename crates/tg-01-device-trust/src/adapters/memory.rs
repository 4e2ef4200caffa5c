//! # In-Memory Credential Store
//!
//! Credential index keyed by device id. Reads take a shared lock; updates
//! (provisioning, revocation, rotation) take an exclusive one.

use crate::domain::entities::DeviceCredential;
use crate::domain::entities::CredentialStatus;
use crate::ports::outbound::{CredentialSource, CredentialSourceError};
use parking_lot::RwLock;
use shared_crypto::SecretKey;
use shared_types::{DeviceId, Timestamp};
use std::collections::HashMap;
use tracing::info;

/// Thread-safe credential index.
#[derive(Default)]
pub struct InMemoryCredentialStore {
    credentials: RwLock<HashMap<DeviceId, DeviceCredential>>,
}

impl InMemoryCredentialStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store holding `credentials`. Later duplicates win.
    pub fn from_credentials(credentials: impl IntoIterator<Item = DeviceCredential>) -> Self {
        let store = Self::new();
        for credential in credentials {
            store.upsert(credential);
        }
        store
    }

    /// Insert or replace a credential.
    pub fn upsert(&self, credential: DeviceCredential) {
        self.credentials
            .write()
            .insert(credential.device_id.clone(), credential);
    }

    /// Mark a device revoked. Returns `false` if it is not known.
    pub fn revoke(&self, device_id: &DeviceId) -> bool {
        match self.credentials.write().get_mut(device_id) {
            Some(credential) => {
                credential.status = CredentialStatus::Revoked;
                info!(device_id = %device_id, "device revoked");
                true
            }
            None => false,
        }
    }

    /// Rotate a device to `new_key`, retiring the current key at `at`.
    /// Returns `false` if the device is not known.
    pub fn rotate(&self, device_id: &DeviceId, new_key: SecretKey, at: Timestamp) -> bool {
        match self.credentials.write().get_mut(device_id) {
            Some(credential) => {
                credential.rotate(new_key, at);
                info!(device_id = %device_id, "device key rotated");
                true
            }
            None => false,
        }
    }

    /// Remove a device entirely.
    pub fn remove(&self, device_id: &DeviceId) -> Option<DeviceCredential> {
        self.credentials.write().remove(device_id)
    }

    /// Number of known devices.
    pub fn len(&self) -> usize {
        self.credentials.read().len()
    }

    /// Whether no devices are known.
    pub fn is_empty(&self) -> bool {
        self.credentials.read().is_empty()
    }
}

#[async_trait::async_trait]
impl CredentialSource for InMemoryCredentialStore {
    async fn lookup(
        &self,
        device_id: &DeviceId,
    ) -> Result<Option<DeviceCredential>, CredentialSourceError> {
        Ok(self.credentials.read().get(device_id).cloned())
    }
}
