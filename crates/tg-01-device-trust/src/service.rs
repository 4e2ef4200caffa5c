//! # Device Authenticator Service
//!
//! Fails closed: a missing credential, a non-active status and an
//! unreachable source all stop the message here.

use crate::domain::entities::DeviceCredential;
use crate::domain::errors::AuthError;
use crate::ports::inbound::DeviceAuthenticatorApi;
use crate::ports::outbound::{CredentialSource, CredentialSourceError};
use shared_types::DeviceId;
use std::sync::Arc;
use tracing::debug;

/// Authenticates devices against a credential source.
///
/// Holds no cache; each call reflects the source as it is at that moment.
pub struct DeviceAuthenticator<S: CredentialSource> {
    source: Arc<S>,
}

impl<S: CredentialSource> DeviceAuthenticator<S> {
    /// Create an authenticator over `source`.
    pub fn new(source: Arc<S>) -> Self {
        Self { source }
    }

    /// The underlying credential source.
    pub fn source(&self) -> &Arc<S> {
        &self.source
    }
}

#[async_trait::async_trait]
impl<S: CredentialSource> DeviceAuthenticatorApi for DeviceAuthenticator<S> {
    async fn authenticate(&self, device_id: &DeviceId) -> Result<DeviceCredential, AuthError> {
        let credential = self
            .source
            .lookup(device_id)
            .await
            .map_err(|CredentialSourceError::Unavailable(reason)| AuthError::Unavailable(reason))?
            .ok_or_else(|| AuthError::UnknownDevice(device_id.clone()))?;

        if !credential.is_active() {
            debug!(device_id = %device_id, status = ?credential.status, "credential not active");
            return Err(AuthError::DeviceRevoked(device_id.clone()));
        }
        Ok(credential)
    }
}
