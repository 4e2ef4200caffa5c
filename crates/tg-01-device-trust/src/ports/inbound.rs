//! # Inbound Ports (Driving Ports / API)
//!
//! What the ingestion pipeline calls to authenticate a device.

use crate::domain::entities::DeviceCredential;
use crate::domain::errors::AuthError;
use shared_types::DeviceId;

/// Resolve a claimed device identity to a usable credential.
#[async_trait::async_trait]
pub trait DeviceAuthenticatorApi: Send + Sync {
    /// Look the device up and check it may publish.
    ///
    /// # Errors
    /// * `AuthError::UnknownDevice` - no credential exists
    /// * `AuthError::DeviceRevoked` - status is anything other than `Active`
    /// * `AuthError::Unavailable` - the credential source failed
    async fn authenticate(&self, device_id: &DeviceId) -> Result<DeviceCredential, AuthError>;
}
