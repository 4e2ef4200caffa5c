//! # Outbound Ports (Driven Ports / SPI)
//!
//! The trust store this subsystem reads from. Credential provisioning is
//! owned elsewhere; this side only ever reads.

use crate::domain::entities::DeviceCredential;
use shared_types::DeviceId;
use thiserror::Error;

/// Error from the credential source.
#[derive(Debug, Error)]
pub enum CredentialSourceError {
    /// Backend could not be reached or answered with an error
    #[error("credential source unavailable: {0}")]
    Unavailable(String),
}

/// External trust store.
///
/// Implementations must be safe for concurrent use and O(1) amortized per
/// lookup.
#[async_trait::async_trait]
pub trait CredentialSource: Send + Sync {
    /// Fetch the current credential for a device, if one exists.
    async fn lookup(
        &self,
        device_id: &DeviceId,
    ) -> Result<Option<DeviceCredential>, CredentialSourceError>;
}
