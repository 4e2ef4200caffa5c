//! # Authentication Errors

use shared_types::DeviceId;
use thiserror::Error;

/// Why a device could not be authenticated.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuthError {
    /// No credential exists for the device.
    #[error("unknown device {0}")]
    UnknownDevice(DeviceId),

    /// A credential exists but its status is not `Active`.
    #[error("device {0} is not active")]
    DeviceRevoked(DeviceId),

    /// The credential source could not be reached.
    #[error("credential source unavailable: {0}")]
    Unavailable(String),
}

impl AuthError {
    /// Whether a redelivery could succeed.
    pub fn is_transient(&self) -> bool {
        matches!(self, AuthError::Unavailable(_))
    }
}
