//! # Ingest Outcomes
//!
//! Every delivery ends in exactly one `IngestOutcome`. Rejections carry a
//! kind, a detail and a transient/permanent classification so the
//! transport adapter can choose between requeue and dead-letter.

use crate::domain::validation::ValidationError;
use shared_types::{DeviceId, EnvelopeError, EventId};
use std::fmt;
use tg_01_device_trust::AuthError;
use tg_02_event_store::StoreError;
use thiserror::Error;

/// Pipeline stage, for timeouts, metrics and logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Parse,
    Authenticate,
    Decrypt,
    Validate,
    Enrich,
    Reserve,
    Save,
    Commit,
    Release,
    Publish,
}

impl Stage {
    /// Stable label.
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Parse => "parse",
            Stage::Authenticate => "authenticate",
            Stage::Decrypt => "decrypt",
            Stage::Validate => "validate",
            Stage::Enrich => "enrich",
            Stage::Reserve => "reserve",
            Stage::Save => "save",
            Stage::Commit => "commit",
            Stage::Release => "release",
            Stage::Publish => "publish",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Rejection category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RejectionKind {
    MalformedEnvelope,
    UnknownDevice,
    DeviceRevoked,
    DecryptionFailure,
    ValidationError,
    StorageUnavailable,
    Timeout,
    InFlight,
}

impl RejectionKind {
    /// Stable label.
    pub fn as_str(&self) -> &'static str {
        match self {
            RejectionKind::MalformedEnvelope => "malformed_envelope",
            RejectionKind::UnknownDevice => "unknown_device",
            RejectionKind::DeviceRevoked => "device_revoked",
            RejectionKind::DecryptionFailure => "decryption_failure",
            RejectionKind::ValidationError => "validation_error",
            RejectionKind::StorageUnavailable => "storage_unavailable",
            RejectionKind::Timeout => "timeout",
            RejectionKind::InFlight => "in_flight",
        }
    }

    /// Whether a redelivery of the same bytes could succeed.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            RejectionKind::StorageUnavailable | RejectionKind::Timeout | RejectionKind::InFlight
        )
    }
}

impl fmt::Display for RejectionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Why a delivery was rejected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IngestError {
    /// The envelope could not be parsed.
    #[error("malformed envelope: {0}")]
    MalformedEnvelope(#[from] EnvelopeError),

    /// No credential for the claimed device.
    #[error("unknown device {0}")]
    UnknownDevice(DeviceId),

    /// Credential exists but is not active.
    #[error("device {0} revoked")]
    DeviceRevoked(DeviceId),

    /// Payload failed authenticated decryption under every candidate key.
    #[error("decryption failed for device {device_id}: {detail}")]
    DecryptionFailure {
        /// Claimed device
        device_id: DeviceId,
        /// Cipher detail
        detail: String,
    },

    /// Decrypted telemetry is unusable.
    #[error("validation failed: {0}")]
    Validation(#[from] ValidationError),

    /// A backend (credential source or store) failed.
    #[error("storage unavailable: {0}")]
    StorageUnavailable(String),

    /// A collaborator call exceeded the stage timeout.
    #[error("{stage} timed out")]
    Timeout {
        /// Stage that timed out
        stage: Stage,
    },

    /// The id is reserved but no stored event backs it yet: either another
    /// delivery is still working on it or an earlier attempt died before
    /// releasing. Redelivery resolves once the reservation settles or
    /// expires.
    #[error("event {0} is reserved but not stored")]
    InFlight(EventId),
}

impl IngestError {
    /// Rejection category.
    pub fn kind(&self) -> RejectionKind {
        match self {
            IngestError::MalformedEnvelope(_) => RejectionKind::MalformedEnvelope,
            IngestError::UnknownDevice(_) => RejectionKind::UnknownDevice,
            IngestError::DeviceRevoked(_) => RejectionKind::DeviceRevoked,
            IngestError::DecryptionFailure { .. } => RejectionKind::DecryptionFailure,
            IngestError::Validation(_) => RejectionKind::ValidationError,
            IngestError::StorageUnavailable(_) => RejectionKind::StorageUnavailable,
            IngestError::Timeout { .. } => RejectionKind::Timeout,
            IngestError::InFlight(_) => RejectionKind::InFlight,
        }
    }

    /// Human-readable detail.
    pub fn detail(&self) -> String {
        self.to_string()
    }

    /// Whether a redelivery could succeed.
    pub fn is_transient(&self) -> bool {
        self.kind().is_transient()
    }
}

impl From<AuthError> for IngestError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::UnknownDevice(id) => IngestError::UnknownDevice(id),
            AuthError::DeviceRevoked(id) => IngestError::DeviceRevoked(id),
            AuthError::Unavailable(reason) => {
                IngestError::StorageUnavailable(format!("credential source: {reason}"))
            }
        }
    }
}

impl From<StoreError> for IngestError {
    fn from(err: StoreError) -> Self {
        IngestError::StorageUnavailable(err.to_string())
    }
}

/// Result of one `ingest` call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IngestOutcome {
    /// Stored for the first time.
    Accepted(EventId),
    /// Already stored by an earlier or concurrent delivery.
    Duplicate(EventId),
    /// Stopped at some stage; nothing durable was created.
    Rejected(IngestError),
}

impl IngestOutcome {
    /// Event id for accepted and duplicate outcomes.
    pub fn event_id(&self) -> Option<&EventId> {
        match self {
            IngestOutcome::Accepted(id) | IngestOutcome::Duplicate(id) => Some(id),
            IngestOutcome::Rejected(_) => None,
        }
    }

    /// Rejection kind, if rejected.
    pub fn rejection_kind(&self) -> Option<RejectionKind> {
        match self {
            IngestOutcome::Rejected(err) => Some(err.kind()),
            _ => None,
        }
    }

    /// `accepted`, `duplicate` or `rejected`.
    pub fn label(&self) -> &'static str {
        match self {
            IngestOutcome::Accepted(_) => "accepted",
            IngestOutcome::Duplicate(_) => "duplicate",
            IngestOutcome::Rejected(_) => "rejected",
        }
    }

    /// Whether the message should be redelivered.
    pub fn is_transient(&self) -> bool {
        matches!(self, IngestOutcome::Rejected(err) if err.is_transient())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classification() {
        assert!(!IngestError::UnknownDevice(DeviceId::new("D1")).is_transient());
        assert!(!IngestError::MalformedEnvelope(EnvelopeError::EmptyDeviceId).is_transient());
        assert!(IngestError::StorageUnavailable("down".into()).is_transient());
        assert!(IngestError::Timeout { stage: Stage::Save }.is_transient());
        assert!(IngestError::InFlight(EventId::from_hex("ab")).is_transient());
    }

    #[test]
    fn test_auth_unavailable_is_transient() {
        let err: IngestError = AuthError::Unavailable("refused".into()).into();
        assert_eq!(err.kind(), RejectionKind::StorageUnavailable);
        assert!(err.is_transient());
    }

    #[test]
    fn test_outcome_accessors() {
        let id = EventId::from_hex("ab");
        assert_eq!(IngestOutcome::Duplicate(id.clone()).event_id(), Some(&id));
        let rejected = IngestOutcome::Rejected(IngestError::Timeout {
            stage: Stage::Reserve,
        });
        assert_eq!(rejected.label(), "rejected");
        assert_eq!(rejected.rejection_kind(), Some(RejectionKind::Timeout));
        assert!(rejected.is_transient());
    }

    #[test]
    fn test_timeout_detail_names_stage() {
        let err = IngestError::Timeout {
            stage: Stage::Authenticate,
        };
        assert_eq!(err.detail(), "authenticate timed out");
    }
}
