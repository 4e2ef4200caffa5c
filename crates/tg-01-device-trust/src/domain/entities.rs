//! # Device Trust Entities

use chrono::Duration;
use serde::{Deserialize, Serialize};
use shared_crypto::SecretKey;
use shared_types::{DeviceId, Timestamp};

/// Trust status of a device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CredentialStatus {
    /// Device may publish.
    Active,
    /// Device has been revoked.
    Revoked,
    /// Provisioning state not known to the trust store.
    Unknown,
}

/// A key that was replaced by rotation.
#[derive(Debug, Clone)]
pub struct RetiredKey {
    /// The replaced secret.
    pub key: SecretKey,
    /// When it was replaced.
    pub retired_at: Timestamp,
}

/// Trust record for one device.
///
/// Read-only to the pipeline. Never cached across messages: every
/// message looks its credential up again so revocation takes effect on the
/// next delivery.
#[derive(Debug, Clone)]
pub struct DeviceCredential {
    /// Device identity.
    pub device_id: DeviceId,
    /// Current secret.
    pub secret_key: SecretKey,
    /// Trust status.
    pub status: CredentialStatus,
    /// Secret replaced by the most recent rotation, if any.
    pub previous_key: Option<RetiredKey>,
}

impl DeviceCredential {
    /// An active credential with no rotation history.
    pub fn active(device_id: DeviceId, secret_key: SecretKey) -> Self {
        Self {
            device_id,
            secret_key,
            status: CredentialStatus::Active,
            previous_key: None,
        }
    }

    /// Whether the device may publish.
    pub fn is_active(&self) -> bool {
        self.status == CredentialStatus::Active
    }

    /// Keys a payload may be sealed with at `now`.
    ///
    /// The current key always comes first. The retired key is included only
    /// while `now - retired_at <= grace`; a zero grace disables it entirely.
    pub fn candidate_keys(&self, now: Timestamp, grace: Duration) -> Vec<&SecretKey> {
        let mut keys = vec![&self.secret_key];
        if let Some(previous) = &self.previous_key {
            if grace > Duration::zero() && now - previous.retired_at <= grace {
                keys.push(&previous.key);
            }
        }
        keys
    }

    /// Replace the current key, retiring the old one at `at`.
    pub fn rotate(&mut self, new_key: SecretKey, at: Timestamp) {
        let old = std::mem::replace(&mut self.secret_key, new_key);
        self.previous_key = Some(RetiredKey {
            key: old,
            retired_at: at,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn credential() -> DeviceCredential {
        DeviceCredential::active(DeviceId::new("D1"), SecretKey::from_bytes([1; 32]))
    }

    #[test]
    fn test_no_rotation_has_one_candidate() {
        let now = Utc.with_ymd_and_hms(2024, 5, 1, 0, 0, 0).unwrap();
        assert_eq!(credential().candidate_keys(now, Duration::hours(1)).len(), 1);
    }

    #[test]
    fn test_retired_key_within_grace() {
        let at = Utc.with_ymd_and_hms(2024, 5, 1, 0, 0, 0).unwrap();
        let mut cred = credential();
        cred.rotate(SecretKey::from_bytes([2; 32]), at);

        let keys = cred.candidate_keys(at + Duration::minutes(30), Duration::hours(1));
        assert_eq!(keys.len(), 2);
        assert_eq!(keys[0].as_bytes(), &[2; 32]);
        assert_eq!(keys[1].as_bytes(), &[1; 32]);
    }

    #[test]
    fn test_retired_key_after_grace() {
        let at = Utc.with_ymd_and_hms(2024, 5, 1, 0, 0, 0).unwrap();
        let mut cred = credential();
        cred.rotate(SecretKey::from_bytes([2; 32]), at);

        let keys = cred.candidate_keys(at + Duration::hours(2), Duration::hours(1));
        assert_eq!(keys.len(), 1);
    }

    #[test]
    fn test_zero_grace_disables_retired_key() {
        let at = Utc.with_ymd_and_hms(2024, 5, 1, 0, 0, 0).unwrap();
        let mut cred = credential();
        cred.rotate(SecretKey::from_bytes([2; 32]), at);
        assert_eq!(cred.candidate_keys(at, Duration::zero()).len(), 1);
    }

    #[test]
    fn test_status_serializes_snake_case() {
        let json = serde_json::to_string(&CredentialStatus::Revoked).unwrap();
        assert_eq!(json, "\"revoked\"");
    }
}
