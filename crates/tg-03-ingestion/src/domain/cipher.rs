//! # Payload Cipher
//!
//! Authenticated decryption of the sealed payload. The device id is bound
//! as associated data, so a payload sealed for one device never opens
//! under another device's envelope even if both share a key.
//!
//! During a rotation grace window the retired key is tried after the
//! current one. Which key opened the payload is reported so operators can
//! see when a fleet has finished migrating.

use chrono::Duration;
use shared_crypto::{open, seal, CryptoError, SecretKey};
use shared_types::{DeviceId, DeviceMessage, TelemetryPayload, Timestamp};
use tg_01_device_trust::DeviceCredential;
use thiserror::Error;

/// No candidate key authenticated the payload.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{0}")]
pub struct DecryptionFailure(pub String);

impl From<CryptoError> for DecryptionFailure {
    fn from(err: CryptoError) -> Self {
        Self(err.to_string())
    }
}

/// Which credential key opened a payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeySlot {
    Current,
    Previous,
}

/// Decrypts device payloads against a credential.
#[derive(Debug, Clone)]
pub struct PayloadCipher {
    rotation_grace: Duration,
}

impl PayloadCipher {
    /// Create a cipher that honours a retired key for `rotation_grace`.
    pub fn new(rotation_grace: Duration) -> Self {
        Self { rotation_grace }
    }

    /// Open `sealed` under a single key.
    pub fn decrypt(
        &self,
        sealed: &[u8],
        key: &SecretKey,
        device_id: &DeviceId,
    ) -> Result<Vec<u8>, DecryptionFailure> {
        Ok(open(key, sealed, device_id.as_str().as_bytes())?)
    }

    /// Open `sealed` with whichever of the credential's keys is valid at
    /// `now`.
    pub fn open(
        &self,
        sealed: &[u8],
        credential: &DeviceCredential,
        now: Timestamp,
    ) -> Result<(Vec<u8>, KeySlot), DecryptionFailure> {
        let mut last = DecryptionFailure("no candidate key".to_string());
        for (index, key) in credential
            .candidate_keys(now, self.rotation_grace)
            .into_iter()
            .enumerate()
        {
            match self.decrypt(sealed, key, &credential.device_id) {
                Ok(plaintext) => {
                    let slot = if index == 0 {
                        KeySlot::Current
                    } else {
                        KeySlot::Previous
                    };
                    return Ok((plaintext, slot));
                }
                Err(err) => last = err,
            }
        }
        Err(last)
    }
}

/// Seal a payload the way a device does.
pub fn seal_for_device(
    key: &SecretKey,
    device_id: &DeviceId,
    plaintext: &[u8],
) -> Result<Vec<u8>, CryptoError> {
    seal(key, plaintext, device_id.as_str().as_bytes())
}

/// Build the complete transport bytes a device would publish.
pub fn seal_envelope(
    key: &SecretKey,
    device_id: &DeviceId,
    payload: &TelemetryPayload,
) -> Result<Vec<u8>, CryptoError> {
    let message = DeviceMessage {
        device_id: device_id.clone(),
        encrypted_payload: seal_for_device(key, device_id, &payload.to_json_bytes())?,
        envelope_version: 1,
    };
    Ok(message.to_wire_bytes())
}
