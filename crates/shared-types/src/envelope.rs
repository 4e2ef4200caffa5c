//! # Device Envelope
//!
//! The outer structure every device publishes:
//!
//! ```json
//! {"deviceId": "D1", "encryptedPayload": "<hex>", "envelopeVersion": 1}
//! ```
//!
//! `encryptedPayload` is the sealed telemetry (nonce || ciphertext || tag).
//! The envelope itself is not authenticated; the device identity it claims is
//! only trusted once the payload opens under that device's key.

use crate::entities::DeviceId;
use crate::errors::EnvelopeError;
use serde::{Deserialize, Serialize};
use serde_with::{hex::Hex, serde_as};

/// Envelope versions this gateway can process.
pub const SUPPORTED_ENVELOPE_VERSIONS: &[u32] = &[1];

const DEFAULT_ENVELOPE_VERSION: u32 = 1;

fn default_envelope_version() -> u32 {
    DEFAULT_ENVELOPE_VERSION
}

#[serde_as]
#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireEnvelope {
    device_id: String,
    #[serde_as(as = "Hex")]
    encrypted_payload: Vec<u8>,
    #[serde(default = "default_envelope_version")]
    envelope_version: u32,
}

/// A parsed device envelope. Immutable once parsed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceMessage {
    /// Claimed device identity.
    pub device_id: DeviceId,
    /// Sealed payload bytes.
    pub encrypted_payload: Vec<u8>,
    /// Envelope format version.
    pub envelope_version: u32,
}

impl DeviceMessage {
    /// Parse raw transport bytes into an envelope.
    ///
    /// # Errors
    ///
    /// Any structural problem is an `EnvelopeError`; nothing here is
    /// retryable.
    pub fn parse(raw: &[u8]) -> Result<Self, EnvelopeError> {
        let text = std::str::from_utf8(raw).map_err(|_| EnvelopeError::NotUtf8)?;
        let wire: WireEnvelope =
            serde_json::from_str(text).map_err(|e| EnvelopeError::InvalidJson(e.to_string()))?;

        let device_id = wire.device_id.trim();
        if device_id.is_empty() {
            return Err(EnvelopeError::EmptyDeviceId);
        }
        if wire.encrypted_payload.is_empty() {
            return Err(EnvelopeError::EmptyPayload);
        }
        if !SUPPORTED_ENVELOPE_VERSIONS.contains(&wire.envelope_version) {
            return Err(EnvelopeError::UnsupportedVersion(wire.envelope_version));
        }

        Ok(Self {
            device_id: DeviceId::new(device_id),
            encrypted_payload: wire.encrypted_payload,
            envelope_version: wire.envelope_version,
        })
    }

    /// Encode the envelope the way a device publishes it.
    pub fn to_wire_bytes(&self) -> Vec<u8> {
        let wire = WireEnvelope {
            device_id: self.device_id.as_str().to_string(),
            encrypted_payload: self.encrypted_payload.clone(),
            envelope_version: self.envelope_version,
        };
        // A struct of strings, bytes and integers always serializes.
        serde_json::to_vec(&wire).unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_valid_envelope() {
        let raw = br#"{"deviceId":"D1","encryptedPayload":"00ff10","envelopeVersion":1}"#;
        let msg = DeviceMessage::parse(raw).unwrap();
        assert_eq!(msg.device_id.as_str(), "D1");
        assert_eq!(msg.encrypted_payload, vec![0x00, 0xff, 0x10]);
        assert_eq!(msg.envelope_version, 1);
    }

    #[test]
    fn test_version_defaults_to_one() {
        let raw = br#"{"deviceId":"D1","encryptedPayload":"AB"}"#;
        let msg = DeviceMessage::parse(raw).unwrap();
        assert_eq!(msg.envelope_version, 1);
    }

    #[test]
    fn test_rejects_unsupported_version() {
        let raw = br#"{"deviceId":"D1","encryptedPayload":"ab","envelopeVersion":7}"#;
        assert_eq!(
            DeviceMessage::parse(raw),
            Err(EnvelopeError::UnsupportedVersion(7))
        );
    }

    #[test]
    fn test_rejects_blank_device_id() {
        let raw = br#"{"deviceId":"  ","encryptedPayload":"ab"}"#;
        assert_eq!(DeviceMessage::parse(raw), Err(EnvelopeError::EmptyDeviceId));
    }

    #[test]
    fn test_rejects_bad_hex() {
        let raw = br#"{"deviceId":"D1","encryptedPayload":"zz"}"#;
        assert!(matches!(
            DeviceMessage::parse(raw),
            Err(EnvelopeError::InvalidJson(_))
        ));
    }

    #[test]
    fn test_rejects_non_utf8() {
        assert_eq!(
            DeviceMessage::parse(&[0xff, 0xfe, 0x00]),
            Err(EnvelopeError::NotUtf8)
        );
    }

    #[test]
    fn test_wire_encoding_parses_back() {
        let msg = DeviceMessage {
            device_id: DeviceId::new("tracker-7"),
            encrypted_payload: vec![1, 2, 3, 4],
            envelope_version: 1,
        };
        assert_eq!(DeviceMessage::parse(&msg.to_wire_bytes()).unwrap(), msg);
    }
}
