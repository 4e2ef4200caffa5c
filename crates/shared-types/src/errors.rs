//! # Wire Format Errors
//!
//! Failures decoding what a device sent. All of these are permanent: the
//! same bytes will fail the same way on every redelivery.

use thiserror::Error;

/// The outer envelope could not be parsed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EnvelopeError {
    /// Transport payload is not UTF-8.
    #[error("envelope is not valid UTF-8")]
    NotUtf8,

    /// Transport payload is not the expected JSON object.
    #[error("envelope is not valid JSON: {0}")]
    InvalidJson(String),

    /// `deviceId` is missing or blank.
    #[error("envelope has an empty deviceId")]
    EmptyDeviceId,

    /// `encryptedPayload` is empty.
    #[error("envelope has an empty encryptedPayload")]
    EmptyPayload,

    /// Envelope version this gateway does not speak.
    #[error("unsupported envelope version {0}")]
    UnsupportedVersion(u32),
}

/// The decrypted plaintext could not be read as telemetry.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PayloadError {
    /// Plaintext is not a JSON object.
    #[error("payload is not a JSON object: {0}")]
    InvalidJson(String),

    /// A reading inside a structured `readings` object is not a number.
    #[error("reading {name} is not a number")]
    NonNumericReading { name: String },

    /// `sampleTimestamp` is present but not a recognised time format.
    #[error("sample timestamp {value:?} is not RFC3339 or YYYY-MM-DD HH:MM:SS")]
    InvalidTimestamp { value: String },
}

impl PayloadError {
    /// Name of the payload field the error refers to.
    pub fn field(&self) -> &str {
        match self {
            PayloadError::InvalidJson(_) => "payload",
            PayloadError::NonNumericReading { name } => name,
            PayloadError::InvalidTimestamp { .. } => "sampleTimestamp",
        }
    }
}
