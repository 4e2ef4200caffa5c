//! # Credential File Loader
//!
//! Reads provisioned credentials from a TOML or JSON file. Keys are hex.
//!
//! ```toml
//! [[devices]]
//! device_id = "D1"
//! secret_key = "000102...1f"
//! status = "active"                          # optional, default active
//! previous_key = "..."                       # optional, with retired_at
//! previous_key_retired_at = "2024-05-01T00:00:00Z"
//! ```

use crate::adapters::memory::InMemoryCredentialStore;
use crate::domain::entities::{CredentialStatus, DeviceCredential, RetiredKey};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use shared_crypto::SecretKey;
use shared_types::DeviceId;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::info;

/// Errors reading a credential file.
#[derive(Debug, Error)]
pub enum CredentialFileError {
    /// File could not be read
    #[error("cannot read credential file {path}: {source}")]
    Io {
        /// Path that failed
        path: PathBuf,
        /// Underlying error
        source: std::io::Error,
    },

    /// File is not valid TOML/JSON of the expected shape
    #[error("cannot parse credential file: {0}")]
    Parse(String),

    /// Extension is neither `.toml` nor `.json`
    #[error("unsupported credential file format: {0}")]
    UnsupportedFormat(String),

    /// One entry is unusable
    #[error("invalid credential for device {device_id}: {reason}")]
    InvalidEntry {
        /// Device the entry names
        device_id: String,
        /// What is wrong with it
        reason: String,
    },
}

/// Encoding of a credential file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CredentialFormat {
    /// TOML with a `[[devices]]` array
    Toml,
    /// JSON object with a `devices` array
    Json,
}

impl CredentialFormat {
    /// Pick the format from a file extension.
    pub fn from_path(path: &Path) -> Result<Self, CredentialFileError> {
        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("toml") => Ok(Self::Toml),
            Some(ext) if ext.eq_ignore_ascii_case("json") => Ok(Self::Json),
            other => Err(CredentialFileError::UnsupportedFormat(
                other.unwrap_or("<none>").to_string(),
            )),
        }
    }
}

#[derive(Deserialize)]
struct CredentialFile {
    #[serde(default)]
    devices: Vec<CredentialEntry>,
}

#[derive(Deserialize)]
struct CredentialEntry {
    device_id: String,
    secret_key: String,
    #[serde(default = "default_status")]
    status: CredentialStatus,
    previous_key: Option<String>,
    previous_key_retired_at: Option<String>,
}

fn default_status() -> CredentialStatus {
    CredentialStatus::Active
}

impl CredentialEntry {
    fn into_credential(self) -> Result<DeviceCredential, CredentialFileError> {
        let device_id = self.device_id.trim().to_string();
        let invalid = |reason: String| CredentialFileError::InvalidEntry {
            device_id: device_id.clone(),
            reason,
        };
        if device_id.is_empty() {
            return Err(invalid("empty device_id".to_string()));
        }

        let secret_key =
            SecretKey::from_hex(&self.secret_key).map_err(|e| invalid(e.to_string()))?;

        let previous_key = match (self.previous_key, self.previous_key_retired_at) {
            (None, None) => None,
            (Some(key), Some(at)) => Some(RetiredKey {
                key: SecretKey::from_hex(&key).map_err(|e| invalid(e.to_string()))?,
                retired_at: DateTime::parse_from_rfc3339(&at)
                    .map_err(|e| invalid(format!("previous_key_retired_at: {e}")))?
                    .with_timezone(&Utc),
            }),
            _ => {
                return Err(invalid(
                    "previous_key and previous_key_retired_at must be set together".to_string(),
                ))
            }
        };

        Ok(DeviceCredential {
            device_id: DeviceId::new(device_id.clone()),
            secret_key,
            status: self.status,
            previous_key,
        })
    }
}

/// Parse credentials from file content.
pub fn parse_credentials(
    text: &str,
    format: CredentialFormat,
) -> Result<Vec<DeviceCredential>, CredentialFileError> {
    let file: CredentialFile = match format {
        CredentialFormat::Toml => {
            toml::from_str(text).map_err(|e| CredentialFileError::Parse(e.to_string()))?
        }
        CredentialFormat::Json => {
            serde_json::from_str(text).map_err(|e| CredentialFileError::Parse(e.to_string()))?
        }
    };
    file.devices
        .into_iter()
        .map(CredentialEntry::into_credential)
        .collect()
}

/// Read and parse a credential file.
pub fn load_credentials(path: &Path) -> Result<Vec<DeviceCredential>, CredentialFileError> {
    let format = CredentialFormat::from_path(path)?;
    let text = std::fs::read_to_string(path).map_err(|source| CredentialFileError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let credentials = parse_credentials(&text, format)?;
    info!(path = %path.display(), devices = credentials.len(), "credentials loaded");
    Ok(credentials)
}

impl InMemoryCredentialStore {
    /// Build a store from a credential file.
    pub fn load_file(path: &Path) -> Result<Self, CredentialFileError> {
        Ok(Self::from_credentials(load_credentials(path)?))
    }
}
