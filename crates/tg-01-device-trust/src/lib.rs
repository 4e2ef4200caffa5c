//! # Device Trust Subsystem (TG-01)
//!
//! Resolves a claimed device identity to its credential and decides
//! whether the device may publish.
//!
//! ## Architecture
//!
//! - **Domain Layer** (`domain/`): credentials, status, key rotation
//! - **Ports Layer** (`ports/`): `DeviceAuthenticatorApi` in,
//!   `CredentialSource` out
//! - **Adapters** (`adapters/`): in-memory index, credential file loader
//! - **Service Layer** (`service.rs`): `DeviceAuthenticator`
//!
//! ## Security Notes
//!
//! - **Fail closed**: unknown devices and any non-active status are rejected
//! - **No caching**: revocation is visible on the very next message

pub mod adapters;
pub mod domain;
pub mod ports;
pub mod service;

// Re-export public API
pub use adapters::file::{load_credentials, parse_credentials, CredentialFileError, CredentialFormat};
pub use adapters::memory::InMemoryCredentialStore;
pub use domain::entities::{CredentialStatus, DeviceCredential, RetiredKey};
pub use domain::errors::AuthError;
pub use ports::inbound::DeviceAuthenticatorApi;
pub use ports::outbound::{CredentialSource, CredentialSourceError};
pub use service::DeviceAuthenticator;
