//! # Shared Crypto
//!
//! ## Components
//!
//! | Module | Algorithm | Use Case |
//! |--------|-----------|----------|
//! | `symmetric` | XChaCha20-Poly1305 | Device payload sealing |
//! | `hashing` | BLAKE3 | Event identity digests |
//!
//! ## Security Properties
//!
//! - **XChaCha20**: 192-bit nonce, constant-time, side-channel immune
//! - **Poly1305**: tampering is detected before any plaintext is returned
//! - **Keys** are zeroized on drop and never printed

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod errors;
pub mod hashing;
pub mod symmetric;

// Re-exports
pub use errors::CryptoError;
pub use hashing::{blake3_hash, hash_fields, Blake3Hasher, Hash};
pub use symmetric::{decrypt, encrypt, open, seal, Nonce, SecretKey, KEY_LEN, NONCE_LEN, TAG_LEN};
