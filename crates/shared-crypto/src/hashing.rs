//! # BLAKE3 Hashing
//!
//! Content hashing for event identities.
//!
//! Fields are framed with a little-endian `u64` length before being fed to
//! the hasher, so `("ab", "c")` and `("a", "bc")` never collide.

use blake3::Hasher;

/// BLAKE3 hash output (256-bit).
pub type Hash = [u8; 32];

/// Stateful BLAKE3 hasher with length-framed fields.
pub struct Blake3Hasher {
    inner: Hasher,
}

impl Blake3Hasher {
    /// Create new hasher.
    pub fn new() -> Self {
        Self {
            inner: Hasher::new(),
        }
    }

    /// Update with raw data.
    pub fn update(&mut self, data: &[u8]) -> &mut Self {
        self.inner.update(data);
        self
    }

    /// Update with one length-prefixed field.
    pub fn update_field(&mut self, data: &[u8]) -> &mut Self {
        self.inner.update(&(data.len() as u64).to_le_bytes());
        self.inner.update(data);
        self
    }

    /// Finalize and return hash.
    pub fn finalize(&self) -> Hash {
        *self.inner.finalize().as_bytes()
    }
}

impl Default for Blake3Hasher {
    fn default() -> Self {
        Self::new()
    }
}

/// Hash data with BLAKE3 (one-shot).
pub fn blake3_hash(data: &[u8]) -> Hash {
    *blake3::hash(data).as_bytes()
}

/// Hash a sequence of fields, each length-prefixed.
pub fn hash_fields<'a, I>(fields: I) -> Hash
where
    I: IntoIterator<Item = &'a [u8]>,
{
    let mut hasher = Blake3Hasher::new();
    for field in fields {
        hasher.update_field(field);
    }
    hasher.finalize()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deterministic() {
        assert_eq!(blake3_hash(b"hello"), blake3_hash(b"hello"));
        assert_ne!(blake3_hash(b"hello"), blake3_hash(b"hellp"));
    }

    #[test]
    fn test_incremental_matches_one_shot() {
        let mut hasher = Blake3Hasher::new();
        hasher.update(b"hello ").update(b"world");
        assert_eq!(hasher.finalize(), blake3_hash(b"hello world"));
    }

    #[test]
    fn test_field_framing_prevents_shift_collisions() {
        let a = hash_fields([b"ab".as_slice(), b"c".as_slice()]);
        let b = hash_fields([b"a".as_slice(), b"bc".as_slice()]);
        assert_ne!(a, b);
    }

    #[test]
    fn test_empty_field_is_significant() {
        let one = hash_fields([b"x".as_slice()]);
        let two = hash_fields([b"x".as_slice(), b"".as_slice()]);
        assert_ne!(one, two);
    }
}
