//! # Hashing Utilities
//!
//! Two hash functions, each with a clear job:
//!
//! - **BLAKE3**: position config fingerprints in the registry and
//!   deterministic address derivation, domain-separated through
//!   `derive_key` mode.
//!
//! - **SHA-256**: typed-structure digests that external signers produce
//!   (the whitelist authorization).
//!
//! ## hash_fields
//!
//! [`hash_fields`] is the typed-digest primitive. Each field is prefixed with
//! its length as a big-endian `u64` before it is absorbed, so
//! `("ab", "c")` and `("a", "bc")` can never collide. Concatenating raw
//! fields without a length prefix is how signature schemes get broken.

use sha2::{Digest, Sha256};

/// Compute the SHA-256 hash of the input data.
pub fn sha256(data: &[u8]) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(data);
    let result = hasher.finalize();
    let mut output = [0u8; 32];
    output.copy_from_slice(&result);
    output
}

/// Compute the BLAKE3 hash of the input data.
///
/// # Example
///
/// ```
/// use cellar_protocol::crypto::blake3_hash;
///
/// let hash = blake3_hash(b"cellar");
/// assert_eq!(hash.len(), 32);
/// ```
pub fn blake3_hash(data: &[u8]) -> [u8; 32] {
    *blake3::hash(data).as_bytes()
}

/// Domain-separated BLAKE3 hash using `derive_key` mode.
///
/// `domain_separated_hash("a", data)` and `domain_separated_hash("b", data)`
/// never collide, because the context string selects a different IV.
pub fn domain_separated_hash(context: &str, data: &[u8]) -> [u8; 32] {
    let mut hasher = blake3::Hasher::new_derive_key(context);
    hasher.update(data);
    *hasher.finalize().as_bytes()
}

/// SHA-256 over a sequence of length-prefixed fields.
pub fn hash_fields(fields: &[&[u8]]) -> [u8; 32] {
    let mut hasher = Sha256::new();
    for field in fields {
        hasher.update((field.len() as u64).to_be_bytes());
        hasher.update(field);
    }
    let result = hasher.finalize();
    let mut output = [0u8; 32];
    output.copy_from_slice(&result);
    output
}
