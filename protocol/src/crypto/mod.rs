//! # Cryptographic Primitives
//!
//! Signatures gate the whitelisted join path; hashes bind position configs
//! to the registry and build the typed digests signers commit to.
//!
//! - **Ed25519** signatures.
//! - **BLAKE3** for config fingerprints and key derivation.
//! - **SHA-256** for typed-structure digests, the format off-chain signers
//!   already produce.
//!
//! Everything here is a thin, type-safe wrapper around audited
//! implementations.

pub mod hash;
pub mod keys;
pub mod signatures;

pub use hash::{blake3_hash, domain_separated_hash, hash_fields, sha256};
pub use keys::{Keypair, PublicKey, Signature};
pub use signatures::{sign, verify, verify_strict, SignatureError};
