//! # Digital Signatures
//!
//! Ed25519 signing and verification for authorizations handed to a cellar
//! by an off-chain signer (today: the whitelist join path).
//!
//! The boolean [`verify`] is the everyday check. [`verify_strict`] is the
//! `Result` flavour for call sites that want to `?` their way through a
//! validation chain. Neither says *why* a signature failed: wrong key,
//! wrong message and malformed bytes are all just "nope".

use thiserror::Error;

use super::keys::{Keypair, PublicKey, Signature};

/// Errors during signature operations.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SignatureError {
    #[error("signature verification failed")]
    VerificationFailed,
}

/// Sign `message` with `keypair`.
///
/// # Example
///
/// ```
/// use cellar_protocol::crypto::{Keypair, sign, verify};
///
/// let keypair = Keypair::generate();
/// let digest = [7u8; 32];
/// let signature = sign(&keypair, &digest);
///
/// assert!(verify(&keypair.public_key(), &digest, &signature));
/// ```
pub fn sign(keypair: &Keypair, message: &[u8]) -> Signature {
    keypair.sign(message)
}

/// `true` iff `signature` is valid for `message` under `public_key`.
pub fn verify(public_key: &PublicKey, message: &[u8], signature: &Signature) -> bool {
    public_key.verify(message, signature)
}

/// Like [`verify`], but as a `Result`.
pub fn verify_strict(
    public_key: &PublicKey,
    message: &[u8],
    signature: &Signature,
) -> Result<(), SignatureError> {
    if verify(public_key, message, signature) {
        Ok(())
    } else {
        Err(SignatureError::VerificationFailed)
    }
}
