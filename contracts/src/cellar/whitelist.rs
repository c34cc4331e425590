//! # Whitelisted Join Path
//!
//! With the whitelist enabled, the plain `deposit`/`mint` entry points are
//! closed. Joining requires an authorization signed by the cellar's
//! automation signer (or its owner) within the last five minutes.
//!
//! The signed message is a typed digest:
//!
//! ```text
//! hash_fields(domain_separator(cellar), WHITELIST_PROOF_TYPE,
//!             sender, receiver, signed_at seconds (i64 BE), signed_at subsec nanos (u32 BE))
//! ```
//!
//! The domain separator binds the digest to one cellar, so an authorization
//! for one cellar is worthless at another. Ed25519 can't recover a signer
//! from a signature, so the signer's public key travels with it and is
//! checked against the designated addresses.

use cellar_protocol::config::{WHITELIST_DOMAIN_TAG, WHITELIST_PROOF_TYPE, WHITELIST_VALIDITY_WINDOW_SECS};
use cellar_protocol::crypto::{hash_fields, verify_strict, Keypair, PublicKey, Signature};
use cellar_protocol::Address;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::{CallContext, Cellar, CellarError};

/// What the signer vouches for: `sender` may join, minting to `receiver`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WhitelistProof {
    pub sender: Address,
    pub receiver: Address,
    pub signed_at: DateTime<Utc>,
}

/// Binds whitelist digests to one cellar.
pub fn domain_separator(vault: Address) -> [u8; 32] {
    hash_fields(&[WHITELIST_DOMAIN_TAG.as_bytes(), vault.as_bytes()])
}

impl WhitelistProof {
    /// The digest the signer signs for `vault`.
    pub fn digest(&self, vault: Address) -> [u8; 32] {
        hash_fields(&[
            &domain_separator(vault),
            WHITELIST_PROOF_TYPE.as_bytes(),
            self.sender.as_bytes(),
            self.receiver.as_bytes(),
            &self.signed_at.timestamp().to_be_bytes(),
            &self.signed_at.timestamp_subsec_nanos().to_be_bytes(),
        ])
    }
}

/// A signature over a [`WhitelistProof`] digest, with the key that made it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WhitelistSignature {
    pub signer: PublicKey,
    pub signature: Signature,
}

impl WhitelistSignature {
    /// Signs `proof` for `vault` with `keypair`.
    pub fn sign(keypair: &Keypair, proof: &WhitelistProof, vault: Address) -> Self {
        Self {
            signer: keypair.public_key(),
            signature: keypair.sign(&proof.digest(vault)),
        }
    }
}

impl Cellar {
    /// Checks a join authorization for `ctx.caller -> receiver`. Skipped
    /// entirely while the whitelist is disabled.
    fn verify_whitelist(
        &self,
        ctx: &CallContext<'_>,
        receiver: Address,
        signed_at: DateTime<Utc>,
        authorization: &WhitelistSignature,
    ) -> Result<(), CellarError> {
        if !self.state.whitelist_enabled {
            return Ok(());
        }

        let expires = signed_at.checked_add_signed(Duration::seconds(WHITELIST_VALIDITY_WINDOW_SECS));
        if ctx.now < signed_at || expires.map_or(true, |expires| ctx.now > expires) {
            return Err(CellarError::SignatureDeadlineInvalid {
                signed_at,
                now: ctx.now,
            });
        }

        let signer = authorization.signer.to_address();
        if signer != self.state.automation_signer && signer != self.state.owner {
            return Err(CellarError::InvalidSignature);
        }

        let proof = WhitelistProof {
            sender: ctx.caller,
            receiver,
            signed_at,
        };
        verify_strict(
            &authorization.signer,
            &proof.digest(self.address),
            &authorization.signature,
        )
        .map_err(|_| CellarError::InvalidSignature)?;

        debug!(cellar = %self.address, sender = %ctx.caller, %receiver, %signer, "whitelist authorization accepted");
        Ok(())
    }

    /// `deposit`, gated on a join authorization.
    pub fn whitelist_deposit(
        &mut self,
        ctx: &mut CallContext<'_>,
        assets: u64,
        receiver: Address,
        signed_at: DateTime<Utc>,
        authorization: &WhitelistSignature,
    ) -> Result<u64, CellarError> {
        let _lock = self.guards.enter()?;
        self.atomically(ctx, |cellar, ctx| {
            cellar.ensure_not_shutdown()?;
            cellar.verify_whitelist(ctx, receiver, signed_at, authorization)?;
            cellar.deposit_inner(ctx, assets, receiver)
        })
    }

    /// `mint`, gated on a join authorization.
    pub fn whitelist_mint(
        &mut self,
        ctx: &mut CallContext<'_>,
        shares: u64,
        receiver: Address,
        signed_at: DateTime<Utc>,
        authorization: &WhitelistSignature,
    ) -> Result<u64, CellarError> {
        let _lock = self.guards.enter()?;
        self.atomically(ctx, |cellar, ctx| {
            cellar.ensure_not_shutdown()?;
            cellar.verify_whitelist(ctx, receiver, signed_at, authorization)?;
            cellar.mint_inner(ctx, shares, receiver)
        })
    }

    pub fn enable_whitelist(&mut self, ctx: &CallContext<'_>) -> Result<(), CellarError> {
        self.ensure_owner(ctx.caller)?;
        self.state.whitelist_enabled = true;
        info!(cellar = %self.address, "whitelist enabled");
        Ok(())
    }

    pub fn disable_whitelist(&mut self, ctx: &CallContext<'_>) -> Result<(), CellarError> {
        self.ensure_owner(ctx.caller)?;
        self.state.whitelist_enabled = false;
        info!(cellar = %self.address, "whitelist disabled");
        Ok(())
    }
}
