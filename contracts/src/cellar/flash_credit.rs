//! # Flash Credit
//!
//! Mid-rebalance, an adaptor may need capital the cellar doesn't have yet:
//! repaying a debt position before its collateral can be pulled, say. It
//! asks its host for flash credit, and the round trip goes:
//!
//! ```text
//! execute_batch
//!   └─ adaptor.execute(RequestFlashCredit)
//!        └─ CreditProvider::extend_credit      (authority lends)
//!             └─ Cellar::receive_credit         (runs the nested batches,
//!                                                repays amount + fee)
//! ```
//!
//! `receive_credit` is only honoured from the configured credit authority,
//! and only while this cellar's own strategist batch is running. Anyone
//! else poking it from outside gets [`CellarError::ExternalInitiator`].

use cellar_protocol::Address;
use tracing::{info, warn};

use super::{CallContext, Cellar, CellarError};
use crate::adaptor::decode_batches;

/// An external flash-credit authority.
pub trait CreditProvider: Send + Sync {
    /// The address the authority calls in from.
    fn address(&self) -> Address;

    /// Lends `amounts` of `tokens` to `receiver`, calls
    /// [`Cellar::receive_credit`] with `user_data`, and checks it was repaid.
    fn extend_credit(
        &self,
        receiver: &mut Cellar,
        ctx: &mut CallContext<'_>,
        tokens: &[Address],
        amounts: &[u64],
        user_data: &[u8],
    ) -> Result<(), CellarError>;
}

impl Cellar {
    /// Callback from the credit authority: the cellar now holds `amounts` of
    /// `tokens`, runs the batches encoded in `user_data`, then pays back
    /// `amounts[i] + fees[i]` of each token.
    pub fn receive_credit(
        &mut self,
        ctx: &mut CallContext<'_>,
        tokens: &[Address],
        amounts: &[u64],
        fees: &[u64],
        user_data: &[u8],
    ) -> Result<(), CellarError> {
        if ctx.caller != self.state.credit_authority || self.state.credit_authority.is_zero() {
            warn!(cellar = %self.address, caller = %ctx.caller, "flash credit from unknown authority");
            return Err(CellarError::NotCreditAuthority(ctx.caller));
        }
        if !self.guards.execution_context_active() {
            warn!(cellar = %self.address, "flash credit outside a strategist batch");
            return Err(CellarError::ExternalInitiator);
        }
        if tokens.len() != amounts.len() || tokens.len() != fees.len() {
            return Err(CellarError::LengthMismatch {
                tokens: tokens.len(),
                amounts: amounts.len(),
                fees: fees.len(),
            });
        }

        let batches = decode_batches(user_data)?;
        self.dispatch_batches(ctx, &batches)?;

        let authority = ctx.caller;
        for ((token, amount), fee) in tokens.iter().zip(amounts).zip(fees) {
            let owed = amount.checked_add(*fee).ok_or(CellarError::MathOverflow)?;
            ctx.ledger.transfer(*token, self.address, authority, owed)?;
        }

        info!(
            cellar = %self.address,
            tokens = tokens.len(),
            batches = batches.len(),
            "flash credit repaid"
        );
        Ok(())
    }
}
