//! # Strategist Execution
//!
//! The strategist rebalances by sending [`AdaptorBatch`]es: lists of
//! opaque calls, each list addressed to one adaptor.
//!
//! ## The rules
//!
//! 1. Only the strategist, never during shutdown, never re-entrantly.
//! 2. Every batch is checked before *any* call runs: its adaptor must be in
//!    this cellar's catalogue and deployed, and every call must decode.
//! 3. A call that names a position must target an active position served by
//!    the batch's adaptor.
//! 4. Strategist withdrawals may only pay the cellar itself.
//! 5. When everything has run, `total_assets` must still be within the
//!    rebalance deviation of where it started.
//!
//! Any failure rolls back every call in every batch. The execution-context
//! scope stays open for the whole run so that flash credit requested by an
//! adaptor can call back in.

use tracing::{debug, info};

use super::host::VaultHost;
use super::{CallContext, Cellar, CellarError};
use crate::adaptor::{AdaptorBatch, AdaptorCall};

impl Cellar {
    /// Runs a strategist rebalance.
    pub fn execute_batch(
        &mut self,
        ctx: &mut CallContext<'_>,
        batches: &[AdaptorBatch],
    ) -> Result<(), CellarError> {
        self.ensure_strategist(ctx.caller)?;
        self.ensure_not_shutdown()?;
        let _lock = self.guards.enter()?;
        let _scope = self.guards.open_execution_context()?;

        self.atomically(ctx, |cellar, ctx| {
            let before = cellar.total_assets(ctx)?;
            cellar.dispatch_batches(ctx, batches)?;
            let after = cellar.total_assets(ctx)?;
            cellar.check_rebalance_deviation(before, after)?;
            info!(
                cellar = %cellar.address,
                batches = batches.len(),
                before,
                after,
                "strategist batch executed"
            );
            Ok(())
        })
    }

    /// Validates, then runs, every call in `batches`. Shared by
    /// [`execute_batch`](Self::execute_batch) and the flash-credit callback.
    pub(super) fn dispatch_batches(
        &mut self,
        ctx: &mut CallContext<'_>,
        batches: &[AdaptorBatch],
    ) -> Result<(), CellarError> {
        let mut plan = Vec::with_capacity(batches.len());
        for batch in batches {
            if !self.state.adaptor_catalogue.contains(&batch.adaptor) {
                return Err(CellarError::AdaptorNotInCatalogue(batch.adaptor));
            }
            let adaptor = self.deployed_adaptor(ctx, batch.adaptor)?;
            let calls = batch.decode_calls()?;
            plan.push((batch.adaptor, adaptor, calls));
        }

        for (address, adaptor, calls) in plan {
            for call in calls {
                let config = match call.position() {
                    Some(id) => {
                        let entry = self
                            .state
                            .positions
                            .get(id)
                            .ok_or(CellarError::PositionNotUsed(id))?;
                        if entry.adaptor != address {
                            return Err(CellarError::AdaptorMismatch {
                                position: id,
                                expected: entry.adaptor,
                                actual: address,
                            });
                        }
                        Some(entry.config.clone())
                    }
                    None => None,
                };
                if let AdaptorCall::Withdraw { receiver, .. } = &call {
                    if *receiver != self.address {
                        return Err(CellarError::UserWithdrawsNotAllowed { receiver: *receiver });
                    }
                }

                debug!(
                    cellar = %self.address,
                    adaptor = adaptor.name(),
                    call = call.kind(),
                    position = ?call.position(),
                    "dispatching adaptor call"
                );
                adaptor.execute(&call, config.as_deref(), &mut VaultHost::new(self, ctx))?;
            }
        }
        Ok(())
    }
}
