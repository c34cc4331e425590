//! # Valuation
//!
//! `total_assets` is what the cellar is worth in its accounting asset:
//!
//! ```text
//! total_assets = sum(credit positions) - sum(debt positions)
//! ```
//!
//! Each position is valued as the adaptor-reported balance, converted by
//! the price router unless it is already denominated in the accounting
//! asset. Empty positions never reach the router.

use cellar_protocol::config::WAD;
use cellar_protocol::Address;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::accounting::{mul_div, Rounding};
use super::{CallContext, Cellar, CellarError, PositionEntry};
use crate::registry::PositionId;

/// One position's contribution to `total_assets`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PositionValuation {
    pub position_id: PositionId,
    pub asset: Address,
    pub balance: u64,
    /// `balance` expressed in the accounting asset.
    pub value: u64,
    pub is_debt: bool,
}

impl Cellar {
    fn value_position(
        &self,
        ctx: &CallContext<'_>,
        entry: &PositionEntry,
    ) -> Result<PositionValuation, CellarError> {
        let adaptor = self.deployed_adaptor(ctx, entry.adaptor)?;
        let asset = adaptor.asset_of(&entry.config)?;
        let balance = adaptor.balance_of(&entry.config, self.address, &*ctx.ledger)?;
        let value = if balance == 0 || asset == self.state.accounting_asset {
            balance
        } else {
            ctx.pricing
                .value_of(asset, balance, self.state.accounting_asset)?
        };
        Ok(PositionValuation {
            position_id: entry.position_id,
            asset,
            balance,
            value,
            is_debt: entry.is_debt,
        })
    }

    /// Per-position breakdown, in catalog order.
    pub fn position_valuations(&self, ctx: &CallContext<'_>) -> Result<Vec<PositionValuation>, CellarError> {
        self.state
            .positions
            .iter()
            .map(|entry| self.value_position(ctx, entry))
            .collect()
    }

    /// Net value of every active position in the accounting asset.
    pub fn total_assets(&self, ctx: &CallContext<'_>) -> Result<u64, CellarError> {
        let mut assets: u128 = 0;
        let mut debt: u128 = 0;
        for valuation in self.position_valuations(ctx)? {
            if valuation.is_debt {
                debt += u128::from(valuation.value);
            } else {
                assets += u128::from(valuation.value);
            }
        }
        if debt > assets {
            return Err(CellarError::DebtExceedsAssets { assets, debt });
        }
        let total = u64::try_from(assets - debt).map_err(|_| CellarError::MathOverflow)?;
        debug!(cellar = %self.address, total_assets = total, "valuation");
        Ok(total)
    }

    /// Fails unless `after` lies within the configured deviation of
    /// `before`. Both bounds round up.
    pub(super) fn check_rebalance_deviation(&self, before: u64, after: u64) -> Result<(), CellarError> {
        let deviation = self.state.rebalance_deviation;
        let min = mul_div(before, WAD - deviation, WAD, Rounding::Up)?;
        let max = mul_div(before, WAD + deviation, WAD, Rounding::Up)?;
        if after < min || after > max {
            warn!(cellar = %self.address, before, after, min, max, "rebalance deviation exceeded");
            return Err(CellarError::RebalanceDeviationExceeded {
                before,
                after,
                min,
                max,
            });
        }
        Ok(())
    }
}
