//! Owner-only configuration.
//!
//! Trust is checked against the registry when something is *added*. A
//! later registry distrust does not reach into positions and adaptors a
//! cellar already uses.

use cellar_protocol::config::{
    MAXIMUM_REBALANCE_DEVIATION, MAXIMUM_SHARE_LOCK_PERIOD_SECS, MINIMUM_SHARE_LOCK_PERIOD_SECS,
};
use cellar_protocol::Address;
use tracing::info;

use super::{CallContext, Cellar, CellarError, PositionEntry};
use crate::registry::PositionId;

impl Cellar {
    // ----- Catalogues -----

    pub fn add_adaptor_to_catalogue(&mut self, ctx: &CallContext<'_>, adaptor: Address) -> Result<(), CellarError> {
        self.ensure_owner(ctx.caller)?;
        self.catalogue_adaptor(ctx, adaptor)
    }

    pub fn remove_adaptor_from_catalogue(
        &mut self,
        ctx: &CallContext<'_>,
        adaptor: Address,
    ) -> Result<(), CellarError> {
        self.ensure_owner(ctx.caller)?;
        if self.state.adaptor_catalogue.remove(&adaptor) {
            info!(cellar = %self.address, %adaptor, "adaptor removed from catalogue");
        }
        Ok(())
    }

    pub fn add_position_to_catalogue(
        &mut self,
        ctx: &CallContext<'_>,
        position: PositionId,
    ) -> Result<(), CellarError> {
        self.ensure_owner(ctx.caller)?;
        self.catalogue_position(ctx, position)
    }

    /// Active positions can't leave the catalogue.
    pub fn remove_position_from_catalogue(
        &mut self,
        ctx: &CallContext<'_>,
        position: PositionId,
    ) -> Result<(), CellarError> {
        self.ensure_owner(ctx.caller)?;
        if self.state.positions.contains(position) {
            return Err(CellarError::PositionAlreadyUsed(position));
        }
        if self.state.position_catalogue.remove(&position) {
            info!(cellar = %self.address, position, "position removed from catalogue");
        }
        Ok(())
    }

    pub(super) fn catalogue_adaptor(&mut self, ctx: &CallContext<'_>, adaptor: Address) -> Result<(), CellarError> {
        if !ctx.registry.is_adaptor_trusted(adaptor) {
            return Err(CellarError::AdaptorNotTrusted(adaptor));
        }
        if self.state.adaptor_catalogue.insert(adaptor) {
            info!(cellar = %self.address, %adaptor, "adaptor catalogued");
        }
        Ok(())
    }

    pub(super) fn catalogue_position(
        &mut self,
        ctx: &CallContext<'_>,
        position: PositionId,
    ) -> Result<(), CellarError> {
        if ctx.registry.trusted_position(position).is_none() {
            return Err(CellarError::PositionNotTrusted(position));
        }
        if self.state.position_catalogue.insert(position) {
            info!(cellar = %self.address, position, "position catalogued");
        }
        Ok(())
    }

    // ----- Active positions -----

    /// Activates `position` at `index` in the position list.
    pub fn add_position(
        &mut self,
        ctx: &CallContext<'_>,
        index: usize,
        position: PositionId,
        config: Vec<u8>,
        is_debt: bool,
    ) -> Result<(), CellarError> {
        self.ensure_owner(ctx.caller)?;
        self.activate_position(ctx, index, position, config, is_debt)
    }

    pub(super) fn activate_position(
        &mut self,
        ctx: &CallContext<'_>,
        index: usize,
        position: PositionId,
        config: Vec<u8>,
        is_debt: bool,
    ) -> Result<(), CellarError> {
        if !self.state.position_catalogue.contains(&position) {
            return Err(CellarError::PositionNotInCatalogue(position));
        }
        let trusted = ctx
            .registry
            .trusted_position(position)
            .ok_or(CellarError::PositionNotTrusted(position))?;
        if !trusted.matches_config(&config) {
            return Err(CellarError::PositionConfigMismatch(position));
        }
        if !self.state.adaptor_catalogue.contains(&trusted.adaptor) {
            return Err(CellarError::AdaptorNotInCatalogue(trusted.adaptor));
        }
        if !ctx.registry.is_adaptor_trusted(trusted.adaptor) {
            return Err(CellarError::AdaptorNotTrusted(trusted.adaptor));
        }
        let adaptor = self.deployed_adaptor(ctx, trusted.adaptor)?;
        if adaptor.is_debt() != is_debt {
            return Err(CellarError::DebtMismatch {
                position,
                declared: is_debt,
                actual: adaptor.is_debt(),
            });
        }
        let asset = adaptor.asset_of(&config)?;
        if asset != self.state.accounting_asset && !ctx.pricing.is_supported(asset) {
            return Err(CellarError::PricingNotSupported(asset));
        }

        self.state.positions.insert(
            index,
            PositionEntry {
                position_id: position,
                adaptor: trusted.adaptor,
                config,
                is_debt,
            },
        )?;
        info!(cellar = %self.address, position, index, is_debt, %asset, "position added");
        Ok(())
    }

    /// Deactivates the position at `index`. It must be empty and must not be
    /// the holding position.
    pub fn remove_position(&mut self, ctx: &CallContext<'_>, index: usize) -> Result<(), CellarError> {
        self.ensure_owner(ctx.caller)?;
        let entry = self
            .state
            .positions
            .entry_at(index)
            .cloned()
            .ok_or(CellarError::IndexOutOfBounds {
                index,
                len: self.state.positions.len(),
            })?;
        if entry.position_id == self.state.holding_position {
            return Err(CellarError::RemovingHoldingPosition);
        }
        let adaptor = self.deployed_adaptor(ctx, entry.adaptor)?;
        let balance = adaptor.balance_of(&entry.config, self.address, &*ctx.ledger)?;
        if balance > 0 {
            return Err(CellarError::PositionNotEmpty {
                position: entry.position_id,
                balance,
            });
        }
        self.state.positions.remove(index)?;
        info!(cellar = %self.address, position = entry.position_id, index, "position removed");
        Ok(())
    }

    /// Makes an active, non-debt position denominated in the accounting
    /// asset the one deposits land in and withdrawals pay out of.
    pub fn set_holding_position(&mut self, ctx: &CallContext<'_>, position: PositionId) -> Result<(), CellarError> {
        self.ensure_owner(ctx.caller)?;
        self.assign_holding_position(ctx, position)
    }

    pub(super) fn assign_holding_position(
        &mut self,
        ctx: &CallContext<'_>,
        position: PositionId,
    ) -> Result<(), CellarError> {
        let entry = self
            .state
            .positions
            .get(position)
            .ok_or(CellarError::PositionNotUsed(position))?;
        if entry.is_debt {
            return Err(CellarError::DebtMismatch {
                position,
                declared: false,
                actual: true,
            });
        }
        let adaptor = self.deployed_adaptor(ctx, entry.adaptor)?;
        let asset = adaptor.asset_of(&entry.config)?;
        if asset != self.state.accounting_asset {
            return Err(CellarError::AssetMismatch {
                expected: self.state.accounting_asset,
                actual: asset,
            });
        }
        self.state.holding_position = position;
        info!(cellar = %self.address, position, "holding position set");
        Ok(())
    }

    // ----- Parameters -----

    pub fn set_share_lock_period(&mut self, ctx: &CallContext<'_>, secs: u64) -> Result<(), CellarError> {
        self.ensure_owner(ctx.caller)?;
        if !(MINIMUM_SHARE_LOCK_PERIOD_SECS..=MAXIMUM_SHARE_LOCK_PERIOD_SECS).contains(&secs) {
            return Err(CellarError::InvalidLockPeriod(secs));
        }
        self.state.share_lock_period = secs;
        info!(cellar = %self.address, secs, "share lock period set");
        Ok(())
    }

    pub fn set_rebalance_deviation(&mut self, ctx: &CallContext<'_>, deviation: u64) -> Result<(), CellarError> {
        self.ensure_owner(ctx.caller)?;
        if deviation > MAXIMUM_REBALANCE_DEVIATION {
            return Err(CellarError::InvalidRebalanceDeviation(deviation));
        }
        self.state.rebalance_deviation = deviation;
        info!(cellar = %self.address, deviation, "rebalance deviation set");
        Ok(())
    }

    pub fn set_share_supply_cap(&mut self, ctx: &CallContext<'_>, cap: u64) -> Result<(), CellarError> {
        self.ensure_owner(ctx.caller)?;
        self.state.share_supply_cap = cap;
        info!(cellar = %self.address, cap, "share supply cap set");
        Ok(())
    }

    // ----- Shutdown -----

    /// Stops deposits and strategist batches. Withdrawals stay open.
    pub fn initiate_shutdown(&mut self, ctx: &CallContext<'_>) -> Result<(), CellarError> {
        self.ensure_owner(ctx.caller)?;
        self.ensure_not_shutdown()?;
        self.state.shutdown = true;
        info!(cellar = %self.address, "shutdown initiated");
        Ok(())
    }

    pub fn lift_shutdown(&mut self, ctx: &CallContext<'_>) -> Result<(), CellarError> {
        self.ensure_owner(ctx.caller)?;
        self.state.shutdown = false;
        info!(cellar = %self.address, "shutdown lifted");
        Ok(())
    }
}
