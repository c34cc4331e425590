//! # Share Accounting
//!
//! Depositors trade the accounting asset for shares and back:
//!
//! ```text
//! shares = assets * total_supply / total_assets
//! assets = shares * total_assets / total_supply
//! ```
//!
//! An empty cellar (zero supply) issues shares at
//! [`BOOTSTRAP_SHARES_PER_ASSET`]. Rounding always favours the cellar:
//! deposit and redeem round down, mint and withdraw round up, so no
//! sequence of calls can extract more than was put in.
//!
//! Every mint re-locks the receiver's shares (see
//! [`share_lock`](super::share_lock)). Exits pay out of the holding position
//! only; deployed positions are never unwound on a user's behalf.

use std::sync::Arc;

use cellar_protocol::config::BOOTSTRAP_SHARES_PER_ASSET;
use cellar_protocol::Address;
use tracing::{debug, info};

use super::host::VaultHost;
use super::{CallContext, Cellar, CellarError, PositionEntry};
use crate::adaptor::Adaptor;

/// Which way a division rounds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rounding {
    Down,
    Up,
}

/// `x * y / denominator` in `u128`, rounded as asked.
pub(crate) fn mul_div(x: u64, y: u64, denominator: u64, rounding: Rounding) -> Result<u64, CellarError> {
    if denominator == 0 {
        return Err(CellarError::DivisionByZero);
    }
    let product = u128::from(x) * u128::from(y);
    let denominator = u128::from(denominator);
    let mut quotient = product / denominator;
    if rounding == Rounding::Up && product % denominator != 0 {
        quotient += 1;
    }
    u64::try_from(quotient).map_err(|_| CellarError::MathOverflow)
}

impl Cellar {
    // ----- Conversions -----

    fn shares_for(&self, assets: u64, total_assets: u64, rounding: Rounding) -> Result<u64, CellarError> {
        let supply = self.state.shares.total_supply();
        if supply == 0 {
            return assets
                .checked_mul(BOOTSTRAP_SHARES_PER_ASSET)
                .ok_or(CellarError::MathOverflow);
        }
        mul_div(assets, supply, total_assets, rounding)
    }

    fn assets_for(&self, shares: u64, total_assets: u64, rounding: Rounding) -> Result<u64, CellarError> {
        let supply = self.state.shares.total_supply();
        if supply == 0 {
            return mul_div(shares, 1, BOOTSTRAP_SHARES_PER_ASSET, rounding);
        }
        mul_div(shares, total_assets, supply, rounding)
    }

    pub fn convert_to_shares(&self, ctx: &CallContext<'_>, assets: u64) -> Result<u64, CellarError> {
        self.shares_for(assets, self.total_assets(ctx)?, Rounding::Down)
    }

    pub fn convert_to_assets(&self, ctx: &CallContext<'_>, shares: u64) -> Result<u64, CellarError> {
        self.assets_for(shares, self.total_assets(ctx)?, Rounding::Down)
    }

    pub fn preview_deposit(&self, ctx: &CallContext<'_>, assets: u64) -> Result<u64, CellarError> {
        self.convert_to_shares(ctx, assets)
    }

    pub fn preview_mint(&self, ctx: &CallContext<'_>, shares: u64) -> Result<u64, CellarError> {
        self.assets_for(shares, self.total_assets(ctx)?, Rounding::Up)
    }

    pub fn preview_withdraw(&self, ctx: &CallContext<'_>, assets: u64) -> Result<u64, CellarError> {
        self.shares_for(assets, self.total_assets(ctx)?, Rounding::Up)
    }

    pub fn preview_redeem(&self, ctx: &CallContext<'_>, shares: u64) -> Result<u64, CellarError> {
        self.convert_to_assets(ctx, shares)
    }

    // ----- Queries -----

    pub fn total_supply(&self) -> u64 {
        self.state.shares.total_supply()
    }

    pub fn balance_of(&self, holder: Address) -> u64 {
        self.state.shares.balance_of(holder)
    }

    pub fn allowance(&self, owner: Address, spender: Address) -> u64 {
        self.state.shares.allowance(owner, spender)
    }

    /// Assets the holding position can pay out right now.
    pub fn available_liquidity(&self, ctx: &CallContext<'_>) -> Result<u64, CellarError> {
        let (adaptor, holding) = self.holding(ctx)?;
        Ok(adaptor.withdrawable_from(&holding.config, self.address, &*ctx.ledger)?)
    }

    /// Most assets `holder` could withdraw now. Zero while locked.
    pub fn max_withdraw(&self, ctx: &CallContext<'_>, holder: Address) -> Result<u64, CellarError> {
        if self.state.share_locks.is_locked(holder, ctx.now) {
            return Ok(0);
        }
        let assets = self.convert_to_assets(ctx, self.balance_of(holder))?;
        Ok(assets.min(self.available_liquidity(ctx)?))
    }

    /// Most shares `holder` could redeem now. Zero while locked.
    pub fn max_redeem(&self, ctx: &CallContext<'_>, holder: Address) -> Result<u64, CellarError> {
        if self.state.share_locks.is_locked(holder, ctx.now) {
            return Ok(0);
        }
        let balance = self.balance_of(holder);
        let total_assets = self.total_assets(ctx)?;
        let liquidity = self.available_liquidity(ctx)?;
        if self.assets_for(balance, total_assets, Rounding::Down)? <= liquidity {
            return Ok(balance);
        }
        self.shares_for(liquidity, total_assets, Rounding::Down)
    }

    // ----- Entry -----

    /// Deposits `assets` from the caller and mints shares to `receiver`.
    pub fn deposit(
        &mut self,
        ctx: &mut CallContext<'_>,
        assets: u64,
        receiver: Address,
    ) -> Result<u64, CellarError> {
        let _lock = self.guards.enter()?;
        self.atomically(ctx, |cellar, ctx| {
            cellar.ensure_open_entry()?;
            cellar.deposit_inner(ctx, assets, receiver)
        })
    }

    /// Mints exactly `shares` to `receiver`, pulling whatever that costs.
    pub fn mint(
        &mut self,
        ctx: &mut CallContext<'_>,
        shares: u64,
        receiver: Address,
    ) -> Result<u64, CellarError> {
        let _lock = self.guards.enter()?;
        self.atomically(ctx, |cellar, ctx| {
            cellar.ensure_open_entry()?;
            cellar.mint_inner(ctx, shares, receiver)
        })
    }

    fn ensure_open_entry(&self) -> Result<(), CellarError> {
        self.ensure_not_shutdown()?;
        if self.state.whitelist_enabled {
            return Err(CellarError::WhitelistEnabled);
        }
        Ok(())
    }

    fn ensure_depositor(&self, ctx: &CallContext<'_>, receiver: Address) -> Result<(), CellarError> {
        if ctx.caller != receiver && !ctx.registry.is_approved_depositor(ctx.caller) {
            return Err(CellarError::NotApprovedToDepositOnBehalf(ctx.caller));
        }
        Ok(())
    }

    pub(super) fn deposit_inner(
        &mut self,
        ctx: &mut CallContext<'_>,
        assets: u64,
        receiver: Address,
    ) -> Result<u64, CellarError> {
        self.ensure_depositor(ctx, receiver)?;
        let total_assets = self.total_assets(ctx)?;
        let shares = self.shares_for(assets, total_assets, Rounding::Down)?;
        if shares == 0 {
            return Err(CellarError::ZeroShares);
        }
        self.enter_funds(ctx, assets, shares, receiver)?;
        Ok(shares)
    }

    pub(super) fn mint_inner(
        &mut self,
        ctx: &mut CallContext<'_>,
        shares: u64,
        receiver: Address,
    ) -> Result<u64, CellarError> {
        self.ensure_depositor(ctx, receiver)?;
        if shares == 0 {
            return Err(CellarError::ZeroShares);
        }
        let total_assets = self.total_assets(ctx)?;
        let assets = self.assets_for(shares, total_assets, Rounding::Up)?;
        if assets == 0 {
            return Err(CellarError::ZeroAssets);
        }
        self.enter_funds(ctx, assets, shares, receiver)?;
        Ok(assets)
    }

    fn enter_funds(
        &mut self,
        ctx: &mut CallContext<'_>,
        assets: u64,
        shares: u64,
        receiver: Address,
    ) -> Result<(), CellarError> {
        if receiver.is_zero() {
            return Err(CellarError::InvalidAddress);
        }
        let cap = self.state.share_supply_cap;
        let requested = u128::from(self.state.shares.total_supply()) + u128::from(shares);
        if requested > u128::from(cap) {
            return Err(CellarError::ShareSupplyCapExceeded { cap, requested });
        }

        let vault = self.address;
        ctx.ledger
            .transfer(self.state.accounting_asset, ctx.caller, vault, assets)?;
        let (adaptor, holding) = self.holding(ctx)?;
        adaptor.deposit(assets, &holding.config, &mut VaultHost::new(self, ctx))?;

        self.state.shares.mint(receiver, shares)?;
        let lock_end = self
            .state
            .share_locks
            .refresh(receiver, ctx.now, self.state.share_lock_period)?;

        info!(
            cellar = %vault,
            caller = %ctx.caller,
            %receiver,
            assets,
            shares,
            %lock_end,
            "shares minted"
        );
        Ok(())
    }

    // ----- Exit -----

    /// Burns however many of `owner`'s shares it takes to send `assets` to
    /// `receiver`.
    pub fn withdraw(
        &mut self,
        ctx: &mut CallContext<'_>,
        assets: u64,
        receiver: Address,
        owner: Address,
    ) -> Result<u64, CellarError> {
        let _lock = self.guards.enter()?;
        self.atomically(ctx, |cellar, ctx| {
            if assets == 0 {
                return Err(CellarError::ZeroAssets);
            }
            cellar.state.share_locks.ensure_unlocked(owner, ctx.now)?;
            let total_assets = cellar.total_assets(ctx)?;
            let shares = cellar.shares_for(assets, total_assets, Rounding::Up)?;
            cellar.exit_funds(ctx, assets, shares, receiver, owner)?;
            Ok(shares)
        })
    }

    /// Burns `shares` of `owner`'s and sends what they are worth to
    /// `receiver`.
    pub fn redeem(
        &mut self,
        ctx: &mut CallContext<'_>,
        shares: u64,
        receiver: Address,
        owner: Address,
    ) -> Result<u64, CellarError> {
        let _lock = self.guards.enter()?;
        self.atomically(ctx, |cellar, ctx| {
            cellar.state.share_locks.ensure_unlocked(owner, ctx.now)?;
            let total_assets = cellar.total_assets(ctx)?;
            let assets = cellar.assets_for(shares, total_assets, Rounding::Down)?;
            if assets == 0 {
                return Err(CellarError::ZeroAssets);
            }
            cellar.exit_funds(ctx, assets, shares, receiver, owner)?;
            Ok(assets)
        })
    }

    fn exit_funds(
        &mut self,
        ctx: &mut CallContext<'_>,
        assets: u64,
        shares: u64,
        receiver: Address,
        owner: Address,
    ) -> Result<(), CellarError> {
        if receiver.is_zero() {
            return Err(CellarError::InvalidAddress);
        }
        if ctx.caller != owner {
            self.state.shares.spend_allowance(owner, ctx.caller, shares)?;
        }
        self.state.shares.burn(owner, shares)?;

        let (adaptor, holding) = self.holding(ctx)?;
        let available = adaptor.withdrawable_from(&holding.config, self.address, &*ctx.ledger)?;
        if assets > available {
            return Err(CellarError::InsufficientLiquidity {
                requested: assets,
                available,
            });
        }
        adaptor.withdraw(assets, receiver, &holding.config, &mut VaultHost::new(self, ctx))?;

        info!(
            cellar = %self.address,
            caller = %ctx.caller,
            %owner,
            %receiver,
            assets,
            shares,
            "shares burned"
        );
        Ok(())
    }

    // ----- Share movement -----

    /// Moves `shares` from the caller to `to`.
    pub fn transfer(&mut self, ctx: &CallContext<'_>, to: Address, shares: u64) -> Result<(), CellarError> {
        if to.is_zero() {
            return Err(CellarError::InvalidAddress);
        }
        self.state.share_locks.ensure_unlocked(ctx.caller, ctx.now)?;
        self.state.shares.transfer(ctx.caller, to, shares)?;
        debug!(cellar = %self.address, from = %ctx.caller, %to, shares, "shares transferred");
        Ok(())
    }

    /// Moves `shares` from `from` to `to` on the strength of the caller's
    /// allowance.
    pub fn transfer_from(
        &mut self,
        ctx: &mut CallContext<'_>,
        from: Address,
        to: Address,
        shares: u64,
    ) -> Result<(), CellarError> {
        self.atomically(ctx, |cellar, ctx| {
            if to.is_zero() {
                return Err(CellarError::InvalidAddress);
            }
            cellar.state.share_locks.ensure_unlocked(from, ctx.now)?;
            if ctx.caller != from {
                cellar.state.shares.spend_allowance(from, ctx.caller, shares)?;
            }
            cellar.state.shares.transfer(from, to, shares)?;
            debug!(cellar = %cellar.address, %from, %to, shares, spender = %ctx.caller, "shares transferred");
            Ok(())
        })
    }

    /// Lets `spender` move up to `shares` of the caller's shares.
    pub fn approve(&mut self, ctx: &CallContext<'_>, spender: Address, shares: u64) {
        self.state.shares.approve(ctx.caller, spender, shares);
        debug!(cellar = %self.address, owner = %ctx.caller, %spender, shares, "allowance set");
    }

    // ----- Helpers -----

    /// The holding position and the adaptor serving it.
    fn holding(&self, ctx: &CallContext<'_>) -> Result<(Arc<dyn Adaptor>, PositionEntry), CellarError> {
        let id = self.state.holding_position;
        let entry = self
            .state
            .positions
            .get(id)
            .cloned()
            .ok_or(CellarError::PositionNotUsed(id))?;
        let adaptor = self.deployed_adaptor(ctx, entry.adaptor)?;
        Ok((adaptor, entry))
    }

    pub(super) fn deployed_adaptor(
        &self,
        ctx: &CallContext<'_>,
        adaptor: Address,
    ) -> Result<Arc<dyn Adaptor>, CellarError> {
        ctx.adaptors
            .get(adaptor)
            .ok_or(CellarError::AdaptorNotDeployed(adaptor))
    }
}
