//! # Cellar
//!
//! A cellar pools depositors' assets, issues shares against them, and lets
//! a strategist deploy those assets across trusted positions.
//!
//! ## Roles
//!
//! - **Owner**: curates which adaptors and positions the cellar may use and
//!   sets the risk knobs (share lock, rebalance deviation, supply cap,
//!   whitelist, shutdown).
//! - **Strategist**: moves assets between active positions with
//!   [`Cellar::execute_batch`]. Never touches user funds directly.
//! - **Automation signer**: signs whitelist authorizations.
//! - **Credit authority**: the only party allowed to call back into
//!   [`Cellar::receive_credit`].
//!
//! ## Atomicity
//!
//! Every state-changing operation is all-or-nothing. The cellar snapshots
//! its own state and the custody ledger on entry and restores both if
//! anything fails, including failures deep inside an adaptor or a nested
//! flash-credit callback.
//!
//! ## Layout
//!
//! | module | concern |
//! |---|---|
//! | `accounting` | deposit/mint/withdraw/redeem, conversions, share transfers |
//! | `valuation` | `total_assets` and the rebalance deviation check |
//! | `execution` | strategist batches |
//! | `flash_credit` | the credit authority bridge |
//! | `whitelist` | the signature-gated join path |
//! | `admin` | owner-only configuration |

mod accounting;
mod admin;
pub mod catalog;
pub mod config;
mod context;
mod error;
mod execution;
mod flash_credit;
pub mod guard;
mod host;
pub mod share_lock;
pub mod shares;
mod valuation;
pub mod whitelist;

use std::collections::BTreeSet;

use cellar_protocol::Address;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;

pub use accounting::Rounding;
pub use catalog::{PositionCatalog, PositionEntry};
pub use config::{CellarConfig, ConfigError};
pub use context::CallContext;
pub use error::CellarError;
pub use flash_credit::CreditProvider;
pub use valuation::PositionValuation;
pub use whitelist::{WhitelistProof, WhitelistSignature};

use crate::registry::PositionId;
use guard::CellarGuards;
use share_lock::ShareLocks;
use shares::ShareLedger;

/// Everything about a cellar that persists between calls.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CellarState {
    pub name: String,
    pub symbol: String,
    pub accounting_asset: Address,
    pub owner: Address,
    pub strategist: Address,
    pub automation_signer: Address,
    pub credit_authority: Address,
    pub shares: ShareLedger,
    pub positions: PositionCatalog,
    /// Positions the owner may activate.
    pub position_catalogue: BTreeSet<PositionId>,
    /// Adaptors this cellar accepts, a subset of the registry's trusted set.
    pub adaptor_catalogue: BTreeSet<Address>,
    pub holding_position: PositionId,
    /// WAD-scaled fraction; 1e18 is 100%.
    pub rebalance_deviation: u64,
    pub share_lock_period: u64,
    pub share_supply_cap: u64,
    pub share_locks: ShareLocks,
    pub whitelist_enabled: bool,
    pub shutdown: bool,
}

/// A deployed cellar.
#[derive(Debug)]
pub struct Cellar {
    address: Address,
    state: CellarState,
    guards: CellarGuards,
}

impl Cellar {
    /// Deploys a cellar at `address`.
    ///
    /// The holding position must already be trusted by the registry. It is
    /// catalogued, activated at index 0 and made the holding position.
    pub fn new(
        address: Address,
        config: CellarConfig,
        ctx: &CallContext<'_>,
        holding_position: PositionId,
        holding_config: Vec<u8>,
    ) -> Result<Self, CellarError> {
        if address.is_zero() {
            return Err(CellarError::InvalidAddress);
        }
        config.validate()?;

        let mut cellar = Self {
            address,
            state: CellarState {
                name: config.name,
                symbol: config.symbol,
                accounting_asset: config.accounting_asset,
                owner: config.owner,
                strategist: config.strategist,
                automation_signer: config.automation_signer,
                credit_authority: config.credit_authority,
                shares: ShareLedger::default(),
                positions: PositionCatalog::new(),
                position_catalogue: BTreeSet::new(),
                adaptor_catalogue: BTreeSet::new(),
                holding_position,
                rebalance_deviation: config.rebalance_deviation,
                share_lock_period: config.share_lock_period,
                share_supply_cap: config.share_supply_cap,
                share_locks: ShareLocks::default(),
                whitelist_enabled: config.whitelist_enabled,
                shutdown: false,
            },
            guards: CellarGuards::default(),
        };

        let trusted = ctx
            .registry
            .trusted_position(holding_position)
            .ok_or(CellarError::PositionNotTrusted(holding_position))?;
        cellar.catalogue_adaptor(ctx, trusted.adaptor)?;
        cellar.catalogue_position(ctx, holding_position)?;
        cellar.activate_position(ctx, 0, holding_position, holding_config, false)?;
        cellar.assign_holding_position(ctx, holding_position)?;

        info!(
            cellar = %address,
            name = %cellar.state.name,
            asset = %cellar.state.accounting_asset,
            holding_position,
            "cellar deployed"
        );
        Ok(cellar)
    }

    // ----- Accessors -----

    pub fn address(&self) -> Address {
        self.address
    }

    pub fn state(&self) -> &CellarState {
        &self.state
    }

    pub fn name(&self) -> &str {
        &self.state.name
    }

    pub fn symbol(&self) -> &str {
        &self.state.symbol
    }

    pub fn accounting_asset(&self) -> Address {
        self.state.accounting_asset
    }

    pub fn owner(&self) -> Address {
        self.state.owner
    }

    pub fn strategist(&self) -> Address {
        self.state.strategist
    }

    pub fn positions(&self) -> &PositionCatalog {
        &self.state.positions
    }

    pub fn holding_position(&self) -> PositionId {
        self.state.holding_position
    }

    pub fn share_lock_period(&self) -> u64 {
        self.state.share_lock_period
    }

    pub fn rebalance_deviation(&self) -> u64 {
        self.state.rebalance_deviation
    }

    pub fn share_supply_cap(&self) -> u64 {
        self.state.share_supply_cap
    }

    pub fn is_whitelist_enabled(&self) -> bool {
        self.state.whitelist_enabled
    }

    pub fn is_shutdown(&self) -> bool {
        self.state.shutdown
    }

    pub fn lock_end(&self, holder: Address) -> Option<DateTime<Utc>> {
        self.state.share_locks.lock_end(holder)
    }

    // ----- Internals -----

    fn ensure_owner(&self, caller: Address) -> Result<(), CellarError> {
        if caller != self.state.owner {
            return Err(CellarError::NotOwner(caller));
        }
        Ok(())
    }

    fn ensure_strategist(&self, caller: Address) -> Result<(), CellarError> {
        if caller != self.state.strategist {
            return Err(CellarError::NotStrategist(caller));
        }
        Ok(())
    }

    fn ensure_not_shutdown(&self) -> Result<(), CellarError> {
        if self.state.shutdown {
            return Err(CellarError::Shutdown);
        }
        Ok(())
    }

    /// Runs `op`, restoring the cellar state and the ledger if it fails.
    fn atomically<T>(
        &mut self,
        ctx: &mut CallContext<'_>,
        op: impl FnOnce(&mut Self, &mut CallContext<'_>) -> Result<T, CellarError>,
    ) -> Result<T, CellarError> {
        let state = self.state.clone();
        let ledger = ctx.ledger.clone();
        let result = op(self, ctx);
        if result.is_err() {
            self.state = state;
            *ctx.ledger = ledger;
        }
        result
    }
}
