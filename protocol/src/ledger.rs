//! # Custody Ledger
//!
//! Token custody for every address in the system: depositors, the cellar,
//! external markets, the flash-credit authority. The ledger maps
//! `asset -> holder -> amount` and enforces the one invariant that matters:
//! you can never move more than you hold.
//!
//! The ledger is a plain value. Contracts take it by `&mut` through their
//! call context, and snapshot it with `Clone` before an operation so a
//! failure anywhere can put every balance back exactly as it was.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::trace;

use crate::types::Address;

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Errors that can occur during ledger operations.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LedgerError {
    /// Attempted to debit more than the holder owns.
    #[error(
        "insufficient balance of {asset} for {holder}: available {available}, requested {requested}"
    )]
    InsufficientBalance {
        asset: Address,
        holder: Address,
        available: u64,
        requested: u64,
    },

    /// A credit would push the balance past `u64::MAX`. Either a bug or an
    /// attack.
    #[error("balance overflow of {asset} for {holder}: current {current}, credit {credit}")]
    Overflow {
        asset: Address,
        holder: Address,
        current: u64,
        credit: u64,
    },
}

// ---------------------------------------------------------------------------
// Ledger
// ---------------------------------------------------------------------------

/// `asset -> holder -> balance`, in smallest units.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ledger {
    balances: BTreeMap<Address, BTreeMap<Address, u64>>,
}

impl Ledger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Balance of `asset` held by `holder`. Unknown pairs are zero.
    pub fn balance_of(&self, asset: Address, holder: Address) -> u64 {
        self.balances
            .get(&asset)
            .and_then(|holders| holders.get(&holder))
            .copied()
            .unwrap_or(0)
    }

    /// Adds `amount` to `holder`'s balance of `asset`.
    pub fn credit(&mut self, asset: Address, holder: Address, amount: u64) -> Result<(), LedgerError> {
        let current = self.balance_of(asset, holder);
        let updated = current.checked_add(amount).ok_or(LedgerError::Overflow {
            asset,
            holder,
            current,
            credit: amount,
        })?;
        self.balances.entry(asset).or_default().insert(holder, updated);
        trace!(%asset, %holder, amount, balance = updated, "ledger credit");
        Ok(())
    }

    /// Removes `amount` from `holder`'s balance of `asset`.
    pub fn debit(&mut self, asset: Address, holder: Address, amount: u64) -> Result<(), LedgerError> {
        let available = self.balance_of(asset, holder);
        if available < amount {
            return Err(LedgerError::InsufficientBalance {
                asset,
                holder,
                available,
                requested: amount,
            });
        }
        let updated = available - amount;
        let holders = self.balances.entry(asset).or_default();
        if updated == 0 {
            holders.remove(&holder);
        } else {
            holders.insert(holder, updated);
        }
        trace!(%asset, %holder, amount, balance = updated, "ledger debit");
        Ok(())
    }

    /// Moves `amount` of `asset` from `from` to `to`.
    ///
    /// Self-transfers are checked against the balance but otherwise no-ops.
    pub fn transfer(
        &mut self,
        asset: Address,
        from: Address,
        to: Address,
        amount: u64,
    ) -> Result<(), LedgerError> {
        self.debit(asset, from, amount)?;
        self.credit(asset, to, amount)
    }

    /// Sum of every holder's balance of `asset`.
    pub fn total_of(&self, asset: Address) -> u128 {
        self.balances
            .get(&asset)
            .map(|holders| holders.values().map(|v| u128::from(*v)).sum())
            .unwrap_or(0)
    }
}
