//! Share balances and allowances.

use std::collections::BTreeMap;

use cellar_protocol::Address;
use serde::{Deserialize, Serialize};

use super::CellarError;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShareLedger {
    total_supply: u64,
    balances: BTreeMap<Address, u64>,
    /// owner -> spender -> remaining allowance
    allowances: BTreeMap<Address, BTreeMap<Address, u64>>,
}

impl ShareLedger {
    pub fn total_supply(&self) -> u64 {
        self.total_supply
    }

    pub fn balance_of(&self, holder: Address) -> u64 {
        self.balances.get(&holder).copied().unwrap_or(0)
    }

    pub fn allowance(&self, owner: Address, spender: Address) -> u64 {
        self.allowances
            .get(&owner)
            .and_then(|spenders| spenders.get(&spender))
            .copied()
            .unwrap_or(0)
    }

    pub fn mint(&mut self, to: Address, shares: u64) -> Result<(), CellarError> {
        let supply = self
            .total_supply
            .checked_add(shares)
            .ok_or(CellarError::MathOverflow)?;
        let balance = self
            .balance_of(to)
            .checked_add(shares)
            .ok_or(CellarError::MathOverflow)?;
        self.total_supply = supply;
        self.balances.insert(to, balance);
        Ok(())
    }

    pub fn burn(&mut self, from: Address, shares: u64) -> Result<(), CellarError> {
        let available = self.balance_of(from);
        if available < shares {
            return Err(CellarError::InsufficientShares {
                holder: from,
                available,
                requested: shares,
            });
        }
        self.set_balance(from, available - shares);
        self.total_supply -= shares;
        Ok(())
    }

    pub fn transfer(&mut self, from: Address, to: Address, shares: u64) -> Result<(), CellarError> {
        let available = self.balance_of(from);
        if available < shares {
            return Err(CellarError::InsufficientShares {
                holder: from,
                available,
                requested: shares,
            });
        }
        if from == to {
            return Ok(());
        }
        let received = self
            .balance_of(to)
            .checked_add(shares)
            .ok_or(CellarError::MathOverflow)?;
        self.set_balance(from, available - shares);
        self.set_balance(to, received);
        Ok(())
    }

    pub fn approve(&mut self, owner: Address, spender: Address, shares: u64) {
        self.allowances.entry(owner).or_default().insert(spender, shares);
    }

    /// Consumes `shares` of `spender`'s allowance over `owner`'s shares.
    /// An allowance of `u64::MAX` is never consumed.
    pub fn spend_allowance(
        &mut self,
        owner: Address,
        spender: Address,
        shares: u64,
    ) -> Result<(), CellarError> {
        let allowed = self.allowance(owner, spender);
        if allowed == u64::MAX {
            return Ok(());
        }
        if allowed < shares {
            return Err(CellarError::InsufficientAllowance {
                spender,
                allowed,
                requested: shares,
            });
        }
        self.approve(owner, spender, allowed - shares);
        Ok(())
    }

    fn set_balance(&mut self, holder: Address, shares: u64) {
        if shares == 0 {
            self.balances.remove(&holder);
        } else {
            self.balances.insert(holder, shares);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mint_and_burn_track_supply() {
        let alice = Address::derive("alice");
        let mut shares = ShareLedger::default();
        shares.mint(alice, 100).unwrap();
        shares.burn(alice, 40).unwrap();
        assert_eq!(shares.total_supply(), 60);
        assert_eq!(shares.balance_of(alice), 60);
    }

    #[test]
    fn burn_more_than_held_fails() {
        let alice = Address::derive("alice");
        let mut shares = ShareLedger::default();
        shares.mint(alice, 1).unwrap();
        assert!(matches!(
            shares.burn(alice, 2),
            Err(CellarError::InsufficientShares { available: 1, requested: 2, .. })
        ));
    }

    #[test]
    fn self_transfer_keeps_balance() {
        let alice = Address::derive("alice");
        let mut shares = ShareLedger::default();
        shares.mint(alice, 5).unwrap();
        shares.transfer(alice, alice, 5).unwrap();
        assert_eq!(shares.balance_of(alice), 5);
    }

    #[test]
    fn allowance_is_consumed() {
        let alice = Address::derive("alice");
        let bob = Address::derive("bob");
        let mut shares = ShareLedger::default();
        shares.approve(alice, bob, 10);
        shares.spend_allowance(alice, bob, 4).unwrap();
        assert_eq!(shares.allowance(alice, bob), 6);
        assert!(shares.spend_allowance(alice, bob, 7).is_err());
    }

    #[test]
    fn infinite_allowance_is_not_consumed() {
        let alice = Address::derive("alice");
        let bob = Address::derive("bob");
        let mut shares = ShareLedger::default();
        shares.approve(alice, bob, u64::MAX);
        shares.spend_allowance(alice, bob, 1_000).unwrap();
        assert_eq!(shares.allowance(alice, bob), u64::MAX);
    }
}
