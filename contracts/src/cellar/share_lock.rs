//! # Share Lock
//!
//! Freshly minted shares can't move for `share_lock_period` seconds.
//!
//! Without the lock, anyone who can see a price update coming could deposit
//! at the stale price and redeem at the new one in the same breath. With it,
//! they have to sit through the period holding the same risk as everyone
//! else.
//!
//! Each holder has one timestamp. Every mint *to* that holder overwrites
//! it with `now + period`, so topping up re-locks the whole balance. There
//! is no early unlock.

use std::collections::BTreeMap;

use cellar_protocol::Address;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use super::CellarError;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShareLocks {
    lock_end: BTreeMap<Address, DateTime<Utc>>,
}

impl ShareLocks {
    /// Locks `holder` until `now + period_secs`.
    pub fn refresh(
        &mut self,
        holder: Address,
        now: DateTime<Utc>,
        period_secs: u64,
    ) -> Result<DateTime<Utc>, CellarError> {
        let period = i64::try_from(period_secs).map_err(|_| CellarError::MathOverflow)?;
        let end = now
            .checked_add_signed(Duration::seconds(period))
            .ok_or(CellarError::MathOverflow)?;
        self.lock_end.insert(holder, end);
        Ok(end)
    }

    /// When `holder`'s shares unlock. `None` if they never received a mint.
    pub fn lock_end(&self, holder: Address) -> Option<DateTime<Utc>> {
        self.lock_end.get(&holder).copied()
    }

    pub fn is_locked(&self, holder: Address, now: DateTime<Utc>) -> bool {
        self.lock_end(holder).is_some_and(|end| now < end)
    }

    pub fn ensure_unlocked(&self, holder: Address, now: DateTime<Utc>) -> Result<(), CellarError> {
        match self.lock_end(holder) {
            Some(lock_end) if now < lock_end => Err(CellarError::SharesLocked { lock_end, now }),
            _ => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap()
    }

    #[test]
    fn unlocks_exactly_at_lock_end() {
        let alice = Address::derive("alice");
        let mut locks = ShareLocks::default();
        let end = locks.refresh(alice, t0(), 300).unwrap();
        assert_eq!(end, t0() + Duration::seconds(300));
        assert!(locks.is_locked(alice, end - Duration::seconds(1)));
        assert!(!locks.is_locked(alice, end));
    }

    #[test]
    fn refresh_overwrites() {
        let alice = Address::derive("alice");
        let mut locks = ShareLocks::default();
        locks.refresh(alice, t0(), 300).unwrap();
        let later = t0() + Duration::seconds(200);
        locks.refresh(alice, later, 300).unwrap();
        assert_eq!(locks.lock_end(alice), Some(later + Duration::seconds(300)));
    }

    #[test]
    fn locked_error_carries_lock_end() {
        let alice = Address::derive("alice");
        let mut locks = ShareLocks::default();
        let end = locks.refresh(alice, t0(), 60).unwrap();
        match locks.ensure_unlocked(alice, t0()) {
            Err(CellarError::SharesLocked { lock_end, now }) => {
                assert_eq!(lock_end, end);
                assert_eq!(now, t0());
            }
            other => panic!("expected SharesLocked, got {other:?}"),
        }
    }

    #[test]
    fn never_minted_is_unlocked() {
        let locks = ShareLocks::default();
        assert!(locks.ensure_unlocked(Address::derive("bob"), t0()).is_ok());
    }
}
