//! Scoped flags.
//!
//! A [`FlagGuard`] holds its flag raised until it is dropped, on every exit
//! path including `?` and panics. Guards own an `Arc` to the flag rather than
//! borrowing the cellar, so the cellar stays mutably usable while a guard is
//! alive and a nested call can observe the flag.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use super::CellarError;

#[derive(Debug, Default)]
pub struct ScopedFlag(Arc<AtomicBool>);

impl ScopedFlag {
    /// Raises the flag, or returns `None` if it is already raised.
    pub fn try_raise(&self) -> Option<FlagGuard> {
        self.0
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| FlagGuard(Arc::clone(&self.0)))
    }

    pub fn is_raised(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

#[must_use = "the flag is lowered as soon as the guard is dropped"]
#[derive(Debug)]
pub struct FlagGuard(Arc<AtomicBool>);

impl Drop for FlagGuard {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// The two guards every cellar carries.
#[derive(Debug, Default)]
pub struct CellarGuards {
    reentrancy: ScopedFlag,
    execution_context: ScopedFlag,
}

impl CellarGuards {
    /// Enters a non-reentrant section.
    pub fn enter(&self) -> Result<FlagGuard, CellarError> {
        self.reentrancy.try_raise().ok_or(CellarError::Reentrancy)
    }

    /// Marks a strategist batch as running. Flash credit is only accepted
    /// while this guard is alive.
    pub fn open_execution_context(&self) -> Result<FlagGuard, CellarError> {
        self.execution_context.try_raise().ok_or(CellarError::Reentrancy)
    }

    pub fn execution_context_active(&self) -> bool {
        self.execution_context.is_raised()
    }
}
