//! # Cellar Contracts
//!
//! The contracts that make a cellar: a pooled vault that issues redeemable
//! shares, deploys its assets through pluggable position adaptors, and
//! revalues itself through an external price router.
//!
//! - **Registry**: the trust anchor. Contract addresses by id, trusted
//!   adaptors, trusted positions, approved depositors.
//! - **Cellar**: share accounting, the share lock, the position catalog,
//!   valuation, the strategist's batch execution engine, the whitelisted
//!   join path, and the flash-credit bridge.
//! - **Adaptor**: the interface every position integration implements, the
//!   typed command set the strategist sends them, and the reference
//!   token-holding adaptor.
//!
//! ## Design Principles
//!
//! 1. All monetary operations use checked arithmetic.
//! 2. Every operation receives an explicit [`CallContext`](cellar::CallContext).
//!    There is no ambient "current caller" anywhere.
//! 3. Every state-changing cellar operation is all-or-nothing.
//! 4. Persistent state (`CellarState`, `Registry`, `Ledger`) is serde-serializable.

pub mod adaptor;
pub mod cellar;
pub mod registry;

pub use adaptor::{Adaptor, AdaptorBatch, AdaptorCall, AdaptorDirectory, AdaptorError, AdaptorHost};
pub use cellar::{CallContext, Cellar, CellarConfig, CellarError, CreditProvider};
pub use registry::{Registry, RegistryError, RegistryEvent};
