// Copyright (c) 2026 ALAS Technology. MIT License.
// See LICENSE for details.

//! # Cellar Protocol: Core Primitives
//!
//! Everything the vault contracts stand on but that isn't itself a contract:
//! addresses, hashing and signatures, the token custody ledger, and the
//! interface to the pricing collaborator.
//!
//! ## Architecture
//!
//! - **types**: the 32-byte [`Address`](types::Address) every participant,
//!   token and contract is known by.
//! - **crypto**: Ed25519 keys and signatures, SHA-256/BLAKE3 hashing, and
//!   typed-structure digests for signed authorizations.
//! - **ledger**: who holds how much of which token. The custody layer that
//!   deposits, withdrawals and adaptor calls all move value through.
//! - **pricing**: the [`PriceRouter`](pricing::PriceRouter) seam. The engine
//!   never discovers prices; it asks.
//! - **config**: protocol constants. If a number matters, it lives there.
//!
//! ## Design Philosophy
//!
//! 1. Amounts are `u64` in smallest units. Products are computed in `u128`
//!    and checked on the way back down.
//! 2. Nothing here holds global state. Callers pass what they need.
//! 3. If it touches money, it has tests.

pub mod config;
pub mod crypto;
pub mod ledger;
pub mod pricing;
pub mod types;

pub use ledger::{Ledger, LedgerError};
pub use pricing::{PriceRouter, PricingError};
pub use types::{Address, AddressError};
