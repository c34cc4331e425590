//! # Pricing Collaborator
//!
//! Cellars never discover prices themselves. Every valuation goes through a
//! [`PriceRouter`] supplied by the host, which answers two questions: "can
//! you price this asset?" and "what is `amount` of `base` worth in `quote`?".
//!
//! Oracle design, staleness, and manipulation resistance are the router's
//! problem. The cellar's only defence against a bent price is the share lock.

use thiserror::Error;

use crate::types::Address;

/// Errors a price router may report.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PricingError {
    /// The router has no price source for this asset.
    #[error("asset {0} is not supported by the price router")]
    UnsupportedAsset(Address),

    /// The converted value does not fit in a `u64`.
    #[error("price conversion overflowed")]
    Overflow,

    /// The price source exists but cannot answer right now.
    #[error("price unavailable: {0}")]
    Unavailable(String),
}

/// Converts amounts between assets.
pub trait PriceRouter: Send + Sync {
    /// Whether `asset` can be valued at all.
    fn is_supported(&self, asset: Address) -> bool;

    /// Value of `amount` units of `base`, expressed in units of `quote`.
    fn value_of(&self, base: Address, amount: u64, quote: Address) -> Result<u64, PricingError>;
}
