use cellar_protocol::{Address, LedgerError, PricingError};
use chrono::{DateTime, Utc};
use thiserror::Error;

use super::config::ConfigError;
use crate::adaptor::AdaptorError;
use crate::registry::PositionId;

/// Everything that can make a cellar operation fail.
///
/// A failed operation leaves the cellar and the ledger exactly as they
/// were, so every variant here is safe to retry after fixing its cause.
#[derive(Debug, Error)]
pub enum CellarError {
    // ----- Authorization -----
    #[error("caller {0} is not the owner")]
    NotOwner(Address),

    #[error("caller {0} is not the strategist")]
    NotStrategist(Address),

    #[error("caller {0} is not the flash-credit authority")]
    NotCreditAuthority(Address),

    /// Flash credit arrived while no strategist batch was running.
    #[error("flash credit was not initiated by this cellar")]
    ExternalInitiator,

    // ----- Configuration -----
    #[error("invalid address: the null address is not allowed here")]
    InvalidAddress,

    #[error("adaptor {0} is not trusted by the registry")]
    AdaptorNotTrusted(Address),

    #[error("position {0} is not trusted by the registry")]
    PositionNotTrusted(PositionId),

    /// The position's config does not hash to what the registry trusted.
    #[error("config for position {0} does not match the registry")]
    PositionConfigMismatch(PositionId),

    #[error("adaptor {0} is not in this cellar's catalogue")]
    AdaptorNotInCatalogue(Address),

    #[error("position {0} is not in this cellar's catalogue")]
    PositionNotInCatalogue(PositionId),

    #[error("position {0} is already in use")]
    PositionAlreadyUsed(PositionId),

    #[error("position {0} is not in use")]
    PositionNotUsed(PositionId),

    #[error("position array is full ({max} positions)")]
    PositionArrayFull { max: usize },

    #[error("index {index} out of bounds for {len} positions")]
    IndexOutOfBounds { index: usize, len: usize },

    /// The declared debt flag disagrees with the adaptor.
    #[error("position {position} debt flag mismatch: declared {declared}, adaptor says {actual}")]
    DebtMismatch {
        position: PositionId,
        declared: bool,
        actual: bool,
    },

    #[error("asset mismatch: expected {expected}, got {actual}")]
    AssetMismatch { expected: Address, actual: Address },

    #[error("asset {0} is not supported by the price router")]
    PricingNotSupported(Address),

    #[error("no adaptor code is deployed at {0}")]
    AdaptorNotDeployed(Address),

    #[error("position {position} is served by {expected}, not {actual}")]
    AdaptorMismatch {
        position: PositionId,
        expected: Address,
        actual: Address,
    },

    #[error("list lengths differ: {tokens} tokens, {amounts} amounts, {fees} fees")]
    LengthMismatch {
        tokens: usize,
        amounts: usize,
        fees: usize,
    },

    #[error("share lock period {0}s is out of bounds")]
    InvalidLockPeriod(u64),

    #[error("rebalance deviation {0} exceeds the maximum")]
    InvalidRebalanceDeviation(u64),

    #[error("malformed adaptor call: {0}")]
    MalformedCall(String),

    #[error("position {position} still holds {balance}")]
    PositionNotEmpty { position: PositionId, balance: u64 },

    #[error("the holding position cannot be removed")]
    RemovingHoldingPosition,

    // ----- State & timing -----
    #[error("shares locked until {lock_end} (now {now})")]
    SharesLocked {
        lock_end: DateTime<Utc>,
        now: DateTime<Utc>,
    },

    #[error("whitelist signature signed at {signed_at} is not valid at {now}")]
    SignatureDeadlineInvalid {
        signed_at: DateTime<Utc>,
        now: DateTime<Utc>,
    },

    #[error("invalid whitelist signature")]
    InvalidSignature,

    #[error("reentrant call")]
    Reentrancy,

    // ----- Policy -----
    #[error("whitelist is enabled: use the whitelisted entry points")]
    WhitelistEnabled,

    #[error("{0} is not approved to deposit on behalf of others")]
    NotApprovedToDepositOnBehalf(Address),

    #[error("total assets moved from {before} to {after}, outside [{min}, {max}]")]
    RebalanceDeviationExceeded {
        before: u64,
        after: u64,
        min: u64,
        max: u64,
    },

    #[error("strategist withdrawals may only pay the cellar, not {receiver}")]
    UserWithdrawsNotAllowed { receiver: Address },

    #[error("cellar is shut down")]
    Shutdown,

    #[error("share supply cap {cap} exceeded: supply would be {requested}")]
    ShareSupplyCapExceeded { cap: u64, requested: u128 },

    // ----- Liquidity & accounting -----
    #[error("insufficient liquidity: requested {requested}, available {available}")]
    InsufficientLiquidity { requested: u64, available: u64 },

    #[error("insufficient shares: {holder} has {available}, needs {requested}")]
    InsufficientShares {
        holder: Address,
        available: u64,
        requested: u64,
    },

    #[error("insufficient allowance: {spender} may spend {allowed}, needs {requested}")]
    InsufficientAllowance {
        spender: Address,
        allowed: u64,
        requested: u64,
    },

    #[error("operation would mint zero shares")]
    ZeroShares,

    #[error("operation would pay out zero assets")]
    ZeroAssets,

    #[error("flash credit of {token} was not repaid")]
    CreditNotRepaid { token: Address },

    #[error("no flash-credit authority is available")]
    CreditUnavailable,

    #[error("arithmetic overflow")]
    MathOverflow,

    #[error("division by zero")]
    DivisionByZero,

    #[error("debt {debt} exceeds assets {assets}")]
    DebtExceedsAssets { assets: u128, debt: u128 },

    // ----- Wrapped -----
    #[error("adaptor failed: {0}")]
    Adaptor(AdaptorError),

    #[error(transparent)]
    Ledger(#[from] LedgerError),

    #[error(transparent)]
    Pricing(#[from] PricingError),

    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl From<AdaptorError> for CellarError {
    fn from(err: AdaptorError) -> Self {
        match err {
            AdaptorError::Host(inner) => *inner,
            AdaptorError::Malformed(msg) => CellarError::MalformedCall(msg),
            AdaptorError::Ledger(inner) => CellarError::Ledger(inner),
            other => CellarError::Adaptor(other),
        }
    }
}
