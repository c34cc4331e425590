//! # Position Adaptors
//!
//! An adaptor is the code that knows how one kind of position works: how to
//! read its balance, what asset it is denominated in, how to move funds in
//! and out. A cellar never talks to an external market directly; it asks
//! the adaptor serving the position.
//!
//! ## Two paths in
//!
//! - **User path.** [`Adaptor::deposit`] and [`Adaptor::withdraw`] run when
//!   depositors join or leave through the holding position.
//! - **Strategist path.** [`Adaptor::execute`] runs one typed
//!   [`AdaptorCall`] from an [`AdaptorBatch`]. Calls travel as opaque bytes
//!   and are decoded before anything is dispatched, so a malformed call
//!   aborts the batch before any adaptor runs.
//!
//! Adaptors act on the world only through an [`AdaptorHost`]: the vault's
//! address, block time, the custody ledger, and a way to request flash
//! credit. They hold no state of their own.

pub mod erc20;

use std::collections::HashMap;
use std::sync::Arc;

use cellar_protocol::{Address, Ledger, LedgerError};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::cellar::CellarError;
use crate::registry::PositionId;

pub use erc20::Erc20Adaptor;

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Errors raised by adaptor code.
#[derive(Debug, Error)]
pub enum AdaptorError {
    /// The position configuration blob could not be understood.
    #[error("invalid position config: {0}")]
    InvalidConfig(String),

    /// A call or batch failed to encode or decode.
    #[error("malformed adaptor call: {0}")]
    Malformed(String),

    /// This adaptor does not implement the requested operation.
    #[error("adaptor {adaptor} does not support {operation}")]
    Unsupported {
        adaptor: &'static str,
        operation: &'static str,
    },

    /// The external protocol refused the operation (health factor, caps,
    /// slippage...).
    #[error("adaptor call rejected: {0}")]
    Rejected(String),

    #[error(transparent)]
    Ledger(#[from] LedgerError),

    /// An error raised by the hosting cellar while the adaptor was running,
    /// e.g. a failed nested flash-credit round trip. Surfaces unwrapped.
    #[error(transparent)]
    Host(Box<CellarError>),
}

impl From<CellarError> for AdaptorError {
    fn from(err: CellarError) -> Self {
        AdaptorError::Host(Box::new(err))
    }
}

// ---------------------------------------------------------------------------
// Calls
// ---------------------------------------------------------------------------

/// A typed strategist command for an adaptor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum AdaptorCall {
    /// Move `amount` of the position's asset from the vault into the position.
    DepositToPosition { position: PositionId, amount: u64 },
    /// Pull `amount` out of the position back into the vault.
    WithdrawFromPosition { position: PositionId, amount: u64 },
    /// Pull `amount` out of the position and send it to `receiver`. Only the
    /// cellar itself is an acceptable receiver on the strategist path.
    Withdraw {
        position: PositionId,
        amount: u64,
        receiver: Address,
    },
    /// Open or grow a debt position.
    Borrow { position: PositionId, amount: u64 },
    /// Pay down a debt position.
    Repay { position: PositionId, amount: u64 },
    /// Borrow `amounts` of `tokens` from the flash-credit authority, run
    /// `batches` while holding them, then repay within the same call.
    RequestFlashCredit {
        tokens: Vec<Address>,
        amounts: Vec<u64>,
        batches: Vec<AdaptorBatch>,
    },
}

impl AdaptorCall {
    /// The position this call acts on, if any.
    pub fn position(&self) -> Option<PositionId> {
        match self {
            AdaptorCall::DepositToPosition { position, .. }
            | AdaptorCall::WithdrawFromPosition { position, .. }
            | AdaptorCall::Withdraw { position, .. }
            | AdaptorCall::Borrow { position, .. }
            | AdaptorCall::Repay { position, .. } => Some(*position),
            AdaptorCall::RequestFlashCredit { .. } => None,
        }
    }

    /// Short name for logs.
    pub fn kind(&self) -> &'static str {
        match self {
            AdaptorCall::DepositToPosition { .. } => "deposit_to_position",
            AdaptorCall::WithdrawFromPosition { .. } => "withdraw_from_position",
            AdaptorCall::Withdraw { .. } => "withdraw",
            AdaptorCall::Borrow { .. } => "borrow",
            AdaptorCall::Repay { .. } => "repay",
            AdaptorCall::RequestFlashCredit { .. } => "request_flash_credit",
        }
    }

    pub fn encode(&self) -> Result<Vec<u8>, AdaptorError> {
        bincode::serialize(self).map_err(|e| AdaptorError::Malformed(e.to_string()))
    }

    pub fn decode(bytes: &[u8]) -> Result<Self, AdaptorError> {
        bincode::deserialize(bytes).map_err(|e| AdaptorError::Malformed(e.to_string()))
    }
}

/// Opaque calls addressed to one adaptor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdaptorBatch {
    pub adaptor: Address,
    pub calls: Vec<Vec<u8>>,
}

impl AdaptorBatch {
    /// Encodes `calls` for `adaptor`.
    pub fn new(adaptor: Address, calls: &[AdaptorCall]) -> Result<Self, AdaptorError> {
        let calls = calls
            .iter()
            .map(AdaptorCall::encode)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { adaptor, calls })
    }

    pub fn decode_calls(&self) -> Result<Vec<AdaptorCall>, AdaptorError> {
        self.calls.iter().map(|bytes| AdaptorCall::decode(bytes)).collect()
    }
}

/// Encodes a list of batches into the opaque `user_data` carried through a
/// flash-credit round trip.
pub fn encode_batches(batches: &[AdaptorBatch]) -> Result<Vec<u8>, AdaptorError> {
    bincode::serialize(batches).map_err(|e| AdaptorError::Malformed(e.to_string()))
}

pub fn decode_batches(bytes: &[u8]) -> Result<Vec<AdaptorBatch>, AdaptorError> {
    bincode::deserialize(bytes).map_err(|e| AdaptorError::Malformed(e.to_string()))
}

// ---------------------------------------------------------------------------
// Interfaces
// ---------------------------------------------------------------------------

/// What an adaptor may do to the world while it runs.
pub trait AdaptorHost {
    /// The cellar the adaptor is acting for.
    fn vault(&self) -> Address;

    /// Block time.
    fn now(&self) -> DateTime<Utc>;

    /// Token custody for every address.
    fn ledger(&mut self) -> &mut Ledger;

    /// Ask the flash-credit authority for `amounts` of `tokens`. The
    /// authority calls back into the cellar with `user_data` before this
    /// returns.
    fn request_flash_credit(
        &mut self,
        tokens: &[Address],
        amounts: &[u64],
        user_data: Vec<u8>,
    ) -> Result<(), AdaptorError>;
}

/// A position integration.
pub trait Adaptor: Send + Sync {
    fn name(&self) -> &'static str;

    /// The asset a position configured with `config` is denominated in.
    fn asset_of(&self, config: &[u8]) -> Result<Address, AdaptorError>;

    /// `holder`'s balance in the position, in units of [`asset_of`](Self::asset_of).
    fn balance_of(&self, config: &[u8], holder: Address, ledger: &Ledger) -> Result<u64, AdaptorError>;

    /// The part of [`balance_of`](Self::balance_of) that can leave right now
    /// without unwinding anything.
    fn withdrawable_from(
        &self,
        config: &[u8],
        holder: Address,
        ledger: &Ledger,
    ) -> Result<u64, AdaptorError>;

    /// Whether positions served by this adaptor are liabilities.
    fn is_debt(&self) -> bool;

    /// User path: `amount` just arrived in vault custody for this position.
    fn deposit(&self, amount: u64, config: &[u8], host: &mut dyn AdaptorHost) -> Result<(), AdaptorError>;

    /// User path: pay `amount` out of this position to `receiver`.
    fn withdraw(
        &self,
        amount: u64,
        receiver: Address,
        config: &[u8],
        host: &mut dyn AdaptorHost,
    ) -> Result<(), AdaptorError>;

    /// Strategist path. `config` is the targeted position's configuration,
    /// or `None` for calls that name no position.
    fn execute(
        &self,
        call: &AdaptorCall,
        config: Option<&[u8]>,
        host: &mut dyn AdaptorHost,
    ) -> Result<(), AdaptorError>;
}

/// Adaptor code deployed at each address.
#[derive(Clone, Default)]
pub struct AdaptorDirectory {
    deployed: HashMap<Address, Arc<dyn Adaptor>>,
}

impl AdaptorDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Deploys `adaptor` at `address`, replacing whatever was there.
    pub fn register(&mut self, address: Address, adaptor: Arc<dyn Adaptor>) {
        self.deployed.insert(address, adaptor);
    }

    pub fn get(&self, address: Address) -> Option<Arc<dyn Adaptor>> {
        self.deployed.get(&address).cloned()
    }
}

impl std::fmt::Debug for AdaptorDirectory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_map()
            .entries(self.deployed.iter().map(|(address, adaptor)| (address, adaptor.name())))
            .finish()
    }
}
