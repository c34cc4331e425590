//! # Protocol Configuration & Constants
//!
//! Every magic number the vault engine relies on lives here. Per-cellar
//! settings start from these defaults and are bounded by these limits.

// ---------------------------------------------------------------------------
// Fixed-point
// ---------------------------------------------------------------------------

/// 1.0 in 18-decimal fixed point. Deviation bounds are expressed in WAD.
pub const WAD: u64 = 1_000_000_000_000_000_000;

// ---------------------------------------------------------------------------
// Share Issuance
// ---------------------------------------------------------------------------

/// Shares minted per unit of asset while the share supply is zero.
pub const BOOTSTRAP_SHARES_PER_ASSET: u64 = 1;

/// Default cap on total share supply: effectively uncapped.
pub const DEFAULT_SHARE_SUPPLY_CAP: u64 = u64::MAX;

// ---------------------------------------------------------------------------
// Share Lock
// ---------------------------------------------------------------------------

/// Shortest accepted share lock. Zero would disable the oracle-sandwich
/// defence entirely, so it is rejected.
pub const MINIMUM_SHARE_LOCK_PERIOD_SECS: u64 = 1;

/// Longest accepted share lock: two days.
pub const MAXIMUM_SHARE_LOCK_PERIOD_SECS: u64 = 2 * 24 * 60 * 60;

/// Lock applied to freshly minted shares until the owner changes it.
pub const DEFAULT_SHARE_LOCK_PERIOD_SECS: u64 = 20 * 60;

// ---------------------------------------------------------------------------
// Rebalancing
// ---------------------------------------------------------------------------

/// Default allowed movement of total assets across one strategist batch:
/// 0.03%.
pub const DEFAULT_REBALANCE_DEVIATION: u64 = 300_000_000_000_000;

/// Upper bound the owner may configure: 10%.
pub const MAXIMUM_REBALANCE_DEVIATION: u64 = 100_000_000_000_000_000;

/// Most positions a single cellar may hold at once.
pub const MAX_POSITIONS: usize = 32;

// ---------------------------------------------------------------------------
// Whitelist
// ---------------------------------------------------------------------------

/// How long a whitelist authorization stays valid after it was signed.
pub const WHITELIST_VALIDITY_WINDOW_SECS: i64 = 300;

/// Domain tag mixed into every whitelist digest.
pub const WHITELIST_DOMAIN_TAG: &str = "cellar.whitelist.v1";

/// Type tag naming the signed structure and its field order.
pub const WHITELIST_PROOF_TYPE: &str = "WhitelistProof(address sender,address receiver,int64 signedAt)";

// ---------------------------------------------------------------------------
// Crypto
// ---------------------------------------------------------------------------

/// Ed25519 public key length in bytes.
pub const PUBLIC_KEY_LENGTH: usize = 32;

/// Ed25519 signature length in bytes.
pub const SIGNATURE_LENGTH: usize = 64;
