//! Deployment configuration for a cellar.
//!
//! Loaded from JSON. Optional knobs fall back to the protocol defaults in
//! [`cellar_protocol::config`].

use cellar_protocol::config::{
    DEFAULT_REBALANCE_DEVIATION, DEFAULT_SHARE_LOCK_PERIOD_SECS, DEFAULT_SHARE_SUPPLY_CAP,
    MAXIMUM_REBALANCE_DEVIATION, MAXIMUM_SHARE_LOCK_PERIOD_SECS, MINIMUM_SHARE_LOCK_PERIOD_SECS,
};
use cellar_protocol::Address;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to parse cellar config: {0}")]
    Parse(#[from] serde_json::Error),

    /// A role or asset was left as the null address.
    #[error("{0} must not be the null address")]
    NullAddress(&'static str),

    #[error("share lock period {0}s is out of bounds")]
    InvalidLockPeriod(u64),

    #[error("rebalance deviation {0} exceeds the maximum")]
    InvalidRebalanceDeviation(u64),

    #[error("name and symbol must not be empty")]
    EmptyMetadata,
}

fn default_share_lock_period() -> u64 {
    DEFAULT_SHARE_LOCK_PERIOD_SECS
}

fn default_rebalance_deviation() -> u64 {
    DEFAULT_REBALANCE_DEVIATION
}

fn default_share_supply_cap() -> u64 {
    DEFAULT_SHARE_SUPPLY_CAP
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CellarConfig {
    pub name: String,
    pub symbol: String,
    pub accounting_asset: Address,
    pub owner: Address,
    pub strategist: Address,
    pub automation_signer: Address,
    pub credit_authority: Address,
    #[serde(default = "default_share_lock_period")]
    pub share_lock_period: u64,
    #[serde(default = "default_rebalance_deviation")]
    pub rebalance_deviation: u64,
    #[serde(default = "default_share_supply_cap")]
    pub share_supply_cap: u64,
    #[serde(default)]
    pub whitelist_enabled: bool,
}

impl CellarConfig {
    /// A config with every optional knob at its default.
    pub fn new(
        name: impl Into<String>,
        symbol: impl Into<String>,
        accounting_asset: Address,
        owner: Address,
        strategist: Address,
    ) -> Self {
        Self {
            name: name.into(),
            symbol: symbol.into(),
            accounting_asset,
            owner,
            strategist,
            automation_signer: owner,
            credit_authority: Address::ZERO,
            share_lock_period: DEFAULT_SHARE_LOCK_PERIOD_SECS,
            rebalance_deviation: DEFAULT_REBALANCE_DEVIATION,
            share_supply_cap: DEFAULT_SHARE_SUPPLY_CAP,
            whitelist_enabled: false,
        }
    }

    /// Parses and validates a JSON config.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// The credit authority may be null (no flash credit); nothing else may.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.name.is_empty() || self.symbol.is_empty() {
            return Err(ConfigError::EmptyMetadata);
        }
        for (role, address) in [
            ("accounting_asset", self.accounting_asset),
            ("owner", self.owner),
            ("strategist", self.strategist),
            ("automation_signer", self.automation_signer),
        ] {
            if address.is_zero() {
                return Err(ConfigError::NullAddress(role));
            }
        }
        if !(MINIMUM_SHARE_LOCK_PERIOD_SECS..=MAXIMUM_SHARE_LOCK_PERIOD_SECS)
            .contains(&self.share_lock_period)
        {
            return Err(ConfigError::InvalidLockPeriod(self.share_lock_period));
        }
        if self.rebalance_deviation > MAXIMUM_REBALANCE_DEVIATION {
            return Err(ConfigError::InvalidRebalanceDeviation(self.rebalance_deviation));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn json_with(extra: &str) -> String {
        format!(
            r#"{{
                "name": "Real Yield USD",
                "symbol": "RYUSD",
                "accounting_asset": "{}",
                "owner": "{}",
                "strategist": "{}",
                "automation_signer": "{}",
                "credit_authority": "{}"{}
            }}"#,
            Address::derive("usdc"),
            Address::derive("owner"),
            Address::derive("strategist"),
            Address::derive("signer"),
            Address::derive("balancer"),
            extra
        )
    }

    #[test]
    fn optional_fields_take_defaults() {
        let config = CellarConfig::from_json(&json_with("")).unwrap();
        assert_eq!(config.share_lock_period, DEFAULT_SHARE_LOCK_PERIOD_SECS);
        assert_eq!(config.rebalance_deviation, DEFAULT_REBALANCE_DEVIATION);
        assert_eq!(config.share_supply_cap, u64::MAX);
        assert!(!config.whitelist_enabled);
    }

    #[test]
    fn out_of_range_lock_period_is_rejected() {
        let err = CellarConfig::from_json(&json_with(r#", "share_lock_period": 0"#)).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidLockPeriod(0)));
        let err = CellarConfig::from_json(&json_with(r#", "share_lock_period": 172801"#)).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidLockPeriod(172801)));
    }

    #[test]
    fn excessive_deviation_is_rejected() {
        let err = CellarConfig::from_json(&json_with(r#", "rebalance_deviation": 100000000000000001"#))
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidRebalanceDeviation(_)));
    }

    #[test]
    fn null_owner_is_rejected() {
        let mut config = CellarConfig::new(
            "c",
            "C",
            Address::derive("usdc"),
            Address::derive("owner"),
            Address::derive("strategist"),
        );
        config.owner = Address::ZERO;
        assert!(matches!(config.validate(), Err(ConfigError::NullAddress("owner"))));
    }

    #[test]
    fn garbage_json_is_a_parse_error() {
        assert!(matches!(CellarConfig::from_json("{"), Err(ConfigError::Parse(_))));
    }
}
