//! Passive token holding.
//!
//! The simplest possible position: the vault just holds a token. Its
//! configuration is the token's 32-byte address. Everything the vault holds
//! in custody is immediately withdrawable, which makes this the natural
//! holding position for new deposits.

use cellar_protocol::{Address, Ledger};

use super::{Adaptor, AdaptorCall, AdaptorError, AdaptorHost};

#[derive(Debug, Clone, Copy, Default)]
pub struct Erc20Adaptor;

impl Erc20Adaptor {
    /// Position config for holding `asset`.
    pub fn config(asset: Address) -> Vec<u8> {
        asset.as_bytes().to_vec()
    }

    fn parse_config(config: &[u8]) -> Result<Address, AdaptorError> {
        let bytes: [u8; 32] = config.try_into().map_err(|_| {
            AdaptorError::InvalidConfig(format!("expected a 32-byte asset address, got {} bytes", config.len()))
        })?;
        Ok(Address::new(bytes))
    }
}

impl Adaptor for Erc20Adaptor {
    fn name(&self) -> &'static str {
        "erc20"
    }

    fn asset_of(&self, config: &[u8]) -> Result<Address, AdaptorError> {
        Self::parse_config(config)
    }

    fn balance_of(&self, config: &[u8], holder: Address, ledger: &Ledger) -> Result<u64, AdaptorError> {
        Ok(ledger.balance_of(Self::parse_config(config)?, holder))
    }

    fn withdrawable_from(
        &self,
        config: &[u8],
        holder: Address,
        ledger: &Ledger,
    ) -> Result<u64, AdaptorError> {
        self.balance_of(config, holder, ledger)
    }

    fn is_debt(&self) -> bool {
        false
    }

    fn deposit(&self, _amount: u64, config: &[u8], _host: &mut dyn AdaptorHost) -> Result<(), AdaptorError> {
        // Funds are already in vault custody.
        Self::parse_config(config).map(|_| ())
    }

    fn withdraw(
        &self,
        amount: u64,
        receiver: Address,
        config: &[u8],
        host: &mut dyn AdaptorHost,
    ) -> Result<(), AdaptorError> {
        let asset = Self::parse_config(config)?;
        let vault = host.vault();
        host.ledger().transfer(asset, vault, receiver, amount)?;
        Ok(())
    }

    fn execute(
        &self,
        call: &AdaptorCall,
        _config: Option<&[u8]>,
        _host: &mut dyn AdaptorHost,
    ) -> Result<(), AdaptorError> {
        Err(AdaptorError::Unsupported {
            adaptor: self.name(),
            operation: call.kind(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_round_trips_the_asset() {
        let usdc = Address::derive("usdc");
        assert_eq!(Erc20Adaptor.asset_of(&Erc20Adaptor::config(usdc)).unwrap(), usdc);
    }

    #[test]
    fn short_config_is_rejected() {
        assert!(matches!(
            Erc20Adaptor.asset_of(&[1, 2, 3]),
            Err(AdaptorError::InvalidConfig(_))
        ));
    }

    #[test]
    fn balance_is_ledger_balance() {
        let usdc = Address::derive("usdc");
        let vault = Address::derive("vault");
        let mut ledger = Ledger::new();
        ledger.credit(usdc, vault, 42).unwrap();
        let config = Erc20Adaptor::config(usdc);
        assert_eq!(Erc20Adaptor.balance_of(&config, vault, &ledger).unwrap(), 42);
        assert_eq!(Erc20Adaptor.withdrawable_from(&config, vault, &ledger).unwrap(), 42);
        assert!(!Erc20Adaptor.is_debt());
    }
}
