//! Shared fixture for the cellar integration tests.
//!
//! Builds a small world: a registry, a fixed-rate price table, a ledger with
//! funded users and markets, and a cellar holding USDC with a lending
//! position and a debt position already active.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::Arc;

use cellar_contracts::adaptor::{encode_batches, Erc20Adaptor};
use cellar_contracts::registry::PositionId;
use cellar_contracts::{
    Adaptor, AdaptorBatch, AdaptorCall, AdaptorDirectory, AdaptorError, AdaptorHost, CallContext, Cellar,
    CellarConfig, CellarError, CreditProvider, Registry,
};
use cellar_protocol::crypto::{domain_separated_hash, Keypair};
use cellar_protocol::{Address, Ledger, PriceRouter, PricingError};
use chrono::{DateTime, Duration, TimeZone, Utc};

// ---------------------------------------------------------------------------
// Well-known addresses
// ---------------------------------------------------------------------------

pub fn usdc() -> Address {
    Address::derive("token:usdc")
}

pub fn weth() -> Address {
    Address::derive("token:weth")
}

pub fn owner_key() -> Keypair {
    Keypair::from_seed(&[1u8; 32])
}

pub fn signer_key() -> Keypair {
    Keypair::from_seed(&[2u8; 32])
}

pub fn owner() -> Address {
    owner_key().address()
}

pub fn strategist() -> Address {
    Address::derive("strategist")
}

pub fn registry_authority() -> Address {
    Address::derive("registry-authority")
}

pub fn balancer() -> Address {
    Address::derive("credit-authority")
}

pub fn alice() -> Address {
    Address::derive("alice")
}

pub fn bob() -> Address {
    Address::derive("bob")
}

pub fn cellar_address() -> Address {
    Address::derive("cellar:ryusd")
}

pub fn erc20_adaptor() -> Address {
    Address::derive("adaptor:erc20")
}

pub fn lending_adaptor() -> Address {
    Address::derive("adaptor:lending")
}

pub fn lossy_lending_adaptor() -> Address {
    Address::derive("adaptor:lending-lossy")
}

pub fn debt_adaptor() -> Address {
    Address::derive("adaptor:debt")
}

pub fn flash_adaptor() -> Address {
    Address::derive("adaptor:flash")
}

pub fn lending_market() -> Address {
    Address::derive("market:lending")
}

pub fn debt_market() -> Address {
    Address::derive("market:debt")
}

pub fn lossy_market() -> Address {
    Address::derive("market:lending-lossy")
}

pub const HOLDING: PositionId = 1;
pub const LENDING: PositionId = 2;
pub const DEBT: PositionId = 3;
pub const WETH_HOLDING: PositionId = 4;
pub const LOSSY_LENDING: PositionId = 5;

pub const USER_FUNDS: u64 = 1_000_000;
pub const MARKET_LIQUIDITY: u64 = 10_000_000;

// ---------------------------------------------------------------------------
// Pricing
// ---------------------------------------------------------------------------

/// Prices every asset against a common numeraire at a fixed rate.
#[derive(Default)]
pub struct FixedPriceRouter {
    rates: HashMap<Address, u64>,
}

impl FixedPriceRouter {
    pub fn with_rate(mut self, asset: Address, rate: u64) -> Self {
        self.rates.insert(asset, rate);
        self
    }
}

impl PriceRouter for FixedPriceRouter {
    fn is_supported(&self, asset: Address) -> bool {
        self.rates.contains_key(&asset)
    }

    fn value_of(&self, base: Address, amount: u64, quote: Address) -> Result<u64, PricingError> {
        let base_rate = *self.rates.get(&base).ok_or(PricingError::UnsupportedAsset(base))?;
        let quote_rate = *self.rates.get(&quote).ok_or(PricingError::UnsupportedAsset(quote))?;
        let value = u128::from(amount) * u128::from(base_rate) / u128::from(quote_rate);
        u64::try_from(value).map_err(|_| PricingError::Overflow)
    }
}

// ---------------------------------------------------------------------------
// Mock adaptors
// ---------------------------------------------------------------------------

fn two_addresses(config: &[u8]) -> Result<(Address, Address), AdaptorError> {
    if config.len() != 64 {
        return Err(AdaptorError::InvalidConfig(format!("expected 64 bytes, got {}", config.len())));
    }
    let mut first = [0u8; 32];
    let mut second = [0u8; 32];
    first.copy_from_slice(&config[..32]);
    second.copy_from_slice(&config[32..]);
    Ok((Address::new(first), Address::new(second)))
}

fn market_config(asset: Address, market: Address) -> Vec<u8> {
    let mut config = asset.as_bytes().to_vec();
    config.extend_from_slice(market.as_bytes());
    config
}

/// Supplies an asset to a market and tracks the supplier's claim as a 1:1
/// receipt token. `haircut_bps` shaves each supply, simulating entry costs.
pub struct MockLendingAdaptor {
    pub haircut_bps: u64,
}

impl MockLendingAdaptor {
    pub fn config(asset: Address, market: Address) -> Vec<u8> {
        market_config(asset, market)
    }

    pub fn receipt_token(market: Address) -> Address {
        Address::new(domain_separated_hash("mock lending receipt", market.as_bytes()))
    }

    fn supply(&self, amount: u64, config: &[u8], host: &mut dyn AdaptorHost) -> Result<(), AdaptorError> {
        let (asset, market) = two_addresses(config)?;
        let vault = host.vault();
        let claim = amount - amount * self.haircut_bps / 10_000;
        host.ledger().transfer(asset, vault, market, amount)?;
        host.ledger().credit(Self::receipt_token(market), vault, claim)?;
        Ok(())
    }

    fn redeem(
        &self,
        amount: u64,
        receiver: Address,
        config: &[u8],
        host: &mut dyn AdaptorHost,
    ) -> Result<(), AdaptorError> {
        let (asset, market) = two_addresses(config)?;
        let vault = host.vault();
        host.ledger().debit(Self::receipt_token(market), vault, amount)?;
        host.ledger().transfer(asset, market, receiver, amount)?;
        Ok(())
    }
}

impl Adaptor for MockLendingAdaptor {
    fn name(&self) -> &'static str {
        "mock-lending"
    }

    fn asset_of(&self, config: &[u8]) -> Result<Address, AdaptorError> {
        Ok(two_addresses(config)?.0)
    }

    fn balance_of(&self, config: &[u8], holder: Address, ledger: &Ledger) -> Result<u64, AdaptorError> {
        let (_, market) = two_addresses(config)?;
        Ok(ledger.balance_of(Self::receipt_token(market), holder))
    }

    fn withdrawable_from(&self, config: &[u8], holder: Address, ledger: &Ledger) -> Result<u64, AdaptorError> {
        self.balance_of(config, holder, ledger)
    }

    fn is_debt(&self) -> bool {
        false
    }

    fn deposit(&self, amount: u64, config: &[u8], host: &mut dyn AdaptorHost) -> Result<(), AdaptorError> {
        self.supply(amount, config, host)
    }

    fn withdraw(
        &self,
        amount: u64,
        receiver: Address,
        config: &[u8],
        host: &mut dyn AdaptorHost,
    ) -> Result<(), AdaptorError> {
        self.redeem(amount, receiver, config, host)
    }

    fn execute(
        &self,
        call: &AdaptorCall,
        config: Option<&[u8]>,
        host: &mut dyn AdaptorHost,
    ) -> Result<(), AdaptorError> {
        let config = config.ok_or_else(|| AdaptorError::InvalidConfig("missing position config".into()))?;
        match call {
            AdaptorCall::DepositToPosition { amount, .. } => self.supply(*amount, config, host),
            AdaptorCall::WithdrawFromPosition { amount, .. } => {
                let vault = host.vault();
                self.redeem(*amount, vault, config, host)
            }
            AdaptorCall::Withdraw { amount, receiver, .. } => self.redeem(*amount, *receiver, config, host),
            other => Err(AdaptorError::Unsupported {
                adaptor: self.name(),
                operation: other.kind(),
            }),
        }
    }
}

/// Borrows an asset from a market against nothing in particular, tracking
/// the liability as a debt token.
pub struct MockDebtAdaptor;

impl MockDebtAdaptor {
    pub fn config(asset: Address, market: Address) -> Vec<u8> {
        market_config(asset, market)
    }

    pub fn debt_token(market: Address) -> Address {
        Address::new(domain_separated_hash("mock debt token", market.as_bytes()))
    }
}

impl Adaptor for MockDebtAdaptor {
    fn name(&self) -> &'static str {
        "mock-debt"
    }

    fn asset_of(&self, config: &[u8]) -> Result<Address, AdaptorError> {
        Ok(two_addresses(config)?.0)
    }

    fn balance_of(&self, config: &[u8], holder: Address, ledger: &Ledger) -> Result<u64, AdaptorError> {
        let (_, market) = two_addresses(config)?;
        Ok(ledger.balance_of(Self::debt_token(market), holder))
    }

    fn withdrawable_from(&self, _config: &[u8], _holder: Address, _ledger: &Ledger) -> Result<u64, AdaptorError> {
        Ok(0)
    }

    fn is_debt(&self) -> bool {
        true
    }

    fn deposit(&self, _amount: u64, _config: &[u8], _host: &mut dyn AdaptorHost) -> Result<(), AdaptorError> {
        Err(AdaptorError::Unsupported {
            adaptor: self.name(),
            operation: "deposit",
        })
    }

    fn withdraw(
        &self,
        _amount: u64,
        _receiver: Address,
        _config: &[u8],
        _host: &mut dyn AdaptorHost,
    ) -> Result<(), AdaptorError> {
        Err(AdaptorError::Unsupported {
            adaptor: self.name(),
            operation: "withdraw",
        })
    }

    fn execute(
        &self,
        call: &AdaptorCall,
        config: Option<&[u8]>,
        host: &mut dyn AdaptorHost,
    ) -> Result<(), AdaptorError> {
        let config = config.ok_or_else(|| AdaptorError::InvalidConfig("missing position config".into()))?;
        let (asset, market) = two_addresses(config)?;
        let vault = host.vault();
        match call {
            AdaptorCall::Borrow { amount, .. } => {
                host.ledger().transfer(asset, market, vault, *amount)?;
                host.ledger().credit(Self::debt_token(market), vault, *amount)?;
                Ok(())
            }
            AdaptorCall::Repay { amount, .. } => {
                host.ledger().transfer(asset, vault, market, *amount)?;
                host.ledger().debit(Self::debt_token(market), vault, *amount)?;
                Ok(())
            }
            other => Err(AdaptorError::Unsupported {
                adaptor: self.name(),
                operation: other.kind(),
            }),
        }
    }
}

/// Serves no position; only forwards flash-credit requests to the host.
pub struct FlashCreditAdaptor;

impl Adaptor for FlashCreditAdaptor {
    fn name(&self) -> &'static str {
        "flash-credit"
    }

    fn asset_of(&self, _config: &[u8]) -> Result<Address, AdaptorError> {
        Err(AdaptorError::InvalidConfig("flash-credit adaptor serves no position".into()))
    }

    fn balance_of(&self, _config: &[u8], _holder: Address, _ledger: &Ledger) -> Result<u64, AdaptorError> {
        Ok(0)
    }

    fn withdrawable_from(&self, _config: &[u8], _holder: Address, _ledger: &Ledger) -> Result<u64, AdaptorError> {
        Ok(0)
    }

    fn is_debt(&self) -> bool {
        false
    }

    fn deposit(&self, _amount: u64, _config: &[u8], _host: &mut dyn AdaptorHost) -> Result<(), AdaptorError> {
        Err(AdaptorError::Unsupported {
            adaptor: self.name(),
            operation: "deposit",
        })
    }

    fn withdraw(
        &self,
        _amount: u64,
        _receiver: Address,
        _config: &[u8],
        _host: &mut dyn AdaptorHost,
    ) -> Result<(), AdaptorError> {
        Err(AdaptorError::Unsupported {
            adaptor: self.name(),
            operation: "withdraw",
        })
    }

    fn execute(
        &self,
        call: &AdaptorCall,
        _config: Option<&[u8]>,
        host: &mut dyn AdaptorHost,
    ) -> Result<(), AdaptorError> {
        match call {
            AdaptorCall::RequestFlashCredit {
                tokens,
                amounts,
                batches,
            } => host.request_flash_credit(tokens, amounts, encode_batches(batches)?),
            other => Err(AdaptorError::Unsupported {
                adaptor: self.name(),
                operation: other.kind(),
            }),
        }
    }
}

// ---------------------------------------------------------------------------
// Credit providers
// ---------------------------------------------------------------------------

/// Lends out of its own ledger balance and insists on `amount + fee` back.
pub struct LedgerCreditProvider {
    pub address: Address,
    pub fee_bps: u64,
}

impl CreditProvider for LedgerCreditProvider {
    fn address(&self) -> Address {
        self.address
    }

    fn extend_credit(
        &self,
        receiver: &mut Cellar,
        ctx: &mut CallContext<'_>,
        tokens: &[Address],
        amounts: &[u64],
        user_data: &[u8],
    ) -> Result<(), CellarError> {
        let fees: Vec<u64> = amounts.iter().map(|amount| amount * self.fee_bps / 10_000).collect();
        let before: Vec<u64> = tokens
            .iter()
            .map(|token| ctx.ledger.balance_of(*token, self.address))
            .collect();

        for (token, amount) in tokens.iter().zip(amounts) {
            ctx.ledger.transfer(*token, self.address, receiver.address(), *amount)?;
        }
        receiver.receive_credit(&mut ctx.with_caller(self.address), tokens, amounts, &fees, user_data)?;

        for ((token, held), fee) in tokens.iter().zip(before).zip(fees) {
            if ctx.ledger.balance_of(*token, self.address) < held + fee {
                return Err(CellarError::CreditNotRepaid { token: *token });
            }
        }
        Ok(())
    }
}

/// Tries to deposit into the cellar instead of calling back.
pub struct ReentrantCreditProvider {
    pub address: Address,
}

impl CreditProvider for ReentrantCreditProvider {
    fn address(&self) -> Address {
        self.address
    }

    fn extend_credit(
        &self,
        receiver: &mut Cellar,
        ctx: &mut CallContext<'_>,
        _tokens: &[Address],
        _amounts: &[u64],
        _user_data: &[u8],
    ) -> Result<(), CellarError> {
        receiver.deposit(&mut ctx.with_caller(self.address), 1, self.address)?;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// World
// ---------------------------------------------------------------------------

pub struct World {
    pub registry: Registry,
    pub pricing: FixedPriceRouter,
    pub adaptors: AdaptorDirectory,
    pub credit: Option<Box<dyn CreditProvider>>,
    pub ledger: Ledger,
    pub now: DateTime<Utc>,
}

impl World {
    pub fn ctx(&mut self, caller: Address) -> CallContext<'_> {
        CallContext {
            caller,
            now: self.now,
            registry: &self.registry,
            pricing: &self.pricing,
            adaptors: &self.adaptors,
            credit: self.credit.as_deref(),
            ledger: &mut self.ledger,
        }
    }

    pub fn advance(&mut self, secs: i64) {
        self.now += Duration::seconds(secs);
    }

    pub fn usdc_of(&self, holder: Address) -> u64 {
        self.ledger.balance_of(usdc(), holder)
    }
}

pub struct Fixture {
    pub world: World,
    pub cellar: Cellar,
}

impl Fixture {
    pub fn deposit(&mut self, who: Address, assets: u64) -> Result<u64, CellarError> {
        self.cellar.deposit(&mut self.world.ctx(who), assets, who)
    }

    pub fn redeem(&mut self, who: Address, shares: u64) -> Result<u64, CellarError> {
        self.cellar.redeem(&mut self.world.ctx(who), shares, who, who)
    }

    pub fn withdraw(&mut self, who: Address, assets: u64) -> Result<u64, CellarError> {
        self.cellar.withdraw(&mut self.world.ctx(who), assets, who, who)
    }

    pub fn total_assets(&mut self) -> u64 {
        let ctx = self.world.ctx(owner());
        self.cellar.total_assets(&ctx).unwrap()
    }

    pub fn execute(&mut self, batches: &[AdaptorBatch]) -> Result<(), CellarError> {
        self.cellar.execute_batch(&mut self.world.ctx(strategist()), batches)
    }

    /// Moves `amount` from holding into the lending position.
    pub fn deploy_to_lending(&mut self, amount: u64) {
        let batch = AdaptorBatch::new(
            lending_adaptor(),
            &[AdaptorCall::DepositToPosition {
                position: LENDING,
                amount,
            }],
        )
        .unwrap();
        self.execute(&[batch]).unwrap();
    }

    pub fn position_balance(&mut self, position: PositionId) -> u64 {
        let ctx = self.world.ctx(owner());
        self.cellar
            .position_valuations(&ctx)
            .unwrap()
            .into_iter()
            .find(|valuation| valuation.position_id == position)
            .map(|valuation| valuation.balance)
            .unwrap_or(0)
    }
}

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

pub fn start_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap()
}

pub fn cellar_config() -> CellarConfig {
    let mut config = CellarConfig::new("Real Yield USD", "RYUSD", usdc(), owner(), strategist());
    config.automation_signer = signer_key().address();
    config.credit_authority = balancer();
    config
}

/// The standard world: funded users and markets, every mock adaptor trusted
/// and catalogued, holding/lending/debt positions active.
pub fn setup() -> Fixture {
    init_tracing();

    let mut registry = Registry::new(registry_authority());
    let auth = registry_authority();
    for adaptor in [
        erc20_adaptor(),
        lending_adaptor(),
        lossy_lending_adaptor(),
        debt_adaptor(),
        flash_adaptor(),
    ] {
        registry.trust_adaptor(auth, adaptor).unwrap();
    }
    assert_eq!(
        registry.trust_position(auth, erc20_adaptor(), &Erc20Adaptor::config(usdc())).unwrap(),
        HOLDING
    );
    assert_eq!(
        registry
            .trust_position(auth, lending_adaptor(), &MockLendingAdaptor::config(usdc(), lending_market()))
            .unwrap(),
        LENDING
    );
    assert_eq!(
        registry
            .trust_position(auth, debt_adaptor(), &MockDebtAdaptor::config(usdc(), debt_market()))
            .unwrap(),
        DEBT
    );
    assert_eq!(
        registry.trust_position(auth, erc20_adaptor(), &Erc20Adaptor::config(weth())).unwrap(),
        WETH_HOLDING
    );
    assert_eq!(
        registry
            .trust_position(
                auth,
                lossy_lending_adaptor(),
                &MockLendingAdaptor::config(usdc(), lossy_market())
            )
            .unwrap(),
        LOSSY_LENDING
    );

    let mut adaptors = AdaptorDirectory::new();
    adaptors.register(erc20_adaptor(), Arc::new(Erc20Adaptor));
    adaptors.register(lending_adaptor(), Arc::new(MockLendingAdaptor { haircut_bps: 0 }));
    adaptors.register(lossy_lending_adaptor(), Arc::new(MockLendingAdaptor { haircut_bps: 100 }));
    adaptors.register(debt_adaptor(), Arc::new(MockDebtAdaptor));
    adaptors.register(flash_adaptor(), Arc::new(FlashCreditAdaptor));

    let mut ledger = Ledger::new();
    for user in [alice(), bob()] {
        ledger.credit(usdc(), user, USER_FUNDS).unwrap();
    }
    ledger.credit(usdc(), lending_market(), MARKET_LIQUIDITY).unwrap();
    ledger.credit(usdc(), debt_market(), MARKET_LIQUIDITY).unwrap();
    ledger.credit(usdc(), lossy_market(), MARKET_LIQUIDITY).unwrap();
    ledger.credit(usdc(), balancer(), MARKET_LIQUIDITY).unwrap();

    let mut world = World {
        registry,
        pricing: FixedPriceRouter::default().with_rate(usdc(), 1).with_rate(weth(), 2_000),
        adaptors,
        credit: Some(Box::new(LedgerCreditProvider {
            address: balancer(),
            fee_bps: 0,
        })),
        ledger,
        now: start_time(),
    };

    let mut cellar = Cellar::new(
        cellar_address(),
        cellar_config(),
        &world.ctx(owner()),
        HOLDING,
        Erc20Adaptor::config(usdc()),
    )
    .unwrap();

    {
        let ctx = world.ctx(owner());
        for adaptor in [lending_adaptor(), lossy_lending_adaptor(), debt_adaptor(), flash_adaptor()] {
            cellar.add_adaptor_to_catalogue(&ctx, adaptor).unwrap();
        }
        for position in [LENDING, DEBT, WETH_HOLDING, LOSSY_LENDING] {
            cellar.add_position_to_catalogue(&ctx, position).unwrap();
        }
        cellar
            .add_position(&ctx, 1, LENDING, MockLendingAdaptor::config(usdc(), lending_market()), false)
            .unwrap();
        cellar
            .add_position(&ctx, 2, DEBT, MockDebtAdaptor::config(usdc(), debt_market()), true)
            .unwrap();
    }

    Fixture { world, cellar }
}
