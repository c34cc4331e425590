use cellar_protocol::{Address, Ledger, PriceRouter};
use chrono::{DateTime, Utc};

use crate::adaptor::AdaptorDirectory;
use crate::cellar::CreditProvider;
use crate::registry::Registry;

/// Everything a cellar operation may consult or touch besides the cellar
/// itself.
///
/// `caller` is the authenticated sender of this call. The trust snapshot,
/// pricing, adaptor code and credit authority are read-only; only the
/// ledger is mutable.
pub struct CallContext<'a> {
    pub caller: Address,
    pub now: DateTime<Utc>,
    pub registry: &'a Registry,
    pub pricing: &'a dyn PriceRouter,
    pub adaptors: &'a AdaptorDirectory,
    pub credit: Option<&'a dyn CreditProvider>,
    pub ledger: &'a mut Ledger,
}

impl<'a> CallContext<'a> {
    /// A nested context for a call made by `caller` within this one. Same
    /// world, same block time.
    pub fn with_caller(&mut self, caller: Address) -> CallContext<'_> {
        CallContext {
            caller,
            now: self.now,
            registry: self.registry,
            pricing: self.pricing,
            adaptors: self.adaptors,
            credit: self.credit,
            ledger: &mut *self.ledger,
        }
    }
}
