use cellar_protocol::{Address, Ledger};
use chrono::{DateTime, Utc};

use super::{CallContext, Cellar, CellarError};
use crate::adaptor::{AdaptorError, AdaptorHost};

/// The cellar as seen by an adaptor it is running.
pub(super) struct VaultHost<'c, 'a> {
    cellar: &'c mut Cellar,
    ctx: &'c mut CallContext<'a>,
}

impl<'c, 'a> VaultHost<'c, 'a> {
    pub(super) fn new(cellar: &'c mut Cellar, ctx: &'c mut CallContext<'a>) -> Self {
        Self { cellar, ctx }
    }
}

impl AdaptorHost for VaultHost<'_, '_> {
    fn vault(&self) -> Address {
        self.cellar.address
    }

    fn now(&self) -> DateTime<Utc> {
        self.ctx.now
    }

    fn ledger(&mut self) -> &mut Ledger {
        &mut *self.ctx.ledger
    }

    fn request_flash_credit(
        &mut self,
        tokens: &[Address],
        amounts: &[u64],
        user_data: Vec<u8>,
    ) -> Result<(), AdaptorError> {
        let provider = self.ctx.credit.ok_or(CellarError::CreditUnavailable)?;
        provider.extend_credit(&mut *self.cellar, &mut *self.ctx, tokens, amounts, &user_data)?;
        Ok(())
    }
}
