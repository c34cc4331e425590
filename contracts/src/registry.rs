//! # Registry
//!
//! The trust anchor every cellar consults. The registry answers four
//! questions:
//!
//! 1. **Where is contract `id`?** A dense, append-only table of addresses.
//!    Ids are never reused; an entry can only be replaced, never removed.
//! 2. **Which adaptors may touch vault funds?** The trusted adaptor set.
//! 3. **Which positions exist?** Each trusted position pins an adaptor and
//!    the BLAKE3 hash of its configuration, so a cellar can't activate a
//!    position with a tampered config.
//! 4. **Who may deposit on someone else's behalf?** Approved depositors.
//!
//! Every mutation is restricted to the registry's authority and appends a
//! [`RegistryEvent`] to the log.
//!
//! Cellars check trust when a position or adaptor is *added*. Distrusting
//! something later does not reach into cellars that already use it.

use std::collections::{BTreeMap, BTreeSet};

use cellar_protocol::crypto::blake3_hash;
use cellar_protocol::Address;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;

/// Index into the registry's address table.
pub type ContractId = u64;

/// Identifier of a trusted position.
pub type PositionId = u32;

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Errors that can occur during registry operations.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RegistryError {
    /// The caller is not the registry authority.
    #[error("caller {caller} is not the registry authority")]
    Unauthorized { caller: Address },

    /// The null address can't be registered.
    #[error("invalid address: the null address cannot be registered")]
    InvalidAddress,

    /// No contract has been registered under this id.
    #[error("contract id {0} is not registered")]
    ContractNotRegistered(ContractId),

    #[error("adaptor {0} is not trusted")]
    AdaptorNotTrusted(Address),

    #[error("adaptor {0} is already trusted")]
    AdaptorAlreadyTrusted(Address),

    #[error("position {0} is not trusted")]
    PositionNotTrusted(PositionId),
}

// ---------------------------------------------------------------------------
// Events
// ---------------------------------------------------------------------------

/// An entry in the registry's append-only change log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum RegistryEvent {
    Registered { id: ContractId, address: Address },
    AddressChanged { id: ContractId, old: Address, new: Address },
    AdaptorTrusted { adaptor: Address },
    AdaptorDistrusted { adaptor: Address },
    PositionTrusted { id: PositionId, adaptor: Address },
    PositionDistrusted { id: PositionId },
    DepositorApproved { depositor: Address },
    DepositorRevoked { depositor: Address },
}

// ---------------------------------------------------------------------------
// Registry
// ---------------------------------------------------------------------------

/// A position the registry vouches for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrustedPosition {
    /// The adaptor that serves this position.
    pub adaptor: Address,
    /// BLAKE3 hash of the position's configuration blob.
    pub config_hash: [u8; 32],
}

impl TrustedPosition {
    /// Whether `config` is the configuration this position was trusted with.
    pub fn matches_config(&self, config: &[u8]) -> bool {
        blake3_hash(config) == self.config_hash
    }
}

/// The registry contract.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Registry {
    authority: Address,
    addresses: Vec<Address>,
    trusted_adaptors: BTreeSet<Address>,
    trusted_positions: BTreeMap<PositionId, TrustedPosition>,
    next_position_id: PositionId,
    approved_depositors: BTreeSet<Address>,
    events: Vec<RegistryEvent>,
}

impl Registry {
    /// Creates an empty registry governed by `authority`.
    pub fn new(authority: Address) -> Self {
        Self {
            authority,
            addresses: Vec::new(),
            trusted_adaptors: BTreeSet::new(),
            trusted_positions: BTreeMap::new(),
            next_position_id: 1,
            approved_depositors: BTreeSet::new(),
            events: Vec::new(),
        }
    }

    pub fn authority(&self) -> Address {
        self.authority
    }

    fn ensure_authority(&self, caller: Address) -> Result<(), RegistryError> {
        if caller != self.authority {
            return Err(RegistryError::Unauthorized { caller });
        }
        Ok(())
    }

    // ----- Address table -----

    /// Registers `address` under the next free id and returns that id.
    pub fn register(&mut self, caller: Address, address: Address) -> Result<ContractId, RegistryError> {
        self.ensure_authority(caller)?;
        if address.is_zero() {
            return Err(RegistryError::InvalidAddress);
        }
        let id = self.next_id();
        self.addresses.push(address);
        self.events.push(RegistryEvent::Registered { id, address });
        info!(id, %address, "contract registered");
        Ok(id)
    }

    /// Replaces the address stored under an existing id.
    pub fn set_address(
        &mut self,
        caller: Address,
        id: ContractId,
        new: Address,
    ) -> Result<(), RegistryError> {
        self.ensure_authority(caller)?;
        if new.is_zero() {
            return Err(RegistryError::InvalidAddress);
        }
        let slot = usize::try_from(id)
            .ok()
            .and_then(|index| self.addresses.get_mut(index))
            .ok_or(RegistryError::ContractNotRegistered(id))?;
        let old = std::mem::replace(slot, new);
        self.events.push(RegistryEvent::AddressChanged { id, old, new });
        info!(id, %old, %new, "contract address changed");
        Ok(())
    }

    pub fn address_of(&self, id: ContractId) -> Option<Address> {
        usize::try_from(id)
            .ok()
            .and_then(|index| self.addresses.get(index))
            .copied()
    }

    /// The id the next registration will receive.
    pub fn next_id(&self) -> ContractId {
        self.addresses.len() as ContractId
    }

    // ----- Adaptor trust -----

    pub fn trust_adaptor(&mut self, caller: Address, adaptor: Address) -> Result<(), RegistryError> {
        self.ensure_authority(caller)?;
        if adaptor.is_zero() {
            return Err(RegistryError::InvalidAddress);
        }
        if !self.trusted_adaptors.insert(adaptor) {
            return Err(RegistryError::AdaptorAlreadyTrusted(adaptor));
        }
        self.events.push(RegistryEvent::AdaptorTrusted { adaptor });
        info!(%adaptor, "adaptor trusted");
        Ok(())
    }

    pub fn distrust_adaptor(&mut self, caller: Address, adaptor: Address) -> Result<(), RegistryError> {
        self.ensure_authority(caller)?;
        if !self.trusted_adaptors.remove(&adaptor) {
            return Err(RegistryError::AdaptorNotTrusted(adaptor));
        }
        self.events.push(RegistryEvent::AdaptorDistrusted { adaptor });
        info!(%adaptor, "adaptor distrusted");
        Ok(())
    }

    pub fn is_adaptor_trusted(&self, adaptor: Address) -> bool {
        self.trusted_adaptors.contains(&adaptor)
    }

    // ----- Position trust -----

    /// Trusts a new position served by `adaptor` with configuration
    /// `config`. Returns the freshly assigned position id.
    pub fn trust_position(
        &mut self,
        caller: Address,
        adaptor: Address,
        config: &[u8],
    ) -> Result<PositionId, RegistryError> {
        self.ensure_authority(caller)?;
        if !self.is_adaptor_trusted(adaptor) {
            return Err(RegistryError::AdaptorNotTrusted(adaptor));
        }
        let id = self.next_position_id;
        self.next_position_id += 1;
        self.trusted_positions.insert(
            id,
            TrustedPosition {
                adaptor,
                config_hash: blake3_hash(config),
            },
        );
        self.events.push(RegistryEvent::PositionTrusted { id, adaptor });
        info!(position = id, %adaptor, "position trusted");
        Ok(id)
    }

    pub fn distrust_position(&mut self, caller: Address, id: PositionId) -> Result<(), RegistryError> {
        self.ensure_authority(caller)?;
        if self.trusted_positions.remove(&id).is_none() {
            return Err(RegistryError::PositionNotTrusted(id));
        }
        self.events.push(RegistryEvent::PositionDistrusted { id });
        info!(position = id, "position distrusted");
        Ok(())
    }

    pub fn trusted_position(&self, id: PositionId) -> Option<&TrustedPosition> {
        self.trusted_positions.get(&id)
    }

    // ----- Depositors -----

    pub fn approve_depositor(&mut self, caller: Address, depositor: Address) -> Result<(), RegistryError> {
        self.ensure_authority(caller)?;
        if depositor.is_zero() {
            return Err(RegistryError::InvalidAddress);
        }
        if self.approved_depositors.insert(depositor) {
            self.events.push(RegistryEvent::DepositorApproved { depositor });
            info!(%depositor, "depositor approved");
        }
        Ok(())
    }

    pub fn revoke_depositor(&mut self, caller: Address, depositor: Address) -> Result<(), RegistryError> {
        self.ensure_authority(caller)?;
        if self.approved_depositors.remove(&depositor) {
            self.events.push(RegistryEvent::DepositorRevoked { depositor });
            info!(%depositor, "depositor revoked");
        }
        Ok(())
    }

    pub fn is_approved_depositor(&self, depositor: Address) -> bool {
        self.approved_depositors.contains(&depositor)
    }

    /// The full change log, oldest first.
    pub fn events(&self) -> &[RegistryEvent] {
        &self.events
    }
}
