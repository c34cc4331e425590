//! The ordered list of positions a cellar is actively using.

use cellar_protocol::config::MAX_POSITIONS;
use cellar_protocol::Address;
use serde::{Deserialize, Serialize};

use super::CellarError;
use crate::registry::PositionId;

/// One active position.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PositionEntry {
    pub position_id: PositionId,
    pub adaptor: Address,
    pub config: Vec<u8>,
    pub is_debt: bool,
}

/// Active positions in strategist-chosen order. Unique by id, at most
/// [`MAX_POSITIONS`] long.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PositionCatalog {
    entries: Vec<PositionEntry>,
}

impl PositionCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains(&self, id: PositionId) -> bool {
        self.get(id).is_some()
    }

    pub fn get(&self, id: PositionId) -> Option<&PositionEntry> {
        self.entries.iter().find(|entry| entry.position_id == id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &PositionEntry> {
        self.entries.iter()
    }

    /// Inserts `entry` at `index`, shifting later entries right.
    pub fn insert(&mut self, index: usize, entry: PositionEntry) -> Result<(), CellarError> {
        if self.contains(entry.position_id) {
            return Err(CellarError::PositionAlreadyUsed(entry.position_id));
        }
        if self.entries.len() >= MAX_POSITIONS {
            return Err(CellarError::PositionArrayFull { max: MAX_POSITIONS });
        }
        if index > self.entries.len() {
            return Err(CellarError::IndexOutOfBounds {
                index,
                len: self.entries.len(),
            });
        }
        self.entries.insert(index, entry);
        Ok(())
    }

    /// Removes and returns the entry at `index`.
    pub fn remove(&mut self, index: usize) -> Result<PositionEntry, CellarError> {
        if index >= self.entries.len() {
            return Err(CellarError::IndexOutOfBounds {
                index,
                len: self.entries.len(),
            });
        }
        Ok(self.entries.remove(index))
    }

    pub fn entry_at(&self, index: usize) -> Option<&PositionEntry> {
        self.entries.get(index)
    }
}
