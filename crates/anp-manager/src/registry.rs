//! Keyed, insertion-ordered collections
//!
//! Used for both callback registries and the outstanding transaction list.
//! Lookups go through a hash index; iteration follows insertion order so
//! event delivery order is stable.

use std::collections::HashMap;
use thiserror::Error;

/// An entry that can live in a [`Registry`]
pub trait RegistryEntry {
    /// Unique non-zero key of this entry
    fn key(&self) -> u32;
}

/// Errors from registry insertion
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegistryError {
    /// An entry with this key already exists
    #[error("Duplicate key: {0}")]
    DuplicateKey(u32),

    /// Key 0 is reserved
    #[error("Invalid key 0")]
    InvalidKey,
}

/// Collection of entries keyed by [`RegistryEntry::key`]
#[derive(Debug)]
pub struct Registry<T> {
    entries: HashMap<u32, T>,
    order: Vec<u32>,
}

impl<T: RegistryEntry> Registry<T> {
    /// Create an empty registry
    pub fn new() -> Self {
        Self {
            entries: HashMap::new(),
            order: Vec::new(),
        }
    }

    /// Append an entry, refusing duplicates and key 0
    pub fn insert(&mut self, entry: T) -> Result<&T, RegistryError> {
        let key = entry.key();
        if key == 0 {
            return Err(RegistryError::InvalidKey);
        }
        if self.entries.contains_key(&key) {
            return Err(RegistryError::DuplicateKey(key));
        }

        self.order.push(key);
        Ok(self.entries.entry(key).or_insert(entry))
    }

    /// Look up an entry
    pub fn find(&self, key: u32) -> Option<&T> {
        self.entries.get(&key)
    }

    /// Look up an entry for modification
    pub fn find_mut(&mut self, key: u32) -> Option<&mut T> {
        self.entries.get_mut(&key)
    }

    /// Remove an entry and hand it back
    pub fn remove(&mut self, key: u32) -> Option<T> {
        let entry = self.entries.remove(&key)?;
        if let Some(pos) = self.order.iter().position(|k| *k == key) {
            self.order.remove(pos);
        }
        Some(entry)
    }

    /// Drop every entry
    pub fn remove_all(&mut self) {
        self.entries.clear();
        self.order.clear();
    }

    /// Iterate in insertion order
    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.order.iter().filter_map(|key| self.entries.get(key))
    }

    /// Number of entries
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if empty
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<T: RegistryEntry> Default for Registry<T> {
    fn default() -> Self {
        Self::new()
    }
}
