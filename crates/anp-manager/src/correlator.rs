//! Transaction correlation
//!
//! A client request gets a local transaction ID before it is sent. When the
//! platform server accepts it, the server's own transaction ID is bound to
//! the entry; the asynchronous completion carries only the server ID, which
//! is used to find the entry, and the local ID is what the consumer sees.

use std::collections::HashMap;

use anp_core::{CallbackId, ServerTransactionId, TransactionId};

use crate::id::IdGenerator;
use crate::registry::{Registry, RegistryEntry, RegistryError};

/// An outstanding client request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransactionEntry {
    /// Local handle returned to the caller
    pub transaction_id: TransactionId,
    /// Client callback that receives the completion
    pub callback_id: CallbackId,
    /// Server-assigned ID, once the request was accepted
    pub server_transaction_id: Option<ServerTransactionId>,
}

impl RegistryEntry for TransactionEntry {
    fn key(&self) -> u32 {
        self.transaction_id.as_u32()
    }
}

/// Outstanding transactions indexed by local and server ID
#[derive(Debug, Default)]
pub struct Correlator {
    entries: Registry<TransactionEntry>,
    by_server_id: HashMap<ServerTransactionId, TransactionId>,
    ids: IdGenerator,
}

impl Correlator {
    /// Create an empty correlator
    pub fn new() -> Self {
        Self::default()
    }

    /// Start tracking a request on behalf of `callback_id`
    pub fn begin(&mut self, callback_id: CallbackId) -> Result<TransactionId, RegistryError> {
        let transaction_id = TransactionId::new(self.ids.next_id());
        self.entries.insert(TransactionEntry {
            transaction_id,
            callback_id,
            server_transaction_id: None,
        })?;
        Ok(transaction_id)
    }

    /// Record the server's ID for an accepted request
    ///
    /// Returns false if the transaction is no longer outstanding.
    pub fn bind_server_id(
        &mut self,
        transaction_id: TransactionId,
        server_transaction_id: ServerTransactionId,
    ) -> bool {
        let Some(entry) = self.entries.find_mut(transaction_id.as_u32()) else {
            return false;
        };

        if let Some(previous) = entry.server_transaction_id.replace(server_transaction_id) {
            self.by_server_id.remove(&previous);
        }
        if let Some(stale) = self.by_server_id.insert(server_transaction_id, transaction_id) {
            tracing::warn!(
                "Server transaction {} re-bound from {} to {}",
                server_transaction_id,
                stale,
                transaction_id
            );
            self.entries.remove(stale.as_u32());
        }
        true
    }

    /// Stop tracking a request that failed or completed synchronously
    pub fn abandon(&mut self, transaction_id: TransactionId) -> Option<TransactionEntry> {
        let entry = self.entries.remove(transaction_id.as_u32())?;
        if let Some(server_id) = entry.server_transaction_id {
            self.by_server_id.remove(&server_id);
        }
        Some(entry)
    }

    /// Remove and return the transaction the server completed
    pub fn complete_by_server_id(
        &mut self,
        server_transaction_id: ServerTransactionId,
    ) -> Option<TransactionEntry> {
        let transaction_id = self.by_server_id.remove(&server_transaction_id)?;
        self.entries.remove(transaction_id.as_u32())
    }

    /// Look up a transaction by its local ID
    pub fn find(&self, transaction_id: TransactionId) -> Option<&TransactionEntry> {
        self.entries.find(transaction_id.as_u32())
    }

    /// Drop all outstanding transactions
    pub fn clear(&mut self) {
        self.entries.remove_all();
        self.by_server_id.clear();
    }

    /// Drop all outstanding transactions and restart numbering at 1
    pub fn reset(&mut self) {
        self.clear();
        self.ids.reset();
    }

    /// Number of outstanding transactions
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if empty
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
