//! Hash-keyed pending-transaction pool.

use std::collections::HashMap;

use parking_lot::RwLock;
use quorus_types::Transaction;
use tracing::trace;

use crate::{MempoolError, Result};

/// A thread-safe pool of pending transactions keyed by canonical hash.
#[derive(Debug, Default)]
pub struct Mempool {
    transactions: RwLock<HashMap<String, Transaction>>,
}

impl Mempool {
    /// Creates an empty pool.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a transaction to the pool.
    ///
    /// Fails with [`MempoolError::DuplicateTransaction`] when a transaction
    /// with the same canonical hash is already pending; the pool is left
    /// unchanged in that case.
    pub fn add(&self, tx: Transaction) -> Result<()> {
        let hash = tx.hash_hex();
        let mut transactions = self.transactions.write();
        if transactions.contains_key(&hash) {
            return Err(MempoolError::DuplicateTransaction);
        }
        trace!(%hash, "transaction admitted to mempool");
        transactions.insert(hash, tx);
        Ok(())
    }

    /// Retrieves a transaction by its hex hash.
    pub fn get(&self, hash: &str) -> Option<Transaction> {
        self.transactions.read().get(hash).cloned()
    }

    /// Removes a single transaction by hash.
    pub fn remove(&self, hash: &str) {
        self.transactions.write().remove(hash);
    }

    /// Removes every transaction in the given hash list.
    pub fn remove_all(&self, hashes: &[String]) {
        let mut transactions = self.transactions.write();
        for hash in hashes {
            transactions.remove(hash);
        }
    }

    /// Returns up to `max` transactions in one stable traversal.
    ///
    /// The traversal order is unspecified but consistent within a single
    /// call; two calls may disagree.
    pub fn get_for_block(&self, max: usize) -> Vec<Transaction> {
        self.transactions
            .read()
            .values()
            .take(max)
            .cloned()
            .collect()
    }

    /// Returns every pending transaction.
    pub fn all(&self) -> Vec<Transaction> {
        self.transactions.read().values().cloned().collect()
    }

    /// Returns the number of pending transactions.
    pub fn size(&self) -> usize {
        self.transactions.read().len()
    }

    /// Checks whether the pool is empty.
    pub fn is_empty(&self) -> bool {
        self.transactions.read().is_empty()
    }

    /// Removes all pending transactions.
    pub fn clear(&self) {
        self.transactions.write().clear();
    }
}
