//! Balance scanning and transaction validation.
//!
//! Balances are defined by a linear scan of the canonical chain: the
//! sender side debits `amount + fee`, the recipient side credits `amount`,
//! and the genesis transaction is skipped. The scan is O(blocks × txs);
//! callers needing speed may cache, but the scan is the source of truth.

use std::collections::{BTreeMap, BTreeSet};

use quorus_channels::BalanceSource;
use quorus_types::Transaction;

use crate::chain::Blockchain;
use crate::{ChainError, Result};

impl Blockchain {
    /// Computes the balance of `address` by scanning all blocks in order.
    pub fn balance(&self, address: &str) -> f64 {
        let mut balance = 0.0;
        for block in self.blocks() {
            for tx in &block.transactions {
                if tx.from.is_empty() && tx.to == "Genesis" {
                    continue;
                }
                if tx.from == address {
                    balance -= tx.total_cost();
                }
                if tx.to == address {
                    balance += tx.amount;
                }
            }
        }
        balance
    }

    /// Accepts coinbase transactions unconditionally; otherwise requires
    /// the sender's balance to cover `amount + fee`.
    pub fn validate_transaction(&self, tx: &Transaction) -> Result<()> {
        if tx.is_coinbase() {
            return Ok(());
        }

        let have = self.balance(&tx.from);
        let need = tx.total_cost();
        if have < need {
            return Err(ChainError::InsufficientBalance {
                address: tx.from.clone(),
                have,
                need,
            });
        }
        Ok(())
    }

    /// Builds the stake table: every address that has ever appeared as a
    /// sender or non-genesis recipient, filtered to positive balances.
    pub fn stakeholders(&self) -> BTreeMap<String, f64> {
        let mut addresses = BTreeSet::new();
        for block in self.blocks() {
            for tx in &block.transactions {
                if !tx.from.is_empty() {
                    addresses.insert(tx.from.clone());
                }
                if !tx.to.is_empty() && tx.to != "Genesis" {
                    addresses.insert(tx.to.clone());
                }
            }
        }

        addresses
            .into_iter()
            .filter_map(|address| {
                let balance = self.balance(&address);
                (balance > 0.0).then_some((address, balance))
            })
            .collect()
    }
}

impl BalanceSource for Blockchain {
    fn balance(&self, address: &str) -> f64 {
        Blockchain::balance(self, address)
    }
}
