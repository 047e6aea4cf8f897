//! Binary Merkle tree over a block's transaction list.
//!
//! Leaves are transaction hashes. Levels with odd cardinality duplicate
//! their last node as the right sibling; each parent is the SHA-256 of the
//! concatenated child hashes. The root of an empty list is the empty string.

use crate::hash::{sha256_concat, HASH_SIZE};
use crate::transaction::Transaction;

/// A Merkle tree built from a block's transactions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MerkleTree {
    root: Option<[u8; HASH_SIZE]>,
}

impl MerkleTree {
    /// Builds the tree bottom-up from the transaction list.
    pub fn build(transactions: &[Transaction]) -> Self {
        if transactions.is_empty() {
            return Self { root: None };
        }

        let mut nodes: Vec<[u8; HASH_SIZE]> =
            transactions.iter().map(|tx| tx.hash()).collect();

        while nodes.len() > 1 {
            let mut level = Vec::with_capacity(nodes.len().div_ceil(2));
            for pair in nodes.chunks(2) {
                let left = &pair[0];
                // Odd level: the last node is its own right sibling.
                let right = pair.get(1).unwrap_or(left);
                level.push(sha256_concat(&[left, right]));
            }
            nodes = level;
        }

        Self { root: Some(nodes[0]) }
    }

    /// Returns the hex-encoded root hash, or the empty string for an empty tree.
    pub fn root_hash(&self) -> String {
        match &self.root {
            Some(root) => hex::encode(root),
            None => String::new(),
        }
    }
}

/// Computes the Merkle root of a transaction list.
///
/// Convenience wrapper around [`MerkleTree::build`].
pub fn merkle_root(transactions: &[Transaction]) -> String {
    MerkleTree::build(transactions).root_hash()
}
