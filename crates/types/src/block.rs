//! Block structure and canonical hashing.
//!
//! A [`Block`] aggregates an ordered transaction list under a Merkle root
//! and chains to its predecessor through `previous_hash`. The canonical
//! hash covers `index ‖ previous_hash ‖ RFC3339(timestamp) ‖ merkle_root ‖
//! nonce`; the [`ConsensusKind`] tag is block metadata and stays outside
//! the preimage so hashes remain reproducible across consensus modes.

use crate::hash::sha256_hex;
use crate::merkle::merkle_root;
use crate::transaction::Transaction;
use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// The consensus mechanism a block was finalized under.
///
/// Recorded on every block so chain validation can dispatch proof checks
/// per block: only [`ConsensusKind::ProofOfWork`] blocks are held to the
/// PoW difficulty target, while the other variants fix `nonce = 0`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ConsensusKind {
    /// Nonce search against a difficulty target
    #[default]
    ProofOfWork,
    /// Stake-weighted deterministic validator selection
    ProofOfStake,
    /// Vote-delegated round-robin validator selection
    DelegatedPos,
    /// Three-phase Byzantine quorum finalization
    Pbft,
    /// Leader-replicated log commitment
    Raft,
}

impl fmt::Display for ConsensusKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::ProofOfWork => "proof-of-work",
            Self::ProofOfStake => "proof-of-stake",
            Self::DelegatedPos => "delegated-pos",
            Self::Pbft => "pbft",
            Self::Raft => "raft",
        };
        f.write_str(name)
    }
}

/// A block in the chain.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Block {
    /// Block height (genesis is 0)
    pub index: u64,
    /// Creation time; hashed at seconds precision in RFC 3339 form
    pub timestamp: DateTime<Utc>,
    /// Ordered transaction list
    pub transactions: Vec<Transaction>,
    /// Merkle root over `transactions`
    pub merkle_root: String,
    /// Hash of the predecessor block (`"0"` for genesis)
    pub previous_hash: String,
    /// Canonical hash of this block
    pub hash: String,
    /// Proof-of-work nonce; 0 for non-PoW blocks
    pub nonce: u64,
    /// Consensus mechanism this block was finalized under
    #[serde(default)]
    pub consensus: ConsensusKind,
}

impl Block {
    /// Assembles an unsealed block: the Merkle root is computed, `nonce`
    /// starts at 0, and `hash` is left empty until the block is sealed by
    /// mining or by a consensus proof.
    pub fn assemble(
        index: u64,
        transactions: Vec<Transaction>,
        previous_hash: impl Into<String>,
        consensus: ConsensusKind,
    ) -> Self {
        let merkle_root = merkle_root(&transactions);
        Self {
            index,
            timestamp: Utc::now(),
            transactions,
            merkle_root,
            previous_hash: previous_hash.into(),
            hash: String::new(),
            nonce: 0,
            consensus,
        }
    }

    /// Returns the canonical hash preimage at the given nonce.
    ///
    /// Shared between block sealing and proof-of-work search so the two can
    /// never disagree on the format.
    pub fn hash_input(&self, nonce: u64) -> String {
        format!(
            "{}{}{}{}{}",
            self.index,
            self.previous_hash,
            self.timestamp.to_rfc3339_opts(SecondsFormat::Secs, true),
            self.merkle_root,
            nonce
        )
    }

    /// Computes the canonical hash at the block's stored nonce.
    pub fn canonical_hash(&self) -> String {
        sha256_hex(self.hash_input(self.nonce).as_bytes())
    }

    /// Seals the block at its current nonce by storing the canonical hash.
    pub fn seal(&mut self) {
        self.hash = self.canonical_hash();
    }

    /// Recomputes the Merkle root from the current transaction list.
    pub fn recompute_merkle_root(&self) -> String {
        merkle_root(&self.transactions)
    }
}

impl fmt::Display for Block {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Block #{} [{}] txs: {}, hash: {}, prev: {}",
            self.index,
            self.consensus,
            self.transactions.len(),
            self.hash,
            self.previous_hash
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_block() -> Block {
        let txs = vec![Transaction::new("a", "b", 5.0)];
        Block::assemble(1, txs, "prevhash", ConsensusKind::ProofOfWork)
    }

    #[test]
    fn test_seal_stores_canonical_hash() {
        let mut block = sample_block();
        block.seal();
        assert_eq!(block.hash, block.canonical_hash());
    }

    #[test]
    fn test_hash_changes_with_nonce() {
        let block = sample_block();
        assert_ne!(block.hash_input(0), block.hash_input(1));
    }

    #[test]
    fn test_merkle_root_matches_transactions() {
        let block = sample_block();
        assert_eq!(block.merkle_root, block.recompute_merkle_root());
    }

    #[test]
    fn test_consensus_tag_outside_preimage() {
        let mut pow = sample_block();
        let mut raft = pow.clone();
        raft.consensus = ConsensusKind::Raft;
        pow.seal();
        raft.seal();
        assert_eq!(pow.hash, raft.hash);
    }

    #[test]
    fn test_consensus_kind_serde_round_trip() {
        let json = serde_json::to_string(&ConsensusKind::DelegatedPos).unwrap();
        assert_eq!(json, "\"delegated_pos\"");
        let back: ConsensusKind = serde_json::from_str(&json).unwrap();
        assert_eq!(back, ConsensusKind::DelegatedPos);
    }
}
