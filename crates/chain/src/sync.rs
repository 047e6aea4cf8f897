//! Peer synchronization: longest-valid-chain merge and single-block
//! admission.

use tracing::{debug, info};

use quorus_consensus::pow;
use quorus_types::{Block, ConsensusKind};

use crate::chain::Blockchain;
use crate::{BlockFault, ChainError, Result};

/// What a merge decided.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeOutcome {
    /// The peer chain was strictly longer and replaced the local one
    Replaced {
        /// Local length before the merge
        old_len: usize,
        /// Length after the merge
        new_len: usize,
    },
    /// The local chain was kept (peer equal or shorter)
    KeptLocal,
}

impl Blockchain {
    /// Merges a peer's block sequence under the longest-valid-chain rule.
    ///
    /// The candidate must be non-empty and fully valid (including a
    /// well-formed genesis). A strictly longer candidate replaces the
    /// local chain wholesale; ties and shorter candidates keep the local
    /// chain. Merging never decreases the local length.
    pub fn merge(&self, peer_blocks: Vec<Block>) -> Result<MergeOutcome> {
        if peer_blocks.is_empty() {
            return Err(ChainError::EmptyPeerChain);
        }
        validate_block_sequence(&peer_blocks)?;

        let mut blocks = self.blocks_mut();
        let old_len = blocks.len();
        if peer_blocks.len() > old_len {
            let new_len = peer_blocks.len();
            *blocks = peer_blocks;
            info!(old_len, new_len, "replaced local chain with longer peer chain");
            return Ok(MergeOutcome::Replaced { old_len, new_len });
        }

        debug!(
            local = old_len,
            peer = peer_blocks.len(),
            "keeping local chain"
        );
        Ok(MergeOutcome::KeptLocal)
    }

    /// Admits a single peer-received block at the chain tip.
    ///
    /// The block must extend the tail (index and previous hash), carry a
    /// consistent Merkle root and canonical hash, verify every signed
    /// transaction, and clear proof-of-work when it is a PoW block.
    /// Duplicates are rejected with a dedicated, non-fatal error.
    pub fn add_received_block(&self, block: Block) -> Result<()> {
        {
            let mut blocks = self.blocks_mut();
            let tail = blocks.last().expect("chain always holds genesis");

            if let Some(existing) = blocks.get(block.index as usize) {
                if existing.hash == block.hash {
                    return Err(ChainError::DuplicateBlock { index: block.index });
                }
            }

            if block.index != tail.index + 1 {
                return Err(ChainError::InvalidBlock {
                    index: block.index,
                    fault: BlockFault::IndexMismatch,
                });
            }
            if block.previous_hash != tail.hash {
                return Err(ChainError::InvalidBlock {
                    index: block.index,
                    fault: BlockFault::LinkMismatch,
                });
            }
            validate_block_body(&block, true)?;

            blocks.push(block.clone());
        }
        info!(index = block.index, "block admitted from peer");

        // Evict the included transactions; rewards were never pooled.
        let hashes: Vec<String> = block
            .transactions
            .iter()
            .filter(|tx| !tx.is_coinbase())
            .map(|tx| tx.hash_hex())
            .collect();
        self.mempool().remove_all(&hashes);
        Ok(())
    }
}

/// Validates a standalone block sequence: well-formed genesis, per-block
/// body predicates, and linkage. Shared by full-chain validation and merge.
pub(crate) fn validate_block_sequence(blocks: &[Block]) -> Result<()> {
    let genesis = blocks.first().ok_or(ChainError::EmptyPeerChain)?;
    if genesis.index != 0 || genesis.previous_hash != "0" {
        return Err(ChainError::InvalidBlock {
            index: genesis.index,
            fault: BlockFault::BadGenesis,
        });
    }

    for (position, block) in blocks.iter().enumerate() {
        validate_block_body(block, position > 0)?;

        if position > 0 {
            let prev = &blocks[position - 1];
            if block.previous_hash != prev.hash {
                return Err(ChainError::InvalidBlock {
                    index: block.index,
                    fault: BlockFault::LinkMismatch,
                });
            }
            if block.index != prev.index + 1 {
                return Err(ChainError::InvalidBlock {
                    index: block.index,
                    fault: BlockFault::IndexMismatch,
                });
            }
        }
    }
    Ok(())
}

/// Per-block predicates: Merkle root, signatures, canonical hash, and the
/// proof dispatched on the block's consensus tag.
fn validate_block_body(block: &Block, check_signatures: bool) -> Result<()> {
    if block.merkle_root != block.recompute_merkle_root() {
        return Err(ChainError::InvalidBlock {
            index: block.index,
            fault: BlockFault::MerkleMismatch,
        });
    }

    if check_signatures {
        for tx in &block.transactions {
            if !tx.signature.is_empty() && !tx.verify() {
                return Err(ChainError::InvalidBlock {
                    index: block.index,
                    fault: BlockFault::BadSignature,
                });
            }
        }
    }

    if block.hash != block.canonical_hash() {
        return Err(ChainError::InvalidBlock {
            index: block.index,
            fault: BlockFault::HashMismatch,
        });
    }

    // Only proof-of-work blocks are held to the difficulty target; the
    // other mechanisms seal at nonce 0.
    if block.consensus == ConsensusKind::ProofOfWork && !pow::validate_block(block) {
        return Err(ChainError::InvalidBlock {
            index: block.index,
            fault: BlockFault::PowInvalid,
        });
    }

    Ok(())
}
