//! Proof-of-Work: nonce search against a difficulty target.
//!
//! A block hash is interpreted as a 256-bit big-endian integer; the block
//! is valid when that integer is strictly below `1 << (256 - TARGET_BITS)`.
//! Mining checks a cancellation flag on every nonce bump so a host can
//! abort a search that is no longer needed.

use std::sync::atomic::{AtomicBool, Ordering};

use alloy_primitives::U256;
use quorus_types::{sha256, Block};
use tracing::debug;

/// Difficulty: the hash must clear this many leading zero bits.
pub const TARGET_BITS: usize = 16;

/// A proof-of-work instance bound to a candidate block.
pub struct ProofOfWork<'a> {
    block: &'a Block,
    target: U256,
}

impl<'a> ProofOfWork<'a> {
    /// Creates a proof-of-work for the given block at the compile-time difficulty.
    pub fn new(block: &'a Block) -> Self {
        Self {
            block,
            target: target(),
        }
    }

    /// Searches for a nonce whose hash clears the target.
    ///
    /// Starts from nonce 0 and increments. Returns `None` if `cancel` is
    /// raised before a solution is found; otherwise the winning nonce and
    /// its hex hash.
    pub fn run(&self, cancel: &AtomicBool) -> Option<(u64, String)> {
        debug!(
            index = self.block.index,
            transactions = self.block.transactions.len(),
            "mining block"
        );

        let mut nonce = 0u64;
        loop {
            if cancel.load(Ordering::Relaxed) {
                debug!(index = self.block.index, nonce, "mining cancelled");
                return None;
            }

            let digest = sha256(self.block.hash_input(nonce).as_bytes());
            if U256::from_be_slice(&digest) < self.target {
                debug!(index = self.block.index, nonce, "block mined");
                return Some((nonce, hex::encode(digest)));
            }
            nonce += 1;
        }
    }

    /// Rechecks the inequality at the block's stored nonce.
    pub fn validate(&self) -> bool {
        let digest = sha256(self.block.hash_input(self.block.nonce).as_bytes());
        U256::from_be_slice(&digest) < self.target
    }
}

/// The difficulty target: `1 << (256 - TARGET_BITS)`.
pub fn target() -> U256 {
    U256::from(1u64) << (256 - TARGET_BITS)
}

/// Validates a block's stored nonce against the difficulty target.
pub fn validate_block(block: &Block) -> bool {
    ProofOfWork::new(block).validate()
}
