//! # Quorus Chain
//!
//! Chain state and block admission for the Quorus blockchain.
//!
//! [`Blockchain`] owns the ordered block sequence, the mempool, the
//! contract registry, and the channel manager. It creates the mined
//! genesis block, admits transactions against balance and signature
//! checks, assembles and seals blocks under each consensus mechanism, and
//! validates the whole chain with per-block consensus dispatch.
//!
//! Peer synchronization (longest-valid-chain merge and single-block
//! admission) lives in [`sync`]; balance scanning in [`balance`]; reward
//! synthesis in [`rewards`].

#![warn(missing_docs)]
#![warn(rust_2018_idioms)]
#![deny(unsafe_code)]

pub mod balance;
pub mod chain;
pub mod rewards;
pub mod sync;

pub use chain::{Blockchain, MAX_BLOCK_TRANSACTIONS};
pub use rewards::{reward_transaction, total_fees, BLOCK_REWARD, GENESIS_REWARD};
pub use sync::MergeOutcome;

/// Result type alias for chain operations
pub type Result<T> = std::result::Result<T, ChainError>;

/// What a block failed validation on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockFault {
    /// Stored Merkle root differs from the recomputed one
    MerkleMismatch,
    /// Stored hash differs from the canonical hash
    HashMismatch,
    /// `previous_hash` does not link to the predecessor
    LinkMismatch,
    /// Block index does not follow the predecessor
    IndexMismatch,
    /// A signed transaction fails verification
    BadSignature,
    /// The stored nonce does not clear the difficulty target
    PowInvalid,
    /// Genesis block malformed (index or previous hash)
    BadGenesis,
}

impl std::fmt::Display for BlockFault {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let reason = match self {
            Self::MerkleMismatch => "merkle_root mismatch",
            Self::HashMismatch => "hash mismatch",
            Self::LinkMismatch => "previous hash mismatch",
            Self::IndexMismatch => "index mismatch",
            Self::BadSignature => "invalid transaction signature",
            Self::PowInvalid => "PoW invalid",
            Self::BadGenesis => "malformed genesis block",
        };
        f.write_str(reason)
    }
}

/// Errors that can occur in chain operations
#[derive(Debug, thiserror::Error)]
pub enum ChainError {
    /// A signed transaction failed verification at admission
    #[error("transaction signature is invalid")]
    InvalidSignature,

    /// Sender cannot cover amount + fee
    #[error("insufficient balance: {address} has {have:.2}, needs {need:.2}")]
    InsufficientBalance {
        /// The overdrawn sender
        address: String,
        /// Current balance
        have: f64,
        /// amount + fee required
        need: f64,
    },

    /// A block failed a validation predicate
    #[error("block #{index}: {fault}")]
    InvalidBlock {
        /// Index of the offending block
        index: u64,
        /// The failed predicate
        fault: BlockFault,
    },

    /// A peer block at an existing index with an identical hash
    #[error("block #{index} already exists")]
    DuplicateBlock {
        /// Index of the duplicate
        index: u64,
    },

    /// The peer sent an empty block sequence
    #[error("received empty blockchain")]
    EmptyPeerChain,

    /// No transactions available to build a block from
    #[error("no transactions in mempool")]
    EmptyMempool,

    /// The tail moved while a candidate was being mined
    #[error("chain advanced past the candidate's parent")]
    StaleParent,

    /// Mining was cancelled before a solution was found
    #[error("mining cancelled")]
    MiningCancelled,

    /// Mempool admission failed
    #[error(transparent)]
    Mempool(#[from] quorus_mempool::MempoolError),

    /// A consensus mechanism rejected the block or proposer
    #[error(transparent)]
    Consensus(#[from] quorus_consensus::ConsensusError),

    /// Contract deployment or direct call failed
    #[error(transparent)]
    Contract(#[from] quorus_contracts::ContractError),

    /// Channel operation failed
    #[error(transparent)]
    Channel(#[from] quorus_channels::ChannelError),
}
