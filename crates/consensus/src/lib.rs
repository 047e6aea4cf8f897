//! # Quorus Consensus
//!
//! Pluggable consensus mechanisms for the Quorus blockchain.
//!
//! Five mechanisms share two variation points: how a block's proof is
//! produced and validated, and who may propose. Each lives in its own
//! module:
//!
//! - [`pow`] — nonce search against a difficulty target
//! - [`pos`] — stake-weighted deterministic validator selection
//! - [`dpos`] — vote aggregation with round-robin over the top delegates
//! - [`pbft`] — three-phase Byzantine quorum (pre-prepare/prepare/commit)
//! - [`raft`] — leader election and replicated-log commitment
//!
//! The chain records which mechanism finalized each block
//! (`quorus_types::ConsensusKind`) so validation can dispatch per block.
//!
//! Committed blocks flow back into the chain through the [`BlockSink`]
//! seam, keeping this crate independent of the chain's ownership model.

#![warn(missing_docs)]
#![warn(rust_2018_idioms)]
#![deny(unsafe_code)]

pub mod dpos;
pub mod pbft;
pub mod pos;
pub mod pow;
pub mod raft;

pub use dpos::{Delegate, DelegatedProofOfStake, TOP_DELEGATE_COUNT};
pub use pbft::{Pbft, PbftMessage, PbftMessageKind, PbftState};
pub use pos::ProofOfStake;
pub use pow::{ProofOfWork, TARGET_BITS};
pub use raft::{
    AppendEntries, AppendResponse, LogEntry, RaftNode, RaftRole, RequestVote, VoteResponse,
    HEARTBEAT_INTERVAL,
};

use quorus_types::Block;

/// Result type alias for consensus operations
pub type Result<T> = std::result::Result<T, ConsensusError>;

/// Where committed blocks are applied.
///
/// Implemented by the chain; consensus modules stay decoupled from its
/// ownership model. Returns `true` iff the block was appended (`false` for
/// duplicates, which are deduplicated by hash).
pub trait BlockSink: Send + Sync {
    /// Applies a committed block, returning whether it was appended.
    fn apply_block(&self, block: Block) -> bool;
}

/// Errors that can occur in consensus operations
#[derive(Debug, thiserror::Error)]
pub enum ConsensusError {
    /// A non-primary node tried to initiate pre-prepare
    #[error("only the primary node can initiate pre-prepare")]
    NotPrimary,

    /// The operation is not valid in the instance's current state
    #[error("invalid state for {0}")]
    InvalidState(&'static str),

    /// Message sequence number does not match this instance
    #[error("sequence mismatch: expected {expected}, got {actual}")]
    SequenceMismatch {
        /// The instance's sequence
        expected: u64,
        /// The message's sequence
        actual: u64,
    },

    /// Message view does not match this instance
    #[error("view mismatch: expected {expected}, got {actual}")]
    ViewMismatch {
        /// The instance's view
        expected: u64,
        /// The message's view
        actual: u64,
    },

    /// Message targets a different block
    #[error("block hash mismatch")]
    BlockHashMismatch,

    /// A pre-prepare arrived from a node other than the current primary
    #[error("pre-prepare not from the current primary")]
    NotFromPrimary,

    /// Quorum was not reached
    #[error("quorum not reached: {have}/{need} votes")]
    QuorumNotReached {
        /// Votes counted
        have: usize,
        /// Votes required
        need: usize,
    },

    /// A non-leader tried a leader-only operation
    #[error("only the leader can {0}")]
    NotLeader(&'static str),

    /// The candidate failed to win the election
    #[error("failed to win election in term {0}")]
    ElectionFailed(u64),

    /// A vote referenced an unknown delegate
    #[error("delegate {0} does not exist")]
    UnknownDelegate(String),

    /// The proposed validator was not selected / is not eligible
    #[error("validator rejected: {0}")]
    ValidatorRejected(String),
}
