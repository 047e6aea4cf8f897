//! # Quorus Channels
//!
//! Layer-2 payment channels: a two-party off-chain state machine advanced
//! by signed updates and settled back onto the chain at closure.
//!
//! Across every committed state, `balance1 + balance2` equals the initial
//! deposit sum, both balances stay non-negative, and the sequence number
//! strictly increases. Funding checks go through the [`BalanceSource`]
//! seam so this crate never holds a reference back into the chain.

#![warn(missing_docs)]
#![warn(rust_2018_idioms)]
#![deny(unsafe_code)]

pub mod channel;
pub mod manager;

pub use channel::{ChannelSignature, ChannelState, PaymentChannel};
pub use manager::{ChannelManager, ChannelStatistics};

/// Result type alias for channel operations
pub type Result<T> = std::result::Result<T, ChannelError>;

/// Read-only view of on-chain balances, implemented by the chain.
pub trait BalanceSource {
    /// Returns the spendable balance of an address.
    fn balance(&self, address: &str) -> f64;
}

/// Errors that can occur in channel operations
#[derive(Debug, thiserror::Error)]
pub enum ChannelError {
    /// Channel lookup failed
    #[error("channel not found: {0}")]
    NotFound(String),

    /// Operation on a closed channel
    #[error("channel is closed")]
    Closed,

    /// Deposits must be strictly positive
    #[error("deposits must be positive")]
    NonPositiveDeposit,

    /// A participant cannot fund their deposit on-chain
    #[error("{participant} has insufficient balance: {have:.2} < {need:.2}")]
    InsufficientBalance {
        /// The underfunded participant
        participant: String,
        /// On-chain balance
        have: f64,
        /// Required deposit
        need: f64,
    },

    /// A proposed update changes the channel's total
    #[error("total balance must remain constant: {actual:.2} != {expected:.2}")]
    BalanceMismatch {
        /// Required total
        expected: f64,
        /// Proposed total
        actual: f64,
    },

    /// A proposed update drives a balance negative
    #[error("balances cannot be negative")]
    NegativeBalance,

    /// A commit carried a sequence number that does not advance the channel
    #[error("invalid sequence number: {proposed} does not advance {current}")]
    StaleSequence {
        /// The channel's current sequence
        current: u64,
        /// The committed state's sequence
        proposed: u64,
    },

    /// Closure state does not match the latest committed sequence
    #[error("final state sequence mismatch: expected {expected}, got {actual}")]
    FinalSequenceMismatch {
        /// The channel's current sequence
        expected: u64,
        /// The closing state's sequence
        actual: u64,
    },

    /// A commit is missing one of the two signatures
    #[error("both signatures are required")]
    MissingSignature,

    /// The actor is not one of the two channel participants
    #[error("{0} is not a channel participant")]
    NotParticipant(String),

    /// A micropayment exceeds the sender's channel balance
    #[error("insufficient channel balance: {have:.2} < {need:.2}")]
    InsufficientChannelBalance {
        /// Sender's channel-side balance
        have: f64,
        /// Payment amount
        need: f64,
    },
}
