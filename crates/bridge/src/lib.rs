//! # Quorus Bridge
//!
//! Cross-chain transfer coordinator over two chain instances.
//!
//! A transfer locks funds on the source chain, gathers validator
//! approvals up to an m-of-n threshold, and then mints the amount on the
//! destination chain through a coinbase-style relayer block. Every step
//! emits an event into the bridge's log.

#![warn(missing_docs)]
#![warn(rust_2018_idioms)]
#![deny(unsafe_code)]

pub mod bridge;

pub use bridge::{
    Bridge, BridgeDirection, BridgeEvent, BridgeStatus, BridgeTransaction, Validator,
};

/// Result type alias for bridge operations
pub type Result<T> = std::result::Result<T, BridgeError>;

/// Errors that can occur in bridge coordination
#[derive(Debug, thiserror::Error)]
pub enum BridgeError {
    /// Transfer lookup failed
    #[error("transfer not found: {0}")]
    TransferNotFound(String),

    /// The validator already approved this transfer
    #[error("validator {0} already approved this transfer")]
    DuplicateApproval(String),

    /// Approval from an unregistered or inactive validator
    #[error("unknown or inactive validator: {0}")]
    UnknownValidator(String),

    /// Transfer below the bridge minimum
    #[error("amount below minimum: {amount:.4} < {minimum:.4}")]
    BelowMinimum {
        /// Requested amount
        amount: f64,
        /// Bridge minimum
        minimum: f64,
    },

    /// Transfer above the bridge maximum
    #[error("amount above maximum: {amount:.4} > {maximum:.4}")]
    AboveMaximum {
        /// Requested amount
        amount: f64,
        /// Bridge maximum
        maximum: f64,
    },

    /// The sender cannot cover amount plus bridge fee on the source chain
    #[error("insufficient balance on {chain}: {have:.2} < {need:.2}")]
    InsufficientBalance {
        /// Source chain name
        chain: String,
        /// Sender balance
        have: f64,
        /// amount + fee
        need: f64,
    },

    /// Unlock attempted before the approval threshold was met
    #[error("transfer not approved: {0} approvals missing")]
    NotApproved(usize),

    /// Minting the destination block failed
    #[error(transparent)]
    Chain(#[from] quorus_chain::ChainError),
}
