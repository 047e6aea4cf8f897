//! # Quorus Types
//!
//! Core type definitions for the Quorus blockchain.
//!
//! This crate provides the fundamental types used throughout Quorus:
//! - [`Transaction`] - Signed value transfers with P-256 signatures
//! - [`Block`] - Header+body aggregate with canonical SHA-256 hashing
//! - [`MerkleTree`] - Binary hash tree over a block's transaction list
//! - [`ConsensusKind`] - The consensus mechanism a block was finalized under
//!
//! ## Example
//!
//! ```rust
//! use quorus_types::{sha256_hex, Transaction};
//!
//! let tx = Transaction::new("alice", "bob", 10.0);
//! assert_eq!(tx.total_cost(), 10.0);
//!
//! let digest = sha256_hex(b"hello");
//! assert_eq!(digest.len(), 64);
//! ```

#![warn(missing_docs)]
#![warn(rust_2018_idioms)]
#![deny(unsafe_code)]

pub mod block;
pub mod hash;
pub mod merkle;
pub mod transaction;

// Re-export main types at crate root
pub use block::{Block, ConsensusKind};
pub use hash::{sha256, sha256_concat, sha256_hex};
pub use merkle::MerkleTree;
pub use transaction::Transaction;

/// Result type alias for Quorus type operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur when working with Quorus types
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Invalid hex string
    #[error("invalid hex: {0}")]
    InvalidHex(#[from] hex::FromHexError),

    /// Invalid length for a fixed-size encoding
    #[error("invalid length: expected {expected}, got {actual}")]
    InvalidLength {
        /// Expected length
        expected: usize,
        /// Actual length
        actual: usize,
    },

    /// Signing failed
    #[error("signature error: {0}")]
    Signature(String),
}
