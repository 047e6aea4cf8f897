//! # Quorus Mempool
//!
//! Pending-transaction pool for the Quorus blockchain.
//!
//! The pool keys transactions by their canonical hash, rejects duplicates,
//! and hands out bounded batches for block building. It makes no ordering
//! promise beyond a stable traversal within a single batch extraction —
//! callers must not rely on insertion order for inclusion order.
//!
//! ## Example
//!
//! ```rust
//! use quorus_mempool::Mempool;
//! use quorus_types::Transaction;
//!
//! let pool = Mempool::new();
//! pool.add(Transaction::new("alice", "bob", 1.0)).unwrap();
//! let batch = pool.get_for_block(10);
//! assert_eq!(batch.len(), 1);
//! ```

#![warn(missing_docs)]
#![warn(rust_2018_idioms)]
#![deny(unsafe_code)]

pub mod pool;

pub use pool::Mempool;

/// Result type alias for mempool operations
pub type Result<T> = std::result::Result<T, MempoolError>;

/// Errors that can occur in mempool operations
#[derive(Debug, thiserror::Error)]
pub enum MempoolError {
    /// The pool already contains a transaction with this hash
    #[error("transaction already exists in mempool")]
    DuplicateTransaction,
}
