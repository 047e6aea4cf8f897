//! # Quorus Crypto
//!
//! ECDSA P-256 key management for the Quorus blockchain.
//!
//! This crate provides:
//! - [`PrivateKey`] / [`PublicKey`] - thin wrappers over the P-256 ECDSA keys
//! - [`Wallet`] - a key pair bundled with its derived on-chain address
//! - Address derivation: first 20 bytes of `SHA256(X ‖ Y)`, hex-encoded
//!
//! ## Example
//!
//! ```rust
//! use quorus_crypto::Wallet;
//! use quorus_types::Transaction;
//!
//! let wallet = Wallet::generate();
//! let mut tx = Transaction::new(wallet.address(), "bob", 1.0);
//! wallet.sign_transaction(&mut tx).unwrap();
//! assert!(tx.verify());
//! ```

#![warn(missing_docs)]
#![warn(rust_2018_idioms)]
#![deny(unsafe_code)]

pub mod ecdsa;
pub mod wallet;

pub use ecdsa::{derive_address, PrivateKey, PublicKey};
pub use wallet::Wallet;

/// Result type alias for crypto operations
pub type Result<T> = std::result::Result<T, CryptoError>;

/// Errors that can occur in key handling
#[derive(Debug, thiserror::Error)]
pub enum CryptoError {
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

    /// Bytes do not encode a valid private key
    #[error("invalid private key: {0}")]
    InvalidPrivateKey(String),

    /// Bytes do not encode a point on the curve
    #[error("invalid public key: {0}")]
    InvalidPublicKey(String),

    /// Signing failed
    #[error("signature error: {0}")]
    Signature(String),
}
