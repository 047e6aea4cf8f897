//! # Quorus P2P
//!
//! Peer wire protocol for the Quorus blockchain: newline-delimited JSON
//! envelopes over TCP.
//!
//! Five message kinds travel between peers — full chains, single blocks,
//! transactions, and ping/pong — each wrapped in an [`Envelope`] carrying
//! the payload, a timestamp, and the sender id. The envelope itself is not
//! cryptographically authenticated; the blocks and transactions it carries
//! bring their own signatures.

#![warn(missing_docs)]
#![warn(rust_2018_idioms)]
#![deny(unsafe_code)]

pub mod message;
pub mod peer;

pub use message::{Envelope, MessageKind};
pub use peer::{broadcast, dispatch, serve, serve_on, Peer};

/// Result type alias for peer transport operations
pub type Result<T> = std::result::Result<T, P2pError>;

/// Errors that can occur in the peer transport
#[derive(Debug, thiserror::Error)]
pub enum P2pError {
    /// Socket operation failed
    #[error("transport error: {0}")]
    Io(#[from] std::io::Error),

    /// A frame was not a valid envelope
    #[error("codec error: {0}")]
    Codec(#[from] serde_json::Error),
}
