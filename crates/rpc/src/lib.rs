//! # Quorus RPC
//!
//! Ethereum-compatible JSON-RPC shell over a Quorus chain.
//!
//! A thin compatibility surface: balances scale by 10^18 into wei, block
//! numbers travel as hex quantities, and `eth_call` is a stub returning
//! `0x` (contract reads are not exposed over RPC). Application failures
//! map to JSON-RPC error code `-32000`; parse and method-routing errors
//! use the protocol's standard `-32700`/`-32601`.

#![warn(missing_docs)]
#![warn(rust_2018_idioms)]
#![deny(unsafe_code)]

pub mod eth;
pub mod server;
pub mod types;

pub use eth::{EthApiImpl, EthApiServer, Web3ApiImpl, Web3ApiServer};
pub use server::{RpcServer, RpcServerConfig};
pub use types::{BlockTag, RpcBlock, RpcTransaction, TxRequest};

/// Result type alias for RPC bootstrap operations
pub type Result<T> = std::result::Result<T, RpcError>;

/// Errors that can occur starting the RPC server
#[derive(Debug, thiserror::Error)]
pub enum RpcError {
    /// Binding or serving the HTTP endpoint failed
    #[error("server error: {0}")]
    Server(String),
}

/// JSON-RPC application error code.
pub const APPLICATION_ERROR: i32 = -32000;

pub(crate) fn app_error(message: impl Into<String>) -> jsonrpsee::types::ErrorObjectOwned {
    jsonrpsee::types::ErrorObjectOwned::owned(APPLICATION_ERROR, message.into(), None::<()>)
}
