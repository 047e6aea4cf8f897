//! # Quorus Contracts
//!
//! In-process smart-contract VM: a registry of deployed contracts and four
//! built-in templates (simple storage, token, escrow, voting).
//!
//! Contracts are addressed by `"0x" + first_40_hex(SHA256(deployer ‖
//! block_index))` and mutated only through
//! [`SmartContract::execute`], which dispatches on the contract type and
//! guards each instance's state behind its own lock. Execution results are
//! returned as `serde_json::Value` snapshots; execution errors surface to
//! the caller and never abort the enclosing block.

#![warn(missing_docs)]
#![warn(rust_2018_idioms)]
#![deny(unsafe_code)]

pub mod call;
pub mod contract;
pub mod registry;

pub use call::{parse_contract_call, ContractCall};
pub use contract::{ContractState, ContractType, SmartContract};
pub use registry::{is_contract_address, ContractRegistry};

/// Result type alias for contract operations
pub type Result<T> = std::result::Result<T, ContractError>;

/// Errors that can occur in contract deployment and execution
#[derive(Debug, thiserror::Error)]
pub enum ContractError {
    /// No contract deployed at the address
    #[error("contract not found: {0}")]
    NotFound(String),

    /// The template does not define this function
    #[error("unknown function: {0}")]
    UnknownFunction(String),

    /// Too few arguments for the function
    #[error("{function} requires {required} argument(s)")]
    MissingArguments {
        /// Function name
        function: &'static str,
        /// Required argument count
        required: usize,
    },

    /// An amount argument failed to parse or was negative
    #[error("invalid amount: {0}")]
    InvalidAmount(String),

    /// Caller lacks the required role (deployer/arbiter)
    #[error("permission denied: {0}")]
    PermissionDenied(&'static str),

    /// Token operation exceeds the caller's balance
    #[error("insufficient balance: {have:.2} < {need:.2}")]
    InsufficientBalance {
        /// Caller's balance
        have: f64,
        /// Amount requested
        need: f64,
    },

    /// Storage key not present
    #[error("key '{0}' not found")]
    KeyNotFound(String),

    /// Proposal already registered
    #[error("proposal '{0}' already exists")]
    DuplicateProposal(String),

    /// Proposal not registered
    #[error("proposal '{0}' not found")]
    UnknownProposal(String),

    /// Caller already cast a vote
    #[error("address already voted")]
    AlreadyVoted,

    /// Voting has been closed
    #[error("voting has ended")]
    VotingEnded,

    /// Escrow operation after release
    #[error("escrow already released")]
    AlreadyReleased,

    /// Escrow operation without funds
    #[error("no funds in escrow")]
    NoFunds,

    /// Payable call without positive value
    #[error("value must be greater than zero")]
    NonPositiveValue,

    /// Empty deployer address on deployment
    #[error("deployer address cannot be empty")]
    EmptyDeployer,

    /// Malformed `function:args` payload
    #[error("invalid contract call format: {0}")]
    MalformedCall(String),
}
