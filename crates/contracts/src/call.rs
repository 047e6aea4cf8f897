//! Parsing of contract call payloads.
//!
//! Transactions carry contract calls as a plain string in the form
//! `function:arg1,arg2,...`; an empty argument list after the colon is
//! permitted (`get_status:`).

use crate::{ContractError, Result};

/// A parsed contract call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContractCall {
    /// Function to invoke
    pub function: String,
    /// Positional string arguments
    pub args: Vec<String>,
}

/// Parses `function:arg1,arg2,...` into a [`ContractCall`].
pub fn parse_contract_call(data: &str) -> Result<ContractCall> {
    if data.is_empty() {
        return Err(ContractError::MalformedCall("empty call data".into()));
    }

    let (function, args_str) = data
        .split_once(':')
        .ok_or_else(|| ContractError::MalformedCall("expected 'function:args'".into()))?;

    let function = function.trim();
    if function.is_empty() {
        return Err(ContractError::MalformedCall(
            "function name cannot be empty".into(),
        ));
    }

    let args = if args_str.is_empty() {
        Vec::new()
    } else {
        args_str.split(',').map(|arg| arg.trim().to_string()).collect()
    };

    Ok(ContractCall {
        function: function.to_string(),
        args,
    })
}
