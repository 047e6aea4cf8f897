//! Registry of deployed contracts.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;
use serde_json::Value;
use tracing::info;

use crate::contract::{ContractType, SmartContract, ADDRESS_LEN};
use crate::{ContractError, Result};

/// Address-keyed registry of deployed contracts.
///
/// The registry guard covers only the address map; execution takes each
/// contract's own per-instance guard, so calls on different contracts
/// never contend.
#[derive(Debug, Default)]
pub struct ContractRegistry {
    contracts: RwLock<HashMap<String, Arc<SmartContract>>>,
}

impl ContractRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Deploys a contract and registers it under its derived address.
    pub fn deploy(
        &self,
        deployer: &str,
        contract_type: ContractType,
        bytecode: &str,
        block_index: u64,
    ) -> Result<Arc<SmartContract>> {
        if deployer.is_empty() {
            return Err(ContractError::EmptyDeployer);
        }
        let contract = Arc::new(SmartContract::new(
            deployer,
            contract_type,
            bytecode,
            block_index,
        ));
        info!(address = %contract.address(), %contract_type, "contract deployed");
        self.contracts
            .write()
            .insert(contract.address().to_string(), Arc::clone(&contract));
        Ok(contract)
    }

    /// Looks up a contract by address.
    pub fn get(&self, address: &str) -> Result<Arc<SmartContract>> {
        self.contracts
            .read()
            .get(address)
            .cloned()
            .ok_or_else(|| ContractError::NotFound(address.to_string()))
    }

    /// Executes a function on the contract at `address`.
    pub fn call(
        &self,
        address: &str,
        function: &str,
        args: &[String],
        caller: &str,
        value: f64,
    ) -> Result<Value> {
        self.get(address)?.execute(function, args, caller, value)
    }

    /// Returns every deployed contract.
    pub fn all(&self) -> Vec<Arc<SmartContract>> {
        self.contracts.read().values().cloned().collect()
    }

    /// Returns the contracts deployed by a given address.
    pub fn by_deployer(&self, deployer: &str) -> Vec<Arc<SmartContract>> {
        self.contracts
            .read()
            .values()
            .filter(|contract| contract.deployer() == deployer)
            .cloned()
            .collect()
    }

    /// Number of deployed contracts.
    pub fn len(&self) -> usize {
        self.contracts.read().len()
    }

    /// Checks whether no contracts are deployed.
    pub fn is_empty(&self) -> bool {
        self.contracts.read().is_empty()
    }
}

/// Checks whether an address has the contract shape: 42 characters with a
/// `0x` prefix.
pub fn is_contract_address(address: &str) -> bool {
    address.len() == ADDRESS_LEN && address.starts_with("0x")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_contract_address_shape() {
        let registry = ContractRegistry::new();
        let contract = registry
            .deploy("alice", ContractType::Simple, "", 1)
            .unwrap();
        assert!(is_contract_address(contract.address()));
        assert!(!is_contract_address("alice"));
        assert!(!is_contract_address("0xshort"));
    }

    #[test]
    fn test_empty_deployer_rejected() {
        let registry = ContractRegistry::new();
        assert!(matches!(
            registry.deploy("", ContractType::Token, "", 1),
            Err(ContractError::EmptyDeployer)
        ));
    }

    #[test]
    fn test_lookup_unknown_address() {
        let registry = ContractRegistry::new();
        assert!(matches!(
            registry.get("0xmissing"),
            Err(ContractError::NotFound(_))
        ));
    }

    #[test]
    fn test_by_deployer_filters() {
        let registry = ContractRegistry::new();
        registry.deploy("alice", ContractType::Simple, "", 1).unwrap();
        registry.deploy("alice", ContractType::Token, "", 2).unwrap();
        registry.deploy("bob", ContractType::Voting, "", 3).unwrap();

        assert_eq!(registry.by_deployer("alice").len(), 2);
        assert_eq!(registry.by_deployer("bob").len(), 1);
        assert_eq!(registry.len(), 3);
    }

    #[test]
    fn test_address_depends_on_block_index() {
        let a = SmartContract::new("alice", ContractType::Simple, "", 1);
        let b = SmartContract::new("alice", ContractType::Simple, "", 2);
        assert_ne!(a.address(), b.address());
    }
}
