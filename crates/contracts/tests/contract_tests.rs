//! Tests for the built-in contract templates.

use quorus_contracts::{ContractError, ContractRegistry, ContractType};
use serde_json::json;

fn args(list: &[&str]) -> Vec<String> {
    list.iter().map(|s| s.to_string()).collect()
}

#[test]
fn test_simple_storage_lifecycle() {
    let registry = ContractRegistry::new();
    let contract = registry.deploy("alice", ContractType::Simple, "", 1).unwrap();

    contract.execute("set", &args(&["name", "quorus"]), "alice", 0.0).unwrap();
    assert_eq!(
        contract.execute("get", &args(&["name"]), "anyone", 0.0).unwrap(),
        json!("quorus")
    );
    assert_eq!(
        contract.execute("exists", &args(&["name"]), "anyone", 0.0).unwrap(),
        json!(true)
    );

    contract.execute("delete", &args(&["name"]), "alice", 0.0).unwrap();
    assert!(matches!(
        contract.execute("get", &args(&["name"]), "anyone", 0.0),
        Err(ContractError::KeyNotFound(_))
    ));
    assert_eq!(
        contract.execute("exists", &args(&["name"]), "anyone", 0.0).unwrap(),
        json!(false)
    );
}

#[test]
fn test_simple_storage_arity() {
    let registry = ContractRegistry::new();
    let contract = registry.deploy("alice", ContractType::Simple, "", 1).unwrap();
    assert!(matches!(
        contract.execute("set", &args(&["only-key"]), "alice", 0.0),
        Err(ContractError::MissingArguments { .. })
    ));
}

#[test]
fn test_token_mint_transfer_supply() {
    let registry = ContractRegistry::new();
    let token = registry.deploy("deployer", ContractType::Token, "", 1).unwrap();

    token.execute("mint", &args(&["deployer", "100"]), "deployer", 0.0).unwrap();
    token.execute("transfer", &args(&["eve", "20"]), "deployer", 0.0).unwrap();

    assert_eq!(
        token.execute("balance_of", &args(&["deployer"]), "x", 0.0).unwrap(),
        json!(80.0)
    );
    assert_eq!(
        token.execute("balance_of", &args(&["eve"]), "x", 0.0).unwrap(),
        json!(20.0)
    );
    assert_eq!(
        token.execute("total_supply", &[], "x", 0.0).unwrap(),
        json!(100.0)
    );
}

#[test]
fn test_token_mint_requires_deployer() {
    let registry = ContractRegistry::new();
    let token = registry.deploy("deployer", ContractType::Token, "", 1).unwrap();
    assert!(matches!(
        token.execute("mint", &args(&["mallory", "100"]), "mallory", 0.0),
        Err(ContractError::PermissionDenied(_))
    ));
}

#[test]
fn test_token_transfer_guards() {
    let registry = ContractRegistry::new();
    let token = registry.deploy("deployer", ContractType::Token, "", 1).unwrap();
    token.execute("mint", &args(&["deployer", "10"]), "deployer", 0.0).unwrap();

    assert!(matches!(
        token.execute("transfer", &args(&["eve", "0"]), "deployer", 0.0),
        Err(ContractError::InvalidAmount(_))
    ));
    assert!(matches!(
        token.execute("transfer", &args(&["eve", "-5"]), "deployer", 0.0),
        Err(ContractError::InvalidAmount(_))
    ));
    assert!(matches!(
        token.execute("transfer", &args(&["eve", "11"]), "deployer", 0.0),
        Err(ContractError::InsufficientBalance { .. })
    ));
}

#[test]
fn test_token_burn_reduces_supply() {
    let registry = ContractRegistry::new();
    let token = registry.deploy("deployer", ContractType::Token, "", 1).unwrap();
    token.execute("mint", &args(&["deployer", "50"]), "deployer", 0.0).unwrap();
    token.execute("burn", &args(&["30"]), "deployer", 0.0).unwrap();

    assert_eq!(
        token.execute("total_supply", &[], "x", 0.0).unwrap(),
        json!(20.0)
    );
    assert!(matches!(
        token.execute("burn", &args(&["999"]), "deployer", 0.0),
        Err(ContractError::InsufficientBalance { .. })
    ));
}

#[test]
fn test_escrow_deposit_and_release() {
    let registry = ContractRegistry::new();
    let escrow = registry.deploy("arbiter", ContractType::Escrow, "", 1).unwrap();

    // First call fixes the beneficiary from args.
    escrow.execute("deposit", &args(&["beneficiary"]), "payer", 25.0).unwrap();
    let status = escrow.execute("get_status", &[], "anyone", 0.0).unwrap();
    assert_eq!(status["deposited"], json!(25.0));
    assert_eq!(status["beneficiary"], json!("beneficiary"));
    assert_eq!(status["arbiter"], json!("arbiter"));
    assert_eq!(status["released"], json!(false));

    escrow.execute("release", &[], "arbiter", 0.0).unwrap();
    let status = escrow.execute("get_status", &[], "anyone", 0.0).unwrap();
    assert_eq!(status["released"], json!(true));
    assert_eq!(status["refunded"], json!(false));
}

#[test]
fn test_escrow_guards() {
    let registry = ContractRegistry::new();
    let escrow = registry.deploy("arbiter", ContractType::Escrow, "", 1).unwrap();

    assert!(matches!(
        escrow.execute("deposit", &[], "payer", 0.0),
        Err(ContractError::NonPositiveValue)
    ));
    assert!(matches!(
        escrow.execute("release", &[], "arbiter", 0.0),
        Err(ContractError::NoFunds)
    ));

    escrow.execute("deposit", &[], "payer", 10.0).unwrap();
    assert!(matches!(
        escrow.execute("release", &[], "stranger", 0.0),
        Err(ContractError::PermissionDenied(_))
    ));

    escrow.execute("refund", &[], "arbiter", 0.0).unwrap();
    assert!(matches!(
        escrow.execute("deposit", &[], "payer", 5.0),
        Err(ContractError::AlreadyReleased)
    ));
    let status = escrow.execute("get_status", &[], "anyone", 0.0).unwrap();
    assert_eq!(status["refunded"], json!(true));
}

#[test]
fn test_voting_full_round() {
    let registry = ContractRegistry::new();
    let voting = registry.deploy("chair", ContractType::Voting, "", 1).unwrap();

    voting.execute("propose", &args(&["apples"]), "chair", 0.0).unwrap();
    voting.execute("propose", &args(&["pears"]), "chair", 0.0).unwrap();
    voting.execute("vote", &args(&["apples"]), "v1", 0.0).unwrap();
    voting.execute("vote", &args(&["apples"]), "v2", 0.0).unwrap();
    voting.execute("vote", &args(&["pears"]), "v3", 0.0).unwrap();

    let results = voting.execute("get_results", &[], "anyone", 0.0).unwrap();
    assert_eq!(results["apples"], json!(2));
    assert_eq!(results["pears"], json!(1));

    let winner = voting.execute("get_winner", &[], "anyone", 0.0).unwrap();
    assert_eq!(winner["winner"], json!("apples"));
    assert_eq!(winner["votes"], json!(2));
}

#[test]
fn test_voting_guards() {
    let registry = ContractRegistry::new();
    let voting = registry.deploy("chair", ContractType::Voting, "", 1).unwrap();
    voting.execute("propose", &args(&["apples"]), "chair", 0.0).unwrap();

    assert!(matches!(
        voting.execute("propose", &args(&["apples"]), "chair", 0.0),
        Err(ContractError::DuplicateProposal(_))
    ));
    assert!(matches!(
        voting.execute("vote", &args(&["ghosts"]), "v1", 0.0),
        Err(ContractError::UnknownProposal(_))
    ));

    voting.execute("vote", &args(&["apples"]), "v1", 0.0).unwrap();
    assert!(matches!(
        voting.execute("vote", &args(&["apples"]), "v1", 0.0),
        Err(ContractError::AlreadyVoted)
    ));

    assert!(matches!(
        voting.execute("end_voting", &[], "not-chair", 0.0),
        Err(ContractError::PermissionDenied(_))
    ));
    voting.execute("end_voting", &[], "chair", 0.0).unwrap();
    assert!(matches!(
        voting.execute("vote", &args(&["apples"]), "v2", 0.0),
        Err(ContractError::VotingEnded)
    ));
    assert!(matches!(
        voting.execute("propose", &args(&["late"]), "chair", 0.0),
        Err(ContractError::VotingEnded)
    ));
}

#[test]
fn test_unknown_function_rejected() {
    let registry = ContractRegistry::new();
    let contract = registry.deploy("alice", ContractType::Simple, "", 1).unwrap();
    assert!(matches!(
        contract.execute("selfdestruct", &[], "alice", 0.0),
        Err(ContractError::UnknownFunction(_))
    ));
}

#[test]
fn test_state_snapshot_shape() {
    let registry = ContractRegistry::new();
    let token = registry.deploy("deployer", ContractType::Token, "", 1).unwrap();
    token.execute("mint", &args(&["deployer", "5"]), "deployer", 0.0).unwrap();

    let snapshot = token.state_json();
    assert_eq!(snapshot["Token"]["total_supply"], json!(5.0));
}
