//! Tests for the cross-chain bridge coordinator.

use std::sync::Arc;

use quorus_bridge::{Bridge, BridgeError, BridgeStatus};
use quorus_chain::Blockchain;
use quorus_types::Transaction;

fn funded_bridge() -> Bridge {
    let chain_a = Arc::new(Blockchain::new());
    let chain_b = Arc::new(Blockchain::new());
    chain_a
        .add_block(vec![Transaction::new("", "alice", 100.0)], None)
        .unwrap();

    let bridge = Bridge::new("bridge-1", chain_a, chain_b, "alpha", "beta", 2);
    bridge.add_validator("v1", "addr1", 50.0, 1);
    bridge.add_validator("v2", "addr2", 50.0, 1);
    bridge.add_validator("v3", "addr3", 50.0, 1);
    bridge
}

#[test]
fn test_lock_creates_pending_transfer() {
    let bridge = funded_bridge();
    let transfer = bridge.lock_funds("alice", "bob", 10.0, "QRS").unwrap();

    assert_eq!(transfer.status, BridgeStatus::Pending);
    assert_eq!(transfer.from_chain, "alpha");
    assert_eq!(transfer.to_chain, "beta");
    assert_eq!(transfer.approvals, 0);
    assert_eq!(bridge.pending_count(), 1);

    let events = bridge.events();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].event_type, "lock");
}

#[test]
fn test_lock_enforces_bounds_and_funding() {
    let bridge = funded_bridge();

    assert!(matches!(
        bridge.lock_funds("alice", "bob", 0.01, "QRS"),
        Err(BridgeError::BelowMinimum { .. })
    ));
    assert!(matches!(
        bridge.lock_funds("alice", "bob", 99_999.0, "QRS"),
        Err(BridgeError::AboveMaximum { .. })
    ));
    // 100 coins cannot cover 100 + 1% fee.
    assert!(matches!(
        bridge.lock_funds("alice", "bob", 100.0, "QRS"),
        Err(BridgeError::InsufficientBalance { .. })
    ));
    // A stranger holds nothing on chain A.
    assert!(matches!(
        bridge.lock_funds("mallory", "bob", 10.0, "QRS"),
        Err(BridgeError::InsufficientBalance { .. })
    ));
}

#[test]
fn test_approval_threshold() {
    let bridge = funded_bridge();
    let transfer = bridge.lock_funds("alice", "bob", 10.0, "QRS").unwrap();

    assert_eq!(bridge.approve(&transfer.tx_id, "v1", "sig1").unwrap(), 1);
    assert_eq!(
        bridge.transfer(&transfer.tx_id).unwrap().status,
        BridgeStatus::Pending
    );

    assert_eq!(bridge.approve(&transfer.tx_id, "v2", "sig2").unwrap(), 2);
    assert_eq!(
        bridge.transfer(&transfer.tx_id).unwrap().status,
        BridgeStatus::Approved
    );
}

#[test]
fn test_duplicate_and_unknown_approvals_rejected() {
    let bridge = funded_bridge();
    let transfer = bridge.lock_funds("alice", "bob", 10.0, "QRS").unwrap();

    bridge.approve(&transfer.tx_id, "v1", "sig1").unwrap();
    assert!(matches!(
        bridge.approve(&transfer.tx_id, "v1", "sig1-again"),
        Err(BridgeError::DuplicateApproval(_))
    ));
    assert!(matches!(
        bridge.approve(&transfer.tx_id, "ghost", "sig"),
        Err(BridgeError::UnknownValidator(_))
    ));
    assert!(matches!(
        bridge.approve("missing", "v2", "sig"),
        Err(BridgeError::TransferNotFound(_))
    ));
}

#[test]
fn test_unlock_requires_approval() {
    let bridge = funded_bridge();
    let transfer = bridge.lock_funds("alice", "bob", 10.0, "QRS").unwrap();

    assert!(matches!(
        bridge.unlock_funds(&transfer.tx_id),
        Err(BridgeError::NotApproved(2))
    ));
}

#[test]
fn test_full_transfer_mints_on_destination() {
    let chain_a = Arc::new(Blockchain::new());
    let chain_b = Arc::new(Blockchain::new());
    chain_a
        .add_block(vec![Transaction::new("", "alice", 100.0)], None)
        .unwrap();

    let bridge = Bridge::new("bridge-1", chain_a, Arc::clone(&chain_b), "alpha", "beta", 2);
    bridge.add_validator("v1", "addr1", 50.0, 1);
    bridge.add_validator("v2", "addr2", 50.0, 1);

    let transfer = bridge.lock_funds("alice", "bob", 10.0, "QRS").unwrap();
    bridge.approve(&transfer.tx_id, "v1", "sig1").unwrap();
    bridge.approve(&transfer.tx_id, "v2", "sig2").unwrap();

    let completed = bridge.unlock_funds(&transfer.tx_id).unwrap();
    assert_eq!(completed.status, BridgeStatus::Completed);
    assert!(completed.unlock_tx_hash.is_some());
    assert_eq!(bridge.pending_count(), 0);
    assert_eq!(bridge.completed_count(), 1);

    // The recipient now holds the amount on the destination chain.
    assert_eq!(chain_b.balance("bob"), 10.0);
    assert!(chain_b.is_valid());

    let kinds: Vec<String> = bridge
        .events()
        .iter()
        .map(|event| event.event_type.clone())
        .collect();
    assert_eq!(kinds, ["lock", "approval", "approval", "unlock"]);
}

#[test]
fn test_reverse_transfer_locks_on_chain_b() {
    let chain_a = Arc::new(Blockchain::new());
    let chain_b = Arc::new(Blockchain::new());
    chain_b
        .add_block(vec![Transaction::new("", "carol", 50.0)], None)
        .unwrap();

    let bridge = Bridge::new("bridge-1", Arc::clone(&chain_a), chain_b, "alpha", "beta", 1);
    bridge.add_validator("v1", "addr1", 50.0, 1);

    let transfer = bridge.reverse_transfer("carol", "dave", 5.0, "QRS").unwrap();
    assert_eq!(transfer.from_chain, "beta");
    assert_eq!(transfer.to_chain, "alpha");

    bridge.approve(&transfer.tx_id, "v1", "sig").unwrap();
    bridge.unlock_funds(&transfer.tx_id).unwrap();
    assert_eq!(chain_a.balance("dave"), 5.0);
}
