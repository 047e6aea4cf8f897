//! Tests for peer synchronization: chain merge and single-block admission.

use quorus_chain::{Blockchain, ChainError, MergeOutcome};
use quorus_types::Transaction;

/// Extends a chain with `n` coinbase blocks.
fn grow(chain: &Blockchain, n: usize, tag: &str) {
    for i in 0..n {
        chain
            .add_block(vec![Transaction::new("", format!("{tag}{i}"), 1.0)], None)
            .unwrap();
    }
}

#[test]
fn test_longer_peer_chain_replaces_local() {
    // S4: local length 3, peer length 5 -> replaced wholesale.
    let local = Blockchain::new();
    grow(&local, 2, "local");

    let peer = Blockchain::new();
    grow(&peer, 4, "peer");

    let outcome = local.merge(peer.blocks()).unwrap();
    assert_eq!(
        outcome,
        MergeOutcome::Replaced {
            old_len: 3,
            new_len: 5
        }
    );
    assert_eq!(local.len(), 5);
    assert_eq!(local.tail().hash, peer.tail().hash);
    assert!(local.is_valid());
}

#[test]
fn test_equal_length_keeps_local() {
    let local = Blockchain::new();
    grow(&local, 2, "local");
    let peer = Blockchain::new();
    grow(&peer, 2, "peer");

    let before = local.tail().hash;
    assert_eq!(local.merge(peer.blocks()).unwrap(), MergeOutcome::KeptLocal);
    assert_eq!(local.tail().hash, before);
}

#[test]
fn test_shorter_peer_chain_kept_out() {
    let local = Blockchain::new();
    grow(&local, 3, "local");
    let peer = Blockchain::new();

    assert_eq!(local.merge(peer.blocks()).unwrap(), MergeOutcome::KeptLocal);
    assert_eq!(local.len(), 4);
}

#[test]
fn test_merge_never_decreases_length() {
    let local = Blockchain::new();
    grow(&local, 1, "local");
    let peer = Blockchain::new();
    grow(&peer, 3, "peer");

    let before = local.len();
    let _ = local.merge(peer.blocks());
    assert!(local.len() >= before);
}

#[test]
fn test_empty_peer_chain_rejected() {
    let local = Blockchain::new();
    assert!(matches!(
        local.merge(Vec::new()),
        Err(ChainError::EmptyPeerChain)
    ));
}

#[test]
fn test_tampered_amount_fails_merkle_check() {
    // S3, first half: a rewritten amount without a recomputed Merkle root.
    let peer = Blockchain::new();
    grow(&peer, 4, "peer");

    let mut blocks = peer.blocks();
    blocks[2].transactions[0].amount = 9_999.0;

    let local = Blockchain::new();
    let err = local.merge(blocks).unwrap_err();
    let ChainError::InvalidBlock { index: 2, fault } = err else {
        panic!("expected invalid block #2, got {err}");
    };
    assert_eq!(fault.to_string(), "merkle_root mismatch");
}

#[test]
fn test_tampered_amount_with_recomputed_root_fails_pow() {
    // S3, second half: Merkle root and hash recomputed but not re-mined.
    let peer = Blockchain::new();
    grow(&peer, 4, "peer");

    let mut blocks = peer.blocks();
    blocks[2].transactions[0].amount = 9_999.0;
    blocks[2].merkle_root = blocks[2].recompute_merkle_root();
    blocks[2].seal();
    // Re-link the successor so the failure isolates to proof-of-work.
    blocks[3].previous_hash = blocks[2].hash.clone();
    blocks[3].seal();

    let local = Blockchain::new();
    let err = local.merge(blocks).unwrap_err();
    let ChainError::InvalidBlock { index, fault } = err else {
        panic!("expected invalid block, got {err}");
    };
    assert_eq!(index, 2);
    assert_eq!(fault.to_string(), "PoW invalid");
}

#[test]
fn test_malformed_genesis_rejected() {
    let peer = Blockchain::new();
    grow(&peer, 2, "peer");

    let mut blocks = peer.blocks();
    blocks[0].previous_hash = "1".to_string();

    let local = Blockchain::new();
    assert!(matches!(
        local.merge(blocks),
        Err(ChainError::InvalidBlock { index: 0, .. })
    ));
}

#[test]
fn test_received_duplicate_is_rejected_non_fatally() {
    let source = Blockchain::new();
    let produced = source
        .add_block(vec![Transaction::new("", "peer-account", 3.0)], None)
        .unwrap();

    // The same hash at the same index is a duplicate, not a fault.
    assert!(matches!(
        source.add_received_block(produced),
        Err(ChainError::DuplicateBlock { .. })
    ));
    assert_eq!(source.len(), 2);
    assert!(source.is_valid());
}

#[test]
fn test_received_block_admission_and_eviction() {
    // Two replicas sharing history: one produces, the other admits.
    let producer = Blockchain::new();
    grow(&producer, 1, "seed"); // funds seed0
    let replica = Blockchain::new();
    replica.merge(producer.blocks()).unwrap();
    assert_eq!(replica.tail().hash, producer.tail().hash);

    let tx = Transaction::new("seed0", "recipient", 0.5);
    replica.mempool().add(tx.clone()).unwrap();

    let block = producer.add_block(vec![tx], None).unwrap();
    replica.add_received_block(block).unwrap();

    assert_eq!(replica.len(), producer.len());
    assert_eq!(replica.mempool().size(), 0);
    assert!(replica.is_valid());
}

#[test]
fn test_received_block_rejects_gaps_and_forks() {
    let producer = Blockchain::new();
    let replica = Blockchain::new();
    grow(&producer, 1, "seed");
    replica.merge(producer.blocks()).unwrap();

    // Skip one block on the producer; the next one no longer follows the
    // replica's tail.
    grow(&producer, 1, "skip");
    let gap_block = producer
        .add_block(vec![Transaction::new("", "late", 1.0)], None)
        .unwrap();

    assert!(matches!(
        replica.add_received_block(gap_block),
        Err(ChainError::InvalidBlock { .. })
    ));
}
