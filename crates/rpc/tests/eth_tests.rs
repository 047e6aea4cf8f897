//! Tests for the eth/web3 RPC handlers.

use std::sync::Arc;

use quorus_chain::Blockchain;
use quorus_rpc::{EthApiImpl, EthApiServer, TxRequest, Web3ApiImpl, Web3ApiServer};
use quorus_types::Transaction;

fn api_with_funded_chain() -> (EthApiImpl, Arc<Blockchain>) {
    let chain = Arc::new(Blockchain::new());
    chain
        .add_block(vec![Transaction::new("", "alice", 2.0)], None)
        .unwrap();
    (EthApiImpl::new(Arc::clone(&chain)), chain)
}

#[tokio::test]
async fn test_block_number_tracks_tail() {
    let (api, chain) = api_with_funded_chain();
    assert_eq!(api.block_number().await.unwrap(), "0x1");

    chain
        .add_block(vec![Transaction::new("", "bob", 1.0)], None)
        .unwrap();
    assert_eq!(api.block_number().await.unwrap(), "0x2");
}

#[tokio::test]
async fn test_get_balance_scales_to_wei() {
    let (api, _chain) = api_with_funded_chain();
    let wei = api.get_balance("alice".into(), None).await.unwrap();
    assert_eq!(wei, format!("0x{:x}", 2_000_000_000_000_000_000u128));

    let broke = api.get_balance("nobody".into(), None).await.unwrap();
    assert_eq!(broke, "0x0");
}

#[tokio::test]
async fn test_get_block_by_number() {
    let (api, chain) = api_with_funded_chain();

    let latest = api
        .get_block_by_number("latest".into(), None)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(latest.number, "0x1");
    assert_eq!(latest.hash, format!("0x{}", chain.tail().hash));
    assert_eq!(latest.transactions.len(), 1);

    let genesis = api
        .get_block_by_number("0x0".into(), None)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(genesis.parent_hash, "0x0");

    // Out of range is null, not an error.
    assert!(api
        .get_block_by_number("0xff".into(), None)
        .await
        .unwrap()
        .is_none());

    // Garbage is a -32000 application error.
    assert!(api.get_block_by_number("zz".into(), None).await.is_err());
}

#[tokio::test]
async fn test_send_transaction_enters_mempool() {
    let (api, chain) = api_with_funded_chain();

    let hash = api
        .send_transaction(TxRequest {
            from: "alice".into(),
            to: "bob".into(),
            value: format!("0x{:x}", 1_000_000_000_000_000_000u128), // 1 coin
            data: None,
        })
        .await
        .unwrap();
    assert!(hash.starts_with("0x"));
    assert_eq!(chain.mempool().size(), 1);
}

#[tokio::test]
async fn test_send_transaction_rejects_overspend() {
    let (api, chain) = api_with_funded_chain();
    let result = api
        .send_transaction(TxRequest {
            from: "alice".into(),
            to: "bob".into(),
            value: format!("0x{:x}", 50_000_000_000_000_000_000u128), // 50 coins
            data: None,
        })
        .await;
    assert!(result.is_err());
    assert_eq!(chain.mempool().size(), 0);
}

#[tokio::test]
async fn test_transaction_count_counts_senders() {
    let (api, chain) = api_with_funded_chain();
    chain
        .add_block(vec![Transaction::new("alice", "bob", 1.0)], None)
        .unwrap();

    assert_eq!(
        api.get_transaction_count("alice".into(), None).await.unwrap(),
        "0x1"
    );
    assert_eq!(
        api.get_transaction_count("bob".into(), None).await.unwrap(),
        "0x0"
    );
}

#[tokio::test]
async fn test_call_is_a_stub() {
    let (api, _chain) = api_with_funded_chain();
    let result = api.call(TxRequest::default(), None).await.unwrap();
    assert_eq!(result, "0x");
}

#[tokio::test]
async fn test_get_code_returns_contract_bytecode() {
    let (api, chain) = api_with_funded_chain();
    let contract = chain
        .deploy_contract("alice", quorus_contracts::ContractType::Simple, "6001600101")
        .unwrap();

    let code = api
        .get_code(contract.address().to_string(), None)
        .await
        .unwrap();
    assert_eq!(code, "0x6001600101");

    let none = api.get_code("alice".into(), None).await.unwrap();
    assert_eq!(none, "0x");
}

#[tokio::test]
async fn test_client_version() {
    let version = Web3ApiImpl.client_version().await.unwrap();
    assert!(version.starts_with("quorus/"));
    assert!(version.ends_with("/rust"));
}
