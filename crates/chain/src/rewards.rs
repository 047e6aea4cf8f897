//! Block-reward synthesis and fee accounting.

use quorus_types::Transaction;

/// Coins minted to the proposer of a regular block.
pub const BLOCK_REWARD: f64 = 50.0;

/// Coins minted to the proposer of the genesis block.
pub const GENESIS_REWARD: f64 = 100.0;

/// Synthesizes the coinbase-style reward transaction for a block proposer.
///
/// Reward transactions carry an empty sender and no signature; balance
/// validation skips them.
pub fn reward_transaction(miner: &str, is_genesis: bool) -> Transaction {
    let reward = if is_genesis { GENESIS_REWARD } else { BLOCK_REWARD };
    Transaction::new("", miner, reward)
}

/// Sums the fees carried by a transaction list.
pub fn total_fees(transactions: &[Transaction]) -> f64 {
    transactions.iter().map(|tx| tx.fee).sum()
}
