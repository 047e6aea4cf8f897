//! Wire types for the JSON-RPC surface.

use quorus_types::{Block, Transaction};
use serde::{Deserialize, Serialize};

/// One coin scales to 10^18 wei on the RPC surface.
pub const WEI_PER_COIN: f64 = 1e18;

/// A block selector: `latest` or a hex quantity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockTag {
    /// The chain tail
    Latest,
    /// An explicit height
    Number(u64),
}

impl BlockTag {
    /// Parses `latest` or a hex quantity (`0x`-prefixed or bare).
    pub fn parse(raw: &str) -> Option<Self> {
        if raw == "latest" {
            return Some(Self::Latest);
        }
        let digits = raw.strip_prefix("0x").unwrap_or(raw);
        u64::from_str_radix(digits, 16).ok().map(Self::Number)
    }
}

/// Formats a quantity as a `0x` hex string.
pub fn quantity(value: u128) -> String {
    format!("0x{value:x}")
}

/// Converts a coin balance to a hex wei quantity.
pub fn to_wei_hex(coins: f64) -> String {
    quantity((coins * WEI_PER_COIN) as u128)
}

/// A transaction as rendered in RPC block responses.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RpcTransaction {
    /// Sender address (empty for coinbase)
    pub from: String,
    /// Recipient address
    pub to: String,
    /// Transferred value in hex wei
    pub value: String,
    /// Canonical transaction hash
    pub hash: String,
}

impl From<&Transaction> for RpcTransaction {
    fn from(tx: &Transaction) -> Self {
        Self {
            from: tx.from.clone(),
            to: tx.to.clone(),
            value: to_wei_hex(tx.amount),
            hash: format!("0x{}", tx.hash_hex()),
        }
    }
}

/// A block as rendered in RPC responses.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RpcBlock {
    /// Block height in hex
    pub number: String,
    /// Block hash
    pub hash: String,
    /// Predecessor hash
    pub parent_hash: String,
    /// Unix timestamp in hex
    pub timestamp: String,
    /// Merkle root of the transaction list
    pub transactions_root: String,
    /// The block's transactions
    pub transactions: Vec<RpcTransaction>,
}

impl From<&Block> for RpcBlock {
    fn from(block: &Block) -> Self {
        Self {
            number: quantity(block.index as u128),
            hash: format!("0x{}", block.hash),
            parent_hash: format!("0x{}", block.previous_hash),
            timestamp: quantity(block.timestamp.timestamp() as u128),
            transactions_root: format!("0x{}", block.merkle_root),
            transactions: block.transactions.iter().map(RpcTransaction::from).collect(),
        }
    }
}

/// An `eth_sendTransaction` request body.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TxRequest {
    /// Sender address
    #[serde(default)]
    pub from: String,
    /// Recipient address
    #[serde(default)]
    pub to: String,
    /// Value in hex wei
    #[serde(default)]
    pub value: String,
    /// Call data (ignored by this surface)
    #[serde(default)]
    pub data: Option<String>,
}
