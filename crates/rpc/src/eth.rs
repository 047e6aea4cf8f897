//! Ethereum-compatible RPC method implementations.

use std::sync::Arc;

use jsonrpsee::core::{async_trait, RpcResult};
use jsonrpsee::proc_macros::rpc;
use quorus_chain::Blockchain;
use quorus_types::Transaction;
use tracing::debug;

use crate::app_error;
use crate::types::{quantity, to_wei_hex, BlockTag, RpcBlock, TxRequest, WEI_PER_COIN};

/// The `eth_*` compatibility namespace.
#[rpc(server, namespace = "eth")]
pub trait EthApi {
    /// Returns the latest block number as a hex quantity.
    #[method(name = "blockNumber")]
    async fn block_number(&self) -> RpcResult<String>;

    /// Returns an address balance in hex wei (coins scaled by 10^18).
    #[method(name = "getBalance")]
    async fn get_balance(&self, address: String, block: Option<String>) -> RpcResult<String>;

    /// Returns a block by `latest` or hex height, or null when out of range.
    #[method(name = "getBlockByNumber")]
    async fn get_block_by_number(
        &self,
        block: String,
        full: Option<bool>,
    ) -> RpcResult<Option<RpcBlock>>;

    /// Returns how many transactions an address has sent.
    #[method(name = "getTransactionCount")]
    async fn get_transaction_count(
        &self,
        address: String,
        block: Option<String>,
    ) -> RpcResult<String>;

    /// Builds a transfer from the request and admits it to the mempool.
    #[method(name = "sendTransaction")]
    async fn send_transaction(&self, tx: TxRequest) -> RpcResult<String>;

    /// Contract reads are not exposed over RPC; always returns `0x`.
    #[method(name = "call")]
    async fn call(&self, tx: TxRequest, block: Option<String>) -> RpcResult<String>;

    /// Returns the bytecode at a contract address, `0x` otherwise.
    #[method(name = "getCode")]
    async fn get_code(&self, address: String, block: Option<String>) -> RpcResult<String>;
}

/// The `web3_*` compatibility namespace.
#[rpc(server, namespace = "web3")]
pub trait Web3Api {
    /// Returns the client version string.
    #[method(name = "clientVersion")]
    async fn client_version(&self) -> RpcResult<String>;
}

/// `eth_*` handler over a shared chain.
pub struct EthApiImpl {
    chain: Arc<Blockchain>,
}

impl EthApiImpl {
    /// Creates the handler.
    pub fn new(chain: Arc<Blockchain>) -> Self {
        Self { chain }
    }
}

#[async_trait]
impl EthApiServer for EthApiImpl {
    async fn block_number(&self) -> RpcResult<String> {
        Ok(quantity(self.chain.len() as u128 - 1))
    }

    async fn get_balance(&self, address: String, _block: Option<String>) -> RpcResult<String> {
        Ok(to_wei_hex(self.chain.balance(&address)))
    }

    async fn get_block_by_number(
        &self,
        block: String,
        _full: Option<bool>,
    ) -> RpcResult<Option<RpcBlock>> {
        let tag =
            BlockTag::parse(&block).ok_or_else(|| app_error("invalid block number format"))?;
        let index = match tag {
            BlockTag::Latest => self.chain.len() as u64 - 1,
            BlockTag::Number(index) => index,
        };
        Ok(self.chain.block_at(index).map(|block| RpcBlock::from(&block)))
    }

    async fn get_transaction_count(
        &self,
        address: String,
        _block: Option<String>,
    ) -> RpcResult<String> {
        let address = address.strip_prefix("0x").unwrap_or(&address).to_string();
        let count = self
            .chain
            .blocks()
            .iter()
            .flat_map(|block| block.transactions.iter())
            .filter(|tx| tx.from == address)
            .count();
        Ok(quantity(count as u128))
    }

    async fn send_transaction(&self, tx: TxRequest) -> RpcResult<String> {
        let digits = tx.value.strip_prefix("0x").unwrap_or(&tx.value);
        let wei =
            u128::from_str_radix(digits, 16).map_err(|_| app_error("invalid value format"))?;
        let amount = wei as f64 / WEI_PER_COIN;

        let transfer = Transaction::new(tx.from, tx.to, amount);
        let hash = transfer.hash_hex();
        self.chain
            .submit_transaction(transfer)
            .map_err(|error| app_error(error.to_string()))?;

        debug!(%hash, "transaction admitted over RPC");
        Ok(format!("0x{hash}"))
    }

    async fn call(&self, _tx: TxRequest, _block: Option<String>) -> RpcResult<String> {
        // Stub: contract reads are not supported over RPC.
        Ok("0x".to_string())
    }

    async fn get_code(&self, address: String, _block: Option<String>) -> RpcResult<String> {
        match self.chain.get_contract(&address) {
            Ok(contract) => Ok(format!("0x{}", contract.bytecode())),
            Err(_) => Ok("0x".to_string()),
        }
    }
}

/// `web3_*` handler.
pub struct Web3ApiImpl;

#[async_trait]
impl Web3ApiServer for Web3ApiImpl {
    async fn client_version(&self) -> RpcResult<String> {
        Ok(format!("quorus/v{}/rust", env!("CARGO_PKG_VERSION")))
    }
}
