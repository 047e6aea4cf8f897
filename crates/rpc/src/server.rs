//! HTTP server bootstrap for the RPC surface.

use std::sync::Arc;

use jsonrpsee::server::{ServerBuilder, ServerHandle};
use jsonrpsee::RpcModule;
use quorus_chain::Blockchain;
use tracing::info;

use crate::eth::{EthApiImpl, EthApiServer, Web3ApiImpl, Web3ApiServer};
use crate::{Result, RpcError};

/// RPC server configuration.
#[derive(Debug, Clone)]
pub struct RpcServerConfig {
    /// HTTP listen address
    pub listen_addr: String,
}

impl Default for RpcServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: "127.0.0.1:8545".to_string(),
        }
    }
}

/// The JSON-RPC server over a shared chain.
pub struct RpcServer {
    config: RpcServerConfig,
    chain: Arc<Blockchain>,
}

impl RpcServer {
    /// Creates a server for the given chain.
    pub fn new(config: RpcServerConfig, chain: Arc<Blockchain>) -> Self {
        Self { config, chain }
    }

    /// Merges the `eth` and `web3` namespaces into one module.
    fn build_module(&self) -> Result<RpcModule<()>> {
        let mut module = RpcModule::new(());
        module
            .merge(EthApiImpl::new(Arc::clone(&self.chain)).into_rpc())
            .map_err(|e| RpcError::Server(format!("failed to merge eth API: {e}")))?;
        module
            .merge(Web3ApiImpl.into_rpc())
            .map_err(|e| RpcError::Server(format!("failed to merge web3 API: {e}")))?;
        Ok(module)
    }

    /// Binds the HTTP endpoint and starts serving.
    pub async fn start(&self) -> Result<ServerHandle> {
        let module = self.build_module()?;
        let server = ServerBuilder::default()
            .http_only()
            .build(&self.config.listen_addr)
            .await
            .map_err(|e| RpcError::Server(e.to_string()))?;

        info!(addr = %self.config.listen_addr, "JSON-RPC server started");
        Ok(server.start(module))
    }
}
