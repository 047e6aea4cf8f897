//! Node wiring: chain + RPC server + peer listener + miner loop.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use quorus_chain::{Blockchain, ChainError};
use quorus_p2p::{broadcast, Envelope, Peer};
use quorus_rpc::{RpcServer, RpcServerConfig};
use tracing::{info, warn};

/// Node runtime configuration.
#[derive(Debug, Clone)]
pub struct NodeConfig {
    /// JSON-RPC HTTP listen address
    pub rpc_addr: String,
    /// Peer transport listen address
    pub p2p_addr: String,
    /// Peers to announce produced blocks to
    pub peers: Vec<String>,
    /// Mine to this address when set
    pub miner: Option<String>,
    /// Seconds between mining attempts
    pub mine_interval_secs: u64,
}

/// A running Quorus node.
pub struct Node {
    config: NodeConfig,
    chain: Arc<Blockchain>,
}

impl Node {
    /// Creates a node with a fresh chain.
    pub fn new(config: NodeConfig) -> Self {
        Self {
            config,
            chain: Arc::new(Blockchain::new()),
        }
    }

    /// The node's chain handle.
    pub fn chain(&self) -> Arc<Blockchain> {
        Arc::clone(&self.chain)
    }

    /// Starts the RPC server, the peer listener, and (when configured)
    /// the miner loop, then runs until interrupted.
    pub async fn run(self) -> Result<()> {
        let rpc = RpcServer::new(
            RpcServerConfig {
                listen_addr: self.config.rpc_addr.clone(),
            },
            Arc::clone(&self.chain),
        );
        let rpc_handle = rpc.start().await.context("starting JSON-RPC server")?;

        let p2p_chain = Arc::clone(&self.chain);
        let p2p_addr = self.config.p2p_addr.clone();
        let node_id = format!("quorus-{}", std::process::id());
        let p2p_id = node_id.clone();
        tokio::spawn(async move {
            if let Err(error) = quorus_p2p::serve(&p2p_addr, p2p_chain, p2p_id).await {
                warn!(%error, "peer listener stopped");
            }
        });

        if let Some(miner) = self.config.miner.clone() {
            let chain = Arc::clone(&self.chain);
            let peers: Vec<Peer> = self.config.peers.iter().cloned().map(Peer::new).collect();
            let interval = Duration::from_secs(self.config.mine_interval_secs.max(1));
            tokio::spawn(async move {
                miner_loop(chain, miner, peers, interval, node_id).await;
            });
        }

        info!("node started; press ctrl-c to stop");
        tokio::signal::ctrl_c().await.context("waiting for shutdown")?;
        info!("shutting down");
        rpc_handle.stop().ok();
        Ok(())
    }
}

/// Mines pending transactions on an interval and announces new blocks.
async fn miner_loop(
    chain: Arc<Blockchain>,
    miner: String,
    peers: Vec<Peer>,
    interval: Duration,
    node_id: String,
) {
    let mut ticker = tokio::time::interval(interval);
    loop {
        ticker.tick().await;

        // Mining is a blocking CPU search; keep it off the async runtime.
        let mined = {
            let chain = Arc::clone(&chain);
            let miner = miner.clone();
            tokio::task::spawn_blocking(move || chain.mine_block(&miner)).await
        };

        match mined {
            Ok(Ok(block)) => {
                info!(index = block.index, "mined block");
                match Envelope::block(&block, node_id.clone()) {
                    Ok(envelope) => broadcast(&peers, &envelope).await,
                    Err(error) => warn!(%error, "failed to encode block announcement"),
                }
            }
            Ok(Err(ChainError::EmptyMempool)) => {}
            Ok(Err(error)) => warn!(%error, "mining attempt failed"),
            Err(error) => warn!(%error, "miner task panicked"),
        }
    }
}
