//! TCP transport: the peer listener and the outbound peer handle.

use std::sync::Arc;

use quorus_chain::Blockchain;
use quorus_types::{Block, Transaction};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};
use tracing::{debug, info, warn};

use crate::message::{Envelope, MessageKind};
use crate::Result;

/// Applies an incoming envelope to the chain and returns the reply to
/// send back, if any.
///
/// Application failures (invalid peer chains, duplicate blocks, rejected
/// transactions) are logged and swallowed; a misbehaving peer cannot take
/// the node down.
pub fn dispatch(chain: &Blockchain, envelope: Envelope, node_id: &str) -> Option<Envelope> {
    match envelope.kind {
        MessageKind::Blockchain => {
            match serde_json::from_value::<Vec<Block>>(envelope.data) {
                Ok(blocks) => {
                    if let Err(error) = chain.merge(blocks) {
                        warn!(peer = %envelope.from, %error, "rejected peer chain");
                    }
                }
                Err(error) => warn!(peer = %envelope.from, %error, "malformed chain payload"),
            }
            None
        }
        MessageKind::Block => {
            match serde_json::from_value::<Block>(envelope.data) {
                Ok(block) => {
                    if let Err(error) = chain.add_received_block(block) {
                        warn!(peer = %envelope.from, %error, "rejected peer block");
                    }
                }
                Err(error) => warn!(peer = %envelope.from, %error, "malformed block payload"),
            }
            None
        }
        MessageKind::Transaction => {
            match serde_json::from_value::<Transaction>(envelope.data) {
                Ok(tx) => {
                    if let Err(error) = chain.submit_transaction(tx) {
                        warn!(peer = %envelope.from, %error, "rejected peer transaction");
                    }
                }
                Err(error) => warn!(peer = %envelope.from, %error, "malformed transaction payload"),
            }
            None
        }
        MessageKind::Ping => Some(Envelope::pong(node_id)),
        MessageKind::Pong => {
            debug!(peer = %envelope.from, "pong received");
            None
        }
    }
}

/// Binds `addr` and accepts peer connections; see [`serve_on`].
pub async fn serve(addr: &str, chain: Arc<Blockchain>, node_id: String) -> Result<()> {
    let listener = TcpListener::bind(addr).await?;
    serve_on(listener, chain, node_id).await
}

/// Accepts peer connections on a bound listener and dispatches their
/// frames against the chain until the task is dropped.
pub async fn serve_on(
    listener: TcpListener,
    chain: Arc<Blockchain>,
    node_id: String,
) -> Result<()> {
    info!(addr = ?listener.local_addr().ok(), "peer listener started");

    loop {
        let (stream, peer_addr) = listener.accept().await?;
        debug!(%peer_addr, "peer connected");
        let chain = Arc::clone(&chain);
        let node_id = node_id.clone();
        tokio::spawn(async move {
            if let Err(error) = handle_connection(stream, &chain, &node_id).await {
                warn!(%peer_addr, %error, "peer connection closed with error");
            }
        });
    }
}

async fn handle_connection(
    stream: TcpStream,
    chain: &Blockchain,
    node_id: &str,
) -> Result<()> {
    let (reader, mut writer) = stream.into_split();
    let mut lines = BufReader::new(reader).lines();

    while let Some(line) = lines.next_line().await? {
        let envelope = match Envelope::decode(&line) {
            Ok(envelope) => envelope,
            Err(error) => {
                warn!(%error, "dropping malformed frame");
                continue;
            }
        };
        if let Some(reply) = dispatch(chain, envelope, node_id) {
            writer.write_all(reply.encode()?.as_bytes()).await?;
        }
    }
    Ok(())
}

/// An outbound connection to one peer.
pub struct Peer {
    addr: String,
}

impl Peer {
    /// Creates a handle for the peer at `addr`.
    pub fn new(addr: impl Into<String>) -> Self {
        Self { addr: addr.into() }
    }

    /// The peer's address.
    pub fn addr(&self) -> &str {
        &self.addr
    }

    /// Connects and sends one envelope.
    pub async fn send(&self, envelope: &Envelope) -> Result<()> {
        let mut stream = TcpStream::connect(&self.addr).await?;
        stream.write_all(envelope.encode()?.as_bytes()).await?;
        stream.flush().await?;
        Ok(())
    }
}

/// Sends an envelope to every peer, logging and skipping failures.
pub async fn broadcast(peers: &[Peer], envelope: &Envelope) {
    for peer in peers {
        if let Err(error) = peer.send(envelope).await {
            warn!(peer = %peer.addr(), %error, "broadcast failed");
        }
    }
}
