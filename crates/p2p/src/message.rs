//! The peer message envelope.

use chrono::{DateTime, Utc};
use quorus_types::{Block, Transaction};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::Result;

/// Kinds of peer messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageKind {
    /// Full block list for longest-chain sync
    Blockchain,
    /// A single freshly produced block
    Block,
    /// A pending transaction
    Transaction,
    /// Liveness probe
    Ping,
    /// Liveness reply
    Pong,
}

/// A framed peer message: kind, embedded JSON payload, timestamp, sender.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    /// Message kind
    #[serde(rename = "type")]
    pub kind: MessageKind,
    /// Kind-specific payload
    pub data: Value,
    /// Send time
    pub timestamp: DateTime<Utc>,
    /// Sender node id
    pub from: String,
}

impl Envelope {
    /// Wraps a payload in an envelope.
    pub fn new(kind: MessageKind, data: Value, from: impl Into<String>) -> Self {
        Self {
            kind,
            data,
            timestamp: Utc::now(),
            from: from.into(),
        }
    }

    /// A full-chain message.
    pub fn blockchain(blocks: &[Block], from: impl Into<String>) -> Result<Self> {
        Ok(Self::new(
            MessageKind::Blockchain,
            serde_json::to_value(blocks)?,
            from,
        ))
    }

    /// A single-block message.
    pub fn block(block: &Block, from: impl Into<String>) -> Result<Self> {
        Ok(Self::new(MessageKind::Block, serde_json::to_value(block)?, from))
    }

    /// A transaction message.
    pub fn transaction(tx: &Transaction, from: impl Into<String>) -> Result<Self> {
        Ok(Self::new(
            MessageKind::Transaction,
            serde_json::to_value(tx)?,
            from,
        ))
    }

    /// A liveness probe.
    pub fn ping(from: impl Into<String>) -> Self {
        Self::new(MessageKind::Ping, Value::Null, from)
    }

    /// A liveness reply.
    pub fn pong(from: impl Into<String>) -> Self {
        Self::new(MessageKind::Pong, Value::Null, from)
    }

    /// Encodes the envelope as one newline-terminated JSON frame.
    pub fn encode(&self) -> Result<String> {
        let mut frame = serde_json::to_string(self)?;
        frame.push('\n');
        Ok(frame)
    }

    /// Decodes one frame.
    pub fn decode(frame: &str) -> Result<Self> {
        Ok(serde_json::from_str(frame.trim_end())?)
    }
}
