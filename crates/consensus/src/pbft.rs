//! PBFT: three-phase Byzantine quorum over a candidate block.
//!
//! State machine: `idle → pre-prepare → prepare → commit → finalized`.
//! The primary for view `v` is `nodes[v mod n]`. A group of `n = 3f + 1`
//! nodes tolerates `f` Byzantine replicas; each phase needs `2f + 1`
//! matching messages from distinct nodes. Duplicate prepare/commit from
//! the same node are no-ops.
//!
//! View-change exists in the message taxonomy but no state machine drives
//! it here.

use std::collections::HashSet;
use std::fmt;

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{ConsensusError, Result};
use quorus_types::sha256_hex;

/// PBFT message types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PbftMessageKind {
    /// Primary's block proposal
    PrePrepare,
    /// Replica acknowledgement of the proposal
    Prepare,
    /// Replica commitment after the prepare quorum
    Commit,
    /// View abandonment (taxonomy only; not driven)
    ViewChange,
}

impl fmt::Display for PbftMessageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::PrePrepare => "pre-prepare",
            Self::Prepare => "prepare",
            Self::Commit => "commit",
            Self::ViewChange => "view-change",
        };
        f.write_str(name)
    }
}

/// A PBFT consensus message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PbftMessage {
    /// Message type
    #[serde(rename = "type")]
    pub kind: PbftMessageKind,
    /// Hash of the block under consensus
    pub block_hash: String,
    /// Sender node
    pub node_id: String,
    /// Consensus sequence number
    pub sequence: u64,
    /// View identifier
    pub view: u64,
    /// Send time
    pub timestamp: DateTime<Utc>,
    /// Structural digest binding the message fields
    #[serde(default)]
    pub signature: String,
}

/// Local state of a PBFT instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PbftState {
    /// Waiting for a proposal
    Idle,
    /// Proposal seen; own prepare not yet sent
    PrePrepare,
    /// Own prepare sent; collecting the prepare quorum
    Prepare,
    /// Own commit sent; collecting the commit quorum
    Commit,
    /// Commit quorum reached
    Finalized,
}

impl fmt::Display for PbftState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Idle => "idle",
            Self::PrePrepare => "pre-prepare",
            Self::Prepare => "prepare",
            Self::Commit => "commit",
            Self::Finalized => "finalized",
        };
        f.write_str(name)
    }
}

#[derive(Debug)]
struct PbftInner {
    state: PbftState,
    messages: Vec<PbftMessage>,
    prepare_from: HashSet<String>,
    commit_from: HashSet<String>,
    pre_prepared: bool,
    prepared: bool,
    committed: bool,
}

/// A PBFT consensus instance for one block at one (view, sequence).
#[derive(Debug)]
pub struct Pbft {
    node_id: String,
    nodes: Vec<String>,
    block_hash: String,
    view: u64,
    sequence: u64,
    required_votes: usize,
    inner: RwLock<PbftInner>,
}

impl Pbft {
    /// Creates an instance for `block_hash` at the given sequence, view 0.
    pub fn new(
        node_id: impl Into<String>,
        nodes: Vec<String>,
        block_hash: impl Into<String>,
        sequence: u64,
    ) -> Self {
        let faulty = (nodes.len().saturating_sub(1)) / 3;
        Self {
            node_id: node_id.into(),
            nodes,
            block_hash: block_hash.into(),
            view: 0,
            sequence,
            required_votes: 2 * faulty + 1,
            inner: RwLock::new(PbftInner {
                state: PbftState::Idle,
                messages: Vec::new(),
                prepare_from: HashSet::new(),
                commit_from: HashSet::new(),
                pre_prepared: false,
                prepared: false,
                committed: false,
            }),
        }
    }

    /// The primary node for the current view: `nodes[view mod n]`.
    pub fn primary(&self) -> &str {
        &self.nodes[(self.view as usize) % self.nodes.len()]
    }

    /// Checks whether this node is the primary.
    pub fn is_primary(&self) -> bool {
        self.node_id == self.primary()
    }

    /// Votes required for a quorum (`2f + 1`).
    pub fn required_votes(&self) -> usize {
        self.required_votes
    }

    /// Number of nodes in the group.
    pub fn total_nodes(&self) -> usize {
        self.nodes.len()
    }

    /// Current state.
    pub fn state(&self) -> PbftState {
        self.inner.read().state
    }

    /// Initiates the pre-prepare phase. Primary only, from `idle`.
    pub fn pre_prepare(&self) -> Result<PbftMessage> {
        if !self.is_primary() {
            return Err(ConsensusError::NotPrimary);
        }

        let mut inner = self.inner.write();
        if inner.state != PbftState::Idle {
            return Err(ConsensusError::InvalidState("pre-prepare"));
        }

        let msg = self.message(PbftMessageKind::PrePrepare);
        inner.messages.push(msg.clone());
        inner.state = PbftState::PrePrepare;
        inner.pre_prepared = true;
        debug!(node = %self.node_id, seq = self.sequence, "pre-prepare broadcast");
        Ok(msg)
    }

    /// Accepts a pre-prepare from the current primary.
    pub fn process_pre_prepare(&self, msg: &PbftMessage) -> Result<()> {
        if msg.node_id != self.primary() {
            return Err(ConsensusError::NotFromPrimary);
        }
        self.check_message(msg)?;

        let mut inner = self.inner.write();
        inner.messages.push(msg.clone());
        inner.state = PbftState::PrePrepare;
        inner.pre_prepared = true;
        Ok(())
    }

    /// Broadcasts this node's prepare. Requires a seen pre-prepare.
    pub fn prepare(&self) -> Result<PbftMessage> {
        let mut inner = self.inner.write();
        if !inner.pre_prepared || inner.state != PbftState::PrePrepare {
            return Err(ConsensusError::InvalidState("prepare"));
        }

        let msg = self.message(PbftMessageKind::Prepare);
        inner.messages.push(msg.clone());
        inner.prepare_from.insert(self.node_id.clone());
        inner.state = PbftState::Prepare;
        self.check_prepare_quorum(&mut inner);
        Ok(msg)
    }

    /// Counts a prepare from a peer. Duplicates from the same node are no-ops.
    pub fn process_prepare(&self, msg: &PbftMessage) -> Result<()> {
        self.check_message(msg)?;

        let mut inner = self.inner.write();
        if !inner.prepare_from.insert(msg.node_id.clone()) {
            return Ok(()); // idempotent per (view, sequence, node)
        }
        inner.messages.push(msg.clone());
        self.check_prepare_quorum(&mut inner);
        Ok(())
    }

    /// Broadcasts this node's commit. Requires the prepare quorum.
    pub fn commit(&self) -> Result<PbftMessage> {
        let mut inner = self.inner.write();
        if !inner.prepared {
            return Err(ConsensusError::QuorumNotReached {
                have: inner.prepare_from.len(),
                need: self.required_votes,
            });
        }
        if inner.state != PbftState::Prepare {
            return Err(ConsensusError::InvalidState("commit"));
        }

        let msg = self.message(PbftMessageKind::Commit);
        inner.messages.push(msg.clone());
        inner.commit_from.insert(self.node_id.clone());
        inner.state = PbftState::Commit;
        self.check_commit_quorum(&mut inner);
        Ok(msg)
    }

    /// Counts a commit from a peer. Duplicates from the same node are no-ops.
    pub fn process_commit(&self, msg: &PbftMessage) -> Result<()> {
        self.check_message(msg)?;

        let mut inner = self.inner.write();
        if !inner.commit_from.insert(msg.node_id.clone()) {
            return Ok(());
        }
        inner.messages.push(msg.clone());
        self.check_commit_quorum(&mut inner);
        Ok(())
    }

    /// Checks whether the commit quorum was reached.
    pub fn is_finalized(&self) -> bool {
        let inner = self.inner.read();
        inner.committed && inner.state == PbftState::Finalized
    }

    /// Validates the full run: both quorums reached and finalized.
    pub fn validate(&self) -> bool {
        let inner = self.inner.read();
        inner.prepare_from.len() >= self.required_votes
            && inner.commit_from.len() >= self.required_votes
            && inner.committed
            && inner.state == PbftState::Finalized
    }

    /// Prepare and commit tallies, for reporting.
    pub fn tallies(&self) -> (usize, usize) {
        let inner = self.inner.read();
        (inner.prepare_from.len(), inner.commit_from.len())
    }

    /// Human-readable consensus status.
    pub fn status(&self) -> String {
        let inner = self.inner.read();
        format!(
            "state: {}, prepared: {} ({}/{}), committed: {} ({}/{})",
            inner.state,
            inner.prepared,
            inner.prepare_from.len(),
            self.required_votes,
            inner.committed,
            inner.commit_from.len(),
            self.required_votes,
        )
    }

    fn message(&self, kind: PbftMessageKind) -> PbftMessage {
        PbftMessage {
            kind,
            block_hash: self.block_hash.clone(),
            node_id: self.node_id.clone(),
            sequence: self.sequence,
            view: self.view,
            timestamp: Utc::now(),
            signature: self.sign(kind),
        }
    }

    fn sign(&self, kind: PbftMessageKind) -> String {
        let data = format!(
            "{}:{}:{}:{}:{}",
            kind, self.block_hash, self.node_id, self.sequence, self.view
        );
        sha256_hex(data.as_bytes())
    }

    fn check_message(&self, msg: &PbftMessage) -> Result<()> {
        if msg.sequence != self.sequence {
            return Err(ConsensusError::SequenceMismatch {
                expected: self.sequence,
                actual: msg.sequence,
            });
        }
        if msg.view != self.view {
            return Err(ConsensusError::ViewMismatch {
                expected: self.view,
                actual: msg.view,
            });
        }
        if msg.block_hash != self.block_hash {
            return Err(ConsensusError::BlockHashMismatch);
        }
        Ok(())
    }

    fn check_prepare_quorum(&self, inner: &mut PbftInner) {
        if inner.prepare_from.len() >= self.required_votes {
            inner.prepared = true;
        }
    }

    fn check_commit_quorum(&self, inner: &mut PbftInner) {
        if inner.commit_from.len() >= self.required_votes {
            inner.committed = true;
            inner.state = PbftState::Finalized;
            debug!(node = %self.node_id, seq = self.sequence, "commit quorum reached");
        }
    }
}
