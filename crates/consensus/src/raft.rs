//! Raft: leader election and replicated-log block commitment.
//!
//! Each node is follower, candidate, or leader. A follower whose election
//! timer (uniform in [150, 300) ms) expires becomes a candidate, votes for
//! itself, and solicits votes; a strict majority makes it leader. The
//! leader appends blocks as log entries, replicates them with
//! `AppendEntries`, and advances its commit index once a majority of
//! match indices cover an entry from the current term. Committed entries
//! are applied to the chain in index order, deduplicated by block hash.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use parking_lot::RwLock;
use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::{BlockSink, ConsensusError, Result};
use quorus_types::Block;

/// Interval between leader heartbeats.
pub const HEARTBEAT_INTERVAL: Duration = Duration::from_millis(50);

/// Lower bound of the randomized election timeout, in milliseconds.
pub const ELECTION_TIMEOUT_MIN_MS: u64 = 150;

/// Upper bound (exclusive) of the randomized election timeout, in milliseconds.
pub const ELECTION_TIMEOUT_MAX_MS: u64 = 300;

/// The role a Raft node currently plays.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RaftRole {
    /// Passive replica applying the leader's log
    Follower,
    /// Election in progress
    Candidate,
    /// Accepts blocks and replicates the log
    Leader,
}

impl std::fmt::Display for RaftRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Follower => "follower",
            Self::Candidate => "candidate",
            Self::Leader => "leader",
        };
        f.write_str(name)
    }
}

/// A replicated log entry carrying one block.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogEntry {
    /// 1-based log index
    pub index: u64,
    /// Term in which the entry was created
    pub term: u64,
    /// The block to apply
    pub block: Block,
}

/// A candidate's vote solicitation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RequestVote {
    /// Candidate's term
    pub term: u64,
    /// Candidate node id
    pub candidate_id: String,
    /// Index of the candidate's last log entry
    pub last_log_index: u64,
    /// Term of the candidate's last log entry
    pub last_log_term: u64,
}

/// A reply to [`RequestVote`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VoteResponse {
    /// Responder's current term
    pub term: u64,
    /// Responder node id
    pub from: String,
    /// Whether the vote was granted
    pub granted: bool,
}

/// Log replication / heartbeat message from the leader.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppendEntries {
    /// Leader's term
    pub term: u64,
    /// Leader node id
    pub leader_id: String,
    /// Index of the entry immediately preceding `entries`
    pub prev_log_index: u64,
    /// Term of the entry at `prev_log_index`
    pub prev_log_term: u64,
    /// Entries to append; empty for heartbeats
    pub entries: Vec<LogEntry>,
    /// Leader's commit index
    pub leader_commit: u64,
}

/// A reply to [`AppendEntries`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppendResponse {
    /// Responder's current term
    pub term: u64,
    /// Responder node id
    pub from: String,
    /// Whether the entries were accepted
    pub success: bool,
    /// The responder's last log index after the append (for leader bookkeeping)
    pub last_log_index: u64,
}

#[derive(Debug)]
struct RaftInner {
    role: RaftRole,
    current_term: u64,
    voted_for: Option<String>,
    votes_received: usize,
    log: Vec<LogEntry>,
    commit_index: u64,
    last_applied: u64,
    leader_id: Option<String>,
    // Leader bookkeeping, keyed by peer id
    next_index: HashMap<String, u64>,
    match_index: HashMap<String, u64>,
    election_timeout: Duration,
    last_heartbeat: Instant,
}

impl RaftInner {
    fn last_log_index(&self) -> u64 {
        self.log.len() as u64
    }

    fn last_log_term(&self) -> u64 {
        self.log.last().map(|e| e.term).unwrap_or(0)
    }

    fn step_down(&mut self, term: u64) {
        self.current_term = term;
        self.role = RaftRole::Follower;
        self.voted_for = None;
        self.votes_received = 0;
    }
}

/// A node in the Raft consensus group.
///
/// `nodes` is the full ordered group membership, this node included;
/// majority is computed over it.
#[derive(Debug)]
pub struct RaftNode {
    id: String,
    nodes: Vec<String>,
    inner: RwLock<RaftInner>,
}

impl RaftNode {
    /// Creates a follower with a fresh randomized election timeout.
    pub fn new(id: impl Into<String>, nodes: Vec<String>) -> Self {
        let timeout_ms = rand::thread_rng()
            .gen_range(ELECTION_TIMEOUT_MIN_MS..ELECTION_TIMEOUT_MAX_MS);
        Self {
            id: id.into(),
            nodes,
            inner: RwLock::new(RaftInner {
                role: RaftRole::Follower,
                current_term: 0,
                voted_for: None,
                votes_received: 0,
                log: Vec::new(),
                commit_index: 0,
                last_applied: 0,
                leader_id: None,
                next_index: HashMap::new(),
                match_index: HashMap::new(),
                election_timeout: Duration::from_millis(timeout_ms),
                last_heartbeat: Instant::now(),
            }),
        }
    }

    /// This node's id.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Votes needed for a strict majority of the group.
    pub fn majority(&self) -> usize {
        self.nodes.len() / 2 + 1
    }

    /// Current role.
    pub fn role(&self) -> RaftRole {
        self.inner.read().role
    }

    /// Checks whether this node is the leader.
    pub fn is_leader(&self) -> bool {
        self.role() == RaftRole::Leader
    }

    /// Current term.
    pub fn current_term(&self) -> u64 {
        self.inner.read().current_term
    }

    /// The known leader, if any.
    pub fn leader_id(&self) -> Option<String> {
        self.inner.read().leader_id.clone()
    }

    /// Index of the highest committed entry.
    pub fn commit_index(&self) -> u64 {
        self.inner.read().commit_index
    }

    /// Length of the replicated log.
    pub fn log_len(&self) -> usize {
        self.inner.read().log.len()
    }

    /// Checks whether the election timer has expired (never for leaders).
    pub fn election_timed_out(&self) -> bool {
        let inner = self.inner.read();
        inner.role != RaftRole::Leader && inner.last_heartbeat.elapsed() > inner.election_timeout
    }

    /// Becomes a candidate and produces the vote solicitation to broadcast.
    pub fn start_election(&self) -> RequestVote {
        let mut inner = self.inner.write();
        inner.role = RaftRole::Candidate;
        inner.current_term += 1;
        inner.voted_for = Some(self.id.clone());
        inner.votes_received = 1; // own vote

        info!(node = %self.id, term = inner.current_term, "starting election");
        RequestVote {
            term: inner.current_term,
            candidate_id: self.id.clone(),
            last_log_index: inner.last_log_index(),
            last_log_term: inner.last_log_term(),
        }
    }

    /// Decides a vote for a candidate.
    ///
    /// Grants iff the candidate's term is current, this node has not yet
    /// voted for someone else this term, and the candidate's log is at
    /// least as up-to-date by the log-completeness rule.
    pub fn handle_request_vote(&self, msg: &RequestVote) -> VoteResponse {
        let mut inner = self.inner.write();

        if msg.term > inner.current_term {
            inner.step_down(msg.term);
        }

        let mut granted = false;
        if msg.term == inner.current_term {
            let free_to_vote = match &inner.voted_for {
                None => true,
                Some(candidate) => candidate == &msg.candidate_id,
            };
            let log_ok = msg.last_log_term > inner.last_log_term()
                || (msg.last_log_term == inner.last_log_term()
                    && msg.last_log_index >= inner.last_log_index());

            if free_to_vote && log_ok {
                granted = true;
                inner.voted_for = Some(msg.candidate_id.clone());
                inner.last_heartbeat = Instant::now();
            }
        }

        VoteResponse {
            term: inner.current_term,
            from: self.id.clone(),
            granted,
        }
    }

    /// Tallies a vote response; returns `true` when this node just became leader.
    pub fn handle_vote_response(&self, msg: &VoteResponse) -> bool {
        let mut inner = self.inner.write();

        if msg.term > inner.current_term {
            inner.step_down(msg.term);
            return false;
        }
        if msg.term < inner.current_term || inner.role != RaftRole::Candidate || !msg.granted {
            return false;
        }

        inner.votes_received += 1;
        if inner.votes_received >= self.majority() {
            self.become_leader(&mut inner);
            return true;
        }
        false
    }

    fn become_leader(&self, inner: &mut RaftInner) {
        inner.role = RaftRole::Leader;
        inner.leader_id = Some(self.id.clone());

        let next = inner.last_log_index() + 1;
        inner.next_index = self
            .nodes
            .iter()
            .map(|peer| (peer.clone(), next))
            .collect();
        inner.match_index = self.nodes.iter().map(|peer| (peer.clone(), 0)).collect();

        info!(node = %self.id, term = inner.current_term, "became leader");
    }

    /// Appends a block to the leader's log and produces the replication
    /// message to broadcast.
    pub fn append_block(&self, block: Block) -> Result<AppendEntries> {
        let mut inner = self.inner.write();
        if inner.role != RaftRole::Leader {
            return Err(ConsensusError::NotLeader("replicate log entries"));
        }

        let prev_log_index = inner.last_log_index();
        let prev_log_term = inner.last_log_term();
        let entry = LogEntry {
            index: prev_log_index + 1,
            term: inner.current_term,
            block,
        };
        inner.log.push(entry.clone());

        debug!(node = %self.id, index = entry.index, "appended log entry");
        Ok(AppendEntries {
            term: inner.current_term,
            leader_id: self.id.clone(),
            prev_log_index,
            prev_log_term,
            entries: vec![entry],
            leader_commit: inner.commit_index,
        })
    }

    /// Produces an empty replication message (heartbeat).
    pub fn heartbeat(&self) -> Result<AppendEntries> {
        let inner = self.inner.read();
        if inner.role != RaftRole::Leader {
            return Err(ConsensusError::NotLeader("send heartbeats"));
        }
        Ok(AppendEntries {
            term: inner.current_term,
            leader_id: self.id.clone(),
            prev_log_index: inner.last_log_index(),
            prev_log_term: inner.last_log_term(),
            entries: Vec::new(),
            leader_commit: inner.commit_index,
        })
    }

    /// Follower side of replication.
    ///
    /// Accepts when the terms agree and the previous entry matches;
    /// conflicting suffixes are truncated before the new entries are
    /// appended. Newly committed entries are applied to `sink` in order.
    pub fn handle_append_entries(
        &self,
        msg: &AppendEntries,
        sink: &dyn BlockSink,
    ) -> AppendResponse {
        let mut inner = self.inner.write();

        if msg.term > inner.current_term {
            inner.step_down(msg.term);
        }

        let mut success = false;
        if msg.term == inner.current_term {
            inner.leader_id = Some(msg.leader_id.clone());
            inner.last_heartbeat = Instant::now();
            if inner.role == RaftRole::Candidate {
                inner.role = RaftRole::Follower;
            }

            let prev_matches = msg.prev_log_index == 0
                || inner
                    .log
                    .get(msg.prev_log_index as usize - 1)
                    .is_some_and(|entry| entry.term == msg.prev_log_term);

            if prev_matches {
                success = true;

                for entry in &msg.entries {
                    let slot = entry.index as usize - 1;
                    match inner.log.get(slot).map(|existing| existing.term) {
                        Some(term) if term == entry.term => {}
                        Some(_) => {
                            // Conflict: drop the suffix and take the leader's entry.
                            inner.log.truncate(slot);
                            inner.log.push(entry.clone());
                        }
                        None => inner.log.push(entry.clone()),
                    }
                }

                if msg.leader_commit > inner.commit_index {
                    inner.commit_index = msg.leader_commit.min(inner.last_log_index());
                    Self::apply_committed(&mut inner, sink);
                }
            }
        }

        AppendResponse {
            term: inner.current_term,
            from: self.id.clone(),
            success,
            last_log_index: inner.last_log_index(),
        }
    }

    /// Leader side of replication responses.
    ///
    /// Success advances the peer's match/next indices and may advance the
    /// commit index; failure backs the peer's next index off by one for
    /// the retry.
    pub fn handle_append_response(&self, msg: &AppendResponse, sink: &dyn BlockSink) {
        let mut inner = self.inner.write();

        if msg.term > inner.current_term {
            inner.step_down(msg.term);
            return;
        }
        if inner.role != RaftRole::Leader || msg.term < inner.current_term {
            return;
        }

        if msg.success {
            inner.match_index.insert(msg.from.clone(), msg.last_log_index);
            inner
                .next_index
                .insert(msg.from.clone(), msg.last_log_index + 1);
            self.advance_commit_index(&mut inner, sink);
        } else if let Some(next) = inner.next_index.get_mut(&msg.from) {
            if *next > 1 {
                *next -= 1;
            }
        }
    }

    /// Advances `commit_index` to the largest `N` replicated on a majority
    /// with `log[N].term == current_term`, then applies.
    fn advance_commit_index(&self, inner: &mut RaftInner, sink: &dyn BlockSink) {
        let majority = self.majority();
        for n in (inner.commit_index + 1)..=inner.last_log_index() {
            // The leader itself counts towards the majority.
            let replicated = 1 + self
                .nodes
                .iter()
                .filter(|peer| **peer != self.id)
                .filter(|peer| inner.match_index.get(*peer).copied().unwrap_or(0) >= n)
                .count();

            if replicated >= majority && inner.log[n as usize - 1].term == inner.current_term {
                inner.commit_index = n;
                Self::apply_committed(inner, sink);
            }
        }
    }

    fn apply_committed(inner: &mut RaftInner, sink: &dyn BlockSink) {
        while inner.last_applied < inner.commit_index {
            inner.last_applied += 1;
            let entry = &inner.log[inner.last_applied as usize - 1];
            if sink.apply_block(entry.block.clone()) {
                debug!(index = entry.index, block = entry.block.index, "applied committed block");
            }
        }
    }

    /// Human-readable node status.
    pub fn status(&self) -> String {
        let inner = self.inner.read();
        format!(
            "node: {}, role: {}, term: {}, leader: {}, log: {}, commit: {}",
            self.id,
            inner.role,
            inner.current_term,
            inner.leader_id.as_deref().unwrap_or("-"),
            inner.log.len(),
            inner.commit_index,
        )
    }
}
