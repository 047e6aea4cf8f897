//! The two-party payment channel state machine.

use std::time::Duration;

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use quorus_types::sha256_hex;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::{ChannelError, Result};

// Balance sums are compared at this tolerance; channel amounts are plain
// f64 coins and updates must conserve the deposit total exactly at the
// 1e-9 scale.
const BALANCE_TOLERANCE: f64 = 1e-9;

/// A snapshot of channel balances at one sequence number.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChannelState {
    /// Channel identifier
    pub channel_id: String,
    /// First participant
    pub participant1: String,
    /// Second participant
    pub participant2: String,
    /// First participant's balance
    pub balance1: f64,
    /// Second participant's balance
    pub balance2: f64,
    /// Monotonically increasing update counter
    pub sequence_number: u64,
    /// Replay-protection nonce, advanced with the sequence
    pub nonce: u64,
    /// State creation time
    pub timestamp: DateTime<Utc>,
    /// Whether the channel is closed
    pub is_closed: bool,
    /// Hash of the settlement transaction once closed
    #[serde(skip_serializing_if = "Option::is_none")]
    pub closing_tx_hash: Option<String>,
}

impl ChannelState {
    /// Total coins held in the channel at this state.
    pub fn total(&self) -> f64 {
        self.balance1 + self.balance2
    }
}

/// A channel state carrying both participants' signatures.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChannelSignature {
    /// The signed state
    pub state: ChannelState,
    /// Signature from participant1
    pub signature1: String,
    /// Signature from participant2
    pub signature2: String,
}

#[derive(Debug)]
struct ChannelInner {
    state: ChannelState,
    pending: Vec<ChannelState>,
    history: Vec<ChannelState>,
    last_update: DateTime<Utc>,
}

/// A two-party payment channel.
#[derive(Debug)]
pub struct PaymentChannel {
    initial_state: ChannelState,
    deposit_total: f64,
    multisig_address: String,
    timeout: Duration,
    created_at: DateTime<Utc>,
    inner: RwLock<ChannelInner>,
}

impl PaymentChannel {
    pub(crate) fn open(initial_state: ChannelState, timeout: Duration) -> Self {
        let multisig_address = multisig_address(
            &initial_state.participant1,
            &initial_state.participant2,
            &initial_state.channel_id,
        );
        let deposit_total = initial_state.total();
        Self {
            multisig_address,
            deposit_total,
            timeout,
            created_at: Utc::now(),
            inner: RwLock::new(ChannelInner {
                state: initial_state.clone(),
                pending: Vec::new(),
                history: vec![initial_state.clone()],
                last_update: Utc::now(),
            }),
            initial_state,
        }
    }

    /// The channel identifier.
    pub fn channel_id(&self) -> &str {
        &self.initial_state.channel_id
    }

    /// The derived multisig funding address.
    pub fn multisig_address(&self) -> &str {
        &self.multisig_address
    }

    /// Sum of both deposits; conserved across every committed state.
    pub fn deposit_total(&self) -> f64 {
        self.deposit_total
    }

    /// The configured dispute timeout.
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Channel creation time.
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// The latest committed state.
    pub fn state(&self) -> ChannelState {
        self.inner.read().state.clone()
    }

    /// Whether the channel has been closed.
    pub fn is_closed(&self) -> bool {
        self.inner.read().state.is_closed
    }

    /// Number of committed updates (the initial state excluded).
    pub fn update_count(&self) -> usize {
        self.inner.read().history.len() - 1
    }

    /// Proposed states still waiting for signatures and a commit.
    pub fn pending_updates(&self) -> Vec<ChannelState> {
        self.inner.read().pending.clone()
    }

    /// Time of the last committed update.
    pub fn last_update(&self) -> DateTime<Utc> {
        self.inner.read().last_update
    }

    /// Proposes the next state with explicit balances.
    ///
    /// The proposal advances sequence and nonce by one and conserves the
    /// deposit total; it is queued as pending until committed with both
    /// signatures.
    pub fn update_state(&self, balance1: f64, balance2: f64) -> Result<ChannelState> {
        let mut inner = self.inner.write();
        if inner.state.is_closed {
            return Err(ChannelError::Closed);
        }

        let expected = inner.state.total();
        let actual = balance1 + balance2;
        if (actual - expected).abs() > BALANCE_TOLERANCE {
            return Err(ChannelError::BalanceMismatch { expected, actual });
        }
        if balance1 < 0.0 || balance2 < 0.0 {
            return Err(ChannelError::NegativeBalance);
        }

        let proposal = ChannelState {
            balance1,
            balance2,
            sequence_number: inner.state.sequence_number + 1,
            nonce: inner.state.nonce + 1,
            timestamp: Utc::now(),
            is_closed: false,
            closing_tx_hash: None,
            ..inner.state.clone()
        };
        inner.pending.push(proposal.clone());
        debug!(
            channel = %proposal.channel_id,
            sequence = proposal.sequence_number,
            "channel update proposed"
        );
        Ok(proposal)
    }

    /// Derives the next state for a one-directional payment of `amount`
    /// from `sender`. The proposal still needs signatures and a commit.
    pub fn micropayment(&self, sender: &str, amount: f64) -> Result<ChannelState> {
        let current = self.state();
        if current.is_closed {
            return Err(ChannelError::Closed);
        }

        let (balance1, balance2) = if sender == current.participant1 {
            if current.balance1 < amount {
                return Err(ChannelError::InsufficientChannelBalance {
                    have: current.balance1,
                    need: amount,
                });
            }
            (current.balance1 - amount, current.balance2 + amount)
        } else if sender == current.participant2 {
            if current.balance2 < amount {
                return Err(ChannelError::InsufficientChannelBalance {
                    have: current.balance2,
                    need: amount,
                });
            }
            (current.balance1 + amount, current.balance2 - amount)
        } else {
            return Err(ChannelError::NotParticipant(sender.to_string()));
        };

        self.update_state(balance1, balance2)
    }

    /// Produces a participant's signature over a state.
    ///
    /// The signature is a SHA-256 digest binding the channel id, both
    /// balances, the sequence number, and the signer.
    pub fn sign_state(&self, state: &ChannelState, signer: &str) -> Result<String> {
        if signer != state.participant1 && signer != state.participant2 {
            return Err(ChannelError::NotParticipant(signer.to_string()));
        }
        Ok(sign_channel_state(state, signer))
    }

    /// Commits a dually signed state, replacing the current one.
    pub fn commit_state(&self, signed: &ChannelSignature) -> Result<()> {
        let mut inner = self.inner.write();
        if inner.state.is_closed {
            return Err(ChannelError::Closed);
        }
        if signed.signature1.is_empty() || signed.signature2.is_empty() {
            return Err(ChannelError::MissingSignature);
        }
        if signed.state.sequence_number <= inner.state.sequence_number {
            return Err(ChannelError::StaleSequence {
                current: inner.state.sequence_number,
                proposed: signed.state.sequence_number,
            });
        }

        inner.state = signed.state.clone();
        inner.history.push(signed.state.clone());
        inner.pending.clear();
        inner.last_update = Utc::now();
        debug!(
            channel = %signed.state.channel_id,
            sequence = signed.state.sequence_number,
            "channel state committed"
        );
        Ok(())
    }

    /// Closes the channel at the latest committed state and records the
    /// derived settlement transaction hash.
    pub fn close(&self, final_state: &ChannelSignature) -> Result<ChannelState> {
        let mut inner = self.inner.write();
        if inner.state.is_closed {
            return Err(ChannelError::Closed);
        }
        if final_state.state.sequence_number != inner.state.sequence_number {
            return Err(ChannelError::FinalSequenceMismatch {
                expected: inner.state.sequence_number,
                actual: final_state.state.sequence_number,
            });
        }

        let mut closing = final_state.state.clone();
        closing.is_closed = true;
        closing.closing_tx_hash = Some(closing_tx_hash(&closing));
        inner.state = closing.clone();
        info!(
            channel = %closing.channel_id,
            sequence = closing.sequence_number,
            "channel closed"
        );
        Ok(closing)
    }

    /// Human-readable channel status.
    pub fn status(&self) -> String {
        let inner = self.inner.read();
        format!(
            "channel: {}, status: {}, balances: {:.2} / {:.2}, updates: {}, sequence: {}",
            inner.state.channel_id,
            if inner.state.is_closed { "closed" } else { "open" },
            inner.state.balance1,
            inner.state.balance2,
            inner.history.len() - 1,
            inner.state.sequence_number,
        )
    }
}

pub(crate) fn channel_id(participant1: &str, participant2: &str) -> String {
    let nanos = Utc::now().timestamp_nanos_opt().unwrap_or_default();
    sha256_hex(format!("{participant1}:{participant2}:{nanos}").as_bytes())
}

fn multisig_address(participant1: &str, participant2: &str, channel_id: &str) -> String {
    let digest =
        sha256_hex(format!("multisig:{participant1}:{participant2}:{channel_id}").as_bytes());
    format!("M{}", &digest[..40])
}

fn sign_channel_state(state: &ChannelState, signer: &str) -> String {
    let data = format!(
        "{}:{:.2}:{:.2}:{}:{}",
        state.channel_id, state.balance1, state.balance2, state.sequence_number, signer
    );
    sha256_hex(data.as_bytes())
}

fn closing_tx_hash(state: &ChannelState) -> String {
    let data = format!(
        "closing:{}:{:.2}:{:.2}:{}",
        state.channel_id, state.balance1, state.balance2, state.sequence_number
    );
    sha256_hex(data.as_bytes())
}
