//! Channel manager: opens and tracks payment channels.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use parking_lot::RwLock;
use serde::Serialize;
use tracing::info;

use crate::channel::{channel_id, ChannelState, PaymentChannel};
use crate::{BalanceSource, ChannelError, Result};

/// Aggregate figures over all channels.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChannelStatistics {
    /// Channels ever opened
    pub total_channels: usize,
    /// Channels currently open
    pub open_channels: usize,
    /// Channels closed
    pub closed_channels: usize,
    /// Committed updates across all channels
    pub total_updates: usize,
    /// Sum of all channel deposits
    pub total_volume: f64,
}

/// Opens and tracks payment channels.
///
/// Funding checks read on-chain balances through the [`BalanceSource`]
/// passed at the call site; the manager holds no reference to the chain.
#[derive(Debug, Default)]
pub struct ChannelManager {
    channels: RwLock<HashMap<String, Arc<PaymentChannel>>>,
}

impl ChannelManager {
    /// Creates an empty manager.
    pub fn new() -> Self {
        Self::default()
    }

    /// Opens a channel between two funded participants.
    ///
    /// Both deposits must be strictly positive and covered by the
    /// participants' on-chain balances.
    pub fn create(
        &self,
        balances: &dyn BalanceSource,
        participant1: &str,
        participant2: &str,
        deposit1: f64,
        deposit2: f64,
        timeout: Duration,
    ) -> Result<Arc<PaymentChannel>> {
        if deposit1 <= 0.0 || deposit2 <= 0.0 {
            return Err(ChannelError::NonPositiveDeposit);
        }

        for (participant, deposit) in [(participant1, deposit1), (participant2, deposit2)] {
            let have = balances.balance(participant);
            if have < deposit {
                return Err(ChannelError::InsufficientBalance {
                    participant: participant.to_string(),
                    have,
                    need: deposit,
                });
            }
        }

        let initial_state = ChannelState {
            channel_id: channel_id(participant1, participant2),
            participant1: participant1.to_string(),
            participant2: participant2.to_string(),
            balance1: deposit1,
            balance2: deposit2,
            sequence_number: 0,
            nonce: 0,
            timestamp: Utc::now(),
            is_closed: false,
            closing_tx_hash: None,
        };

        let channel = Arc::new(PaymentChannel::open(initial_state, timeout));
        info!(
            channel = %channel.channel_id(),
            deposit = channel.deposit_total(),
            "payment channel opened"
        );
        self.channels
            .write()
            .insert(channel.channel_id().to_string(), Arc::clone(&channel));
        Ok(channel)
    }

    /// Looks up a channel by id.
    pub fn get(&self, channel_id: &str) -> Result<Arc<PaymentChannel>> {
        self.channels
            .read()
            .get(channel_id)
            .cloned()
            .ok_or_else(|| ChannelError::NotFound(channel_id.to_string()))
    }

    /// Number of tracked channels.
    pub fn len(&self) -> usize {
        self.channels.read().len()
    }

    /// Checks whether no channels are tracked.
    pub fn is_empty(&self) -> bool {
        self.channels.read().is_empty()
    }

    /// Aggregate statistics over all channels.
    pub fn statistics(&self) -> ChannelStatistics {
        let channels = self.channels.read();
        let mut stats = ChannelStatistics {
            total_channels: channels.len(),
            open_channels: 0,
            closed_channels: 0,
            total_updates: 0,
            total_volume: 0.0,
        };
        for channel in channels.values() {
            if channel.is_closed() {
                stats.closed_channels += 1;
            } else {
                stats.open_channels += 1;
            }
            stats.total_updates += channel.update_count();
            stats.total_volume += channel.deposit_total();
        }
        stats
    }
}
