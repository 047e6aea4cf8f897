//! The cross-chain bridge coordinator.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use quorus_chain::Blockchain;
use quorus_types::{sha256_hex, Transaction};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::{BridgeError, Result};

/// Direction of a cross-chain transfer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BridgeDirection {
    /// Chain A to chain B
    AToB,
    /// Chain B to chain A
    BToA,
}

/// Lifecycle of a bridge transfer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BridgeStatus {
    /// Waiting for validator approvals
    Pending,
    /// Approval threshold reached
    Approved,
    /// Minted on the destination chain
    Completed,
}

/// A bridge validator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Validator {
    /// Validator identifier
    pub id: String,
    /// On-chain address
    pub address: String,
    /// Bonded stake
    pub stake: f64,
    /// Whether the validator participates in approvals
    pub is_active: bool,
    /// Weight carried by this validator's approval
    pub voting_power: u32,
}

/// A cross-chain transfer record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BridgeTransaction {
    /// Transfer identifier
    pub tx_id: String,
    /// Source chain name
    pub from_chain: String,
    /// Destination chain name
    pub to_chain: String,
    /// Sender on the source chain
    pub from_address: String,
    /// Recipient on the destination chain
    pub to_address: String,
    /// Transferred amount (fee excluded)
    pub amount: f64,
    /// Token symbol
    pub token: String,
    /// Current lifecycle status
    pub status: BridgeStatus,
    /// Transfer direction
    pub direction: BridgeDirection,
    /// Creation time
    pub timestamp: DateTime<Utc>,
    /// Approvals collected so far
    pub approvals: usize,
    /// Approvals required
    pub required_sigs: usize,
    /// Ids of the validators that approved
    pub approved_by: Vec<String>,
    /// Validator signatures collected
    pub signatures: Vec<String>,
    /// Hash recorded when funds were locked on the source chain
    pub lock_tx_hash: String,
    /// Hash recorded when funds were minted on the destination chain
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unlock_tx_hash: Option<String>,
}

/// An entry in the bridge event log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BridgeEvent {
    /// `lock`, `approval`, or `unlock`
    pub event_type: String,
    /// Chain the event refers to
    pub chain: String,
    /// Related transaction hash or transfer id
    pub tx_hash: String,
    /// Event time
    pub timestamp: DateTime<Utc>,
    /// Free-form description
    pub data: String,
}

struct BridgeInner {
    validators: Vec<Validator>,
    pending: HashMap<String, BridgeTransaction>,
    completed: HashMap<String, BridgeTransaction>,
    events: Vec<BridgeEvent>,
}

/// A bridge between two chain instances.
pub struct Bridge {
    bridge_id: String,
    chain_a: Arc<Blockchain>,
    chain_b: Arc<Blockchain>,
    chain_a_name: String,
    chain_b_name: String,
    required_sigs: usize,
    min_amount: f64,
    max_amount: f64,
    fee_rate: f64,
    inner: RwLock<BridgeInner>,
}

impl Bridge {
    /// Default minimum transfer amount.
    pub const MIN_AMOUNT: f64 = 0.1;
    /// Default maximum transfer amount.
    pub const MAX_AMOUNT: f64 = 10_000.0;
    /// Default bridge fee rate (1%).
    pub const FEE_RATE: f64 = 0.01;

    /// Creates a bridge between two chains with an m-of-n approval threshold.
    pub fn new(
        bridge_id: impl Into<String>,
        chain_a: Arc<Blockchain>,
        chain_b: Arc<Blockchain>,
        chain_a_name: impl Into<String>,
        chain_b_name: impl Into<String>,
        required_sigs: usize,
    ) -> Self {
        Self {
            bridge_id: bridge_id.into(),
            chain_a,
            chain_b,
            chain_a_name: chain_a_name.into(),
            chain_b_name: chain_b_name.into(),
            required_sigs,
            min_amount: Self::MIN_AMOUNT,
            max_amount: Self::MAX_AMOUNT,
            fee_rate: Self::FEE_RATE,
            inner: RwLock::new(BridgeInner {
                validators: Vec::new(),
                pending: HashMap::new(),
                completed: HashMap::new(),
                events: Vec::new(),
            }),
        }
    }

    /// The bridge identifier.
    pub fn bridge_id(&self) -> &str {
        &self.bridge_id
    }

    /// Registers an active validator.
    pub fn add_validator(&self, id: &str, address: &str, stake: f64, voting_power: u32) {
        let mut inner = self.inner.write();
        inner.validators.push(Validator {
            id: id.to_string(),
            address: address.to_string(),
            stake,
            is_active: true,
            voting_power,
        });
        info!(bridge = %self.bridge_id, validator = %id, "bridge validator added");
    }

    /// Locks funds on chain A for minting on chain B.
    pub fn lock_funds(
        &self,
        from_address: &str,
        to_address: &str,
        amount: f64,
        token: &str,
    ) -> Result<BridgeTransaction> {
        self.lock(from_address, to_address, amount, token, BridgeDirection::AToB)
    }

    /// Locks funds on chain B for minting on chain A.
    pub fn reverse_transfer(
        &self,
        from_address: &str,
        to_address: &str,
        amount: f64,
        token: &str,
    ) -> Result<BridgeTransaction> {
        self.lock(from_address, to_address, amount, token, BridgeDirection::BToA)
    }

    fn lock(
        &self,
        from_address: &str,
        to_address: &str,
        amount: f64,
        token: &str,
        direction: BridgeDirection,
    ) -> Result<BridgeTransaction> {
        if amount < self.min_amount {
            return Err(BridgeError::BelowMinimum {
                amount,
                minimum: self.min_amount,
            });
        }
        if amount > self.max_amount {
            return Err(BridgeError::AboveMaximum {
                amount,
                maximum: self.max_amount,
            });
        }

        let (source_chain, source_name, dest_name) = match direction {
            BridgeDirection::AToB => (&self.chain_a, &self.chain_a_name, &self.chain_b_name),
            BridgeDirection::BToA => (&self.chain_b, &self.chain_b_name, &self.chain_a_name),
        };

        let fee = amount * self.fee_rate;
        let need = amount + fee;
        let have = source_chain.balance(from_address);
        if have < need {
            return Err(BridgeError::InsufficientBalance {
                chain: source_name.clone(),
                have,
                need,
            });
        }

        let lock_tx_hash = sha256_hex(
            format!(
                "lock:{from_address}:{to_address}:{amount:.8}:{}",
                Utc::now().timestamp_nanos_opt().unwrap_or_default()
            )
            .as_bytes(),
        );
        let tx_id = sha256_hex(format!("{lock_tx_hash}:{source_name}:{dest_name}").as_bytes());

        let transfer = BridgeTransaction {
            tx_id: tx_id.clone(),
            from_chain: source_name.clone(),
            to_chain: dest_name.clone(),
            from_address: from_address.to_string(),
            to_address: to_address.to_string(),
            amount,
            token: token.to_string(),
            status: BridgeStatus::Pending,
            direction,
            timestamp: Utc::now(),
            approvals: 0,
            required_sigs: self.required_sigs,
            approved_by: Vec::new(),
            signatures: Vec::new(),
            lock_tx_hash: lock_tx_hash.clone(),
            unlock_tx_hash: None,
        };

        let mut inner = self.inner.write();
        inner.pending.insert(tx_id.clone(), transfer.clone());
        Self::emit(
            &mut inner,
            "lock",
            source_name,
            &lock_tx_hash,
            format!("{source_name}->{dest_name}: {amount:.4} {token}"),
        );
        info!(bridge = %self.bridge_id, transfer = %tx_id, amount, "funds locked");
        Ok(transfer)
    }

    /// Records a validator approval; reaching the threshold marks the
    /// transfer approved.
    pub fn approve(&self, tx_id: &str, validator_id: &str, signature: &str) -> Result<usize> {
        let mut inner = self.inner.write();

        if !inner
            .validators
            .iter()
            .any(|validator| validator.id == validator_id && validator.is_active)
        {
            return Err(BridgeError::UnknownValidator(validator_id.to_string()));
        }

        let required = self.required_sigs;
        let source_name = self.chain_a_name.clone();
        let transfer = inner
            .pending
            .get_mut(tx_id)
            .ok_or_else(|| BridgeError::TransferNotFound(tx_id.to_string()))?;

        if transfer.approved_by.iter().any(|id| id == validator_id) {
            return Err(BridgeError::DuplicateApproval(validator_id.to_string()));
        }

        transfer.approved_by.push(validator_id.to_string());
        transfer.signatures.push(signature.to_string());
        transfer.approvals += 1;
        let approvals = transfer.approvals;
        if approvals >= required {
            transfer.status = BridgeStatus::Approved;
        }

        Self::emit(
            &mut inner,
            "approval",
            &source_name,
            tx_id,
            format!("validator {validator_id} approved ({approvals}/{required})"),
        );
        Ok(approvals)
    }

    /// Mints an approved transfer on its destination chain and moves it to
    /// the completed set.
    pub fn unlock_funds(&self, tx_id: &str) -> Result<BridgeTransaction> {
        let transfer = {
            let inner = self.inner.read();
            inner
                .pending
                .get(tx_id)
                .cloned()
                .ok_or_else(|| BridgeError::TransferNotFound(tx_id.to_string()))?
        };

        if transfer.status != BridgeStatus::Approved {
            let missing = self.required_sigs.saturating_sub(transfer.approvals);
            return Err(BridgeError::NotApproved(missing));
        }

        let (dest_chain, dest_name) = match transfer.direction {
            BridgeDirection::AToB => (&self.chain_b, &self.chain_b_name),
            BridgeDirection::BToA => (&self.chain_a, &self.chain_a_name),
        };

        // Mint on the destination: a coinbase-style relayer block.
        let mint = Transaction::new("", &transfer.to_address, transfer.amount);
        let block = dest_chain.add_block(vec![mint], None)?;

        let mut completed = transfer.clone();
        completed.status = BridgeStatus::Completed;
        completed.unlock_tx_hash = Some(block.hash.clone());

        let mut inner = self.inner.write();
        inner.pending.remove(tx_id);
        inner.completed.insert(tx_id.to_string(), completed.clone());
        Self::emit(
            &mut inner,
            "unlock",
            dest_name,
            &block.hash,
            format!(
                "minted {:.4} {} to {}",
                completed.amount, completed.token, completed.to_address
            ),
        );
        info!(bridge = %self.bridge_id, transfer = %tx_id, "funds unlocked");
        Ok(completed)
    }

    /// Looks up a transfer in the pending or completed sets.
    pub fn transfer(&self, tx_id: &str) -> Option<BridgeTransaction> {
        let inner = self.inner.read();
        inner
            .pending
            .get(tx_id)
            .or_else(|| inner.completed.get(tx_id))
            .cloned()
    }

    /// Number of transfers awaiting approval or unlock.
    pub fn pending_count(&self) -> usize {
        self.inner.read().pending.len()
    }

    /// Number of completed transfers.
    pub fn completed_count(&self) -> usize {
        self.inner.read().completed.len()
    }

    /// Snapshot of the event log.
    pub fn events(&self) -> Vec<BridgeEvent> {
        self.inner.read().events.clone()
    }

    fn emit(inner: &mut BridgeInner, event_type: &str, chain: &str, tx_hash: &str, data: String) {
        inner.events.push(BridgeEvent {
            event_type: event_type.to_string(),
            chain: chain.to_string(),
            tx_hash: tx_hash.to_string(),
            timestamp: Utc::now(),
            data,
        });
    }
}
