//! Proof-of-Stake: stake-weighted deterministic validator selection.
//!
//! Selection is a pure function of the candidate block: the seed
//! `previous_hash ‖ merkle_root` is hashed to a 256-bit integer and reduced
//! uniformly onto `[0, total_stake)` by a widening multiply-and-shift over
//! fixed-point stake units. The stake table iterates in address order, so
//! every node reaches the same winner from the same candidate.

use std::collections::BTreeMap;

use alloy_primitives::U512;
use quorus_types::{sha256, Block};

/// Fixed-point scale for stake amounts (eight fractional digits, matching
/// the canonical amount rendering).
const STAKE_UNIT: f64 = 1e8;

/// A proof-of-stake selector over a stake table.
#[derive(Debug, Clone)]
pub struct ProofOfStake {
    stakeholders: BTreeMap<String, f64>,
}

impl ProofOfStake {
    /// Creates a selector from a stake table.
    ///
    /// Entries with non-positive stake never win and are dropped up front.
    pub fn new(stakeholders: BTreeMap<String, f64>) -> Self {
        let stakeholders = stakeholders
            .into_iter()
            .filter(|(_, stake)| *stake > 0.0)
            .collect();
        Self { stakeholders }
    }

    /// Returns the stake of an address, or 0 when absent.
    pub fn stake_of(&self, address: &str) -> f64 {
        self.stakeholders.get(address).copied().unwrap_or(0.0)
    }

    /// Returns the number of eligible stakeholders.
    pub fn len(&self) -> usize {
        self.stakeholders.len()
    }

    /// Checks whether the stake table is empty.
    pub fn is_empty(&self) -> bool {
        self.stakeholders.is_empty()
    }

    /// Selects the validator for a candidate block.
    ///
    /// Deterministic in `(previous_hash, merkle_root)`; returns `None` when
    /// no address holds positive stake.
    pub fn select_validator(&self, block: &Block) -> Option<String> {
        let total_units: u128 = self
            .stakeholders
            .values()
            .map(|stake| (stake * STAKE_UNIT).round() as u128)
            .sum();
        if total_units == 0 {
            return None;
        }

        let seed = format!("{}{}", block.previous_hash, block.merkle_root);
        let digest = sha256(seed.as_bytes());
        // Widened so the multiply below cannot overflow.
        let hash = U512::from_be_slice(&digest);

        // Uniform reduction onto [0, total_units): (hash * total) >> 256.
        let target: u128 = ((hash * U512::from(total_units)) >> 256usize).to();

        let mut cumulative = 0u128;
        for (address, stake) in &self.stakeholders {
            cumulative += (stake * STAKE_UNIT).round() as u128;
            if target < cumulative {
                return Some(address.clone());
            }
        }

        // target < total_units, so the walk always terminates inside the loop.
        None
    }

    /// Validates that `address` is the selected validator for the block and
    /// holds strictly positive stake.
    pub fn validate(&self, block: &Block, address: &str) -> bool {
        if self.stake_of(address) <= 0.0 {
            return false;
        }
        self.select_validator(block).as_deref() == Some(address)
    }
}
