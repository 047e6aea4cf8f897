//! Delegated Proof-of-Stake: vote aggregation and round-robin proposers.
//!
//! Stakeholders vote coins onto delegates; the top [`TOP_DELEGATE_COUNT`]
//! delegates by aggregated votes form the active set, and block proposers
//! rotate through it round-robin keyed by block height. Vote ties are
//! broken by address order so every node computes the same top set.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::{ConsensusError, Result};

/// Size of the active delegate set.
pub const TOP_DELEGATE_COUNT: usize = 21;

/// A delegate standing for election.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Delegate {
    /// Delegate address
    pub address: String,
    /// Aggregated votes from all voters
    pub votes: f64,
    /// The delegate's own stake
    pub stake: f64,
    /// Whether the delegate is standing
    pub is_active: bool,
    /// Height of the last block this delegate produced
    pub last_block: Option<u64>,
}

/// A delegated proof-of-stake instance.
#[derive(Debug, Clone, Default)]
pub struct DelegatedProofOfStake {
    delegates: BTreeMap<String, Delegate>,
    // voter -> delegate -> amount
    votes: BTreeMap<String, BTreeMap<String, f64>>,
}

impl DelegatedProofOfStake {
    /// Initializes delegates from a stake table; every positive staker
    /// stands as an active delegate with zero votes.
    pub fn new(stakeholders: &BTreeMap<String, f64>) -> Self {
        let delegates = stakeholders
            .iter()
            .filter(|(_, stake)| **stake > 0.0)
            .map(|(address, stake)| {
                (
                    address.clone(),
                    Delegate {
                        address: address.clone(),
                        votes: 0.0,
                        stake: *stake,
                        is_active: true,
                        last_block: None,
                    },
                )
            })
            .collect();
        Self {
            delegates,
            votes: BTreeMap::new(),
        }
    }

    /// Records a vote of `amount` coins from `voter` for `delegate`.
    ///
    /// A repeat vote for the same delegate replaces the previous amount;
    /// the delegate's aggregate adjusts by the difference.
    pub fn vote(&mut self, voter: &str, delegate: &str, amount: f64) -> Result<()> {
        let entry = self
            .delegates
            .get_mut(delegate)
            .ok_or_else(|| ConsensusError::UnknownDelegate(delegate.to_string()))?;

        let ballot = self.votes.entry(voter.to_string()).or_default();
        let previous = ballot.insert(delegate.to_string(), amount).unwrap_or(0.0);
        entry.votes += amount - previous;
        Ok(())
    }

    /// Returns the top `n` active delegates by votes (descending), ties
    /// broken by address order.
    pub fn top_delegates(&self, n: usize) -> Vec<Delegate> {
        let mut active: Vec<Delegate> = self
            .delegates
            .values()
            .filter(|d| d.is_active)
            .cloned()
            .collect();
        active.sort_by(|a, b| {
            b.votes
                .partial_cmp(&a.votes)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.address.cmp(&b.address))
        });
        active.truncate(n);
        active
    }

    /// Selects the proposer for the given block height: strict round-robin
    /// over the top delegate set.
    pub fn select_validator(&self, block_index: u64) -> Option<String> {
        let top = self.top_delegates(TOP_DELEGATE_COUNT);
        if top.is_empty() {
            return None;
        }
        let slot = (block_index as usize) % top.len();
        Some(top[slot].address.clone())
    }

    /// Validates that `address` is an active delegate inside the top set.
    pub fn validate(&self, address: &str) -> bool {
        match self.delegates.get(address) {
            Some(delegate) if delegate.is_active => self
                .top_delegates(TOP_DELEGATE_COUNT)
                .iter()
                .any(|d| d.address == address),
            _ => false,
        }
    }

    /// Deactivates a delegate (it no longer appears in the top set).
    pub fn deactivate(&mut self, address: &str) -> Result<()> {
        let delegate = self
            .delegates
            .get_mut(address)
            .ok_or_else(|| ConsensusError::UnknownDelegate(address.to_string()))?;
        delegate.is_active = false;
        Ok(())
    }

    /// Returns a delegate by address.
    pub fn delegate(&self, address: &str) -> Option<&Delegate> {
        self.delegates.get(address)
    }

    /// Returns the number of registered delegates.
    pub fn delegate_count(&self) -> usize {
        self.delegates.len()
    }

    /// Total coins each voter has committed across all ballots.
    pub fn committed_votes(&self) -> BTreeMap<String, f64> {
        self.votes
            .iter()
            .map(|(voter, ballot)| (voter.clone(), ballot.values().sum()))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stakeholders(n: usize) -> BTreeMap<String, f64> {
        (0..n).map(|i| (format!("d{i:02}"), 10.0)).collect()
    }

    #[test]
    fn test_vote_replaces_previous_ballot() {
        let mut dpos = DelegatedProofOfStake::new(&stakeholders(3));
        dpos.vote("voter", "d00", 5.0).unwrap();
        dpos.vote("voter", "d00", 2.0).unwrap();
        assert_eq!(dpos.delegate("d00").unwrap().votes, 2.0);
    }

    #[test]
    fn test_vote_for_unknown_delegate_fails() {
        let mut dpos = DelegatedProofOfStake::new(&stakeholders(2));
        assert!(matches!(
            dpos.vote("voter", "ghost", 1.0),
            Err(ConsensusError::UnknownDelegate(_))
        ));
    }

    #[test]
    fn test_top_delegates_sorted_by_votes() {
        let mut dpos = DelegatedProofOfStake::new(&stakeholders(4));
        dpos.vote("v", "d02", 30.0).unwrap();
        dpos.vote("v", "d01", 20.0).unwrap();
        dpos.vote("v", "d03", 10.0).unwrap();

        let top = dpos.top_delegates(3);
        let addresses: Vec<&str> = top.iter().map(|d| d.address.as_str()).collect();
        assert_eq!(addresses, ["d02", "d01", "d03"]);
    }

    #[test]
    fn test_round_robin_rotation() {
        let mut dpos = DelegatedProofOfStake::new(&stakeholders(3));
        for (i, delegate) in ["d00", "d01", "d02"].iter().enumerate() {
            dpos.vote("v", delegate, (3 - i) as f64).unwrap();
        }

        let first = dpos.select_validator(0).unwrap();
        let second = dpos.select_validator(1).unwrap();
        let wrap = dpos.select_validator(3).unwrap();
        assert_eq!(first, "d00");
        assert_eq!(second, "d01");
        assert_eq!(wrap, first);
    }

    #[test]
    fn test_validate_requires_top_membership() {
        // 25 delegates; only the 21 most-voted are eligible.
        let mut dpos = DelegatedProofOfStake::new(&stakeholders(25));
        for i in 0..25 {
            let address = format!("d{i:02}");
            dpos.vote("v", &address, (25 - i) as f64).unwrap();
        }

        assert!(dpos.validate("d00"));
        assert!(dpos.validate("d20"));
        assert!(!dpos.validate("d21"));
        assert!(!dpos.validate("d24"));
    }

    #[test]
    fn test_inactive_delegate_rejected() {
        let mut dpos = DelegatedProofOfStake::new(&stakeholders(3));
        dpos.deactivate("d01").unwrap();
        assert!(!dpos.validate("d01"));
        assert!(dpos.top_delegates(21).iter().all(|d| d.address != "d01"));
    }

    #[test]
    fn test_tie_broken_by_address() {
        let dpos = DelegatedProofOfStake::new(&stakeholders(5));
        // All zero votes: the top set must still be deterministic.
        let top = dpos.top_delegates(5);
        let addresses: Vec<&str> = top.iter().map(|d| d.address.as_str()).collect();
        assert_eq!(addresses, ["d00", "d01", "d02", "d03", "d04"]);
    }
}
