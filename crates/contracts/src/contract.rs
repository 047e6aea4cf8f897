//! Smart-contract instances and the template dispatcher.
//!
//! Each contract carries a typed state record matching its template; there
//! is no generic string-to-any map. All mutation goes through
//! [`SmartContract::execute`] under the instance's own lock.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use parking_lot::RwLock;
use quorus_types::sha256_hex;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::{ContractError, Result};

/// Length of a contract address: `0x` + 40 hex characters.
pub const ADDRESS_LEN: usize = 42;

/// The built-in contract templates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContractType {
    /// Plain key/value storage
    Simple,
    /// ERC-20-like token ledger
    Token,
    /// Arbiter-controlled escrow
    Escrow,
    /// Proposal voting with one vote per address
    Voting,
}

impl fmt::Display for ContractType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Simple => "simple",
            Self::Token => "token",
            Self::Escrow => "escrow",
            Self::Voting => "voting",
        };
        f.write_str(name)
    }
}

/// Per-template contract state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ContractState {
    /// Key/value entries of a simple-storage contract
    Simple {
        /// Stored entries
        entries: BTreeMap<String, String>,
    },
    /// Ledger of a token contract
    Token {
        /// Address balances
        balances: BTreeMap<String, f64>,
        /// Total minted minus burned supply
        total_supply: f64,
    },
    /// Named scalars of an escrow contract
    Escrow {
        /// Coins deposited so far
        deposited: f64,
        /// Whether the escrow was released (or refunded)
        released: bool,
        /// Whether release took the refund path
        refunded: bool,
        /// Recipient; fixed on the first call from args or caller
        beneficiary: Option<String>,
        /// Party allowed to release/refund (the deployer)
        arbiter: String,
    },
    /// Proposals and voter set of a voting contract
    Voting {
        /// Vote counts per proposal
        proposals: BTreeMap<String, u64>,
        /// Addresses that already voted
        voters: BTreeSet<String>,
        /// Whether voting was closed by the deployer
        ended: bool,
    },
}

impl ContractState {
    fn initial(contract_type: ContractType, deployer: &str) -> Self {
        match contract_type {
            ContractType::Simple => Self::Simple {
                entries: BTreeMap::new(),
            },
            ContractType::Token => Self::Token {
                balances: BTreeMap::new(),
                total_supply: 0.0,
            },
            ContractType::Escrow => Self::Escrow {
                deposited: 0.0,
                released: false,
                refunded: false,
                beneficiary: None,
                arbiter: deployer.to_string(),
            },
            ContractType::Voting => Self::Voting {
                proposals: BTreeMap::new(),
                voters: BTreeSet::new(),
                ended: false,
            },
        }
    }
}

/// A deployed smart contract.
#[derive(Debug)]
pub struct SmartContract {
    address: String,
    deployer: String,
    contract_type: ContractType,
    bytecode: String,
    created_at: u64,
    state: RwLock<ContractState>,
}

impl SmartContract {
    /// Creates a contract instance; the address derives from the deployer
    /// and the deployment block index.
    pub fn new(
        deployer: impl Into<String>,
        contract_type: ContractType,
        bytecode: impl Into<String>,
        block_index: u64,
    ) -> Self {
        let deployer = deployer.into();
        let digest = sha256_hex(format!("{deployer}{block_index}").as_bytes());
        Self {
            address: format!("0x{}", &digest[..ADDRESS_LEN - 2]),
            state: RwLock::new(ContractState::initial(contract_type, &deployer)),
            deployer,
            contract_type,
            bytecode: bytecode.into(),
            created_at: block_index,
        }
    }

    /// The contract address.
    pub fn address(&self) -> &str {
        &self.address
    }

    /// The deployer address.
    pub fn deployer(&self) -> &str {
        &self.deployer
    }

    /// The template this contract instantiates.
    pub fn contract_type(&self) -> ContractType {
        self.contract_type
    }

    /// The opaque bytecode string.
    pub fn bytecode(&self) -> &str {
        &self.bytecode
    }

    /// Block index at deployment.
    pub fn created_at(&self) -> u64 {
        self.created_at
    }

    /// A JSON snapshot of the full contract state.
    pub fn state_json(&self) -> Value {
        serde_json::to_value(&*self.state.read()).unwrap_or(Value::Null)
    }

    /// Executes a contract function.
    ///
    /// Routes on the contract type; `value` is the coin amount attached to
    /// payable calls. Reads take the shared guard, writes the exclusive one.
    pub fn execute(
        &self,
        function: &str,
        args: &[String],
        caller: &str,
        value: f64,
    ) -> Result<Value> {
        match self.contract_type {
            ContractType::Simple => self.execute_simple(function, args),
            ContractType::Token => self.execute_token(function, args, caller),
            ContractType::Escrow => self.execute_escrow(function, args, caller, value),
            ContractType::Voting => self.execute_voting(function, args, caller),
        }
    }

    // ----- simple storage -----

    fn execute_simple(&self, function: &str, args: &[String]) -> Result<Value> {
        match function {
            "set" => {
                let (key, value) = (required(args, 0, "set", 2)?, required(args, 1, "set", 2)?);
                let mut state = self.state.write();
                let ContractState::Simple { entries } = &mut *state else {
                    unreachable!("simple contract holds simple state");
                };
                entries.insert(key.clone(), value.clone());
                Ok(json!({ "key": key, "value": value }))
            }
            "get" => {
                let key = required(args, 0, "get", 1)?;
                let state = self.state.read();
                let ContractState::Simple { entries } = &*state else {
                    unreachable!("simple contract holds simple state");
                };
                entries
                    .get(key)
                    .map(|value| Value::String(value.clone()))
                    .ok_or_else(|| ContractError::KeyNotFound(key.clone()))
            }
            "delete" => {
                let key = required(args, 0, "delete", 1)?;
                let mut state = self.state.write();
                let ContractState::Simple { entries } = &mut *state else {
                    unreachable!("simple contract holds simple state");
                };
                entries
                    .remove(key)
                    .map(|_| json!({ "deleted": key }))
                    .ok_or_else(|| ContractError::KeyNotFound(key.clone()))
            }
            "exists" => {
                let key = required(args, 0, "exists", 1)?;
                let state = self.state.read();
                let ContractState::Simple { entries } = &*state else {
                    unreachable!("simple contract holds simple state");
                };
                Ok(Value::Bool(entries.contains_key(key)))
            }
            other => Err(ContractError::UnknownFunction(other.to_string())),
        }
    }

    // ----- token -----

    fn execute_token(&self, function: &str, args: &[String], caller: &str) -> Result<Value> {
        match function {
            "transfer" => {
                let to = required(args, 0, "transfer", 2)?.clone();
                let amount = parse_amount(required(args, 1, "transfer", 2)?)?;
                if amount == 0.0 {
                    return Err(ContractError::InvalidAmount(
                        "transfer amount must be greater than zero".into(),
                    ));
                }

                let mut state = self.state.write();
                let ContractState::Token { balances, .. } = &mut *state else {
                    unreachable!("token contract holds token state");
                };
                let have = balances.get(caller).copied().unwrap_or(0.0);
                if have < amount {
                    return Err(ContractError::InsufficientBalance { have, need: amount });
                }
                *balances.entry(caller.to_string()).or_insert(0.0) -= amount;
                *balances.entry(to.clone()).or_insert(0.0) += amount;
                Ok(json!({ "from": caller, "to": to, "amount": amount }))
            }
            "balance_of" => {
                let address = required(args, 0, "balance_of", 1)?;
                let state = self.state.read();
                let ContractState::Token { balances, .. } = &*state else {
                    unreachable!("token contract holds token state");
                };
                Ok(json!(balances.get(address).copied().unwrap_or(0.0)))
            }
            "total_supply" => {
                let state = self.state.read();
                let ContractState::Token { total_supply, .. } = &*state else {
                    unreachable!("token contract holds token state");
                };
                Ok(json!(total_supply))
            }
            "mint" => {
                if caller != self.deployer {
                    return Err(ContractError::PermissionDenied(
                        "only the deployer can mint tokens",
                    ));
                }
                let to = required(args, 0, "mint", 2)?.clone();
                let amount = parse_amount(required(args, 1, "mint", 2)?)?;

                let mut state = self.state.write();
                let ContractState::Token { balances, total_supply } = &mut *state else {
                    unreachable!("token contract holds token state");
                };
                *total_supply += amount;
                *balances.entry(to.clone()).or_insert(0.0) += amount;
                Ok(json!({ "to": to, "amount": amount, "total_supply": *total_supply }))
            }
            "burn" => {
                let amount = parse_amount(required(args, 0, "burn", 1)?)?;
                let mut state = self.state.write();
                let ContractState::Token { balances, total_supply } = &mut *state else {
                    unreachable!("token contract holds token state");
                };
                let have = balances.get(caller).copied().unwrap_or(0.0);
                if have < amount {
                    return Err(ContractError::InsufficientBalance { have, need: amount });
                }
                *balances.entry(caller.to_string()).or_insert(0.0) -= amount;
                *total_supply -= amount;
                Ok(json!({ "from": caller, "amount": amount, "total_supply": *total_supply }))
            }
            other => Err(ContractError::UnknownFunction(other.to_string())),
        }
    }

    // ----- escrow -----

    fn execute_escrow(
        &self,
        function: &str,
        args: &[String],
        caller: &str,
        value: f64,
    ) -> Result<Value> {
        // Escrow fixes its beneficiary on the first call, so every entry
        // point takes the exclusive guard.
        let mut state = self.state.write();
        let ContractState::Escrow {
            deposited,
            released,
            refunded,
            beneficiary,
            arbiter,
        } = &mut *state
        else {
            unreachable!("escrow contract holds escrow state");
        };

        if beneficiary.is_none() {
            *beneficiary = Some(args.first().cloned().unwrap_or_else(|| caller.to_string()));
        }

        match function {
            "deposit" => {
                if *released {
                    return Err(ContractError::AlreadyReleased);
                }
                if value <= 0.0 {
                    return Err(ContractError::NonPositiveValue);
                }
                *deposited += value;
                Ok(json!({ "deposited": value, "total": *deposited }))
            }
            "release" => {
                if caller != arbiter.as_str() && caller != self.deployer {
                    return Err(ContractError::PermissionDenied(
                        "only the arbiter or deployer can release escrow",
                    ));
                }
                if *released {
                    return Err(ContractError::AlreadyReleased);
                }
                if *deposited == 0.0 {
                    return Err(ContractError::NoFunds);
                }
                *released = true;
                Ok(json!({ "released": *deposited, "beneficiary": beneficiary.clone() }))
            }
            "refund" => {
                if caller != arbiter.as_str() && caller != self.deployer {
                    return Err(ContractError::PermissionDenied(
                        "only the arbiter or deployer can refund escrow",
                    ));
                }
                if *released {
                    return Err(ContractError::AlreadyReleased);
                }
                if *deposited == 0.0 {
                    return Err(ContractError::NoFunds);
                }
                *released = true;
                *refunded = true;
                Ok(json!({ "refunded": *deposited }))
            }
            "get_balance" => Ok(json!(*deposited)),
            "get_status" => Ok(json!({
                "deposited": *deposited,
                "released": *released,
                "refunded": *refunded,
                "beneficiary": beneficiary.clone(),
                "arbiter": arbiter.clone(),
            })),
            other => Err(ContractError::UnknownFunction(other.to_string())),
        }
    }

    // ----- voting -----

    fn execute_voting(&self, function: &str, args: &[String], caller: &str) -> Result<Value> {
        match function {
            "propose" => {
                let proposal = required(args, 0, "propose", 1)?.clone();
                let mut state = self.state.write();
                let ContractState::Voting { proposals, ended, .. } = &mut *state else {
                    unreachable!("voting contract holds voting state");
                };
                if *ended {
                    return Err(ContractError::VotingEnded);
                }
                if proposals.contains_key(&proposal) {
                    return Err(ContractError::DuplicateProposal(proposal));
                }
                proposals.insert(proposal.clone(), 0);
                Ok(json!({ "proposal": proposal }))
            }
            "vote" => {
                let proposal = required(args, 0, "vote", 1)?.clone();
                let mut state = self.state.write();
                let ContractState::Voting { proposals, voters, ended } = &mut *state else {
                    unreachable!("voting contract holds voting state");
                };
                if *ended {
                    return Err(ContractError::VotingEnded);
                }
                if voters.contains(caller) {
                    return Err(ContractError::AlreadyVoted);
                }
                let count = proposals
                    .get_mut(&proposal)
                    .ok_or_else(|| ContractError::UnknownProposal(proposal.clone()))?;
                *count += 1;
                voters.insert(caller.to_string());
                Ok(json!({ "voted": proposal }))
            }
            "get_results" => {
                let state = self.state.read();
                let ContractState::Voting { proposals, .. } = &*state else {
                    unreachable!("voting contract holds voting state");
                };
                Ok(json!(proposals))
            }
            "get_winner" => {
                let state = self.state.read();
                let ContractState::Voting { proposals, .. } = &*state else {
                    unreachable!("voting contract holds voting state");
                };
                // Strict comparison keeps the first-encountered proposal on ties.
                let mut winner: Option<(&String, u64)> = None;
                for (proposal, votes) in proposals {
                    if winner.map_or(true, |(_, best)| *votes > best) {
                        winner = Some((proposal, *votes));
                    }
                }
                winner
                    .map(|(winner, votes)| json!({ "winner": winner, "votes": votes }))
                    .ok_or_else(|| ContractError::UnknownProposal("<none>".into()))
            }
            "end_voting" => {
                if caller != self.deployer {
                    return Err(ContractError::PermissionDenied(
                        "only the deployer can end voting",
                    ));
                }
                let mut state = self.state.write();
                let ContractState::Voting { ended, .. } = &mut *state else {
                    unreachable!("voting contract holds voting state");
                };
                if *ended {
                    return Err(ContractError::VotingEnded);
                }
                *ended = true;
                Ok(json!({ "ended": true }))
            }
            other => Err(ContractError::UnknownFunction(other.to_string())),
        }
    }
}

fn required<'a>(
    args: &'a [String],
    position: usize,
    function: &'static str,
    count: usize,
) -> Result<&'a String> {
    args.get(position).ok_or(ContractError::MissingArguments {
        function,
        required: count,
    })
}

fn parse_amount(raw: &str) -> Result<f64> {
    let amount: f64 = raw
        .parse()
        .map_err(|_| ContractError::InvalidAmount(raw.to_string()))?;
    if amount < 0.0 {
        return Err(ContractError::InvalidAmount(format!(
            "amount cannot be negative: {amount:.2}"
        )));
    }
    Ok(amount)
}
