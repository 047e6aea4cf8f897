//! The blockchain: genesis, admission, sealing, and validation.

use std::sync::atomic::AtomicBool;
use std::time::Duration;

use parking_lot::RwLock;
use tracing::{debug, info, warn};

use quorus_channels::{BalanceSource, ChannelManager, PaymentChannel};
use quorus_consensus::{
    AppendResponse, BlockSink, ConsensusError, DelegatedProofOfStake, Pbft, PbftMessage,
    PbftMessageKind, ProofOfStake, ProofOfWork, RaftNode, VoteResponse,
};
use quorus_contracts::{
    is_contract_address, parse_contract_call, ContractRegistry, ContractType, SmartContract,
};
use quorus_mempool::Mempool;
use quorus_types::{Block, ConsensusKind, Transaction};

use crate::rewards::reward_transaction;
use crate::sync::validate_block_sequence;
use crate::{ChainError, Result};

/// Upper bound on transactions drained from the mempool per block.
pub const MAX_BLOCK_TRANSACTIONS: usize = 100;

/// The chain: an ordered block sequence plus its mempool, contract
/// registry, and channel manager.
///
/// All mutating operations serialize on the internal block guard, so after
/// any successful append the tail index has strictly increased. Mining
/// runs outside the guard: candidates are assembled under it, mined
/// unguarded, and re-checked against the tail on append.
pub struct Blockchain {
    blocks: RwLock<Vec<Block>>,
    mempool: Mempool,
    contracts: ContractRegistry,
    channels: ChannelManager,
    mining_cancel: AtomicBool,
}

impl Blockchain {
    /// Creates a chain with a freshly mined genesis block.
    pub fn new() -> Self {
        let chain = Self {
            blocks: RwLock::new(Vec::new()),
            mempool: Mempool::new(),
            contracts: ContractRegistry::new(),
            channels: ChannelManager::new(),
            mining_cancel: AtomicBool::new(false),
        };
        chain.create_genesis_block();
        chain
    }

    fn create_genesis_block(&self) {
        let genesis_tx = Transaction::new("", "Genesis", 0.0);
        let mut genesis = Block::assemble(0, vec![genesis_tx], "0", ConsensusKind::ProofOfWork);

        // Genesis always mines to completion; the cancel flag is not consulted.
        let never = AtomicBool::new(false);
        let (nonce, hash) = ProofOfWork::new(&genesis)
            .run(&never)
            .expect("uncancelled mining always terminates");
        genesis.nonce = nonce;
        genesis.hash = hash;

        self.blocks.write().push(genesis);
        info!("genesis block created and mined");
    }

    // ----- accessors -----

    /// Snapshot of the full block sequence.
    pub fn blocks(&self) -> Vec<Block> {
        self.blocks.read().clone()
    }

    /// Number of blocks, genesis included.
    pub fn len(&self) -> usize {
        self.blocks.read().len()
    }

    /// A chain always holds at least its genesis block.
    pub fn is_empty(&self) -> bool {
        false
    }

    /// The latest block.
    pub fn tail(&self) -> Block {
        self.blocks
            .read()
            .last()
            .expect("chain always holds genesis")
            .clone()
    }

    /// The block at `index`, if present.
    pub fn block_at(&self, index: u64) -> Option<Block> {
        self.blocks.read().get(index as usize).cloned()
    }

    /// The pending-transaction pool.
    pub fn mempool(&self) -> &Mempool {
        &self.mempool
    }

    /// The contract registry.
    pub fn contracts(&self) -> &ContractRegistry {
        &self.contracts
    }

    /// The payment-channel manager.
    pub fn channels(&self) -> &ChannelManager {
        &self.channels
    }

    /// Cancellation flag consulted by mining loops.
    pub fn mining_cancel(&self) -> &AtomicBool {
        &self.mining_cancel
    }

    pub(crate) fn blocks_mut(&self) -> parking_lot::RwLockWriteGuard<'_, Vec<Block>> {
        self.blocks.write()
    }

    // ----- admission -----

    /// Admits a transaction to the mempool.
    ///
    /// Coinbase transactions skip balance checks; signed transactions must
    /// verify. Duplicates are rejected by the mempool.
    pub fn submit_transaction(&self, tx: Transaction) -> Result<()> {
        self.validate_transaction(&tx)?;
        if !tx.signature.is_empty() && !tx.verify() {
            return Err(ChainError::InvalidSignature);
        }
        self.mempool.add(tx)?;
        Ok(())
    }

    /// Creates a coinbase transaction minting `amount` to `to` and admits
    /// it to the mempool.
    pub fn add_coinbase_transaction(&self, to: &str, amount: f64) -> Result<Transaction> {
        let tx = Transaction::new("", to, amount);
        self.mempool.add(tx.clone())?;
        Ok(tx)
    }

    // ----- proof-of-work block creation -----

    /// Validates, assembles, mines, and appends a block.
    ///
    /// When `miner` is given, a reward transaction is prepended to the
    /// list. Contract-call transactions are executed after the block is
    /// appended; their failures are logged and do not roll the block back.
    pub fn add_block(&self, transactions: Vec<Transaction>, miner: Option<&str>) -> Result<Block> {
        self.validate_transactions(&transactions)?;

        let mut all_transactions = transactions.clone();
        if let Some(miner) = miner {
            all_transactions.insert(0, reward_transaction(miner, false));
        }

        // Assemble under the read guard, mine unguarded.
        let tail = self.tail();
        let mut block = Block::assemble(
            tail.index + 1,
            all_transactions,
            tail.hash,
            ConsensusKind::ProofOfWork,
        );
        let (nonce, hash) = ProofOfWork::new(&block)
            .run(&self.mining_cancel)
            .ok_or(ChainError::MiningCancelled)?;
        block.nonce = nonce;
        block.hash = hash;

        self.finish_block(block, &transactions)
    }

    /// Drains up to [`MAX_BLOCK_TRANSACTIONS`] from the mempool and mines
    /// them into a block credited to `miner`.
    pub fn mine_block(&self, miner: &str) -> Result<Block> {
        let transactions = self.mempool.get_for_block(MAX_BLOCK_TRANSACTIONS);
        if transactions.is_empty() {
            return Err(ChainError::EmptyMempool);
        }
        self.add_block(transactions, Some(miner))
    }

    // ----- proof-of-stake block creation -----

    /// Seals a block under proof-of-stake after checking that `validator`
    /// is the stake-weighted selection for the candidate.
    pub fn create_block_with_pos(
        &self,
        transactions: Vec<Transaction>,
        validator: &str,
    ) -> Result<Block> {
        self.validate_transactions(&transactions)?;

        let tail = self.tail();
        let mut block = Block::assemble(
            tail.index + 1,
            transactions.clone(),
            tail.hash,
            ConsensusKind::ProofOfStake,
        );

        let pos = ProofOfStake::new(self.stakeholders());
        if !pos.validate(&block, validator) {
            return Err(ConsensusError::ValidatorRejected(format!(
                "{validator} was not selected or has no stake"
            ))
            .into());
        }

        block.seal();
        info!(index = block.index, %validator, "block sealed with proof-of-stake");
        self.finish_block(block, &transactions)
    }

    /// Seals a block under delegated proof-of-stake after checking that
    /// `validator` sits in the active top-delegate set.
    pub fn create_block_with_dpos(
        &self,
        transactions: Vec<Transaction>,
        dpos: &DelegatedProofOfStake,
        validator: &str,
    ) -> Result<Block> {
        self.validate_transactions(&transactions)?;

        if !dpos.validate(validator) {
            return Err(ConsensusError::ValidatorRejected(format!(
                "{validator} is not an active top delegate"
            ))
            .into());
        }

        let tail = self.tail();
        let mut block = Block::assemble(
            tail.index + 1,
            transactions.clone(),
            tail.hash,
            ConsensusKind::DelegatedPos,
        );
        block.seal();
        info!(index = block.index, %validator, "block sealed with delegated proof-of-stake");
        self.finish_block(block, &transactions)
    }

    /// Builds a delegated-PoS instance over the current stake table.
    pub fn delegated_pos(&self) -> DelegatedProofOfStake {
        DelegatedProofOfStake::new(&self.stakeholders())
    }

    // ----- PBFT block creation -----

    /// Finalizes a block through a locally reconstructed PBFT round.
    ///
    /// This node drives its own instance and replays the quorum messages
    /// the peer set would send; the block is appended once the commit
    /// quorum is reached.
    pub fn create_block_with_pbft(
        &self,
        transactions: Vec<Transaction>,
        nodes: &[String],
        node_id: &str,
    ) -> Result<Block> {
        self.validate_transactions(&transactions)?;

        let tail = self.tail();
        let mut block = Block::assemble(
            tail.index + 1,
            transactions.clone(),
            tail.hash,
            ConsensusKind::Pbft,
        );
        block.seal();

        let sequence = self.len() as u64;
        let pbft = Pbft::new(node_id, nodes.to_vec(), block.hash.clone(), sequence);
        debug!(
            nodes = pbft.total_nodes(),
            required = pbft.required_votes(),
            primary = pbft.primary(),
            "starting PBFT round"
        );

        // Phase 1: pre-prepare, from this node or reconstructed from the primary.
        if pbft.is_primary() {
            pbft.pre_prepare()?;
        } else {
            pbft.process_pre_prepare(&peer_pbft_message(
                PbftMessageKind::PrePrepare,
                pbft.primary(),
                &block.hash,
                sequence,
            ))?;
        }

        // Phase 2: prepare from every node.
        pbft.prepare()?;
        for node in nodes.iter().filter(|node| *node != node_id) {
            pbft.process_prepare(&peer_pbft_message(
                PbftMessageKind::Prepare,
                node,
                &block.hash,
                sequence,
            ))?;
        }

        // Phase 3: commit from every node.
        pbft.commit()?;
        for node in nodes.iter().filter(|node| *node != node_id) {
            pbft.process_commit(&peer_pbft_message(
                PbftMessageKind::Commit,
                node,
                &block.hash,
                sequence,
            ))?;
        }

        if !pbft.validate() {
            let (have, _) = pbft.tallies();
            return Err(ConsensusError::QuorumNotReached {
                have,
                need: pbft.required_votes(),
            }
            .into());
        }

        info!(index = block.index, "block finalized with PBFT");
        self.finish_block(block, &transactions)
    }

    // ----- Raft block creation -----

    /// Commits a block through a locally reconstructed Raft round: elect
    /// this node, replicate the entry, and apply it on majority commit.
    pub fn create_block_with_raft(
        &self,
        transactions: Vec<Transaction>,
        node_id: &str,
        nodes: &[String],
    ) -> Result<Block> {
        self.validate_transactions(&transactions)?;

        let raft = RaftNode::new(node_id, nodes.to_vec());

        // Leader election with reconstructed grants from the peer set.
        let request = raft.start_election();
        for peer in nodes.iter().filter(|peer| *peer != node_id) {
            raft.handle_vote_response(&VoteResponse {
                term: request.term,
                from: peer.clone(),
                granted: true,
            });
            if raft.is_leader() {
                break;
            }
        }
        if !raft.is_leader() {
            return Err(ConsensusError::ElectionFailed(raft.current_term()).into());
        }

        let tail = self.tail();
        let mut block = Block::assemble(
            tail.index + 1,
            transactions.clone(),
            tail.hash,
            ConsensusKind::Raft,
        );
        block.seal();

        // Replicate; commit advancement applies the block through BlockSink.
        let append = raft.append_block(block.clone())?;
        let acked = append.prev_log_index + append.entries.len() as u64;
        for peer in nodes.iter().filter(|peer| *peer != node_id) {
            raft.handle_append_response(
                &AppendResponse {
                    term: raft.current_term(),
                    from: peer.clone(),
                    success: true,
                    last_log_index: acked,
                },
                self,
            );
        }

        if raft.commit_index() < acked {
            return Err(ConsensusError::QuorumNotReached {
                have: 1,
                need: raft.majority(),
            }
            .into());
        }

        info!(
            index = block.index,
            term = raft.current_term(),
            "block committed with Raft"
        );
        self.apply_block_side_effects(&transactions);
        Ok(block)
    }

    // ----- shared sealing path -----

    /// Appends a sealed block (stale-tail checked) and runs its side
    /// effects: contract calls and mempool eviction.
    fn finish_block(&self, block: Block, transactions: &[Transaction]) -> Result<Block> {
        {
            let mut blocks = self.blocks.write();
            let tail = blocks.last().expect("chain always holds genesis");
            if block.previous_hash != tail.hash || block.index != tail.index + 1 {
                return Err(ChainError::StaleParent);
            }
            blocks.push(block.clone());
        }
        info!(index = block.index, consensus = %block.consensus, "block appended");

        self.apply_block_side_effects(transactions);
        Ok(block)
    }

    /// Executes contract calls carried by the block's transactions and
    /// evicts the included transactions from the mempool. Contract
    /// failures are logged and never roll the block back.
    fn apply_block_side_effects(&self, transactions: &[Transaction]) {
        for tx in transactions {
            let Some(data) = &tx.contract_data else {
                continue;
            };
            if !is_contract_address(&tx.to) {
                continue;
            }
            match parse_contract_call(data) {
                Ok(call) => {
                    match self
                        .contracts
                        .call(&tx.to, &call.function, &call.args, &tx.from, tx.amount)
                    {
                        Ok(result) => {
                            debug!(contract = %tx.to, function = %call.function, %result, "contract call applied")
                        }
                        Err(error) => {
                            warn!(contract = %tx.to, function = %call.function, %error, "contract call failed")
                        }
                    }
                }
                Err(error) => warn!(contract = %tx.to, %error, "malformed contract call data"),
            }
        }

        let hashes: Vec<String> = transactions
            .iter()
            .filter(|tx| !tx.is_coinbase())
            .map(|tx| tx.hash_hex())
            .collect();
        self.mempool.remove_all(&hashes);
    }

    // ----- validation -----

    /// Walks the chain checking every block's Merkle root, signatures,
    /// canonical hash, linkage, and (for proof-of-work blocks) difficulty.
    /// Surfaces the offending block index on failure.
    pub fn validate(&self) -> Result<()> {
        validate_block_sequence(&self.blocks.read())
    }

    /// Predicate form of [`Blockchain::validate`].
    pub fn is_valid(&self) -> bool {
        self.validate().is_ok()
    }

    // ----- contracts -----

    /// Deploys a contract; the address derives from the deployer and the
    /// current chain height.
    pub fn deploy_contract(
        &self,
        deployer: &str,
        contract_type: ContractType,
        bytecode: &str,
    ) -> Result<std::sync::Arc<SmartContract>> {
        let block_index = self.len() as u64;
        Ok(self
            .contracts
            .deploy(deployer, contract_type, bytecode, block_index)?)
    }

    /// Calls a function on a deployed contract.
    pub fn call_contract(
        &self,
        address: &str,
        function: &str,
        args: &[String],
        caller: &str,
        value: f64,
    ) -> Result<serde_json::Value> {
        Ok(self.contracts.call(address, function, args, caller, value)?)
    }

    /// Looks up a deployed contract.
    pub fn get_contract(&self, address: &str) -> Result<std::sync::Arc<SmartContract>> {
        Ok(self.contracts.get(address)?)
    }

    // ----- channels -----

    /// Opens a payment channel funded against current on-chain balances.
    pub fn open_channel(
        &self,
        participant1: &str,
        participant2: &str,
        deposit1: f64,
        deposit2: f64,
        timeout: Duration,
    ) -> Result<std::sync::Arc<PaymentChannel>> {
        Ok(self.channels.create(
            self,
            participant1,
            participant2,
            deposit1,
            deposit2,
            timeout,
        )?)
    }

    // ----- helpers -----

    fn validate_transactions(&self, transactions: &[Transaction]) -> Result<()> {
        for tx in transactions {
            self.validate_transaction(tx)?;
            if !tx.signature.is_empty() && !tx.verify() {
                return Err(ChainError::InvalidSignature);
            }
        }
        Ok(())
    }
}

impl Default for Blockchain {
    fn default() -> Self {
        Self::new()
    }
}

impl BlockSink for Blockchain {
    /// Applies a consensus-committed block, deduplicated by hash.
    fn apply_block(&self, block: Block) -> bool {
        let mut blocks = self.blocks.write();
        if blocks.iter().any(|existing| existing.hash == block.hash) {
            return false;
        }
        debug!(index = block.index, "applying committed block");
        blocks.push(block);
        true
    }
}

fn peer_pbft_message(
    kind: PbftMessageKind,
    node: &str,
    block_hash: &str,
    sequence: u64,
) -> PbftMessage {
    PbftMessage {
        kind,
        block_hash: block_hash.to_string(),
        node_id: node.to_string(),
        sequence,
        view: 0,
        timestamp: chrono::Utc::now(),
        signature: String::new(),
    }
}
