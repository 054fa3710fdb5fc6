// This is the ledger - the single owner of the chain, the mempool and the
// current difficulty. Every change to the chain goes through commit_block,
// whether the block was mined here or handed back by a Miner.

use crate::config::{ChainConfig, MAX_DIFFICULTY};
use crate::core::monetary::{capped_reward, halved_reward};
use crate::core::proof_of_work::ProgressSink;
use crate::core::validator::TransactionValidator;
use crate::core::{Block, DifficultyAdjustment, Transaction};
use crate::error::{BlockchainError, Result, TransactionRejection};
use crate::storage::MemoryPool;
use crate::utils::{Clock, SystemClock};
use crate::wallet::validate_address;
use log::{info, warn};
use std::collections::HashSet;
use std::sync::Arc;

#[derive(Clone)]
pub struct Blockchain {
    config: ChainConfig,
    chain: Vec<Block>,
    mempool: MemoryPool,
    difficulty: u32,
    clock: Arc<dyn Clock>,
}

impl Blockchain {
    // An empty ledger on the system clock; call create_genesis_block next
    pub fn new(config: ChainConfig) -> Result<Blockchain> {
        Self::with_clock(config, Arc::new(SystemClock))
    }

    pub fn with_clock(config: ChainConfig, clock: Arc<dyn Clock>) -> Result<Blockchain> {
        config.validate()?;
        let difficulty = config.initial_difficulty;
        Ok(Blockchain {
            config,
            chain: Vec::new(),
            mempool: MemoryPool::new(),
            difficulty,
            clock,
        })
    }

    // The usual entry point: a ledger that already holds its genesis block
    pub fn create(config: ChainConfig) -> Result<Blockchain> {
        Self::create_with_clock(config, Arc::new(SystemClock))
    }

    pub fn create_with_clock(config: ChainConfig, clock: Arc<dyn Clock>) -> Result<Blockchain> {
        let mut blockchain = Self::with_clock(config, clock)?;
        blockchain.create_genesis_block()?;
        Ok(blockchain)
    }

    /// Rebuilds a ledger from previously exported parts.
    ///
    /// The chain is validated in full and every pending transaction is
    /// re-admitted in its original order, so an edited snapshot cannot
    /// smuggle in an invalid block or a conflicting spend.
    pub fn from_parts(
        config: ChainConfig,
        chain: Vec<Block>,
        mempool: Vec<Transaction>,
        difficulty: u32,
        clock: Arc<dyn Clock>,
    ) -> Result<Blockchain> {
        config.validate()?;
        if chain.is_empty() {
            return Err(BlockchainError::InvalidState(
                "Cannot restore a ledger without a genesis block".to_string(),
            ));
        }
        if !(1..=MAX_DIFFICULTY).contains(&difficulty) {
            return Err(BlockchainError::InvalidState(format!(
                "Difficulty {difficulty} is outside [1, {MAX_DIFFICULTY}]"
            )));
        }

        let mut blockchain = Blockchain {
            config,
            chain,
            mempool: MemoryPool::new(),
            difficulty,
            clock,
        };
        blockchain.validate_chain()?;
        for tx in mempool {
            blockchain.add_transaction(tx)?;
        }
        Ok(blockchain)
    }

    // Block 0 carries a zero-value marker transaction and never needs mining
    pub fn create_genesis_block(&mut self) -> Result<&Block> {
        if !self.chain.is_empty() {
            return Err(BlockchainError::InvalidState(
                "Genesis block already exists".to_string(),
            ));
        }
        let genesis = Block::generate_genesis_block(self.clock.now_ms())?;
        info!("Created genesis block {}", genesis.get_hash());
        self.chain.push(genesis);
        self.latest()
    }

    /// Validates `tx` and appends it to the mempool.
    pub fn add_transaction(&mut self, tx: Transaction) -> Result<()> {
        if tx.is_coinbase() {
            return Err(BlockchainError::MalformedInput(
                "Coinbase transactions are created by block producers only".to_string(),
            ));
        }
        if self.get_transaction(tx.get_id()).is_some() {
            return Err(TransactionRejection::Duplicate(tx.get_id().to_string()).into());
        }
        if let Err(e) = self.validate_transaction(&tx) {
            warn!("Rejected transaction {}: {e}", tx.get_id());
            return Err(e);
        }

        info!(
            "Accepted transaction {} into the mempool ({} pending)",
            tx.get_id(),
            self.mempool.len() + 1
        );
        self.mempool.add(tx);
        Ok(())
    }

    pub fn validate_transaction(&self, tx: &Transaction) -> Result<()> {
        TransactionValidator::new(self).validate(tx)
    }

    /// Builds the next block, unmined: `[coinbase, ...mempool]` on top of the
    /// current tip at the current difficulty.
    pub fn prepare_candidate(&self, miner_address: &str) -> Result<Block> {
        if !validate_address(miner_address) {
            return Err(BlockchainError::InvalidAddress(miner_address.to_string()));
        }
        let latest = self.latest()?;
        let height = self.chain.len() as u64;

        let pending = self.mempool.get_all();
        let reward = self.block_reward(height);
        let fees = self.collected_fees(pending)?;
        let payout = reward.checked_add(fees).ok_or_else(|| {
            BlockchainError::InvalidState("Coinbase payout overflows".to_string())
        })?;

        // I keep timestamps strictly increasing so retarget spans stay
        // positive and two coinbases never hash to the same id
        let timestamp = self
            .clock
            .now_ms()
            .max(latest.get_timestamp().saturating_add(1));

        let mut transactions = Vec::with_capacity(pending.len() + 1);
        transactions.push(Transaction::new_coinbase_tx(miner_address, payout, timestamp)?);
        transactions.extend_from_slice(pending);

        info!(
            "Prepared block {height} with {} transactions (reward: {reward}, fees: {fees}, difficulty: {})",
            transactions.len(),
            self.difficulty
        );
        Block::new_block(
            height,
            timestamp,
            transactions,
            latest.get_hash().to_string(),
            self.difficulty,
        )
    }

    /// Appends a mined block. This is the only way the chain grows.
    ///
    /// Rejects candidates prepared against an older tip, then drops the
    /// block's transactions from the mempool and retargets.
    pub fn commit_block(&mut self, block: Block) -> Result<()> {
        let latest = self.latest()?;
        if block.get_previous_hash() != latest.get_hash()
            || block.get_index() != self.chain.len() as u64
        {
            return Err(BlockchainError::InvalidBlock(format!(
                "Stale candidate {} at index {}: tip is {} at index {}",
                block.get_hash(),
                block.get_index(),
                latest.get_hash(),
                latest.get_index()
            )));
        }
        if block.get_difficulty() != self.difficulty {
            return Err(BlockchainError::InvalidBlock(format!(
                "Block difficulty {} does not match required difficulty {}",
                block.get_difficulty(),
                self.difficulty
            )));
        }
        block.validate()?;
        self.check_block_transactions(&block)?;

        for tx in block.get_transactions() {
            self.mempool.remove(tx.get_id());
        }
        info!(
            "Committed block {} at index {} with {} transactions",
            block.get_hash(),
            block.get_index(),
            block.get_transactions().len()
        );
        self.chain.push(block);
        self.adjust_difficulty();
        Ok(())
    }

    /// Prepares, mines and commits the next block in the foreground.
    pub fn mine_next_block(
        &mut self,
        miner_address: &str,
        progress: Option<&mut dyn ProgressSink>,
    ) -> Result<Block> {
        let mut candidate = self.prepare_candidate(miner_address)?;
        candidate.mine(Arc::clone(&self.clock), progress)?;
        self.commit_block(candidate.clone())?;
        Ok(candidate)
    }

    /// Retargets when the chain length sits on an adjustment boundary.
    /// Returns the difficulty in force afterwards.
    pub fn adjust_difficulty(&mut self) -> u32 {
        if let Some(next) =
            DifficultyAdjustment::calculate_next_difficulty(&self.chain, self.difficulty, &self.config)
        {
            self.difficulty = next;
        }
        self.difficulty
    }

    /// Subsidy for the block at `height`, halved on schedule and capped so
    /// the cumulative subsidy never passes `max_supply`.
    pub fn block_reward(&self, height: u64) -> u64 {
        let base = self.config.block_reward;
        let interval = self.config.reward_halving_interval;
        let max_supply = self.config.max_supply;

        // Genesis pays nothing, so issuance starts at height 1
        let mut issued = 0u64;
        for h in 1..height {
            let reward = halved_reward(base, interval, h);
            if reward == 0 || issued >= max_supply {
                break;
            }
            issued = issued.saturating_add(capped_reward(reward, issued, max_supply));
        }
        capped_reward(halved_reward(base, interval, height), issued, max_supply)
    }

    /// Sum of positive implicit fees. A transaction whose outputs exceed its
    /// inputs contributes nothing here; the validator refuses it anyway.
    pub fn collected_fees(&self, transactions: &[Transaction]) -> Result<u64> {
        let mut total = 0u64;
        for tx in transactions {
            let fee = tx.implicit_fee(self)?;
            if fee > 0 {
                let fee = u64::try_from(fee).map_err(|_| {
                    BlockchainError::InvalidState(format!("Fee of {} overflows", tx.get_id()))
                })?;
                total = total.checked_add(fee).ok_or_else(|| {
                    BlockchainError::InvalidState("Total fees overflow".to_string())
                })?;
            }
        }
        Ok(total)
    }

    /// Walks the chain from genesis and stops at the first broken block.
    pub fn validate_chain(&self) -> Result<()> {
        for (position, block) in self.chain.iter().enumerate() {
            let fail = |reason: String| BlockchainError::InvalidChain {
                index: position,
                reason,
            };

            if block.get_index() != position as u64 {
                return Err(fail(format!(
                    "block claims index {} at position {position}",
                    block.get_index()
                )));
            }
            block.validate().map_err(|e| fail(e.to_string()))?;

            let expected_previous = match position {
                0 => "0",
                _ => self.chain[position - 1].get_hash(),
            };
            if block.get_previous_hash() != expected_previous {
                return Err(fail(format!(
                    "previous hash {} does not link to {expected_previous}",
                    block.get_previous_hash()
                )));
            }

            self.check_block_transactions(block)
                .map_err(|e| fail(e.to_string()))?;
        }
        Ok(())
    }

    pub fn is_chain_valid(&self) -> bool {
        self.validate_chain().is_ok()
    }

    // Body rules shared by commit and full validation: one leading coinbase,
    // no outpoint spent twice within the block, every transaction valid, and
    // a coinbase no larger than the subsidy plus fees
    fn check_block_transactions(&self, block: &Block) -> Result<()> {
        let transactions = block.get_transactions();
        let (coinbase, rest) = transactions.split_first().ok_or_else(|| {
            BlockchainError::InvalidBlock(format!("Block {} has no transactions", block.get_index()))
        })?;
        if !coinbase.is_coinbase() || rest.iter().any(|tx| tx.is_coinbase()) {
            return Err(BlockchainError::InvalidBlock(format!(
                "Block {} must start with exactly one coinbase transaction",
                block.get_index()
            )));
        }

        let mut spent_outputs: HashSet<(&str, usize)> = HashSet::new();
        for tx in rest {
            for input in tx.get_inputs() {
                let outpoint = (input.get_source_tx_id(), input.get_output_index());
                if !spent_outputs.insert(outpoint) {
                    return Err(TransactionRejection::DoubleSpend(format!(
                        "output {}:{} spent twice in block {}",
                        outpoint.0,
                        outpoint.1,
                        block.get_index()
                    ))
                    .into());
                }
            }
        }

        for tx in transactions {
            self.validate_transaction(tx)?;
        }

        // Genesis only carries the zero-value marker
        let allowed = match block.get_index() {
            0 => 0,
            index => self
                .block_reward(index)
                .saturating_add(self.collected_fees(rest)?),
        };
        let paid = coinbase.get_output_value()?;
        if paid > allowed {
            return Err(BlockchainError::InvalidBlock(format!(
                "Coinbase pays {paid}, more than the allowed {allowed}"
            )));
        }
        Ok(())
    }

    /// Chain first, then the mempool.
    pub fn get_transaction(&self, id: &str) -> Option<&Transaction> {
        self.locate_transaction(id)
            .map(|(_, tx)| tx)
            .or_else(|| self.mempool.get(id))
    }

    /// The index of the block holding `id`, with the transaction itself.
    pub fn locate_transaction(&self, id: &str) -> Option<(u64, &Transaction)> {
        self.chain.iter().find_map(|block| {
            block
                .get_transactions()
                .iter()
                .find(|tx| tx.get_id() == id)
                .map(|tx| (block.get_index(), tx))
        })
    }

    // Linear scan over every input on chain and in the mempool
    pub fn is_output_spent(&self, tx_id: &str, output_index: usize, exclude: Option<&str>) -> bool {
        self.chain
            .iter()
            .flat_map(|block| block.get_transactions().iter())
            .chain(self.mempool.iter())
            .filter(|tx| Some(tx.get_id()) != exclude)
            .flat_map(|tx| tx.get_inputs().iter())
            .any(|input| {
                input.get_source_tx_id() == tx_id && input.get_output_index() == output_index
            })
    }

    fn latest(&self) -> Result<&Block> {
        self.chain.last().ok_or_else(|| {
            BlockchainError::InvalidState("Chain has no genesis block".to_string())
        })
    }

    pub fn get_latest_block(&self) -> Option<&Block> {
        self.chain.last()
    }

    pub fn get_blocks(&self) -> &[Block] {
        self.chain.as_slice()
    }

    pub fn get_block(&self, index: u64) -> Option<&Block> {
        usize::try_from(index).ok().and_then(|i| self.chain.get(i))
    }

    /// Number of blocks, genesis included.
    pub fn get_height(&self) -> u64 {
        self.chain.len() as u64
    }

    pub fn get_difficulty(&self) -> u32 {
        self.difficulty
    }

    pub fn get_config(&self) -> &ChainConfig {
        &self.config
    }

    pub fn get_mempool(&self) -> &MemoryPool {
        &self.mempool
    }

    pub fn get_clock(&self) -> Arc<dyn Clock> {
        Arc::clone(&self.clock)
    }

    #[cfg(test)]
    pub(crate) fn blocks_mut(&mut self) -> &mut Vec<Block> {
        &mut self.chain
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::monetary::SATOSHIS_PER_COIN;
    use crate::core::proof_of_work::meets_difficulty;
    use crate::testnet::test_utils::{test_config, TestChain};
    use crate::utils::ManualClock;
    use crate::wallet::generate_address;

    #[test]
    fn test_genesis_only_once() {
        let clock = Arc::new(ManualClock::new(1_000));
        let mut ledger = Blockchain::with_clock(test_config(), clock).unwrap();
        assert!(ledger.get_latest_block().is_none());

        let genesis = ledger.create_genesis_block().unwrap().clone();
        assert_eq!(genesis.get_index(), 0);
        assert_eq!(genesis.get_previous_hash(), "0");
        assert_eq!(genesis.get_timestamp(), 1_000);
        assert_eq!(genesis.get_transactions().len(), 1);
        assert_eq!(genesis.get_transactions()[0].get_output_value().unwrap(), 0);

        assert!(matches!(
            ledger.create_genesis_block(),
            Err(BlockchainError::InvalidState(_))
        ));
    }

    #[test]
    fn test_mine_next_block_links_to_tip() {
        let mut net = TestChain::new();
        let miner = generate_address();
        let genesis_hash = net.ledger.get_blocks()[0].get_hash().to_string();

        let block = net.ledger.mine_next_block(&miner, None).unwrap();
        assert_eq!(block.get_index(), 1);
        assert_eq!(block.get_previous_hash(), genesis_hash);
        assert!(meets_difficulty(block.get_hash(), 1));
        assert_eq!(
            block.get_transactions()[0].get_outputs()[0].get_address(),
            miner
        );
        assert!(net.ledger.is_chain_valid());
    }

    #[test]
    fn test_timestamps_strictly_increase_on_a_frozen_clock() {
        let mut net = TestChain::new();
        let miner = generate_address();
        net.ledger.mine_next_block(&miner, None).unwrap();
        net.ledger.mine_next_block(&miner, None).unwrap();

        let blocks = net.ledger.get_blocks();
        assert!(blocks.windows(2).all(|w| w[0].get_timestamp() < w[1].get_timestamp()));
        assert_ne!(
            blocks[1].get_transactions()[0].get_id(),
            blocks[2].get_transactions()[0].get_id()
        );
    }

    #[test]
    fn test_commit_clears_included_transactions_and_pays_fees() {
        let mut net = TestChain::funded(1_000);
        let recipient = generate_address();
        let tx = net.spend(&net.funding_outpoint(), &[(900, recipient)]);
        net.ledger.add_transaction(tx.clone()).unwrap();
        assert_eq!(net.ledger.collected_fees(net.ledger.get_mempool().get_all()).unwrap(), 100);

        let miner = generate_address();
        let block = net.ledger.mine_next_block(&miner, None).unwrap();
        assert!(net.ledger.get_mempool().is_empty());
        assert_eq!(block.get_transactions()[1], tx);

        let coinbase = &block.get_transactions()[0];
        let reward = net.ledger.block_reward(block.get_index());
        assert_eq!(coinbase.get_output_value().unwrap(), reward + 100);
    }

    #[test]
    fn test_stale_candidate_is_rejected() {
        let mut net = TestChain::new();
        let miner = generate_address();
        let mut stale = net.ledger.prepare_candidate(&miner).unwrap();
        net.ledger.mine_next_block(&miner, None).unwrap();

        stale.mine(net.ledger.get_clock(), None).unwrap();
        let before = net.ledger.get_blocks().to_vec();
        assert!(matches!(
            net.ledger.commit_block(stale),
            Err(BlockchainError::InvalidBlock(_))
        ));
        assert_eq!(net.ledger.get_blocks(), before.as_slice());
    }

    #[test]
    fn test_unmined_candidate_is_rejected() {
        let mut net = TestChain::with_difficulty(MAX_DIFFICULTY);
        let candidate = net.ledger.prepare_candidate(&generate_address()).unwrap();
        assert!(!meets_difficulty(candidate.get_hash(), MAX_DIFFICULTY));
        match net.ledger.commit_block(candidate) {
            Err(BlockchainError::InvalidBlock(msg)) => {
                assert!(msg.contains("does not meet difficulty"), "{msg}")
            }
            other => panic!("expected InvalidBlock, got {other:?}"),
        }
        assert_eq!(net.ledger.get_height(), 1);
    }

    #[test]
    fn test_tip_at_the_end_of_time_still_extends() {
        let clock = Arc::new(ManualClock::new(i64::MAX));
        let mut ledger = Blockchain::create_with_clock(test_config(), clock).unwrap();
        let block = ledger.mine_next_block(&generate_address(), None).unwrap();
        assert_eq!(block.get_timestamp(), i64::MAX);
        assert!(ledger.is_chain_valid());
    }

    #[test]
    fn test_candidate_with_forged_hash_is_rejected() {
        let mut net = TestChain::new();
        let mut candidate = net.ledger.prepare_candidate(&generate_address()).unwrap();
        candidate.set_hash("0".repeat(64));
        match net.ledger.commit_block(candidate) {
            Err(BlockchainError::InvalidBlock(msg)) => {
                assert!(msg.contains("does not match its contents"), "{msg}")
            }
            other => panic!("expected InvalidBlock, got {other:?}"),
        }
        assert_eq!(net.ledger.get_height(), 1);
    }

    #[test]
    fn test_overpaying_coinbase_is_rejected() {
        let mut net = TestChain::new();
        let height = net.ledger.get_height();
        let reward = net.ledger.block_reward(height);
        let latest = net.ledger.get_latest_block().unwrap().clone();
        let coinbase =
            Transaction::new_coinbase_tx(&generate_address(), reward + 1, latest.get_timestamp() + 1)
                .unwrap();
        let mut block = Block::new_block(
            height,
            latest.get_timestamp() + 1,
            vec![coinbase],
            latest.get_hash().to_string(),
            net.ledger.get_difficulty(),
        )
        .unwrap();
        block.mine(net.ledger.get_clock(), None).unwrap();

        let err = net.ledger.commit_block(block).unwrap_err();
        assert!(err.to_string().contains("Coinbase pays"), "{err}");
    }

    #[test]
    fn test_halving_schedule() {
        let config = ChainConfig {
            block_reward: 50 * SATOSHIS_PER_COIN,
            reward_halving_interval: 2,
            ..test_config()
        };
        let ledger = Blockchain::new(config).unwrap();
        let rewards: Vec<u64> = (0..6).map(|h| ledger.block_reward(h)).collect();
        assert_eq!(
            rewards,
            vec![
                50 * SATOSHIS_PER_COIN,
                50 * SATOSHIS_PER_COIN,
                25 * SATOSHIS_PER_COIN,
                25 * SATOSHIS_PER_COIN,
                1_250_000_000,
                1_250_000_000,
            ]
        );
    }

    #[test]
    fn test_reward_respects_max_supply() {
        let config = ChainConfig {
            block_reward: 40,
            reward_halving_interval: 0,
            max_supply: 100,
            ..test_config()
        };
        let ledger = Blockchain::new(config).unwrap();
        assert_eq!(ledger.block_reward(1), 40);
        assert_eq!(ledger.block_reward(2), 40);
        assert_eq!(ledger.block_reward(3), 20);
        assert_eq!(ledger.block_reward(4), 0);
    }

    #[test]
    fn test_difficulty_retargets_on_interval() {
        let config = ChainConfig {
            difficulty_adjustment_interval: 2,
            block_time_target_ms: 60_000,
            initial_difficulty: 1,
            ..test_config()
        };
        let mut net = TestChain::with_config(config);
        let miner = generate_address();
        // Frozen clock: blocks land 1ms apart, far faster than the target
        net.ledger.mine_next_block(&miner, None).unwrap();
        assert_eq!(net.ledger.get_difficulty(), 1);
        net.ledger.mine_next_block(&miner, None).unwrap();
        assert_eq!(net.ledger.get_difficulty(), 1);
        net.ledger.mine_next_block(&miner, None).unwrap();
        assert_eq!(net.ledger.get_height(), 4);
        assert_eq!(net.ledger.get_difficulty(), 2);
    }

    #[test]
    fn test_validate_chain_reports_first_broken_index() {
        let mut net = TestChain::new();
        let miner = generate_address();
        for _ in 0..3 {
            net.ledger.mine_next_block(&miner, None).unwrap();
        }
        assert!(net.ledger.validate_chain().is_ok());

        net.ledger.blocks_mut()[2].set_previous_hash("f".repeat(64));
        match net.ledger.validate_chain() {
            Err(BlockchainError::InvalidChain { index, .. }) => assert_eq!(index, 2),
            other => panic!("expected InvalidChain, got {other:?}"),
        }
    }

    #[test]
    fn test_is_output_spent_honours_exclusion() {
        let mut net = TestChain::funded(1_000);
        let outpoint = net.funding_outpoint();
        let tx = net.spend(&outpoint, &[(10, generate_address())]);
        net.ledger.add_transaction(tx.clone()).unwrap();

        let (id, idx) = (outpoint.get_source_tx_id(), outpoint.get_output_index());
        assert!(net.ledger.is_output_spent(id, idx, None));
        assert!(!net.ledger.is_output_spent(id, idx, Some(tx.get_id())));
    }

    #[test]
    fn test_duplicate_and_coinbase_admission() {
        let mut net = TestChain::funded(1_000);
        let tx = net.spend(&net.funding_outpoint(), &[(10, generate_address())]);
        net.ledger.add_transaction(tx.clone()).unwrap();
        assert_eq!(
            net.ledger.add_transaction(tx.clone()),
            Err(BlockchainError::InvalidTransaction(
                TransactionRejection::Duplicate(tx.get_id().to_string())
            ))
        );

        let coinbase = Transaction::new_coinbase_tx(&generate_address(), 5, 9).unwrap();
        assert!(matches!(
            net.ledger.add_transaction(coinbase),
            Err(BlockchainError::MalformedInput(_))
        ));
    }

    #[test]
    fn test_get_transaction_searches_chain_then_mempool() {
        let mut net = TestChain::funded(1_000);
        let funding_id = net.funding_outpoint().get_source_tx_id().to_string();
        assert_eq!(net.ledger.locate_transaction(&funding_id).map(|(i, _)| i), Some(1));

        let tx = net.spend(&net.funding_outpoint(), &[(10, generate_address())]);
        net.ledger.add_transaction(tx.clone()).unwrap();
        assert_eq!(net.ledger.get_transaction(tx.get_id()), Some(&tx));
        assert!(net.ledger.locate_transaction(tx.get_id()).is_none());
        assert!(net.ledger.get_transaction("missing").is_none());
    }
}
