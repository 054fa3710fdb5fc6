use crate::core::merkle::calculate_merkle_root;
use crate::core::proof_of_work::{meets_difficulty, MiningReport, NonceSearch, ProgressSink};
use crate::core::Transaction;
use crate::error::{BlockchainError, Result};
use crate::utils::{hash_json, Clock};
use log::info;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// The hashed part of a block, in hashing order.
///
/// Miners work on an owned copy of this struct and never see the block's
/// transactions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlockHeader {
    pub index: u64,
    pub timestamp: i64,
    pub merkle_root: String,
    pub previous_hash: String,
    pub difficulty: u32,
    pub nonce: u64,
}

impl BlockHeader {
    pub fn compute_hash(&self) -> Result<String> {
        hash_json(self)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Block {
    index: u64,
    timestamp: i64,
    transactions: Vec<Transaction>,
    previous_hash: String,
    difficulty: u32,
    nonce: u64,
    merkle_root: String,
    hash: String,
}

impl Block {
    /// Unmined block: nonce 0, merkle root and hash computed.
    pub fn new_block(
        index: u64,
        timestamp: i64,
        transactions: Vec<Transaction>,
        previous_hash: String,
        difficulty: u32,
    ) -> Result<Block> {
        let merkle_root = calculate_merkle_root(&transactions);
        let mut block = Block {
            index,
            timestamp,
            transactions,
            previous_hash,
            difficulty,
            nonce: 0,
            merkle_root,
            hash: String::new(),
        };
        block.recompute_hash()?;
        Ok(block)
    }

    /// Block 0. Difficulty 0 means its hash satisfies the predicate trivially.
    pub fn generate_genesis_block(timestamp: i64) -> Result<Block> {
        let marker = Transaction::new_genesis_tx(timestamp)?;
        Block::new_block(0, timestamp, vec![marker], String::from("0"), 0)
    }

    pub fn header(&self) -> BlockHeader {
        BlockHeader {
            index: self.index,
            timestamp: self.timestamp,
            merkle_root: self.merkle_root.clone(),
            previous_hash: self.previous_hash.clone(),
            difficulty: self.difficulty,
            nonce: self.nonce,
        }
    }

    pub fn recompute_hash(&mut self) -> Result<&str> {
        self.hash = self.header().compute_hash()?;
        Ok(self.hash.as_str())
    }

    /// Checks, in order: stored hash, difficulty, merkle root.
    pub fn validate(&self) -> Result<()> {
        let recomputed = self.header().compute_hash()?;
        if recomputed != self.hash {
            return Err(BlockchainError::InvalidBlock(format!(
                "block {} hash {} does not match its contents ({recomputed})",
                self.index, self.hash
            )));
        }
        if !meets_difficulty(&self.hash, self.difficulty) {
            return Err(BlockchainError::InvalidBlock(format!(
                "block {} hash {} does not meet difficulty {}",
                self.index, self.hash, self.difficulty
            )));
        }
        if calculate_merkle_root(&self.transactions) != self.merkle_root {
            return Err(BlockchainError::InvalidBlock(format!(
                "block {} merkle root does not match its transactions",
                self.index
            )));
        }
        Ok(())
    }

    pub fn is_valid(&self) -> bool {
        self.validate().is_ok()
    }

    /// Reference foreground search. Unbounded; reports progress every
    /// `PROGRESS_INTERVAL` attempts without changing the search order.
    pub fn mine(
        &mut self,
        clock: Arc<dyn Clock>,
        mut progress: Option<&mut dyn ProgressSink>,
    ) -> Result<MiningReport> {
        info!(
            "Starting proof-of-work for block {} with difficulty {}",
            self.index, self.difficulty
        );
        let mut search = NonceSearch::new(self.header(), clock);
        let report = loop {
            if let Some(report) = search.attempt()? {
                break report;
            }
            if search.progress_due() {
                if let Some(sink) = progress.as_mut() {
                    sink.on_progress(&search.progress());
                }
            }
        };
        self.apply_solution(&report)?;
        info!(
            "Proof-of-work completed for block {}: {} after {} attempts",
            self.index, self.hash, report.attempts
        );
        Ok(report)
    }

    /// Installs a nonce found by any miner, checking it reproduces the hash.
    pub fn apply_solution(&mut self, report: &MiningReport) -> Result<()> {
        self.nonce = report.nonce;
        let hash = self.recompute_hash()?.to_string();
        if hash != report.hash {
            return Err(BlockchainError::Mining(format!(
                "nonce {} yields {hash}, not the reported {}",
                report.nonce, report.hash
            )));
        }
        if !meets_difficulty(&hash, self.difficulty) {
            return Err(BlockchainError::Mining(format!(
                "nonce {} does not satisfy difficulty {}",
                report.nonce, self.difficulty
            )));
        }
        Ok(())
    }

    pub fn get_index(&self) -> u64 {
        self.index
    }

    pub fn get_timestamp(&self) -> i64 {
        self.timestamp
    }

    pub fn get_transactions(&self) -> &[Transaction] {
        self.transactions.as_slice()
    }

    pub fn get_previous_hash(&self) -> &str {
        self.previous_hash.as_str()
    }

    pub fn get_difficulty(&self) -> u32 {
        self.difficulty
    }

    pub fn get_nonce(&self) -> u64 {
        self.nonce
    }

    pub fn get_merkle_root(&self) -> &str {
        self.merkle_root.as_str()
    }

    pub fn get_hash(&self) -> &str {
        self.hash.as_str()
    }

    #[cfg(test)]
    pub(crate) fn set_hash(&mut self, hash: String) {
        self.hash = hash;
    }

    #[cfg(test)]
    pub(crate) fn set_previous_hash(&mut self, previous_hash: String) {
        self.previous_hash = previous_hash;
    }

    #[cfg(test)]
    pub(crate) fn transactions_mut(&mut self) -> &mut Vec<Transaction> {
        &mut self.transactions
    }
}
