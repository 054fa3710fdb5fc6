//! Test utilities for ledger testing

use crate::config::ChainConfig;
use crate::core::{Blockchain, TXInput, TXOutput, Transaction};
use crate::error::Result;
use crate::utils::{Clock, ManualClock};
use crate::wallet::{generate_address, Wallets};
use std::sync::Arc;
use tempfile::TempDir;

/// Fixed start time for deterministic chains
pub const TEST_EPOCH_MS: i64 = 1_700_000_000_000;

/// Chain parameters for fast tests: difficulty 1, no retarget in sight
pub fn test_config() -> ChainConfig {
    ChainConfig {
        initial_difficulty: 1,
        block_time_target_ms: 1_000,
        difficulty_adjustment_interval: 1_000,
        ..ChainConfig::default()
    }
}

/// Create a temporary directory for snapshot files
pub fn create_temp_dir() -> Result<TempDir> {
    tempfile::tempdir().map_err(|e| crate::error::BlockchainError::Io(e.to_string()))
}

/// Create test wallets for testing
pub fn create_test_wallets(count: usize) -> (Wallets, Vec<String>) {
    let mut wallets = Wallets::new();
    let addresses = (0..count)
        .map(|i| wallets.create_address(&format!("test-{i}"), TEST_EPOCH_MS))
        .collect();
    (wallets, addresses)
}

/// A ledger on a manual clock, optionally with one spendable coinbase.
pub struct TestChain {
    pub clock: Arc<ManualClock>,
    pub ledger: Blockchain,
    pub funded_address: String,
    funding_tx_id: Option<String>,
}

impl TestChain {
    pub fn new() -> TestChain {
        Self::with_config(test_config())
    }

    pub fn with_difficulty(difficulty: u32) -> TestChain {
        Self::with_config(ChainConfig {
            initial_difficulty: difficulty,
            ..test_config()
        })
    }

    /// Genesis only
    pub fn with_config(config: ChainConfig) -> TestChain {
        let clock = Arc::new(ManualClock::new(TEST_EPOCH_MS));
        let shared: Arc<dyn Clock> = clock.clone();
        let ledger = Blockchain::create_with_clock(config, shared).expect("test ledger");
        TestChain {
            clock,
            ledger,
            funded_address: generate_address(),
            funding_tx_id: None,
        }
    }

    /// Genesis plus one mined block whose coinbase pays exactly `amount`
    /// to `funded_address`.
    pub fn funded(amount: u64) -> TestChain {
        let mut net = Self::with_config(ChainConfig {
            block_reward: amount,
            reward_halving_interval: 0,
            ..test_config()
        });
        let block = net
            .ledger
            .mine_next_block(&net.funded_address.clone(), None)
            .expect("funding block");
        net.funding_tx_id = Some(block.get_transactions()[0].get_id().to_string());
        net
    }

    pub fn funding_outpoint(&self) -> TXInput {
        let id = self.funding_tx_id.as_deref().expect("chain is not funded");
        TXInput::new(id, 0)
    }

    /// Regular transaction spending `input`, stamped one tick later.
    pub fn spend(&self, input: &TXInput, outputs: &[(u64, String)]) -> Transaction {
        let outputs = outputs
            .iter()
            .map(|(amount, address)| TXOutput::new(*amount, address).expect("test address"))
            .collect();
        Transaction::new(vec![input.clone()], outputs, self.clock.advance(1)).expect("test tx")
    }
}

impl Default for TestChain {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_funded_chain_has_one_spendable_output() {
        let net = TestChain::funded(1_000);
        assert_eq!(net.ledger.get_height(), 2);
        assert!(net.ledger.is_chain_valid());

        let outpoint = net.funding_outpoint();
        let source = net
            .ledger
            .get_transaction(outpoint.get_source_tx_id())
            .unwrap();
        assert_eq!(source.get_outputs()[0].get_value(), 1_000);
        assert!(source.get_outputs()[0].is_locked_with(&net.funded_address));
    }

    #[test]
    fn test_spend_timestamps_are_distinct() {
        let net = TestChain::funded(10);
        let a = net.spend(&net.funding_outpoint(), &[(1, generate_address())]);
        let b = net.spend(&net.funding_outpoint(), &[(1, generate_address())]);
        assert!(b.get_timestamp() > a.get_timestamp());
    }

    #[test]
    fn test_create_test_wallets() {
        let (wallets, addresses) = create_test_wallets(5);
        assert_eq!(addresses.len(), 5);
        assert_eq!(wallets.get_addresses().len(), 5);

        // All addresses should be unique
        for i in 0..addresses.len() {
            for j in i + 1..addresses.len() {
                assert_ne!(addresses[i], addresses[j]);
            }
        }
    }
}
