//! JSON export and import of a ledger together with its wallet.
//!
//! Blocks and transactions are written with the same field names they are
//! hashed with, so a restored chain reproduces every hash bit for bit.

use crate::config::ChainConfig;
use crate::core::{Block, Blockchain, Transaction};
use crate::error::{BlockchainError, Result};
use crate::utils::{from_json, to_pretty_json, Clock};
use crate::wallet::{WalletAddress, Wallets};
use log::info;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::sync::Arc;

pub const SNAPSHOT_VERSION: u32 = 1;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WalletSnapshot {
    pub addresses: Vec<WalletAddress>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub version: u32,
    pub config: ChainConfig,
    pub chain: Vec<Block>,
    pub mempool: Vec<Transaction>,
    pub difficulty: u32,
    pub wallet: WalletSnapshot,
}

impl Snapshot {
    pub fn export(ledger: &Blockchain, wallets: &Wallets) -> Snapshot {
        Snapshot {
            version: SNAPSHOT_VERSION,
            config: ledger.get_config().clone(),
            chain: ledger.get_blocks().to_vec(),
            mempool: ledger.get_mempool().get_all().to_vec(),
            difficulty: ledger.get_difficulty(),
            wallet: WalletSnapshot {
                addresses: wallets.get_entries().to_vec(),
            },
        }
    }

    pub fn to_json(&self) -> Result<String> {
        to_pretty_json(self)
    }

    pub fn from_json(text: &str) -> Result<Snapshot> {
        let snapshot: Snapshot = from_json(text)?;
        if snapshot.version != SNAPSHOT_VERSION {
            return Err(BlockchainError::Serialization(format!(
                "Unsupported snapshot version {} (expected {SNAPSHOT_VERSION})",
                snapshot.version
            )));
        }
        Ok(snapshot)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        fs::write(path, self.to_json()?)?;
        info!(
            "Saved snapshot with {} blocks to {}",
            self.chain.len(),
            path.display()
        );
        Ok(())
    }

    pub fn load(path: &Path) -> Result<Snapshot> {
        let text = fs::read_to_string(path)?;
        let snapshot = Self::from_json(&text)?;
        info!(
            "Loaded snapshot with {} blocks from {}",
            snapshot.chain.len(),
            path.display()
        );
        Ok(snapshot)
    }

    /// Rebuilds the ledger and wallet, re-validating the chain and every
    /// pending transaction on the way in.
    pub fn restore(self, clock: Arc<dyn Clock>) -> Result<(Blockchain, Wallets)> {
        let ledger = Blockchain::from_parts(
            self.config,
            self.chain,
            self.mempool,
            self.difficulty,
            clock,
        )?;
        let mut wallets = Wallets::new();
        for entry in self.wallet.addresses {
            wallets.add_address(entry)?;
        }
        Ok((ledger, wallets))
    }
}
