//! # Forge Chain
//!
//! A single-node proof-of-work ledger. I keep everything in memory and
//! persist it as one JSON snapshot.
//!
//! ## What is in here
//! - **Ledger**: hash-linked blocks, leading-zero proof of work and a
//!   bounded difficulty retarget
//! - **UTXO model**: outputs are spent by (transaction id, index); the
//!   validator refuses tampered ids, dangling references, double spends and
//!   overspends
//! - **Economics**: halving block reward capped by a maximum supply, plus
//!   the fees of the included transactions
//! - **Wallet**: an address book that reads balances off the chain and
//!   builds payments with change
//! - **Mining**: throttled or immediate foreground search, or a background
//!   worker thread, all visiting nonces in the same order
//!
//! ## Layout
//! - `core/`: blocks, transactions, proof of work, validation and the ledger
//! - `mining/`: strategies, the background worker and the `Miner` sessions
//! - `storage/`: mempool, UTXO view and the JSON snapshot
//! - `wallet/`: address generation and the wallet
//! - `config/`: chain and miner settings loaded from TOML
//! - `utils/`: hashing, JSON helpers and the clock
//! - `cli/`: command-line front end

pub mod cli;
pub mod config;
pub mod core;
pub mod error;
pub mod mining;
pub mod storage;
pub mod utils;
pub mod wallet;

#[cfg(test)]
pub mod testnet;

// Re-export commonly used types for convenience
pub use cli::{Command, Opt, Workspace};
pub use config::{ChainConfig, MinerConfig, Settings};
pub use core::{
    Block, BlockHeader, Blockchain, LogProgress, MiningProgress, MiningReport, NoProgress,
    ProgressSink, TXInput, TXOutput, Transaction, TransactionValidator,
};
pub use error::{BlockchainError, Result, TransactionRejection};
pub use mining::{CancellationToken, MinedBlock, Miner, MinerStatus, MiningMode};
pub use storage::{MemoryPool, Snapshot, UTXOSet, Utxo};
pub use utils::{Clock, ManualClock, SystemClock};
pub use wallet::{generate_address, validate_address, HistoryEntry, HistoryKind, Wallets};
