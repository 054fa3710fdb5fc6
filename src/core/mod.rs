//! Core ledger functionality
//!
//! Blocks, transactions, the proof-of-work search, validation rules and the
//! ledger that ties them together.

pub mod block;
pub mod blockchain;
pub mod difficulty;
pub mod merkle;
pub mod monetary;
pub mod proof_of_work;
pub mod transaction;
pub mod validator;

pub use block::{Block, BlockHeader};
pub use blockchain::Blockchain;
pub use difficulty::DifficultyAdjustment;
pub use merkle::calculate_merkle_root;
pub use monetary::{INITIAL_BLOCK_REWARD, MAX_SUPPLY, MIN_TRANSACTION_FEE, SATOSHIS_PER_COIN};
pub use proof_of_work::{
    meets_difficulty, LogProgress, MiningProgress, MiningReport, NoProgress, NonceSearch,
    ProgressSink, PROGRESS_INTERVAL,
};
pub use transaction::{TXInput, TXOutput, Transaction};
pub use validator::TransactionValidator;
