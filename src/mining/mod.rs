//! Proof-of-work mining
//!
//! Throttled and unthrottled strategies over one shared nonce search, a
//! background worker thread, and the [`Miner`] state machine that commits
//! what they find.

pub mod miner;
pub mod strategy;
pub mod worker;

pub use miner::{MinedBlock, Miner, MinerStatus, MiningMode};
pub use strategy::{MiningStrategy, ThrottledStrategy, UnthrottledStrategy};
pub use tokio_util::sync::CancellationToken;
pub use worker::{BackgroundWorker, WorkerEvent};
