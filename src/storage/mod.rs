//! Derived state and persistence
//!
//! The pending-transaction pool, the UTXO view derived from the chain, and
//! the JSON snapshot used to save and restore a ledger with its wallet.

pub mod memory_pool;
pub mod snapshot;
pub mod utxo_set;

pub use memory_pool::MemoryPool;
pub use snapshot::{Snapshot, WalletSnapshot, SNAPSHOT_VERSION};
pub use utxo_set::{UTXOSet, Utxo};
