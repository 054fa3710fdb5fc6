//! Address book and payments
//!
//! Addresses are random base58 identifiers. A wallet is the list of
//! addresses it recognises; it reads balances from the ledger and submits
//! payments through the mempool.

pub mod address;
pub mod wallets;

pub use address::{generate_address, validate_address, ADDRESS_LEN, ADDRESS_PREFIX, GENESIS_ADDRESS};
pub use wallets::{HistoryEntry, HistoryKind, WalletAddress, Wallets};
