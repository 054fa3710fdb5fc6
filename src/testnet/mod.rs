//! Deterministic fixtures for unit tests
//!
//! Small ledgers on a manual clock, funded outputs to spend, and throwaway
//! wallets and directories.

pub mod test_utils;

pub use test_utils::*;
