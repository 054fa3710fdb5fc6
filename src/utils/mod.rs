//! Utility functions and helpers
//!
//! Hashing, JSON encoding and the clock abstraction shared by the ledger,
//! the wallet and the miners.

pub mod clock;
pub mod crypto;
pub mod serialization;

pub use clock::{Clock, ManualClock, SystemClock};
pub use crypto::{current_timestamp, hash_json, sha256_digest, sha256_hex};
pub use serialization::{from_json, to_canonical_json, to_pretty_json};
