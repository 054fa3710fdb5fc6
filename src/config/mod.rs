//! Configuration management
//!
//! Chain parameters, miner pacing and the snapshot location. Loaded from a
//! TOML file with environment overrides; no process-wide globals.

pub mod settings;

pub use settings::{
    ChainConfig, MinerConfig, Settings, BACKGROUND_ATTEMPT_LIMIT, MAX_DIFFICULTY,
    MAX_TARGET_HASH_RATE,
};
