use crate::core::monetary::{INITIAL_BLOCK_REWARD, MAX_SUPPLY, MIN_TRANSACTION_FEE};
use crate::error::{BlockchainError, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

static DEFAULT_SNAPSHOT_PATH: &str = "chain.json";

const SNAPSHOT_PATH_KEY: &str = "FORGE_SNAPSHOT";
const TARGET_HASH_RATE_KEY: &str = "FORGE_TARGET_HASH_RATE";

/// Highest difficulty a 64-character hex hash can express
pub const MAX_DIFFICULTY: u32 = 64;

/// Attempts per second above which the throttled miner stops throttling
pub const MAX_TARGET_HASH_RATE: u32 = 100_000;

/// Hard ceiling for the background search
pub const BACKGROUND_ATTEMPT_LIMIT: u64 = 10_000_000;

/// Chain economics and retarget parameters. Immutable once a chain exists.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ChainConfig {
    pub block_time_target_ms: u64,
    pub initial_difficulty: u32,
    pub block_reward: u64,
    pub reward_halving_interval: u64,
    pub max_supply: u64,
    pub difficulty_adjustment_interval: u64,
    pub min_transaction_fee: u64,
    pub max_difficulty_change_factor: f64,
}

impl Default for ChainConfig {
    fn default() -> Self {
        Self {
            block_time_target_ms: 10_000,
            initial_difficulty: 3,
            block_reward: INITIAL_BLOCK_REWARD,
            reward_halving_interval: 210,
            max_supply: MAX_SUPPLY,
            difficulty_adjustment_interval: 10,
            min_transaction_fee: MIN_TRANSACTION_FEE,
            max_difficulty_change_factor: 4.0,
        }
    }
}

impl ChainConfig {
    pub fn validate(&self) -> Result<()> {
        if self.block_time_target_ms == 0 {
            return Err(BlockchainError::Config(
                "blockTimeTargetMs must be positive".to_string(),
            ));
        }
        if !(1..=MAX_DIFFICULTY).contains(&self.initial_difficulty) {
            return Err(BlockchainError::Config(format!(
                "initialDifficulty {} is outside [1, {MAX_DIFFICULTY}]",
                self.initial_difficulty
            )));
        }
        if self.difficulty_adjustment_interval == 0 {
            return Err(BlockchainError::Config(
                "difficultyAdjustmentInterval must be positive".to_string(),
            ));
        }
        if !self.max_difficulty_change_factor.is_finite() || self.max_difficulty_change_factor < 1.0
        {
            return Err(BlockchainError::Config(format!(
                "maxDifficultyChangeFactor must be a finite number >= 1, got {}",
                self.max_difficulty_change_factor
            )));
        }
        Ok(())
    }
}

/// How the miner paces its search
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MinerConfig {
    /// 0 runs the unrestricted background search, anything else throttles
    pub target_hash_rate: u32,
    /// Ceiling for the background search
    pub attempt_limit: u64,
}

impl Default for MinerConfig {
    fn default() -> Self {
        Self {
            target_hash_rate: 0,
            attempt_limit: BACKGROUND_ATTEMPT_LIMIT,
        }
    }
}

/// Everything the command-line front end needs, loaded from TOML.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Settings {
    pub chain: ChainConfig,
    pub miner: MinerConfig,
    pub snapshot_path: PathBuf,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            chain: ChainConfig::default(),
            miner: MinerConfig::default(),
            snapshot_path: PathBuf::from(DEFAULT_SNAPSHOT_PATH),
        }
    }
}

impl Settings {
    pub fn from_toml_str(text: &str) -> Result<Settings> {
        let settings: Settings = toml::from_str(text)?;
        settings.chain.validate()?;
        Ok(settings)
    }

    pub fn load(path: &Path) -> Result<Settings> {
        let text = fs::read_to_string(path).map_err(|e| {
            BlockchainError::Config(format!("Failed to read {}: {e}", path.display()))
        })?;
        let mut settings = Self::from_toml_str(&text)?;
        settings.apply_env_overrides()?;
        log::info!("Loaded settings from {}", path.display());
        Ok(settings)
    }

    /// Defaults plus environment overrides, used when no file is given
    pub fn from_env() -> Result<Settings> {
        let mut settings = Settings::default();
        settings.apply_env_overrides()?;
        Ok(settings)
    }

    pub fn apply_env_overrides(&mut self) -> Result<()> {
        if let Ok(path) = env::var(SNAPSHOT_PATH_KEY) {
            self.snapshot_path = PathBuf::from(path);
        }
        if let Ok(rate) = env::var(TARGET_HASH_RATE_KEY) {
            self.miner.target_hash_rate = rate.parse().map_err(|e| {
                BlockchainError::Config(format!("Invalid {TARGET_HASH_RATE_KEY} '{rate}': {e}"))
            })?;
        }
        Ok(())
    }
}
