//! Monetary units and the block subsidy schedule
//!
//! All amounts are integral base units. One coin is 100,000,000 units, so
//! halving a 50-coin reward twice yields exactly 12.5 coins.

/// Number of base units in one coin
pub const SATOSHIS_PER_COIN: u64 = 100_000_000;

/// Default block reward (50 coins)
pub const INITIAL_BLOCK_REWARD: u64 = 50 * SATOSHIS_PER_COIN;

/// Default cap on the total subsidy ever issued (21 million coins)
pub const MAX_SUPPLY: u64 = 21_000_000 * SATOSHIS_PER_COIN;

/// Default fee attached by the wallet when the caller gives none
pub const MIN_TRANSACTION_FEE: u64 = 1_000;

/// Number of halvings after which the reward is defined as zero
const MAX_HALVINGS: u64 = 64;

/// Subsidy for a block at `height` before the supply cap is applied.
///
/// `reward = base / 2^floor(height / interval)`; an interval of zero
/// disables halving.
pub fn halved_reward(base_reward: u64, halving_interval: u64, height: u64) -> u64 {
    if halving_interval == 0 {
        return base_reward;
    }
    let halvings = height / halving_interval;
    if halvings >= MAX_HALVINGS {
        return 0;
    }
    base_reward >> halvings
}

/// Subsidy for `height` once `already_issued` units exist, never pushing the
/// total past `max_supply`.
pub fn capped_reward(reward: u64, already_issued: u64, max_supply: u64) -> u64 {
    reward.min(max_supply.saturating_sub(already_issued))
}

pub mod conversions {
    use super::*;

    pub fn coins_to_satoshis(coins: f64) -> u64 {
        (coins * SATOSHIS_PER_COIN as f64).round() as u64
    }

    pub fn satoshis_to_coins(satoshis: u64) -> f64 {
        satoshis as f64 / SATOSHIS_PER_COIN as f64
    }

    /// # Examples
    /// ```
    /// use forge_chain::core::monetary::conversions::format_satoshis;
    /// assert_eq!(format_satoshis(1_250_000_000), "12.50000000 coins");
    /// ```
    pub fn format_satoshis(satoshis: u64) -> String {
        format!("{:.8} coins", satoshis_to_coins(satoshis))
    }
}
