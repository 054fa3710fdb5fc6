use crate::config::{ChainConfig, MAX_DIFFICULTY};
use crate::core::Block;
use log::info;

// Ratio thresholds of the retarget policy
const COARSE_SLOW: f64 = 1.5;
const COARSE_FAST: f64 = 0.5;
const FINE_SLOW: f64 = 1.2;
const FINE_FAST: f64 = 0.8;

const MIN_DIFFICULTY: u32 = 1;

/// Difficulty adjustment algorithm for maintaining consistent block times
pub struct DifficultyAdjustment;

impl DifficultyAdjustment {
    /// A retarget is due once the chain length is a multiple of the interval
    /// and there are more than `interval` blocks to measure.
    pub fn is_due(chain_len: usize, interval: u64) -> bool {
        let len = chain_len as u64;
        interval > 0 && len % interval == 0 && len > interval
    }

    /// Next difficulty for `chain`, or `None` when no retarget is due.
    pub fn calculate_next_difficulty(
        chain: &[Block],
        current_difficulty: u32,
        config: &ChainConfig,
    ) -> Option<u32> {
        let interval = config.difficulty_adjustment_interval;
        if !Self::is_due(chain.len(), interval) {
            return None;
        }

        let actual_time = Self::calculate_time_span(chain, interval as usize)?;
        let target_time = config
            .block_time_target_ms
            .saturating_mul(interval)
            .max(1);

        let new_difficulty = Self::adjust_difficulty(
            current_difficulty,
            actual_time,
            target_time,
            config.max_difficulty_change_factor,
        );

        info!(
            "Difficulty adjustment at height {}: {current_difficulty} -> {new_difficulty} (actual: {actual_time}ms, target: {target_time}ms)",
            chain.len()
        );
        Some(new_difficulty)
    }

    /// Timestamp span of the last `interval` blocks, measured from the block
    /// just before them.
    fn calculate_time_span(chain: &[Block], interval: usize) -> Option<u64> {
        let last = chain.last()?;
        let first = chain.get(chain.len().checked_sub(interval + 1)?)?;
        Some(last.get_timestamp().saturating_sub(first.get_timestamp()).max(0) as u64)
    }

    /// Coarse rule first, fine rule only when the coarse rule did not fire,
    /// then clamp into `[max(1, ceil(old / factor)), floor(old * factor)]`.
    pub fn adjust_difficulty(
        current_difficulty: u32,
        actual_time: u64,
        target_time: u64,
        max_change_factor: f64,
    ) -> u32 {
        let ratio = actual_time as f64 / target_time.max(1) as f64;

        let proposed = if ratio > COARSE_SLOW {
            current_difficulty.saturating_sub(1).max(MIN_DIFFICULTY)
        } else if ratio < COARSE_FAST {
            current_difficulty.saturating_add(1)
        } else if ratio > FINE_SLOW {
            current_difficulty.saturating_sub(1)
        } else if ratio < FINE_FAST {
            current_difficulty.saturating_add(1)
        } else {
            current_difficulty
        };

        let (lower, upper) = Self::bounds(current_difficulty, max_change_factor);
        proposed.clamp(lower, upper)
    }

    /// Inclusive range a single retarget may move `current_difficulty` into.
    pub fn bounds(current_difficulty: u32, max_change_factor: f64) -> (u32, u32) {
        let factor = if max_change_factor.is_finite() {
            max_change_factor.max(1.0)
        } else {
            1.0
        };
        let old = current_difficulty as f64;
        let lower = ((old / factor).ceil() as u32).max(MIN_DIFFICULTY);
        let upper = ((old * factor).floor() as u32).clamp(lower, MAX_DIFFICULTY.max(lower));
        (lower, upper)
    }
}
