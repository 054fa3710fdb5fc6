//! Scheduling policies over the shared nonce search.
//!
//! A strategy owns one [`NonceSearch`] and decides only how fast it is
//! stepped and when it gives up. Every strategy visits nonces in the same
//! order, so they agree on the first valid nonce for a header.

use crate::config::MAX_TARGET_HASH_RATE;
use crate::core::{BlockHeader, MiningProgress, MiningReport, NonceSearch};
use crate::error::{BlockchainError, Result};
use crate::utils::Clock;
use std::sync::Arc;
use std::time::Duration;

pub trait MiningStrategy: Send {
    /// Delay the caller should leave between two steps.
    fn pacing(&self) -> Duration;

    /// Tries one nonce. `None` while the search goes on; a terminal result
    /// once a nonce is found or the strategy gives up.
    fn step(&mut self) -> Option<Result<MiningReport>>;

    /// Progress snapshot produced by the last step, if one was due.
    fn take_progress(&mut self) -> Option<MiningProgress>;

    fn attempts(&self) -> u64;
}

// One attempt, stashing a progress snapshot on the reporting cadence
fn advance(
    search: &mut NonceSearch,
    pending: &mut Option<MiningProgress>,
) -> Option<Result<MiningReport>> {
    match search.attempt() {
        Ok(Some(report)) => Some(Ok(report)),
        Ok(None) => {
            if search.progress_due() {
                *pending = Some(search.progress());
            }
            None
        }
        Err(e) => Some(Err(e)),
    }
}

/// Foreground search limited to `target_rate` attempts per second.
pub struct ThrottledStrategy {
    search: NonceSearch,
    interval: Duration,
    pending: Option<MiningProgress>,
}

impl ThrottledStrategy {
    /// The rate is clamped into `1..=MAX_TARGET_HASH_RATE`.
    pub fn new(header: BlockHeader, clock: Arc<dyn Clock>, target_rate: u32) -> ThrottledStrategy {
        let rate = target_rate.clamp(1, MAX_TARGET_HASH_RATE);
        ThrottledStrategy {
            search: NonceSearch::new(header, clock),
            interval: Duration::from_nanos(1_000_000_000 / u64::from(rate)),
            pending: None,
        }
    }
}

impl MiningStrategy for ThrottledStrategy {
    fn pacing(&self) -> Duration {
        self.interval
    }

    fn step(&mut self) -> Option<Result<MiningReport>> {
        advance(&mut self.search, &mut self.pending)
    }

    fn take_progress(&mut self) -> Option<MiningProgress> {
        self.pending.take()
    }

    fn attempts(&self) -> u64 {
        self.search.attempts()
    }
}

/// Back-to-back search, optionally bounded by an attempt ceiling.
pub struct UnthrottledStrategy {
    search: NonceSearch,
    attempt_limit: Option<u64>,
    pending: Option<MiningProgress>,
}

impl UnthrottledStrategy {
    pub fn new(
        header: BlockHeader,
        clock: Arc<dyn Clock>,
        attempt_limit: Option<u64>,
    ) -> UnthrottledStrategy {
        UnthrottledStrategy {
            search: NonceSearch::new(header, clock),
            attempt_limit,
            pending: None,
        }
    }
}

impl MiningStrategy for UnthrottledStrategy {
    fn pacing(&self) -> Duration {
        Duration::ZERO
    }

    fn step(&mut self) -> Option<Result<MiningReport>> {
        if let Some(limit) = self.attempt_limit {
            if self.search.attempts() >= limit {
                return Some(Err(BlockchainError::ExcessiveAttempts {
                    attempts: self.search.attempts(),
                }));
            }
        }
        advance(&mut self.search, &mut self.pending)
    }

    fn take_progress(&mut self) -> Option<MiningProgress> {
        self.pending.take()
    }

    fn attempts(&self) -> u64 {
        self.search.attempts()
    }
}
