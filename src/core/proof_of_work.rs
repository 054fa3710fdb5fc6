//! Proof-of-work predicate and the nonce search shared by every miner.
//!
//! Both the foreground and background miners drive the same [`NonceSearch`],
//! so for a given header they visit nonces 0, 1, 2, ... in the same order and
//! stop at the same first valid nonce.

use crate::core::BlockHeader;
use crate::error::{BlockchainError, Result};
use crate::utils::Clock;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Attempts between two progress reports
pub const PROGRESS_INTERVAL: u64 = 10_000;

/// True iff the first `difficulty` hex characters of `hash` are `'0'`.
pub fn meets_difficulty(hash: &str, difficulty: u32) -> bool {
    let required = difficulty as usize;
    required <= hash.len() && hash.bytes().take(required).all(|b| b == b'0')
}

/// Snapshot of a running search, emitted every [`PROGRESS_INTERVAL`] attempts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MiningProgress {
    pub attempts: u64,
    pub hash_rate: f64,
    pub elapsed_ms: i64,
    pub current_hash: String,
}

/// Terminal result of a successful search.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MiningReport {
    pub nonce: u64,
    pub hash: String,
    pub attempts: u64,
    pub hash_rate: f64,
    pub elapsed_ms: i64,
}

/// Receives progress snapshots. Implemented for any `FnMut(&MiningProgress)`.
pub trait ProgressSink {
    fn on_progress(&mut self, progress: &MiningProgress);
}

impl<F> ProgressSink for F
where
    F: FnMut(&MiningProgress),
{
    fn on_progress(&mut self, progress: &MiningProgress) {
        (self)(progress)
    }
}

/// Discards progress.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoProgress;

impl ProgressSink for NoProgress {
    fn on_progress(&mut self, _progress: &MiningProgress) {}
}

/// Writes progress to the log at debug level.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogProgress;

impl ProgressSink for LogProgress {
    fn on_progress(&mut self, progress: &MiningProgress) {
        log::debug!(
            "Mining: {} attempts, {:.0} H/s, {} ms, last hash {}",
            progress.attempts,
            progress.hash_rate,
            progress.elapsed_ms,
            progress.current_hash
        );
    }
}

pub(crate) fn hash_rate(attempts: u64, elapsed_ms: i64) -> f64 {
    attempts as f64 * 1000.0 / elapsed_ms.max(1) as f64
}

/// One hash-and-increment search over a private copy of a block header.
pub struct NonceSearch {
    header: BlockHeader,
    attempts: u64,
    started_at: i64,
    last_hash: String,
    clock: Arc<dyn Clock>,
}

impl NonceSearch {
    /// Starts at nonce 0 regardless of the nonce carried by `header`.
    pub fn new(mut header: BlockHeader, clock: Arc<dyn Clock>) -> NonceSearch {
        header.nonce = 0;
        let started_at = clock.now_ms();
        NonceSearch {
            header,
            attempts: 0,
            started_at,
            last_hash: String::new(),
            clock,
        }
    }

    /// Hashes the current nonce. Returns the report when it satisfies the
    /// difficulty, otherwise moves on to the next nonce.
    pub fn attempt(&mut self) -> Result<Option<MiningReport>> {
        let hash = self.header.compute_hash()?;
        self.attempts += 1;

        if meets_difficulty(&hash, self.header.difficulty) {
            let elapsed_ms = self.elapsed_ms();
            return Ok(Some(MiningReport {
                nonce: self.header.nonce,
                hash,
                attempts: self.attempts,
                hash_rate: hash_rate(self.attempts, elapsed_ms),
                elapsed_ms,
            }));
        }

        self.last_hash = hash;
        self.header.nonce = self
            .header
            .nonce
            .checked_add(1)
            .ok_or_else(|| BlockchainError::Mining("Nonce space exhausted".to_string()))?;
        Ok(None)
    }

    pub fn attempts(&self) -> u64 {
        self.attempts
    }

    pub fn current_nonce(&self) -> u64 {
        self.header.nonce
    }

    pub fn progress_due(&self) -> bool {
        self.attempts > 0 && self.attempts % PROGRESS_INTERVAL == 0
    }

    pub fn progress(&self) -> MiningProgress {
        let elapsed_ms = self.elapsed_ms();
        MiningProgress {
            attempts: self.attempts,
            hash_rate: hash_rate(self.attempts, elapsed_ms),
            elapsed_ms,
            current_hash: self.last_hash.clone(),
        }
    }

    fn elapsed_ms(&self) -> i64 {
        self.clock.now_ms().saturating_sub(self.started_at).max(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::ManualClock;
    use proptest::prelude::*;

    fn header(difficulty: u32) -> BlockHeader {
        BlockHeader {
            index: 1,
            timestamp: 1_700_000_000_000,
            merkle_root: "ab".repeat(32),
            previous_hash: "0".to_string(),
            difficulty,
            nonce: 99,
        }
    }

    #[test]
    fn test_meets_difficulty() {
        assert!(meets_difficulty("00ab", 0));
        assert!(meets_difficulty("00ab", 2));
        assert!(!meets_difficulty("00ab", 3));
        assert!(!meets_difficulty("0", 2));
        assert!(!meets_difficulty("a000", 1));
    }

    #[test]
    fn test_search_finds_first_valid_nonce() {
        let clock: Arc<dyn Clock> = Arc::new(ManualClock::new(0));
        let mut search = NonceSearch::new(header(2), clock);
        assert_eq!(search.current_nonce(), 0);

        let report = loop {
            if let Some(report) = search.attempt().unwrap() {
                break report;
            }
        };

        assert_eq!(report.attempts, report.nonce + 1);
        let mut solved = header(2);
        solved.nonce = report.nonce;
        assert_eq!(solved.compute_hash().unwrap(), report.hash);
        assert!(meets_difficulty(&report.hash, 2));

        for earlier in 0..report.nonce {
            let mut candidate = header(2);
            candidate.nonce = earlier;
            assert!(!meets_difficulty(&candidate.compute_hash().unwrap(), 2));
        }
    }

    #[test]
    fn test_progress_cadence_and_rate() {
        let clock = Arc::new(ManualClock::new(0));
        let mut search = NonceSearch::new(header(64), clock.clone());
        for _ in 0..PROGRESS_INTERVAL - 1 {
            assert!(search.attempt().unwrap().is_none());
            assert!(!search.progress_due());
        }
        search.attempt().unwrap();
        assert!(search.progress_due());

        clock.set(2_000);
        let progress = search.progress();
        assert_eq!(progress.attempts, PROGRESS_INTERVAL);
        assert_eq!(progress.elapsed_ms, 2_000);
        assert_eq!(progress.hash_rate, 5_000.0);
        assert_eq!(progress.current_hash.len(), 64);
    }

    #[test]
    fn test_closure_is_a_progress_sink() {
        let mut seen = Vec::new();
        {
            let mut sink = |p: &MiningProgress| seen.push(p.attempts);
            sink.on_progress(&MiningProgress {
                attempts: 3,
                hash_rate: 1.0,
                elapsed_ms: 1,
                current_hash: String::new(),
            });
        }
        assert_eq!(seen, vec![3]);
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(32))]

        #[test]
        fn prop_found_nonce_is_the_first_valid_one(
            index in 0u64..1_000,
            timestamp in 0i64..2_000_000_000_000,
            difficulty in 0u32..=2,
        ) {
            let header = BlockHeader {
                index,
                timestamp,
                merkle_root: "cd".repeat(32),
                previous_hash: "ef".repeat(32),
                difficulty,
                nonce: 0,
            };
            let clock: Arc<dyn Clock> = Arc::new(ManualClock::new(0));
            let mut search = NonceSearch::new(header.clone(), clock);
            let report = loop {
                if let Some(report) = search.attempt().unwrap() {
                    break report;
                }
            };

            prop_assert!(meets_difficulty(&report.hash, difficulty));
            for earlier in 0..report.nonce {
                let mut candidate = header.clone();
                candidate.nonce = earlier;
                prop_assert!(!meets_difficulty(&candidate.compute_hash().unwrap(), difficulty));
            }
        }
    }
}
