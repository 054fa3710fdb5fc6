//! Time source used for block timestamps and mining elapsed time.

use crate::utils::current_timestamp;
use std::sync::atomic::{AtomicI64, Ordering};

/// Millisecond wall clock consumed by the ledger and the miners.
pub trait Clock: Send + Sync {
    fn now_ms(&self) -> i64;
}

/// Reads the system clock.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_ms(&self) -> i64 {
        match current_timestamp() {
            Ok(now) => now,
            Err(e) => {
                log::error!("Falling back to epoch timestamp: {e}");
                0
            }
        }
    }
}

/// Clock that only moves when told to. Used for deterministic simulations.
#[derive(Debug, Default)]
pub struct ManualClock {
    now: AtomicI64,
}

impl ManualClock {
    pub fn new(start_ms: i64) -> ManualClock {
        ManualClock {
            now: AtomicI64::new(start_ms),
        }
    }

    pub fn set(&self, now_ms: i64) {
        self.now.store(now_ms, Ordering::SeqCst);
    }

    pub fn advance(&self, delta_ms: i64) -> i64 {
        self.now.fetch_add(delta_ms, Ordering::SeqCst) + delta_ms
    }
}

impl Clock for ManualClock {
    fn now_ms(&self) -> i64 {
        self.now.load(Ordering::SeqCst)
    }
}
