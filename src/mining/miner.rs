//! Mining controller.
//!
//! A [`Miner`] runs at most one session at a time. A session is
//! `Searching` until it ends as `Found`, `Failed` or `Cancelled`; only
//! `Found` touches the ledger, through [`Blockchain::commit_block`].

use crate::config::MinerConfig;
use crate::core::{
    Block, BlockHeader, Blockchain, MiningProgress, MiningReport, ProgressSink, PROGRESS_INTERVAL,
};
use crate::error::{BlockchainError, Result};
use crate::mining::strategy::{MiningStrategy, ThrottledStrategy, UnthrottledStrategy};
use crate::mining::worker::{BackgroundWorker, WorkerEvent};
use log::{info, warn};
use std::thread;
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

// Longest the run loop sleeps before re-checking for cancellation
const MAX_NAP: Duration = Duration::from_millis(50);
const BACKGROUND_POLL: Duration = Duration::from_millis(5);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MiningMode {
    /// Foreground, one attempt per `1 / target_rate` seconds
    Throttled { target_rate: u32 },
    /// Foreground, back to back
    Immediate,
    /// Dedicated thread with an attempt ceiling
    Background,
}

impl MiningMode {
    /// `0` selects the background search, anything else throttles.
    pub fn from_target_rate(target_rate: u32) -> MiningMode {
        match target_rate {
            0 => MiningMode::Background,
            target_rate => MiningMode::Throttled { target_rate },
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct MinedBlock {
    pub index: u64,
    pub hash: String,
    pub report: MiningReport,
}

#[derive(Debug, Clone, PartialEq)]
pub enum MinerStatus {
    Idle,
    /// Still searching; carries the newest progress seen by this poll
    Searching(Option<MiningProgress>),
    Found(MinedBlock),
    Failed(BlockchainError),
    Cancelled,
}

impl MinerStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            MinerStatus::Found(_) | MinerStatus::Failed(_) | MinerStatus::Cancelled
        )
    }
}

enum Job {
    Foreground {
        strategy: Box<dyn MiningStrategy>,
        next_step_at: Instant,
    },
    Background {
        worker: BackgroundWorker,
        header: Option<BlockHeader>,
    },
}

struct Session {
    id: Uuid,
    candidate: Block,
    job: Job,
    cancel: CancellationToken,
}

impl Session {
    fn shutdown(&mut self) {
        self.cancel.cancel();
        if let Job::Background { worker, .. } = &mut self.job {
            worker.terminate();
        }
    }
}

pub struct Miner {
    mode: MiningMode,
    attempt_limit: u64,
    session: Option<Session>,
}

impl Miner {
    pub fn new(mode: MiningMode, attempt_limit: u64) -> Miner {
        Miner {
            mode,
            attempt_limit,
            session: None,
        }
    }

    pub fn from_config(config: &MinerConfig) -> Miner {
        Self::new(
            MiningMode::from_target_rate(config.target_hash_rate),
            config.attempt_limit,
        )
    }

    pub fn mode(&self) -> MiningMode {
        self.mode
    }

    pub fn is_mining(&self) -> bool {
        self.session.is_some()
    }

    pub fn session_id(&self) -> Option<Uuid> {
        self.session.as_ref().map(|s| s.id)
    }

    /// Token of the running session; cancelling it from any thread ends the
    /// session at the next poll.
    pub fn cancellation_token(&self) -> Option<CancellationToken> {
        self.session.as_ref().map(|s| s.cancel.clone())
    }

    /// Prepares a candidate on top of the ledger's tip and starts searching.
    pub fn start(&mut self, ledger: &Blockchain, miner_address: &str) -> Result<Uuid> {
        if self.session.is_some() {
            return Err(BlockchainError::InvalidState(
                "A mining session is already running".to_string(),
            ));
        }

        let candidate = ledger.prepare_candidate(miner_address)?;
        let header = candidate.header();
        let clock = ledger.get_clock();
        let cancel = CancellationToken::new();

        let job = match self.mode {
            MiningMode::Throttled { target_rate } => Job::Foreground {
                strategy: Box::new(ThrottledStrategy::new(header, clock, target_rate)),
                next_step_at: Instant::now(),
            },
            MiningMode::Immediate => Job::Foreground {
                strategy: Box::new(UnthrottledStrategy::new(header, clock, None)),
                next_step_at: Instant::now(),
            },
            MiningMode::Background => Job::Background {
                worker: BackgroundWorker::spawn(clock, Some(self.attempt_limit), cancel.clone())?,
                header: Some(header),
            },
        };

        let id = Uuid::new_v4();
        info!(
            "Mining session {id} started for block {} at difficulty {} ({:?})",
            candidate.get_index(),
            candidate.get_difficulty(),
            self.mode
        );
        self.session = Some(Session {
            id,
            candidate,
            job,
            cancel,
        });
        Ok(id)
    }

    /// Advances the session without blocking for long. Foreground modes take
    /// the steps that are due; the background mode drains worker events.
    pub fn poll(&mut self, ledger: &mut Blockchain, progress: &mut dyn ProgressSink) -> MinerStatus {
        let session = match self.session.as_mut() {
            Some(session) => session,
            None => return MinerStatus::Idle,
        };
        if session.cancel.is_cancelled() {
            return self.stop();
        }

        let mut latest = None;
        let outcome = match &mut session.job {
            Job::Foreground {
                strategy,
                next_step_at,
            } => Self::poll_foreground(
                strategy.as_mut(),
                next_step_at,
                &session.cancel,
                progress,
                &mut latest,
            ),
            Job::Background { worker, header } => {
                Self::poll_background(worker, header, progress, &mut latest)
            }
        };

        match outcome {
            None => MinerStatus::Searching(latest),
            Some(result) => self.conclude(ledger, result),
        }
    }

    // A token cancelled while the outcome was in flight wins over the outcome;
    // the worker exits silently on cancellation, which reads as a disconnect
    fn conclude(&mut self, ledger: &mut Blockchain, result: Result<MiningReport>) -> MinerStatus {
        let cancelled = self
            .session
            .as_ref()
            .map_or(false, |session| session.cancel.is_cancelled());
        if cancelled {
            return self.stop();
        }
        self.finish(ledger, result)
    }

    fn poll_foreground(
        strategy: &mut dyn MiningStrategy,
        next_step_at: &mut Instant,
        cancel: &CancellationToken,
        progress: &mut dyn ProgressSink,
        latest: &mut Option<MiningProgress>,
    ) -> Option<Result<MiningReport>> {
        if Instant::now() < *next_step_at {
            return None;
        }
        let pacing = strategy.pacing();
        let batch = if pacing.is_zero() { PROGRESS_INTERVAL } else { 1 };

        for _ in 0..batch {
            if cancel.is_cancelled() {
                return None;
            }
            if let Some(result) = strategy.step() {
                return Some(result);
            }
            if let Some(snapshot) = strategy.take_progress() {
                progress.on_progress(&snapshot);
                *latest = Some(snapshot);
            }
        }
        *next_step_at = Instant::now() + pacing;
        None
    }

    fn poll_background(
        worker: &mut BackgroundWorker,
        header: &mut Option<BlockHeader>,
        progress: &mut dyn ProgressSink,
        latest: &mut Option<MiningProgress>,
    ) -> Option<Result<MiningReport>> {
        while let Some(event) = worker.try_recv() {
            match event {
                WorkerEvent::Ready => {
                    if let Some(header) = header.take() {
                        if let Err(e) = worker.submit(header) {
                            return Some(Err(e));
                        }
                    }
                }
                WorkerEvent::Progress(snapshot) => {
                    progress.on_progress(&snapshot);
                    *latest = Some(snapshot);
                }
                WorkerEvent::Found(report) => return Some(Ok(report)),
                WorkerEvent::Error(e) => return Some(Err(e)),
            }
        }
        None
    }

    // Ends the session; on success the candidate is committed to the ledger
    fn finish(&mut self, ledger: &mut Blockchain, result: Result<MiningReport>) -> MinerStatus {
        let mut session = match self.session.take() {
            Some(session) => session,
            None => return MinerStatus::Idle,
        };
        session.shutdown();

        let report = match result {
            Ok(report) => report,
            Err(e) => {
                warn!("Mining session {} failed: {e}", session.id);
                return MinerStatus::Failed(e);
            }
        };

        let mut block = session.candidate;
        let committed = block
            .apply_solution(&report)
            .and_then(|_| ledger.commit_block(block.clone()));
        match committed {
            Ok(()) => {
                info!(
                    "Mining session {} found block {} ({}) after {} attempts at {:.0} H/s",
                    session.id,
                    block.get_index(),
                    block.get_hash(),
                    report.attempts,
                    report.hash_rate
                );
                MinerStatus::Found(MinedBlock {
                    index: block.get_index(),
                    hash: block.get_hash().to_string(),
                    report,
                })
            }
            Err(e) => {
                warn!("Mining session {} could not commit its block: {e}", session.id);
                MinerStatus::Failed(e)
            }
        }
    }

    /// Polls until the session ends, sleeping between steps in slices short
    /// enough to notice cancellation promptly.
    pub fn run(&mut self, ledger: &mut Blockchain, progress: &mut dyn ProgressSink) -> MinerStatus {
        loop {
            let status = self.poll(ledger, progress);
            if !matches!(status, MinerStatus::Searching(_)) {
                return status;
            }
            if let Some(nap) = self.nap() {
                thread::sleep(nap);
            }
        }
    }

    fn nap(&self) -> Option<Duration> {
        let session = self.session.as_ref()?;
        match &session.job {
            Job::Foreground { next_step_at, .. } => {
                let wait = next_step_at.saturating_duration_since(Instant::now());
                (!wait.is_zero()).then(|| wait.min(MAX_NAP))
            }
            Job::Background { .. } => Some(BACKGROUND_POLL),
        }
    }

    /// Cancels the running session, discarding its candidate. The ledger is
    /// left exactly as it was.
    pub fn stop(&mut self) -> MinerStatus {
        match self.session.take() {
            Some(mut session) => {
                session.shutdown();
                info!("Mining session {} cancelled", session.id);
                MinerStatus::Cancelled
            }
            None => MinerStatus::Idle,
        }
    }
}

impl Drop for Miner {
    fn drop(&mut self) {
        if let Some(session) = self.session.as_mut() {
            session.shutdown();
        }
    }
}
