//! Background proof-of-work on a dedicated OS thread.
//!
//! The protocol is one header in, events out:
//!
//! 1. the worker announces [`WorkerEvent::Ready`]
//! 2. the owner sends the header to search
//! 3. the worker streams [`WorkerEvent::Progress`] and ends with exactly one
//!    of [`WorkerEvent::Found`] or [`WorkerEvent::Error`]
//!
//! The worker never sees the ledger. Once the cancellation token is set it
//! sends nothing further.

use crate::core::{BlockHeader, MiningProgress, MiningReport};
use crate::error::{BlockchainError, Result};
use crate::mining::strategy::{MiningStrategy, UnthrottledStrategy};
use crate::utils::Clock;
use log::{debug, error};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender, TryRecvError};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tokio_util::sync::CancellationToken;

const WORKER_THREAD_NAME: &str = "miner-worker";

#[derive(Debug, Clone, PartialEq)]
pub enum WorkerEvent {
    Ready,
    Progress(MiningProgress),
    Found(MiningReport),
    Error(BlockchainError),
}

impl WorkerEvent {
    pub fn is_terminal(&self) -> bool {
        matches!(self, WorkerEvent::Found(_) | WorkerEvent::Error(_))
    }
}

pub struct BackgroundWorker {
    handle: Option<JoinHandle<()>>,
    headers: Option<Sender<BlockHeader>>,
    events: Option<Receiver<WorkerEvent>>,
    cancel: CancellationToken,
}

impl BackgroundWorker {
    pub fn spawn(
        clock: Arc<dyn Clock>,
        attempt_limit: Option<u64>,
        cancel: CancellationToken,
    ) -> Result<BackgroundWorker> {
        let (header_tx, header_rx) = mpsc::channel::<BlockHeader>();
        let (event_tx, event_rx) = mpsc::channel::<WorkerEvent>();
        let token = cancel.clone();

        let handle = thread::Builder::new()
            .name(WORKER_THREAD_NAME.to_string())
            .spawn(move || run_worker(header_rx, event_tx, clock, attempt_limit, token))
            .map_err(|e| BlockchainError::Mining(format!("Failed to spawn miner thread: {e}")))?;

        Ok(BackgroundWorker {
            handle: Some(handle),
            headers: Some(header_tx),
            events: Some(event_rx),
            cancel,
        })
    }

    /// Hands the header over. Only the first header is searched.
    pub fn submit(&self, header: BlockHeader) -> Result<()> {
        let sender = self
            .headers
            .as_ref()
            .ok_or_else(|| BlockchainError::InvalidState("Worker already terminated".to_string()))?;
        sender
            .send(header)
            .map_err(|_| BlockchainError::Mining("Miner thread is gone".to_string()))
    }

    /// Next event without blocking. A worker that vanished without a
    /// terminal event is reported as an error.
    pub fn try_recv(&self) -> Option<WorkerEvent> {
        let events = self.events.as_ref()?;
        match events.try_recv() {
            Ok(event) => Some(event),
            Err(TryRecvError::Empty) => None,
            Err(TryRecvError::Disconnected) => Some(vanished()),
        }
    }

    pub fn recv_timeout(&self, timeout: Duration) -> Option<WorkerEvent> {
        let events = self.events.as_ref()?;
        match events.recv_timeout(timeout) {
            Ok(event) => Some(event),
            Err(RecvTimeoutError::Timeout) => None,
            Err(RecvTimeoutError::Disconnected) => Some(vanished()),
        }
    }

    /// Cancels, joins the thread and drops the event channel. No event can be
    /// observed afterwards.
    pub fn terminate(&mut self) {
        self.cancel.cancel();
        self.headers.take();
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                error!("Miner thread panicked");
            }
        }
        self.events.take();
    }
}

impl Drop for BackgroundWorker {
    fn drop(&mut self) {
        self.terminate();
    }
}

fn vanished() -> WorkerEvent {
    WorkerEvent::Error(BlockchainError::Mining(
        "Miner thread exited without a result".to_string(),
    ))
}

fn run_worker(
    headers: Receiver<BlockHeader>,
    events: Sender<WorkerEvent>,
    clock: Arc<dyn Clock>,
    attempt_limit: Option<u64>,
    cancel: CancellationToken,
) {
    if events.send(WorkerEvent::Ready).is_err() {
        return;
    }
    let header = match headers.recv() {
        Ok(header) => header,
        Err(_) => return,
    };
    debug!(
        "Miner thread searching block {} at difficulty {}",
        header.index, header.difficulty
    );

    let mut strategy = UnthrottledStrategy::new(header, clock, attempt_limit);
    loop {
        if cancel.is_cancelled() {
            debug!("Miner thread cancelled after {} attempts", strategy.attempts());
            return;
        }
        match strategy.step() {
            None => {
                if let Some(progress) = strategy.take_progress() {
                    if events.send(WorkerEvent::Progress(progress)).is_err() {
                        return;
                    }
                }
            }
            Some(result) => {
                if cancel.is_cancelled() {
                    return;
                }
                let event = match result {
                    Ok(report) => WorkerEvent::Found(report),
                    Err(e) => WorkerEvent::Error(e),
                };
                let _ = events.send(event);
                return;
            }
        }
    }
}
