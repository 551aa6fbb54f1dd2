//! Per-device workers.
//!
//! One tokio task per device runs [`DeviceWorker`]: reload the task, take one protocol
//! step against the device, persist the result, then wait for a timer, a wake or a stop.
//! The owner keeps a [`WorkerHandle`] with two single-slot signal channels; sends never
//! block and a signal already pending absorbs the new one.

mod run;


use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::config::TimingConfig;
use crate::device::DeviceTransport;
use crate::media::MediaLibrary;
use crate::store::TaskStore;

pub use run::DeviceWorker;

/// Everything a worker needs besides its id. Shared by all workers.
#[derive(Clone)]
pub struct WorkerContext {
    pub store: Arc<dyn TaskStore>,
    pub transport: Arc<dyn DeviceTransport>,
    pub media: MediaLibrary,
    pub timing: TimingConfig,
}

/// How a cycle went; picks the wait before the next one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// Transport, protocol, media or store failure.
    Error,
    /// Nothing to deliver (probe succeeded, or device not addressable).
    Idle,
    /// Config or chunk delivered; loop again at once.
    Progressed,
}

impl Outcome {
    pub fn delay(self, timing: &TimingConfig) -> Duration {
        match self {
            Outcome::Error => timing.error_delay(),
            Outcome::Idle => timing.idle_delay(),
            Outcome::Progressed => Duration::ZERO,
        }
    }
}

/// Why a worker loop returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerExit {
    /// Stop signal received (or the handle was dropped).
    Stopped,
    /// The task record no longer exists.
    TaskGone,
}

/// Result of a non-blocking signal send.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Signal {
    Sent,
    /// A signal of the same kind was still queued; this one was dropped.
    AlreadyPending,
    /// The worker has exited.
    WorkerGone,
}

impl From<Result<(), mpsc::error::TrySendError<()>>> for Signal {
    fn from(r: Result<(), mpsc::error::TrySendError<()>>) -> Self {
        match r {
            Ok(()) => Signal::Sent,
            Err(mpsc::error::TrySendError::Full(())) => Signal::AlreadyPending,
            Err(mpsc::error::TrySendError::Closed(())) => Signal::WorkerGone,
        }
    }
}

/// Owner side of a running worker.
#[derive(Debug)]
pub struct WorkerHandle {
    id: String,
    wake_tx: mpsc::Sender<()>,
    stop_tx: mpsc::Sender<()>,
    join: JoinHandle<WorkerExit>,
}

impl WorkerHandle {
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Ask the worker to reload its task now instead of waiting for its timer.
    pub fn wake(&self) -> Signal {
        self.wake_tx.try_send(()).into()
    }

    /// Ask the worker to exit after its current step.
    pub fn stop(&self) -> Signal {
        self.stop_tx.try_send(()).into()
    }

    pub fn is_finished(&self) -> bool {
        self.join.is_finished()
    }

    /// Wait for the worker to exit. `None` if it panicked or was aborted.
    pub async fn join(self) -> Option<WorkerExit> {
        match self.join.await {
            Ok(exit) => Some(exit),
            Err(e) => {
                tracing::error!(task_id = %self.id, "worker task failed: {}", e);
                None
            }
        }
    }
}

/// Start a worker for `id` on the current runtime.
pub fn spawn(id: impl Into<String>, ctx: WorkerContext) -> WorkerHandle {
    let id = id.into();
    let (wake_tx, wake_rx) = mpsc::channel(1);
    let (stop_tx, stop_rx) = mpsc::channel(1);
    let worker = DeviceWorker::new(id.clone(), ctx, wake_rx, stop_rx);
    let join = tokio::spawn(worker.run());
    WorkerHandle {
        id,
        wake_tx,
        stop_tx,
        join,
    }
}
