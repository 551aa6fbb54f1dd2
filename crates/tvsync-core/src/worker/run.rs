use thiserror::Error;
use tokio::sync::mpsc;

use super::{Outcome, WorkerContext, WorkerExit};
use crate::device::{endpoint_url, DeviceError, CONFIG_ENDPOINT, INFO_ENDPOINT};
use crate::media::MediaError;
use crate::protocol::{self, ProtocolError, Step};
use crate::store::rules::{
    CONFIG_SENT_RULES, CONNECTION_STATUS_RULES, FILE_SENT_RULES,
};
use crate::store::{StoreError, UpsertRule};
use crate::task::{Task, CONNECTION_OK};

/// Failure of one cycle. Only `TaskGone` ends the worker.
#[derive(Debug, Error)]
enum CycleError {
    #[error("device: {0}")]
    Device(#[from] DeviceError),
    #[error("protocol: {0}")]
    Protocol(#[from] ProtocolError),
    #[error("media: {0}")]
    Media(#[from] MediaError),
    #[error("store: {0}")]
    Store(#[from] StoreError),
    #[error("task record no longer exists")]
    TaskGone,
}

enum Wait {
    Stop,
    Wake,
    Timer,
}

/// One device's decide, act, persist, wait loop.
pub struct DeviceWorker {
    id: String,
    ctx: WorkerContext,
    snapshot: Option<Task>,
    wake_rx: mpsc::Receiver<()>,
    stop_rx: mpsc::Receiver<()>,
}

impl DeviceWorker {
    pub fn new(
        id: String,
        ctx: WorkerContext,
        wake_rx: mpsc::Receiver<()>,
        stop_rx: mpsc::Receiver<()>,
    ) -> Self {
        Self {
            id,
            ctx,
            snapshot: None,
            wake_rx,
            stop_rx,
        }
    }

    /// Last task state read from or written to the store.
    pub fn snapshot(&self) -> Option<&Task> {
        self.snapshot.as_ref()
    }

    pub async fn run(mut self) -> WorkerExit {
        tracing::debug!(task_id = %self.id, "worker started");
        loop {
            let outcome = match self.cycle().await {
                Ok(outcome) => outcome,
                Err(CycleError::TaskGone) => {
                    tracing::error!(task_id = %self.id, "task record no longer exists, worker exiting");
                    return WorkerExit::TaskGone;
                }
                Err(e) => {
                    tracing::warn!(task_id = %self.id, "cycle failed: {}", e);
                    Outcome::Error
                }
            };

            let delay = outcome.delay(&self.ctx.timing);
            match self.wait(delay).await {
                Wait::Stop => {
                    tracing::debug!(task_id = %self.id, "worker stopped");
                    return WorkerExit::Stopped;
                }
                Wait::Wake => tracing::trace!(task_id = %self.id, "woken"),
                Wait::Timer => {}
            }
        }
    }

    async fn wait(&mut self, delay: std::time::Duration) -> Wait {
        tokio::select! {
            biased;
            _ = self.stop_rx.recv() => Wait::Stop,
            Some(()) = self.wake_rx.recv() => Wait::Wake,
            _ = tokio::time::sleep(delay) => Wait::Timer,
        }
    }

    async fn cycle(&mut self) -> Result<Outcome, CycleError> {
        let task = self
            .ctx
            .store
            .read_one(&self.id)
            .await?
            .ok_or(CycleError::TaskGone)?;
        self.snapshot = Some(task.clone());

        if task.id.is_empty() || task.url.is_empty() {
            return Ok(Outcome::Idle);
        }

        let step = protocol::decide(&task);
        tracing::debug!(task_id = %self.id, step = step.as_str(), state = task.state_label(), "step");

        let result = match step {
            Step::Probe => self.probe(task.clone()).await,
            Step::PushConfig => self.push_config(task.clone()).await,
            Step::SendChunk => self.send_chunk(task.clone()).await,
        };

        match result {
            Err(CycleError::Device(e)) => {
                tracing::warn!(
                    task_id = %self.id,
                    step = step.as_str(),
                    unreachable = e.is_unreachable(),
                    "device call failed: {}",
                    e
                );
                let mut failed = task;
                failed.record_connection_failure();
                self.persist(&failed, CONNECTION_STATUS_RULES).await?;
                Ok(Outcome::Error)
            }
            other => other,
        }
    }

    async fn probe(&mut self, mut task: Task) -> Result<Outcome, CycleError> {
        let url = endpoint_url(&task.url, INFO_ENDPOINT)?;
        let info = self.ctx.transport.get(&url).await?;
        tracing::trace!(task_id = %self.id, info = %info.trim(), "device info");

        if task.connection_status != CONNECTION_OK {
            task.connection_status = CONNECTION_OK;
            self.persist(&task, CONNECTION_STATUS_RULES).await?;
        }
        Ok(Outcome::Idle)
    }

    async fn push_config(&mut self, mut task: Task) -> Result<Outcome, CycleError> {
        let body = protocol::build_config_body(&task)?;
        let url = endpoint_url(&task.url, CONFIG_ENDPOINT)?;
        let response = self
            .ctx
            .transport
            .post(&url, "application/json", body)
            .await?;

        let left_files = protocol::parse_config_response(&task, &response)?;
        tracing::info!(
            task_id = %self.id,
            presentation = %task.new_presentation_id,
            version = %task.new_presentation_version,
            files = left_files.len(),
            "device accepted config"
        );
        protocol::apply_config_accepted(&mut task, left_files);
        self.persist(&task, CONFIG_SENT_RULES).await?;
        Ok(Outcome::Progressed)
    }

    async fn send_chunk(&mut self, mut task: Task) -> Result<Outcome, CycleError> {
        let Some(plan) = protocol::plan_chunk(&mut task) else {
            tracing::info!(task_id = %self.id, "upload queue drained");
            protocol::finish_queue(&mut task);
            self.persist(&task, FILE_SENT_RULES).await?;
            return Ok(Outcome::Progressed);
        };

        let bytes = self
            .ctx
            .media
            .read_chunk(&plan.real_file, plan.offset, plan.len)
            .await?;
        let url = endpoint_url(&task.url, &plan.endpoint())?;
        let response = self
            .ctx
            .transport
            .post(&url, "application/octet-stream", bytes)
            .await?;

        protocol::apply_chunk_response(&mut task, &plan, &response)?;
        tracing::debug!(
            task_id = %self.id,
            file_index = plan.file_index,
            offset = plan.offset,
            len = plan.len,
            task_status = task.task_status,
            "chunk sent"
        );
        self.persist(&task, FILE_SENT_RULES).await?;
        Ok(Outcome::Progressed)
    }

    /// Write through the store's rules and adopt what it stored.
    async fn persist(&mut self, task: &Task, rules: &[UpsertRule]) -> Result<(), CycleError> {
        let stored = self
            .ctx
            .store
            .conditional_upsert(task, rules)
            .await?
            .ok_or(CycleError::TaskGone)?;
        self.snapshot = Some(stored);
        Ok(())
    }
}
