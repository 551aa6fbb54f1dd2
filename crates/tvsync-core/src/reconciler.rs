//! Keeps the set of running device workers equal to the set of stored tasks.
//!
//! The reconciler waits on a single-slot wake channel. Each wake triggers one pass:
//! read every task, start workers for new ids (or ids whose worker exited), wake the
//! rest so they reload, and stop workers whose task disappeared.

use std::collections::{HashMap, HashSet};
use tokio::sync::mpsc;

use crate::store::StoreError;
use crate::task::Task;
use crate::worker::{self, Signal, WorkerContext, WorkerExit, WorkerHandle};

/// What one pass changed.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ReconcileReport {
    pub spawned: Vec<String>,
    pub woken: Vec<String>,
    pub stopped: Vec<String>,
}

/// Cloneable trigger for the reconciler. When every handle is dropped the reconciler
/// stops its workers and returns.
#[derive(Debug, Clone)]
pub struct ReconcilerHandle {
    wake_tx: mpsc::Sender<()>,
}

impl ReconcilerHandle {
    /// Request a pass. Coalesces with a pass request that is already queued.
    pub fn wake(&self) -> Signal {
        let signal: Signal = self.wake_tx.try_send(()).into();
        tracing::debug!(?signal, "reconciler wake");
        signal
    }
}

pub struct Reconciler {
    ctx: WorkerContext,
    workers: HashMap<String, WorkerHandle>,
    /// Workers sent a stop whose exit has not been observed yet.
    retiring: Vec<WorkerHandle>,
    wake_rx: mpsc::Receiver<()>,
}

impl Reconciler {
    pub fn new(ctx: WorkerContext) -> (Self, ReconcilerHandle) {
        let (wake_tx, wake_rx) = mpsc::channel(1);
        let reconciler = Self {
            ctx,
            workers: HashMap::new(),
            retiring: Vec::new(),
            wake_rx,
        };
        (reconciler, ReconcilerHandle { wake_tx })
    }

    /// Ids with a worker that is still running, sorted.
    pub fn live_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self
            .workers
            .iter()
            .filter(|(_, h)| !h.is_finished())
            .map(|(id, _)| id.clone())
            .collect();
        ids.sort();
        ids
    }

    /// Ids currently tracked (running or exited but not yet replaced), sorted.
    pub fn tracked_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.workers.keys().cloned().collect();
        ids.sort();
        ids
    }

    /// Wait for every stopped worker to exit, returning `(id, exit)` in stop order.
    pub async fn join_retired(&mut self) -> Vec<(String, Option<WorkerExit>)> {
        let mut exits = Vec::with_capacity(self.retiring.len());
        for h in self.retiring.drain(..) {
            let id = h.id().to_string();
            exits.push((id, h.join().await));
        }
        exits
    }

    /// Run until every [`ReconcilerHandle`] is dropped.
    pub async fn run(mut self) {
        let startup = self.ctx.timing.startup_delay();
        tracing::info!(delay_secs = startup.as_secs(), "reconciler starting");
        tokio::time::sleep(startup).await;

        loop {
            match self.pass().await {
                Ok(report) => tracing::info!(
                    spawned = report.spawned.len(),
                    woken = report.woken.len(),
                    stopped = report.stopped.len(),
                    "reconcile pass"
                ),
                Err(e) => tracing::error!("reconcile pass skipped, cannot read tasks: {}", e),
            }
            if self.wake_rx.recv().await.is_none() {
                break;
            }
        }
        self.shutdown().await;
    }

    /// One pass against the store.
    pub async fn pass(&mut self) -> Result<ReconcileReport, StoreError> {
        let tasks = self.ctx.store.read_all().await?;
        Ok(self.reconcile(&tasks))
    }

    /// Bring the worker set in line with `tasks`. Must run inside a tokio runtime.
    pub fn reconcile(&mut self, tasks: &[Task]) -> ReconcileReport {
        let mut report = ReconcileReport::default();
        self.retiring.retain(|h| !h.is_finished());
        let mut desired = HashSet::new();

        for task in tasks.iter().filter(|t| !t.id.is_empty()) {
            if !desired.insert(task.id.as_str()) {
                continue;
            }
            match self.workers.get(&task.id) {
                Some(handle) if !handle.is_finished() => {
                    if handle.wake() == Signal::WorkerGone {
                        self.respawn(&task.id);
                        report.spawned.push(task.id.clone());
                    } else {
                        report.woken.push(task.id.clone());
                    }
                }
                _ => {
                    self.respawn(&task.id);
                    report.spawned.push(task.id.clone());
                }
            }
        }

        let mut gone: Vec<String> = self
            .workers
            .keys()
            .filter(|id| !desired.contains(id.as_str()))
            .cloned()
            .collect();
        gone.sort();
        for id in gone {
            if let Some(handle) = self.workers.remove(&id) {
                tracing::info!(task_id = %id, "task removed, stopping worker");
                handle.stop();
                report.stopped.push(id);
                self.retiring.push(handle);
            }
        }
        report
    }

    fn respawn(&mut self, id: &str) {
        tracing::info!(task_id = %id, "starting worker");
        let handle = worker::spawn(id, self.ctx.clone());
        self.workers.insert(id.to_string(), handle);
    }

    async fn shutdown(&mut self) {
        tracing::info!(workers = self.workers.len(), "reconciler shutting down");
        let handles: Vec<WorkerHandle> = self.workers.drain().map(|(_, h)| h).collect();
        for h in &handles {
            h.stop();
        }
        for h in handles {
            h.join().await;
        }
        self.join_retired().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TimingConfig;
    use crate::device::{DeviceError, DeviceTransport};
    use crate::media::MediaLibrary;
    use crate::store::{MemoryTaskStore, TaskStore};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[derive(Default)]
    struct CountingTransport {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl DeviceTransport for CountingTransport {
        async fn get(&self, _url: &str) -> Result<String, DeviceError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(String::new())
        }

        async fn post(&self, _: &str, _: &str, _: Vec<u8>) -> Result<String, DeviceError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(String::new())
        }
    }

    fn task(id: &str) -> Task {
        Task {
            id: id.to_string(),
            url: format!("{id}.local"),
            ..Task::default()
        }
    }

    fn setup(ids: &[&str]) -> (Arc<MemoryTaskStore>, Arc<CountingTransport>, Reconciler, ReconcilerHandle) {
        let store = Arc::new(MemoryTaskStore::with_tasks(ids.iter().map(|id| task(id))));
        let transport = Arc::new(CountingTransport::default());
        let ctx = WorkerContext {
            store: store.clone(),
            transport: transport.clone(),
            media: MediaLibrary::new("."),
            timing: TimingConfig::default(),
        };
        let (rec, handle) = Reconciler::new(ctx);
        (store, transport, rec, handle)
    }

    fn ids(v: &[&str]) -> Vec<String> {
        v.iter().map(|s| s.to_string()).collect()
    }

    #[tokio::test(start_paused = true)]
    async fn converges_when_a_task_disappears() {
        let (store, _t, mut rec, _h) = setup(&["A", "B", "C"]);

        let first = rec.pass().await.unwrap();
        assert_eq!(first.spawned, ids(&["A", "B", "C"]));
        assert!(first.stopped.is_empty());
        // Let every worker finish its probe and park on the idle timer.
        tokio::time::sleep(std::time::Duration::from_secs(1)).await;

        store.delete("B").await.unwrap();
        let second = rec.pass().await.unwrap();
        assert!(second.spawned.is_empty());
        assert_eq!(second.woken, ids(&["A", "C"]));
        assert_eq!(second.stopped, ids(&["B"]));
        assert_eq!(rec.tracked_ids(), ids(&["A", "C"]));
        assert_eq!(
            rec.join_retired().await,
            vec![("B".to_string(), Some(WorkerExit::Stopped))]
        );
        assert_eq!(rec.live_ids(), ids(&["A", "C"]));

        let third = rec.pass().await.unwrap();
        assert!(third.stopped.is_empty(), "B is stopped only once");
        assert_eq!(rec.tracked_ids(), ids(&["A", "C"]));
    }

    #[tokio::test]
    async fn exited_worker_is_respawned() {
        let (_store, _t, mut rec, _h) = setup(&[]);
        // No record behind it: the worker exits on its first load.
        let report = rec.reconcile(&[task("ghost")]);
        assert_eq!(report.spawned, ids(&["ghost"]));
        while !rec.live_ids().is_empty() {
            tokio::task::yield_now().await;
        }
        let again = rec.reconcile(&[task("ghost")]);
        assert_eq!(again.spawned, ids(&["ghost"]));
        assert!(again.woken.is_empty());
    }

    #[tokio::test]
    async fn records_without_id_are_ignored() {
        let (_store, _t, mut rec, _h) = setup(&[]);
        let report = rec.reconcile(&[task(""), task("x"), task("x")]);
        assert_eq!(report.spawned, ids(&["x"]));
        assert!(report.woken.is_empty());
        assert_eq!(rec.tracked_ids(), ids(&["x"]));
    }

    #[tokio::test(start_paused = true)]
    async fn wakes_coalesce_and_drop_of_handles_shuts_down() {
        let (_store, transport, rec, handle) = setup(&["A"]);
        assert_eq!(handle.wake(), Signal::Sent);
        assert_eq!(handle.clone().wake(), Signal::AlreadyPending);

        let running = tokio::spawn(rec.run());
        tokio::time::sleep(std::time::Duration::from_secs(6)).await;
        assert!(transport.calls.load(Ordering::SeqCst) >= 1, "worker probed its device");

        drop(handle);
        running.await.unwrap();
    }
}
