//! `tvsync run` – reconcile workers against the task table until Ctrl-C.

use anyhow::Result;
use std::sync::Arc;
use tvsync_core::config::TvsyncConfig;
use tvsync_core::device::CurlTransport;
use tvsync_core::media::MediaLibrary;
use tvsync_core::reconciler::Reconciler;
use tvsync_core::store::SqliteTaskStore;
use tvsync_core::worker::WorkerContext;

use crate::cli::control_socket;

pub async fn run_daemon(store: SqliteTaskStore, cfg: &TvsyncConfig) -> Result<()> {
    let ctx = WorkerContext {
        store: Arc::new(store),
        transport: Arc::new(CurlTransport::new(cfg.http)),
        media: MediaLibrary::new(&cfg.media_root),
        timing: cfg.timing.clone(),
    };
    let (reconciler, handle) = Reconciler::new(ctx);

    let listener = match tvsync_core::control::default_control_socket_path() {
        Ok(path) => match control_socket::spawn_control_listener(handle.clone(), &path) {
            Ok(task) => {
                tracing::debug!(path = %path.display(), "control socket listening");
                Some(task)
            }
            Err(e) => {
                tracing::warn!(path = %path.display(), "control socket unavailable: {:#}", e);
                None
            }
        },
        Err(e) => {
            tracing::warn!("no control socket path: {}", e);
            None
        }
    };

    let running = tokio::spawn(reconciler.run());
    println!(
        "tvsync running (media root {}); Ctrl-C to stop",
        cfg.media_root.display()
    );

    tokio::signal::ctrl_c().await?;
    tracing::info!("interrupt received, shutting down");

    if let Some(task) = listener {
        task.abort();
        let _ = task.await;
    }
    drop(handle);
    running.await?;
    Ok(())
}
