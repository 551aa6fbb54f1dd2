//! Control socket: server (during `tvsync run`) and client (for `assign` and `remove`).
//! Protocol: one command per line; currently only "wake".

use anyhow::Result;
use std::path::Path;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::{UnixListener, UnixStream};
use tokio::task::JoinSet;
use tvsync_core::control::ControlCommand;
use tvsync_core::reconciler::ReconcilerHandle;

/// Spawns a task that listens on `path` and wakes the reconciler for each "wake" line.
/// Ignores malformed lines. Connection tasks live in a `JoinSet` owned by the listener,
/// so aborting the returned task drops every reconciler handle it holds.
pub fn spawn_control_listener(
    reconciler: ReconcilerHandle,
    path: impl AsRef<Path>,
) -> Result<tokio::task::JoinHandle<()>> {
    let path = path.as_ref().to_path_buf();
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let _ = std::fs::remove_file(&path);
    let listener = UnixListener::bind(&path)?;

    let handle = tokio::spawn(async move {
        let mut connections = JoinSet::new();
        loop {
            tokio::select! {
                accepted = listener.accept() => match accepted {
                    Ok((stream, _)) => {
                        connections.spawn(serve_connection(stream, reconciler.clone()));
                    }
                    Err(e) => tracing::debug!("control socket accept: {}", e),
                },
                Some(_) = connections.join_next() => {}
            }
        }
    });
    Ok(handle)
}

async fn serve_connection(stream: UnixStream, reconciler: ReconcilerHandle) {
    let mut reader = BufReader::new(stream).lines();
    while let Ok(Some(line)) = reader.next_line().await {
        match line.parse::<ControlCommand>() {
            Ok(ControlCommand::Wake) => {
                reconciler.wake();
            }
            Err(e) => tracing::debug!("control socket: {}", e),
        }
    }
}

/// Sends "wake\n" to a running daemon. No-op if no daemon is listening.
pub async fn send_wake(socket_path: &Path) -> Result<()> {
    if !socket_path.exists() {
        return Ok(());
    }
    let mut stream = match UnixStream::connect(socket_path).await {
        Ok(s) => s,
        Err(e) => {
            tracing::debug!(path = %socket_path.display(), "no daemon on control socket: {}", e);
            return Ok(());
        }
    };
    stream
        .write_all(ControlCommand::Wake.to_line().as_bytes())
        .await?;
    Ok(())
}

/// [`send_wake`] on the default socket path.
pub async fn notify_daemon() -> Result<()> {
    let path = tvsync_core::control::default_control_socket_path()?;
    send_wake(&path).await
}
