//! `tvsync remove <id>` – delete a device's task and let the daemon retire its worker.

use anyhow::Result;
use tvsync_core::store::{SqliteTaskStore, TaskStore};

use crate::cli::control_socket;

pub async fn run_remove(store: &SqliteTaskStore, id: &str) -> Result<()> {
    if store.delete(id).await? {
        println!("Removed task {id}");
        control_socket::notify_daemon().await?;
    } else {
        println!("No task {id}");
    }
    Ok(())
}
