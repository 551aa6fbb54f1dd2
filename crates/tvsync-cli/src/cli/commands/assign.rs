//! `tvsync assign <presentation.json> <devices.json>` – build and store device tasks.

use anyhow::{Context, Result};
use std::path::Path;
use tvsync_core::config::TvsyncConfig;
use tvsync_core::media::MediaLibrary;
use tvsync_core::prepare::{self, Device, Presentation};
use tvsync_core::store::SqliteTaskStore;
use tvsync_core::trigger;

use crate::cli::control_socket;

pub async fn run_assign(
    store: &SqliteTaskStore,
    cfg: &TvsyncConfig,
    presentation_path: &Path,
    devices_path: &Path,
) -> Result<()> {
    let presentation: Presentation = read_json(presentation_path).await?;
    let devices: Vec<Device> = read_json(devices_path).await?;

    let media = MediaLibrary::new(&cfg.media_root);
    let tasks = prepare::prepare_tasks(&presentation, &devices, &media)
        .await
        .with_context(|| format!("preparing presentation {}", presentation.id))?;

    let stored = trigger::upsert_tasks(store, &tasks).await?;
    for t in &stored {
        println!("{:<16} {} v{} ({})", t.id, t.new_presentation_name, t.new_presentation_version, t.state_label());
    }

    control_socket::notify_daemon().await?;
    Ok(())
}

async fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T> {
    let text = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("reading {}", path.display()))?;
    serde_json::from_str(&text).with_context(|| format!("parsing {}", path.display()))
}
