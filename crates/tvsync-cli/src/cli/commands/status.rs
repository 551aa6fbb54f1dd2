//! `tvsync status` – show delivery state of all devices.

use anyhow::Result;
use tvsync_core::store::{SqliteTaskStore, TaskStore};
use tvsync_core::task::Task;

pub async fn run_status(store: &SqliteTaskStore) -> Result<()> {
    let tasks = store.read_all().await?;
    if tasks.is_empty() {
        println!("No tasks in database.");
    } else {
        println!(
            "{:<16} {:<15} {:>8} {:>5} {:<14} {}",
            "ID", "STATE", "PROGRESS", "FAIL", "VERSION", "URL"
        );
        for t in tasks {
            println!(
                "{:<16} {:<15} {:>8} {:>5} {:<14} {}",
                t.id,
                t.state_label(),
                progress_label(&t),
                connection_label(&t),
                version_label(&t),
                t.url
            );
        }
    }
    Ok(())
}

fn progress_label(t: &Task) -> String {
    format!("{:.1}%", f64::from(t.task_status) / 10.0)
}

fn connection_label(t: &Task) -> String {
    if t.connection_status < 0 {
        "-".to_string()
    } else {
        t.connection_status.to_string()
    }
}

fn version_label(t: &Task) -> String {
    if t.old_presentation_version == t.new_presentation_version
        && t.old_presentation_id == t.new_presentation_id
    {
        t.new_presentation_version.clone()
    } else {
        let old = if t.old_presentation_version.is_empty() {
            "-"
        } else {
            t.old_presentation_version.as_str()
        };
        format!("{old}->{}", t.new_presentation_version)
    }
}
