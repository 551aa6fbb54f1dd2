//! CLI for the tvsync signage synchronizer.

mod commands;
pub mod control_socket;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tvsync_core::config;
use tvsync_core::store::SqliteTaskStore;

use commands::{run_assign, run_daemon, run_remove, run_status};

/// Top-level CLI for tvsync.
#[derive(Debug, Parser)]
#[command(name = "tvsync")]
#[command(about = "tvsync: push signage presentations to playback devices over HTTP", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: CliCommand,
}

#[derive(Debug, Subcommand)]
pub enum CliCommand {
    /// Run the reconciler and device workers until Ctrl-C.
    Run,

    /// Assign a presentation to a list of devices.
    Assign {
        /// Presentation JSON: id, name, version, duration[], screens[].
        presentation: PathBuf,
        /// Device list JSON: [{id, name, url}, ...].
        devices: PathBuf,
    },

    /// Show delivery status of every device.
    Status,

    /// Remove a device's task; a running daemon stops its worker.
    Remove {
        /// Device identifier.
        id: String,
    },
}

impl CliCommand {
    pub async fn run_from_args() -> Result<()> {
        let cli = Cli::parse();
        let cfg = config::load_or_init()?;
        tracing::debug!("loaded config: {:?}", cfg);
        let store = match &cfg.db_path {
            Some(path) => SqliteTaskStore::open_at(path).await,
            None => SqliteTaskStore::open_default().await,
        }
        .context("opening task database")?;

        match cli.command {
            CliCommand::Run => run_daemon(store, &cfg).await?,
            CliCommand::Assign {
                presentation,
                devices,
            } => run_assign(&store, &cfg, &presentation, &devices).await?,
            CliCommand::Status => run_status(&store).await?,
            CliCommand::Remove { id } => run_remove(&store, &id).await?,
        }

        Ok(())
    }
}
