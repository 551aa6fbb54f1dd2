//! CLI command handlers, one per file.

mod assign;
mod remove;
mod run;
mod status;

pub use assign::run_assign;
pub use remove::run_remove;
pub use run::run_daemon;
pub use status::run_status;
