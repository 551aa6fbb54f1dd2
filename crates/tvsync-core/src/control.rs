//! Control-socket protocol between CLI invocations and a running daemon.
//!
//! One command per line. `wake` asks the reconciler for a pass, e.g. after
//! `tvsync assign` or `tvsync remove` changed the task table.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlCommand {
    Wake,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownCommand(pub String);

impl fmt::Display for UnknownCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown control command {:?}", self.0)
    }
}

impl std::error::Error for UnknownCommand {}

impl FromStr for ControlCommand {
    type Err = UnknownCommand;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        match line.trim() {
            "wake" => Ok(ControlCommand::Wake),
            other => Err(UnknownCommand(other.to_string())),
        }
    }
}

impl ControlCommand {
    /// Wire form including the trailing newline.
    pub fn to_line(self) -> &'static str {
        match self {
            ControlCommand::Wake => "wake\n",
        }
    }
}

/// Default path for the control socket (same XDG state dir as the DB).
pub fn default_control_socket_path() -> std::io::Result<PathBuf> {
    let dir = xdg::BaseDirectories::with_prefix("tvsync")?.get_state_home();
    Ok(dir.join("control.sock"))
}
