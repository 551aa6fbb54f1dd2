//! Types persisted in the task store.

use serde::{Deserialize, Serialize};

/// `task_status` before anything has been sent.
pub const TASK_STATUS_UNTOUCHED: u16 = 0;
/// `task_status` right after the device accepted a config.
pub const TASK_STATUS_STARTED: u16 = 1;
/// Highest in-progress value; the estimator never reports more.
pub const TASK_STATUS_MAX_IN_PROGRESS: u16 = 999;
/// `task_status` once the transfer queue is empty.
pub const TASK_STATUS_DONE: u16 = 1000;

/// `connection_status` of a device that was never contacted.
pub const CONNECTION_UNCHECKED: i32 = -1;
/// `connection_status` after a successful round-trip.
pub const CONNECTION_OK: i32 = 0;

/// Payload pushed to the device: logical file names and per-slide durations (seconds).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PresentationConfig {
    pub file: Vec<String>,
    pub duration: Vec<u32>,
}

impl PresentationConfig {
    /// Index of a logical file name in `file`.
    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.file.iter().position(|f| f == name)
    }
}

/// One device's delivery record. Identity is `id` (the device id).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Task {
    pub id: String,
    pub name: String,
    pub url: String,
    pub old_presentation_id: String,
    pub old_presentation_name: String,
    pub old_presentation_version: String,
    pub new_presentation_id: String,
    pub new_presentation_name: String,
    pub new_presentation_version: String,
    pub config: Option<PresentationConfig>,
    /// Storage names, index-aligned with `config.file`. Never sent to the device.
    pub real_files: Vec<String>,
    /// Pending uploads as `name` or `name:offset` tokens.
    pub left_files: Vec<String>,
    pub task_status: u16,
    pub connection_status: i32,
}

impl Task {
    /// True when a presentation id and version are assigned.
    pub fn has_assignment(&self) -> bool {
        !self.new_presentation_id.is_empty() && !self.new_presentation_version.is_empty()
    }

    /// True when the assigned presentation differs from the one the device accepted.
    pub fn presentation_changed(&self) -> bool {
        self.new_presentation_id != self.old_presentation_id
            || self.new_presentation_version != self.old_presentation_version
    }

    /// Assigned presentation accepted and nothing left to upload.
    pub fn is_in_sync(&self) -> bool {
        self.old_presentation_id == self.new_presentation_id
            && self.old_presentation_name == self.new_presentation_name
            && self.old_presentation_version == self.new_presentation_version
            && self.left_files.is_empty()
    }

    /// Mark the assigned presentation as accepted by the device.
    pub fn accept_presentation(&mut self) {
        self.old_presentation_id = self.new_presentation_id.clone();
        self.old_presentation_name = self.new_presentation_name.clone();
        self.old_presentation_version = self.new_presentation_version.clone();
    }

    /// Count one more consecutive connection failure. `-1` (unchecked) counts as zero.
    pub fn record_connection_failure(&mut self) {
        self.connection_status = self.connection_status.max(CONNECTION_OK).saturating_add(1);
    }

    /// Short human label for the transfer state, used by `status` output and logs.
    pub fn state_label(&self) -> &'static str {
        if !self.has_assignment() {
            "unassigned"
        } else if self.presentation_changed() {
            "pending-config"
        } else if !self.left_files.is_empty() {
            "uploading"
        } else {
            "in-sync"
        }
    }
}
