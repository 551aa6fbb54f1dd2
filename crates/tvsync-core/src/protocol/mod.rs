//! Transfer protocol: what to send a device next and how to read its answer.
//!
//! Everything here is synchronous and works on a [`Task`] snapshot; the worker does
//! the I/O and persists the mutated snapshot.

pub mod chunk;
pub mod config;

use thiserror::Error;

use crate::task::Task;

pub use chunk::{apply_chunk_response, finish_queue, plan_chunk, ChunkPlan, CHUNK_SIZE};
pub use config::{apply_config_accepted, build_config_body, parse_config_response};

/// Next device interaction for a task.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    /// `GET info`: liveness check, nothing to deliver.
    Probe,
    /// `POST config`: the assigned presentation has not been accepted yet.
    PushConfig,
    /// `POST upload/{index}_{offset}`: files are still queued.
    SendChunk,
}

impl Step {
    pub fn as_str(&self) -> &'static str {
        match self {
            Step::Probe => "probe",
            Step::PushConfig => "config",
            Step::SendChunk => "chunk",
        }
    }
}

/// Pick the next step in priority order: unassigned → probe, new presentation →
/// config, queued files → chunk, otherwise probe.
pub fn decide(task: &Task) -> Step {
    if !task.has_assignment() {
        Step::Probe
    } else if task.presentation_changed() {
        Step::PushConfig
    } else if !task.left_files.is_empty() {
        Step::SendChunk
    } else {
        Step::Probe
    }
}

/// Device answered, but not in a way the protocol understands. No task field changes.
#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("task has no presentation config")]
    MissingConfig,

    #[error("cannot encode config: {0}")]
    EncodeConfig(#[source] serde_json::Error),

    #[error("config response is not a file→offset map: {0}")]
    ConfigResponse(#[source] serde_json::Error),

    #[error("unparsable resume hint {0:?}")]
    BadHint(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assigned() -> Task {
        Task {
            id: "tv-1".to_string(),
            url: "http://tv/".to_string(),
            new_presentation_id: "p".to_string(),
            new_presentation_version: "2".to_string(),
            ..Task::default()
        }
    }

    #[test]
    fn unassigned_task_is_probed() {
        let mut t = assigned();
        t.new_presentation_version.clear();
        t.left_files = vec!["a".to_string()];
        assert_eq!(decide(&t), Step::Probe);
    }

    #[test]
    fn changed_presentation_pushes_config_first() {
        let mut t = assigned();
        t.left_files = vec!["a".to_string()];
        assert_eq!(decide(&t), Step::PushConfig);
        t.old_presentation_id = "p".to_string();
        t.old_presentation_version = "1".to_string();
        assert_eq!(decide(&t), Step::PushConfig);
    }

    #[test]
    fn accepted_presentation_never_pushes_config() {
        let mut t = assigned();
        t.accept_presentation();
        t.left_files = vec!["a".to_string()];
        assert_eq!(decide(&t), Step::SendChunk);
        t.left_files.clear();
        assert_eq!(decide(&t), Step::Probe);
        // Name differences alone do not trigger a push.
        t.new_presentation_name = "renamed".to_string();
        assert_eq!(decide(&t), Step::Probe);
    }
}
