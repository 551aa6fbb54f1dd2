use std::collections::HashMap;

use super::ProtocolError;
use crate::task::{
    ResumeToken, Task, CONNECTION_OK, TASK_STATUS_DONE, TASK_STATUS_STARTED,
};

/// JSON body for `POST config`: `{"file":[...],"duration":[...]}`.
pub fn build_config_body(task: &Task) -> Result<Vec<u8>, ProtocolError> {
    let config = task.config.as_ref().ok_or(ProtocolError::MissingConfig)?;
    serde_json::to_vec(config).map_err(ProtocolError::EncodeConfig)
}

/// Turn the device's `{name: offset}` answer into the upload queue, in `config.file`
/// order. Names the config does not list are dropped.
pub fn parse_config_response(task: &Task, body: &str) -> Result<Vec<String>, ProtocolError> {
    let config = task.config.as_ref().ok_or(ProtocolError::MissingConfig)?;
    let offsets: HashMap<String, u64> =
        serde_json::from_str(body.trim()).map_err(ProtocolError::ConfigResponse)?;

    for name in offsets.keys() {
        if config.index_of(name).is_none() {
            tracing::warn!(task_id = %task.id, file = %name, "device asked for a file not in the config");
        }
    }

    Ok(config
        .file
        .iter()
        .filter_map(|name| offsets.get(name).map(|&off| ResumeToken::new(name.as_str(), off)))
        .map(|t| t.to_string())
        .collect())
}

/// Record a config the device accepted: the presentation becomes current and the queue
/// starts. An empty queue means the device already holds everything.
pub fn apply_config_accepted(task: &mut Task, left_files: Vec<String>) {
    task.accept_presentation();
    task.task_status = if left_files.is_empty() {
        TASK_STATUS_DONE
    } else {
        TASK_STATUS_STARTED
    };
    task.left_files = left_files;
    task.connection_status = CONNECTION_OK;
}
