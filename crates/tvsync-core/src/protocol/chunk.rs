//! Chunked, resumable file upload.
//!
//! The front of `left_files` is the file in flight. Each step sends at most
//! [`CHUNK_SIZE`] bytes from the token's offset; the device may answer with a
//! resume hint (a bare offset or `name:offset`) to move that offset, or with an
//! empty body, meaning "continue where the chunk ended" or, for a final chunk,
//! "file received".

use super::ProtocolError;
use crate::device::upload_endpoint;
use crate::progress;
use crate::task::{ResumeToken, Task, CONNECTION_OK, TASK_STATUS_DONE};

/// Largest upload body in bytes.
pub const CHUNK_SIZE: u64 = 1 << 19;

/// One upload request, derived from the front of the queue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChunkPlan {
    /// Position of the file in `config.file` / `real_files`.
    pub file_index: usize,
    /// Storage name, relative to the media root.
    pub real_file: String,
    pub offset: u64,
    pub len: usize,
    /// Offset the file reaches after this chunk, when it does not complete the file.
    pub provisional_offset: Option<u64>,
}

impl ChunkPlan {
    /// Endpoint relative to the device base URL.
    pub fn endpoint(&self) -> String {
        upload_endpoint(self.file_index, self.offset)
    }
}

/// Find the next chunk to send.
///
/// Drops queue entries that are already complete or whose name does not resolve to a
/// config index with a storage file. Returns `None` once the queue is drained; the
/// caller then marks the task done with [`finish_queue`].
pub fn plan_chunk(task: &mut Task) -> Option<ChunkPlan> {
    while let Some(front) = task.left_files.first() {
        let token = ResumeToken::parse(front);
        let total = token.declared_size();
        if token.offset >= total {
            tracing::debug!(task_id = %task.id, token = %front, "dropping finished entry");
            task.left_files.remove(0);
            continue;
        }

        let Some((file_index, real_file)) = resolve(task, &token.name) else {
            tracing::warn!(task_id = %task.id, file = %token.name, "queued file has no storage entry, dropping");
            task.left_files.remove(0);
            continue;
        };

        let len = token.remaining().min(CHUNK_SIZE);
        let end = token.offset + len;
        return Some(ChunkPlan {
            file_index,
            real_file,
            offset: token.offset,
            len: len as usize,
            provisional_offset: (end < total).then_some(end),
        });
    }
    None
}

fn resolve(task: &Task, name: &str) -> Option<(usize, String)> {
    let index = task.config.as_ref()?.index_of(name)?;
    let real = task.real_files.get(index)?;
    Some((index, real.clone()))
}

/// Apply the device's answer to a chunk sent per `plan`.
///
/// On error nothing is changed.
pub fn apply_chunk_response(
    task: &mut Task,
    plan: &ChunkPlan,
    body: &str,
) -> Result<(), ProtocolError> {
    let hinted = parse_hint(body)?;
    let next_offset = hinted.or(plan.provisional_offset);

    match (next_offset, task.left_files.first()) {
        (None, Some(_)) => {
            task.left_files.remove(0);
        }
        (Some(offset), Some(front)) => {
            let token = ResumeToken::parse(front).with_offset(offset);
            task.left_files[0] = token.to_string();
        }
        (_, None) => {}
    }

    if task.left_files.is_empty() {
        task.task_status = TASK_STATUS_DONE;
    } else {
        task.task_status =
            progress::advance(task.task_status, task.real_files.len(), &task.left_files);
    }
    task.connection_status = CONNECTION_OK;
    Ok(())
}

/// Queue drained without anything left to send.
pub fn finish_queue(task: &mut Task) {
    task.left_files.clear();
    task.task_status = TASK_STATUS_DONE;
    task.connection_status = CONNECTION_OK;
}

/// Trimmed response body as an offset. Empty means no hint.
fn parse_hint(body: &str) -> Result<Option<u64>, ProtocolError> {
    let hint = body.trim();
    if hint.is_empty() {
        return Ok(None);
    }
    let offset = match hint.rsplit_once(':') {
        Some((_, offset)) => offset,
        None => hint,
    };
    offset
        .trim()
        .parse::<u64>()
        .map(Some)
        .map_err(|_| ProtocolError::BadHint(hint.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::task::PresentationConfig;

    const C: u64 = CHUNK_SIZE;

    fn task_with(names: &[&str]) -> Task {
        Task {
            id: "tv-1".to_string(),
            config: Some(PresentationConfig {
                file: names.iter().map(|s| s.to_string()).collect(),
                duration: vec![5; names.len()],
            }),
            real_files: names.iter().map(|s| format!("media/{s}")).collect(),
            left_files: names.iter().map(|s| s.to_string()).collect(),
            task_status: 1,
            connection_status: 0,
            ..Task::default()
        }
    }

    #[test]
    fn concrete_scenario_first_chunk_then_hint() {
        let mut t = task_with(&["v1_0-1000000"]);
        let plan = plan_chunk(&mut t).unwrap();
        assert_eq!(plan.offset, 0);
        assert_eq!(plan.len, 524_288);
        assert_eq!(plan.endpoint(), "upload/0_0");

        apply_chunk_response(&mut t, &plan, "v1:524288\n").unwrap();
        assert_eq!(t.left_files, vec!["v1_0-1000000:524288"]);
        assert_eq!(t.task_status, 524);
        assert_eq!(t.connection_status, 0);
    }

    #[test]
    fn offsets_walk_by_chunk_and_last_chunk_is_remainder() {
        let total = 2 * C + 1234;
        let name = format!("v7_0-{total}.mp4");
        let mut t = task_with(&[&name]);

        let mut seen = Vec::new();
        let mut last_status = t.task_status;
        while let Some(plan) = plan_chunk(&mut t) {
            seen.push((plan.offset, plan.len));
            apply_chunk_response(&mut t, &plan, "").unwrap();
            assert!(t.task_status >= last_status);
            last_status = t.task_status;
        }
        assert_eq!(seen, vec![(0, C as usize), (C, C as usize), (2 * C, 1234)]);
        assert!(t.left_files.is_empty());
        assert_eq!(t.task_status, 1000);
    }

    #[test]
    fn exact_multiple_ends_with_full_chunk() {
        let name = format!("i1_0-{}.png", 2 * C);
        let mut t = task_with(&[&name]);
        let first = plan_chunk(&mut t).unwrap();
        assert_eq!(first.provisional_offset, Some(C));
        apply_chunk_response(&mut t, &first, "").unwrap();
        let second = plan_chunk(&mut t).unwrap();
        assert_eq!((second.offset, second.len), (C, C as usize));
        assert_eq!(second.provisional_offset, None);
        apply_chunk_response(&mut t, &second, "").unwrap();
        assert_eq!(t.task_status, 1000);
    }

    #[test]
    fn device_can_rewind_with_bare_offset() {
        let mut t = task_with(&["v1_0-1000000"]);
        t.left_files = vec!["v1_0-1000000:524288".to_string()];
        let plan = plan_chunk(&mut t).unwrap();
        assert_eq!(plan.endpoint(), "upload/0_524288");
        apply_chunk_response(&mut t, &plan, "1000").unwrap();
        assert_eq!(t.left_files, vec!["v1_0-1000000:1000"]);
    }

    #[test]
    fn progress_never_drops_on_rewind() {
        let mut t = task_with(&["v1_0-1000000"]);
        t.left_files = vec!["v1_0-1000000:900000".to_string()];
        t.task_status = 900;
        let plan = plan_chunk(&mut t).unwrap();
        apply_chunk_response(&mut t, &plan, "10").unwrap();
        assert_eq!(t.task_status, 900);
    }

    #[test]
    fn bad_hint_changes_nothing() {
        let mut t = task_with(&["v1_0-1000000"]);
        let before = t.clone();
        let plan = plan_chunk(&mut t).unwrap();
        let err = apply_chunk_response(&mut t, &plan, "<html>busy</html>").unwrap_err();
        assert!(matches!(err, ProtocolError::BadHint(_)));
        assert_eq!(t, before);
    }

    #[test]
    fn finished_and_unknown_entries_are_skipped() {
        let mut t = task_with(&["a_0-10", "b_0-20"]);
        t.left_files = vec![
            "a_0-10:10".to_string(),
            "ghost_0-99".to_string(),
            "b_0-20:5".to_string(),
        ];
        let plan = plan_chunk(&mut t).unwrap();
        assert_eq!(t.left_files, vec!["b_0-20:5"]);
        assert_eq!(plan.file_index, 1);
        assert_eq!(plan.real_file, "media/b_0-20");
        assert_eq!((plan.offset, plan.len), (5, 15));
    }

    #[test]
    fn drained_queue_yields_no_plan() {
        let mut t = task_with(&["a_0-10"]);
        t.left_files = vec!["a_0-10:10".to_string(), "no-size".to_string()];
        assert_eq!(plan_chunk(&mut t), None);
        assert!(t.left_files.is_empty());
        t.connection_status = 3;
        finish_queue(&mut t);
        assert_eq!(t.task_status, 1000);
        assert_eq!(t.connection_status, 0);
    }

    #[test]
    fn second_file_progress() {
        let mut t = task_with(&["a_0-100", "b_0-100"]);
        t.left_files = vec!["a_0-100:50".to_string(), "b_0-100".to_string()];
        let plan = plan_chunk(&mut t).unwrap();
        apply_chunk_response(&mut t, &plan, "").unwrap();
        assert_eq!(t.left_files, vec!["b_0-100"]);
        // m=2, p=1: 999/2 + 1 = 500
        assert_eq!(t.task_status, 500);
    }
}
