//! Progress estimation for a device's upload queue.
//!
//! Reduces "how many files are left and how far is the current one" to a single
//! `task_status` scalar comparable across devices: 1..=999 while uploading,
//! 1000 only when the queue is empty.

use crate::task::{ResumeToken, TASK_STATUS_DONE, TASK_STATUS_MAX_IN_PROGRESS};

/// Estimate `task_status` from the total file count and the pending tokens.
///
/// Completed files contribute `(m - p) * 999 / m`, one unit marks "in progress",
/// and the front file adds its byte fraction of one file's share.
pub fn estimate(total_files: usize, left_files: &[String]) -> u16 {
    let m = total_files as u64;
    let p = left_files.len() as u64;
    if m == 0 || p == 0 {
        return TASK_STATUS_DONE;
    }
    let max = TASK_STATUS_MAX_IN_PROGRESS as u64;
    let mut done = m.saturating_sub(p) * max / m + 1;

    let front = ResumeToken::parse(&left_files[0]);
    let sub_total = front.declared_size();
    if sub_total > 0 {
        // u128: declared sizes and device hints may use the whole u64 range.
        let sub_current = u128::from(front.offset.min(sub_total));
        let share = sub_current * u128::from(max) / (u128::from(m) * u128::from(sub_total));
        done += share.min(u128::from(max)) as u64;
    }
    done.min(max) as u16
}

/// Like [`estimate`] but never reports less than `previous` while still in progress.
pub fn advance(previous: u16, total_files: usize, left_files: &[String]) -> u16 {
    let next = estimate(total_files, left_files);
    if next == TASK_STATUS_DONE || previous >= TASK_STATUS_DONE {
        return next;
    }
    next.max(previous)
}
