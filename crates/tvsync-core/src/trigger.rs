//! Entry point for new assignments: store the desired tasks, then nudge the reconciler.

use crate::reconciler::ReconcilerHandle;
use crate::store::rules::ASSIGNMENT_RULES;
use crate::store::{StoreError, TaskStore};
use crate::task::Task;

/// Upsert every task with the assignment rules. Returns the records as stored.
pub async fn upsert_tasks(store: &dyn TaskStore, tasks: &[Task]) -> Result<Vec<Task>, StoreError> {
    let mut stored = Vec::with_capacity(tasks.len());
    for task in tasks {
        if let Some(t) = store.conditional_upsert(task, ASSIGNMENT_RULES).await? {
            tracing::info!(
                task_id = %t.id,
                presentation = %t.new_presentation_id,
                version = %t.new_presentation_version,
                state = t.state_label(),
                "task assigned"
            );
            stored.push(t);
        }
    }
    Ok(stored)
}

/// [`upsert_tasks`] and then one non-blocking wake for an in-process reconciler.
pub async fn assign(
    store: &dyn TaskStore,
    tasks: &[Task],
    reconciler: &ReconcilerHandle,
) -> Result<Vec<Task>, StoreError> {
    let stored = upsert_tasks(store, tasks).await?;
    reconciler.wake();
    Ok(stored)
}
