//! In-process task store. Used by tests and by embedders that keep tasks elsewhere.

use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use super::rules::{self, UpsertRule};
use super::{StoreError, TaskStore};
use crate::task::Task;

#[derive(Debug, Default)]
pub struct MemoryTaskStore {
    tasks: Mutex<BTreeMap<String, Task>>,
}

impl MemoryTaskStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store seeded with `tasks`, keyed by their ids.
    pub fn with_tasks(tasks: impl IntoIterator<Item = Task>) -> Self {
        let store = Self::new();
        {
            let mut map = store.lock();
            for t in tasks {
                map.insert(t.id.clone(), t);
            }
        }
        store
    }

    /// Overwrite a record unconditionally (test setup and external edits).
    pub fn put(&self, task: Task) {
        self.lock().insert(task.id.clone(), task);
    }

    fn lock(&self) -> MutexGuard<'_, BTreeMap<String, Task>> {
        self.tasks.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl TaskStore for MemoryTaskStore {
    async fn read_one(&self, id: &str) -> Result<Option<Task>, StoreError> {
        Ok(self.lock().get(id).cloned())
    }

    async fn read_all(&self) -> Result<Vec<Task>, StoreError> {
        Ok(self.lock().values().cloned().collect())
    }

    async fn conditional_upsert(
        &self,
        candidate: &Task,
        rules: &[UpsertRule],
    ) -> Result<Option<Task>, StoreError> {
        let mut map = self.lock();
        let previous = map.get(&candidate.id);
        let Some(next) = rules::evaluate(previous, candidate, rules) else {
            return Ok(None);
        };
        map.insert(next.id.clone(), next.clone());
        Ok(Some(next))
    }

    async fn delete(&self, id: &str) -> Result<bool, StoreError> {
        Ok(self.lock().remove(id).is_some())
    }
}
