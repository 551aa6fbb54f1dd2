//! Task persistence.
//!
//! Workers and the reconciler only see the [`TaskStore`] trait. Writes go through
//! [`TaskStore::conditional_upsert`] with an ordered rule list (see [`rules`]) so
//! a worker's write never clobbers an assignment made concurrently by an operator.

pub mod rules;

mod memory;
mod sqlite;


use async_trait::async_trait;
use thiserror::Error;

use crate::task::Task;

pub use memory::MemoryTaskStore;
pub use rules::{Condition, FieldPatch, UpsertRule};
pub use sqlite::SqliteTaskStore;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database: {0}")]
    Database(#[from] sqlx::Error),

    #[error("task {id}: stored record is not valid JSON: {source}")]
    Corrupt {
        id: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("task {id}: cannot encode record: {source}")]
    Encode {
        id: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("task {id}: gave up after {attempts} conflicting concurrent writes")]
    Contention { id: String, attempts: u32 },

    #[error("io: {0}")]
    Io(#[from] std::io::Error),
}

/// Record store holding one [`Task`] per device id.
#[async_trait]
pub trait TaskStore: Send + Sync {
    /// Load one task; `None` if no record exists for `id`.
    async fn read_one(&self, id: &str) -> Result<Option<Task>, StoreError>;

    /// Load every task, ordered by id.
    async fn read_all(&self) -> Result<Vec<Task>, StoreError>;

    /// Evaluate `rules` against the stored record and write the patched result.
    ///
    /// Returns the record as stored after the write, or `None` when no rule matched
    /// (for the worker rule sets this means the record no longer exists).
    async fn conditional_upsert(
        &self,
        candidate: &Task,
        rules: &[UpsertRule],
    ) -> Result<Option<Task>, StoreError>;

    /// Delete a record. Returns false if it did not exist.
    async fn delete(&self, id: &str) -> Result<bool, StoreError>;
}
