//! SQLite-backed task store.
//!
//! Each task is one JSON document plus a `revision` counter. Conditional upserts read
//! the document, evaluate the rules in memory and write back with a compare-and-swap on
//! `revision`; a lost race re-reads and re-evaluates.

use async_trait::async_trait;
use sqlx::sqlite::SqlitePoolOptions;
use sqlx::{Pool, Row, Sqlite};
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use super::rules::{self, UpsertRule};
use super::{StoreError, TaskStore};
use crate::task::Task;

/// Compare-and-swap attempts before a conditional upsert reports contention.
const MAX_UPSERT_ATTEMPTS: u32 = 8;

/// Percent-encode a path for use in a sqlite:// URI so spaces and special chars don't break parsing.
fn path_to_sqlite_uri(path: &Path) -> String {
    let s = path.to_string_lossy();
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '%' => out.push_str("%25"),
            ' ' => out.push_str("%20"),
            '#' => out.push_str("%23"),
            '?' => out.push_str("%3F"),
            '&' => out.push_str("%26"),
            c => out.push(c),
        }
    }
    format!("sqlite://{}", out)
}

/// Default database location: `~/.local/state/tvsync/tasks.db`.
pub fn default_db_path() -> std::io::Result<PathBuf> {
    let dir = xdg::BaseDirectories::with_prefix("tvsync")?.get_state_home();
    Ok(dir.join("tasks.db"))
}

fn unix_timestamp() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs() as i64
}

/// Handle to the SQLite task table. Cheap to clone.
#[derive(Clone)]
pub struct SqliteTaskStore {
    pool: Pool<Sqlite>,
}

impl SqliteTaskStore {
    /// Open (or create) the default task database and run migrations.
    pub async fn open_default() -> Result<Self, StoreError> {
        Self::open_at(default_db_path()?).await
    }

    /// Open (or create) the database at a specific path. Creates parent dirs if needed.
    pub async fn open_at(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let uri = path_to_sqlite_uri(path) + "?mode=rwc";
        let pool = SqlitePoolOptions::new()
            .max_connections(8)
            .connect(&uri)
            .await?;
        let store = SqliteTaskStore { pool };
        store.migrate().await?;
        Ok(store)
    }

    #[cfg(test)]
    pub(crate) async fn open_memory() -> Result<Self, StoreError> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await?;
        let store = SqliteTaskStore { pool };
        store.migrate().await?;
        Ok(store)
    }

    async fn migrate(&self) -> Result<(), StoreError> {
        // `body` is the camelCase JSON of a Task; `revision` guards concurrent writers.
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS tasks (
                id TEXT PRIMARY KEY NOT NULL,
                body TEXT NOT NULL,
                revision INTEGER NOT NULL DEFAULT 0,
                updated_at INTEGER NOT NULL
            );
            "#,
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn read_with_revision(&self, id: &str) -> Result<Option<(Task, i64)>, StoreError> {
        let row = sqlx::query(r#"SELECT body, revision FROM tasks WHERE id = ?1"#)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        let Some(row) = row else {
            return Ok(None);
        };
        let body: String = row.get("body");
        let revision: i64 = row.get("revision");
        Ok(Some((decode(id, &body)?, revision)))
    }

    /// Insert a brand-new record; false if another writer created it first.
    async fn insert_new(&self, task: &Task) -> Result<bool, StoreError> {
        let body = encode(task)?;
        let r = sqlx::query(
            r#"
            INSERT INTO tasks (id, body, revision, updated_at)
            VALUES (?1, ?2, 0, ?3)
            ON CONFLICT(id) DO NOTHING
            "#,
        )
        .bind(&task.id)
        .bind(body)
        .bind(unix_timestamp())
        .execute(&self.pool)
        .await?;
        Ok(r.rows_affected() == 1)
    }

    /// Replace a record only if nobody wrote it since `revision` was read.
    async fn compare_and_swap(&self, task: &Task, revision: i64) -> Result<bool, StoreError> {
        let body = encode(task)?;
        let r = sqlx::query(
            r#"
            UPDATE tasks
            SET body = ?1,
                revision = revision + 1,
                updated_at = ?2
            WHERE id = ?3 AND revision = ?4
            "#,
        )
        .bind(body)
        .bind(unix_timestamp())
        .bind(&task.id)
        .bind(revision)
        .execute(&self.pool)
        .await?;
        Ok(r.rows_affected() == 1)
    }
}

fn decode(id: &str, body: &str) -> Result<Task, StoreError> {
    serde_json::from_str(body).map_err(|source| StoreError::Corrupt {
        id: id.to_string(),
        source,
    })
}

fn encode(task: &Task) -> Result<String, StoreError> {
    serde_json::to_string(task).map_err(|source| StoreError::Encode {
        id: task.id.clone(),
        source,
    })
}

#[async_trait]
impl TaskStore for SqliteTaskStore {
    async fn read_one(&self, id: &str) -> Result<Option<Task>, StoreError> {
        Ok(self.read_with_revision(id).await?.map(|(task, _)| task))
    }

    async fn read_all(&self) -> Result<Vec<Task>, StoreError> {
        let rows = sqlx::query(r#"SELECT id, body FROM tasks ORDER BY id ASC"#)
            .fetch_all(&self.pool)
            .await?;

        let mut out = Vec::with_capacity(rows.len());
        for row in rows {
            let id: String = row.get("id");
            let body: String = row.get("body");
            out.push(decode(&id, &body)?);
        }
        Ok(out)
    }

    async fn conditional_upsert(
        &self,
        candidate: &Task,
        rules: &[UpsertRule],
    ) -> Result<Option<Task>, StoreError> {
        for attempt in 1..=MAX_UPSERT_ATTEMPTS {
            let previous = self.read_with_revision(&candidate.id).await?;
            let Some(next) = rules::evaluate(previous.as_ref().map(|(t, _)| t), candidate, rules)
            else {
                return Ok(None);
            };
            let written = match previous {
                None => self.insert_new(&next).await?,
                Some((_, revision)) => self.compare_and_swap(&next, revision).await?,
            };
            if written {
                return Ok(Some(next));
            }
            tracing::debug!(task_id = %candidate.id, attempt, "concurrent write, re-evaluating upsert");
        }
        Err(StoreError::Contention {
            id: candidate.id.clone(),
            attempts: MAX_UPSERT_ATTEMPTS,
        })
    }

    async fn delete(&self, id: &str) -> Result<bool, StoreError> {
        let r = sqlx::query(r#"DELETE FROM tasks WHERE id = ?1"#)
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(r.rows_affected() > 0)
    }
}
