//! Append-only message log keyed by conversation thread.

use std::future::Future;
use std::path::PathBuf;
use std::pin::Pin;
use std::str::FromStr;

use chrono::{TimeZone, Utc};
use tokio::sync::RwLock;
use tokio_rusqlite::Connection;
use tracing::{debug, info};

use crate::config::StorageConfig;
use crate::store::errors::{StoreError, StoreResult};
use crate::store::message::{Message, Role};

/// Boxed future type for conversation store operations.
pub type StoreFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Durable, ordered, per-thread message log.
pub trait ConversationStore: Send + Sync {
    /// Open the backing store and ensure the schema exists. Safe to repeat.
    ///
    /// # Errors
    /// Returns [`StoreError::Unavailable`] if the location cannot be opened or written.
    fn initialize(&self) -> StoreFuture<'_, StoreResult<()>>;

    /// Append one message and return its assigned id.
    ///
    /// # Errors
    /// Returns [`StoreError::Write`] if the insert fails.
    fn append(&self, thread_id: &str, role: Role, content: &str)
    -> StoreFuture<'_, StoreResult<i64>>;

    /// Load every message of a thread, oldest first.
    ///
    /// # Errors
    /// Returns [`StoreError::Read`] if the query fails, or
    /// [`StoreError::InvalidRow`] if a stored row cannot be decoded.
    fn history(&self, thread_id: &str) -> StoreFuture<'_, StoreResult<Vec<Message>>>;

    /// Release the underlying connection. Safe to repeat or call before `initialize`.
    ///
    /// # Errors
    /// Returns [`StoreError::Unavailable`] if the connection fails to close cleanly.
    fn close(&self) -> StoreFuture<'_, StoreResult<()>>;
}

/// `SQLite` implementation of the conversation store.
pub struct SqliteConversationStore {
    path: PathBuf,
    table: String,
    conn: RwLock<Option<Connection>>,
}

impl SqliteConversationStore {
    /// Build a store for the configured file without opening it.
    #[must_use]
    pub fn new(config: &StorageConfig) -> Self {
        Self {
            path: config.sqlite_path.clone(),
            table: config.messages_table.clone(),
            conn: RwLock::new(None),
        }
    }

    /// Build and initialize a store in one step.
    ///
    /// # Errors
    /// Returns [`StoreError::Unavailable`] if the database cannot be opened.
    pub async fn open(config: &StorageConfig) -> StoreResult<Self> {
        let store = Self::new(config);
        store.initialize().await?;
        Ok(store)
    }

    async fn create_schema(conn: &Connection, table: String) -> StoreResult<()> {
        conn.call(move |db| {
            db.execute_batch(&format!(
                "CREATE TABLE IF NOT EXISTS {table} (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    thread_id TEXT NOT NULL,
                    role TEXT NOT NULL CHECK (role IN ('user', 'assistant')),
                    content TEXT NOT NULL,
                    created_at INTEGER NOT NULL
                );
                CREATE INDEX IF NOT EXISTS idx_{table}_thread_created
                    ON {table} (thread_id, created_at, id);"
            ))?;
            Ok(())
        })
        .await
        .map_err(|err| StoreError::Unavailable(format!("cannot create schema: {err}")))
    }
}

impl ConversationStore for SqliteConversationStore {
    fn initialize(&self) -> StoreFuture<'_, StoreResult<()>> {
        Box::pin(async move {
            let mut guard = self.conn.write().await;
            if let Some(conn) = guard.as_ref() {
                return Self::create_schema(conn, self.table.clone()).await;
            }

            let conn = Connection::open(&self.path).await.map_err(|err| {
                StoreError::Unavailable(format!("cannot open {}: {err}", self.path.display()))
            })?;
            Self::create_schema(&conn, self.table.clone()).await?;
            info!(path = %self.path.display(), "conversation store ready");
            *guard = Some(conn);
            Ok(())
        })
    }

    fn append(
        &self,
        thread_id: &str,
        role: Role,
        content: &str,
    ) -> StoreFuture<'_, StoreResult<i64>> {
        let thread = thread_id.to_string();
        let content = content.to_string();
        Box::pin(async move {
            let guard = self.conn.read().await;
            let conn = guard
                .as_ref()
                .ok_or_else(|| StoreError::Unavailable("store is not open".to_string()))?;
            let table = self.table.clone();
            let log_thread = thread.clone();

            let id = conn
                .call(move |db| {
                    let created_at = Utc::now().timestamp_millis();
                    db.execute(
                        &format!(
                            "INSERT INTO {table} (thread_id, role, content, created_at)
                             VALUES (?1, ?2, ?3, ?4)"
                        ),
                        rusqlite::params![thread, role.as_str(), content, created_at],
                    )?;
                    Ok(db.last_insert_rowid())
                })
                .await
                .map_err(StoreError::Write)?;
            drop(guard);

            debug!(thread_id = %log_thread, id, %role, "message appended");
            Ok(id)
        })
    }

    fn history(&self, thread_id: &str) -> StoreFuture<'_, StoreResult<Vec<Message>>> {
        let thread = thread_id.to_string();
        Box::pin(async move {
            let guard = self.conn.read().await;
            let conn = guard
                .as_ref()
                .ok_or_else(|| StoreError::Unavailable("store is not open".to_string()))?;
            let table = self.table.clone();

            let rows = conn
                .call(move |db| {
                    let mut stmt = db.prepare(&format!(
                        "SELECT id, thread_id, role, content, created_at
                         FROM {table}
                         WHERE thread_id = ?1
                         ORDER BY created_at ASC, id ASC"
                    ))?;
                    let rows = stmt
                        .query_map(rusqlite::params![thread], |row| {
                            let id: i64 = row.get(0)?;
                            let stored_thread: String = row.get(1)?;
                            let role: String = row.get(2)?;
                            let content: String = row.get(3)?;
                            let created_at: i64 = row.get(4)?;
                            Ok((id, stored_thread, role, content, created_at))
                        })?
                        .collect::<Result<Vec<_>, rusqlite::Error>>()?;
                    Ok(rows)
                })
                .await
                .map_err(StoreError::Read)?;
            drop(guard);

            let mut messages = Vec::with_capacity(rows.len());
            for (id, stored_thread, role, content, created_at) in rows {
                let role = Role::from_str(&role).map_err(|value| {
                    StoreError::InvalidRow(format!("message {id} has unknown role {value:?}"))
                })?;
                let created_at = Utc.timestamp_millis_opt(created_at).single().ok_or_else(|| {
                    StoreError::InvalidRow(format!("message {id} has invalid timestamp"))
                })?;
                messages.push(Message {
                    id,
                    thread_id: stored_thread,
                    role,
                    content,
                    created_at,
                });
            }

            Ok(messages)
        })
    }

    fn close(&self) -> StoreFuture<'_, StoreResult<()>> {
        Box::pin(async move {
            let taken = self.conn.write().await.take();
            let Some(conn) = taken else {
                return Ok(());
            };
            conn.close()
                .await
                .map_err(|err| StoreError::Unavailable(format!("close failed: {err}")))?;
            info!("conversation store closed");
            Ok(())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config_in(dir: &tempfile::TempDir) -> StorageConfig {
        StorageConfig {
            sqlite_path: dir.path().join("messages.db"),
            ..StorageConfig::default()
        }
    }

    #[tokio::test]
    async fn history_of_unknown_thread_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = SqliteConversationStore::open(&config_in(&dir)).await.unwrap();

        assert!(store.history("nobody").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn history_returns_turns_in_insertion_order() {
        let dir = tempfile::tempdir().unwrap();
        let store = SqliteConversationStore::open(&config_in(&dir)).await.unwrap();

        let turns = 3;
        let mut ids = Vec::new();
        for turn in 0..turns {
            ids.push(
                store
                    .append("t1", Role::User, &format!("question {turn}"))
                    .await
                    .unwrap(),
            );
            ids.push(
                store
                    .append("t1", Role::Assistant, &format!("answer {turn}"))
                    .await
                    .unwrap(),
            );
        }

        let history = store.history("t1").await.unwrap();
        assert_eq!(history.len(), 2 * turns);
        assert_eq!(history.iter().map(|m| m.id).collect::<Vec<_>>(), ids);
        assert!(ids.windows(2).all(|pair| pair[0] < pair[1]));
        assert_eq!(history[0].role, Role::User);
        assert_eq!(history[0].content, "question 0");
        assert_eq!(history[5].role, Role::Assistant);
        assert_eq!(history[5].content, "answer 2");
    }

    #[tokio::test]
    async fn threads_are_isolated_and_content_is_verbatim() {
        let dir = tempfile::tempdir().unwrap();
        let store = SqliteConversationStore::open(&config_in(&dir)).await.unwrap();

        store.append("a", Role::User, "  padded  ").await.unwrap();
        store.append("b", Role::User, "other").await.unwrap();

        let history = store.history("a").await.unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].thread_id, "a");
        assert_eq!(history[0].content, "  padded  ");
    }

    #[tokio::test]
    async fn initialize_is_idempotent_and_data_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let config = config_in(&dir);

        let store = SqliteConversationStore::open(&config).await.unwrap();
        store.initialize().await.unwrap();
        store.append("t1", Role::User, "Hello").await.unwrap();
        store.close().await.unwrap();

        let reopened = SqliteConversationStore::open(&config).await.unwrap();
        let history = reopened.history("t1").await.unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].content, "Hello");
    }

    #[tokio::test]
    async fn close_is_idempotent_and_later_calls_fail() {
        let dir = tempfile::tempdir().unwrap();
        let never_opened = SqliteConversationStore::new(&config_in(&dir));
        never_opened.close().await.unwrap();

        let store = SqliteConversationStore::open(&config_in(&dir)).await.unwrap();
        store.close().await.unwrap();
        store.close().await.unwrap();

        let err = store.append("t1", Role::User, "late").await.unwrap_err();
        assert!(matches!(err, StoreError::Unavailable(_)));
    }

    #[tokio::test]
    async fn open_fails_for_unreachable_location() {
        let dir = tempfile::tempdir().unwrap();
        let config = StorageConfig {
            sqlite_path: dir.path().join("missing").join("nested").join("messages.db"),
            ..StorageConfig::default()
        };

        let err = SqliteConversationStore::open(&config).await.err().unwrap();
        assert!(matches!(err, StoreError::Unavailable(_)));
    }

    #[tokio::test]
    async fn rows_with_unknown_roles_fail_to_decode() {
        let dir = tempfile::tempdir().unwrap();
        let config = config_in(&dir);
        {
            let raw = rusqlite::Connection::open(&config.sqlite_path).unwrap();
            raw.execute_batch(
                "CREATE TABLE messages (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    thread_id TEXT NOT NULL,
                    role TEXT NOT NULL,
                    content TEXT NOT NULL,
                    created_at INTEGER NOT NULL
                );
                INSERT INTO messages (thread_id, role, content, created_at)
                    VALUES ('t1', 'system', 'injected', 0);",
            )
            .unwrap();
        }

        let store = SqliteConversationStore::open(&config).await.unwrap();
        let err = store.history("t1").await.unwrap_err();
        assert!(matches!(err, StoreError::InvalidRow(_)));
    }
}
