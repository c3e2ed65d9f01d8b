use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use sqlx::{Row, SqlitePool};
use tokio::sync::Mutex;

use super::{preview_of, Session, SessionInfo, SessionStore, ThreadLocks, Turn};
use crate::core::errors::SessionError;
use crate::llm::ChatMessage;
use crate::rag::Chunk;

/// Sessions persisted across restarts.
pub struct SqliteSessionStore {
    pool: SqlitePool,
    locks: ThreadLocks,
}

impl SqliteSessionStore {
    pub async fn new(db_path: PathBuf) -> Result<Self, SessionError> {
        let options = SqliteConnectOptions::new()
            .filename(&db_path)
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .foreign_keys(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await
            .map_err(|e| SessionError::Backend(format!("Failed to connect to session db: {}", e)))?;

        sqlx::query(
            "CREATE TABLE IF NOT EXISTS sessions (
                id TEXT PRIMARY KEY,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL,
                context TEXT NOT NULL DEFAULT '[]',
                answer TEXT
            )",
        )
        .execute(&pool)
        .await
        .map_err(|e| SessionError::Backend(format!("Failed to init sessions table: {}", e)))?;

        sqlx::query(
            "CREATE TABLE IF NOT EXISTS messages (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                session_id TEXT NOT NULL,
                role TEXT NOT NULL,
                content TEXT NOT NULL,
                created_at TEXT NOT NULL,
                FOREIGN KEY(session_id) REFERENCES sessions(id) ON DELETE CASCADE
            )",
        )
        .execute(&pool)
        .await
        .map_err(|e| SessionError::Backend(format!("Failed to init messages table: {}", e)))?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_messages_session_id ON messages(session_id)")
            .execute(&pool)
            .await
            .map_err(|e| SessionError::Backend(format!("Failed to create index: {}", e)))?;

        Ok(Self {
            pool,
            locks: ThreadLocks::default(),
        })
    }

    async fn messages(&self, thread_id: &str) -> Result<Vec<ChatMessage>, SessionError> {
        let rows = sqlx::query("SELECT role, content FROM messages WHERE session_id = ? ORDER BY id ASC")
            .bind(thread_id)
            .fetch_all(&self.pool)
            .await
            .map_err(SessionError::backend)?;

        rows.iter()
            .map(|row| {
                Ok(ChatMessage {
                    role: row.try_get("role").map_err(SessionError::backend)?,
                    content: row.try_get("content").map_err(SessionError::backend)?,
                })
            })
            .collect()
    }
}

#[async_trait]
impl SessionStore for SqliteSessionStore {
    async fn get(&self, thread_id: &str) -> Result<Option<Session>, SessionError> {
        let row = sqlx::query("SELECT id, created_at, updated_at, context, answer FROM sessions WHERE id = ?")
            .bind(thread_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(SessionError::backend)?;

        let Some(row) = row else {
            return Ok(None);
        };

        let context_json: String = row.try_get("context").map_err(SessionError::backend)?;
        let context: Vec<Chunk> = match serde_json::from_str(&context_json) {
            Ok(context) => context,
            Err(err) => {
                tracing::warn!(thread_id, error = %err, "Discarding unreadable context checkpoint");
                Vec::new()
            }
        };

        Ok(Some(Session {
            thread_id: row.try_get("id").map_err(SessionError::backend)?,
            messages: self.messages(thread_id).await?,
            context,
            answer: row.try_get("answer").map_err(SessionError::backend)?,
            created_at: row.try_get("created_at").map_err(SessionError::backend)?,
            updated_at: row.try_get("updated_at").map_err(SessionError::backend)?,
        }))
    }

    async fn append(&self, thread_id: &str, turn: Turn) -> Result<Session, SessionError> {
        let now = chrono::Utc::now().to_rfc3339();
        let context_json = serde_json::to_string(&turn.context).map_err(SessionError::backend)?;

        let mut tx = self.pool.begin().await.map_err(SessionError::backend)?;

        sqlx::query("INSERT OR IGNORE INTO sessions (id, created_at, updated_at) VALUES (?, ?, ?)")
            .bind(thread_id)
            .bind(&now)
            .bind(&now)
            .execute(&mut *tx)
            .await
            .map_err(SessionError::backend)?;

        sqlx::query("UPDATE sessions SET updated_at = ?, context = ?, answer = ? WHERE id = ?")
            .bind(&now)
            .bind(&context_json)
            .bind(&turn.answer)
            .bind(thread_id)
            .execute(&mut *tx)
            .await
            .map_err(SessionError::backend)?;

        for message in turn.messages() {
            sqlx::query("INSERT INTO messages (session_id, role, content, created_at) VALUES (?, ?, ?, ?)")
                .bind(thread_id)
                .bind(&message.role)
                .bind(&message.content)
                .bind(&now)
                .execute(&mut *tx)
                .await
                .map_err(SessionError::backend)?;
        }

        tx.commit().await.map_err(SessionError::backend)?;

        self.get(thread_id)
            .await?
            .ok_or_else(|| SessionError::Backend(format!("session '{}' missing after append", thread_id)))
    }

    async fn list(&self) -> Result<Vec<SessionInfo>, SessionError> {
        let rows = sqlx::query(
            "SELECT s.id, s.created_at, s.updated_at, \
             COUNT(m.id) AS msg_count, \
             (SELECT content FROM messages p WHERE p.session_id = s.id AND p.role = 'user' ORDER BY p.id ASC LIMIT 1) AS first_question \
             FROM sessions s \
             LEFT JOIN messages m ON s.id = m.session_id \
             GROUP BY s.id \
             ORDER BY s.updated_at DESC, s.id ASC",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(SessionError::backend)?;

        rows.iter()
            .map(|row| {
                let first_question: Option<String> = row.try_get("first_question").map_err(SessionError::backend)?;
                let count: i64 = row.try_get("msg_count").map_err(SessionError::backend)?;
                Ok(SessionInfo {
                    thread_id: row.try_get("id").map_err(SessionError::backend)?,
                    created_at: row.try_get("created_at").map_err(SessionError::backend)?,
                    updated_at: row.try_get("updated_at").map_err(SessionError::backend)?,
                    message_count: count.max(0) as usize,
                    preview: first_question.as_deref().map(preview_of),
                })
            })
            .collect()
    }

    async fn delete(&self, thread_id: &str) -> Result<bool, SessionError> {
        let result = sqlx::query("DELETE FROM sessions WHERE id = ?")
            .bind(thread_id)
            .execute(&self.pool)
            .await
            .map_err(SessionError::backend)?;
        self.locks.release(thread_id);
        Ok(result.rows_affected() > 0)
    }

    fn thread_lock(&self, thread_id: &str) -> Arc<Mutex<()>> {
        self.locks.get(thread_id)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    async fn test_store() -> (SqliteSessionStore, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let store = SqliteSessionStore::new(dir.path().join("sessions.db")).await.unwrap();
        (store, dir)
    }

    fn turn(question: &str, answer: &str) -> Turn {
        Turn {
            question: question.to_string(),
            answer: answer.to_string(),
            context: vec![Chunk {
                id: "c1".to_string(),
                text: "Refunds within 30 days".to_string(),
                metadata: HashMap::from([("source".to_string(), "policy.pdf".to_string())]),
                embedding: vec![0.5, 0.5],
            }],
        }
    }

    #[tokio::test]
    async fn append_persists_messages_and_checkpoint() {
        let (store, _dir) = test_store().await;

        store.append("t1", turn("q1", "a1")).await.unwrap();
        let session = store.append("t1", turn("q2", "a2")).await.unwrap();

        let roles: Vec<&str> = session.messages.iter().map(|m| m.role.as_str()).collect();
        assert_eq!(roles, vec!["user", "assistant", "user", "assistant"]);
        assert_eq!(session.answer.as_deref(), Some("a2"));
        assert_eq!(session.context.len(), 1);
        assert_eq!(session.context[0].metadata.get("source").map(String::as_str), Some("policy.pdf"));
        assert!(session.context[0].embedding.is_empty());
    }

    #[tokio::test]
    async fn list_counts_messages_and_previews_first_question() {
        let (store, _dir) = test_store().await;
        store.append("t1", turn("first question", "a1")).await.unwrap();
        store.append("t1", turn("second question", "a2")).await.unwrap();

        let sessions = store.list().await.unwrap();
        assert_eq!(sessions.len(), 1);
        assert_eq!(sessions[0].message_count, 4);
        assert_eq!(sessions[0].preview.as_deref(), Some("first question"));
    }

    #[tokio::test]
    async fn delete_cascades_to_messages() {
        let (store, _dir) = test_store().await;
        store.append("t1", turn("q1", "a1")).await.unwrap();

        assert!(store.delete("t1").await.unwrap());
        assert!(store.get("t1").await.unwrap().is_none());

        let remaining: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM messages")
            .fetch_one(&store.pool)
            .await
            .unwrap();
        assert_eq!(remaining, 0);
    }

    #[tokio::test]
    async fn sessions_survive_reopening() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sessions.db");
        {
            let store = SqliteSessionStore::new(path.clone()).await.unwrap();
            store.append("t1", turn("q1", "a1")).await.unwrap();
            store.pool.close().await;
        }

        let reopened = SqliteSessionStore::new(path).await.unwrap();
        assert_eq!(reopened.get("t1").await.unwrap().unwrap().messages.len(), 2);
    }

    #[tokio::test]
    async fn unreadable_context_checkpoint_keeps_the_conversation() {
        let (store, _dir) = test_store().await;
        store.append("t1", turn("q1", "a1")).await.unwrap();

        sqlx::query("UPDATE sessions SET context = 'not json' WHERE id = 't1'")
            .execute(&store.pool)
            .await
            .unwrap();

        let session = store.get("t1").await.unwrap().unwrap();
        assert!(session.context.is_empty());
        assert_eq!(session.messages.len(), 2);
        assert_eq!(session.answer.as_deref(), Some("a1"));
    }

    #[tokio::test]
    async fn delete_forgets_the_thread_lock() {
        let (store, _dir) = test_store().await;
        drop(store.thread_lock("t1"));
        store.append("t1", turn("q1", "a1")).await.unwrap();

        assert!(store.delete("t1").await.unwrap());
        assert!(store.locks.is_empty());
    }
}
