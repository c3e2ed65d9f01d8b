//! Conversation sessions keyed by thread id.
//!
//! A session holds the ordered message history plus a checkpoint of the last
//! turn's retrieved context and answer. Sessions are created by the first
//! successful turn and only ever change through `SessionStore::append`.

mod memory;
mod sqlite;

use std::collections::HashMap;
use std::sync::{Arc, Mutex as StdMutex};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

pub use memory::InMemorySessionStore;
pub use sqlite::SqliteSessionStore;

use crate::core::errors::SessionError;
use crate::llm::ChatMessage;
use crate::rag::Chunk;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub thread_id: String,
    pub messages: Vec<ChatMessage>,
    /// Chunks retrieved for the latest turn
    pub context: Vec<Chunk>,
    /// Answer of the latest turn
    pub answer: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

impl Session {
    pub fn new(thread_id: impl Into<String>) -> Self {
        let now = chrono::Utc::now().to_rfc3339();
        Self {
            thread_id: thread_id.into(),
            messages: Vec::new(),
            context: Vec::new(),
            answer: None,
            created_at: now.clone(),
            updated_at: now,
        }
    }

    pub fn info(&self) -> SessionInfo {
        SessionInfo {
            thread_id: self.thread_id.clone(),
            created_at: self.created_at.clone(),
            updated_at: self.updated_at.clone(),
            message_count: self.messages.len(),
            preview: self
                .messages
                .iter()
                .find(|m| m.is_user())
                .map(|m| preview_of(&m.content)),
        }
    }
}

/// One completed question/answer exchange.
#[derive(Debug, Clone)]
pub struct Turn {
    pub question: String,
    pub answer: String,
    pub context: Vec<Chunk>,
}

impl Turn {
    fn messages(&self) -> [ChatMessage; 2] {
        [
            ChatMessage::user(self.question.clone()),
            ChatMessage::assistant(self.answer.clone()),
        ]
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionInfo {
    pub thread_id: String,
    pub created_at: String,
    pub updated_at: String,
    pub message_count: usize,
    pub preview: Option<String>,
}

const PREVIEW_CHARS: usize = 80;

fn preview_of(text: &str) -> String {
    text.chars().take(PREVIEW_CHARS).collect()
}

#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn get(&self, thread_id: &str) -> Result<Option<Session>, SessionError>;

    /// Appends the human and assistant messages of `turn` and replaces the
    /// checkpointed context and answer, all in one write.
    async fn append(&self, thread_id: &str, turn: Turn) -> Result<Session, SessionError>;

    /// Most recently updated first.
    async fn list(&self) -> Result<Vec<SessionInfo>, SessionError>;

    /// Returns whether a session existed.
    async fn delete(&self, thread_id: &str) -> Result<bool, SessionError>;

    /// Writer lock for one thread id. Different ids never contend.
    fn thread_lock(&self, thread_id: &str) -> Arc<Mutex<()>>;
}

/// Lazily created per-thread mutexes.
///
/// An entry only the map refers to is idle: no turn holds or waits on it, so
/// it can be dropped and recreated later without letting two writers in.
#[derive(Default)]
pub struct ThreadLocks {
    locks: StdMutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl ThreadLocks {
    pub fn get(&self, thread_id: &str) -> Arc<Mutex<()>> {
        let mut locks = self.entries();
        locks.retain(|_, lock| Arc::strong_count(lock) > 1);
        locks
            .entry(thread_id.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    /// Forgets the lock of a deleted thread unless a turn still uses it.
    pub fn release(&self, thread_id: &str) {
        let mut locks = self.entries();
        if locks.get(thread_id).is_some_and(|lock| Arc::strong_count(lock) == 1) {
            locks.remove(thread_id);
        }
    }

    pub fn len(&self) -> usize {
        self.entries().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn entries(&self) -> std::sync::MutexGuard<'_, HashMap<String, Arc<Mutex<()>>>> {
        self.locks.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_thread_shares_a_lock_and_others_do_not() {
        let locks = ThreadLocks::default();
        let a1 = locks.get("a");
        let a2 = locks.get("a");
        let b = locks.get("b");
        assert!(Arc::ptr_eq(&a1, &a2));
        assert!(!Arc::ptr_eq(&a1, &b));

        let _held = a1.try_lock().unwrap();
        assert!(a2.try_lock().is_err());
        assert!(b.try_lock().is_ok());
    }

    #[test]
    fn idle_locks_are_pruned_and_held_ones_kept() {
        let locks = ThreadLocks::default();
        drop(locks.get("failed-first-turn"));
        let held = locks.get("busy");
        assert_eq!(locks.len(), 1);

        let again = locks.get("busy");
        assert!(Arc::ptr_eq(&held, &again));
    }

    #[test]
    fn release_skips_locks_in_use() {
        let locks = ThreadLocks::default();
        drop(locks.get("idle"));
        let held = locks.get("busy");
        assert_eq!(locks.len(), 1);

        locks.release("busy");
        assert_eq!(locks.len(), 1);
        assert!(Arc::ptr_eq(&held, &locks.get("busy")));

        drop(held);
        locks.release("busy");
        assert!(locks.is_empty());
    }

    #[test]
    fn info_previews_first_question() {
        let mut session = Session::new("t1");
        session.messages.push(ChatMessage::user("x".repeat(200)));
        session.messages.push(ChatMessage::assistant("ok"));

        let info = session.info();
        assert_eq!(info.message_count, 2);
        assert_eq!(info.preview.map(|p| p.len()), Some(PREVIEW_CHARS));
    }
}
