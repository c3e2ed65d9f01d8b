use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::{Mutex, RwLock};

use super::{Session, SessionInfo, SessionStore, ThreadLocks, Turn};
use crate::core::errors::SessionError;

/// Process-lifetime session store.
#[derive(Default)]
pub struct InMemorySessionStore {
    sessions: RwLock<HashMap<String, Session>>,
    locks: ThreadLocks,
}

impl InMemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SessionStore for InMemorySessionStore {
    async fn get(&self, thread_id: &str) -> Result<Option<Session>, SessionError> {
        Ok(self.sessions.read().await.get(thread_id).cloned())
    }

    async fn append(&self, thread_id: &str, turn: Turn) -> Result<Session, SessionError> {
        let mut sessions = self.sessions.write().await;
        let session = sessions
            .entry(thread_id.to_string())
            .or_insert_with(|| Session::new(thread_id));

        session.messages.extend(turn.messages());
        session.context = turn.context;
        session.answer = Some(turn.answer);
        session.updated_at = chrono::Utc::now().to_rfc3339();

        Ok(session.clone())
    }

    async fn list(&self) -> Result<Vec<SessionInfo>, SessionError> {
        let mut infos: Vec<SessionInfo> = self.sessions.read().await.values().map(Session::info).collect();
        infos.sort_by(|a, b| {
            b.updated_at
                .cmp(&a.updated_at)
                .then_with(|| a.thread_id.cmp(&b.thread_id))
        });
        Ok(infos)
    }

    async fn delete(&self, thread_id: &str) -> Result<bool, SessionError> {
        let existed = self.sessions.write().await.remove(thread_id).is_some();
        self.locks.release(thread_id);
        Ok(existed)
    }

    fn thread_lock(&self, thread_id: &str) -> Arc<Mutex<()>> {
        self.locks.get(thread_id)
    }
}
