//! In-memory session store.
//!
//! Sessions sit in a `HashMap` behind a `tokio::sync::RwLock`; that lock is
//! only held for the copy in or out. Turn ordering comes from a second map of
//! per-session mutexes: a request takes the session's lease before reading it
//! and releases it after writing the result back, so concurrent requests for
//! one session run one after another while other sessions proceed in parallel.
//!
//! There is no eviction. Memory grows with the number of sessions.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::{Mutex, RwLock};
use tracing::debug;
use tutorbot_core::error::SessionError;
use tutorbot_core::session::{Session, SessionGuard, SessionId, SessionPatch, SessionStore};

pub struct InMemorySessionStore {
    sessions: RwLock<HashMap<SessionId, Session>>,
    leases: std::sync::Mutex<HashMap<SessionId, Arc<Mutex<()>>>>,
}

impl InMemorySessionStore {
    pub fn new() -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            leases: std::sync::Mutex::new(HashMap::new()),
        }
    }

    fn lease_for(&self, id: &SessionId) -> Arc<Mutex<()>> {
        let mut leases = self.leases.lock().unwrap_or_else(|e| e.into_inner());
        leases.entry(id.clone()).or_default().clone()
    }
}

impl Default for InMemorySessionStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SessionStore for InMemorySessionStore {
    fn name(&self) -> &str {
        "in_memory"
    }

    async fn get(&self, id: &SessionId) -> Result<Option<Session>, SessionError> {
        Ok(self.sessions.read().await.get(id).cloned())
    }

    async fn create(&self, session: Session) -> Result<Session, SessionError> {
        let mut sessions = self.sessions.write().await;
        if sessions.contains_key(&session.id) {
            debug!(session_id = %session.id, "Resetting existing session");
        }
        sessions.insert(session.id.clone(), session.clone());
        Ok(session)
    }

    async fn upsert(&self, id: &SessionId, patch: SessionPatch) -> Result<Session, SessionError> {
        let mut sessions = self.sessions.write().await;
        let session = sessions
            .get_mut(id)
            .ok_or_else(|| SessionError::UnknownSession(id.to_string()))?;
        session.apply(patch);
        Ok(session.clone())
    }

    async fn lock(&self, id: &SessionId) -> SessionGuard {
        self.lease_for(id).lock_owned().await
    }

    async fn count(&self) -> Result<usize, SessionError> {
        Ok(self.sessions.read().await.len())
    }
}
