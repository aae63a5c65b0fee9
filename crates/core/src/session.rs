//! Session domain types and the `SessionStore` trait.
//!
//! A session is one learner's ongoing conversation: the configuration chosen
//! at start (subject, grade, style, level), the normalized topic, the
//! append-only history, the turn counter, and the mastery estimate.
//!
//! Stores hand out per-session write leases so that two concurrent requests
//! for the same session are serialized and turns stay ordered.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::SessionError;
use crate::message::Message;

/// History entries are plain user/assistant messages.
pub type HistoryEntry = Message;

/// Held while a request owns a session. Dropping it releases the session.
pub type SessionGuard = tokio::sync::OwnedMutexGuard<()>;

/// Client-supplied ids shorter than this are replaced with a fresh one.
const MIN_CLIENT_ID_LEN: usize = 6;

/// Opaque identifier for a session.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(pub String);

impl SessionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Keep a usable client-supplied id, or issue a new one.
    pub fn ensure(candidate: Option<&str>) -> Self {
        match candidate.map(str::trim) {
            Some(id) if id.chars().count() >= MIN_CLIENT_ID_LEN => Self(id.to_string()),
            _ => Self::new(),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl From<&str> for SessionId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Settings chosen when the session starts. Later messages do not change them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionConfig {
    pub subject: String,
    pub grade: String,
    pub style: String,
    pub level: String,
}

/// Structured form of the learner's initial request.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Normalized {
    pub topic: String,
    #[serde(default)]
    pub goals: Vec<String>,
    #[serde(default)]
    pub constraints: Vec<String>,
    #[serde(default)]
    pub context_stub: String,
}

/// Server-held state for one conversation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub id: SessionId,
    pub config: SessionConfig,
    pub normalized: Normalized,
    pub history: Vec<HistoryEntry>,
    /// Starts at 1; incremented once per completed chat exchange.
    pub turn: u32,
    /// Always within `[0, 1]`.
    pub mastery: f32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Session {
    /// A fresh session at turn 1 with zero mastery.
    pub fn new(id: SessionId, config: SessionConfig, normalized: Normalized) -> Self {
        let now = Utc::now();
        Self {
            id,
            config,
            normalized,
            history: Vec::new(),
            turn: 1,
            mastery: 0.0,
            created_at: now,
            updated_at: now,
        }
    }

    /// Seed the history with the learner's opening query.
    pub fn with_opening(mut self, query: impl Into<String>) -> Self {
        self.history.push(Message::user(query));
        self
    }

    /// The most recent `window` history entries, oldest first.
    pub fn recent_history(&self, window: usize) -> &[HistoryEntry] {
        let start = self.history.len().saturating_sub(window);
        &self.history[start..]
    }

    /// Apply a patch while preserving the session invariants:
    /// the turn never decreases, mastery stays in `[0, 1]`, history only grows.
    pub fn apply(&mut self, patch: SessionPatch) {
        if let Some(turn) = patch.turn {
            self.turn = self.turn.max(turn);
        }
        if let Some(mastery) = patch.mastery {
            self.mastery = clamp_unit(mastery);
        }
        if let Some(normalized) = patch.normalized {
            self.normalized = normalized;
        }
        self.history.extend(patch.append);
        self.updated_at = Utc::now();
    }
}

/// A partial update to a stored session.
#[derive(Debug, Clone, Default)]
pub struct SessionPatch {
    pub turn: Option<u32>,
    pub mastery: Option<f32>,
    pub normalized: Option<Normalized>,
    /// Entries appended to the history, in order.
    pub append: Vec<HistoryEntry>,
}

/// Clamp to `[0, 1]`, mapping NaN to 0.
pub fn clamp_unit(value: f32) -> f32 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, 1.0)
    }
}

/// The session storage abstraction.
///
/// Implementations: in-memory (process lifetime). A persistent backend only
/// needs to implement these operations.
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// The backend name (e.g., "in_memory").
    fn name(&self) -> &str;

    /// Snapshot of a session, if it exists.
    async fn get(&self, id: &SessionId) -> std::result::Result<Option<Session>, SessionError>;

    /// Insert a session, replacing any existing one with the same id.
    async fn create(&self, session: Session) -> std::result::Result<Session, SessionError>;

    /// Apply a patch to an existing session and return the updated snapshot.
    /// Fails with `SessionError::UnknownSession` if the id is not stored.
    async fn upsert(
        &self,
        id: &SessionId,
        patch: SessionPatch,
    ) -> std::result::Result<Session, SessionError>;

    /// Acquire the write lease for a session id (whether or not it exists yet).
    async fn lock(&self, id: &SessionId) -> SessionGuard;

    /// Number of stored sessions.
    async fn count(&self) -> std::result::Result<usize, SessionError>;
}
