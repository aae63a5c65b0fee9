//! Shared fixtures for gateway tests.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use axum::body::Body;
use axum::http::Request;
use axum::response::Response;
use http_body_util::BodyExt;
use tutorbot_config::{SessionPolicy, TutorConfig};
use tutorbot_core::error::{ProviderError, SessionError};
use tutorbot_core::message::Message;
use tutorbot_core::provider::{Provider, ProviderRequest, ProviderResponse};
use tutorbot_core::session::{Session, SessionGuard, SessionId, SessionPatch, SessionStore};
use tutorbot_knowledge::TopicLibrary;
use tutorbot_sessions::InMemorySessionStore;

use crate::{AppState, SharedState};

const TEXT_REPLY: &str = "Разберём по шагам: $ax^2 + bx + c = 0$.";
const QUIZ_REPLY: &str = r#"{"checks":[
  {"type":"mcq","question":"Сколько корней при D>0?","options":["0","1","2"],"answer":"2"},
  {"type":"short","question":"Как называется b^2-4ac?","answer":"дискриминант|D"}
]}"#;
const NORMALIZE_REPLY: &str =
    r#"```json
{"topic":"Квадратные уравнения","goals":["Понять дискриминант"],"constraints":["9 класс"]}
```"#;

/// Answers the normalize, quiz and explanation calls by their system prompt.
pub struct MockTutorProvider {
    configured: bool,
}

impl MockTutorProvider {
    pub fn new() -> Self {
        Self { configured: true }
    }

    /// Behaves like a provider with no API key.
    pub fn unconfigured() -> Self {
        Self { configured: false }
    }
}

#[async_trait]
impl Provider for MockTutorProvider {
    fn name(&self) -> &str {
        "mock_tutor"
    }

    fn is_configured(&self) -> bool {
        self.configured
    }

    async fn complete(&self, request: ProviderRequest) -> Result<ProviderResponse, ProviderError> {
        if !self.configured {
            return Err(ProviderError::NotConfigured("no key".into()));
        }
        let system = request
            .messages
            .first()
            .map(|m| m.content.as_str())
            .unwrap_or_default();
        let reply = if system.contains("нормализует запрос") {
            NORMALIZE_REPLY
        } else if system.contains("JSON-массиве") {
            QUIZ_REPLY
        } else {
            TEXT_REPLY
        };
        Ok(ProviderResponse {
            message: Message::assistant(reply),
            usage: None,
            model: request.model,
        })
    }
}

pub fn test_state(provider: MockTutorProvider, policy: SessionPolicy) -> SharedState {
    test_state_with_store(provider, policy, Arc::new(InMemorySessionStore::new()))
}

pub fn test_state_with_store(
    provider: MockTutorProvider,
    policy: SessionPolicy,
    sessions: Arc<dyn SessionStore>,
) -> SharedState {
    let tutor = TutorConfig {
        session_policy: policy,
        ..TutorConfig::default()
    };
    Arc::new(AppState::new(
        Arc::new(provider),
        "mock-model",
        TopicLibrary::new(),
        tutor,
        sessions,
    ))
}

/// In-memory store that counts how many leases were handed out.
pub struct LeaseCountingStore {
    inner: InMemorySessionStore,
    leases: AtomicUsize,
}

impl LeaseCountingStore {
    pub fn new() -> Self {
        Self {
            inner: InMemorySessionStore::new(),
            leases: AtomicUsize::new(0),
        }
    }

    pub fn leases_taken(&self) -> usize {
        self.leases.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SessionStore for LeaseCountingStore {
    fn name(&self) -> &str {
        "lease_counting"
    }

    async fn get(&self, id: &SessionId) -> Result<Option<Session>, SessionError> {
        self.inner.get(id).await
    }

    async fn create(&self, session: Session) -> Result<Session, SessionError> {
        self.inner.create(session).await
    }

    async fn upsert(&self, id: &SessionId, patch: SessionPatch) -> Result<Session, SessionError> {
        self.inner.upsert(id, patch).await
    }

    async fn lock(&self, id: &SessionId) -> SessionGuard {
        self.leases.fetch_add(1, Ordering::SeqCst);
        self.inner.lock(id).await
    }

    async fn count(&self) -> Result<usize, SessionError> {
        self.inner.count().await
    }
}

pub fn post_json(uri: &str, body: serde_json::Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

pub async fn body_json(response: Response) -> serde_json::Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}
