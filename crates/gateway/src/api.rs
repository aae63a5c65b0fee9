//! Tutoring API.
//!
//! - `POST /api/normalize`  start (or restart) a session from a request
//! - `POST /api/chat`       one dialog turn
//!
//! Both take and return JSON. Failures are `{"error": "..."}` with 400 for
//! bad input or an unknown session and 500 for storage trouble.

use axum::{
    Router,
    extract::{State, rejection::JsonRejection},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::post,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info};

use tutorbot_config::SessionPolicy;
use tutorbot_core::error::{Error, SessionError, ValidationError};
use tutorbot_core::session::{Normalized, Session, SessionConfig, SessionId};
use tutorbot_core::turn::AssistantTurn;
use tutorbot_tutor::normalize::DEFAULT_LEVEL;

use crate::SharedState;

/// Defaults for sessions created implicitly by `/api/chat`.
const DEFAULT_SUBJECT: &str = "general";
const DEFAULT_GRADE: &str = "9";
const DEFAULT_STYLE: &str = "step_by_step";

pub fn api_router(state: SharedState) -> Router {
    Router::new()
        .route("/api/normalize", post(normalize_handler))
        .route("/api/chat", post(chat_handler))
        .with_state(state)
}

// ── Request / response types ──────────────────────────────────────────────

/// A field clients send either as a string or as a number (`"grade": 9`).
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum Scalar {
    Text(String),
    Number(serde_json::Number),
}

impl Scalar {
    fn into_text(self) -> String {
        match self {
            Scalar::Text(s) => s,
            Scalar::Number(n) => n.to_string(),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NormalizeRequest {
    pub session_id: Option<String>,
    pub subject: Option<String>,
    pub grade: Option<Scalar>,
    pub style: Option<String>,
    pub level: Option<String>,
    pub query: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatRequest {
    pub session_id: Option<String>,
    pub message: Option<String>,
    pub subject: Option<String>,
    pub grade: Option<Scalar>,
    pub style: Option<String>,
    pub level: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Conversation {
    pub state_id: String,
    pub turn: u32,
}

#[derive(Debug, Serialize)]
pub struct NormalizeResponse {
    pub normalized: Normalized,
    pub conversation: Conversation,
}

#[derive(Debug, Serialize)]
pub struct ChatResponse {
    pub assistant: AssistantTurn,
    pub conversation: Conversation,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

// ── Errors ────────────────────────────────────────────────────────────────

/// An error on its way to becoming an HTTP response.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        self.status
    }
}

impl From<Error> for ApiError {
    fn from(err: Error) -> Self {
        let status = match &err {
            Error::Validation(_) | Error::Session(SessionError::UnknownSession(_)) => {
                StatusCode::BAD_REQUEST
            }
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        let message = match err {
            Error::Validation(e) => e.to_string(),
            Error::Session(e) => e.to_string(),
            other => other.to_string(),
        };
        Self { status, message }
    }
}

impl From<ValidationError> for ApiError {
    fn from(err: ValidationError) -> Self {
        Error::from(err).into()
    }
}

impl From<SessionError> for ApiError {
    fn from(err: SessionError) -> Self {
        Error::from(err).into()
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ValidationError::MalformedBody(rejection.body_text()).into()
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if self.status.is_server_error() {
            error!(status = %self.status, error = %self.message, "Request failed");
        } else {
            debug!(status = %self.status, error = %self.message, "Request rejected");
        }
        (
            self.status,
            Json(ErrorResponse {
                error: self.message,
            }),
        )
            .into_response()
    }
}

// ── Field helpers ─────────────────────────────────────────────────────────

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn required(value: Option<String>, field: &'static str) -> Result<String, ValidationError> {
    non_empty(value).ok_or(ValidationError::MissingField(field))
}

/// Cut `text` to at most `max_chars` characters.
pub fn truncate_chars(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((byte_idx, _)) => text[..byte_idx].to_string(),
        None => text.to_string(),
    }
}

// ── Handlers ──────────────────────────────────────────────────────────────

async fn normalize_handler(
    State(state): State<SharedState>,
    payload: Result<Json<NormalizeRequest>, JsonRejection>,
) -> Result<Json<NormalizeResponse>, ApiError> {
    let Json(req) = payload?;

    let config = SessionConfig {
        subject: required(req.subject, "subject")?,
        grade: required(req.grade.map(Scalar::into_text), "grade")?,
        style: required(req.style, "style")?,
        level: non_empty(req.level).unwrap_or_else(|| DEFAULT_LEVEL.to_string()),
    };
    let query = required(req.query, "query")?;
    let id = SessionId::ensure(req.session_id.as_deref());

    let _lease = state.sessions.lock(&id).await;

    let normalized = state.normalizer.normalize(&config, &query).await;
    let session = state
        .sessions
        .create(Session::new(id.clone(), config, normalized).with_opening(query))
        .await?;

    info!(
        session_id = %id,
        subject = %session.config.subject,
        topic = %session.normalized.topic,
        "Session started"
    );

    Ok(Json(NormalizeResponse {
        conversation: Conversation {
            state_id: id.to_string(),
            turn: session.turn,
        },
        normalized: session.normalized,
    }))
}

async fn chat_handler(
    State(state): State<SharedState>,
    payload: Result<Json<ChatRequest>, JsonRejection>,
) -> Result<Json<ChatResponse>, ApiError> {
    let Json(req) = payload?;
    let tutor = state.engine.config();

    let message = required(req.message.clone(), "message")?;
    let message = truncate_chars(&message, tutor.max_message_chars);

    let requested = non_empty(req.session_id.clone());
    let id = SessionId::ensure(requested.as_deref());
    let strict = tutor.session_policy == SessionPolicy::RequireNormalize;

    // Unknown ids are turned away before a lease is allocated for them.
    if strict && state.sessions.get(&id).await?.is_none() {
        return Err(SessionError::UnknownSession(requested.unwrap_or_default()).into());
    }

    // Held until the turn is persisted: one turn per session at a time.
    let _lease = state.sessions.lock(&id).await;

    let session = match state.sessions.get(&id).await? {
        Some(session) => session,
        None if strict => {
            return Err(SessionError::UnknownSession(requested.unwrap_or_default()).into());
        }
        None => provision(&state, id.clone(), req, &message).await?,
    };

    let outcome = state.engine.turn(&session, &message).await;
    let updated = state
        .sessions
        .upsert(&id, outcome.patch(&message))
        .await?;

    Ok(Json(ChatResponse {
        assistant: outcome.assistant,
        conversation: Conversation {
            state_id: id.to_string(),
            turn: updated.turn,
        },
    }))
}

/// Create a session for a chat that arrived without a known id, using the
/// inline settings and the message itself as the opening query.
async fn provision(
    state: &SharedState,
    id: SessionId,
    req: ChatRequest,
    message: &str,
) -> Result<Session, ApiError> {
    let config = SessionConfig {
        subject: non_empty(req.subject).unwrap_or_else(|| DEFAULT_SUBJECT.to_string()),
        grade: non_empty(req.grade.map(Scalar::into_text))
            .unwrap_or_else(|| DEFAULT_GRADE.to_string()),
        style: non_empty(req.style).unwrap_or_else(|| DEFAULT_STYLE.to_string()),
        level: non_empty(req.level).unwrap_or_else(|| DEFAULT_LEVEL.to_string()),
    };

    let normalized = state.normalizer.normalize(&config, message).await;
    let session = state
        .sessions
        .create(Session::new(id, config, normalized))
        .await?;

    info!(
        session_id = %session.id,
        subject = %session.config.subject,
        topic = %session.normalized.topic,
        "Session created from chat"
    );
    Ok(session)
}
