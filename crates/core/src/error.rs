//! Error types for the Tutorbot domain.
//!
//! Uses `thiserror` for ergonomic error definitions.
//! Each bounded context has its own error variant.

use thiserror::Error;

/// The top-level error type for all Tutorbot operations.
#[derive(Debug, Error)]
pub enum Error {
    // --- LLM errors ---
    #[error("LLM error: {0}")]
    Llm(#[from] LlmError),

    // --- Session errors ---
    #[error("Session error: {0}")]
    Session(#[from] SessionError),

    // --- Request validation ---
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    // --- Configuration errors ---
    #[error("Configuration error: {message}")]
    Config { message: String },

    // --- Serialization ---
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    // --- Generic ---
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type alias using our Error.
pub type Result<T> = std::result::Result<T, Error>;

// --- Bounded context errors ---

/// Transport or authentication failure talking to the chat-completion endpoint.
#[derive(Debug, Clone, Error)]
pub enum ProviderError {
    #[error("API request failed: {message} (status: {status_code})")]
    ApiError { status_code: u16, message: String },

    #[error("Rate limited by provider, retry after {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },

    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("Provider not configured: {0}")]
    NotConfigured(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Provider returned empty content")]
    EmptyResponse,
}

/// Failure of an LLM gateway call.
///
/// `Parse` only arises from JSON-mode calls, when none of the extraction
/// stages produced valid JSON.
#[derive(Debug, Clone, Error)]
pub enum LlmError {
    #[error(transparent)]
    Provider(#[from] ProviderError),

    #[error("Failed to parse JSON from model output: {0}")]
    Parse(String),
}

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("Unknown sessionId '{0}'. Call /api/normalize first.")]
    UnknownSession(String),

    #[error("Session storage error: {0}")]
    Storage(String),
}

/// A malformed or incomplete request.
#[derive(Debug, Clone, Error)]
pub enum ValidationError {
    #[error("missing required field '{0}'")]
    MissingField(&'static str),

    #[error("field '{field}' is invalid: {reason}")]
    InvalidField { field: &'static str, reason: String },

    #[error("malformed request body: {0}")]
    MalformedBody(String),
}
