//! # Tutorbot Core
//!
//! Domain types, traits, and error definitions for the Tutorbot tutoring
//! service. This crate has **zero framework dependencies**: it defines the
//! domain model that all other crates implement against.
//!
//! ## Design Philosophy
//!
//! The two seams that talk to the outside world (the LLM provider and the
//! session store) are defined as traits here. Implementations live in their
//! respective crates, so tests can swap in mocks and a persistent session
//! backend can replace the in-memory one without touching the dialog engine.

pub mod error;
pub mod message;
pub mod provider;
pub mod session;
pub mod turn;

// Re-export key types at crate root for ergonomics
pub use error::{Error, LlmError, ProviderError, Result, SessionError, ValidationError};
pub use message::{Message, Role};
pub use provider::{Provider, ProviderRequest, ProviderResponse, Usage};
pub use session::{
    HistoryEntry, Normalized, Session, SessionConfig, SessionGuard, SessionId, SessionPatch,
    SessionStore,
};
pub use turn::{AssistantTurn, CheckItem, TutorState};
