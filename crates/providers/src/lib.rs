//! LLM provider implementation and gateway for Tutorbot.
//!
//! `OpenAiCompatProvider` implements `tutorbot_core::Provider` against any
//! OpenAI-compatible `/chat/completions` endpoint. `LlmGateway` sits on top
//! and offers the two call modes the dialog engine needs: raw text and JSON.

pub mod llm;
pub mod openai_compat;
pub mod router;

pub use llm::{LlmGateway, extract_json};
pub use openai_compat::OpenAiCompatProvider;
pub use router::build_from_config;
