//! LLM gateway: the two call modes used by the tutor.
//!
//! - `chat_text` returns the trimmed assistant text.
//! - `chat_json` returns the assistant text parsed as JSON, tolerating the
//!   usual model habits of wrapping output in a fenced block or in prose.
//!
//! No retry, caching, or rate limiting happens at this layer.

use std::sync::{Arc, LazyLock};

use regex::Regex;
use serde_json::Value;
use tracing::{debug, warn};
use tutorbot_core::error::{LlmError, ProviderError};
use tutorbot_core::message::Message;
use tutorbot_core::provider::{Provider, ProviderRequest};

static FENCED_JSON: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)```json\s*(.*?)```").expect("valid fenced-json regex"));

/// Sends prompts to a provider with a fixed model.
#[derive(Clone)]
pub struct LlmGateway {
    provider: Arc<dyn Provider>,
    model: String,
}

impl LlmGateway {
    pub fn new(provider: Arc<dyn Provider>, model: impl Into<String>) -> Self {
        Self {
            provider,
            model: model.into(),
        }
    }

    /// Complete the conversation and return the trimmed assistant text.
    ///
    /// Fails with a provider error when the key is absent, the call fails,
    /// or the model returns nothing.
    pub async fn chat_text(
        &self,
        messages: Vec<Message>,
        temperature: f32,
        max_tokens: u32,
    ) -> Result<String, LlmError> {
        let request = ProviderRequest {
            model: self.model.clone(),
            messages,
            temperature,
            max_tokens: Some(max_tokens),
        };

        let response = self.provider.complete(request).await?;
        if let Some(usage) = &response.usage {
            debug!(
                provider = %self.provider.name(),
                model = %response.model,
                prompt_tokens = usage.prompt_tokens,
                completion_tokens = usage.completion_tokens,
                "Completion received"
            );
        }

        let text = response.message.content.trim();
        if text.is_empty() {
            return Err(ProviderError::EmptyResponse.into());
        }
        Ok(text.to_string())
    }

    /// Complete the conversation and parse the reply as JSON.
    pub async fn chat_json(
        &self,
        messages: Vec<Message>,
        temperature: f32,
        max_tokens: u32,
    ) -> Result<Value, LlmError> {
        let text = self.chat_text(messages, temperature, max_tokens).await?;
        extract_json(&text).inspect_err(|_| {
            warn!(
                provider = %self.provider.name(),
                chars = text.chars().count(),
                "Model output was not JSON"
            );
        })
    }
}

/// Parse JSON out of model output.
///
/// Tried in order: the whole text; the contents of the first fenced
/// `json` block; the span from the first `{` to the last `}`.
pub fn extract_json(text: &str) -> Result<Value, LlmError> {
    if let Ok(value) = serde_json::from_str(text) {
        return Ok(value);
    }

    if let Some(block) = FENCED_JSON.captures(text).and_then(|c| c.get(1)) {
        if let Ok(value) = serde_json::from_str(block.as_str()) {
            return Ok(value);
        }
    }

    if let (Some(first), Some(last)) = (text.find('{'), text.rfind('}')) {
        if last > first {
            if let Ok(value) = serde_json::from_str(&text[first..=last]) {
                return Ok(value);
            }
        }
    }

    let preview: String = text.chars().take(80).collect();
    Err(LlmError::Parse(preview))
}
