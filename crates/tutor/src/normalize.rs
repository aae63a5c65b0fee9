//! Normalize phase: turn a free-text request into a topic, goals and
//! constraints, grounded in the local topic library.

use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, warn};
use tutorbot_config::TutorConfig;
use tutorbot_core::error::LlmError;
use tutorbot_core::session::{Normalized, SessionConfig};
use tutorbot_knowledge::TopicLibrary;
use tutorbot_providers::LlmGateway;

use crate::prompt::normalize_messages;

/// Default level when the client sends none.
pub const DEFAULT_LEVEL: &str = "standard";

pub struct Normalizer {
    gateway: LlmGateway,
    topics: Arc<TopicLibrary>,
    temperature: f32,
    max_tokens: u32,
}

impl Normalizer {
    pub fn new(gateway: LlmGateway, topics: Arc<TopicLibrary>, config: &TutorConfig) -> Self {
        Self {
            gateway,
            topics,
            temperature: config.normalize_temperature,
            max_tokens: config.normalize_max_tokens,
        }
    }

    /// Normalize `query` for a session with the given settings.
    ///
    /// Never fails: if the model is unavailable or answers with something
    /// unusable, the query itself becomes the topic.
    pub async fn normalize(&self, config: &SessionConfig, query: &str) -> Normalized {
        let context_stub = self.topics.pick_context(&config.subject, query);
        let level = if config.level.trim().is_empty() {
            DEFAULT_LEVEL
        } else {
            config.level.as_str()
        };

        let messages = normalize_messages(
            &config.subject,
            &config.grade,
            &config.style,
            level,
            query,
            &context_stub,
        );

        let normalized = match self
            .gateway
            .chat_json(messages, self.temperature, self.max_tokens)
            .await
        {
            Ok(value) => from_model(&value, query, context_stub),
            Err(e) => {
                log_fallback(&e);
                fallback(config, query, context_stub)
            }
        };
        debug!(topic = %normalized.topic, goals = normalized.goals.len(), "Request normalized");
        normalized
    }
}

fn log_fallback(err: &LlmError) {
    warn!(error = %err, "Normalize call failed, using the query as topic");
}

/// Topic falls back to the query; non-array goals or constraints become empty.
fn from_model(value: &Value, query: &str, context_stub: String) -> Normalized {
    let topic = value
        .get("topic")
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .unwrap_or(query)
        .to_string();

    Normalized {
        topic,
        goals: string_list(value.get("goals")),
        constraints: string_list(value.get("constraints")),
        context_stub,
    }
}

fn string_list(value: Option<&Value>) -> Vec<String> {
    value
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}

fn fallback(config: &SessionConfig, query: &str, context_stub: String) -> Normalized {
    Normalized {
        topic: query.to_string(),
        goals: Vec::new(),
        constraints: vec![
            format!("grade:{}", config.grade),
            format!("style:{}", config.style),
        ],
        context_stub,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::RoutedMockProvider;
    use serde_json::json;
    use tutorbot_knowledge::TopicRecord;

    fn config() -> SessionConfig {
        SessionConfig {
            subject: "math".into(),
            grade: "9".into(),
            style: "step_by_step".into(),
            level: String::new(),
        }
    }

    fn library() -> Arc<TopicLibrary> {
        let mut lib = TopicLibrary::new();
        lib.insert(
            "math",
            vec![TopicRecord {
                title: "Квадратные уравнения".into(),
                summary: "ax^2 + bx + c = 0".into(),
                ..Default::default()
            }],
        );
        Arc::new(lib)
    }

    fn normalizer(provider: RoutedMockProvider) -> (Normalizer, Arc<RoutedMockProvider>) {
        let provider = Arc::new(provider);
        let gateway = LlmGateway::new(provider.clone(), "mock-model");
        (
            Normalizer::new(gateway, library(), &TutorConfig::default()),
            provider,
        )
    }

    #[tokio::test]
    async fn uses_model_output_and_context() {
        let (normalizer, provider) = normalizer(RoutedMockProvider::new().with_normalize(
            r#"{"topic":"Квадратные уравнения","goals":["решать через D", 5],"constraints":["9 класс"]}"#,
        ));

        let n = normalizer.normalize(&config(), "квадратные уравнения").await;
        assert_eq!(n.topic, "Квадратные уравнения");
        assert_eq!(n.goals, vec!["решать через D"]);
        assert_eq!(n.constraints, vec!["9 класс"]);
        assert!(n.context_stub.starts_with("• Квадратные уравнения"));

        let request = provider.requests().pop().unwrap();
        assert!((request.temperature - 0.2).abs() < f32::EPSILON);
        assert_eq!(request.max_tokens, Some(500));
        assert!(request.messages[1].content.contains("level: standard"));
    }

    #[tokio::test]
    async fn falls_back_when_provider_fails() {
        let (normalizer, _) = normalizer(RoutedMockProvider::failing());
        let n = normalizer.normalize(&config(), "дроби").await;
        assert_eq!(n.topic, "дроби");
        assert!(n.goals.is_empty());
        assert_eq!(n.constraints, vec!["grade:9", "style:step_by_step"]);
        assert_eq!(n.context_stub, "");
    }

    #[tokio::test]
    async fn blank_topic_falls_back_to_query() {
        let (normalizer, _) = normalizer(
            RoutedMockProvider::new().with_normalize(r#"{"topic":"  ","goals":"not a list"}"#),
        );
        let n = normalizer.normalize(&config(), "проценты").await;
        assert_eq!(n.topic, "проценты");
        assert!(n.goals.is_empty());
        assert!(n.constraints.is_empty());
    }

    #[test]
    fn string_list_ignores_non_strings() {
        assert_eq!(string_list(Some(&json!(["a", 1, "b"]))), vec!["a", "b"]);
        assert!(string_list(Some(&json!({"a": 1}))).is_empty());
        assert!(string_list(None).is_empty());
    }
}
