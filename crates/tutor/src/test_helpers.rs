//! Shared test helpers for dialog and normalize tests.

use std::sync::Mutex;

use async_trait::async_trait;
use tutorbot_core::error::ProviderError;
use tutorbot_core::message::Message;
use tutorbot_core::provider::{Provider, ProviderRequest, ProviderResponse, Usage};

pub const DEFAULT_TEXT: &str = "Квадратное уравнение имеет вид $ax^2 + bx + c = 0$.";

pub const DEFAULT_QUIZ: &str = r#"[
  {"type":"mcq","question":"Сколько корней при D>0?","options":["0","1","2"],"answer":"2","hint":"","explanation":"Два различных корня."},
  {"type":"short","question":"Как называется b^2-4ac?","answer":"дискриминант|D","hint":"","explanation":""},
  {"type":"mcq","question":"Чему равен D для x^2-4=0?","options":["16","0","-16"],"answer":"16","hint":"","explanation":""}
]"#;

pub const DEFAULT_NORMALIZE: &str =
    r#"{"topic":"Квадратные уравнения","goals":["Понять дискриминант"],"constraints":[]}"#;

/// Which of the three calls a request belongs to, judged by its system prompt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    Text,
    Quiz,
    Normalize,
}

pub fn route_of(request: &ProviderRequest) -> Route {
    let system = request
        .messages
        .first()
        .map(|m| m.content.as_str())
        .unwrap_or_default();
    if system.contains("нормализует запрос") {
        Route::Normalize
    } else if system.contains("JSON-массиве") {
        Route::Quiz
    } else {
        Route::Text
    }
}

/// A mock provider that answers each call kind with a fixed reply.
///
/// A route without a reply fails with `ProviderError::NotConfigured`.
pub struct RoutedMockProvider {
    text: Option<String>,
    quiz: Option<String>,
    normalize: Option<String>,
    requests: Mutex<Vec<ProviderRequest>>,
}

impl RoutedMockProvider {
    pub fn new() -> Self {
        Self {
            text: Some(DEFAULT_TEXT.into()),
            quiz: Some(DEFAULT_QUIZ.into()),
            normalize: Some(DEFAULT_NORMALIZE.into()),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Every call fails.
    pub fn failing() -> Self {
        Self {
            text: None,
            quiz: None,
            normalize: None,
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn with_text(mut self, reply: &str) -> Self {
        self.text = Some(reply.into());
        self
    }

    pub fn with_quiz(mut self, reply: &str) -> Self {
        self.quiz = Some(reply.into());
        self
    }

    pub fn without_quiz(mut self) -> Self {
        self.quiz = None;
        self
    }

    pub fn without_text(mut self) -> Self {
        self.text = None;
        self
    }

    pub fn with_normalize(mut self, reply: &str) -> Self {
        self.normalize = Some(reply.into());
        self
    }

    pub fn requests(&self) -> Vec<ProviderRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn calls_to(&self, route: Route) -> usize {
        self.requests
            .lock()
            .unwrap()
            .iter()
            .filter(|r| route_of(r) == route)
            .count()
    }
}

#[async_trait]
impl Provider for RoutedMockProvider {
    fn name(&self) -> &str {
        "routed_mock"
    }

    async fn complete(&self, request: ProviderRequest) -> Result<ProviderResponse, ProviderError> {
        self.requests.lock().unwrap().push(request.clone());
        let reply = match route_of(&request) {
            Route::Text => &self.text,
            Route::Quiz => &self.quiz,
            Route::Normalize => &self.normalize,
        };
        let text = reply
            .clone()
            .ok_or_else(|| ProviderError::NotConfigured("mock route disabled".into()))?;
        Ok(ProviderResponse {
            message: Message::assistant(text),
            usage: Some(Usage {
                prompt_tokens: 10,
                completion_tokens: 5,
                total_tokens: 15,
            }),
            model: "mock-model".into(),
        })
    }
}
