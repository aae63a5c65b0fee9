//! The dialog engine: one learner message in, one assistant turn out.
//!
//! Per turn:
//!
//! 1. **Mastery**: score the learner's message
//! 2. **Quiz decision**: explicit request, or long enough and mastery high enough
//! 3. **Prompt**: persona, hints, context stub, recent history, the message
//! 4. **Provider calls**: the explanation and (if due) the quiz run concurrently;
//!    a failed explanation becomes a fixed Socratic reply, a failed quiz
//!    becomes no quiz
//! 5. **Post-processing**: with a quiz attached, inline questions are
//!    scrubbed from the text and the quiz is announced
//! 6. **Assembly**: the `AssistantTurn` plus the session update to persist
//!
//! The engine does not touch the session store; callers hold the session's
//! write lease and persist `TurnOutcome::patch`.

use tracing::{debug, info, warn};
use tutorbot_config::TutorConfig;
use tutorbot_core::error::LlmError;
use tutorbot_core::message::Message;
use tutorbot_core::session::{Session, SessionPatch};
use tutorbot_core::turn::{AssistantTurn, CheckItem, TutorState};
use tutorbot_knowledge::rag_hints;
use tutorbot_providers::LlmGateway;

use crate::mastery::update_mastery;
use crate::prompt::{fallback_explanation, quiz_messages, tutor_messages};
use crate::quiz::{announce_quiz, parse_checks, should_quiz};

pub const NEXT_STEP_QUIZ: &str =
    "Пройди мини-тест. Если что-то не ясно — вернёмся к объяснению.";
pub const NEXT_STEP_FOLLOW_UP: &str = "Задай уточнение или попроси мини-тест.";

/// Result of one turn: the response payload and the new session counters.
#[derive(Debug, Clone)]
pub struct TurnOutcome {
    pub assistant: AssistantTurn,
    pub next_turn: u32,
    pub mastery: f32,
}

impl TurnOutcome {
    /// The session update recording this exchange.
    pub fn patch(&self, user_message: &str) -> SessionPatch {
        SessionPatch {
            turn: Some(self.next_turn),
            mastery: Some(self.mastery),
            normalized: None,
            append: vec![
                Message::user(user_message),
                Message::assistant(self.assistant.message.clone()),
            ],
        }
    }
}

pub struct DialogEngine {
    gateway: LlmGateway,
    config: TutorConfig,
}

impl DialogEngine {
    pub fn new(gateway: LlmGateway, config: TutorConfig) -> Self {
        Self { gateway, config }
    }

    pub fn config(&self) -> &TutorConfig {
        &self.config
    }

    /// Run one turn for `session`. Never fails: provider trouble degrades
    /// to the fallback explanation and an empty quiz.
    pub async fn turn(&self, session: &Session, user_message: &str) -> TurnOutcome {
        let mastery = update_mastery(session.mastery, user_message);
        let next_turn = session.turn.saturating_add(1);
        let quiz_due = should_quiz(next_turn, mastery, user_message);

        let config = &session.config;
        let topic = session.normalized.topic.as_str();
        let hints = rag_hints(&config.subject, topic, &config.grade);
        let history = session.recent_history(self.config.history_window);
        let messages = tutor_messages(session, &hints, history, user_message);

        let (explanation, checks) = tokio::join!(self.explain(messages), async {
            if quiz_due {
                self.generate_checks(session).await
            } else {
                Ok(Vec::new())
            }
        });

        let mut text = explanation.unwrap_or_else(|e| {
            warn!(session_id = %session.id, error = %e, "Explanation failed, using fallback");
            fallback_explanation(topic)
        });
        let checks = checks.unwrap_or_else(|e| {
            warn!(session_id = %session.id, error = %e, "Quiz generation failed, continuing without quiz");
            Vec::new()
        });

        if !checks.is_empty() {
            text = announce_quiz(&text);
        }

        let next_step = if checks.is_empty() {
            NEXT_STEP_FOLLOW_UP
        } else {
            NEXT_STEP_QUIZ
        };

        info!(
            session_id = %session.id,
            turn = next_turn,
            mastery,
            quiz_due,
            checks = checks.len(),
            "Turn complete"
        );

        TurnOutcome {
            assistant: AssistantTurn {
                message: text,
                checks,
                tutor_state: TutorState {
                    mastery,
                    next_step: next_step.to_string(),
                },
            },
            next_turn,
            mastery,
        }
    }

    async fn explain(&self, messages: Vec<Message>) -> Result<String, LlmError> {
        self.gateway
            .chat_text(
                messages,
                self.config.text_temperature,
                self.config.text_max_tokens,
            )
            .await
    }

    /// Ask the model for a quiz on the session's topic.
    pub async fn generate_checks(&self, session: &Session) -> Result<Vec<CheckItem>, LlmError> {
        let value = self
            .gateway
            .chat_json(
                quiz_messages(session),
                self.config.quiz_temperature,
                self.config.quiz_max_tokens,
            )
            .await?;
        let checks = parse_checks(&value);
        debug!(session_id = %session.id, checks = checks.len(), "Quiz generated");
        Ok(checks)
    }
}
