//! Inline quiz policy: when to quiz, how to read the model's quiz, and how
//! to keep the explanation text from repeating the questions.

use std::sync::LazyLock;

use regex::Regex;
use serde_json::Value;
use tracing::debug;
use tutorbot_core::turn::CheckItem;

/// Upper bound on quiz items attached to one turn.
pub const MAX_CHECKS: usize = 5;

/// A quiz becomes due on its own from this turn on...
pub const QUIZ_MIN_TURN: u32 = 4;
/// ...provided mastery has reached this level.
pub const QUIZ_MIN_MASTERY: f32 = 0.35;

/// Appended to the explanation when a quiz is attached.
pub const QUIZ_ANNOUNCEMENT: &str = "📋 Я подготовил мини-тест ниже.";

static QUIZ_REQUEST: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)тест|проверь|готов к тесту|проверка").expect("valid quiz request regex")
});

static QUIZ_HEADING: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(^|\n)#{1,6}\s*(мини[-\s]?тест|тест)\b[\s\S]*$")
        .expect("valid quiz heading regex")
});

static QUIZ_LABEL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(^|\n)(мини[-\s]?тест|тест)\s*[\-–:]\s*[\s\S]*$")
        .expect("valid quiz label regex")
});

/// "Вопрос 1", "1)", "2.", "- A)" style lines.
static QUESTION_LINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(^|\n)\s*((вопрос\s*\d+)|(\d+[).\s])|([\-*]\s+[A-DА-Д][).\s]))")
        .expect("valid question line regex")
});

static ANNOUNCEMENT_CUE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)мини.?тест|📋").expect("valid announcement regex"));

/// Whether the turn about to complete (`next_turn`) should carry a quiz.
///
/// An explicit request always wins; otherwise a quiz is due once the
/// conversation is long enough and mastery high enough.
pub fn should_quiz(next_turn: u32, mastery: f32, message: &str) -> bool {
    QUIZ_REQUEST.is_match(message) || (next_turn >= QUIZ_MIN_TURN && mastery >= QUIZ_MIN_MASTERY)
}

/// Remove quiz-like content the model wrote into the explanation.
///
/// Drops a trailing section headed or labelled "тест"/"мини-тест", then cuts
/// the text at the first line that looks like an enumerated question.
pub fn scrub_quiz_text(text: &str) -> String {
    let mut text = text.to_string();
    for pattern in [&*QUIZ_HEADING, &*QUIZ_LABEL] {
        if pattern.is_match(&text) {
            let stripped = pattern.replace(&text, "").trim().to_string();
            text = stripped;
        }
    }
    if let Some(m) = QUESTION_LINE.find(&text) {
        text.truncate(m.start());
    }
    text.trim().to_string()
}

/// Scrub the explanation and make sure it points the learner at the quiz.
pub fn announce_quiz(text: &str) -> String {
    let scrubbed = scrub_quiz_text(text);
    if scrubbed.is_empty() {
        QUIZ_ANNOUNCEMENT.to_string()
    } else if ANNOUNCEMENT_CUE.is_match(&scrubbed) {
        scrubbed
    } else {
        format!("{scrubbed}\n\n{QUIZ_ANNOUNCEMENT}")
    }
}

/// Read quiz items out of the model's JSON.
///
/// Accepts a bare array or an object wrapping the array under `checks`,
/// `questions` or `quiz`. Items that do not decode or lack required fields
/// are dropped.
pub fn parse_checks(value: &Value) -> Vec<CheckItem> {
    let items = match value {
        Value::Array(items) => items.as_slice(),
        Value::Object(map) => ["checks", "questions", "quiz"]
            .iter()
            .find_map(|key| map.get(*key).and_then(Value::as_array))
            .map(Vec::as_slice)
            .unwrap_or_default(),
        _ => &[],
    };

    items
        .iter()
        .filter_map(|item| match serde_json::from_value::<CheckItem>(item.clone()) {
            Ok(check) if check.is_well_formed() => Some(check),
            Ok(_) => {
                debug!("Dropping incomplete quiz item");
                None
            }
            Err(e) => {
                debug!(error = %e, "Dropping undecodable quiz item");
                None
            }
        })
        .take(MAX_CHECKS)
        .collect()
}
