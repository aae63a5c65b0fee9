//! The assistant's reply for one turn, including optional inline quiz items.

use serde::{Deserialize, Deserializer, Serialize};

/// The structured response payload of one chat turn.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssistantTurn {
    pub message: String,
    #[serde(default)]
    pub checks: Vec<CheckItem>,
    pub tutor_state: TutorState,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TutorState {
    pub mastery: f32,
    pub next_step: String,
}

/// One inline quiz question.
///
/// Grading happens in the browser client. `answer` is passed through as
/// given: accepted synonyms separated by `|`, the literal `"open"` for
/// self-graded questions, or the index of the correct mcq option.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum CheckItem {
    Mcq {
        question: String,
        options: Vec<String>,
        #[serde(deserialize_with = "string_or_number")]
        answer: String,
        #[serde(default)]
        hint: String,
        #[serde(default)]
        explanation: String,
    },
    Short {
        question: String,
        #[serde(deserialize_with = "string_or_number")]
        answer: String,
        #[serde(default)]
        hint: String,
        #[serde(default)]
        explanation: String,
    },
}

impl CheckItem {
    pub fn question(&self) -> &str {
        match self {
            CheckItem::Mcq { question, .. } | CheckItem::Short { question, .. } => question,
        }
    }

    pub fn answer(&self) -> &str {
        match self {
            CheckItem::Mcq { answer, .. } | CheckItem::Short { answer, .. } => answer,
        }
    }

    /// A usable item has a question and an answer; an mcq also needs options.
    pub fn is_well_formed(&self) -> bool {
        let base = !self.question().trim().is_empty() && !self.answer().trim().is_empty();
        match self {
            CheckItem::Mcq { options, .. } => base && !options.is_empty(),
            CheckItem::Short { .. } => base,
        }
    }
}

/// Models sometimes answer mcq items with the option index as a number.
fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    match value {
        serde_json::Value::String(s) => Ok(s),
        serde_json::Value::Number(n) => Ok(n.to_string()),
        serde_json::Value::Bool(b) => Ok(b.to_string()),
        other => Err(serde::de::Error::custom(format!(
            "expected string or number answer, got {other}"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mcq_item_decodes_with_type_tag() {
        let item: CheckItem = serde_json::from_str(
            r#"{"type":"mcq","question":"2+2?","options":["3","4"],"answer":"4","hint":"","explanation":"арифметика"}"#,
        )
        .unwrap();
        assert!(matches!(item, CheckItem::Mcq { .. }));
        assert_eq!(item.question(), "2+2?");
        assert!(item.is_well_formed());
    }

    #[test]
    fn numeric_answer_becomes_string() {
        let item: CheckItem = serde_json::from_str(
            r#"{"type":"short","question":"Сколько корней у x^2=4?","answer":2}"#,
        )
        .unwrap();
        assert_eq!(item.answer(), "2");
    }

    #[test]
    fn option_index_answer_reaches_client_unchanged() {
        let item: CheckItem = serde_json::from_str(
            r#"{"type":"mcq","question":"2+2?","options":["3","4"],"answer":1}"#,
        )
        .unwrap();
        assert!(item.is_well_formed());
        let json = serde_json::to_value(&item).unwrap();
        assert_eq!(json["answer"], "1");
        assert_eq!(json["options"][1], "4");
    }

    #[test]
    fn synonym_and_open_answers_are_kept_verbatim() {
        let item: CheckItem = serde_json::from_str(
            r#"{"type":"short","question":"Как называется b^2-4ac?","answer":"дискриминант|D"}"#,
        )
        .unwrap();
        assert_eq!(item.answer(), "дискриминант|D");

        let open: CheckItem = serde_json::from_str(
            r#"{"type":"short","question":"Объясни своими словами","answer":"open"}"#,
        )
        .unwrap();
        assert_eq!(serde_json::to_value(&open).unwrap()["answer"], "open");
    }

    #[test]
    fn mcq_without_options_is_malformed() {
        let item: CheckItem =
            serde_json::from_str(r#"{"type":"mcq","question":"?","options":[],"answer":"a"}"#)
                .unwrap();
        assert!(!item.is_well_formed());
    }

    #[test]
    fn turn_serializes_expected_shape() {
        let turn = AssistantTurn {
            message: "Привет".into(),
            checks: vec![],
            tutor_state: TutorState {
                mastery: 0.12,
                next_step: "next".into(),
            },
        };
        let json = serde_json::to_value(&turn).unwrap();
        assert_eq!(json["message"], "Привет");
        assert!(json["checks"].as_array().unwrap().is_empty());
        assert!(json["tutor_state"]["mastery"].is_number());
    }
}
