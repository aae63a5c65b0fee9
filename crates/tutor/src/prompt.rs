//! Prompt templates for the three model calls: the explanation, the quiz,
//! and the normalize phase.

use tutorbot_core::message::Message;
use tutorbot_core::session::{HistoryEntry, Session};

/// Placeholder for an empty context stub.
const NO_MATERIAL: &str = "(нет)";

fn material(context_stub: &str) -> &str {
    if context_stub.trim().is_empty() {
        NO_MATERIAL
    } else {
        context_stub
    }
}

/// Persona and house rules for the explanation call.
pub fn tutor_system_prompt(topic: &str, grade: &str, style: &str) -> String {
    format!(
        "Ты — доброжелательный школьный тьютор.\n\
         Задачи:\n\
         - Объясняй \"{topic}\" на уровне {grade} класса, стиль: {style}.\n\
         - Пиши короткими абзацами, по шагам, с мини-вопросами.\n\
         - Формулы давай в LaTeX ($E=mc^2$).\n\
         - ЕСЛИ ты решаешь выдать мини-тест — НЕ вставляй вопросы в основной текст ответа.\n  \
         Вопросы должны идти ТОЛЬКО отдельным JSON-массивом (поле checks), а в тексте сделай \
         короткое объявление: \"📋 Я подготовил мини-тест ниже.\""
    )
}

/// Full message list for the explanation call.
///
/// `history` is the recent window taken before `user_message` was recorded,
/// so the current message appears exactly once, at the end.
pub fn tutor_messages(
    session: &Session,
    hints: &[String],
    history: &[HistoryEntry],
    user_message: &str,
) -> Vec<Message> {
    let config = &session.config;
    let normalized = &session.normalized;

    let mut messages = Vec::with_capacity(history.len() + 4);
    messages.push(Message::system(tutor_system_prompt(
        &normalized.topic,
        &config.grade,
        &config.style,
    )));
    messages.push(Message::system(format!(
        "Короткие подсказки (RAG):\n{}",
        hints.join("\n")
    )));
    messages.push(Message::system(format!(
        "Подсказки из материалов (можно использовать, но НЕ цитируй дословно):\n{}",
        material(&normalized.context_stub)
    )));
    messages.extend(history.iter().cloned());
    messages.push(Message::user(user_message));
    messages
}

/// Messages asking the model for a 3–5 item quiz as a JSON array.
pub fn quiz_messages(session: &Session) -> Vec<Message> {
    let config = &session.config;
    let system = format!(
        "Ты — школьный тьютор. Составь мини-тест по теме строго в JSON-массиве.\n\
         Каждый элемент:\n\
         {{\n \
         \"type\": \"mcq\"|\"short\",\n \
         \"question\": string,\n \
         \"options\": string[] (для mcq),\n \
         \"answer\": string,            // для short — эталон; допускай короткие синонимы через |\n \
         \"hint\": string,\n \
         \"explanation\": string\n\
         }}\n\
         Только корректный JSON, без текста вокруг. 3–5 вопросов. Уровень — {grade} класс. Предмет — {subject}.",
        grade = config.grade,
        subject = config.subject,
    );
    let user = format!(
        "Тема: {}\nКороткий контекст:\n{}\nСделай баланс: 2–3 mcq и 1–2 short.",
        session.normalized.topic,
        material(&session.normalized.context_stub)
    );
    vec![Message::system(system), Message::user(user)]
}

/// Messages asking the model to normalize a free-text request.
pub fn normalize_messages(
    subject: &str,
    grade: &str,
    style: &str,
    level: &str,
    query: &str,
    context_stub: &str,
) -> Vec<Message> {
    let system = "Ты — педагогический ассистент, который нормализует запрос ученика.\n\
         На входе: предмет, класс (grade), стиль объяснений и формулировка запроса.\n\
         Твоя задача — СТРОГО в JSON (без лишнего текста) вернуть:\n\
         {\n  \
         \"topic\": string,                         // нормализованная тема урока\n  \
         \"goals\": string[],                       // 2-5 учебных целей\n  \
         \"constraints\": string[]                  // важные условия (уровень, стиль, возраст и т.п.)\n\
         }\n\
         Только корректный JSON. Никакого текста вокруг.";
    let user = format!(
        "subject: {subject}\ngrade: {grade}\nstyle: {style}\nlevel: {level}\nquery: {query}\n\n\
         (Подсказки из материалов):\n{}",
        material(context_stub)
    );
    vec![Message::system(system), Message::user(user)]
}

/// Socratic two-question reply used when the explanation call fails.
pub fn fallback_explanation(topic: &str) -> String {
    format!(
        "Давай разберёмся по шагам:\n\
         1) Что именно про \"{topic}\" сложнее всего: определения, примеры или задачи?\n\
         2) Напиши 1–2 предложения, что уже понятно — я дополню."
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use tutorbot_core::message::Role;
    use tutorbot_core::session::{Normalized, SessionConfig, SessionId};

    fn session() -> Session {
        Session::new(
            SessionId::from("sess_prompt"),
            SessionConfig {
                subject: "math".into(),
                grade: "9".into(),
                style: "step_by_step".into(),
                level: "standard".into(),
            },
            Normalized {
                topic: "Квадратные уравнения".into(),
                ..Default::default()
            },
        )
    }

    #[test]
    fn system_prompt_embeds_session_settings() {
        let prompt = tutor_system_prompt("Дроби", "5", "visual");
        assert!(prompt.contains("\"Дроби\""));
        assert!(prompt.contains("5 класса"));
        assert!(prompt.contains("стиль: visual"));
        assert!(prompt.contains("НЕ вставляй вопросы"));
    }

    #[test]
    fn tutor_messages_order() {
        let history = vec![Message::user("квадратные уравнения"), Message::assistant("Начнём.")];
        let hints = vec!["h1".to_string(), "h2".to_string()];
        let messages = tutor_messages(&session(), &hints, &history, "понятно");

        assert_eq!(messages.len(), 6);
        assert!(messages[..3].iter().all(|m| m.role == Role::System));
        assert!(messages[1].content.ends_with("h1\nh2"));
        assert!(messages[2].content.ends_with("(нет)"));
        assert_eq!(messages[3].content, "квадратные уравнения");
        assert_eq!(messages[4].role, Role::Assistant);
        assert_eq!(messages[5].role, Role::User);
        assert_eq!(messages[5].content, "понятно");
    }

    #[test]
    fn quiz_prompt_names_grade_subject_and_topic() {
        let messages = quiz_messages(&session());
        assert_eq!(messages.len(), 2);
        assert!(messages[0].content.contains("JSON-массиве"));
        assert!(messages[0].content.contains("Уровень — 9 класс. Предмет — math."));
        assert!(messages[1].content.starts_with("Тема: Квадратные уравнения"));
    }

    #[test]
    fn normalize_prompt_lists_inputs() {
        let messages = normalize_messages("math", "9", "step_by_step", "standard", "корни", "• Тема");
        assert!(messages[0].content.contains("нормализует запрос"));
        assert!(messages[1].content.contains("query: корни"));
        assert!(messages[1].content.ends_with("• Тема"));
    }

    #[test]
    fn fallback_mentions_topic() {
        let text = fallback_explanation("Дроби");
        assert!(text.starts_with("Давай разберёмся по шагам:"));
        assert!(text.contains("про \"Дроби\""));
        assert_eq!(text.lines().count(), 3);
    }
}
