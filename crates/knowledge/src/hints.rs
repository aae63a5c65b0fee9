//! Fixed teaching hints injected alongside the context stub.
//!
//! Retrieval is not implemented: the hints only restate the session
//! parameters and the house style.

/// Short hints for the current topic.
pub fn rag_hints(subject: &str, topic: &str, grade: &str) -> Vec<String> {
    vec![
        format!("Тема: {topic} (предмет: {subject}, класс: {grade})."),
        "Объясняй по шагам, с простыми примерами и мини-вопросами.".to_string(),
        "Если присутствуют формулы — пиши в LaTeX ($...$).".to_string(),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hints_mention_session_parameters() {
        let hints = rag_hints("math", "Квадратные уравнения", "9");
        assert_eq!(hints.len(), 3);
        assert_eq!(hints[0], "Тема: Квадратные уравнения (предмет: math, класс: 9).");
        assert!(hints[2].contains("LaTeX"));
    }
}
