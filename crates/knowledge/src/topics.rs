//! Topic context lookup.
//!
//! Each subject has a JSON file `<subject>.json` holding an array of topic
//! records. A query is matched against every record of the subject and the
//! best three are rendered into a short text block ("context stub") that the
//! tutor passes to the model as grounding.
//!
//! Scoring:
//! - 3 when the searchable text contains the whole query,
//! - 1 when it contains any query word longer than 3 characters,
//! - 0 otherwise (the record is not used).
//!
//! Ties keep file order.

use std::collections::HashMap;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

/// Records rendered per lookup.
const TOP_K: usize = 3;
const MAX_FACTS: usize = 3;
const MAX_FORMULAS: usize = 2;
/// Query words this short are ignored by the partial match.
const MIN_WORD_CHARS: usize = 4;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TopicRecord {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub summary: String,
    #[serde(default)]
    pub key_facts: Vec<String>,
    #[serde(default)]
    pub formulas: Vec<String>,
    #[serde(default)]
    pub keywords: Vec<String>,
}

impl TopicRecord {
    /// Title, keywords and summary, lowercased.
    fn haystack(&self) -> String {
        std::iter::once(self.title.as_str())
            .chain(self.keywords.iter().map(String::as_str))
            .chain(std::iter::once(self.summary.as_str()))
            .collect::<Vec<_>>()
            .join(" ")
            .to_lowercase()
    }

    fn render(&self) -> String {
        let mut lines = Vec::new();
        if !self.title.is_empty() {
            lines.push(format!("• {}", self.title));
        }
        if !self.summary.is_empty() {
            lines.push(format!("  – {}", self.summary));
        }
        if !self.key_facts.is_empty() {
            let facts: Vec<&str> = self
                .key_facts
                .iter()
                .take(MAX_FACTS)
                .map(String::as_str)
                .collect();
            lines.push(format!("  – факты: {}", facts.join("; ")));
        }
        if !self.formulas.is_empty() {
            let formulas: Vec<&str> = self
                .formulas
                .iter()
                .take(MAX_FORMULAS)
                .map(String::as_str)
                .collect();
            lines.push(format!("  – формулы: {}", formulas.join(" | ")));
        }
        lines.join("\n")
    }
}

/// Score one record against a query. See the module docs for the scale.
pub fn score_topic(record: &TopicRecord, query: &str) -> u8 {
    let query = query.to_lowercase();
    let haystack = record.haystack();
    if haystack.contains(&query) {
        3
    } else if query
        .split_whitespace()
        .any(|w| w.chars().count() >= MIN_WORD_CHARS && haystack.contains(w))
    {
        1
    } else {
        0
    }
}

/// Topic records for every known subject, read once at startup.
#[derive(Debug, Clone, Default)]
pub struct TopicLibrary {
    subjects: HashMap<String, Vec<TopicRecord>>,
}

impl TopicLibrary {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load every `<subject>.json` file in `dir`.
    ///
    /// A missing directory yields an empty library. Files that cannot be read
    /// or do not hold an array of records are skipped with a warning.
    pub fn load_dir(dir: &Path) -> Self {
        let mut library = Self::new();

        let entries = match std::fs::read_dir(dir) {
            Ok(entries) => entries,
            Err(e) => {
                warn!(path = %dir.display(), error = %e, "Topics directory unavailable, context lookup disabled");
                return library;
            }
        };

        for entry in entries.flatten() {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            let Some(subject) = path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };

            let records = std::fs::read_to_string(&path)
                .map_err(|e| e.to_string())
                .and_then(|raw| {
                    serde_json::from_str::<Vec<TopicRecord>>(&raw).map_err(|e| e.to_string())
                });
            match records {
                Ok(records) => {
                    debug!(subject, count = records.len(), "Loaded topic records");
                    library.insert(subject, records);
                }
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "Skipping unreadable topic file");
                }
            }
        }

        info!(
            subjects = library.subjects.len(),
            records = library.record_count(),
            "Topic library ready"
        );
        library
    }

    pub fn insert(&mut self, subject: impl Into<String>, records: Vec<TopicRecord>) {
        self.subjects.insert(subject.into(), records);
    }

    pub fn subjects(&self) -> impl Iterator<Item = &str> {
        self.subjects.keys().map(String::as_str)
    }

    pub fn record_count(&self) -> usize {
        self.subjects.values().map(Vec::len).sum()
    }

    /// Render the best matching records for `query` as a context stub.
    ///
    /// Returns an empty string when the subject is unknown or nothing matches.
    pub fn pick_context(&self, subject: &str, query: &str) -> String {
        let Some(records) = self.subjects.get(subject) else {
            return String::new();
        };

        let mut scored: Vec<(u8, &TopicRecord)> = records
            .iter()
            .map(|r| (score_topic(r, query), r))
            .filter(|(score, _)| *score > 0)
            .collect();
        // `sort_by` is stable, so equal scores keep file order.
        scored.sort_by(|a, b| b.0.cmp(&a.0));

        scored
            .into_iter()
            .take(TOP_K)
            .map(|(_, r)| r.render())
            .filter(|chunk| !chunk.is_empty())
            .collect::<Vec<_>>()
            .join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn quadratic() -> TopicRecord {
        TopicRecord {
            title: "Квадратные уравнения".into(),
            summary: "Уравнения вида ax^2 + bx + c = 0.".into(),
            key_facts: vec![
                "Дискриминант D = b^2 - 4ac".into(),
                "D > 0: два корня".into(),
                "D = 0: один корень".into(),
                "D < 0: нет действительных корней".into(),
            ],
            formulas: vec![
                "x = (-b ± √D) / 2a".into(),
                "D = b^2 - 4ac".into(),
                "x1 + x2 = -b/a".into(),
            ],
            keywords: vec!["дискриминант".into(), "корни".into()],
        }
    }

    fn linear() -> TopicRecord {
        TopicRecord {
            title: "Линейные уравнения".into(),
            summary: "Уравнения вида ax + b = 0.".into(),
            keywords: vec!["корни".into()],
            ..Default::default()
        }
    }

    fn library() -> TopicLibrary {
        let mut lib = TopicLibrary::new();
        lib.insert("math", vec![linear(), quadratic()]);
        lib
    }

    #[test]
    fn full_match_beats_word_match_beats_nothing() {
        let record = quadratic();
        let full = score_topic(&record, "Квадратные уравнения");
        let word = score_topic(&record, "найти дискриминант быстро");
        let none = score_topic(&record, "фотосинтез");
        assert_eq!(full, 3);
        assert_eq!(word, 1);
        assert_eq!(none, 0);
    }

    #[test]
    fn short_words_do_not_match() {
        let record = TopicRecord {
            title: "Ось".into(),
            ..Default::default()
        };
        assert_eq!(score_topic(&record, "где ось симметрии"), 0);
    }

    #[test]
    fn best_match_is_rendered_first() {
        let stub = library().pick_context("math", "квадратные уравнения");
        assert!(stub.starts_with("• Квадратные уравнения"));
        // "уравнения" also hits the linear record, ranked below.
        assert!(stub.find("Линейные").unwrap() > stub.find("Квадратные").unwrap());
    }

    #[test]
    fn ties_keep_file_order() {
        let stub = library().pick_context("math", "найти корни");
        let linear_at = stub.find("Линейные").unwrap();
        let quadratic_at = stub.find("Квадратные").unwrap();
        assert!(linear_at < quadratic_at);
    }

    #[test]
    fn rendering_caps_facts_and_formulas() {
        let stub = library().pick_context("math", "квадратные уравнения");
        assert!(stub.contains("  – факты: Дискриминант D = b^2 - 4ac; D > 0: два корня; D = 0: один корень"));
        assert!(!stub.contains("нет действительных"));
        assert!(stub.contains("  – формулы: x = (-b ± √D) / 2a | D = b^2 - 4ac"));
        assert!(!stub.contains("x1 + x2"));
    }

    #[test]
    fn no_match_or_unknown_subject_is_empty() {
        assert_eq!(library().pick_context("math", "фотосинтез"), "");
        assert_eq!(library().pick_context("biology", "клетка"), "");
    }

    #[test]
    fn at_most_three_records() {
        let mut lib = TopicLibrary::new();
        let records = (0..5)
            .map(|i| TopicRecord {
                title: format!("Тема {i}"),
                keywords: vec!["дроби".into()],
                ..Default::default()
            })
            .collect();
        lib.insert("math", records);
        let stub = lib.pick_context("math", "дроби");
        assert_eq!(stub.lines().count(), 3);
        assert!(stub.contains("Тема 2"));
        assert!(!stub.contains("Тема 3"));
    }

    #[test]
    fn load_dir_reads_subject_files() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("math.json"),
            r#"[{"title":"Квадратные уравнения","summary":"ax^2+bx+c=0","keywords":["дискриминант"]}]"#,
        )
        .unwrap();
        std::fs::write(dir.path().join("notes.txt"), "ignored").unwrap();

        let lib = TopicLibrary::load_dir(dir.path());
        assert_eq!(lib.record_count(), 1);
        assert_eq!(lib.subjects().collect::<Vec<_>>(), vec!["math"]);
        assert!(lib.pick_context("math", "дискриминант").contains("ax^2+bx+c=0"));
    }

    #[test]
    fn load_dir_skips_broken_files() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("physics.json"), "{not json").unwrap();
        std::fs::write(dir.path().join("chemistry.json"), r#"{"title":"not an array"}"#).unwrap();

        let lib = TopicLibrary::load_dir(dir.path());
        assert_eq!(lib.record_count(), 0);
        assert_eq!(lib.pick_context("physics", "сила"), "");
    }

    #[test]
    fn missing_dir_gives_empty_library() {
        let lib = TopicLibrary::load_dir(Path::new("/definitely/not/here"));
        assert_eq!(lib.record_count(), 0);
    }
}
