//! Mastery heuristic.
//!
//! The learner's replies are scanned for three groups of cues. Each group
//! contributes at most once per message and groups stack.

use std::sync::LazyLock;

use regex::Regex;
use tutorbot_core::session::clamp_unit;

static ACKNOWLEDGED: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(понятно|ясно|ок|спасибо|всё понятно|спс)").expect("valid mastery regex")
});

static CONFUSED: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(не понимаю|непонятно|поясни|объясни|что значит)")
        .expect("valid mastery regex")
});

static SUCCEEDED: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(правильно|получилось|сделал|решил|верно)").expect("valid mastery regex")
});

const ACKNOWLEDGED_DELTA: f32 = 0.12;
const CONFUSED_DELTA: f32 = -0.08;
const SUCCEEDED_DELTA: f32 = 0.08;

/// New mastery after the learner sends `message`. Always within `[0, 1]`.
pub fn update_mastery(previous: f32, message: &str) -> f32 {
    let mut mastery = clamp_unit(previous);
    if ACKNOWLEDGED.is_match(message) {
        mastery += ACKNOWLEDGED_DELTA;
    }
    if CONFUSED.is_match(message) {
        mastery += CONFUSED_DELTA;
    }
    if SUCCEEDED.is_match(message) {
        mastery += SUCCEEDED_DELTA;
    }
    clamp_unit(mastery)
}
