//! The tutoring dialog engine.
//!
//! A conversation has two phases:
//!
//! 1. **Normalize**: the learner's opening request becomes a topic with goals
//!    and constraints, grounded in the local topic library ([`Normalizer`])
//! 2. **Chat**: each learner message produces an explanation, an updated
//!    mastery estimate and, when due, an inline quiz ([`DialogEngine`])
//!
//! Both phases degrade gracefully when the model is unavailable.

pub mod dialog;
pub mod mastery;
pub mod normalize;
pub mod prompt;
pub mod quiz;

#[cfg(test)]
pub(crate) mod test_helpers;

pub use dialog::{DialogEngine, TurnOutcome};
pub use mastery::update_mastery;
pub use normalize::Normalizer;
pub use quiz::{announce_quiz, parse_checks, scrub_quiz_text, should_quiz};
