//! Local grounding material for the tutor.
//!
//! Two sources feed the prompt: a per-subject library of topic records read
//! from JSON files at startup, and a fixed set of teaching hints. Neither
//! performs real retrieval; the topic lookup is a keyword match.

pub mod hints;
pub mod topics;

pub use hints::rag_hints;
pub use topics::{TopicLibrary, TopicRecord};
