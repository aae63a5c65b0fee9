//! Session store implementations for Tutorbot.
//!
//! Sessions live for the lifetime of the process: a restart discards them.

pub mod in_memory;

pub use in_memory::InMemorySessionStore;
