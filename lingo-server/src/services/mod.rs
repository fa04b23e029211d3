//! Domain services

pub mod sentences;

pub use sentences::{SentenceError, SentenceService};
