//! Database access layer for lingo-server
//!
//! Every sentence query takes the owning student's id; rows belonging to
//! other students are never returned or modified.

pub mod sentences;
pub mod students;

pub use sentences::{NewSentence, SentenceAudio, SentenceFilter};
