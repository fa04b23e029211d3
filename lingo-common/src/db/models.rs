//! Database models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Registered student account
///
/// The password hash never leaves the server, so it is skipped on serialization.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Student {
    pub id: i64,
    pub username: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
}

/// Example sentence owned by a single student
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Sentence {
    pub id: i64,
    pub student_id: i64,
    pub source_language: String,
    pub source_text: String,
    pub target_language_1: String,
    pub target_language_2: String,
    pub translated_text_1: Option<String>,
    pub translated_text_2: Option<String>,
    pub audio_url_source: Option<String>,
    pub audio_url_1: Option<String>,
    pub audio_url_2: Option<String>,
    pub translation_provider: Option<String>,
    pub tts_provider: Option<String>,
    pub tts_voice_source: Option<String>,
    pub tts_voice_1: Option<String>,
    pub tts_voice_2: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Sentence {
    /// Languages of all three audio recordings: source first, then both targets
    pub fn audio_languages(&self) -> [&str; 3] {
        [
            self.source_language.as_str(),
            self.target_language_1.as_str(),
            self.target_language_2.as_str(),
        ]
    }
}

/// Separates the fields joined into a sentence's search text
const SEARCH_FIELD_SEPARATOR: &str = "\u{1f}";

/// Lower-cased search text of a sentence's source and translations
///
/// SQLite `LOWER()` only folds ASCII, so folding happens here, with the
/// same rules applied to search terms.
pub fn search_text(fields: &[&str]) -> String {
    fields
        .iter()
        .map(|field| field.to_lowercase())
        .collect::<Vec<_>>()
        .join(SEARCH_FIELD_SEPARATOR)
}
