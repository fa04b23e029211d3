//! Sentence queries
//!
//! Every query is a single autocommit statement on the pool.

use chrono::Utc;
use lingo_common::db::{search_text, Sentence};
use lingo_common::{Language, Result};
use sqlx::{QueryBuilder, Sqlite, SqlitePool};

const SENTENCE_COLUMNS: &str = "id, student_id, source_language, source_text, \
     target_language_1, target_language_2, translated_text_1, translated_text_2, \
     audio_url_source, audio_url_1, audio_url_2, translation_provider, tts_provider, \
     tts_voice_source, tts_voice_1, tts_voice_2, created_at, updated_at";

/// Fields of a sentence row before it has an id or audio
#[derive(Debug, Clone)]
pub struct NewSentence {
    pub student_id: i64,
    pub source_language: Language,
    pub source_text: String,
    pub target_language_1: Language,
    pub target_language_2: Language,
    pub translated_text_1: String,
    pub translated_text_2: String,
    pub translation_provider: String,
    pub tts_provider: String,
    pub tts_voice_source: String,
    pub tts_voice_1: String,
    pub tts_voice_2: String,
}

/// URLs of the three recordings of a sentence
#[derive(Debug, Clone)]
pub struct SentenceAudio {
    pub source: String,
    pub target_1: String,
    pub target_2: String,
}

/// Optional listing filters
#[derive(Debug, Clone, Default)]
pub struct SentenceFilter {
    pub source_language: Option<Language>,
    /// Case-insensitive substring matched against source text and translations
    pub search: Option<String>,
}

impl SentenceFilter {
    /// `LIKE` pattern for the search term with wildcards escaped
    ///
    /// Lower-cased with the same rules as the stored search text.
    fn like_pattern(&self) -> Option<String> {
        let term = self.search.as_deref()?.trim();
        if term.is_empty() {
            return None;
        }
        let escaped = term
            .to_lowercase()
            .replace('\\', "\\\\")
            .replace('%', "\\%")
            .replace('_', "\\_");
        Some(format!("%{}%", escaped))
    }

    fn push_where<'a>(&self, qb: &mut QueryBuilder<'a, Sqlite>, student_id: i64) {
        qb.push(" WHERE student_id = ").push_bind(student_id);

        if let Some(lang) = self.source_language {
            qb.push(" AND source_language = ").push_bind(lang.code());
        }

        if let Some(pattern) = self.like_pattern() {
            qb.push(" AND search_text LIKE ")
                .push_bind(pattern)
                .push(" ESCAPE '\\'");
        }
    }
}

/// Insert a sentence row and return its id
pub async fn insert(pool: &SqlitePool, new: &NewSentence) -> Result<i64> {
    let now = Utc::now();
    let result = sqlx::query(
        r#"
        INSERT INTO sentences (
            student_id, source_language, source_text,
            target_language_1, target_language_2,
            translated_text_1, translated_text_2,
            translation_provider, tts_provider,
            tts_voice_source, tts_voice_1, tts_voice_2,
            search_text, created_at, updated_at
        )
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(new.student_id)
    .bind(new.source_language.code())
    .bind(&new.source_text)
    .bind(new.target_language_1.code())
    .bind(new.target_language_2.code())
    .bind(&new.translated_text_1)
    .bind(&new.translated_text_2)
    .bind(&new.translation_provider)
    .bind(&new.tts_provider)
    .bind(&new.tts_voice_source)
    .bind(&new.tts_voice_1)
    .bind(&new.tts_voice_2)
    .bind(search_text(&[
        new.source_text.as_str(),
        new.translated_text_1.as_str(),
        new.translated_text_2.as_str(),
    ]))
    .bind(now)
    .bind(now)
    .execute(pool)
    .await?;

    Ok(result.last_insert_rowid())
}

/// Store the audio URLs of a sentence and bump `updated_at`
pub async fn set_audio(pool: &SqlitePool, id: i64, audio: &SentenceAudio) -> Result<()> {
    sqlx::query(
        r#"
        UPDATE sentences
        SET audio_url_source = ?, audio_url_1 = ?, audio_url_2 = ?, updated_at = ?
        WHERE id = ?
        "#,
    )
    .bind(&audio.source)
    .bind(&audio.target_1)
    .bind(&audio.target_2)
    .bind(Utc::now())
    .bind(id)
    .execute(pool)
    .await?;

    Ok(())
}

/// Load a sentence owned by `student_id`
pub async fn find_owned(pool: &SqlitePool, id: i64, student_id: i64) -> Result<Option<Sentence>> {
    let sentence = sqlx::query_as::<_, Sentence>(&format!(
        "SELECT {} FROM sentences WHERE id = ? AND student_id = ?",
        SENTENCE_COLUMNS
    ))
    .bind(id)
    .bind(student_id)
    .fetch_optional(pool)
    .await?;

    Ok(sentence)
}

/// Count a student's sentences matching `filter`
pub async fn count_owned(pool: &SqlitePool, student_id: i64, filter: &SentenceFilter) -> Result<i64> {
    let mut qb = QueryBuilder::<Sqlite>::new("SELECT COUNT(*) FROM sentences");
    filter.push_where(&mut qb, student_id);

    let total = qb.build_query_scalar::<i64>().fetch_one(pool).await?;
    Ok(total)
}

/// One page of a student's sentences, newest first
pub async fn list_owned(
    pool: &SqlitePool,
    student_id: i64,
    filter: &SentenceFilter,
    limit: i64,
    offset: i64,
) -> Result<Vec<Sentence>> {
    let mut qb = QueryBuilder::<Sqlite>::new(format!("SELECT {} FROM sentences", SENTENCE_COLUMNS));
    filter.push_where(&mut qb, student_id);
    qb.push(" ORDER BY created_at DESC, id DESC LIMIT ")
        .push_bind(limit)
        .push(" OFFSET ")
        .push_bind(offset);

    let rows = qb.build_query_as::<Sentence>().fetch_all(pool).await?;
    Ok(rows)
}

/// Delete a sentence owned by `student_id`; false when nothing matched
pub async fn delete_owned(pool: &SqlitePool, id: i64, student_id: i64) -> Result<bool> {
    let result = sqlx::query("DELETE FROM sentences WHERE id = ? AND student_id = ?")
        .bind(id)
        .bind(student_id)
        .execute(pool)
        .await?;

    Ok(result.rows_affected() > 0)
}
