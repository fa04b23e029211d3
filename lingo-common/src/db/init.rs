//! Database initialization
//!
//! Tables are created on first run with `CREATE TABLE IF NOT EXISTS`;
//! there is no separate migration step.

use crate::db::models::search_text;
use crate::{Error, Result};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use sqlx::{Row, SqlitePool};
use std::str::FromStr;
use std::time::Duration;
use tracing::info;

/// Initialize database connection and create tables if needed
///
/// Accepts any SQLite URL (`sqlite://path.db`, `sqlite::memory:`).
/// In-memory databases are pinned to a single connection so every query
/// sees the same schema.
pub async fn init_database(db_url: &str) -> Result<SqlitePool> {
    let in_memory = is_memory_url(db_url);

    let mut options = SqliteConnectOptions::from_str(db_url)
        .map_err(|e| Error::Config(format!("Invalid database URL '{}': {}", db_url, e)))?
        .create_if_missing(true)
        .foreign_keys(true)
        .busy_timeout(Duration::from_millis(5000));

    let pool = if in_memory {
        SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await?
    } else {
        let db_path = options.get_filename().to_path_buf();
        let newly_created = !db_path.exists();

        // Create parent directory if it doesn't exist
        if let Some(parent) = db_path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        // WAL allows readers alongside the single writer
        options = options.journal_mode(SqliteJournalMode::Wal);
        let pool = SqlitePoolOptions::new()
            .max_connections(10)
            .connect_with(options)
            .await?;

        if newly_created {
            info!("Initialized new database: {}", db_path.display());
        } else {
            info!("Opened existing database: {}", db_path.display());
        }
        pool
    };

    create_students_table(&pool).await?;
    create_sentences_table(&pool).await?;

    Ok(pool)
}

/// Open a fresh in-memory database with the full schema
pub async fn init_memory_database() -> Result<SqlitePool> {
    init_database("sqlite::memory:").await
}

fn is_memory_url(db_url: &str) -> bool {
    db_url.contains(":memory:") || db_url.contains("mode=memory")
}

/// Create the students table
///
/// Usernames are stored lower-cased; uniqueness is enforced here.
pub async fn create_students_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS students (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            username TEXT NOT NULL UNIQUE,
            password_hash TEXT NOT NULL,
            created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

/// Add and fill `sentences.search_text` in databases created without it
async fn ensure_search_text(pool: &SqlitePool) -> Result<()> {
    let has_column = sqlx::query("PRAGMA table_info(sentences)")
        .fetch_all(pool)
        .await?
        .iter()
        .any(|row| row.get::<String, _>("name") == "search_text");

    if !has_column {
        info!("Adding column sentences.search_text");
        sqlx::query("ALTER TABLE sentences ADD COLUMN search_text TEXT NOT NULL DEFAULT ''")
            .execute(pool)
            .await?;
    }

    let rows = sqlx::query(
        "SELECT id, source_text, COALESCE(translated_text_1, '') AS t1, \
         COALESCE(translated_text_2, '') AS t2 FROM sentences WHERE search_text = ''",
    )
    .fetch_all(pool)
    .await?;

    if !rows.is_empty() {
        info!("Indexing search text of {} sentences", rows.len());
    }
    for row in rows {
        let id: i64 = row.get("id");
        let source: String = row.get("source_text");
        let t1: String = row.get("t1");
        let t2: String = row.get("t2");
        sqlx::query("UPDATE sentences SET search_text = ? WHERE id = ?")
            .bind(search_text(&[source.as_str(), t1.as_str(), t2.as_str()]))
            .bind(id)
            .execute(pool)
            .await?;
    }

    Ok(())
}

/// Create the sentences table
///
/// Rows cascade away with their owning student. Translations and audio
/// URLs stay NULL until the corresponding provider call has succeeded.
pub async fn create_sentences_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS sentences (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            student_id INTEGER NOT NULL REFERENCES students(id) ON DELETE CASCADE,
            source_language TEXT NOT NULL CHECK (source_language IN ('pl', 'en', 'de')),
            source_text TEXT NOT NULL,
            target_language_1 TEXT NOT NULL CHECK (target_language_1 IN ('pl', 'en', 'de')),
            target_language_2 TEXT NOT NULL CHECK (target_language_2 IN ('pl', 'en', 'de')),
            translated_text_1 TEXT,
            translated_text_2 TEXT,
            audio_url_source TEXT,
            audio_url_1 TEXT,
            audio_url_2 TEXT,
            translation_provider TEXT,
            tts_provider TEXT,
            tts_voice_source TEXT,
            tts_voice_1 TEXT,
            tts_voice_2 TEXT,
            search_text TEXT NOT NULL DEFAULT '',
            created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
            updated_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
            CHECK (target_language_1 != target_language_2)
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_sentences_student_created ON sentences(student_id, created_at)",
    )
    .execute(pool)
    .await?;

    ensure_search_text(pool).await?;

    Ok(())
}
