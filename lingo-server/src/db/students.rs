//! Student account queries

use chrono::Utc;
use lingo_common::db::Student;
use lingo_common::{Error, Result};
use sqlx::SqlitePool;

/// Insert a new student and return its id
///
/// A taken username yields [`Error::Conflict`].
pub async fn create(pool: &SqlitePool, username: &str, password_hash: &str) -> Result<i64> {
    let result = sqlx::query(
        "INSERT INTO students (username, password_hash, created_at) VALUES (?, ?, ?)",
    )
    .bind(username)
    .bind(password_hash)
    .bind(Utc::now())
    .execute(pool)
    .await
    .map_err(|e| Error::from_unique_violation(e, "Username"))?;

    Ok(result.last_insert_rowid())
}

pub async fn find_by_username(pool: &SqlitePool, username: &str) -> Result<Option<Student>> {
    let student = sqlx::query_as::<_, Student>(
        "SELECT id, username, password_hash, created_at FROM students WHERE username = ?",
    )
    .bind(username)
    .fetch_optional(pool)
    .await?;

    Ok(student)
}

pub async fn find_by_id(pool: &SqlitePool, id: i64) -> Result<Option<Student>> {
    let student = sqlx::query_as::<_, Student>(
        "SELECT id, username, password_hash, created_at FROM students WHERE id = ?",
    )
    .bind(id)
    .fetch_optional(pool)
    .await?;

    Ok(student)
}
