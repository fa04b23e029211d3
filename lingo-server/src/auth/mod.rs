//! Student accounts and login enforcement
//!
//! HTML routes without a session are redirected to the login page; JSON
//! routes get `401`. Both middlewares put a [`CurrentStudent`] into the
//! request extensions for the handlers.

pub mod password;
pub mod session;

use axum::{
    extract::{Request, State},
    http::HeaderMap,
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};
use chrono::Utc;
use lingo_common::db::Student;
use lingo_common::{Error, Result};
use sqlx::SqlitePool;
use tracing::{info, warn};

use crate::db::students;
use crate::error::ApiError;
use crate::AppState;

pub use password::{hash_password, verify_password};
pub use session::{SameSite, SessionConfig};

/// Minimum password length accepted at registration
pub const MIN_PASSWORD_LEN: usize = 8;

/// Authenticated student attached to a request
#[derive(Debug, Clone)]
pub struct CurrentStudent {
    pub id: i64,
    pub username: String,
}

impl From<Student> for CurrentStudent {
    fn from(student: Student) -> Self {
        Self {
            id: student.id,
            username: student.username,
        }
    }
}

/// Resolve the session cookie to an existing student
///
/// Invalid cookies and cookies naming a deleted student are anonymous.
pub async fn current_student(state: &AppState, headers: &HeaderMap) -> Option<CurrentStudent> {
    let token = state.sessions.read_token(headers)?;
    let student_id = state.sessions.verify(token, Utc::now().timestamp())?;

    match students::find_by_id(&state.db, student_id).await {
        Ok(student) => student.map(CurrentStudent::from),
        Err(e) => {
            warn!("Session lookup for student {} failed: {}", student_id, e);
            None
        }
    }
}

/// Login requirement for HTML pages
pub async fn require_page_login(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Response {
    match current_student(&state, request.headers()).await {
        Some(student) => {
            request.extensions_mut().insert(student);
            next.run(request).await
        }
        None => {
            let target = request
                .uri()
                .path_and_query()
                .map(|pq| pq.as_str())
                .unwrap_or("/sentences");
            Redirect::to(&login_redirect_url(target)).into_response()
        }
    }
}

/// Login requirement for the JSON API
pub async fn require_api_login(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Response {
    match current_student(&state, request.headers()).await {
        Some(student) => {
            request.extensions_mut().insert(student);
            next.run(request).await
        }
        None => ApiError::Unauthorized("Authentication required".to_string()).into_response(),
    }
}

/// Login page URL that returns to `target` afterwards
pub fn login_redirect_url(target: &str) -> String {
    format!("/auth/login?next={}", urlencoding::encode(target))
}

/// Accept only same-site relative redirect targets
///
/// `//host` and `/\host` are rejected because browsers treat them as
/// absolute URLs.
pub fn safe_next(next: Option<&str>) -> Option<&str> {
    let next = next?.trim();
    let relative = next.starts_with('/') && !next.starts_with("//") && !next.starts_with("/\\");
    relative.then_some(next)
}

/// Normalize a username: trimmed and lower-cased
pub fn normalize_username(username: &str) -> String {
    username.trim().to_lowercase()
}

/// Validate a registration and create the student
///
/// Returns the new student's id. Validation failures are
/// [`Error::InvalidInput`], a taken username is [`Error::Conflict`].
pub async fn register(
    pool: &SqlitePool,
    username: &str,
    password: &str,
    confirm_password: &str,
) -> Result<i64> {
    let username = normalize_username(username);
    if username.is_empty() || password.is_empty() {
        return Err(Error::InvalidInput(
            "Username and password are required".to_string(),
        ));
    }
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(Error::InvalidInput(format!(
            "Password must be at least {} characters long",
            MIN_PASSWORD_LEN
        )));
    }
    if password != confirm_password {
        return Err(Error::InvalidInput("Passwords do not match".to_string()));
    }
    if students::find_by_username(pool, &username).await?.is_some() {
        return Err(Error::Conflict("Username is already taken".to_string()));
    }

    let hash = hash_password(password)?;
    let id = students::create(pool, &username, &hash)
        .await
        .map_err(|e| match e {
            Error::Conflict(_) => Error::Conflict("Username is already taken".to_string()),
            other => other,
        })?;

    info!("Registered student {} ({})", id, username);
    Ok(id)
}

/// Check credentials; `None` for an unknown user or a wrong password
pub async fn authenticate(
    pool: &SqlitePool,
    username: &str,
    password: &str,
) -> Result<Option<Student>> {
    let username = normalize_username(username);
    if username.is_empty() || password.is_empty() {
        return Ok(None);
    }

    let Some(student) = students::find_by_username(pool, &username).await? else {
        return Ok(None);
    };

    if verify_password(password, &student.password_hash) {
        Ok(Some(student))
    } else {
        Ok(None)
    }
}
