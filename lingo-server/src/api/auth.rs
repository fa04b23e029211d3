//! Login, registration and logout pages

use axum::{
    extract::{Query, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Redirect, Response},
    Form,
};
use chrono::Utc;
use lingo_common::Error;
use serde::Deserialize;
use tracing::{error, info};

use super::ui::{escape_html, page, page_with_status, Flash};
use crate::auth::{self, current_student, safe_next, MIN_PASSWORD_LEN};
use crate::AppState;

const AFTER_LOGIN: &str = "/sentences";

/// Query string of the login page
#[derive(Debug, Default, Deserialize)]
pub struct LoginQuery {
    pub next: Option<String>,
    pub registered: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct LoginForm {
    pub username: String,
    pub password: String,
    pub next: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct RegisterForm {
    pub username: String,
    pub password: String,
    pub confirm_password: String,
}

fn login_body(username: &str, next: Option<&str>) -> String {
    let next_field = safe_next(next)
        .map(|n| format!(r#"<input type="hidden" name="next" value="{}">"#, escape_html(n)))
        .unwrap_or_default();
    format!(
        r#"<form class="stacked" method="post" action="/auth/login">
    {next_field}
    <label for="username">Username</label>
    <input id="username" name="username" value="{username}" autocomplete="username" required>
    <label for="password">Password</label>
    <input id="password" name="password" type="password" autocomplete="current-password" required>
    <button type="submit">Log in</button>
</form>
<p>No account yet? <a href="/auth/register">Register</a></p>"#,
        next_field = next_field,
        username = escape_html(username),
    )
}

fn register_body(username: &str) -> String {
    format!(
        r#"<form class="stacked" method="post" action="/auth/register">
    <label for="username">Username</label>
    <input id="username" name="username" value="{username}" autocomplete="username" required>
    <label for="password">Password (at least {min} characters)</label>
    <input id="password" name="password" type="password" autocomplete="new-password" required>
    <label for="confirm_password">Repeat password</label>
    <input id="confirm_password" name="confirm_password" type="password" autocomplete="new-password" required>
    <button type="submit">Create account</button>
</form>
<p>Already registered? <a href="/auth/login">Log in</a></p>"#,
        username = escape_html(username),
        min = MIN_PASSWORD_LEN,
    )
}

/// GET /auth/login
pub async fn login_page(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<LoginQuery>,
) -> Response {
    if current_student(&state, &headers).await.is_some() {
        return Redirect::to(AFTER_LOGIN).into_response();
    }

    let flash = query
        .registered
        .is_some()
        .then(|| Flash::Success("Account created. You can log in now.".to_string()));
    page("Log in", None, flash.as_ref(), &login_body("", query.next.as_deref())).into_response()
}

/// POST /auth/login
pub async fn login(State(state): State<AppState>, Form(form): Form<LoginForm>) -> Response {
    let flash = match auth::authenticate(&state.db, &form.username, &form.password).await {
        Ok(Some(student)) => {
            info!("Student {} logged in", student.id);
            let cookie = state.sessions.login_cookie(student.id, Utc::now().timestamp());
            let target = safe_next(form.next.as_deref()).unwrap_or(AFTER_LOGIN).to_string();
            return ([(header::SET_COOKIE, cookie)], Redirect::to(&target)).into_response();
        }
        Ok(None) => Flash::Error("Invalid username or password".to_string()),
        Err(e) => {
            error!("Login failed: {}", e);
            Flash::Error("Login is temporarily unavailable".to_string())
        }
    };

    page_with_status(
        StatusCode::UNAUTHORIZED,
        "Log in",
        None,
        Some(&flash),
        &login_body(&form.username, form.next.as_deref()),
    )
}

/// GET /auth/register
pub async fn register_page(State(state): State<AppState>, headers: HeaderMap) -> Response {
    if current_student(&state, &headers).await.is_some() {
        return Redirect::to(AFTER_LOGIN).into_response();
    }
    page("Register", None, None, &register_body("")).into_response()
}

/// POST /auth/register
pub async fn register(State(state): State<AppState>, Form(form): Form<RegisterForm>) -> Response {
    let result = auth::register(
        &state.db,
        &form.username,
        &form.password,
        &form.confirm_password,
    )
    .await;

    let (status, message) = match result {
        Ok(_) => return Redirect::to("/auth/login?registered=1").into_response(),
        Err(Error::InvalidInput(msg)) => (StatusCode::BAD_REQUEST, msg),
        Err(Error::Conflict(msg)) => (StatusCode::CONFLICT, msg),
        Err(e) => {
            error!("Registration failed: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Registration is temporarily unavailable".to_string(),
            )
        }
    };

    page_with_status(
        status,
        "Register",
        None,
        Some(&Flash::Error(message)),
        &register_body(&form.username),
    )
}

/// GET /auth/logout
pub async fn logout(State(state): State<AppState>) -> Response {
    (
        [(header::SET_COOKIE, state.sessions.logout_cookie())],
        Redirect::to("/auth/login"),
    )
        .into_response()
}
