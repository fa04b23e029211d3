//! HTML page shell and static assets
//!
//! Pages are assembled from `format!` templates. Every value that comes
//! from a user or a provider goes through [`escape_html`] first.

use axum::{
    http::{header, StatusCode},
    response::{Html, IntoResponse, Response},
};

use crate::auth::CurrentStudent;

const STYLE_CSS: &str = include_str!("../../ui/style.css");

/// GET /static/style.css
pub async fn serve_style_css() -> Response {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/css; charset=utf-8")],
        STYLE_CSS,
    )
        .into_response()
}

/// Escape text for HTML element content and quoted attributes
pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#x27;"),
            other => out.push(other),
        }
    }
    out
}

/// Message shown above the page content
#[derive(Debug, Clone)]
pub enum Flash {
    Error(String),
    Success(String),
}

impl Flash {
    fn render(&self) -> String {
        let (class, message) = match self {
            Flash::Error(m) => ("error", m),
            Flash::Success(m) => ("success", m),
        };
        format!(r#"<div class="flash {}">{}</div>"#, class, escape_html(message))
    }
}

/// Wrap `body` in the shared page layout
pub fn page(
    title: &str,
    student: Option<&CurrentStudent>,
    flash: Option<&Flash>,
    body: &str,
) -> Html<String> {
    let nav = match student {
        Some(s) => format!(
            r#"<nav>
        <a href="/sentences">My sentences</a>
        <a href="/sentences/new">Add sentence</a>
        <a href="/voices">Voices</a>
        <span class="user">{}</span>
        <a href="/auth/logout">Log out</a>
    </nav>"#,
            escape_html(&s.username)
        ),
        None => r#"<nav>
        <a href="/auth/login">Log in</a>
        <a href="/auth/register">Register</a>
    </nav>"#
            .to_string(),
    };

    Html(format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>{title} · Sentence Trainer</title>
    <link rel="stylesheet" href="/static/style.css">
</head>
<body>
<header>
    <a class="brand" href="/">Sentence Trainer</a>
    {nav}
</header>
<main>
    <h1>{title}</h1>
    {flash}
    {body}
</main>
<footer>lingo-server v{version} [{git_hash}]</footer>
</body>
</html>
"#,
        title = escape_html(title),
        nav = nav,
        flash = flash.map(Flash::render).unwrap_or_default(),
        body = body,
        version = env!("CARGO_PKG_VERSION"),
        git_hash = env!("GIT_HASH"),
    ))
}

/// Page response with a status code
pub fn page_with_status(
    status: StatusCode,
    title: &str,
    student: Option<&CurrentStudent>,
    flash: Option<&Flash>,
    body: &str,
) -> Response {
    (status, page(title, student, flash, body)).into_response()
}
