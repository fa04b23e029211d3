//! HTML sentence pages

use axum::{
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Redirect, Response},
    Extension, Form,
};
use lingo_common::db::Sentence;
use lingo_common::Language;
use serde::Deserialize;
use tracing::error;

use super::ui::{escape_html, page, page_with_status, Flash};
use crate::auth::{current_student, CurrentStudent};
use crate::pagination::{Page, PageRequest, DEFAULT_PER_PAGE};
use crate::services::SentenceError;
use crate::AppState;

/// Query string of the sentence list
#[derive(Debug, Default, Deserialize)]
pub struct ListParams {
    pub source_language: Option<String>,
    pub q: Option<String>,
    /// Kept as text so a malformed value falls back to page 1
    pub page: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct NewSentenceForm {
    pub source_text: String,
    pub source_language: String,
}

/// GET /
pub async fn index(State(state): State<AppState>, headers: HeaderMap) -> Redirect {
    match current_student(&state, &headers).await {
        Some(_) => Redirect::to("/sentences"),
        None => Redirect::to("/auth/login"),
    }
}

fn language_options(selected: Option<&str>, include_all: bool) -> String {
    let mut options = String::new();
    if include_all {
        options.push_str(r#"<option value="">All languages</option>"#);
    }
    for language in Language::ALL {
        let code = language.code();
        let marker = if selected == Some(code) { " selected" } else { "" };
        options.push_str(&format!(
            r#"<option value="{code}"{marker}>{label}</option>"#,
            code = code,
            marker = marker,
            label = code.to_uppercase(),
        ));
    }
    options
}

fn audio_line(language: &str, text: Option<&str>, audio_url: Option<&str>) -> String {
    let player = audio_url
        .map(|url| {
            format!(
                r#"<audio controls preload="none" src="{}"></audio>"#,
                escape_html(url)
            )
        })
        .unwrap_or_default();
    format!(
        r#"<div class="line"><span class="lang">{}</span><span class="text">{}</span>{}</div>"#,
        escape_html(language),
        escape_html(text.unwrap_or("")),
        player
    )
}

/// One sentence with its translations, players and delete button
pub fn sentence_card(sentence: &Sentence) -> String {
    format!(
        r#"<article class="sentence" id="sentence-{id}">
    {source}
    {first}
    {second}
    <div class="meta">Added {created} · {translation} / {tts}</div>
    <form method="post" action="/sentences/{id}/delete" onsubmit="return confirm('Delete this sentence?');">
        <button class="danger" type="submit">Delete</button>
    </form>
</article>"#,
        id = sentence.id,
        source = audio_line(
            &sentence.source_language,
            Some(&sentence.source_text),
            sentence.audio_url_source.as_deref()
        ),
        first = audio_line(
            &sentence.target_language_1,
            sentence.translated_text_1.as_deref(),
            sentence.audio_url_1.as_deref()
        ),
        second = audio_line(
            &sentence.target_language_2,
            sentence.translated_text_2.as_deref(),
            sentence.audio_url_2.as_deref()
        ),
        created = sentence.created_at.format("%Y-%m-%d %H:%M"),
        translation = escape_html(sentence.translation_provider.as_deref().unwrap_or("-")),
        tts = escape_html(sentence.tts_provider.as_deref().unwrap_or("-")),
    )
}

fn page_link(label: &str, page: i64, language: Option<&str>, search: Option<&str>) -> String {
    let mut href = format!("/sentences?page={}", page);
    if let Some(code) = language {
        href.push_str(&format!("&source_language={}", urlencoding::encode(code)));
    }
    if let Some(q) = search {
        href.push_str(&format!("&q={}", urlencoding::encode(q)));
    }
    format!(r#"<a class="button" href="{}">{}</a>"#, escape_html(&href), label)
}

fn list_body(listing: &Page<Sentence>, language: Option<&str>, search: Option<&str>) -> String {
    let filters = format!(
        r#"<form class="filters" method="get" action="/sentences">
    <select name="source_language">{options}</select>
    <input type="search" name="q" value="{q}" placeholder="Search sentences and translations">
    <button type="submit">Filter</button>
</form>"#,
        options = language_options(language, true),
        q = escape_html(search.unwrap_or("")),
    );

    let items = if listing.items.is_empty() {
        r#"<p>No sentences yet. <a href="/sentences/new">Add your first one</a>.</p>"#.to_string()
    } else {
        listing.items.iter().map(sentence_card).collect::<Vec<_>>().join("\n")
    };

    let p = listing.pagination;
    let prev = if p.has_prev() {
        page_link("&larr; Newer", p.page - 1, language, search)
    } else {
        String::new()
    };
    let next = if p.has_next() {
        page_link("Older &rarr;", p.page + 1, language, search)
    } else {
        String::new()
    };

    format!(
        r#"{filters}
{items}
<div class="pagination">
    <span>{prev}</span>
    <span>Page {page} of {pages} · {total} sentences</span>
    <span>{next}</span>
</div>"#,
        filters = filters,
        items = items,
        prev = prev,
        next = next,
        page = p.page,
        pages = p.pages,
        total = p.total,
    )
}

/// GET /sentences
pub async fn list_sentences(
    State(state): State<AppState>,
    Extension(student): Extension<CurrentStudent>,
    Query(params): Query<ListParams>,
) -> Response {
    let language = params
        .source_language
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty());
    let search = params.q.as_deref().map(str::trim).filter(|s| !s.is_empty());
    let requested = params.page.as_deref().and_then(|p| p.trim().parse().ok());
    let request = PageRequest::new(requested, Some(DEFAULT_PER_PAGE));

    match state.sentences.list(student.id, language, search, request).await {
        Ok(listing) => page(
            "My sentences",
            Some(&student),
            None,
            &list_body(&listing, language, search),
        )
        .into_response(),
        Err(e) => {
            error!("Listing sentences for student {} failed: {}", student.id, e);
            page_with_status(
                StatusCode::INTERNAL_SERVER_ERROR,
                "My sentences",
                Some(&student),
                Some(&Flash::Error("Could not load your sentences".to_string())),
                "",
            )
        }
    }
}

fn new_sentence_body(text: &str, language: &str, created: Option<&Sentence>) -> String {
    let created_html = created
        .map(|s| format!("<h2>Just added</h2>\n{}", sentence_card(s)))
        .unwrap_or_default();
    format!(
        r#"<form class="stacked" method="post" action="/sentences/new">
    <label for="source_language">Language of the sentence</label>
    <select id="source_language" name="source_language">{options}</select>
    <label for="source_text">Sentence</label>
    <textarea id="source_text" name="source_text" rows="3" required>{text}</textarea>
    <button type="submit">Translate and record</button>
</form>
{created}"#,
        options = language_options(Some(language), false),
        text = escape_html(text),
        created = created_html,
    )
}

/// GET /sentences/new
pub async fn new_sentence_page(Extension(student): Extension<CurrentStudent>) -> Response {
    page(
        "Add sentence",
        Some(&student),
        None,
        &new_sentence_body("", Language::Pl.code(), None),
    )
    .into_response()
}

/// POST /sentences/new
pub async fn create_sentence(
    State(state): State<AppState>,
    Extension(student): Extension<CurrentStudent>,
    Form(form): Form<NewSentenceForm>,
) -> Response {
    let language = form.source_language.trim().to_lowercase();

    match state
        .sentences
        .create(student.id, &form.source_text, &language)
        .await
    {
        Ok(sentence) => page(
            "Add sentence",
            Some(&student),
            Some(&Flash::Success("Sentence saved".to_string())),
            &new_sentence_body("", &sentence.source_language, Some(&sentence)),
        )
        .into_response(),
        Err(e) => {
            let (status, message) = match &e {
                SentenceError::Validation(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
                other => {
                    error!("Creating sentence for student {} failed: {}", student.id, other);
                    (
                        StatusCode::INTERNAL_SERVER_ERROR,
                        "The sentence could not be processed, please try again".to_string(),
                    )
                }
            };
            page_with_status(
                status,
                "Add sentence",
                Some(&student),
                Some(&Flash::Error(message)),
                &new_sentence_body(&form.source_text, &language, None),
            )
        }
    }
}

/// POST /sentences/:id/delete
pub async fn delete_sentence(
    State(state): State<AppState>,
    Extension(student): Extension<CurrentStudent>,
    Path(id): Path<i64>,
) -> Response {
    match state.sentences.delete(student.id, id).await {
        Ok(true) => Redirect::to("/sentences").into_response(),
        Ok(false) => page_with_status(
            StatusCode::NOT_FOUND,
            "Not found",
            Some(&student),
            Some(&Flash::Error("Sentence not found".to_string())),
            r#"<p><a href="/sentences">Back to your sentences</a></p>"#,
        ),
        Err(e) => {
            error!("Deleting sentence {} failed: {}", id, e);
            page_with_status(
                StatusCode::INTERNAL_SERVER_ERROR,
                "Delete failed",
                Some(&student),
                Some(&Flash::Error("The sentence could not be deleted".to_string())),
                r#"<p><a href="/sentences">Back to your sentences</a></p>"#,
            )
        }
    }
}
