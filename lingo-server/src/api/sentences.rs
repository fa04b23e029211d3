//! JSON sentence API
//!
//! Same session as the HTML pages; a missing session answers `401`.

use axum::{
    extract::{rejection::JsonRejection, rejection::PathRejection, rejection::QueryRejection},
    extract::{Path, Query, State},
    http::StatusCode,
    Extension, Json,
};
use lingo_common::db::Sentence;
use serde::{Deserialize, Serialize};

use crate::auth::CurrentStudent;
use crate::error::{ApiError, ApiResult};
use crate::pagination::{Page, PageRequest};
use crate::AppState;

const DEFAULT_SOURCE_LANGUAGE: &str = "pl";

/// Sentence as returned by the API
#[derive(Debug, Serialize)]
pub struct SentenceView {
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
    pub created_at: String,
    pub updated_at: String,
}

impl From<Sentence> for SentenceView {
    fn from(s: Sentence) -> Self {
        Self {
            id: s.id,
            student_id: s.student_id,
            source_language: s.source_language,
            source_text: s.source_text,
            target_language_1: s.target_language_1,
            target_language_2: s.target_language_2,
            translated_text_1: s.translated_text_1,
            translated_text_2: s.translated_text_2,
            audio_url_source: s.audio_url_source,
            audio_url_1: s.audio_url_1,
            audio_url_2: s.audio_url_2,
            translation_provider: s.translation_provider,
            tts_provider: s.tts_provider,
            created_at: s.created_at.to_rfc3339(),
            updated_at: s.updated_at.to_rfc3339(),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct ListQuery {
    pub source_language: Option<String>,
    pub q: Option<String>,
    pub page: Option<i64>,
    pub per_page: Option<i64>,
}

#[derive(Debug, Default, Deserialize)]
pub struct CreateSentenceRequest {
    pub source_text: Option<String>,
    pub source_language: Option<String>,
}

fn sentence_id(path: Result<Path<i64>, PathRejection>) -> ApiResult<i64> {
    path.map(|Path(id)| id)
        .map_err(|_| ApiError::BadRequest("Sentence id must be an integer".to_string()))
}

/// GET /api/sentences
pub async fn list_sentences(
    State(state): State<AppState>,
    Extension(student): Extension<CurrentStudent>,
    query: Result<Query<ListQuery>, QueryRejection>,
) -> ApiResult<Json<Page<SentenceView>>> {
    let Query(query) = query.map_err(|e| ApiError::BadRequest(e.body_text()))?;
    let request = PageRequest::new(query.page, query.per_page);

    let listing = state
        .sentences
        .list(
            student.id,
            query.source_language.as_deref(),
            query.q.as_deref(),
            request,
        )
        .await?;

    Ok(Json(listing.map(SentenceView::from)))
}

/// POST /api/sentences
pub async fn create_sentence(
    State(state): State<AppState>,
    Extension(student): Extension<CurrentStudent>,
    body: Result<Json<CreateSentenceRequest>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<SentenceView>)> {
    let Json(body) = body.map_err(|e| ApiError::BadRequest(e.body_text()))?;
    let text = body.source_text.unwrap_or_default();
    let language = body
        .source_language
        .filter(|l| !l.trim().is_empty())
        .unwrap_or_else(|| DEFAULT_SOURCE_LANGUAGE.to_string());

    let sentence = state.sentences.create(student.id, &text, &language).await?;
    Ok((StatusCode::CREATED, Json(sentence.into())))
}

/// GET /api/sentences/:id
pub async fn get_sentence(
    State(state): State<AppState>,
    Extension(student): Extension<CurrentStudent>,
    path: Result<Path<i64>, PathRejection>,
) -> ApiResult<Json<SentenceView>> {
    let id = sentence_id(path)?;
    state
        .sentences
        .get(student.id, id)
        .await?
        .map(|s| Json(s.into()))
        .ok_or_else(|| ApiError::NotFound("Sentence not found".to_string()))
}

/// DELETE /api/sentences/:id
pub async fn delete_sentence(
    State(state): State<AppState>,
    Extension(student): Extension<CurrentStudent>,
    path: Result<Path<i64>, PathRejection>,
) -> ApiResult<StatusCode> {
    let id = sentence_id(path)?;
    if state.sentences.delete(student.id, id).await? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError::NotFound("Sentence not found".to_string()))
    }
}
