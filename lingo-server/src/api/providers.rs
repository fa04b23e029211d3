//! Active provider names

use axum::{extract::State, Json};
use serde::Serialize;

use crate::AppState;

#[derive(Debug, Serialize)]
pub struct ProvidersResponse {
    pub translation: String,
    pub tts: String,
    pub storage: String,
}

/// GET /api/providers
pub async fn get_providers(State(state): State<AppState>) -> Json<ProvidersResponse> {
    Json(ProvidersResponse {
        translation: state.sentences.translation_provider().to_string(),
        tts: state.sentences.tts_provider().to_string(),
        storage: state.sentences.storage_backend().to_string(),
    })
}
