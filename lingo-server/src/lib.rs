//! lingo-server library - sentence trainer web service
//!
//! Students register, submit example sentences in Polish, English or
//! German, and get both translations plus a recording of each version.

use std::path::PathBuf;
use std::sync::Arc;

use axum::Router;
use sqlx::SqlitePool;

pub mod api;
pub mod auth;
pub mod config;
pub mod db;
pub mod error;
pub mod pagination;
pub mod providers;
pub mod services;
pub mod storage;

use auth::SessionConfig;
use providers::AzureVoiceCatalog;
use services::SentenceService;

/// Application state shared across HTTP handlers
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool
    pub db: SqlitePool,
    pub sentences: Arc<SentenceService>,
    /// Session cookie signing and attributes
    pub sessions: Arc<SessionConfig>,
    /// Present only when Azure credentials are configured
    pub voices: Option<Arc<AzureVoiceCatalog>>,
    /// Served under `/static/audio` when audio is stored locally
    pub local_audio_dir: Option<PathBuf>,
}

impl AppState {
    /// Create new application state
    pub fn new(db: SqlitePool, sentences: SentenceService, sessions: SessionConfig) -> Self {
        Self {
            db,
            sentences: Arc::new(sentences),
            sessions: Arc::new(sessions),
            voices: None,
            local_audio_dir: None,
        }
    }

    pub fn with_voice_catalog(mut self, voices: Option<Arc<AzureVoiceCatalog>>) -> Self {
        self.voices = voices;
        self
    }

    pub fn with_local_audio_dir(mut self, dir: Option<PathBuf>) -> Self {
        self.local_audio_dir = dir;
        self
    }
}

/// Build application router
///
/// HTML pages redirect anonymous visitors to the login page, JSON routes
/// answer `401`. Login, registration, health and build info are public.
pub fn build_router(state: AppState) -> Router {
    use axum::middleware;
    use axum::routing::{get, post};
    use tower_http::services::ServeDir;
    use tower_http::trace::TraceLayer;

    // Pages requiring a session
    let pages = Router::new()
        .route("/sentences", get(api::pages::list_sentences))
        .route(
            "/sentences/new",
            get(api::pages::new_sentence_page).post(api::pages::create_sentence),
        )
        .route("/sentences/:id/delete", post(api::pages::delete_sentence))
        .route("/voices", get(api::voices::voices_page))
        .route("/auth/logout", get(api::auth::logout))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            auth::require_page_login,
        ));

    // JSON API requiring a session
    let json_api = Router::new()
        .route(
            "/api/sentences",
            get(api::sentences::list_sentences).post(api::sentences::create_sentence),
        )
        .route(
            "/api/sentences/:id",
            get(api::sentences::get_sentence).delete(api::sentences::delete_sentence),
        )
        .route("/api/providers", get(api::get_providers))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            auth::require_api_login,
        ));

    // Public routes
    let public = Router::new()
        .route("/", get(api::pages::index))
        .route(
            "/auth/login",
            get(api::auth::login_page).post(api::auth::login),
        )
        .route(
            "/auth/register",
            get(api::auth::register_page).post(api::auth::register),
        )
        .route("/api/buildinfo", get(api::get_build_info))
        .route("/static/style.css", get(api::serve_style_css))
        .merge(api::health_routes());

    let mut router = Router::new().merge(pages).merge(json_api).merge(public);

    if let Some(dir) = &state.local_audio_dir {
        router = router.nest_service("/static/audio", ServeDir::new(dir));
    }

    router.layer(TraceLayer::new_for_http()).with_state(state)
}
