//! lingo-server - sentence trainer web service
//!
//! Startup order: tracing, build identification, configuration, database,
//! providers and storage, then the HTTP listener.

use anyhow::{Context, Result};
use clap::Parser;
use tokio::signal;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use lingo_common::config::{load_toml_config, TomlConfig};
use lingo_common::db::init_database;
use lingo_server::config::{Args, ServerConfig};
use lingo_server::providers::{select_synthesizer, select_translator, select_voice_catalog};
use lingo_server::services::SentenceService;
use lingo_server::storage::select_storage;
use lingo_server::{build_router, AppState};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,lingo_server=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Build identification immediately after tracing init
    info!(
        "Starting lingo-server v{} [{}] built {} ({})",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_HASH"),
        env!("BUILD_TIMESTAMP"),
        env!("BUILD_PROFILE")
    );

    let mut args = Args::parse();
    let toml = match args.config.take() {
        Some(path) => load_toml_config(&path).context("Failed to load config file")?,
        None => TomlConfig::default(),
    };
    let config = ServerConfig::resolve(args, toml);

    info!("Database: {}", config.database_url);
    let pool = match init_database(&config.database_url).await {
        Ok(pool) => {
            info!("✓ Database ready");
            pool
        }
        Err(e) => {
            error!("Failed to open database: {}", e);
            return Err(e.into());
        }
    };

    let translator = select_translator(&config.translation);
    let synthesizer = select_synthesizer(&config.tts);
    let voices = select_voice_catalog(&config.tts);
    let storage = select_storage(config.s3.clone(), &config.audio_dir)
        .context("Failed to initialize audio storage")?;
    info!("Audio key prefix: {}", config.key_prefix);

    let local_audio_dir = config.s3.is_none().then(|| config.audio_dir.clone());

    let service = SentenceService::new(
        pool.clone(),
        translator,
        synthesizer,
        storage,
        config.key_prefix.clone(),
    );
    let state = AppState::new(pool, service, config.session.clone())
        .with_voice_catalog(voices)
        .with_local_audio_dir(local_audio_dir);
    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(&config.bind_addr)
        .await
        .with_context(|| format!("Failed to bind to {}", config.bind_addr))?;
    info!("lingo-server listening on http://{}", config.bind_addr);
    info!("Health check: http://{}/health", config.bind_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Server shutdown complete");
    Ok(())
}

/// Resolve on Ctrl+C or SIGTERM
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, shutting down");
        },
        _ = terminate => {
            info!("Received terminate signal, shutting down");
        },
    }
}
