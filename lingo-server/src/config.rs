//! Server configuration
//!
//! Every setting is a command-line flag with an environment variable
//! fallback; values missing from both come from the optional TOML file,
//! then from built-in defaults.

use std::collections::HashMap;
use std::path::PathBuf;

use clap::Parser;
use lingo_common::config::{parse_flag, resolve_optional, resolve_or, TomlConfig};
use lingo_common::Language;
use tracing::warn;

use crate::auth::session::DEFAULT_COOKIE_NAME;
use crate::auth::{SameSite, SessionConfig};
use crate::providers::{TranslationSettings, TtsSettings};
use crate::storage::{normalize_prefix, S3Settings};

pub const DEFAULT_BIND_ADDR: &str = "127.0.0.1:5730";
pub const DEFAULT_DATABASE_URL: &str = "sqlite://learning_platform.db";
pub const DEFAULT_AUDIO_DIR: &str = "static/audio";

/// Secret used when none is configured; only suitable for development
const DEV_SESSION_SECRET: &str = "dev";

/// Command-line arguments for lingo-server
#[derive(Parser, Debug, Default)]
#[command(name = "lingo-server")]
#[command(about = "Sentence trainer: translations and pronunciations for language learners")]
#[command(version)]
pub struct Args {
    /// Optional TOML config file
    #[arg(short, long, env = "LINGO_CONFIG")]
    pub config: Option<PathBuf>,

    /// Address to listen on
    #[arg(long, env = "BIND_ADDR")]
    pub bind_addr: Option<String>,

    /// SQLite database URL
    #[arg(long, env = "DB_URL")]
    pub database_url: Option<String>,

    /// Session cookie signing secret
    #[arg(long, env = "SESSION_SECRET")]
    pub session_secret: Option<String>,

    /// Legacy name of the session secret variable
    #[arg(long, env = "FLASK_SECRET_KEY", hide = true)]
    pub legacy_secret_key: Option<String>,

    #[arg(long, env = "SESSION_COOKIE_NAME")]
    pub session_cookie_name: Option<String>,

    /// Lax, Strict or None
    #[arg(long, env = "SESSION_COOKIE_SAMESITE")]
    pub session_cookie_samesite: Option<String>,

    /// Mark the session cookie Secure (1/true/yes/on)
    #[arg(long, env = "SESSION_COOKIE_SECURE")]
    pub session_cookie_secure: Option<String>,

    /// Directory for locally stored audio
    #[arg(long, env = "AUDIO_DIR")]
    pub audio_dir: Option<PathBuf>,

    /// mock, aws or openai
    #[arg(long, env = "TRANSLATION_PROVIDER")]
    pub translation_provider: Option<String>,

    #[arg(long, env = "AWS_ACCESS_KEY_ID", hide_env_values = true)]
    pub aws_access_key_id: Option<String>,

    #[arg(long, env = "AWS_SECRET_ACCESS_KEY", hide_env_values = true)]
    pub aws_secret_access_key: Option<String>,

    #[arg(long, env = "AWS_SESSION_TOKEN", hide_env_values = true)]
    pub aws_session_token: Option<String>,

    /// Defaults to the S3 region
    #[arg(long, env = "AWS_TRANSLATE_REGION")]
    pub aws_translate_region: Option<String>,

    #[arg(long, env = "OPENAI_API_KEY", hide_env_values = true)]
    pub openai_api_key: Option<String>,

    #[arg(long, env = "OPENAI_BASE_URL")]
    pub openai_base_url: Option<String>,

    #[arg(long, env = "OPENAI_TRANSLATE_MODEL")]
    pub openai_model: Option<String>,

    /// mock, azure or google
    #[arg(long, env = "TTS_PROVIDER")]
    pub tts_provider: Option<String>,

    #[arg(long, env = "AZURE_SPEECH_KEY", hide_env_values = true)]
    pub azure_speech_key: Option<String>,

    #[arg(long, env = "AZURE_REGION")]
    pub azure_region: Option<String>,

    #[arg(long, env = "AZURE_VOICE_PL")]
    pub azure_voice_pl: Option<String>,

    #[arg(long, env = "AZURE_VOICE_EN")]
    pub azure_voice_en: Option<String>,

    #[arg(long, env = "AZURE_VOICE_DE")]
    pub azure_voice_de: Option<String>,

    #[arg(long, env = "GOOGLE_TTS_API_KEY", hide_env_values = true)]
    pub google_api_key: Option<String>,

    /// Bucket for audio; local storage is used when unset
    #[arg(long, env = "S3_BUCKET")]
    pub s3_bucket: Option<String>,

    #[arg(long, env = "S3_REGION")]
    pub s3_region: Option<String>,

    /// Public base URL of the bucket (e.g. a CDN)
    #[arg(long, env = "S3_BASE_URL")]
    pub s3_base_url: Option<String>,

    /// Key prefix for audio objects
    #[arg(long, env = "S3_LEARNING_PREFIX")]
    pub key_prefix: Option<String>,
}

/// Fully resolved server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub bind_addr: String,
    pub database_url: String,
    pub session: SessionConfig,
    pub audio_dir: PathBuf,
    pub key_prefix: String,
    pub translation: TranslationSettings,
    pub tts: TtsSettings,
    pub s3: Option<S3Settings>,
}

impl ServerConfig {
    /// Fold CLI/env arguments over the TOML file and defaults
    pub fn resolve(args: Args, toml: TomlConfig) -> Self {
        let secret = resolve_optional(
            args.session_secret.or(args.legacy_secret_key),
            toml.session_secret,
        )
        .unwrap_or_else(|| {
            warn!("No session secret configured, using an insecure development secret");
            DEV_SESSION_SECRET.to_string()
        });

        let same_site = SameSite::parse(&resolve_or(
            args.session_cookie_samesite,
            toml.session_cookie_samesite,
            "Lax",
        ));
        let secure = args
            .session_cookie_secure
            .as_deref()
            .map(parse_flag)
            .or(toml.session_cookie_secure)
            .unwrap_or(false);
        let session = SessionConfig::new(
            secret,
            resolve_or(args.session_cookie_name, toml.session_cookie_name, DEFAULT_COOKIE_NAME),
            same_site,
            secure,
        );

        let audio_dir = args
            .audio_dir
            .or_else(|| toml.audio_dir.map(PathBuf::from))
            .unwrap_or_else(|| PathBuf::from(DEFAULT_AUDIO_DIR));

        let s3_region = resolve_optional(args.s3_region, toml.storage.s3_region);

        let translation = TranslationSettings {
            provider: resolve_optional(args.translation_provider, toml.translation.provider),
            aws_access_key_id: resolve_optional(
                args.aws_access_key_id,
                toml.translation.aws_access_key_id,
            ),
            aws_secret_access_key: resolve_optional(
                args.aws_secret_access_key,
                toml.translation.aws_secret_access_key,
            ),
            aws_session_token: resolve_optional(
                args.aws_session_token,
                toml.translation.aws_session_token,
            ),
            aws_region: resolve_optional(args.aws_translate_region, toml.translation.aws_region)
                .or_else(|| s3_region.clone()),
            openai_api_key: resolve_optional(args.openai_api_key, toml.translation.openai_api_key),
            openai_base_url: resolve_optional(args.openai_base_url, toml.translation.openai_base_url),
            openai_model: resolve_optional(args.openai_model, toml.translation.openai_model),
        };

        let mut voice_overrides = HashMap::new();
        let voices = [
            (Language::Pl, args.azure_voice_pl, toml.tts.azure_voice_pl),
            (Language::En, args.azure_voice_en, toml.tts.azure_voice_en),
            (Language::De, args.azure_voice_de, toml.tts.azure_voice_de),
        ];
        for (language, cli, file) in voices {
            if let Some(voice) = resolve_optional(cli, file) {
                voice_overrides.insert(language, voice);
            }
        }

        let tts = TtsSettings {
            provider: resolve_optional(args.tts_provider, toml.tts.provider),
            azure_speech_key: resolve_optional(args.azure_speech_key, toml.tts.azure_speech_key),
            azure_region: resolve_optional(args.azure_region, toml.tts.azure_region),
            voice_overrides,
            google_api_key: resolve_optional(args.google_api_key, toml.tts.google_api_key),
        };

        let s3 = resolve_optional(args.s3_bucket, toml.storage.s3_bucket).map(|bucket| {
            S3Settings {
                bucket,
                region: s3_region,
                base_url: resolve_optional(args.s3_base_url, toml.storage.s3_base_url),
            }
        });

        let key_prefix = normalize_prefix(
            resolve_optional(args.key_prefix, toml.storage.key_prefix).as_deref(),
        );

        Self {
            bind_addr: resolve_or(args.bind_addr, toml.bind_addr, DEFAULT_BIND_ADDR),
            database_url: resolve_or(args.database_url, toml.database_url, DEFAULT_DATABASE_URL),
            session,
            audio_dir,
            key_prefix,
            translation,
            tts,
            s3,
        }
    }
}
