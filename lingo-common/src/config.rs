//! Bootstrap configuration file loading
//!
//! Settings resolve in priority order:
//! 1. Command-line argument (highest priority)
//! 2. Environment variable
//! 3. TOML config file
//! 4. Built-in default (fallback)
//!
//! Tiers 1 and 2 are merged by the binary's argument parser; this module
//! supplies tier 3 and the helper that folds the tiers together.

use crate::{Error, Result};
use serde::Deserialize;
use std::path::Path;
use tracing::info;

/// Values that may be supplied by a TOML config file
///
/// Every field is optional; anything left out falls through to the
/// built-in default.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct TomlConfig {
    pub bind_addr: Option<String>,
    pub database_url: Option<String>,
    pub session_secret: Option<String>,
    pub session_cookie_name: Option<String>,
    pub session_cookie_samesite: Option<String>,
    pub session_cookie_secure: Option<bool>,
    pub audio_dir: Option<String>,
    pub translation: TranslationSection,
    pub tts: TtsSection,
    pub storage: StorageSection,
}

/// `[translation]` table
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct TranslationSection {
    pub provider: Option<String>,
    pub aws_access_key_id: Option<String>,
    pub aws_secret_access_key: Option<String>,
    pub aws_session_token: Option<String>,
    pub aws_region: Option<String>,
    pub openai_api_key: Option<String>,
    pub openai_base_url: Option<String>,
    pub openai_model: Option<String>,
}

/// `[tts]` table
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct TtsSection {
    pub provider: Option<String>,
    pub azure_speech_key: Option<String>,
    pub azure_region: Option<String>,
    pub azure_voice_pl: Option<String>,
    pub azure_voice_en: Option<String>,
    pub azure_voice_de: Option<String>,
    pub google_api_key: Option<String>,
}

/// `[storage]` table
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct StorageSection {
    pub s3_bucket: Option<String>,
    pub s3_region: Option<String>,
    pub s3_base_url: Option<String>,
    pub key_prefix: Option<String>,
}

/// Load the TOML config file
///
/// A missing file yields the empty config; a file that exists but does
/// not parse is a configuration error.
pub fn load_toml_config(path: &Path) -> Result<TomlConfig> {
    if !path.exists() {
        info!("Config file not found, using defaults: {}", path.display());
        return Ok(TomlConfig::default());
    }

    let content = std::fs::read_to_string(path)?;
    let config = parse_toml_config(&content)
        .map_err(|e| Error::Config(format!("{}: {}", path.display(), e)))?;

    info!("Loaded config file: {}", path.display());
    Ok(config)
}

/// Parse TOML text into a [`TomlConfig`]
pub fn parse_toml_config(content: &str) -> Result<TomlConfig> {
    toml::from_str(content).map_err(|e| Error::Config(format!("Parse TOML failed: {}", e)))
}

/// Pick the first non-blank value from the CLI/env tier and the TOML tier
///
/// Blank strings count as unset so that `FOO=` in the environment does not
/// shadow the config file.
pub fn resolve_optional(cli_or_env: Option<String>, toml: Option<String>) -> Option<String> {
    cli_or_env
        .filter(|v| !v.trim().is_empty())
        .or_else(|| toml.filter(|v| !v.trim().is_empty()))
}

/// Like [`resolve_optional`] with a built-in default as the last tier
pub fn resolve_or(cli_or_env: Option<String>, toml: Option<String>, default: &str) -> String {
    resolve_optional(cli_or_env, toml).unwrap_or_else(|| default.to_string())
}

/// Interpret common truthy spellings (`1`, `true`, `yes`, `on`)
pub fn parse_flag(value: &str) -> bool {
    matches!(
        value.trim().to_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}
