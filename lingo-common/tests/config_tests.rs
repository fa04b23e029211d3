//! Tests for bootstrap configuration loading
//!
//! Covers:
//! - Missing TOML file falls back to defaults without failing startup
//! - Malformed TOML is reported as a configuration error
//! - CLI/env values take priority over TOML values, TOML over defaults

use lingo_common::config::{
    load_toml_config, parse_flag, parse_toml_config, resolve_optional, resolve_or,
};
use lingo_common::Error;

#[test]
fn test_missing_config_file_yields_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("does-not-exist.toml");

    let config = load_toml_config(&path).expect("missing file must not fail");

    assert!(config.database_url.is_none());
    assert!(config.translation.provider.is_none());
    assert!(config.storage.s3_bucket.is_none());
}

#[test]
fn test_config_file_sections_are_parsed() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("lingo.toml");
    std::fs::write(
        &path,
        r#"
        database_url = "sqlite://trainer.db"
        session_cookie_secure = true

        [translation]
        provider = "openai"
        openai_model = "gpt-4o-mini"

        [tts]
        provider = "azure"
        azure_region = "westeurope"

        [storage]
        s3_bucket = "audio-bucket"
        key_prefix = "lessons"
        "#,
    )
    .unwrap();

    let config = load_toml_config(&path).unwrap();

    assert_eq!(config.database_url.as_deref(), Some("sqlite://trainer.db"));
    assert_eq!(config.session_cookie_secure, Some(true));
    assert_eq!(config.translation.provider.as_deref(), Some("openai"));
    assert_eq!(config.translation.openai_model.as_deref(), Some("gpt-4o-mini"));
    assert_eq!(config.tts.azure_region.as_deref(), Some("westeurope"));
    assert_eq!(config.storage.s3_bucket.as_deref(), Some("audio-bucket"));
    assert_eq!(config.storage.key_prefix.as_deref(), Some("lessons"));
}

#[test]
fn test_malformed_config_is_config_error() {
    let result = parse_toml_config("database_url = [unterminated");
    assert!(matches!(result, Err(Error::Config(_))));
}

#[test]
fn test_resolution_priority() {
    // CLI/env wins over TOML
    assert_eq!(
        resolve_or(Some("cli".into()), Some("toml".into()), "default"),
        "cli"
    );
    // TOML wins over default
    assert_eq!(resolve_or(None, Some("toml".into()), "default"), "toml");
    // Default when nothing is set
    assert_eq!(resolve_or(None, None, "default"), "default");
}

#[test]
fn test_blank_values_count_as_unset() {
    assert_eq!(
        resolve_optional(Some("   ".into()), Some("toml".into())).as_deref(),
        Some("toml")
    );
    assert!(resolve_optional(Some(String::new()), None).is_none());
}

#[test]
fn test_parse_flag_accepts_truthy_spellings() {
    for value in ["1", "true", "TRUE", "yes", "on"] {
        assert!(parse_flag(value), "{} should be truthy", value);
    }
    for value in ["0", "false", "no", "", "maybe"] {
        assert!(!parse_flag(value), "{} should be falsy", value);
    }
}
