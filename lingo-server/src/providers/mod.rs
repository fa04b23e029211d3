//! Translation and speech synthesis providers
//!
//! Each provider family has one mock implementation and one or more cloud
//! implementations. The cloud ones are wrapped in a fallback adapter that
//! substitutes mock output when the remote call fails.

pub mod translation;
pub mod tts;

use std::collections::HashMap;
use std::sync::Arc;

use lingo_common::Language;
use thiserror::Error;
use tracing::{info, warn};

pub use translation::{AwsTranslator, FallbackTranslator, MockTranslator, OpenAiTranslator, Translator};
pub use tts::{
    AzureSynthesizer, AzureVoiceCatalog, FallbackSynthesizer, GoogleSynthesizer, MockSynthesizer,
    SpeechSynthesizer,
};

/// Errors raised by translation and speech providers
#[derive(Debug, Error)]
pub enum ProviderError {
    /// Input rejected before any remote call (e.g. empty text)
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Connection failure, timeout, or unreadable response body
    #[error("Network error: {0}")]
    Network(String),

    /// Remote service answered with an error status or unexpected payload
    #[error("API error: {0}")]
    Api(String),

    /// Provider cannot be constructed from the given configuration
    #[error("Configuration error: {0}")]
    Config(String),
}

/// Translation provider selection, resolved from configuration
#[derive(Debug, Clone, Default)]
pub struct TranslationSettings {
    /// `mock`, `aws` or `openai`; `None` picks automatically
    pub provider: Option<String>,
    pub aws_access_key_id: Option<String>,
    pub aws_secret_access_key: Option<String>,
    pub aws_session_token: Option<String>,
    /// Translate region, already defaulted to the storage region
    pub aws_region: Option<String>,
    pub openai_api_key: Option<String>,
    pub openai_base_url: Option<String>,
    pub openai_model: Option<String>,
}

impl TranslationSettings {
    /// Provider name after applying the automatic choice
    ///
    /// Without an explicit provider, AWS is used when both AWS keys are
    /// present, then OpenAI when its API key is, and the mock otherwise.
    pub fn effective_provider(&self) -> String {
        match &self.provider {
            Some(p) if !p.trim().is_empty() => p.trim().to_lowercase(),
            _ if self.aws_access_key_id.is_some() && self.aws_secret_access_key.is_some() => {
                "aws".to_string()
            }
            _ if self.openai_api_key.is_some() => "openai".to_string(),
            _ => "mock".to_string(),
        }
    }
}

/// Speech provider selection, resolved from configuration
#[derive(Debug, Clone, Default)]
pub struct TtsSettings {
    /// `mock`, `azure` or `google`; `None` picks automatically
    pub provider: Option<String>,
    pub azure_speech_key: Option<String>,
    pub azure_region: Option<String>,
    pub voice_overrides: HashMap<Language, String>,
    pub google_api_key: Option<String>,
}

impl TtsSettings {
    /// Provider name after applying the automatic choice
    ///
    /// Without an explicit provider, Azure is used when a speech key is
    /// present and the mock otherwise.
    pub fn effective_provider(&self) -> String {
        match &self.provider {
            Some(p) if !p.trim().is_empty() => p.trim().to_lowercase(),
            _ if self.azure_speech_key.is_some() => "azure".to_string(),
            _ => "mock".to_string(),
        }
    }
}

/// Build the translator selected by configuration
///
/// A cloud provider that cannot be constructed degrades to the mock with a
/// warning instead of failing startup.
pub fn select_translator(settings: &TranslationSettings) -> Arc<dyn Translator> {
    let provider = settings.effective_provider();
    let primary: Result<Arc<dyn Translator>, ProviderError> = match provider.as_str() {
        "mock" => return Arc::new(MockTranslator),
        "openai" => OpenAiTranslator::new(
            settings.openai_api_key.clone().unwrap_or_default(),
            settings.openai_base_url.clone(),
            settings.openai_model.clone(),
        )
        .map(|t| Arc::new(t) as Arc<dyn Translator>),
        "aws" => AwsTranslator::new(
            settings.aws_access_key_id.clone().unwrap_or_default(),
            settings.aws_secret_access_key.clone().unwrap_or_default(),
            settings.aws_session_token.clone(),
            settings.aws_region.clone(),
        )
        .map(|t| Arc::new(t) as Arc<dyn Translator>),
        other => Err(ProviderError::Config(format!(
            "Unknown translation provider '{}'",
            other
        ))),
    };

    match primary {
        Ok(primary) => {
            info!("Translation provider: {} (mock fallback)", primary.name());
            Arc::new(FallbackTranslator::new(primary))
        }
        Err(e) => {
            warn!("Translation provider '{}' unavailable, using mock: {}", provider, e);
            Arc::new(MockTranslator)
        }
    }
}

/// Build the speech synthesizer selected by configuration
pub fn select_synthesizer(settings: &TtsSettings) -> Arc<dyn SpeechSynthesizer> {
    let provider = settings.effective_provider();
    let primary: Result<Arc<dyn SpeechSynthesizer>, ProviderError> = match provider.as_str() {
        "mock" => return Arc::new(MockSynthesizer),
        "azure" => AzureSynthesizer::new(
            settings.azure_speech_key.clone().unwrap_or_default(),
            settings.azure_region.clone().unwrap_or_default(),
            settings.voice_overrides.clone(),
        )
        .map(|s| Arc::new(s) as Arc<dyn SpeechSynthesizer>),
        "google" => GoogleSynthesizer::new(
            settings.google_api_key.clone().unwrap_or_default(),
            settings.voice_overrides.clone(),
        )
        .map(|s| Arc::new(s) as Arc<dyn SpeechSynthesizer>),
        other => Err(ProviderError::Config(format!("Unknown TTS provider '{}'", other))),
    };

    match primary {
        Ok(primary) => {
            info!("TTS provider: {} (mock fallback)", primary.name());
            Arc::new(FallbackSynthesizer::new(primary))
        }
        Err(e) => {
            warn!("TTS provider '{}' unavailable, using mock: {}", provider, e);
            Arc::new(MockSynthesizer)
        }
    }
}

/// Build the Azure voice catalog when Azure credentials are configured
pub fn select_voice_catalog(settings: &TtsSettings) -> Option<Arc<AzureVoiceCatalog>> {
    match (&settings.azure_speech_key, &settings.azure_region) {
        (Some(key), Some(region)) => AzureVoiceCatalog::new(key.clone(), region.clone())
            .map(Arc::new)
            .map_err(|e| warn!("Azure voice listing unavailable: {}", e))
            .ok(),
        _ => None,
    }
}

/// Reusable HTTP client with a per-request timeout
pub(crate) fn http_client(timeout: std::time::Duration) -> Result<reqwest::Client, ProviderError> {
    reqwest::Client::builder()
        .timeout(timeout)
        .user_agent(concat!("SentenceTrainer/", env!("CARGO_PKG_VERSION")))
        .build()
        .map_err(|e| ProviderError::Config(format!("Failed to create HTTP client: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_translation_provider_auto_selection() {
        let mut settings = TranslationSettings::default();
        assert_eq!(settings.effective_provider(), "mock");

        settings.openai_api_key = Some("sk-test".to_string());
        assert_eq!(settings.effective_provider(), "openai");

        // Both AWS keys are needed before AWS wins over OpenAI
        settings.aws_access_key_id = Some("AKIATEST".to_string());
        assert_eq!(settings.effective_provider(), "openai");
        settings.aws_secret_access_key = Some("secret".to_string());
        assert_eq!(settings.effective_provider(), "aws");

        settings.provider = Some(" OpenAI ".to_string());
        assert_eq!(settings.effective_provider(), "openai");
    }

    #[test]
    fn test_tts_provider_auto_selection() {
        let mut settings = TtsSettings::default();
        assert_eq!(settings.effective_provider(), "mock");

        settings.azure_speech_key = Some("key".to_string());
        assert_eq!(settings.effective_provider(), "azure");

        settings.provider = Some("mock".to_string());
        assert_eq!(settings.effective_provider(), "mock");
    }

    #[test]
    fn test_misconfigured_cloud_provider_degrades_to_mock() {
        // OpenAI selected explicitly but no key
        let settings = TranslationSettings {
            provider: Some("openai".to_string()),
            ..Default::default()
        };
        assert_eq!(select_translator(&settings).name(), "mock");

        // Azure selected but region missing
        let settings = TtsSettings {
            provider: Some("azure".to_string()),
            azure_speech_key: Some("key".to_string()),
            ..Default::default()
        };
        assert_eq!(select_synthesizer(&settings).name(), "mock");
    }

    #[test]
    fn test_unknown_provider_degrades_to_mock() {
        let settings = TranslationSettings {
            provider: Some("babelfish".to_string()),
            ..Default::default()
        };
        assert_eq!(select_translator(&settings).name(), "mock");
    }

    #[test]
    fn test_configured_cloud_provider_is_wrapped_in_fallback() {
        let settings = TranslationSettings {
            provider: Some("openai".to_string()),
            openai_api_key: Some("sk-test".to_string()),
            ..Default::default()
        };
        assert_eq!(select_translator(&settings).name(), "openai");
    }

    #[tokio::test]
    async fn test_aws_credentials_select_aws_translator() {
        let settings = TranslationSettings {
            aws_access_key_id: Some("AKIATEST".to_string()),
            aws_secret_access_key: Some("secret".to_string()),
            aws_region: Some("eu-central-1".to_string()),
            ..Default::default()
        };
        assert_eq!(select_translator(&settings).name(), "aws");

        // No region anywhere: degrade to the mock
        let settings = TranslationSettings {
            aws_region: None,
            ..settings
        };
        assert_eq!(select_translator(&settings).name(), "mock");
    }
}
