//! Translation providers
//!
//! - [`MockTranslator`]: deterministic, no network
//! - [`OpenAiTranslator`]: chat-completions endpoint
//! - [`AwsTranslator`]: AWS Translate `TranslateText`
//! - [`FallbackTranslator`]: cloud provider with mock substitution on failure

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use aws_sdk_translate::config::timeout::TimeoutConfig;
use aws_sdk_translate::config::{BehaviorVersion, Credentials, Region};
use aws_sdk_translate::error::DisplayErrorContext;
use lingo_common::Language;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::{http_client, ProviderError};

/// Default OpenAI chat-completions endpoint
const OPENAI_DEFAULT_URL: &str = "https://api.openai.com/v1/chat/completions";

/// Default OpenAI model used for translation
const OPENAI_DEFAULT_MODEL: &str = "gpt-4o-mini";

const OPENAI_TIMEOUT: Duration = Duration::from_secs(15);
const AWS_TIMEOUT: Duration = Duration::from_secs(10);

const SYSTEM_PROMPT: &str = "You are a translator. Return only the translation without any \
     additional commentary. Keep the original punctuation and do not add anything.";

/// Translates text between supported languages
#[async_trait]
pub trait Translator: Send + Sync {
    /// Short provider name stored alongside each sentence
    fn name(&self) -> &'static str;

    /// Translate `text` from `source` into `target`
    async fn translate(
        &self,
        text: &str,
        source: Language,
        target: Language,
    ) -> Result<String, ProviderError>;
}

fn normalized(text: &str) -> Result<&str, ProviderError> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Err(ProviderError::InvalidInput(
            "Sentence text must not be empty".to_string(),
        ));
    }
    Ok(trimmed)
}

/// Deterministic stand-in: appends the target language code
///
/// `"Ala ma kota"` translated to German becomes `"Ala ma kota ⇒ DE"`.
#[derive(Debug, Clone, Copy, Default)]
pub struct MockTranslator;

#[async_trait]
impl Translator for MockTranslator {
    fn name(&self) -> &'static str {
        "mock"
    }

    async fn translate(
        &self,
        text: &str,
        _source: Language,
        target: Language,
    ) -> Result<String, ProviderError> {
        let text = normalized(text)?;
        Ok(format!("{} ⇒ {}", text, target.code().to_uppercase()))
    }
}

/// OpenAI chat-completions translator
pub struct OpenAiTranslator {
    http_client: reqwest::Client,
    api_key: String,
    endpoint: String,
    model: String,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: String,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChatChoiceMessage {
    content: String,
}

impl OpenAiTranslator {
    /// Create a translator; an empty API key is a configuration error
    pub fn new(
        api_key: String,
        endpoint: Option<String>,
        model: Option<String>,
    ) -> Result<Self, ProviderError> {
        if api_key.trim().is_empty() {
            return Err(ProviderError::Config("Missing OpenAI API key".to_string()));
        }
        Ok(Self {
            http_client: http_client(OPENAI_TIMEOUT)?,
            api_key,
            endpoint: endpoint.unwrap_or_else(|| OPENAI_DEFAULT_URL.to_string()),
            model: model.unwrap_or_else(|| OPENAI_DEFAULT_MODEL.to_string()),
        })
    }
}

#[async_trait]
impl Translator for OpenAiTranslator {
    fn name(&self) -> &'static str {
        "openai"
    }

    async fn translate(
        &self,
        text: &str,
        source: Language,
        target: Language,
    ) -> Result<String, ProviderError> {
        let text = normalized(text)?;
        if source == target {
            return Ok(text.to_string());
        }

        let request = ChatRequest {
            model: &self.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: SYSTEM_PROMPT.to_string(),
                },
                ChatMessage {
                    role: "user",
                    content: format!(
                        "Translate the text from {} to {}: {}",
                        source.code(),
                        target.code(),
                        text
                    ),
                },
            ],
            temperature: 0.2,
        };

        debug!("OpenAI translate {} -> {}", source, target);
        let response = self
            .http_client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| ProviderError::Network(format!("OpenAI request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ProviderError::Api(format!(
                "OpenAI returned HTTP {} during translation",
                status
            )));
        }

        let body: ChatResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::Api(format!("Failed to parse OpenAI response: {}", e)))?;

        body.choices
            .into_iter()
            .next()
            .map(|choice| choice.message.content.trim().to_string())
            .filter(|content| !content.is_empty())
            .ok_or_else(|| ProviderError::Api("OpenAI response contained no translation".to_string()))
    }
}

/// AWS Translate client
///
/// Credentials and region come from configuration rather than the ambient
/// AWS profile chain.
pub struct AwsTranslator {
    client: aws_sdk_translate::Client,
}

impl AwsTranslator {
    /// Create a translator; missing credentials or region are configuration errors
    pub fn new(
        access_key_id: String,
        secret_access_key: String,
        session_token: Option<String>,
        region: Option<String>,
    ) -> Result<Self, ProviderError> {
        if access_key_id.trim().is_empty() || secret_access_key.trim().is_empty() {
            return Err(ProviderError::Config("Missing AWS credentials".to_string()));
        }
        let region = region
            .filter(|r| !r.trim().is_empty())
            .ok_or_else(|| ProviderError::Config("Missing AWS Translate region".to_string()))?;

        let credentials = Credentials::new(
            access_key_id,
            secret_access_key,
            session_token.filter(|t| !t.trim().is_empty()),
            None,
            "lingo-config",
        );
        let config = aws_sdk_translate::Config::builder()
            .behavior_version(BehaviorVersion::latest())
            .region(Region::new(region))
            .credentials_provider(credentials)
            .timeout_config(
                TimeoutConfig::builder()
                    .operation_timeout(AWS_TIMEOUT)
                    .build(),
            )
            .build();

        Ok(Self {
            client: aws_sdk_translate::Client::from_conf(config),
        })
    }
}

#[async_trait]
impl Translator for AwsTranslator {
    fn name(&self) -> &'static str {
        "aws"
    }

    async fn translate(
        &self,
        text: &str,
        source: Language,
        target: Language,
    ) -> Result<String, ProviderError> {
        let text = normalized(text)?;
        if source == target {
            return Ok(text.to_string());
        }

        debug!("AWS translate {} -> {}", source, target);
        let output = self
            .client
            .translate_text()
            .text(text)
            .source_language_code(source.code())
            .target_language_code(target.code())
            .send()
            .await
            .map_err(|e| {
                ProviderError::Api(format!(
                    "AWS Translate request failed: {}",
                    DisplayErrorContext(&e)
                ))
            })?;

        let translated = output.translated_text().trim();
        if translated.is_empty() {
            return Ok(text.to_string());
        }
        Ok(translated.to_string())
    }
}

/// Cloud translator that falls back to [`MockTranslator`] on failure
///
/// Input errors are returned as-is; every other provider error is logged
/// and replaced by the mock output.
pub struct FallbackTranslator {
    primary: Arc<dyn Translator>,
    fallback: MockTranslator,
}

impl FallbackTranslator {
    pub fn new(primary: Arc<dyn Translator>) -> Self {
        Self {
            primary,
            fallback: MockTranslator,
        }
    }
}

#[async_trait]
impl Translator for FallbackTranslator {
    fn name(&self) -> &'static str {
        self.primary.name()
    }

    async fn translate(
        &self,
        text: &str,
        source: Language,
        target: Language,
    ) -> Result<String, ProviderError> {
        match self.primary.translate(text, source, target).await {
            Ok(translated) => Ok(translated),
            Err(ProviderError::InvalidInput(msg)) => Err(ProviderError::InvalidInput(msg)),
            Err(e) => {
                warn!(
                    "Primary translator '{}' failed ({}), falling back to mock",
                    self.primary.name(),
                    e
                );
                self.fallback.translate(text, source, target).await
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FailingTranslator;

    #[async_trait]
    impl Translator for FailingTranslator {
        fn name(&self) -> &'static str {
            "failing"
        }

        async fn translate(
            &self,
            _text: &str,
            _source: Language,
            _target: Language,
        ) -> Result<String, ProviderError> {
            Err(ProviderError::Network("connection refused".to_string()))
        }
    }

    #[tokio::test]
    async fn test_mock_translation_is_deterministic() {
        let mock = MockTranslator;
        let first = mock
            .translate("Ala ma kota", Language::Pl, Language::De)
            .await
            .unwrap();
        let second = mock
            .translate("Ala ma kota", Language::Pl, Language::De)
            .await
            .unwrap();

        assert_eq!(first, second);
        assert_eq!(first, "Ala ma kota ⇒ DE");
    }

    #[tokio::test]
    async fn test_mock_trims_input() {
        let out = MockTranslator
            .translate("  Hello  ", Language::En, Language::Pl)
            .await
            .unwrap();
        assert_eq!(out, "Hello ⇒ PL");
    }

    #[tokio::test]
    async fn test_mock_rejects_empty_text() {
        let result = MockTranslator.translate("   ", Language::Pl, Language::En).await;
        assert!(matches!(result, Err(ProviderError::InvalidInput(_))));
    }

    #[tokio::test]
    async fn test_fallback_substitutes_mock_output() {
        let translator = FallbackTranslator::new(Arc::new(FailingTranslator));
        let out = translator
            .translate("Guten Tag", Language::De, Language::En)
            .await
            .unwrap();
        assert_eq!(out, "Guten Tag ⇒ EN");
        assert_eq!(translator.name(), "failing");
    }

    #[tokio::test]
    async fn test_fallback_passes_through_input_errors() {
        let translator = FallbackTranslator::new(Arc::new(MockTranslator));
        let result = translator.translate("", Language::De, Language::En).await;
        assert!(matches!(result, Err(ProviderError::InvalidInput(_))));
    }

    #[test]
    fn test_openai_requires_api_key() {
        assert!(matches!(
            OpenAiTranslator::new("  ".to_string(), None, None),
            Err(ProviderError::Config(_))
        ));
    }

    #[tokio::test]
    async fn test_openai_same_language_skips_network() {
        // Unroutable endpoint: any network attempt would fail the test
        let translator = OpenAiTranslator::new(
            "sk-test".to_string(),
            Some("http://127.0.0.1:9/unreachable".to_string()),
            None,
        )
        .unwrap();
        let out = translator
            .translate(" Dzień dobry ", Language::Pl, Language::Pl)
            .await
            .unwrap();
        assert_eq!(out, "Dzień dobry");
    }

    #[test]
    fn test_aws_requires_credentials_and_region() {
        assert!(matches!(
            AwsTranslator::new(String::new(), "secret".to_string(), None, Some("eu-central-1".to_string())),
            Err(ProviderError::Config(_))
        ));
        assert!(matches!(
            AwsTranslator::new("AKIA".to_string(), "secret".to_string(), None, Some(" ".to_string())),
            Err(ProviderError::Config(_))
        ));
    }

    #[tokio::test]
    async fn test_aws_same_language_skips_network() {
        let translator = AwsTranslator::new(
            "AKIATEST".to_string(),
            "secret".to_string(),
            None,
            Some("eu-central-1".to_string()),
        )
        .unwrap();
        assert_eq!(translator.name(), "aws");
        let out = translator
            .translate(" Guten Tag ", Language::De, Language::De)
            .await
            .unwrap();
        assert_eq!(out, "Guten Tag");
    }
}
