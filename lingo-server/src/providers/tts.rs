//! Speech synthesis providers
//!
//! All providers return MP3 audio. The mock returns a short marker
//! payload instead of real audio.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use base64::Engine;
use lingo_common::Language;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::Mutex;
use tracing::{debug, warn};

use super::{http_client, ProviderError};
use crate::api::ui::escape_html;

const AZURE_TIMEOUT: Duration = Duration::from_secs(15);

/// Azure tokens are valid for 10 minutes; refresh a minute early
const AZURE_TOKEN_TTL: Duration = Duration::from_secs(540);

/// Voice list is refreshed at most this often
const AZURE_VOICE_CACHE_TTL: Duration = Duration::from_secs(600);

const AZURE_OUTPUT_FORMAT: &str = "audio-24khz-48kbitrate-mono-mp3";

const GOOGLE_TTS_URL: &str = "https://texttospeech.googleapis.com/v1/text:synthesize";
const GOOGLE_TIMEOUT: Duration = Duration::from_secs(15);

/// Converts text into spoken audio
#[async_trait]
pub trait SpeechSynthesizer: Send + Sync {
    /// Short provider name stored alongside each sentence
    fn name(&self) -> &'static str;

    /// Synthesize `text` spoken in `language`, returning MP3 bytes
    async fn synthesize(&self, text: &str, language: Language) -> Result<Vec<u8>, ProviderError>;

    /// Name of the voice used for `language`
    fn voice_label(&self, language: Language) -> String;
}

fn cleaned(text: &str) -> Result<&str, ProviderError> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Err(ProviderError::InvalidInput(
            "Text for audio generation must not be empty".to_string(),
        ));
    }
    Ok(trimmed)
}

/// Deterministic stand-in returning `MOCK::{lang}::{text}` as bytes
#[derive(Debug, Clone, Copy, Default)]
pub struct MockSynthesizer;

#[async_trait]
impl SpeechSynthesizer for MockSynthesizer {
    fn name(&self) -> &'static str {
        "mock"
    }

    async fn synthesize(&self, text: &str, language: Language) -> Result<Vec<u8>, ProviderError> {
        let text = cleaned(text)?;
        Ok(format!("MOCK::{}::{}", language.code(), text).into_bytes())
    }

    fn voice_label(&self, _language: Language) -> String {
        "mock".to_string()
    }
}

/// Azure Cognitive Services text-to-speech
pub struct AzureSynthesizer {
    http_client: reqwest::Client,
    key: String,
    region: String,
    voice_overrides: HashMap<Language, String>,
    /// Bearer token and the instant it stops being used
    token: Mutex<Option<(String, Instant)>>,
}

impl AzureSynthesizer {
    /// Create a synthesizer; key and region are both required
    pub fn new(
        key: String,
        region: String,
        voice_overrides: HashMap<Language, String>,
    ) -> Result<Self, ProviderError> {
        if key.trim().is_empty() || region.trim().is_empty() {
            return Err(ProviderError::Config(
                "Azure Speech requires both a key and a region".to_string(),
            ));
        }
        Ok(Self {
            http_client: http_client(AZURE_TIMEOUT)?,
            key,
            region,
            voice_overrides,
            token: Mutex::new(None),
        })
    }

    /// Built-in neural voice per language
    pub fn default_voice(language: Language) -> &'static str {
        match language {
            Language::Pl => "pl-PL-AgnieszkaNeural",
            Language::En => "en-GB-MiaNeural",
            Language::De => "de-DE-MajaNeural",
        }
    }

    /// Voice name and `xml:lang` tag for `language`
    ///
    /// The tag comes from the first two dash-separated segments of the
    /// voice name (`en-GB-MiaNeural` → `en-GB`).
    pub fn voice_for(&self, language: Language) -> (String, String) {
        let voice = self
            .voice_overrides
            .get(&language)
            .cloned()
            .unwrap_or_else(|| Self::default_voice(language).to_string());

        let segments: Vec<&str> = voice.split('-').collect();
        let lang_tag = if segments.len() >= 2 {
            format!("{}-{}", segments[0], segments[1])
        } else {
            language.bcp47().to_string()
        };
        (voice, lang_tag)
    }

    /// Build the SSML document for one utterance
    pub fn ssml(&self, text: &str, language: Language) -> String {
        let (voice, lang) = self.voice_for(language);
        format!(
            "<speak version='1.0' xml:lang='{lang}'><voice xml:lang='{lang}' name='{voice}'>{text}</voice></speak>",
            lang = lang,
            voice = voice,
            text = escape_html(text)
        )
    }

    async fn ensure_token(&self) -> Result<String, ProviderError> {
        let mut guard = self.token.lock().await;
        if let Some((token, expires)) = guard.as_ref() {
            if Instant::now() < *expires {
                return Ok(token.clone());
            }
        }

        let url = format!(
            "https://{}.api.cognitive.microsoft.com/sts/v1.0/issueToken",
            self.region
        );
        let response = self
            .http_client
            .post(url)
            .header("Ocp-Apim-Subscription-Key", &self.key)
            .header(reqwest::header::CONTENT_LENGTH, "0")
            .send()
            .await
            .map_err(|e| ProviderError::Network(format!("Azure token request failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(ProviderError::Api(format!(
                "Azure token endpoint returned HTTP {}",
                response.status()
            )));
        }

        let token = response
            .text()
            .await
            .map_err(|e| ProviderError::Network(format!("Failed to read Azure token: {}", e)))?;

        *guard = Some((token.clone(), Instant::now() + AZURE_TOKEN_TTL));
        Ok(token)
    }
}

#[async_trait]
impl SpeechSynthesizer for AzureSynthesizer {
    fn name(&self) -> &'static str {
        "azure"
    }

    async fn synthesize(&self, text: &str, language: Language) -> Result<Vec<u8>, ProviderError> {
        let text = cleaned(text)?;
        let token = self.ensure_token().await?;
        let url = format!(
            "https://{}.tts.speech.microsoft.com/cognitiveservices/v1",
            self.region
        );

        debug!("Azure TTS synthesize ({})", language);
        let response = self
            .http_client
            .post(url)
            .bearer_auth(token)
            .header(reqwest::header::CONTENT_TYPE, "application/ssml+xml")
            .header("X-Microsoft-OutputFormat", AZURE_OUTPUT_FORMAT)
            .body(self.ssml(text, language))
            .send()
            .await
            .map_err(|e| ProviderError::Network(format!("Azure TTS request failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(ProviderError::Api(format!(
                "Azure TTS returned HTTP {}",
                response.status()
            )));
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| ProviderError::Network(format!("Failed to read Azure audio: {}", e)))?;
        Ok(bytes.to_vec())
    }

    fn voice_label(&self, language: Language) -> String {
        self.voice_for(language).0
    }
}

/// Google Cloud text-to-speech over REST with an API key
pub struct GoogleSynthesizer {
    http_client: reqwest::Client,
    api_key: String,
    voice_overrides: HashMap<Language, String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GoogleSynthesizeRequest<'a> {
    input: GoogleInput<'a>,
    voice: GoogleVoice<'a>,
    audio_config: GoogleAudioConfig,
}

#[derive(Debug, Serialize)]
struct GoogleInput<'a> {
    text: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GoogleVoice<'a> {
    language_code: &'a str,
    name: &'a str,
    ssml_gender: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GoogleAudioConfig {
    audio_encoding: &'static str,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GoogleSynthesizeResponse {
    audio_content: String,
}

impl GoogleSynthesizer {
    pub fn new(
        api_key: String,
        voice_overrides: HashMap<Language, String>,
    ) -> Result<Self, ProviderError> {
        if api_key.trim().is_empty() {
            return Err(ProviderError::Config(
                "Missing Google TTS API key".to_string(),
            ));
        }
        Ok(Self {
            http_client: http_client(GOOGLE_TIMEOUT)?,
            api_key,
            voice_overrides,
        })
    }

    /// Built-in WaveNet voice per language
    pub fn default_voice(language: Language) -> &'static str {
        match language {
            Language::Pl => "pl-PL-Wavenet-E",
            Language::En => "en-US-Wavenet-D",
            Language::De => "de-DE-Wavenet-B",
        }
    }

    fn voice_name(&self, language: Language) -> String {
        self.voice_overrides
            .get(&language)
            .cloned()
            .unwrap_or_else(|| Self::default_voice(language).to_string())
    }
}

#[async_trait]
impl SpeechSynthesizer for GoogleSynthesizer {
    fn name(&self) -> &'static str {
        "google"
    }

    async fn synthesize(&self, text: &str, language: Language) -> Result<Vec<u8>, ProviderError> {
        let text = cleaned(text)?;
        let voice = self.voice_name(language);
        let request = GoogleSynthesizeRequest {
            input: GoogleInput { text },
            voice: GoogleVoice {
                language_code: language.bcp47(),
                name: &voice,
                ssml_gender: "NEUTRAL",
            },
            audio_config: GoogleAudioConfig {
                audio_encoding: "MP3",
            },
        };

        let response = self
            .http_client
            .post(GOOGLE_TTS_URL)
            .query(&[("key", self.api_key.as_str())])
            .json(&request)
            .send()
            .await
            .map_err(|e| ProviderError::Network(format!("Google TTS request failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(ProviderError::Api(format!(
                "Google TTS returned HTTP {}",
                response.status()
            )));
        }

        let body: GoogleSynthesizeResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::Api(format!("Failed to parse Google TTS response: {}", e)))?;

        base64::engine::general_purpose::STANDARD
            .decode(body.audio_content)
            .map_err(|e| ProviderError::Api(format!("Invalid base64 audio from Google TTS: {}", e)))
    }

    fn voice_label(&self, language: Language) -> String {
        self.voice_name(language)
    }
}

/// Cloud synthesizer that falls back to [`MockSynthesizer`] on failure
pub struct FallbackSynthesizer {
    primary: Arc<dyn SpeechSynthesizer>,
    fallback: MockSynthesizer,
}

impl FallbackSynthesizer {
    pub fn new(primary: Arc<dyn SpeechSynthesizer>) -> Self {
        Self {
            primary,
            fallback: MockSynthesizer,
        }
    }
}

#[async_trait]
impl SpeechSynthesizer for FallbackSynthesizer {
    fn name(&self) -> &'static str {
        self.primary.name()
    }

    async fn synthesize(&self, text: &str, language: Language) -> Result<Vec<u8>, ProviderError> {
        match self.primary.synthesize(text, language).await {
            Ok(audio) => Ok(audio),
            Err(ProviderError::InvalidInput(msg)) => Err(ProviderError::InvalidInput(msg)),
            Err(e) => {
                warn!(
                    "Primary TTS '{}' failed ({}), falling back to mock audio",
                    self.primary.name(),
                    e
                );
                self.fallback.synthesize(text, language).await
            }
        }
    }

    fn voice_label(&self, language: Language) -> String {
        self.primary.voice_label(language)
    }
}

/// One entry of the Azure voice list
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct AzureVoice {
    pub short_name: String,
    #[serde(default)]
    pub display_name: String,
    #[serde(default)]
    pub locale: String,
    #[serde(default)]
    pub gender: String,
}

/// Cached listing of the voices available in an Azure region
pub struct AzureVoiceCatalog {
    http_client: reqwest::Client,
    key: String,
    region: String,
    cache: Mutex<Option<(Vec<AzureVoice>, Instant)>>,
}

impl AzureVoiceCatalog {
    pub fn new(key: String, region: String) -> Result<Self, ProviderError> {
        Ok(Self {
            http_client: http_client(Duration::from_secs(10))?,
            key,
            region,
            cache: Mutex::new(None),
        })
    }

    /// All voices in the region; an empty list when the listing fails
    pub async fn list(&self) -> Vec<AzureVoice> {
        let mut guard = self.cache.lock().await;
        if let Some((voices, fetched)) = guard.as_ref() {
            if fetched.elapsed() < AZURE_VOICE_CACHE_TTL {
                return voices.clone();
            }
        }

        match self.fetch().await {
            Ok(voices) => {
                *guard = Some((voices.clone(), Instant::now()));
                voices
            }
            Err(e) => {
                warn!("Failed to fetch Azure voice list: {}", e);
                Vec::new()
            }
        }
    }

    async fn fetch(&self) -> Result<Vec<AzureVoice>, ProviderError> {
        let url = format!(
            "https://{}.tts.speech.microsoft.com/cognitiveservices/voices/list",
            self.region
        );
        let response = self
            .http_client
            .get(url)
            .header("Ocp-Apim-Subscription-Key", &self.key)
            .send()
            .await
            .map_err(|e| ProviderError::Network(e.to_string()))?;

        if !response.status().is_success() {
            return Err(ProviderError::Api(format!("HTTP {}", response.status())));
        }

        let raw: Vec<Value> = response
            .json()
            .await
            .map_err(|e| ProviderError::Api(e.to_string()))?;

        // Skip entries that do not carry a ShortName
        Ok(raw
            .into_iter()
            .filter_map(|v| serde_json::from_value(v).ok())
            .collect())
    }
}

/// Group voices by supported language, sorted by display name
pub fn group_voices_by_language(voices: &[AzureVoice]) -> Vec<(Language, Vec<AzureVoice>)> {
    Language::ALL
        .iter()
        .map(|lang| {
            let mut matching: Vec<AzureVoice> = voices
                .iter()
                .filter(|v| v.locale.to_lowercase().starts_with(lang.code()))
                .cloned()
                .collect();
            matching.sort_by_key(|v| v.display_name.to_lowercase());
            (*lang, matching)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FailingSynthesizer;

    #[async_trait]
    impl SpeechSynthesizer for FailingSynthesizer {
        fn name(&self) -> &'static str {
            "failing"
        }

        async fn synthesize(&self, _text: &str, _language: Language) -> Result<Vec<u8>, ProviderError> {
            Err(ProviderError::Api("HTTP 503".to_string()))
        }

        fn voice_label(&self, _language: Language) -> String {
            "failing-voice".to_string()
        }
    }

    #[tokio::test]
    async fn test_mock_synthesizer_payload() {
        let audio = MockSynthesizer.synthesize(" Hallo ", Language::De).await.unwrap();
        assert_eq!(audio, b"MOCK::de::Hallo".to_vec());
        assert_eq!(MockSynthesizer.voice_label(Language::De), "mock");
    }

    #[tokio::test]
    async fn test_mock_synthesizer_rejects_empty_text() {
        let result = MockSynthesizer.synthesize("  ", Language::Pl).await;
        assert!(matches!(result, Err(ProviderError::InvalidInput(_))));
    }

    #[tokio::test]
    async fn test_fallback_synthesizer_uses_mock_audio() {
        let tts = FallbackSynthesizer::new(Arc::new(FailingSynthesizer));
        let audio = tts.synthesize("Hello", Language::En).await.unwrap();
        assert_eq!(audio, b"MOCK::en::Hello".to_vec());
        assert_eq!(tts.voice_label(Language::En), "failing-voice");
    }

    #[test]
    fn test_azure_voice_selection() {
        let mut overrides = HashMap::new();
        overrides.insert(Language::En, "en-US-AriaNeural".to_string());
        let azure = AzureSynthesizer::new("key".into(), "westeurope".into(), overrides).unwrap();

        assert_eq!(
            azure.voice_for(Language::En),
            ("en-US-AriaNeural".to_string(), "en-US".to_string())
        );
        assert_eq!(
            azure.voice_for(Language::Pl),
            ("pl-PL-AgnieszkaNeural".to_string(), "pl-PL".to_string())
        );
        assert_eq!(azure.voice_label(Language::De), "de-DE-MajaNeural");
    }

    #[test]
    fn test_azure_voice_without_dashes_uses_language_tag() {
        let mut overrides = HashMap::new();
        overrides.insert(Language::De, "Katja".to_string());
        let azure = AzureSynthesizer::new("key".into(), "westeurope".into(), overrides).unwrap();
        assert_eq!(azure.voice_for(Language::De).1, "de-DE");
    }

    #[test]
    fn test_azure_ssml_escapes_text() {
        let azure = AzureSynthesizer::new("key".into(), "westeurope".into(), HashMap::new()).unwrap();
        let ssml = azure.ssml("Tom & <Jerry>", Language::En);
        assert!(ssml.contains("Tom &amp; &lt;Jerry&gt;"));
        assert!(ssml.contains("name='en-GB-MiaNeural'"));
        assert!(ssml.contains("xml:lang='en-GB'"));
    }

    #[test]
    fn test_azure_requires_key_and_region() {
        assert!(AzureSynthesizer::new("key".into(), "".into(), HashMap::new()).is_err());
        assert!(AzureSynthesizer::new("".into(), "westeurope".into(), HashMap::new()).is_err());
    }

    #[test]
    fn test_group_voices_by_language() {
        let voice = |name: &str, display: &str, locale: &str| AzureVoice {
            short_name: name.to_string(),
            display_name: display.to_string(),
            locale: locale.to_string(),
            gender: String::new(),
        };
        let voices = vec![
            voice("pl-PL-ZofiaNeural", "Zofia", "pl-PL"),
            voice("pl-PL-AgnieszkaNeural", "Agnieszka", "pl-PL"),
            voice("fr-FR-DeniseNeural", "Denise", "fr-FR"),
            voice("de-DE-KatjaNeural", "Katja", "de-DE"),
        ];

        let grouped = group_voices_by_language(&voices);

        assert_eq!(grouped.len(), 3);
        let (lang, polish) = &grouped[0];
        assert_eq!(*lang, Language::Pl);
        assert_eq!(polish.len(), 2);
        assert_eq!(polish[0].display_name, "Agnieszka");
        assert!(grouped[1].1.is_empty(), "no English voices in fixture");
        assert_eq!(grouped[2].1.len(), 1);
    }
}
