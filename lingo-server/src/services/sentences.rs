//! Sentence creation, listing, lookup and deletion
//!
//! Creation runs one sequential chain per request: translate into both
//! target languages, synthesize three recordings, insert the row, upload
//! the recordings under the row's id, then store their URLs. No database
//! write is open while a provider or the storage backend is called. A
//! failed upload removes the recordings already stored and the row.

use std::sync::Arc;

use lingo_common::db::Sentence;
use lingo_common::lang::{target_languages, validate_language_selection};
use lingo_common::Language;
use sqlx::SqlitePool;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::db::{sentences, NewSentence, SentenceAudio, SentenceFilter};
use crate::pagination::{Page, PageRequest, Pagination};
use crate::providers::{ProviderError, SpeechSynthesizer, Translator};
use crate::storage::AudioStorage;

const AUDIO_CONTENT_TYPE: &str = "audio/mpeg";

/// Sentence service errors
#[derive(Debug, Error)]
pub enum SentenceError {
    /// Rejected input (empty text, unsupported language)
    #[error("{0}")]
    Validation(String),

    /// Translation, synthesis or upload failed after validation
    #[error("Sentence processing failed: {0}")]
    Processing(String),

    #[error(transparent)]
    Database(lingo_common::Error),
}

impl From<lingo_common::Error> for SentenceError {
    fn from(err: lingo_common::Error) -> Self {
        match err {
            lingo_common::Error::InvalidInput(msg) => SentenceError::Validation(msg),
            other => SentenceError::Database(other),
        }
    }
}

impl From<sqlx::Error> for SentenceError {
    fn from(err: sqlx::Error) -> Self {
        SentenceError::Database(err.into())
    }
}

impl From<ProviderError> for SentenceError {
    fn from(err: ProviderError) -> Self {
        match err {
            ProviderError::InvalidInput(msg) => SentenceError::Validation(msg),
            other => SentenceError::Processing(other.to_string()),
        }
    }
}

/// Orchestrates providers, storage and persistence for sentences
pub struct SentenceService {
    db: SqlitePool,
    translator: Arc<dyn Translator>,
    synthesizer: Arc<dyn SpeechSynthesizer>,
    storage: Arc<dyn AudioStorage>,
    key_prefix: String,
}

impl SentenceService {
    pub fn new(
        db: SqlitePool,
        translator: Arc<dyn Translator>,
        synthesizer: Arc<dyn SpeechSynthesizer>,
        storage: Arc<dyn AudioStorage>,
        key_prefix: String,
    ) -> Self {
        Self {
            db,
            translator,
            synthesizer,
            storage,
            key_prefix,
        }
    }

    pub fn translation_provider(&self) -> &'static str {
        self.translator.name()
    }

    pub fn tts_provider(&self) -> &'static str {
        self.synthesizer.name()
    }

    pub fn storage_backend(&self) -> &'static str {
        self.storage.name()
    }

    /// Storage key of one recording
    pub fn audio_key(&self, student_id: i64, sentence_id: i64, language: &str) -> String {
        format!(
            "{}/{}/{}/{}.mp3",
            self.key_prefix, student_id, sentence_id, language
        )
    }

    /// Create a sentence with both translations and all three recordings
    pub async fn create(
        &self,
        student_id: i64,
        text: &str,
        language: &str,
    ) -> Result<Sentence, SentenceError> {
        let text = text.trim();
        if text.is_empty() {
            return Err(SentenceError::Validation(
                "Sentence text must not be empty".to_string(),
            ));
        }

        let source = Language::parse(language)?;
        let (target_1, target_2) = target_languages(source);
        validate_language_selection(source, target_1, target_2)?;

        let translated_1 = self.translator.translate(text, source, target_1).await?;
        let translated_2 = self.translator.translate(text, source, target_2).await?;

        let new = NewSentence {
            student_id,
            source_language: source,
            source_text: text.to_string(),
            target_language_1: target_1,
            target_language_2: target_2,
            translated_text_1: translated_1.clone(),
            translated_text_2: translated_2.clone(),
            translation_provider: self.translator.name().to_string(),
            tts_provider: self.synthesizer.name().to_string(),
            tts_voice_source: self.synthesizer.voice_label(source),
            tts_voice_1: self.synthesizer.voice_label(target_1),
            tts_voice_2: self.synthesizer.voice_label(target_2),
        };

        let recordings = [
            (source, self.synthesize(text, source).await?),
            (target_1, self.synthesize(&translated_1, target_1).await?),
            (target_2, self.synthesize(&translated_2, target_2).await?),
        ];

        let sentence_id = sentences::insert(&self.db, &new).await?;

        if let Err(e) = self.attach_recordings(student_id, sentence_id, recordings).await {
            match sentences::delete_owned(&self.db, sentence_id, student_id).await {
                Ok(_) => debug!("Removed sentence {} after failed upload", sentence_id),
                Err(cleanup_err) => warn!(
                    "Failed to remove sentence {} after failed upload: {}",
                    sentence_id, cleanup_err
                ),
            }
            return Err(e);
        }

        let created = sentences::find_owned(&self.db, sentence_id, student_id)
            .await?
            .ok_or_else(|| {
                SentenceError::Processing(format!("Sentence {} vanished after insert", sentence_id))
            })?;

        info!(
            "Created sentence {} for student {} ({} -> {}, {})",
            sentence_id, student_id, source, target_1, target_2
        );
        Ok(created)
    }

    async fn synthesize(&self, text: &str, language: Language) -> Result<Vec<u8>, SentenceError> {
        let audio = self.synthesizer.synthesize(text, language).await?;
        debug!("Synthesized {} bytes of {} audio", audio.len(), language);
        Ok(audio)
    }

    /// Upload each recording in order and store the URLs on the row
    ///
    /// On failure the recordings uploaded so far are removed again.
    async fn attach_recordings(
        &self,
        student_id: i64,
        sentence_id: i64,
        recordings: [(Language, Vec<u8>); 3],
    ) -> Result<(), SentenceError> {
        let mut uploaded: Vec<(String, String)> = Vec::with_capacity(3);

        for (language, audio) in recordings {
            let key = self.audio_key(student_id, sentence_id, language.code());
            match self.storage.upload_audio(&key, audio, AUDIO_CONTENT_TYPE).await {
                Ok(url) => uploaded.push((key, url)),
                Err(e) => {
                    self.remove_uploaded(&uploaded).await;
                    return Err(SentenceError::Processing(e.to_string()));
                }
            }
        }

        let audio = match uploaded.as_slice() {
            [(_, source), (_, target_1), (_, target_2)] => SentenceAudio {
                source: source.clone(),
                target_1: target_1.clone(),
                target_2: target_2.clone(),
            },
            _ => {
                self.remove_uploaded(&uploaded).await;
                return Err(SentenceError::Processing(
                    "Expected three recordings".to_string(),
                ));
            }
        };

        if let Err(e) = sentences::set_audio(&self.db, sentence_id, &audio).await {
            self.remove_uploaded(&uploaded).await;
            return Err(e.into());
        }
        Ok(())
    }

    async fn remove_uploaded(&self, uploaded: &[(String, String)]) {
        for (key, _) in uploaded {
            if let Err(e) = self.storage.delete_audio(key).await {
                warn!("Failed to remove orphaned audio {}: {}", key, e);
            }
        }
    }

    /// One page of a student's sentences
    ///
    /// An unsupported language filter is ignored rather than rejected.
    pub async fn list(
        &self,
        student_id: i64,
        source_language: Option<&str>,
        search: Option<&str>,
        request: PageRequest,
    ) -> Result<Page<Sentence>, SentenceError> {
        let filter = SentenceFilter {
            source_language: source_language.and_then(|code| Language::parse(code).ok()),
            search: search
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string),
        };

        let total = sentences::count_owned(&self.db, student_id, &filter).await?;
        let items = sentences::list_owned(
            &self.db,
            student_id,
            &filter,
            request.per_page,
            request.offset(),
        )
        .await?;

        Ok(Page {
            items,
            pagination: Pagination::new(request, total),
        })
    }

    /// A single sentence, if it exists and belongs to `student_id`
    pub async fn get(&self, student_id: i64, id: i64) -> Result<Option<Sentence>, SentenceError> {
        Ok(sentences::find_owned(&self.db, id, student_id).await?)
    }

    /// Delete a sentence and its recordings
    ///
    /// Returns false when the sentence does not exist or belongs to another
    /// student. Storage failures are logged and do not stop the row delete.
    pub async fn delete(&self, student_id: i64, id: i64) -> Result<bool, SentenceError> {
        let Some(sentence) = sentences::find_owned(&self.db, id, student_id).await? else {
            return Ok(false);
        };

        for language in sentence.audio_languages() {
            let key = self.audio_key(student_id, sentence.id, language);
            if let Err(e) = self.storage.delete_audio(&key).await {
                warn!("Failed to delete audio {}: {}", key, e);
            }
        }

        let deleted = sentences::delete_owned(&self.db, id, student_id).await?;
        if deleted {
            info!("Deleted sentence {} of student {}", id, student_id);
        }
        Ok(deleted)
    }
}
