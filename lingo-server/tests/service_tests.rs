//! Sentence service tests
//!
//! Exercise the create/list/get/delete chain against an in-memory database
//! with local or failing storage backends, plus a file database shared with
//! other writers.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use lingo_common::db::{init_database, init_memory_database};
use lingo_common::Language;
use lingo_server::db::students;
use lingo_server::pagination::PageRequest;
use lingo_server::providers::{
    FallbackSynthesizer, FallbackTranslator, MockSynthesizer, MockTranslator, ProviderError,
    SpeechSynthesizer, Translator,
};
use lingo_server::services::{SentenceError, SentenceService};
use lingo_server::storage::{AudioStorage, LocalStorage, StorageError, LOCAL_PUBLIC_PREFIX};
use sqlx::SqlitePool;
use tokio::sync::Mutex;

/// Storage that accepts a fixed number of uploads and then fails
struct FlakyStorage {
    allowed: usize,
    uploads: AtomicUsize,
    deleted: Mutex<Vec<String>>,
}

impl FlakyStorage {
    fn new(allowed: usize) -> Self {
        Self {
            allowed,
            uploads: AtomicUsize::new(0),
            deleted: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl AudioStorage for FlakyStorage {
    fn name(&self) -> &'static str {
        "flaky"
    }

    async fn upload_audio(
        &self,
        key: &str,
        _data: Vec<u8>,
        _content_type: &str,
    ) -> Result<String, StorageError> {
        if self.uploads.fetch_add(1, Ordering::SeqCst) >= self.allowed {
            return Err(StorageError::Io(std::io::Error::new(
                std::io::ErrorKind::Other,
                "disk full",
            )));
        }
        Ok(format!("https://cdn.example/{}", key))
    }

    async fn delete_audio(&self, key: &str) -> Result<(), StorageError> {
        self.deleted.lock().await.push(key.to_string());
        Ok(())
    }
}

struct DownTranslator;

#[async_trait]
impl Translator for DownTranslator {
    fn name(&self) -> &'static str {
        "down"
    }

    async fn translate(
        &self,
        _text: &str,
        _source: Language,
        _target: Language,
    ) -> Result<String, ProviderError> {
        Err(ProviderError::Api("HTTP 503".to_string()))
    }
}

struct DownSynthesizer;

#[async_trait]
impl SpeechSynthesizer for DownSynthesizer {
    fn name(&self) -> &'static str {
        "down"
    }

    async fn synthesize(&self, _text: &str, _language: Language) -> Result<Vec<u8>, ProviderError> {
        Err(ProviderError::Network("timeout".to_string()))
    }

    fn voice_label(&self, language: Language) -> String {
        format!("{}-Voice", language.bcp47())
    }
}

async fn setup_pool() -> (SqlitePool, i64) {
    let pool = init_memory_database().await.unwrap();
    let student = students::create(&pool, "anna", "hash").await.unwrap();
    (pool, student)
}

fn mock_service(pool: &SqlitePool, storage: Arc<dyn AudioStorage>) -> SentenceService {
    SentenceService::new(
        pool.clone(),
        Arc::new(MockTranslator),
        Arc::new(MockSynthesizer),
        storage,
        "sentence-trainer".to_string(),
    )
}

#[tokio::test]
async fn test_create_stores_translations_and_audio() {
    let (pool, student) = setup_pool().await;
    let dir = tempfile::tempdir().unwrap();
    let storage = Arc::new(LocalStorage::new(dir.path(), LOCAL_PUBLIC_PREFIX).unwrap());
    let service = mock_service(&pool, storage);

    let sentence = service.create(student, "Guten Tag", " DE ").await.unwrap();

    assert_eq!(sentence.source_language, "de");
    assert_eq!(sentence.target_language_1, "pl");
    assert_eq!(sentence.target_language_2, "en");
    assert_eq!(sentence.translated_text_1.as_deref(), Some("Guten Tag ⇒ PL"));
    assert_eq!(sentence.translated_text_2.as_deref(), Some("Guten Tag ⇒ EN"));
    assert_eq!(sentence.tts_voice_source.as_deref(), Some("mock"));
    assert_eq!(
        sentence.audio_url_1.as_deref(),
        Some(format!("/static/audio/sentence-trainer/{}/{}/pl.mp3", student, sentence.id).as_str())
    );

    let folder = dir
        .path()
        .join(format!("sentence-trainer/{}/{}", student, sentence.id));
    assert_eq!(std::fs::read(folder.join("de.mp3")).unwrap(), b"MOCK::de::Guten Tag");
    assert!(folder.join("pl.mp3").exists());
    assert!(folder.join("en.mp3").exists());
}

#[tokio::test]
async fn test_create_rejects_invalid_input() {
    let (pool, student) = setup_pool().await;
    let storage = Arc::new(FlakyStorage::new(usize::MAX));
    let service = mock_service(&pool, storage.clone());

    let err = service.create(student, "  \n ", "pl").await.unwrap_err();
    assert!(matches!(err, SentenceError::Validation(_)));

    let err = service.create(student, "Bonjour", "fr").await.unwrap_err();
    assert!(matches!(err, SentenceError::Validation(_)));

    assert_eq!(storage.uploads.load(Ordering::SeqCst), 0);
    let page = service.list(student, None, None, PageRequest::default()).await.unwrap();
    assert_eq!(page.pagination.total, 0);
}

#[tokio::test]
async fn test_failed_upload_rolls_back_row_and_cleans_up() {
    let (pool, student) = setup_pool().await;
    // Source and first translation upload, the second translation fails
    let storage = Arc::new(FlakyStorage::new(2));
    let service = mock_service(&pool, storage.clone());

    let err = service.create(student, "Ala ma kota", "pl").await.unwrap_err();
    assert!(matches!(err, SentenceError::Processing(_)));

    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM sentences")
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(count, 0);

    let deleted = storage.deleted.lock().await.clone();
    assert_eq!(deleted.len(), 2);
    assert!(deleted[0].ends_with("/pl.mp3"));
    assert!(deleted[1].ends_with("/en.mp3"));
}

#[tokio::test]
async fn test_provider_outage_falls_back_to_mock_output() {
    let (pool, student) = setup_pool().await;
    let service = SentenceService::new(
        pool.clone(),
        Arc::new(FallbackTranslator::new(Arc::new(DownTranslator))),
        Arc::new(FallbackSynthesizer::new(Arc::new(DownSynthesizer))),
        Arc::new(FlakyStorage::new(usize::MAX)),
        "p".to_string(),
    );

    let sentence = service.create(student, "Hello", "en").await.unwrap();

    assert_eq!(sentence.translated_text_1.as_deref(), Some("Hello ⇒ PL"));
    // Provider names and voices of the configured primary are recorded
    assert_eq!(sentence.translation_provider.as_deref(), Some("down"));
    assert_eq!(sentence.tts_provider.as_deref(), Some("down"));
    assert_eq!(sentence.tts_voice_source.as_deref(), Some("en-US-Voice"));
    assert_eq!(
        sentence.audio_url_source.as_deref(),
        Some(format!("https://cdn.example/p/{}/{}/en.mp3", student, sentence.id).as_str())
    );
}

#[tokio::test]
async fn test_delete_removes_row_and_audio() {
    let (pool, student) = setup_pool().await;
    let dir = tempfile::tempdir().unwrap();
    let storage = Arc::new(LocalStorage::new(dir.path(), LOCAL_PUBLIC_PREFIX).unwrap());
    let service = mock_service(&pool, storage);

    let sentence = service.create(student, "Dzień dobry", "pl").await.unwrap();
    let folder = dir
        .path()
        .join(format!("sentence-trainer/{}/{}", student, sentence.id));
    assert!(folder.join("pl.mp3").exists());

    assert!(service.delete(student, sentence.id).await.unwrap());
    assert!(service.get(student, sentence.id).await.unwrap().is_none());
    for lang in ["pl", "en", "de"] {
        assert!(!folder.join(format!("{}.mp3", lang)).exists());
    }

    // Second delete finds nothing
    assert!(!service.delete(student, sentence.id).await.unwrap());
}

#[tokio::test]
async fn test_delete_ignores_storage_errors() {
    struct BrokenDelete;

    #[async_trait]
    impl AudioStorage for BrokenDelete {
        fn name(&self) -> &'static str {
            "broken"
        }

        async fn upload_audio(
            &self,
            key: &str,
            _data: Vec<u8>,
            _content_type: &str,
        ) -> Result<String, StorageError> {
            Ok(format!("/audio/{}", key))
        }

        async fn delete_audio(&self, key: &str) -> Result<(), StorageError> {
            Err(StorageError::InvalidKey(key.to_string()))
        }
    }

    let (pool, student) = setup_pool().await;
    let service = mock_service(&pool, Arc::new(BrokenDelete));

    let sentence = service.create(student, "Hallo", "de").await.unwrap();
    assert!(service.delete(student, sentence.id).await.unwrap());
    assert!(service.get(student, sentence.id).await.unwrap().is_none());
}

#[tokio::test]
async fn test_list_filters_and_isolates_students() {
    let (pool, anna) = setup_pool().await;
    let bob = students::create(&pool, "bob", "hash").await.unwrap();
    let service = mock_service(&pool, Arc::new(FlakyStorage::new(usize::MAX)));

    service.create(anna, "Ala ma kota", "pl").await.unwrap();
    service.create(anna, "A cat", "en").await.unwrap();
    let bobs = service.create(bob, "Bob ma psa", "pl").await.unwrap();

    let polish = service
        .list(anna, Some("pl"), None, PageRequest::default())
        .await
        .unwrap();
    assert_eq!(polish.pagination.total, 1);
    assert!(polish.items.iter().all(|s| s.source_language == "pl"));

    let unknown = service
        .list(anna, Some("klingon"), None, PageRequest::default())
        .await
        .unwrap();
    assert_eq!(unknown.pagination.total, 2);

    let search = service
        .list(anna, None, Some("  psa "), PageRequest::default())
        .await
        .unwrap();
    assert_eq!(search.pagination.total, 0);

    assert!(service.get(anna, bobs.id).await.unwrap().is_none());
    assert!(!service.delete(anna, bobs.id).await.unwrap());
    assert!(service.get(bob, bobs.id).await.unwrap().is_some());
}

#[tokio::test]
async fn test_search_matches_non_ascii_capitals() {
    let (pool, student) = setup_pool().await;
    let service = mock_service(&pool, Arc::new(FlakyStorage::new(usize::MAX)));

    service.create(student, "Żółw śpi", "pl").await.unwrap();
    service.create(student, "Kot je", "pl").await.unwrap();

    for term in ["żółw", "Żółw", "ŻÓŁW", "ŚPI"] {
        let page = service
            .list(student, None, Some(term), PageRequest::default())
            .await
            .unwrap();
        assert_eq!(page.pagination.total, 1, "search term {}", term);
        assert_eq!(page.items[0].source_text, "Żółw śpi");
    }

    // Translations are searchable too
    let page = service
        .list(student, None, Some("ŻÓŁW ŚPI ⇒ de"), PageRequest::default())
        .await
        .unwrap();
    assert_eq!(page.pagination.total, 1);
}

/// Registers a student on the shared database each time it is called
struct SideWriter {
    pool: SqlitePool,
    writes: AtomicUsize,
}

impl SideWriter {
    async fn write(&self) {
        let n = self.writes.load(Ordering::SeqCst);
        let username = format!("writer{}", n);
        let result = tokio::time::timeout(
            Duration::from_secs(2),
            students::create(&self.pool, &username, "hash"),
        )
        .await;
        if matches!(result, Ok(Ok(_))) {
            self.writes.fetch_add(1, Ordering::SeqCst);
        }
    }
}

struct WritingSynthesizer(Arc<SideWriter>);

#[async_trait]
impl SpeechSynthesizer for WritingSynthesizer {
    fn name(&self) -> &'static str {
        "writing"
    }

    async fn synthesize(&self, text: &str, language: Language) -> Result<Vec<u8>, ProviderError> {
        self.0.write().await;
        MockSynthesizer.synthesize(text, language).await
    }

    fn voice_label(&self, _language: Language) -> String {
        "writing".to_string()
    }
}

struct WritingStorage(Arc<SideWriter>);

#[async_trait]
impl AudioStorage for WritingStorage {
    fn name(&self) -> &'static str {
        "writing"
    }

    async fn upload_audio(
        &self,
        key: &str,
        _data: Vec<u8>,
        _content_type: &str,
    ) -> Result<String, StorageError> {
        self.0.write().await;
        Ok(format!("/audio/{}", key))
    }

    async fn delete_audio(&self, _key: &str) -> Result<(), StorageError> {
        Ok(())
    }
}

#[tokio::test]
async fn test_other_writers_proceed_during_create() {
    let dir = tempfile::tempdir().unwrap();
    let url = format!("sqlite://{}", dir.path().join("lingo.db").display());
    let pool = init_database(&url).await.unwrap();
    let student = students::create(&pool, "anna", "hash").await.unwrap();

    let writer = Arc::new(SideWriter {
        pool: pool.clone(),
        writes: AtomicUsize::new(0),
    });
    let service = SentenceService::new(
        pool.clone(),
        Arc::new(MockTranslator),
        Arc::new(WritingSynthesizer(writer.clone())),
        Arc::new(WritingStorage(writer.clone())),
        "p".to_string(),
    );

    let sentence = service.create(student, "Ala ma kota", "pl").await.unwrap();

    // Three syntheses and three uploads, each with its own committed write
    assert_eq!(writer.writes.load(Ordering::SeqCst), 6);
    assert_eq!(
        sentence.audio_url_2.as_deref(),
        Some(format!("/audio/p/{}/{}/de.mp3", student, sentence.id).as_str())
    );

    let registered: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM students")
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(registered, 7);
}
