//! Audio file storage
//!
//! Two backends behind one contract: write bytes under a key and get back
//! a URL the browser can fetch, or delete the object at a key. The backend
//! is chosen once at startup.

use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use object_store::aws::AmazonS3Builder;
use object_store::path::Path as ObjectPath;
use object_store::{Attribute, Attributes, ObjectStore, PutOptions, PutPayload};
use thiserror::Error;
use tracing::{debug, info};

/// URL prefix under which the web layer serves locally stored audio
pub const LOCAL_PUBLIC_PREFIX: &str = "/static/audio";

/// Default key prefix for all audio objects
pub const DEFAULT_KEY_PREFIX: &str = "sentence-trainer";

/// Storage errors
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Invalid storage key: {0}")]
    InvalidKey(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Object storage error: {0}")]
    ObjectStore(#[from] object_store::Error),

    #[error("Storage configuration error: {0}")]
    Config(String),
}

/// Persists audio bytes and hands back a public URL
#[async_trait]
pub trait AudioStorage: Send + Sync {
    /// Backend name (`local` or `s3`)
    fn name(&self) -> &'static str;

    /// Store `data` under `key` and return the URL it is reachable at
    async fn upload_audio(
        &self,
        key: &str,
        data: Vec<u8>,
        content_type: &str,
    ) -> Result<String, StorageError>;

    /// Remove the object at `key`; a missing object is not an error
    async fn delete_audio(&self, key: &str) -> Result<(), StorageError>;
}

/// Normalize a key: strip leading slashes, refuse empty keys and any
/// component that could escape the storage root
pub fn sanitize_key(key: &str) -> Result<String, StorageError> {
    let trimmed = key.trim_start_matches('/');
    if trimmed.is_empty() {
        return Err(StorageError::InvalidKey("empty key".to_string()));
    }
    let safe = Path::new(trimmed)
        .components()
        .all(|c| matches!(c, Component::Normal(_)));
    if !safe {
        return Err(StorageError::InvalidKey(key.to_string()));
    }
    Ok(trimmed.to_string())
}

/// Normalize the configured key prefix, falling back to the default
pub fn normalize_prefix(prefix: Option<&str>) -> String {
    let trimmed = prefix.unwrap_or("").trim().trim_matches('/');
    if trimmed.is_empty() {
        DEFAULT_KEY_PREFIX.to_string()
    } else {
        trimmed.to_string()
    }
}

/// Files under a local directory, served by the web layer
#[derive(Debug, Clone)]
pub struct LocalStorage {
    base_dir: PathBuf,
    public_prefix: String,
}

impl LocalStorage {
    /// Create the storage, making sure `base_dir` exists
    pub fn new(base_dir: impl Into<PathBuf>, public_prefix: &str) -> Result<Self, StorageError> {
        let base_dir = base_dir.into();
        std::fs::create_dir_all(&base_dir)?;
        Ok(Self {
            base_dir,
            public_prefix: public_prefix.trim_end_matches('/').to_string(),
        })
    }

    /// Filesystem path for `key`
    pub fn path_for(&self, key: &str) -> Result<PathBuf, StorageError> {
        Ok(self.base_dir.join(sanitize_key(key)?))
    }
}

#[async_trait]
impl AudioStorage for LocalStorage {
    fn name(&self) -> &'static str {
        "local"
    }

    async fn upload_audio(
        &self,
        key: &str,
        data: Vec<u8>,
        _content_type: &str,
    ) -> Result<String, StorageError> {
        let safe_key = sanitize_key(key)?;
        let target = self.base_dir.join(&safe_key);
        if let Some(parent) = target.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&target, data).await?;
        debug!("Stored audio at {}", target.display());
        Ok(format!("{}/{}", self.public_prefix, safe_key))
    }

    async fn delete_audio(&self, key: &str) -> Result<(), StorageError> {
        let target = self.path_for(key)?;
        match tokio::fs::remove_file(&target).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

/// S3 bucket settings
#[derive(Debug, Clone)]
pub struct S3Settings {
    pub bucket: String,
    pub region: Option<String>,
    pub base_url: Option<String>,
}

impl S3Settings {
    /// Public URL for an object key
    pub fn public_url(&self, key: &str) -> String {
        match (&self.base_url, &self.region) {
            (Some(base), _) => format!("{}/{}", base.trim_end_matches('/'), key),
            (None, Some(region)) => {
                format!("https://{}.s3.{}.amazonaws.com/{}", self.bucket, region, key)
            }
            (None, None) => format!("https://{}.s3.amazonaws.com/{}", self.bucket, key),
        }
    }
}

/// Audio objects in an S3 bucket
///
/// Credentials come from the standard AWS environment variables.
pub struct ObjectStorage {
    store: Arc<dyn ObjectStore>,
    settings: S3Settings,
}

impl ObjectStorage {
    pub fn new(settings: S3Settings) -> Result<Self, StorageError> {
        if settings.bucket.trim().is_empty() {
            return Err(StorageError::Config("Missing S3 bucket".to_string()));
        }
        let mut builder = AmazonS3Builder::from_env().with_bucket_name(&settings.bucket);
        if let Some(region) = &settings.region {
            builder = builder.with_region(region);
        }
        let store = builder.build()?;
        Ok(Self::with_store(Arc::new(store), settings))
    }

    /// Use an existing store (any `ObjectStore` implementation)
    pub fn with_store(store: Arc<dyn ObjectStore>, settings: S3Settings) -> Self {
        Self { store, settings }
    }
}

#[async_trait]
impl AudioStorage for ObjectStorage {
    fn name(&self) -> &'static str {
        "s3"
    }

    async fn upload_audio(
        &self,
        key: &str,
        data: Vec<u8>,
        content_type: &str,
    ) -> Result<String, StorageError> {
        let safe_key = sanitize_key(key)?;
        let mut attributes = Attributes::new();
        attributes.insert(Attribute::ContentType, content_type.to_string().into());
        let options = PutOptions {
            attributes,
            ..Default::default()
        };

        self.store
            .put_opts(
                &ObjectPath::from(safe_key.as_str()),
                PutPayload::from(Bytes::from(data)),
                options,
            )
            .await?;

        debug!("Uploaded audio to s3://{}/{}", self.settings.bucket, safe_key);
        Ok(self.settings.public_url(&safe_key))
    }

    async fn delete_audio(&self, key: &str) -> Result<(), StorageError> {
        let safe_key = sanitize_key(key)?;
        match self.store.delete(&ObjectPath::from(safe_key.as_str())).await {
            Ok(()) => Ok(()),
            Err(object_store::Error::NotFound { .. }) => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

/// Choose the storage backend: S3 when a bucket is configured, else local
pub fn select_storage(
    s3: Option<S3Settings>,
    local_dir: &Path,
) -> Result<Arc<dyn AudioStorage>, StorageError> {
    match s3 {
        Some(settings) => {
            info!("Audio storage: s3://{}", settings.bucket);
            Ok(Arc::new(ObjectStorage::new(settings)?))
        }
        None => {
            info!("Audio storage: local directory {}", local_dir.display());
            Ok(Arc::new(LocalStorage::new(local_dir, LOCAL_PUBLIC_PREFIX)?))
        }
    }
}
