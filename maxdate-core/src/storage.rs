use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use maxdate_shared::clients::minio::MinioClient;

#[derive(Debug, thiserror::Error)]
#[error("photo storage error: {0}")]
pub struct StorageError(pub String);

/// Object storage for photo bytes.
#[async_trait]
pub trait PhotoStorage: Send + Sync {
    /// Stores the object and returns its public URL.
    async fn put(&self, key: &str, bytes: Vec<u8>, content_type: &str) -> Result<String, StorageError>;
    async fn remove(&self, key: &str) -> Result<(), StorageError>;
}

#[async_trait]
impl PhotoStorage for MinioClient {
    async fn put(&self, key: &str, bytes: Vec<u8>, content_type: &str) -> Result<String, StorageError> {
        self.upload(key, bytes, content_type).await.map_err(StorageError)
    }

    async fn remove(&self, key: &str) -> Result<(), StorageError> {
        self.delete(key).await.map_err(StorageError)
    }
}

#[derive(Debug, Clone)]
pub struct StoredObject {
    pub bytes: Vec<u8>,
    pub content_type: String,
}

/// Keeps objects in process memory.
#[derive(Debug, Default)]
pub struct MemoryPhotoStorage {
    base_url: String,
    objects: RwLock<HashMap<String, StoredObject>>,
}

impl MemoryPhotoStorage {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            objects: RwLock::new(HashMap::new()),
        }
    }

    pub async fn get(&self, key: &str) -> Option<StoredObject> {
        self.objects.read().await.get(key).cloned()
    }

    pub async fn len(&self) -> usize {
        self.objects.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.objects.read().await.is_empty()
    }
}

#[async_trait]
impl PhotoStorage for MemoryPhotoStorage {
    async fn put(&self, key: &str, bytes: Vec<u8>, content_type: &str) -> Result<String, StorageError> {
        self.objects.write().await.insert(
            key.to_string(),
            StoredObject { bytes, content_type: content_type.to_string() },
        );
        Ok(format!("{}/{key}", self.base_url))
    }

    async fn remove(&self, key: &str) -> Result<(), StorageError> {
        self.objects.write().await.remove(key);
        Ok(())
    }
}
