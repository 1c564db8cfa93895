// Storage backends for the photo cache.
// Defines the fallible backend contract and an in-memory implementation.

use std::collections::HashMap;

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::RwLock;

use crate::error::Result;

use super::record::{CachedPhoto, PhotoHeader};

/// Durable key-value storage for cached photos and bookkeeping metadata.
///
/// Implementations report every failure; [`super::PhotoCache`] decides how to
/// degrade.
#[async_trait]
pub trait CacheBackend: Send + Sync {
    /// Load a full record by id. Partially written records read as `None`.
    async fn get(&self, id: &str) -> Result<Option<CachedPhoto>>;

    /// Load only the header of a committed record.
    async fn head(&self, id: &str) -> Result<Option<PhotoHeader>>;

    /// Store a record, replacing any record with the same id.
    async fn put(&self, record: &CachedPhoto) -> Result<()>;

    /// Remove a record. Removing a missing record succeeds.
    async fn delete(&self, id: &str) -> Result<()>;

    /// Headers of all committed records, in no particular order.
    async fn list(&self) -> Result<Vec<PhotoHeader>>;

    /// Remove all records and metadata.
    async fn clear(&self) -> Result<()>;

    async fn get_meta(&self, key: &str) -> Result<Option<Value>>;

    async fn set_meta(&self, key: &str, value: Value) -> Result<()>;
}

/// Non-durable backend for hosts without a cache directory, and for tests.
#[derive(Debug, Default)]
pub struct MemoryBackend {
    photos: RwLock<HashMap<String, CachedPhoto>>,
    metadata: RwLock<HashMap<String, Value>>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CacheBackend for MemoryBackend {
    async fn get(&self, id: &str) -> Result<Option<CachedPhoto>> {
        Ok(self.photos.read().await.get(id).cloned())
    }

    async fn head(&self, id: &str) -> Result<Option<PhotoHeader>> {
        Ok(self.photos.read().await.get(id).map(CachedPhoto::header))
    }

    async fn put(&self, record: &CachedPhoto) -> Result<()> {
        self.photos
            .write()
            .await
            .insert(record.id.clone(), record.clone());
        Ok(())
    }

    async fn delete(&self, id: &str) -> Result<()> {
        self.photos.write().await.remove(id);
        Ok(())
    }

    async fn list(&self) -> Result<Vec<PhotoHeader>> {
        Ok(self
            .photos
            .read()
            .await
            .values()
            .map(CachedPhoto::header)
            .collect())
    }

    async fn clear(&self) -> Result<()> {
        self.photos.write().await.clear();
        self.metadata.write().await.clear();
        Ok(())
    }

    async fn get_meta(&self, key: &str) -> Result<Option<Value>> {
        Ok(self.metadata.read().await.get(key).cloned())
    }

    async fn set_meta(&self, key: &str, value: Value) -> Result<()> {
        self.metadata.write().await.insert(key.to_string(), value);
        Ok(())
    }
}
