// Local photo cache facade.
// Wraps a backend so store failures degrade to cache misses, and runs eviction after writes.

use std::sync::Arc;

use serde_json::Value;
use tokio::sync::Mutex;

use crate::error::Result;

use super::backend::CacheBackend;
use super::policy::{EvictionPolicy, Freshness, freshness};
use super::record::{CachedPhoto, PhotoHeader, photo_id};

/// Shared handle to the local photo cache.
///
/// The cache is an optimization, so no method here returns an error: failures
/// are logged and reported as `None`, `false` or an empty list.
#[derive(Clone)]
pub struct PhotoCache {
    backend: Arc<dyn CacheBackend>,
    policy: EvictionPolicy,
    eviction: Arc<Mutex<()>>,
}

impl std::fmt::Debug for PhotoCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PhotoCache")
            .field("policy", &self.policy)
            .finish_non_exhaustive()
    }
}

impl PhotoCache {
    pub fn new(backend: Arc<dyn CacheBackend>, policy: EvictionPolicy) -> Self {
        Self {
            backend,
            policy,
            eviction: Arc::new(Mutex::new(())),
        }
    }

    /// Look up the record stored for `url`.
    pub async fn get(&self, url: &str) -> Option<CachedPhoto> {
        match self.backend.get(&photo_id(url)).await {
            Ok(Some(record)) if record.url == url => Some(record),
            Ok(Some(record)) => {
                tracing::warn!(url, stored = %record.url, "cache id collision, ignoring record");
                None
            }
            Ok(None) => None,
            Err(e) => {
                tracing::warn!(url, error = %e, "cache read failed");
                None
            }
        }
    }

    /// Header of the record for `url` if it can be served for `stamp` without a fetch.
    ///
    /// Only the header is read; content stays on disk until it is displayed.
    pub async fn get_fresh(&self, url: &str, stamp: Option<&str>) -> Option<PhotoHeader> {
        let stored = match self.backend.head(&photo_id(url)).await {
            Ok(Some(header)) if header.url == url => header,
            Ok(_) => return None,
            Err(e) => {
                tracing::warn!(url, error = %e, "cache read failed");
                return None;
            }
        };
        match freshness(&stored, stamp) {
            Freshness::Hit => Some(stored),
            Freshness::Stale => {
                tracing::debug!(url, stored = %stored.version_stamp, ?stamp, "cached photo is stale");
                None
            }
        }
    }

    /// Store a record, then trim the cache back to its size limit.
    pub async fn put(&self, record: &CachedPhoto) -> bool {
        if let Err(e) = self.backend.put(record).await {
            tracing::warn!(url = %record.url, error = %e, "cache write failed");
            return false;
        }

        match self.enforce_limit().await {
            Ok(0) => {}
            Ok(evicted) => tracing::debug!(evicted, "evicted oldest cached photos"),
            Err(e) => tracing::warn!(error = %e, "cache eviction failed"),
        }
        true
    }

    pub async fn delete(&self, id: &str) -> bool {
        match self.backend.delete(id).await {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!(id, error = %e, "cache delete failed");
                false
            }
        }
    }

    /// All committed records with their content.
    pub async fn get_all(&self) -> Vec<CachedPhoto> {
        let mut photos = Vec::new();
        for header in self.list().await {
            match self.backend.get(&header.id).await {
                Ok(Some(record)) => photos.push(record),
                Ok(None) => {}
                Err(e) => tracing::warn!(id = %header.id, error = %e, "cache read failed"),
            }
        }
        photos
    }

    /// Headers of all committed records, without loading content.
    pub async fn list(&self) -> Vec<PhotoHeader> {
        self.backend.list().await.unwrap_or_else(|e| {
            tracing::warn!(error = %e, "cache listing failed");
            Vec::new()
        })
    }

    pub async fn clear(&self) -> bool {
        match self.backend.clear().await {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!(error = %e, "cache clear failed");
                false
            }
        }
    }

    pub async fn get_meta(&self, key: &str) -> Option<Value> {
        self.backend.get_meta(key).await.unwrap_or_else(|e| {
            tracing::warn!(key, error = %e, "cache metadata read failed");
            None
        })
    }

    pub async fn set_meta(&self, key: &str, value: Value) -> bool {
        match self.backend.set_meta(key, value).await {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!(key, error = %e, "cache metadata write failed");
                false
            }
        }
    }

    /// Delete the oldest records beyond the policy limit. Returns how many went.
    async fn enforce_limit(&self) -> Result<usize> {
        let _guard = self.eviction.lock().await;
        let headers = self.backend.list().await?;
        let victims = self.policy.select_victims(&headers);
        for id in &victims {
            self.backend.delete(id).await?;
        }
        Ok(victims.len())
    }
}
