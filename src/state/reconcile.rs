// Photo list reconciliation.
// Merges the server's photo list with the local cache into the display sequence.

use std::cmp::Ordering;
use std::collections::HashSet;
use std::sync::{Arc, Mutex, PoisonError};

use chrono::{DateTime, Utc};
use serde_json::Value;
use tokio::sync::mpsc;
use tokio::task::JoinSet;

use crate::cache::{CachedPhoto, PhotoCache, PhotoHeader, parse_stamp};
use crate::remote::{PhotoSource, RemotePhoto};

use super::sync::ConnectionStatus;

/// Metadata key for the time of the last successful list fetch.
pub const META_LAST_SYNC: &str = "last_sync";
/// Metadata key for the photo count of the last successful pass.
pub const META_LAST_PHOTO_COUNT: &str = "last_photo_count";

/// Where a slot's image is loaded from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PhotoRef {
    /// Load directly from the server.
    Remote,
    /// Load from the local cache record with this id.
    Cached { id: String },
}

/// One photo in the display sequence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DisplayItem {
    /// Resolved absolute url, also the cache key.
    pub url: String,
    pub version_stamp: Option<String>,
    pub source: PhotoRef,
}

impl DisplayItem {
    pub fn is_cached(&self) -> bool {
        matches!(self.source, PhotoRef::Cached { .. })
    }

    /// Last path segment of the url, for labels.
    pub fn file_name(&self) -> &str {
        let path = self.url.split(['?', '#']).next().unwrap_or(&self.url);
        path.rsplit('/').find(|s| !s.is_empty()).unwrap_or(path)
    }
}

/// Ordered photos eligible for the slideshow, newest first.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DisplaySequence {
    items: Vec<DisplayItem>,
}

impl DisplaySequence {
    pub fn new(items: Vec<DisplayItem>) -> Self {
        Self { items }
    }

    pub fn items(&self) -> &[DisplayItem] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Point every remote slot for `url` at its new cache record.
    ///
    /// Returns the positions that changed.
    pub fn mark_cached(&mut self, url: &str, id: &str) -> Vec<usize> {
        let mut changed = Vec::new();
        for (position, item) in self.items.iter_mut().enumerate() {
            if item.url == url && item.source == PhotoRef::Remote {
                item.source = PhotoRef::Cached { id: id.to_string() };
                changed.push(position);
            }
        }
        changed
    }
}

/// A background download finished and the photo is now cached.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Backfilled {
    pub url: String,
    pub id: String,
}

/// Result of one sync pass, handed to the slideshow owner.
#[derive(Debug, Clone)]
pub struct SyncOutcome {
    pub sequence: DisplaySequence,
    pub status: ConnectionStatus,
}

/// Resolve a listing entry to the url the frame loads it from.
///
/// Absolute urls pass through, site-relative ones are joined with `origin`,
/// and bare file names map to the server's `/uploads/` directory.
pub fn resolve_url(origin: &str, photo: &RemotePhoto) -> Option<String> {
    let origin = origin.trim_end_matches('/');

    if let Some(url) = photo.url.as_deref().map(str::trim) {
        if url.starts_with("http://") || url.starts_with("https://") {
            return Some(url.to_string());
        }
        if url.starts_with('/') {
            return Some(format!("{}{}", origin, url));
        }
    }

    photo
        .file
        .as_deref()
        .map(|file| file.trim().trim_start_matches('/'))
        .filter(|file| !file.is_empty())
        .map(|file| format!("{}/uploads/{}", origin, file))
}

/// Stable newest-first ordering; undated items go last in their original order.
fn sort_newest_first<T>(items: &mut [T], time: impl Fn(&T) -> Option<DateTime<Utc>>) {
    items.sort_by(|a, b| match (time(a), time(b)) {
        (Some(a), Some(b)) => b.cmp(&a),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    });
}

/// Removes a url from the in-flight set when its backfill task ends.
struct InFlightClaim {
    set: Arc<Mutex<HashSet<String>>>,
    url: String,
}

impl Drop for InFlightClaim {
    fn drop(&mut self) {
        self.set
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&self.url);
    }
}

/// Merges server truth with cache state and keeps the cache filled.
pub struct Reconciler {
    source: Arc<dyn PhotoSource>,
    cache: PhotoCache,
    origin: String,
    max_display: usize,
    in_flight: Arc<Mutex<HashSet<String>>>,
    backfills: tokio::sync::Mutex<JoinSet<()>>,
    events: mpsc::UnboundedSender<Backfilled>,
}

impl Reconciler {
    pub fn new(
        source: Arc<dyn PhotoSource>,
        cache: PhotoCache,
        origin: &str,
        max_display: usize,
        events: mpsc::UnboundedSender<Backfilled>,
    ) -> Self {
        Self {
            source,
            cache,
            origin: origin.trim_end_matches('/').to_string(),
            max_display,
            in_flight: Arc::new(Mutex::new(HashSet::new())),
            backfills: tokio::sync::Mutex::new(JoinSet::new()),
            events,
        }
    }

    pub fn cache(&self) -> &PhotoCache {
        &self.cache
    }

    /// Run one pass: fetch the list, reconcile it, or fall back to the cache.
    pub async fn sync(&self) -> SyncOutcome {
        match self.source.list_photos().await {
            Ok(list) => {
                let sequence = self.reconcile(list).await;
                self.cache
                    .set_meta(META_LAST_SYNC, Value::from(Utc::now().to_rfc3339()))
                    .await;
                self.cache
                    .set_meta(META_LAST_PHOTO_COUNT, Value::from(sequence.len()))
                    .await;

                let status = if sequence.is_empty() {
                    ConnectionStatus::Empty
                } else {
                    ConnectionStatus::Online
                };
                SyncOutcome { sequence, status }
            }
            Err(e) => {
                tracing::warn!(error = %e, "photo list unavailable, serving from cache");
                let sequence = self.offline_sequence().await;
                let status = if sequence.is_empty() {
                    ConnectionStatus::Unreachable
                } else {
                    ConnectionStatus::Offline
                };
                SyncOutcome { sequence, status }
            }
        }
    }

    /// Build the display sequence for a server listing.
    ///
    /// Slots whose cached copy is current are cache-backed at once. The rest
    /// start on their remote url and are downloaded in the background.
    pub async fn reconcile(&self, mut list: Vec<RemotePhoto>) -> DisplaySequence {
        sort_newest_first(&mut list, |photo| {
            photo.version_stamp().and_then(parse_stamp)
        });
        list.truncate(self.max_display);

        let mut items = Vec::with_capacity(list.len());
        let mut hits = 0usize;
        for photo in &list {
            let Some(url) = resolve_url(&self.origin, photo) else {
                tracing::debug!(?photo, "dropping photo without a usable url");
                continue;
            };
            let stamp = photo.version_stamp().map(str::to_string);

            let source = match self.cache.get_fresh(&url, stamp.as_deref()).await {
                Some(header) => {
                    hits += 1;
                    PhotoRef::Cached { id: header.id }
                }
                None => {
                    self.spawn_backfill(&url, stamp.clone()).await;
                    PhotoRef::Remote
                }
            };

            items.push(DisplayItem {
                url,
                version_stamp: stamp,
                source,
            });
        }

        tracing::debug!(total = items.len(), hits, "reconciled photo list");
        DisplaySequence::new(items)
    }

    /// Everything in the cache, newest first, for when the server is down.
    pub async fn offline_sequence(&self) -> DisplaySequence {
        let mut headers: Vec<PhotoHeader> = self.cache.list().await;
        sort_newest_first(&mut headers, |header| {
            parse_stamp(&header.version_stamp).or(header.cached_at)
        });
        headers.truncate(self.max_display);

        DisplaySequence::new(
            headers
                .into_iter()
                .map(|header| DisplayItem {
                    url: header.url,
                    version_stamp: Some(header.version_stamp),
                    source: PhotoRef::Cached { id: header.id },
                })
                .collect(),
        )
    }

    /// Wait for every running backfill to finish.
    pub async fn drain_backfills(&self) {
        let mut tasks = self.backfills.lock().await;
        while let Some(result) = tasks.join_next().await {
            if let Err(e) = result {
                tracing::warn!(error = %e, "backfill task failed");
            }
        }
    }

    /// Cancel running backfills.
    pub async fn abort_backfills(&self) {
        self.backfills.lock().await.abort_all();
    }

    /// Download `url` into the cache unless a download is already running.
    async fn spawn_backfill(&self, url: &str, stamp: Option<String>) {
        let newly_claimed = self
            .in_flight
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(url.to_string());
        if !newly_claimed {
            return;
        }

        let claim = InFlightClaim {
            set: Arc::clone(&self.in_flight),
            url: url.to_string(),
        };
        let source = Arc::clone(&self.source);
        let cache = self.cache.clone();
        let events = self.events.clone();

        let mut tasks = self.backfills.lock().await;
        // Reap finished tasks so the set does not grow across passes
        while tasks.try_join_next().is_some() {}
        tasks.spawn(async move {
            let url = claim.url.clone();
            match source.fetch_photo(&url).await {
                Ok(content) if content.is_empty() => {
                    tracing::warn!(url, "server returned an empty photo, not caching");
                }
                Ok(content) => {
                    let record = CachedPhoto::new(&url, content, stamp.as_deref());
                    if cache.put(&record).await {
                        tracing::debug!(url, "photo cached");
                        let _ = events.send(Backfilled { url, id: record.id });
                    }
                }
                Err(e) => tracing::warn!(url, error = %e, "photo download failed"),
            }
            drop(claim);
        });
    }
}
