// File-backed cache store.
// Keeps one JSON header and one content blob per photo, plus a metadata table.

use std::collections::HashMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::{Serialize, de::DeserializeOwned};
use serde_json::Value;
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;

use crate::error::Result;

use super::backend::CacheBackend;
use super::paths::{content_path, header_path, metadata_path, photos_dir, temp_path};
use super::record::{CachedPhoto, PhotoHeader};

/// Directory store rooted at a cache directory.
///
/// The content blob is renamed into place before the header, so the header is
/// the commit point: a record is visible only once both files are complete.
#[derive(Debug)]
pub struct FileBackend {
    root: PathBuf,
    /// Serializes read-modify-write cycles on the metadata table.
    metadata_lock: Mutex<()>,
}

impl FileBackend {
    pub fn new(root: PathBuf) -> Self {
        Self {
            root,
            metadata_lock: Mutex::new(()),
        }
    }

    async fn read_metadata(&self) -> Result<HashMap<String, Value>> {
        Ok(read_json(&metadata_path(&self.root))
            .await?
            .unwrap_or_default())
    }
}

/// Write bytes to the temp file next to `path`, returning the temp path.
async fn write_temp(path: &Path, bytes: &[u8]) -> Result<PathBuf> {
    // Ensure parent directory exists
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }

    let temp = temp_path(path);
    let mut file = tokio::fs::File::create(&temp).await?;
    file.write_all(bytes).await?;
    file.sync_all().await?;
    Ok(temp)
}

/// Write bytes atomically via a temp file.
async fn write_atomic(path: &Path, bytes: &[u8]) -> Result<()> {
    let temp = write_temp(path, bytes).await?;
    tokio::fs::rename(&temp, path).await?;
    Ok(())
}

async fn write_json<T: Serialize>(path: &Path, data: &T) -> Result<()> {
    let json = serde_json::to_vec_pretty(data)?;
    write_atomic(path, &json).await
}

async fn read_json<T: DeserializeOwned>(path: &Path) -> Result<Option<T>> {
    match tokio::fs::read(path).await {
        Ok(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e.into()),
    }
}

async fn remove_if_exists(path: &Path) -> Result<()> {
    match tokio::fs::remove_file(path).await {
        Err(e) if e.kind() != ErrorKind::NotFound => Err(e.into()),
        _ => Ok(()),
    }
}

#[async_trait]
impl CacheBackend for FileBackend {
    async fn get(&self, id: &str) -> Result<Option<CachedPhoto>> {
        let Some(header) = read_json::<PhotoHeader>(&header_path(&self.root, id)).await? else {
            return Ok(None);
        };

        let content = match tokio::fs::read(content_path(&self.root, id)).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        // A header from an interrupted overwrite may describe other content
        if content.len() as u64 != header.size {
            return Ok(None);
        }

        Ok(Some(CachedPhoto::from_parts(header, content)))
    }

    async fn head(&self, id: &str) -> Result<Option<PhotoHeader>> {
        let Some(header) = read_json::<PhotoHeader>(&header_path(&self.root, id)).await? else {
            return Ok(None);
        };

        match tokio::fs::metadata(content_path(&self.root, id)).await {
            Ok(meta) if meta.len() == header.size => Ok(Some(header)),
            Ok(_) => Ok(None),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn put(&self, record: &CachedPhoto) -> Result<()> {
        let header_file = header_path(&self.root, &record.id);
        let content_file = content_path(&self.root, &record.id);
        let staged = write_temp(&content_file, &record.content).await?;

        // Hide the old record only once the new content is on disk
        remove_if_exists(&header_file).await?;
        tokio::fs::rename(&staged, &content_file).await?;
        write_json(&header_file, &record.header()).await
    }

    async fn delete(&self, id: &str) -> Result<()> {
        remove_if_exists(&header_path(&self.root, id)).await?;
        remove_if_exists(&content_path(&self.root, id)).await
    }

    async fn list(&self) -> Result<Vec<PhotoHeader>> {
        let dir = photos_dir(&self.root);
        let mut entries = match tokio::fs::read_dir(&dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut headers = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().is_none_or(|ext| ext != "json") {
                continue;
            }
            match read_json::<PhotoHeader>(&path).await {
                Ok(Some(header)) => headers.push(header),
                Ok(None) => {}
                Err(e) => tracing::warn!(path = %path.display(), error = %e, "skipping unreadable cache header"),
            }
        }

        Ok(headers)
    }

    async fn clear(&self) -> Result<()> {
        let _guard = self.metadata_lock.lock().await;
        match tokio::fs::remove_dir_all(photos_dir(&self.root)).await {
            Err(e) if e.kind() != ErrorKind::NotFound => return Err(e.into()),
            _ => {}
        }
        remove_if_exists(&metadata_path(&self.root)).await
    }

    async fn get_meta(&self, key: &str) -> Result<Option<Value>> {
        Ok(self.read_metadata().await?.remove(key))
    }

    async fn set_meta(&self, key: &str, value: Value) -> Result<()> {
        let _guard = self.metadata_lock.lock().await;
        let mut table = self.read_metadata().await?;
        table.insert(key.to_string(), value);
        write_json(&metadata_path(&self.root), &table).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn record(url: &str, content: &[u8], stamp: &str) -> CachedPhoto {
        CachedPhoto::new(url, content.to_vec(), Some(stamp))
    }

    #[tokio::test]
    async fn test_put_and_get() {
        let temp_dir = TempDir::new().unwrap();
        let store = FileBackend::new(temp_dir.path().to_path_buf());

        let photo = record("http://frame/uploads/a.jpg", b"jpeg-bytes", "2024-01-01");
        store.put(&photo).await.unwrap();

        let loaded = store.get(&photo.id).await.unwrap();
        assert_eq!(loaded, Some(photo.clone()));
        assert_eq!(store.head(&photo.id).await.unwrap(), Some(photo.header()));
    }

    #[tokio::test]
    async fn test_overwrite_replaces_content() {
        let temp_dir = TempDir::new().unwrap();
        let store = FileBackend::new(temp_dir.path().to_path_buf());

        let old = record("http://frame/uploads/a.jpg", b"old", "2024-01-01");
        let new = record("http://frame/uploads/a.jpg", b"newer", "2024-01-02");
        store.put(&old).await.unwrap();
        store.put(&new).await.unwrap();

        let loaded = store.get(&new.id).await.unwrap().unwrap();
        assert_eq!(loaded.content, b"newer");
        assert_eq!(loaded.version_stamp, "2024-01-02");
        assert_eq!(store.list().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_failed_overwrite_keeps_old_record() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path().to_path_buf();
        let store = FileBackend::new(root.clone());

        let old = record("http://frame/uploads/a.jpg", b"old", "2024-01-01");
        store.put(&old).await.unwrap();

        // A directory in the way of the temp file makes the content write fail
        tokio::fs::create_dir(temp_path(&content_path(&root, &old.id)))
            .await
            .unwrap();
        let new = record("http://frame/uploads/a.jpg", b"newer", "2024-01-02");
        assert!(store.put(&new).await.is_err());

        assert_eq!(store.get(&old.id).await.unwrap(), Some(old.clone()));
        assert_eq!(store.head(&old.id).await.unwrap(), Some(old.header()));
    }

    #[tokio::test]
    async fn test_incomplete_record_reads_as_missing() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path().to_path_buf();
        let store = FileBackend::new(root.clone());

        let photo = record("http://frame/uploads/a.jpg", b"jpeg-bytes", "2024-01-01");
        store.put(&photo).await.unwrap();

        // Content lost, header left behind
        tokio::fs::remove_file(content_path(&root, &photo.id))
            .await
            .unwrap();
        assert!(store.get(&photo.id).await.unwrap().is_none());
        assert!(store.head(&photo.id).await.unwrap().is_none());

        // Content truncated
        write_atomic(&content_path(&root, &photo.id), b"jpeg")
            .await
            .unwrap();
        assert!(store.get(&photo.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_list_skips_corrupt_headers() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path().to_path_buf();
        let store = FileBackend::new(root.clone());

        store
            .put(&record("http://frame/a.jpg", b"a", "2024-01-01"))
            .await
            .unwrap();
        write_atomic(&header_path(&root, "garbage"), b"{not json")
            .await
            .unwrap();

        let headers = store.list().await.unwrap();
        assert_eq!(headers.len(), 1);
        assert_eq!(headers[0].url, "http://frame/a.jpg");
    }

    #[tokio::test]
    async fn test_delete_and_clear() {
        let temp_dir = TempDir::new().unwrap();
        let store = FileBackend::new(temp_dir.path().to_path_buf());

        let a = record("http://frame/a.jpg", b"a", "2024-01-01");
        let b = record("http://frame/b.jpg", b"b", "2024-01-02");
        store.put(&a).await.unwrap();
        store.put(&b).await.unwrap();
        store.set_meta("last_sync", Value::from("now")).await.unwrap();

        store.delete(&a.id).await.unwrap();
        store.delete("missing").await.unwrap();
        assert!(store.get(&a.id).await.unwrap().is_none());
        assert_eq!(store.list().await.unwrap().len(), 1);

        store.clear().await.unwrap();
        assert!(store.list().await.unwrap().is_empty());
        assert!(store.get_meta("last_sync").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_metadata_round_trip() {
        let temp_dir = TempDir::new().unwrap();
        let store = FileBackend::new(temp_dir.path().to_path_buf());

        assert!(store.get_meta("last_sync").await.unwrap().is_none());
        store.set_meta("last_sync", Value::from("2024-01-01T00:00:00Z")).await.unwrap();
        store.set_meta("last_photo_count", Value::from(12)).await.unwrap();

        assert_eq!(
            store.get_meta("last_sync").await.unwrap(),
            Some(Value::from("2024-01-01T00:00:00Z"))
        );
        assert_eq!(store.get_meta("last_photo_count").await.unwrap(), Some(Value::from(12)));
    }
}
