// Photo server response types.
// Defines structs for deserializing the upload server's JSON responses.

use serde::Deserialize;
use serde_json::Value;

/// One entry of the `GET /photos` listing.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RemotePhoto {
    /// Absolute or site-relative photo url.
    #[serde(default)]
    pub url: Option<String>,
    /// Bare upload file name, served under `/uploads/`.
    #[serde(default)]
    pub file: Option<String>,
    /// Object key when the server stores uploads in S3.
    #[serde(default)]
    pub key: Option<String>,
    #[serde(default, rename = "lastModified")]
    pub last_modified: Option<String>,
}

impl RemotePhoto {
    pub fn new(url: &str, last_modified: Option<&str>) -> Self {
        Self {
            url: Some(url.to_string()),
            file: None,
            key: None,
            last_modified: last_modified.map(str::to_string),
        }
    }

    /// Version stamp reported by the server, if any.
    pub fn version_stamp(&self) -> Option<&str> {
        self.last_modified.as_deref().filter(|s| !s.trim().is_empty())
    }
}

/// Parse a `/photos` body leniently.
///
/// A body that is not an array yields no photos. Elements that are not
/// objects, or that carry neither `url` nor `file`, are dropped.
pub fn parse_photo_list(body: Value) -> Vec<RemotePhoto> {
    let Value::Array(items) = body else {
        tracing::warn!("photo list response is not an array, ignoring it");
        return Vec::new();
    };

    let total = items.len();
    let photos: Vec<RemotePhoto> = items
        .into_iter()
        .filter_map(|item| serde_json::from_value::<RemotePhoto>(item).ok())
        .filter(|photo| photo.url.is_some() || photo.file.is_some())
        .collect();

    if photos.len() < total {
        tracing::warn!(dropped = total - photos.len(), "dropped malformed photo list entries");
    }
    photos
}

/// Response of `DELETE /delete_all`.
#[derive(Debug, Clone, Deserialize)]
pub struct DeleteAllResponse {
    pub ok: bool,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
}

impl DeleteAllResponse {
    /// Human-readable summary for the activity log.
    pub fn summary(&self) -> String {
        match (self.ok, &self.message, &self.error) {
            (true, Some(message), _) => message.clone(),
            (true, None, _) => "All photos deleted".to_string(),
            (false, _, Some(error)) => error.clone(),
            (false, _, None) => "Delete failed".to_string(),
        }
    }
}

/// Response of `GET /health`.
#[derive(Debug, Clone, Deserialize)]
pub struct HealthResponse {
    pub ok: bool,
    pub status: String,
    pub timestamp: String,
    #[serde(default, rename = "useS3")]
    pub use_s3: Option<bool>,
}
