// Cached photo records.
// Defines the stored record, its content-free header, and version stamp parsing.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Derive the stable record id for a photo url.
pub fn photo_id(url: &str) -> String {
    hex::encode(Sha256::digest(url.as_bytes()))
}

/// Parse a version stamp into a point in time.
///
/// Accepts RFC 3339 (what object stores report), a bare `YYYY-MM-DD` date, and
/// a zone-less `YYYY-MM-DDTHH:MM:SS`, which is read as UTC.
pub fn parse_stamp(stamp: &str) -> Option<DateTime<Utc>> {
    let stamp = stamp.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(stamp) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(stamp, "%Y-%m-%dT%H:%M:%S%.f") {
        return Some(naive.and_utc());
    }
    NaiveDate::parse_from_str(stamp, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

/// A photo stored in the local cache.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CachedPhoto {
    /// Derived from `url` with [`photo_id`].
    pub id: String,
    pub url: String,
    pub content: Vec<u8>,
    /// Source-provided last-modified value, or the local fetch time.
    pub version_stamp: String,
    pub cached_at: Option<DateTime<Utc>>,
}

impl CachedPhoto {
    /// Create a record for freshly fetched content.
    pub fn new(url: &str, content: Vec<u8>, version_stamp: Option<&str>) -> Self {
        let now = Utc::now();
        Self {
            id: photo_id(url),
            url: url.to_string(),
            content,
            version_stamp: version_stamp
                .map(str::to_string)
                .unwrap_or_else(|| now.to_rfc3339()),
            cached_at: Some(now),
        }
    }

    pub fn header(&self) -> PhotoHeader {
        PhotoHeader {
            id: self.id.clone(),
            url: self.url.clone(),
            version_stamp: self.version_stamp.clone(),
            cached_at: self.cached_at,
            size: self.content.len() as u64,
        }
    }

    pub fn from_parts(header: PhotoHeader, content: Vec<u8>) -> Self {
        Self {
            id: header.id,
            url: header.url,
            content,
            version_stamp: header.version_stamp,
            cached_at: header.cached_at,
        }
    }
}

/// Record metadata without the content blob.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhotoHeader {
    pub id: String,
    pub url: String,
    pub version_stamp: String,
    /// Missing on records written before insertion times were tracked.
    #[serde(default)]
    pub cached_at: Option<DateTime<Utc>>,
    pub size: u64,
}

impl PhotoHeader {
    /// Time used for oldest-first ordering.
    pub fn age_key(&self) -> DateTime<Utc> {
        self.cached_at
            .or_else(|| parse_stamp(&self.version_stamp))
            .unwrap_or(DateTime::<Utc>::UNIX_EPOCH)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_photo_id_is_stable_and_distinct() {
        let a = photo_id("http://frame.local/uploads/a.jpg");
        assert_eq!(a, photo_id("http://frame.local/uploads/a.jpg"));
        assert_ne!(a, photo_id("http://frame.local/uploads/b.jpg"));
        assert_eq!(a.len(), 64);
    }

    #[test]
    fn test_parse_stamp_formats() {
        let rfc = parse_stamp("2024-01-02T10:00:00.000Z").unwrap();
        let date = parse_stamp("2024-01-02").unwrap();
        let naive = parse_stamp("2024-01-02T10:00:00").unwrap();

        assert_eq!(rfc, naive);
        assert!(date < rfc);
        assert!(parse_stamp("yesterday").is_none());
    }

    #[test]
    fn test_new_record_uses_local_stamp_when_missing() {
        let record = CachedPhoto::new("http://x/a.jpg", vec![1, 2, 3], None);
        assert!(parse_stamp(&record.version_stamp).is_some());
        assert!(record.cached_at.is_some());

        let stamped = CachedPhoto::new("http://x/a.jpg", vec![1], Some("2024-01-01"));
        assert_eq!(stamped.version_stamp, "2024-01-01");
        assert_eq!(stamped.header().size, 1);
    }

    #[test]
    fn test_age_key_falls_back_to_stamp() {
        let header = PhotoHeader {
            id: "x".to_string(),
            url: "http://x/a.jpg".to_string(),
            version_stamp: "2024-03-01".to_string(),
            cached_at: None,
            size: 0,
        };
        assert_eq!(header.age_key(), parse_stamp("2024-03-01").unwrap());
    }
}
