// Cache maintenance policy.
// Bounded oldest-first eviction and version stamp staleness checks.

use super::record::PhotoHeader;

/// Maximum number of photos kept in the local cache.
pub const DEFAULT_MAX_CACHED: usize = 300;

/// Result of comparing a stored record against the server's version stamp.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Freshness {
    /// Stored content can be served without touching the network.
    Hit,
    /// Stored content is outdated or empty and must be refetched.
    Stale,
}

/// Compare a stored record with the version stamp the server reports now.
///
/// A server entry without a stamp cannot be compared, so any stored content
/// for that url is reused. Upload names are unique, so the url itself
/// identifies the content.
pub fn freshness(stored: &PhotoHeader, candidate_stamp: Option<&str>) -> Freshness {
    if stored.size == 0 {
        return Freshness::Stale;
    }
    match candidate_stamp {
        Some(stamp) if stamp != stored.version_stamp => Freshness::Stale,
        _ => Freshness::Hit,
    }
}

/// Bounded-size, oldest-first eviction.
#[derive(Debug, Clone, Copy)]
pub struct EvictionPolicy {
    pub max_items: usize,
}

impl Default for EvictionPolicy {
    fn default() -> Self {
        Self {
            max_items: DEFAULT_MAX_CACHED,
        }
    }
}

impl EvictionPolicy {
    pub fn new(max_items: usize) -> Self {
        Self { max_items }
    }

    /// Ids to delete so that at most `max_items` records remain.
    ///
    /// Oldest by insertion time first; ties go to the smaller id.
    pub fn select_victims(&self, headers: &[PhotoHeader]) -> Vec<String> {
        let excess = headers.len().saturating_sub(self.max_items);
        if excess == 0 {
            return Vec::new();
        }

        let mut by_age: Vec<&PhotoHeader> = headers.iter().collect();
        by_age.sort_by(|a, b| a.age_key().cmp(&b.age_key()).then_with(|| a.id.cmp(&b.id)));
        by_age
            .into_iter()
            .take(excess)
            .map(|header| header.id.clone())
            .collect()
    }
}
