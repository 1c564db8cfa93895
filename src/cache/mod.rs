// Cache module for the local photo store.
// Keeps downloaded photos on disk so the slideshow survives server outages.

pub mod backend;
pub mod local;
pub mod paths;
pub mod policy;
pub mod record;
pub mod store;

pub use backend::{CacheBackend, MemoryBackend};
pub use local::PhotoCache;
pub use policy::{DEFAULT_MAX_CACHED, EvictionPolicy};
pub use record::{CachedPhoto, PhotoHeader, parse_stamp};
pub use store::FileBackend;
