// Error types for the photo frame.
// Covers the remote photo server, the local cache, and configuration errors.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum FrameError {
    #[error("Photo server request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Photo server returned HTTP {status} for {url}")]
    Status { status: u16, url: String },

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Cache error: {0}")]
    Cache(String),

    #[error("Invalid configuration: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, FrameError>;
