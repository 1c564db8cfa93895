// Photo server endpoint functions.
// Provides typed methods for the list, fetch, delete and health endpoints.

use async_trait::async_trait;
use serde_json::Value;

use crate::error::Result;

use super::client::FrameClient;
use super::types::{DeleteAllResponse, HealthResponse, RemotePhoto, parse_photo_list};

/// Where the reconciler gets the photo list and photo content from.
#[async_trait]
pub trait PhotoSource: Send + Sync {
    /// Current list of photos on the server.
    async fn list_photos(&self) -> Result<Vec<RemotePhoto>>;

    /// Download one photo by its resolved url.
    async fn fetch_photo(&self, url: &str) -> Result<Vec<u8>>;
}

impl FrameClient {
    /// Ask the server to delete every uploaded photo.
    pub async fn delete_all(&self) -> Result<DeleteAllResponse> {
        let response = self.delete("/delete_all").await?;
        let body: DeleteAllResponse = response.json().await?;
        Ok(body)
    }

    /// Check that the server is up.
    pub async fn health(&self) -> Result<HealthResponse> {
        let response = self.get("/health").await?;
        let health: HealthResponse = response.json().await?;
        Ok(health)
    }
}

#[async_trait]
impl PhotoSource for FrameClient {
    async fn list_photos(&self) -> Result<Vec<RemotePhoto>> {
        let response = self.get("/photos").await?;
        let body: Value = response.json().await?;
        Ok(parse_photo_list(body))
    }

    async fn fetch_photo(&self, url: &str) -> Result<Vec<u8>> {
        let response = self.get_url(url).await?;
        let bytes = response.bytes().await?;
        Ok(bytes.to_vec())
    }
}
