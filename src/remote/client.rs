// Photo server HTTP client.
// Handles the base origin, request defaults, and response status mapping.

use std::time::Duration;

use reqwest::{
    Client, Response, StatusCode,
    header::{HeaderMap, HeaderValue, USER_AGENT},
};

use crate::error::{FrameError, Result};

/// HTTP client bound to one photo server origin.
#[derive(Debug, Clone)]
pub struct FrameClient {
    client: Client,
    base_url: String,
}

impl FrameClient {
    /// Create a client for the server at `base_url`.
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(USER_AGENT, HeaderValue::from_static("photoframe"));

        let client = Client::builder()
            .default_headers(headers)
            .timeout(timeout)
            .build()
            .map_err(FrameError::Http)?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    /// The server origin, without a trailing slash.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Make a GET request to a server endpoint.
    pub async fn get(&self, endpoint: &str) -> Result<Response> {
        let url = format!("{}{}", self.base_url, endpoint);
        self.get_url(&url).await
    }

    /// Make a GET request to an absolute url (photos may live on another host).
    pub async fn get_url(&self, url: &str) -> Result<Response> {
        let response = self.client.get(url).send().await.map_err(FrameError::Http)?;
        self.check_response(response)
    }

    /// Make a DELETE request to a server endpoint.
    pub async fn delete(&self, endpoint: &str) -> Result<Response> {
        let url = format!("{}{}", self.base_url, endpoint);
        let response = self
            .client
            .delete(&url)
            .send()
            .await
            .map_err(FrameError::Http)?;
        Ok(response)
    }

    /// Check response status and convert errors.
    fn check_response(&self, response: Response) -> Result<Response> {
        match response.status() {
            status if status.is_success() => Ok(response),
            StatusCode::NOT_FOUND => Err(FrameError::NotFound(response.url().to_string())),
            status => Err(FrameError::Status {
                status: status.as_u16(),
                url: response.url().to_string(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_url_trimmed() {
        let client = FrameClient::new("http://frame.local:3000/", Duration::from_secs(5)).unwrap();
        assert_eq!(client.base_url(), "http://frame.local:3000");
    }
}
