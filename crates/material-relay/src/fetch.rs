//! Source image fetching for the fetch-and-upload route

use crate::error::{RelayError, Result};
use crate::server::MAX_UPLOAD_BYTES;
use reqwest::Client;
use std::time::Duration;
use tracing::{debug, warn};
use url::Url;

const FETCH_TIMEOUT: Duration = Duration::from_secs(30);

/// HTTP client for downloading caller-supplied material URLs
pub struct SourceFetcher {
    client: Client,
    max_bytes: usize,
}

impl SourceFetcher {
    pub fn new() -> Self {
        Self::with_limit(MAX_UPLOAD_BYTES)
    }

    /// Create a fetcher that refuses sources larger than `max_bytes`
    pub fn with_limit(max_bytes: usize) -> Self {
        let client = Client::builder()
            .timeout(FETCH_TIMEOUT)
            .build()
            .expect("Failed to create HTTP client");
        Self { client, max_bytes }
    }

    /// Download `source` and return its bytes and content type
    pub async fn fetch(&self, source: &str) -> Result<(Vec<u8>, String)> {
        let url = parse_source_url(source)?;
        debug!(url = %url, "Fetching source material");

        let mut response = self
            .client
            .get(url.as_str())
            .send()
            .await
            .map_err(|e| RelayError::Fetch(e.to_string()))?;

        if !response.status().is_success() {
            warn!(status = %response.status(), url = %url, "Failed to fetch source material");
            return Err(RelayError::Fetch(format!(
                "Source returned status {}",
                response.status()
            )));
        }

        let content_type = response
            .headers()
            .get("content-type")
            .and_then(|v| v.to_str().ok())
            .unwrap_or("application/octet-stream")
            .to_string();

        if let Some(length) = response.content_length() {
            if length > self.max_bytes as u64 {
                warn!(size = length, url = %url, "Source material too large");
                return Err(self.too_large());
            }
        }

        // Content-Length is only advisory; the streamed total is the real bound
        let mut data = Vec::new();
        while let Some(chunk) = response
            .chunk()
            .await
            .map_err(|e| RelayError::Fetch(e.to_string()))?
        {
            if data.len() + chunk.len() > self.max_bytes {
                warn!(url = %url, "Source material exceeded the size limit while streaming");
                return Err(self.too_large());
            }
            data.extend_from_slice(&chunk);
        }

        debug!(
            size = data.len(),
            content_type = %content_type,
            "Fetched source material"
        );

        Ok((data, content_type))
    }

    fn too_large(&self) -> RelayError {
        RelayError::BadRequest(format!(
            "Source file exceeds the {} byte limit",
            self.max_bytes
        ))
    }
}

impl Default for SourceFetcher {
    fn default() -> Self {
        Self::new()
    }
}

/// Only absolute http(s) URLs are fetched
fn parse_source_url(source: &str) -> Result<Url> {
    let url = Url::parse(source)
        .map_err(|e| RelayError::BadRequest(format!("Invalid img URL: {}", e)))?;
    match url.scheme() {
        "http" | "https" => Ok(url),
        scheme => Err(RelayError::BadRequest(format!(
            "Unsupported img URL scheme: {}",
            scheme
        ))),
    }
}
