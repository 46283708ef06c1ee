//! HTTP image fetcher.

use async_trait::async_trait;
use portrait_qa_core::domain::ExternalServiceError;
use portrait_qa_core::ports::{FetchedImage, ImageFetcher};
use reqwest::header::CONTENT_TYPE;
use reqwest::Client;
use tracing::debug;

use crate::http::{malformed, send_with_retries, transport_error, HttpSettings};

/// Largest body accepted by default. Anything bigger fails integrity anyway.
pub const DEFAULT_MAX_FETCH_BYTES: u64 = 25 * 1024 * 1024;

/// Downloads images referenced by URL.
pub struct HttpImageFetcher {
    client: Client,
    settings: HttpSettings,
    max_bytes: u64,
}

impl HttpImageFetcher {
    /// Creates a fetcher.
    ///
    /// # Errors
    ///
    /// Returns an error when the HTTP client cannot be built.
    pub fn new(settings: HttpSettings) -> Result<Self, ExternalServiceError> {
        Ok(Self {
            client: settings.client("fetcher")?,
            settings,
            max_bytes: DEFAULT_MAX_FETCH_BYTES,
        })
    }

    /// Caps the accepted body size.
    #[must_use]
    pub const fn with_max_bytes(mut self, max_bytes: u64) -> Self {
        self.max_bytes = max_bytes;
        self
    }
}

#[async_trait]
impl ImageFetcher for HttpImageFetcher {
    async fn fetch(&self, url: &str) -> Result<FetchedImage, ExternalServiceError> {
        let response =
            send_with_retries("fetcher", &self.settings, || self.client.get(url)).await?;
        if response.content_length().is_some_and(|len| len > self.max_bytes) {
            return Err(malformed("fetcher", format!("body exceeds {} bytes", self.max_bytes)));
        }
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|v| v.split(';').next().unwrap_or(v).trim().to_string());
        let bytes = response
            .bytes()
            .await
            .map_err(|e| transport_error("fetcher", &self.settings, &e))?;
        if bytes.len() as u64 > self.max_bytes {
            return Err(malformed("fetcher", format!("body exceeds {} bytes", self.max_bytes)));
        }
        debug!(url, bytes = bytes.len(), content_type = ?content_type, "image fetched");
        Ok(FetchedImage {
            bytes: bytes.to_vec(),
            content_type,
        })
    }
}
