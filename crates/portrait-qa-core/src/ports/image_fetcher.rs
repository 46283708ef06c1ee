//! Remote image fetching port.

use async_trait::async_trait;

use crate::domain::ExternalServiceError;

/// Bytes fetched from a URL.
#[derive(Debug, Clone)]
pub struct FetchedImage {
    /// Response body.
    pub bytes: Vec<u8>,
    /// Content type declared by the server.
    pub content_type: Option<String>,
}

/// Port for downloading images referenced by URL.
#[async_trait]
pub trait ImageFetcher: Send + Sync {
    /// Downloads the image at `url`.
    ///
    /// # Errors
    ///
    /// Returns an error when the download fails or the server refuses it.
    async fn fetch(&self, url: &str) -> Result<FetchedImage, ExternalServiceError>;
}
