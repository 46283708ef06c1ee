//! Object storage port.

use std::time::Duration;

use async_trait::async_trait;

use crate::domain::StorageError;

/// Port for the bucket holding temporary and promoted images.
#[async_trait]
pub trait ObjectStorage: Send + Sync {
    /// Stores `bytes` under `key` and returns a URL for it.
    ///
    /// # Errors
    ///
    /// Returns an error when the write fails.
    async fn put(
        &self,
        bytes: &[u8],
        key: &str,
        content_type: &str,
    ) -> Result<String, StorageError>;

    /// Removes `key`. Removing a missing key succeeds.
    ///
    /// # Errors
    ///
    /// Returns an error when the delete fails.
    async fn delete(&self, key: &str) -> Result<(), StorageError>;

    /// Checks whether `key` exists.
    ///
    /// # Errors
    ///
    /// Returns an error when the lookup fails.
    async fn exists(&self, key: &str) -> Result<bool, StorageError>;

    /// Returns a URL granting read access to `key` for `ttl`.
    ///
    /// # Errors
    ///
    /// Returns an error when the key does not exist or signing fails.
    async fn presign(&self, key: &str, ttl: Duration) -> Result<String, StorageError>;
}
