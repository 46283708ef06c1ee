//! Filesystem-backed object storage.
//!
//! Keys map to paths below a root directory and URLs are `file://` URLs.
//! Presigned URLs carry their expiry as a query parameter; nothing enforces
//! it locally.

use std::io::ErrorKind;
use std::path::{Component, Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use portrait_qa_core::domain::StorageError;
use portrait_qa_core::ports::ObjectStorage;
use time::OffsetDateTime;
use tracing::debug;

/// Object storage rooted at a local directory.
#[derive(Debug, Clone)]
pub struct FsObjectStorage {
    root: PathBuf,
}

impl FsObjectStorage {
    /// Creates a store below `root`. The directory is created on first write.
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Directory holding all objects.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolves a key, rejecting keys that would escape the root.
    fn path_for(&self, operation: &'static str, key: &str) -> Result<PathBuf, StorageError> {
        let relative = Path::new(key);
        let safe = !key.is_empty()
            && relative
                .components()
                .all(|c| matches!(c, Component::Normal(_)));
        if !safe {
            return Err(StorageError::new(operation, key, "invalid key"));
        }
        Ok(self.root.join(relative))
    }

    fn url_for(path: &Path) -> String {
        let absolute = std::path::absolute(path).unwrap_or_else(|_| path.to_path_buf());
        format!("file://{}", absolute.display())
    }
}

#[async_trait]
impl ObjectStorage for FsObjectStorage {
    async fn put(
        &self,
        bytes: &[u8],
        key: &str,
        content_type: &str,
    ) -> Result<String, StorageError> {
        let path = self.path_for("put", key)?;
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| StorageError::new("put", key, e))?;
        }
        tokio::fs::write(&path, bytes)
            .await
            .map_err(|e| StorageError::new("put", key, e))?;
        debug!(key, content_type, bytes = bytes.len(), "object stored");
        Ok(Self::url_for(&path))
    }

    async fn delete(&self, key: &str) -> Result<(), StorageError> {
        let path = self.path_for("delete", key)?;
        match tokio::fs::remove_file(&path).await {
            Ok(()) => {
                debug!(key, "object deleted");
                Ok(())
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(StorageError::new("delete", key, e)),
        }
    }

    async fn exists(&self, key: &str) -> Result<bool, StorageError> {
        let path = self.path_for("exists", key)?;
        tokio::fs::try_exists(&path)
            .await
            .map_err(|e| StorageError::new("exists", key, e))
    }

    async fn presign(&self, key: &str, ttl: Duration) -> Result<String, StorageError> {
        if !self.exists(key).await? {
            return Err(StorageError::new("presign", key, "no such object"));
        }
        let path = self.path_for("presign", key)?;
        let expires = OffsetDateTime::now_utc() + ttl;
        Ok(format!(
            "{}?expires={}",
            Self::url_for(&path),
            expires.unix_timestamp()
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_path_for_rejects_escapes() {
        let store = FsObjectStorage::new("/data");
        assert!(store.path_for("put", "tmp/user/a.jpg").is_ok());
        assert!(store.path_for("put", "../etc/passwd").is_err());
        assert!(store.path_for("put", "/etc/passwd").is_err());
        assert!(store.path_for("put", "tmp/./a.jpg").is_ok());
        assert!(store.path_for("put", "").is_err());
    }
}
