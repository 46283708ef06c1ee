//! Integration tests for the filesystem object store.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::time::Duration;

use portrait_qa_adapters::FsObjectStorage;
use portrait_qa_core::ObjectStorage;

#[tokio::test]
async fn test_put_exists_delete() {
    let dir = tempfile::tempdir().unwrap();
    let store = FsObjectStorage::new(dir.path());

    let url = store
        .put(b"jpeg bytes", "tmp/user-1/VAL_X.jpg", "image/jpeg")
        .await
        .expect("put");
    assert!(url.starts_with("file://"));
    assert!(url.ends_with("tmp/user-1/VAL_X.jpg"));
    assert!(store.exists("tmp/user-1/VAL_X.jpg").await.unwrap());
    assert_eq!(
        std::fs::read(dir.path().join("tmp/user-1/VAL_X.jpg")).unwrap(),
        b"jpeg bytes"
    );

    store.delete("tmp/user-1/VAL_X.jpg").await.expect("delete");
    assert!(!store.exists("tmp/user-1/VAL_X.jpg").await.unwrap());
}

#[tokio::test]
async fn test_delete_missing_key_succeeds() {
    let dir = tempfile::tempdir().unwrap();
    let store = FsObjectStorage::new(dir.path());
    store.delete("tmp/nobody/none.jpg").await.expect("idempotent delete");
}

#[tokio::test]
async fn test_presign_requires_object() {
    let dir = tempfile::tempdir().unwrap();
    let store = FsObjectStorage::new(dir.path());

    let err = store
        .presign("validated/u/a.jpg", Duration::from_secs(60))
        .await
        .expect_err("missing object");
    assert_eq!(err.operation, "presign");

    store.put(b"x", "validated/u/a.jpg", "image/jpeg").await.unwrap();
    let url = store
        .presign("validated/u/a.jpg", Duration::from_secs(60))
        .await
        .expect("presign");
    assert!(url.contains("validated/u/a.jpg?expires="));
}

#[tokio::test]
async fn test_escaping_keys_are_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let store = FsObjectStorage::new(dir.path().join("bucket"));
    assert!(store.put(b"x", "../outside.jpg", "image/jpeg").await.is_err());
    assert!(!dir.path().join("outside.jpg").exists());
}
