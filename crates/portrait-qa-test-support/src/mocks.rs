//! Mock implementations of core port traits.

use std::collections::{BTreeMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use portrait_qa_core::domain::{ExternalServiceError, StorageError, ValidationResult};
use portrait_qa_core::ports::{
    FeatureProvider, FetchedImage, ImageFetcher, ImageSource, ObjectStorage, ProgressEvent,
    ProgressSink, ProviderRequest, ProviderResponse, ResultOutput, SourceImage,
};

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Feature provider answering from a script.
///
/// Each call pops the next scripted answer; the last one repeats.
pub struct MockFeatureProvider {
    name: String,
    script: Mutex<VecDeque<Result<ProviderResponse, ExternalServiceError>>>,
    delay: Duration,
    calls: AtomicUsize,
    last_request: Mutex<Option<ProviderRequest>>,
}

impl MockFeatureProvider {
    /// Provider that always answers `response`.
    #[must_use]
    pub fn answering(name: &str, response: ProviderResponse) -> Self {
        Self::scripted(name, vec![Ok(response)])
    }

    /// Provider that always fails with a 503.
    #[must_use]
    pub fn failing(name: &str) -> Self {
        Self::scripted(
            name,
            vec![Err(ExternalServiceError::Status {
                service: name.to_string(),
                status: 503,
            })],
        )
    }

    /// Provider answering each call with the next scripted entry.
    #[must_use]
    pub fn scripted(
        name: &str,
        script: Vec<Result<ProviderResponse, ExternalServiceError>>,
    ) -> Self {
        Self {
            name: name.to_string(),
            script: Mutex::new(script.into()),
            delay: Duration::ZERO,
            calls: AtomicUsize::new(0),
            last_request: Mutex::new(None),
        }
    }

    /// Sleeps before every answer.
    #[must_use]
    pub const fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Number of `detect` calls so far.
    #[must_use]
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// The most recent request.
    #[must_use]
    pub fn last_request(&self) -> Option<ProviderRequest> {
        lock(&self.last_request).clone()
    }
}

#[async_trait]
impl FeatureProvider for MockFeatureProvider {
    fn name(&self) -> &str {
        &self.name
    }

    async fn detect(
        &self,
        request: &ProviderRequest,
    ) -> Result<ProviderResponse, ExternalServiceError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        *lock(&self.last_request) = Some(request.clone());
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        let mut script = lock(&self.script);
        let next = if script.len() > 1 {
            script.pop_front()
        } else {
            script.front().cloned()
        };
        next.unwrap_or_else(|| {
            Err(ExternalServiceError::Malformed {
                service: self.name.clone(),
                reason: "script exhausted".into(),
            })
        })
    }
}

/// In-memory object store that records every operation.
#[derive(Default)]
pub struct MemoryObjectStorage {
    objects: Mutex<BTreeMap<String, (Vec<u8>, String)>>,
    deleted: Mutex<Vec<String>>,
    fail_puts_with_prefix: Mutex<Option<String>>,
    fail_deletes: Mutex<bool>,
}

impl MemoryObjectStorage {
    /// Empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every `put` whose key starts with `prefix` fail.
    #[must_use]
    pub fn failing_puts(self, prefix: &str) -> Self {
        *lock(&self.fail_puts_with_prefix) = Some(prefix.to_string());
        self
    }

    /// Makes every `delete` fail.
    #[must_use]
    pub fn failing_deletes(self) -> Self {
        *lock(&self.fail_deletes) = true;
        self
    }

    /// Keys currently stored.
    #[must_use]
    pub fn keys(&self) -> Vec<String> {
        lock(&self.objects).keys().cloned().collect()
    }

    /// Keys passed to `delete`, in order.
    #[must_use]
    pub fn deleted(&self) -> Vec<String> {
        lock(&self.deleted).clone()
    }

    /// Bytes and content type stored under `key`.
    #[must_use]
    pub fn object(&self, key: &str) -> Option<(Vec<u8>, String)> {
        lock(&self.objects).get(key).cloned()
    }
}

#[async_trait]
impl ObjectStorage for MemoryObjectStorage {
    async fn put(
        &self,
        bytes: &[u8],
        key: &str,
        content_type: &str,
    ) -> Result<String, StorageError> {
        if let Some(prefix) = lock(&self.fail_puts_with_prefix).as_deref() {
            if key.starts_with(prefix) {
                return Err(StorageError::new("put", key, "injected failure"));
            }
        }
        lock(&self.objects).insert(key.to_string(), (bytes.to_vec(), content_type.to_string()));
        Ok(format!("mem://bucket/{key}"))
    }

    async fn delete(&self, key: &str) -> Result<(), StorageError> {
        lock(&self.deleted).push(key.to_string());
        if *lock(&self.fail_deletes) {
            return Err(StorageError::new("delete", key, "injected failure"));
        }
        lock(&self.objects).remove(key);
        Ok(())
    }

    async fn exists(&self, key: &str) -> Result<bool, StorageError> {
        Ok(lock(&self.objects).contains_key(key))
    }

    async fn presign(&self, key: &str, ttl: Duration) -> Result<String, StorageError> {
        if !lock(&self.objects).contains_key(key) {
            return Err(StorageError::new("presign", key, "no such object"));
        }
        Ok(format!("mem://bucket/{key}?ttl={}", ttl.as_secs()))
    }
}

/// Fetcher serving canned bodies by URL.
#[derive(Default)]
pub struct MockImageFetcher {
    bodies: BTreeMap<String, FetchedImage>,
    requested: Mutex<Vec<String>>,
}

impl MockImageFetcher {
    /// Fetcher that knows no URL.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Serves `bytes` at `url`.
    #[must_use]
    pub fn serve(mut self, url: &str, bytes: Vec<u8>, content_type: Option<&str>) -> Self {
        self.bodies.insert(
            url.to_string(),
            FetchedImage {
                bytes,
                content_type: content_type.map(str::to_string),
            },
        );
        self
    }

    /// URLs requested so far.
    #[must_use]
    pub fn requested(&self) -> Vec<String> {
        lock(&self.requested).clone()
    }
}

#[async_trait]
impl ImageFetcher for MockImageFetcher {
    async fn fetch(&self, url: &str) -> Result<FetchedImage, ExternalServiceError> {
        lock(&self.requested).push(url.to_string());
        self.bodies
            .get(url)
            .cloned()
            .ok_or_else(|| ExternalServiceError::Status {
                service: "fetch".into(),
                status: 404,
            })
    }
}

/// Mock implementation of `ImageSource` for testing.
///
/// Yields pre-built images and tracks iteration for assertions.
pub struct MockImageSource {
    images: Vec<SourceImage>,
    iteration_count: AtomicUsize,
}

impl MockImageSource {
    /// Creates a new mock source with the given images.
    #[must_use]
    pub const fn new(images: Vec<SourceImage>) -> Self {
        Self {
            images,
            iteration_count: AtomicUsize::new(0),
        }
    }

    /// Creates a source from `(path, bytes)` pairs.
    #[must_use]
    pub fn from_bytes(images: Vec<(&str, Vec<u8>)>) -> Self {
        Self::new(
            images
                .into_iter()
                .map(|(path, bytes)| SourceImage {
                    path: path.to_string(),
                    bytes,
                })
                .collect(),
        )
    }

    /// Returns the number of times the source has been iterated.
    #[must_use]
    pub fn iteration_count(&self) -> usize {
        self.iteration_count.load(Ordering::SeqCst)
    }
}

impl ImageSource for MockImageSource {
    fn images(&self) -> Box<dyn Iterator<Item = anyhow::Result<SourceImage>> + Send + '_> {
        self.iteration_count.fetch_add(1, Ordering::SeqCst);
        Box::new(self.images.iter().cloned().map(Ok))
    }

    fn count_hint(&self) -> Option<usize> {
        Some(self.images.len())
    }
}

/// Mock implementation of `ResultOutput` for testing.
///
/// Captures results for later assertions.
#[derive(Default)]
pub struct MockResultOutput {
    results: Arc<Mutex<Vec<(String, ValidationResult)>>>,
    flush_count: AtomicUsize,
}

impl MockResultOutput {
    /// Creates a new mock output.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns all captured results with their paths.
    #[must_use]
    pub fn results(&self) -> Vec<(String, ValidationResult)> {
        lock(&self.results).clone()
    }

    /// Returns the number of times `flush()` was called.
    #[must_use]
    pub fn flush_count(&self) -> usize {
        self.flush_count.load(Ordering::SeqCst)
    }
}

impl ResultOutput for MockResultOutput {
    fn write(&self, path: &str, result: &ValidationResult) -> anyhow::Result<()> {
        lock(&self.results).push((path.to_string(), result.clone()));
        Ok(())
    }

    fn flush(&self) -> anyhow::Result<()> {
        self.flush_count.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// Mock implementation of `ProgressSink` for testing.
///
/// Captures events for later assertions.
#[derive(Default)]
pub struct MockProgressSink {
    events: Mutex<Vec<ProgressEvent>>,
}

impl MockProgressSink {
    /// Creates a new mock progress sink.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns all captured events.
    #[must_use]
    pub fn events(&self) -> Vec<ProgressEvent> {
        lock(&self.events).clone()
    }

    /// Returns the number of `Started` events.
    #[must_use]
    pub fn started_count(&self) -> usize {
        self.events()
            .iter()
            .filter(|e| matches!(e, ProgressEvent::Started { .. }))
            .count()
    }

    /// Returns the number of `Skipped` events.
    #[must_use]
    pub fn skipped_count(&self) -> usize {
        self.events()
            .iter()
            .filter(|e| matches!(e, ProgressEvent::Skipped { .. }))
            .count()
    }

    /// Returns `(valid, invalid, skipped)` from the `Finished` event, if any.
    #[must_use]
    pub fn finished_counts(&self) -> Option<(usize, usize, usize)> {
        self.events().iter().find_map(|e| match e {
            ProgressEvent::Finished {
                valid,
                invalid,
                skipped,
            } => Some((*valid, *invalid, *skipped)),
            _ => None,
        })
    }
}

impl ProgressSink for MockProgressSink {
    fn on_event(&self, event: ProgressEvent) {
        lock(&self.events).push(event);
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use portrait_qa_core::features::AnnotationPayload;

    fn request() -> ProviderRequest {
        ProviderRequest {
            bytes: Arc::new(vec![1, 2, 3]),
            mime: "image/jpeg".into(),
            url: None,
            width: 10,
            height: 10,
        }
    }

    #[tokio::test]
    async fn test_scripted_provider_repeats_last_answer() {
        let provider = MockFeatureProvider::scripted(
            "vision",
            vec![
                Err(ExternalServiceError::Status {
                    service: "vision".into(),
                    status: 500,
                }),
                Ok(ProviderResponse::Annotation(AnnotationPayload::default())),
            ],
        );
        assert!(provider.detect(&request()).await.is_err());
        assert!(provider.detect(&request()).await.is_ok());
        assert!(provider.detect(&request()).await.is_ok());
        assert_eq!(provider.calls(), 3);
        assert_eq!(provider.last_request().unwrap().width, 10);
    }

    #[tokio::test]
    async fn test_memory_storage_records_operations() {
        let store = MemoryObjectStorage::new().failing_puts("enhanced/");
        store.put(b"a", "tmp/u/x.jpg", "image/jpeg").await.unwrap();
        assert!(store.put(b"b", "enhanced/u/x.jpg", "image/jpeg").await.is_err());
        assert!(store.presign("tmp/u/x.jpg", Duration::from_secs(5)).await.is_ok());

        store.delete("tmp/u/x.jpg").await.unwrap();
        assert!(store.keys().is_empty());
        assert_eq!(store.deleted(), vec!["tmp/u/x.jpg".to_string()]);
    }

    #[tokio::test]
    async fn test_fetcher_unknown_url_is_not_found() {
        let fetcher = MockImageFetcher::new().serve("https://x/a.jpg", vec![1], Some("image/jpeg"));
        assert!(fetcher.fetch("https://x/a.jpg").await.is_ok());
        assert!(matches!(
            fetcher.fetch("https://x/b.jpg").await,
            Err(ExternalServiceError::Status { status: 404, .. })
        ));
        assert_eq!(fetcher.requested().len(), 2);
    }

    #[test]
    fn test_mock_image_source_counts_iterations() {
        let source = MockImageSource::from_bytes(vec![("a.jpg", vec![1]), ("b.jpg", vec![2])]);
        assert_eq!(source.count_hint(), Some(2));
        assert_eq!(source.images().count(), 2);
        assert_eq!(source.iteration_count(), 1);
    }

    #[test]
    fn test_mock_progress_sink() {
        let sink = MockProgressSink::new();
        sink.on_event(ProgressEvent::Started {
            path: "test.jpg".into(),
            index: 0,
            total: Some(1),
        });
        sink.on_event(ProgressEvent::Finished {
            valid: 1,
            invalid: 0,
            skipped: 0,
        });
        assert_eq!(sink.started_count(), 1);
        assert_eq!(sink.finished_counts(), Some((1, 0, 0)));
    }
}
