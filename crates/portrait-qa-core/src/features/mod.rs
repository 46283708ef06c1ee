//! Feature extraction over one or two external providers.

mod normalize;
mod payload;

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info};

pub use normalize::{merge_context, normalize, normalize_annotation, normalize_deep};
pub use payload::{
    AgeAnnotation, AnnotationPayload, AttributeGuess, BoundingPoly, DeepAnalysisPayload, DeepFace,
    EntityAnnotation, FaceAnnotation, GenderAnnotation, Landmark, ObjectAnnotation, Position,
    SafeSearchAnnotation, TextAnnotation, Vertex,
};

use crate::domain::{ExternalServiceError, ExtractionError, FeatureReport, FeatureSource};
use crate::ports::{FeatureProvider, ProviderRequest};

/// Default bound on each outbound provider call.
pub const DEFAULT_PROVIDER_TIMEOUT: Duration = Duration::from_secs(10);

/// Calls the primary provider and, when it finds no face, the fallback once.
#[derive(Clone)]
pub struct FeatureExtractionAdapter {
    primary: Arc<dyn FeatureProvider>,
    fallback: Option<Arc<dyn FeatureProvider>>,
    timeout: Duration,
}

impl FeatureExtractionAdapter {
    /// Creates an adapter over a single provider.
    #[must_use]
    pub fn new(primary: Arc<dyn FeatureProvider>) -> Self {
        Self {
            primary,
            fallback: None,
            timeout: DEFAULT_PROVIDER_TIMEOUT,
        }
    }

    /// Adds a deep-analysis provider consulted when the primary finds no face.
    #[must_use]
    pub fn with_fallback(mut self, fallback: Arc<dyn FeatureProvider>) -> Self {
        self.fallback = Some(fallback);
        self
    }

    /// Sets the per-call timeout.
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Produces the feature report for one image.
    ///
    /// # Errors
    ///
    /// Returns [`ExtractionError::NoFeaturesDetected`] when no provider found a
    /// face, and [`ExtractionError::ExternalService`] when a provider failed or
    /// timed out.
    pub async fn extract(
        &self,
        request: &ProviderRequest,
    ) -> Result<FeatureReport, ExtractionError> {
        let primary = self
            .call(self.primary.as_ref(), request, FeatureSource::Primary)
            .await?;
        if !primary.faces.is_empty() {
            debug!(faces = primary.face_count(), "primary provider found faces");
            return Ok(primary);
        }

        let Some(fallback) = &self.fallback else {
            debug!("primary provider found no face and no fallback is configured");
            return Err(ExtractionError::NoFeaturesDetected);
        };
        info!(provider = fallback.name(), "primary provider found no face, trying fallback");
        let mut report = self
            .call(fallback.as_ref(), request, FeatureSource::Fallback)
            .await?;
        if report.faces.is_empty() {
            return Err(ExtractionError::NoFeaturesDetected);
        }
        merge_context(&mut report, primary);
        Ok(report)
    }

    async fn call(
        &self,
        provider: &dyn FeatureProvider,
        request: &ProviderRequest,
        source: FeatureSource,
    ) -> Result<FeatureReport, ExternalServiceError> {
        let response = tokio::time::timeout(self.timeout, provider.detect(request))
            .await
            .map_err(|_| ExternalServiceError::Timeout {
                service: provider.name().to_string(),
                timeout: self.timeout,
            })??;
        let mut report = normalize(&response, request.width, request.height);
        report.source = source;
        Ok(report)
    }
}

#[cfg(test)]
#[allow(clippy::expect_used)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;

    use super::*;
    use crate::ports::ProviderResponse;

    struct Canned {
        name: &'static str,
        faces: usize,
        delay: Duration,
        calls: AtomicUsize,
    }

    impl Canned {
        fn new(name: &'static str, faces: usize) -> Arc<Self> {
            Arc::new(Self {
                name,
                faces,
                delay: Duration::ZERO,
                calls: AtomicUsize::new(0),
            })
        }
    }

    #[async_trait]
    impl FeatureProvider for Canned {
        fn name(&self) -> &str {
            self.name
        }

        async fn detect(
            &self,
            _request: &ProviderRequest,
        ) -> Result<ProviderResponse, ExternalServiceError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(self.delay).await;
            let faces = (0..self.faces)
                .map(|_| FaceAnnotation {
                    bounding_poly: BoundingPoly {
                        vertices: vec![Vertex { x: 10.0, y: 10.0 }, Vertex { x: 60.0, y: 70.0 }],
                        normalized_vertices: Vec::new(),
                    },
                    detection_confidence: 0.9,
                    ..FaceAnnotation::default()
                })
                .collect();
            Ok(ProviderResponse::Annotation(AnnotationPayload {
                face_annotations: faces,
                text_annotations: vec![TextAnnotation {
                    description: "hello".into(),
                    bounding_poly: None,
                }],
                ..AnnotationPayload::default()
            }))
        }
    }

    fn request() -> ProviderRequest {
        ProviderRequest {
            bytes: Arc::new(vec![0u8; 4]),
            mime: "image/jpeg".into(),
            url: None,
            width: 100,
            height: 100,
        }
    }

    #[tokio::test]
    async fn test_primary_with_face_skips_fallback() {
        let fallback = Canned::new("deep", 1);
        let adapter = FeatureExtractionAdapter::new(Canned::new("vision", 1))
            .with_fallback(fallback.clone());
        let report = adapter.extract(&request()).await.expect("extract");
        assert_eq!(report.source, FeatureSource::Primary);
        assert_eq!(fallback.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_fallback_used_once_when_primary_finds_nothing() {
        let fallback = Canned::new("deep", 1);
        let adapter = FeatureExtractionAdapter::new(Canned::new("vision", 0))
            .with_fallback(fallback.clone());
        let report = adapter.extract(&request()).await.expect("extract");
        assert_eq!(report.source, FeatureSource::Fallback);
        assert_eq!(report.face_count(), 1);
        assert_eq!(fallback.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_no_face_anywhere() {
        let adapter = FeatureExtractionAdapter::new(Canned::new("vision", 0))
            .with_fallback(Canned::new("deep", 0));
        let err = adapter.extract(&request()).await.expect_err("no faces");
        assert!(matches!(err, ExtractionError::NoFeaturesDetected));
    }

    #[tokio::test]
    async fn test_slow_provider_times_out() {
        let slow = Arc::new(Canned {
            name: "vision",
            faces: 1,
            delay: Duration::from_secs(30),
            calls: AtomicUsize::new(0),
        });
        let adapter = FeatureExtractionAdapter::new(slow).with_timeout(Duration::from_millis(50));
        let err = adapter.extract(&request()).await.expect_err("timeout");
        assert!(matches!(
            err,
            ExtractionError::ExternalService(ExternalServiceError::Timeout { .. })
        ));
    }
}
