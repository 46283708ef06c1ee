//! Feature detection provider port.

use std::sync::Arc;

use async_trait::async_trait;

use crate::domain::ExternalServiceError;
use crate::features::{AnnotationPayload, DeepAnalysisPayload};

/// What a provider is asked to analyse.
#[derive(Debug, Clone)]
pub struct ProviderRequest {
    /// Encoded image bytes.
    pub bytes: Arc<Vec<u8>>,
    /// Sniffed MIME type.
    pub mime: String,
    /// Reachable URL of the temporary upload, when one exists.
    pub url: Option<String>,
    /// Image width in pixels.
    pub width: u32,
    /// Image height in pixels.
    pub height: u32,
}

/// Provider-native answer, translated into a feature report by the adapter.
#[derive(Debug, Clone)]
pub enum ProviderResponse {
    /// Face, label, text and safe-search annotations.
    Annotation(AnnotationPayload),
    /// Deep visual analysis with attribute guesses.
    Deep(DeepAnalysisPayload),
}

/// Port for an external detection or analysis service.
#[async_trait]
pub trait FeatureProvider: Send + Sync {
    /// Name used in logs and error messages.
    fn name(&self) -> &str;

    /// Analyses one image.
    ///
    /// # Errors
    ///
    /// Returns an error when the service is unreachable, answers with a
    /// non-success status or sends a payload that cannot be parsed.
    async fn detect(
        &self,
        request: &ProviderRequest,
    ) -> Result<ProviderResponse, ExternalServiceError>;
}
