//! HTTP feature providers.
//!
//! [`VisionProvider`] speaks the batch image-annotation protocol (one request
//! with a list of feature types, one response per image). [`DeepAnalysisProvider`]
//! posts the image to a single analysis endpoint and reads back faces plus
//! attribute guesses.

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use portrait_qa_core::domain::ExternalServiceError;
use portrait_qa_core::features::{AnnotationPayload, DeepAnalysisPayload};
use portrait_qa_core::ports::{FeatureProvider, ProviderRequest, ProviderResponse};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::http::{malformed, send_with_retries, HttpSettings};

const FEATURES: &[(&str, u32)] = &[
    ("FACE_DETECTION", 10),
    ("LABEL_DETECTION", 20),
    ("TEXT_DETECTION", 10),
    ("SAFE_SEARCH_DETECTION", 1),
    ("OBJECT_LOCALIZATION", 10),
];

#[derive(Serialize)]
struct AnnotateBatch<'a> {
    requests: [AnnotateRequest<'a>; 1],
}

#[derive(Serialize)]
struct AnnotateRequest<'a> {
    image: ImageBody<'a>,
    features: Vec<FeatureBody>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ImageBody<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    source: Option<ImageUri<'a>>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ImageUri<'a> {
    image_uri: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct FeatureBody {
    #[serde(rename = "type")]
    kind: &'static str,
    max_results: u32,
}

#[derive(Deserialize)]
struct AnnotateBatchResponse {
    #[serde(default)]
    responses: Vec<AnnotateResponse>,
}

#[derive(Deserialize)]
struct AnnotateResponse {
    #[serde(flatten)]
    payload: AnnotationPayload,
    error: Option<RemoteStatus>,
}

#[derive(Deserialize)]
struct RemoteStatus {
    #[serde(default)]
    message: String,
}

/// Primary provider: batch image annotation over HTTP.
pub struct VisionProvider {
    client: Client,
    endpoint: String,
    settings: HttpSettings,
}

impl VisionProvider {
    /// Creates a provider posting to `endpoint`.
    ///
    /// # Errors
    ///
    /// Returns an error when the HTTP client cannot be built.
    pub fn new(
        endpoint: impl Into<String>,
        settings: HttpSettings,
    ) -> Result<Self, ExternalServiceError> {
        Ok(Self {
            client: settings.client("vision")?,
            endpoint: endpoint.into(),
            settings,
        })
    }

    fn body<'a>(request: &'a ProviderRequest) -> AnnotateBatch<'a> {
        // file:// uploads are not reachable by the provider.
        let remote = request
            .url
            .as_deref()
            .filter(|u| u.starts_with("https://") || u.starts_with("http://"));
        let image = match remote {
            Some(image_uri) => ImageBody {
                content: None,
                source: Some(ImageUri { image_uri }),
            },
            None => ImageBody {
                content: Some(BASE64.encode(request.bytes.as_slice())),
                source: None,
            },
        };
        AnnotateBatch {
            requests: [AnnotateRequest {
                image,
                features: FEATURES
                    .iter()
                    .map(|&(kind, max_results)| FeatureBody { kind, max_results })
                    .collect(),
            }],
        }
    }
}

#[async_trait]
impl FeatureProvider for VisionProvider {
    fn name(&self) -> &str {
        "vision"
    }

    async fn detect(
        &self,
        request: &ProviderRequest,
    ) -> Result<ProviderResponse, ExternalServiceError> {
        let body = Self::body(request);
        let response = send_with_retries(self.name(), &self.settings, || {
            let builder = self.client.post(&self.endpoint).json(&body);
            match &self.settings.api_key {
                Some(key) => builder.query(&[("key", key)]),
                None => builder,
            }
        })
        .await?;

        let batch: AnnotateBatchResponse = response
            .json()
            .await
            .map_err(|e| malformed(self.name(), e))?;
        let first = batch
            .responses
            .into_iter()
            .next()
            .ok_or_else(|| malformed(self.name(), "empty response list"))?;
        if let Some(status) = first.error {
            return Err(malformed(self.name(), status.message));
        }
        debug!(
            faces = first.payload.face_annotations.len(),
            labels = first.payload.label_annotations.len(),
            "vision annotation received"
        );
        Ok(ProviderResponse::Annotation(first.payload))
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct DeepRequest<'a> {
    image: String,
    mime_type: &'a str,
    width: u32,
    height: u32,
}

/// Fallback provider: deep face and attribute analysis over HTTP.
pub struct DeepAnalysisProvider {
    client: Client,
    endpoint: String,
    settings: HttpSettings,
}

impl DeepAnalysisProvider {
    /// Creates a provider posting to `endpoint`.
    ///
    /// # Errors
    ///
    /// Returns an error when the HTTP client cannot be built.
    pub fn new(
        endpoint: impl Into<String>,
        settings: HttpSettings,
    ) -> Result<Self, ExternalServiceError> {
        Ok(Self {
            client: settings.client("deep-analysis")?,
            endpoint: endpoint.into(),
            settings,
        })
    }
}

#[async_trait]
impl FeatureProvider for DeepAnalysisProvider {
    fn name(&self) -> &str {
        "deep-analysis"
    }

    async fn detect(
        &self,
        request: &ProviderRequest,
    ) -> Result<ProviderResponse, ExternalServiceError> {
        let body = DeepRequest {
            image: BASE64.encode(request.bytes.as_slice()),
            mime_type: &request.mime,
            width: request.width,
            height: request.height,
        };
        let response = send_with_retries(self.name(), &self.settings, || {
            let builder = self.client.post(&self.endpoint).json(&body);
            match &self.settings.api_key {
                Some(key) => builder.bearer_auth(key),
                None => builder,
            }
        })
        .await?;

        let payload: DeepAnalysisPayload = response
            .json()
            .await
            .map_err(|e| malformed(self.name(), e))?;
        debug!(faces = payload.faces.len(), "deep analysis received");
        Ok(ProviderResponse::Deep(payload))
    }
}
