//! Error taxonomy.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::StepName;

/// Category of a failure, as surfaced to callers.
#[non_exhaustive]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Bad format, size or resolution.
    InputError,
    /// Embedded location data, disallowed watermark or overlay.
    PrivacyError,
    /// Corrupt or unreadable bytes.
    IntegrityError,
    /// No face, too many faces, age out of range.
    HumanAnalysisError,
    /// Inappropriate content.
    SafetyError,
    /// Below the usability threshold.
    SuitabilityError,
    /// Provider unreachable, timed out or returned garbage.
    ExternalServiceError,
    /// The executor produced a non-conformant asset.
    EnhancementInvariantViolation,
    /// A validation step faulted or panicked.
    InternalError,
}

impl ErrorKind {
    /// Kind of a hard error raised by the given step.
    #[must_use]
    pub fn for_step(step: StepName, message: &str) -> Self {
        let lower = message.to_ascii_lowercase();
        if lower.contains("external service") {
            return Self::ExternalServiceError;
        }
        if lower.contains("step failed unexpectedly") {
            return Self::InternalError;
        }
        match step {
            StepName::BasicIntegrity if lower.contains("corrupt") => Self::IntegrityError,
            StepName::BasicIntegrity | StepName::QualityMetrics | StepName::Composition => {
                Self::InputError
            }
            StepName::MetadataPrivacy => Self::PrivacyError,
            StepName::HumanFeatureAnalysis => Self::HumanAnalysisError,
            StepName::Safety
                if lower.contains("watermark")
                    || lower.contains("text overlay")
                    || lower.contains("personal information") =>
            {
                Self::PrivacyError
            }
            StepName::Safety => Self::SafetyError,
            StepName::PersonalizationSuitability => Self::SuitabilityError,
        }
    }
}

/// Failure talking to an external provider or fetcher.
#[derive(Debug, Clone, Error)]
pub enum ExternalServiceError {
    /// The request could not be sent or the connection failed.
    #[error("{service} unreachable: {reason}")]
    Unreachable {
        /// Service name.
        service: String,
        /// Underlying cause.
        reason: String,
    },

    /// The call did not complete within the bound.
    #[error("{service} timed out after {}ms", timeout.as_millis())]
    Timeout {
        /// Service name.
        service: String,
        /// Bound that was exceeded.
        timeout: Duration,
    },

    /// Non-success HTTP status.
    #[error("{service} returned status {status}")]
    Status {
        /// Service name.
        service: String,
        /// HTTP status code.
        status: u16,
    },

    /// The response body could not be understood.
    #[error("{service} returned a malformed payload: {reason}")]
    Malformed {
        /// Service name.
        service: String,
        /// Parse failure.
        reason: String,
    },
}

/// Outcome of feature extraction other than a report with faces.
#[derive(Debug, Clone, Error)]
pub enum ExtractionError {
    /// Providers answered but found no face. Not a fault.
    #[error("no features detected")]
    NoFeaturesDetected,

    /// Providers could not be used.
    #[error(transparent)]
    ExternalService(#[from] ExternalServiceError),
}

/// Object-storage failure.
#[derive(Debug, Clone, Error)]
#[error("storage {operation} failed for '{key}': {reason}")]
pub struct StorageError {
    /// Operation that failed.
    pub operation: &'static str,
    /// Object key.
    pub key: String,
    /// Underlying cause.
    pub reason: String,
}

impl StorageError {
    /// Creates a new storage error.
    #[must_use]
    pub fn new(operation: &'static str, key: impl Into<String>, reason: impl ToString) -> Self {
        Self {
            operation,
            key: key.into(),
            reason: reason.to_string(),
        }
    }
}

/// Enhancement executor failure.
#[derive(Debug, Clone, Error)]
pub enum EnhancementError {
    /// Output does not satisfy the standard image spec.
    #[error("enhanced image violates the standard spec: {0}")]
    InvariantViolation(String),

    /// Encoding the output failed.
    #[error("failed to encode enhanced image: {0}")]
    Encode(String),

    /// Nothing to work on.
    #[error("image has zero dimensions")]
    EmptyImage,
}

impl EnhancementError {
    /// Kind reported to callers.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        ErrorKind::EnhancementInvariantViolation
    }
}

/// Failure of a whole validation call.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// The input bytes are corrupt or unreadable.
    #[error("image integrity: {0}")]
    Integrity(String),

    /// Options were rejected.
    #[error("invalid options: {0}")]
    InvalidOptions(String),

    /// A provider or fetcher failed and strict mode is on.
    #[error(transparent)]
    ExternalService(#[from] ExternalServiceError),

    /// Object storage failed.
    #[error(transparent)]
    Storage(#[from] StorageError),

    /// A validator faulted and strict mode is on.
    #[error("step {step} faulted: {message}")]
    StepFault {
        /// Step that faulted.
        step: StepName,
        /// Fault description.
        message: String,
    },

    /// A worker task panicked or was cancelled unexpectedly.
    #[error("worker task failed: {0}")]
    Task(String),
}

impl PipelineError {
    /// Kind reported to callers.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::Integrity(_) => ErrorKind::IntegrityError,
            Self::InvalidOptions(_) => ErrorKind::InputError,
            Self::ExternalService(_) | Self::Storage(_) => ErrorKind::ExternalServiceError,
            Self::StepFault { .. } | Self::Task(_) => ErrorKind::InternalError,
        }
    }
}
