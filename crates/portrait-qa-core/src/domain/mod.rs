//! Core domain types for portrait validation.

mod characteristics;
mod enhancement;
mod error;
mod features;
mod image;
mod options;
mod report;
mod step;

pub use characteristics::{
    Characteristic, CharacteristicDecision, CharacteristicSet, ConfidenceTier,
};
pub use enhancement::{
    EnhancedImage, EnhancementKind, EnhancementPlan, EnhancementStep, OutputFormat,
    StandardImageSpec,
};
pub use error::{
    EnhancementError, ErrorKind, ExternalServiceError, ExtractionError, PipelineError,
    StorageError,
};
pub use features::{
    AgeEstimate, ContentSafety, EmotionLikelihoods, FaceFeatures, FeatureReport, FeatureSource,
    Gender, GenderEstimate, LabelGuess, Likelihood, Point3, PoseAngles, TextBlock,
};
pub use image::{BoundingBox, ImageDimensions, ImageInput, ImageReference};
pub use options::{EnhancementLevel, ValidationOptions};
pub use report::{
    Analysis, ArtifactMetrics, ColorMetrics, DataQuality, EnhancementSummary, FocusMetrics,
    LightingMetrics, QualityMetrics, TextureMetrics, ValidationReport, ValidationResult,
};
pub use step::{Metrics, StepName, StepResult};
