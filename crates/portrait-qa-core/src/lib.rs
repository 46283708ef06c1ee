//! Portrait QA Core - domain logic for portrait admissibility
//!
//! This crate contains the domain types, the validators that decide whether a
//! photo can serve as the reference for a personalised illustrated character,
//! the aggregation and characteristic extraction on top of them, and the
//! enhancement stage that produces the canonical output image.

pub mod aggregate;
pub mod analysis;
pub mod characteristics;
pub mod domain;
pub mod enhance;
pub mod features;
pub mod pipeline;
pub mod ports;
pub mod recommend;
pub mod validators;

#[cfg(test)]
mod testutil;

pub use aggregate::{AggregatorConfig, ConfidenceAggregator, ConfidenceWeights};
pub use characteristics::{CharacteristicConfig, CharacteristicExtractor};
pub use domain::{
    ErrorKind, FeatureReport, ImageInput, ImageReference, PipelineError, StandardImageSpec,
    StepName, StepResult, ValidationOptions, ValidationReport, ValidationResult,
};
pub use enhance::{EnhancementExecutor, EnhancementPlanner, PlannerConfig};
pub use features::FeatureExtractionAdapter;
pub use pipeline::{PipelineConfig, ValidationPipeline, ValidationRequest};
pub use ports::{
    FeatureProvider, ImageFetcher, ImageSource, ObjectStorage, ProgressEvent, ProgressSink,
    ResultOutput,
};
pub use validators::{standard_validators, Validator, ValidatorConfig};
