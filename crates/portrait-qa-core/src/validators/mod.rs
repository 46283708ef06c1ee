//! Validation steps.
//!
//! Each validator is an independent, stateless strategy over the shared image,
//! the feature report and the caller's options. Validators never mutate shared
//! state, so the pipeline is free to run them concurrently.

mod composition;
mod human;
mod integrity;
mod metadata;
mod quality;
mod safety;
mod suitability;

use std::sync::Arc;

pub use composition::{CompositionConfig, CompositionValidator};
pub use human::{HumanConfig, HumanValidator};
pub use integrity::{IntegrityConfig, IntegrityValidator};
pub use metadata::{MetadataConfig, MetadataValidator};
pub use quality::{QualityConfig, QualityValidator};
pub use safety::{SafetyConfig, SafetyValidator};
pub use suitability::{SuitabilityConfig, SuitabilityValidator};

use crate::domain::{FeatureReport, ImageInput, StepName, StepResult, ValidationOptions};

/// Everything a validator may look at.
#[derive(Debug, Clone, Copy)]
pub struct StepInput<'a> {
    /// Decoded image and its raw bytes.
    pub image: &'a ImageInput,
    /// Normalised features; present for validators that need them.
    pub features: Option<&'a FeatureReport>,
    /// Caller options.
    pub options: &'a ValidationOptions,
}

impl<'a> StepInput<'a> {
    /// Returns the feature report or fails when the pipeline did not supply one.
    ///
    /// # Errors
    ///
    /// Returns an error when no feature report is attached.
    pub fn require_features(&self) -> anyhow::Result<&'a FeatureReport> {
        self.features
            .ok_or_else(|| anyhow::anyhow!("feature report not available"))
    }
}

/// A single validation step.
pub trait Validator: Send + Sync {
    /// Step this validator produces.
    fn name(&self) -> StepName;

    /// Whether the step must wait for feature extraction.
    fn needs_features(&self) -> bool {
        false
    }

    /// Runs the step.
    ///
    /// Domain failures are reported inside the returned [`StepResult`].
    ///
    /// # Errors
    ///
    /// Returns an error only for unexpected faults.
    fn validate(&self, input: &StepInput<'_>) -> anyhow::Result<StepResult>;
}

/// Thresholds for every validator.
#[derive(Debug, Clone, Default)]
pub struct ValidatorConfig {
    /// Format, size and resolution bounds.
    pub integrity: IntegrityConfig,
    /// Metadata policy.
    pub metadata: MetadataConfig,
    /// Face clarity and pose thresholds.
    pub human: HumanConfig,
    /// Pixel-quality thresholds.
    pub quality: QualityConfig,
    /// Composition thresholds.
    pub composition: CompositionConfig,
    /// Content-safety thresholds.
    pub safety: SafetyConfig,
    /// Suitability bands.
    pub suitability: SuitabilityConfig,
}

/// Builds the standard validator set in priority order.
#[must_use]
pub fn standard_validators(config: &ValidatorConfig) -> Vec<Arc<dyn Validator>> {
    vec![
        Arc::new(IntegrityValidator::new(config.integrity.clone())),
        Arc::new(MetadataValidator::new(config.metadata.clone())),
        Arc::new(HumanValidator::new(config.human.clone())),
        Arc::new(QualityValidator::new(config.quality.clone())),
        Arc::new(CompositionValidator::new(config.composition.clone())),
        Arc::new(SafetyValidator::new(config.safety.clone())),
        Arc::new(SuitabilityValidator::new(config.suitability.clone())),
    ]
}

/// Sub-score that decays with the number of warnings.
#[allow(clippy::cast_precision_loss)]
pub(crate) fn warning_penalised(base: f64, warnings: usize, per_warning: f64) -> f64 {
    (base - warnings as f64 * per_warning).clamp(0.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_standard_set_in_priority_order() {
        let validators = standard_validators(&ValidatorConfig::default());
        let names: Vec<StepName> = validators.iter().map(|v| v.name()).collect();
        assert_eq!(names, StepName::ALL.to_vec());
    }

    #[test]
    fn test_feature_dependencies() {
        let validators = standard_validators(&ValidatorConfig::default());
        let needing: Vec<StepName> = validators
            .iter()
            .filter(|v| v.needs_features())
            .map(|v| v.name())
            .collect();
        assert_eq!(
            needing,
            vec![
                StepName::HumanFeatureAnalysis,
                StepName::Safety,
                StepName::PersonalizationSuitability
            ]
        );
    }
}
