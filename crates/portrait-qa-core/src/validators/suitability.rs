//! Overall fitness for personalisation.

use crate::analysis::{working_copy, EdgeMap, ExposureAnalysis, ExposureConfig, WORKING_SIZE};
use crate::domain::{FeatureReport, StepName, StepResult};

use super::{StepInput, Validator};

/// Configuration for the suitability synthesis.
#[derive(Debug, Clone)]
pub struct SuitabilityConfig {
    /// Below this the photo is rejected.
    pub reject_below: f64,
    /// Below this (and above `reject_below`) enhancement is recommended.
    pub enhance_below: f64,
    /// Landmark count that counts as a complete set.
    pub landmark_target: usize,
    /// Sobel magnitude that counts as an edge.
    pub edge_threshold: f32,
}

impl Default for SuitabilityConfig {
    fn default() -> Self {
        Self {
            reject_below: 0.3,
            enhance_below: 0.6,
            landmark_target: 15,
            edge_threshold: 48.0,
        }
    }
}

/// Component scores feeding the suitability decision.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct SuitabilityBreakdown {
    /// Face detection and landmark completeness.
    pub face_readiness: f64,
    /// How much of the body is framed.
    pub body_readiness: f64,
    /// Absence of blur and under-exposure on the face.
    pub feature_clarity: f64,
    /// Neutral or positive expression.
    pub expression: f64,
    /// Frontal pose.
    pub pose: f64,
    /// Exposure of the whole frame.
    pub lighting: f64,
    /// Plainness of the background.
    pub background: f64,
}

impl SuitabilityBreakdown {
    /// Weighted overall suitability.
    #[must_use]
    pub fn overall(&self) -> f64 {
        (0.25 * self.face_readiness
            + 0.1 * self.body_readiness
            + 0.2 * self.feature_clarity
            + 0.1 * self.expression
            + 0.15 * self.pose
            + 0.1 * self.lighting
            + 0.1 * self.background)
            .clamp(0.0, 1.0)
    }
}

/// Synthesises face, pose, lighting and background into one readiness score.
pub struct SuitabilityValidator {
    config: SuitabilityConfig,
}

impl SuitabilityValidator {
    /// Creates a new suitability validator with the given configuration.
    #[must_use]
    pub const fn new(config: SuitabilityConfig) -> Self {
        Self { config }
    }

    #[allow(clippy::cast_precision_loss)]
    fn face_components(&self, report: &FeatureReport, breakdown: &mut SuitabilityBreakdown) {
        let Some(face) = report.primary_face() else {
            return;
        };
        let landmarks =
            (face.landmarks.len() as f64 / self.config.landmark_target.max(1) as f64).min(1.0);
        breakdown.face_readiness = 0.5 * f64::from(face.detection_confidence) + 0.5 * landmarks;
        breakdown.feature_clarity =
            1.0 - f64::from(face.blurred.score().max(face.under_exposed.score()));
        let negative = face.emotions.anger.score().max(face.emotions.sorrow.score());
        breakdown.expression = 1.0 - 0.5 * f64::from(negative);
        breakdown.pose = 1.0 - (f64::from(face.pose.max_abs()) / 45.0).min(1.0);
        breakdown.body_readiness = report.body.map_or(0.5, |body| {
            let share = f64::from(body.height) / f64::from(report.image_height.max(1));
            (share * 2.0).min(1.0)
        });
    }
}

impl Default for SuitabilityValidator {
    fn default() -> Self {
        Self::new(SuitabilityConfig::default())
    }
}

impl Validator for SuitabilityValidator {
    fn name(&self) -> StepName {
        StepName::PersonalizationSuitability
    }

    fn needs_features(&self) -> bool {
        true
    }

    fn validate(&self, input: &StepInput<'_>) -> anyhow::Result<StepResult> {
        let cfg = &self.config;
        let report = input.require_features()?;
        let mut result = StepResult::new(self.name());

        let mut breakdown = SuitabilityBreakdown::default();
        self.face_components(report, &mut breakdown);

        let luma = working_copy(&input.image.image, WORKING_SIZE).to_luma8();
        let exposure = ExposureAnalysis::analyze(&luma, &ExposureConfig::default());
        let brightness_fit = 1.0 - ((exposure.brightness() - 0.5).abs() / 0.5).min(1.0);
        breakdown.lighting = 0.6 * exposure.exposure_quality() + 0.4 * brightness_fit;
        let border = EdgeMap::sobel(&luma).border_density(1.0 / 6.0, cfg.edge_threshold);
        breakdown.background = 1.0 - (border / 0.3).min(1.0);

        let score = breakdown.overall();
        result.metric("faceReadiness", breakdown.face_readiness);
        result.metric("bodyReadiness", breakdown.body_readiness);
        result.metric("featureClarity", breakdown.feature_clarity);
        result.metric("expressionSuitability", breakdown.expression);
        result.metric("poseSuitability", breakdown.pose);
        result.metric("lightingSuitability", breakdown.lighting);
        result.metric("backgroundSuitability", breakdown.background);
        result.metric("suitabilityScore", score);
        result.metric("score", score);

        if score < cfg.reject_below {
            result.error(format!(
                "Photo is not suitable for personalisation (score {score:.2}, minimum {:.2})",
                cfg.reject_below
            ));
            result.flag("needsEnhancement", false);
        } else if score < cfg.enhance_below {
            result.flag("needsEnhancement", true);
            result.warn("Photo is usable but would benefit from enhancement");
        } else {
            result.flag("needsEnhancement", false);
        }

        Ok(result)
    }
}

#[cfg(test)]
#[allow(clippy::expect_used)]
mod tests {
    use super::*;
    use crate::domain::{Likelihood, ValidationOptions};
    use crate::testutil;

    fn run(report: &FeatureReport) -> StepResult {
        let image = testutil::jpeg_input(640, 640);
        let options = ValidationOptions::default();
        SuitabilityValidator::default()
            .validate(&StepInput {
                image: &image,
                features: Some(report),
                options: &options,
            })
            .expect("validate")
    }

    #[test]
    fn test_clear_portrait_is_suitable() {
        let result = run(&testutil::report_with_faces(1));
        assert!(result.valid, "errors: {:?}", result.errors);
        assert!(!result.is_set("needsEnhancement"));
        assert!(result.score() >= 0.6, "score {}", result.score());
    }

    #[test]
    fn test_no_face_is_unsuitable() {
        let result = run(&testutil::report_with_faces(0));
        assert!(!result.valid);
        assert!(result.errors[0].contains("not suitable"));
    }

    #[test]
    fn test_weak_face_needs_enhancement() {
        let mut report = testutil::report_with_faces(1);
        let face = &mut report.faces[0];
        face.detection_confidence = 0.6;
        face.landmarks.clear();
        face.blurred = Likelihood::VeryLikely;
        face.pose.pan = 40.0;
        face.emotions.anger = Likelihood::VeryLikely;
        let result = run(&report);
        assert!(result.valid, "errors: {:?}", result.errors);
        assert!(result.is_set("needsEnhancement"), "score {}", result.score());
    }

    #[test]
    fn test_breakdown_weights_sum_to_one() {
        let full = SuitabilityBreakdown {
            face_readiness: 1.0,
            body_readiness: 1.0,
            feature_clarity: 1.0,
            expression: 1.0,
            pose: 1.0,
            lighting: 1.0,
            background: 1.0,
        };
        assert!((full.overall() - 1.0).abs() < 1e-9);
    }
}
