//! Aggregated reports and the final validation result.

use serde::{Deserialize, Serialize};

use super::{
    CharacteristicSet, EnhancementKind, ErrorKind, FeatureSource, StandardImageSpec, StepName,
    StepResult,
};

/// Lighting measurements, all in `[0, 1]`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct LightingMetrics {
    /// Mean luminance.
    pub brightness: f64,
    /// Normalised luminance spread.
    pub contrast: f64,
    /// Exposure quality, 1.0 when nothing is clipped.
    pub exposure: f64,
}

/// Focus measurements, all in `[0, 1]`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct FocusMetrics {
    /// Blur amount, 1.0 for a featureless image.
    pub blur: f64,
    /// Sharpness, `1 - blur`.
    pub sharpness: f64,
    /// Estimated sensor noise.
    pub noise: f64,
}

/// Colour measurements, all in `[0, 1]`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ColorMetrics {
    /// Mean HSV saturation.
    pub saturation: f64,
    /// Channel balance, 1.0 when the channel means agree.
    pub balance: f64,
    /// Strength of the dominant colour cast.
    pub cast: f64,
}

/// Encoding artifact measurements, all in `[0, 1]`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ArtifactMetrics {
    /// Block-boundary discontinuity.
    pub compression: f64,
    /// Tonal gaps in the histogram.
    pub banding: f64,
}

/// Texture measurements, all in `[0, 1]`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct TextureMetrics {
    /// Edge density.
    pub detail: f64,
    /// Histogram entropy.
    pub complexity: f64,
}

/// Full pixel-quality breakdown.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QualityMetrics {
    /// Lighting.
    pub lighting: LightingMetrics,
    /// Focus.
    pub focus: FocusMetrics,
    /// Colour.
    pub color: ColorMetrics,
    /// Artifacts.
    pub artifacts: ArtifactMetrics,
    /// Texture.
    pub texture: TextureMetrics,
    /// Weighted overall score.
    pub overall_score: f64,
}

impl QualityMetrics {
    /// Writes every measurement into the step's metric map.
    pub fn record(&self, step: &mut StepResult) {
        step.metric("lighting.brightness", self.lighting.brightness);
        step.metric("lighting.contrast", self.lighting.contrast);
        step.metric("lighting.exposure", self.lighting.exposure);
        step.metric("focus.blur", self.focus.blur);
        step.metric("focus.sharpness", self.focus.sharpness);
        step.metric("focus.noise", self.focus.noise);
        step.metric("color.saturation", self.color.saturation);
        step.metric("color.balance", self.color.balance);
        step.metric("color.cast", self.color.cast);
        step.metric("artifacts.compression", self.artifacts.compression);
        step.metric("artifacts.banding", self.artifacts.banding);
        step.metric("texture.detail", self.texture.detail);
        step.metric("texture.complexity", self.texture.complexity);
        step.metric("overallScore", self.overall_score);
    }

    /// Reads the measurements back from a quality step.
    #[must_use]
    pub fn from_step(step: &StepResult) -> Self {
        let m = |key: &str| step.get(key).unwrap_or(0.0);
        Self {
            lighting: LightingMetrics {
                brightness: m("lighting.brightness"),
                contrast: m("lighting.contrast"),
                exposure: m("lighting.exposure"),
            },
            focus: FocusMetrics {
                blur: m("focus.blur"),
                sharpness: m("focus.sharpness"),
                noise: m("focus.noise"),
            },
            color: ColorMetrics {
                saturation: m("color.saturation"),
                balance: m("color.balance"),
                cast: m("color.cast"),
            },
            artifacts: ArtifactMetrics {
                compression: m("artifacts.compression"),
                banding: m("artifacts.banding"),
            },
            texture: TextureMetrics {
                detail: m("texture.detail"),
                complexity: m("texture.complexity"),
            },
            overall_score: m("overallScore"),
        }
    }
}

/// Aggregate admissibility decision.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationReport {
    /// Admissible as a reference image.
    pub is_valid: bool,
    /// Weighted confidence in `[0, 1]`.
    pub confidence_score: f64,
    /// Hard errors prefixed with their step name.
    pub reasons: Vec<String>,
    /// Union of all step warnings.
    pub warnings: Vec<String>,
    /// Enhancement would be worthwhile.
    pub can_be_enhanced: bool,
    /// Message for end users, keyed by the first error's category.
    pub user_friendly_message: String,
    /// Kind of the first hard error.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_kind: Option<ErrorKind>,
    /// Step results in priority order.
    #[serde(skip)]
    pub steps: Vec<StepResult>,
}

impl ValidationReport {
    /// Looks up a step's result.
    #[must_use]
    pub fn step(&self, name: StepName) -> Option<&StepResult> {
        self.steps.iter().find(|s| s.step == name)
    }
}

/// Provenance and completeness of the analysis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DataQuality {
    /// Which provider produced the features.
    pub feature_source: FeatureSource,
    /// Detection confidence of the primary face.
    pub face_detection_confidence: Option<f32>,
    /// Landmarks found on the primary face.
    pub landmark_count: usize,
    /// Set-level characteristic confidence.
    pub characteristic_confidence: Option<super::ConfidenceTier>,
    /// Validators that produced a result.
    pub steps_run: usize,
}

/// What the enhancement stage did.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnhancementSummary {
    /// Transforms planned.
    pub planned: Vec<EnhancementKind>,
    /// Transforms applied to the shipped asset.
    pub applied: Vec<EnhancementKind>,
    /// Encoder quality of the shipped asset.
    pub quality_used: Option<f32>,
    /// Why the original was kept, when enhancement ran but was discarded.
    pub fallback_reason: Option<String>,
}

/// Per-dimension analysis attached to a result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Analysis {
    /// Human feature analysis step.
    pub human: Option<StepResult>,
    /// Quality step.
    pub quality: Option<StepResult>,
    /// Composition step.
    pub composition: Option<StepResult>,
    /// Safety step.
    pub safety: Option<StepResult>,
    /// Extracted characteristics.
    pub characteristics: Option<CharacteristicSet>,
    /// Provenance block.
    pub data_quality: DataQuality,
    /// Enhancement stage summary.
    pub enhancement: EnhancementSummary,
}

/// Everything returned to the caller for one validation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationResult {
    /// Admissible as a reference image.
    pub is_valid: bool,
    /// Aggregate report.
    pub validation_summary: ValidationReport,
    /// Per-dimension details.
    pub analysis: Analysis,
    /// Ordered advice for the caller.
    pub recommendations: Vec<String>,
    /// Ordered warnings.
    pub warnings: Vec<String>,
    /// Permanent URL of the accepted original.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    /// Permanent URL of the canonical enhanced image.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enhanced_image_url: Option<String>,
    /// True only when `enhanced_image_url` satisfies `standard_specs`.
    pub enhancement_applied: bool,
    /// Output contract in effect.
    pub standard_specs: StandardImageSpec,
    /// `VAL_<base36 timestamp>_<6 chars>`, uppercased.
    pub validation_id: String,
    /// Same as `validation_summary.confidence_score`.
    pub confidence_score: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quality_metrics_round_trip_through_step() {
        let metrics = QualityMetrics {
            lighting: LightingMetrics {
                brightness: 0.4,
                contrast: 0.6,
                exposure: 0.9,
            },
            focus: FocusMetrics {
                blur: 0.2,
                sharpness: 0.8,
                noise: 0.1,
            },
            overall_score: 0.77,
            ..QualityMetrics::default()
        };
        let mut step = StepResult::new(StepName::QualityMetrics);
        metrics.record(&mut step);

        let read = QualityMetrics::from_step(&step);
        assert!((read.lighting.brightness - 0.4).abs() < f64::EPSILON);
        assert!((read.focus.sharpness - 0.8).abs() < f64::EPSILON);
        assert!((read.overall_score - 0.77).abs() < f64::EPSILON);
    }
}
