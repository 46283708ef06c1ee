//! Merges step results into one admissibility decision.

use crate::domain::{ErrorKind, StepName, StepResult, ValidationReport};

/// Message shown when the photo is accepted.
pub const VALID_MESSAGE: &str = "Your photo looks great!";

/// Category of the first hard error, used to pick the user-facing message.
#[non_exhaustive]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageCategory {
    /// Too many people.
    FaceCount,
    /// Nobody found.
    NoFace,
    /// Estimated age outside the window.
    AgeRange,
    /// Blurry photo or unclear face.
    Blur,
    /// Wrong format, size or resolution.
    Format,
    /// Location data, watermark or overlay.
    Privacy,
    /// Anything else.
    Generic,
}

impl MessageCategory {
    /// Classifies an error message by its wording.
    #[must_use]
    pub fn classify(message: &str) -> Self {
        let lower = message.to_lowercase();
        let has = |needles: &[&str]| needles.iter().any(|n| lower.contains(n));
        if has(&["no face"]) {
            Self::NoFace
        } else if lower.contains("faces") && has(&["detected", "people"]) {
            Self::FaceCount
        } else if has(&["estimated age"]) {
            Self::AgeRange
        } else if has(&["blurry", "not clear"]) {
            Self::Blur
        } else if has(&["resolution", "format", "file size", "corrupt"]) {
            Self::Format
        } else if has(&["gps", "location", "watermark", "text overlay", "personal information"]) {
            Self::Privacy
        } else {
            Self::Generic
        }
    }

    /// User-facing message for this category.
    #[must_use]
    pub const fn message(self) -> &'static str {
        match self {
            Self::FaceCount => "Please upload a photo with only one person.",
            Self::NoFace => "We couldn't find a face. Please upload a clear photo of one person.",
            Self::AgeRange => "Please upload a photo of a person within the allowed age range.",
            Self::Blur => "Your photo looks blurry. Please upload a sharper photo.",
            Self::Format => "Please upload a JPEG, PNG or WebP photo of at least 500x500 pixels.",
            Self::Privacy => {
                "Please remove location data or overlays from your photo and try again."
            }
            Self::Generic => "We couldn't use this photo. Please try a different one.",
        }
    }
}

/// Weights of each step's sub-score in the confidence blend.
#[derive(Debug, Clone, Copy)]
pub struct ConfidenceWeights {
    /// Human feature analysis.
    pub human: f64,
    /// Quality metrics.
    pub quality: f64,
    /// Composition.
    pub composition: f64,
    /// Safety.
    pub safety: f64,
}

impl Default for ConfidenceWeights {
    fn default() -> Self {
        Self {
            human: 0.4,
            quality: 0.3,
            composition: 0.2,
            safety: 0.1,
        }
    }
}

/// Thresholds for the aggregate decision.
#[derive(Debug, Clone, Copy)]
pub struct AggregatorConfig {
    /// Sub-score weights.
    pub weights: ConfidenceWeights,
    /// Confidence below which enhancement is offered.
    pub enhance_below_confidence: f64,
    /// Quality overall score below which enhancement is offered.
    pub enhance_below_quality: f64,
}

impl Default for AggregatorConfig {
    fn default() -> Self {
        Self {
            weights: ConfidenceWeights::default(),
            enhance_below_confidence: 0.9,
            enhance_below_quality: 0.8,
        }
    }
}

/// Combines step results into a [`ValidationReport`].
#[derive(Debug, Clone, Default)]
pub struct ConfidenceAggregator {
    config: AggregatorConfig,
}

impl ConfidenceAggregator {
    /// Creates a new aggregator with the given configuration.
    #[must_use]
    pub const fn new(config: AggregatorConfig) -> Self {
        Self { config }
    }

    /// Aggregates step results. The input order does not matter.
    #[must_use]
    pub fn aggregate(&self, mut steps: Vec<StepResult>) -> ValidationReport {
        steps.sort_by_key(|s| s.step);

        let mut reasons: Vec<String> = steps
            .iter()
            .flat_map(|s| s.errors.iter().map(move |e| format!("{}: {e}", s.step)))
            .collect();

        let mut warnings: Vec<String> = Vec::new();
        for warning in steps.iter().flat_map(|s| s.warnings.iter()) {
            if !warnings.contains(warning) {
                warnings.push(warning.clone());
            }
        }

        let constraints_ok = domain_constraints_satisfied(&steps);
        if !constraints_ok && reasons.is_empty() {
            reasons.push(format!(
                "{}: face count, age or clarity constraint not satisfied",
                StepName::HumanFeatureAnalysis
            ));
        }
        let is_valid = reasons.is_empty();

        let confidence_score = self.confidence(&steps);
        let quality_overall = find(&steps, StepName::QualityMetrics)
            .and_then(|s| s.get("overallScore"))
            .unwrap_or(0.0);
        let can_be_enhanced = is_valid
            && (confidence_score < self.config.enhance_below_confidence
                || !warnings.is_empty()
                || quality_overall < self.config.enhance_below_quality);

        let first_error = steps
            .iter()
            .find_map(|s| s.errors.first().map(|e| (s.step, e.as_str())));
        let (user_friendly_message, error_kind) = match first_error {
            Some((step, message)) => (
                MessageCategory::classify(message).message().to_string(),
                Some(ErrorKind::for_step(step, message)),
            ),
            None if is_valid => (VALID_MESSAGE.to_string(), None),
            None => (
                MessageCategory::Generic.message().to_string(),
                Some(ErrorKind::HumanAnalysisError),
            ),
        };

        ValidationReport {
            is_valid,
            confidence_score,
            reasons,
            warnings,
            can_be_enhanced,
            user_friendly_message,
            error_kind,
            steps,
        }
    }

    /// Weighted blend of the human, quality, composition and safety sub-scores.
    #[must_use]
    pub fn confidence(&self, steps: &[StepResult]) -> f64 {
        let w = &self.config.weights;
        let score = |name| find(steps, name).map_or(0.0, StepResult::score);
        let blended = w.human * score(StepName::HumanFeatureAnalysis)
            + w.quality * score(StepName::QualityMetrics)
            + w.composition * score(StepName::Composition)
            + w.safety * score(StepName::Safety);
        if blended.is_finite() {
            blended.clamp(0.0, 1.0)
        } else {
            0.0
        }
    }
}

fn find(steps: &[StepResult], name: StepName) -> Option<&StepResult> {
    steps.iter().find(|s| s.step == name)
}

/// Age, face-count and clarity constraints, read from the human analysis flags.
fn domain_constraints_satisfied(steps: &[StepResult]) -> bool {
    find(steps, StepName::HumanFeatureAnalysis).is_some_and(|human| {
        human.valid
            && ["faceCountOk", "ageWithinRange", "clarityOk"]
                .iter()
                .all(|flag| human.is_set(flag))
    })
}
