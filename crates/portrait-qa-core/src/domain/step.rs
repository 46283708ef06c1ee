//! Per-validator step results.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Free-form numeric metrics reported by a step. Flags are stored as `0.0`/`1.0`.
pub type Metrics = BTreeMap<String, f64>;

/// Identifies a validation step.
///
/// Declaration order is the fixed priority used when picking the message for
/// the first hard error.
#[non_exhaustive]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum StepName {
    /// Format, size, resolution and exposure sanity.
    BasicIntegrity,
    /// Embedded metadata inspection.
    MetadataPrivacy,
    /// Face detection, clarity, count and age checks.
    HumanFeatureAnalysis,
    /// Pixel-level quality measurements.
    QualityMetrics,
    /// Framing and composition.
    Composition,
    /// Content safety and overlays.
    Safety,
    /// Overall fitness for personalisation.
    PersonalizationSuitability,
}

impl StepName {
    /// All steps in priority order.
    pub const ALL: [Self; 7] = [
        Self::BasicIntegrity,
        Self::MetadataPrivacy,
        Self::HumanFeatureAnalysis,
        Self::QualityMetrics,
        Self::Composition,
        Self::Safety,
        Self::PersonalizationSuitability,
    ];

    /// Name used in reason prefixes and serialised output.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::BasicIntegrity => "basicIntegrity",
            Self::MetadataPrivacy => "metadataPrivacy",
            Self::HumanFeatureAnalysis => "humanFeatureAnalysis",
            Self::QualityMetrics => "qualityMetrics",
            Self::Composition => "composition",
            Self::Safety => "safety",
            Self::PersonalizationSuitability => "personalizationSuitability",
        }
    }
}

impl fmt::Display for StepName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of a single validator.
///
/// `valid` is false exactly when `errors` is non-empty; the constructors keep
/// the two in sync.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepResult {
    /// Which step produced this result.
    pub step: StepName,
    /// True when no hard error was recorded.
    pub valid: bool,
    /// Hard errors, in the order they were found.
    pub errors: Vec<String>,
    /// Advisory warnings.
    pub warnings: Vec<String>,
    /// Step-specific measurements.
    pub metrics: Metrics,
}

impl StepResult {
    /// Starts an empty, valid result.
    #[must_use]
    pub fn new(step: StepName) -> Self {
        Self {
            step,
            valid: true,
            errors: Vec::new(),
            warnings: Vec::new(),
            metrics: Metrics::new(),
        }
    }

    /// Result recording an unexpected fault as a step error.
    #[must_use]
    pub fn fault(step: StepName, message: impl fmt::Display) -> Self {
        let mut result = Self::new(step);
        result.error(format!("Step failed unexpectedly: {message}"));
        result
    }

    /// Records a hard error.
    pub fn error(&mut self, message: impl Into<String>) {
        self.errors.push(message.into());
        self.valid = false;
    }

    /// Records a warning.
    pub fn warn(&mut self, message: impl Into<String>) {
        self.warnings.push(message.into());
    }

    /// Records a metric. Non-finite values are stored as zero.
    pub fn metric(&mut self, key: &str, value: f64) {
        let value = if value.is_finite() { value } else { 0.0 };
        self.metrics.insert(key.to_string(), value);
    }

    /// Records a boolean flag as `0.0`/`1.0`.
    pub fn flag(&mut self, key: &str, value: bool) {
        self.metric(key, if value { 1.0 } else { 0.0 });
    }

    /// Reads a metric.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<f64> {
        self.metrics.get(key).copied()
    }

    /// Reads a flag; missing flags are false.
    #[must_use]
    pub fn is_set(&self, key: &str) -> bool {
        self.get(key).is_some_and(|v| v >= 0.5)
    }

    /// The step's overall sub-score in `[0, 1]`, stored under `score`.
    #[must_use]
    pub fn score(&self) -> f64 {
        self.get("score").unwrap_or(0.0).clamp(0.0, 1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_flips_valid() {
        let mut result = StepResult::new(StepName::Safety);
        assert!(result.valid);
        result.warn("minor");
        assert!(result.valid);
        result.error("major");
        assert!(!result.valid);
        assert_eq!(result.errors, vec!["major".to_string()]);
    }

    #[test]
    fn test_non_finite_metric_zeroed() {
        let mut result = StepResult::new(StepName::QualityMetrics);
        result.metric("score", f64::NAN);
        assert_eq!(result.get("score"), Some(0.0));
    }

    #[test]
    fn test_score_clamped() {
        let mut result = StepResult::new(StepName::Composition);
        result.metric("score", 1.7);
        assert!((result.score() - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_priority_order() {
        assert!(StepName::BasicIntegrity < StepName::MetadataPrivacy);
        assert!(StepName::HumanFeatureAnalysis < StepName::QualityMetrics);
        assert_eq!(StepName::ALL.len(), 7);
        assert_eq!(StepName::Safety.to_string(), "safety");
    }

    #[test]
    fn test_fault_is_invalid() {
        let result = StepResult::fault(StepName::Safety, "boom");
        assert!(!result.valid);
        assert!(result.errors[0].contains("boom"));
    }
}
