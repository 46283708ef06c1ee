//! Personalisation characteristics.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Confidence bucket exposed to callers instead of raw scores.
#[non_exhaustive]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConfidenceTier {
    /// Below 0.6.
    Low,
    /// 0.6 up to 0.8.
    Medium,
    /// 0.8 and above.
    High,
}

impl ConfidenceTier {
    /// Buckets a provider confidence.
    #[must_use]
    pub fn from_score(score: f32) -> Self {
        if score >= 0.8 {
            Self::High
        } else if score >= 0.6 {
            Self::Medium
        } else {
            Self::Low
        }
    }
}

/// One extracted attribute.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Characteristic {
    /// Extracted value.
    pub value: String,
    /// Confidence bucket.
    pub confidence: ConfidenceTier,
}

/// What the caller should do with a characteristic set.
#[non_exhaustive]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CharacteristicDecision {
    /// Good enough to use as is.
    Proceed,
    /// Usable, but enhancement should be requested.
    RequestEnhancement,
    /// Results may be inaccurate.
    WarnInaccurate,
}

/// Extracted attributes keyed by name, plus the set-level confidence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CharacteristicSet {
    /// Attribute name to value and confidence.
    pub attributes: BTreeMap<String, Characteristic>,
    /// Aggregate confidence over all attributes.
    pub overall: ConfidenceTier,
    /// Resulting decision.
    pub decision: CharacteristicDecision,
}

impl CharacteristicSet {
    /// Looks up one attribute.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Characteristic> {
        self.attributes.get(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tier_thresholds() {
        assert_eq!(ConfidenceTier::from_score(0.8), ConfidenceTier::High);
        assert_eq!(ConfidenceTier::from_score(0.79), ConfidenceTier::Medium);
        assert_eq!(ConfidenceTier::from_score(0.6), ConfidenceTier::Medium);
        assert_eq!(ConfidenceTier::from_score(0.59), ConfidenceTier::Low);
        assert_eq!(ConfidenceTier::from_score(0.0), ConfidenceTier::Low);
    }
}
