//! Personalisation characteristics derived from a feature report.

use std::collections::BTreeMap;

use image::GenericImageView;

use crate::analysis::is_skin;
use crate::domain::{
    Characteristic, CharacteristicDecision, CharacteristicSet, ConfidenceTier, FeatureReport,
    ImageInput, LabelGuess,
};

/// Warning added when the characteristic set is unreliable.
pub const LOW_CONFIDENCE_WARNING: &str =
    "Some personal characteristics could not be identified reliably; results may be inaccurate";

const HAIR_COLORS: &[&str] = &[
    "black", "brown", "blond", "blonde", "red", "auburn", "ginger", "gray", "grey", "white",
];
const HAIR_TYPES: &[&str] = &["straight", "wavy", "curly", "coily", "kinky"];
const HAIR_STYLES: &[&str] = &[
    "long", "short", "bob", "ponytail", "braid", "bun", "afro", "pixie", "bald", "buzz",
];

/// Rules for the set-level tier.
#[derive(Debug, Clone, Copy)]
pub struct CharacteristicConfig {
    /// Minimum share of high-confidence attributes for an overall high tier.
    pub high_share: f64,
    /// Maximum share of low-confidence attributes for an overall high tier.
    pub max_low_share_for_high: f64,
    /// More low-confidence attributes than this yields an overall low tier.
    pub max_low_count: usize,
    /// Skin-pixel share in the face box needed to trust a pixel-based skin tone.
    pub min_skin_share: f64,
}

impl Default for CharacteristicConfig {
    fn default() -> Self {
        Self {
            high_share: 0.7,
            max_low_share_for_high: 0.1,
            max_low_count: 2,
            min_skin_share: 0.2,
        }
    }
}

/// Pulls skin tone, hair, eyes, clothing and distinguishing features out of a report.
#[derive(Debug, Clone, Default)]
pub struct CharacteristicExtractor {
    config: CharacteristicConfig,
}

impl CharacteristicExtractor {
    /// Creates a new extractor with the given configuration.
    #[must_use]
    pub const fn new(config: CharacteristicConfig) -> Self {
        Self { config }
    }

    /// Extracts the characteristic set.
    ///
    /// The image is only consulted for a skin-tone estimate when no provider
    /// reported one.
    #[must_use]
    pub fn extract(&self, report: &FeatureReport, image: Option<&ImageInput>) -> CharacteristicSet {
        let mut scored: BTreeMap<String, LabelGuess> = BTreeMap::new();

        let skin = report
            .attributes
            .get("skin_tone")
            .cloned()
            .or_else(|| image.and_then(|img| self.skin_tone_from_pixels(report, img)));
        if let Some(guess) = skin {
            scored.insert("skinTone".into(), guess);
        }

        let hair_sources = [
            ("hairColor", "hair_color", HAIR_COLORS),
            ("hairType", "hair_type", HAIR_TYPES),
            ("hairStyle", "hair_style", HAIR_STYLES),
        ];
        for (name, key, vocabulary) in hair_sources {
            let guess = report
                .attributes
                .get(key)
                .cloned()
                .or_else(|| best_in_vocabulary(&report.hair, vocabulary));
            if let Some(guess) = guess {
                scored.insert(name.into(), guess);
            }
        }

        if let Some(eyes) = report.attributes.get("eye_color") {
            scored.insert("eyeColor".into(), eyes.clone());
        }

        let clothing = report.attributes.get("clothing").cloned().or_else(|| {
            report
                .clothing
                .iter()
                .max_by(|a, b| a.confidence.total_cmp(&b.confidence))
                .cloned()
        });
        if let Some(guess) = clothing {
            scored.insert("clothing".into(), guess);
        }

        if let Some(guess) = distinguishing_features(report) {
            scored.insert("distinguishingFeatures".into(), guess);
        }

        let attributes: BTreeMap<String, Characteristic> = scored
            .into_iter()
            .map(|(name, guess)| {
                (
                    name,
                    Characteristic {
                        value: guess.value,
                        confidence: ConfidenceTier::from_score(guess.confidence),
                    },
                )
            })
            .collect();

        let overall = self.overall_tier(attributes.values().map(|c| c.confidence));
        let decision = match overall {
            ConfidenceTier::High => CharacteristicDecision::Proceed,
            ConfidenceTier::Medium => CharacteristicDecision::RequestEnhancement,
            ConfidenceTier::Low => CharacteristicDecision::WarnInaccurate,
        };

        CharacteristicSet {
            attributes,
            overall,
            decision,
        }
    }

    /// Set-level tier. An empty set is low.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn overall_tier(&self, tiers: impl Iterator<Item = ConfidenceTier>) -> ConfidenceTier {
        let (mut total, mut high, mut low) = (0usize, 0usize, 0usize);
        for tier in tiers {
            total += 1;
            match tier {
                ConfidenceTier::High => high += 1,
                ConfidenceTier::Low => low += 1,
                ConfidenceTier::Medium => {}
            }
        }
        if total == 0 {
            return ConfidenceTier::Low;
        }
        let cfg = &self.config;
        let high_share = high as f64 / total as f64;
        let low_share = low as f64 / total as f64;
        if high_share >= cfg.high_share && low_share <= cfg.max_low_share_for_high {
            ConfidenceTier::High
        } else if low > cfg.max_low_count {
            ConfidenceTier::Low
        } else {
            ConfidenceTier::Medium
        }
    }

    /// Buckets the mean luma of skin pixels inside the primary face box.
    #[allow(clippy::cast_precision_loss, clippy::cast_possible_truncation)]
    fn skin_tone_from_pixels(
        &self,
        report: &FeatureReport,
        image: &ImageInput,
    ) -> Option<LabelGuess> {
        let face = report.primary_face()?;
        let bbox = face.bbox.clamp_to(image.width, image.height);
        let crop = image
            .image
            .view(bbox.x, bbox.y, bbox.width, bbox.height)
            .to_image();

        let (mut count, mut luma_sum) = (0u64, 0.0f64);
        for pixel in crop.pixels() {
            let [r, g, b, _] = pixel.0;
            if is_skin(r, g, b) {
                count += 1;
                luma_sum += 0.299 * f64::from(r) + 0.587 * f64::from(g) + 0.114 * f64::from(b);
            }
        }
        let share = count as f64 / bbox.area().max(1) as f64;
        if count == 0 || share < self.config.min_skin_share {
            return None;
        }

        let luma = luma_sum / count as f64;
        let tone = match luma {
            l if l >= 190.0 => "light",
            l if l >= 160.0 => "medium-light",
            l if l >= 125.0 => "medium",
            l if l >= 90.0 => "medium-dark",
            _ => "dark",
        };
        let confidence = (share.min(1.0) * f64::from(face.detection_confidence)) as f32;
        Some(LabelGuess::new(tone, confidence))
    }
}

/// Highest-confidence guess mentioning a word from `vocabulary`, reduced to that word.
fn best_in_vocabulary(guesses: &[LabelGuess], vocabulary: &[&str]) -> Option<LabelGuess> {
    guesses
        .iter()
        .filter_map(|g| {
            let lower = g.value.to_lowercase();
            vocabulary
                .iter()
                .find(|word| lower.split(|c: char| !c.is_alphanumeric()).any(|t| t == **word))
                .map(|word| LabelGuess::new(*word, g.confidence))
        })
        .max_by(|a, b| a.confidence.total_cmp(&b.confidence))
}

/// Eyewear, headwear and anything the deep analysis reported.
fn distinguishing_features(report: &FeatureReport) -> Option<LabelGuess> {
    if let Some(guess) = report.attributes.get("distinguishing_features") {
        return Some(guess.clone());
    }
    let face = report.primary_face()?;
    let mut features = Vec::new();
    let mut confidence = 1.0f32;
    for (likelihood, name) in [(face.eyewear, "glasses"), (face.headwear, "headwear")] {
        if likelihood.is_likely() {
            features.push(name);
            confidence = confidence.min(likelihood.score());
        }
    }
    if features.is_empty() {
        return None;
    }
    Some(LabelGuess::new(features.join(", "), confidence))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Likelihood;
    use crate::testutil;

    fn tiers(high: usize, medium: usize, low: usize) -> Vec<ConfidenceTier> {
        std::iter::repeat(ConfidenceTier::High)
            .take(high)
            .chain(std::iter::repeat(ConfidenceTier::Medium).take(medium))
            .chain(std::iter::repeat(ConfidenceTier::Low).take(low))
            .collect()
    }

    #[test]
    fn test_overall_tier_rules() {
        let ex = CharacteristicExtractor::default();
        let tier = |h, m, l| ex.overall_tier(tiers(h, m, l).into_iter());
        assert_eq!(tier(7, 3, 0), ConfidenceTier::High);
        assert_eq!(tier(9, 0, 1), ConfidenceTier::High);
        assert_eq!(tier(6, 4, 0), ConfidenceTier::Medium);
        assert_eq!(tier(7, 1, 2), ConfidenceTier::Medium);
        assert_eq!(tier(2, 1, 3), ConfidenceTier::Low);
        assert_eq!(tier(0, 0, 0), ConfidenceTier::Low);
    }

    #[test]
    fn test_deep_attributes_win_over_labels() {
        let mut report = testutil::report_with_faces(1);
        report.hair = vec![LabelGuess::new("Brown hair", 0.9), LabelGuess::new("Long hair", 0.65)];
        report
            .attributes
            .insert("hair_color".into(), LabelGuess::new("auburn", 0.95));
        report
            .attributes
            .insert("eye_color".into(), LabelGuess::new("green", 0.4));

        let set = CharacteristicExtractor::default().extract(&report, None);
        let hair = set.get("hairColor").map(|c| c.value.as_str());
        assert_eq!(hair, Some("auburn"));
        let style = set.get("hairStyle");
        assert_eq!(style.map(|c| c.value.as_str()), Some("long"));
        assert_eq!(style.map(|c| c.confidence), Some(ConfidenceTier::Medium));
        assert_eq!(set.get("eyeColor").map(|c| c.confidence), Some(ConfidenceTier::Low));
    }

    #[test]
    fn test_skin_tone_from_pixels() {
        let image = testutil::jpeg_input(640, 640);
        let mut report = testutil::report_with_faces(0);
        report.faces.push(testutil::clear_face(crate::domain::BoundingBox::new(
            250, 200, 140, 160,
        )));
        let set = CharacteristicExtractor::default().extract(&report, Some(&image));
        let skin = set.get("skinTone").map(|c| c.value.clone());
        assert!(skin.is_some(), "attributes: {:?}", set.attributes);
    }

    #[test]
    fn test_glasses_are_distinguishing() {
        let mut report = testutil::report_with_faces(1);
        report.faces[0].eyewear = Likelihood::VeryLikely;
        let set = CharacteristicExtractor::default().extract(&report, None);
        let features = set.get("distinguishingFeatures");
        assert_eq!(features.map(|c| c.value.as_str()), Some("glasses"));
        assert_eq!(features.map(|c| c.confidence), Some(ConfidenceTier::High));
    }

    #[test]
    fn test_empty_report_warns() {
        let report = FeatureReport::default();
        let set = CharacteristicExtractor::default().extract(&report, None);
        assert!(set.attributes.is_empty());
        assert_eq!(set.decision, CharacteristicDecision::WarnInaccurate);
    }

    #[test]
    fn test_decision_follows_tier() {
        let mut report = testutil::report_with_faces(1);
        report.hair = vec![LabelGuess::new("black curly hair", 0.9)];
        report.clothing = vec![LabelGuess::new("hoodie", 0.85)];
        for key in ["skin_tone", "eye_color", "hair_style"] {
            report.attributes.insert(key.into(), LabelGuess::new("x", 0.9));
        }
        let set = CharacteristicExtractor::default().extract(&report, None);
        assert_eq!(set.overall, ConfidenceTier::High);
        assert_eq!(set.decision, CharacteristicDecision::Proceed);
    }
}
