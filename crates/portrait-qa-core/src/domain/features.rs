//! Provider-agnostic description of what was detected in an image.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::BoundingBox;

/// Bucketed likelihood reported by detection providers.
#[non_exhaustive]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Likelihood {
    /// Provider gave no answer.
    #[default]
    Unknown,
    /// Very unlikely.
    VeryUnlikely,
    /// Unlikely.
    Unlikely,
    /// Possible.
    Possible,
    /// Likely.
    Likely,
    /// Very likely.
    VeryLikely,
}

impl Likelihood {
    /// Maps the bucket onto `[0, 1]`. `Unknown` counts as no evidence.
    #[must_use]
    pub const fn score(self) -> f32 {
        match self {
            Self::Unknown | Self::VeryUnlikely => 0.0,
            Self::Unlikely => 0.25,
            Self::Possible => 0.5,
            Self::Likely => 0.75,
            Self::VeryLikely => 1.0,
        }
    }

    /// True for `Likely` and `VeryLikely`.
    #[must_use]
    pub fn is_likely(self) -> bool {
        self >= Self::Likely
    }
}

/// Estimated gender of a detected person.
#[non_exhaustive]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Gender {
    /// Male.
    Male,
    /// Female.
    Female,
    /// Any other or undetermined presentation.
    Other,
}

/// A landmark position in image pixels.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point3 {
    /// Horizontal position.
    pub x: f32,
    /// Vertical position.
    pub y: f32,
    /// Depth, when the provider reports one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub z: Option<f32>,
}

/// Head orientation in degrees.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct PoseAngles {
    /// Rotation around the viewing axis.
    pub roll: f32,
    /// Left/right turn.
    pub pan: f32,
    /// Up/down nod.
    pub tilt: f32,
}

impl PoseAngles {
    /// Largest absolute deviation from a frontal pose.
    #[must_use]
    pub fn max_abs(&self) -> f32 {
        self.roll.abs().max(self.pan.abs()).max(self.tilt.abs())
    }
}

/// Emotion likelihoods for one face.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmotionLikelihoods {
    /// Joy.
    pub joy: Likelihood,
    /// Sorrow.
    pub sorrow: Likelihood,
    /// Anger.
    pub anger: Likelihood,
    /// Surprise.
    pub surprise: Likelihood,
}

/// Estimated age in years.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AgeEstimate {
    /// Point estimate.
    pub years: u32,
    /// Provider confidence in `[0, 1]`.
    pub confidence: f32,
}

/// Estimated gender with provider confidence.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GenderEstimate {
    /// Estimated value.
    pub value: Gender,
    /// Provider confidence in `[0, 1]`.
    pub confidence: f32,
}

/// Everything known about a single detected face.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FaceFeatures {
    /// Face bounding box in image pixels.
    pub bbox: BoundingBox,
    /// Named landmark positions.
    pub landmarks: BTreeMap<String, Point3>,
    /// Face detection confidence.
    pub detection_confidence: f32,
    /// Landmark placement confidence.
    pub landmarking_confidence: f32,
    /// Head pose.
    pub pose: PoseAngles,
    /// Hat, hood or other headwear.
    pub headwear: Likelihood,
    /// Glasses or sunglasses.
    pub eyewear: Likelihood,
    /// Face region is blurred.
    pub blurred: Likelihood,
    /// Face region is under-exposed.
    pub under_exposed: Likelihood,
    /// Emotion likelihoods.
    pub emotions: EmotionLikelihoods,
    /// Estimated age, when available.
    pub age: Option<AgeEstimate>,
    /// Estimated gender, when available.
    pub gender: Option<GenderEstimate>,
}

impl FaceFeatures {
    /// Number of landmarks whose name contains any of `needles`.
    #[must_use]
    pub fn landmarks_matching(&self, needles: &[&str]) -> usize {
        self.landmarks
            .keys()
            .filter(|name| {
                let name = name.to_ascii_uppercase();
                needles.iter().any(|n| name.contains(n))
            })
            .count()
    }
}

/// A label guess with its provider confidence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LabelGuess {
    /// Guessed value.
    pub value: String,
    /// Provider confidence in `[0, 1]`.
    pub confidence: f32,
}

impl LabelGuess {
    /// Creates a new label guess.
    #[must_use]
    pub fn new(value: impl Into<String>, confidence: f32) -> Self {
        Self {
            value: value.into(),
            confidence,
        }
    }
}

/// Content-safety likelihoods for the whole image.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentSafety {
    /// Adult content.
    pub adult: Likelihood,
    /// Violent content.
    pub violence: Likelihood,
    /// Racy content.
    pub racy: Likelihood,
    /// Medical imagery.
    pub medical: Likelihood,
    /// Edited or spoofed imagery.
    pub spoof: Likelihood,
}

/// A block of text found in the image.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextBlock {
    /// Recognised text.
    pub text: String,
    /// Location of the text, when known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bbox: Option<BoundingBox>,
}

/// Where the features in a report came from.
#[non_exhaustive]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeatureSource {
    /// The primary detection provider.
    Primary,
    /// The secondary deep-analysis provider.
    Fallback,
    /// Providers answered but found nothing.
    #[default]
    None,
    /// Providers could not be reached.
    Unavailable,
}

/// Normalised features for one image.
///
/// Produced once per validation call and shared read-only between validators.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FeatureReport {
    /// Provider that produced the faces.
    pub source: FeatureSource,
    /// Width of the analysed image.
    pub image_width: u32,
    /// Height of the analysed image.
    pub image_height: u32,
    /// Detected faces.
    pub faces: Vec<FaceFeatures>,
    /// Estimated body bounding box.
    pub body: Option<BoundingBox>,
    /// Coarse hair label guesses.
    pub hair: Vec<LabelGuess>,
    /// Coarse clothing label guesses.
    pub clothing: Vec<LabelGuess>,
    /// General image labels.
    pub labels: Vec<LabelGuess>,
    /// Text found in the image.
    pub text_blocks: Vec<TextBlock>,
    /// Content-safety likelihoods.
    pub content_safety: Option<ContentSafety>,
    /// Attribute guesses from deep visual analysis, keyed by attribute name.
    pub attributes: BTreeMap<String, LabelGuess>,
}

impl FeatureReport {
    /// Creates an empty report for an image of the given size.
    #[must_use]
    pub fn empty(source: FeatureSource, image_width: u32, image_height: u32) -> Self {
        Self {
            source,
            image_width,
            image_height,
            ..Self::default()
        }
    }

    /// Number of detected faces.
    #[must_use]
    pub fn face_count(&self) -> usize {
        self.faces.len()
    }

    /// The largest detected face.
    #[must_use]
    pub fn primary_face(&self) -> Option<&FaceFeatures> {
        self.faces.iter().max_by_key(|f| f.bbox.area())
    }

    /// Looks up a general label by case-insensitive substring.
    #[must_use]
    pub fn label(&self, needle: &str) -> Option<&LabelGuess> {
        let needle = needle.to_ascii_lowercase();
        self.labels
            .iter()
            .find(|l| l.value.to_ascii_lowercase().contains(&needle))
    }
}
