//! Provider-native response shapes.
//!
//! The annotation payload follows the common image-annotation layout (faces
//! with landmarks and likelihoods, labels, text, safe-search, localized
//! objects). The deep-analysis payload carries normalised face boxes and free
//! attribute guesses. Absent fields fall back to their defaults.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::domain::{Gender, Likelihood};

/// Pixel vertex. Providers omit zero coordinates.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Vertex {
    /// Horizontal position.
    pub x: f32,
    /// Vertical position.
    pub y: f32,
}

/// Polygon in pixel or normalised coordinates.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct BoundingPoly {
    /// Pixel vertices.
    pub vertices: Vec<Vertex>,
    /// Vertices in `[0, 1]` image coordinates.
    pub normalized_vertices: Vec<Vertex>,
}

/// Landmark position.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Position {
    /// Horizontal position.
    pub x: f32,
    /// Vertical position.
    pub y: f32,
    /// Depth.
    pub z: Option<f32>,
}

/// Named landmark.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Landmark {
    /// Landmark name, e.g. `LEFT_EYE`.
    #[serde(rename = "type")]
    pub kind: String,
    /// Position in pixels.
    #[serde(default)]
    pub position: Position,
}

/// Age range estimate.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AgeAnnotation {
    /// Lower bound in years.
    pub low: u32,
    /// Upper bound in years.
    pub high: u32,
    /// Confidence in `[0, 1]`.
    #[serde(default)]
    pub confidence: f32,
}

/// Gender estimate.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GenderAnnotation {
    /// Estimated value.
    pub value: Gender,
    /// Confidence in `[0, 1]`.
    #[serde(default)]
    pub confidence: f32,
}

/// One detected face.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct FaceAnnotation {
    /// Box around the whole head.
    pub bounding_poly: BoundingPoly,
    /// Tighter box around the skin area of the face.
    pub fd_bounding_poly: Option<BoundingPoly>,
    /// Landmarks.
    pub landmarks: Vec<Landmark>,
    /// Roll in degrees.
    pub roll_angle: f32,
    /// Pan in degrees.
    pub pan_angle: f32,
    /// Tilt in degrees.
    pub tilt_angle: f32,
    /// Detection confidence.
    pub detection_confidence: f32,
    /// Landmarking confidence.
    pub landmarking_confidence: f32,
    /// Joy.
    pub joy_likelihood: Likelihood,
    /// Sorrow.
    pub sorrow_likelihood: Likelihood,
    /// Anger.
    pub anger_likelihood: Likelihood,
    /// Surprise.
    pub surprise_likelihood: Likelihood,
    /// Under-exposure.
    pub under_exposed_likelihood: Likelihood,
    /// Blur.
    pub blurred_likelihood: Likelihood,
    /// Headwear.
    pub headwear_likelihood: Likelihood,
    /// Glasses.
    pub eyewear_likelihood: Likelihood,
    /// Age range, when the provider estimates one.
    pub age: Option<AgeAnnotation>,
    /// Gender, when the provider estimates one.
    pub gender: Option<GenderAnnotation>,
}

/// Label with a score.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EntityAnnotation {
    /// Label text.
    pub description: String,
    /// Score in `[0, 1]`.
    pub score: f32,
}

/// Recognised text.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct TextAnnotation {
    /// Text content.
    pub description: String,
    /// Location.
    pub bounding_poly: Option<BoundingPoly>,
}

/// Content-safety likelihoods.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SafeSearchAnnotation {
    /// Adult.
    pub adult: Likelihood,
    /// Spoof.
    pub spoof: Likelihood,
    /// Medical.
    pub medical: Likelihood,
    /// Violence.
    pub violence: Likelihood,
    /// Racy.
    pub racy: Likelihood,
}

/// Localized object.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ObjectAnnotation {
    /// Object name.
    pub name: String,
    /// Score in `[0, 1]`.
    pub score: f32,
    /// Location, normalised.
    pub bounding_poly: BoundingPoly,
}

/// Response of an annotation provider.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct AnnotationPayload {
    /// Faces.
    pub face_annotations: Vec<FaceAnnotation>,
    /// Labels.
    pub label_annotations: Vec<EntityAnnotation>,
    /// Text. The first entry holds the full text, the rest its words.
    pub text_annotations: Vec<TextAnnotation>,
    /// Safe-search.
    pub safe_search_annotation: Option<SafeSearchAnnotation>,
    /// Objects.
    pub localized_object_annotations: Vec<ObjectAnnotation>,
}

/// Attribute guess from deep analysis.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AttributeGuess {
    /// Guessed value.
    pub value: String,
    /// Confidence in `[0, 1]`.
    pub confidence: f32,
}

/// Face found by deep analysis.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct DeepFace {
    /// `[x, y, width, height]` in `[0, 1]` image coordinates.
    pub bbox: [f32; 4],
    /// Detection confidence.
    pub confidence: f32,
    /// Named landmarks in `[0, 1]` image coordinates.
    pub landmarks: BTreeMap<String, [f32; 2]>,
    /// Estimated age in years.
    pub age: Option<f32>,
    /// Confidence of the age estimate.
    pub age_confidence: f32,
    /// Estimated gender.
    pub gender: Option<Gender>,
    /// Confidence of the gender estimate.
    pub gender_confidence: f32,
    /// Roll, pan and tilt in degrees.
    pub pose: Option<[f32; 3]>,
}

/// Response of a deep-analysis provider.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct DeepAnalysisPayload {
    /// Faces.
    pub faces: Vec<DeepFace>,
    /// Attribute guesses keyed by snake_case name (`skin_tone`, `hair_color`...).
    pub attributes: BTreeMap<String, AttributeGuess>,
    /// Hair descriptions.
    pub hair: Vec<AttributeGuess>,
    /// Clothing descriptions.
    pub clothing: Vec<AttributeGuess>,
}
