//! Canned provider payloads.

use std::collections::BTreeMap;

use portrait_qa_core::domain::{BoundingBox, Gender, Likelihood};
use portrait_qa_core::features::{
    AgeAnnotation, AnnotationPayload, AttributeGuess, BoundingPoly, DeepAnalysisPayload, DeepFace,
    EntityAnnotation, FaceAnnotation, GenderAnnotation, Landmark, ObjectAnnotation, Position,
    SafeSearchAnnotation, TextAnnotation, Vertex,
};
use portrait_qa_core::ports::ProviderResponse;

/// Landmark names, with offsets as fractions of the face box.
const LANDMARKS: &[(&str, f32, f32)] = &[
    ("LEFT_EYE", 0.31, 0.38),
    ("RIGHT_EYE", 0.69, 0.38),
    ("LEFT_EYE_PUPIL", 0.31, 0.38),
    ("RIGHT_EYE_PUPIL", 0.69, 0.38),
    ("LEFT_EYE_TOP_BOUNDARY", 0.31, 0.35),
    ("RIGHT_EYE_TOP_BOUNDARY", 0.69, 0.35),
    ("LEFT_EYE_BOTTOM_BOUNDARY", 0.31, 0.41),
    ("RIGHT_EYE_BOTTOM_BOUNDARY", 0.69, 0.41),
    ("NOSE_TIP", 0.5, 0.56),
    ("UPPER_LIP", 0.5, 0.7),
    ("LOWER_LIP", 0.5, 0.76),
    ("MOUTH_LEFT", 0.38, 0.73),
    ("MOUTH_RIGHT", 0.62, 0.73),
    ("MOUTH_CENTER", 0.5, 0.73),
    ("CHIN_GNATHION", 0.5, 0.95),
    ("FOREHEAD_GLABELLA", 0.5, 0.28),
];

#[allow(clippy::cast_precision_loss)]
fn poly(bbox: BoundingBox) -> BoundingPoly {
    let (x0, y0) = (bbox.x as f32, bbox.y as f32);
    let (x1, y1) = (x0 + bbox.width as f32, y0 + bbox.height as f32);
    BoundingPoly {
        vertices: vec![
            Vertex { x: x0, y: y0 },
            Vertex { x: x1, y: y0 },
            Vertex { x: x1, y: y1 },
            Vertex { x: x0, y: y1 },
        ],
        normalized_vertices: Vec::new(),
    }
}

/// Builder for one annotated face.
///
/// Defaults to a clear, frontal, smiling face with all sixteen landmarks.
#[derive(Debug, Clone)]
pub struct FaceBuilder {
    face: FaceAnnotation,
}

impl FaceBuilder {
    /// Face occupying `bbox` in pixel coordinates.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn new(bbox: BoundingBox) -> Self {
        let landmarks = LANDMARKS
            .iter()
            .map(|&(name, fx, fy)| Landmark {
                kind: name.to_string(),
                position: Position {
                    x: (bbox.width as f32).mul_add(fx, bbox.x as f32),
                    y: (bbox.height as f32).mul_add(fy, bbox.y as f32),
                    z: Some(0.0),
                },
            })
            .collect();
        Self {
            face: FaceAnnotation {
                bounding_poly: poly(bbox),
                landmarks,
                detection_confidence: 0.97,
                landmarking_confidence: 0.9,
                joy_likelihood: Likelihood::Likely,
                sorrow_likelihood: Likelihood::VeryUnlikely,
                anger_likelihood: Likelihood::VeryUnlikely,
                surprise_likelihood: Likelihood::VeryUnlikely,
                under_exposed_likelihood: Likelihood::VeryUnlikely,
                blurred_likelihood: Likelihood::VeryUnlikely,
                headwear_likelihood: Likelihood::VeryUnlikely,
                eyewear_likelihood: Likelihood::VeryUnlikely,
                ..FaceAnnotation::default()
            },
        }
    }

    /// Adds an age range estimate.
    #[must_use]
    pub const fn age(mut self, low: u32, high: u32, confidence: f32) -> Self {
        self.face.age = Some(AgeAnnotation {
            low,
            high,
            confidence,
        });
        self
    }

    /// Adds a gender estimate.
    #[must_use]
    pub const fn gender(mut self, value: Gender, confidence: f32) -> Self {
        self.face.gender = Some(GenderAnnotation { value, confidence });
        self
    }

    /// Sets the blur likelihood.
    #[must_use]
    pub const fn blurred(mut self, likelihood: Likelihood) -> Self {
        self.face.blurred_likelihood = likelihood;
        self
    }

    /// Sets roll, pan and tilt in degrees.
    #[must_use]
    pub const fn pose(mut self, roll: f32, pan: f32, tilt: f32) -> Self {
        self.face.roll_angle = roll;
        self.face.pan_angle = pan;
        self.face.tilt_angle = tilt;
        self
    }

    /// Sets the headwear likelihood.
    #[must_use]
    pub const fn headwear(mut self, likelihood: Likelihood) -> Self {
        self.face.headwear_likelihood = likelihood;
        self
    }

    /// Sets the eyewear likelihood.
    #[must_use]
    pub const fn eyewear(mut self, likelihood: Likelihood) -> Self {
        self.face.eyewear_likelihood = likelihood;
        self
    }

    /// Sets detection and landmarking confidence.
    #[must_use]
    pub const fn confidence(mut self, detection: f32, landmarking: f32) -> Self {
        self.face.detection_confidence = detection;
        self.face.landmarking_confidence = landmarking;
        self
    }

    /// Drops every landmark.
    #[must_use]
    pub fn without_landmarks(mut self) -> Self {
        self.face.landmarks.clear();
        self
    }

    /// Returns the annotation.
    #[must_use]
    pub fn build(self) -> FaceAnnotation {
        self.face
    }
}

/// Builder for a full annotation response.
#[derive(Debug, Clone, Default)]
pub struct AnnotationBuilder {
    payload: AnnotationPayload,
}

impl AnnotationBuilder {
    /// Empty response: no faces, labels or text.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a face.
    #[must_use]
    pub fn face(mut self, face: FaceBuilder) -> Self {
        self.payload.face_annotations.push(face.build());
        self
    }

    /// Adds a label.
    #[must_use]
    pub fn label(mut self, description: &str, score: f32) -> Self {
        self.payload.label_annotations.push(EntityAnnotation {
            description: description.to_string(),
            score,
        });
        self
    }

    /// Sets the recognised full text.
    #[must_use]
    pub fn text(mut self, text: &str) -> Self {
        self.payload.text_annotations = vec![TextAnnotation {
            description: text.to_string(),
            bounding_poly: None,
        }];
        self
    }

    /// Sets safe-search likelihoods; unlisted categories are very unlikely.
    #[must_use]
    pub fn safe_search(mut self, adult: Likelihood, violence: Likelihood) -> Self {
        self.payload.safe_search_annotation = Some(SafeSearchAnnotation {
            adult,
            violence,
            spoof: Likelihood::VeryUnlikely,
            medical: Likelihood::VeryUnlikely,
            racy: Likelihood::VeryUnlikely,
        });
        self
    }

    /// Adds a localized `Person` object, in normalised coordinates.
    #[must_use]
    pub fn person(mut self, x0: f32, y0: f32, x1: f32, y1: f32) -> Self {
        self.payload.localized_object_annotations.push(ObjectAnnotation {
            name: "Person".to_string(),
            score: 0.93,
            bounding_poly: BoundingPoly {
                vertices: Vec::new(),
                normalized_vertices: vec![Vertex { x: x0, y: y0 }, Vertex { x: x1, y: y1 }],
            },
        });
        self
    }

    /// Returns the payload.
    #[must_use]
    pub fn build(self) -> AnnotationPayload {
        self.payload
    }

    /// Returns the payload wrapped as a provider response.
    #[must_use]
    pub fn response(self) -> ProviderResponse {
        ProviderResponse::Annotation(self.payload)
    }
}

/// Builder for deep-analysis responses.
#[derive(Debug, Clone, Default)]
pub struct DeepAnalysisBuilder {
    payload: DeepAnalysisPayload,
}

impl DeepAnalysisBuilder {
    /// Empty response.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a face at `[x, y, width, height]` in normalised coordinates.
    #[must_use]
    pub fn face(mut self, bbox: [f32; 4], age: Option<f32>) -> Self {
        let landmarks = LANDMARKS
            .iter()
            .map(|&(name, fx, fy)| {
                (
                    name.to_string(),
                    [bbox[2].mul_add(fx, bbox[0]), bbox[3].mul_add(fy, bbox[1])],
                )
            })
            .collect::<BTreeMap<_, _>>();
        self.payload.faces.push(DeepFace {
            bbox,
            confidence: 0.9,
            landmarks,
            age,
            age_confidence: if age.is_some() { 0.75 } else { 0.0 },
            ..DeepFace::default()
        });
        self
    }

    /// Adds an attribute guess such as `hair_color`.
    #[must_use]
    pub fn attribute(mut self, name: &str, value: &str, confidence: f32) -> Self {
        self.payload.attributes.insert(
            name.to_string(),
            AttributeGuess {
                value: value.to_string(),
                confidence,
            },
        );
        self
    }

    /// Returns the payload wrapped as a provider response.
    #[must_use]
    pub fn response(self) -> ProviderResponse {
        ProviderResponse::Deep(self.payload)
    }
}
