//! Translation of provider payloads into [`FeatureReport`]s.

use crate::domain::{
    AgeEstimate, BoundingBox, ContentSafety, EmotionLikelihoods, FaceFeatures, FeatureReport,
    FeatureSource, GenderEstimate, LabelGuess, Likelihood, Point3, PoseAngles, TextBlock,
};
use crate::ports::ProviderResponse;

use super::payload::{
    AnnotationPayload, AttributeGuess, BoundingPoly, DeepAnalysisPayload, DeepFace,
    FaceAnnotation, Vertex,
};

const HAIR_WORDS: &[&str] = &["hair", "blond", "ponytail", "braid", "curl", "afro", "bald"];
const CLOTHING_WORDS: &[&str] = &[
    "shirt", "dress", "jacket", "sweater", "hoodie", "coat", "suit", "blouse", "jersey",
    "uniform", "outerwear", "cardigan", "vest", "sleeve", "scarf", "collar",
];

/// Normalises any provider response.
#[must_use]
pub fn normalize(response: &ProviderResponse, width: u32, height: u32) -> FeatureReport {
    match response {
        ProviderResponse::Annotation(payload) => normalize_annotation(payload, width, height),
        ProviderResponse::Deep(payload) => normalize_deep(payload, width, height),
    }
}

/// Normalises an annotation payload.
#[must_use]
pub fn normalize_annotation(
    payload: &AnnotationPayload,
    width: u32,
    height: u32,
) -> FeatureReport {
    let faces: Vec<FaceFeatures> = payload
        .face_annotations
        .iter()
        .filter_map(|face| annotation_face(face, width, height))
        .collect();

    let labels: Vec<LabelGuess> = payload
        .label_annotations
        .iter()
        .map(|l| LabelGuess::new(l.description.clone(), l.score))
        .collect();
    let hair = labels
        .iter()
        .filter(|l| mentions(&l.value, HAIR_WORDS))
        .cloned()
        .collect();
    let clothing = labels
        .iter()
        .cloned()
        .chain(
            payload
                .localized_object_annotations
                .iter()
                .map(|o| LabelGuess::new(o.name.clone(), o.score)),
        )
        .filter(|l| mentions(&l.value, CLOTHING_WORDS))
        .collect();

    let person = payload
        .localized_object_annotations
        .iter()
        .filter(|o| o.name.eq_ignore_ascii_case("person"))
        .max_by(|a, b| a.score.total_cmp(&b.score))
        .and_then(|o| poly_box(&o.bounding_poly, width, height));

    let text_blocks = payload
        .text_annotations
        .first()
        .filter(|t| !t.description.trim().is_empty())
        .map(|t| TextBlock {
            text: t.description.trim().to_string(),
            bbox: t
                .bounding_poly
                .as_ref()
                .and_then(|p| poly_box(p, width, height)),
        })
        .into_iter()
        .collect();

    let content_safety = payload.safe_search_annotation.map(|s| ContentSafety {
        adult: s.adult,
        violence: s.violence,
        racy: s.racy,
        medical: s.medical,
        spoof: s.spoof,
    });

    let mut report = FeatureReport {
        faces,
        hair,
        clothing,
        labels,
        text_blocks,
        content_safety,
        ..FeatureReport::empty(FeatureSource::Primary, width, height)
    };
    report.body = person.or_else(|| estimate_body(&report));
    report
}

/// Normalises a deep-analysis payload.
#[must_use]
pub fn normalize_deep(payload: &DeepAnalysisPayload, width: u32, height: u32) -> FeatureReport {
    let faces = payload
        .faces
        .iter()
        .filter_map(|face| deep_face(face, width, height))
        .collect();
    let guess = |g: &AttributeGuess| LabelGuess::new(g.value.clone(), g.confidence);

    let mut report = FeatureReport {
        faces,
        hair: payload.hair.iter().map(guess).collect(),
        clothing: payload.clothing.iter().map(guess).collect(),
        attributes: payload
            .attributes
            .iter()
            .map(|(k, v)| (k.to_ascii_lowercase(), guess(v)))
            .collect(),
        ..FeatureReport::empty(FeatureSource::Fallback, width, height)
    };
    report.body = estimate_body(&report);
    report
}

/// Copies image-level context from `primary` into a fallback report that lacks it.
pub fn merge_context(report: &mut FeatureReport, primary: FeatureReport) {
    if report.labels.is_empty() {
        report.labels = primary.labels;
    }
    if report.text_blocks.is_empty() {
        report.text_blocks = primary.text_blocks;
    }
    if report.content_safety.is_none() {
        report.content_safety = primary.content_safety;
    }
    if report.hair.is_empty() {
        report.hair = primary.hair;
    }
    if report.clothing.is_empty() {
        report.clothing = primary.clothing;
    }
    for (key, value) in primary.attributes {
        report.attributes.entry(key).or_insert(value);
    }
}

fn annotation_face(face: &FaceAnnotation, width: u32, height: u32) -> Option<FaceFeatures> {
    let poly = face.fd_bounding_poly.as_ref().unwrap_or(&face.bounding_poly);
    let bbox = poly_box(poly, width, height)?;
    let landmarks = face
        .landmarks
        .iter()
        .map(|l| {
            (
                l.kind.to_ascii_uppercase(),
                Point3 {
                    x: l.position.x,
                    y: l.position.y,
                    z: l.position.z,
                },
            )
        })
        .collect();

    Some(FaceFeatures {
        bbox,
        landmarks,
        detection_confidence: face.detection_confidence.clamp(0.0, 1.0),
        landmarking_confidence: face.landmarking_confidence.clamp(0.0, 1.0),
        pose: PoseAngles {
            roll: face.roll_angle,
            pan: face.pan_angle,
            tilt: face.tilt_angle,
        },
        headwear: face.headwear_likelihood,
        eyewear: face.eyewear_likelihood,
        blurred: face.blurred_likelihood,
        under_exposed: face.under_exposed_likelihood,
        emotions: EmotionLikelihoods {
            joy: face.joy_likelihood,
            sorrow: face.sorrow_likelihood,
            anger: face.anger_likelihood,
            surprise: face.surprise_likelihood,
        },
        age: face.age.map(|a| AgeEstimate {
            years: (a.low + a.high.max(a.low)) / 2,
            confidence: a.confidence.clamp(0.0, 1.0),
        }),
        gender: face.gender.map(|g| GenderEstimate {
            value: g.value,
            confidence: g.confidence.clamp(0.0, 1.0),
        }),
    })
}

#[allow(
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    clippy::cast_precision_loss
)]
fn deep_face(face: &DeepFace, width: u32, height: u32) -> Option<FaceFeatures> {
    let [x, y, w, h] = face.bbox;
    let corners = [Vertex { x, y }, Vertex { x: x + w, y: y + h }];
    let bbox = vertex_box(&corners, width, height, true)?;
    let (fw, fh) = (width as f32, height as f32);
    let landmarks = face
        .landmarks
        .iter()
        .map(|(name, [lx, ly])| {
            (
                name.to_ascii_uppercase(),
                Point3 {
                    x: lx * fw,
                    y: ly * fh,
                    z: None,
                },
            )
        })
        .collect();
    let confidence = face.confidence.clamp(0.0, 1.0);
    let [roll, pan, tilt] = face.pose.unwrap_or_default();

    Some(FaceFeatures {
        bbox,
        landmarks,
        detection_confidence: confidence,
        landmarking_confidence: confidence,
        pose: PoseAngles { roll, pan, tilt },
        headwear: Likelihood::Unknown,
        eyewear: Likelihood::Unknown,
        blurred: Likelihood::Unknown,
        under_exposed: Likelihood::Unknown,
        emotions: EmotionLikelihoods::default(),
        age: face.age.filter(|a| a.is_finite() && *a >= 0.0).map(|a| AgeEstimate {
            years: a.round() as u32,
            confidence: face.age_confidence.clamp(0.0, 1.0),
        }),
        gender: face.gender.map(|value| GenderEstimate {
            value,
            confidence: face.gender_confidence.clamp(0.0, 1.0),
        }),
    })
}

/// Pixel box of a polygon, preferring pixel vertices over normalised ones.
fn poly_box(poly: &BoundingPoly, width: u32, height: u32) -> Option<BoundingBox> {
    if poly.vertices.is_empty() {
        vertex_box(&poly.normalized_vertices, width, height, true)
    } else {
        vertex_box(&poly.vertices, width, height, false)
    }
}

#[allow(
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    clippy::cast_precision_loss
)]
fn vertex_box(
    vertices: &[Vertex],
    width: u32,
    height: u32,
    normalized: bool,
) -> Option<BoundingBox> {
    let (sx, sy) = if normalized {
        (width as f32, height as f32)
    } else {
        (1.0, 1.0)
    };
    let xs = vertices.iter().map(|v| (v.x * sx).clamp(0.0, width as f32));
    let ys = vertices.iter().map(|v| (v.y * sy).clamp(0.0, height as f32));
    let (x0, x1) = xs.fold((f32::MAX, f32::MIN), |(lo, hi), v| (lo.min(v), hi.max(v)));
    let (y0, y1) = ys.fold((f32::MAX, f32::MIN), |(lo, hi), v| (lo.min(v), hi.max(v)));
    if x1 - x0 < 1.0 || y1 - y0 < 1.0 {
        return None;
    }
    Some(BoundingBox::new(
        x0 as u32,
        y0 as u32,
        (x1 - x0).round() as u32,
        (y1 - y0).round() as u32,
    ))
}

/// Head-and-shoulders body estimate below the primary face.
fn estimate_body(report: &FeatureReport) -> Option<BoundingBox> {
    let face = report.primary_face()?.bbox;
    let (cx, _) = face.center();
    let body_w = face.width.saturating_mul(3);
    let body_h = face.height.saturating_mul(6);
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let x = (cx - f64::from(body_w) / 2.0).max(0.0) as u32;
    let estimate = BoundingBox::new(x, face.y, body_w, body_h);
    Some(estimate.clamp_to(report.image_width, report.image_height))
}

fn mentions(value: &str, words: &[&str]) -> bool {
    let lower = value.to_lowercase();
    words.iter().any(|w| lower.contains(w))
}

#[cfg(test)]
#[allow(clippy::expect_used)]
mod tests {
    use super::*;

    const ANNOTATION: &str = r#"{
        "faceAnnotations": [{
            "boundingPoly": {"vertices": [{"x": 90, "y": 40}, {"x": 310, "y": 40}, {"x": 310, "y": 300}, {"x": 90, "y": 300}]},
            "fdBoundingPoly": {"vertices": [{"x": 110, "y": 80}, {"x": 290, "y": 80}, {"x": 290, "y": 280}, {"x": 110, "y": 280}]},
            "landmarks": [
                {"type": "LEFT_EYE", "position": {"x": 160, "y": 150, "z": 0.1}},
                {"type": "RIGHT_EYE", "position": {"x": 240, "y": 150}}
            ],
            "rollAngle": 2.5, "panAngle": -8.0, "tiltAngle": 1.0,
            "detectionConfidence": 0.97, "landmarkingConfidence": 0.81,
            "joyLikelihood": "VERY_LIKELY", "blurredLikelihood": "VERY_UNLIKELY",
            "headwearLikelihood": "POSSIBLE",
            "age": {"low": 24, "high": 28, "confidence": 0.7}
        }],
        "labelAnnotations": [
            {"description": "Brown hair", "score": 0.91},
            {"description": "T-shirt", "score": 0.72},
            {"description": "Smile", "score": 0.88}
        ],
        "textAnnotations": [
            {"description": "Happy birthday\n", "boundingPoly": {"vertices": [{"x": 10, "y": 500}, {"x": 200, "y": 540}]}},
            {"description": "Happy"}
        ],
        "safeSearchAnnotation": {"adult": "VERY_UNLIKELY", "racy": "UNLIKELY"},
        "localizedObjectAnnotations": [
            {"name": "Person", "score": 0.9, "boundingPoly": {"normalizedVertices": [{"x": 0.1, "y": 0.05}, {"x": 0.9, "y": 1.0}]}}
        ]
    }"#;

    #[test]
    fn test_annotation_payload_normalised() {
        let payload: AnnotationPayload = serde_json::from_str(ANNOTATION).expect("parse");
        let report = normalize_annotation(&payload, 400, 600);

        assert_eq!(report.source, FeatureSource::Primary);
        assert_eq!(report.face_count(), 1);
        let face = &report.faces[0];
        assert_eq!(face.bbox, BoundingBox::new(110, 80, 180, 200));
        assert_eq!(face.landmarks.len(), 2);
        assert_eq!(face.age.map(|a| a.years), Some(26));
        assert_eq!(face.emotions.joy, Likelihood::VeryLikely);
        assert_eq!(face.headwear, Likelihood::Possible);
        assert_eq!(face.eyewear, Likelihood::Unknown);

        assert_eq!(report.hair.len(), 1);
        assert_eq!(report.clothing[0].value, "T-shirt");
        assert_eq!(report.text_blocks.len(), 1);
        assert_eq!(report.text_blocks[0].text, "Happy birthday");
        assert_eq!(report.body, Some(BoundingBox::new(40, 30, 320, 570)));
        assert_eq!(report.content_safety.map(|s| s.racy), Some(Likelihood::Unlikely));
    }

    #[test]
    fn test_deep_payload_normalised() {
        let payload: DeepAnalysisPayload = serde_json::from_str(
            r#"{
                "faces": [{"bbox": [0.25, 0.2, 0.5, 0.4], "confidence": 0.8,
                           "landmarks": {"left_eye": [0.4, 0.3]}, "age": 31.6, "ageConfidence": 0.6}],
                "attributes": {"EYE_COLOR": {"value": "hazel", "confidence": 0.7}},
                "hair": [{"value": "curly black", "confidence": 0.8}]
            }"#,
        )
        .expect("parse");
        let report = normalize_deep(&payload, 1000, 1000);

        assert_eq!(report.source, FeatureSource::Fallback);
        let face = &report.faces[0];
        assert_eq!(face.bbox, BoundingBox::new(250, 200, 500, 400));
        assert_eq!(face.age.map(|a| a.years), Some(32));
        assert!(face.landmarks.contains_key("LEFT_EYE"));
        assert_eq!(report.attributes["eye_color"].value, "hazel");
        assert!(report.body.is_some());
    }

    #[test]
    fn test_degenerate_face_box_dropped() {
        let payload = AnnotationPayload {
            face_annotations: vec![FaceAnnotation::default()],
            ..AnnotationPayload::default()
        };
        assert!(normalize_annotation(&payload, 100, 100).faces.is_empty());
    }

    #[test]
    fn test_merge_keeps_fallback_faces() {
        let payload: AnnotationPayload = serde_json::from_str(ANNOTATION).expect("parse");
        let mut primary = normalize_annotation(&payload, 400, 600);
        primary.faces.clear();
        let mut fallback = FeatureReport::empty(FeatureSource::Fallback, 400, 600);
        fallback.faces = payload
            .face_annotations
            .iter()
            .filter_map(|f| annotation_face(f, 400, 600))
            .collect();

        merge_context(&mut fallback, primary);
        assert_eq!(fallback.source, FeatureSource::Fallback);
        assert_eq!(fallback.face_count(), 1);
        assert_eq!(fallback.text_blocks.len(), 1);
        assert!(fallback.content_safety.is_some());
    }
}
