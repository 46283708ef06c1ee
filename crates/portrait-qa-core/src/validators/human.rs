//! Face detection, clarity, count and age checks.

use crate::analysis::ColorStats;
use crate::domain::{FaceFeatures, FeatureReport, ImageInput, StepName, StepResult};

use super::{StepInput, Validator};

/// Configuration for human feature analysis.
#[derive(Debug, Clone)]
pub struct HumanConfig {
    /// Clarity below this is a hard error when a clear face is required.
    pub min_clarity: f64,
    /// Clarity below this is a warning.
    pub good_clarity: f64,
    /// Landmark count that counts as a complete set.
    pub landmark_target: usize,
    /// Eye landmarks that count as fully visible eyes.
    pub eye_landmark_target: usize,
    /// Mouth landmarks that count as a fully visible mouth.
    pub mouth_landmark_target: usize,
    /// Head rotation (degrees) above which a warning is recorded.
    pub max_pose_degrees: f32,
    /// Occlusion likelihood above which a warning is recorded.
    pub occlusion_warning: f64,
    /// Face area over image area below which the face counts as small.
    pub min_face_ratio: f64,
    /// Age estimates below this confidence produce a warning.
    pub min_age_confidence: f32,
}

impl Default for HumanConfig {
    fn default() -> Self {
        Self {
            min_clarity: 0.5,
            good_clarity: 0.7,
            landmark_target: 15,
            eye_landmark_target: 6,
            mouth_landmark_target: 3,
            max_pose_degrees: 25.0,
            occlusion_warning: 0.5,
            min_face_ratio: 0.04,
            min_age_confidence: 0.5,
        }
    }
}

/// Checks that exactly the right person is clearly visible.
pub struct HumanValidator {
    config: HumanConfig,
}

impl HumanValidator {
    /// Creates a new human feature validator with the given configuration.
    #[must_use]
    pub const fn new(config: HumanConfig) -> Self {
        Self { config }
    }

    /// Face clarity in `[0, 1]` from detection evidence.
    #[allow(clippy::cast_precision_loss)]
    #[must_use]
    pub fn clarity(&self, face: &FaceFeatures) -> f64 {
        let landmark_share =
            (face.landmarks.len() as f64 / self.config.landmark_target.max(1) as f64).min(1.0);
        let penalty = f64::from(face.blurred.score().max(face.under_exposed.score()));
        let clarity = 0.35 * f64::from(face.detection_confidence)
            + 0.25 * f64::from(face.landmarking_confidence)
            + 0.2 * landmark_share
            + 0.2 * (1.0 - penalty);
        clarity.clamp(0.0, 1.0)
    }

    #[allow(clippy::cast_precision_loss)]
    fn visibility(face: &FaceFeatures, needles: &[&str], target: usize) -> f64 {
        (face.landmarks_matching(needles) as f64 / target.max(1) as f64).min(1.0)
    }
}

impl Default for HumanValidator {
    fn default() -> Self {
        Self::new(HumanConfig::default())
    }
}

impl Validator for HumanValidator {
    fn name(&self) -> StepName {
        StepName::HumanFeatureAnalysis
    }

    fn needs_features(&self) -> bool {
        true
    }

    #[allow(clippy::too_many_lines, clippy::cast_precision_loss)]
    fn validate(&self, input: &StepInput<'_>) -> anyhow::Result<StepResult> {
        let cfg = &self.config;
        let report = input.require_features()?;
        let options = input.options;
        let mut result = StepResult::new(self.name());

        let count = report.face_count();
        result.metric("faceCount", count as f64);

        let Some(face) = report.primary_face() else {
            result.error("No face detected in the image");
            result.flag("faceCountOk", false);
            result.flag("clarityOk", false);
            result.flag("ageWithinRange", false);
            result.metric("score", 0.0);
            return Ok(result);
        };

        let limit = options.face_limit() as usize;
        let count_ok = count <= limit;
        result.flag("faceCountOk", count_ok);
        if !count_ok {
            if options.require_single_person {
                result.error(format!(
                    "Expected a single person but detected {count} faces"
                ));
            } else {
                result.error(format!(
                    "Detected {count} faces but at most {limit} people are allowed"
                ));
            }
        }

        let clarity = self.clarity(face);
        result.metric("faceClarity", clarity);
        let clarity_ok = !options.require_clear_face || clarity >= cfg.min_clarity;
        result.flag("clarityOk", clarity_ok);
        if !clarity_ok {
            result.error(format!(
                "Face is not clear enough (clarity {clarity:.2}, minimum {:.2})",
                cfg.min_clarity
            ));
        } else if clarity < cfg.good_clarity {
            result.warn("Face could be clearer; try better light and a steady camera");
        }

        match face.age {
            Some(age) => {
                result.metric("estimatedAge", f64::from(age.years));
                let in_range = (options.min_age..=options.max_age).contains(&age.years);
                result.flag("ageWithinRange", in_range);
                if !in_range {
                    result.error(format!(
                        "Estimated age {} is outside the allowed range {}-{}",
                        age.years, options.min_age, options.max_age
                    ));
                } else if age.confidence < cfg.min_age_confidence {
                    result.warn("Age estimate is uncertain");
                }
            }
            None => {
                result.flag("ageWithinRange", true);
                let default_window = options.min_age == 0 && options.max_age >= 120;
                if !default_window {
                    result.warn("Age could not be estimated; the age range was not verified");
                }
            }
        }

        if let Some(gender) = face.gender {
            let allowed = options.allowed_genders.contains(&gender.value);
            result.flag("genderAllowed", allowed);
            if !allowed {
                result.warn("Estimated gender is outside the allowed set");
            }
        }

        let eye_visibility = Self::visibility(face, &["EYE"], cfg.eye_landmark_target);
        let mouth_visibility =
            Self::visibility(face, &["MOUTH", "LIP"], cfg.mouth_landmark_target);
        result.metric("eyeVisibility", eye_visibility);
        result.metric("mouthVisibility", mouth_visibility);
        if eye_visibility < 0.5 {
            result.warn("Eyes are not clearly visible");
        }

        let angle = face.pose.max_abs();
        let angle_score = 1.0 - (f64::from(angle) / 45.0).min(1.0);
        result.metric("faceAngle", f64::from(angle));
        result.metric("angleScore", angle_score);
        if angle > cfg.max_pose_degrees {
            result.warn(format!(
                "Face is turned away from the camera ({angle:.0} degrees)"
            ));
        }

        let pose_stability = 1.0
            - 0.5 * (f64::from(face.pose.roll.abs()) / 30.0).min(1.0)
            - 0.5 * (f64::from(face.pose.tilt.abs()) / 30.0).min(1.0);
        result.metric("poseStability", pose_stability);

        let occlusion = f64::from(face.headwear.score().max(face.eyewear.score()));
        result.metric("occlusion", occlusion);
        if occlusion > cfg.occlusion_warning {
            result.warn("Face may be partially covered by headwear or eyewear");
        }

        let face_ratio = face.bbox.area() as f64
            / (f64::from(input.image.width) * f64::from(input.image.height)).max(1.0);
        result.metric("faceSizeRatio", face_ratio);
        if face_ratio < cfg.min_face_ratio {
            result.warn("Face is small in the frame; a closer photo works better");
        }

        result.metric("skinToneConfidence", skin_tone_confidence(report, face, input.image));
        result.metric(
            "hairVisibility",
            report
                .hair
                .iter()
                .map(|h| f64::from(h.confidence))
                .fold(0.0, f64::max),
        );
        result.metric(
            "bodyVisibility",
            report.body.map_or(0.0, |b| {
                (f64::from(b.height) / f64::from(input.image.height.max(1))).min(1.0)
            }),
        );

        let score = 0.45 * clarity
            + 0.2 * angle_score
            + 0.15 * (1.0 - occlusion)
            + 0.1 * eye_visibility
            + 0.1 * mouth_visibility;
        let score = if result.valid { score } else { score.min(0.3) };
        result.metric("score", score);

        Ok(result)
    }
}

/// Provider skin-tone confidence, or the skin-pixel share inside the face box.
fn skin_tone_confidence(report: &FeatureReport, face: &FaceFeatures, image: &ImageInput) -> f64 {
    if let Some(guess) = report.attributes.get("skin_tone") {
        return f64::from(guess.confidence);
    }
    let bbox = face.bbox.clamp_to(image.width, image.height);
    let region = image
        .image
        .crop_imm(bbox.x, bbox.y, bbox.width, bbox.height)
        .thumbnail(128, 128)
        .to_rgb8();
    ColorStats::from_rgb(&region).skin_ratio
}

#[cfg(test)]
#[allow(clippy::expect_used)]
mod tests {
    use super::*;
    use crate::domain::{AgeEstimate, Gender, GenderEstimate, Likelihood, ValidationOptions};
    use crate::testutil;

    fn run(report: &FeatureReport, options: &ValidationOptions) -> StepResult {
        let image = testutil::jpeg_input(640, 640);
        HumanValidator::default()
            .validate(&StepInput {
                image: &image,
                features: Some(report),
                options,
            })
            .expect("validate")
    }

    #[test]
    fn test_no_face_is_error() {
        let report = testutil::report_with_faces(0);
        let result = run(&report, &ValidationOptions::default());
        assert!(!result.valid);
        assert_eq!(result.errors, vec!["No face detected in the image".to_string()]);
    }

    #[test]
    fn test_two_faces_with_single_person_required() {
        let report = testutil::report_with_faces(2);
        let result = run(&report, &ValidationOptions::default());
        assert!(!result.valid);
        assert!(result.errors[0].contains("detected 2 faces"));
        assert!(!result.is_set("faceCountOk"));
    }

    #[test]
    fn test_max_people_allows_group() {
        let report = testutil::report_with_faces(3);
        let options = ValidationOptions {
            require_single_person: false,
            max_people: 3,
            ..ValidationOptions::default()
        };
        let result = run(&report, &options);
        assert!(result.valid, "errors: {:?}", result.errors);
    }

    #[test]
    fn test_age_outside_window_names_estimate() {
        let mut report = testutil::report_with_faces(1);
        report.faces[0].age = Some(AgeEstimate {
            years: 25,
            confidence: 0.9,
        });
        let options = ValidationOptions {
            max_age: 20,
            ..ValidationOptions::default()
        };
        let result = run(&report, &options);
        assert!(!result.valid);
        assert!(result.errors[0].contains("Estimated age 25"));
        assert!(result.errors[0].contains("0-20"));
        assert!(!result.is_set("ageWithinRange"));
    }

    #[test]
    fn test_clear_face_scores_high() {
        let report = testutil::report_with_faces(1);
        let result = run(&report, &ValidationOptions::default());
        assert!(result.valid, "errors: {:?}", result.errors);
        assert!(result.warnings.is_empty(), "warnings: {:?}", result.warnings);
        assert!(result.score() > 0.9, "score {}", result.score());
    }

    #[test]
    fn test_blurred_face_fails_clarity() {
        let mut report = testutil::report_with_faces(1);
        let face = &mut report.faces[0];
        face.detection_confidence = 0.4;
        face.landmarking_confidence = 0.2;
        face.landmarks.clear();
        face.blurred = Likelihood::VeryLikely;
        let result = run(&report, &ValidationOptions::default());
        assert!(!result.valid);
        assert!(result.errors[0].contains("not clear enough"));

        let lenient = ValidationOptions {
            require_clear_face: false,
            ..ValidationOptions::default()
        };
        assert!(run(&report, &lenient).valid);
    }

    #[test]
    fn test_disallowed_gender_only_warns() {
        let mut report = testutil::report_with_faces(1);
        report.faces[0].gender = Some(GenderEstimate {
            value: Gender::Male,
            confidence: 0.9,
        });
        let options = ValidationOptions {
            allowed_genders: [Gender::Female].into_iter().collect(),
            ..ValidationOptions::default()
        };
        let result = run(&report, &options);
        assert!(result.valid);
        assert!(result.warnings.iter().any(|w| w.contains("gender")));
    }

    #[test]
    fn test_turned_face_warns() {
        let mut report = testutil::report_with_faces(1);
        report.faces[0].pose.pan = 40.0;
        let result = run(&report, &ValidationOptions::default());
        assert!(result.valid);
        assert!(result.warnings.iter().any(|w| w.contains("turned away")));
    }
}
