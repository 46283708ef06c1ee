//! Chooses corrective transforms from measured deficits.

use crate::domain::{
    BoundingBox, EnhancementKind, EnhancementLevel, EnhancementPlan, EnhancementStep,
    QualityMetrics, StepResult,
};

/// Thresholds below (or above) which a dimension gets a corrective step.
#[derive(Debug, Clone)]
pub struct PlannerConfig {
    /// Brightness band considered fine.
    pub brightness_band: (f64, f64),
    /// Contrast below this is stretched.
    pub min_contrast: f64,
    /// Sharpness below this is sharpened.
    pub min_sharpness: f64,
    /// Noise above this is smoothed.
    pub max_noise: f64,
    /// Saturation band considered fine.
    pub saturation_band: (f64, f64),
    /// Cast above this is neutralised.
    pub max_cast: f64,
    /// Compression or banding above this is smoothed.
    pub max_artifacts: f64,
    /// Face clarity below this gets a face-detail pass.
    pub min_face_clarity: f64,
    /// Intensity of the final optimisation pass at balanced level.
    pub optimize_intensity: f32,
    /// Smallest intensity a planned step is given before the level multiplier.
    pub min_intensity: f32,
}

impl Default for PlannerConfig {
    fn default() -> Self {
        Self {
            brightness_band: (0.35, 0.65),
            min_contrast: 0.35,
            min_sharpness: 0.6,
            max_noise: 0.4,
            saturation_band: (0.15, 0.6),
            max_cast: 0.25,
            max_artifacts: 0.4,
            min_face_clarity: 0.7,
            optimize_intensity: 0.5,
            min_intensity: 0.2,
        }
    }
}

/// Builds an [`EnhancementPlan`] from the quality, composition and human analyses.
#[derive(Debug, Clone, Default)]
pub struct EnhancementPlanner {
    config: PlannerConfig,
}

impl EnhancementPlanner {
    /// Creates a new planner with the given configuration.
    #[must_use]
    pub const fn new(config: PlannerConfig) -> Self {
        Self { config }
    }

    /// Plans the corrective steps.
    ///
    /// Noise and artifact smoothing go first so the later sharpening does not
    /// amplify them; the optimisation pass always comes last.
    #[must_use]
    pub fn plan(
        &self,
        quality: &QualityMetrics,
        human: Option<&StepResult>,
        face_box: Option<BoundingBox>,
        level: EnhancementLevel,
    ) -> EnhancementPlan {
        let cfg = &self.config;
        let mut steps = Vec::new();
        let mut push = |kind, deficit: f64, direction: f32| {
            #[allow(clippy::cast_possible_truncation)]
            let base = (deficit.clamp(0.0, 1.0) as f32).max(cfg.min_intensity);
            steps.push(EnhancementStep {
                kind,
                intensity: scaled(base, level),
                direction,
            });
        };

        let focus = &quality.focus;
        if focus.noise > cfg.max_noise {
            push(EnhancementKind::Denoise, focus.noise, 1.0);
        }
        let artifacts = quality.artifacts.compression.max(quality.artifacts.banding);
        if artifacts > cfg.max_artifacts {
            push(EnhancementKind::ArtifactReduce, artifacts, 1.0);
        }
        if quality.color.cast > cfg.max_cast {
            push(EnhancementKind::ColorCastCorrect, quality.color.cast, 1.0);
        }

        let (dark, bright) = cfg.brightness_band;
        let brightness = quality.lighting.brightness;
        if brightness < dark {
            push(EnhancementKind::BrightnessCorrect, (0.5 - brightness) / 0.5, 1.0);
        } else if brightness > bright {
            push(EnhancementKind::BrightnessCorrect, (brightness - 0.5) / 0.5, -1.0);
        }
        let contrast = quality.lighting.contrast;
        if contrast < cfg.min_contrast {
            push(
                EnhancementKind::ContrastCorrect,
                (cfg.min_contrast - contrast) / cfg.min_contrast,
                1.0,
            );
        }

        let (dull, vivid) = cfg.saturation_band;
        let saturation = quality.color.saturation;
        if saturation < dull {
            push(EnhancementKind::SaturationCorrect, (dull - saturation) / dull, 1.0);
        } else if saturation > vivid {
            push(
                EnhancementKind::SaturationCorrect,
                (saturation - vivid) / (1.0 - vivid).max(f64::EPSILON),
                -1.0,
            );
        }

        if focus.sharpness < cfg.min_sharpness {
            push(
                EnhancementKind::Sharpen,
                (cfg.min_sharpness - focus.sharpness) / cfg.min_sharpness,
                1.0,
            );
        }

        if let Some(clarity) = human.and_then(|h| h.get("faceClarity")) {
            if clarity < cfg.min_face_clarity && face_box.is_some() {
                push(
                    EnhancementKind::FaceDetailEnhance,
                    (cfg.min_face_clarity - clarity) / cfg.min_face_clarity,
                    1.0,
                );
            }
        }

        steps.push(EnhancementStep {
            kind: EnhancementKind::OptimizeForPersonalization,
            intensity: scaled(cfg.optimize_intensity, level),
            direction: 1.0,
        });

        EnhancementPlan { steps, face_box }
    }
}

fn scaled(intensity: f32, level: EnhancementLevel) -> f32 {
    (intensity * level.multiplier()).clamp(0.0, 1.5)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{FocusMetrics, LightingMetrics, StepName};

    fn healthy() -> QualityMetrics {
        let mut q = QualityMetrics::default();
        q.lighting = LightingMetrics {
            brightness: 0.5,
            contrast: 0.6,
            exposure: 1.0,
        };
        q.focus = FocusMetrics {
            blur: 0.1,
            sharpness: 0.9,
            noise: 0.1,
        };
        q.color.saturation = 0.35;
        q.color.balance = 1.0;
        q.overall_score = 0.9;
        q
    }

    #[test]
    fn test_healthy_image_only_optimizes() {
        let plan = EnhancementPlanner::default().plan(
            &healthy(),
            None,
            None,
            EnhancementLevel::Balanced,
        );
        assert_eq!(plan.kinds(), vec![EnhancementKind::OptimizeForPersonalization]);
    }

    #[test]
    fn test_dark_blurry_image_order() {
        let mut q = healthy();
        q.lighting.brightness = 0.15;
        q.focus.sharpness = 0.3;
        q.focus.noise = 0.7;
        let plan =
            EnhancementPlanner::default().plan(&q, None, None, EnhancementLevel::Balanced);
        assert_eq!(
            plan.kinds(),
            vec![
                EnhancementKind::Denoise,
                EnhancementKind::BrightnessCorrect,
                EnhancementKind::Sharpen,
                EnhancementKind::OptimizeForPersonalization,
            ]
        );
        assert!(plan.steps[1].direction > 0.0);
    }

    #[test]
    fn test_level_scales_intensity() {
        let mut q = healthy();
        q.lighting.brightness = 0.9;
        let planner = EnhancementPlanner::default();
        let soft = planner.plan(&q, None, None, EnhancementLevel::Conservative);
        let hard = planner.plan(&q, None, None, EnhancementLevel::Aggressive);
        assert!(soft.steps[0].direction < 0.0);
        assert!((hard.steps[0].intensity - 3.0 * soft.steps[0].intensity).abs() < 1e-4);
        assert!(hard.steps.iter().all(|s| s.intensity <= 1.5));
    }

    #[test]
    fn test_unclear_face_gets_detail_pass() {
        let mut human = StepResult::new(StepName::HumanFeatureAnalysis);
        human.metric("faceClarity", 0.55);
        let face = BoundingBox::new(10, 10, 50, 50);

        let planner = EnhancementPlanner::default();
        let plan = planner.plan(&healthy(), Some(&human), Some(face), EnhancementLevel::Balanced);
        assert!(plan.contains(EnhancementKind::FaceDetailEnhance));
        assert_eq!(plan.face_box, Some(face));

        let no_box = planner.plan(&healthy(), Some(&human), None, EnhancementLevel::Balanced);
        assert!(!no_box.contains(EnhancementKind::FaceDetailEnhance));
    }
}
