//! Pixel-level quality measurements.

use crate::analysis::{
    blockiness, laplacian_variance, noise_sigma, sharpness_score, working_copy, ColorStats,
    EdgeMap, ExposureAnalysis, ExposureConfig, WORKING_SIZE,
};
use crate::domain::{
    ArtifactMetrics, ColorMetrics, FocusMetrics, ImageInput, LightingMetrics, QualityMetrics,
    StepName, StepResult, TextureMetrics,
};

use super::{StepInput, Validator};

/// Configuration for quality measurement.
#[derive(Debug, Clone)]
pub struct QualityConfig {
    /// Blur above this is a hard error.
    pub blur_hard_threshold: f64,
    /// Blur above this is a warning.
    pub blur_warning: f64,
    /// Laplacian variance that scores 0.5 sharpness.
    pub sharpness_knee: f64,
    /// Noise sigma (grey levels) that counts as full noise.
    pub noise_full_scale: f64,
    /// Noise above this is a warning.
    pub noise_warning: f64,
    /// Noise up to this level does not lower the focus score.
    pub noise_tolerance: f64,
    /// Brightness band outside which a warning is recorded.
    pub brightness_band: (f64, f64),
    /// Contrast below this is a warning.
    pub min_contrast: f64,
    /// Contrast that scores full marks; portraits rarely need more.
    pub full_contrast: f64,
    /// Saturation considered ideal for portraits.
    pub ideal_saturation: f64,
    /// Saturation band outside which a warning is recorded.
    pub saturation_band: (f64, f64),
    /// Gray-world deviation accepted as natural.
    pub cast_tolerance: f64,
    /// Deviation beyond tolerance that counts as a full cast.
    pub cast_span: f64,
    /// Cast above this is a warning.
    pub cast_warning: f64,
    /// Compression or banding above this is a warning.
    pub artifact_warning: f64,
    /// Sobel magnitude that counts as an edge.
    pub edge_threshold: f32,
    /// Edge density that counts as fully detailed.
    pub detail_full_scale: f64,
    /// Histogram clipping levels.
    pub exposure: ExposureConfig,
}

impl Default for QualityConfig {
    fn default() -> Self {
        Self {
            blur_hard_threshold: 0.9,
            blur_warning: 0.6,
            sharpness_knee: 100.0,
            noise_full_scale: 20.0,
            noise_warning: 0.6,
            noise_tolerance: 0.3,
            brightness_band: (0.25, 0.8),
            min_contrast: 0.25,
            full_contrast: 0.4,
            ideal_saturation: 0.35,
            saturation_band: (0.08, 0.75),
            cast_tolerance: 0.2,
            cast_span: 0.6,
            cast_warning: 0.4,
            artifact_warning: 0.5,
            edge_threshold: 48.0,
            detail_full_scale: 0.15,
            exposure: ExposureConfig::default(),
        }
    }
}

/// Measures lighting, focus, colour, artifacts and texture.
pub struct QualityValidator {
    config: QualityConfig,
}

impl QualityValidator {
    /// Creates a new quality validator with the given configuration.
    #[must_use]
    pub const fn new(config: QualityConfig) -> Self {
        Self { config }
    }

    /// Measures an image without judging it.
    #[must_use]
    pub fn measure(&self, image: &ImageInput) -> QualityMetrics {
        let cfg = &self.config;
        let work = working_copy(&image.image, WORKING_SIZE);
        let luma = work.to_luma8();
        let rgb = work.to_rgb8();

        let exposure = ExposureAnalysis::analyze(&luma, &cfg.exposure);
        let lighting = LightingMetrics {
            brightness: exposure.brightness(),
            contrast: exposure.contrast(),
            exposure: exposure.exposure_quality(),
        };

        let sharpness = sharpness_score(laplacian_variance(&luma), cfg.sharpness_knee);
        let focus = FocusMetrics {
            blur: 1.0 - sharpness,
            sharpness,
            noise: (noise_sigma(&luma) / cfg.noise_full_scale).min(1.0),
        };

        let stats = ColorStats::from_rgb(&rgb);
        let deviation = stats.gray_world_deviation();
        let color = ColorMetrics {
            saturation: stats.saturation,
            balance: 1.0 - (deviation / (cfg.cast_tolerance + cfg.cast_span)).min(1.0),
            cast: stats.cast(cfg.cast_tolerance, cfg.cast_span),
        };

        let artifacts = ArtifactMetrics {
            compression: blockiness(&image.to_luma8()),
            banding: exposure.histogram.banding(),
        };

        let edges = EdgeMap::sobel(&luma);
        let texture = TextureMetrics {
            detail: (edges.density(cfg.edge_threshold) / cfg.detail_full_scale).min(1.0),
            complexity: exposure.histogram.entropy(),
        };

        let mut metrics = QualityMetrics {
            lighting,
            focus,
            color,
            artifacts,
            texture,
            overall_score: 0.0,
        };
        metrics.overall_score = self.overall(&metrics);
        metrics
    }

    /// Weighted overall score: lighting 0.3, focus 0.3, colour 0.2, artifacts 0.1, texture 0.1.
    ///
    /// Texture takes the better of edge detail and tonal complexity, so a plain
    /// background is not penalised.
    #[must_use]
    pub fn overall(&self, m: &QualityMetrics) -> f64 {
        let cfg = &self.config;
        let brightness_fit = 1.0 - ((m.lighting.brightness - 0.5).abs() / 0.5).powi(2);
        let lighting = 0.4 * m.lighting.exposure
            + 0.35 * brightness_fit
            + 0.25 * (m.lighting.contrast / cfg.full_contrast).min(1.0);
        let excess_noise = ((m.focus.noise - cfg.noise_tolerance) / (1.0 - cfg.noise_tolerance))
            .clamp(0.0, 1.0);
        let focus = m.focus.sharpness * (1.0 - 0.5 * excess_noise);
        let saturation_fit = 1.0
            - ((m.color.saturation - cfg.ideal_saturation).abs() / cfg.ideal_saturation).min(1.0);
        let color = 0.4 * saturation_fit + 0.6 * (1.0 - m.color.cast);
        let artifacts = 1.0 - m.artifacts.compression.max(m.artifacts.banding);
        let texture = m.texture.detail.max(m.texture.complexity);

        (0.3 * lighting + 0.3 * focus + 0.2 * color + 0.1 * artifacts + 0.1 * texture)
            .clamp(0.0, 1.0)
    }
}

impl Default for QualityValidator {
    fn default() -> Self {
        Self::new(QualityConfig::default())
    }
}

impl Validator for QualityValidator {
    fn name(&self) -> StepName {
        StepName::QualityMetrics
    }

    fn validate(&self, input: &StepInput<'_>) -> anyhow::Result<StepResult> {
        let cfg = &self.config;
        let m = self.measure(input.image);
        let mut result = StepResult::new(self.name());

        if m.focus.blur > cfg.blur_hard_threshold {
            result.error(format!(
                "Image is too blurry (blur {:.2}, maximum {:.2})",
                m.focus.blur, cfg.blur_hard_threshold
            ));
        } else if m.focus.blur > cfg.blur_warning {
            result.warn("Image is slightly soft");
        }

        let (dark, bright) = cfg.brightness_band;
        if m.lighting.brightness < dark {
            result.warn("Lighting is too dark");
        } else if m.lighting.brightness > bright {
            result.warn("Lighting is too bright");
        }
        if m.lighting.contrast < cfg.min_contrast {
            result.warn("Contrast is low");
        }
        if m.focus.noise > cfg.noise_warning {
            result.warn("Image is noisy");
        }
        let (low_sat, high_sat) = cfg.saturation_band;
        if m.color.saturation < low_sat {
            result.warn("Colours look washed out");
        } else if m.color.saturation > high_sat {
            result.warn("Colours look oversaturated");
        }
        if m.color.cast > cfg.cast_warning {
            result.warn("Image has a strong colour cast");
        }
        if m.artifacts.compression > cfg.artifact_warning {
            result.warn("Image shows compression artifacts");
        }
        if m.artifacts.banding > cfg.artifact_warning {
            result.warn("Image shows colour banding");
        }

        m.record(&mut result);
        result.metric("score", m.overall_score);
        Ok(result)
    }
}
