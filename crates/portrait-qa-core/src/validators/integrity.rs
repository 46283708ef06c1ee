//! Format, size, resolution and exposure sanity.

use crate::analysis::{working_copy, ExposureAnalysis, ExposureConfig, WORKING_SIZE};
use crate::domain::{StepName, StepResult};

use super::{warning_penalised, StepInput, Validator};

/// Error text used when the bytes cannot be decoded.
pub const CORRUPT_MESSAGE: &str = "Image data is corrupt or unreadable";

/// Configuration for the integrity step.
#[derive(Debug, Clone)]
pub struct IntegrityConfig {
    /// Accepted MIME types, sniffed from content.
    pub allowed_mime_types: Vec<String>,
    /// Smallest accepted file.
    pub min_file_size: usize,
    /// Files above this warn; above twice this they are rejected.
    pub max_file_size: usize,
    /// Smallest accepted side length.
    pub min_resolution: u32,
    /// Side length above which a warning is recorded.
    pub max_resolution: u32,
    /// Shorter/longer side ratio below which a warning is recorded.
    pub min_squareness: f64,
    /// Mean brightness below which the image counts as dark.
    pub dark_threshold: f64,
    /// Mean brightness above which the image counts as bright.
    pub bright_threshold: f64,
    /// Histogram clipping levels.
    pub exposure: ExposureConfig,
}

impl Default for IntegrityConfig {
    fn default() -> Self {
        Self {
            allowed_mime_types: vec![
                "image/jpeg".to_string(),
                "image/png".to_string(),
                "image/webp".to_string(),
            ],
            min_file_size: 10 * 1024,
            max_file_size: 10 * 1024 * 1024,
            min_resolution: 500,
            max_resolution: 4096,
            min_squareness: 0.75,
            dark_threshold: 0.2,
            bright_threshold: 0.85,
            exposure: ExposureConfig::default(),
        }
    }
}

/// Checks that the upload is a usable photo file at all.
pub struct IntegrityValidator {
    config: IntegrityConfig,
}

impl IntegrityValidator {
    /// Creates a new integrity validator with the given configuration.
    #[must_use]
    pub const fn new(config: IntegrityConfig) -> Self {
        Self { config }
    }

    /// Result reported when the bytes could not be decoded.
    #[must_use]
    pub fn corrupt(byte_len: usize) -> StepResult {
        let mut result = StepResult::new(StepName::BasicIntegrity);
        result.error(CORRUPT_MESSAGE);
        #[allow(clippy::cast_precision_loss)]
        let size = byte_len as f64;
        result.metric("fileSize", size);
        result.metric("score", 0.0);
        result
    }
}

impl Default for IntegrityValidator {
    fn default() -> Self {
        Self::new(IntegrityConfig::default())
    }
}

impl Validator for IntegrityValidator {
    fn name(&self) -> StepName {
        StepName::BasicIntegrity
    }

    #[allow(clippy::cast_precision_loss)]
    fn validate(&self, input: &StepInput<'_>) -> anyhow::Result<StepResult> {
        let cfg = &self.config;
        let image = input.image;
        let mut result = StepResult::new(self.name());

        if !cfg.allowed_mime_types.iter().any(|m| m == &image.mime) {
            result.error(format!(
                "Unsupported image format {}; expected one of {}",
                image.mime,
                cfg.allowed_mime_types.join(", ")
            ));
        }

        let (w, h) = (image.width, image.height);
        if w < cfg.min_resolution || h < cfg.min_resolution {
            result.error(format!(
                "Image resolution {w}x{h} is below the minimum {min}x{min}",
                min = cfg.min_resolution
            ));
        } else if w > cfg.max_resolution || h > cfg.max_resolution {
            result.warn(format!(
                "Image resolution {w}x{h} exceeds {max}x{max} and will be downscaled",
                max = cfg.max_resolution
            ));
        }

        let len = image.byte_len();
        if len < cfg.min_file_size {
            result.error(format!(
                "File size {len} bytes is below the minimum {} bytes",
                cfg.min_file_size
            ));
        } else if len > cfg.max_file_size * 2 {
            result.error(format!(
                "File size {len} bytes exceeds the maximum {} bytes",
                cfg.max_file_size * 2
            ));
        } else if len > cfg.max_file_size {
            result.warn(format!("File size {len} bytes is large and may be slow to process"));
        }

        let squareness = f64::from(w.min(h)) / f64::from(w.max(h).max(1));
        if squareness < cfg.min_squareness {
            result.warn(format!(
                "Aspect ratio {w}:{h} is far from square; the image will be cropped"
            ));
        }

        let luma = working_copy(&image.image, WORKING_SIZE).to_luma8();
        let exposure = ExposureAnalysis::analyze(&luma, &cfg.exposure);
        let brightness = exposure.brightness();
        if brightness < cfg.dark_threshold {
            result.warn("Image appears too dark");
        } else if brightness > cfg.bright_threshold {
            result.warn("Image appears too bright");
        }

        result.metric("width", f64::from(w));
        result.metric("height", f64::from(h));
        result.metric("fileSize", len as f64);
        result.metric("squareness", squareness);
        result.metric("brightness", brightness);
        let score = if result.valid {
            warning_penalised(1.0, result.warnings.len(), 0.1)
        } else {
            0.0
        };
        result.metric("score", score);

        Ok(result)
    }
}
