//! Enhancement plans and the output contract.

use serde::{Deserialize, Serialize};

use super::BoundingBox;

/// Encoding used for canonical output.
#[non_exhaustive]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutputFormat {
    /// Baseline JPEG.
    #[default]
    Jpeg,
    /// Lossless PNG.
    Png,
}

impl OutputFormat {
    /// MIME type of the encoding.
    #[must_use]
    pub const fn mime(self) -> &'static str {
        match self {
            Self::Jpeg => "image/jpeg",
            Self::Png => "image/png",
        }
    }

    /// File extension of the encoding.
    #[must_use]
    pub const fn extension(self) -> &'static str {
        match self {
            Self::Jpeg => "jpg",
            Self::Png => "png",
        }
    }

    /// Matching `image` crate format.
    #[must_use]
    pub const fn image_format(self) -> image::ImageFormat {
        match self {
            Self::Jpeg => image::ImageFormat::Jpeg,
            Self::Png => image::ImageFormat::Png,
        }
    }
}

/// Fixed contract every enhanced image satisfies exactly.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StandardImageSpec {
    /// Output width in pixels.
    pub width: u32,
    /// Output height in pixels.
    pub height: u32,
    /// Output encoding.
    pub format: OutputFormat,
    /// Starting encoder quality (0.0-1.0).
    pub quality: f32,
    /// Lowest quality the encoder may fall back to when fitting the byte budget.
    pub min_quality: f32,
    /// Smallest acceptable encoded size.
    pub min_bytes: usize,
    /// Largest acceptable encoded size.
    pub max_bytes: usize,
}

impl Default for StandardImageSpec {
    fn default() -> Self {
        Self {
            width: 1024,
            height: 1024,
            format: OutputFormat::Jpeg,
            quality: 0.9,
            min_quality: 0.5,
            min_bytes: 5_000,
            max_bytes: 2_000_000,
        }
    }
}

impl StandardImageSpec {
    /// Lists every way an encoded asset misses this spec.
    #[must_use]
    pub fn violations(
        &self,
        width: u32,
        height: u32,
        format: Option<image::ImageFormat>,
        len: usize,
    ) -> Vec<String> {
        let mut violations = Vec::new();
        if width != self.width || height != self.height {
            violations.push(format!(
                "dimensions {width}x{height} differ from required {}x{}",
                self.width, self.height
            ));
        }
        if format != Some(self.format.image_format()) {
            violations.push(format!(
                "format {} differs from required {}",
                format.map_or("unknown", |f| f.to_mime_type()),
                self.format.mime()
            ));
        }
        if len < self.min_bytes || len > self.max_bytes {
            violations.push(format!(
                "size {len} bytes outside [{}, {}]",
                self.min_bytes, self.max_bytes
            ));
        }
        violations
    }
}

/// A corrective transform.
#[non_exhaustive]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EnhancementKind {
    /// Shift mean brightness toward mid-gray.
    BrightnessCorrect,
    /// Stretch contrast.
    ContrastCorrect,
    /// Unsharp mask.
    Sharpen,
    /// Light smoothing.
    Denoise,
    /// Pull saturation into range.
    SaturationCorrect,
    /// Gray-world white balance.
    ColorCastCorrect,
    /// Smooth block edges.
    ArtifactReduce,
    /// Sharpen the face region.
    FaceDetailEnhance,
    /// Final levels pass before canonicalisation.
    OptimizeForPersonalization,
}

/// One planned transform.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EnhancementStep {
    /// Transform to apply.
    pub kind: EnhancementKind,
    /// Strength in `[0, 1.5]`.
    pub intensity: f32,
    /// Signed direction for transforms that can go either way (brightness, saturation).
    pub direction: f32,
}

/// Ordered list of transforms.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EnhancementPlan {
    /// Transforms in application order.
    pub steps: Vec<EnhancementStep>,
    /// Face used to center the final crop.
    pub face_box: Option<BoundingBox>,
}

impl EnhancementPlan {
    /// Names of the planned transforms, in order.
    #[must_use]
    pub fn kinds(&self) -> Vec<EnhancementKind> {
        self.steps.iter().map(|s| s.kind).collect()
    }

    /// True when the plan holds the given transform.
    #[must_use]
    pub fn contains(&self, kind: EnhancementKind) -> bool {
        self.steps.iter().any(|s| s.kind == kind)
    }
}

/// Canonical image produced by the executor.
#[derive(Debug, Clone)]
pub struct EnhancedImage {
    /// Encoded bytes.
    pub data: Vec<u8>,
    /// Output width.
    pub width: u32,
    /// Output height.
    pub height: u32,
    /// Encoding used.
    pub format: OutputFormat,
    /// Encoder quality actually used.
    pub quality_used: f32,
    /// Transforms applied.
    pub applied: Vec<EnhancementKind>,
}
