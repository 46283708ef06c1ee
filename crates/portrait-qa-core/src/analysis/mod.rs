//! Pixel-level image analysis.
//!
//! Every scorer here is a pure function over decoded pixels and returns a value
//! in `[0, 1]` unless documented otherwise. Validators run these on a
//! downscaled working copy so cost does not grow with input resolution.

mod color;
mod focus;
mod histogram;
mod structure;

pub use color::{hsv_saturation, is_skin, ColorStats};
pub use focus::{laplacian_variance, noise_sigma, sharpness_score};
pub use histogram::{ExposureAnalysis, ExposureConfig, Histogram};
pub use structure::{blockiness, evenness, mirror_symmetry, EdgeMap};

use image::imageops::FilterType;
use image::DynamicImage;

/// Longest side of the working copy used by the scorers.
pub const WORKING_SIZE: u32 = 512;

/// Downscales so the longest side is at most `max_side`, keeping the aspect ratio.
#[must_use]
pub fn working_copy(image: &DynamicImage, max_side: u32) -> DynamicImage {
    if image.width().max(image.height()) <= max_side {
        return image.clone();
    }
    image.resize(max_side, max_side, FilterType::Triangle)
}
