//! Applies an enhancement plan and canonicalises the result.

use std::io::Cursor;

use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::PngEncoder;
use image::imageops::{self, FilterType};
use image::{DynamicImage, ImageEncoder, ImageReader, RgbImage, RgbaImage};
use tracing::debug;

use crate::analysis::{ColorStats, Histogram};
use crate::domain::{
    BoundingBox, EnhancedImage, EnhancementError, EnhancementKind, EnhancementPlan,
    EnhancementStep, OutputFormat, StandardImageSpec,
};

/// Bisection rounds when fitting the byte budget.
const FIT_ITERATIONS: usize = 8;

/// Applies plans and guarantees every returned image satisfies the [`StandardImageSpec`].
#[derive(Debug, Clone, Default)]
pub struct EnhancementExecutor {
    spec: StandardImageSpec,
}

impl EnhancementExecutor {
    /// Creates a new executor targeting the given spec.
    #[must_use]
    pub const fn new(spec: StandardImageSpec) -> Self {
        Self { spec }
    }

    /// Spec every output satisfies.
    #[must_use]
    pub const fn spec(&self) -> &StandardImageSpec {
        &self.spec
    }

    /// Applies the plan, crops around the face, resizes and encodes.
    ///
    /// # Errors
    ///
    /// Returns [`EnhancementError::InvariantViolation`] when the encoded output
    /// does not satisfy the output spec, even after lowering the quality.
    pub fn execute(
        &self,
        image: &DynamicImage,
        plan: &EnhancementPlan,
    ) -> Result<EnhancedImage, EnhancementError> {
        if image.width() == 0 || image.height() == 0 {
            return Err(EnhancementError::EmptyImage);
        }

        let mut rgb = flatten_alpha(image);
        for step in &plan.steps {
            rgb = apply_step(rgb, step, plan.face_box);
        }

        let square = square_crop(&rgb, plan.face_box);
        let resized = imageops::resize(
            &square,
            self.spec.width,
            self.spec.height,
            FilterType::Lanczos3,
        );

        let (data, quality_used) = self.encode_to_fit(&resized)?;
        let (width, height) = self.verify(&data)?;

        debug!(
            bytes = data.len(),
            quality = quality_used,
            steps = plan.steps.len(),
            "enhanced image encoded"
        );
        Ok(EnhancedImage {
            data,
            width,
            height,
            format: self.spec.format,
            quality_used,
            applied: plan.kinds(),
        })
    }

    /// Reads the encoded header back and checks it against the output spec.
    fn verify(&self, data: &[u8]) -> Result<(u32, u32), EnhancementError> {
        let unreadable = |e: &dyn std::fmt::Display| {
            EnhancementError::InvariantViolation(format!("unreadable output: {e}"))
        };
        let reader = ImageReader::new(Cursor::new(data))
            .with_guessed_format()
            .map_err(|e| unreadable(&e))?;
        let format = reader.format();
        let (width, height) = reader.into_dimensions().map_err(|e| unreadable(&e))?;

        let violations = self.spec.violations(width, height, format, data.len());
        if violations.is_empty() {
            Ok((width, height))
        } else {
            Err(EnhancementError::InvariantViolation(violations.join("; ")))
        }
    }

    /// Encodes at the output spec quality, bisecting downward when over the byte budget.
    fn encode_to_fit(&self, image: &RgbImage) -> Result<(Vec<u8>, f32), EnhancementError> {
        let spec = &self.spec;
        let initial = encode(image, spec.format, spec.quality)?;
        if initial.len() <= spec.max_bytes || spec.format != OutputFormat::Jpeg {
            return Ok((initial, spec.quality));
        }

        let mut lo = spec.min_quality;
        let mut hi = spec.quality;
        let mut best: Option<(Vec<u8>, f32)> = None;
        for _ in 0..FIT_ITERATIONS {
            let mid = (lo + hi) / 2.0;
            let data = encode(image, spec.format, mid)?;
            if data.len() <= spec.max_bytes {
                best = Some((data, mid));
                lo = mid;
            } else {
                hi = mid;
            }
        }

        match best {
            Some(found) => Ok(found),
            None => {
                let floor = encode(image, spec.format, spec.min_quality)?;
                if floor.len() <= spec.max_bytes {
                    Ok((floor, spec.min_quality))
                } else {
                    Err(EnhancementError::InvariantViolation(format!(
                        "{} bytes at minimum quality {:.2} exceeds {}",
                        floor.len(),
                        spec.min_quality,
                        spec.max_bytes
                    )))
                }
            }
        }
    }
}

/// Composites any alpha channel onto white.
#[allow(
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    clippy::many_single_char_names
)]
pub(crate) fn flatten_alpha(image: &DynamicImage) -> RgbImage {
    if !image.color().has_alpha() {
        return image.to_rgb8();
    }
    let rgba: RgbaImage = image.to_rgba8();
    RgbImage::from_fn(rgba.width(), rgba.height(), |x, y| {
        let [r, g, b, a] = rgba.get_pixel(x, y).0;
        let alpha = f32::from(a) / 255.0;
        let over = |c: u8| (f32::from(c) * alpha + 255.0 * (1.0 - alpha)).round() as u8;
        image::Rgb([over(r), over(g), over(b)])
    })
}

fn encode(
    image: &RgbImage,
    format: OutputFormat,
    quality: f32,
) -> Result<Vec<u8>, EnhancementError> {
    let mut buffer = Vec::new();
    let (w, h) = image.dimensions();
    let result = match format {
        OutputFormat::Jpeg => {
            #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
            let percent = (quality * 100.0).round().clamp(1.0, 100.0) as u8;
            JpegEncoder::new_with_quality(&mut buffer, percent).write_image(
                image.as_raw(),
                w,
                h,
                image::ExtendedColorType::Rgb8,
            )
        }
        OutputFormat::Png => PngEncoder::new(&mut buffer).write_image(
            image.as_raw(),
            w,
            h,
            image::ExtendedColorType::Rgb8,
        ),
    };
    result.map_err(|e| EnhancementError::Encode(e.to_string()))?;
    Ok(buffer)
}

/// Largest square centred on the face (or the frame), clamped to the bounds.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn square_crop(image: &RgbImage, face: Option<BoundingBox>) -> RgbImage {
    let (w, h) = image.dimensions();
    let side = w.min(h);
    let (cx, cy) = face.map_or((f64::from(w) / 2.0, f64::from(h) / 2.0), |b| b.center());
    let origin = |center: f64, extent: u32| -> u32 {
        let start = (center - f64::from(side) / 2.0).round().max(0.0) as u32;
        start.min(extent - side)
    };
    imageops::crop_imm(image, origin(cx, w), origin(cy, h), side, side).to_image()
}

fn apply_step(image: RgbImage, step: &EnhancementStep, face: Option<BoundingBox>) -> RgbImage {
    let strength = step.intensity.clamp(0.0, 1.5);
    match step.kind {
        EnhancementKind::BrightnessCorrect => {
            // Gamma below one brightens.
            let gamma = 1.0 - step.direction.signum() * 0.35 * strength.min(1.0);
            map_channels(image, |v| 255.0 * (v / 255.0).powf(gamma))
        }
        EnhancementKind::ContrastCorrect => stretch_levels(image, 0.02, strength.min(1.0)),
        EnhancementKind::Sharpen => imageops::unsharpen(&image, 0.8 + strength, 2),
        EnhancementKind::Denoise => {
            let smoothed = imageops::blur(&image, 0.6 + 0.6 * strength);
            blend(&image, &smoothed, strength.min(1.0))
        }
        EnhancementKind::ArtifactReduce => {
            let smoothed = imageops::blur(&image, 0.7);
            blend(&image, &smoothed, 0.5 * strength.min(1.0))
        }
        EnhancementKind::SaturationCorrect => {
            let factor = 1.0 + step.direction.signum() * 0.5 * strength;
            scale_saturation(image, factor.max(0.0))
        }
        EnhancementKind::ColorCastCorrect => {
            let gains = ColorStats::from_rgb(&image).gray_world_gains();
            #[allow(clippy::cast_possible_truncation)]
            let gains = gains.map(|g| (g as f32).powf(strength.min(1.0)));
            let mut out = image;
            for pixel in out.pixels_mut() {
                for (c, gain) in pixel.0.iter_mut().zip(gains) {
                    *c = to_u8(f32::from(*c) * gain);
                }
            }
            out
        }
        EnhancementKind::FaceDetailEnhance => match face {
            Some(bbox) => sharpen_region(image, bbox, 1.0 + strength),
            None => image,
        },
        EnhancementKind::OptimizeForPersonalization => {
            stretch_levels(image, 0.005, 0.5 * strength.min(1.0))
        }
    }
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn to_u8(v: f32) -> u8 {
    v.round().clamp(0.0, 255.0) as u8
}

fn map_channels(mut image: RgbImage, f: impl Fn(f32) -> f32) -> RgbImage {
    let lut: Vec<u8> = (0..=255u8).map(|v| to_u8(f(f32::from(v)))).collect();
    for pixel in image.pixels_mut() {
        for c in &mut pixel.0 {
            *c = lut[usize::from(*c)];
        }
    }
    image
}

/// Stretches the luminance percentiles `clip..1-clip` to the full range, mixed by `amount`.
fn stretch_levels(image: RgbImage, clip: f64, amount: f32) -> RgbImage {
    let hist = Histogram::from_luma(&imageops::grayscale(&image));
    let lo = f32::from(hist.percentile(clip));
    let hi = f32::from(hist.percentile(1.0 - clip));
    if hi - lo < 8.0 {
        return image;
    }
    map_channels(image, |v| {
        let stretched = (v - lo) * 255.0 / (hi - lo);
        v + (stretched - v) * amount
    })
}

fn scale_saturation(mut image: RgbImage, factor: f32) -> RgbImage {
    for pixel in image.pixels_mut() {
        let [r, g, b] = pixel.0.map(f32::from);
        let luma = 0.299 * r + 0.587 * g + 0.114 * b;
        pixel.0 = [r, g, b].map(|c| to_u8(luma + (c - luma) * factor));
    }
    image
}

fn blend(original: &RgbImage, processed: &RgbImage, amount: f32) -> RgbImage {
    let mut out = original.clone();
    for (dst, src) in out.pixels_mut().zip(processed.pixels()) {
        for (d, s) in dst.0.iter_mut().zip(src.0) {
            *d = to_u8(f32::from(*d) + (f32::from(s) - f32::from(*d)) * amount);
        }
    }
    out
}

fn sharpen_region(mut image: RgbImage, bbox: BoundingBox, sigma: f32) -> RgbImage {
    let region = bbox.clamp_to(image.width(), image.height());
    let crop =
        imageops::crop_imm(&image, region.x, region.y, region.width, region.height).to_image();
    let sharpened = imageops::unsharpen(&crop, sigma, 1);
    imageops::replace(&mut image, &sharpened, i64::from(region.x), i64::from(region.y));
    image
}
