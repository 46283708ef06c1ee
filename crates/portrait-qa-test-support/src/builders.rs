//! Synthetic image builders for testing.

use std::io::Cursor;

use image::codecs::jpeg::JpegEncoder;
use image::{DynamicImage, ImageFormat, Rgb, RgbImage};
use portrait_qa_core::domain::BoundingBox;

/// Background behind the synthetic subject.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Background {
    /// Soft vertical gradient.
    Plain,
    /// Diagonal stripes with strong edges.
    Busy,
}

/// Builder for head-and-shoulders test photos.
///
/// The face is a skin-toned ellipse with darker eyes, mouth and hair, over a
/// noisy background. Noise keeps the image measurably sharp after JPEG
/// encoding.
#[derive(Debug, Clone)]
pub struct PortraitBuilder {
    width: u32,
    height: u32,
    center: (f64, f64),
    radii: (f64, f64),
    skin: [u8; 3],
    hair: [u8; 3],
    background: Background,
    brightness: i32,
    blur: f32,
    seed: u32,
}

impl PortraitBuilder {
    /// Creates a centred portrait of the given size.
    #[must_use]
    pub const fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            center: (0.5, 0.45),
            radii: (0.22, 0.3),
            skin: [205, 155, 125],
            hair: [70, 45, 30],
            background: Background::Plain,
            brightness: 0,
            blur: 0.0,
            seed: 0x1234_5678,
        }
    }

    /// Moves the face centre, in `[0, 1]` image coordinates.
    #[must_use]
    pub const fn face_center(mut self, x: f64, y: f64) -> Self {
        self.center = (x, y);
        self
    }

    /// Sets the face radii, as fractions of width and height.
    #[must_use]
    pub const fn face_radii(mut self, rx: f64, ry: f64) -> Self {
        self.radii = (rx, ry);
        self
    }

    /// Sets the skin colour.
    #[must_use]
    pub const fn skin(mut self, rgb: [u8; 3]) -> Self {
        self.skin = rgb;
        self
    }

    /// Sets the hair colour.
    #[must_use]
    pub const fn hair(mut self, rgb: [u8; 3]) -> Self {
        self.hair = rgb;
        self
    }

    /// Sets the background style.
    #[must_use]
    pub const fn background(mut self, background: Background) -> Self {
        self.background = background;
        self
    }

    /// Shifts every channel by `delta` grey levels.
    #[must_use]
    pub const fn brightness(mut self, delta: i32) -> Self {
        self.brightness = delta;
        self
    }

    /// Applies a Gaussian blur with the given sigma.
    #[must_use]
    pub const fn blur(mut self, sigma: f32) -> Self {
        self.blur = sigma;
        self
    }

    /// Pixel box around the face ellipse.
    #[must_use]
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn face_box(&self) -> BoundingBox {
        let (w, h) = (f64::from(self.width), f64::from(self.height));
        let x0 = ((self.center.0 - self.radii.0) * w).round().max(0.0);
        let y0 = ((self.center.1 - self.radii.1) * h).round().max(0.0);
        let x1 = ((self.center.0 + self.radii.0) * w).round().min(w);
        let y1 = ((self.center.1 + self.radii.1) * h).round().min(h);
        BoundingBox::new(x0 as u32, y0 as u32, (x1 - x0) as u32, (y1 - y0) as u32)
    }

    /// Renders the portrait.
    #[must_use]
    #[allow(
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss,
        clippy::cast_possible_wrap
    )]
    pub fn build(&self) -> DynamicImage {
        let (w, h) = (f64::from(self.width), f64::from(self.height));
        let (cx, cy) = (self.center.0 * w, self.center.1 * h);
        let (rx, ry) = (self.radii.0 * w, self.radii.1 * h);
        let mut state = self.seed;

        let img = RgbImage::from_fn(self.width, self.height, |x, y| {
            state = state.wrapping_mul(1_664_525).wrapping_add(1_013_904_223);
            let noise = i32::from((state >> 24) as u8 % 25) - 12;

            let (fx, fy) = (f64::from(x), f64::from(y));
            let dx = (fx - cx) / rx;
            let dy = (fy - cy) / ry;
            let inside = dx * dx + dy * dy <= 1.0;

            let eye = [(-0.38, -0.15), (0.38, -0.15)]
                .iter()
                .any(|(ex, ey)| (dx - ex).hypot(dy - ey) < 0.09);
            let mouth = dy > 0.42 && dy < 0.5 && dx.abs() < 0.3;
            let hair = inside && dy < -0.62;

            let base: [i32; 3] = if inside && (eye || mouth) {
                [60, 35, 35]
            } else if hair {
                self.hair.map(i32::from)
            } else if inside {
                self.skin.map(i32::from)
            } else {
                match self.background {
                    Background::Plain => {
                        let grade = (fy / h * 40.0) as i32;
                        [120 + grade / 2, 140 + grade / 2, 165 - grade / 3]
                    }
                    Background::Busy => {
                        if (x / 6 + y / 9) % 2 == 0 {
                            [230, 220, 60]
                        } else {
                            [30, 60, 150]
                        }
                    }
                }
            };
            Rgb(base.map(|c| (c + noise + self.brightness).clamp(0, 255) as u8))
        });

        let image = DynamicImage::ImageRgb8(img);
        if self.blur > 0.0 {
            image.blur(self.blur)
        } else {
            image
        }
    }

    /// Renders and encodes as JPEG at quality 92.
    #[must_use]
    pub fn jpeg(&self) -> Vec<u8> {
        SyntheticImageBuilder::encode_jpeg(&self.build(), 92)
    }

    /// Renders and encodes as PNG.
    #[must_use]
    pub fn png(&self) -> Vec<u8> {
        SyntheticImageBuilder::encode(&self.build(), ImageFormat::Png)
    }
}

/// Builder for plain synthetic images.
pub struct SyntheticImageBuilder;

impl SyntheticImageBuilder {
    /// Uniform colour image (no edges, reads as fully blurred).
    #[must_use]
    pub fn uniform(width: u32, height: u32, rgb: [u8; 3]) -> DynamicImage {
        DynamicImage::ImageRgb8(RgbImage::from_pixel(width, height, Rgb(rgb)))
    }

    /// High-contrast checkerboard (very sharp edges).
    #[must_use]
    pub fn checkerboard(width: u32, height: u32, cell_size: u32) -> DynamicImage {
        let cell = cell_size.max(1);
        DynamicImage::ImageRgb8(RgbImage::from_fn(width, height, |x, y| {
            if (x / cell + y / cell) % 2 == 0 {
                Rgb([255, 255, 255])
            } else {
                Rgb([0, 0, 0])
            }
        }))
    }

    /// Encodes as JPEG at `quality` (1-100).
    ///
    /// # Panics
    ///
    /// Panics if encoding fails, which only happens for empty images.
    #[must_use]
    pub fn encode_jpeg(image: &DynamicImage, quality: u8) -> Vec<u8> {
        let mut bytes = Vec::new();
        JpegEncoder::new_with_quality(&mut bytes, quality)
            .encode_image(&image.to_rgb8())
            .unwrap_or_else(|e| panic!("jpeg encoding failed: {e}"));
        bytes
    }

    /// Encodes in the given format.
    ///
    /// # Panics
    ///
    /// Panics if the format is not supported by the enabled codecs.
    #[must_use]
    pub fn encode(image: &DynamicImage, format: ImageFormat) -> Vec<u8> {
        let mut bytes = Vec::new();
        image
            .write_to(&mut Cursor::new(&mut bytes), format)
            .unwrap_or_else(|e| panic!("{format:?} encoding failed: {e}"));
        bytes
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_face_box_covers_ellipse() {
        let builder = PortraitBuilder::new(600, 600);
        let bbox = builder.face_box();
        assert_eq!(bbox, BoundingBox::new(168, 90, 264, 360));
    }

    #[test]
    fn test_face_pixels_are_skin() {
        let builder = PortraitBuilder::new(200, 200).skin([200, 150, 120]);
        let img = builder.build().to_rgb8();
        // Cheek, away from eyes and mouth.
        let px = img.get_pixel(100, 100).0;
        assert!((i32::from(px[0]) - 200).abs() <= 12, "{px:?}");
    }

    #[test]
    fn test_jpeg_round_trips_dimensions() {
        let bytes = PortraitBuilder::new(320, 240).jpeg();
        let decoded = image::load_from_memory(&bytes).unwrap_or_else(|e| panic!("{e}"));
        assert_eq!((decoded.width(), decoded.height()), (320, 240));
    }
}
