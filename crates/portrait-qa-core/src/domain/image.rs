//! Image inputs and geometry.

use image::{DynamicImage, GenericImageView, ImageFormat};
use serde::{Deserialize, Serialize};

use super::PipelineError;

/// Axis-aligned rectangle in image pixels.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoundingBox {
    /// Left edge.
    pub x: u32,
    /// Top edge.
    pub y: u32,
    /// Width.
    pub width: u32,
    /// Height.
    pub height: u32,
}

impl BoundingBox {
    /// Creates a new bounding box.
    #[must_use]
    pub const fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Area in pixels.
    #[must_use]
    pub const fn area(&self) -> u64 {
        self.width as u64 * self.height as u64
    }

    /// Center point.
    #[must_use]
    pub fn center(&self) -> (f64, f64) {
        (
            f64::from(self.x) + f64::from(self.width) / 2.0,
            f64::from(self.y) + f64::from(self.height) / 2.0,
        )
    }

    /// Clamps the box so it lies inside an image of the given size.
    #[must_use]
    pub fn clamp_to(&self, width: u32, height: u32) -> Self {
        let x = self.x.min(width.saturating_sub(1));
        let y = self.y.min(height.saturating_sub(1));
        Self {
            x,
            y,
            width: self.width.min(width - x.min(width)).max(1),
            height: self.height.min(height - y.min(height)).max(1),
        }
    }
}

/// Image dimensions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageDimensions {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

impl ImageDimensions {
    /// Creates new dimensions.
    #[must_use]
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}

/// Where the image to validate comes from.
#[derive(Debug, Clone)]
pub enum ImageReference {
    /// A URL fetched through the configured fetcher.
    Url(String),
    /// Bytes supplied directly by the caller.
    Bytes {
        /// Raw encoded image.
        data: Vec<u8>,
        /// Content type declared by the caller, if any.
        content_type: Option<String>,
    },
}

impl ImageReference {
    /// Wraps raw bytes without a declared content type.
    #[must_use]
    pub const fn bytes(data: Vec<u8>) -> Self {
        Self::Bytes {
            data,
            content_type: None,
        }
    }
}

/// A fetched and decoded image, shared read-only by all validators.
#[derive(Debug, Clone)]
pub struct ImageInput {
    /// Raw encoded bytes as received.
    pub bytes: Vec<u8>,
    /// MIME type sniffed from the bytes.
    pub mime: String,
    /// Encoded format, when recognised.
    pub format: Option<ImageFormat>,
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
    /// Decoded pixels.
    pub image: DynamicImage,
}

impl ImageInput {
    /// Decodes raw bytes.
    ///
    /// The MIME type is sniffed from the content; a declared content type is
    /// only used when sniffing fails.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::Integrity`] when the bytes cannot be decoded.
    pub fn decode(bytes: Vec<u8>, declared_mime: Option<&str>) -> Result<Self, PipelineError> {
        let format = image::guess_format(&bytes).ok();
        let mime = format.map_or_else(
            || declared_mime.unwrap_or("application/octet-stream").to_string(),
            |f| f.to_mime_type().to_string(),
        );

        let image = image::load_from_memory(&bytes)
            .map_err(|e| PipelineError::Integrity(format!("failed to decode image: {e}")))?;
        let (width, height) = image.dimensions();
        if width == 0 || height == 0 {
            return Err(PipelineError::Integrity("image dimensions are zero".into()));
        }

        Ok(Self {
            bytes,
            mime,
            format,
            width,
            height,
            image,
        })
    }

    /// Wraps an already-decoded image, encoding it as PNG for the byte view.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::Integrity`] when PNG encoding fails.
    pub fn from_image(image: DynamicImage) -> Result<Self, PipelineError> {
        let mut bytes = Vec::new();
        image
            .write_to(&mut std::io::Cursor::new(&mut bytes), ImageFormat::Png)
            .map_err(|e| PipelineError::Integrity(format!("failed to encode image: {e}")))?;
        let (width, height) = image.dimensions();
        Ok(Self {
            bytes,
            mime: ImageFormat::Png.to_mime_type().to_string(),
            format: Some(ImageFormat::Png),
            width,
            height,
            image,
        })
    }

    /// Size of the encoded bytes.
    #[must_use]
    pub fn byte_len(&self) -> usize {
        self.bytes.len()
    }

    /// File extension matching the sniffed format.
    #[must_use]
    pub fn extension(&self) -> &'static str {
        self.format
            .and_then(|f| f.extensions_str().first().copied())
            .unwrap_or("bin")
    }

    /// Grayscale copy of the pixels.
    #[must_use]
    pub fn to_luma8(&self) -> image::GrayImage {
        self.image.to_luma8()
    }

    /// RGB copy of the pixels.
    #[must_use]
    pub fn to_rgb8(&self) -> image::RgbImage {
        self.image.to_rgb8()
    }

    /// Dimensions of the decoded image.
    #[must_use]
    pub const fn dimensions(&self) -> ImageDimensions {
        ImageDimensions::new(self.width, self.height)
    }
}
