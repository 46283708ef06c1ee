//! Colour statistics.

use image::RgbImage;

/// Per-image colour summary.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ColorStats {
    /// Mean HSV saturation in `[0, 1]`.
    pub saturation: f64,
    /// Mean of each channel in `[0, 255]`.
    pub channel_means: [f64; 3],
    /// Fraction of pixels inside the YCbCr skin cluster.
    pub skin_ratio: f64,
    /// Fraction of pixels with saturation above 0.85.
    pub oversaturated: f64,
}

impl ColorStats {
    /// Computes colour statistics over every pixel.
    #[allow(clippy::cast_precision_loss)]
    #[must_use]
    pub fn from_rgb(image: &RgbImage) -> Self {
        let total = u64::from(image.width()) * u64::from(image.height());
        if total == 0 {
            return Self {
                saturation: 0.0,
                channel_means: [0.0; 3],
                skin_ratio: 0.0,
                oversaturated: 0.0,
            };
        }

        let mut sat_sum = 0.0;
        let mut sums = [0u64; 3];
        let mut skin = 0u64;
        let mut hot = 0u64;
        for pixel in image.pixels() {
            let [r, g, b] = pixel.0;
            sums[0] += u64::from(r);
            sums[1] += u64::from(g);
            sums[2] += u64::from(b);

            let s = hsv_saturation(r, g, b);
            sat_sum += s;
            if s > 0.85 {
                hot += 1;
            }
            if is_skin(r, g, b) {
                skin += 1;
            }
        }

        let total = total as f64;
        Self {
            saturation: sat_sum / total,
            channel_means: sums.map(|s| s as f64 / total),
            skin_ratio: skin as f64 / total,
            oversaturated: hot as f64 / total,
        }
    }

    /// Largest relative deviation of a channel mean from the gray-world average.
    #[must_use]
    pub fn gray_world_deviation(&self) -> f64 {
        let avg = self.channel_means.iter().sum::<f64>() / 3.0;
        if avg < 1.0 {
            return 0.0;
        }
        self.channel_means
            .iter()
            .map(|c| (c - avg).abs() / avg)
            .fold(0.0, f64::max)
    }

    /// Colour cast strength in `[0, 1]`.
    ///
    /// Deviations up to `tolerance` are natural (skin-dominated portraits run
    /// warm); `span` beyond that maps to a full cast.
    #[must_use]
    pub fn cast(&self, tolerance: f64, span: f64) -> f64 {
        ((self.gray_world_deviation() - tolerance) / span).clamp(0.0, 1.0)
    }

    /// Per-channel gains that would neutralise the cast.
    #[must_use]
    pub fn gray_world_gains(&self) -> [f64; 3] {
        let avg = self.channel_means.iter().sum::<f64>() / 3.0;
        self.channel_means
            .map(|c| if c < 1.0 { 1.0 } else { (avg / c).clamp(0.5, 2.0) })
    }
}

/// HSV saturation of one pixel in `[0, 1]`.
#[must_use]
pub fn hsv_saturation(r: u8, g: u8, b: u8) -> f64 {
    let max = r.max(g).max(b);
    if max == 0 {
        return 0.0;
    }
    let min = r.min(g).min(b);
    f64::from(max - min) / f64::from(max)
}

/// Chai-Ngan YCbCr skin cluster test.
#[must_use]
pub fn is_skin(r: u8, g: u8, b: u8) -> bool {
    let (r, g, b) = (f64::from(r), f64::from(g), f64::from(b));
    let cb = 128.0 - 0.168_736 * r - 0.331_264 * g + 0.5 * b;
    let cr = 128.0 + 0.5 * r - 0.418_688 * g - 0.081_312 * b;
    (77.0..=127.0).contains(&cb) && (133.0..=173.0).contains(&cr)
}
