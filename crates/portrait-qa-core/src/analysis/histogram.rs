//! Luminance histogram and exposure statistics.

use image::GrayImage;

/// Clipping levels used when scoring exposure.
#[derive(Debug, Clone)]
pub struct ExposureConfig {
    /// Levels at or below this count as crushed shadows.
    pub shadow_clip_level: u8,
    /// Levels at or above this count as blown highlights.
    pub highlight_clip_level: u8,
    /// Clipped fraction at which one end of the histogram scores zero.
    pub max_clipped_fraction: f64,
}

impl Default for ExposureConfig {
    fn default() -> Self {
        Self {
            shadow_clip_level: 8,
            highlight_clip_level: 247,
            max_clipped_fraction: 0.15,
        }
    }
}

/// 256-bin luminance histogram with its cumulative counts.
#[derive(Debug, Clone)]
pub struct Histogram {
    bins: [u64; 256],
    cumulative: [u64; 256],
}

impl Histogram {
    #[must_use]
    pub fn from_luma(image: &GrayImage) -> Self {
        let mut bins = [0u64; 256];
        for p in image.pixels() {
            bins[usize::from(p.0[0])] += 1;
        }
        let mut cumulative = [0u64; 256];
        let mut running = 0;
        for (slot, count) in cumulative.iter_mut().zip(bins) {
            running += count;
            *slot = running;
        }
        Self { bins, cumulative }
    }

    #[must_use]
    pub const fn total(&self) -> u64 {
        self.cumulative[255]
    }

    /// Luminance level below which a fraction `p` of the pixels fall.
    #[allow(clippy::cast_precision_loss, clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    #[must_use]
    pub fn percentile(&self, p: f64) -> u8 {
        if self.total() == 0 {
            return 0;
        }
        let target = (self.total() as f64 * p.clamp(0.0, 1.0)).round() as u64;
        let level = self.cumulative.partition_point(|&c| c < target);
        level.min(255) as u8
    }

    /// Mean and standard deviation of luminance, in levels.
    #[allow(clippy::cast_precision_loss)]
    #[must_use]
    pub fn moments(&self) -> (f64, f64) {
        let n = self.total() as f64;
        if n == 0.0 {
            return (0.0, 0.0);
        }
        let (sum, sum_sq) = self
            .bins
            .iter()
            .enumerate()
            .fold((0.0, 0.0), |(s, sq), (level, &count)| {
                let (l, c) = (level as f64, count as f64);
                (s + l * c, sq + l * l * c)
            });
        let mean = sum / n;
        (mean, (sum_sq / n - mean * mean).max(0.0).sqrt())
    }

    /// Share of pixels at or below `level`.
    #[allow(clippy::cast_precision_loss)]
    #[must_use]
    pub fn share_at_or_below(&self, level: u8) -> f64 {
        match self.total() {
            0 => 0.0,
            n => self.cumulative[usize::from(level)] as f64 / n as f64,
        }
    }

    /// Share of pixels at or above `level`.
    #[must_use]
    pub fn share_at_or_above(&self, level: u8) -> f64 {
        match level.checked_sub(1) {
            Some(below) if self.total() > 0 => 1.0 - self.share_at_or_below(below),
            Some(_) => 0.0,
            None => f64::from(u8::from(self.total() > 0)),
        }
    }

    /// Shannon entropy normalised to `[0, 1]` (8 bits = 1.0).
    #[allow(clippy::cast_precision_loss)]
    #[must_use]
    pub fn entropy(&self) -> f64 {
        let n = self.total() as f64;
        if n == 0.0 {
            return 0.0;
        }
        let bits: f64 = self
            .bins
            .iter()
            .filter(|&&c| c > 0)
            .map(|&c| {
                let p = c as f64 / n;
                -p * p.log2()
            })
            .sum();
        (bits / 8.0).clamp(0.0, 1.0)
    }

    /// Fraction of empty bins inside the occupied tonal range.
    ///
    /// Posterised or heavily re-quantised images leave regular gaps; narrow
    /// ranges (flat images) report zero.
    #[allow(clippy::cast_precision_loss)]
    #[must_use]
    pub fn banding(&self) -> f64 {
        let lo = usize::from(self.percentile(0.01));
        let hi = usize::from(self.percentile(0.99));
        if hi < lo + 16 {
            return 0.0;
        }
        let empty = self.bins[lo..=hi].iter().filter(|&&c| c == 0).count();
        empty as f64 / (hi - lo + 1) as f64
    }
}

/// Exposure statistics for one image.
#[derive(Debug, Clone)]
pub struct ExposureAnalysis {
    pub histogram: Histogram,
    pub mean: f64,
    pub std_dev: f64,
    /// Severity of crushed shadows in `[0, 1]`.
    pub under: f64,
    /// Severity of blown highlights in `[0, 1]`.
    pub over: f64,
}

impl ExposureAnalysis {
    #[must_use]
    pub fn analyze(image: &GrayImage, config: &ExposureConfig) -> Self {
        let histogram = Histogram::from_luma(image);
        let (mean, std_dev) = histogram.moments();
        let limit = config.max_clipped_fraction.max(f64::EPSILON);

        let shadows = (histogram.share_at_or_below(config.shadow_clip_level) / limit).min(1.0);
        let dark_mean = ((60.0 - mean) / 60.0).clamp(0.0, 1.0);
        let under = 0.7 * shadows + 0.3 * dark_mean;

        let highlights =
            (histogram.share_at_or_above(config.highlight_clip_level) / limit).min(1.0);
        let bright_mean = ((mean - 195.0) / 60.0).clamp(0.0, 1.0);
        let over = 0.7 * highlights + 0.3 * bright_mean;

        Self {
            histogram,
            mean,
            std_dev,
            under,
            over,
        }
    }

    /// Mean luminance in `[0, 1]`.
    #[must_use]
    pub fn brightness(&self) -> f64 {
        self.mean / 255.0
    }

    /// Luminance spread in `[0, 1]`; a standard deviation of 64 counts as full contrast.
    #[must_use]
    pub fn contrast(&self) -> f64 {
        (self.std_dev / 64.0).min(1.0)
    }

    /// Exposure quality, 1.0 when neither end of the histogram is clipped.
    #[must_use]
    pub fn exposure_quality(&self) -> f64 {
        1.0 - self.under.max(self.over)
    }
}
