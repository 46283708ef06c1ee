//! Edge and layout statistics used for texture and composition.

use image::GrayImage;

/// Sobel gradient magnitudes for every pixel (border pixels are zero).
#[derive(Debug, Clone)]
pub struct EdgeMap {
    width: u32,
    height: u32,
    magnitudes: Vec<f32>,
}

impl EdgeMap {
    /// Runs the Sobel operator over a grayscale image.
    #[allow(clippy::cast_possible_truncation)]
    #[must_use]
    pub fn sobel(gray: &GrayImage) -> Self {
        let (width, height) = gray.dimensions();
        let mut magnitudes = vec![0.0f32; (width as usize) * (height as usize)];
        if width >= 3 && height >= 3 {
            let px = |x: u32, y: u32| f64::from(gray.get_pixel(x, y).0[0]);
            for y in 1..height - 1 {
                for x in 1..width - 1 {
                    let gx = px(x + 1, y - 1) + 2.0 * px(x + 1, y) + px(x + 1, y + 1)
                        - px(x - 1, y - 1)
                        - 2.0 * px(x - 1, y)
                        - px(x - 1, y + 1);
                    let gy = px(x - 1, y + 1) + 2.0 * px(x, y + 1) + px(x + 1, y + 1)
                        - px(x - 1, y - 1)
                        - 2.0 * px(x, y - 1)
                        - px(x + 1, y - 1);
                    magnitudes[(y * width + x) as usize] = gx.hypot(gy) as f32;
                }
            }
        }
        Self {
            width,
            height,
            magnitudes,
        }
    }

    /// Width of the source image.
    #[must_use]
    pub const fn width(&self) -> u32 {
        self.width
    }

    /// Height of the source image.
    #[must_use]
    pub const fn height(&self) -> u32 {
        self.height
    }

    fn at(&self, x: u32, y: u32) -> f32 {
        self.magnitudes[(y * self.width + x) as usize]
    }

    /// Fraction of pixels whose gradient exceeds `threshold`.
    #[allow(clippy::cast_precision_loss)]
    #[must_use]
    pub fn density(&self, threshold: f32) -> f64 {
        if self.magnitudes.is_empty() {
            return 0.0;
        }
        let strong = self.magnitudes.iter().filter(|&&m| m > threshold).count();
        strong as f64 / self.magnitudes.len() as f64
    }

    /// Edge density inside a region given as fractions of the image size.
    #[allow(
        clippy::cast_precision_loss,
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss
    )]
    #[must_use]
    pub fn region_density(&self, x0: f64, y0: f64, x1: f64, y1: f64, threshold: f32) -> f64 {
        let (w, h) = (f64::from(self.width), f64::from(self.height));
        let xs = ((x0 * w) as u32).min(self.width)..((x1 * w) as u32).min(self.width);
        let ys = ((y0 * h) as u32).min(self.height)..((y1 * h) as u32).min(self.height);
        let mut total = 0u64;
        let mut strong = 0u64;
        for y in ys {
            for x in xs.clone() {
                total += 1;
                if self.at(x, y) > threshold {
                    strong += 1;
                }
            }
        }
        if total == 0 {
            0.0
        } else {
            strong as f64 / total as f64
        }
    }

    /// Edge density of the outer border ring whose thickness is `ring` of each side.
    #[allow(clippy::cast_precision_loss)]
    #[must_use]
    pub fn border_density(&self, ring: f64, threshold: f32) -> f64 {
        let (w, h) = (f64::from(self.width), f64::from(self.height));
        let mut total = 0u64;
        let mut strong = 0u64;
        for y in 0..self.height {
            for x in 0..self.width {
                let fx = f64::from(x) / w;
                let fy = f64::from(y) / h;
                if fx < ring || fx >= 1.0 - ring || fy < ring || fy >= 1.0 - ring {
                    total += 1;
                    if self.at(x, y) > threshold {
                        strong += 1;
                    }
                }
            }
        }
        if total == 0 {
            0.0
        } else {
            strong as f64 / total as f64
        }
    }

    /// Gradient-weighted centroid as fractions of width and height.
    ///
    /// Falls back to the geometric center for featureless images.
    #[must_use]
    pub fn centroid(&self) -> (f64, f64) {
        let mut mass = 0.0;
        let mut sx = 0.0;
        let mut sy = 0.0;
        for y in 0..self.height {
            for x in 0..self.width {
                let m = f64::from(self.at(x, y));
                mass += m;
                sx += m * f64::from(x);
                sy += m * f64::from(y);
            }
        }
        if mass <= f64::EPSILON {
            return (0.5, 0.5);
        }
        (
            sx / mass / f64::from(self.width.max(1)),
            sy / mass / f64::from(self.height.max(1)),
        )
    }

    /// Share of total gradient mass in each cell of a 3×3 grid, row-major.
    #[must_use]
    pub fn grid_shares(&self) -> [f64; 9] {
        let mut cells = [0.0f64; 9];
        for y in 0..self.height {
            let row = ((y * 3) / self.height.max(1)).min(2) as usize;
            for x in 0..self.width {
                let col = ((x * 3) / self.width.max(1)).min(2) as usize;
                cells[row * 3 + col] += f64::from(self.at(x, y));
            }
        }
        let total: f64 = cells.iter().sum();
        if total <= f64::EPSILON {
            return [1.0 / 9.0; 9];
        }
        cells.map(|c| c / total)
    }

    /// Gradient mass on the left and right halves.
    #[must_use]
    pub fn horizontal_masses(&self) -> (f64, f64) {
        let half = self.width / 2;
        let mut left = 0.0;
        let mut right = 0.0;
        for y in 0..self.height {
            for x in 0..self.width {
                let m = f64::from(self.at(x, y));
                if x < half {
                    left += m;
                } else {
                    right += m;
                }
            }
        }
        (left, right)
    }
}

/// Normalised entropy of a share distribution; 1.0 when perfectly even.
#[must_use]
pub fn evenness(shares: &[f64]) -> f64 {
    if shares.len() < 2 {
        return 1.0;
    }
    let entropy: f64 = shares
        .iter()
        .filter(|&&p| p > 0.0)
        .map(|&p| -p * p.ln())
        .sum();
    #[allow(clippy::cast_precision_loss)]
    let max = (shares.len() as f64).ln();
    (entropy / max).clamp(0.0, 1.0)
}

/// Left/right mirror similarity in `[0, 1]`.
#[allow(clippy::cast_precision_loss)]
#[must_use]
pub fn mirror_symmetry(gray: &GrayImage) -> f64 {
    let (w, h) = gray.dimensions();
    if w < 2 || h == 0 {
        return 1.0;
    }
    let mut diff = 0u64;
    let mut n = 0u64;
    for y in 0..h {
        for x in 0..w / 2 {
            let a = gray.get_pixel(x, y).0[0];
            let b = gray.get_pixel(w - 1 - x, y).0[0];
            diff += u64::from(a.abs_diff(b));
            n += 1;
        }
    }
    let mean = diff as f64 / n as f64;
    1.0 - (mean / 64.0).min(1.0)
}

/// JPEG 8×8 blockiness: how much stronger steps are across block borders than inside blocks.
///
/// Returns 0.0 for clean images, rising toward 1.0 as block edges dominate.
/// Must run on the full-resolution image; downscaling destroys the grid.
#[allow(clippy::cast_precision_loss)]
#[must_use]
pub fn blockiness(gray: &GrayImage) -> f64 {
    let (w, h) = gray.dimensions();
    if w < 16 || h < 16 {
        return 0.0;
    }
    let mut border = 0u64;
    let mut border_n = 0u64;
    let mut inner = 0u64;
    let mut inner_n = 0u64;

    // Sample every other row/column to bound the cost on large images.
    for y in (0..h).step_by(2) {
        for x in 0..w - 1 {
            let d = u64::from(gray.get_pixel(x, y).0[0].abs_diff(gray.get_pixel(x + 1, y).0[0]));
            if x % 8 == 7 {
                border += d;
                border_n += 1;
            } else {
                inner += d;
                inner_n += 1;
            }
        }
    }
    for x in (0..w).step_by(2) {
        for y in 0..h - 1 {
            let d = u64::from(gray.get_pixel(x, y).0[0].abs_diff(gray.get_pixel(x, y + 1).0[0]));
            if y % 8 == 7 {
                border += d;
                border_n += 1;
            } else {
                inner += d;
                inner_n += 1;
            }
        }
    }
    if border_n == 0 || inner_n == 0 {
        return 0.0;
    }
    let border_mean = border as f64 / border_n as f64;
    let inner_mean = inner as f64 / inner_n as f64;
    if border_mean < 1.0 {
        return 0.0;
    }
    let ratio = border_mean / (inner_mean + 1.0);
    ((ratio - 1.0) / 2.0).clamp(0.0, 1.0)
}
