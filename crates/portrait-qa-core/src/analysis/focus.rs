//! Sharpness and noise estimation.

use image::GrayImage;

/// Variance of the 4-neighbour Laplacian response.
///
/// High for crisp edges and texture, near zero for defocused or flat images.
#[allow(clippy::cast_precision_loss)]
#[must_use]
pub fn laplacian_variance(gray: &GrayImage) -> f64 {
    let (w, h) = gray.dimensions();
    if w < 3 || h < 3 {
        return 0.0;
    }
    let px = |x: u32, y: u32| f64::from(gray.get_pixel(x, y).0[0]);

    let mut sum = 0.0;
    let mut sum_sq = 0.0;
    let mut n = 0u64;
    for y in 1..h - 1 {
        for x in 1..w - 1 {
            let lap = 4.0 * px(x, y) - px(x - 1, y) - px(x + 1, y) - px(x, y - 1) - px(x, y + 1);
            sum += lap;
            sum_sq += lap * lap;
            n += 1;
        }
    }
    let n = n as f64;
    let mean = sum / n;
    (sum_sq / n - mean * mean).max(0.0)
}

/// Maps Laplacian variance onto a `[0, 1]` sharpness score.
///
/// `knee` is the variance that scores 0.5.
#[must_use]
pub fn sharpness_score(variance: f64, knee: f64) -> f64 {
    if variance <= 0.0 {
        return 0.0;
    }
    variance / (variance + knee)
}

/// Immerkær fast noise estimate: standard deviation of additive noise in grey levels.
#[allow(clippy::cast_precision_loss)]
#[must_use]
pub fn noise_sigma(gray: &GrayImage) -> f64 {
    let (w, h) = gray.dimensions();
    if w < 3 || h < 3 {
        return 0.0;
    }
    let px = |x: u32, y: u32| f64::from(gray.get_pixel(x, y).0[0]);

    let mut total = 0.0;
    for y in 1..h - 1 {
        for x in 1..w - 1 {
            let response = px(x - 1, y - 1) - 2.0 * px(x, y - 1) + px(x + 1, y - 1)
                - 2.0 * px(x - 1, y)
                + 4.0 * px(x, y)
                - 2.0 * px(x + 1, y)
                + px(x - 1, y + 1)
                - 2.0 * px(x, y + 1)
                + px(x + 1, y + 1);
            total += response.abs();
        }
    }
    let interior = f64::from(w - 2) * f64::from(h - 2);
    (std::f64::consts::FRAC_PI_2).sqrt() * total / (6.0 * interior)
}

#[cfg(test)]
#[allow(clippy::cast_possible_truncation)]
mod tests {
    use super::*;

    fn checkerboard(size: u32, cell: u32) -> GrayImage {
        GrayImage::from_fn(size, size, |x, y| {
            if (x / cell + y / cell) % 2 == 0 {
                image::Luma([40u8])
            } else {
                image::Luma([210u8])
            }
        })
    }

    #[test]
    fn test_flat_image_has_no_focus_energy() {
        let flat = GrayImage::from_fn(64, 64, |_, _| image::Luma([128u8]));
        assert!(laplacian_variance(&flat).abs() < f64::EPSILON);
        assert!(sharpness_score(0.0, 100.0).abs() < f64::EPSILON);
        assert!(noise_sigma(&flat).abs() < f64::EPSILON);
    }

    #[test]
    fn test_blurring_lowers_variance() {
        let sharp = checkerboard(128, 8);
        let blurred = image::imageops::blur(&sharp, 3.0);
        let sharp_var = laplacian_variance(&sharp);
        let blurred_var = laplacian_variance(&blurred);
        assert!(
            sharp_var > blurred_var * 4.0,
            "sharp {sharp_var} vs blurred {blurred_var}"
        );
    }

    #[test]
    fn test_sharpness_knee() {
        assert!((sharpness_score(100.0, 100.0) - 0.5).abs() < f64::EPSILON);
        assert!(sharpness_score(1000.0, 100.0) > 0.9);
    }

    #[test]
    fn test_gradient_is_not_noise() {
        let ramp = GrayImage::from_fn(64, 64, |x, _| image::Luma([(x * 4) as u8]));
        assert!(noise_sigma(&ramp) < 0.5);
    }
}
