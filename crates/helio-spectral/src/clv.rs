//! Center-to-limb variation.
//!
//! Intensity over a solar disk falls off toward the limb. Binning pixels by
//! `μ = cos θ` (computed from the fitted ellipse) yields the limb-darkening
//! curve used for continuum normalization.

use helio_core::{Ellipse, MonoImage};

/// Computes the center-to-limb variation of `image` over the fitted disk.
///
/// Each pixel inside the ellipse contributes to the bin of its
/// `μ = √(1 - ρ²)` with `ρ² = ((x-cx)/a)² + ((y-cy)/b)²`; the bin index is
/// `min(⌊μ·N⌋, N-1)`. Returns `((i + 0.5)/N, mean intensity)` for each
/// non-empty bin, in increasing μ order.
pub fn center_to_limb(image: &MonoImage, ellipse: &Ellipse, bins: usize) -> Vec<(f64, f64)> {
    if bins == 0 {
        return Vec::new();
    }
    let center = ellipse.center();
    let (a, b) = ellipse.semi_axis();
    if a <= 0.0 || b <= 0.0 {
        return Vec::new();
    }

    let mut sums = vec![0.0f64; bins];
    let mut counts = vec![0u64; bins];
    let (width, height) = image.dimensions();
    for y in 0..height {
        for x in 0..width {
            let dx = (x as f64 - center.x) / a;
            let dy = (y as f64 - center.y) / b;
            let rho_sq = dx * dx + dy * dy;
            if rho_sq > 1.0 {
                continue;
            }
            let mu = (1.0 - rho_sq).sqrt();
            let bin = ((mu * bins as f64) as usize).min(bins - 1);
            sums[bin] += f64::from(image.pixel(x, y));
            counts[bin] += 1;
        }
    }

    (0..bins)
        .filter(|&i| counts[i] > 0)
        .map(|i| ((i as f64 + 0.5) / bins as f64, sums[i] / counts[i] as f64))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Disk image with a linear limb-darkening law `I(μ) = 1000·(0.4 + 0.6·μ)`.
    fn limb_darkened_disk(size: usize, r: f64) -> (MonoImage, Ellipse) {
        let c = (size as f64 - 1.0) / 2.0;
        let mut img = MonoImage::new(size, size);
        for y in 0..size {
            for x in 0..size {
                let rho_sq =
                    ((x as f64 - c) / r).powi(2) + ((y as f64 - c) / r).powi(2);
                if rho_sq <= 1.0 {
                    let mu = (1.0 - rho_sq).sqrt();
                    img.set_pixel(x, y, (1000.0 * (0.4 + 0.6 * mu)) as f32);
                }
            }
        }
        (img, Ellipse::circle(c, c, r))
    }

    #[test]
    fn test_curve_recovers_law() {
        let (img, disk) = limb_darkened_disk(101, 45.0);
        let curve = center_to_limb(&img, &disk, 10);
        assert!(!curve.is_empty());
        for &(mu, mean) in &curve {
            let expected = 1000.0 * (0.4 + 0.6 * mu);
            // Bin centers vs. continuous law: a few percent of tolerance.
            assert!(
                (mean - expected).abs() < 40.0,
                "mu {mu}: {mean} vs {expected}"
            );
        }
    }

    #[test]
    fn test_curve_is_increasing() {
        let (img, disk) = limb_darkened_disk(101, 45.0);
        let curve = center_to_limb(&img, &disk, 8);
        for pair in curve.windows(2) {
            assert!(pair[1].1 > pair[0].1);
        }
    }

    #[test]
    fn test_zero_bins() {
        let (img, disk) = limb_darkened_disk(21, 8.0);
        assert!(center_to_limb(&img, &disk, 0).is_empty());
    }

    #[test]
    fn test_mu_values_are_bin_centers() {
        let (img, disk) = limb_darkened_disk(101, 45.0);
        let curve = center_to_limb(&img, &disk, 4);
        for &(mu, _) in &curve {
            let scaled = mu * 4.0 - 0.5;
            assert!((scaled - scaled.round()).abs() < 1e-12);
        }
    }
}
