//! Line-profile statistics.
//!
//! The analyzer walks a wavelength-sorted profile through a fixed pipeline:
//! smooth, locate the absorption core, measure continuum and depth, derive
//! an adaptive fit window from the 85% recovery points, and hand the raw
//! window to the Voigt fitter. Wavelengths are angstroms throughout; the
//! optional known line center arrives in nanometers (the catalog unit) and
//! is converted on report.

use tracing::debug;

use crate::voigt::{VoigtFit, VoigtFitter};

/// Half-width of the raw-minimum search around the detected core, angstroms.
const MIN_SEARCH_HALF_WIDTH: f64 = 2.0;

/// Fraction of the line depth a wing sample must recover to bound the
/// adaptive window.
const RECOVERY_FRACTION: f64 = 0.85;

/// Safety factor applied to the adaptive half-width.
const WINDOW_SCALE: f64 = 1.2;

/// Floor of the adaptive half-width, angstroms.
const MIN_WINDOW_HALF_WIDTH: f64 = 2.5;

/// Smoothing window of the centered moving average.
const SMOOTH_WINDOW: usize = 5;

/// One sample of a spectral-line profile.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpectralPoint {
    /// Wavelength, angstroms.
    pub wavelength: f64,
    /// Pixel shift the sample was extracted at.
    pub pixel_shift: f64,
    /// Measured intensity.
    pub intensity: f64,
}

impl SpectralPoint {
    /// Creates a new sample.
    pub fn new(wavelength: f64, pixel_shift: f64, intensity: f64) -> Self {
        Self {
            wavelength,
            pixel_shift,
            intensity,
        }
    }
}

/// Statistics of one spectral line.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct LineStatistics {
    /// Continuum level (maximum of the smoothed profile).
    pub continuum: f64,
    /// Reported line center, angstroms.
    pub line_center_wavelength: f64,
    /// Minimum raw intensity near the core.
    pub min_intensity: f64,
    /// Relative line depth `(continuum - min) / continuum`.
    pub line_depth: f64,
    /// Half-maximum level `(continuum + min) / 2`.
    pub half_max: f64,
    /// Fitted FWHM, angstroms; unset without a converged fit.
    pub fwhm: Option<f64>,
    /// Blue-side half-maximum wavelength; unset without a converged fit.
    pub blue_half_max_wavelength: Option<f64>,
    /// Red-side half-maximum wavelength; unset without a converged fit.
    pub red_half_max_wavelength: Option<f64>,
    /// The raw fit result, when a fitter ran.
    pub fit: Option<VoigtFit>,
}

/// Computes line statistics over a wavelength-sorted profile.
///
/// `reference` optionally supplies the profile on which the core is
/// located (the scan's reference profile); measurement still happens on
/// `points`. `fitter` is the external Voigt fitter; `known_center_nm` is
/// the catalog line center in nanometers and, when given, is what the
/// statistics report as the line center.
///
/// Fewer than 3 points yield empty statistics.
pub fn compute_statistics(
    points: &[SpectralPoint],
    reference: Option<&[SpectralPoint]>,
    fitter: Option<&dyn VoigtFitter>,
    known_center_nm: Option<f64>,
) -> LineStatistics {
    if points.len() < 3 {
        return LineStatistics::default();
    }

    let smoothed = smooth(points);

    // Core location: argmin on the smoothed profile (or the reference).
    let detected_center_wl = match reference {
        Some(r) if r.len() >= 3 => {
            let r_smoothed = smooth(r);
            r[argmin(&r_smoothed)].wavelength
        }
        _ => points[argmin(&smoothed)].wavelength,
    };
    let center_idx = nearest_index(points, detected_center_wl);

    let continuum = smoothed.iter().copied().fold(f64::MIN, f64::max);

    // Minimum on the *raw* profile within the core neighborhood.
    let min_intensity = points
        .iter()
        .filter(|p| (p.wavelength - detected_center_wl).abs() <= MIN_SEARCH_HALF_WIDTH)
        .map(|p| p.intensity)
        .fold(f64::MAX, f64::min);

    let line_depth = if continuum > 0.0 {
        (continuum - min_intensity) / continuum
    } else {
        0.0
    };
    let half_max = (continuum + min_intensity) / 2.0;

    // Adaptive window: first recovery sample on each side of the core.
    let recovery = min_intensity + RECOVERY_FRACTION * (continuum - min_intensity);
    let mut left_width = 0.0f64;
    for i in (0..center_idx).rev() {
        if smoothed[i] >= recovery {
            left_width = detected_center_wl - points[i].wavelength;
            break;
        }
    }
    let mut right_width = 0.0f64;
    for i in (center_idx + 1)..points.len() {
        if smoothed[i] >= recovery {
            right_width = points[i].wavelength - detected_center_wl;
            break;
        }
    }
    let half_width = (left_width.max(right_width) * WINDOW_SCALE).max(MIN_WINDOW_HALF_WIDTH);

    let mut stats = LineStatistics {
        continuum,
        line_center_wavelength: known_center_nm
            .map(|nm| nm * 10.0)
            .unwrap_or(detected_center_wl),
        min_intensity,
        line_depth,
        half_max,
        ..LineStatistics::default()
    };

    if let Some(fitter) = fitter {
        let window: Vec<SpectralPoint> = points
            .iter()
            .filter(|p| (p.wavelength - detected_center_wl).abs() <= half_width)
            .copied()
            .collect();
        let fit = fitter.fit(&window, continuum, detected_center_wl);
        if fit.converged {
            stats.fwhm = Some(fit.fwhm);
            stats.blue_half_max_wavelength = Some(fit.center - fit.fwhm / 2.0);
            stats.red_half_max_wavelength = Some(fit.center + fit.fwhm / 2.0);
        } else {
            debug!(
                center = detected_center_wl,
                window = window.len(),
                "voigt fit did not converge, reporting statistics without FWHM"
            );
        }
        stats.fit = Some(fit);
    }

    stats
}

/// Centered moving average with clamped edges.
fn smooth(points: &[SpectralPoint]) -> Vec<f64> {
    let n = points.len();
    let half = SMOOTH_WINDOW / 2;
    (0..n)
        .map(|i| {
            let lo = i.saturating_sub(half);
            let hi = (i + half).min(n - 1);
            let sum: f64 = points[lo..=hi].iter().map(|p| p.intensity).sum();
            sum / (hi - lo + 1) as f64
        })
        .collect()
}

fn argmin(values: &[f64]) -> usize {
    let mut best = 0;
    for (i, &v) in values.iter().enumerate() {
        if v < values[best] {
            best = i;
        }
    }
    best
}

fn nearest_index(points: &[SpectralPoint], wavelength: f64) -> usize {
    let mut best = 0;
    let mut best_dist = f64::MAX;
    for (i, p) in points.iter().enumerate() {
        let d = (p.wavelength - wavelength).abs();
        if d < best_dist {
            best_dist = d;
            best = i;
        }
    }
    best
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    /// A flat-continuum absorption line sampled every 0.2 A.
    fn absorption_profile(center: f64, depth: f64, width: f64) -> Vec<SpectralPoint> {
        let mut points = Vec::new();
        let mut wl = center - 3.0;
        while wl <= center + 3.0 + 1e-9 {
            let d = (wl - center) / width;
            let intensity = 1.0 - depth * (-d * d).exp();
            points.push(SpectralPoint::new(wl, (wl - center) / 0.1, intensity));
            wl += 0.2;
        }
        points
    }

    struct CannedFitter(VoigtFit);
    impl VoigtFitter for CannedFitter {
        fn fit(&self, points: &[SpectralPoint], _continuum: f64, _center: f64) -> VoigtFit {
            assert!(!points.is_empty());
            self.0
        }
    }

    #[test]
    fn test_too_few_points() {
        let points = vec![
            SpectralPoint::new(6562.0, 0.0, 1.0),
            SpectralPoint::new(6563.0, 1.0, 0.5),
        ];
        assert_eq!(
            compute_statistics(&points, None, None, None),
            LineStatistics::default()
        );
    }

    #[test]
    fn test_depth_and_center() {
        let points = absorption_profile(6562.8, 0.7, 0.4);
        let stats = compute_statistics(&points, None, None, None);
        assert_abs_diff_eq!(stats.line_center_wavelength, 6562.8, epsilon = 0.21);
        assert_abs_diff_eq!(stats.min_intensity, 0.3, epsilon = 0.01);
        assert_abs_diff_eq!(stats.continuum, 1.0, epsilon = 0.01);
        assert_abs_diff_eq!(stats.line_depth, 0.7, epsilon = 0.02);
        assert_abs_diff_eq!(stats.half_max, 0.65, epsilon = 0.01);
        assert!(stats.fwhm.is_none());
    }

    #[test]
    fn test_known_center_overrides_detected() {
        let points = absorption_profile(6562.8, 0.5, 0.4);
        let stats = compute_statistics(&points, None, None, Some(656.28));
        assert_abs_diff_eq!(stats.line_center_wavelength, 6562.8, epsilon = 1e-9);
    }

    #[test]
    fn test_converged_fit_reported() {
        let points = absorption_profile(6562.8, 0.6, 0.5);
        let fitter = CannedFitter(VoigtFit {
            converged: true,
            center: 6562.8,
            fwhm: 1.1,
            amplitude: 0.6,
        });
        let stats = compute_statistics(&points, None, Some(&fitter), None);
        assert_eq!(stats.fwhm, Some(1.1));
        assert_abs_diff_eq!(stats.blue_half_max_wavelength.unwrap(), 6562.25, epsilon = 1e-9);
        assert_abs_diff_eq!(stats.red_half_max_wavelength.unwrap(), 6563.35, epsilon = 1e-9);
    }

    #[test]
    fn test_unconverged_fit_leaves_fwhm_unset() {
        let points = absorption_profile(6562.8, 0.6, 0.5);
        let fitter = CannedFitter(VoigtFit::default());
        let stats = compute_statistics(&points, None, Some(&fitter), None);
        assert!(stats.fwhm.is_none());
        assert!(stats.blue_half_max_wavelength.is_none());
        assert!(stats.fit.is_some());
    }

    #[test]
    fn test_reference_profile_locates_center() {
        // Measured profile has its own minimum off to the side; the
        // reference decides where the core is.
        let measured = absorption_profile(6561.0, 0.4, 0.4);
        let reference = absorption_profile(6562.0, 0.8, 0.4);
        let stats = compute_statistics(&measured, Some(&reference), None, None);
        assert_abs_diff_eq!(stats.line_center_wavelength, 6562.0, epsilon = 0.21);
    }

    #[test]
    fn test_window_floor() {
        // A very narrow line still fits over at least +/- 2.5 A.
        let points = absorption_profile(6562.8, 0.9, 0.1);
        struct WindowProbe(std::cell::Cell<usize>);
        impl VoigtFitter for WindowProbe {
            fn fit(&self, points: &[SpectralPoint], _c: f64, _x0: f64) -> VoigtFit {
                self.0.set(points.len());
                VoigtFit::default()
            }
        }
        let probe = WindowProbe(std::cell::Cell::new(0));
        compute_statistics(&points, None, Some(&probe), None);
        // 2.5 A on each side at 0.2 A sampling is at least 25 points.
        assert!(probe.0.get() >= 25, "window had {} points", probe.0.get());
    }
}
