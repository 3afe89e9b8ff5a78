//! The Voigt-fitter collaborator seam.
//!
//! Fitting a Voigt profile (Gaussian convolved with Lorentzian) to the line
//! core is delegated to an external fitter behind [`VoigtFitter`]. The
//! analyzer only needs the fitted center and FWHM; non-convergence is a
//! value, not an error, and leaves the dependent statistics unset.

use crate::profile::SpectralPoint;

/// Result of a Voigt profile fit.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct VoigtFit {
    /// Whether the fitter converged; when `false` the other fields are
    /// best-effort and must not be reported.
    pub converged: bool,
    /// Fitted line center, angstroms.
    pub center: f64,
    /// Fitted full width at half maximum, angstroms.
    pub fwhm: f64,
    /// Fitted line amplitude (depth below continuum).
    pub amplitude: f64,
}

/// An external Voigt profile fitter.
///
/// Implementations receive the raw points of the adaptive window, the
/// continuum level and the detected line center as the starting guess.
pub trait VoigtFitter {
    /// Fits a Voigt profile to `points`.
    fn fit(&self, points: &[SpectralPoint], continuum: f64, initial_center: f64) -> VoigtFit;
}
