//! Spectrograph dispersion.
//!
//! The wavelength step per detector pixel follows from the grating
//! equation. With grating density `G` (lines/mm), diffraction order `k`,
//! total included angle `θ` and camera focal length `f`:
//!
//! ```text
//! α = θ/2 + asin(k·G·λ / (2·cos(θ/2)))      incidence angle
//! β = α - θ                                  diffraction angle
//! dλ/dx = cos β / (k·G·f)                    linear dispersion
//! ```
//!
//! Scaled by the effective pixel pitch (sensor pitch times binning) this
//! yields the nanometers-per-pixel value the FITS writer uses to adjust
//! `WAVELNTH` for a pixel shift.

use helio_core::{Dispersion, Error, Result, Wavelength};

/// Geometry of a scanning spectrograph.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Spectrograph {
    /// Grating density, lines per millimeter.
    pub grating_density: f64,
    /// Diffraction order.
    pub order: u32,
    /// Total angle between collimator and camera axes, degrees.
    pub total_angle_degrees: f64,
    /// Camera focal length, millimeters.
    pub focal_length_mm: f64,
}

impl Spectrograph {
    /// The Sol'Ex reference configuration.
    pub fn solex() -> Self {
        Self {
            grating_density: 2400.0,
            order: 1,
            total_angle_degrees: 34.0,
            focal_length_mm: 125.0,
        }
    }
}

/// Computes the spectral dispersion at `wavelength`.
///
/// `pixel_size_microns` is the sensor pitch; `binning` multiplies it.
///
/// # Errors
///
/// Returns [`Error::InvalidParameter`] when the geometry cannot diffract
/// the wavelength (grating equation argument out of `[-1, 1]`) or any
/// parameter is non-positive.
pub fn spectral_dispersion(
    spectrograph: &Spectrograph,
    wavelength: Wavelength,
    pixel_size_microns: f64,
    binning: u32,
) -> Result<Dispersion> {
    let g = spectrograph.grating_density;
    let k = f64::from(spectrograph.order);
    let f = spectrograph.focal_length_mm;
    if g <= 0.0 || k <= 0.0 || f <= 0.0 || pixel_size_microns <= 0.0 || binning == 0 {
        return Err(Error::invalid_parameter(
            "spectrograph parameters must be positive",
        ));
    }

    let theta = spectrograph.total_angle_degrees.to_radians();
    let lambda_mm = wavelength.nanometers() * 1e-6;
    let sin_arg = k * g * lambda_mm / (2.0 * (theta / 2.0).cos());
    if !(-1.0..=1.0).contains(&sin_arg) {
        return Err(Error::invalid_parameter(format!(
            "grating cannot diffract {} nm in order {}",
            wavelength.nanometers(),
            spectrograph.order
        )));
    }
    let alpha = theta / 2.0 + sin_arg.asin();
    let beta = alpha - theta;

    // mm of wavelength per mm at the focal plane, converted to nm/mm.
    let nm_per_mm = beta.cos() / (k * g * f) * 1e6;
    let pixel_mm = pixel_size_microns * f64::from(binning) * 1e-3;
    Ok(Dispersion::from_nanometers_per_pixel(nm_per_mm * pixel_mm))
}
