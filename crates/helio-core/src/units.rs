//! Scalar units used across the pipeline.
//!
//! Newtypes for angles, wavelengths and spectral dispersion keep unit
//! conversions explicit: wavelengths travel as nanometers internally while
//! the spectral analyzer reasons in angstroms, and mixing the two silently
//! is exactly the bug class these types exist to prevent.

/// An angle stored in radians.
///
/// # Example
///
/// ```rust
/// use helio_core::Angle;
///
/// let a = Angle::from_degrees(90.0);
/// assert!((a.radians() - std::f64::consts::FRAC_PI_2).abs() < 1e-12);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default)]
pub struct Angle(f64);

impl Angle {
    /// Creates an angle from radians.
    #[inline]
    pub const fn from_radians(radians: f64) -> Self {
        Self(radians)
    }

    /// Creates an angle from degrees.
    #[inline]
    pub fn from_degrees(degrees: f64) -> Self {
        Self(degrees.to_radians())
    }

    /// Returns the angle in radians.
    #[inline]
    pub const fn radians(self) -> f64 {
        self.0
    }

    /// Returns the angle in degrees.
    #[inline]
    pub fn degrees(self) -> f64 {
        self.0.to_degrees()
    }

    /// Returns the angle normalized to `[0, 2π)`.
    pub fn normalized(self) -> Self {
        let tau = std::f64::consts::TAU;
        let mut v = self.0 % tau;
        if v < 0.0 {
            v += tau;
        }
        Self(v)
    }
}

/// A wavelength stored in nanometers.
///
/// # Example
///
/// ```rust
/// use helio_core::Wavelength;
///
/// let h_alpha = Wavelength::from_angstroms(6562.8);
/// assert!((h_alpha.nanometers() - 656.28).abs() < 1e-9);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default)]
pub struct Wavelength(f64);

impl Wavelength {
    /// Creates a wavelength from nanometers.
    #[inline]
    pub const fn from_nanometers(nm: f64) -> Self {
        Self(nm)
    }

    /// Creates a wavelength from angstroms.
    #[inline]
    pub fn from_angstroms(angstroms: f64) -> Self {
        Self(angstroms / 10.0)
    }

    /// Returns the wavelength in nanometers.
    #[inline]
    pub const fn nanometers(self) -> f64 {
        self.0
    }

    /// Returns the wavelength in angstroms.
    #[inline]
    pub fn angstroms(self) -> f64 {
        self.0 * 10.0
    }

    /// Returns the wavelength shifted by `pixel_shift` detector rows.
    ///
    /// Zero shift denotes line center; the adjustment is
    /// `λ + shift · dispersion`.
    #[inline]
    pub fn with_pixel_shift(self, pixel_shift: f64, dispersion: Dispersion) -> Self {
        Self(self.0 + pixel_shift * dispersion.nanometers_per_pixel())
    }
}

/// Spectral dispersion, stored in nanometers per detector pixel.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default)]
pub struct Dispersion(f64);

impl Dispersion {
    /// Creates a dispersion from nanometers per pixel.
    #[inline]
    pub const fn from_nanometers_per_pixel(nm_per_px: f64) -> Self {
        Self(nm_per_px)
    }

    /// Returns nanometers per pixel.
    #[inline]
    pub const fn nanometers_per_pixel(self) -> f64 {
        self.0
    }

    /// Returns angstroms per pixel.
    #[inline]
    pub fn angstroms_per_pixel(self) -> f64 {
        self.0 * 10.0
    }
}

/// A point in image coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Point2D {
    /// X coordinate (column).
    pub x: f64,
    /// Y coordinate (row).
    pub y: f64,
}

impl Point2D {
    /// Creates a new point.
    #[inline]
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Euclidean distance to another point.
    #[inline]
    pub fn distance_to(self, other: Point2D) -> f64 {
        (self.x - other.x).hypot(self.y - other.y)
    }
}

/// Formats a duration as a short human-readable string.
///
/// # Example
///
/// ```rust
/// use std::time::Duration;
///
/// assert_eq!(helio_core::units::format_duration(Duration::from_millis(83_450)), "1m 23.5s");
/// assert_eq!(helio_core::units::format_duration(Duration::from_millis(450)), "0.5s");
/// ```
pub fn format_duration(d: std::time::Duration) -> String {
    let total = d.as_secs_f64();
    let minutes = (total / 60.0).floor() as u64;
    let seconds = total - minutes as f64 * 60.0;
    if minutes > 0 {
        format!("{minutes}m {seconds:.1}s")
    } else {
        format!("{seconds:.1}s")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_angle_conversions() {
        let a = Angle::from_degrees(180.0);
        assert!((a.radians() - std::f64::consts::PI).abs() < 1e-12);
        assert!((a.degrees() - 180.0).abs() < 1e-12);
    }

    #[test]
    fn test_angle_normalized() {
        let a = Angle::from_degrees(-90.0).normalized();
        assert!((a.degrees() - 270.0).abs() < 1e-9);
        let b = Angle::from_degrees(450.0).normalized();
        assert!((b.degrees() - 90.0).abs() < 1e-9);
    }

    #[test]
    fn test_wavelength_roundtrip() {
        let w = Wavelength::from_angstroms(6562.8);
        assert!((w.angstroms() - 6562.8).abs() < 1e-9);
    }

    #[test]
    fn test_pixel_shift_adjustment() {
        let base = Wavelength::from_nanometers(656.28);
        let disp = Dispersion::from_nanometers_per_pixel(0.005);
        let shifted = base.with_pixel_shift(2.0, disp);
        assert!((shifted.nanometers() - 656.29).abs() < 1e-9);
    }

    #[test]
    fn test_point_distance() {
        let a = Point2D::new(0.0, 0.0);
        let b = Point2D::new(3.0, 4.0);
        assert!((a.distance_to(b) - 5.0).abs() < 1e-12);
    }
}
