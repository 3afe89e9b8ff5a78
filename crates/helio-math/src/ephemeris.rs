//! Solar ephemeris from Julian dates.
//!
//! Low-precision series (Meeus, *Astronomical Algorithms*, ch. 25/29):
//! accurate to a few arcseconds over the photographic era, which is far
//! below the pointing accuracy of any spectroheliograph rig.
//!
//! Angles follow the usual conventions: B₀ is the heliographic latitude of
//! the disk center, L₀ the heliographic longitude of the central meridian,
//! P the position angle of the solar rotation axis relative to celestial
//! north (positive east).

use helio_core::Angle;

/// Julian date at which Carrington rotation 1 began (1853-11-09).
const CARRINGTON_EPOCH_JD: f64 = 2_398_167.329;

/// Mean synodic Carrington rotation period, days.
const CARRINGTON_PERIOD_DAYS: f64 = 27.2753;

/// Inclination of the solar equator on the ecliptic, degrees.
const SOLAR_INCLINATION_DEG: f64 = 7.25;

/// Physical ephemeris of the Sun at one instant.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SolarEphemeris {
    /// Heliographic latitude of the disk center.
    pub b0: Angle,
    /// Heliographic longitude of the central meridian.
    pub l0: Angle,
    /// Position angle of solar north vs. celestial north.
    pub p: Angle,
    /// Carrington rotation number containing the instant.
    pub carrington_rotation: i64,
}

/// Returns the Carrington rotation number containing `jd`.
///
/// Rotation 1 began 1853-11-09 (JD 2398167.329); rotations tick every
/// 27.2753 days.
///
/// # Example
///
/// ```rust
/// use helio_math::carrington_rotation;
///
/// // J2000.0 fell in rotation 1957.
/// assert_eq!(carrington_rotation(2_451_545.0), 1957);
/// ```
pub fn carrington_rotation(jd: f64) -> i64 {
    ((jd - CARRINGTON_EPOCH_JD) / CARRINGTON_PERIOD_DAYS).floor() as i64 + 1
}

/// Computes B₀, L₀ and P for the given Julian date.
pub fn solar_params(jd: f64) -> SolarEphemeris {
    let t = (jd - 2_451_545.0) / 36525.0;

    // Geometric mean longitude and mean anomaly of the Sun, degrees.
    let l_mean = 280.46646 + 36000.76983 * t + 0.0003032 * t * t;
    let m = (357.52911 + 35999.05029 * t - 0.0001537 * t * t).to_radians();

    // Equation of center.
    let c = (1.914602 - 0.004817 * t - 0.000014 * t * t) * m.sin()
        + (0.019993 - 0.000101 * t) * (2.0 * m).sin()
        + 0.000289 * (3.0 * m).sin();

    let true_longitude = (l_mean + c).to_radians();

    // Nutation argument and apparent longitude.
    let omega = (125.04 - 1934.136 * t).to_radians();
    let lambda_apparent = true_longitude + (-0.00569 - 0.00478 * omega.sin()).to_radians();

    // Mean obliquity of the ecliptic with the nutation correction.
    let eps0 = 23.0 + 26.0 / 60.0 + 21.448 / 3600.0
        - (46.8150 * t + 0.00059 * t * t - 0.001813 * t * t * t) / 3600.0;
    let eps = (eps0 + 0.00256 * omega.cos()).to_radians();

    // Longitude of the ascending node of the solar equator.
    let k = (73.6667 + 1.395_833_3 * (jd - 2_396_758.0) / 36525.0).to_radians();
    let inclination = SOLAR_INCLINATION_DEG.to_radians();

    // Position angle: ecliptic and equatorial components.
    let x = (-lambda_apparent.cos() * eps.tan()).atan();
    let y = (-(true_longitude - k).cos() * inclination.tan()).atan();
    let p = x + y;

    let b0 = ((true_longitude - k).sin() * inclination.sin()).asin();

    // Central-meridian longitude: axis-frame angle minus the rotation phase.
    let theta = ((jd - 2_398_220.0) * 360.0 / 25.38).to_radians();
    let eta = (-(true_longitude - k).sin() * inclination.cos())
        .atan2(-(true_longitude - k).cos());
    let l0 = normalize_radians(eta - theta);

    SolarEphemeris {
        b0: Angle::from_radians(b0),
        l0: Angle::from_radians(l0),
        p: Angle::from_radians(p),
        carrington_rotation: carrington_rotation(jd),
    }
}

/// Normalizes an angle to `[0, 2π)`.
fn normalize_radians(v: f64) -> f64 {
    let tau = std::f64::consts::TAU;
    let mut v = v % tau;
    if v < 0.0 {
        v += tau;
    }
    v
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_carrington_epoch() {
        assert_eq!(carrington_rotation(CARRINGTON_EPOCH_JD + 0.1), 1);
        assert_eq!(carrington_rotation(CARRINGTON_EPOCH_JD + 27.3), 2);
        assert_eq!(carrington_rotation(CARRINGTON_EPOCH_JD - 0.1), 0);
    }

    #[test]
    fn test_meeus_example_29a() {
        // Meeus, example 29.a: 1992 October 13.0 TD (JDE 2448908.5):
        // P = +26.27 deg, B0 = +5.99 deg, L0 = 238.63 deg.
        let eph = solar_params(2_448_908.5);
        assert_abs_diff_eq!(eph.p.degrees(), 26.27, epsilon = 0.05);
        assert_abs_diff_eq!(eph.b0.degrees(), 5.99, epsilon = 0.05);
        assert_abs_diff_eq!(eph.l0.degrees(), 238.63, epsilon = 0.5);
    }

    #[test]
    fn test_b0_bounded_by_inclination() {
        // B0 oscillates within +/- the solar inclination over a year.
        let mut jd = 2_451_545.0;
        while jd < 2_451_545.0 + 366.0 {
            let eph = solar_params(jd);
            assert!(eph.b0.degrees().abs() <= SOLAR_INCLINATION_DEG + 0.01);
            jd += 7.0;
        }
    }

    #[test]
    fn test_l0_decreases_with_rotation() {
        // L0 decreases (mod 360) as the Sun rotates under the observer.
        let a = solar_params(2_451_545.0).l0.degrees();
        let b = solar_params(2_451_546.0).l0.degrees();
        let delta = (a - b + 360.0) % 360.0;
        // About 13.2 degrees per day of apparent rotation.
        assert_abs_diff_eq!(delta, 13.2, epsilon = 0.5);
    }
}
