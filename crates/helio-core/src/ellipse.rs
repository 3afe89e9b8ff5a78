//! Solar-disk ellipse as a 5-parameter Cartesian conic.
//!
//! The disk fitted on a reconstructed scan is stored as the coefficients of
//! `a·x² + b·x·y + c·y² + d·x + e·y + f = 0`. Keeping the conic form (rather
//! than center/axes/angle) makes the transform catalog exact: rotation,
//! translation and mirroring are coefficient substitutions with no
//! re-fitting step, so geometry metadata stays consistent with the pixels
//! through arbitrarily long transform chains.
//!
//! Mirror transforms use the pixel-grid convention: a width-`w` image
//! reflects across `x = (w-1)/2`, matching `out[y][x] = in[y][w-1-x]`.

use crate::error::{Error, Result};
use crate::units::Point2D;

/// An ellipse in Cartesian conic form.
///
/// # Example
///
/// ```rust
/// use helio_core::Ellipse;
///
/// let disk = Ellipse::circle(10.0, 10.0, 5.0);
/// assert!(disk.contains(10.0, 10.0));
/// assert!(!disk.contains(0.0, 0.0));
/// let (sa, sb) = disk.semi_axis();
/// assert!((sa - 5.0).abs() < 1e-9 && (sb - 5.0).abs() < 1e-9);
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ellipse {
    a: f64,
    b: f64,
    c: f64,
    d: f64,
    e: f64,
    f: f64,
}

impl Ellipse {
    /// Builds an ellipse from conic coefficients `[a, b, c, d, e, f]`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidParameter`] when the coefficients are not
    /// finite or do not describe an ellipse (`b² - 4ac` must be negative).
    pub fn from_cartesian(coeffs: [f64; 6]) -> Result<Self> {
        if coeffs.iter().any(|v| !v.is_finite()) {
            return Err(Error::invalid_parameter("non-finite conic coefficient"));
        }
        let [a, b, c, ..] = coeffs;
        if b * b - 4.0 * a * c >= 0.0 {
            return Err(Error::invalid_parameter(format!(
                "conic is not an ellipse: b^2 - 4ac = {}",
                b * b - 4.0 * a * c
            )));
        }
        let [a, b, c, d, e, f] = coeffs;
        Ok(Self { a, b, c, d, e, f })
    }

    /// Builds an axis-angle parameterized ellipse.
    ///
    /// `(cx, cy)` is the center, `(rx, ry)` the semi-axes along the rotated
    /// x/y directions, `theta` the rotation in radians.
    pub fn from_center_axes(cx: f64, cy: f64, rx: f64, ry: f64, theta: f64) -> Result<Self> {
        if rx <= 0.0 || ry <= 0.0 {
            return Err(Error::invalid_parameter(format!(
                "semi-axes must be positive: ({rx}, {ry})"
            )));
        }
        // Canonical form ((x')/rx)^2 + ((y')/ry)^2 = 1 rotated then translated.
        let canonical = Self {
            a: 1.0 / (rx * rx),
            b: 0.0,
            c: 1.0 / (ry * ry),
            d: 0.0,
            e: 0.0,
            f: -1.0,
        };
        Ok(canonical.rotate(theta).translate(cx, cy))
    }

    /// Builds a circle, the shape the INTI header convention encodes.
    ///
    /// Coefficients are `(1, 0, 1, -2cx, -2cy, cx² + cy² - r²)`.
    pub fn circle(cx: f64, cy: f64, r: f64) -> Self {
        Self {
            a: 1.0,
            b: 0.0,
            c: 1.0,
            d: -2.0 * cx,
            e: -2.0 * cy,
            f: cx * cx + cy * cy - r * r,
        }
    }

    /// Returns the conic coefficients `[a, b, c, d, e, f]`.
    #[inline]
    pub fn coefficients(&self) -> [f64; 6] {
        [self.a, self.b, self.c, self.d, self.e, self.f]
    }

    /// Evaluates the conic polynomial at `(x, y)`.
    #[inline]
    fn eval(&self, x: f64, y: f64) -> f64 {
        self.a * x * x + self.b * x * y + self.c * y * y + self.d * x + self.e * y + self.f
    }

    /// Returns `true` when `(x, y)` lies inside or on the ellipse.
    ///
    /// Sign-normalized, so a conic scaled by any nonzero factor answers the
    /// same way.
    pub fn contains(&self, x: f64, y: f64) -> bool {
        let center = self.center();
        let at_center = self.eval(center.x, center.y);
        self.eval(x, y) * at_center >= 0.0
    }

    /// Returns the center of the ellipse.
    pub fn center(&self) -> Point2D {
        let det = 4.0 * self.a * self.c - self.b * self.b;
        Point2D::new(
            (self.b * self.e - 2.0 * self.c * self.d) / det,
            (self.b * self.d - 2.0 * self.a * self.e) / det,
        )
    }

    /// Returns the direction of the major axis, in `(-π/2, π/2]` radians.
    pub fn rotation_angle(&self) -> f64 {
        let mut theta = 0.5 * self.b.atan2(self.a - self.c);
        // atan2 yields the direction of the larger quadratic-form
        // eigenvalue, which is the minor axis; report the major one.
        let (s, c) = theta.sin_cos();
        let along = self.a * c * c + self.b * s * c + self.c * s * s;
        let perpendicular = self.a * s * s - self.b * s * c + self.c * c * c;
        if along > perpendicular {
            theta += std::f64::consts::FRAC_PI_2;
            if theta > std::f64::consts::FRAC_PI_2 {
                theta -= std::f64::consts::PI;
            }
        }
        theta
    }

    /// Returns the semi-axes `(sa, sb)` along the rotated x/y directions of
    /// [`rotation_angle`](Self::rotation_angle).
    pub fn semi_axis(&self) -> (f64, f64) {
        let det2 = self.a * self.c - self.b * self.b / 4.0;
        let det3 = self.a * (self.c * self.f - self.e * self.e / 4.0)
            - (self.b / 2.0) * (self.b / 2.0 * self.f - self.e / 2.0 * self.d / 2.0)
            + (self.d / 2.0) * (self.b / 2.0 * self.e / 2.0 - self.c * self.d / 2.0);
        let theta = self.rotation_angle();
        let (s, c) = theta.sin_cos();
        let lambda1 = self.a * c * c + self.b * s * c + self.c * s * s;
        let lambda2 = self.a * s * s - self.b * s * c + self.c * c * c;
        let sa = (-det3 / (det2 * lambda1)).max(0.0).sqrt();
        let sb = (-det3 / (det2 * lambda2)).max(0.0).sqrt();
        (sa, sb)
    }

    /// Rotates the ellipse by `alpha` radians around the origin.
    pub fn rotate(&self, alpha: f64) -> Self {
        let (s, c) = alpha.sin_cos();
        Self {
            a: self.a * c * c - self.b * s * c + self.c * s * s,
            b: 2.0 * s * c * (self.a - self.c) + self.b * (c * c - s * s),
            c: self.a * s * s + self.b * s * c + self.c * c * c,
            d: self.d * c - self.e * s,
            e: self.d * s + self.e * c,
            f: self.f,
        }
    }

    /// Rotates the ellipse by `alpha` radians around `(cx, cy)`.
    pub fn rotate_around(&self, alpha: f64, cx: f64, cy: f64) -> Self {
        self.translate(-cx, -cy).rotate(alpha).translate(cx, cy)
    }

    /// Translates the ellipse by `(dx, dy)`.
    pub fn translate(&self, dx: f64, dy: f64) -> Self {
        Self {
            a: self.a,
            b: self.b,
            c: self.c,
            d: self.d - 2.0 * self.a * dx - self.b * dy,
            e: self.e - self.b * dx - 2.0 * self.c * dy,
            f: self.f + self.a * dx * dx + self.b * dx * dy + self.c * dy * dy
                - self.d * dx
                - self.e * dy,
        }
    }

    /// Mirrors the ellipse across the vertical axis of a width-`w` image.
    pub fn hflip(&self, width: usize) -> Self {
        let s = width as f64 - 1.0;
        Self {
            a: self.a,
            b: -self.b,
            c: self.c,
            d: -(2.0 * self.a * s + self.d),
            e: self.e + self.b * s,
            f: self.f + self.a * s * s + self.d * s,
        }
    }

    /// Mirrors the ellipse across the horizontal axis of a height-`h` image.
    pub fn vflip(&self, height: usize) -> Self {
        let t = height as f64 - 1.0;
        Self {
            a: self.a,
            b: -self.b,
            c: self.c,
            d: self.d + self.b * t,
            e: -(2.0 * self.c * t + self.e),
            f: self.f + self.c * t * t + self.e * t,
        }
    }

    /// Returns the four axis endpoints (vertices) of the ellipse.
    pub fn find_vertices(&self) -> [Point2D; 4] {
        let center = self.center();
        let (sa, sb) = self.semi_axis();
        let (s, c) = self.rotation_angle().sin_cos();
        [
            Point2D::new(center.x + sa * c, center.y + sa * s),
            Point2D::new(center.x - sa * c, center.y - sa * s),
            Point2D::new(center.x - sb * s, center.y + sb * c),
            Point2D::new(center.x + sb * s, center.y - sb * c),
        ]
    }

    /// Returns the coefficients of this ellipse rotated by `alpha` radians
    /// around its own center.
    pub fn to_cartesian(&self, alpha: f64) -> [f64; 6] {
        let center = self.center();
        self.rotate_around(alpha, center.x, center.y).coefficients()
    }
}
