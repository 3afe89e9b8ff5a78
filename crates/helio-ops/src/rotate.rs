//! Arbitrary-angle rotation and quarter turns.
//!
//! Resampling is Lanczos-3 through the pull mapping: every destination
//! pixel is mapped back into the source frame and sampled there. The
//! forward affine (applied to metadata coordinates) is
//!
//! ```text
//! x' = (x - cx)·cos α - (y - cy)·sin α + cx + sx
//! y' = (x - cx)·sin α + (y - cy)·cos α + cy + sy
//! ```
//!
//! where `(cx, cy)` is the source pixel-grid center `((w-1)/2, (h-1)/2)`
//! and `(sx, sy)` centers the rotated canvas in the resized output (zero
//! without `resize`).

use helio_core::{CoordOp, Image, MonoImage, Point2D, RgbImage};
use helio_math::interp::lanczos_2d;
use rayon::prelude::*;

use crate::affine::updated_bag;
use crate::error::{OpsError, OpsResult};
use crate::stats;

/// Options for [`rotate`].
#[derive(Debug, Clone, Copy)]
pub struct RotateOptions {
    /// Grow the output canvas to the rotated bounding box.
    pub resize: bool,
    /// Fill value for destination pixels with no source coverage.
    pub blackpoint: f32,
}

impl Default for RotateOptions {
    fn default() -> Self {
        Self {
            resize: false,
            blackpoint: 0.0,
        }
    }
}

/// Rotates an image by `angle` radians.
///
/// Returns a new image; the metadata bag is updated in lock-step (ellipse
/// rotated and recentered, feature points mapped, a rotation op appended to
/// the geometric log).
///
/// # Errors
///
/// Returns [`OpsError::InvalidParameter`] for a non-finite angle.
pub fn rotate(image: &Image, angle: f64, options: RotateOptions) -> OpsResult<Image> {
    if !angle.is_finite() {
        return Err(OpsError::InvalidParameter(format!(
            "rotation angle must be finite, got {angle}"
        )));
    }

    let (w, h) = image.dimensions();
    let (out_w, out_h) = if options.resize {
        rotated_canvas(w, h, angle)
    } else {
        (w, h)
    };

    let cx = (w as f64 - 1.0) / 2.0;
    let cy = (h as f64 - 1.0) / 2.0;
    let sx = (out_w as f64 - w as f64) / 2.0;
    let sy = (out_h as f64 - h as f64) / 2.0;
    let (sin_a, cos_a) = angle.sin_cos();

    let map_point = move |p: Point2D| {
        Point2D::new(
            (p.x - cx) * cos_a - (p.y - cy) * sin_a + cx + sx,
            (p.x - cx) * sin_a + (p.y - cy) * cos_a + cy + sy,
        )
    };
    let metadata = updated_bag(
        image.metadata(),
        map_point,
        |e| e.rotate_around(angle, cx, cy).translate(sx, sy),
        CoordOp::Rotate { angle },
        &format!("Rotation ({:.2}°)", angle.to_degrees()),
    );

    let rotate_plane = |src: &[f32]| -> Vec<f32> {
        let mut dst = vec![0.0f32; out_w * out_h];
        dst.par_chunks_mut(out_w).enumerate().for_each(|(y, row)| {
            for (x, out) in row.iter_mut().enumerate() {
                // Pull mapping: inverse of the forward affine above.
                let vx = x as f64 - cx - sx;
                let vy = y as f64 - cy - sy;
                let xs = vx * cos_a + vy * sin_a + cx;
                let ys = -vx * sin_a + vy * cos_a + cy;
                *out = if xs >= 0.0
                    && xs <= (w - 1) as f64
                    && ys >= 0.0
                    && ys <= (h - 1) as f64
                {
                    lanczos_2d(src, w, h, xs, ys)
                } else {
                    options.blackpoint
                };
            }
        });
        dst
    };

    let rotated = match image {
        Image::Mono(img) => Image::Mono(
            MonoImage::from_data(out_w, out_h, rotate_plane(img.data()), metadata)
                .map_err(OpsError::Core)?,
        ),
        Image::Rgb(img) => {
            let [r, g, b] = img.planes();
            Image::Rgb(
                RgbImage::from_planes(
                    out_w,
                    out_h,
                    rotate_plane(r),
                    rotate_plane(g),
                    rotate_plane(b),
                    metadata,
                )
                .map_err(OpsError::Core)?,
            )
        }
    };
    Ok(rotated)
}

/// Quarter turn counterclockwise, with the histogram background as fill.
pub fn rotate_left(image: &Image) -> OpsResult<Image> {
    rotate(
        image,
        -std::f64::consts::FRAC_PI_2,
        RotateOptions {
            resize: false,
            blackpoint: image_blackpoint(image),
        },
    )
}

/// Quarter turn clockwise, with the histogram background as fill.
pub fn rotate_right(image: &Image) -> OpsResult<Image> {
    rotate(
        image,
        std::f64::consts::FRAC_PI_2,
        RotateOptions {
            resize: false,
            blackpoint: image_blackpoint(image),
        },
    )
}

fn image_blackpoint(image: &Image) -> f32 {
    stats::background(&image.to_mono())
}

/// Bounding-box extent of a `w x h` canvas rotated by `angle`.
fn rotated_canvas(w: usize, h: usize, angle: f64) -> (usize, usize) {
    let (sin_a, cos_a) = angle.sin_cos();
    let bw = w as f64 * cos_a.abs() + h as f64 * sin_a.abs();
    let bh = w as f64 * sin_a.abs() + h as f64 * cos_a.abs();
    (snap_extent(bw), snap_extent(bh))
}

/// Rounds an extent that is within numerical noise of an integer, so exact
/// quarter turns do not grow the canvas by one.
fn snap_extent(v: f64) -> usize {
    let nearest = v.round();
    if (v - nearest).abs() < 1e-9 {
        nearest as usize
    } else {
        v.ceil() as usize
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use helio_core::{Ellipse, MetadataValue};

    fn impulse_image(size: usize) -> Image {
        let mut img = MonoImage::new(size, size);
        img.set_pixel(size / 2, size / 2, 65535.0);
        Image::Mono(img)
    }

    #[test]
    fn test_quarter_turn_keeps_center_impulse() {
        let img = impulse_image(5);
        let out = rotate(&img, std::f64::consts::FRAC_PI_2, RotateOptions::default()).unwrap();
        let Image::Mono(out) = out else { panic!() };
        assert_eq!(out.dimensions(), (5, 5));
        assert!((out.pixel(2, 2) - 65535.0).abs() < 1.0);
        for (x, y) in [(0, 0), (4, 0), (0, 4), (4, 4)] {
            assert!(out.pixel(x, y).abs() < 1.0);
        }
    }

    #[test]
    fn test_quarter_turn_moves_off_center_pixel() {
        let mut img = MonoImage::new(5, 5);
        img.set_pixel(4, 2, 1000.0);
        let out = rotate(
            &Image::Mono(img),
            std::f64::consts::FRAC_PI_2,
            RotateOptions::default(),
        )
        .unwrap();
        let Image::Mono(out) = out else { panic!() };
        // Clockwise: rightmost column pixel lands on the bottom row.
        assert!((out.pixel(2, 4) - 1000.0).abs() < 1.0);
    }

    #[test]
    fn test_resize_grows_canvas() {
        let img = Image::Mono(MonoImage::new(10, 4));
        let out = rotate(
            &img,
            std::f64::consts::FRAC_PI_2,
            RotateOptions {
                resize: true,
                blackpoint: 0.0,
            },
        )
        .unwrap();
        assert_eq!(out.dimensions(), (4, 10));

        let out45 = rotate(
            &img,
            std::f64::consts::FRAC_PI_4,
            RotateOptions {
                resize: true,
                blackpoint: 0.0,
            },
        )
        .unwrap();
        assert_eq!(out45.dimensions(), (10, 10));
    }

    #[test]
    fn test_metadata_follows_rotation() {
        let mut img = MonoImage::new(11, 11);
        img.metadata_mut()
            .insert(MetadataValue::Ellipse(Ellipse::circle(8.0, 5.0, 2.0)));
        img.metadata_mut()
            .insert(MetadataValue::ActiveRegions(vec![Point2D::new(8.0, 5.0)]));

        let out = rotate(
            &Image::Mono(img),
            std::f64::consts::FRAC_PI_2,
            RotateOptions::default(),
        )
        .unwrap();

        // Forward map of (8, 5) around center (5, 5) by +90°: (5, 8).
        let p = out.metadata().active_regions().unwrap()[0];
        assert!((p.x - 5.0).abs() < 1e-9 && (p.y - 8.0).abs() < 1e-9);
        let c = out.metadata().ellipse().unwrap().center();
        assert!((c.x - 5.0).abs() < 1e-9 && (c.y - 8.0).abs() < 1e-9);

        match out.metadata().reference_coords().unwrap() {
            [CoordOp::Rotate { angle }] => {
                assert!((angle - std::f64::consts::FRAC_PI_2).abs() < 1e-12);
            }
            other => panic!("unexpected log: {other:?}"),
        }
        assert_eq!(out.metadata().transformation_history().unwrap().len(), 1);
    }

    #[test]
    fn test_blackpoint_fills_uncovered_corners() {
        let img = Image::Mono(MonoImage::new(8, 8));
        let out = rotate(
            &img,
            0.4,
            RotateOptions {
                resize: true,
                blackpoint: 123.0,
            },
        )
        .unwrap();
        let Image::Mono(out) = out else { panic!() };
        assert_eq!(out.pixel(0, 0), 123.0);
    }

    #[test]
    fn test_non_finite_angle_rejected() {
        let img = Image::Mono(MonoImage::new(4, 4));
        assert!(rotate(&img, f64::NAN, RotateOptions::default()).is_err());
    }

    #[test]
    fn test_rotation_roundtrip_interior() {
        let mut img = MonoImage::new(17, 17);
        for y in 0..17 {
            for x in 0..17 {
                let v = 2000.0
                    + 1500.0 * (x as f32 * 0.4).sin() * (y as f32 * 0.3).cos();
                img.set_pixel(x, y, v);
            }
        }
        let img = Image::Mono(img);
        let opts = RotateOptions {
            resize: true,
            blackpoint: 0.0,
        };
        let once = rotate(&img, 0.35, opts).unwrap();
        let back = rotate(&once, -0.35, opts).unwrap();
        let Image::Mono(back) = back else { panic!() };
        let Image::Mono(orig) = img else { panic!() };

        // Compare the central region, away from the antialiased border.
        let ox = (back.width() - orig.width()) / 2;
        let oy = (back.height() - orig.height()) / 2;
        for y in 5..12 {
            for x in 5..12 {
                let a = orig.pixel(x, y);
                let b = back.pixel(x + ox, y + oy);
                assert!(
                    (a - b).abs() < 40.0,
                    "({x},{y}): {a} vs {b}"
                );
            }
        }
    }
}
