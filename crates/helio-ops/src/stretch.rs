//! Tone-stretching operators.
//!
//! Three operators share the convention that parameters and pixels live in
//! the nominal `[0, 65535]` domain:
//!
//! - [`gamma_stretch`] - normalize by the per-image maximum, raise to γ
//! - [`linear_stretch`] - affine remap of the observed range
//! - [`autostretch`] - SIRIL-style MTF autostretch driven by the median and
//!   the MAD
//!
//! The rational midtone transfer function is exposed as [`mtf`] for
//! callers that precompute their own parameters.

use helio_core::{Image, MonoImage, RgbImage, PIXEL_MAX};
use rayon::prelude::*;

use crate::error::{OpsError, OpsResult};

/// Default shadow-clip factor of the autostretch, in MAD units.
pub const DEFAULT_SHADOWS_CLIP: f64 = -2.8;

/// Default target background of the autostretch.
pub const DEFAULT_TARGET_BACKGROUND: f64 = 0.25;

/// MAD-to-sigma factor for normally distributed data.
const MAD_SIGMA: f64 = 1.4826;

/// Rational midtone transfer function.
///
/// `x` is remapped to `xp = (x - lo) / (hi - lo)` and saturated at the
/// endpoints; the curve is `(m - 1)·xp / ((2m - 1)·xp - m)`.
///
/// With `m = 0.5` the curve is the identity on `[lo, hi]`.
pub fn mtf(x: f64, midtones: f64, lo: f64, hi: f64) -> f64 {
    let xp = (x - lo) / (hi - lo);
    if xp <= 0.0 {
        return 0.0;
    }
    if xp >= 1.0 {
        return 1.0;
    }
    (midtones - 1.0) * xp / ((2.0 * midtones - 1.0) * xp - midtones)
}

/// Gamma stretch: `v ← (v / max)^γ · 65535` with the per-image maximum
/// floored at `1e-7`.
///
/// # Errors
///
/// Returns [`OpsError::InvalidParameter`] for a non-positive gamma.
pub fn gamma_stretch(image: &Image, gamma: f64) -> OpsResult<Image> {
    if !(gamma > 0.0) {
        return Err(OpsError::InvalidParameter(format!(
            "gamma must be positive, got {gamma}"
        )));
    }
    let max = f64::from(image_max(image)).max(1e-7);
    Ok(map_planes(image, |v| {
        ((f64::from(v.max(0.0)) / max).powf(gamma) * f64::from(PIXEL_MAX)) as f32
    }))
}

/// Linear stretch: remaps the observed `[min, max]` onto `[lo, hi]`,
/// clipping to the nominal domain.
pub fn linear_stretch(image: &Image, lo: f32, hi: f32) -> OpsResult<Image> {
    if !(hi > lo) {
        return Err(OpsError::InvalidParameter(format!(
            "empty stretch range: [{lo}, {hi}]"
        )));
    }
    let (min, max) = image_range(image);
    let span = max - min;
    if span <= 0.0 {
        return Ok(image.copy());
    }
    let scale = (hi - lo) / span;
    Ok(map_planes(image, |v| {
        (lo + (v - min) * scale).clamp(0.0, PIXEL_MAX)
    }))
}

/// Applies a three-parameter MTF with `shadows`/`highlights` expressed in
/// the pixel domain `[0, 65535]`.
///
/// With `shadows = 0`, `highlights = 65535` and `midtones = 0.5` this is
/// the identity up to float rounding.
pub fn apply_mtf(image: &Image, shadows: f64, midtones: f64, highlights: f64) -> OpsResult<Image> {
    if !(highlights > shadows) {
        return Err(OpsError::InvalidParameter(format!(
            "empty MTF range: [{shadows}, {highlights}]"
        )));
    }
    Ok(map_planes(image, |v| {
        (mtf(f64::from(v), midtones, shadows, highlights) * f64::from(PIXEL_MAX)) as f32
    }))
}

/// SIRIL-style MTF autostretch.
///
/// The stretch parameters are derived from the image itself:
///
/// 1. median `m` and MAD of the flattened samples, normalized to `[0, 1]`
///    (`mad' = 1.4826·mad`, floored at a small epsilon);
/// 2. shadow clip `c0 = max(0, m' + shadows_clip · mad')`;
/// 3. midtones from `mtf(m' - c0, target_background, 0, 1)`;
/// 4. the shadow point is quantized on the 8-bit scale
///    (`clip(c0·65535/256, 0, 255)`), then rescaled to the pixel domain
///    with the highlight point pinned at 65535.
pub fn autostretch(image: &Image, target_background: f64, shadows_clip: f64) -> OpsResult<Image> {
    if !(0.0..1.0).contains(&target_background) {
        return Err(OpsError::InvalidParameter(format!(
            "target background out of [0, 1): {target_background}"
        )));
    }

    let mut samples: Vec<f32> = match image {
        Image::Mono(img) => img.data().to_vec(),
        Image::Rgb(img) => {
            let [r, g, b] = img.planes();
            r.iter().chain(g).chain(b).copied().collect()
        }
    };
    if samples.is_empty() {
        return Ok(image.copy());
    }

    let median = sorted_median(&mut samples);
    let mut deviations: Vec<f32> = samples.iter().map(|&v| (v - median).abs()).collect();
    let mad = sorted_median(&mut deviations);

    let m_norm = f64::from(median) / f64::from(PIXEL_MAX);
    let mut mad_norm = MAD_SIGMA * f64::from(mad) / f64::from(PIXEL_MAX);
    if mad_norm == 0.0 {
        mad_norm = 1e-6;
    }

    let c0 = (m_norm + shadows_clip * mad_norm).max(0.0);
    let midtones = mtf(m_norm - c0, target_background, 0.0, 1.0);

    let shadows_8bit = (c0 * f64::from(PIXEL_MAX) / 256.0).clamp(0.0, 255.0);
    let shadows = shadows_8bit * f64::from(PIXEL_MAX) / 255.0;

    apply_mtf(image, shadows, midtones, f64::from(PIXEL_MAX))
}

/// Applies `f` to every sample of every plane in parallel.
fn map_planes(image: &Image, f: impl Fn(f32) -> f32 + Sync) -> Image {
    let (w, h) = image.dimensions();
    let apply = |src: &[f32]| -> Vec<f32> {
        let mut dst = vec![0.0f32; src.len()];
        dst.par_iter_mut().zip(src.par_iter()).for_each(|(d, &s)| {
            *d = f(s);
        });
        dst
    };
    match image {
        Image::Mono(img) => Image::Mono(
            MonoImage::from_data(w, h, apply(img.data()), img.metadata().clone())
                .expect("stretch preserves shape"),
        ),
        Image::Rgb(img) => {
            let [r, g, b] = img.planes();
            Image::Rgb(
                RgbImage::from_planes(
                    w,
                    h,
                    apply(r),
                    apply(g),
                    apply(b),
                    img.metadata().clone(),
                )
                .expect("stretch preserves shape"),
            )
        }
    }
}

fn image_max(image: &Image) -> f32 {
    match image {
        Image::Mono(img) => plane_max(img.data()),
        Image::Rgb(img) => img.planes().into_iter().map(plane_max).fold(0.0, f32::max),
    }
}

fn image_range(image: &Image) -> (f32, f32) {
    let fold = |acc: (f32, f32), v: f32| (acc.0.min(v), acc.1.max(v));
    match image {
        Image::Mono(img) => img
            .data()
            .iter()
            .copied()
            .fold((f32::INFINITY, f32::NEG_INFINITY), fold),
        Image::Rgb(img) => {
            let [r, g, b] = img.planes();
            r.iter()
                .chain(g)
                .chain(b)
                .copied()
                .fold((f32::INFINITY, f32::NEG_INFINITY), fold)
        }
    }
}

fn plane_max(data: &[f32]) -> f32 {
    data.iter().copied().fold(0.0, f32::max)
}

/// Median by sorting in place; even-length inputs average the middle pair.
fn sorted_median(data: &mut [f32]) -> f32 {
    data.sort_by(f32::total_cmp);
    let n = data.len();
    if n == 0 {
        return 0.0;
    }
    if n % 2 == 1 {
        data[n / 2]
    } else {
        (data[n / 2 - 1] + data[n / 2]) / 2.0
    }
}
