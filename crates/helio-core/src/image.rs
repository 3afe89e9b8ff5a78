//! Float image containers.
//!
//! This module provides the two pixel-bearing entity kinds of the pipeline:
//! - [`MonoImage`] - a single plane of `f32` samples
//! - [`RgbImage`] - three parallel planes sharing one shape
//!
//! plus the [`Image`] sum over both, which is what transforms consume and
//! produce.
//!
//! # Memory Layout
//!
//! Planes are stored in **row-major** order, top-to-bottom, one `f32` per
//! sample; a pixel `(x, y)` lives at index `y * width + x`. The nominal
//! value domain is `[0, 65535]`: operations may leave it temporarily, and
//! writers clip back to it with [`clip_to_pixel_range`].
//!
//! # Metadata
//!
//! Every image carries a [`MetadataBag`]. Transforms never mutate a source
//! image; they build a new image with a new bag ([`copy`](MonoImage::copy)
//! deep-copies both).

use crate::error::{Error, Result};
use crate::metadata::MetadataBag;

/// Upper bound of the nominal pixel value domain.
pub const PIXEL_MAX: f32 = 65535.0;

/// Rec.601 luma weight of the red plane.
const LUMA_R: f32 = 0.299;
/// Rec.601 luma weight of the green plane.
const LUMA_G: f32 = 0.587;
/// Rec.601 luma weight of the blue plane.
const LUMA_B: f32 = 0.114;

/// Clips a sample to the nominal `[0, 65535]` domain.
#[inline]
pub fn clip_to_pixel_range(v: f32) -> f32 {
    v.clamp(0.0, PIXEL_MAX)
}

/// A single-plane float image.
///
/// # Example
///
/// ```rust
/// use helio_core::MonoImage;
///
/// let mut img = MonoImage::new(16, 8);
/// img.set_pixel(3, 2, 42.0);
/// assert_eq!(img.pixel(3, 2), 42.0);
/// assert_eq!(img.dimensions(), (16, 8));
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct MonoImage {
    width: usize,
    height: usize,
    data: Vec<f32>,
    metadata: MetadataBag,
}

impl MonoImage {
    /// Creates a zero-filled image with an empty metadata bag.
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            width,
            height,
            data: vec![0.0; width * height],
            metadata: MetadataBag::new(),
        }
    }

    /// Creates an image from existing samples.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ShapeMismatch`] when `data.len() != width * height`.
    pub fn from_data(
        width: usize,
        height: usize,
        data: Vec<f32>,
        metadata: MetadataBag,
    ) -> Result<Self> {
        if data.len() != width * height {
            return Err(Error::shape_mismatch(
                (width, height),
                (data.len(), 1),
            ));
        }
        Ok(Self {
            width,
            height,
            data,
            metadata,
        })
    }

    /// Image width in pixels.
    #[inline]
    pub fn width(&self) -> usize {
        self.width
    }

    /// Image height in pixels.
    #[inline]
    pub fn height(&self) -> usize {
        self.height
    }

    /// Dimensions as `(width, height)`.
    #[inline]
    pub fn dimensions(&self) -> (usize, usize) {
        (self.width, self.height)
    }

    /// Borrows the sample plane.
    #[inline]
    pub fn data(&self) -> &[f32] {
        &self.data
    }

    /// Mutably borrows the sample plane.
    #[inline]
    pub fn data_mut(&mut self) -> &mut [f32] {
        &mut self.data
    }

    /// Borrows row `y`.
    #[inline]
    pub fn row(&self, y: usize) -> &[f32] {
        &self.data[y * self.width..(y + 1) * self.width]
    }

    /// Returns the sample at `(x, y)`.
    ///
    /// # Panics
    ///
    /// Panics when the coordinates are out of bounds.
    #[inline]
    pub fn pixel(&self, x: usize, y: usize) -> f32 {
        debug_assert!(x < self.width && y < self.height);
        self.data[y * self.width + x]
    }

    /// Writes the sample at `(x, y)`.
    #[inline]
    pub fn set_pixel(&mut self, x: usize, y: usize, v: f32) {
        debug_assert!(x < self.width && y < self.height);
        self.data[y * self.width + x] = v;
    }

    /// Borrows the metadata bag.
    #[inline]
    pub fn metadata(&self) -> &MetadataBag {
        &self.metadata
    }

    /// Mutably borrows the metadata bag.
    #[inline]
    pub fn metadata_mut(&mut self) -> &mut MetadataBag {
        &mut self.metadata
    }

    /// Returns a copy with the metadata bag replaced.
    pub fn with_metadata(mut self, metadata: MetadataBag) -> Self {
        self.metadata = metadata;
        self
    }

    /// Deep-copies the plane and clones the metadata bag.
    pub fn copy(&self) -> Self {
        self.clone()
    }

    /// Clips every sample to the nominal `[0, 65535]` domain in place.
    pub fn clip_in_place(&mut self) {
        for v in &mut self.data {
            *v = clip_to_pixel_range(*v);
        }
    }

    /// Expands to an RGB image with three identical planes.
    pub fn to_rgb(&self) -> RgbImage {
        RgbImage {
            width: self.width,
            height: self.height,
            r: self.data.clone(),
            g: self.data.clone(),
            b: self.data.clone(),
            metadata: self.metadata.clone(),
        }
    }
}

/// A three-plane float image with parallel `r`, `g`, `b` planes.
#[derive(Debug, Clone, PartialEq)]
pub struct RgbImage {
    width: usize,
    height: usize,
    r: Vec<f32>,
    g: Vec<f32>,
    b: Vec<f32>,
    metadata: MetadataBag,
}

impl RgbImage {
    /// Creates a zero-filled image with an empty metadata bag.
    pub fn new(width: usize, height: usize) -> Self {
        let plane = vec![0.0; width * height];
        Self {
            width,
            height,
            r: plane.clone(),
            g: plane.clone(),
            b: plane,
            metadata: MetadataBag::new(),
        }
    }

    /// Creates an image from three existing planes.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ShapeMismatch`] when any plane length differs from
    /// `width * height`.
    pub fn from_planes(
        width: usize,
        height: usize,
        r: Vec<f32>,
        g: Vec<f32>,
        b: Vec<f32>,
        metadata: MetadataBag,
    ) -> Result<Self> {
        let expected = width * height;
        for plane in [&r, &g, &b] {
            if plane.len() != expected {
                return Err(Error::shape_mismatch((width, height), (plane.len(), 1)));
            }
        }
        Ok(Self {
            width,
            height,
            r,
            g,
            b,
            metadata,
        })
    }

    /// Image width in pixels.
    #[inline]
    pub fn width(&self) -> usize {
        self.width
    }

    /// Image height in pixels.
    #[inline]
    pub fn height(&self) -> usize {
        self.height
    }

    /// Dimensions as `(width, height)`.
    #[inline]
    pub fn dimensions(&self) -> (usize, usize) {
        (self.width, self.height)
    }

    /// Borrows the three planes as `[r, g, b]`.
    #[inline]
    pub fn planes(&self) -> [&[f32]; 3] {
        [&self.r, &self.g, &self.b]
    }

    /// Mutably borrows the three planes as `[r, g, b]`.
    #[inline]
    pub fn planes_mut(&mut self) -> [&mut Vec<f32>; 3] {
        [&mut self.r, &mut self.g, &mut self.b]
    }

    /// Borrows the metadata bag.
    #[inline]
    pub fn metadata(&self) -> &MetadataBag {
        &self.metadata
    }

    /// Mutably borrows the metadata bag.
    #[inline]
    pub fn metadata_mut(&mut self) -> &mut MetadataBag {
        &mut self.metadata
    }

    /// Returns a copy with the metadata bag replaced.
    pub fn with_metadata(mut self, metadata: MetadataBag) -> Self {
        self.metadata = metadata;
        self
    }

    /// Deep-copies the planes and clones the metadata bag.
    pub fn copy(&self) -> Self {
        self.clone()
    }

    /// Collapses to a mono image with Rec.601 luma weights.
    pub fn luminance(&self) -> MonoImage {
        let data = self
            .r
            .iter()
            .zip(&self.g)
            .zip(&self.b)
            .map(|((r, g), b)| LUMA_R * r + LUMA_G * g + LUMA_B * b)
            .collect();
        MonoImage {
            width: self.width,
            height: self.height,
            data,
            metadata: self.metadata.clone(),
        }
    }
}

/// An image of either kind; the unit transforms consume and produce.
#[derive(Debug, Clone, PartialEq)]
pub enum Image {
    /// Single-plane image.
    Mono(MonoImage),
    /// Three-plane image.
    Rgb(RgbImage),
}

impl Image {
    /// Image width in pixels.
    pub fn width(&self) -> usize {
        match self {
            Image::Mono(img) => img.width(),
            Image::Rgb(img) => img.width(),
        }
    }

    /// Image height in pixels.
    pub fn height(&self) -> usize {
        match self {
            Image::Mono(img) => img.height(),
            Image::Rgb(img) => img.height(),
        }
    }

    /// Dimensions as `(width, height)`.
    pub fn dimensions(&self) -> (usize, usize) {
        (self.width(), self.height())
    }

    /// Borrows the metadata bag.
    pub fn metadata(&self) -> &MetadataBag {
        match self {
            Image::Mono(img) => img.metadata(),
            Image::Rgb(img) => img.metadata(),
        }
    }

    /// Mutably borrows the metadata bag.
    pub fn metadata_mut(&mut self) -> &mut MetadataBag {
        match self {
            Image::Mono(img) => img.metadata_mut(),
            Image::Rgb(img) => img.metadata_mut(),
        }
    }

    /// Deep-copies planes and metadata.
    pub fn copy(&self) -> Self {
        self.clone()
    }

    /// Short name of the image kind, for messages.
    pub fn kind_name(&self) -> &'static str {
        match self {
            Image::Mono(_) => "mono",
            Image::Rgb(_) => "rgb",
        }
    }

    /// Converts to mono, collapsing RGB with luma weights.
    pub fn to_mono(&self) -> MonoImage {
        match self {
            Image::Mono(img) => img.clone(),
            Image::Rgb(img) => img.luminance(),
        }
    }

    /// Converts to RGB, replicating a mono plane.
    pub fn to_rgb(&self) -> RgbImage {
        match self {
            Image::Mono(img) => img.to_rgb(),
            Image::Rgb(img) => img.clone(),
        }
    }
}

impl From<MonoImage> for Image {
    fn from(img: MonoImage) -> Self {
        Image::Mono(img)
    }
}

impl From<RgbImage> for Image {
    fn from(img: RgbImage) -> Self {
        Image::Rgb(img)
    }
}

/// Checks that a batch of images all share one shape.
///
/// Inputs to stacking and weighted-average operations must agree on
/// `(width, height)`; the first image sets the expectation.
///
/// # Errors
///
/// Returns [`Error::ShapeMismatch`] naming the first offender, or
/// [`Error::InvalidParameter`] for an empty batch.
pub fn check_same_shape<'a>(images: impl IntoIterator<Item = &'a Image>) -> Result<(usize, usize)> {
    let mut iter = images.into_iter();
    let first = iter
        .next()
        .ok_or_else(|| Error::invalid_parameter("empty image batch"))?;
    let expected = first.dimensions();
    for img in iter {
        if img.dimensions() != expected {
            return Err(Error::shape_mismatch(expected, img.dimensions()));
        }
    }
    Ok(expected)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::MetadataValue;

    #[test]
    fn test_from_data_validates_shape() {
        assert!(MonoImage::from_data(4, 4, vec![0.0; 16], MetadataBag::new()).is_ok());
        assert!(MonoImage::from_data(4, 4, vec![0.0; 15], MetadataBag::new()).is_err());
    }

    #[test]
    fn test_row_indexing() {
        let mut img = MonoImage::new(3, 2);
        img.set_pixel(2, 1, 7.0);
        assert_eq!(img.row(1), &[0.0, 0.0, 7.0]);
    }

    #[test]
    fn test_copy_is_deep() {
        let mut img = MonoImage::new(2, 2);
        img.metadata_mut().insert(MetadataValue::PixelShift(1.0));
        let copy = img.copy();
        img.set_pixel(0, 0, 9.0);
        img.metadata_mut().insert(MetadataValue::PixelShift(2.0));
        assert_eq!(copy.pixel(0, 0), 0.0);
        assert_eq!(copy.metadata().pixel_shift(), Some(1.0));
    }

    #[test]
    fn test_mono_rgb_roundtrip() {
        let mut img = MonoImage::new(4, 3);
        for (i, v) in img.data_mut().iter_mut().enumerate() {
            *v = i as f32 * 100.0;
        }
        let back = Image::Rgb(img.to_rgb()).to_mono();
        for (a, b) in img.data().iter().zip(back.data()) {
            // 0.299 + 0.587 + 0.114 == 1.0 exactly in f32 is not guaranteed,
            // so allow one ULP-scale wobble.
            assert!((a - b).abs() <= a.abs() * 1e-6 + 1e-6);
        }
    }

    #[test]
    fn test_luminance_weights() {
        let rgb = RgbImage::from_planes(
            1,
            1,
            vec![100.0],
            vec![200.0],
            vec![300.0],
            MetadataBag::new(),
        )
        .unwrap();
        let mono = rgb.luminance();
        let expected = 0.299 * 100.0 + 0.587 * 200.0 + 0.114 * 300.0;
        assert!((mono.pixel(0, 0) - expected).abs() < 1e-3);
    }

    #[test]
    fn test_clip_in_place() {
        let mut img =
            MonoImage::from_data(2, 1, vec![-5.0, 70000.0], MetadataBag::new()).unwrap();
        img.clip_in_place();
        assert_eq!(img.data(), &[0.0, PIXEL_MAX]);
    }

    #[test]
    fn test_check_same_shape() {
        let a = Image::Mono(MonoImage::new(4, 4));
        let b = Image::Mono(MonoImage::new(4, 4));
        let c = Image::Mono(MonoImage::new(4, 5));
        assert_eq!(check_same_shape([&a, &b]).unwrap(), (4, 4));
        assert!(check_same_shape([&a, &c]).is_err());
        assert!(check_same_shape(std::iter::empty::<&Image>()).is_err());
    }
}
