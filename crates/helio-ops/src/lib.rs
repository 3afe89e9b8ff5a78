//! # helio-ops
//!
//! The transform catalog of the solar imaging pipeline.
//!
//! Every operation here consumes an [`Image`](helio_core::Image) and
//! returns a **new** image whose metadata bag has been updated in lock-step
//! with the pixels: the disk ellipse is rotated/translated/mirrored exactly
//! as the plane is, detected feature points are mapped through the same
//! affine, and the two append-only logs (`ReferenceCoords`,
//! `TransformationHistory`) grow by one entry per transform.
//!
//! # Modules
//!
//! - [`rotate`] - Arbitrary-angle rotation (Lanczos-3) and quarter turns
//! - [`flip`] - Horizontal / vertical mirrors
//! - [`fill`] - Ellipse-masked fill with sub-pixel coverage
//! - [`thumbnail`] - Nearest-neighbor preview downscale
//! - [`stretch`] - Gamma, linear and MTF autostretch operators
//! - [`stats`] - Per-image and masked statistics, histograms
//! - [`stack`] - Frame averaging and median stacking
//! - [`sampling`] - Interest-point tile selection
//!
//! # Example
//!
//! ```rust
//! use helio_core::{Image, MonoImage};
//! use helio_ops::rotate::{rotate, RotateOptions};
//!
//! let img = Image::Mono(MonoImage::new(32, 32));
//! let turned = rotate(&img, std::f64::consts::FRAC_PI_4, RotateOptions {
//!     resize: true,
//!     blackpoint: 0.0,
//! }).unwrap();
//! assert!(turned.width() > 32);
//! ```

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]

mod affine;
mod error;
pub mod fill;
pub mod flip;
pub mod rotate;
pub mod sampling;
pub mod stack;
pub mod stats;
pub mod stretch;
pub mod thumbnail;

pub use error::{OpsError, OpsResult};
