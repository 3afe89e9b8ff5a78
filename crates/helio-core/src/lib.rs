//! # helio-core
//!
//! Core types for the solar imaging pipeline kernel.
//!
//! This crate provides the foundational types used throughout the HELIO-RS
//! workspace:
//!
//! - [`MonoImage`], [`RgbImage`], [`Image`] - Float image containers
//! - [`MetadataBag`] - Typed metadata carried in lock-step with pixels
//! - [`Ellipse`] - Solar-disk conic with the transform catalog
//! - [`Angle`], [`Wavelength`], [`Dispersion`] - Scalar units
//! - [`UtcDateTime`] - Calendar/Julian-day time used by FITS and ephemeris
//!
//! ## Design Philosophy
//!
//! Images are plain row-major `f32` planes in the nominal `[0, 65535]`
//! domain. Every transform in the workspace returns a **new** image carrying
//! a **new** metadata bag; nothing mutates a source bag in place. The bag is
//! a closed tagged union: each recognized metadata kind has exactly one
//! payload type, so downstream consumers dispatch by pattern match instead
//! of downcasting.
//!
//! ## Crate Structure
//!
//! This crate is the foundation of HELIO-RS and has no internal
//! dependencies. All other HELIO-RS crates depend on `helio-core`:
//!
//! ```text
//! helio-core (this crate)
//!    ^
//!    |
//!    +-- helio-math (interpolation, ephemeris)
//!    +-- helio-ops (geometric transforms, stretches, sampling)
//!    +-- helio-spectral (line-profile analysis)
//!    +-- helio-io (FITS + scratch persistence)
//!    +-- helio-runtime (memory manager, executors, DAG scheduler)
//! ```

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]

pub mod ellipse;
pub mod error;
pub mod image;
pub mod metadata;
pub mod time;
pub mod units;

// Re-exports for convenience
pub use ellipse::Ellipse;
pub use error::{Error, Result};
pub use image::{check_same_shape, Image, MonoImage, RgbImage, PIXEL_MAX};
pub use metadata::{
    CoordOp, MetadataBag, MetadataKind, MetadataValue, RedshiftArea, SourceInfo,
};
pub use time::UtcDateTime;
pub use units::{Angle, Dispersion, Point2D, Wavelength};

/// Prelude module for convenient imports.
///
/// # Usage
///
/// ```
/// use helio_core::prelude::*;
/// ```
pub mod prelude {
    pub use crate::ellipse::Ellipse;
    pub use crate::error::{Error, Result};
    pub use crate::image::{Image, MonoImage, RgbImage, PIXEL_MAX};
    pub use crate::metadata::{
        CoordOp, MetadataBag, MetadataKind, MetadataValue, RedshiftArea, SourceInfo,
    };
    pub use crate::time::UtcDateTime;
    pub use crate::units::{Angle, Dispersion, Point2D, Wavelength};
}
