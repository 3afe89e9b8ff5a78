//! # helio-io
//!
//! Persistence for the solar imaging pipeline.
//!
//! Two formats are implemented by hand over [`byteorder`]:
//!
//! - [`scratch`] - the internal spill format of the image memory manager:
//!   a kind byte, two little-endian dimensions, raw `f32` rows. No magic,
//!   no checksum; readers refuse anything that does not look like a spill.
//! - [`fits`] - standard 16-bit FITS with one binary-table HDU per
//!   metadata kind, each tagged with a `JSOLEX` header card so any FITS
//!   client can read the image while the pipeline round-trips its own
//!   metadata. INTI-style headers (`CENTER_X`/`CENTER_Y`/`SOLAR_R`)
//!   synthesize a disk ellipse on read.
//!
//! [`text::sanitize`] normalizes metadata strings for FITS headers (NFKD,
//! diacritics stripped, non-printables replaced).

#![warn(rustdoc::missing_crate_level_docs)]

pub mod error;
pub mod fits;
pub mod scratch;
pub mod text;

pub use error::{IoError, IoResult};
pub use fits::FitsWriteOptions;
