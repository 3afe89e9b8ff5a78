//! # helio-math
//!
//! Numerical building blocks for the solar imaging pipeline:
//!
//! - [`interp`] - Lanczos-3 (LUT-backed), bilinear and 1-D resampling
//! - [`ephemeris`] - Julian-date solar ephemeris: Carrington rotation,
//!   B₀/L₀/P angles
//! - [`dispersion`] - grating-equation spectral dispersion
//!
//! Everything here is pure math over `helio-core` types; no I/O, no state.

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]

pub mod dispersion;
pub mod ephemeris;
pub mod interp;

pub use dispersion::{spectral_dispersion, Spectrograph};
pub use ephemeris::{carrington_rotation, solar_params, SolarEphemeris};
pub use interp::{bilinear, lanczos_1d, lanczos_2d};
