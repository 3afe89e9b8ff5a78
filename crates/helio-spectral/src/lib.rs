//! # helio-spectral
//!
//! Spectral-line analysis for spectroheliograph scans:
//!
//! - [`profile`] - line-profile statistics with adaptive window sizing
//! - [`voigt`] - the external Voigt-fitter seam
//! - [`clv`] - center-to-limb variation over a fitted disk
//!
//! The analyzer never fails: degenerate inputs yield empty statistics, and
//! a Voigt fit that does not converge simply leaves the FWHM fields unset.

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]

pub mod clv;
pub mod profile;
pub mod voigt;

pub use clv::center_to_limb;
pub use profile::{compute_statistics, LineStatistics, SpectralPoint};
pub use voigt::{VoigtFit, VoigtFitter};
