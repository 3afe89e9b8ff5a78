//! CLI command implementations

pub mod autostretch;
pub mod clv;
pub mod ephemeris;
pub mod flip;
pub mod info;
pub mod mask;
pub mod rotate;
pub mod stats;

use anyhow::{Context, Result};
use helio_core::Image;
use helio_io::fits::{self, FitsWriteOptions};
use std::path::Path;

/// Load a FITS image from path
pub fn load_image(path: &Path) -> Result<Image> {
    tracing::debug!(path = %path.display(), "loading FITS");
    fits::read(path).with_context(|| format!("Failed to load: {}", path.display()))
}

/// Save a FITS image to path
pub fn save_image(path: &Path, image: &Image) -> Result<()> {
    fits::write(path, image, &FitsWriteOptions::default())
        .with_context(|| format!("Failed to save: {}", path.display()))
}
