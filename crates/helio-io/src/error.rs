//! Error types for I/O operations.
//!
//! Provides unified error handling for the scratch and FITS codecs.

use std::io;
use thiserror::Error;

/// Result type alias for I/O operations.
pub type IoResult<T> = std::result::Result<T, IoError>;

/// I/O operation error.
#[derive(Debug, Error)]
pub enum IoError {
    /// File I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Invalid or corrupted file.
    #[error("invalid file: {0}")]
    InvalidFile(String),

    /// Decoding error.
    #[error("decode error: {0}")]
    DecodeError(String),

    /// Encoding error.
    #[error("encode error: {0}")]
    EncodeError(String),

    /// Unsupported bit depth.
    #[error("unsupported bit depth: {0}")]
    UnsupportedBitDepth(String),

    /// Missing required data.
    #[error("missing data: {0}")]
    MissingData(String),

    /// Error propagated from the core types.
    #[error(transparent)]
    Core(#[from] helio_core::Error),
}
