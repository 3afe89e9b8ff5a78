//! Error types for the pipeline kernel.
//!
//! The [`Error`] enum covers the failure modes shared across the workspace:
//!
//! - **Invalid input**: shape mismatch, out-of-range parameter, unsupported
//!   image kind, missing required metadata - raised locally, never retried.
//! - **I/O failure**: scratch or FITS access, wrapped and propagated.
//! - **Cancellation**: a sentinel value - logged but not escalated as a bug.
//!
//! Downstream crates define their own error enums and convert from this one
//! via `#[from]`.

use thiserror::Error;

/// Result type alias using [`Error`] as the error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised by pixel-level operations in the kernel.
#[derive(Debug, Error)]
pub enum Error {
    /// Two images (or planes) that must share a shape do not.
    ///
    /// Raised by batch operations (stacking, weighted average) and by
    /// constructors validating plane lengths.
    #[error("shape mismatch: expected {expected_width}x{expected_height}, got {got_width}x{got_height}")]
    ShapeMismatch {
        /// Expected width.
        expected_width: usize,
        /// Expected height.
        expected_height: usize,
        /// Actual width.
        got_width: usize,
        /// Actual height.
        got_height: usize,
    },

    /// Pixel coordinates are outside image bounds.
    #[error("pixel ({x}, {y}) out of bounds for image {width}x{height}")]
    OutOfBounds {
        /// X coordinate that was out of bounds.
        x: usize,
        /// Y coordinate that was out of bounds.
        y: usize,
        /// Image width.
        width: usize,
        /// Image height.
        height: usize,
    },

    /// The operation does not support this image kind.
    #[error("unsupported image kind: {0}")]
    UnsupportedKind(String),

    /// A required metadata entry is absent from the bag.
    #[error("missing required metadata: {0}")]
    MissingMetadata(&'static str),

    /// An operation parameter is out of its documented range.
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    /// I/O error, wrapped as a processing error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Processing was cancelled by an interrupt.
    ///
    /// A sentinel, not a bug: callers log it at error level and unwind
    /// cooperatively.
    #[error("processing cancelled")]
    Cancelled,

    /// Generic error with custom message.
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Creates an [`Error::ShapeMismatch`] from two `(width, height)` pairs.
    #[inline]
    pub fn shape_mismatch(expected: (usize, usize), got: (usize, usize)) -> Self {
        Self::ShapeMismatch {
            expected_width: expected.0,
            expected_height: expected.1,
            got_width: got.0,
            got_height: got.1,
        }
    }

    /// Creates an [`Error::OutOfBounds`] error.
    #[inline]
    pub fn out_of_bounds(x: usize, y: usize, width: usize, height: usize) -> Self {
        Self::OutOfBounds {
            x,
            y,
            width,
            height,
        }
    }

    /// Creates an [`Error::InvalidParameter`] error.
    #[inline]
    pub fn invalid_parameter(msg: impl Into<String>) -> Self {
        Self::InvalidParameter(msg.into())
    }

    /// Creates an [`Error::Other`] error.
    #[inline]
    pub fn other(msg: impl Into<String>) -> Self {
        Self::Other(msg.into())
    }

    /// Returns `true` if this is the cancellation sentinel.
    #[inline]
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }

    /// Returns `true` if this is an I/O error.
    #[inline]
    pub fn is_io_error(&self) -> bool {
        matches!(self, Self::Io(_))
    }
}
