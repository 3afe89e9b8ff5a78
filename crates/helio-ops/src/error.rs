//! Error types for transform operations.

use thiserror::Error;

/// Result type alias for transform operations.
pub type OpsResult<T> = std::result::Result<T, OpsError>;

/// Transform operation error.
#[derive(Debug, Error)]
pub enum OpsError {
    /// Error propagated from the core types.
    #[error(transparent)]
    Core(#[from] helio_core::Error),

    /// Input shape is unusable for the operation.
    #[error("invalid dimensions: {0}")]
    InvalidDimensions(String),

    /// Operation parameter is out of its documented range.
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),
}
