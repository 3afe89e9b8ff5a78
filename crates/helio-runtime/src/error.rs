//! Error types for the runtime fabric.

use thiserror::Error;

/// Result type alias for runtime operations.
pub type RuntimeResult<T> = std::result::Result<T, RuntimeError>;

/// Runtime operation error.
#[derive(Debug, Error)]
pub enum RuntimeError {
    /// File I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Scratch or FITS persistence error.
    #[error(transparent)]
    Storage(#[from] helio_io::IoError),

    /// Error propagated from the core types.
    #[error(transparent)]
    Core(#[from] helio_core::Error),

    /// The task or wait was cancelled by an interrupt.
    ///
    /// A sentinel, logged at error level but never escalated as a bug.
    #[error("processing cancelled")]
    Cancelled,

    /// The runtime has been shut down.
    #[error("runtime is shut down")]
    ShutDown,
}

impl RuntimeError {
    /// Returns `true` if this is the cancellation sentinel.
    #[inline]
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }
}
