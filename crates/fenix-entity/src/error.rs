//! Error types for identity allocation.
//!
//! Allocation performs no retries; a failing sequence source propagates to
//! the caller immediately so entity construction fails fast.

use thiserror::Error;

/// Result type alias for sequence operations.
pub type Result<T> = std::result::Result<T, SequenceError>;

/// Error conditions raised by sequences and the identity allocator.
#[derive(Debug, Clone, Error)]
pub enum SequenceError {
    /// Backing store could not serve a value reservation.
    #[error("sequence store unavailable: {message}")]
    StoreUnavailable {
        /// Store error message
        message: String,
    },

    /// Sequence was configured with invalid parameters.
    #[error("invalid sequence configuration: {message}")]
    Configuration {
        /// Configuration error message
        message: String,
    },
}

impl SequenceError {
    /// Creates a store unavailable error.
    pub fn store_unavailable(message: impl Into<String>) -> Self {
        Self::StoreUnavailable { message: message.into() }
    }

    /// Creates a configuration error.
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration { message: message.into() }
    }
}
