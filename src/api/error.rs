//! API Error Types
//!
//! Errors raised while starting or running the HTTP server. Any of these is
//! fatal for the process.

use thiserror::Error;

/// API server errors
#[derive(Error, Debug)]
pub enum ApiError {
    /// Listener could not be bound
    #[error("Failed to bind {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    /// Accept loop or other IO failure
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for API operations
pub type ApiResult<T> = Result<T, ApiError>;
