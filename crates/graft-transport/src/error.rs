//! Transport layer errors.

use thiserror::Error;

/// Result type alias.
pub type Result<T> = core::result::Result<T, Error>;

/// Transport errors.
#[derive(Debug, Error)]
pub enum Error {
    /// Connection failed.
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// Operation not valid for this endpoint.
    #[error("Transport not available: {0}")]
    TransportUnavailable(String),

    /// Session error from core.
    #[error("Session error: {0}")]
    Session(#[from] graft_core::Error),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
