//! Key provider errors.

use thiserror::Error;

/// Result type alias.
pub type Result<T> = core::result::Result<T, Error>;

/// Key provider errors.
#[derive(Debug, Error)]
pub enum Error {
    /// Key storage not available on this platform.
    #[error("Key storage not available: {0}")]
    Unavailable(String),

    /// Keystore error.
    #[error("Keystore error: {0}")]
    Keystore(String),

    /// Sealed blob is shorter than nonce plus tag.
    #[error("Sealed data too short: {0} bytes")]
    Truncated(usize),
}
