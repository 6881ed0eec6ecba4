//! Error types for cryptographic operations.

use thiserror::Error;

/// Result type alias for cryptographic operations.
pub type Result<T> = core::result::Result<T, Error>;

/// Cryptographic operation errors.
#[derive(Debug, Error)]
pub enum Error {
    /// AEAD encryption failed.
    #[error("AEAD encryption failed: {0}")]
    Encryption(String),

    /// AEAD decryption failed.
    #[error("AEAD decryption failed: {0}")]
    Decryption(String),

    /// Key derivation failed.
    #[error("Key derivation failed: {0}")]
    KeyDerivation(String),

    /// Invalid input length.
    #[error("Invalid input length: expected {expected}, got {actual}")]
    InvalidLength {
        /// Expected length in bytes.
        expected: usize,
        /// Actual length received in bytes.
        actual: usize,
    },

    /// Invalid cipher suite.
    #[error("Invalid cipher suite: 0x{0:04X}")]
    InvalidCipherSuite(u16),

    /// Invalid key length.
    #[error("Invalid key length: {0}")]
    InvalidKeyLength(usize),

    /// Sequence number space exhausted.
    #[error("Sequence number overflow")]
    SequenceOverflow,
}
