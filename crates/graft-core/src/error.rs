//! Error types for session capture, transplant and cipher probing.

use thiserror::Error;

/// Result type alias for graft operations.
pub type Result<T> = core::result::Result<T, Error>;

/// Errors produced by field access, snapshot/transplant and the record layer.
#[derive(Debug, Error)]
pub enum Error {
    /// The named field does not exist on the target type.
    #[error("Field not found: {0}")]
    FieldNotFound(String),

    /// The named field exists but its storage cannot be referenced.
    #[error("Field not addressable: {0}")]
    NotAddressable(String),

    /// A value's kind (or word-array shape) differs from the declared one.
    #[error("Type mismatch on {field}: expected {expected}, got {actual}")]
    TypeMismatch {
        /// Field being read or written.
        field: String,
        /// Declared kind.
        expected: String,
        /// Kind actually supplied or found.
        actual: String,
    },

    /// The cipher is not one of the recognized backend shapes.
    #[error("Unsupported cipher type: {0}")]
    UnsupportedBackend(String),

    /// A wrapped cipher layer was keyed differently from its wrapper.
    #[error("Inner {0} layer keyed with a different key")]
    KeyMismatch(String),

    /// A field could not be read while capturing a snapshot.
    #[error("Snapshot incomplete at field {field}: {reason}")]
    SnapshotIncomplete {
        /// First field that failed.
        field: String,
        /// Underlying failure.
        reason: String,
    },

    /// Operation requires an established session.
    #[error("Session not established (state: {0})")]
    NotEstablished(String),

    /// Invalid state transition.
    #[error("Invalid state transition")]
    InvalidState,

    /// No transport is bound to the session.
    #[error("No transport bound")]
    NoTransport,

    /// Exported state blob is malformed.
    #[error("Invalid state token: {0}")]
    InvalidToken(String),

    /// Malformed or oversized record.
    #[error("Record layer error: {0}")]
    Record(String),

    /// The peer sent a fatal alert.
    #[error("Alert received: {0}")]
    AlertReceived(u8),

    /// Too many consecutive records carried no application data.
    #[error("Too many empty records")]
    TooManyEmptyRecords,

    /// Required secret was never installed.
    #[error("Missing secret: {0}")]
    MissingSecret(&'static str),

    /// A shared session's lock was poisoned by a panicking holder.
    #[error("Session lock poisoned")]
    LockPoisoned,

    /// Cryptographic error.
    #[error("Crypto error: {0}")]
    Crypto(#[from] graft_crypto::Error),

    /// Transport I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<Error> for std::io::Error {
    fn from(err: Error) -> Self {
        match err {
            Error::Io(e) => e,
            other => std::io::Error::new(std::io::ErrorKind::Other, other),
        }
    }
}
