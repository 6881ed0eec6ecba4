//! Session state capture and transplant for record-layer sessions.
//!
//! This crate moves a live, established session from one transport to
//! another without a new handshake:
//! - Typed field access over session internals ([`field`])
//! - Record layer framing and protection ([`record`])
//! - Session state machine over any `Read + Write` transport ([`session`])
//! - Ordered snapshots and transplant onto a new transport ([`snapshot`], [`transplant`])
//! - Versioned export/import of snapshots ([`token`])
//! - AES backend probing and round-key extraction ([`cipher`])
//!
//! ```
//! use graft_core::cipher::{extract_round_keys, SoftwareAes};
//!
//! let cipher = SoftwareAes::new(&[0u8; 16]).unwrap();
//! let keys = extract_round_keys(&cipher).unwrap();
//! assert_eq!(keys.enc().len(), 44);
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod cipher;
pub mod error;
pub mod field;
pub mod record;
pub mod session;
pub mod snapshot;
pub mod token;
pub mod transplant;

#[cfg(test)]
mod testutil;

pub use error::{Error, Result};
pub use field::{FieldAccess, FieldKind, FieldValue, Secret};
pub use session::{HandshakeOutcome, Role, Session, SessionConfig, SessionState, Transport};
pub use snapshot::{snapshot, SessionSnapshot};
pub use transplant::{migrate, migrate_shared, transplant, ApplyPolicy, TransplantConfig};
