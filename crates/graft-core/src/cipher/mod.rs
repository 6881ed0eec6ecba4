//! AES backend shapes and round-key extraction.
//!
//! Ciphers are built by a [`BackendProber`] from an explicit
//! [`BackendCapabilities`] value, and the same prober descends their
//! wrapper layers to reach the stored key schedule.

mod backend;
mod probe;
mod schedule;

pub use backend::{
    AcceleratedAes, BackendVariant, BlockBackend, GcmAes, SoftwareAes, DEC_FIELD, ENC_FIELD,
};
pub use probe::{BackendCapabilities, BackendProber};
pub use schedule::{extract_round_keys, read_round_keys, RoundKeys};
