//! Round-key extraction.

use super::backend::{BlockBackend, DEC_FIELD, ENC_FIELD};
use super::probe::BackendProber;
use crate::field::{FieldAccess, FieldKind, FieldValue};
use crate::{Error, Result};
use graft_crypto::aes::schedule_len;
use std::fmt;
use zeroize::ZeroizeOnDrop;

/// Copied encryption and decryption round keys.
///
/// AES-128 yields 44 words per array, AES-192 52 and AES-256 60. Both
/// arrays always have one of those lengths and equal each other's length.
#[derive(Clone, PartialEq, Eq, ZeroizeOnDrop)]
pub struct RoundKeys {
    enc: Vec<u32>,
    dec: Vec<u32>,
}

impl RoundKeys {
    /// Encryption schedule, FIPS-197 word order.
    pub fn enc(&self) -> &[u32] {
        &self.enc
    }

    /// Decryption schedule for the equivalent inverse cipher.
    pub fn dec(&self) -> &[u32] {
        &self.dec
    }

    /// Number of cipher rounds.
    pub fn rounds(&self) -> usize {
        self.enc.len() / 4 - 1
    }

    /// Last encryption round key as 16 bytes.
    pub fn last_round_key(&self) -> [u8; 16] {
        let mut out = [0u8; 16];
        let tail = &self.enc[self.enc.len() - 4..];
        for (chunk, word) in out.chunks_exact_mut(4).zip(tail) {
            chunk.copy_from_slice(&word.to_be_bytes());
        }
        out
    }
}

impl fmt::Debug for RoundKeys {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RoundKeys")
            .field("rounds", &self.rounds())
            .finish_non_exhaustive()
    }
}

/// Extract the round keys of `cipher` using the default prober.
pub fn extract_round_keys(cipher: &dyn BlockBackend) -> Result<RoundKeys> {
    BackendProber::default().extract(cipher)
}

/// Copy the `enc` and `dec` word arrays out of a schedule store.
///
/// # Errors
/// `TypeMismatch` if either field is not a word array of a valid schedule
/// length, or if the two lengths differ.
pub fn read_round_keys(store: &dyn FieldAccess) -> Result<RoundKeys> {
    let enc = words(store, ENC_FIELD)?;
    let dec = words(store, DEC_FIELD)?;

    if dec.len() != enc.len() {
        return Err(Error::TypeMismatch {
            field: format!("{}.{}", store.type_name(), DEC_FIELD),
            expected: format!("[u32; {}]", enc.len()),
            actual: format!("[u32; {}]", dec.len()),
        });
    }
    Ok(RoundKeys { enc, dec })
}

fn words(store: &dyn FieldAccess, name: &str) -> Result<Vec<u32>> {
    let words = match store.get(name)? {
        FieldValue::Words(words) => words,
        other => {
            return Err(Error::TypeMismatch {
                field: format!("{}.{}", store.type_name(), name),
                expected: FieldKind::Words.to_string(),
                actual: other.kind().to_string(),
            })
        }
    };

    if ![10, 12, 14].iter().any(|r| schedule_len(*r) == words.len()) {
        return Err(Error::TypeMismatch {
            field: format!("{}.{}", store.type_name(), name),
            expected: "[u32; 44 | 52 | 60]".into(),
            actual: format!("[u32; {}]", words.len()),
        });
    }
    Ok(words)
}
