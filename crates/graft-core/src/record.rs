//! Record layer framing and per-direction protection state.
//!
//! ```text
//! Record
//! ┌──────────────────────────────────────────┐
//! │ content_type: u8                         │
//! │ legacy_version: u16 (0x0303, BE)         │
//! │ length: u16 (BE)                         │
//! ├──────────────────────────────────────────┤
//! │ AEAD(payload) || tag                     │
//! └──────────────────────────────────────────┘
//! ```
//!
//! The five header bytes are the AEAD additional data. The per-record nonce
//! is the static IV XORed with the big-endian sequence number.

use crate::field::Secret;
use crate::{Error, Result};
use graft_crypto::aead::{self, NONCE_LEN, TAG_LEN};
use graft_crypto::kdf::derive_traffic_keys;
use graft_crypto::CipherSuite;
use std::fmt;
use zeroize::{Zeroize, ZeroizeOnDrop, Zeroizing};

/// Record header length in bytes.
pub const RECORD_HEADER_LEN: usize = 5;

/// Largest plaintext fragment a record may carry.
pub const MAX_PLAINTEXT: usize = 16384;

/// Largest record body accepted from the wire.
pub const MAX_CIPHERTEXT: usize = MAX_PLAINTEXT + 256;

/// Legacy record version written in every header.
pub const LEGACY_RECORD_VERSION: u16 = 0x0303;

/// Alert description for `close_notify`.
pub const ALERT_CLOSE_NOTIFY: u8 = 0;

/// Alert level `warning`.
pub const ALERT_LEVEL_WARNING: u8 = 1;

/// Record content types.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ContentType {
    /// change_cipher_spec (ignored, compatibility only)
    ChangeCipherSpec = 20,
    /// alert
    Alert = 21,
    /// handshake
    Handshake = 22,
    /// application_data
    ApplicationData = 23,
}

impl ContentType {
    /// Convert from wire format.
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            20 => Some(Self::ChangeCipherSpec),
            21 => Some(Self::Alert),
            22 => Some(Self::Handshake),
            23 => Some(Self::ApplicationData),
            _ => None,
        }
    }
}

/// Parsed record header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecordHeader {
    /// Content type.
    pub content_type: ContentType,
    /// Legacy version field.
    pub version: u16,
    /// Body length.
    pub length: u16,
}

impl RecordHeader {
    /// Parse a header from the front of `data`.
    ///
    /// Returns `Ok(None)` when fewer than [`RECORD_HEADER_LEN`] bytes are buffered.
    pub fn parse(data: &[u8]) -> Result<Option<Self>> {
        if data.len() < RECORD_HEADER_LEN {
            return Ok(None);
        }

        let content_type = ContentType::from_u8(data[0])
            .ok_or_else(|| Error::Record(format!("Unknown content type: {}", data[0])))?;

        let version = u16::from_be_bytes([data[1], data[2]]);
        if version >> 8 != 0x03 {
            return Err(Error::Record(format!(
                "Unexpected record version: 0x{:04X}",
                version
            )));
        }

        let length = u16::from_be_bytes([data[3], data[4]]);
        if length as usize > MAX_CIPHERTEXT {
            return Err(Error::Record(format!("Record overflow: {} bytes", length)));
        }

        Ok(Some(Self {
            content_type,
            version,
            length,
        }))
    }

    /// Write the header into the first five bytes of `out`.
    pub fn encode_into(&self, out: &mut [u8]) {
        out[0] = self.content_type as u8;
        out[1..3].copy_from_slice(&self.version.to_be_bytes());
        out[3..5].copy_from_slice(&self.length.to_be_bytes());
    }
}

/// Installed record protection for one direction.
#[derive(Clone, PartialEq)]
pub struct Protection {
    /// Negotiated suite.
    pub suite: CipherSuite,
    /// AEAD key.
    pub key: Secret,
    /// Static IV.
    pub iv: [u8; NONCE_LEN],
}

impl fmt::Debug for Protection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Protection")
            .field("suite", &self.suite)
            .field("key", &self.key)
            .finish_non_exhaustive()
    }
}

/// One direction of the record layer: protection plus sequence number.
///
/// The zero value carries no protection and records pass in plaintext.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HalfConn {
    /// Installed protection, `None` before the handshake completes.
    pub protection: Option<Protection>,
    /// Next record sequence number.
    pub seq: u64,
}

impl HalfConn {
    /// Install protection derived from a traffic secret.
    pub fn from_traffic_secret(suite: CipherSuite, traffic_secret: &[u8]) -> Result<Self> {
        let keys = derive_traffic_keys(suite, traffic_secret)?;
        Ok(Self {
            protection: Some(Protection {
                suite,
                key: Secret::new(keys.key.to_vec()),
                iv: keys.iv,
            }),
            seq: 0,
        })
    }

    /// Whether this is the unprotected initial state.
    pub fn is_zero(&self) -> bool {
        self.protection.is_none() && self.seq == 0
    }

    fn next_nonce(&mut self, iv: &[u8; NONCE_LEN]) -> Result<[u8; NONCE_LEN]> {
        let nonce = aead::construct_nonce(iv, self.seq);
        self.seq = self
            .seq
            .checked_add(1)
            .ok_or(graft_crypto::Error::SequenceOverflow)?;
        Ok(nonce)
    }

    /// Frame and protect one record.
    ///
    /// The header is assembled in `scratch`, which doubles as the AAD buffer.
    pub fn seal(
        &mut self,
        content_type: ContentType,
        payload: &[u8],
        scratch: &mut [u8; 16],
    ) -> Result<Vec<u8>> {
        if payload.len() > MAX_PLAINTEXT {
            return Err(Error::Record(format!(
                "Plaintext too large: {} bytes",
                payload.len()
            )));
        }

        let body_len = match self.protection {
            Some(_) => payload.len() + TAG_LEN,
            None => payload.len(),
        };
        RecordHeader {
            content_type,
            version: LEGACY_RECORD_VERSION,
            length: body_len as u16,
        }
        .encode_into(&mut scratch[..RECORD_HEADER_LEN]);

        let mut record = Vec::with_capacity(RECORD_HEADER_LEN + body_len);
        record.extend_from_slice(&scratch[..RECORD_HEADER_LEN]);

        match self.protection.clone() {
            Some(p) => {
                let nonce = self.next_nonce(&p.iv)?;
                let sealed = aead::seal(
                    p.suite.aead_algorithm(),
                    p.key.expose(),
                    &nonce,
                    payload,
                    &scratch[..RECORD_HEADER_LEN],
                )?;
                record.extend_from_slice(&sealed);
            }
            None => record.extend_from_slice(payload),
        }
        Ok(record)
    }

    /// Remove protection from one record body.
    pub fn open(&mut self, header: &[u8], body: &[u8]) -> Result<Zeroizing<Vec<u8>>> {
        match self.protection.clone() {
            Some(p) => {
                let nonce = self.next_nonce(&p.iv)?;
                Ok(aead::open(
                    p.suite.aead_algorithm(),
                    p.key.expose(),
                    &nonce,
                    body,
                    header,
                )?)
            }
            None => Ok(Zeroizing::new(body.to_vec())),
        }
    }
}

/// Decrypted application data awaiting delivery, with its read position.
///
/// Readable bytes are `data[pos..]`.
#[derive(Clone, Default, PartialEq, Eq, Zeroize, ZeroizeOnDrop)]
pub struct AppDataCursor {
    data: Vec<u8>,
    pos: usize,
}

impl AppDataCursor {
    /// Buffer `data` with the cursor at the start.
    pub fn new(data: Vec<u8>) -> Self {
        Self { data, pos: 0 }
    }

    /// Buffer `data` with an explicit read position (clamped to the length).
    pub fn with_position(data: Vec<u8>, pos: usize) -> Self {
        let pos = pos.min(data.len());
        Self { data, pos }
    }

    /// Copy as many unread bytes as fit into `out`, advancing the cursor.
    pub fn read(&mut self, out: &mut [u8]) -> usize {
        let n = out.len().min(self.remaining().len());
        out[..n].copy_from_slice(&self.data[self.pos..self.pos + n]);
        self.pos += n;
        n
    }

    /// Unread bytes.
    pub fn remaining(&self) -> &[u8] {
        &self.data[self.pos..]
    }

    /// Whole buffer including consumed bytes.
    pub fn buffer(&self) -> &[u8] {
        &self.data
    }

    /// Current read position.
    pub fn position(&self) -> usize {
        self.pos
    }

    /// Whether no unread bytes remain.
    pub fn is_empty(&self) -> bool {
        self.remaining().is_empty()
    }

    /// Whether this is the never-filled initial state.
    pub fn is_zero(&self) -> bool {
        self.data.is_empty() && self.pos == 0
    }
}

impl fmt::Debug for AppDataCursor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AppDataCursor")
            .field("len", &self.data.len())
            .field("pos", &self.pos)
            .finish()
    }
}
