//! Versioned export format for session snapshots.
//!
//! ## Structure
//!
//! ```text
//! State blob (little-endian)
//! ┌─────────────────────────────────────────────────────┐
//! │ Header (12 bytes)                                   │
//! │   magic: 0x47524654 ("GRFT")           [4 bytes]    │
//! │   version: u8                          [1 byte]     │
//! │   flags: u8                            [1 byte]     │
//! │   entry_count: u16                     [2 bytes]    │
//! │   reserved: u32                        [4 bytes]    │
//! ├─────────────────────────────────────────────────────┤
//! │ Entries (entry_count times)                         │
//! │   field_id: u8                         [1 byte]     │
//! │   kind: u8                             [1 byte]     │
//! │   present: u8 (0 or 1)                 [1 byte]     │
//! │   len: u32                             [4 bytes]    │
//! │   payload                              [len bytes]  │
//! └─────────────────────────────────────────────────────┘
//! ```
//!
//! Field ids and kind ids are stable across versions. Entries with unknown
//! field ids are skipped, so newer writers stay readable. The blob carries
//! key material in the clear; seal it before it leaves the process.
//!
//! ## Usage
//!
//! ```
//! use graft_core::snapshot::SessionSnapshot;
//!
//! let bogus = [0u8; 12];
//! assert!(SessionSnapshot::import(&bogus).is_err());
//! ```

use crate::field::{Certificate, CertChain, FieldKind, FieldValue, Secret};
use crate::record::{AppDataCursor, HalfConn, Protection};
use crate::session::{Session, SessionState, SESSION_FIELDS};
use crate::snapshot::{SessionSnapshot, SnapshotEntry};
use crate::transplant::transplant;
use crate::{Error, Result};
use graft_crypto::CipherSuite;
use tracing::{info, warn};

/// Export magic number: "GRFT" (0x47524654).
pub const STATE_MAGIC: u32 = 0x4752_4654;

/// Export format version.
pub const STATE_VERSION: u8 = 1;

/// Export header (12 bytes).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StateHeader {
    /// Magic number: 0x47524654 ("GRFT")
    pub magic: u32,
    /// Format version (currently 1)
    pub version: u8,
    /// Flags (reserved, written as 0)
    pub flags: u8,
    /// Number of entries that follow
    pub entry_count: u16,
    /// Reserved (written as 0)
    pub reserved: u32,
}

impl StateHeader {
    /// Size of serialized header in bytes.
    pub const SIZE: usize = 12;

    /// Serialize header to bytes (little-endian).
    pub fn serialize(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(Self::SIZE);
        buf.extend_from_slice(&self.magic.to_le_bytes());
        buf.push(self.version);
        buf.push(self.flags);
        buf.extend_from_slice(&self.entry_count.to_le_bytes());
        buf.extend_from_slice(&self.reserved.to_le_bytes());
        buf
    }

    /// Parse header from bytes.
    pub fn parse(data: &[u8]) -> Result<Self> {
        if data.len() < Self::SIZE {
            return Err(Error::InvalidToken("State header too short".into()));
        }

        let magic = u32::from_le_bytes([data[0], data[1], data[2], data[3]]);
        if magic != STATE_MAGIC {
            return Err(Error::InvalidToken(format!(
                "Invalid magic: expected 0x{:08X}, got 0x{:08X}",
                STATE_MAGIC, magic
            )));
        }

        let version = data[4];
        if version != STATE_VERSION {
            return Err(Error::InvalidToken(format!(
                "Unsupported version: {}",
                version
            )));
        }

        Ok(Self {
            magic,
            version,
            flags: data[5],
            entry_count: u16::from_le_bytes([data[6], data[7]]),
            reserved: u32::from_le_bytes([data[8], data[9], data[10], data[11]]),
        })
    }
}

impl SessionSnapshot {
    /// Serialize to the versioned export format.
    pub fn export(&self) -> Vec<u8> {
        let mut buf = StateHeader {
            magic: STATE_MAGIC,
            version: STATE_VERSION,
            flags: 0,
            entry_count: self.entries().len() as u16,
            reserved: 0,
        }
        .serialize();

        for entry in self.entries() {
            let id = SESSION_FIELDS
                .iter()
                .find(|d| d.name == entry.field)
                .map_or(0, |d| d.id);

            let mut payload = Vec::new();
            if entry.present {
                encode_value(&entry.value, &mut payload);
            }

            buf.push(id);
            buf.push(entry.value.kind().id());
            buf.push(u8::from(entry.present));
            buf.extend_from_slice(&(payload.len() as u32).to_le_bytes());
            buf.extend_from_slice(&payload);
        }

        info!(
            entries = self.entries().len(),
            bytes = buf.len(),
            "exported session snapshot"
        );
        buf
    }

    /// Parse the versioned export format.
    ///
    /// Fields missing from the blob come back absent.
    ///
    /// # Errors
    /// `InvalidToken` for truncation, bad magic or version, duplicate ids or
    /// malformed payloads. `TypeMismatch` when a known field carries a
    /// different kind than declared.
    pub fn import(data: &[u8]) -> Result<Self> {
        let header = StateHeader::parse(data)?;
        let mut reader = Reader::new(&data[StateHeader::SIZE..]);

        let exported: Vec<_> = SESSION_FIELDS
            .iter()
            .filter(|d| d.kind != FieldKind::Opaque)
            .collect();
        let mut slots: Vec<Option<SnapshotEntry>> = exported.iter().map(|_| None).collect();

        for _ in 0..header.entry_count {
            let id = reader.u8()?;
            let kind_id = reader.u8()?;
            let present = reader.u8()?;
            let len = reader.u32()? as usize;
            let payload = reader.take(len)?;

            let Some(slot) = exported.iter().position(|d| d.id == id) else {
                warn!(field_id = id, "skipping unknown field id");
                continue;
            };
            let descriptor = exported[slot];

            if slots[slot].is_some() {
                return Err(Error::InvalidToken(format!(
                    "Duplicate field: {}",
                    descriptor.name
                )));
            }

            let kind = FieldKind::from_id(kind_id)
                .ok_or_else(|| Error::InvalidToken(format!("Unknown kind id: {}", kind_id)))?;
            if kind != descriptor.kind {
                return Err(descriptor.mismatch(kind));
            }

            let (value, present) = match present {
                0 => (zero_value(kind)?, false),
                1 => {
                    let mut payload_reader = Reader::new(payload);
                    let value = decode_value(kind, &mut payload_reader)?;
                    payload_reader.finish(descriptor.name)?;
                    (value, true)
                }
                other => {
                    return Err(Error::InvalidToken(format!(
                        "Invalid present flag {} on {}",
                        other, descriptor.name
                    )))
                }
            };

            slots[slot] = Some(SnapshotEntry {
                field: descriptor.name,
                value,
                present,
            });
        }
        reader.finish("state blob")?;

        let mut entries = Vec::with_capacity(slots.len());
        for (slot, descriptor) in slots.into_iter().zip(&exported) {
            let entry = match slot {
                Some(entry) => entry,
                None => SnapshotEntry {
                    field: descriptor.name,
                    value: zero_value(descriptor.kind)?,
                    present: false,
                },
            };
            entries.push(entry);
        }

        let snapshot = SessionSnapshot::from_entries(entries);
        info!(
            entries = header.entry_count,
            present = snapshot.entries().iter().filter(|e| e.present).count(),
            "imported session snapshot"
        );
        Ok(snapshot)
    }
}

impl<T> Session<T> {
    /// Capture and serialize this session's state.
    pub fn export_state(&self) -> Result<Vec<u8>> {
        Ok(SessionSnapshot::capture(self)?.export())
    }

    /// Rebuild a session from exported state onto `transport`.
    pub fn import_state(data: &[u8], transport: T) -> Result<Self> {
        transplant(&SessionSnapshot::import(data)?, transport)
    }
}

fn zero_value(kind: FieldKind) -> Result<FieldValue> {
    kind.zero_value()
        .ok_or_else(|| Error::InvalidToken(format!("No value for kind {}", kind)))
}

fn put_u32(out: &mut Vec<u8>, value: u32) {
    out.extend_from_slice(&value.to_le_bytes());
}

fn put_prefixed(out: &mut Vec<u8>, bytes: &[u8]) {
    put_u32(out, bytes.len() as u32);
    out.extend_from_slice(bytes);
}

fn put_chain(out: &mut Vec<u8>, chain: &CertChain) {
    put_u32(out, chain.len() as u32);
    for cert in chain {
        put_prefixed(out, cert.der());
    }
}

fn encode_value(value: &FieldValue, out: &mut Vec<u8>) {
    match value {
        FieldValue::Bool(v) => out.push(u8::from(*v)),
        FieldValue::U16(v) => out.extend_from_slice(&v.to_le_bytes()),
        FieldValue::U32(v) => put_u32(out, *v),
        FieldValue::U64(v) => out.extend_from_slice(&v.to_le_bytes()),
        FieldValue::Text(v) => out.extend_from_slice(v.as_bytes()),
        FieldValue::OptText(v) => match v {
            Some(text) => {
                out.push(1);
                out.extend_from_slice(text.as_bytes());
            }
            None => out.push(0),
        },
        FieldValue::Bytes(v) => out.extend_from_slice(v),
        FieldValue::ByteList(v) => {
            put_u32(out, v.len() as u32);
            for item in v {
                put_prefixed(out, item);
            }
        }
        FieldValue::Finished(v) => out.extend_from_slice(v),
        FieldValue::Scratch(v) => out.extend_from_slice(v),
        FieldValue::Chain(v) => put_chain(out, v),
        FieldValue::Chains(v) => {
            put_u32(out, v.len() as u32);
            for chain in v {
                put_chain(out, chain);
            }
        }
        FieldValue::Secret(v) => match v {
            Some(secret) => {
                out.push(1);
                out.extend_from_slice(secret.expose());
            }
            None => out.push(0),
        },
        FieldValue::RecordState(half) => {
            match &half.protection {
                Some(p) => {
                    out.push(1);
                    out.extend_from_slice(&p.suite.to_u16().to_le_bytes());
                    out.extend_from_slice(&p.iv);
                    put_prefixed(out, p.key.expose());
                }
                None => out.push(0),
            }
            out.extend_from_slice(&half.seq.to_le_bytes());
        }
        FieldValue::Cursor(cursor) => {
            put_u32(out, cursor.position() as u32);
            out.extend_from_slice(cursor.buffer());
        }
        FieldValue::State(v) => out.push(v.to_u8()),
        FieldValue::Words(v) => {
            put_u32(out, v.len() as u32);
            for word in v {
                put_u32(out, *word);
            }
        }
    }
}

fn decode_value(kind: FieldKind, r: &mut Reader<'_>) -> Result<FieldValue> {
    Ok(match kind {
        FieldKind::Bool => FieldValue::Bool(r.flag()?),
        FieldKind::U16 => FieldValue::U16(r.u16()?),
        FieldKind::U32 => FieldValue::U32(r.u32()?),
        FieldKind::U64 => FieldValue::U64(r.u64()?),
        FieldKind::Text => FieldValue::Text(r.text_rest()?),
        FieldKind::OptText => FieldValue::OptText(match r.flag()? {
            true => Some(r.text_rest()?),
            false => None,
        }),
        FieldKind::Bytes => FieldValue::Bytes(r.rest().to_vec()),
        FieldKind::ByteList => {
            let count = r.u32()?;
            let mut items = Vec::new();
            for _ in 0..count {
                items.push(r.prefixed()?.to_vec());
            }
            FieldValue::ByteList(items)
        }
        FieldKind::Finished => FieldValue::Finished(r.array()?),
        FieldKind::Scratch => FieldValue::Scratch(r.array()?),
        FieldKind::Chain => FieldValue::Chain(r.chain()?),
        FieldKind::Chains => {
            let count = r.u32()?;
            let mut chains = Vec::new();
            for _ in 0..count {
                chains.push(r.chain()?);
            }
            FieldValue::Chains(chains)
        }
        FieldKind::Secret => FieldValue::Secret(match r.flag()? {
            true => Some(Secret::new(r.rest().to_vec())),
            false => None,
        }),
        FieldKind::RecordState => {
            let protection = match r.flag()? {
                true => {
                    let id = r.u16()?;
                    let suite = CipherSuite::from_u16(id).ok_or_else(|| {
                        Error::InvalidToken(format!("Unknown cipher suite: 0x{:04X}", id))
                    })?;
                    let iv = r.array()?;
                    let key = Secret::new(r.prefixed()?.to_vec());
                    Some(Protection { suite, key, iv })
                }
                false => None,
            };
            let seq = r.u64()?;
            FieldValue::RecordState(HalfConn { protection, seq })
        }
        FieldKind::Cursor => {
            let pos = r.u32()? as usize;
            let data = r.rest().to_vec();
            if pos > data.len() {
                return Err(Error::InvalidToken(format!(
                    "Cursor position {} beyond {} buffered bytes",
                    pos,
                    data.len()
                )));
            }
            FieldValue::Cursor(AppDataCursor::with_position(data, pos))
        }
        FieldKind::State => {
            let raw = r.u8()?;
            FieldValue::State(
                SessionState::from_u8(raw)
                    .ok_or_else(|| Error::InvalidToken(format!("Invalid session state: {}", raw)))?,
            )
        }
        FieldKind::Words => {
            let count = r.u32()?;
            let mut words = Vec::new();
            for _ in 0..count {
                words.push(r.u32()?);
            }
            FieldValue::Words(words)
        }
        FieldKind::Opaque => {
            return Err(Error::InvalidToken("Opaque fields are never exported".into()))
        }
    })
}

/// Bounds-checked little-endian reader.
struct Reader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    fn take(&mut self, n: usize) -> Result<&'a [u8]> {
        let end = self
            .pos
            .checked_add(n)
            .filter(|end| *end <= self.data.len())
            .ok_or_else(|| {
                Error::InvalidToken(format!(
                    "Truncated: need {} bytes at offset {}, have {}",
                    n,
                    self.pos,
                    self.data.len() - self.pos
                ))
            })?;
        let slice = &self.data[self.pos..end];
        self.pos = end;
        Ok(slice)
    }

    fn array<const N: usize>(&mut self) -> Result<[u8; N]> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.take(N)?);
        Ok(out)
    }

    fn u8(&mut self) -> Result<u8> {
        Ok(self.take(1)?[0])
    }

    fn flag(&mut self) -> Result<bool> {
        match self.u8()? {
            0 => Ok(false),
            1 => Ok(true),
            other => Err(Error::InvalidToken(format!("Invalid flag byte: {}", other))),
        }
    }

    fn u16(&mut self) -> Result<u16> {
        Ok(u16::from_le_bytes(self.array()?))
    }

    fn u32(&mut self) -> Result<u32> {
        Ok(u32::from_le_bytes(self.array()?))
    }

    fn u64(&mut self) -> Result<u64> {
        Ok(u64::from_le_bytes(self.array()?))
    }

    fn prefixed(&mut self) -> Result<&'a [u8]> {
        let len = self.u32()? as usize;
        self.take(len)
    }

    fn rest(&mut self) -> &'a [u8] {
        let slice = &self.data[self.pos..];
        self.pos = self.data.len();
        slice
    }

    fn text_rest(&mut self) -> Result<String> {
        String::from_utf8(self.rest().to_vec())
            .map_err(|_| Error::InvalidToken("Text field is not UTF-8".into()))
    }

    fn chain(&mut self) -> Result<CertChain> {
        let count = self.u32()?;
        let mut chain = Vec::new();
        for _ in 0..count {
            chain.push(Certificate::from_der(self.prefixed()?.to_vec()));
        }
        Ok(chain)
    }

    fn finish(&self, what: &str) -> Result<()> {
        if self.pos != self.data.len() {
            return Err(Error::InvalidToken(format!(
                "{} trailing bytes after {}",
                self.data.len() - self.pos,
                what
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::field::FieldAccess;
    use crate::snapshot::snapshot;
    use crate::testutil::{established_pair, pipe};

    #[test]
    fn test_header_layout() {
        let header = StateHeader {
            magic: STATE_MAGIC,
            version: STATE_VERSION,
            flags: 0,
            entry_count: 33,
            reserved: 0,
        };
        let bytes = header.serialize();
        assert_eq!(hex::encode(&bytes), "544652470100210000000000");
        assert_eq!(&bytes[..4], b"TFRG");
        assert_eq!(bytes.len(), StateHeader::SIZE);
        assert_eq!(StateHeader::parse(&bytes).unwrap(), header);
    }

    #[test]
    fn test_header_rejects_bad_magic_and_version() {
        let mut bytes = StateHeader {
            magic: STATE_MAGIC,
            version: STATE_VERSION,
            flags: 0,
            entry_count: 0,
            reserved: 0,
        }
        .serialize();

        bytes[4] = 2;
        assert!(matches!(StateHeader::parse(&bytes), Err(Error::InvalidToken(_))));
        bytes[4] = STATE_VERSION;
        bytes[0] ^= 0xFF;
        assert!(matches!(StateHeader::parse(&bytes), Err(Error::InvalidToken(_))));
        assert!(matches!(StateHeader::parse(&bytes[..11]), Err(Error::InvalidToken(_))));
    }

    #[test]
    fn test_export_import_preserves_snapshot() {
        let (mut client, mut server) = established_pair(CipherSuite::Aes256GcmSha384);
        server.write(b"queued for later").unwrap();
        let mut first = [0u8; 6];
        client.read(&mut first).unwrap();

        let snap = snapshot(&client).unwrap();
        let imported = SessionSnapshot::import(&snap.export()).unwrap();
        assert_eq!(imported, snap);
    }

    #[test]
    fn test_session_export_import_state() {
        let (client, mut server) = established_pair(CipherSuite::ChaCha20Poly1305Sha256);
        let blob = client.export_state().unwrap();
        let mut client = client;
        let transport = client.retire().unwrap();

        let mut restored = Session::import_state(&blob, transport).unwrap();
        restored.write(b"restored").unwrap();
        let mut buf = [0u8; 16];
        let n = server.read(&mut buf).unwrap();
        assert_eq!(&buf[..n], b"restored");
    }

    #[test]
    fn test_unknown_field_id_skipped() {
        let (client, _server) = established_pair(CipherSuite::Aes128GcmSha256);
        let mut blob = snapshot(&client).unwrap().export();

        // Append an entry with an id no version has used.
        blob.extend_from_slice(&[0xEE, FieldKind::U32.id(), 1, 4, 0, 0, 0, 1, 2, 3, 4]);
        let count = u16::from_le_bytes([blob[6], blob[7]]) + 1;
        blob[6..8].copy_from_slice(&count.to_le_bytes());

        let imported = SessionSnapshot::import(&blob).unwrap();
        assert_eq!(imported, snapshot(&client).unwrap());
    }

    #[test]
    fn test_missing_fields_are_absent() {
        let header = StateHeader {
            magic: STATE_MAGIC,
            version: STATE_VERSION,
            flags: 0,
            entry_count: 1,
            reserved: 0,
        };
        let mut blob = header.serialize();
        blob.extend_from_slice(&[6, FieldKind::U32.id(), 1, 4, 0, 0, 0, 9, 0, 0, 0]);

        let imported = SessionSnapshot::import(&blob).unwrap();
        assert_eq!(imported.get("handshakes"), Some(&FieldValue::U32(9)));
        assert!(imported.get("state").is_none());
        assert_eq!(imported.entries().iter().filter(|e| e.present).count(), 1);

        let (a, _) = pipe();
        assert!(matches!(
            Session::import_state(&blob, a),
            Err(Error::NotEstablished(_))
        ));
    }

    #[test]
    fn test_kind_mismatch_is_type_mismatch() {
        let mut blob = StateHeader {
            magic: STATE_MAGIC,
            version: STATE_VERSION,
            flags: 0,
            entry_count: 1,
            reserved: 0,
        }
        .serialize();
        // handshakes (id 6) declared u32, sent as bool.
        blob.extend_from_slice(&[6, FieldKind::Bool.id(), 1, 1, 0, 0, 0, 1]);
        assert!(matches!(
            SessionSnapshot::import(&blob),
            Err(Error::TypeMismatch { .. })
        ));
    }

    #[test]
    fn test_malformed_blobs_rejected() {
        let (client, _server) = established_pair(CipherSuite::Aes128GcmSha256);
        let blob = snapshot(&client).unwrap().export();

        for cut in [13, 20, blob.len() - 1] {
            assert!(
                matches!(SessionSnapshot::import(&blob[..cut]), Err(Error::InvalidToken(_))),
                "cut at {}",
                cut
            );
        }

        let mut trailing = blob.clone();
        trailing.push(0);
        assert!(matches!(
            SessionSnapshot::import(&trailing),
            Err(Error::InvalidToken(_))
        ));

        let mut duplicate = StateHeader {
            magic: STATE_MAGIC,
            version: STATE_VERSION,
            flags: 0,
            entry_count: 2,
            reserved: 0,
        }
        .serialize();
        for _ in 0..2 {
            duplicate.extend_from_slice(&[6, FieldKind::U32.id(), 1, 4, 0, 0, 0, 1, 0, 0, 0]);
        }
        assert!(matches!(
            SessionSnapshot::import(&duplicate),
            Err(Error::InvalidToken(_))
        ));
    }

    #[test]
    fn test_cursor_position_survives_export() {
        let (mut client, _server) = established_pair(CipherSuite::Aes128GcmSha256);
        let data: Vec<u8> = (0u8..37).collect();
        client
            .set("input", FieldValue::Cursor(AppDataCursor::with_position(data, 12)))
            .unwrap();

        let imported = SessionSnapshot::import(&client.export_state().unwrap()).unwrap();
        match imported.get("input") {
            Some(FieldValue::Cursor(cursor)) => {
                assert_eq!(cursor.position(), 12);
                assert_eq!(cursor.remaining().len(), 25);
            }
            other => panic!("unexpected {:?}", other),
        }
    }
}
