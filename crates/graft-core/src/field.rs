//! Typed field access over session and cipher internals.
//!
//! Every object whose state can be captured or restored exposes a fixed table
//! of named fields through [`FieldAccess`]. Values travel as [`FieldValue`],
//! whose variant must match the field's declared [`FieldKind`] exactly.

use crate::record::{AppDataCursor, HalfConn};
use crate::session::SessionState;
use crate::{Error, Result};
use std::fmt;
use std::sync::Arc;
use subtle::ConstantTimeEq;
use zeroize::Zeroizing;

/// Declared type of a named field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldKind {
    /// `bool`
    Bool,
    /// `u16`
    U16,
    /// `u32`
    U32,
    /// `u64`
    U64,
    /// UTF-8 string, empty when unset.
    Text,
    /// Optional UTF-8 string.
    OptText,
    /// Owned byte buffer.
    Bytes,
    /// List of owned byte buffers.
    ByteList,
    /// 12-byte Finished verify data.
    Finished,
    /// 16-byte record-layer scratch buffer.
    Scratch,
    /// Certificate chain.
    Chain,
    /// List of certificate chains.
    Chains,
    /// Optional shared secret.
    Secret,
    /// Per-direction record protection state.
    RecordState,
    /// Buffered application data with read position.
    Cursor,
    /// Session lifecycle state.
    State,
    /// Array of 32-bit words.
    Words,
    /// Storage that exists but cannot be referenced (e.g. the transport).
    Opaque,
}

impl FieldKind {
    /// Stable identifier used by the export format.
    pub fn id(self) -> u8 {
        match self {
            Self::Bool => 1,
            Self::U16 => 2,
            Self::U32 => 3,
            Self::U64 => 4,
            Self::Text => 5,
            Self::OptText => 6,
            Self::Bytes => 7,
            Self::ByteList => 8,
            Self::Finished => 9,
            Self::Scratch => 10,
            Self::Chain => 11,
            Self::Chains => 12,
            Self::Secret => 13,
            Self::RecordState => 14,
            Self::Cursor => 15,
            Self::State => 16,
            Self::Words => 17,
            Self::Opaque => 0xFF,
        }
    }

    /// Inverse of [`FieldKind::id`].
    pub fn from_id(id: u8) -> Option<Self> {
        Some(match id {
            1 => Self::Bool,
            2 => Self::U16,
            3 => Self::U32,
            4 => Self::U64,
            5 => Self::Text,
            6 => Self::OptText,
            7 => Self::Bytes,
            8 => Self::ByteList,
            9 => Self::Finished,
            10 => Self::Scratch,
            11 => Self::Chain,
            12 => Self::Chains,
            13 => Self::Secret,
            14 => Self::RecordState,
            15 => Self::Cursor,
            16 => Self::State,
            17 => Self::Words,
            0xFF => Self::Opaque,
            _ => return None,
        })
    }

    /// The zero value for this kind, or `None` for opaque storage.
    pub fn zero_value(self) -> Option<FieldValue> {
        Some(match self {
            Self::Bool => FieldValue::Bool(false),
            Self::U16 => FieldValue::U16(0),
            Self::U32 => FieldValue::U32(0),
            Self::U64 => FieldValue::U64(0),
            Self::Text => FieldValue::Text(String::new()),
            Self::OptText => FieldValue::OptText(None),
            Self::Bytes => FieldValue::Bytes(Vec::new()),
            Self::ByteList => FieldValue::ByteList(Vec::new()),
            Self::Finished => FieldValue::Finished([0u8; 12]),
            Self::Scratch => FieldValue::Scratch([0u8; 16]),
            Self::Chain => FieldValue::Chain(Vec::new()),
            Self::Chains => FieldValue::Chains(Vec::new()),
            Self::Secret => FieldValue::Secret(None),
            Self::RecordState => FieldValue::RecordState(HalfConn::default()),
            Self::Cursor => FieldValue::Cursor(AppDataCursor::default()),
            Self::State => FieldValue::State(SessionState::Handshaking),
            Self::Words => FieldValue::Words(Vec::new()),
            Self::Opaque => return None,
        })
    }
}

impl fmt::Display for FieldKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Bool => "bool",
            Self::U16 => "u16",
            Self::U32 => "u32",
            Self::U64 => "u64",
            Self::Text => "text",
            Self::OptText => "optional text",
            Self::Bytes => "bytes",
            Self::ByteList => "byte list",
            Self::Finished => "[u8; 12]",
            Self::Scratch => "[u8; 16]",
            Self::Chain => "certificate chain",
            Self::Chains => "certificate chains",
            Self::Secret => "secret",
            Self::RecordState => "record state",
            Self::Cursor => "read cursor",
            Self::State => "session state",
            Self::Words => "[u32]",
            Self::Opaque => "opaque",
        };
        f.write_str(name)
    }
}

/// Secret key material shared immutably once captured.
///
/// Cloning shares the underlying allocation; the bytes are zeroized when the
/// last clone drops. Equality is constant-time.
#[derive(Clone)]
pub struct Secret(Arc<Zeroizing<Vec<u8>>>);

impl Secret {
    /// Wrap secret bytes.
    pub fn new(bytes: impl Into<Vec<u8>>) -> Self {
        Self(Arc::new(Zeroizing::new(bytes.into())))
    }

    /// Borrow the secret bytes.
    pub fn expose(&self) -> &[u8] {
        &self.0
    }

    /// Length in bytes.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the secret is empty.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl PartialEq for Secret {
    fn eq(&self, other: &Self) -> bool {
        self.expose().ct_eq(other.expose()).into()
    }
}

impl Eq for Secret {}

impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Secret([REDACTED; {} bytes])", self.len())
    }
}

/// DER-encoded certificate, shared immutably.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct Certificate(Arc<[u8]>);

impl Certificate {
    /// Wrap DER bytes.
    pub fn from_der(der: impl Into<Vec<u8>>) -> Self {
        Self(Arc::from(der.into()))
    }

    /// Borrow the DER bytes.
    pub fn der(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Debug for Certificate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Certificate({} bytes)", self.0.len())
    }
}

/// A certificate chain, leaf first.
pub type CertChain = Vec<Certificate>;

/// A typed field value.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    /// See [`FieldKind::Bool`].
    Bool(bool),
    /// See [`FieldKind::U16`].
    U16(u16),
    /// See [`FieldKind::U32`].
    U32(u32),
    /// See [`FieldKind::U64`].
    U64(u64),
    /// See [`FieldKind::Text`].
    Text(String),
    /// See [`FieldKind::OptText`].
    OptText(Option<String>),
    /// See [`FieldKind::Bytes`].
    Bytes(Vec<u8>),
    /// See [`FieldKind::ByteList`].
    ByteList(Vec<Vec<u8>>),
    /// See [`FieldKind::Finished`].
    Finished([u8; 12]),
    /// See [`FieldKind::Scratch`].
    Scratch([u8; 16]),
    /// See [`FieldKind::Chain`].
    Chain(CertChain),
    /// See [`FieldKind::Chains`].
    Chains(Vec<CertChain>),
    /// See [`FieldKind::Secret`].
    Secret(Option<Secret>),
    /// See [`FieldKind::RecordState`].
    RecordState(HalfConn),
    /// See [`FieldKind::Cursor`].
    Cursor(AppDataCursor),
    /// See [`FieldKind::State`].
    State(SessionState),
    /// See [`FieldKind::Words`].
    Words(Vec<u32>),
}

impl FieldValue {
    /// Runtime kind of this value.
    pub fn kind(&self) -> FieldKind {
        match self {
            Self::Bool(_) => FieldKind::Bool,
            Self::U16(_) => FieldKind::U16,
            Self::U32(_) => FieldKind::U32,
            Self::U64(_) => FieldKind::U64,
            Self::Text(_) => FieldKind::Text,
            Self::OptText(_) => FieldKind::OptText,
            Self::Bytes(_) => FieldKind::Bytes,
            Self::ByteList(_) => FieldKind::ByteList,
            Self::Finished(_) => FieldKind::Finished,
            Self::Scratch(_) => FieldKind::Scratch,
            Self::Chain(_) => FieldKind::Chain,
            Self::Chains(_) => FieldKind::Chains,
            Self::Secret(_) => FieldKind::Secret,
            Self::RecordState(_) => FieldKind::RecordState,
            Self::Cursor(_) => FieldKind::Cursor,
            Self::State(_) => FieldKind::State,
            Self::Words(_) => FieldKind::Words,
        }
    }

    /// Whether this is the zero/false/empty value of its kind.
    pub fn is_zero(&self) -> bool {
        match self {
            Self::Bool(v) => !v,
            Self::U16(v) => *v == 0,
            Self::U32(v) => *v == 0,
            Self::U64(v) => *v == 0,
            Self::Text(v) => v.is_empty(),
            Self::OptText(v) => v.is_none(),
            Self::Bytes(v) => v.is_empty(),
            Self::ByteList(v) => v.is_empty(),
            Self::Finished(v) => v.iter().all(|b| *b == 0),
            Self::Scratch(v) => v.iter().all(|b| *b == 0),
            Self::Chain(v) => v.is_empty(),
            Self::Chains(v) => v.is_empty(),
            Self::Secret(v) => v.is_none(),
            Self::RecordState(v) => v.is_zero(),
            Self::Cursor(v) => v.is_zero(),
            Self::State(v) => *v == SessionState::Handshaking,
            Self::Words(v) => v.is_empty(),
        }
    }
}

/// Static description of one named field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldDescriptor {
    /// Field name.
    pub name: &'static str,
    /// Declared kind.
    pub kind: FieldKind,
    /// Stable identifier in the export format (0 when never exported).
    pub id: u8,
}

impl FieldDescriptor {
    /// Build a descriptor.
    pub const fn new(name: &'static str, kind: FieldKind, id: u8) -> Self {
        Self { name, kind, id }
    }

    /// Error for a value whose kind differs from the declared one.
    pub fn mismatch(&self, actual: FieldKind) -> Error {
        Error::TypeMismatch {
            field: self.name.to_string(),
            expected: self.kind.to_string(),
            actual: actual.to_string(),
        }
    }
}

/// Typed get/set over an object's named internal fields.
///
/// `get` returns an owned copy; the caller never aliases the object's
/// mutable buffers. `set` checks only that the value kind equals the declared
/// kind; it performs no semantic validation and the caller owns the
/// object's invariants.
pub trait FieldAccess {
    /// Name of the concrete type, for diagnostics.
    fn type_name(&self) -> &'static str;

    /// Every field this object exposes, in declaration order.
    fn fields(&self) -> &'static [FieldDescriptor];

    /// Read a field.
    ///
    /// # Errors
    /// `FieldNotFound` for unknown names, `NotAddressable` for opaque storage.
    fn get(&self, name: &str) -> Result<FieldValue>;

    /// Overwrite a field.
    ///
    /// # Errors
    /// `FieldNotFound` for unknown names, `TypeMismatch` when the value kind
    /// differs from the declared kind, `NotAddressable` for opaque storage.
    fn set(&mut self, name: &str, value: FieldValue) -> Result<()>;

    /// Look up a field descriptor, rejecting opaque storage.
    fn addressable(&self, name: &str) -> Result<&'static FieldDescriptor> {
        let descriptor = self
            .fields()
            .iter()
            .find(|d| d.name == name)
            .ok_or_else(|| Error::FieldNotFound(format!("{}.{}", self.type_name(), name)))?;

        if descriptor.kind == FieldKind::Opaque {
            return Err(Error::NotAddressable(format!(
                "{}.{}",
                self.type_name(),
                name
            )));
        }
        Ok(descriptor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_id_roundtrip() {
        for id in 0u8..=255 {
            if let Some(kind) = FieldKind::from_id(id) {
                assert_eq!(kind.id(), id);
            }
        }
        assert_eq!(FieldKind::from_id(0), None);
    }

    #[test]
    fn test_zero_values_are_zero() {
        for id in 1u8..=17 {
            let kind = FieldKind::from_id(id).unwrap();
            let zero = kind.zero_value().unwrap();
            assert_eq!(zero.kind(), kind);
            assert!(zero.is_zero(), "{kind} zero value not zero");
        }
        assert!(FieldKind::Opaque.zero_value().is_none());
    }

    #[test]
    fn test_non_zero_values() {
        assert!(!FieldValue::Bool(true).is_zero());
        assert!(!FieldValue::U64(1).is_zero());
        assert!(!FieldValue::Finished([0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 1]).is_zero());
        assert!(!FieldValue::Secret(Some(Secret::new(vec![]))).is_zero());
        assert!(!FieldValue::State(SessionState::Established).is_zero());
    }

    #[test]
    fn test_secret_debug_is_redacted() {
        let secret = Secret::new(vec![0xAB; 32]);
        let rendered = format!("{:?}", secret);
        assert!(!rendered.contains("ab"));
        assert!(!rendered.contains("171"));
        assert!(rendered.contains("32 bytes"));
    }

    #[test]
    fn test_secret_clone_shares_and_compares() {
        let a = Secret::new(vec![1, 2, 3]);
        let b = a.clone();
        assert_eq!(a, b);
        assert_ne!(a, Secret::new(vec![1, 2, 4]));
        assert_ne!(a, Secret::new(vec![1, 2]));
    }

    #[test]
    fn test_mismatch_error_names_field() {
        let d = FieldDescriptor::new("handshakes", FieldKind::U32, 6);
        let err = d.mismatch(FieldKind::Bool);
        assert_eq!(
            err.to_string(),
            "Type mismatch on handshakes: expected u32, got bool"
        );
    }
}
