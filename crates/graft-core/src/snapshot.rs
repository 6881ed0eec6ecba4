//! Session snapshots.
//!
//! A [`SessionSnapshot`] is an ordered, owned copy of every addressable
//! session field. Byte buffers are deep-copied, so later I/O on the source
//! session never changes a snapshot. Certificates and secrets are immutable
//! and shared by reference count.

use crate::field::{FieldAccess, FieldKind, FieldValue};
use crate::session::{SessionState, SESSION_FIELDS};
use crate::{Error, Result};
use tracing::info;

/// One captured field.
#[derive(Debug, Clone, PartialEq)]
pub struct SnapshotEntry {
    /// Field name.
    pub field: &'static str,
    /// Captured value.
    pub value: FieldValue,
    /// Whether the value was explicitly captured. Absent entries hold the
    /// zero value of their kind and are never applied.
    pub present: bool,
}

/// Ordered snapshot of a session's state.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionSnapshot {
    entries: Vec<SnapshotEntry>,
}

/// Names of the captured fields, in capture order.
pub fn snapshot_fields() -> impl Iterator<Item = &'static str> {
    SESSION_FIELDS
        .iter()
        .filter(|d| d.kind != FieldKind::Opaque)
        .map(|d| d.name)
}

impl SessionSnapshot {
    /// Capture every addressable field of an established session.
    ///
    /// # Errors
    /// `NotEstablished` unless the source is established with no recorded
    /// handshake error. `SnapshotIncomplete` naming the first field that
    /// cannot be read.
    pub fn capture<A: FieldAccess + ?Sized>(source: &A) -> Result<Self> {
        let state = read_field(source, "state")?;
        let handshake_error = read_field(source, "handshake_error")?;
        match (&state, &handshake_error) {
            (FieldValue::State(SessionState::Established), FieldValue::OptText(None)) => {}
            (FieldValue::State(SessionState::Established), FieldValue::OptText(Some(e))) => {
                return Err(Error::NotEstablished(format!("handshake failed: {}", e)))
            }
            (FieldValue::State(other), _) => return Err(Error::NotEstablished(other.to_string())),
            (other, _) => {
                return Err(Error::SnapshotIncomplete {
                    field: "state".into(),
                    reason: format!("unexpected {}", other.kind()),
                })
            }
        }

        let mut entries = Vec::with_capacity(SESSION_FIELDS.len());
        for field in snapshot_fields() {
            entries.push(SnapshotEntry {
                field,
                value: read_field(source, field)?,
                present: true,
            });
        }

        info!(
            source = source.type_name(),
            fields = entries.len(),
            "captured session snapshot"
        );
        Ok(Self { entries })
    }

    pub(crate) fn from_entries(entries: Vec<SnapshotEntry>) -> Self {
        Self { entries }
    }

    /// All entries in capture order.
    pub fn entries(&self) -> &[SnapshotEntry] {
        &self.entries
    }

    /// Value of a present entry.
    pub fn get(&self, field: &str) -> Option<&FieldValue> {
        self.entries
            .iter()
            .find(|e| e.field == field && e.present)
            .map(|e| &e.value)
    }

    /// Captured lifecycle state.
    pub fn state(&self) -> Option<SessionState> {
        match self.get("state") {
            Some(FieldValue::State(s)) => Some(*s),
            _ => None,
        }
    }

    /// Captured protocol version.
    pub fn version(&self) -> Option<u16> {
        match self.get("version") {
            Some(FieldValue::U16(v)) => Some(*v),
            _ => None,
        }
    }

    /// Captured cipher suite id.
    pub fn cipher_suite(&self) -> Option<u16> {
        match self.get("cipher_suite") {
            Some(FieldValue::U16(v)) => Some(*v),
            _ => None,
        }
    }

    /// Captured ALPN protocol.
    pub fn alpn_protocol(&self) -> Option<&str> {
        match self.get("alpn_protocol") {
            Some(FieldValue::Text(v)) => Some(v),
            _ => None,
        }
    }
}

fn read_field<A: FieldAccess + ?Sized>(source: &A, field: &'static str) -> Result<FieldValue> {
    source.get(field).map_err(|e| Error::SnapshotIncomplete {
        field: field.into(),
        reason: e.to_string(),
    })
}

/// Capture a snapshot of `session`. See [`SessionSnapshot::capture`].
pub fn snapshot<A: FieldAccess + ?Sized>(session: &A) -> Result<SessionSnapshot> {
    SessionSnapshot::capture(session)
}
