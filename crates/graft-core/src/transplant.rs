//! Rebuilding sessions from snapshots onto new transports.

use crate::field::FieldAccess;
use crate::session::{Session, SessionConfig, SessionState};
use crate::snapshot::SessionSnapshot;
use crate::{Error, Result};
use std::sync::Mutex;
use tracing::{debug, info, warn};

/// Which snapshot entries are written into the target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ApplyPolicy {
    /// Write every entry marked present, including zero values.
    #[default]
    PresentBit,
    /// Write only entries whose value is non-zero.
    ///
    /// A field that legitimately holds zero/false/empty is indistinguishable
    /// from one that was never set, so the target keeps whatever it had.
    /// Only sound when the target starts zero-valued.
    SkipZeroValued,
}

/// Transplant configuration.
#[derive(Debug, Clone, Default)]
pub struct TransplantConfig {
    /// Entry selection policy.
    pub policy: ApplyPolicy,
    /// Configuration of the rebuilt session.
    pub session: SessionConfig,
}

/// Applies snapshots to targets.
#[derive(Debug, Clone, Default)]
pub struct Transplanter {
    config: TransplantConfig,
}

impl Transplanter {
    /// Transplanter with explicit configuration.
    pub fn new(config: TransplantConfig) -> Self {
        Self { config }
    }

    /// Configuration in effect.
    pub fn config(&self) -> &TransplantConfig {
        &self.config
    }

    /// Write snapshot entries into `target` per the configured policy.
    ///
    /// Returns the number of fields written. On `TypeMismatch` the target has
    /// been partially written and must be discarded.
    pub fn apply<A: FieldAccess + ?Sized>(
        &self,
        snapshot: &SessionSnapshot,
        target: &mut A,
    ) -> Result<usize> {
        let mut written = 0;
        for entry in snapshot.entries() {
            if !entry.present {
                continue;
            }
            if self.config.policy == ApplyPolicy::SkipZeroValued && entry.value.is_zero() {
                warn!(field = entry.field, "zero-valued field not applied");
                continue;
            }
            target.set(entry.field, entry.value.clone())?;
            debug!(field = entry.field, kind = %entry.value.kind(), "field applied");
            written += 1;
        }
        Ok(written)
    }

    /// Build a new session from `snapshot`, bound to `transport`.
    ///
    /// The snapshot is not consumed and may be applied again.
    pub fn transplant<T>(&self, snapshot: &SessionSnapshot, transport: T) -> Result<Session<T>> {
        let mut session = Session::unbound(self.config.session.clone());
        let written = self.apply(snapshot, &mut session)?;
        session.bind_transport(transport);

        if session.state() != SessionState::Established {
            return Err(Error::NotEstablished(session.state().to_string()));
        }

        info!(
            fields = written,
            policy = ?self.config.policy,
            suite = ?session.cipher_suite(),
            "session transplanted"
        );
        Ok(session)
    }
}

/// Transplant with the default configuration.
pub fn transplant<T>(snapshot: &SessionSnapshot, transport: T) -> Result<Session<T>> {
    Transplanter::default().transplant(snapshot, transport)
}

/// Move `session` onto `transport`, retiring the original.
///
/// Returns the new session and the old transport. The original is consumed,
/// so its sequence numbers can never be reused.
pub fn migrate<T, U>(mut session: Session<T>, transport: U) -> Result<(Session<U>, Option<T>)> {
    let snapshot = SessionSnapshot::capture(&session)?;
    let migrated = transplant(&snapshot, transport)?;
    let old = session.retire();
    Ok((migrated, old))
}

/// Move a shared session onto `transport`.
///
/// The lock is held from capture through transplant, so no other holder can
/// perform I/O in between. On success the shared session is retired and its
/// transport returned alongside the new session; on failure it is untouched.
pub fn migrate_shared<T, U>(
    shared: &Mutex<Session<T>>,
    transport: U,
) -> Result<(Session<U>, Option<T>)> {
    let mut guard = shared.lock().map_err(|_| Error::LockPoisoned)?;
    let snapshot = SessionSnapshot::capture(&*guard)?;
    let migrated = transplant(&snapshot, transport)?;
    let old = guard.retire();
    Ok((migrated, old))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::field::FieldValue;
    use crate::session::Role;
    use crate::snapshot::snapshot;
    use crate::testutil::{established_pair, pipe, Endpoint};
    use graft_crypto::CipherSuite;
    use std::sync::Arc;

    #[test]
    fn test_transplant_continues_conversation() {
        let (mut client, mut server) = established_pair(CipherSuite::Aes128GcmSha256);
        client.write(b"before").unwrap();
        let mut buf = [0u8; 16];
        let n = server.read(&mut buf).unwrap();
        assert_eq!(&buf[..n], b"before");

        let snap = snapshot(&client).unwrap();
        let transport = client.retire().unwrap();
        let mut moved = transplant(&snap, transport).unwrap();

        moved.write(b"after").unwrap();
        let n = server.read(&mut buf).unwrap();
        assert_eq!(&buf[..n], b"after");

        server.write(b"reply").unwrap();
        let n = moved.read(&mut buf).unwrap();
        assert_eq!(&buf[..n], b"reply");
    }

    #[test]
    fn test_buffered_plaintext_resumes_at_cursor() {
        let (mut client, mut server) = established_pair(CipherSuite::Aes128GcmSha256);
        let message: Vec<u8> = (0u8..37).collect();
        server.write(&message).unwrap();

        let mut head = [0u8; 12];
        assert_eq!(client.read(&mut head).unwrap(), 12);
        assert_eq!(&head[..], &message[..12]);

        let snap = snapshot(&client).unwrap();
        match snap.get("input") {
            Some(FieldValue::Cursor(cursor)) => {
                assert_eq!(cursor.position(), 12);
                assert_eq!(cursor.remaining().len(), 25);
            }
            other => panic!("expected cursor, got {:?}", other),
        }

        let (a, _) = pipe();
        let mut moved = transplant(&snap, a).unwrap();
        let mut buf = [0u8; 64];
        let n = moved.read(&mut buf).unwrap();
        assert_eq!(n, 25);
        assert_eq!(buf[0], 12);
        assert_eq!(buf[n - 1], 36);
        assert_eq!(&buf[..n], &message[12..]);
    }

    #[test]
    fn test_transplant_preserves_snapshot() {
        let (client, _server) = established_pair(CipherSuite::Aes256GcmSha384);
        let snap = snapshot(&client).unwrap();
        let (a, _) = pipe();
        let moved = transplant(&snap, a).unwrap();
        assert_eq!(snapshot(&moved).unwrap(), snap);
        assert_eq!(moved.role(), Role::Client);
        assert_eq!(moved.connection_state(), client.connection_state());
    }

    #[test]
    fn test_same_snapshot_applies_twice() {
        let (client, _server) = established_pair(CipherSuite::Aes128GcmSha256);
        let snap = snapshot(&client).unwrap();
        let (a, _) = pipe();
        let (b, _) = pipe();
        let first = transplant(&snap, a).unwrap();
        let second = transplant(&snap, b).unwrap();
        assert_eq!(snapshot(&first).unwrap(), snapshot(&second).unwrap());
    }

    #[test]
    fn test_zero_field_blind_spot() {
        let (mut reset, _s1) = established_pair(CipherSuite::Aes128GcmSha256);
        let (never, _s2) = established_pair(CipherSuite::Aes128GcmSha256);
        reset.set("retry_count", FieldValue::U32(3)).unwrap();
        reset.set("retry_count", FieldValue::U32(0)).unwrap();

        let a = snapshot(&reset).unwrap();
        let b = snapshot(&never).unwrap();
        assert_eq!(a.get("retry_count"), b.get("retry_count"));

        // A stale target keeps its stale value under the zero-skip policy.
        let mut stale = Session::<Endpoint>::unbound(SessionConfig::default());
        stale.set("retry_count", FieldValue::U32(5)).unwrap();
        let skipping = Transplanter::new(TransplantConfig {
            policy: ApplyPolicy::SkipZeroValued,
            ..Default::default()
        });
        skipping.apply(&a, &mut stale).unwrap();
        assert_eq!(stale.get("retry_count").unwrap(), FieldValue::U32(5));

        Transplanter::default().apply(&a, &mut stale).unwrap();
        assert_eq!(stale.get("retry_count").unwrap(), FieldValue::U32(0));
    }

    #[test]
    fn test_skip_zero_policy_writes_fewer_fields() {
        let (client, _server) = established_pair(CipherSuite::Aes128GcmSha256);
        let snap = snapshot(&client).unwrap();

        let mut all = Session::<Endpoint>::unbound(SessionConfig::default());
        let mut some = Session::<Endpoint>::unbound(SessionConfig::default());
        let full = Transplanter::default().apply(&snap, &mut all).unwrap();
        let partial = Transplanter::new(TransplantConfig {
            policy: ApplyPolicy::SkipZeroValued,
            ..Default::default()
        })
        .apply(&snap, &mut some)
        .unwrap();

        assert_eq!(full, snap.entries().len());
        assert!(partial < full);
        // Fresh targets end up identical either way.
        assert_eq!(snapshot(&all).unwrap(), snapshot(&some).unwrap());
    }

    #[test]
    fn test_migrate_retires_original() {
        let (client, mut server) = established_pair(CipherSuite::ChaCha20Poly1305Sha256);
        let (a, _) = pipe();
        let (mut moved, old) = migrate(client, a).unwrap();
        let old = old.unwrap();

        // Rebind the peer-facing pipe to keep talking.
        moved.bind_transport(old);
        moved.write(b"migrated").unwrap();
        let mut buf = [0u8; 16];
        let n = server.read(&mut buf).unwrap();
        assert_eq!(&buf[..n], b"migrated");
    }

    #[test]
    fn test_migrate_unestablished_fails() {
        let (a, _) = pipe();
        let (b, _) = pipe();
        let session = Session::new(Role::Client, a);
        assert!(matches!(migrate(session, b), Err(Error::NotEstablished(_))));
    }

    #[test]
    fn test_migrate_shared_under_lock() {
        let (client, mut server) = established_pair(CipherSuite::Aes128GcmSha256);
        let shared = Arc::new(Mutex::new(client));
        let (a, _) = pipe();

        let (mut moved, old) = migrate_shared(&shared, a).unwrap();
        {
            let retired = shared.lock().unwrap();
            assert_eq!(retired.state(), SessionState::Closed);
            assert!(retired.transport().is_none());
        }

        moved.bind_transport(old.unwrap());
        moved.write(b"shared").unwrap();
        let mut buf = [0u8; 16];
        let n = server.read(&mut buf).unwrap();
        assert_eq!(&buf[..n], b"shared");
    }

    #[test]
    fn test_kind_mismatch_aborts_apply() {
        let (client, _server) = established_pair(CipherSuite::Aes128GcmSha256);
        let snap = snapshot(&client).unwrap();

        struct Narrow(Session<Endpoint>);
        impl FieldAccess for Narrow {
            fn type_name(&self) -> &'static str {
                "Narrow"
            }
            fn fields(&self) -> &'static [crate::field::FieldDescriptor] {
                self.0.fields()
            }
            fn get(&self, name: &str) -> Result<FieldValue> {
                self.0.get(name)
            }
            fn set(&mut self, name: &str, value: FieldValue) -> Result<()> {
                if name == "version" {
                    return self.0.set(name, FieldValue::U32(0));
                }
                self.0.set(name, value)
            }
        }

        let mut target = Narrow(Session::unbound(SessionConfig::default()));
        assert!(matches!(
            Transplanter::default().apply(&snap, &mut target),
            Err(Error::TypeMismatch { .. })
        ));
    }
}
