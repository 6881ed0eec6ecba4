//! Shared fixtures for transport integration tests.

#![allow(dead_code)]

use graft_core::field::Certificate;
use graft_core::session::VERSION_TLS13;
use graft_core::{HandshakeOutcome, Role, Secret, Session};
use graft_crypto::CipherSuite;

/// Install a test-writer subscriber once per process.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter("graft_core=debug,graft_transport=debug")
        .with_test_writer()
        .try_init();
}

/// Outcome both ends of a test connection agree on.
pub fn outcome(suite: CipherSuite) -> HandshakeOutcome {
    let mut outcome = HandshakeOutcome::new(
        VERSION_TLS13,
        suite,
        Secret::new(vec![0x1C; 48]),
        Secret::new(vec![0x5E; 48]),
    );
    outcome.exporter_secret = Some(Secret::new(vec![0xE0; 48]));
    outcome.server_name = "graft.test".into();
    outcome.alpn_protocol = "http/1.1".into();
    outcome.peer_certificates = vec![Certificate::from_der(vec![0x30, 0x82, 0x03, 0x01])];
    outcome.client_finished = [0x0C; 12];
    outcome.server_finished = [0x05; 12];
    outcome
}

/// Establish sessions for both roles over the given transports.
pub fn establish<T>(suite: CipherSuite, client: T, server: T) -> (Session<T>, Session<T>) {
    let mut c = Session::new(Role::Client, client);
    let mut s = Session::new(Role::Server, server);
    c.complete_handshake(outcome(suite))
        .expect("client handshake");
    s.complete_handshake(outcome(suite))
        .expect("server handshake");
    (c, s)
}
