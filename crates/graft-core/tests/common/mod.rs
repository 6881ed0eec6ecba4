//! Loopback transport and fixtures for graft-core integration tests.

#![allow(dead_code)]

use graft_core::session::VERSION_TLS13;
use graft_core::{HandshakeOutcome, Role, Secret, Session};
use graft_crypto::CipherSuite;
use std::collections::VecDeque;
use std::io::{self, Read, Write};
use std::sync::{Arc, Mutex};

/// Pipe end that never blocks; an empty queue reads as end of stream.
pub struct Loopback {
    rx: Arc<Mutex<VecDeque<u8>>>,
    tx: Arc<Mutex<VecDeque<u8>>>,
}

pub fn loopback() -> (Loopback, Loopback) {
    let ab = Arc::new(Mutex::new(VecDeque::new()));
    let ba = Arc::new(Mutex::new(VecDeque::new()));
    (
        Loopback {
            rx: ba.clone(),
            tx: ab.clone(),
        },
        Loopback { rx: ab, tx: ba },
    )
}

impl Read for Loopback {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let mut rx = self.rx.lock().unwrap();
        let n = buf.len().min(rx.len());
        for (slot, byte) in buf.iter_mut().zip(rx.drain(..n)) {
            *slot = byte;
        }
        Ok(n)
    }
}

impl Write for Loopback {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.tx.lock().unwrap().extend(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter("graft_core=debug")
        .with_test_writer()
        .try_init();
}

pub fn outcome(suite: CipherSuite) -> HandshakeOutcome {
    let secret_len = suite.hash_algorithm().output_len();
    let mut outcome = HandshakeOutcome::new(
        VERSION_TLS13,
        suite,
        Secret::new(vec![0xA1; secret_len]),
        Secret::new(vec![0xB2; secret_len]),
    );
    outcome.exporter_secret = Some(Secret::new(vec![0xC3; secret_len]));
    outcome.server_name = "loopback.test".into();
    outcome.alpn_protocol = "h2".into();
    outcome
}

pub fn established(suite: CipherSuite) -> (Session<Loopback>, Session<Loopback>) {
    let (a, b) = loopback();
    let mut client = Session::new(Role::Client, a);
    let mut server = Session::new(Role::Server, b);
    client.complete_handshake(outcome(suite)).unwrap();
    server.complete_handshake(outcome(suite)).unwrap();
    (client, server)
}
