//! In-process duplex pipe and pre-established session pairs for unit tests.

use crate::field::{Certificate, Secret};
use crate::session::{HandshakeOutcome, Role, Session, VERSION_TLS13};
use graft_crypto::CipherSuite;
use std::collections::VecDeque;
use std::io::{self, Read, Write};
use std::sync::{Arc, Mutex};

/// One end of a non-blocking in-memory pipe. Reads return 0 when drained.
#[derive(Clone)]
pub struct Endpoint {
    rx: Arc<Mutex<VecDeque<u8>>>,
    tx: Arc<Mutex<VecDeque<u8>>>,
}

pub fn pipe() -> (Endpoint, Endpoint) {
    let ab = Arc::new(Mutex::new(VecDeque::new()));
    let ba = Arc::new(Mutex::new(VecDeque::new()));
    (
        Endpoint {
            rx: ba.clone(),
            tx: ab.clone(),
        },
        Endpoint { rx: ab, tx: ba },
    )
}

impl Endpoint {
    /// Remove and return every byte waiting to be read on this end.
    pub fn take_incoming(&self) -> Vec<u8> {
        self.rx.lock().unwrap().drain(..).collect()
    }

    /// Queue bytes as if the peer had written them.
    pub fn push_incoming(&self, bytes: &[u8]) {
        self.rx.lock().unwrap().extend(bytes);
    }
}

impl Read for Endpoint {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let mut rx = self.rx.lock().unwrap();
        let n = buf.len().min(rx.len());
        for (slot, byte) in buf.iter_mut().zip(rx.drain(..n)) {
            *slot = byte;
        }
        Ok(n)
    }
}

impl Write for Endpoint {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.tx.lock().unwrap().extend(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

pub fn outcome(suite: CipherSuite) -> HandshakeOutcome {
    let mut outcome = HandshakeOutcome::new(
        VERSION_TLS13,
        suite,
        Secret::new(vec![0xC5; 48]),
        Secret::new(vec![0x5C; 48]),
    );
    outcome.exporter_secret = Some(Secret::new(vec![0xE7; 48]));
    outcome.resumption_secret = Some(Secret::new(vec![0x7E; 48]));
    outcome.server_name = "example.com".into();
    outcome.alpn_protocol = "h2".into();
    outcome.peer_certificates = vec![
        Certificate::from_der(vec![0x30, 0x82, 0x01, 0x0A]),
        Certificate::from_der(vec![0x30, 0x82, 0x02, 0x0B]),
    ];
    outcome.verified_chains = vec![outcome.peer_certificates.clone()];
    outcome.ocsp_response = vec![0x30, 0x03, 0x0A, 0x01, 0x00];
    outcome.scts = vec![vec![0x00, 0x01], vec![0x02]];
    outcome.client_finished = [0xC1; 12];
    outcome.server_finished = [0x5F; 12];
    outcome.client_finished_is_first = true;
    outcome
}

pub fn established_pair(suite: CipherSuite) -> (Session<Endpoint>, Session<Endpoint>) {
    let (a, b) = pipe();
    let mut client = Session::new(Role::Client, a);
    let mut server = Session::new(Role::Server, b);
    client.complete_handshake(outcome(suite)).unwrap();
    server.complete_handshake(outcome(suite)).unwrap();
    (client, server)
}
