//! Session state machine and record I/O.
//!
//! A [`Session`] owns a byte-stream transport and every piece of connection
//! state needed to keep talking on it: negotiated parameters, peer identity,
//! per-direction record protection, partially read input and buffered output.
//! All of that state is reachable by name through [`FieldAccess`], which is
//! what snapshot and transplant operate on.
//!
//! The handshake itself is driven elsewhere; its result is installed with
//! [`Session::complete_handshake`].

use crate::field::{CertChain, FieldAccess, FieldDescriptor, FieldKind, FieldValue, Secret};
use crate::record::{
    AppDataCursor, ContentType, HalfConn, RecordHeader, ALERT_CLOSE_NOTIFY, ALERT_LEVEL_WARNING,
    MAX_PLAINTEXT, RECORD_HEADER_LEN,
};
use crate::{Error, Result};
use graft_crypto::kdf;
use graft_crypto::CipherSuite;
use std::fmt;
use std::io::{self, Read, Write};
use tracing::{debug, info, warn};
use zeroize::Zeroizing;

/// TLS 1.3 protocol version.
pub const VERSION_TLS13: u16 = 0x0304;

/// TLS 1.2 protocol version.
pub const VERSION_TLS12: u16 = 0x0303;

/// Byte-stream transport a session runs over.
pub trait Transport: Read + Write {}

impl<T: Read + Write> Transport for T {}

/// Session configuration.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Largest plaintext fragment per outgoing record (capped at 16384).
    pub max_plaintext: usize,
    /// Consecutive empty records tolerated before the read fails.
    pub max_empty_records: u32,
    /// Bytes requested from the transport per read call.
    pub read_chunk: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            max_plaintext: MAX_PLAINTEXT,
            max_empty_records: 16,
            read_chunk: 4096,
        }
    }
}

/// Session role.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    /// Client role.
    Client,
    /// Server role.
    Server,
}

/// Session lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(u8)]
pub enum SessionState {
    /// Handshake not yet complete.
    #[default]
    Handshaking = 0,
    /// Application data may flow.
    Established = 1,
    /// close_notify is being sent.
    Closing = 2,
    /// No further I/O.
    Closed = 3,
}

impl SessionState {
    /// Convert to wire format.
    pub fn to_u8(self) -> u8 {
        self as u8
    }

    /// Convert from wire format.
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(Self::Handshaking),
            1 => Some(Self::Established),
            2 => Some(Self::Closing),
            3 => Some(Self::Closed),
            _ => None,
        }
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Handshaking => "handshaking",
            Self::Established => "established",
            Self::Closing => "closing",
            Self::Closed => "closed",
        })
    }
}

/// Negotiated parameters and secrets produced by a completed handshake.
#[derive(Debug, Clone)]
pub struct HandshakeOutcome {
    /// Negotiated protocol version.
    pub version: u16,
    /// Negotiated cipher suite.
    pub cipher_suite: CipherSuite,
    /// Client application traffic secret.
    pub client_traffic_secret: Secret,
    /// Server application traffic secret.
    pub server_traffic_secret: Secret,
    /// Exporter master secret.
    pub exporter_secret: Option<Secret>,
    /// Resumption master secret.
    pub resumption_secret: Option<Secret>,
    /// Whether an earlier session was resumed.
    pub did_resume: bool,
    /// SNI host name.
    pub server_name: String,
    /// Negotiated ALPN protocol.
    pub alpn_protocol: String,
    /// Certificates presented by the peer.
    pub peer_certificates: CertChain,
    /// Chains that verified against the trust store.
    pub verified_chains: Vec<CertChain>,
    /// Stapled OCSP response.
    pub ocsp_response: Vec<u8>,
    /// Signed certificate timestamps.
    pub scts: Vec<Vec<u8>>,
    /// Whether secure renegotiation was negotiated.
    pub secure_renegotiation: bool,
    /// Client Finished verify data.
    pub client_finished: [u8; 12],
    /// Server Finished verify data.
    pub server_finished: [u8; 12],
    /// Whether the client's Finished was sent first.
    pub client_finished_is_first: bool,
}

impl HandshakeOutcome {
    /// Outcome carrying only the traffic secrets; everything else empty.
    pub fn new(
        version: u16,
        cipher_suite: CipherSuite,
        client_traffic_secret: Secret,
        server_traffic_secret: Secret,
    ) -> Self {
        Self {
            version,
            cipher_suite,
            client_traffic_secret,
            server_traffic_secret,
            exporter_secret: None,
            resumption_secret: None,
            did_resume: false,
            server_name: String::new(),
            alpn_protocol: String::new(),
            peer_certificates: Vec::new(),
            verified_chains: Vec::new(),
            ocsp_response: Vec::new(),
            scts: Vec::new(),
            secure_renegotiation: false,
            client_finished: [0u8; 12],
            server_finished: [0u8; 12],
            client_finished_is_first: false,
        }
    }
}

/// Public view of negotiated connection parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct ConnectionState {
    /// Negotiated protocol version.
    pub version: u16,
    /// Negotiated suite, if known.
    pub cipher_suite: Option<CipherSuite>,
    /// Whether the handshake completed.
    pub handshake_complete: bool,
    /// Whether the session was resumed.
    pub did_resume: bool,
    /// SNI host name.
    pub server_name: String,
    /// Negotiated ALPN protocol.
    pub negotiated_protocol: String,
    /// Peer certificates.
    pub peer_certificates: CertChain,
    /// Verified chains.
    pub verified_chains: Vec<CertChain>,
    /// Stapled OCSP response.
    pub ocsp_response: Vec<u8>,
    /// Signed certificate timestamps.
    pub scts: Vec<Vec<u8>>,
    /// First Finished message of the handshake.
    pub tls_unique: [u8; 12],
}

/// Field table for [`Session`]. Ids are stable in the export format.
pub static SESSION_FIELDS: [FieldDescriptor; 34] = [
    FieldDescriptor::new("is_client", FieldKind::Bool, 1),
    FieldDescriptor::new("state", FieldKind::State, 2),
    FieldDescriptor::new("handshake_error", FieldKind::OptText, 3),
    FieldDescriptor::new("version", FieldKind::U16, 4),
    FieldDescriptor::new("have_version", FieldKind::Bool, 5),
    FieldDescriptor::new("handshakes", FieldKind::U32, 6),
    FieldDescriptor::new("did_resume", FieldKind::Bool, 7),
    FieldDescriptor::new("cipher_suite", FieldKind::U16, 8),
    FieldDescriptor::new("ocsp_response", FieldKind::Bytes, 9),
    FieldDescriptor::new("scts", FieldKind::ByteList, 10),
    FieldDescriptor::new("peer_certificates", FieldKind::Chain, 11),
    FieldDescriptor::new("verified_chains", FieldKind::Chains, 12),
    FieldDescriptor::new("server_name", FieldKind::Text, 13),
    FieldDescriptor::new("secure_renegotiation", FieldKind::Bool, 14),
    FieldDescriptor::new("exporter_secret", FieldKind::Secret, 15),
    FieldDescriptor::new("resumption_secret", FieldKind::Secret, 16),
    FieldDescriptor::new("client_finished_is_first", FieldKind::Bool, 17),
    FieldDescriptor::new("close_notify_error", FieldKind::OptText, 18),
    FieldDescriptor::new("close_notify_sent", FieldKind::Bool, 19),
    FieldDescriptor::new("client_finished", FieldKind::Finished, 20),
    FieldDescriptor::new("server_finished", FieldKind::Finished, 21),
    FieldDescriptor::new("alpn_protocol", FieldKind::Text, 22),
    FieldDescriptor::new("in", FieldKind::RecordState, 23),
    FieldDescriptor::new("out", FieldKind::RecordState, 24),
    FieldDescriptor::new("raw_input", FieldKind::Bytes, 25),
    FieldDescriptor::new("input", FieldKind::Cursor, 26),
    FieldDescriptor::new("hand", FieldKind::Bytes, 27),
    FieldDescriptor::new("buffering", FieldKind::Bool, 28),
    FieldDescriptor::new("send_buf", FieldKind::Bytes, 29),
    FieldDescriptor::new("bytes_sent", FieldKind::U64, 30),
    FieldDescriptor::new("packets_sent", FieldKind::U64, 31),
    FieldDescriptor::new("retry_count", FieldKind::U32, 32),
    FieldDescriptor::new("scratch", FieldKind::Scratch, 33),
    FieldDescriptor::new("transport", FieldKind::Opaque, 0),
];

/// A record-layer session over transport `T`.
pub struct Session<T> {
    config: SessionConfig,
    transport: Option<T>,

    is_client: bool,
    state: SessionState,
    handshake_error: Option<String>,
    version: u16,
    have_version: bool,
    handshakes: u32,
    did_resume: bool,
    cipher_suite: u16,

    ocsp_response: Vec<u8>,
    scts: Vec<Vec<u8>>,
    peer_certificates: CertChain,
    verified_chains: Vec<CertChain>,
    server_name: String,
    secure_renegotiation: bool,

    exporter_secret: Option<Secret>,
    resumption_secret: Option<Secret>,

    client_finished_is_first: bool,
    close_notify_error: Option<String>,
    close_notify_sent: bool,
    client_finished: [u8; 12],
    server_finished: [u8; 12],
    alpn_protocol: String,

    input_half: HalfConn,
    output_half: HalfConn,
    raw_input: Vec<u8>,
    input: AppDataCursor,
    hand: Vec<u8>,
    buffering: bool,
    send_buf: Vec<u8>,
    bytes_sent: u64,
    packets_sent: u64,
    retry_count: u32,
    scratch: [u8; 16],

    fatal_error: Option<String>,
}

impl<T> Session<T> {
    /// Create a session in the `Handshaking` state.
    pub fn new(role: Role, transport: T) -> Self {
        Self::with_config(role, transport, SessionConfig::default())
    }

    /// Create a session with custom configuration.
    pub fn with_config(role: Role, transport: T, config: SessionConfig) -> Self {
        let mut session = Self::unbound(config);
        session.is_client = role == Role::Client;
        session.transport = Some(transport);
        session
    }

    /// A zero-valued session with no transport, ready to receive fields.
    pub fn unbound(config: SessionConfig) -> Self {
        Self {
            config,
            transport: None,
            is_client: false,
            state: SessionState::Handshaking,
            handshake_error: None,
            version: 0,
            have_version: false,
            handshakes: 0,
            did_resume: false,
            cipher_suite: 0,
            ocsp_response: Vec::new(),
            scts: Vec::new(),
            peer_certificates: Vec::new(),
            verified_chains: Vec::new(),
            server_name: String::new(),
            secure_renegotiation: false,
            exporter_secret: None,
            resumption_secret: None,
            client_finished_is_first: false,
            close_notify_error: None,
            close_notify_sent: false,
            client_finished: [0u8; 12],
            server_finished: [0u8; 12],
            alpn_protocol: String::new(),
            input_half: HalfConn::default(),
            output_half: HalfConn::default(),
            raw_input: Vec::new(),
            input: AppDataCursor::default(),
            hand: Vec::new(),
            buffering: false,
            send_buf: Vec::new(),
            bytes_sent: 0,
            packets_sent: 0,
            retry_count: 0,
            scratch: [0u8; 16],
            fatal_error: None,
        }
    }

    /// Error that closed the session mid-stream, if any.
    pub fn fatal_error(&self) -> Option<&str> {
        self.fatal_error.as_deref()
    }

    /// Session role.
    pub fn role(&self) -> Role {
        if self.is_client {
            Role::Client
        } else {
            Role::Server
        }
    }

    /// Lifecycle state.
    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Check if session is established.
    pub fn is_established(&self) -> bool {
        self.state == SessionState::Established
    }

    /// Configuration in effect.
    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Negotiated suite, if the stored id is recognized.
    pub fn cipher_suite(&self) -> Option<CipherSuite> {
        CipherSuite::from_u16(self.cipher_suite)
    }

    /// Negotiated ALPN protocol.
    pub fn alpn_protocol(&self) -> &str {
        &self.alpn_protocol
    }

    /// Record bytes written to the transport.
    pub fn bytes_sent(&self) -> u64 {
        self.bytes_sent
    }

    /// Transport writes performed.
    pub fn packets_sent(&self) -> u64 {
        self.packets_sent
    }

    /// Consecutive empty records seen.
    pub fn retry_count(&self) -> u32 {
        self.retry_count
    }

    /// Post-handshake messages received and not yet consumed.
    pub fn handshake_messages(&self) -> &[u8] {
        &self.hand
    }

    /// Whether output is currently being coalesced.
    pub fn is_buffering(&self) -> bool {
        self.buffering
    }

    /// Bound transport.
    pub fn transport(&self) -> Option<&T> {
        self.transport.as_ref()
    }

    /// Bound transport, mutably.
    pub fn transport_mut(&mut self) -> Option<&mut T> {
        self.transport.as_mut()
    }

    /// Bind `transport`, returning the previously bound one.
    pub fn bind_transport(&mut self, transport: T) -> Option<T> {
        self.transport.replace(transport)
    }

    /// Detach and return the transport.
    pub fn take_transport(&mut self) -> Option<T> {
        self.transport.take()
    }

    /// Coalesce outgoing records into the send buffer until [`Session::flush`].
    pub fn set_buffering(&mut self, on: bool) {
        self.buffering = on;
    }

    /// Install the result of a completed handshake.
    pub fn complete_handshake(&mut self, outcome: HandshakeOutcome) -> Result<()> {
        if self.state != SessionState::Handshaking {
            return Err(Error::InvalidState);
        }

        let suite = outcome.cipher_suite;
        let client =
            HalfConn::from_traffic_secret(suite, outcome.client_traffic_secret.expose())?;
        let server =
            HalfConn::from_traffic_secret(suite, outcome.server_traffic_secret.expose())?;
        let (input_half, output_half) = if self.is_client {
            (server, client)
        } else {
            (client, server)
        };

        self.input_half = input_half;
        self.output_half = output_half;
        self.version = outcome.version;
        self.have_version = true;
        self.cipher_suite = suite.to_u16();
        self.did_resume = outcome.did_resume;
        self.server_name = outcome.server_name;
        self.alpn_protocol = outcome.alpn_protocol;
        self.peer_certificates = outcome.peer_certificates;
        self.verified_chains = outcome.verified_chains;
        self.ocsp_response = outcome.ocsp_response;
        self.scts = outcome.scts;
        self.secure_renegotiation = outcome.secure_renegotiation;
        self.client_finished = outcome.client_finished;
        self.server_finished = outcome.server_finished;
        self.client_finished_is_first = outcome.client_finished_is_first;
        self.exporter_secret = outcome.exporter_secret;
        self.resumption_secret = outcome.resumption_secret;
        self.handshakes = self.handshakes.saturating_add(1);
        self.state = SessionState::Established;

        info!(
            role = ?self.role(),
            version = self.version,
            suite = ?suite,
            resumed = self.did_resume,
            "handshake complete"
        );
        Ok(())
    }

    /// Record a handshake failure; the session can no longer be used.
    pub fn fail_handshake(&mut self, reason: impl Into<String>) {
        let reason = reason.into();
        warn!(reason = %reason, "handshake failed");
        self.handshake_error = Some(reason);
        self.state = SessionState::Closed;
    }

    /// Negotiated connection parameters.
    pub fn connection_state(&self) -> ConnectionState {
        ConnectionState {
            version: self.version,
            cipher_suite: self.cipher_suite(),
            handshake_complete: self.handshakes > 0 && self.handshake_error.is_none(),
            did_resume: self.did_resume,
            server_name: self.server_name.clone(),
            negotiated_protocol: self.alpn_protocol.clone(),
            peer_certificates: self.peer_certificates.clone(),
            verified_chains: self.verified_chains.clone(),
            ocsp_response: self.ocsp_response.clone(),
            scts: self.scts.clone(),
            tls_unique: if self.client_finished_is_first {
                self.client_finished
            } else {
                self.server_finished
            },
        }
    }

    /// Derive keying material bound to this session (RFC 8446 §7.5).
    pub fn export_keying_material(
        &self,
        label: &[u8],
        context: &[u8],
        len: usize,
    ) -> Result<Zeroizing<Vec<u8>>> {
        self.require_established()?;
        let secret = self
            .exporter_secret
            .as_ref()
            .ok_or(Error::MissingSecret("exporter_secret"))?;
        let suite = CipherSuite::from_u16(self.cipher_suite)
            .ok_or(graft_crypto::Error::InvalidCipherSuite(self.cipher_suite))?;

        Ok(kdf::export_keying_material(
            suite.hash_algorithm(),
            secret.expose(),
            label,
            context,
            len,
        )?)
    }

    /// Mark the session closed and release its buffers and transport.
    ///
    /// Used once the session's state has been moved elsewhere; the record
    /// sequence numbers must never be used again from this object.
    pub fn retire(&mut self) -> Option<T> {
        self.state = SessionState::Closed;
        self.input = AppDataCursor::default();
        self.raw_input.clear();
        self.hand.clear();
        self.send_buf.clear();
        self.input_half = HalfConn::default();
        self.output_half = HalfConn::default();
        self.exporter_secret = None;
        self.resumption_secret = None;
        debug!("session retired");
        self.transport.take()
    }

    fn require_established(&self) -> Result<()> {
        if self.state != SessionState::Established {
            return Err(Error::NotEstablished(self.state.to_string()));
        }
        Ok(())
    }
}

impl<T: Transport> Session<T> {
    /// Read decrypted application data.
    ///
    /// Buffered plaintext is delivered before any new record is read.
    /// Returns `Ok(0)` once the peer sends close_notify or the transport
    /// reaches end of stream on a record boundary.
    pub fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
        match self.state {
            SessionState::Established | SessionState::Closing => {}
            other => return Err(Error::NotEstablished(other.to_string())),
        }
        if buf.is_empty() {
            return Ok(0);
        }

        while self.input.is_empty() {
            match self.read_record() {
                Ok(true) => {}
                Ok(false) => return Ok(0),
                Err(e) if is_transport_error(&e) => return Err(e),
                Err(e) => return Err(self.abort(e)),
            }
        }
        Ok(self.input.read(buf))
    }

    /// Encrypt and send application data, fragmenting as needed.
    pub fn write(&mut self, data: &[u8]) -> Result<usize> {
        self.require_established()?;

        let fragment = self.config.max_plaintext.clamp(1, MAX_PLAINTEXT);
        for chunk in data.chunks(fragment) {
            self.write_record(ContentType::ApplicationData, chunk)?;
        }
        Ok(data.len())
    }

    /// Send any buffered records and flush the transport.
    ///
    /// A failed send closes the session: how much of the buffer reached the
    /// peer is unknown, so it can be neither resent nor dropped.
    pub fn flush(&mut self) -> Result<()> {
        if !self.send_buf.is_empty() {
            if self.transport.is_none() {
                return Err(Error::NoTransport);
            }
            let pending = std::mem::take(&mut self.send_buf);
            if let Err(e) = self.send(&pending) {
                return Err(self.abort(e));
            }
        }
        if let Some(transport) = self.transport.as_mut() {
            transport.flush()?;
        }
        Ok(())
    }

    /// Send close_notify and close the session.
    pub fn close(&mut self) -> Result<()> {
        match self.state {
            SessionState::Closing | SessionState::Closed => return Ok(()),
            SessionState::Handshaking => {
                self.state = SessionState::Closed;
                return Ok(());
            }
            SessionState::Established => {}
        }

        self.state = SessionState::Closing;
        let result = self
            .write_record(
                ContentType::Alert,
                &[ALERT_LEVEL_WARNING, ALERT_CLOSE_NOTIFY],
            )
            .and_then(|()| self.flush());

        self.close_notify_sent = true;
        if let Err(e) = &result {
            warn!(error = %e, "close_notify failed");
            self.close_notify_error = Some(e.to_string());
        }
        self.state = SessionState::Closed;
        info!(bytes_sent = self.bytes_sent, "session closed");
        result
    }

    fn write_record(&mut self, content_type: ContentType, payload: &[u8]) -> Result<()> {
        if !self.buffering && self.transport.is_none() {
            return Err(Error::NoTransport);
        }
        let record = self
            .output_half
            .seal(content_type, payload, &mut self.scratch)?;
        if self.buffering {
            self.send_buf.extend_from_slice(&record);
            Ok(())
        } else {
            // The record consumed a sequence number; losing it desynchronizes
            // the stream.
            self.send(&record).map_err(|e| self.abort(e))
        }
    }

    /// Close the session after an error that leaves its record state
    /// unusable, so it can no longer be captured or transplanted.
    fn abort(&mut self, error: Error) -> Error {
        if matches!(
            self.state,
            SessionState::Established | SessionState::Closing
        ) {
            warn!(error = %error, "session aborted");
            self.fatal_error = Some(error.to_string());
            self.state = SessionState::Closed;
        }
        error
    }

    fn send(&mut self, bytes: &[u8]) -> Result<()> {
        let transport = self.transport.as_mut().ok_or(Error::NoTransport)?;
        transport.write_all(bytes)?;
        self.bytes_sent += bytes.len() as u64;
        self.packets_sent += 1;
        Ok(())
    }

    /// Pull one chunk from the transport into `raw_input`.
    fn fill(&mut self) -> Result<usize> {
        let transport = self.transport.as_mut().ok_or(Error::NoTransport)?;
        let start = self.raw_input.len();
        self.raw_input
            .resize(start + self.config.read_chunk.max(RECORD_HEADER_LEN), 0);

        let read = loop {
            match transport.read(&mut self.raw_input[start..]) {
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                other => break other,
            }
        };
        match read {
            Ok(n) => {
                self.raw_input.truncate(start + n);
                Ok(n)
            }
            Err(e) => {
                self.raw_input.truncate(start);
                Err(e.into())
            }
        }
    }

    /// Read and process one record. Returns `false` at end of stream.
    fn read_record(&mut self) -> Result<bool> {
        let header = loop {
            if let Some(header) = RecordHeader::parse(&self.raw_input)? {
                break header;
            }
            if self.fill()? == 0 {
                if self.raw_input.is_empty() {
                    return Ok(false);
                }
                return Err(io::Error::new(
                    io::ErrorKind::UnexpectedEof,
                    "end of stream inside record header",
                )
                .into());
            }
        };

        let total = RECORD_HEADER_LEN + header.length as usize;
        while self.raw_input.len() < total {
            if self.fill()? == 0 {
                return Err(io::Error::new(
                    io::ErrorKind::UnexpectedEof,
                    "end of stream inside record body",
                )
                .into());
            }
        }

        let record: Vec<u8> = self.raw_input.drain(..total).collect();
        let plaintext = self
            .input_half
            .open(&record[..RECORD_HEADER_LEN], &record[RECORD_HEADER_LEN..])?;

        match header.content_type {
            ContentType::ApplicationData => {
                if plaintext.is_empty() {
                    self.note_empty_record()?;
                } else {
                    self.retry_count = 0;
                    self.input = AppDataCursor::new(plaintext.to_vec());
                }
            }
            ContentType::Handshake => {
                self.retry_count = 0;
                self.hand.extend_from_slice(&plaintext);
            }
            ContentType::ChangeCipherSpec => self.note_empty_record()?,
            ContentType::Alert => {
                if plaintext.len() != 2 {
                    return Err(Error::Record("Malformed alert".into()));
                }
                if plaintext[1] == ALERT_CLOSE_NOTIFY {
                    debug!("peer sent close_notify");
                    return Ok(false);
                }
                return Err(Error::AlertReceived(plaintext[1]));
            }
        }
        Ok(true)
    }

    fn note_empty_record(&mut self) -> Result<()> {
        self.retry_count += 1;
        if self.retry_count > self.config.max_empty_records {
            return Err(Error::TooManyEmptyRecords);
        }
        Ok(())
    }
}

/// Transport failures, including end of stream mid-record. No record has
/// been consumed, so the session stays usable on another transport.
fn is_transport_error(error: &Error) -> bool {
    matches!(error, Error::Io(_) | Error::NoTransport)
}

impl<T: Transport> Read for Session<T> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        Ok(Session::read(self, buf)?)
    }
}

impl<T: Transport> Write for Session<T> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        Ok(Session::write(self, buf)?)
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(Session::flush(self)?)
    }
}

impl<T> fmt::Debug for Session<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("role", &self.role())
            .field("state", &self.state)
            .field("version", &format_args!("0x{:04X}", self.version))
            .field("cipher_suite", &format_args!("0x{:04X}", self.cipher_suite))
            .field("bound", &self.transport.is_some())
            .finish_non_exhaustive()
    }
}

impl<T> FieldAccess for Session<T> {
    fn type_name(&self) -> &'static str {
        "Session"
    }

    fn fields(&self) -> &'static [FieldDescriptor] {
        &SESSION_FIELDS
    }

    fn get(&self, name: &str) -> Result<FieldValue> {
        let descriptor = self.addressable(name)?;
        Ok(match descriptor.name {
            "is_client" => FieldValue::Bool(self.is_client),
            "state" => FieldValue::State(self.state),
            "handshake_error" => FieldValue::OptText(self.handshake_error.clone()),
            "version" => FieldValue::U16(self.version),
            "have_version" => FieldValue::Bool(self.have_version),
            "handshakes" => FieldValue::U32(self.handshakes),
            "did_resume" => FieldValue::Bool(self.did_resume),
            "cipher_suite" => FieldValue::U16(self.cipher_suite),
            "ocsp_response" => FieldValue::Bytes(self.ocsp_response.clone()),
            "scts" => FieldValue::ByteList(self.scts.clone()),
            "peer_certificates" => FieldValue::Chain(self.peer_certificates.clone()),
            "verified_chains" => FieldValue::Chains(self.verified_chains.clone()),
            "server_name" => FieldValue::Text(self.server_name.clone()),
            "secure_renegotiation" => FieldValue::Bool(self.secure_renegotiation),
            "exporter_secret" => FieldValue::Secret(self.exporter_secret.clone()),
            "resumption_secret" => FieldValue::Secret(self.resumption_secret.clone()),
            "client_finished_is_first" => FieldValue::Bool(self.client_finished_is_first),
            "close_notify_error" => FieldValue::OptText(self.close_notify_error.clone()),
            "close_notify_sent" => FieldValue::Bool(self.close_notify_sent),
            "client_finished" => FieldValue::Finished(self.client_finished),
            "server_finished" => FieldValue::Finished(self.server_finished),
            "alpn_protocol" => FieldValue::Text(self.alpn_protocol.clone()),
            "in" => FieldValue::RecordState(self.input_half.clone()),
            "out" => FieldValue::RecordState(self.output_half.clone()),
            "raw_input" => FieldValue::Bytes(self.raw_input.clone()),
            "input" => FieldValue::Cursor(self.input.clone()),
            "hand" => FieldValue::Bytes(self.hand.clone()),
            "buffering" => FieldValue::Bool(self.buffering),
            "send_buf" => FieldValue::Bytes(self.send_buf.clone()),
            "bytes_sent" => FieldValue::U64(self.bytes_sent),
            "packets_sent" => FieldValue::U64(self.packets_sent),
            "retry_count" => FieldValue::U32(self.retry_count),
            "scratch" => FieldValue::Scratch(self.scratch),
            other => return Err(Error::FieldNotFound(format!("Session.{}", other))),
        })
    }

    fn set(&mut self, name: &str, value: FieldValue) -> Result<()> {
        let descriptor = self.addressable(name)?;
        match (descriptor.name, value) {
            ("is_client", FieldValue::Bool(v)) => self.is_client = v,
            ("state", FieldValue::State(v)) => self.state = v,
            ("handshake_error", FieldValue::OptText(v)) => self.handshake_error = v,
            ("version", FieldValue::U16(v)) => self.version = v,
            ("have_version", FieldValue::Bool(v)) => self.have_version = v,
            ("handshakes", FieldValue::U32(v)) => self.handshakes = v,
            ("did_resume", FieldValue::Bool(v)) => self.did_resume = v,
            ("cipher_suite", FieldValue::U16(v)) => self.cipher_suite = v,
            ("ocsp_response", FieldValue::Bytes(v)) => self.ocsp_response = v,
            ("scts", FieldValue::ByteList(v)) => self.scts = v,
            ("peer_certificates", FieldValue::Chain(v)) => self.peer_certificates = v,
            ("verified_chains", FieldValue::Chains(v)) => self.verified_chains = v,
            ("server_name", FieldValue::Text(v)) => self.server_name = v,
            ("secure_renegotiation", FieldValue::Bool(v)) => self.secure_renegotiation = v,
            ("exporter_secret", FieldValue::Secret(v)) => self.exporter_secret = v,
            ("resumption_secret", FieldValue::Secret(v)) => self.resumption_secret = v,
            ("client_finished_is_first", FieldValue::Bool(v)) => {
                self.client_finished_is_first = v
            }
            ("close_notify_error", FieldValue::OptText(v)) => self.close_notify_error = v,
            ("close_notify_sent", FieldValue::Bool(v)) => self.close_notify_sent = v,
            ("client_finished", FieldValue::Finished(v)) => self.client_finished = v,
            ("server_finished", FieldValue::Finished(v)) => self.server_finished = v,
            ("alpn_protocol", FieldValue::Text(v)) => self.alpn_protocol = v,
            ("in", FieldValue::RecordState(v)) => self.input_half = v,
            ("out", FieldValue::RecordState(v)) => self.output_half = v,
            ("raw_input", FieldValue::Bytes(v)) => self.raw_input = v,
            ("input", FieldValue::Cursor(v)) => self.input = v,
            ("hand", FieldValue::Bytes(v)) => self.hand = v,
            ("buffering", FieldValue::Bool(v)) => self.buffering = v,
            ("send_buf", FieldValue::Bytes(v)) => self.send_buf = v,
            ("bytes_sent", FieldValue::U64(v)) => self.bytes_sent = v,
            ("packets_sent", FieldValue::U64(v)) => self.packets_sent = v,
            ("retry_count", FieldValue::U32(v)) => self.retry_count = v,
            ("scratch", FieldValue::Scratch(v)) => self.scratch = v,
            (_, other) => return Err(descriptor.mismatch(other.kind())),
        }
        Ok(())
    }
}
