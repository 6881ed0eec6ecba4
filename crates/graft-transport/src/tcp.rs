//! TCP transport.
//!
//! [`TcpEndpoint`] connects and accepts plain TCP streams. Sessions bind to
//! the resulting [`TcpTransport`], and an established session can be moved
//! onto a fresh connection with [`TcpEndpoint::migrate`] without repeating
//! its handshake.

use crate::{Error, Result};
use graft_core::{Session, SessionSnapshot};
use std::io::{self, Read, Write};
use std::net::{Shutdown, SocketAddr, TcpListener, TcpStream};
use std::time::Duration;
use tracing::{debug, info};

/// Socket options applied to every stream an endpoint produces.
#[derive(Debug, Clone)]
pub struct TcpConfig {
    /// Disable Nagle's algorithm.
    pub nodelay: bool,
    /// Read timeout; `None` blocks indefinitely.
    pub read_timeout: Option<Duration>,
    /// Write timeout; `None` blocks indefinitely.
    pub write_timeout: Option<Duration>,
}

impl Default for TcpConfig {
    fn default() -> Self {
        Self {
            nodelay: true,
            read_timeout: None,
            write_timeout: None,
        }
    }
}

/// Endpoint mode (client or server).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum EndpointMode {
    Client,
    Server,
}

/// TCP endpoint (client or server).
///
/// # Example
///
/// ```no_run
/// use graft_transport::tcp::TcpEndpoint;
///
/// # fn main() -> graft_transport::Result<()> {
/// let server = TcpEndpoint::server("127.0.0.1:0")?;
/// let addr = server.local_addr()?;
///
/// let client = TcpEndpoint::client();
/// let outbound = client.connect(&addr.to_string())?;
/// let inbound = server.accept()?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct TcpEndpoint {
    listener: Option<TcpListener>,
    mode: EndpointMode,
    config: TcpConfig,
}

impl TcpEndpoint {
    /// Create a client endpoint.
    pub fn client() -> Self {
        Self::client_with_config(TcpConfig::default())
    }

    /// Create a client endpoint with explicit socket options.
    pub fn client_with_config(config: TcpConfig) -> Self {
        Self {
            listener: None,
            mode: EndpointMode::Client,
            config,
        }
    }

    /// Create a server endpoint bound to `addr` (e.g. `"127.0.0.1:0"`).
    ///
    /// # Errors
    ///
    /// Returns error if the address is invalid or binding fails.
    pub fn server(addr: &str) -> Result<Self> {
        Self::server_with_config(addr, TcpConfig::default())
    }

    /// Create a server endpoint with explicit socket options.
    pub fn server_with_config(addr: &str, config: TcpConfig) -> Result<Self> {
        let addr: SocketAddr = addr
            .parse()
            .map_err(|e| Error::ConnectionFailed(format!("Invalid address: {}", e)))?;
        let listener = TcpListener::bind(addr)
            .map_err(|e| Error::ConnectionFailed(format!("Server bind failed: {}", e)))?;
        debug!(addr = ?listener.local_addr().ok(), "tcp endpoint listening");

        Ok(Self {
            listener: Some(listener),
            mode: EndpointMode::Server,
            config,
        })
    }

    /// Local address of a server endpoint.
    ///
    /// # Errors
    ///
    /// Returns error for client endpoints, which are not bound.
    pub fn local_addr(&self) -> Result<SocketAddr> {
        self.listener()?
            .local_addr()
            .map_err(|e| Error::ConnectionFailed(format!("No local address: {}", e)))
    }

    /// Socket options in effect.
    pub fn config(&self) -> &TcpConfig {
        &self.config
    }

    /// Connect to a remote server (client only).
    pub fn connect(&self, addr: &str) -> Result<TcpTransport> {
        if self.mode != EndpointMode::Client {
            return Err(Error::TransportUnavailable("Only client can connect".into()));
        }
        let addr: SocketAddr = addr
            .parse()
            .map_err(|e| Error::ConnectionFailed(format!("Invalid address: {}", e)))?;
        let stream = TcpStream::connect(addr)
            .map_err(|e| Error::ConnectionFailed(format!("Connect failed: {}", e)))?;

        let transport = TcpTransport::from_stream(stream, &self.config)?;
        debug!(peer = %transport.peer_addr(), "tcp connected");
        Ok(transport)
    }

    /// Accept one incoming connection (server only).
    pub fn accept(&self) -> Result<TcpTransport> {
        let (stream, peer) = self
            .listener()?
            .accept()
            .map_err(|e| Error::ConnectionFailed(format!("Accept failed: {}", e)))?;

        let transport = TcpTransport::from_stream(stream, &self.config)?;
        debug!(peer = %peer, "tcp accepted");
        Ok(transport)
    }

    /// Move an established session onto a new connection to `addr`.
    ///
    /// Returns the migrated session and the original session's transport.
    /// The original is retired; on failure it is dropped unchanged.
    pub fn migrate<T>(
        &self,
        session: Session<T>,
        addr: &str,
    ) -> Result<(Session<TcpTransport>, Option<T>)> {
        let transport = self.connect(addr)?;
        let peer = transport.peer_addr();
        let (migrated, old) = graft_core::migrate(session, transport)?;
        info!(peer = %peer, "session migrated to new tcp connection");
        Ok((migrated, old))
    }

    /// Accept a connection and continue `snapshot` over it.
    pub fn accept_transplant(&self, snapshot: &SessionSnapshot) -> Result<Session<TcpTransport>> {
        let transport = self.accept()?;
        Ok(graft_core::transplant(snapshot, transport)?)
    }

    /// Accept a connection and continue previously exported session state
    /// over it. See [`Session::import_state`].
    pub fn accept_import(&self, state: &[u8]) -> Result<Session<TcpTransport>> {
        let transport = self.accept()?;
        Ok(Session::import_state(state, transport)?)
    }

    fn listener(&self) -> Result<&TcpListener> {
        self.listener
            .as_ref()
            .ok_or_else(|| Error::TransportUnavailable("Only server can accept".into()))
    }
}

/// A connected TCP stream.
#[derive(Debug)]
pub struct TcpTransport {
    stream: TcpStream,
    peer: SocketAddr,
}

impl TcpTransport {
    /// Wrap a connected stream, applying `config`.
    pub fn from_stream(stream: TcpStream, config: &TcpConfig) -> Result<Self> {
        stream.set_nodelay(config.nodelay)?;
        stream.set_read_timeout(config.read_timeout)?;
        stream.set_write_timeout(config.write_timeout)?;
        let peer = stream.peer_addr()?;
        Ok(Self { stream, peer })
    }

    /// Remote address.
    pub fn peer_addr(&self) -> SocketAddr {
        self.peer
    }

    /// Local address.
    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.stream.local_addr()?)
    }

    /// Change the read timeout.
    pub fn set_read_timeout(&self, timeout: Option<Duration>) -> Result<()> {
        Ok(self.stream.set_read_timeout(timeout)?)
    }

    /// Shut down one or both halves of the connection.
    pub fn shutdown(&self, how: Shutdown) -> Result<()> {
        Ok(self.stream.shutdown(how)?)
    }

    /// Underlying stream.
    pub fn into_inner(self) -> TcpStream {
        self.stream
    }
}

impl Read for TcpTransport {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.stream.read(buf)
    }
}

impl Write for TcpTransport {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.stream.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.stream.flush()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_cannot_accept() {
        let client = TcpEndpoint::client();
        assert!(matches!(client.accept(), Err(Error::TransportUnavailable(_))));
        assert!(client.local_addr().is_err());
    }

    #[test]
    fn test_server_cannot_connect() {
        let server = TcpEndpoint::server("127.0.0.1:0").unwrap();
        let addr = server.local_addr().unwrap().to_string();
        assert!(matches!(
            server.connect(&addr),
            Err(Error::TransportUnavailable(_))
        ));
    }

    #[test]
    fn test_invalid_address() {
        assert!(matches!(
            TcpEndpoint::server("not an address"),
            Err(Error::ConnectionFailed(_))
        ));
        assert!(matches!(
            TcpEndpoint::client().connect("nowhere"),
            Err(Error::ConnectionFailed(_))
        ));
    }

    #[test]
    fn test_connect_accept_exchange() {
        let server = TcpEndpoint::server("127.0.0.1:0").unwrap();
        let addr = server.local_addr().unwrap();

        let mut outbound = TcpEndpoint::client().connect(&addr.to_string()).unwrap();
        let mut inbound = server.accept().unwrap();
        assert_eq!(outbound.peer_addr(), addr);
        assert_eq!(inbound.peer_addr(), outbound.local_addr().unwrap());

        outbound.write_all(b"over tcp").unwrap();
        let mut buf = [0u8; 8];
        inbound.read_exact(&mut buf).unwrap();
        assert_eq!(&buf, b"over tcp");
    }

    #[test]
    fn test_config_defaults() {
        let config = TcpConfig::default();
        assert!(config.nodelay);
        assert!(config.read_timeout.is_none());
        assert!(TcpEndpoint::client().config().write_timeout.is_none());
    }
}
