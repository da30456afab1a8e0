//! Listening socket, peer connection and receive handling.

use std::io::{self, Read, Write};
use std::net::{Shutdown, SocketAddr, SocketAddrV4, TcpListener, TcpStream};
use std::sync::Arc;
use std::time::Duration;

use socket2::{Domain, Protocol, Socket, Type};
use tracing::{debug, info, warn};

use pcctl_config::{Config, ConfigError};

use crate::audit::AuditLog;
use crate::cancel::CancelToken;
use crate::queue::{PendingRequest, RequestQueue};

use super::{EndpointError, TRANSPORT_TARGET};

/// Reply sent after every queued command.
pub const ACKNOWLEDGEMENT: &[u8] = b"Message received\n";

const ACCEPT_BACKOFF: Duration = Duration::from_millis(25);
const ERROR_BACKOFF: Duration = Duration::from_millis(150);

/// Socket parameters for a [`CommandEndpoint`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EndpointSettings {
    /// Address to bind; port `0` picks an ephemeral port.
    pub address: SocketAddrV4,
    /// Pending-connection backlog.
    pub backlog: u32,
    /// Capacity of one receive.
    pub buffer_bytes: usize,
    /// Read timeout applied to each peer; `None` blocks.
    pub receive_timeout: Option<Duration>,
}

impl EndpointSettings {
    /// Derives settings from the daemon configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when the listen host is not an IPv4 literal.
    pub fn from_config(config: &Config) -> Result<Self, ConfigError> {
        Ok(Self {
            address: config.listen_address()?,
            backlog: config.backlog(),
            buffer_bytes: config.receive_buffer_bytes(),
            receive_timeout: config.receive_timeout(),
        })
    }
}

/// What a single [`CommandEndpoint::receive_once`] call did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReceiveOutcome {
    /// No peer is connected; nothing was read.
    NoPeer,
    /// A command was queued and acknowledged. `closed` is set when the peer
    /// was released afterwards.
    Queued {
        /// The normalised request.
        request: PendingRequest,
        /// Whether the peer was released after the acknowledgement.
        closed: bool,
    },
    /// Only whitespace arrived; nothing was queued or acknowledged.
    Empty,
    /// The peer closed the connection; it has been released.
    PeerClosed,
    /// The connection failed; the peer has been released.
    PeerLost { kind: io::ErrorKind },
    /// The read failed without affecting the connection.
    Transient { kind: io::ErrorKind },
}

impl ReceiveOutcome {
    /// Whether this receive released the peer.
    #[must_use]
    pub fn released_peer(&self) -> bool {
        matches!(
            self,
            Self::Queued { closed: true, .. } | Self::PeerClosed | Self::PeerLost { .. }
        )
    }
}

#[derive(Debug)]
struct Peer {
    stream: TcpStream,
    address: SocketAddr,
}

/// Single-peer TCP endpoint feeding a [`RequestQueue`].
#[derive(Debug)]
pub struct CommandEndpoint {
    listener: TcpListener,
    local_addr: SocketAddr,
    settings: EndpointSettings,
    peer: Option<Peer>,
    buffer: Vec<u8>,
    last_error: Option<io::ErrorKind>,
    queue: Arc<RequestQueue>,
    audit: Arc<AuditLog>,
}

impl CommandEndpoint {
    /// Creates, binds and listens on the configured address.
    ///
    /// # Errors
    ///
    /// Returns [`EndpointError`] when any socket setup step fails; the failure
    /// is also written to the audit log at CRITICAL.
    pub fn bind(
        settings: EndpointSettings,
        queue: Arc<RequestQueue>,
        audit: Arc<AuditLog>,
    ) -> Result<Self, EndpointError> {
        let listener = open_listener(&settings).inspect_err(|error| {
            audit.critical(format_args!("Socket setup failed: {error}"));
        })?;
        let local_addr = listener
            .local_addr()
            .map_err(|source| EndpointError::LocalAddr { source })?;
        info!(target: TRANSPORT_TARGET, address = %local_addr, "command endpoint listening");
        audit.info(format_args!("Server listening on {local_addr}"));
        Ok(Self {
            listener,
            local_addr,
            settings,
            peer: None,
            buffer: vec![0; settings.buffer_bytes],
            last_error: None,
            queue,
            audit,
        })
    }

    /// Address the listener is bound to.
    #[must_use]
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Address of the connected peer, if any.
    #[must_use]
    pub fn peer_addr(&self) -> Option<SocketAddr> {
        self.peer.as_ref().map(|peer| peer.address)
    }

    /// Whether a peer is connected.
    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.peer.is_some()
    }

    /// Queue receiving normalised commands.
    #[must_use]
    pub fn requests(&self) -> Arc<RequestQueue> {
        Arc::clone(&self.queue)
    }

    /// Waits for a peer to connect.
    ///
    /// Returns the already connected peer's address immediately, or `None`
    /// when `cancel` fires first.
    ///
    /// # Errors
    ///
    /// Returns [`EndpointError::Accept`] for accept failures other than
    /// interruptions and aborted handshakes.
    pub fn accept_connection(
        &mut self,
        cancel: &CancelToken,
    ) -> Result<Option<SocketAddr>, EndpointError> {
        if let Some(address) = self.peer_addr() {
            return Ok(Some(address));
        }
        let mut last_error = None::<io::ErrorKind>;
        while !cancel.is_cancelled() {
            match self.listener.accept() {
                Ok((stream, address)) => {
                    if self.attach(stream, address) {
                        return Ok(Some(address));
                    }
                }
                Err(error) if error.kind() == io::ErrorKind::WouldBlock => {
                    cancel.sleep(ACCEPT_BACKOFF);
                }
                Err(error)
                    if matches!(
                        error.kind(),
                        io::ErrorKind::Interrupted | io::ErrorKind::ConnectionAborted
                    ) =>
                {
                    let kind = error.kind();
                    if last_error != Some(kind) {
                        warn!(target: TRANSPORT_TARGET, %error, "socket accept error");
                    }
                    last_error = Some(kind);
                    cancel.sleep(ERROR_BACKOFF);
                }
                Err(source) => {
                    self.audit
                        .critical(format_args!("Failed to accept connection: {source}"));
                    return Err(EndpointError::Accept { source });
                }
            }
        }
        Ok(None)
    }

    fn attach(&mut self, stream: TcpStream, address: SocketAddr) -> bool {
        let configured = stream
            .set_nonblocking(false)
            .and_then(|()| stream.set_read_timeout(self.settings.receive_timeout));
        if let Err(error) = configured {
            warn!(
                target: TRANSPORT_TARGET,
                peer = %address,
                %error,
                "failed to configure client connection"
            );
            return false;
        }
        info!(target: TRANSPORT_TARGET, peer = %address, "client connected");
        self.audit
            .info(format_args!("Client connected from {address}"));
        self.peer = Some(Peer { stream, address });
        self.last_error = None;
        true
    }

    /// Performs one receive from the connected peer.
    ///
    /// Data is trimmed, lower-cased, queued and then acknowledged. `exit` and
    /// `quit` release the peer after the acknowledgement.
    pub fn receive_once(&mut self) -> ReceiveOutcome {
        let Some(peer) = self.peer.as_mut() else {
            return ReceiveOutcome::NoPeer;
        };
        match peer.stream.read(&mut self.buffer) {
            Ok(0) => {
                self.audit.info("Client disconnected");
                self.release_peer();
                ReceiveOutcome::PeerClosed
            }
            Ok(read) => {
                self.last_error = None;
                let request = PendingRequest::from_raw(&String::from_utf8_lossy(
                    self.buffer.get(..read).unwrap_or_default(),
                ));
                match request {
                    Some(request) => self.accept_request(request),
                    None => ReceiveOutcome::Empty,
                }
            }
            Err(error) => self.classify(&error),
        }
    }

    fn accept_request(&mut self, request: PendingRequest) -> ReceiveOutcome {
        self.queue.push(request.clone());
        self.audit
            .info(format_args!("Received request: {request}"));

        let acknowledged = match self.peer.as_mut() {
            Some(peer) => peer.stream.write_all(ACKNOWLEDGEMENT),
            None => Ok(()),
        };
        let mut closed = false;
        if let Err(error) = acknowledged {
            self.audit
                .warning(format_args!("Failed to acknowledge request: {error}"));
            self.release_peer();
            closed = true;
        } else if request.is_session_end() {
            self.audit
                .info(format_args!("Client requested {request}, closing connection"));
            self.release_peer();
            closed = true;
        }
        ReceiveOutcome::Queued { request, closed }
    }

    fn classify(&mut self, error: &io::Error) -> ReceiveOutcome {
        let kind = error.kind();
        match kind {
            io::ErrorKind::Interrupted | io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut => {
                ReceiveOutcome::Transient { kind }
            }
            io::ErrorKind::ConnectionReset
            | io::ErrorKind::ConnectionAborted
            | io::ErrorKind::BrokenPipe
            | io::ErrorKind::NotConnected
            | io::ErrorKind::UnexpectedEof => {
                self.audit
                    .warning(format_args!("Connection lost: {error}"));
                self.release_peer();
                ReceiveOutcome::PeerLost { kind }
            }
            _ => {
                if self.last_error != Some(kind) {
                    self.audit
                        .warning(format_args!("Failed to receive data: {error}"));
                    warn!(target: TRANSPORT_TARGET, %error, "receive error");
                }
                self.last_error = Some(kind);
                ReceiveOutcome::Transient { kind }
            }
        }
    }

    /// Closes the peer connection, returning its address.
    pub fn release_peer(&mut self) -> Option<SocketAddr> {
        let peer = self.peer.take()?;
        if let Err(error) = peer.stream.shutdown(Shutdown::Both) {
            debug!(target: TRANSPORT_TARGET, peer = %peer.address, %error, "peer shutdown failed");
        }
        info!(target: TRANSPORT_TARGET, peer = %peer.address, "client released");
        Some(peer.address)
    }

    /// Pops the oldest queued command without blocking.
    #[must_use]
    pub fn next_request(&self) -> Option<PendingRequest> {
        self.queue.pop()
    }
}

fn open_listener(settings: &EndpointSettings) -> Result<TcpListener, EndpointError> {
    let address = settings.address;
    let socket = Socket::new(Domain::IPV4, Type::STREAM, Some(Protocol::TCP))
        .map_err(|source| EndpointError::Create { source })?;
    socket
        .set_reuse_address(true)
        .map_err(|source| EndpointError::Create { source })?;
    socket
        .bind(&SocketAddr::V4(address).into())
        .map_err(|source| EndpointError::Bind { address, source })?;
    let backlog = i32::try_from(settings.backlog).unwrap_or(i32::MAX);
    socket
        .listen(backlog)
        .map_err(|source| EndpointError::Listen { address, source })?;
    let listener = TcpListener::from(socket);
    listener
        .set_nonblocking(true)
        .map_err(|source| EndpointError::NonBlocking { source })?;
    Ok(listener)
}
