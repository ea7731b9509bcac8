//! TCP transport: a listener and the per-peer connection it produces.

use std::io::{self, Read};
use std::net::SocketAddr;

use openlobby_protocol::Frame;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

use crate::{Connection, ConnectionId, FrameAssembler, TransportError};

/// Listens for incoming TCP connections.
pub struct TcpTransport {
    listener: TcpListener,
}

impl TcpTransport {
    /// Binds a listener to `addr`. Port 0 picks a free port.
    pub async fn bind(addr: SocketAddr) -> Result<Self, TransportError> {
        let listener = TcpListener::bind(addr)
            .await
            .map_err(TransportError::AcceptFailed)?;
        let local = listener
            .local_addr()
            .map_err(TransportError::AcceptFailed)?;
        tracing::info!(addr = %local, "TCP transport listening");
        Ok(Self { listener })
    }

    /// Waits for and accepts the next incoming connection.
    pub async fn accept(&self) -> Result<TcpConnection, TransportError> {
        let (stream, addr) = self
            .listener
            .accept()
            .await
            .map_err(TransportError::AcceptFailed)?;
        stream
            .set_nodelay(true)
            .map_err(TransportError::AcceptFailed)?;

        let conn = TcpConnection::from_stream(stream, addr);
        tracing::debug!(id = %conn.id, %addr, "accepted TCP connection");
        Ok(conn)
    }

    /// The address the listener is bound to.
    pub fn local_addr(&self) -> Result<SocketAddr, TransportError> {
        self.listener
            .local_addr()
            .map_err(TransportError::AcceptFailed)
    }
}

/// A single TCP connection, accepted or dialled.
pub struct TcpConnection {
    id: ConnectionId,
    remote_addr: SocketAddr,
    stream: TcpStream,
    assembler: FrameAssembler,
    closed: bool,
}

impl TcpConnection {
    fn from_stream(stream: TcpStream, remote_addr: SocketAddr) -> Self {
        Self {
            id: ConnectionId::next(),
            remote_addr,
            stream,
            assembler: FrameAssembler::new(),
            closed: false,
        }
    }

    /// Dials `addr`.
    pub async fn connect(addr: SocketAddr) -> Result<Self, TransportError> {
        let stream = TcpStream::connect(addr)
            .await
            .map_err(TransportError::ConnectFailed)?;
        stream
            .set_nodelay(true)
            .map_err(TransportError::ConnectFailed)?;
        Ok(Self::from_stream(stream, addr))
    }

    /// This side's address.
    pub fn local_addr(&self) -> Result<SocketAddr, TransportError> {
        self.stream
            .local_addr()
            .map_err(TransportError::ReceiveFailed)
    }

    /// `true` once [`Connection::disconnect`] has run.
    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Waits until exactly `n` bytes have arrived and returns them.
    ///
    /// Fails with [`TransportError::FrameInProgress`] if a polled frame is
    /// half assembled, since those bytes belong to it.
    pub async fn receive_exact(
        &mut self,
        n: usize,
    ) -> Result<Vec<u8>, TransportError> {
        if !self.assembler.is_idle() {
            return Err(TransportError::FrameInProgress);
        }
        self.ensure_open()?;

        let mut buf = vec![0u8; n];
        let mut filled = 0;
        while filled < n {
            match self.stream.read(&mut buf[filled..]).await {
                Ok(0) => {
                    return Err(TransportError::ConnectionClosed(format!(
                        "stream ended after {filled} of {n} bytes"
                    )));
                }
                Ok(read) => filled += read,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(TransportError::ReceiveFailed(e)),
            }
        }
        Ok(buf)
    }

    /// Waits for the next complete frame.
    pub async fn recv_frame(&mut self) -> Result<Frame, TransportError> {
        loop {
            if let Some(frame) = self.poll_frame()? {
                return Ok(frame);
            }
            self.stream
                .readable()
                .await
                .map_err(TransportError::ReceiveFailed)?;
        }
    }

    fn ensure_open(&self) -> Result<(), TransportError> {
        if self.closed {
            return Err(TransportError::ConnectionClosed(
                "connection was disconnected locally".into(),
            ));
        }
        Ok(())
    }
}

/// Non-blocking [`Read`] over a tokio stream, for the assembler.
struct TryRead<'a>(&'a TcpStream);

impl Read for TryRead<'_> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.0.try_read(buf)
    }
}

impl Connection for TcpConnection {
    fn id(&self) -> ConnectionId {
        self.id
    }

    fn remote_addr(&self) -> SocketAddr {
        self.remote_addr
    }

    fn poll_frame(&mut self) -> Result<Option<Frame>, TransportError> {
        self.ensure_open()?;
        self.assembler.poll(&mut TryRead(&self.stream))
    }

    async fn send(&mut self, data: &[u8]) -> Result<(), TransportError> {
        self.ensure_open()?;
        let mut written = 0;
        while written < data.len() {
            match self.stream.write(&data[written..]).await {
                Ok(0) => {
                    return Err(TransportError::SendFailed(
                        io::ErrorKind::WriteZero.into(),
                    ));
                }
                Ok(n) => written += n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(TransportError::SendFailed(e)),
            }
        }
        Ok(())
    }

    async fn disconnect(&mut self) -> Result<(), TransportError> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;
        // The peer may already be gone; a failed shutdown leaves nothing
        // to clean up.
        let _ = self.stream.shutdown().await;
        tracing::debug!(id = %self.id, addr = %self.remote_addr, "disconnected");
        Ok(())
    }
}
