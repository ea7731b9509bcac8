//! Transport layer for OpenLobby.
//!
//! Provides the [`Connection`] trait the server loop drives, and its TCP
//! implementation ([`TcpTransport`], [`TcpConnection`]).
//!
//! Frames arrive over a byte stream in arbitrary pieces. Each connection
//! owns a [`FrameAssembler`] that keeps the one partially received frame
//! and completes it across polls, so a slow peer never blocks the loop.

#![allow(async_fn_in_trait)]

mod assembler;
mod error;
mod tcp;

pub use assembler::FrameAssembler;
pub use error::TransportError;
pub use tcp::{TcpConnection, TcpTransport};

use std::fmt;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use openlobby_protocol::Frame;

/// Counter for generating unique connection IDs.
static NEXT_CONNECTION_ID: AtomicU64 = AtomicU64::new(1);

/// Opaque identifier for a connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConnectionId(u64);

impl ConnectionId {
    /// Creates a new `ConnectionId` from a raw `u64`.
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    /// Allocates an ID no other connection in this process has used.
    pub fn next() -> Self {
        Self(NEXT_CONNECTION_ID.fetch_add(1, Ordering::Relaxed))
    }

    /// Returns the underlying `u64` value.
    pub fn into_inner(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "conn-{}", self.0)
    }
}

/// One peer the server loop talks to.
///
/// Receiving is a non-blocking poll so a single loop can service every
/// peer in turn. Sending is async and writes the whole buffer.
pub trait Connection: Send + 'static {
    /// Returns the unique identifier for this connection.
    fn id(&self) -> ConnectionId;

    /// The peer's address as seen by the listener.
    fn remote_addr(&self) -> SocketAddr;

    /// Reads whatever has arrived and returns a frame once one is
    /// complete.
    ///
    /// `Ok(None)` means no complete frame yet; partial bytes are kept for
    /// the next call. Any error means the connection is unusable.
    fn poll_frame(&mut self) -> Result<Option<Frame>, TransportError>;

    /// Writes all of `data` to the peer.
    async fn send(&mut self, data: &[u8]) -> Result<(), TransportError>;

    /// Writes a frame to the peer.
    async fn send_frame(&mut self, frame: &Frame) -> Result<(), TransportError> {
        self.send(&frame.to_bytes()).await
    }

    /// Writes a frame, giving up after `budget`.
    ///
    /// A timed-out send may have written part of the frame, so the
    /// connection should be dropped.
    async fn send_frame_within(
        &mut self,
        frame: &Frame,
        budget: Duration,
    ) -> Result<(), TransportError> {
        tokio::time::timeout(budget, self.send_frame(frame))
            .await
            .map_err(|_| TransportError::SendTimedOut(budget))?
    }

    /// Closes the connection. Closing twice is not an error.
    async fn disconnect(&mut self) -> Result<(), TransportError>;
}
