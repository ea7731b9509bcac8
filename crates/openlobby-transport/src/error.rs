use std::time::Duration;

use openlobby_protocol::ProtocolError;

/// Errors that can occur in the transport layer.
///
/// Every variant is connection-fatal: the server loop drops the
/// connection and does not try to reply.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// The connection was closed.
    #[error("connection closed: {0}")]
    ConnectionClosed(String),

    /// Sending data failed.
    #[error("send failed: {0}")]
    SendFailed(#[source] std::io::Error),

    /// Receiving data failed.
    #[error("receive failed: {0}")]
    ReceiveFailed(#[source] std::io::Error),

    /// The peer did not take the bytes in time.
    #[error("send did not complete within {0:?}")]
    SendTimedOut(Duration),

    /// Binding or accepting connections failed.
    #[error("accept failed: {0}")]
    AcceptFailed(#[source] std::io::Error),

    /// Opening an outbound connection failed.
    #[error("connect failed: {0}")]
    ConnectFailed(#[source] std::io::Error),

    /// A frame could not be built from received bytes.
    #[error("malformed frame: {0}")]
    MalformedFrame(#[from] ProtocolError),

    /// A blocking-style read was attempted while a polled frame was
    /// half assembled.
    #[error("a frame is already being assembled on this connection")]
    FrameInProgress,
}
