//! A small client for talking to a lobby server, for tools and tests.

use std::net::SocketAddr;

use openlobby_protocol::{
    Frame, HostRequest, JoinRequest, JoinTarget, LobbyId, LobbyListing,
    LobbySearch, ProtocolError, Reply, ReplyCode, Transmission,
    TransmissionKind,
};
use openlobby_transport::{Connection, TcpConnection};

use crate::ServerError;

/// How the server answered a join request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JoinOutcome {
    /// Accepted: connect to the host here.
    Accepted(JoinTarget),
    /// Refused with this code (normally [`ReplyCode::WrongPassword`]).
    Refused(ReplyCode),
}

/// A connection to a lobby server.
///
/// Every request method waits for the next frame from the server. The
/// server sends nothing for a join on an unknown lobby, so wrap
/// [`join`](Self::join) in a timeout when that can happen.
pub struct LobbyClient {
    conn: TcpConnection,
}

impl LobbyClient {
    /// Connects to the server at `addr`.
    pub async fn connect(addr: SocketAddr) -> Result<Self, ServerError> {
        let conn = TcpConnection::connect(addr).await?;
        Ok(Self { conn })
    }

    /// This side's address, which the server records as a lobby's host.
    pub fn local_addr(&self) -> Result<SocketAddr, ServerError> {
        Ok(self.conn.local_addr()?)
    }

    /// Sends any message.
    pub async fn send<T: Transmission>(
        &mut self,
        message: &T,
    ) -> Result<(), ServerError> {
        self.send_frame(&message.to_frame()?).await
    }

    /// Sends a prebuilt frame as is.
    pub async fn send_frame(&mut self, frame: &Frame) -> Result<(), ServerError> {
        self.conn.send_frame(frame).await?;
        Ok(())
    }

    /// Waits for the next complete frame from the server.
    pub async fn next_frame(&mut self) -> Result<Frame, ServerError> {
        Ok(self.conn.recv_frame().await?)
    }

    /// Asks the server to host a lobby and returns its reply code.
    pub async fn host(
        &mut self,
        request: &HostRequest,
    ) -> Result<ReplyCode, ServerError> {
        self.send(request).await?;
        let frame = self.next_frame().await?;
        Ok(Reply::from_frame(&frame)?.code)
    }

    /// Lists the server's lobbies.
    pub async fn query(
        &mut self,
        filter: &str,
    ) -> Result<LobbyListing, ServerError> {
        self.send(&LobbySearch::new(filter)).await?;
        let frame = self.next_frame().await?;
        Ok(LobbyListing::from_frame(&frame)?)
    }

    /// Asks to join lobby `id`.
    pub async fn join(
        &mut self,
        id: LobbyId,
        password: &str,
    ) -> Result<JoinOutcome, ServerError> {
        self.send(&JoinRequest::new(id, password)).await?;
        let frame = self.next_frame().await?;
        match frame.kind()? {
            TransmissionKind::Join => {
                Ok(JoinOutcome::Accepted(JoinTarget::from_frame(&frame)?))
            }
            TransmissionKind::Reply => {
                Ok(JoinOutcome::Refused(Reply::from_frame(&frame)?.code))
            }
            _ => Err(ProtocolError::WrongKind {
                expected: TransmissionKind::Join,
                found: frame.tag(),
            }
            .into()),
        }
    }

    /// Tells the server this client is leaving, then closes the socket.
    pub async fn disconnect(mut self) -> Result<(), ServerError> {
        self.send(&Reply::new(ReplyCode::DisconnectInit)).await?;
        self.conn.disconnect().await?;
        Ok(())
    }
}
