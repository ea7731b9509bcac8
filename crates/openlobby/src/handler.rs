//! Per-frame dispatch: one handler per transmission kind.
//!
//! Every handler runs inside a tick and returns a [`Disposition`] telling
//! the server loop whether to keep the connection. Failures are converted
//! into reply codes here, so one bad frame never reaches past its own
//! connection.

use std::net::SocketAddr;
use std::time::Duration;

use openlobby_lobby::{IdSource, LobbyStore, Member};
use openlobby_protocol::{
    Frame, HostRequest, JoinRequest, JoinTarget, LobbyListing, LobbySearch,
    Reply, ReplyCode, Transmission, TransmissionKind,
};
use openlobby_transport::Connection;

use crate::ServerError;

/// What the server loop should do with a connection after a frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Disposition {
    /// Keep polling it.
    Keep,
    /// Schedule it for removal at the end of the tick.
    Disconnect,
}

/// State a handler may read or mutate.
pub(crate) struct HandlerContext<'a, I: IdSource> {
    pub(crate) lobbies: &'a mut LobbyStore<I>,
    pub(crate) max_listed_lobbies: usize,
    pub(crate) send_timeout: Duration,
}

/// Maps a handler failure to the reply code sent back to the peer.
///
/// `None` means the peer gets no reply: either the frame was itself a
/// reply, or the connection is broken and about to be dropped.
pub fn error_reply(
    kind: TransmissionKind,
    err: &ServerError,
) -> Option<ReplyCode> {
    match (kind, err) {
        (_, ServerError::Transport(_)) => None,
        (TransmissionKind::Reply, _) => None,
        (TransmissionKind::Host, _) => Some(ReplyCode::HostingError),
        (_, ServerError::Protocol(_)) => Some(ReplyCode::MalformedRequest),
        (_, ServerError::Lobby(_) | ServerError::Config(_)) => {
            Some(ReplyCode::ServerError)
        }
    }
}

/// Handles one complete frame from `conn`.
pub(crate) async fn dispatch<C: Connection, I: IdSource>(
    ctx: &mut HandlerContext<'_, I>,
    conn: &mut C,
    frame: Frame,
) -> Disposition {
    let conn_id = conn.id();
    let kind = match frame.kind() {
        Ok(kind) => kind,
        Err(e) => {
            tracing::warn!(%conn_id, error = %e, "skipping frame");
            return Disposition::Keep;
        }
    };

    let result = match kind {
        TransmissionKind::Host => handle_host(ctx, conn, &frame).await,
        TransmissionKind::Query => handle_query(ctx, conn, &frame).await,
        TransmissionKind::Join => handle_join(ctx, conn, &frame).await,
        TransmissionKind::Reply => handle_reply(conn, &frame),
    };

    match result {
        Ok(disposition) => disposition,
        Err(err) => report_failure(conn, ctx.send_timeout, kind, err).await,
    }
}

async fn report_failure<C: Connection>(
    conn: &mut C,
    budget: Duration,
    kind: TransmissionKind,
    err: ServerError,
) -> Disposition {
    let conn_id = conn.id();
    if let ServerError::Transport(e) = &err {
        tracing::warn!(%conn_id, %kind, error = %e, "send failed, dropping connection");
        return Disposition::Disconnect;
    }

    tracing::warn!(%conn_id, %kind, error = %err, "request rejected");
    let Some(code) = error_reply(kind, &err) else {
        return Disposition::Keep;
    };
    match send(conn, budget, &Reply::new(code)).await {
        Ok(()) => Disposition::Keep,
        Err(e) => {
            tracing::warn!(%conn_id, error = %e, "error reply failed, dropping connection");
            Disposition::Disconnect
        }
    }
}

async fn send<C: Connection, T: Transmission>(
    conn: &mut C,
    budget: Duration,
    message: &T,
) -> Result<(), ServerError> {
    let frame = message.to_frame()?;
    conn.send_frame_within(&frame, budget).await?;
    Ok(())
}

/// The peer's address with IPv4-mapped IPv6 unwrapped, so a dual-stack
/// listener records `1.2.3.4:5` rather than `[::ffff:1.2.3.4]:5`.
fn observed_addr<C: Connection>(conn: &C) -> SocketAddr {
    let addr = conn.remote_addr();
    SocketAddr::new(addr.ip().to_canonical(), addr.port())
}

async fn handle_host<C: Connection, I: IdSource>(
    ctx: &mut HandlerContext<'_, I>,
    conn: &mut C,
    frame: &Frame,
) -> Result<Disposition, ServerError> {
    let request = HostRequest::from_frame(frame)?;
    let lobby_id = ctx.lobbies.create(observed_addr(conn), request)?;
    tracing::debug!(conn_id = %conn.id(), %lobby_id, "hosting accepted");
    send(conn, ctx.send_timeout, &Reply::new(ReplyCode::HostingSuccess)).await?;
    Ok(Disposition::Keep)
}

async fn handle_query<C: Connection, I: IdSource>(
    ctx: &mut HandlerContext<'_, I>,
    conn: &mut C,
    frame: &Frame,
) -> Result<Disposition, ServerError> {
    // The filter is read for validation only; every lobby is listed.
    let _search = LobbySearch::from_frame(frame)?;

    let mut lobbies = ctx.lobbies.list_all();
    if lobbies.len() > ctx.max_listed_lobbies {
        tracing::warn!(
            conn_id = %conn.id(),
            total = lobbies.len(),
            listed = ctx.max_listed_lobbies,
            "listing truncated"
        );
        lobbies.truncate(ctx.max_listed_lobbies);
    }
    send(conn, ctx.send_timeout, &LobbyListing { lobbies }).await?;
    Ok(Disposition::Keep)
}

async fn handle_join<C: Connection, I: IdSource>(
    ctx: &mut HandlerContext<'_, I>,
    conn: &mut C,
    frame: &Frame,
) -> Result<Disposition, ServerError> {
    let request = JoinRequest::from_frame(frame)?;
    let conn_id = conn.id();

    // Unknown or unparseable IDs get no reply at all.
    let Some(lobby_id) = request.parsed_lobby_id() else {
        tracing::debug!(%conn_id, id = %request.lobby_id, "join ignored: id does not parse");
        return Ok(Disposition::Keep);
    };
    let Some(lobby) = ctx.lobbies.get(lobby_id) else {
        tracing::debug!(%conn_id, %lobby_id, "join ignored: no such lobby");
        return Ok(Disposition::Keep);
    };

    if !lobby.password_matches(&request.password) {
        tracing::debug!(%conn_id, %lobby_id, "join refused: wrong password");
        send(conn, ctx.send_timeout, &Reply::new(ReplyCode::WrongPassword)).await?;
        return Ok(Disposition::Keep);
    }

    let host = lobby.host;
    ctx.lobbies.add_member(
        lobby_id,
        Member {
            connection: conn_id,
            addr: observed_addr(conn),
        },
    )?;
    send(conn, ctx.send_timeout, &JoinTarget::new(host)).await?;
    Ok(Disposition::Keep)
}

fn handle_reply<C: Connection>(
    conn: &mut C,
    frame: &Frame,
) -> Result<Disposition, ServerError> {
    let reply = Reply::from_frame(frame)?;
    if reply.code == ReplyCode::DisconnectInit {
        tracing::info!(conn_id = %conn.id(), "peer requested disconnect");
        return Ok(Disposition::Disconnect);
    }
    tracing::debug!(conn_id = %conn.id(), code = %reply.code, "ignoring reply from peer");
    Ok(Disposition::Keep)
}
