//! The tick-driven server loop.
//!
//! One [`ServerLoop`] owns every connection, every per-connection inbox,
//! and the lobby store. Each call to [`ServerLoop::tick`] runs one sweep:
//!
//! 1. Admit connections handed over by the accept loop.
//! 2. Poll every connection once; a completed frame joins its inbox.
//! 3. Dispatch every inbox in FIFO order.
//! 4. Close the connections scheduled for removal.
//!
//! Nothing inside a tick waits on a peer for long: polling never blocks,
//! and a send that cannot finish within the send timeout drops its
//! connection.

use std::collections::{BTreeMap, VecDeque};
use std::time::Duration;

use openlobby_lobby::{IdSource, LobbyStore, RandomIds};
use openlobby_protocol::{Frame, Reply, ReplyCode, Transmission};
use openlobby_tick::TickScheduler;
use openlobby_transport::{Connection, ConnectionId, TransportError};
use tokio::sync::mpsc;
use tokio::time::{self, Instant};

use crate::handler::{dispatch, Disposition, HandlerContext};
use crate::ServerConfig;

/// An active connection and the frames it has sent but that have not
/// been handled yet.
struct Peer<C> {
    conn: C,
    inbox: VecDeque<Frame>,
}

/// What one tick did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickReport {
    /// Connections moved from pending to active.
    pub admitted: usize,
    /// Frames dispatched to handlers.
    pub dispatched: usize,
    /// Connections closed and removed.
    pub disconnected: usize,
}

/// Owns all server state and advances it one tick at a time.
pub struct ServerLoop<C: Connection, I: IdSource = RandomIds> {
    peers: BTreeMap<ConnectionId, Peer<C>>,
    pending_tx: mpsc::UnboundedSender<C>,
    pending_rx: mpsc::UnboundedReceiver<C>,
    disconnecting: Vec<ConnectionId>,
    lobbies: LobbyStore<I>,
    max_listed_lobbies: usize,
    send_timeout: Duration,
}

impl<C: Connection> ServerLoop<C> {
    /// Creates a loop with an empty, randomly keyed lobby store.
    pub fn new(max_listed_lobbies: usize) -> Self {
        Self::with_lobby_store(LobbyStore::new(), max_listed_lobbies)
    }
}

impl<C: Connection, I: IdSource> ServerLoop<C, I> {
    /// Creates a loop around an existing lobby store.
    pub fn with_lobby_store(
        lobbies: LobbyStore<I>,
        max_listed_lobbies: usize,
    ) -> Self {
        let (pending_tx, pending_rx) = mpsc::unbounded_channel();
        Self {
            peers: BTreeMap::new(),
            pending_tx,
            pending_rx,
            disconnecting: Vec::new(),
            lobbies,
            max_listed_lobbies,
            send_timeout: Duration::from_millis(
                ServerConfig::DEFAULT_SEND_TIMEOUT_MS,
            ),
        }
    }

    /// Sets how long one send may wait before its connection is dropped.
    pub fn with_send_timeout(mut self, send_timeout: Duration) -> Self {
        self.send_timeout = send_timeout;
        self
    }

    /// A handle for queueing new connections. They become active at the
    /// start of the next tick.
    pub fn pending_sender(&self) -> mpsc::UnboundedSender<C> {
        self.pending_tx.clone()
    }

    /// The lobby store.
    pub fn lobbies(&self) -> &LobbyStore<I> {
        &self.lobbies
    }

    /// Number of active connections.
    pub fn peer_count(&self) -> usize {
        self.peers.len()
    }

    /// `true` if `id` is an active connection.
    pub fn is_active(&self, id: ConnectionId) -> bool {
        self.peers.contains_key(&id)
    }

    /// Runs one full sweep.
    pub async fn tick(&mut self) -> TickReport {
        let admitted = self.admit_pending();
        self.poll_peers();
        let dispatched = self.dispatch_inboxes().await;
        let disconnected = self.drain_disconnects().await;
        TickReport {
            admitted,
            dispatched,
            disconnected,
        }
    }

    fn admit_pending(&mut self) -> usize {
        let mut admitted = 0;
        while let Ok(conn) = self.pending_rx.try_recv() {
            let conn_id = conn.id();
            tracing::info!(%conn_id, addr = %conn.remote_addr(), "connection admitted");
            self.peers.insert(
                conn_id,
                Peer {
                    conn,
                    inbox: VecDeque::new(),
                },
            );
            admitted += 1;
        }
        admitted
    }

    fn poll_peers(&mut self) {
        for (&conn_id, peer) in &mut self.peers {
            match peer.conn.poll_frame() {
                Ok(Some(frame)) => peer.inbox.push_back(frame),
                Ok(None) => {}
                Err(TransportError::ConnectionClosed(reason)) => {
                    tracing::info!(%conn_id, %reason, "peer closed connection");
                    self.disconnecting.push(conn_id);
                }
                Err(e) => {
                    tracing::warn!(%conn_id, error = %e, "receive failed, dropping connection");
                    self.disconnecting.push(conn_id);
                }
            }
        }
    }

    async fn dispatch_inboxes(&mut self) -> usize {
        let mut dispatched = 0;
        let mut ctx = HandlerContext {
            lobbies: &mut self.lobbies,
            max_listed_lobbies: self.max_listed_lobbies,
            send_timeout: self.send_timeout,
        };

        for (&conn_id, peer) in &mut self.peers {
            while let Some(frame) = peer.inbox.pop_front() {
                if self.disconnecting.contains(&conn_id) {
                    tracing::debug!(
                        %conn_id,
                        dropped = peer.inbox.len() + 1,
                        "dropping frames from closing connection"
                    );
                    peer.inbox.clear();
                    break;
                }
                dispatched += 1;
                if dispatch(&mut ctx, &mut peer.conn, frame).await
                    == Disposition::Disconnect
                {
                    self.disconnecting.push(conn_id);
                }
            }
        }
        dispatched
    }

    async fn drain_disconnects(&mut self) -> usize {
        let mut removed = 0;
        for conn_id in std::mem::take(&mut self.disconnecting) {
            let Some(mut peer) = self.peers.remove(&conn_id) else {
                continue;
            };
            self.lobbies.forget_connection(conn_id);
            match time::timeout(self.send_timeout, peer.conn.disconnect()).await {
                Ok(Ok(())) => {}
                Ok(Err(e)) => tracing::debug!(%conn_id, error = %e, "close failed"),
                Err(_) => tracing::debug!(%conn_id, "close timed out"),
            }
            tracing::info!(%conn_id, "connection closed");
            removed += 1;
        }
        removed
    }

    /// Sends `DisconnectInit` to every active connection, giving up on
    /// each one at the send timeout or at `deadline`, whichever is sooner.
    /// Connections the notice cannot reach are scheduled for removal.
    pub async fn broadcast_disconnect(&mut self, deadline: Instant) {
        let frame = match Reply::new(ReplyCode::DisconnectInit).to_frame() {
            Ok(frame) => frame,
            Err(e) => {
                tracing::error!(error = %e, "cannot encode disconnect reply");
                return;
            }
        };
        for (&conn_id, peer) in &mut self.peers {
            let budget = self
                .send_timeout
                .min(deadline.saturating_duration_since(Instant::now()));
            if let Err(e) = peer.conn.send_frame_within(&frame, budget).await {
                tracing::debug!(%conn_id, error = %e, "disconnect notice failed");
                self.disconnecting.push(conn_id);
            }
        }
    }

    /// Closes and removes every connection, active or pending.
    pub async fn close_all(&mut self) -> usize {
        self.admit_pending();
        self.disconnecting = self.peers.keys().copied().collect();
        self.drain_disconnects().await
    }

    /// Winds the loop down.
    ///
    /// Admits anything still pending, tells every peer to disconnect, and
    /// keeps ticking so peers can say goodbye. Stops once no peers remain
    /// or `grace` has passed, then force-closes whatever is left. A tick
    /// still running at the deadline is abandoned.
    pub async fn shut_down(
        &mut self,
        grace: Duration,
        scheduler: &mut TickScheduler,
    ) {
        let deadline = Instant::now() + grace;
        self.admit_pending();
        tracing::info!(peers = self.peers.len(), "shutting down, notifying peers");
        self.broadcast_disconnect(deadline).await;

        while !self.peers.is_empty() {
            let ticked = time::timeout_at(deadline, async {
                scheduler.wait_for_tick().await;
                self.tick().await;
                scheduler.record_tick_end();
            })
            .await;
            if ticked.is_err() {
                break;
            }
        }

        let forced = self.close_all().await;
        if forced > 0 {
            tracing::info!(forced, "grace period over, closed remaining peers");
        }
    }
}
