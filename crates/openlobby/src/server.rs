//! `LobbyServer` builder, accept loop, and run loop.
//!
//! Two tasks share the work. The accept loop waits on the listener and
//! hands each new connection to the server loop's pending queue; it never
//! touches lobby state. The run loop owns the [`ServerLoop`] and ticks it
//! at the configured rate until shutdown.

use std::net::SocketAddr;

use openlobby_tick::TickScheduler;
use openlobby_transport::{TcpConnection, TcpTransport};
use tokio::sync::mpsc;

use crate::{ServerConfig, ServerError, ServerLoop, ShutdownSignal};

/// Builder for configuring and starting a lobby server.
///
/// # Example
///
/// ```rust,ignore
/// let server = LobbyServer::builder()
///     .config(ServerConfig::new(7777))
///     .build()
///     .await?;
/// server.run().await
/// ```
pub struct LobbyServerBuilder {
    config: ServerConfig,
    shutdown: ShutdownSignal,
}

impl LobbyServerBuilder {
    /// Creates a builder that listens on an OS-assigned port on all
    /// interfaces.
    pub fn new() -> Self {
        Self {
            config: ServerConfig::new(0),
            shutdown: ShutdownSignal::new(),
        }
    }

    /// Replaces the whole configuration.
    pub fn config(mut self, config: ServerConfig) -> Self {
        self.config = config;
        self
    }

    /// Sets the address to bind the server to.
    pub fn bind(mut self, addr: SocketAddr) -> Self {
        self.config.bind_host = addr.ip();
        self.config.listen_port = addr.port();
        self
    }

    /// Uses an existing shutdown signal instead of a fresh one.
    pub fn shutdown_signal(mut self, shutdown: ShutdownSignal) -> Self {
        self.shutdown = shutdown;
        self
    }

    /// Validates the configuration and binds the listener.
    pub async fn build(self) -> Result<LobbyServer, ServerError> {
        self.config.validate()?;
        let transport = TcpTransport::bind(self.config.listen_addr()).await?;
        let server_loop = ServerLoop::new(self.config.max_listed_lobbies)
            .with_send_timeout(self.config.send_timeout());
        Ok(LobbyServer {
            transport,
            config: self.config,
            shutdown: self.shutdown,
            server_loop,
        })
    }
}

impl Default for LobbyServerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// A bound lobby server.
///
/// Call [`run()`](Self::run) to start accepting connections.
pub struct LobbyServer {
    transport: TcpTransport,
    config: ServerConfig,
    shutdown: ShutdownSignal,
    server_loop: ServerLoop<TcpConnection>,
}

impl LobbyServer {
    /// Creates a new builder.
    pub fn builder() -> LobbyServerBuilder {
        LobbyServerBuilder::new()
    }

    /// Returns the local address the server is bound to.
    pub fn local_addr(&self) -> Result<SocketAddr, ServerError> {
        Ok(self.transport.local_addr()?)
    }

    /// A handle that stops the server when triggered.
    pub fn shutdown_signal(&self) -> ShutdownSignal {
        self.shutdown.clone()
    }

    /// Runs the server until the shutdown signal fires, then winds down
    /// gracefully.
    pub async fn run(self) -> Result<(), ServerError> {
        let Self {
            transport,
            config,
            shutdown,
            mut server_loop,
        } = self;

        tracing::info!(
            addr = %transport.local_addr()?,
            tick_rate_hz = config.tick_rate_hz,
            "lobby server running"
        );

        let accept = tokio::spawn(accept_loop(
            transport,
            server_loop.pending_sender(),
            shutdown.clone(),
        ));

        let mut scheduler = TickScheduler::new(config.tick_config());
        loop {
            tokio::select! {
                biased;
                _ = shutdown.wait() => break,
                _ = scheduler.wait_for_tick() => {
                    server_loop.tick().await;
                    scheduler.record_tick_end();
                }
            }
        }

        // Everything the accept loop queued before stopping is admitted
        // by shut_down below.
        if let Err(e) = accept.await {
            tracing::error!(error = %e, "accept loop panicked");
        }
        server_loop
            .shut_down(config.shutdown_grace(), &mut scheduler)
            .await;

        let metrics = scheduler.metrics();
        tracing::info!(
            ticks = metrics.total_ticks,
            overruns = metrics.total_overruns,
            lobbies = server_loop.lobbies().len(),
            "lobby server stopped"
        );
        Ok(())
    }
}

/// Accepts connections until shutdown and queues them for the server loop.
async fn accept_loop(
    transport: TcpTransport,
    pending: mpsc::UnboundedSender<TcpConnection>,
    shutdown: ShutdownSignal,
) {
    loop {
        tokio::select! {
            biased;
            _ = shutdown.wait() => break,
            accepted = transport.accept() => match accepted {
                Ok(conn) => {
                    if pending.send(conn).is_err() {
                        break;
                    }
                }
                Err(e) => {
                    tracing::error!(error = %e, "accept failed");
                }
            },
        }
    }
    tracing::debug!("accept loop stopped");
}
