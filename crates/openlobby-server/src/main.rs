//! OpenLobby server binary.
//!
//! ```text
//! openlobby-server --port 7777
//! openlobby-server --config openlobby.toml --tick-rate 60
//! RUST_LOG=openlobby=debug openlobby-server --port 7777
//! ```

use std::net::IpAddr;
use std::path::PathBuf;

use clap::Parser;
use openlobby::{ConfigOverrides, LobbyServer, ServerConfig, ServerError};
use tracing_subscriber::EnvFilter;

/// Lobby and matchmaking server.
#[derive(Parser, Debug)]
#[command(name = "openlobby-server", version, about)]
struct Args {
    /// Path to a TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Port to listen on (overrides file and environment)
    #[arg(short, long)]
    port: Option<u16>,

    /// Interface to bind (overrides file and environment)
    #[arg(short = 'H', long)]
    host: Option<IpAddr>,

    /// Server loop ticks per second, 1-1000
    #[arg(short, long)]
    tick_rate: Option<u32>,
}

impl Args {
    fn overrides(&self) -> ConfigOverrides {
        ConfigOverrides {
            listen_port: self.port,
            bind_host: self.host,
            tick_rate_hz: self.tick_rate,
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), ServerError> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();
    let config = ServerConfig::load(args.config.as_deref(), &args.overrides())
        .inspect_err(|e| tracing::error!(error = %e, "invalid configuration"))?;

    let server = LobbyServer::builder().config(config).build().await?;

    let shutdown = server.shutdown_signal();
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => shutdown.trigger(),
            Err(e) => tracing::error!(error = %e, "cannot listen for ctrl-c"),
        }
    });

    server.run().await
}
