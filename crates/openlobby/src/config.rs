//! Server configuration.
//!
//! Settings are layered, lowest precedence first:
//!
//! 1. TOML file ([`FileConfig`])
//! 2. Environment (`OPENLOBBY_LISTEN_PORT`, `OPENLOBBY_BIND_HOST`,
//!    `OPENLOBBY_TICK_RATE_HZ`)
//! 3. Command-line overrides ([`ConfigOverrides`])
//!
//! ```toml
//! listen_port = 7777
//! bind_host = "0.0.0.0"
//! tick_rate_hz = 100
//! shutdown_grace_ms = 2000
//! send_timeout_ms = 1000
//! max_listed_lobbies = 127
//! ```

use std::fmt::Display;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use openlobby_protocol::MAX_LISTING_LEN;
use openlobby_tick::TickConfig;
use serde::Deserialize;

/// Environment variable for the listen port.
pub const ENV_LISTEN_PORT: &str = "OPENLOBBY_LISTEN_PORT";
/// Environment variable for the bind host.
pub const ENV_BIND_HOST: &str = "OPENLOBBY_BIND_HOST";
/// Environment variable for the tick rate.
pub const ENV_TICK_RATE_HZ: &str = "OPENLOBBY_TICK_RATE_HZ";

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The config file could not be read.
    #[error("failed to read {path}: {source}")]
    Io {
        /// The file that was being read.
        path: PathBuf,
        /// The underlying error.
        #[source]
        source: std::io::Error,
    },

    /// The config file is not valid TOML for [`FileConfig`].
    #[error("parse error: {0}")]
    Parse(#[from] toml::de::Error),

    /// No layer set a listen port.
    #[error(
        "no listen port configured (set listen_port, OPENLOBBY_LISTEN_PORT, or --port)"
    )]
    MissingListenPort,

    /// A value is out of range or does not parse.
    #[error("invalid {field}: {reason}")]
    InvalidValue {
        /// The offending setting.
        field: &'static str,
        /// What is wrong with it.
        reason: String,
    },
}

/// The config file layer. Every field is optional.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FileConfig {
    /// TCP port to listen on.
    pub listen_port: Option<u16>,
    /// Interface to bind.
    pub bind_host: Option<IpAddr>,
    /// Server loop tick rate in Hz.
    pub tick_rate_hz: Option<u32>,
    /// Grace period after broadcasting `DisconnectInit`, in milliseconds.
    pub shutdown_grace_ms: Option<u64>,
    /// Longest a single send may wait on a peer, in milliseconds.
    pub send_timeout_ms: Option<u64>,
    /// Cap on lobbies in one listing.
    pub max_listed_lobbies: Option<usize>,
}

impl FileConfig {
    /// Parses a config from TOML text.
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(text)?)
    }

    /// Reads and parses a config file.
    pub fn from_path(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| {
            ConfigError::Io {
                path: path.to_path_buf(),
                source,
            }
        })?;
        Self::from_toml_str(&text)
    }
}

/// The command-line layer.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConfigOverrides {
    /// `--port`
    pub listen_port: Option<u16>,
    /// `--host`
    pub bind_host: Option<IpAddr>,
    /// `--tick-rate`
    pub tick_rate_hz: Option<u32>,
}

/// Fully resolved server settings.
#[derive(Debug, Clone, PartialEq)]
pub struct ServerConfig {
    /// TCP port to listen on. 0 picks a free port.
    pub listen_port: u16,
    /// Interface to bind.
    pub bind_host: IpAddr,
    /// Server loop tick rate in Hz, 1..=1000.
    pub tick_rate_hz: u32,
    /// Grace period after broadcasting `DisconnectInit`, in milliseconds.
    pub shutdown_grace_ms: u64,
    /// Longest a single send may wait on a peer, in milliseconds. A peer
    /// that does not take a frame in time is dropped.
    pub send_timeout_ms: u64,
    /// Cap on lobbies in one listing, at most [`MAX_LISTING_LEN`].
    pub max_listed_lobbies: usize,
}

impl ServerConfig {
    /// Interface bound when none is configured.
    pub const DEFAULT_BIND_HOST: IpAddr = IpAddr::V4(Ipv4Addr::UNSPECIFIED);

    /// Grace period used when none is configured.
    pub const DEFAULT_SHUTDOWN_GRACE_MS: u64 = 2000;

    /// Send timeout used when none is configured.
    pub const DEFAULT_SEND_TIMEOUT_MS: u64 = 1000;

    /// Default settings listening on `listen_port`.
    pub fn new(listen_port: u16) -> Self {
        Self {
            listen_port,
            bind_host: Self::DEFAULT_BIND_HOST,
            tick_rate_hz: TickConfig::DEFAULT_TICK_RATE_HZ,
            shutdown_grace_ms: Self::DEFAULT_SHUTDOWN_GRACE_MS,
            send_timeout_ms: Self::DEFAULT_SEND_TIMEOUT_MS,
            max_listed_lobbies: MAX_LISTING_LEN,
        }
    }

    /// Loads the file at `path` (if any), then the process environment,
    /// then `overrides`.
    pub fn load(
        path: Option<&Path>,
        overrides: &ConfigOverrides,
    ) -> Result<Self, ConfigError> {
        let file = match path {
            Some(path) => FileConfig::from_path(path)?,
            None => FileConfig::default(),
        };
        Self::resolve(file, |key| std::env::var(key).ok(), overrides)
    }

    /// Merges the three layers, reading the environment through `env`.
    pub fn resolve(
        file: FileConfig,
        env: impl Fn(&str) -> Option<String>,
        overrides: &ConfigOverrides,
    ) -> Result<Self, ConfigError> {
        let mut listen_port = file.listen_port;
        let mut bind_host = file.bind_host;
        let mut tick_rate_hz = file.tick_rate_hz;

        if let Some(raw) = env(ENV_LISTEN_PORT) {
            listen_port = Some(parse_env("listen_port", &raw)?);
        }
        if let Some(raw) = env(ENV_BIND_HOST) {
            bind_host = Some(parse_env("bind_host", &raw)?);
        }
        if let Some(raw) = env(ENV_TICK_RATE_HZ) {
            tick_rate_hz = Some(parse_env("tick_rate_hz", &raw)?);
        }

        listen_port = overrides.listen_port.or(listen_port);
        bind_host = overrides.bind_host.or(bind_host);
        tick_rate_hz = overrides.tick_rate_hz.or(tick_rate_hz);

        let config = Self {
            listen_port: listen_port.ok_or(ConfigError::MissingListenPort)?,
            bind_host: bind_host.unwrap_or(Self::DEFAULT_BIND_HOST),
            tick_rate_hz: tick_rate_hz
                .unwrap_or(TickConfig::DEFAULT_TICK_RATE_HZ),
            shutdown_grace_ms: file
                .shutdown_grace_ms
                .unwrap_or(Self::DEFAULT_SHUTDOWN_GRACE_MS),
            send_timeout_ms: file
                .send_timeout_ms
                .unwrap_or(Self::DEFAULT_SEND_TIMEOUT_MS),
            max_listed_lobbies: file
                .max_listed_lobbies
                .unwrap_or(MAX_LISTING_LEN),
        };
        config.validate()?;
        Ok(config)
    }

    /// Checks every setting against its range.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(1..=TickConfig::MAX_TICK_RATE_HZ).contains(&self.tick_rate_hz) {
            return Err(ConfigError::InvalidValue {
                field: "tick_rate_hz",
                reason: format!(
                    "{} is outside 1..={}",
                    self.tick_rate_hz,
                    TickConfig::MAX_TICK_RATE_HZ
                ),
            });
        }
        if self.send_timeout_ms == 0 {
            return Err(ConfigError::InvalidValue {
                field: "send_timeout_ms",
                reason: "must be at least 1".into(),
            });
        }
        if self.max_listed_lobbies > MAX_LISTING_LEN {
            return Err(ConfigError::InvalidValue {
                field: "max_listed_lobbies",
                reason: format!(
                    "{} exceeds the {MAX_LISTING_LEN} pairs a listing can carry",
                    self.max_listed_lobbies
                ),
            });
        }
        Ok(())
    }

    /// The socket address to bind.
    pub fn listen_addr(&self) -> SocketAddr {
        SocketAddr::new(self.bind_host, self.listen_port)
    }

    /// Tick scheduler settings for the server loop.
    pub fn tick_config(&self) -> TickConfig {
        TickConfig::with_rate(self.tick_rate_hz)
    }

    /// The shutdown grace period.
    pub fn shutdown_grace(&self) -> Duration {
        Duration::from_millis(self.shutdown_grace_ms)
    }

    /// The per-send time limit.
    pub fn send_timeout(&self) -> Duration {
        Duration::from_millis(self.send_timeout_ms)
    }
}

fn parse_env<T>(field: &'static str, raw: &str) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: Display,
{
    raw.trim()
        .parse()
        .map_err(|e: T::Err| ConfigError::InvalidValue {
            field,
            reason: format!("{raw:?}: {e}"),
        })
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn no_env(_: &str) -> Option<String> {
        None
    }

    fn env_of(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    // =========================================================================
    // FileConfig
    // =========================================================================

    #[test]
    fn test_parse_full_file() {
        let file = FileConfig::from_toml_str(
            r#"
            listen_port = 7777
            bind_host = "127.0.0.1"
            tick_rate_hz = 60
            shutdown_grace_ms = 500
            send_timeout_ms = 250
            max_listed_lobbies = 10
            "#,
        )
        .unwrap();
        assert_eq!(file.listen_port, Some(7777));
        assert_eq!(file.bind_host, Some(IpAddr::from([127, 0, 0, 1])));
        assert_eq!(file.tick_rate_hz, Some(60));
        assert_eq!(file.shutdown_grace_ms, Some(500));
        assert_eq!(file.send_timeout_ms, Some(250));
        assert_eq!(file.max_listed_lobbies, Some(10));
    }

    #[test]
    fn test_empty_file_is_all_defaults() {
        assert_eq!(FileConfig::from_toml_str("").unwrap(), FileConfig::default());
    }

    #[test]
    fn test_unknown_key_is_rejected() {
        let err = FileConfig::from_toml_str("listen_prot = 1").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn test_missing_file_reports_path() {
        let err = FileConfig::from_path(Path::new("/nonexistent/openlobby.toml"))
            .unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
        assert!(err.to_string().contains("/nonexistent/openlobby.toml"));
    }

    // =========================================================================
    // Layering
    // =========================================================================

    #[test]
    fn test_defaults_fill_everything_but_port() {
        let file = FileConfig {
            listen_port: Some(7777),
            ..FileConfig::default()
        };
        let config =
            ServerConfig::resolve(file, no_env, &ConfigOverrides::default())
                .unwrap();
        assert_eq!(config, ServerConfig::new(7777));
        assert_eq!(config.listen_addr().to_string(), "0.0.0.0:7777");
        assert_eq!(config.shutdown_grace(), Duration::from_secs(2));
        assert_eq!(config.send_timeout(), Duration::from_secs(1));
    }

    #[test]
    fn test_missing_port_is_fatal() {
        let err = ServerConfig::resolve(
            FileConfig::default(),
            no_env,
            &ConfigOverrides::default(),
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::MissingListenPort));
    }

    #[test]
    fn test_env_beats_file_and_flags_beat_env() {
        let file = FileConfig {
            listen_port: Some(1000),
            tick_rate_hz: Some(30),
            ..FileConfig::default()
        };
        let env = env_of(&[
            (ENV_LISTEN_PORT, "2000"),
            (ENV_BIND_HOST, "127.0.0.1"),
            (ENV_TICK_RATE_HZ, "60"),
        ]);
        let overrides = ConfigOverrides {
            listen_port: Some(3000),
            ..ConfigOverrides::default()
        };

        let config = ServerConfig::resolve(file, env, &overrides).unwrap();
        assert_eq!(config.listen_port, 3000);
        assert_eq!(config.bind_host, IpAddr::from([127, 0, 0, 1]));
        assert_eq!(config.tick_rate_hz, 60);
    }

    #[test]
    fn test_bad_env_value_names_the_field() {
        let env = env_of(&[(ENV_LISTEN_PORT, "seventy")]);
        let err = ServerConfig::resolve(
            FileConfig::default(),
            env,
            &ConfigOverrides::default(),
        )
        .unwrap_err();
        assert!(matches!(
            err,
            ConfigError::InvalidValue {
                field: "listen_port",
                ..
            }
        ));
    }

    // =========================================================================
    // Validation
    // =========================================================================

    #[test]
    fn test_tick_rate_out_of_range() {
        for rate in [0, 1001] {
            let overrides = ConfigOverrides {
                listen_port: Some(1),
                tick_rate_hz: Some(rate),
                ..ConfigOverrides::default()
            };
            let err = ServerConfig::resolve(FileConfig::default(), no_env, &overrides)
                .unwrap_err();
            assert!(matches!(
                err,
                ConfigError::InvalidValue {
                    field: "tick_rate_hz",
                    ..
                }
            ));
        }
    }

    #[test]
    fn test_zero_send_timeout_is_rejected() {
        let mut config = ServerConfig::new(1);
        config.send_timeout_ms = 0;
        assert!(matches!(
            config.validate().unwrap_err(),
            ConfigError::InvalidValue {
                field: "send_timeout_ms",
                ..
            }
        ));
    }

    #[test]
    fn test_listing_cap_bounded_by_wire_limit() {
        let mut config = ServerConfig::new(1);
        config.max_listed_lobbies = MAX_LISTING_LEN;
        assert!(config.validate().is_ok());
        config.max_listed_lobbies = MAX_LISTING_LEN + 1;
        assert!(config.validate().is_err());
    }
}
