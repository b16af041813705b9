//! Service configuration loaded from environment variables.
//!
//! Follows 12-factor style: all settings come from environment variables
//! (or a `.env` file via `dotenvy`). Every key has a default except
//! `DATABASE_URL`; without it the service runs with no storage attached.

use std::net::SocketAddr;
use std::time::Duration;

use crate::error::HubError;

/// Top-level service configuration.
///
/// Loaded once at startup via [`ServiceConfig::from_env`].
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    /// Socket address to bind the HTTP server to (e.g. `0.0.0.0:3000`).
    pub listen_addr: SocketAddr,

    /// PostgreSQL settings, `None` when `DATABASE_URL` is unset.
    pub database: Option<DatabaseConfig>,

    /// Event loop settings.
    pub hub: HubConfig,

    /// Per-connection settings.
    pub connection: ConnectionConfig,

    /// Header carrying the user id set by the upstream auth proxy.
    pub auth_user_header: String,

    /// `LISTEN` channel the storage layer publishes mutations on.
    pub mutation_notify_channel: String,
}

/// PostgreSQL connection pool settings.
#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    /// PostgreSQL connection string.
    pub url: String,

    /// Maximum number of database connections in the pool.
    pub max_connections: u32,

    /// Timeout for acquiring a database connection.
    pub connect_timeout: Duration,
}

/// Settings of the hub event loop.
#[derive(Debug, Clone)]
pub struct HubConfig {
    /// Capacity of the inbound event queue.
    pub queue_capacity: usize,

    /// Upper bound on one board access check; exceeding it denies the join.
    ///
    /// The hub awaits the check inline, so every other event waits behind a
    /// slow query for up to this long. Keep it small (`ACCESS_CHECK_TIMEOUT_MS`).
    pub access_timeout: Duration,

    /// Whether mutation notifications are echoed to the acting user.
    pub echo_to_actor: bool,
}

impl Default for HubConfig {
    fn default() -> Self {
        Self {
            queue_capacity: 1024,
            access_timeout: Duration::from_millis(2000),
            echo_to_actor: true,
        }
    }
}

/// Settings applied to every WebSocket connection.
#[derive(Debug, Clone, Copy)]
pub struct ConnectionConfig {
    /// Capacity of the per-connection outbound queue.
    pub queue_capacity: usize,

    /// Liveness probing.
    pub heartbeat: HeartbeatConfig,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            queue_capacity: 256,
            heartbeat: HeartbeatConfig::default(),
        }
    }
}

/// Heartbeat timing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HeartbeatConfig {
    /// Delay between two `ping` probes.
    pub ping_interval: Duration,

    /// How long a `ping` may stay unanswered before the connection is closed.
    pub ack_timeout: Duration,
}

impl Default for HeartbeatConfig {
    fn default() -> Self {
        Self {
            ping_interval: Duration::from_secs(60),
            ack_timeout: Duration::from_secs(10),
        }
    }
}

impl ServiceConfig {
    /// Loads configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv().ok()` to optionally load a `.env` file, then
    /// delegates to [`ServiceConfig::from_lookup`].
    ///
    /// # Errors
    ///
    /// See [`ServiceConfig::from_lookup`].
    pub fn from_env() -> Result<Self, HubError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the configuration from an arbitrary key lookup.
    ///
    /// Missing or unparsable numeric values fall back to their defaults.
    ///
    /// # Errors
    ///
    /// Returns [`HubError::InvalidConfig`] if `LISTEN_ADDR` cannot be parsed
    /// as a [`SocketAddr`], or if a capacity or duration is zero.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, HubError> {
        let listen_addr: SocketAddr = lookup("LISTEN_ADDR")
            .unwrap_or_else(|| "0.0.0.0:3000".to_string())
            .parse()
            .map_err(|e| HubError::InvalidConfig(format!("LISTEN_ADDR: {e}")))?;

        let database = lookup("DATABASE_URL")
            .filter(|url| !url.trim().is_empty())
            .map(|url| DatabaseConfig {
                url,
                max_connections: parse_key(&lookup, "DATABASE_MAX_CONNECTIONS", 10),
                connect_timeout: Duration::from_secs(parse_key(
                    &lookup,
                    "DATABASE_CONNECT_TIMEOUT_SECS",
                    5,
                )),
            });

        let hub_defaults = HubConfig::default();
        let hub = HubConfig {
            queue_capacity: parse_key(&lookup, "HUB_QUEUE_CAPACITY", hub_defaults.queue_capacity),
            access_timeout: Duration::from_millis(parse_key(&lookup, "ACCESS_CHECK_TIMEOUT_MS", 2000)),
            echo_to_actor: parse_key_bool(&lookup, "HUB_ECHO_TO_ACTOR", hub_defaults.echo_to_actor),
        };

        let connection = ConnectionConfig {
            queue_capacity: parse_key(&lookup, "CONNECTION_QUEUE_CAPACITY", 256),
            heartbeat: HeartbeatConfig {
                ping_interval: Duration::from_secs(parse_key(
                    &lookup,
                    "WEBSOCKET_PING_INTERVAL_SECS",
                    60,
                )),
                ack_timeout: Duration::from_secs(parse_key(&lookup, "WEBSOCKET_TIMEOUT_SECS", 10)),
            },
        };

        let config = Self {
            listen_addr,
            database,
            hub,
            connection,
            auth_user_header: lookup("AUTH_USER_HEADER").unwrap_or_else(|| "x-user-id".to_string()),
            mutation_notify_channel: lookup("MUTATION_NOTIFY_CHANNEL")
                .unwrap_or_else(|| "board_mutations".to_string()),
        };
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), HubError> {
        let checks = [
            (self.hub.queue_capacity == 0, "HUB_QUEUE_CAPACITY"),
            (self.hub.access_timeout.is_zero(), "ACCESS_CHECK_TIMEOUT_MS"),
            (self.connection.queue_capacity == 0, "CONNECTION_QUEUE_CAPACITY"),
            (
                self.connection.heartbeat.ping_interval.is_zero(),
                "WEBSOCKET_PING_INTERVAL_SECS",
            ),
            (
                self.connection.heartbeat.ack_timeout.is_zero(),
                "WEBSOCKET_TIMEOUT_SECS",
            ),
        ];
        if let Some((_, key)) = checks.iter().find(|(invalid, _)| *invalid) {
            return Err(HubError::InvalidConfig(format!("{key} must be greater than zero")));
        }
        Ok(())
    }
}

/// Parses `key` as `T`, returning `default` on missing or invalid values.
fn parse_key<T: std::str::FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
    default: T,
) -> T {
    lookup(key)
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}

/// Parses `key` as a boolean. Accepts `"true"`, `"1"`, `"false"`, `"0"`
/// (case-insensitive). Returns `default` otherwise.
fn parse_key_bool(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: bool) -> bool {
    match lookup(key).map(|v| v.trim().to_ascii_lowercase()).as_deref() {
        Some("true" | "1") => true,
        Some("false" | "0") => false,
        _ => default,
    }
}
