//! Environment-driven configuration.
//!
//! Every external dependency is addressed through an environment variable;
//! a local `.env` file is honored for development. Validation happens once
//! at startup so the rest of the process can assume a well-formed config.

use std::net::SocketAddr;
use std::time::Duration;
use thiserror::Error;

/// Errors that can occur during configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0} environment variable not set")]
    Missing(&'static str),

    #[error("invalid duration in {var}: {value}")]
    InvalidDuration { var: &'static str, value: String },

    #[error("invalid listen address: {0}")]
    InvalidListenAddr(String),
}

/// Fully validated runtime configuration.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Address the HTTP server binds to.
    pub listen: SocketAddr,
    /// CockroachDB connection string.
    pub crdb_dsn: String,
    /// Catalog document store URI.
    pub mongo_uri: String,
    /// Redis address (`host:port` or `redis://` URL).
    pub redis_addr: String,
    /// Broker connection URL.
    pub rabbit_url: String,
    /// Public key for the gateway's JWT validation (consumed by the edge,
    /// carried here so one env contract covers every deployment).
    pub jwt_public_key: Option<String>,
    /// How long a hold pins its seats.
    pub hold_ttl: Duration,
    /// How long cached idempotent responses live.
    pub idempotency_ttl: Duration,
    /// Shared secret for payment-callback signatures; verification is
    /// skipped (with a startup warning) when unset.
    pub callback_secret: Option<Box<[u8]>>,
    /// OTLP endpoint; empty disables trace export.
    pub otlp_endpoint: Option<String>,
}

impl AppConfig {
    /// Load and validate the configuration from the environment.
    pub fn load() -> Result<Self, ConfigError> {
        let _ = dotenvy::dotenv();

        let listen = match std::env::var("LISTEN_ADDR") {
            Ok(raw) => raw
                .parse()
                .map_err(|_| ConfigError::InvalidListenAddr(raw))?,
            Err(_) => SocketAddr::from(([0, 0, 0, 0], 8080)),
        };

        Ok(Self {
            listen,
            crdb_dsn: require("CRDB_DSN")?,
            mongo_uri: require("MONGO_URI")?,
            redis_addr: require("REDIS_ADDR")?,
            rabbit_url: require("RABBIT_URL")?,
            jwt_public_key: optional("JWT_PUBLIC_KEY"),
            hold_ttl: duration_from_env("HOLD_TTL", Duration::from_secs(5 * 60))?,
            idempotency_ttl: duration_from_env("IDEMPOTENCY_TTL", Duration::from_secs(3600))?,
            callback_secret: optional("CALLBACK_SECRET")
                .map(|s| s.into_bytes().into_boxed_slice()),
            otlp_endpoint: optional("OTEL_EXPORTER_OTLP_ENDPOINT"),
        })
    }
}

fn require(var: &'static str) -> Result<String, ConfigError> {
    std::env::var(var)
        .ok()
        .filter(|v| !v.is_empty())
        .ok_or(ConfigError::Missing(var))
}

fn optional(var: &str) -> Option<String> {
    std::env::var(var).ok().filter(|v| !v.is_empty())
}

fn duration_from_env(var: &'static str, default: Duration) -> Result<Duration, ConfigError> {
    match optional(var) {
        Some(raw) => parse_duration(&raw).ok_or(ConfigError::InvalidDuration { var, value: raw }),
        None => Ok(default),
    }
}

/// Parse a Go-style duration literal: an integer followed by `ms`, `s`,
/// `m` or `h` (e.g. `5m`, `90s`, `250ms`).
fn parse_duration(raw: &str) -> Option<Duration> {
    let raw = raw.trim();
    let (value, unit) = raw.split_at(raw.find(|c: char| !c.is_ascii_digit())?);
    let value: u64 = value.parse().ok()?;
    match unit {
        "ms" => Some(Duration::from_millis(value)),
        "s" => Some(Duration::from_secs(value)),
        "m" => Some(Duration::from_secs(value * 60)),
        "h" => Some(Duration::from_secs(value * 3600)),
        _ => None,
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn parses_duration_literals() {
        assert_eq!(parse_duration("5m").unwrap(), Duration::from_secs(300));
        assert_eq!(parse_duration("90s").unwrap(), Duration::from_secs(90));
        assert_eq!(parse_duration("250ms").unwrap(), Duration::from_millis(250));
        assert_eq!(parse_duration("2h").unwrap(), Duration::from_secs(7200));
        assert_eq!(parse_duration(" 1m ").unwrap(), Duration::from_secs(60));
    }

    #[test]
    fn rejects_malformed_durations() {
        assert!(parse_duration("").is_none());
        assert!(parse_duration("5").is_none());
        assert!(parse_duration("m").is_none());
        assert!(parse_duration("5 minutes").is_none());
        assert!(parse_duration("-5m").is_none());
    }
}
