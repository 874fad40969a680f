//! Connection configuration and URL parsing.
//!
//! Only the standalone scheme is accepted:
//! - `redis://host[:port][/db]`

use crate::buffer::{DEFAULT_BUFFER_SIZE, DEFAULT_MAX_BUFFER_SIZE};
use crate::error::{Error, Result};

/// Default server port.
pub const DEFAULT_PORT: u16 = 6379;
/// Default bound on idle pooled connections.
pub const DEFAULT_MAX_CONNECTIONS: usize = 5;

/// Full connection configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct ConnectionConfig {
    pub host: String,
    pub port: u16,
    /// Logical database selected on every new connection (0 = default, no SELECT sent).
    pub db: u16,
    /// Upper bound on idle pooled connections. Excess returns are closed.
    pub max_connections: usize,
    /// Connect timeout in milliseconds (0 = wait for the OS).
    pub connect_timeout_ms: u64,
    /// Initial capacity of each connection's read and write buffers.
    pub buffer_size: usize,
    /// Largest single reply line or bulk payload a connection will buffer.
    pub max_buffer_size: usize,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: DEFAULT_PORT,
            db: 0,
            max_connections: DEFAULT_MAX_CONNECTIONS,
            connect_timeout_ms: 5000,
            buffer_size: DEFAULT_BUFFER_SIZE,
            max_buffer_size: DEFAULT_MAX_BUFFER_SIZE,
        }
    }
}

impl ConnectionConfig {
    /// Config for `addr` ("host:port") with every other field defaulted.
    pub fn from_addr(addr: &str) -> Result<Self> {
        let mut config = Self::default();
        parse_host_port(addr, DEFAULT_PORT, &mut config.host, &mut config.port)?;
        Ok(config)
    }

    /// Parse a `redis://` URL into a ConnectionConfig.
    pub fn from_url(url: &str) -> Result<Self> {
        let (scheme, rest) = url
            .split_once("://")
            .ok_or_else(|| Error::Config(format!("invalid URL, missing ://: {url}")))?;

        match scheme {
            "redis" => {}
            "rediss" => return Err(Error::Config("TLS (rediss://) is not supported".into())),
            other => return Err(Error::Config(format!("unknown URL scheme: {other}"))),
        }

        let mut config = Self::default();
        let (host_port, db_part) = split_path(rest);

        if let Some(db_str) = db_part {
            config.db = db_str
                .parse()
                .map_err(|_| Error::Config(format!("invalid db number: {db_str}")))?;
        }
        if host_port.contains('@') {
            return Err(Error::Config("credentials in URL are not supported".into()));
        }

        parse_host_port(host_port, DEFAULT_PORT, &mut config.host, &mut config.port)?;
        Ok(config)
    }

    /// Return the primary address as "host:port".
    pub fn primary_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Reject settings the pool cannot work with.
    pub fn validate(&self) -> Result<()> {
        if self.host.is_empty() {
            return Err(Error::Config("host must not be empty".into()));
        }
        if self.max_connections == 0 {
            return Err(Error::Config("max_connections must be > 0".into()));
        }
        if self.buffer_size == 0 {
            return Err(Error::Config("buffer_size must be > 0".into()));
        }
        if self.max_buffer_size == 0 {
            return Err(Error::Config("max_buffer_size must be > 0".into()));
        }
        Ok(())
    }

    pub fn with_db(mut self, db: u16) -> Self {
        self.db = db;
        self
    }

    pub fn with_max_connections(mut self, max_connections: usize) -> Self {
        self.max_connections = max_connections;
        self
    }
}

/// Split `host[:port][/db]` into (`host[:port]`, `Some(db)`).
fn split_path(s: &str) -> (&str, Option<&str>) {
    match s.split_once('/') {
        Some((host, db)) if !db.is_empty() => (host, Some(db)),
        Some((host, _)) => (host, None),
        None => (s, None),
    }
}

/// Parse `host[:port]` or `[ipv6]:port`.
fn parse_host_port(s: &str, default_port: u16, host: &mut String, port: &mut u16) -> Result<()> {
    if s.is_empty() {
        return Err(Error::Config("empty host".into()));
    }

    // IPv6: [::1]:6379
    if let Some(rest) = s.strip_prefix('[') {
        let (h, after) = rest
            .split_once(']')
            .ok_or_else(|| Error::Config(format!("unclosed IPv6 bracket: {s}")))?;
        *host = h.to_string();
        *port = match after.strip_prefix(':') {
            Some(p) => p
                .parse()
                .map_err(|_| Error::Config(format!("invalid port: {p}")))?,
            None => default_port,
        };
        return Ok(());
    }

    match s.rsplit_once(':') {
        Some((h, p)) => {
            *host = h.to_string();
            *port = p
                .parse()
                .map_err(|_| Error::Config(format!("invalid port: {p}")))?;
        }
        None => {
            *host = s.to_string();
            *port = default_port;
        }
    }
    if host.is_empty() {
        return Err(Error::Config("empty host".into()));
    }
    Ok(())
}

// ── Tests ──────────────────────────────────────────────────────────
