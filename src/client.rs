//! The caller-owned client handle.
//!
//! A [`Client`] is a cheap, cloneable handle over one shared
//! [`ConnectionPool`]. Every call borrows a connection for its duration and
//! gives it back when done; fatal errors discard it instead.

use std::sync::Arc;

use bytes::Bytes;

use crate::config::ConnectionConfig;
use crate::connection::ConnectionPool;
use crate::error::{Error, Result};
use crate::pipeline::Pipeline;
use crate::resp::types::{Argument, Reply};

/// Which end of the list a blocking pop takes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PopDirection {
    Left,
    Right,
}

impl PopDirection {
    fn command(self) -> &'static str {
        match self {
            Self::Left => "BLPOP",
            Self::Right => "BRPOP",
        }
    }
}

/// Result of a blocking pop that did not time out.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Popped {
    /// The list the value came from.
    pub key: String,
    pub value: Bytes,
}

/// Pooled client. Clones share the same pool.
#[derive(Clone)]
pub struct Client {
    pool: Arc<ConnectionPool>,
}

impl Client {
    /// Build a pool for `config` and dial once to verify the address.
    ///
    /// The verified connection is kept idle for the first command.
    pub async fn connect(config: ConnectionConfig) -> Result<Self> {
        let pool = ConnectionPool::new(config)?;
        drop(pool.get().await?);
        Ok(Self::from_pool(pool))
    }

    /// Shorthand for [`connect`](Self::connect) with [`ConnectionConfig::from_url`].
    pub async fn connect_url(url: &str) -> Result<Self> {
        Self::connect(ConnectionConfig::from_url(url)?).await
    }

    /// Wrap a pool the caller already built. Nothing is dialed.
    pub fn from_pool(pool: ConnectionPool) -> Self {
        Self {
            pool: Arc::new(pool),
        }
    }

    pub fn pool(&self) -> &ConnectionPool {
        &self.pool
    }

    /// Run one command on a pooled connection.
    ///
    /// A `-` reply comes back as [`Error::Server`] and the connection is
    /// reused. No retry is attempted on any error. Dropping the future
    /// before the reply is read closes the connection instead.
    pub async fn execute(&self, command: &str, args: &[Argument]) -> Result<Reply> {
        let mut guard = self.pool.get().await?;
        guard.conn().send(command, args).await
    }

    /// Like [`execute`](Self::execute), but decodes through a throwaway read
    /// buffer. Suited to blocking pops and replies with many elements.
    pub async fn execute_isolated(&self, command: &str, args: &[Argument]) -> Result<Reply> {
        let mut guard = self.pool.get().await?;
        guard.conn().send_isolated(command, args).await
    }

    /// Run a command with a bulk reply and hand its payload to `f` without
    /// copying it out of the read buffer.
    ///
    /// `f` sees `None` when the reply is a null bulk.
    pub async fn execute_view<T, F>(&self, command: &str, args: &[Argument], f: F) -> Result<T>
    where
        F: FnOnce(Option<&[u8]>) -> T,
    {
        let mut guard = self.pool.get().await?;
        let view = guard.conn().send_view(command, args).await?;
        Ok(f(view))
    }

    /// Start a pipeline holding one connection until it is flushed.
    pub async fn pipeline(&self) -> Result<Pipeline<'_>> {
        Ok(Pipeline::new(self.pool.get().await?))
    }

    /// Pop from the first non-empty list among `keys`, waiting up to
    /// `timeout_secs` (0 waits forever).
    ///
    /// `Ok(None)` means the wait timed out. The connection is held for the
    /// whole wait.
    pub async fn block_pop(
        &self,
        direction: PopDirection,
        keys: &[&str],
        timeout_secs: u64,
    ) -> Result<Option<Popped>> {
        if keys.is_empty() {
            return Err(Error::Argument(format!(
                "{} requires at least one key",
                direction.command()
            )));
        }
        let timeout = i64::try_from(timeout_secs)
            .map_err(|_| Error::Argument(format!("timeout out of range: {timeout_secs}")))?;

        let mut args: Vec<Argument> = keys.iter().map(|&k| Argument::from(k)).collect();
        args.push(Argument::int(timeout));

        match self.execute_isolated(direction.command(), &args).await? {
            Reply::Array(None) => Ok(None),
            Reply::Array(Some(items)) => popped_from(items).map(Some),
            other => Err(Error::Type(format!(
                "{} returned {}",
                direction.command(),
                other.type_name()
            ))),
        }
    }

    /// Close every idle connection. Checked-out connections are unaffected.
    pub fn close_all(&self) {
        self.pool.close_all();
    }

    pub fn idle_count(&self) -> usize {
        self.pool.idle_count()
    }

    pub fn live_count(&self) -> usize {
        self.pool.live_count()
    }

    pub fn max_connections(&self) -> usize {
        self.pool.max_connections()
    }
}

fn popped_from(items: Vec<Reply>) -> Result<Popped> {
    let len = items.len();
    let mut iter = items.into_iter();
    match (iter.next(), iter.next(), iter.next()) {
        (Some(key), Some(Reply::Bulk(Some(value))), None) => {
            let key = key
                .as_str()
                .ok_or_else(|| Error::Type(format!("pop key is {}", key.type_name())))?
                .to_string();
            Ok(Popped { key, value })
        }
        _ => Err(Error::Type(format!(
            "expected [key, value] from blocking pop, got {len} elements"
        ))),
    }
}

// ── Tests ──────────────────────────────────────────────────────────
