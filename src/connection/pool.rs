//! Connection pool.
//!
//! Idle connections live in a LIFO stack behind a `parking_lot::Mutex` that
//! is held only for a push or a pop, so connections can be handed back from
//! `Drop` without async.
//!
//! The bound is enforced on release, not on acquire: `get` never waits, it
//! either pops an idle connection or dials a new one. Concurrent callers can
//! therefore push the live count past `max_connections` for a while, but the
//! idle stack never grows beyond it; surplus connections are closed when
//! they come back.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use parking_lot::Mutex as SyncMutex;
use tracing::{debug, warn};

use crate::config::ConnectionConfig;
use crate::connection::tcp::Connection;
use crate::error::Result;

/// A bounded pool of connections to one server.
pub struct ConnectionPool {
    /// Idle connections ready for reuse. Locked only for a push or a pop.
    idle: SyncMutex<Vec<Connection>>,
    config: ConnectionConfig,
    /// Connections opened and not yet closed, idle or checked out.
    live: AtomicUsize,
}

impl ConnectionPool {
    /// Create an empty pool. No connection is opened until the first `get`.
    pub fn new(config: ConnectionConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            idle: SyncMutex::new(Vec::with_capacity(config.max_connections)),
            config,
            live: AtomicUsize::new(0),
        })
    }

    /// Borrow a connection, dialing a new one if none is idle.
    ///
    /// The returned [`PooledConnection`] hands the connection back when
    /// dropped, unless a fatal error broke it.
    pub async fn get(&self) -> Result<PooledConnection<'_>> {
        let conn = self.idle.lock().pop();
        let conn = match conn {
            Some(c) => c,
            None => self.open_connection().await?,
        };
        Ok(PooledConnection {
            conn: Some(conn),
            pool: self,
        })
    }

    /// Close every idle connection. Checked-out connections are unaffected.
    pub fn close_all(&self) {
        let drained = std::mem::take(&mut *self.idle.lock());
        let count = drained.len();
        self.live.fetch_sub(count, Ordering::AcqRel);
        drop(drained);
        debug!(count, "closed idle connections");
    }

    /// Return the number of currently idle connections.
    pub fn idle_count(&self) -> usize {
        self.idle.lock().len()
    }

    /// Connections currently open, idle or checked out.
    pub fn live_count(&self) -> usize {
        self.live.load(Ordering::Acquire)
    }

    pub fn max_connections(&self) -> usize {
        self.config.max_connections
    }

    pub fn config(&self) -> &ConnectionConfig {
        &self.config
    }

    /// Dial the target and select the configured database.
    async fn open_connection(&self) -> Result<Connection> {
        let addr = self.config.primary_addr();
        let conn = if self.config.connect_timeout_ms > 0 {
            let timeout = Duration::from_millis(self.config.connect_timeout_ms);
            Connection::connect_timeout(&addr, timeout, self.config.buffer_size).await?
        } else {
            Connection::connect_with_buffer(&addr, self.config.buffer_size).await?
        };
        let mut conn = conn.with_max_buffer_size(self.config.max_buffer_size);
        conn.select_db(self.config.db).await?;
        self.live.fetch_add(1, Ordering::AcqRel);
        Ok(conn)
    }

    /// Take a connection back. Sync, so `Drop` can call it.
    fn release(&self, conn: Connection) {
        if conn.is_broken() {
            warn!(
                pending_replies = conn.pending_replies(),
                "discarding connection after fatal error or abandoned reply"
            );
            self.discard(conn);
            return;
        }
        let surplus = {
            let mut idle = self.idle.lock();
            if idle.len() < self.config.max_connections {
                idle.push(conn);
                None
            } else {
                Some(conn)
            }
        };
        if let Some(conn) = surplus {
            debug!("pool full, closing returned connection");
            self.discard(conn);
        }
    }

    fn discard(&self, conn: Connection) {
        self.live.fetch_sub(1, Ordering::AcqRel);
        drop(conn);
    }
}

/// RAII guard that returns the connection to the pool on drop.
pub struct PooledConnection<'a> {
    conn: Option<Connection>,
    pool: &'a ConnectionPool,
}

impl PooledConnection<'_> {
    /// Access the underlying connection.
    pub fn conn(&mut self) -> &mut Connection {
        // Only `Drop` empties the option.
        self.conn.as_mut().expect("connection already released")
    }
}

impl Drop for PooledConnection<'_> {
    fn drop(&mut self) {
        if let Some(conn) = self.conn.take() {
            self.pool.release(conn);
        }
    }
}

// ── Tests ──────────────────────────────────────────────────────────
