//! Command pipelining over one pooled connection.
//!
//! Appends only encode onto the held connection's write buffer. `flush`
//! writes the whole batch once and then reads one reply per queued command,
//! in order. Every reply is drained even after a server error so the
//! connection stays in sync and can go back to the pool.

use tracing::trace;

use crate::connection::PooledConnection;
use crate::error::{Error, Result};
use crate::resp::types::{Argument, Reply};

/// A batch of commands bound to one borrowed connection.
///
/// Consumed by [`flush`](Self::flush) or [`collect`](Self::collect), so its
/// connection returns to the pool exactly once.
pub struct Pipeline<'a> {
    guard: PooledConnection<'a>,
    pending: usize,
}

impl<'a> Pipeline<'a> {
    pub(crate) fn new(guard: PooledConnection<'a>) -> Self {
        Self { guard, pending: 0 }
    }

    /// Queue a command. Nothing is written to the socket.
    pub fn append(&mut self, command: &str, args: &[Argument]) -> Result<()> {
        self.guard.conn().queue(command, args)?;
        self.pending += 1;
        Ok(())
    }

    /// Queue `HINCRBY key field inc`.
    pub fn hincrby(&mut self, key: &str, field: &str, inc: i64) -> Result<()> {
        self.append("HINCRBY", &[key.into(), field.into(), Argument::int(inc)])
    }

    /// Queue `EXPIRE key seconds`.
    pub fn expire(&mut self, key: &str, seconds: u64) -> Result<()> {
        let seconds = i64::try_from(seconds)
            .map_err(|_| Error::Argument(format!("expire seconds out of range: {seconds}")))?;
        self.append("EXPIRE", &[key.into(), Argument::int(seconds)])
    }

    /// Queue `PING`.
    pub fn ping(&mut self) -> Result<()> {
        self.append("PING", &[])
    }

    /// Number of queued commands whose replies have not been read.
    pub fn len(&self) -> usize {
        self.pending
    }

    pub fn is_empty(&self) -> bool {
        self.pending == 0
    }

    /// Send the batch and drain every reply, discarding them.
    ///
    /// If any command got a `-` reply, the first one is returned as
    /// [`Error::Server`] after all replies have been read.
    pub async fn flush(mut self) -> Result<()> {
        let (_, first_error) = self.drain(false).await?;
        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    /// Send the batch and return every reply in enqueue order.
    ///
    /// `-` replies stay in the vector as [`Reply::Error`].
    pub async fn collect(mut self) -> Result<Vec<Reply>> {
        let (replies, _) = self.drain(true).await?;
        Ok(replies)
    }

    async fn drain(&mut self, keep: bool) -> Result<(Vec<Reply>, Option<Error>)> {
        let count = std::mem::take(&mut self.pending);
        if count == 0 {
            return Ok((Vec::new(), None));
        }

        let conn = self.guard.conn();
        conn.flush_queued().await?;

        let mut replies = Vec::with_capacity(if keep { count } else { 0 });
        let mut first_error = None;
        for _ in 0..count {
            // A fatal error stops here; the guard then discards the connection.
            let reply = conn.read_reply().await?;
            if let Reply::Error(ref msg) = reply {
                if first_error.is_none() {
                    first_error = Some(Error::server(msg.clone()));
                }
            }
            if keep {
                replies.push(reply);
            }
        }
        trace!(count, "pipeline flushed");
        Ok((replies, first_error))
    }
}

impl Drop for Pipeline<'_> {
    fn drop(&mut self) {
        // Abandoned without a flush: unsent requests must not leak into the
        // connection's next use.
        if self.pending > 0 {
            self.guard.conn().discard_queued();
        }
    }
}

// ── Tests ──────────────────────────────────────────────────────────
