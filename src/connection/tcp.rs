//! Async TCP connection to a RESP server.
//!
//! Wraps a `tokio::net::TcpStream` with one reusable write buffer and one
//! reusable read buffer. A connection is driven by exactly one caller at a
//! time and does no locking of its own.
//!
//! Every request written bumps an in-flight count that only a decoded reply
//! brings back down. A call cancelled between the two (a dropped future,
//! an elapsed `tokio::time::timeout`) leaves the count raised, and the
//! connection reports itself broken so the pool never reuses a stream whose
//! next bytes belong to someone else's request.

use std::io;
use std::time::Duration;

use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;
use tracing::debug;

use crate::buffer::{ByteBuffer, DEFAULT_BUFFER_SIZE, DEFAULT_MAX_BUFFER_SIZE};
use crate::error::{Error, Result};
use crate::resp::parser::{BulkView, ReplyReader};
use crate::resp::types::{Argument, Reply};
use crate::resp::writer::encode_request;

/// A single connection to the server.
pub struct Connection {
    stream: TcpStream,
    wbuf: ByteBuffer,
    rbuf: ByteBuffer,
    buffer_size: usize,
    max_buffer_size: usize,
    /// Requests written whose replies have not been decoded yet.
    in_flight: usize,
    /// Requests encoded into `wbuf` but not yet written.
    queued: usize,
    /// Set once a fatal error leaves the stream in an unknown state.
    broken: bool,
}

impl Connection {
    /// Connect to `addr` (e.g. "127.0.0.1:6379").
    pub async fn connect(addr: &str) -> Result<Self> {
        Self::connect_with_buffer(addr, DEFAULT_BUFFER_SIZE).await
    }

    /// Connect with a configurable initial buffer size.
    pub async fn connect_with_buffer(addr: &str, buffer_size: usize) -> Result<Self> {
        let stream = TcpStream::connect(addr).await?;
        stream.set_nodelay(true).ok();
        debug!(%addr, "connection opened");
        Ok(Self {
            stream,
            wbuf: ByteBuffer::with_capacity(buffer_size),
            rbuf: ByteBuffer::with_capacity(buffer_size),
            buffer_size,
            max_buffer_size: DEFAULT_MAX_BUFFER_SIZE,
            in_flight: 0,
            queued: 0,
            broken: false,
        })
    }

    /// Connect, giving up after `timeout`.
    pub async fn connect_timeout(addr: &str, timeout: Duration, buffer_size: usize) -> Result<Self> {
        match tokio::time::timeout(timeout, Self::connect_with_buffer(addr, buffer_size)).await {
            Ok(result) => result,
            Err(_) => Err(Error::Connection(io::Error::new(
                io::ErrorKind::TimedOut,
                format!("connection to {addr} timed out after {timeout:?}"),
            ))),
        }
    }

    /// Cap a single reply line or bulk payload at `max` bytes.
    pub fn with_max_buffer_size(mut self, max: usize) -> Self {
        self.max_buffer_size = max;
        self
    }

    /// True once a fatal error has been observed, or while a reply is still
    /// owed for a request already written.
    pub fn is_broken(&self) -> bool {
        self.broken || self.in_flight > 0
    }

    /// Replies the server still owes this connection.
    pub fn pending_replies(&self) -> usize {
        self.in_flight
    }

    /// Send one command and decode its reply.
    ///
    /// A `-` reply becomes [`Error::Server`]; the connection stays usable.
    pub async fn send(&mut self, command: &str, args: &[Argument]) -> Result<Reply> {
        let result = self.round_trip(command, args, None).await;
        self.checked(result)
    }

    /// Like [`send`](Self::send), but decodes through a fresh read buffer
    /// that is dropped afterwards, leaving the shared one untouched.
    ///
    /// Meant for blocking pops and large multi-element replies.
    pub async fn send_isolated(&mut self, command: &str, args: &[Argument]) -> Result<Reply> {
        let mut scratch = ByteBuffer::with_capacity(self.buffer_size);
        let result = self.round_trip(command, args, Some(&mut scratch)).await;
        self.checked(result)
    }

    /// Send a command whose reply is a bulk string and borrow the payload
    /// straight out of the read buffer.
    ///
    /// The slice is only valid until the next call on this connection, which
    /// the borrow enforces. `Ok(None)` means the key is absent.
    pub async fn send_view(&mut self, command: &str, args: &[Argument]) -> Result<Option<&[u8]>> {
        let view = match self.write_request(command, args).await {
            Ok(()) => {
                self.rbuf.reset();
                let view = self.reader().read_bulk_view().await;
                if view.is_ok() {
                    self.in_flight -= 1;
                }
                view
            }
            Err(e) => Err(e),
        };
        match self.checked(view)? {
            BulkView::Data(range) => Ok(Some(self.rbuf.slice(range))),
            BulkView::Null => Ok(None),
            BulkView::Other(Reply::Error(msg)) => Err(Error::server(msg)),
            BulkView::Other(other) => Err(Error::Type(format!(
                "expected bulk reply, got {}",
                other.type_name()
            ))),
        }
    }

    // ── Pipeline primitives ────────────────────────────────────────

    /// Encode a command onto the write buffer without sending it.
    pub fn queue(&mut self, command: &str, args: &[Argument]) -> Result<()> {
        encode_request(&mut self.wbuf, command, args)?;
        self.queued += 1;
        Ok(())
    }

    /// Bytes currently queued and not yet written.
    pub fn queued_len(&self) -> usize {
        self.wbuf.position()
    }

    /// Drop queued requests that were never written.
    pub fn discard_queued(&mut self) {
        self.wbuf.reset();
        self.queued = 0;
    }

    /// Write everything queued in one go, then prepare to read replies.
    pub async fn flush_queued(&mut self) -> Result<()> {
        self.in_flight += std::mem::take(&mut self.queued);
        let result = self.stream.write_all(self.wbuf.as_slice()).await;
        self.wbuf.reset();
        self.rbuf.reset();
        self.checked(result.map_err(Error::from))
    }

    /// Decode the next reply, keeping `-` replies as [`Reply::Error`] values.
    pub async fn read_reply(&mut self) -> Result<Reply> {
        let result = self.reader().read_reply().await;
        if result.is_ok() {
            self.in_flight = self.in_flight.saturating_sub(1);
        }
        self.checked(result)
    }

    // ── Setup commands ─────────────────────────────────────────────

    /// Select a logical database. Database 0 is the default and sends nothing.
    pub async fn select_db(&mut self, db: u16) -> Result<()> {
        if db == 0 {
            return Ok(());
        }
        match self.send("SELECT", &[Argument::int(i64::from(db))]).await? {
            Reply::Status(ref s) if s == "OK" => {
                debug!(db, "database selected");
                Ok(())
            }
            other => Err(Error::Type(format!(
                "unexpected SELECT reply: {}",
                other.type_name()
            ))),
        }
    }

    /// Send PING and verify the reply is `+PONG`.
    pub async fn ping(&mut self) -> Result<()> {
        match self.send("PING", &[]).await? {
            Reply::Status(ref s) if s == "PONG" => Ok(()),
            other => Err(Error::Type(format!(
                "unexpected PING reply: {}",
                other.type_name()
            ))),
        }
    }

    // ── Internals ──────────────────────────────────────────────────

    fn reader(&mut self) -> ReplyReader<'_, TcpStream> {
        ReplyReader::with_limit(&mut self.stream, &mut self.rbuf, self.max_buffer_size)
    }

    async fn write_request(&mut self, command: &str, args: &[Argument]) -> Result<()> {
        self.wbuf.reset();
        self.queued = 0;
        encode_request(&mut self.wbuf, command, args)?;
        // Raised before the first byte goes out: a partial write owes a reply too.
        self.in_flight += 1;
        self.stream.write_all(self.wbuf.as_slice()).await?;
        Ok(())
    }

    /// Write one request and decode its reply into `scratch`, or into the
    /// shared read buffer when `scratch` is `None`.
    async fn round_trip(
        &mut self,
        command: &str,
        args: &[Argument],
        scratch: Option<&mut ByteBuffer>,
    ) -> Result<Reply> {
        self.write_request(command, args).await?;
        let rbuf = match scratch {
            Some(buf) => buf,
            None => {
                self.rbuf.reset();
                &mut self.rbuf
            }
        };
        let reply = ReplyReader::with_limit(&mut self.stream, rbuf, self.max_buffer_size)
            .read_reply()
            .await?;
        self.in_flight -= 1;
        match reply {
            Reply::Error(msg) => Err(Error::server(msg)),
            reply => Ok(reply),
        }
    }

    /// Record fatal errors before handing the result back.
    fn checked<T>(&mut self, result: Result<T>) -> Result<T> {
        if let Err(ref e) = result {
            if e.is_fatal() {
                self.broken = true;
            }
        }
        result
    }
}

// ── Tests ──────────────────────────────────────────────────────────
