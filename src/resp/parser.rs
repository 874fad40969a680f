//! Streaming RESP reply decoder.
//!
//! [`ReplyReader`] decodes one reply at a time out of a [`ByteBuffer`],
//! pulling more bytes from the stream whenever the current token (a line or
//! a fixed-length bulk payload) is not fully buffered. Those reads are the
//! only suspension points.
//!
//! Bulk payloads are copied out into owned `Bytes`, so a decoded [`Reply`]
//! never aliases the connection's reusable read buffer. [`ReplyReader::read_bulk_view`]
//! is the zero-copy exception: it hands back a range into the buffer.

use std::io;
use std::ops::Range;

use bytes::Bytes;
use memchr::memchr;
use tokio::io::{AsyncRead, AsyncReadExt};

use crate::buffer::{ByteBuffer, DEFAULT_MAX_BUFFER_SIZE};
use crate::error::{Error, Result};
use crate::resp::types::Reply;

/// Free space requested before each socket read while scanning for a line.
const MIN_READ_SPACE: usize = 512;

/// Upper bound on array pre-allocation, whatever count the server announces.
const MAX_PREALLOC: usize = 1024;

/// Result of [`ReplyReader::read_bulk_view`].
#[derive(Debug)]
pub enum BulkView {
    /// `$-1\r\n`
    Null,
    /// Payload location inside the read buffer.
    Data(Range<usize>),
    /// The reply was not a bulk string; it was decoded in full.
    Other(Reply),
}

/// Decodes replies from `stream`, buffering through `buf`.
///
/// A single line or bulk payload larger than `max_size` is rejected with
/// [`Error::Protocol`] before the buffer grows to hold it.
pub struct ReplyReader<'a, S> {
    stream: &'a mut S,
    buf: &'a mut ByteBuffer,
    max_size: usize,
}

impl<'a, S> ReplyReader<'a, S>
where
    S: AsyncRead + Unpin,
{
    pub fn new(stream: &'a mut S, buf: &'a mut ByteBuffer) -> Self {
        Self::with_limit(stream, buf, DEFAULT_MAX_BUFFER_SIZE)
    }

    pub fn with_limit(stream: &'a mut S, buf: &'a mut ByteBuffer, max_size: usize) -> Self {
        Self {
            stream,
            buf,
            max_size,
        }
    }

    /// Decode exactly one reply, including every nested element of an array.
    ///
    /// `-` replies come back as [`Reply::Error`] values; turning them into
    /// failures is the caller's decision.
    pub async fn read_reply(&mut self) -> Result<Reply> {
        // Open arrays: (elements still expected, elements decoded so far)
        let mut stack: Vec<(usize, Vec<Reply>)> = Vec::new();

        loop {
            let mut reply = match self.read_type_byte().await? {
                b'+' => {
                    let line = self.read_line().await?;
                    Reply::Status(self.lossy(line))
                }
                b'-' => {
                    let line = self.read_line().await?;
                    Reply::Error(self.lossy(line))
                }
                b':' => {
                    let line = self.read_line().await?;
                    let raw = self.buf.slice(line);
                    let n = parse_int_from_bytes(raw).ok_or_else(|| {
                        Error::Format(format!(
                            "integer reply is not numeric: {:?}",
                            String::from_utf8_lossy(raw)
                        ))
                    })?;
                    Reply::Integer(n)
                }
                b'$' => match self.read_length().await? {
                    None => Reply::Bulk(None),
                    Some(len) => {
                        let data = self.read_payload(len).await?;
                        Reply::Bulk(Some(Bytes::copy_from_slice(self.buf.slice(data))))
                    }
                },
                b'*' => match self.read_length().await? {
                    None => Reply::Array(None),
                    Some(0) => Reply::Array(Some(Vec::new())),
                    Some(count) => {
                        stack.push((count, Vec::with_capacity(count.min(MAX_PREALLOC))));
                        continue;
                    }
                },
                other => {
                    return Err(Error::Protocol(format!(
                        "unrecognized reply type: 0x{other:02x}"
                    )));
                }
            };

            // Fold the finished reply into its parent; close every array it completes.
            loop {
                let Some((remaining, items)) = stack.last_mut() else {
                    return Ok(reply);
                };
                items.push(reply);
                *remaining -= 1;
                if *remaining > 0 {
                    break;
                }
                reply = Reply::Array(Some(std::mem::take(items)));
                stack.pop();
            }
        }
    }

    /// Decode one top-level reply, leaving a bulk payload in place.
    ///
    /// The returned range indexes the read buffer and stays meaningful only
    /// until the buffer is next reset or filled.
    pub async fn read_bulk_view(&mut self) -> Result<BulkView> {
        while self.buf.available() == 0 {
            self.fill_more(MIN_READ_SPACE).await?;
        }
        if self.buf.unread()[0] != b'$' {
            return Ok(BulkView::Other(self.read_reply().await?));
        }
        self.buf.advance(1);
        match self.read_length().await? {
            None => Ok(BulkView::Null),
            Some(len) => Ok(BulkView::Data(self.read_payload(len).await?)),
        }
    }

    // ── Token readers ──────────────────────────────────────────────

    async fn read_type_byte(&mut self) -> Result<u8> {
        while self.buf.available() == 0 {
            self.fill_more(MIN_READ_SPACE).await?;
        }
        let b = self.buf.unread()[0];
        self.buf.advance(1);
        Ok(b)
    }

    /// Consume one line and return its range without the CRLF.
    async fn read_line(&mut self) -> Result<Range<usize>> {
        // Offset from the read cursor already known to hold no CR;
        // relative, so it survives compaction.
        let mut scanned = 0;
        loop {
            let unread = self.buf.unread();
            match memchr(b'\r', &unread[scanned..]) {
                Some(i) => {
                    let cr = scanned + i;
                    if cr + 1 < unread.len() {
                        if unread[cr + 1] != b'\n' {
                            return Err(Error::Protocol("expected \\n after \\r".into()));
                        }
                        let start = self.buf.position();
                        self.buf.advance(cr + 2);
                        return Ok(start..start + cr);
                    }
                    scanned = cr;
                }
                None => scanned = unread.len(),
            }
            let buffered = self.buf.available();
            if buffered >= self.max_size {
                return Err(Error::Protocol(format!(
                    "reply line too long: {buffered} bytes without CRLF, limit is {}",
                    self.max_size
                )));
            }
            self.fill_more(MIN_READ_SPACE.min(self.max_size - buffered)).await?;
        }
    }

    /// Read a `$` or `*` length line. `-1` means null.
    async fn read_length(&mut self) -> Result<Option<usize>> {
        let line = self.read_line().await?;
        let raw = self.buf.slice(line);
        match parse_int_from_bytes(raw) {
            Some(-1) => Ok(None),
            Some(n) if n >= 0 => usize::try_from(n)
                .map(Some)
                .map_err(|_| Error::Protocol(format!("length out of range: {n}"))),
            Some(n) => Err(Error::Protocol(format!("invalid negative length: {n}"))),
            None => Err(Error::Protocol(format!(
                "malformed length: {:?}",
                String::from_utf8_lossy(raw)
            ))),
        }
    }

    /// Consume `len` payload bytes plus CRLF, buffered contiguously.
    async fn read_payload(&mut self, len: usize) -> Result<Range<usize>> {
        let needed = len
            .checked_add(2)
            .ok_or_else(|| Error::Protocol("bulk length overflow".into()))?;
        if needed > self.max_size {
            return Err(Error::Protocol(format!(
                "bulk string too large: {len} bytes, limit is {}",
                self.max_size
            )));
        }
        while self.buf.available() < needed {
            let missing = needed - self.buf.available();
            self.fill_more(missing).await?;
        }
        let start = self.buf.position();
        let end = start + len;
        if self.buf.slice(end..end + 2) != b"\r\n" {
            return Err(Error::Protocol(
                "bulk string not terminated by \\r\\n".into(),
            ));
        }
        self.buf.advance(needed);
        Ok(start..end)
    }

    /// Read once from the stream, making room for at least `want` bytes first.
    async fn fill_more(&mut self, want: usize) -> Result<()> {
        let room = self.max_size.saturating_sub(self.buf.available());
        self.buf
            .ensure_read_space_within(want.min(room).max(1), self.max_size);
        let n = self.stream.read(self.buf.spare_mut()).await?;
        if n == 0 {
            return Err(Error::Connection(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                "connection closed by server",
            )));
        }
        self.buf.fill(n);
        Ok(())
    }

    fn lossy(&self, range: Range<usize>) -> String {
        String::from_utf8_lossy(self.buf.slice(range)).into_owned()
    }
}

/// Parse a base-10 signed integer (no allocations).
fn parse_int_from_bytes(bytes: &[u8]) -> Option<i64> {
    let (negative, digits) = match bytes.first()? {
        b'-' => (true, &bytes[1..]),
        b'+' => (false, &bytes[1..]),
        _ => (false, bytes),
    };
    if digits.is_empty() {
        return None;
    }

    // Accumulate as negative so i64::MIN does not overflow.
    let mut n: i64 = 0;
    for &b in digits {
        if !b.is_ascii_digit() {
            return None;
        }
        n = n.checked_mul(10)?.checked_sub((b - b'0') as i64)?;
    }
    if negative {
        Some(n)
    } else {
        n.checked_neg()
    }
}

// ── Tests ──────────────────────────────────────────────────────────
