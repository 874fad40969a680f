//! Growable byte region with explicit cursors.
//!
//! A write buffer only uses `pos`, the end of the bytes written so far.
//! A read buffer uses `pos` as the read cursor and `limit` as the end of the
//! bytes filled from the socket, keeping `0 <= pos <= limit <= capacity`.
//!
//! The backing storage is zero-initialized once and reused; `reset` moves
//! the cursors back to 0 without touching memory, so bytes past `limit` are
//! stale and never read.

/// Initial capacity of a connection's read and write buffers (2 KB).
pub const DEFAULT_BUFFER_SIZE: usize = 2 * 1024;

/// Default ceiling on a read buffer (512 MB). A reply that needs more is rejected.
pub const DEFAULT_MAX_BUFFER_SIZE: usize = 512 * 1024 * 1024;

/// Largest number of decimal digits a `usize` can need.
const MAX_USIZE_DIGITS: usize = 20;

/// A byte region with a cursor (write side) or a cursor and fill limit (read side).
#[derive(Debug, Clone)]
pub struct ByteBuffer {
    buf: Vec<u8>,
    pos: usize,
    limit: usize,
}

impl Default for ByteBuffer {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_BUFFER_SIZE)
    }
}

impl ByteBuffer {
    /// Allocate a zeroed buffer of `capacity` bytes.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            buf: vec![0; capacity],
            pos: 0,
            limit: 0,
        }
    }

    pub fn capacity(&self) -> usize {
        self.buf.len()
    }

    pub fn position(&self) -> usize {
        self.pos
    }

    pub fn limit(&self) -> usize {
        self.limit
    }

    /// Rewind both cursors to 0. Storage is kept as-is.
    pub fn reset(&mut self) {
        self.pos = 0;
        self.limit = 0;
    }

    // ── Write side ─────────────────────────────────────────────────

    /// The bytes written so far.
    pub fn as_slice(&self) -> &[u8] {
        &self.buf[..self.pos]
    }

    /// Guarantee `extra` writable bytes after `pos`.
    ///
    /// Doubles the capacity, or grows to an exact fit when doubling is not
    /// enough. Everything left of `pos` is preserved.
    pub fn ensure_space(&mut self, extra: usize) {
        let needed = self.pos + extra;
        if needed <= self.buf.len() {
            return;
        }
        let new_cap = (self.buf.len() * 2).max(needed);
        self.buf.resize(new_cap, 0);
    }

    pub fn write_u8(&mut self, b: u8) {
        self.ensure_space(1);
        self.buf[self.pos] = b;
        self.pos += 1;
    }

    pub fn write_slice(&mut self, data: &[u8]) {
        self.ensure_space(data.len());
        self.buf[self.pos..self.pos + data.len()].copy_from_slice(data);
        self.pos += data.len();
    }

    pub fn write_crlf(&mut self) {
        self.write_slice(b"\r\n");
    }

    /// Append the decimal digits of `n` followed by CRLF.
    pub fn write_unsigned_int(&mut self, n: usize) {
        self.ensure_space(MAX_USIZE_DIGITS + 2);
        if n < 10 {
            self.buf[self.pos] = b'0' + n as u8;
            self.pos += 1;
        } else {
            // Digits come out least significant first, then get flipped.
            let start = self.pos;
            let mut end = start;
            let mut rest = n;
            while rest > 0 {
                self.buf[end] = b'0' + (rest % 10) as u8;
                rest /= 10;
                end += 1;
            }
            self.buf[start..end].reverse();
            self.pos = end;
        }
        self.write_crlf();
    }

    /// Append a bulk token: `$<len>\r\n<data>\r\n`.
    pub fn write_bytes(&mut self, data: &[u8]) {
        self.ensure_space(1 + MAX_USIZE_DIGITS + 2 + data.len() + 2);
        self.write_u8(b'$');
        self.write_unsigned_int(data.len());
        self.write_slice(data);
        self.write_crlf();
    }

    // ── Read side ──────────────────────────────────────────────────

    /// Bytes filled but not yet consumed.
    pub fn unread(&self) -> &[u8] {
        &self.buf[self.pos..self.limit]
    }

    pub fn available(&self) -> usize {
        self.limit - self.pos
    }

    /// Consume `n` unread bytes.
    pub fn advance(&mut self, n: usize) {
        debug_assert!(self.pos + n <= self.limit, "advance past fill limit");
        self.pos = (self.pos + n).min(self.limit);
    }

    /// Free space after `limit`, to be filled from the socket.
    pub fn spare_mut(&mut self) -> &mut [u8] {
        &mut self.buf[self.limit..]
    }

    /// Mark `n` bytes of the spare region as filled.
    pub fn fill(&mut self, n: usize) {
        debug_assert!(self.limit + n <= self.buf.len(), "fill past capacity");
        self.limit = (self.limit + n).min(self.buf.len());
    }

    /// Absolute slice of the backing storage.
    pub fn slice(&self, range: std::ops::Range<usize>) -> &[u8] {
        &self.buf[range]
    }

    /// Shift the unread bytes to offset 0.
    pub fn compact(&mut self) {
        if self.pos == 0 {
            return;
        }
        self.buf.copy_within(self.pos..self.limit, 0);
        self.limit -= self.pos;
        self.pos = 0;
    }

    /// Guarantee `extra` fillable bytes after `limit`.
    ///
    /// Compacts first; grows (doubling or exact-fit) only if the unread
    /// bytes still leave too little room.
    pub fn ensure_read_space(&mut self, extra: usize) {
        self.ensure_read_space_within(extra, usize::MAX);
    }

    /// Like [`ensure_read_space`](Self::ensure_read_space), but doubling
    /// stops at `max_capacity`. An exact fit beyond it is still honored;
    /// callers bound `extra` themselves.
    pub fn ensure_read_space_within(&mut self, extra: usize, max_capacity: usize) {
        if self.limit + extra <= self.buf.len() {
            return;
        }
        self.compact();
        let needed = self.limit + extra;
        if needed <= self.buf.len() {
            return;
        }
        let new_cap = (self.buf.len() * 2).min(max_capacity).max(needed);
        self.buf.resize(new_cap, 0);
    }
}

// ── Tests ──────────────────────────────────────────────────────────
