//! RESP request serializer.
//!
//! Encodes a command into the bulk string array wire format:
//! `*<N>\r\n$<len>\r\n<cmd>\r\n$<len>\r\narg1\r\n…`

use crate::buffer::ByteBuffer;
use crate::error::{Error, Result};
use crate::resp::types::Argument;

/// Append one request to `buf` at its current position.
///
/// The buffer is not reset, so repeated calls queue requests back to back
/// (that is how pipelines batch). Each argument is a binary-safe bulk string.
///
/// # Example
/// ```ignore
/// encode_request(&mut buf, "SET", &args!["key", "value"])?;
/// // → *3\r\n$3\r\nSET\r\n$3\r\nkey\r\n$5\r\nvalue\r\n
/// ```
pub fn encode_request(buf: &mut ByteBuffer, command: &str, args: &[Argument]) -> Result<()> {
    if command.is_empty() {
        return Err(Error::Argument("command name must not be empty".into()));
    }

    // Reserve everything up front so the tokens below never regrow
    let mut cap = 1 + 20 + 2 + 1 + 20 + 2 + command.len() + 2;
    for arg in args {
        cap += 1 + 20 + 2 + arg.len() + 2;
    }
    buf.ensure_space(cap);

    // *<N>\r\n
    buf.write_u8(b'*');
    buf.write_unsigned_int(args.len() + 1);

    buf.write_bytes(command.as_bytes());
    for arg in args {
        buf.write_bytes(arg.as_bytes());
    }
    Ok(())
}

// ── Tests ──────────────────────────────────────────────────────────
