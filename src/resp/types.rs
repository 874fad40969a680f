use bytes::Bytes;

/// One decoded reply. Exactly five shapes exist on the wire.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    /// +OK\r\n
    Status(String),
    /// -ERR message\r\n
    Error(String),
    /// :1000\r\n
    Integer(i64),
    /// $6\r\nfoobar\r\n, or $-1\r\n as `None`
    Bulk(Option<Bytes>),
    /// *2\r\n…, or *-1\r\n as `None`
    Array(Option<Vec<Reply>>),
}

// ── Convenience accessors ──────────────────────────────────────────

impl Reply {
    /// Try to interpret this reply as a UTF-8 string.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Status(s) => Some(s),
            Self::Bulk(Some(b)) => std::str::from_utf8(b).ok(),
            _ => None,
        }
    }

    /// Try to interpret this reply as bytes.
    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Self::Bulk(Some(b)) => Some(b),
            Self::Status(s) => Some(s.as_bytes()),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Self::Integer(i) => Some(*i),
            _ => None,
        }
    }

    /// Take the payload of a non-null bulk reply.
    pub fn into_bytes(self) -> Option<Bytes> {
        match self {
            Self::Bulk(b) => b,
            _ => None,
        }
    }

    /// Take the elements of a non-null array reply.
    pub fn into_array(self) -> Option<Vec<Reply>> {
        match self {
            Self::Array(a) => a,
            _ => None,
        }
    }

    /// True for the null bulk (`$-1`) and the null array (`*-1`).
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Bulk(None) | Self::Array(None))
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Self::Error(_))
    }

    /// True for a `+OK` status.
    pub fn is_ok(&self) -> bool {
        matches!(self, Self::Status(s) if s == "OK")
    }

    /// Returns the type name as a static string (useful for error messages).
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Status(_) => "status",
            Self::Error(_) => "error",
            Self::Integer(_) => "integer",
            Self::Bulk(Some(_)) => "bulk",
            Self::Bulk(None) => "null_bulk",
            Self::Array(Some(_)) => "array",
            Self::Array(None) => "null_array",
        }
    }
}

/// A single command argument.
///
/// Arguments are never interpreted, only length-framed on the wire. Integers
/// are passed as their decimal text via [`Argument::int`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Argument {
    Text(String),
    Raw(Bytes),
}

impl Argument {
    /// Decimal text of a signed integer.
    pub fn int(n: i64) -> Self {
        Self::Text(itoa::Buffer::new().format(n).to_string())
    }

    pub fn as_bytes(&self) -> &[u8] {
        match self {
            Self::Text(s) => s.as_bytes(),
            Self::Raw(b) => b,
        }
    }

    pub fn len(&self) -> usize {
        self.as_bytes().len()
    }

    pub fn is_empty(&self) -> bool {
        self.as_bytes().is_empty()
    }
}

impl From<&str> for Argument {
    fn from(s: &str) -> Self {
        Self::Text(s.to_string())
    }
}

impl From<String> for Argument {
    fn from(s: String) -> Self {
        Self::Text(s)
    }
}

impl From<&String> for Argument {
    fn from(s: &String) -> Self {
        Self::Text(s.clone())
    }
}

impl From<&[u8]> for Argument {
    fn from(b: &[u8]) -> Self {
        Self::Raw(Bytes::copy_from_slice(b))
    }
}

impl<const N: usize> From<&[u8; N]> for Argument {
    fn from(b: &[u8; N]) -> Self {
        Self::Raw(Bytes::copy_from_slice(b))
    }
}

impl From<Vec<u8>> for Argument {
    fn from(b: Vec<u8>) -> Self {
        Self::Raw(Bytes::from(b))
    }
}

impl From<Bytes> for Argument {
    fn from(b: Bytes) -> Self {
        Self::Raw(b)
    }
}

/// Build a `Vec<Argument>` from mixed string and byte values.
///
/// ```ignore
/// let args = args!["key", b"value", Argument::int(10)];
/// ```
#[macro_export]
macro_rules! args {
    () => { ::std::vec::Vec::<$crate::resp::Argument>::new() };
    ($($arg:expr),+ $(,)?) => {
        ::std::vec![$($crate::resp::Argument::from($arg)),+]
    };
}

// ── Tests ──────────────────────────────────────────────────────────
