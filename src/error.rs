use std::fmt;
use std::io;

// ── Error taxonomy ─────────────────────────────────────────────────
//
//  Error
//  ├── Connection   fatal, connection discarded
//  ├── Protocol     fatal, connection discarded
//  ├── Format       fatal, connection discarded
//  ├── Server       recoverable, connection returned
//  │   └── ServerErrorKind (ERR, WRONGTYPE, NOSCRIPT, …)
//  ├── Argument     raised before any I/O
//  ├── Type
//  ├── NotFound
//  └── Config

/// Structured server error kinds for programmatic matching.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServerErrorKind {
    /// Generic ERR
    Err,
    /// WRONGTYPE Operation against a key holding the wrong kind of value
    WrongType,
    /// LOADING the server is loading the dataset in memory
    Loading,
    /// READONLY You can't write against a read only replica
    ReadOnly,
    /// NOSCRIPT No matching script
    NoScript,
    /// BUSY the server is busy running a script
    Busy,
    /// Any other error prefix
    Other(String),
}

impl ServerErrorKind {
    /// Classify an error line (e.g. "WRONGTYPE Operation against…") by its prefix.
    pub fn from_error_msg(msg: &str) -> Self {
        let prefix = msg.split_whitespace().next().unwrap_or("");
        match prefix {
            "ERR" => Self::Err,
            "WRONGTYPE" => Self::WrongType,
            "LOADING" => Self::Loading,
            "READONLY" => Self::ReadOnly,
            "NOSCRIPT" => Self::NoScript,
            "BUSY" => Self::Busy,
            "" => Self::Other("UNKNOWN".to_string()),
            other => Self::Other(other.to_string()),
        }
    }
}

/// All error variants for respool.
#[derive(Debug)]
pub enum Error {
    /// Dial or transport failure, including EOF and connect timeouts.
    Connection(io::Error),
    /// Unrecognized reply tag or broken framing; the stream is desynchronized.
    Protocol(String),
    /// A reply token that should be numeric was not.
    Format(String),
    /// The server answered with a `-` reply.
    Server {
        kind: ServerErrorKind,
        message: String,
    },
    /// Invalid caller input, rejected before anything is written.
    Argument(String),
    /// The reply shape did not match what the command returns.
    Type(String),
    /// The key does not exist.
    NotFound,
    /// Invalid configuration or connection URL.
    Config(String),
}

impl Error {
    /// Create a server error from a raw error line, classifying its kind.
    pub fn server(msg: impl Into<String>) -> Self {
        let message = msg.into();
        let kind = ServerErrorKind::from_error_msg(&message);
        Self::Server { kind, message }
    }

    /// True when the connection that produced this error can no longer be
    /// trusted and must not go back to the pool.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::Connection(_) | Self::Protocol(_) | Self::Format(_)
        )
    }

    /// True for a `-` reply from the server.
    pub fn is_server(&self) -> bool {
        matches!(self, Self::Server { .. })
    }

    /// The server error kind, if this is a server error.
    pub fn server_kind(&self) -> Option<&ServerErrorKind> {
        match self {
            Self::Server { kind, .. } => Some(kind),
            _ => None,
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Connection(e) => write!(f, "connection error: {e}"),
            Self::Protocol(msg) => write!(f, "protocol error: {msg}"),
            Self::Format(msg) => write!(f, "format error: {msg}"),
            Self::Server { message, .. } => write!(f, "server error: {message}"),
            Self::Argument(msg) => write!(f, "argument error: {msg}"),
            Self::Type(msg) => write!(f, "type error: {msg}"),
            Self::NotFound => write!(f, "key does not exist"),
            Self::Config(msg) => write!(f, "config error: {msg}"),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Connection(e) => Some(e),
            _ => None,
        }
    }
}

impl From<io::Error> for Error {
    fn from(e: io::Error) -> Self {
        Self::Connection(e)
    }
}

pub type Result<T> = std::result::Result<T, Error>;

// ── Tests ──────────────────────────────────────────────────────────
