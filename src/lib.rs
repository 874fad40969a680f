//! Pooled async client for RESP-style key-value servers.
//!
//! ```ignore
//! use respool::{args, Client, ConnectionConfig};
//!
//! let client = Client::connect(ConnectionConfig::from_url("redis://127.0.0.1:6379/0")?).await?;
//! client.execute("SET", &args!["greeting", "hello"]).await?;
//! let value = client.get("greeting").await?;
//!
//! let mut pipe = client.pipeline().await?;
//! pipe.hincrby("stats", "hits", 1)?;
//! pipe.expire("stats", 60)?;
//! pipe.flush().await?;
//! ```
//!
//! The library emits `tracing` events and never installs a subscriber.

pub mod blocking;
pub mod buffer;
pub mod client;
pub mod commands;
pub mod config;
pub mod connection;
pub mod error;
pub mod pipeline;
pub mod resp;

pub use blocking::{BlockingClient, BlockingPipeline};
pub use client::{Client, PopDirection, Popped};
pub use config::ConnectionConfig;
pub use connection::ConnectionPool;
pub use error::{Error, Result, ServerErrorKind};
pub use pipeline::Pipeline;
pub use resp::{Argument, Reply};
