//! Synchronous facade for callers on plain OS threads.
//!
//! A [`BlockingClient`] owns a multi-threaded tokio runtime and a [`Client`]
//! whose I/O runs on it. Every method bridges with `Runtime::block_on`, so it
//! must not be called from inside an async context (tokio panics if it is).

use bytes::Bytes;
use tokio::runtime::Runtime;

use crate::client::{Client, PopDirection, Popped};
use crate::config::ConnectionConfig;
use crate::error::{Error, Result};
use crate::pipeline::Pipeline;
use crate::resp::types::{Argument, Reply};

/// Environment variable overriding the number of runtime worker threads.
pub const RUNTIME_THREADS_ENV: &str = "RESPOOL_RUNTIME_THREADS";

fn build_runtime() -> Result<Runtime> {
    let mut builder = tokio::runtime::Builder::new_multi_thread();
    builder.enable_all();

    if let Ok(threads) = std::env::var(RUNTIME_THREADS_ENV) {
        if let Ok(n) = threads.parse::<usize>() {
            if n > 0 {
                builder.worker_threads(n);
            }
        }
    }

    builder
        .thread_name("respool-rt")
        .build()
        .map_err(Error::Connection)
}

/// A pooled client with a blocking API. Share it across threads by reference
/// or behind an `Arc`.
pub struct BlockingClient {
    // Declared first so pooled sockets close while the runtime still exists.
    client: Client,
    runtime: Runtime,
}

impl BlockingClient {
    /// Start a runtime, then connect exactly like [`Client::connect`].
    pub fn connect(config: ConnectionConfig) -> Result<Self> {
        let runtime = build_runtime()?;
        let client = runtime.block_on(Client::connect(config))?;
        Ok(Self { client, runtime })
    }

    /// The async handle, for work spawned onto [`runtime`](Self::runtime).
    pub fn client(&self) -> &Client {
        &self.client
    }

    pub fn runtime(&self) -> &Runtime {
        &self.runtime
    }

    pub fn execute(&self, command: &str, args: &[Argument]) -> Result<Reply> {
        self.runtime.block_on(self.client.execute(command, args))
    }

    pub fn execute_isolated(&self, command: &str, args: &[Argument]) -> Result<Reply> {
        self.runtime.block_on(self.client.execute_isolated(command, args))
    }

    pub fn ping(&self) -> Result<()> {
        self.runtime.block_on(self.client.ping())
    }

    /// See [`Client::get`]. A missing key is [`Error::NotFound`].
    pub fn get(&self, key: &str) -> Result<Bytes> {
        self.runtime.block_on(self.client.get(key))
    }

    pub fn get_string(&self, key: &str) -> Result<String> {
        self.runtime.block_on(self.client.get_string(key))
    }

    pub fn set(&self, key: &str, value: impl Into<Argument>) -> Result<()> {
        self.runtime.block_on(self.client.set(key, value))
    }

    pub fn del(&self, keys: &[&str]) -> Result<i64> {
        self.runtime.block_on(self.client.del(keys))
    }

    /// Blocks the calling thread for up to `timeout_secs` (0 = forever).
    pub fn block_pop(
        &self,
        direction: PopDirection,
        keys: &[&str],
        timeout_secs: u64,
    ) -> Result<Option<Popped>> {
        self.runtime
            .block_on(self.client.block_pop(direction, keys, timeout_secs))
    }

    pub fn pipeline(&self) -> Result<BlockingPipeline<'_>> {
        let inner = self.runtime.block_on(self.client.pipeline())?;
        Ok(BlockingPipeline {
            runtime: &self.runtime,
            inner,
        })
    }

    pub fn close_all(&self) {
        self.client.close_all();
    }

    pub fn idle_count(&self) -> usize {
        self.client.idle_count()
    }

    pub fn live_count(&self) -> usize {
        self.client.live_count()
    }
}

/// Blocking wrapper around [`Pipeline`].
pub struct BlockingPipeline<'a> {
    runtime: &'a Runtime,
    inner: Pipeline<'a>,
}

impl BlockingPipeline<'_> {
    pub fn append(&mut self, command: &str, args: &[Argument]) -> Result<()> {
        self.inner.append(command, args)
    }

    pub fn hincrby(&mut self, key: &str, field: &str, inc: i64) -> Result<()> {
        self.inner.hincrby(key, field, inc)
    }

    pub fn expire(&mut self, key: &str, seconds: u64) -> Result<()> {
        self.inner.expire(key, seconds)
    }

    pub fn ping(&mut self) -> Result<()> {
        self.inner.ping()
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    pub fn flush(self) -> Result<()> {
        self.runtime.block_on(self.inner.flush())
    }

    pub fn collect(self) -> Result<Vec<Reply>> {
        self.runtime.block_on(self.inner.collect())
    }
}

// ── Tests ──────────────────────────────────────────────────────────
