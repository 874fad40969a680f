pub mod pool;
pub mod tcp;

pub use pool::{ConnectionPool, PooledConnection};
pub use tcp::Connection;
