//! Bounded connection pool with priority request queueing.
//!
//! The pool owns a bounded set of reusable backend connections and decides,
//! per operation, whether to reuse an idle connection, open a new one, or
//! queue the request. Queued requests are served strictly by
//! `(priority, arrival order)`; a periodic health pass retires idle, aged,
//! and error-flagged connections.
//!
//! # Basic Example
//!
//! ```rust
//! use floodgate_pool::{operation, ConnectError, FnConnector, PoolConfig, PoolManager, Priority};
//!
//! struct MemoryConn;
//!
//! # async fn example() {
//! let config = PoolConfig::builder()
//!     .max_connections(10)
//!     .max_queue_size(100)
//!     .name("storefront")
//!     .build();
//!
//! let pool = PoolManager::new(
//!     config,
//!     FnConnector::new(|| async { Ok::<_, ConnectError>(MemoryConn) }),
//! );
//!
//! let rows: Result<u64, _> = pool
//!     .execute(
//!         operation(|_conn: &mut MemoryConn| Box::pin(async move { Ok::<_, String>(42) })),
//!         Priority::Normal,
//!         None,
//!     )
//!     .await;
//! # let _ = rows;
//! # }
//! ```
//!
//! # Example with Event Listeners
//!
//! ```rust
//! use floodgate_pool::PoolConfig;
//!
//! let config = PoolConfig::builder()
//!     .max_connections(10)
//!     .name("monitored-pool")
//!     .on_connection_created(|pool_size| {
//!         println!("connection opened ({} in pool)", pool_size);
//!     })
//!     .on_queue_rejected(|capacity| {
//!         println!("queue full at {} waiting", capacity);
//!     })
//!     .build();
//! # let _ = config;
//! ```

pub mod config;
pub mod connection;
pub mod error;
pub mod events;
pub mod manager;
pub mod queue;

pub use config::{PoolConfig, PoolConfigBuilder};
pub use connection::{Connector, FnConnector};
pub use error::{ConnectError, PoolError};
pub use events::{PoolEvent, RetireReason};
pub use manager::{PoolManager, PoolStats, PoolStatus};
pub use queue::Priority;

use futures::future::BoxFuture;

/// Pins a closure to the higher-ranked signature [`PoolManager::execute`]
/// expects. Inline closures do not infer the `for<'c>` bound on their own.
///
/// ```rust
/// use floodgate_pool::operation;
///
/// let op = operation(|conn: &mut Vec<u8>| {
///     Box::pin(async move {
///         conn.push(1);
///         Ok::<_, String>(conn.len())
///     })
/// });
/// # let _ = op;
/// ```
pub fn operation<C, T, E, F>(f: F) -> F
where
    F: for<'c> FnOnce(&'c mut C) -> BoxFuture<'c, Result<T, E>>,
{
    f
}
