//! Resilient database facade for the floodgate connection pool.
//!
//! Wraps every domain operation with a consecutive-failure circuit breaker,
//! keyword-classified retry for transient errors, and aggregate metrics.
//! The facade layers strictly above the pool: pool-level rejections surface
//! verbatim, and only the facade ever retries.
//!
//! # Basic Example
//!
//! ```rust
//! use floodgate_pool::{ConnectError, FnConnector, PoolConfig, PoolManager};
//! use floodgate_resilience::{op, OperationClass, Resilient, ResilienceConfig};
//!
//! struct MemoryConn;
//!
//! # async fn example() {
//! let pool = PoolManager::new(
//!     PoolConfig::builder().max_connections(10).build(),
//!     FnConnector::new(|| async { Ok::<_, ConnectError>(MemoryConn) }),
//! );
//!
//! let db = Resilient::new(
//!     ResilienceConfig::builder()
//!         .failure_threshold(5)
//!         .retries(2)
//!         .name("storefront")
//!         .build(),
//!     pool,
//! );
//!
//! let count = db
//!     .read(
//!         "count_products",
//!         op(|_conn: &mut MemoryConn| Box::pin(async move { Ok::<_, String>(42u64) })),
//!     )
//!     .await;
//! # let _ = count;
//! # }
//! ```
//!
//! # Example with Event Listeners
//!
//! ```rust
//! use floodgate_resilience::ResilienceConfig;
//!
//! let config = ResilienceConfig::builder()
//!     .name("storefront")
//!     .on_state_transition(|from, to| {
//!         println!("circuit {:?} -> {:?}", from, to);
//!     })
//!     .on_retry(|attempt, delay| {
//!         println!("retry {} after {:?}", attempt, delay);
//!     })
//!     .build();
//! # let _ = config;
//! ```

pub mod circuit;
pub mod classifier;
pub mod config;
pub mod error;
pub mod events;
pub mod facade;
pub mod metrics;
pub mod policy;

pub use circuit::CircuitState;
pub use classifier::{FnClassifier, KeywordClassifier, TransientClassifier, TRANSIENT_KEYWORDS};
pub use config::{ResilienceConfig, ResilienceConfigBuilder};
pub use error::AccessError;
pub use events::ResilienceEvent;
pub use facade::{AccessStatus, Resilient};
pub use metrics::{MetricsRegistry, MetricsSnapshot};
pub use policy::{OperationClass, OperationPolicy, PolicyTable};

use futures::future::BoxFuture;

/// Pins a closure to the higher-ranked signature the facade expects.
/// Inline closures do not infer the `for<'c>` bound on their own.
///
/// Unlike [`floodgate_pool::operation`], the closure must be `Fn` rather
/// than `FnOnce`: the facade re-invokes it on every retry attempt.
pub fn op<C, T, E, F>(f: F) -> F
where
    F: for<'c> Fn(&'c mut C) -> BoxFuture<'c, Result<T, E>>,
{
    f
}
