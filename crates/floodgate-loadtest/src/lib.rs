//! Synthetic load harness for the floodgate access layer.
//!
//! Spawns configurable concurrent simulated users against either the pooled
//! path (through the resilient facade) or a direct path that opens a fresh
//! connection per request, and aggregates a comparative performance report:
//! throughput, latency distribution, per-second time series, and grouped
//! errors. The fixed-width text rendering is a stable operator artifact; a
//! serialized form of the same report is available for machines.
//!
//! ```rust
//! use floodgate_loadtest::{LoadTestConfig, LoadTester, OperationMix};
//! use floodgate_pool::{ConnectError, FnConnector, PoolConfig, PoolManager};
//! use floodgate_resilience::{Resilient, ResilienceConfig};
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! struct MemoryConn;
//!
//! # async fn example() {
//! let connector = Arc::new(FnConnector::new(|| async { Ok::<_, ConnectError>(MemoryConn) }));
//! let pool = PoolManager::new(PoolConfig::default(), Arc::clone(&connector));
//! let facade = Arc::new(Resilient::new(ResilienceConfig::default(), pool));
//!
//! let tester = LoadTester::new(
//!     LoadTestConfig::builder()
//!         .concurrent_users(25)
//!         .test_duration(Duration::from_secs(30))
//!         .operation(OperationMix::Mixed)
//!         .use_connection_pool(true)
//!         .build(),
//!     facade,
//!     connector,
//!     |_conn: &mut MemoryConn| Box::pin(async move { Ok(()) }),
//!     |_conn: &mut MemoryConn| Box::pin(async move { Ok(()) }),
//! );
//!
//! let report = tester.run().await;
//! assert_eq!(
//!     report.total_requests,
//!     report.successful_requests + report.failed_requests
//! );
//! println!("{}", report.render());
//! # }
//! ```

pub mod config;
pub mod report;
pub mod runner;

pub use config::{LoadTestConfig, LoadTestConfigBuilder, OperationMix};
pub use report::{ErrorEntry, LoadTestReport, TimePoint};
pub use runner::{DynError, LoadTester, SimulatedOp};
