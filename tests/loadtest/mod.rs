//! Comprehensive tests for the load harness.
//!
//! Test organization:
//! - aggregation.rs: report arithmetic and invariants
//! - report.rs: the fixed-width text artifact
//! - runner.rs: short end-to-end runs on both paths


use floodgate_loadtest::{LoadTestConfig, LoadTester};
use floodgate_pool::{ConnectError, Connector, FnConnector, PoolConfig, PoolManager};
use floodgate_resilience::{Resilient, ResilienceConfig};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

pub struct TestConn;

/// A tester over an in-memory backend whose operations take ~1ms, plus the
/// backend dial counter.
pub fn tester(config: LoadTestConfig) -> (LoadTester<impl Connector<Conn = TestConn>>, Arc<AtomicUsize>) {
    let connects = Arc::new(AtomicUsize::new(0));
    let c = Arc::clone(&connects);
    let connector = Arc::new(FnConnector::new(move || {
        c.fetch_add(1, Ordering::SeqCst);
        async { Ok::<_, ConnectError>(TestConn) }
    }));
    let pool = PoolManager::new(
        PoolConfig::builder().max_connections(8).name("loadtest").build(),
        Arc::clone(&connector),
    );
    let facade = Arc::new(Resilient::new(
        ResilienceConfig::builder().name("loadtest").build(),
        pool,
    ));

    let tester = LoadTester::new(
        config,
        facade,
        connector,
        |_conn: &mut TestConn| {
            Box::pin(async {
                tokio::time::sleep(Duration::from_millis(1)).await;
                Ok(())
            })
        },
        |_conn: &mut TestConn| {
            Box::pin(async {
                tokio::time::sleep(Duration::from_millis(1)).await;
                Ok(())
            })
        },
    );
    (tester, connects)
}
