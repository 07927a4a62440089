//! Comprehensive tests for the circuit breaker.
//!
//! Test organization:
//! - thresholds.rs: consecutive-failure counting and fast-fail behavior
//! - half_open.rs: lazy recovery probing
//! - reset.rs: operational reset

mod reset;
mod thresholds;

use floodgate_pool::{ConnectError, Connector, FnConnector, PoolConfig, PoolManager};
use floodgate_resilience::{Resilient, ResilienceConfig};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

pub struct TestConn;

/// Facade over a counting in-memory connector.
pub fn facade(
    resilience: ResilienceConfig,
) -> (
    Arc<Resilient<impl Connector<Conn = TestConn>>>,
    Arc<AtomicUsize>,
) {
    let connects = Arc::new(AtomicUsize::new(0));
    let c = Arc::clone(&connects);
    let pool = PoolManager::new(
        PoolConfig::builder().max_connections(5).name("cb-test").build(),
        FnConnector::new(move || {
            c.fetch_add(1, Ordering::SeqCst);
            async { Ok::<_, ConnectError>(TestConn) }
        }),
    );
    (Arc::new(Resilient::new(resilience, pool)), connects)
}

/// Breaker config with retries disabled, so one call is one pool attempt.
pub fn breaker_config(threshold: u32, reset_ms: u64) -> ResilienceConfig {
    ResilienceConfig::builder()
        .failure_threshold(threshold)
        .circuit_reset_timeout(std::time::Duration::from_millis(reset_ms))
        .retries(0)
        .name("cb-test")
        .build()
}
