//! Aggregate operation metrics kept by the facade.
//!
//! This registry is always on; the optional `metrics` cargo feature
//! additionally exports the same signals to a metrics recorder.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

#[cfg(feature = "metrics")]
use metrics::counter;

/// Point-in-time view of the facade's counters.
#[derive(Debug, Clone)]
pub struct MetricsSnapshot {
    /// Attempts made, including retries and circuit rejections.
    pub total_operations: u64,
    /// Operations that ultimately succeeded.
    pub successful_operations: u64,
    /// Operations that ultimately failed.
    pub failed_operations: u64,
    /// Attempt counts keyed by operation name.
    pub operations: HashMap<String, u64>,
    /// Failure counts keyed by error message.
    pub errors: HashMap<String, u64>,
    /// Running average execution time of successful operations.
    pub average_execution_ms: f64,
    /// Time since the counters were last reset.
    pub uptime: Duration,
}

struct MetricsInner {
    total: u64,
    succeeded: u64,
    failed: u64,
    per_operation: HashMap<String, u64>,
    per_error: HashMap<String, u64>,
    average_execution_ms: f64,
    last_reset: Instant,
}

impl MetricsInner {
    fn new() -> Self {
        Self {
            total: 0,
            succeeded: 0,
            failed: 0,
            per_operation: HashMap::new(),
            per_error: HashMap::new(),
            average_execution_ms: 0.0,
            last_reset: Instant::now(),
        }
    }
}

/// Counters mutated by the facade after each completed attempt.
pub struct MetricsRegistry {
    name: String,
    inner: Mutex<MetricsInner>,
}

impl MetricsRegistry {
    pub(crate) fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            inner: Mutex::new(MetricsInner::new()),
        }
    }

    /// Counts one attempt of the named operation.
    pub(crate) fn record_attempt(&self, operation: &str) {
        let mut inner = self.inner.lock().unwrap();
        inner.total += 1;
        *inner
            .per_operation
            .entry(operation.to_string())
            .or_insert(0) += 1;

        #[cfg(feature = "metrics")]
        counter!(
            "facade_attempts_total",
            "facade" => self.name.clone(),
            "operation" => operation.to_string()
        )
        .increment(1);
    }

    /// Counts a final success and folds its latency into the running average.
    pub(crate) fn record_success(&self, elapsed: Duration) {
        let mut inner = self.inner.lock().unwrap();
        inner.succeeded += 1;
        let ms = elapsed.as_secs_f64() * 1000.0;
        let n = inner.succeeded as f64;
        inner.average_execution_ms += (ms - inner.average_execution_ms) / n;

        #[cfg(feature = "metrics")]
        counter!("facade_operations_succeeded_total", "facade" => self.name.clone()).increment(1);
    }

    /// Counts a final failure under its error message.
    pub(crate) fn record_failure(&self, message: String) {
        let mut inner = self.inner.lock().unwrap();
        inner.failed += 1;
        *inner.per_error.entry(message).or_insert(0) += 1;

        #[cfg(feature = "metrics")]
        counter!("facade_operations_failed_total", "facade" => self.name.clone()).increment(1);
    }

    /// Takes a consistent snapshot of every counter.
    pub fn snapshot(&self) -> MetricsSnapshot {
        let inner = self.inner.lock().unwrap();
        MetricsSnapshot {
            total_operations: inner.total,
            successful_operations: inner.succeeded,
            failed_operations: inner.failed,
            operations: inner.per_operation.clone(),
            errors: inner.per_error.clone(),
            average_execution_ms: inner.average_execution_ms,
            uptime: inner.last_reset.elapsed(),
        }
    }

    /// Zeroes every counter and restarts the uptime clock.
    pub fn reset(&self) {
        let mut inner = self.inner.lock().unwrap();
        *inner = MetricsInner::new();
    }

    /// Name of the owning facade, used in exported metric labels.
    pub fn name(&self) -> &str {
        &self.name
    }
}
