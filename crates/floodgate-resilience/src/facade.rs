//! The resilient database facade.

use crate::circuit::{Circuit, CircuitState};
use crate::config::ResilienceConfig;
use crate::error::{AccessError, CIRCUIT_OPEN_MESSAGE};
use crate::events::ResilienceEvent;
use crate::metrics::{MetricsRegistry, MetricsSnapshot};
use crate::policy::{OperationClass, OperationPolicy, PolicyTable};
use floodgate_pool::{Connector, PoolError, PoolManager, PoolStatus};
use futures::future::BoxFuture;
use std::fmt::Display;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

/// Combined snapshot of pool, breaker, and uptime.
#[derive(Debug, Clone)]
pub struct AccessStatus {
    /// Pool-side view: connections and queue.
    pub pool: PoolStatus,
    /// Current circuit breaker state.
    pub circuit: CircuitState,
    /// Time since this facade was constructed.
    pub uptime: Duration,
}

/// Retry, circuit breaking, and metrics over a [`PoolManager`].
///
/// The facade never touches pool internals; every operation goes through
/// [`PoolManager::execute`]. Construct one instance at startup and hand it
/// by reference to callers.
///
/// # Example
///
/// ```rust
/// use floodgate_pool::{ConnectError, FnConnector, PoolConfig, PoolManager};
/// use floodgate_resilience::{op, OperationClass, Resilient, ResilienceConfig};
///
/// struct MemoryConn;
///
/// impl MemoryConn {
///     async fn fetch_user(&mut self, _id: u64) -> Result<String, String> {
///         Ok("ada".to_string())
///     }
/// }
///
/// # async fn example() {
/// let pool = PoolManager::new(
///     PoolConfig::builder().max_connections(10).build(),
///     FnConnector::new(|| async { Ok::<_, ConnectError>(MemoryConn) }),
/// );
/// let db = Resilient::new(ResilienceConfig::builder().name("storefront").build(), pool);
///
/// let user = db
///     .execute(
///         "get_user_by_id",
///         OperationClass::Read,
///         op(|conn: &mut MemoryConn| Box::pin(async move { conn.fetch_user(1).await })),
///     )
///     .await;
/// # let _ = user;
/// # }
/// ```
pub struct Resilient<C: Connector> {
    pool: PoolManager<C>,
    circuit: Mutex<Circuit>,
    circuit_state: Arc<AtomicU8>,
    config: ResilienceConfig,
    policies: PolicyTable,
    metrics: MetricsRegistry,
    started: Instant,
}

impl<C: Connector> Resilient<C> {
    /// Wraps the pool with the given configuration.
    pub fn new(config: ResilienceConfig, pool: PoolManager<C>) -> Self {
        let circuit_state = Arc::new(AtomicU8::new(CircuitState::Closed as u8));
        let policies = PolicyTable::new(config.retries, config.retry_delay);
        let metrics = MetricsRegistry::new(config.name.clone());
        Self {
            pool,
            circuit: Mutex::new(Circuit::new_with_atomic(Arc::clone(&circuit_state))),
            circuit_state,
            config,
            policies,
            metrics,
            started: Instant::now(),
        }
    }

    /// Replaces the policy table built from the configuration defaults.
    pub fn with_policies(mut self, policies: PolicyTable) -> Self {
        self.policies = policies;
        self
    }

    /// The wrapped pool.
    pub fn pool(&self) -> &PoolManager<C> {
        &self.pool
    }

    /// Current circuit state, read without locking.
    pub fn circuit_state(&self) -> CircuitState {
        CircuitState::from_u8(self.circuit_state.load(Ordering::Acquire))
    }

    /// Runs a named operation with the policy its class resolves to.
    pub async fn execute<T, E, F>(
        &self,
        name: &str,
        class: OperationClass,
        op: F,
    ) -> Result<T, AccessError<E>>
    where
        F: for<'c> Fn(&'c mut C::Conn) -> BoxFuture<'c, Result<T, E>>,
        E: Display,
    {
        let policy = self.policies.resolve(name, class);
        self.execute_with(name, policy, op).await
    }

    /// Convenience wrapper for read operations.
    pub async fn read<T, E, F>(&self, name: &str, op: F) -> Result<T, AccessError<E>>
    where
        F: for<'c> Fn(&'c mut C::Conn) -> BoxFuture<'c, Result<T, E>>,
        E: Display,
    {
        self.execute(name, OperationClass::Read, op).await
    }

    /// Convenience wrapper for ordinary writes.
    pub async fn write<T, E, F>(&self, name: &str, op: F) -> Result<T, AccessError<E>>
    where
        F: for<'c> Fn(&'c mut C::Conn) -> BoxFuture<'c, Result<T, E>>,
        E: Display,
    {
        self.execute(name, OperationClass::Write, op).await
    }

    /// Convenience wrapper for business-critical writes.
    pub async fn critical<T, E, F>(&self, name: &str, op: F) -> Result<T, AccessError<E>>
    where
        F: for<'c> Fn(&'c mut C::Conn) -> BoxFuture<'c, Result<T, E>>,
        E: Display,
    {
        self.execute(name, OperationClass::Critical, op).await
    }

    /// Runs a named operation under an explicit per-call policy.
    ///
    /// The circuit is consulted once per operation; transient failures are
    /// retried up to `policy.retries` times, each retry acquiring a fresh
    /// connection from the pool. One outcome is recorded against the breaker
    /// regardless of how many attempts were made.
    pub async fn execute_with<T, E, F>(
        &self,
        name: &str,
        policy: OperationPolicy,
        op: F,
    ) -> Result<T, AccessError<E>>
    where
        F: for<'c> Fn(&'c mut C::Conn) -> BoxFuture<'c, Result<T, E>>,
        E: Display,
    {
        {
            let mut circuit = self.circuit.lock().unwrap();
            if !circuit.try_acquire(&self.config) {
                drop(circuit);
                self.metrics.record_attempt(name);
                self.metrics.record_failure(CIRCUIT_OPEN_MESSAGE.to_string());

                #[cfg(feature = "tracing")]
                tracing::debug!(facade = %self.config.name, operation = name, "circuit open, failing fast");

                return Err(AccessError::CircuitOpen);
            }
        }

        let started = Instant::now();
        let mut attempt: u32 = 0;
        let outcome: Result<T, PoolError<E>> = loop {
            self.metrics.record_attempt(name);
            match self.pool.execute(&op, policy.priority, policy.timeout).await {
                Ok(value) => break Ok(value),
                Err(error) => {
                    let message = error.to_string();
                    if attempt < policy.retries && self.config.classifier.is_transient(&message) {
                        attempt += 1;

                        #[cfg(feature = "tracing")]
                        tracing::debug!(
                            facade = %self.config.name,
                            operation = name,
                            attempt,
                            error = %message,
                            "transient failure, retrying"
                        );

                        self.config
                            .event_listeners
                            .emit(&ResilienceEvent::RetryScheduled {
                                source: self.config.name.clone(),
                                timestamp: Instant::now(),
                                attempt,
                                delay: policy.retry_delay,
                            });

                        tokio::time::sleep(policy.retry_delay).await;
                        continue;
                    }
                    break Err(error);
                }
            }
        };

        match &outcome {
            Ok(_) => {
                self.circuit.lock().unwrap().record_success(&self.config);
                let elapsed = started.elapsed();
                self.metrics.record_success(elapsed);
                self.config
                    .event_listeners
                    .emit(&ResilienceEvent::OperationSucceeded {
                        source: self.config.name.clone(),
                        timestamp: Instant::now(),
                        attempts: attempt + 1,
                        elapsed,
                    });
            }
            Err(error) => {
                self.circuit.lock().unwrap().record_failure(&self.config);
                self.metrics.record_failure(error.to_string());
                self.config
                    .event_listeners
                    .emit(&ResilienceEvent::OperationFailed {
                        source: self.config.name.clone(),
                        timestamp: Instant::now(),
                        attempts: attempt + 1,
                    });
            }
        }

        outcome.map_err(AccessError::Pool)
    }

    /// Combined snapshot: pool counters, circuit state, uptime.
    pub fn status(&self) -> AccessStatus {
        AccessStatus {
            pool: self.pool.status(),
            circuit: self.circuit_state(),
            uptime: self.started.elapsed(),
        }
    }

    /// Snapshot of the aggregate operation metrics.
    pub fn metrics(&self) -> MetricsSnapshot {
        self.metrics.snapshot()
    }

    /// Zeroes the aggregate metrics.
    pub fn reset_metrics(&self) {
        self.metrics.reset();
    }

    /// Operational recovery: resets the pool and closes the circuit.
    ///
    /// Metrics survive; use [`reset_metrics`](Self::reset_metrics) for those.
    pub fn reset(&self) {
        self.pool.reset();
        self.circuit.lock().unwrap().reset(&self.config);
    }
}
