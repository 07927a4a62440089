//! Connection pool manager: acquisition, dispatch, and health maintenance.

use crate::config::PoolConfig;
use crate::connection::{Connector, PooledConnection};
use crate::error::PoolError;
use crate::events::{PoolEvent, RetireReason};
use crate::queue::{AcquireFailure, Granted, Priority, RequestQueue};
use futures::future::BoxFuture;
use std::sync::{Arc, Mutex, Weak};
use std::time::{Duration, Instant};
use tokio::sync::oneshot;

#[cfg(feature = "metrics")]
use metrics::{counter, gauge};

/// Counters accumulated over the life of a pool.
#[derive(Debug, Clone, Default)]
pub struct PoolStats {
    /// Connections established.
    pub created: u64,
    /// Operations served by an already-open connection.
    pub reused: u64,
    /// Connections removed by health maintenance.
    pub retired: u64,
    /// Connection attempts that failed.
    pub failed_creates: u64,
    /// Queued requests that hit their timeout.
    pub timed_out: u64,
    /// Queued requests displaced by higher-priority submissions.
    pub evicted: u64,
    /// Submissions rejected at queue capacity.
    pub rejected: u64,
}

/// Read-only snapshot of pool state. Taking one has no side effects.
#[derive(Debug, Clone)]
pub struct PoolStatus {
    /// Idle connections ready for immediate dispatch.
    pub available_connections: usize,
    /// Connections currently running an operation.
    pub busy_connections: usize,
    /// Requests waiting for a connection.
    pub queue_length: usize,
    /// Lifetime counters.
    pub stats: PoolStats,
}

struct PoolState<T> {
    entries: Vec<PooledConnection<T>>,
    queue: RequestQueue<T>,
    /// Connections being established; counted against `max_connections`.
    pending_creates: usize,
    next_connection_id: u64,
    next_request_id: u64,
    stats: PoolStats,
}

impl<T> PoolState<T> {
    fn new() -> Self {
        Self {
            entries: Vec::new(),
            queue: RequestQueue::new(),
            pending_creates: 0,
            next_connection_id: 0,
            next_request_id: 0,
            stats: PoolStats::default(),
        }
    }
}

struct Shared<C: Connector> {
    state: Mutex<PoolState<C::Conn>>,
    config: PoolConfig,
    connector: C,
}

/// Exclusive hold on one pool slot while an operation runs.
///
/// Releasing hands the freed connection straight to the most urgent queued
/// request. If the owning future is dropped mid-operation, the slot is
/// reclaimed on drop so capacity is never leaked.
struct ConnectionLease<C: Connector> {
    shared: Arc<Shared<C>>,
    id: u64,
    released: bool,
}

impl<C: Connector> ConnectionLease<C> {
    fn release(mut self, conn: C::Conn, failed: bool) {
        self.released = true;
        self.shared.release(self.id, conn, failed);
    }
}

impl<C: Connector> Drop for ConnectionLease<C> {
    fn drop(&mut self) {
        if !self.released {
            self.shared.discard(self.id);
        }
    }
}

enum AcquireDecision<T> {
    Reuse(Granted<T>),
    Create,
    Wait {
        id: u64,
        rx: oneshot::Receiver<Result<Granted<T>, AcquireFailure>>,
    },
    Reject(AcquireFailure),
}

/// Bounded pool of backend connections with priority-ordered queueing.
///
/// One instance is constructed at startup and passed by reference to every
/// caller; per-test instances stay fully isolated. All shared state lives
/// behind a single mutex that is never held across an await point.
///
/// # Example
///
/// ```rust
/// use floodgate_pool::{operation, ConnectError, FnConnector, PoolConfig, PoolManager, Priority};
///
/// struct MemoryConn;
///
/// impl MemoryConn {
///     async fn get(&mut self, _key: &str) -> Result<String, String> {
///         Ok("value".to_string())
///     }
/// }
///
/// # async fn example() {
/// let config = PoolConfig::builder()
///     .max_connections(5)
///     .name("storefront")
///     .build();
/// let pool = PoolManager::new(
///     config,
///     FnConnector::new(|| async { Ok::<_, ConnectError>(MemoryConn) }),
/// );
///
/// let value = pool
///     .execute(
///         operation(|conn: &mut MemoryConn| Box::pin(async move { conn.get("cart:1").await })),
///         Priority::Normal,
///         None,
///     )
///     .await;
/// # let _ = value;
/// # }
/// ```
pub struct PoolManager<C: Connector> {
    shared: Arc<Shared<C>>,
}

impl<C: Connector> Clone for PoolManager<C> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<C: Connector> PoolManager<C> {
    /// Creates the pool and starts its periodic health maintenance task.
    ///
    /// The task exits on its own once every handle to the pool is dropped.
    pub fn new(config: PoolConfig, connector: C) -> Self {
        let shared = Arc::new(Shared {
            state: Mutex::new(PoolState::new()),
            config,
            connector,
        });
        Self::spawn_health_task(Arc::downgrade(&shared));
        Self { shared }
    }

    fn spawn_health_task(weak: Weak<Shared<C>>) {
        let period = match weak.upgrade() {
            Some(shared) => shared.config.health_check_interval,
            None => return,
        };
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                interval.tick().await;
                match weak.upgrade() {
                    Some(shared) => shared.health_pass().await,
                    None => break,
                }
            }
        });
    }

    /// Runs `op` against a pooled connection.
    ///
    /// Dispatch order: reuse an idle connection, else open a new one while
    /// below `max_connections`, else queue at the given priority. `timeout`
    /// bounds only the time spent queued (defaulting to the configured
    /// acquisition timeout); an operation that has started always runs to
    /// completion.
    ///
    /// Inline closures usually need the [`operation`](crate::operation)
    /// helper to line up with the `for<'c>` bound.
    pub async fn execute<T, E, F>(
        &self,
        op: F,
        priority: Priority,
        timeout: Option<Duration>,
    ) -> Result<T, PoolError<E>>
    where
        F: for<'c> FnOnce(&'c mut C::Conn) -> BoxFuture<'c, Result<T, E>>,
    {
        let (mut conn, lease) = self.shared.acquire(priority, timeout).await?;
        let result = op(&mut conn).await;
        let failed = result.is_err();
        lease.release(conn, failed);
        result.map_err(PoolError::Operation)
    }

    /// Returns a read-only snapshot of pool state.
    pub fn status(&self) -> PoolStatus {
        let state = self.shared.state.lock().unwrap();
        PoolStatus {
            available_connections: state.entries.iter().filter(|e| !e.in_use).count(),
            busy_connections: state.entries.iter().filter(|e| e.in_use).count(),
            queue_length: state.queue.len(),
            stats: state.stats.clone(),
        }
    }

    /// Discards every connection and fails every queued request.
    ///
    /// Operational recovery hatch, not part of normal operation. Operations
    /// already running keep their connection until they finish; the handle
    /// is dropped on release.
    pub fn reset(&self) {
        self.shared.reset();
    }

    /// Runs one health maintenance pass immediately.
    ///
    /// The same pass the periodic task runs: retire idle, expired, and
    /// error-flagged connections, then hand one freed slot to the queue.
    pub async fn maintain(&self) {
        self.shared.health_pass().await;
    }
}

impl<C: Connector> Shared<C> {
    async fn acquire(
        self: &Arc<Self>,
        priority: Priority,
        timeout: Option<Duration>,
    ) -> Result<(C::Conn, ConnectionLease<C>), AcquireFailure> {
        let decision = self.decide(priority);

        match decision {
            AcquireDecision::Reuse(granted) => Ok(self.lease(granted)),
            AcquireDecision::Create => self.create_for_caller().await,
            AcquireDecision::Wait { id, rx } => {
                let wait = timeout.unwrap_or(self.config.acquisition_timeout);
                self.wait_for_grant(id, rx, wait).await
            }
            AcquireDecision::Reject(failure) => Err(failure),
        }
    }

    fn lease(self: &Arc<Self>, granted: Granted<C::Conn>) -> (C::Conn, ConnectionLease<C>) {
        (
            granted.conn,
            ConnectionLease {
                shared: Arc::clone(self),
                id: granted.id,
                released: false,
            },
        )
    }

    fn decide(&self, priority: Priority) -> AcquireDecision<C::Conn> {
        let mut state = self.state.lock().unwrap();
        let config = &self.config;

        // (a) reuse an idle, unexpired connection
        let reusable = state
            .entries
            .iter()
            .position(|e| e.is_available(config.max_idle_time, config.max_connection_lifetime));
        if let Some(pos) = reusable {
            let entry = &mut state.entries[pos];
            if let Some(conn) = entry.conn.take() {
                entry.in_use = true;
                let id = entry.id;
                let operations = entry.operations;
                state.stats.reused += 1;

                #[cfg(feature = "tracing")]
                tracing::debug!(pool = %config.name, connection = id, "reusing idle connection");

                #[cfg(feature = "metrics")]
                counter!("pool_connections_reused_total", "pool" => config.name.clone())
                    .increment(1);

                config.event_listeners.emit(&PoolEvent::ConnectionReused {
                    source: config.name.clone(),
                    timestamp: Instant::now(),
                    operations,
                });

                return AcquireDecision::Reuse(Granted { id, conn });
            }
        }

        // (b) open a new connection while below capacity
        if state.entries.len() + state.pending_creates < config.max_connections {
            state.pending_creates += 1;
            return AcquireDecision::Create;
        }

        // (c) queue, evicting a Low entry when a Critical/High submission
        // arrives at capacity
        if state.queue.len() >= config.max_queue_size {
            if matches!(priority, Priority::Normal | Priority::Low) {
                return self.reject_at_capacity(&mut state);
            }
            match state.queue.evict_newest_low() {
                Some(evicted) => {
                    state.stats.evicted += 1;

                    #[cfg(feature = "tracing")]
                    tracing::debug!(
                        pool = %config.name,
                        evicted = evicted.id,
                        "displacing queued low priority request"
                    );

                    #[cfg(feature = "metrics")]
                    counter!("pool_requests_evicted_total", "pool" => config.name.clone())
                        .increment(1);

                    config.event_listeners.emit(&PoolEvent::RequestEvicted {
                        source: config.name.clone(),
                        timestamp: Instant::now(),
                        priority: evicted.priority,
                    });

                    let _ = evicted.tx.send(Err(AcquireFailure::Evicted));
                }
                None => return self.reject_at_capacity(&mut state),
            }
        }

        let id = state.next_request_id;
        state.next_request_id += 1;
        let (tx, rx) = oneshot::channel();
        state.queue.push(id, priority, tx);

        #[cfg(feature = "metrics")]
        gauge!("pool_queue_depth", "pool" => config.name.clone()).set(state.queue.len() as f64);

        config.event_listeners.emit(&PoolEvent::RequestQueued {
            source: config.name.clone(),
            timestamp: Instant::now(),
            priority,
            queue_depth: state.queue.len(),
        });

        AcquireDecision::Wait { id, rx }
    }

    fn reject_at_capacity(&self, state: &mut PoolState<C::Conn>) -> AcquireDecision<C::Conn> {
        let config = &self.config;
        state.stats.rejected += 1;

        #[cfg(feature = "tracing")]
        tracing::warn!(pool = %config.name, capacity = config.max_queue_size, "queue full, rejecting request");

        #[cfg(feature = "metrics")]
        counter!("pool_requests_rejected_total", "pool" => config.name.clone()).increment(1);

        config.event_listeners.emit(&PoolEvent::QueueRejected {
            source: config.name.clone(),
            timestamp: Instant::now(),
            capacity: config.max_queue_size,
        });

        AcquireDecision::Reject(AcquireFailure::QueueFull {
            capacity: config.max_queue_size,
        })
    }

    /// Opens a connection for the calling request. The reserved slot was
    /// counted in `pending_creates` before the lock was dropped.
    async fn create_for_caller(
        self: &Arc<Self>,
    ) -> Result<(C::Conn, ConnectionLease<C>), AcquireFailure> {
        let config = &self.config;
        match self.connector.connect().await {
            Ok(conn) => {
                let (id, pool_size) = {
                    let mut state = self.state.lock().unwrap();
                    state.pending_creates -= 1;
                    state.stats.created += 1;
                    let id = state.next_connection_id;
                    state.next_connection_id += 1;
                    state.entries.push(PooledConnection::leased(id));
                    (id, state.entries.len())
                };

                #[cfg(feature = "tracing")]
                tracing::info!(pool = %config.name, connection = id, pool_size, "opened new connection");

                #[cfg(feature = "metrics")]
                counter!("pool_connections_created_total", "pool" => config.name.clone())
                    .increment(1);

                config.event_listeners.emit(&PoolEvent::ConnectionCreated {
                    source: config.name.clone(),
                    timestamp: Instant::now(),
                    pool_size,
                });

                Ok(self.lease(Granted { id, conn }))
            }
            Err(e) => {
                {
                    let mut state = self.state.lock().unwrap();
                    state.pending_creates -= 1;
                    state.stats.failed_creates += 1;
                }

                #[cfg(feature = "tracing")]
                tracing::warn!(pool = %config.name, error = %e, "connection establishment failed");

                #[cfg(feature = "metrics")]
                counter!("pool_connection_failures_total", "pool" => config.name.clone())
                    .increment(1);

                Err(AcquireFailure::Creation(e))
            }
        }
    }

    async fn wait_for_grant(
        self: &Arc<Self>,
        id: u64,
        mut rx: oneshot::Receiver<Result<Granted<C::Conn>, AcquireFailure>>,
        wait: Duration,
    ) -> Result<(C::Conn, ConnectionLease<C>), AcquireFailure> {
        let sleep = tokio::time::sleep(wait);
        tokio::pin!(sleep);

        tokio::select! {
            res = &mut rx => self.grant_result(res),
            _ = &mut sleep => {
                let waited = {
                    let mut state = self.state.lock().unwrap();
                    let removed = state.queue.remove(id);
                    if removed.is_some() {
                        state.stats.timed_out += 1;
                    }

                    #[cfg(feature = "metrics")]
                    gauge!("pool_queue_depth", "pool" => self.config.name.clone())
                        .set(state.queue.len() as f64);

                    removed.map(|req| req.queued_at.elapsed())
                };

                match waited {
                    Some(waited) => {
                        #[cfg(feature = "tracing")]
                        tracing::debug!(pool = %self.config.name, ?waited, "queued request timed out");

                        #[cfg(feature = "metrics")]
                        counter!("pool_requests_timed_out_total", "pool" => self.config.name.clone())
                            .increment(1);

                        self.config.event_listeners.emit(&PoolEvent::RequestTimedOut {
                            source: self.config.name.clone(),
                            timestamp: Instant::now(),
                            waited,
                        });

                        Err(AcquireFailure::Timeout)
                    }
                    // A grant raced the timeout; it is already in the channel.
                    None => self.grant_result(rx.await),
                }
            }
        }
    }

    fn grant_result(
        self: &Arc<Self>,
        res: Result<Result<Granted<C::Conn>, AcquireFailure>, oneshot::error::RecvError>,
    ) -> Result<(C::Conn, ConnectionLease<C>), AcquireFailure> {
        match res {
            Ok(Ok(granted)) => Ok(self.lease(granted)),
            Ok(Err(failure)) => Err(failure),
            Err(_) => Err(AcquireFailure::Reset),
        }
    }

    /// Returns a connection after an operation finished and immediately
    /// hands it to the most urgent queued request, if any.
    fn release(&self, id: u64, conn: C::Conn, failed: bool) {
        let mut state = self.state.lock().unwrap();
        let config = &self.config;

        let pos = state.entries.iter().position(|e| e.id == id);
        let Some(pos) = pos else {
            // the pool was reset while the operation ran
            drop(state);
            drop(conn);
            return;
        };
        let entry = &mut state.entries[pos];
        entry.last_used = Instant::now();
        entry.operations += 1;
        if failed {
            entry.has_errors = true;
        }

        let mut conn = conn;
        loop {
            match state.queue.pop_front() {
                Some(next) => {
                    let priority = next.priority;
                    let waited = next.queued_at.elapsed();
                    match next.tx.send(Ok(Granted { id, conn })) {
                        Ok(()) => {
                            #[cfg(feature = "metrics")]
                            gauge!("pool_queue_depth", "pool" => config.name.clone())
                                .set(state.queue.len() as f64);

                            config.event_listeners.emit(&PoolEvent::RequestDispatched {
                                source: config.name.clone(),
                                timestamp: Instant::now(),
                                priority,
                                waited,
                            });
                            return;
                        }
                        // The waiter abandoned its request; try the next one.
                        Err(Ok(returned)) => conn = returned.conn,
                        Err(Err(_)) => unreachable!("grants are sent exactly once"),
                    }
                }
                None => {
                    let Some(entry) = state.entries.iter_mut().find(|e| e.id == id) else {
                        return;
                    };
                    entry.conn = Some(conn);
                    entry.in_use = false;
                    return;
                }
            }
        }
    }

    /// Reclaims a slot whose operation future was dropped before finishing.
    /// The connection handle went down with the future.
    fn discard(&self, id: u64) {
        let mut state = self.state.lock().unwrap();
        if let Some(pos) = state.entries.iter().position(|e| e.id == id) {
            state.entries.swap_remove(pos);

            #[cfg(feature = "tracing")]
            tracing::warn!(pool = %self.config.name, connection = id, "operation cancelled; dropping its connection");
        }
    }

    fn reset(&self) {
        let mut dropped_conns = Vec::new();
        let (dropped, rejected) = {
            let mut state = self.state.lock().unwrap();
            for mut entry in state.entries.drain(..) {
                if let Some(conn) = entry.conn.take() {
                    dropped_conns.push(conn);
                }
            }
            let waiters = state.queue.drain();
            let rejected = waiters.len();
            for waiter in waiters {
                let _ = waiter.tx.send(Err(AcquireFailure::Reset));
            }
            (dropped_conns.len(), rejected)
        };
        drop(dropped_conns);

        #[cfg(feature = "tracing")]
        tracing::info!(pool = %self.config.name, dropped, rejected, "pool reset");

        #[cfg(feature = "metrics")]
        {
            counter!("pool_resets_total", "pool" => self.config.name.clone()).increment(1);
            gauge!("pool_queue_depth", "pool" => self.config.name.clone()).set(0.0);
        }

        self.config.event_listeners.emit(&PoolEvent::PoolReset {
            source: self.config.name.clone(),
            timestamp: Instant::now(),
            dropped_connections: dropped,
            rejected_requests: rejected,
        });
    }

    /// One maintenance pass: retire stale connections, then use any freed
    /// capacity to serve the head of the queue.
    async fn health_pass(self: &Arc<Self>) {
        let config = &self.config;
        let now = Instant::now();
        let mut retired: Vec<(C::Conn, RetireReason)> = Vec::new();
        let mut should_create = false;

        {
            let mut state = self.state.lock().unwrap();
            let mut i = 0;
            while i < state.entries.len() {
                let entry = &state.entries[i];
                let reason = if entry.in_use {
                    None
                } else if entry.has_errors {
                    Some(RetireReason::Errored)
                } else if now.duration_since(entry.created_at) > config.max_connection_lifetime {
                    Some(RetireReason::Expired)
                } else if now.duration_since(entry.last_used) > config.max_idle_time {
                    Some(RetireReason::Idle)
                } else {
                    None
                };

                match reason {
                    Some(reason) => {
                        let mut entry = state.entries.swap_remove(i);
                        state.stats.retired += 1;
                        if let Some(conn) = entry.conn.take() {
                            retired.push((conn, reason));
                        }
                    }
                    None => i += 1,
                }
            }

            if !state.queue.is_empty()
                && state.entries.len() + state.pending_creates < config.max_connections
            {
                state.pending_creates += 1;
                should_create = true;
            }
        }

        for (conn, reason) in retired {
            #[cfg(feature = "tracing")]
            tracing::debug!(pool = %config.name, ?reason, "retiring connection");

            #[cfg(feature = "metrics")]
            counter!("pool_connections_retired_total", "pool" => config.name.clone())
                .increment(1);

            config.event_listeners.emit(&PoolEvent::ConnectionRetired {
                source: config.name.clone(),
                timestamp: Instant::now(),
                reason,
            });
            drop(conn);
        }

        if should_create {
            self.create_for_queue().await;
        }
    }

    /// Opens a connection on behalf of the queue head.
    async fn create_for_queue(self: &Arc<Self>) {
        let config = &self.config;
        match self.connector.connect().await {
            Ok(conn) => {
                let mut state = self.state.lock().unwrap();
                state.pending_creates -= 1;
                state.stats.created += 1;
                let id = state.next_connection_id;
                state.next_connection_id += 1;
                state.entries.push(PooledConnection::leased(id));
                let pool_size = state.entries.len();

                config.event_listeners.emit(&PoolEvent::ConnectionCreated {
                    source: config.name.clone(),
                    timestamp: Instant::now(),
                    pool_size,
                });

                let mut conn = conn;
                loop {
                    match state.queue.pop_front() {
                        Some(next) => {
                            let priority = next.priority;
                            let waited = next.queued_at.elapsed();
                            match next.tx.send(Ok(Granted { id, conn })) {
                                Ok(()) => {
                                    config.event_listeners.emit(&PoolEvent::RequestDispatched {
                                        source: config.name.clone(),
                                        timestamp: Instant::now(),
                                        priority,
                                        waited,
                                    });
                                    return;
                                }
                                Err(Ok(returned)) => conn = returned.conn,
                                Err(Err(_)) => unreachable!("grants are sent exactly once"),
                            }
                        }
                        None => {
                            // every waiter left between the decision and now
                            let Some(entry) = state.entries.iter_mut().find(|e| e.id == id) else {
                                return;
                            };
                            entry.conn = Some(conn);
                            entry.in_use = false;
                            return;
                        }
                    }
                }
            }
            Err(e) => {
                let head = {
                    let mut state = self.state.lock().unwrap();
                    state.pending_creates -= 1;
                    state.stats.failed_creates += 1;
                    state.queue.pop_front()
                };

                #[cfg(feature = "tracing")]
                tracing::warn!(pool = %config.name, error = %e, "connection establishment for queued request failed");

                if let Some(head) = head {
                    let _ = head.tx.send(Err(AcquireFailure::Creation(e)));
                }
            }
        }
    }
}
