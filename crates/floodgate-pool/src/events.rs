//! Events emitted by the connection pool.

use crate::queue::Priority;
use floodgate_core::events::TelemetryEvent;
use std::time::{Duration, Instant};

/// Why a connection was removed from the pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetireReason {
    /// Idle longer than `max_idle_time`.
    Idle,
    /// Older than `max_connection_lifetime`.
    Expired,
    /// An operation on it reported an error.
    Errored,
}

/// Events emitted by a [`PoolManager`](crate::PoolManager).
#[derive(Debug, Clone)]
pub enum PoolEvent {
    /// A new backend connection was established.
    ConnectionCreated {
        source: String,
        timestamp: Instant,
        pool_size: usize,
    },
    /// An idle connection was handed to a new operation.
    ConnectionReused {
        source: String,
        timestamp: Instant,
        operations: u64,
    },
    /// A connection was removed by health maintenance.
    ConnectionRetired {
        source: String,
        timestamp: Instant,
        reason: RetireReason,
    },
    /// No connection was available; the request joined the queue.
    RequestQueued {
        source: String,
        timestamp: Instant,
        priority: Priority,
        queue_depth: usize,
    },
    /// A released connection was handed to a queued request.
    RequestDispatched {
        source: String,
        timestamp: Instant,
        priority: Priority,
        waited: Duration,
    },
    /// A queued `Low` request was displaced to make room.
    RequestEvicted {
        source: String,
        timestamp: Instant,
        priority: Priority,
    },
    /// A queued request hit its timeout and was removed.
    RequestTimedOut {
        source: String,
        timestamp: Instant,
        waited: Duration,
    },
    /// A submission was rejected because the queue was at capacity.
    QueueRejected {
        source: String,
        timestamp: Instant,
        capacity: usize,
    },
    /// The pool was reset: connections dropped, waiters rejected.
    PoolReset {
        source: String,
        timestamp: Instant,
        dropped_connections: usize,
        rejected_requests: usize,
    },
}

impl TelemetryEvent for PoolEvent {
    fn event_type(&self) -> &'static str {
        match self {
            PoolEvent::ConnectionCreated { .. } => "connection_created",
            PoolEvent::ConnectionReused { .. } => "connection_reused",
            PoolEvent::ConnectionRetired { .. } => "connection_retired",
            PoolEvent::RequestQueued { .. } => "request_queued",
            PoolEvent::RequestDispatched { .. } => "request_dispatched",
            PoolEvent::RequestEvicted { .. } => "request_evicted",
            PoolEvent::RequestTimedOut { .. } => "request_timed_out",
            PoolEvent::QueueRejected { .. } => "queue_rejected",
            PoolEvent::PoolReset { .. } => "pool_reset",
        }
    }

    fn timestamp(&self) -> Instant {
        match self {
            PoolEvent::ConnectionCreated { timestamp, .. }
            | PoolEvent::ConnectionReused { timestamp, .. }
            | PoolEvent::ConnectionRetired { timestamp, .. }
            | PoolEvent::RequestQueued { timestamp, .. }
            | PoolEvent::RequestDispatched { timestamp, .. }
            | PoolEvent::RequestEvicted { timestamp, .. }
            | PoolEvent::RequestTimedOut { timestamp, .. }
            | PoolEvent::QueueRejected { timestamp, .. }
            | PoolEvent::PoolReset { timestamp, .. } => *timestamp,
        }
    }

    fn source(&self) -> &str {
        match self {
            PoolEvent::ConnectionCreated { source, .. }
            | PoolEvent::ConnectionReused { source, .. }
            | PoolEvent::ConnectionRetired { source, .. }
            | PoolEvent::RequestQueued { source, .. }
            | PoolEvent::RequestDispatched { source, .. }
            | PoolEvent::RequestEvicted { source, .. }
            | PoolEvent::RequestTimedOut { source, .. }
            | PoolEvent::QueueRejected { source, .. }
            | PoolEvent::PoolReset { source, .. } => source,
        }
    }
}
