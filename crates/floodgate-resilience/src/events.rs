//! Events emitted by the resilient facade.

use crate::circuit::CircuitState;
use floodgate_core::events::TelemetryEvent;
use std::time::{Duration, Instant};

/// Events emitted by a [`Resilient`](crate::Resilient) facade.
#[derive(Debug, Clone)]
pub enum ResilienceEvent {
    /// The circuit breaker changed state.
    StateTransition {
        source: String,
        timestamp: Instant,
        from: CircuitState,
        to: CircuitState,
    },
    /// A call was rejected because the circuit is open.
    CallRejected { source: String, timestamp: Instant },
    /// A transient failure was scheduled for retry.
    RetryScheduled {
        source: String,
        timestamp: Instant,
        attempt: u32,
        delay: Duration,
    },
    /// An operation completed successfully.
    OperationSucceeded {
        source: String,
        timestamp: Instant,
        attempts: u32,
        elapsed: Duration,
    },
    /// An operation failed permanently or exhausted its retries.
    OperationFailed {
        source: String,
        timestamp: Instant,
        attempts: u32,
    },
}

impl TelemetryEvent for ResilienceEvent {
    fn event_type(&self) -> &'static str {
        match self {
            ResilienceEvent::StateTransition { .. } => "state_transition",
            ResilienceEvent::CallRejected { .. } => "call_rejected",
            ResilienceEvent::RetryScheduled { .. } => "retry_scheduled",
            ResilienceEvent::OperationSucceeded { .. } => "operation_succeeded",
            ResilienceEvent::OperationFailed { .. } => "operation_failed",
        }
    }

    fn timestamp(&self) -> Instant {
        match self {
            ResilienceEvent::StateTransition { timestamp, .. }
            | ResilienceEvent::CallRejected { timestamp, .. }
            | ResilienceEvent::RetryScheduled { timestamp, .. }
            | ResilienceEvent::OperationSucceeded { timestamp, .. }
            | ResilienceEvent::OperationFailed { timestamp, .. } => *timestamp,
        }
    }

    fn source(&self) -> &str {
        match self {
            ResilienceEvent::StateTransition { source, .. }
            | ResilienceEvent::CallRejected { source, .. }
            | ResilienceEvent::RetryScheduled { source, .. }
            | ResilienceEvent::OperationSucceeded { source, .. }
            | ResilienceEvent::OperationFailed { source, .. } => source,
        }
    }
}
