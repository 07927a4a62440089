//! Circuit breaker state machine.

use crate::config::ResilienceConfig;
use crate::events::ResilienceEvent;
#[cfg(feature = "metrics")]
use metrics::{counter, gauge};
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;
use std::time::Instant;

/// Represents the state of the circuit breaker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum CircuitState {
    /// The circuit is closed and operations are allowed.
    Closed = 0,
    /// The circuit is open and operations are rejected without reaching the pool.
    Open = 1,
    /// The circuit is half-open and a single probe operation is allowed.
    HalfOpen = 2,
}

impl CircuitState {
    pub(crate) fn from_u8(value: u8) -> Self {
        match value {
            0 => CircuitState::Closed,
            1 => CircuitState::Open,
            2 => CircuitState::HalfOpen,
            _ => CircuitState::Closed, // Default to Closed for safety
        }
    }

    #[cfg(feature = "metrics")]
    fn as_str(&self) -> &'static str {
        match self {
            CircuitState::Closed => "Closed",
            CircuitState::Open => "Open",
            CircuitState::HalfOpen => "HalfOpen",
        }
    }
}

/// Consecutive-failure circuit breaker.
///
/// `Closed` counts consecutive failures and opens at the configured
/// threshold. `Open` rejects everything until the reset timeout has passed;
/// the transition to `HalfOpen` is lazy, taken by the next caller rather
/// than a background timer. `HalfOpen` lets exactly one probe through:
/// success closes the circuit, failure reopens it and restarts the timer.
pub(crate) struct Circuit {
    state: CircuitState,
    state_atomic: Arc<AtomicU8>,
    last_state_change: Instant,
    consecutive_failures: u32,
    probe_started: Option<Instant>,
}

impl Circuit {
    pub(crate) fn new_with_atomic(state_atomic: Arc<AtomicU8>) -> Self {
        Self {
            state: CircuitState::Closed,
            state_atomic,
            last_state_change: Instant::now(),
            consecutive_failures: 0,
            probe_started: None,
        }
    }

    pub fn state(&self) -> CircuitState {
        self.state
    }

    #[cfg(test)]
    pub fn consecutive_failures(&self) -> u32 {
        self.consecutive_failures
    }

    /// Returns true if the caller may proceed to the pool.
    ///
    /// In `Open`, performs the lazy transition to `HalfOpen` once the reset
    /// timeout has elapsed, making the caller the probe.
    pub fn try_acquire(&mut self, config: &ResilienceConfig) -> bool {
        match self.state {
            CircuitState::Closed => true,
            CircuitState::Open => {
                if self.last_state_change.elapsed() >= config.circuit_reset_timeout {
                    self.transition_to(CircuitState::HalfOpen, config);
                    self.probe_started = Some(Instant::now());
                    true
                } else {
                    self.reject(config);
                    false
                }
            }
            CircuitState::HalfOpen => {
                // A probe that never reports back frees the slot after the
                // reset timeout.
                match self.probe_started {
                    Some(started) if started.elapsed() < config.circuit_reset_timeout => {
                        self.reject(config);
                        false
                    }
                    _ => {
                        self.probe_started = Some(Instant::now());
                        true
                    }
                }
            }
        }
    }

    pub fn record_success(&mut self, config: &ResilienceConfig) {
        match self.state {
            CircuitState::HalfOpen => {
                self.probe_started = None;
                self.transition_to(CircuitState::Closed, config);
            }
            CircuitState::Closed => {
                self.consecutive_failures = 0;
            }
            // A result from before the circuit opened; nothing to update.
            CircuitState::Open => {}
        }
    }

    pub fn record_failure(&mut self, config: &ResilienceConfig) {
        match self.state {
            CircuitState::HalfOpen => {
                self.probe_started = None;
                self.transition_to(CircuitState::Open, config);
            }
            CircuitState::Closed => {
                self.consecutive_failures += 1;
                if self.consecutive_failures >= config.failure_threshold {
                    self.transition_to(CircuitState::Open, config);
                }
            }
            CircuitState::Open => {}
        }
    }

    pub fn reset(&mut self, config: &ResilienceConfig) {
        self.transition_to(CircuitState::Closed, config);
        self.consecutive_failures = 0;
        self.probe_started = None;
    }

    fn reject(&self, config: &ResilienceConfig) {
        config
            .event_listeners
            .emit(&ResilienceEvent::CallRejected {
                source: config.name.clone(),
                timestamp: Instant::now(),
            });

        #[cfg(feature = "metrics")]
        counter!("circuit_calls_rejected_total", "circuit" => config.name.clone()).increment(1);
    }

    fn transition_to(&mut self, state: CircuitState, config: &ResilienceConfig) {
        if self.state == state {
            return;
        }

        let from_state = self.state;

        config
            .event_listeners
            .emit(&ResilienceEvent::StateTransition {
                source: config.name.clone(),
                timestamp: Instant::now(),
                from: from_state,
                to: state,
            });

        #[cfg(feature = "tracing")]
        tracing::info!(from = ?from_state, to = ?state, "circuit state transition");

        #[cfg(feature = "metrics")]
        {
            counter!(
                "circuit_transitions_total",
                "circuit" => config.name.clone(),
                "from" => from_state.as_str(),
                "to" => state.as_str()
            )
            .increment(1);

            gauge!("circuit_state", "circuit" => config.name.clone(), "state" => state.as_str())
                .set(1.0);
        }

        self.state = state;
        self.state_atomic.store(state as u8, Ordering::Release);
        self.last_state_change = Instant::now();
        self.consecutive_failures = 0;
    }
}
