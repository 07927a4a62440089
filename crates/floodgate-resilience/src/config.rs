//! Configuration for the resilient facade.

use crate::circuit::CircuitState;
use crate::classifier::{KeywordClassifier, TransientClassifier};
use crate::events::ResilienceEvent;
use floodgate_core::events::{EventListeners, FnListener};
use floodgate_core::settings::ResilienceSettings;
use std::sync::Arc;
use std::time::Duration;

/// Configuration for a [`Resilient`](crate::Resilient) facade.
#[derive(Clone)]
pub struct ResilienceConfig {
    /// Consecutive failures that open the circuit.
    pub(crate) failure_threshold: u32,
    /// How long the circuit stays open before a probe is allowed.
    pub(crate) circuit_reset_timeout: Duration,
    /// Default retries for transient failures.
    pub(crate) retries: u32,
    /// Fixed delay between retry attempts.
    pub(crate) retry_delay: Duration,
    /// Name of this facade instance.
    pub(crate) name: String,
    /// Decides which failures are worth retrying.
    pub(crate) classifier: Arc<dyn TransientClassifier>,
    /// Event listeners.
    pub(crate) event_listeners: EventListeners<ResilienceEvent>,
}

impl ResilienceConfig {
    /// Creates a new configuration builder.
    pub fn builder() -> ResilienceConfigBuilder {
        ResilienceConfigBuilder::new()
    }

    /// Builds a configuration from loaded [`ResilienceSettings`].
    pub fn from_settings(settings: &ResilienceSettings) -> Self {
        Self::builder().settings(settings).build()
    }
}

impl Default for ResilienceConfig {
    fn default() -> Self {
        Self::builder().build()
    }
}

/// Builder for facade configuration.
pub struct ResilienceConfigBuilder {
    failure_threshold: u32,
    circuit_reset_timeout: Duration,
    retries: u32,
    retry_delay: Duration,
    name: String,
    classifier: Arc<dyn TransientClassifier>,
    event_listeners: EventListeners<ResilienceEvent>,
}

impl ResilienceConfigBuilder {
    /// Creates a new builder with default values.
    pub fn new() -> Self {
        Self {
            failure_threshold: 5,
            circuit_reset_timeout: Duration::from_secs(30),
            retries: 2,
            retry_delay: Duration::from_millis(500),
            name: "database".to_string(),
            classifier: Arc::new(KeywordClassifier),
            event_listeners: EventListeners::new(),
        }
    }

    /// Sets the consecutive-failure count that opens the circuit.
    ///
    /// Default: 5
    pub fn failure_threshold(mut self, threshold: u32) -> Self {
        self.failure_threshold = threshold;
        self
    }

    /// Sets how long the circuit stays open before probing.
    ///
    /// Default: 30s
    pub fn circuit_reset_timeout(mut self, duration: Duration) -> Self {
        self.circuit_reset_timeout = duration;
        self
    }

    /// Sets the default retry count for transient failures.
    ///
    /// Default: 2
    pub fn retries(mut self, retries: u32) -> Self {
        self.retries = retries;
        self
    }

    /// Sets the fixed delay between retry attempts.
    ///
    /// Default: 500ms
    pub fn retry_delay(mut self, delay: Duration) -> Self {
        self.retry_delay = delay;
        self
    }

    /// Sets the name of this facade instance.
    ///
    /// Default: "database"
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Replaces the transient-failure classifier.
    ///
    /// Default: [`KeywordClassifier`]
    pub fn classifier<T>(mut self, classifier: T) -> Self
    where
        T: TransientClassifier + 'static,
    {
        self.classifier = Arc::new(classifier);
        self
    }

    /// Copies every threshold and timing field from loaded settings.
    pub fn settings(mut self, settings: &ResilienceSettings) -> Self {
        self.failure_threshold = settings.failure_threshold;
        self.circuit_reset_timeout = settings.circuit_reset_timeout();
        self.retries = settings.retries;
        self.retry_delay = settings.retry_delay();
        self
    }

    /// Registers a callback on every circuit state transition.
    pub fn on_state_transition<F>(mut self, f: F) -> Self
    where
        F: Fn(CircuitState, CircuitState) + Send + Sync + 'static,
    {
        self.event_listeners.add(FnListener::new(move |event| {
            if let ResilienceEvent::StateTransition { from, to, .. } = event {
                f(*from, *to);
            }
        }));
        self
    }

    /// Registers a callback when a call is rejected by the open circuit.
    pub fn on_call_rejected<F>(mut self, f: F) -> Self
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.event_listeners.add(FnListener::new(move |event| {
            if let ResilienceEvent::CallRejected { .. } = event {
                f();
            }
        }));
        self
    }

    /// Registers a callback when a transient failure is scheduled for retry.
    ///
    /// Called with the attempt number (1-based) and the delay before it.
    pub fn on_retry<F>(mut self, f: F) -> Self
    where
        F: Fn(u32, Duration) + Send + Sync + 'static,
    {
        self.event_listeners.add(FnListener::new(move |event| {
            if let ResilienceEvent::RetryScheduled { attempt, delay, .. } = event {
                f(*attempt, *delay);
            }
        }));
        self
    }

    /// Builds the configuration.
    pub fn build(self) -> ResilienceConfig {
        ResilienceConfig {
            failure_threshold: self.failure_threshold,
            circuit_reset_timeout: self.circuit_reset_timeout,
            retries: self.retries,
            retry_delay: self.retry_delay,
            name: self.name,
            classifier: self.classifier,
            event_listeners: self.event_listeners,
        }
    }
}

impl Default for ResilienceConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}
