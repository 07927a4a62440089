//! Configuration for the connection pool.

use crate::events::{PoolEvent, RetireReason};
use crate::queue::Priority;
use floodgate_core::events::{EventListeners, FnListener};
use floodgate_core::settings::PoolSettings;
use std::time::Duration;

/// Configuration for a [`PoolManager`](crate::PoolManager).
#[derive(Clone)]
pub struct PoolConfig {
    /// Upper bound on live connections, including ones being established.
    pub(crate) max_connections: usize,
    /// Idle time after which health maintenance retires a connection.
    pub(crate) max_idle_time: Duration,
    /// Upper bound on queued acquisition requests.
    pub(crate) max_queue_size: usize,
    /// Default wait for queued requests without an explicit timeout.
    pub(crate) acquisition_timeout: Duration,
    /// Age after which a connection is retired regardless of activity.
    pub(crate) max_connection_lifetime: Duration,
    /// Interval between health maintenance passes.
    pub(crate) health_check_interval: Duration,
    /// Name of this pool instance.
    pub(crate) name: String,
    /// Event listeners.
    pub(crate) event_listeners: EventListeners<PoolEvent>,
}

impl PoolConfig {
    /// Creates a new configuration builder.
    pub fn builder() -> PoolConfigBuilder {
        PoolConfigBuilder::new()
    }

    /// Builds a configuration from loaded [`PoolSettings`].
    pub fn from_settings(settings: &PoolSettings) -> Self {
        Self::builder().settings(settings).build()
    }
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self::builder().build()
    }
}

/// Builder for pool configuration.
pub struct PoolConfigBuilder {
    max_connections: usize,
    max_idle_time: Duration,
    max_queue_size: usize,
    acquisition_timeout: Duration,
    max_connection_lifetime: Duration,
    health_check_interval: Duration,
    name: String,
    event_listeners: EventListeners<PoolEvent>,
}

impl PoolConfigBuilder {
    /// Creates a new builder with default values.
    pub fn new() -> Self {
        Self {
            max_connections: 10,
            max_idle_time: Duration::from_secs(60),
            max_queue_size: 100,
            acquisition_timeout: Duration::from_secs(5),
            max_connection_lifetime: Duration::from_secs(3600),
            health_check_interval: Duration::from_secs(30),
            name: "pool".to_string(),
            event_listeners: EventListeners::new(),
        }
    }

    /// Sets the maximum number of connections.
    ///
    /// Default: 10
    pub fn max_connections(mut self, max: usize) -> Self {
        self.max_connections = max;
        self
    }

    /// Sets the idle time after which a connection is retired.
    ///
    /// Default: 60s
    pub fn max_idle_time(mut self, duration: Duration) -> Self {
        self.max_idle_time = duration;
        self
    }

    /// Sets the maximum number of queued requests.
    ///
    /// Default: 100
    pub fn max_queue_size(mut self, max: usize) -> Self {
        self.max_queue_size = max;
        self
    }

    /// Sets the default wait for queued requests.
    ///
    /// Applies when `execute` is called without an explicit timeout.
    /// Default: 5s
    pub fn acquisition_timeout(mut self, duration: Duration) -> Self {
        self.acquisition_timeout = duration;
        self
    }

    /// Sets the maximum connection age.
    ///
    /// Default: 1h
    pub fn max_connection_lifetime(mut self, duration: Duration) -> Self {
        self.max_connection_lifetime = duration;
        self
    }

    /// Sets the interval between health maintenance passes.
    ///
    /// Default: 30s
    pub fn health_check_interval(mut self, duration: Duration) -> Self {
        self.health_check_interval = duration;
        self
    }

    /// Sets the name of this pool instance.
    ///
    /// Default: "pool"
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Copies every sizing and timing field from loaded settings.
    pub fn settings(mut self, settings: &PoolSettings) -> Self {
        self.max_connections = settings.max_connections;
        self.max_idle_time = settings.max_idle_time();
        self.max_queue_size = settings.max_queue_size;
        self.acquisition_timeout = settings.acquisition_timeout();
        self.max_connection_lifetime = settings.max_connection_lifetime();
        self.health_check_interval = settings.health_check_interval();
        self
    }

    /// Registers a callback for every new backend connection.
    ///
    /// Called with the pool size after the connection was added.
    pub fn on_connection_created<F>(mut self, f: F) -> Self
    where
        F: Fn(usize) + Send + Sync + 'static,
    {
        self.event_listeners.add(FnListener::new(move |event| {
            if let PoolEvent::ConnectionCreated { pool_size, .. } = event {
                f(*pool_size);
            }
        }));
        self
    }

    /// Registers a callback when health maintenance retires a connection.
    ///
    /// Called with the reason the connection was removed.
    pub fn on_connection_retired<F>(mut self, f: F) -> Self
    where
        F: Fn(RetireReason) + Send + Sync + 'static,
    {
        self.event_listeners.add(FnListener::new(move |event| {
            if let PoolEvent::ConnectionRetired { reason, .. } = event {
                f(*reason);
            }
        }));
        self
    }

    /// Registers a callback when a request joins the queue.
    ///
    /// Called with the queue depth after the request was added.
    pub fn on_request_queued<F>(mut self, f: F) -> Self
    where
        F: Fn(usize) + Send + Sync + 'static,
    {
        self.event_listeners.add(FnListener::new(move |event| {
            if let PoolEvent::RequestQueued { queue_depth, .. } = event {
                f(*queue_depth);
            }
        }));
        self
    }

    /// Registers a callback when a queued `Low` request is displaced.
    pub fn on_request_evicted<F>(mut self, f: F) -> Self
    where
        F: Fn(Priority) + Send + Sync + 'static,
    {
        self.event_listeners.add(FnListener::new(move |event| {
            if let PoolEvent::RequestEvicted { priority, .. } = event {
                f(*priority);
            }
        }));
        self
    }

    /// Registers a callback when a submission is rejected at capacity.
    ///
    /// Called with the configured queue capacity.
    pub fn on_queue_rejected<F>(mut self, f: F) -> Self
    where
        F: Fn(usize) + Send + Sync + 'static,
    {
        self.event_listeners.add(FnListener::new(move |event| {
            if let PoolEvent::QueueRejected { capacity, .. } = event {
                f(*capacity);
            }
        }));
        self
    }

    /// Registers a callback when the pool is reset.
    ///
    /// Called with the number of dropped connections and rejected waiters.
    pub fn on_pool_reset<F>(mut self, f: F) -> Self
    where
        F: Fn(usize, usize) + Send + Sync + 'static,
    {
        self.event_listeners.add(FnListener::new(move |event| {
            if let PoolEvent::PoolReset {
                dropped_connections,
                rejected_requests,
                ..
            } = event
            {
                f(*dropped_connections, *rejected_requests);
            }
        }));
        self
    }

    /// Builds the configuration.
    pub fn build(self) -> PoolConfig {
        PoolConfig {
            max_connections: self.max_connections,
            max_idle_time: self.max_idle_time,
            max_queue_size: self.max_queue_size,
            acquisition_timeout: self.acquisition_timeout,
            max_connection_lifetime: self.max_connection_lifetime,
            health_check_interval: self.health_check_interval,
            name: self.name,
            event_listeners: self.event_listeners,
        }
    }
}

impl Default for PoolConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}
