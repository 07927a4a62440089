//! Configuration for the load harness.

use rand::rngs::StdRng;
use rand::SeedableRng;
use std::time::Duration;

/// Which operation each simulated request performs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperationMix {
    /// Every request is a read.
    Read,
    /// Every request is a write.
    Write,
    /// Read or write chosen per request with equal probability.
    Mixed,
}

impl OperationMix {
    /// Stable lowercase name used in the report.
    pub fn as_str(&self) -> &'static str {
        match self {
            OperationMix::Read => "read",
            OperationMix::Write => "write",
            OperationMix::Mixed => "mixed",
        }
    }
}

/// Configuration for a [`LoadTester`](crate::LoadTester) run.
#[derive(Debug, Clone)]
pub struct LoadTestConfig {
    /// Simulated users issuing requests concurrently.
    pub(crate) concurrent_users: usize,
    /// Wall-clock length of the run.
    pub(crate) test_duration: Duration,
    /// Mean pause between one user's requests.
    pub(crate) request_interval: Duration,
    /// Per-request deadline; slower requests count as failures.
    pub(crate) request_timeout: Duration,
    /// User start times are staggered linearly across this window.
    pub(crate) ramp_up: Duration,
    /// Jitter applied to each pause: `interval * (1 +/- factor)`.
    pub(crate) random_delay_factor: f64,
    /// Read, write, or a 50/50 mix.
    pub(crate) operation: OperationMix,
    /// Route through the pool, or open a fresh connection per request.
    pub(crate) use_connection_pool: bool,
    /// Seed for deterministic jitter and mix selection.
    pub(crate) seed: Option<u64>,
}

impl LoadTestConfig {
    /// Creates a new configuration builder.
    pub fn builder() -> LoadTestConfigBuilder {
        LoadTestConfigBuilder::new()
    }

    pub fn concurrent_users(&self) -> usize {
        self.concurrent_users
    }

    pub fn test_duration(&self) -> Duration {
        self.test_duration
    }

    pub fn request_interval(&self) -> Duration {
        self.request_interval
    }

    pub fn operation(&self) -> OperationMix {
        self.operation
    }

    pub fn use_connection_pool(&self) -> bool {
        self.use_connection_pool
    }

    /// One generator per simulated user, offset from the configured seed so
    /// users do not march in lockstep.
    pub(crate) fn rng_for_user(&self, index: usize) -> StdRng {
        match self.seed {
            Some(seed) => StdRng::seed_from_u64(seed.wrapping_add(index as u64)),
            None => StdRng::from_os_rng(),
        }
    }
}

impl Default for LoadTestConfig {
    fn default() -> Self {
        Self::builder().build()
    }
}

/// Builder for load test configuration.
#[derive(Debug, Clone)]
pub struct LoadTestConfigBuilder {
    concurrent_users: usize,
    test_duration: Duration,
    request_interval: Duration,
    request_timeout: Duration,
    ramp_up: Duration,
    random_delay_factor: f64,
    operation: OperationMix,
    use_connection_pool: bool,
    seed: Option<u64>,
}

impl LoadTestConfigBuilder {
    /// Creates a new builder with default values.
    pub fn new() -> Self {
        Self {
            concurrent_users: 10,
            test_duration: Duration::from_secs(10),
            request_interval: Duration::from_millis(100),
            request_timeout: Duration::from_secs(5),
            ramp_up: Duration::from_secs(1),
            random_delay_factor: 0.3,
            operation: OperationMix::Mixed,
            use_connection_pool: true,
            seed: None,
        }
    }

    /// Sets the number of simulated users.
    ///
    /// Default: 10
    pub fn concurrent_users(mut self, users: usize) -> Self {
        self.concurrent_users = users;
        self
    }

    /// Sets the wall-clock length of the run.
    ///
    /// Default: 10s
    pub fn test_duration(mut self, duration: Duration) -> Self {
        self.test_duration = duration;
        self
    }

    /// Sets the mean pause between one user's requests.
    ///
    /// Default: 100ms
    pub fn request_interval(mut self, interval: Duration) -> Self {
        self.request_interval = interval;
        self
    }

    /// Sets the per-request deadline.
    ///
    /// Default: 5s
    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Sets the window across which user start times are staggered.
    ///
    /// Default: 1s
    pub fn ramp_up(mut self, ramp_up: Duration) -> Self {
        self.ramp_up = ramp_up;
        self
    }

    /// Sets the jitter factor applied to each pause.
    ///
    /// Default: 0.3
    pub fn random_delay_factor(mut self, factor: f64) -> Self {
        self.random_delay_factor = factor;
        self
    }

    /// Sets the operation mix.
    ///
    /// Default: [`OperationMix::Mixed`]
    pub fn operation(mut self, operation: OperationMix) -> Self {
        self.operation = operation;
        self
    }

    /// Routes requests through the pool, or opens a fresh connection each
    /// time when `false`.
    ///
    /// Default: true
    pub fn use_connection_pool(mut self, pooled: bool) -> Self {
        self.use_connection_pool = pooled;
        self
    }

    /// Pins the random generator for reproducible runs.
    ///
    /// Default: unseeded
    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Builds the configuration.
    pub fn build(self) -> LoadTestConfig {
        LoadTestConfig {
            concurrent_users: self.concurrent_users,
            test_duration: self.test_duration,
            request_interval: self.request_interval,
            request_timeout: self.request_timeout,
            ramp_up: self.ramp_up,
            random_delay_factor: self.random_delay_factor,
            operation: self.operation,
            use_connection_pool: self.use_connection_pool,
            seed: self.seed,
        }
    }
}

impl Default for LoadTestConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}
