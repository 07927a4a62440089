//! The load test runner: simulated users, pacing, and sampling.

use crate::config::{LoadTestConfig, OperationMix};
use crate::report::{ErrorEntry, LoadTestReport, TimePoint};
use floodgate_pool::Connector;
use floodgate_resilience::Resilient;
use futures::future::BoxFuture;
use rand::Rng;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

/// Error type the simulated operations report.
pub type DynError = Box<dyn std::error::Error + Send + Sync>;

/// A simulated read or write against one connection.
pub type SimulatedOp<Conn> =
    Arc<dyn for<'c> Fn(&'c mut Conn) -> BoxFuture<'c, Result<(), DynError>> + Send + Sync>;

struct Recorder {
    start: Instant,
    inner: Mutex<RecorderInner>,
}

struct RecorderInner {
    latencies_ms: Vec<f64>,
    errors: Vec<ErrorEntry>,
    active_users: usize,
    /// Completions in the trailing window, for the per-second sampler.
    recent: VecDeque<(Instant, Option<f64>)>,
    series: Vec<TimePoint>,
}

impl Recorder {
    fn new() -> Self {
        Self {
            start: Instant::now(),
            inner: Mutex::new(RecorderInner {
                latencies_ms: Vec::new(),
                errors: Vec::new(),
                active_users: 0,
                recent: VecDeque::new(),
                series: Vec::new(),
            }),
        }
    }

    fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }

    fn user_started(&self) {
        self.inner.lock().unwrap().active_users += 1;
    }

    fn user_stopped(&self) {
        self.inner.lock().unwrap().active_users -= 1;
    }

    fn record_success(&self, latency_ms: f64) {
        let mut inner = self.inner.lock().unwrap();
        inner.latencies_ms.push(latency_ms);
        inner.recent.push_back((Instant::now(), Some(latency_ms)));
    }

    fn record_error(&self, message: String) {
        let at_secs = self.start.elapsed().as_secs_f64();
        let mut inner = self.inner.lock().unwrap();
        inner.errors.push(ErrorEntry { at_secs, message });
        inner.recent.push_back((Instant::now(), None));
    }

    /// Appends one time-series point covering the preceding second.
    fn sample(&self) {
        let now = Instant::now();
        let elapsed_secs = self.start.elapsed().as_secs_f64();
        let mut inner = self.inner.lock().unwrap();

        while let Some((at, _)) = inner.recent.front() {
            if now.duration_since(*at) > Duration::from_secs(1) {
                inner.recent.pop_front();
            } else {
                break;
            }
        }

        let requests_per_sec = inner.recent.len() as f64;
        let latencies: Vec<f64> = inner.recent.iter().filter_map(|(_, l)| *l).collect();
        let avg_response_ms = if latencies.is_empty() {
            0.0
        } else {
            latencies.iter().sum::<f64>() / latencies.len() as f64
        };

        let point = TimePoint {
            elapsed_secs,
            active_users: inner.active_users,
            requests_per_sec,
            avg_response_ms,
        };
        inner.series.push(point);
    }

    fn finish(self: Arc<Self>, config: &LoadTestConfig) -> LoadTestReport {
        let elapsed = self.start.elapsed();
        let inner = self.inner.lock().unwrap();
        LoadTestReport::from_samples(
            config,
            elapsed,
            inner.latencies_ms.clone(),
            inner.errors.clone(),
            inner.series.clone(),
        )
    }
}

/// Drives synthetic concurrent traffic against the access layer.
///
/// Every request goes either through the resilient facade (the pooled path)
/// or through a fresh connection opened just for that request (the direct
/// path), depending on the configuration. The same report shape comes out
/// of both, so runs are directly comparable.
///
/// # Example
///
/// ```rust
/// use floodgate_loadtest::{LoadTestConfig, LoadTester, OperationMix};
/// use floodgate_pool::{ConnectError, FnConnector, PoolConfig, PoolManager};
/// use floodgate_resilience::{Resilient, ResilienceConfig};
/// use std::sync::Arc;
///
/// struct MemoryConn;
///
/// # async fn example() {
/// let connector = Arc::new(FnConnector::new(|| async { Ok::<_, ConnectError>(MemoryConn) }));
/// let pool = PoolManager::new(PoolConfig::default(), Arc::clone(&connector));
/// let facade = Arc::new(Resilient::new(ResilienceConfig::default(), pool));
///
/// let tester = LoadTester::new(
///     LoadTestConfig::builder()
///         .concurrent_users(20)
///         .operation(OperationMix::Mixed)
///         .build(),
///     facade,
///     connector,
///     |_conn: &mut MemoryConn| Box::pin(async move { Ok(()) }),
///     |_conn: &mut MemoryConn| Box::pin(async move { Ok(()) }),
/// );
///
/// let report = tester.run().await;
/// println!("{}", report.render());
/// # }
/// ```
pub struct LoadTester<C: Connector> {
    config: LoadTestConfig,
    facade: Arc<Resilient<Arc<C>>>,
    connector: Arc<C>,
    read_op: SimulatedOp<C::Conn>,
    write_op: SimulatedOp<C::Conn>,
}

impl<C: Connector> LoadTester<C> {
    /// Creates a tester over the given facade and connector.
    ///
    /// The facade serves the pooled path; the connector serves the direct
    /// path, one fresh connection per request.
    pub fn new<R, W>(
        config: LoadTestConfig,
        facade: Arc<Resilient<Arc<C>>>,
        connector: Arc<C>,
        read_op: R,
        write_op: W,
    ) -> Self
    where
        R: for<'c> Fn(&'c mut C::Conn) -> BoxFuture<'c, Result<(), DynError>>
            + Send
            + Sync
            + 'static,
        W: for<'c> Fn(&'c mut C::Conn) -> BoxFuture<'c, Result<(), DynError>>
            + Send
            + Sync
            + 'static,
    {
        Self {
            config,
            facade,
            connector,
            read_op: Arc::new(read_op),
            write_op: Arc::new(write_op),
        }
    }

    /// Runs the full test and aggregates the report.
    pub async fn run(&self) -> LoadTestReport {
        let recorder = Arc::new(Recorder::new());
        let users = self.config.concurrent_users;

        #[cfg(feature = "tracing")]
        tracing::info!(
            users,
            pooled = self.config.use_connection_pool,
            mix = self.config.operation.as_str(),
            "starting load test"
        );

        let sampler = {
            let recorder = Arc::clone(&recorder);
            let duration = self.config.test_duration;
            tokio::spawn(async move {
                loop {
                    tokio::time::sleep(Duration::from_secs(1)).await;
                    recorder.sample();
                    if recorder.elapsed() >= duration {
                        break;
                    }
                }
            })
        };

        let mut tasks = Vec::with_capacity(users);
        for index in 0..users {
            let start_delay = self.config.ramp_up.mul_f64(index as f64 / users as f64);
            tasks.push(self.spawn_user(index, start_delay, Arc::clone(&recorder)));
        }

        for task in tasks {
            let _ = task.await;
        }
        // the users are done; the clock stops here, not at the next sample
        sampler.abort();
        let _ = sampler.await;

        let report = recorder.finish(&self.config);

        #[cfg(feature = "tracing")]
        tracing::info!(
            total = report.total_requests,
            failed = report.failed_requests,
            rps = report.requests_per_second,
            "load test finished"
        );

        report
    }

    fn spawn_user(
        &self,
        index: usize,
        start_delay: Duration,
        recorder: Arc<Recorder>,
    ) -> tokio::task::JoinHandle<()> {
        let config = self.config.clone();
        let facade = Arc::clone(&self.facade);
        let connector = Arc::clone(&self.connector);
        let read_op = Arc::clone(&self.read_op);
        let write_op = Arc::clone(&self.write_op);

        tokio::spawn(async move {
            tokio::time::sleep(start_delay).await;
            if recorder.elapsed() >= config.test_duration {
                return;
            }
            recorder.user_started();
            let mut rng = config.rng_for_user(index);

            while recorder.elapsed() < config.test_duration {
                let is_read = match config.operation {
                    OperationMix::Read => true,
                    OperationMix::Write => false,
                    OperationMix::Mixed => rng.random_bool(0.5),
                };
                let op = if is_read { &read_op } else { &write_op };

                let started = Instant::now();
                let request = async {
                    if config.use_connection_pool {
                        let name = if is_read { "load_read" } else { "load_write" };
                        let result = if is_read {
                            facade.read(name, op.as_ref()).await
                        } else {
                            facade.write(name, op.as_ref()).await
                        };
                        result.map_err(|e| e.to_string())
                    } else {
                        match connector.connect().await {
                            Ok(mut conn) => {
                                (op.as_ref())(&mut conn).await.map_err(|e| e.to_string())
                            }
                            Err(e) => Err(e.to_string()),
                        }
                    }
                };

                let outcome = match tokio::time::timeout(config.request_timeout, request).await {
                    Ok(result) => result,
                    Err(_) => Err(format!(
                        "request timeout after {}ms",
                        config.request_timeout.as_millis()
                    )),
                };

                match outcome {
                    Ok(()) => {
                        recorder.record_success(started.elapsed().as_secs_f64() * 1000.0);
                    }
                    Err(message) => recorder.record_error(message),
                }

                let jitter = 1.0 + config.random_delay_factor * rng.random_range(-1.0..=1.0);
                let pause = config.request_interval.mul_f64(jitter.max(0.0));
                tokio::time::sleep(pause).await;
            }

            recorder.user_stopped();
        })
    }
}
