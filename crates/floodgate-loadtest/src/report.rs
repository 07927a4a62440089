//! Result aggregation and the operator-facing text report.
//!
//! The text layout produced by [`LoadTestReport::render`] is a stable
//! external artifact consumed by dashboards; change it only deliberately.
//! The report struct itself serializes for machine consumers, supplementing
//! the text rather than replacing it.

use crate::config::LoadTestConfig;
use serde::Serialize;
use std::collections::HashMap;
use std::time::Duration;

const RULE_WIDTH: usize = 60;
const LABEL_WIDTH: usize = 38;
const VALUE_WIDTH: usize = 20;

/// One failed request: when it happened and what the backend said.
#[derive(Debug, Clone, Serialize)]
pub struct ErrorEntry {
    /// Seconds since the start of the run.
    pub at_secs: f64,
    /// The error message, verbatim.
    pub message: String,
}

/// One sampler observation, taken every second during the run.
#[derive(Debug, Clone, Serialize)]
pub struct TimePoint {
    /// Seconds since the start of the run.
    pub elapsed_secs: f64,
    /// Users whose request loops were running.
    pub active_users: usize,
    /// Requests completed in the preceding second.
    pub requests_per_sec: f64,
    /// Mean latency of successes in the preceding second.
    pub avg_response_ms: f64,
}

/// Aggregated outcome of one load test run.
#[derive(Debug, Clone, Serialize)]
pub struct LoadTestReport {
    /// Configured number of simulated users.
    pub concurrent_users: usize,
    /// Configured run length, in seconds.
    pub test_duration_secs: f64,
    /// Configured mean request interval, in milliseconds.
    pub request_interval_ms: u64,
    /// Configured operation mix.
    pub operation: String,
    /// Whether requests went through the connection pool.
    pub pooled: bool,
    /// Observed wall-clock length of the run, in seconds.
    pub elapsed_secs: f64,
    /// All requests issued.
    pub total_requests: u64,
    /// Requests that completed successfully.
    pub successful_requests: u64,
    /// Requests that failed or timed out.
    pub failed_requests: u64,
    /// `total_requests / elapsed_secs`.
    pub requests_per_second: f64,
    /// Mean latency over successful requests.
    pub average_response_ms: f64,
    /// 95th percentile latency, `sorted[floor(0.95 * n)]`.
    pub p95_response_ms: f64,
    /// Fastest successful request.
    pub min_response_ms: f64,
    /// Slowest successful request.
    pub max_response_ms: f64,
    /// Every failure, in order of occurrence.
    pub errors: Vec<ErrorEntry>,
    /// Sampler observations, one per second.
    pub time_series: Vec<TimePoint>,
}

impl LoadTestReport {
    /// Aggregates raw samples into a report.
    ///
    /// `latencies` holds one entry per successful request, in milliseconds.
    pub fn from_samples(
        config: &LoadTestConfig,
        elapsed: Duration,
        latencies: Vec<f64>,
        errors: Vec<ErrorEntry>,
        time_series: Vec<TimePoint>,
    ) -> Self {
        let successful = latencies.len() as u64;
        let failed = errors.len() as u64;
        let total = successful + failed;
        let elapsed_secs = elapsed.as_secs_f64();

        let mut sorted = latencies;
        sorted.sort_by(|a, b| a.total_cmp(b));

        let (average, p95, min, max) = if sorted.is_empty() {
            (0.0, 0.0, 0.0, 0.0)
        } else {
            let sum: f64 = sorted.iter().sum();
            let idx = ((0.95 * sorted.len() as f64).floor() as usize).min(sorted.len() - 1);
            (
                sum / sorted.len() as f64,
                sorted[idx],
                sorted[0],
                sorted[sorted.len() - 1],
            )
        };

        let requests_per_second = if elapsed_secs > 0.0 {
            total as f64 / elapsed_secs
        } else {
            0.0
        };

        Self {
            concurrent_users: config.concurrent_users(),
            test_duration_secs: config.test_duration().as_secs_f64(),
            request_interval_ms: config.request_interval().as_millis() as u64,
            operation: config.operation().as_str().to_string(),
            pooled: config.use_connection_pool(),
            elapsed_secs,
            total_requests: total,
            successful_requests: successful,
            failed_requests: failed,
            requests_per_second,
            average_response_ms: average,
            p95_response_ms: p95,
            min_response_ms: min,
            max_response_ms: max,
            errors,
            time_series,
        }
    }

    /// Renders the fixed-width text report.
    pub fn render(&self) -> String {
        let mut out = String::new();
        let rule = "=".repeat(RULE_WIDTH);
        let thin = "-".repeat(RULE_WIDTH);

        out.push_str(&rule);
        out.push('\n');
        out.push_str(format!("{:^width$}", "LOAD TEST REPORT", width = RULE_WIDTH).trim_end());
        out.push('\n');
        out.push_str(&rule);
        out.push_str("\n\n");

        out.push_str("Configuration\n");
        out.push_str(&thin);
        out.push('\n');
        out.push_str(&field("Concurrent users", self.concurrent_users.to_string()));
        out.push_str(&field(
            "Test duration",
            format!("{:.2}s", self.test_duration_secs),
        ));
        out.push_str(&field(
            "Request interval",
            format!("{}ms", self.request_interval_ms),
        ));
        out.push_str(&field("Request mix", self.operation.clone()));
        out.push_str(&field(
            "Connection pool",
            if self.pooled { "enabled" } else { "disabled" }.to_string(),
        ));
        out.push('\n');

        out.push_str("Performance\n");
        out.push_str(&thin);
        out.push('\n');
        out.push_str(&field("Total requests", self.total_requests.to_string()));
        out.push_str(&field("Successful", self.successful_requests.to_string()));
        out.push_str(&field("Failed", self.failed_requests.to_string()));
        out.push_str(&field("Elapsed", format!("{:.2}s", self.elapsed_secs)));
        out.push_str(&field(
            "Requests/sec",
            format!("{:.2}", self.requests_per_second),
        ));
        out.push('\n');

        out.push_str("Response times (ms)\n");
        out.push_str(&thin);
        out.push('\n');
        if self.successful_requests == 0 {
            out.push_str("  no successful requests recorded\n");
        } else {
            out.push_str(&format!(
                "{:>12}{:>12}{:>12}{:>12}\n",
                "min", "avg", "p95", "max"
            ));
            out.push_str(&format!(
                "{:>12.2}{:>12.2}{:>12.2}{:>12.2}\n",
                self.min_response_ms,
                self.average_response_ms,
                self.p95_response_ms,
                self.max_response_ms
            ));
        }
        out.push('\n');

        out.push_str("Errors (top 10)\n");
        out.push_str(&thin);
        out.push('\n');
        let grouped = self.grouped_errors();
        if grouped.is_empty() {
            out.push_str("  (none)\n");
        } else {
            for (count, message) in grouped.into_iter().take(10) {
                out.push_str(&format!("{:>7}x {}\n", count, message));
            }
        }
        out.push('\n');

        out.push_str(&rule);
        out.push('\n');
        out
    }

    /// Error messages grouped by count, most frequent first; ties break
    /// alphabetically so the report is deterministic.
    fn grouped_errors(&self) -> Vec<(u64, String)> {
        let mut counts: HashMap<&str, u64> = HashMap::new();
        for error in &self.errors {
            *counts.entry(error.message.as_str()).or_insert(0) += 1;
        }
        let mut grouped: Vec<(u64, String)> = counts
            .into_iter()
            .map(|(message, count)| (count, message.to_string()))
            .collect();
        grouped.sort_by(|a, b| b.0.cmp(&a.0).then_with(|| a.1.cmp(&b.1)));
        grouped
    }
}

fn field(label: &str, value: String) -> String {
    format!(
        "  {:.<label_width$}{:>value_width$}\n",
        format!("{} ", label),
        value,
        label_width = LABEL_WIDTH,
        value_width = VALUE_WIDTH,
    )
}
