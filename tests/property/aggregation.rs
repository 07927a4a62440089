//! Property tests for load-report aggregation.
//!
//! Invariants tested:
//! - `total = successful + failed` for any sample mix
//! - `max >= p95 >= min` whenever any request succeeded
//! - the average lies between min and max

use floodgate_loadtest::{ErrorEntry, LoadTestConfig, LoadTestReport};
use proptest::prelude::*;
use std::time::Duration;

fn build(latencies: Vec<f64>, failures: usize) -> LoadTestReport {
    let config = LoadTestConfig::builder().build();
    let errors = (0..failures)
        .map(|n| ErrorEntry {
            at_secs: n as f64 * 0.1,
            message: "connection timeout".to_string(),
        })
        .collect();
    LoadTestReport::from_samples(&config, Duration::from_secs(10), latencies, errors, Vec::new())
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn totals_split_exactly(
        latencies in prop::collection::vec(0.1f64..500.0, 0..200),
        failures in 0usize..50,
    ) {
        let report = build(latencies.clone(), failures);
        prop_assert_eq!(report.successful_requests, latencies.len() as u64);
        prop_assert_eq!(report.failed_requests, failures as u64);
        prop_assert_eq!(
            report.total_requests,
            report.successful_requests + report.failed_requests
        );
    }

    #[test]
    fn latency_summary_is_ordered(
        latencies in prop::collection::vec(0.1f64..500.0, 1..200),
    ) {
        let report = build(latencies, 0);
        prop_assert!(report.max_response_ms >= report.p95_response_ms);
        prop_assert!(report.p95_response_ms >= report.min_response_ms);
        prop_assert!(report.average_response_ms >= report.min_response_ms);
        prop_assert!(report.average_response_ms <= report.max_response_ms);
    }

    #[test]
    fn throughput_matches_total_over_elapsed(
        latencies in prop::collection::vec(0.1f64..50.0, 0..100),
        failures in 0usize..20,
    ) {
        let report = build(latencies, failures);
        let expected = report.total_requests as f64 / 10.0;
        prop_assert!((report.requests_per_second - expected).abs() < 1e-9);
    }
}
