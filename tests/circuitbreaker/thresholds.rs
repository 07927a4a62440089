use super::{breaker_config, facade, TestConn};
use floodgate_resilience::{op, AccessError, CircuitState, OperationClass};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// After `failure_threshold` consecutive failures the next call fails fast
/// with no pool interaction at all: no operation run, no new connection, no
/// queue entry.
#[tokio::test]
async fn sixth_call_fails_fast_after_five_failures() {
    let (db, connects) = facade(breaker_config(5, 30_000));
    let op_calls = Arc::new(AtomicUsize::new(0));

    for _ in 0..5 {
        let calls = Arc::clone(&op_calls);
        let result: Result<(), AccessError<String>> = db
            .execute(
                "failing_read",
                OperationClass::Read,
                op(move |_conn: &mut TestConn| {
                    let calls = Arc::clone(&calls);
                    Box::pin(async move {
                        calls.fetch_add(1, Ordering::SeqCst);
                        Err("duplicate key value".to_string())
                    })
                }),
            )
            .await;
        assert!(result.is_err());
    }
    assert_eq!(db.circuit_state(), CircuitState::Open);
    let connects_before = connects.load(Ordering::SeqCst);

    let calls = Arc::clone(&op_calls);
    let result: Result<(), AccessError<String>> = db
        .execute(
            "failing_read",
            OperationClass::Read,
            op(move |_conn: &mut TestConn| {
                let calls = Arc::clone(&calls);
                Box::pin(async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Err("duplicate key value".to_string())
                })
            }),
        )
        .await;

    assert!(matches!(result, Err(AccessError::CircuitOpen)));
    assert_eq!(op_calls.load(Ordering::SeqCst), 5, "rejected call must not run");
    assert_eq!(connects.load(Ordering::SeqCst), connects_before);
    assert_eq!(db.status().pool.queue_length, 0);
}

/// A success in the middle of a streak resets the consecutive count.
#[tokio::test]
async fn success_interrupts_the_failure_streak() {
    let (db, _connects) = facade(breaker_config(3, 30_000));

    for _ in 0..2 {
        let result: Result<(), AccessError<String>> = db
            .read(
                "flaky",
                op(|_conn: &mut TestConn| {
                    Box::pin(async { Err("invalid column".to_string()) })
                }),
            )
            .await;
        assert!(result.is_err());
    }

    let ok: Result<(), AccessError<String>> = db
        .read(
            "flaky",
            op(|_conn: &mut TestConn| Box::pin(async { Ok(()) })),
        )
        .await;
    assert!(ok.is_ok());

    for _ in 0..2 {
        let result: Result<(), AccessError<String>> = db
            .read(
                "flaky",
                op(|_conn: &mut TestConn| {
                    Box::pin(async { Err("invalid column".to_string()) })
                }),
            )
            .await;
        assert!(result.is_err());
    }
    // 2 + 2 failures with a success between: the streak never reached 3
    assert_eq!(db.circuit_state(), CircuitState::Closed);

    let result: Result<(), AccessError<String>> = db
        .read(
            "flaky",
            op(|_conn: &mut TestConn| {
                Box::pin(async { Err("invalid column".to_string()) })
            }),
        )
        .await;
    assert!(result.is_err());
    assert_eq!(db.circuit_state(), CircuitState::Open);
}

/// Circuit rejections are still visible in the facade metrics.
#[tokio::test]
async fn rejections_are_counted_in_metrics() {
    let (db, _connects) = facade(breaker_config(1, 30_000));

    let result: Result<(), AccessError<String>> = db
        .read(
            "down",
            op(|_conn: &mut TestConn| Box::pin(async { Err("bad request".to_string()) })),
        )
        .await;
    assert!(result.is_err());

    let rejected: Result<(), AccessError<String>> = db
        .read(
            "down",
            op(|_conn: &mut TestConn| Box::pin(async { Ok(()) })),
        )
        .await;
    assert!(matches!(rejected, Err(AccessError::CircuitOpen)));

    let metrics = db.metrics();
    assert_eq!(metrics.total_operations, 2);
    assert_eq!(metrics.failed_operations, 2);
    let circuit_errors: u64 = metrics
        .errors
        .iter()
        .filter(|(message, _)| message.contains("circuit breaker is open"))
        .map(|(_, count)| *count)
        .sum();
    assert_eq!(circuit_errors, 1);
}
