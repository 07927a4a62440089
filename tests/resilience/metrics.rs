use super::{quick_facade, TestConn};
use floodgate_resilience::{op, AccessError};
use std::time::Duration;
use tokio::time::sleep;

#[tokio::test]
async fn totals_and_per_operation_counters() {
    let (db, _connects) = quick_facade(|b| b, 0);

    for _ in 0..3 {
        let result: Result<(), AccessError<String>> = db
            .read(
                "get_product",
                op(|_conn: &mut TestConn| Box::pin(async { Ok(()) })),
            )
            .await;
        assert!(result.is_ok());
    }
    let result: Result<(), AccessError<String>> = db
        .write(
            "update_cart",
            op(|_conn: &mut TestConn| Box::pin(async { Err("row locked".to_string()) })),
        )
        .await;
    assert!(result.is_err());

    let metrics = db.metrics();
    assert_eq!(metrics.total_operations, 4);
    assert_eq!(metrics.successful_operations, 3);
    assert_eq!(metrics.failed_operations, 1);
    assert_eq!(metrics.operations["get_product"], 3);
    assert_eq!(metrics.operations["update_cart"], 1);
    assert_eq!(metrics.errors["row locked"], 1);
}

#[tokio::test]
async fn average_execution_time_tracks_successes() {
    let (db, _connects) = quick_facade(|b| b, 0);

    for delay_ms in [10u64, 30] {
        let result: Result<(), AccessError<String>> = db
            .read(
                "timed_read",
                op(move |_conn: &mut TestConn| {
                    Box::pin(async move {
                        sleep(Duration::from_millis(delay_ms)).await;
                        Ok(())
                    })
                }),
            )
            .await;
        assert!(result.is_ok());
    }

    let metrics = db.metrics();
    assert!(metrics.average_execution_ms >= 10.0);
    assert!(metrics.average_execution_ms < 200.0);
}

#[tokio::test]
async fn retried_attempts_each_count_toward_totals() {
    let (db, _connects) = quick_facade(|b| b, 2);

    let result: Result<(), AccessError<String>> = db
        .read(
            "always_unavailable",
            op(|_conn: &mut TestConn| {
                Box::pin(async { Err("service unavailable".to_string()) })
            }),
        )
        .await;
    assert!(result.is_err());

    let metrics = db.metrics();
    assert_eq!(metrics.total_operations, 3);
    assert_eq!(metrics.failed_operations, 1, "one outcome despite three attempts");
    assert_eq!(metrics.operations["always_unavailable"], 3);
    assert_eq!(metrics.errors["service unavailable"], 1);
}

#[tokio::test]
async fn reset_metrics_restarts_uptime() {
    let (db, _connects) = quick_facade(|b| b, 0);

    let result: Result<(), AccessError<String>> = db
        .read(
            "warmup",
            op(|_conn: &mut TestConn| Box::pin(async { Ok(()) })),
        )
        .await;
    assert!(result.is_ok());

    sleep(Duration::from_millis(50)).await;
    let before = db.metrics().uptime;
    db.reset_metrics();
    let after = db.metrics().uptime;

    assert!(before >= Duration::from_millis(50));
    assert!(after < before);
    assert_eq!(db.metrics().total_operations, 0);
}
