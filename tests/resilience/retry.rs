use super::{quick_facade, TestConn};
use floodgate_pool::{PoolError, Priority};
use floodgate_resilience::{op, AccessError, OperationPolicy};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::sleep;

#[tokio::test]
async fn transient_failures_are_retried_until_success() {
    let (db, _connects) = quick_facade(|b| b, 2);
    let calls = Arc::new(AtomicUsize::new(0));

    let counter = Arc::clone(&calls);
    let result: Result<(), AccessError<String>> = db
        .read(
            "flaky_read",
            op(move |_conn: &mut TestConn| {
                let n = counter.fetch_add(1, Ordering::SeqCst);
                Box::pin(async move {
                    if n < 2 {
                        Err("connection reset by peer".to_string())
                    } else {
                        Ok(())
                    }
                })
            }),
        )
        .await;

    assert!(result.is_ok());
    assert_eq!(calls.load(Ordering::SeqCst), 3, "two retries then success");
}

#[tokio::test]
async fn permanent_failures_are_not_retried() {
    let (db, _connects) = quick_facade(|b| b, 2);
    let calls = Arc::new(AtomicUsize::new(0));

    let counter = Arc::clone(&calls);
    let result: Result<(), AccessError<String>> = db
        .read(
            "broken_read",
            op(move |_conn: &mut TestConn| {
                counter.fetch_add(1, Ordering::SeqCst);
                Box::pin(async move { Err("syntax error near SELECT".to_string()) })
            }),
        )
        .await;

    assert!(result.is_err());
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn exhausted_retries_propagate_the_last_error() {
    let (db, _connects) = quick_facade(|b| b, 2);
    let calls = Arc::new(AtomicUsize::new(0));

    let counter = Arc::clone(&calls);
    let result: Result<(), AccessError<String>> = db
        .read(
            "always_down",
            op(move |_conn: &mut TestConn| {
                counter.fetch_add(1, Ordering::SeqCst);
                Box::pin(async move { Err("backend unavailable".to_string()) })
            }),
        )
        .await;

    assert_eq!(calls.load(Ordering::SeqCst), 3, "initial attempt plus two retries");
    match result {
        Err(AccessError::Pool(PoolError::Operation(message))) => {
            assert_eq!(message, "backend unavailable");
        }
        other => panic!("expected the operation error, got {:?}", other.err().map(|e| e.to_string())),
    }
}

/// Each retry goes back through the pool rather than pinning one connection.
#[tokio::test]
async fn each_retry_is_a_fresh_acquisition() {
    let (db, _connects) = quick_facade(|b| b, 2);
    let calls = Arc::new(AtomicUsize::new(0));

    let counter = Arc::clone(&calls);
    let result: Result<(), AccessError<String>> = db
        .read(
            "flaky_read",
            op(move |_conn: &mut TestConn| {
                let n = counter.fetch_add(1, Ordering::SeqCst);
                Box::pin(async move {
                    if n < 2 {
                        Err("temporary failure".to_string())
                    } else {
                        Ok(())
                    }
                })
            }),
        )
        .await;
    assert!(result.is_ok());

    let stats = db.status().pool.stats;
    assert_eq!(stats.created + stats.reused, 3);
}

/// Queue-full rejections carry no transient keyword, so the facade does not
/// spin on them.
#[tokio::test]
async fn queue_full_is_not_retried() {
    let (db, _connects) = quick_facade(|b| b.max_connections(1).max_queue_size(0), 2);

    // occupy the single connection
    let holder = {
        let db = Arc::clone(&db);
        tokio::spawn(async move {
            db.read(
                "hold",
                op(|_conn: &mut TestConn| {
                    Box::pin(async {
                        sleep(Duration::from_millis(150)).await;
                        Ok::<_, String>(())
                    })
                }),
            )
            .await
        })
    };
    sleep(Duration::from_millis(30)).await;

    let result: Result<(), AccessError<String>> = db
        .read(
            "rejected",
            op(|_conn: &mut TestConn| Box::pin(async { Ok(()) })),
        )
        .await;

    assert!(matches!(
        result,
        Err(AccessError::Pool(PoolError::QueueFull { .. }))
    ));
    // one attempt only: the rejection plus the in-flight holder
    assert_eq!(db.metrics().total_operations, 2);

    assert!(holder.await.unwrap().is_ok());
}

/// Acquisition timeouts mention "timeout", so they are retried.
#[tokio::test]
async fn acquisition_timeout_is_retried_as_transient() {
    let (db, _connects) = quick_facade(|b| b.max_connections(1), 1);

    let holder = {
        let db = Arc::clone(&db);
        tokio::spawn(async move {
            db.read(
                "hold",
                op(|_conn: &mut TestConn| {
                    Box::pin(async {
                        sleep(Duration::from_millis(400)).await;
                        Ok::<_, String>(())
                    })
                }),
            )
            .await
        })
    };
    sleep(Duration::from_millis(30)).await;

    let policy = OperationPolicy::new(Priority::Normal, 1)
        .retry_delay(Duration::from_millis(10))
        .timeout(Duration::from_millis(40));
    let result: Result<(), AccessError<String>> = db
        .execute_with(
            "impatient",
            policy,
            op(|_conn: &mut TestConn| Box::pin(async { Ok(()) })),
        )
        .await;

    assert!(matches!(
        result,
        Err(AccessError::Pool(PoolError::AcquisitionTimeout))
    ));
    // the holder's attempt plus two timed-out acquisitions
    assert_eq!(db.metrics().total_operations, 3);
    assert_eq!(db.status().pool.stats.timed_out, 2);

    assert!(holder.await.unwrap().is_ok());
}
