use super::ConcurrencyTracker;
use floodgate_pool::{
    operation, ConnectError, FnConnector, PoolConfig, PoolError, PoolManager, Priority,
};
use std::time::Duration;
use tokio::time::sleep;

struct TestConn;

/// A thousand concurrent requests against twenty connections: everything
/// completes, nothing exceeds the cap, no slot leaks.
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
#[ignore]
async fn thousand_concurrent_requests() {
    let max_connections = 20;
    let pool = PoolManager::new(
        PoolConfig::builder()
            .max_connections(max_connections)
            .max_queue_size(2000)
            .build(),
        FnConnector::new(|| async { Ok::<_, ConnectError>(TestConn) }),
    );
    let tracker = ConcurrencyTracker::new();

    let mut handles = Vec::new();
    for _ in 0..1000 {
        let pool = pool.clone();
        let tracker = tracker.clone();
        handles.push(tokio::spawn(async move {
            pool.execute(
                operation(move |_conn: &mut TestConn| {
                    Box::pin(async move {
                        tracker.enter();
                        sleep(Duration::from_millis(2)).await;
                        tracker.exit();
                        Ok::<_, String>(())
                    })
                }),
                Priority::Normal,
                Some(Duration::from_secs(60)),
            )
            .await
        }));
    }

    let mut succeeded = 0;
    for handle in handles {
        if handle.await.unwrap().is_ok() {
            succeeded += 1;
        }
    }

    assert_eq!(succeeded, 1000);
    assert!(
        tracker.peak() <= max_connections,
        "peak {} exceeded cap {}",
        tracker.peak(),
        max_connections
    );

    // all slots return to the pool once the dust settles
    let status = pool.status();
    assert_eq!(status.busy_connections, 0);
    assert_eq!(status.queue_length, 0);
}

/// Repeated reset storms while requests are in flight never wedge the pool.
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
#[ignore]
async fn reset_storm_leaves_a_usable_pool() {
    let pool = PoolManager::new(
        PoolConfig::builder()
            .max_connections(4)
            .max_queue_size(200)
            .build(),
        FnConnector::new(|| async { Ok::<_, ConnectError>(TestConn) }),
    );

    for _round in 0..20 {
        let mut handles = Vec::new();
        for _ in 0..50 {
            let pool = pool.clone();
            handles.push(tokio::spawn(async move {
                let result: Result<(), PoolError<String>> = pool
                    .execute(
                        operation(|_conn: &mut TestConn| {
                            Box::pin(async {
                                sleep(Duration::from_millis(1)).await;
                                Ok(())
                            })
                        }),
                        Priority::Normal,
                        Some(Duration::from_secs(5)),
                    )
                    .await;
                result
            }));
        }
        sleep(Duration::from_millis(5)).await;
        pool.reset();
        for handle in handles {
            // reset errors are expected; panics and hangs are not
            let _ = handle.await.unwrap();
        }
    }

    let result: Result<(), PoolError<String>> = pool
        .execute(
            operation(|_conn: &mut TestConn| Box::pin(async { Ok(()) })),
            Priority::Normal,
            None,
        )
        .await;
    assert!(result.is_ok());
}
