use super::{counting_connector, TestConn};
use floodgate_pool::{operation, PoolConfig, PoolError, PoolManager, Priority};
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::sleep;

type OpResult = Result<(), PoolError<String>>;

/// Occupies the pool's single connection for `hold` milliseconds.
fn occupy(pool: &PoolManager<impl floodgate_pool::Connector<Conn = TestConn>>, hold: u64) {
    let pool = pool.clone();
    tokio::spawn(async move {
        let _: OpResult = pool
            .execute(
                operation(move |_conn: &mut TestConn| {
                    Box::pin(async move {
                        sleep(Duration::from_millis(hold)).await;
                        Ok(())
                    })
                }),
                Priority::Critical,
                Some(Duration::from_secs(10)),
            )
            .await;
    });
}

/// Parks a request in the queue at the given priority.
fn enqueue(
    pool: &PoolManager<impl floodgate_pool::Connector<Conn = TestConn>>,
    priority: Priority,
) -> JoinHandle<OpResult> {
    let pool = pool.clone();
    tokio::spawn(async move {
        pool.execute(
            operation(|_conn: &mut TestConn| Box::pin(async { Ok(()) })),
            priority,
            Some(Duration::from_secs(10)),
        )
        .await
    })
}

#[tokio::test]
async fn normal_rejected_when_queue_full() {
    let (connector, _connects) = counting_connector();
    let pool = PoolManager::new(
        PoolConfig::builder()
            .max_connections(1)
            .max_queue_size(2)
            .build(),
        connector,
    );

    occupy(&pool, 400);
    sleep(Duration::from_millis(30)).await;

    let _waiting = [
        enqueue(&pool, Priority::Normal),
        enqueue(&pool, Priority::Normal),
    ];
    sleep(Duration::from_millis(30)).await;
    assert_eq!(pool.status().queue_length, 2);

    let rejected: OpResult = pool
        .execute(
            operation(|_conn: &mut TestConn| Box::pin(async { Ok(()) })),
            Priority::Normal,
            None,
        )
        .await;
    assert!(matches!(rejected, Err(PoolError::QueueFull { capacity: 2 })));
    assert_eq!(pool.status().queue_length, 2);
    assert_eq!(pool.status().stats.rejected, 1);
}

#[tokio::test]
async fn critical_evicts_exactly_one_low_entry() {
    let (connector, _connects) = counting_connector();
    let pool = PoolManager::new(
        PoolConfig::builder()
            .max_connections(1)
            .max_queue_size(2)
            .build(),
        connector,
    );

    occupy(&pool, 300);
    sleep(Duration::from_millis(30)).await;

    let low = enqueue(&pool, Priority::Low);
    sleep(Duration::from_millis(10)).await;
    let normal = enqueue(&pool, Priority::Normal);
    sleep(Duration::from_millis(30)).await;
    assert_eq!(pool.status().queue_length, 2);

    let critical = enqueue(&pool, Priority::Critical);
    sleep(Duration::from_millis(30)).await;

    // the low entry was displaced, the queue stayed at capacity
    let evicted = low.await.unwrap();
    assert!(matches!(evicted, Err(PoolError::Evicted)));
    assert_eq!(pool.status().queue_length, 2);
    assert_eq!(pool.status().stats.evicted, 1);

    // the survivors complete once the connection frees up
    assert!(critical.await.unwrap().is_ok());
    assert!(normal.await.unwrap().is_ok());
}

#[tokio::test]
async fn critical_rejected_when_nothing_to_evict() {
    let (connector, _connects) = counting_connector();
    let pool = PoolManager::new(
        PoolConfig::builder()
            .max_connections(1)
            .max_queue_size(2)
            .build(),
        connector,
    );

    occupy(&pool, 300);
    sleep(Duration::from_millis(30)).await;

    let _waiting = [
        enqueue(&pool, Priority::Normal),
        enqueue(&pool, Priority::High),
    ];
    sleep(Duration::from_millis(30)).await;

    let rejected: OpResult = pool
        .execute(
            operation(|_conn: &mut TestConn| Box::pin(async { Ok(()) })),
            Priority::Critical,
            None,
        )
        .await;
    assert!(matches!(rejected, Err(PoolError::QueueFull { .. })));
    assert_eq!(pool.status().queue_length, 2);
}

/// The queue invariant `len <= max_queue_size` holds through eviction churn.
#[tokio::test]
async fn queue_never_exceeds_capacity() {
    let (connector, _connects) = counting_connector();
    let pool = PoolManager::new(
        PoolConfig::builder()
            .max_connections(1)
            .max_queue_size(3)
            .build(),
        connector,
    );

    occupy(&pool, 300);
    sleep(Duration::from_millis(30)).await;

    let mut handles = Vec::new();
    for priority in [
        Priority::Low,
        Priority::Low,
        Priority::Low,
        Priority::High,
        Priority::Critical,
        Priority::Normal,
    ] {
        handles.push(enqueue(&pool, priority));
        sleep(Duration::from_millis(5)).await;
        assert!(pool.status().queue_length <= 3);
    }

    for handle in handles {
        let _ = handle.await.unwrap();
    }
}
