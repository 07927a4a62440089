use super::{breaker_config, facade, TestConn};
use floodgate_resilience::{op, AccessError, CircuitState};

#[tokio::test]
async fn reset_closes_the_circuit_and_clears_the_pool() {
    let (db, _connects) = facade(breaker_config(1, 30_000));

    let result: Result<(), AccessError<String>> = db
        .read(
            "down",
            op(|_conn: &mut TestConn| Box::pin(async { Err("bad request".to_string()) })),
        )
        .await;
    assert!(result.is_err());
    assert_eq!(db.circuit_state(), CircuitState::Open);

    db.reset();

    assert_eq!(db.circuit_state(), CircuitState::Closed);
    let status = db.status();
    assert_eq!(status.pool.available_connections, 0);
    assert_eq!(status.pool.busy_connections, 0);
    assert_eq!(status.pool.queue_length, 0);

    let result: Result<u32, AccessError<String>> = db
        .read(
            "up_again",
            op(|_conn: &mut TestConn| Box::pin(async { Ok(5) })),
        )
        .await;
    assert_eq!(result.unwrap(), 5);
}

#[tokio::test]
async fn reset_preserves_metrics() {
    let (db, _connects) = facade(breaker_config(5, 30_000));

    let result: Result<(), AccessError<String>> = db
        .read(
            "lookup",
            op(|_conn: &mut TestConn| Box::pin(async { Ok(()) })),
        )
        .await;
    assert!(result.is_ok());

    db.reset();
    assert_eq!(db.metrics().total_operations, 1);

    db.reset_metrics();
    assert_eq!(db.metrics().total_operations, 0);
}
