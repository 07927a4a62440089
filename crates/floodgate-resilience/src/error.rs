use floodgate_pool::PoolError;
use thiserror::Error;

/// Message used when the breaker rejects a call. The transient-keyword
/// classifier must not match it, so an open circuit is never retried.
pub(crate) const CIRCUIT_OPEN_MESSAGE: &str =
    "circuit breaker is open; request rejected before reaching the pool";

/// Errors returned by the [`Resilient`](crate::Resilient) facade.
#[derive(Debug, Error)]
pub enum AccessError<E> {
    /// The circuit breaker is open; the pool was never consulted.
    #[error("circuit breaker is open; request rejected before reaching the pool")]
    CircuitOpen,

    /// The operation failed in or under the pool, after any retries.
    #[error("{0}")]
    Pool(PoolError<E>),
}

impl<E> AccessError<E> {
    /// Returns true if the error is the breaker's fast-fail rejection.
    pub fn is_circuit_open(&self) -> bool {
        matches!(self, AccessError::CircuitOpen)
    }

    /// Returns the pool-level error if present.
    pub fn into_pool(self) -> Option<PoolError<E>> {
        match self {
            AccessError::Pool(e) => Some(e),
            _ => None,
        }
    }

    /// Returns the operation's own error if that is what ultimately failed.
    pub fn into_operation(self) -> Option<E> {
        self.into_pool().and_then(PoolError::into_operation)
    }
}

impl<E> From<PoolError<E>> for AccessError<E> {
    fn from(err: PoolError<E>) -> Self {
        AccessError::Pool(err)
    }
}
