use thiserror::Error;

/// Failure to establish a backend connection.
///
/// Raised by [`Connector::connect`](crate::Connector::connect) implementations
/// when credentials are missing or the backend is unreachable.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("failed to establish backend connection: {message}")]
pub struct ConnectError {
    message: String,
}

impl ConnectError {
    /// Creates a new connection error with the given message.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    /// Returns the underlying message.
    pub fn message(&self) -> &str {
        &self.message
    }
}

/// Errors returned by [`PoolManager::execute`](crate::PoolManager::execute).
///
/// `E` is the error type of the operation itself; everything else originates
/// in the pool. Pool-level errors are surfaced to the caller verbatim and are
/// never retried by the pool itself.
#[derive(Debug, Error)]
pub enum PoolError<E> {
    /// Establishing a new backend connection failed.
    #[error(transparent)]
    ConnectionCreation(ConnectError),

    /// A queued request exceeded its timeout before a connection freed up.
    #[error("connection acquisition timeout while waiting in queue")]
    AcquisitionTimeout,

    /// The queue is at capacity and the request's priority was insufficient
    /// to evict anything.
    #[error("request queue is full ({capacity} waiting)")]
    QueueFull {
        /// Configured queue capacity.
        capacity: usize,
    },

    /// A queued request was displaced by a higher-priority submission.
    #[error("queued request evicted by a higher priority request")]
    Evicted,

    /// The pool was reset while the request was queued.
    #[error("connection pool was reset")]
    PoolReset,

    /// The operation itself failed after running on a connection.
    #[error("{0}")]
    Operation(E),
}

impl<E> PoolError<E> {
    /// Returns true for the queue-at-capacity rejection.
    pub fn is_queue_full(&self) -> bool {
        matches!(self, PoolError::QueueFull { .. })
    }

    /// Returns true if the request was evicted from the queue.
    pub fn is_evicted(&self) -> bool {
        matches!(self, PoolError::Evicted)
    }

    /// Returns true if the request timed out while queued.
    pub fn is_acquisition_timeout(&self) -> bool {
        matches!(self, PoolError::AcquisitionTimeout)
    }

    /// Returns true if the pool was reset underneath the request.
    pub fn is_pool_reset(&self) -> bool {
        matches!(self, PoolError::PoolReset)
    }

    /// Returns the operation error, if that is what this is.
    pub fn into_operation(self) -> Option<E> {
        match self {
            PoolError::Operation(e) => Some(e),
            _ => None,
        }
    }
}
