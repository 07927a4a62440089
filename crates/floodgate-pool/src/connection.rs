//! Backend connection abstraction and pooled-connection bookkeeping.

use crate::error::ConnectError;
use futures::future::BoxFuture;
use std::future::Future;
use std::time::{Duration, Instant};

/// Something that can open a connection to the backend.
///
/// The pool never inspects the connection itself; it only tracks lifecycle
/// metadata around it. Production code implements this over the real backend
/// driver; tests substitute an in-memory fake via [`FnConnector`].
pub trait Connector: Send + Sync + 'static {
    /// The live connection handle.
    type Conn: Send + 'static;

    /// Opens a new connection.
    fn connect(&self) -> BoxFuture<'static, Result<Self::Conn, ConnectError>>;
}

impl<C: Connector> Connector for std::sync::Arc<C> {
    type Conn = C::Conn;

    fn connect(&self) -> BoxFuture<'static, Result<Self::Conn, ConnectError>> {
        (**self).connect()
    }
}

/// A closure-based [`Connector`].
///
/// # Example
///
/// ```rust
/// use floodgate_pool::{ConnectError, FnConnector};
///
/// struct MemoryConn;
///
/// let connector = FnConnector::new(|| async { Ok::<_, ConnectError>(MemoryConn) });
/// ```
pub struct FnConnector<F> {
    f: F,
}

impl<F> FnConnector<F> {
    /// Creates a connector from the given closure.
    pub fn new(f: F) -> Self {
        Self { f }
    }
}

impl<F, Fut, C> Connector for FnConnector<F>
where
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<C, ConnectError>> + Send + 'static,
    C: Send + 'static,
{
    type Conn = C;

    fn connect(&self) -> BoxFuture<'static, Result<Self::Conn, ConnectError>> {
        Box::pin((self.f)())
    }
}

/// A pool entry: the live handle plus its lifecycle metadata.
///
/// The handle is taken out of `conn` while an operation holds the lease and
/// put back when the lease is released, so an entry with `conn == None` is
/// always `in_use`.
pub(crate) struct PooledConnection<T> {
    pub id: u64,
    pub conn: Option<T>,
    pub created_at: Instant,
    pub last_used: Instant,
    pub in_use: bool,
    pub operations: u64,
    pub has_errors: bool,
}

impl<T> PooledConnection<T> {
    pub fn leased(id: u64) -> Self {
        let now = Instant::now();
        Self {
            id,
            conn: None,
            created_at: now,
            last_used: now,
            in_use: true,
            operations: 0,
            has_errors: false,
        }
    }

    /// An idle entry that can be handed to a new operation right away.
    pub fn is_available(&self, max_idle: Duration, max_lifetime: Duration) -> bool {
        !self.in_use
            && self.conn.is_some()
            && !self.has_errors
            && self.created_at.elapsed() < max_lifetime
            && self.last_used.elapsed() < max_idle
    }
}
