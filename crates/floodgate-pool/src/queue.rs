//! Priority ordering for pending acquisition requests.

use crate::error::ConnectError;
use std::fmt;
use std::time::Instant;
use tokio::sync::oneshot;

/// Urgency of an acquisition request. Lower values are served first.
///
/// The ordering is part of the contract: `Critical < High < Normal < Low`,
/// and the queue dispatches in ascending order with FIFO tie-break within a
/// level. Sustained high-priority load can starve `Low` indefinitely; that
/// is accepted behavior.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Priority {
    Critical,
    High,
    Normal,
    Low,
}

impl Priority {
    /// Stable lowercase name, used in logs and reports.
    pub fn as_str(&self) -> &'static str {
        match self {
            Priority::Critical => "critical",
            Priority::High => "high",
            Priority::Normal => "normal",
            Priority::Low => "low",
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A connection grant sent to a queued waiter.
pub(crate) struct Granted<T> {
    pub id: u64,
    pub conn: T,
}

/// Why a queued request failed before ever receiving a connection.
#[derive(Debug)]
pub(crate) enum AcquireFailure {
    Creation(ConnectError),
    Timeout,
    QueueFull { capacity: usize },
    Evicted,
    Reset,
}

impl<E> From<AcquireFailure> for crate::error::PoolError<E> {
    fn from(failure: AcquireFailure) -> Self {
        match failure {
            AcquireFailure::Creation(e) => crate::error::PoolError::ConnectionCreation(e),
            AcquireFailure::Timeout => crate::error::PoolError::AcquisitionTimeout,
            AcquireFailure::QueueFull { capacity } => {
                crate::error::PoolError::QueueFull { capacity }
            }
            AcquireFailure::Evicted => crate::error::PoolError::Evicted,
            AcquireFailure::Reset => crate::error::PoolError::PoolReset,
        }
    }
}

/// A pending acquisition waiting for a connection to free up.
pub(crate) struct QueuedRequest<T> {
    pub id: u64,
    pub priority: Priority,
    pub seq: u64,
    pub queued_at: Instant,
    pub tx: oneshot::Sender<Result<Granted<T>, AcquireFailure>>,
}

/// The pending-request queue, kept sorted by `(priority, arrival order)`.
pub(crate) struct RequestQueue<T> {
    entries: Vec<QueuedRequest<T>>,
    next_seq: u64,
}

impl<T> RequestQueue<T> {
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
            next_seq: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Enqueues a request and restores the `(priority, seq)` ordering.
    pub fn push(
        &mut self,
        id: u64,
        priority: Priority,
        tx: oneshot::Sender<Result<Granted<T>, AcquireFailure>>,
    ) {
        let seq = self.next_seq;
        self.next_seq += 1;
        self.entries.push(QueuedRequest {
            id,
            priority,
            seq,
            queued_at: Instant::now(),
            tx,
        });
        self.entries.sort_by_key(|r| (r.priority, r.seq));
    }

    /// Removes and returns the most urgent request.
    pub fn pop_front(&mut self) -> Option<QueuedRequest<T>> {
        if self.entries.is_empty() {
            None
        } else {
            Some(self.entries.remove(0))
        }
    }

    /// Removes a request by id, if it is still queued.
    pub fn remove(&mut self, id: u64) -> Option<QueuedRequest<T>> {
        let pos = self.entries.iter().position(|r| r.id == id)?;
        Some(self.entries.remove(pos))
    }

    /// Removes the most recently queued `Low` request, if any.
    pub fn evict_newest_low(&mut self) -> Option<QueuedRequest<T>> {
        let pos = self
            .entries
            .iter()
            .rposition(|r| r.priority == Priority::Low)?;
        Some(self.entries.remove(pos))
    }

    /// Empties the queue, returning every pending request.
    pub fn drain(&mut self) -> Vec<QueuedRequest<T>> {
        self.entries.drain(..).collect()
    }

    #[cfg(test)]
    fn priorities(&self) -> Vec<(Priority, u64)> {
        self.entries.iter().map(|r| (r.priority, r.seq)).collect()
    }
}
