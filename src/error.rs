use thiserror::Error;

/// Returned by [`Queue::push`](crate::Queue::push) once the queue is closed.
///
/// Carries the rejected item back to the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("queue is closed")]
pub struct ClosedError<T>(pub T);

impl<T> ClosedError<T> {
    /// Recovers the item that could not be pushed.
    pub fn into_inner(self) -> T {
        self.0
    }
}

/// Returned by the non-blocking and deadline-bounded pushes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum TryPushError<T> {
    /// No slot was free.
    #[error("queue is full")]
    Full(T),
    /// The queue was closed.
    #[error("queue is closed")]
    Closed(T),
}

impl<T> TryPushError<T> {
    /// Recovers the item that could not be pushed.
    pub fn into_inner(self) -> T {
        match self {
            TryPushError::Full(item) | TryPushError::Closed(item) => item,
        }
    }

    /// The queue had no free slot.
    pub fn is_full(&self) -> bool {
        matches!(self, TryPushError::Full(_))
    }

    /// The queue was closed.
    pub fn is_closed(&self) -> bool {
        matches!(self, TryPushError::Closed(_))
    }
}

impl<T> From<ClosedError<T>> for TryPushError<T> {
    fn from(err: ClosedError<T>) -> Self {
        TryPushError::Closed(err.0)
    }
}

/// Invalid [`QueueConfig`](crate::QueueConfig).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// A queue needs at least one slot.
    #[error("capacity must be greater than 0")]
    ZeroCapacity,
}
