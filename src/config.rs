use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::spinner::SpinPriority;

/// Construction parameters for a [`Queue`](crate::Queue).
///
/// ```
/// use ticket_mpmc::{Queue, QueueConfig, SpinPriority};
///
/// let config = QueueConfig::new(64).with_priority(SpinPriority::High);
/// let queue: Queue<u32> = Queue::from_config(&config).unwrap();
/// assert_eq!(queue.capacity(), 64);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueConfig {
    /// Number of slots; must be positive.
    pub capacity: usize,
    /// Backoff used by blocking calls.
    #[serde(default)]
    pub priority: SpinPriority,
}

impl QueueConfig {
    /// Config for `capacity` slots with the default priority.
    pub fn new(capacity: usize) -> Self {
        QueueConfig { capacity, priority: SpinPriority::default() }
    }

    /// Replaces the spin priority.
    pub fn with_priority(mut self, priority: SpinPriority) -> Self {
        self.priority = priority;
        self
    }

    /// Rejects a zero capacity.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.capacity == 0 {
            return Err(ConfigError::ZeroCapacity);
        }
        Ok(())
    }
}
