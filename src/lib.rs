//! ticket_mpmc - Bounded lock-free MPMC queue built on ticket admission
//!
//! Producers and consumers each draw monotonically increasing tickets. A ticket
//! picks the slot to use and the order in which the operation is published, so
//! items are delivered in global FIFO order across all producers while the slot
//! I/O itself runs concurrently. Waiting is done by a prioritized [`Spinner`]
//! instead of OS-level blocking.
//!
//! ```
//! use std::sync::Arc;
//! use std::thread;
//! use ticket_mpmc::Queue;
//!
//! let queue = Arc::new(Queue::new(16));
//! let producer = {
//!     let queue = queue.clone();
//!     thread::spawn(move || {
//!         for i in 0..100 {
//!             queue.push(i).unwrap();
//!         }
//!         queue.close();
//!     })
//! };
//!
//! let received: Vec<_> = queue.incoming().collect();
//! producer.join().unwrap();
//! assert_eq!(received, (0..100).collect::<Vec<_>>());
//! ```
#![warn(missing_docs)]

mod config;
mod error;
mod queue;
mod spinner;
mod sync;
mod ticket;

pub use config::QueueConfig;
pub use error::{ClosedError, ConfigError, TryPushError};
pub use queue::{Incoming, Queue};
pub use spinner::{Park, SpinPriority, Spinner, Step, ThreadPark};
