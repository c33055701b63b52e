use core::mem::MaybeUninit;
use std::time::{Duration, Instant};

use crossbeam_utils::CachePadded;
use tracing::{debug, trace};

use crate::config::QueueConfig;
use crate::error::{ClosedError, ConfigError, TryPushError};
use crate::spinner::{SpinPriority, Spinner};
use crate::sync::{AtomicBool, Ordering, UnsafeCell};
use crate::ticket::TicketAccess;

/// Bounded multi-producer multi-consumer FIFO queue.
///
/// Writers and readers each draw tickets from their own [`TicketAccess`]; the
/// ticket selects the slot (`ticket % capacity`) and the order in which the
/// operation becomes visible to the other side. Items leave the queue in the
/// exact order their write tickets were issued, across all producers.
///
/// A full queue blocks [`push`](Self::push); an empty open queue blocks
/// [`pop`](Self::pop). Once [`close`](Self::close)d, pushes are rejected and
/// pops return `None` as soon as the remaining items are drained.
pub struct Queue<T> {
    slots: Box<[UnsafeCell<MaybeUninit<T>>]>,
    write: TicketAccess,
    read: TicketAccess,
    closed: CachePadded<AtomicBool>,
    priority: SpinPriority,
}

// SAFETY: a slot is only touched by the holder of the write ticket that maps to
// it (after the previous reader released it) or by the holder of the matching
// read ticket (after the writer published it). Items move between threads, so
// `T: Send` is sufficient.
unsafe impl<T: Send> Send for Queue<T> {}
unsafe impl<T: Send> Sync for Queue<T> {}

impl<T> Queue<T> {
    /// Creates a queue with [`SpinPriority::Medium`] backoff.
    ///
    /// # Panics
    ///
    /// Panics if `capacity` is 0.
    pub fn new(capacity: usize) -> Self {
        Queue::with_priority(capacity, SpinPriority::default())
    }

    /// Creates a queue whose blocking calls back off with `priority`.
    ///
    /// # Panics
    ///
    /// Panics if `capacity` is 0.
    pub fn with_priority(capacity: usize, priority: SpinPriority) -> Self {
        assert!(capacity > 0, "capacity must be greater than 0");

        let slots = (0..capacity)
            .map(|_| UnsafeCell::new(MaybeUninit::uninit()))
            .collect();

        Queue {
            slots,
            write: TicketAccess::new(capacity, priority),
            read: TicketAccess::new(capacity, priority),
            closed: CachePadded::new(AtomicBool::new(false)),
            priority,
        }
    }

    /// Creates a queue from a validated [`QueueConfig`].
    pub fn from_config(config: &QueueConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Queue::with_priority(config.capacity, config.priority))
    }

    /// Appends `item`, blocking while the queue is full.
    ///
    /// The closed check happens once on entry: a push admitted before a
    /// concurrent [`close`](Self::close) still completes.
    pub fn push(&self, item: T) -> Result<(), ClosedError<T>> {
        if self.is_closed() {
            return Err(ClosedError(item));
        }

        let (slot, ticket) = self.write.acquire_ticket();
        self.read.wait_if_overlapping(ticket);

        // SAFETY: the reader of `ticket - capacity` has retired, and no other
        // writer holds a ticket mapping to this slot.
        unsafe { self.store(slot, item) };
        self.write.mark_done(ticket);
        Ok(())
    }

    /// Removes the oldest item, blocking while the queue is empty and open.
    ///
    /// Returns `None` once the queue is drained.
    pub fn pop(&self) -> Option<T> {
        if self.is_drained() {
            return None;
        }

        let (slot, ticket) = self.read.acquire_ticket();
        let mut spinner = Spinner::new(self.priority);
        while self.write.wait_until_ready(ticket, || self.is_drained()) {
            // Hand the ticket back so it can be reissued after a reopen. Only
            // the newest ticket can go; older holders wait for newer ones to
            // either roll back or receive data.
            if self.read.try_release_ticket(ticket) {
                trace!(ticket, "pop abandoned ticket on drained queue");
                return None;
            }
            spinner.yield_now();
        }

        // SAFETY: `write.processing > ticket`, so the item is published, and
        // this ticket is the only reader mapped to the slot.
        let item = unsafe { self.take(slot) };
        self.read.mark_done(ticket);
        Some(item)
    }

    /// Appends `item` only if a slot is free right now.
    pub fn try_push(&self, item: T) -> Result<(), TryPushError<T>> {
        if self.is_closed() {
            return Err(TryPushError::Closed(item));
        }

        match self.write.try_acquire_ticket(|ticket| !self.read.is_overlapping(ticket)) {
            Some((slot, ticket)) => {
                // SAFETY: admission proved the slot's previous reader retired.
                unsafe { self.store(slot, item) };
                self.write.mark_done(ticket);
                Ok(())
            }
            None => Err(TryPushError::Full(item)),
        }
    }

    /// Removes the oldest item only if one is already published.
    pub fn try_pop(&self) -> Option<T> {
        let (slot, ticket) = self
            .read
            .try_acquire_ticket(|ticket| ticket < self.write.processing())?;

        // SAFETY: admission proved the item for `ticket` is published.
        let item = unsafe { self.take(slot) };
        self.read.mark_done(ticket);
        Some(item)
    }

    /// Like [`push`](Self::push), but gives up after `timeout`.
    pub fn push_timeout(&self, item: T, timeout: Duration) -> Result<(), TryPushError<T>> {
        let deadline = Instant::now().checked_add(timeout);
        let mut spinner = Spinner::new(self.priority);
        let mut item = item;
        loop {
            match self.try_push(item) {
                Err(TryPushError::Full(rejected)) if !expired(deadline) => {
                    item = rejected;
                    spinner.yield_now();
                }
                result => return result,
            }
        }
    }

    /// Like [`pop`](Self::pop), but gives up after `timeout`.
    pub fn pop_timeout(&self, timeout: Duration) -> Option<T> {
        let deadline = Instant::now().checked_add(timeout);
        let mut spinner = Spinner::new(self.priority);
        loop {
            if let Some(item) = self.try_pop() {
                return Some(item);
            }
            if self.is_drained() || expired(deadline) {
                return None;
            }
            spinner.yield_now();
        }
    }

    /// Blocking iterator that pops until the queue is drained.
    pub fn incoming(&self) -> Incoming<'_, T> {
        Incoming { queue: self }
    }

    /// Rejects all future pushes and lets blocked pops observe the drained
    /// state. Pushes already waiting for capacity are not released.
    pub fn close(&self) {
        self.closed.store(true, Ordering::Release);
        debug!(
            written = self.write.processing(),
            read = self.read.processing(),
            "queue closed"
        );
    }

    /// Admits pushes again. Ticket counters keep counting from where they are.
    pub fn reopen(&self) {
        self.closed.store(false, Ordering::Release);
        debug!(
            written = self.write.processing(),
            read = self.read.processing(),
            "queue reopened"
        );
    }

    /// Drops any unread items, rewinds all ticket counters to zero and reopens
    /// the queue.
    pub fn reset(&mut self) {
        let dropped = self.drop_pending();
        self.write.rewind();
        self.read.rewind();
        self.closed.store(false, Ordering::Release);
        debug!(dropped, "queue reset");
    }

    /// Whether [`close`](Self::close) has been called since the last reopen.
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    /// Whether every published item has been read.
    ///
    /// Only stable once the queue is closed.
    pub fn is_empty(&self) -> bool {
        self.write.processing() == self.read.processing()
    }

    /// Closed and empty; pops return `None` without blocking.
    pub fn is_drained(&self) -> bool {
        self.is_closed() && self.is_empty()
    }

    /// Snapshot of published, unread items.
    pub fn len(&self) -> usize {
        let written = self.write.processing();
        let read = self.read.processing();
        written.saturating_sub(read) as usize
    }

    /// Number of slots.
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Backoff priority of blocking calls.
    pub fn priority(&self) -> SpinPriority {
        self.priority
    }

    /// # Safety
    ///
    /// Caller must hold the write ticket for `slot`, and the slot must be empty.
    #[inline]
    unsafe fn store(&self, slot: usize, item: T) {
        self.slots[slot].with_mut(|cell| unsafe {
            (*cell).write(item);
        });
    }

    /// # Safety
    ///
    /// Caller must hold the read ticket for `slot`, and the slot must be full.
    #[inline]
    unsafe fn take(&self, slot: usize) -> T {
        self.slots[slot].with_mut(|cell| unsafe { (*cell).assume_init_read() })
    }

    fn drop_pending(&mut self) -> u64 {
        let start = self.read.processing();
        let end = self.write.processing();
        let capacity = self.slots.len() as u64;
        for ticket in start..end {
            let slot = (ticket % capacity) as usize;
            self.slots[slot].with_mut(|cell| unsafe { (*cell).assume_init_drop() });
        }
        end - start
    }
}

impl<T> Drop for Queue<T> {
    fn drop(&mut self) {
        self.drop_pending();
    }
}

impl<T> core::fmt::Debug for Queue<T> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Queue")
            .field("capacity", &self.capacity())
            .field("len", &self.len())
            .field("closed", &self.is_closed())
            .field("write_next", &self.write.next())
            .field("read_next", &self.read.next())
            .finish()
    }
}

fn expired(deadline: Option<Instant>) -> bool {
    deadline.is_some_and(|deadline| Instant::now() >= deadline)
}

/// Iterator returned by [`Queue::incoming`].
#[derive(Debug)]
pub struct Incoming<'a, T> {
    queue: &'a Queue<T>,
}

impl<T> Iterator for Incoming<'_, T> {
    type Item = T;

    fn next(&mut self) -> Option<T> {
        self.queue.pop()
    }
}
