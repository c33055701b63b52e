//! One direction of the queue's admission protocol.
//!
//! A [`TicketAccess`] hands out strictly increasing tickets (`next`) and retires
//! them strictly in ticket order (`processing`), no matter in which order the
//! work behind each ticket finishes. The queue uses one instance for writers
//! and one for readers.
//!
//! # Ordering
//!
//! `processing` is the publication edge: it is advanced with `Release` after
//! the slot I/O for a ticket, and every observer that acts on the new value
//! loads it with `Acquire`. A reader that sees `write.processing > t` therefore
//! sees the item written for ticket `t`, and a writer that sees
//! `read.processing > t` knows the previous occupant of its slot has been moved
//! out.

use crossbeam_utils::CachePadded;

use crate::spinner::{SpinPriority, Spinner};
use crate::sync::{AtomicU64, Ordering};

pub(crate) struct TicketAccess {
    next: CachePadded<AtomicU64>,
    processing: CachePadded<AtomicU64>,
    capacity: u64,
    priority: SpinPriority,
}

impl TicketAccess {
    pub(crate) fn new(capacity: usize, priority: SpinPriority) -> Self {
        TicketAccess {
            next: CachePadded::new(AtomicU64::new(0)),
            processing: CachePadded::new(AtomicU64::new(0)),
            capacity: capacity as u64,
            priority,
        }
    }

    #[inline]
    fn slot_of(&self, ticket: u64) -> usize {
        (ticket % self.capacity) as usize
    }

    /// Claims the next ticket. Wait-free.
    #[inline]
    pub(crate) fn acquire_ticket(&self) -> (usize, u64) {
        let ticket = self.next.fetch_add(1, Ordering::Relaxed);
        (self.slot_of(ticket), ticket)
    }

    /// Claims the next ticket only if `admit` accepts it.
    ///
    /// Used by the non-blocking operations, which must not hold a ticket they
    /// cannot serve.
    pub(crate) fn try_acquire_ticket(&self, mut admit: impl FnMut(u64) -> bool) -> Option<(usize, u64)> {
        let mut ticket = self.next.load(Ordering::Relaxed);
        loop {
            if !admit(ticket) {
                return None;
            }
            match self
                .next
                .compare_exchange_weak(ticket, ticket + 1, Ordering::Relaxed, Ordering::Relaxed)
            {
                Ok(_) => return Some((self.slot_of(ticket), ticket)),
                Err(current) => ticket = current,
            }
        }
    }

    /// Gives back `ticket` if it is still the most recently issued one.
    pub(crate) fn try_release_ticket(&self, ticket: u64) -> bool {
        self.next
            .compare_exchange(ticket + 1, ticket, Ordering::Relaxed, Ordering::Relaxed)
            .is_ok()
    }

    /// Retires `ticket` once every earlier ticket has been retired.
    #[inline]
    pub(crate) fn mark_done(&self, ticket: u64) {
        let mut spinner = Spinner::new(self.priority);
        spinner.wait_until(|| self.processing.load(Ordering::Acquire) == ticket);
        self.processing.fetch_add(1, Ordering::Release);
    }

    /// Waits until `ticket` has been retired on this side, or `abort` fires.
    ///
    /// Returns `true` if the wait was aborted.
    pub(crate) fn wait_until_ready(&self, ticket: u64, mut abort: impl FnMut() -> bool) -> bool {
        let mut spinner = Spinner::new(self.priority);
        loop {
            if ticket < self.processing.load(Ordering::Acquire) {
                return false;
            }
            if abort() {
                return true;
            }
            spinner.yield_now();
        }
    }

    /// Waits while `ticket` would land on a slot this side has not released yet.
    #[inline]
    pub(crate) fn wait_if_overlapping(&self, ticket: u64) {
        let mut spinner = Spinner::new(self.priority);
        spinner.wait_until(|| !self.is_overlapping(ticket));
    }

    #[inline]
    pub(crate) fn is_overlapping(&self, ticket: u64) -> bool {
        ticket.wrapping_sub(self.processing.load(Ordering::Acquire)) >= self.capacity
    }

    #[inline]
    pub(crate) fn processing(&self) -> u64 {
        self.processing.load(Ordering::Acquire)
    }

    #[inline]
    pub(crate) fn next(&self) -> u64 {
        self.next.load(Ordering::Relaxed)
    }

    /// Rewinds both counters. Requires exclusive access.
    pub(crate) fn rewind(&mut self) {
        #[cfg(not(loom))]
        {
            *self.next.get_mut() = 0;
            *self.processing.get_mut() = 0;
        }
        #[cfg(loom)]
        {
            self.next.store(0, Ordering::Relaxed);
            self.processing.store(0, Ordering::Relaxed);
        }
    }
}
