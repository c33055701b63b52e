//! Prioritized backoff for the queue's wait loops.
//!
//! A [`Spinner`] is driven once per failed attempt of a caller's wait loop and
//! escalates through three phases:
//!
//! - **spin**: issue CPU relax hints, doubling up to 64 per attempt
//! - **yield**: give the processor back to the scheduler without sleeping
//! - **sleep**: park the thread for an exponentially growing, capped duration
//!
//! The phase boundaries come from the [`SpinPriority`]. Which step to take is a
//! pure function of the priority and the attempt count ([`Spinner::next_step`]);
//! carrying the step out is delegated to a [`Park`] backend so the progression
//! can be observed without real sleeps.

use core::time::Duration;

use serde::{Deserialize, Serialize};

/// How aggressively a blocked caller burns CPU before backing off.
///
/// Higher priorities spin longer and sleep shorter (lower latency, more CPU);
/// lower priorities escalate to sleeping sooner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SpinPriority {
    /// Never spin; yield once, then sleep.
    None,
    /// Short spin and yield phases.
    Low,
    /// Balanced default.
    #[default]
    Medium,
    /// Long spin and yield phases, microsecond sleeps.
    High,
}

#[derive(Debug, Clone, Copy)]
struct Budget {
    /// Attempts `[0, spin)` spin.
    spin: u32,
    /// Attempts `[spin, yield_until)` yield.
    yield_until: u32,
    sleep_min: Duration,
    sleep_max: Duration,
}

impl SpinPriority {
    const fn budget(self) -> Budget {
        match self {
            SpinPriority::None => Budget {
                spin: 0,
                yield_until: 1,
                sleep_min: Duration::from_millis(1),
                sleep_max: Duration::from_millis(20),
            },
            SpinPriority::Low => Budget {
                spin: 4,
                yield_until: 32,
                sleep_min: Duration::from_micros(100),
                sleep_max: Duration::from_millis(10),
            },
            SpinPriority::Medium => Budget {
                spin: 32,
                yield_until: 256,
                sleep_min: Duration::from_micros(10),
                sleep_max: Duration::from_millis(1),
            },
            SpinPriority::High => Budget {
                spin: 128,
                yield_until: 1024,
                sleep_min: Duration::from_micros(1),
                sleep_max: Duration::from_micros(100),
            },
        }
    }
}

/// One backoff action.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    /// Issue this many CPU relax hints.
    Spin(u32),
    /// Yield the remainder of the time slice.
    Yield,
    /// Sleep for the given duration.
    Sleep(Duration),
}

/// Carries out backoff steps.
pub trait Park {
    /// Busy-wait for `hints` relax hints.
    fn spin(&mut self, hints: u32);
    /// Cooperatively give up the processor.
    fn yield_now(&mut self);
    /// Block the calling thread for `duration`.
    fn sleep(&mut self, duration: Duration);
}

/// [`Park`] backed by the current OS thread.
#[derive(Debug, Clone, Copy, Default)]
pub struct ThreadPark;

#[cfg(not(loom))]
impl Park for ThreadPark {
    #[inline]
    fn spin(&mut self, hints: u32) {
        for _ in 0..hints {
            core::hint::spin_loop();
        }
    }

    #[inline]
    fn yield_now(&mut self) {
        std::thread::yield_now();
    }

    #[inline]
    fn sleep(&mut self, duration: Duration) {
        std::thread::sleep(duration);
    }
}

// loom only makes progress on explicit yields.
#[cfg(loom)]
impl Park for ThreadPark {
    fn spin(&mut self, _hints: u32) {
        loom::thread::yield_now();
    }

    fn yield_now(&mut self) {
        loom::thread::yield_now();
    }

    fn sleep(&mut self, _duration: Duration) {
        loom::thread::yield_now();
    }
}

const MAX_SPIN_SHIFT: u32 = 6;

/// Stateful backoff for a single wait session.
#[derive(Debug, Clone)]
pub struct Spinner<P = ThreadPark> {
    priority: SpinPriority,
    attempts: u32,
    park: P,
}

impl Spinner<ThreadPark> {
    /// Creates a spinner that parks the current thread.
    pub fn new(priority: SpinPriority) -> Self {
        Spinner::with_park(priority, ThreadPark)
    }
}

impl Default for Spinner<ThreadPark> {
    fn default() -> Self {
        Spinner::new(SpinPriority::default())
    }
}

impl<P: Park> Spinner<P> {
    /// Creates a spinner with a custom parking backend.
    pub fn with_park(priority: SpinPriority, park: P) -> Self {
        Spinner { priority, attempts: 0, park }
    }

    /// Priority this spinner was built with.
    pub fn priority(&self) -> SpinPriority {
        self.priority
    }

    /// Failed attempts recorded in the current session.
    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    /// The parking backend.
    pub fn park(&self) -> &P {
        &self.park
    }

    /// Starts a new wait session.
    pub fn reset(&mut self) {
        self.attempts = 0;
    }

    /// The step the next call to [`yield_now`](Self::yield_now) will take.
    pub fn next_step(&self) -> Step {
        let budget = self.priority.budget();
        let n = self.attempts;
        if n < budget.spin {
            Step::Spin(1 << n.min(MAX_SPIN_SHIFT))
        } else if n < budget.yield_until {
            Step::Yield
        } else {
            // Cap the shift well below overflow; the max clamps it anyway.
            let shift = (n - budget.yield_until).min(16);
            let sleep = budget.sleep_min.saturating_mul(1 << shift);
            Step::Sleep(sleep.min(budget.sleep_max))
        }
    }

    /// Records one failed attempt and backs off accordingly.
    #[inline]
    pub fn yield_now(&mut self) {
        match self.next_step() {
            Step::Spin(hints) => self.park.spin(hints),
            Step::Yield => self.park.yield_now(),
            Step::Sleep(duration) => self.park.sleep(duration),
        }
        self.attempts = self.attempts.saturating_add(1);
    }

    /// Backs off until `done` returns true.
    #[inline]
    pub fn wait_until(&mut self, mut done: impl FnMut() -> bool) {
        while !done() {
            self.yield_now();
        }
    }
}
