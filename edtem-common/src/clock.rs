use std::{
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc,
    },
    time::{Duration, Instant},
};

/// A source of monotonic nanosecond timestamps.
///
/// Every departure timestamp handled by the hook lives in the domain of one clock, so the same
/// clock must be used by everything that compares them.
pub trait Clock: Send + Sync {
    /// Returns the current time in nanoseconds. Successive calls never go backwards.
    fn now_ns(&self) -> u64;
}

impl<C: Clock + ?Sized> Clock for Arc<C> {
    #[inline]
    fn now_ns(&self) -> u64 {
        (**self).now_ns()
    }
}

impl<C: Clock + ?Sized> Clock for &C {
    #[inline]
    fn now_ns(&self) -> u64 {
        (**self).now_ns()
    }
}

/// Monotonic clock anchored to the wall clock at construction.
///
/// Readings start at the UNIX time of creation and then advance with [`Instant`], so they are
/// non-zero and never jump when the system time is adjusted.
#[derive(Debug, Clone, Copy)]
pub struct MonotonicClock {
    origin: Instant,
    base_ns: u64,
}

impl MonotonicClock {
    /// Creates a clock anchored at the current wall-clock time.
    pub fn new() -> Self {
        Self { origin: Instant::now(), base_ns: crate::unix_nanos() }
    }
}

impl Default for MonotonicClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for MonotonicClock {
    #[inline]
    fn now_ns(&self) -> u64 {
        self.base_ns.saturating_add(self.origin.elapsed().as_nanos() as u64)
    }
}

/// A clock that only moves when told to. Used to drive the pacer deterministically in
/// simulations and tests.
#[derive(Debug, Default)]
pub struct ManualClock {
    now: AtomicU64,
}

impl ManualClock {
    /// Creates a clock reading `start_ns`.
    pub fn new(start_ns: u64) -> Self {
        Self { now: AtomicU64::new(start_ns) }
    }

    /// Moves the clock forward by `by`, saturating at `u64::MAX`.
    pub fn advance(&self, by: Duration) {
        let by = u64::try_from(by.as_nanos()).unwrap_or(u64::MAX);
        let _ = self
            .now
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |now| Some(now.saturating_add(by)));
    }

    /// Moves the clock to `ns`. Earlier values are ignored so the clock stays monotonic.
    pub fn set(&self, ns: u64) {
        self.now.fetch_max(ns, Ordering::AcqRel);
    }
}

impl Clock for ManualClock {
    #[inline]
    fn now_ns(&self) -> u64 {
        self.now.load(Ordering::Acquire)
    }
}
