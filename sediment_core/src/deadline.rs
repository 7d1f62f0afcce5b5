// Copyright 2026 the Sediment Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Slice budgets handed to the work loop.
//!
//! The host scheduling primitive (an idle callback, a frame callback, a test
//! harness) invokes [`Scheduler::run_slice`] with a [`Deadline`]. Once the
//! guaranteed minimum of units has run, the scheduler asks the deadline how
//! much time is left before each further unit of work and yields when the
//! answer drops below [`SchedulerConfig::yield_threshold`].
//!
//! [`Scheduler::run_slice`]: crate::scheduler::Scheduler::run_slice
//! [`SchedulerConfig::yield_threshold`]: crate::scheduler::SchedulerConfig::yield_threshold

use core::cell::Cell;

use crate::time::{Duration, HostTime};

/// The time budget of one work slice.
pub trait Deadline {
    /// Returns the time left in this slice.
    fn time_remaining(&self) -> Duration;

    /// Returns the current host time, used for trace timestamps.
    ///
    /// Deadlines without a clock report zero.
    fn now(&self) -> HostTime {
        HostTime(0)
    }
}

/// A budget that never runs out. The slice runs until the generation commits.
#[derive(Clone, Copy, Debug, Default)]
pub struct Unbounded;

impl Deadline for Unbounded {
    #[inline]
    fn time_remaining(&self) -> Duration {
        Duration::MAX
    }
}

/// A deterministic budget measured in units of work instead of time.
///
/// Each query of [`time_remaining`](Deadline::time_remaining) spends one step.
/// While steps remain the budget reports [`Duration::MAX`], then
/// [`Duration::ZERO`]. With [`SchedulerConfig::headless`] (no guaranteed
/// units), `Steps::new(n)` therefore lets exactly `n` fibers be processed in
/// the slice.
///
/// [`SchedulerConfig::headless`]: crate::scheduler::SchedulerConfig::headless
#[derive(Debug)]
pub struct Steps {
    remaining: Cell<u32>,
    clock: Cell<u64>,
}

impl Steps {
    /// Creates a budget of `n` steps.
    #[must_use]
    pub fn new(n: u32) -> Self {
        Self {
            remaining: Cell::new(n),
            clock: Cell::new(0),
        }
    }

    /// Returns the number of unspent steps.
    #[must_use]
    pub fn remaining(&self) -> u32 {
        self.remaining.get()
    }
}

impl Deadline for Steps {
    fn time_remaining(&self) -> Duration {
        // Every query advances the fake clock so traces show monotonic time.
        self.clock.set(self.clock.get() + 1);
        match self.remaining.get() {
            0 => Duration::ZERO,
            n => {
                self.remaining.set(n - 1);
                Duration::MAX
            }
        }
    }

    fn now(&self) -> HostTime {
        HostTime(self.clock.get())
    }
}

/// A wall-clock budget measured with [`std::time::Instant`], in microsecond
/// ticks relative to a caller-supplied epoch.
#[cfg(feature = "std")]
#[derive(Clone, Copy, Debug)]
pub struct WallClock {
    epoch: std::time::Instant,
    end: std::time::Instant,
}

#[cfg(feature = "std")]
impl WallClock {
    /// Creates a deadline that expires `budget` microseconds from now.
    ///
    /// Timestamps reported by [`now`](Deadline::now) count from `epoch`.
    #[must_use]
    pub fn new(epoch: std::time::Instant, budget: Duration) -> Self {
        let end = std::time::Instant::now() + std::time::Duration::from_micros(budget.ticks());
        Self { epoch, end }
    }
}

#[cfg(feature = "std")]
impl Deadline for WallClock {
    fn time_remaining(&self) -> Duration {
        let left = self.end.saturating_duration_since(std::time::Instant::now());
        Duration(u64::try_from(left.as_micros()).unwrap_or(u64::MAX))
    }

    fn now(&self) -> HostTime {
        let since = std::time::Instant::now().saturating_duration_since(self.epoch);
        HostTime(u64::try_from(since.as_micros()).unwrap_or(u64::MAX))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unbounded_never_runs_out() {
        let d = Unbounded;
        for _ in 0..1000 {
            assert_eq!(d.time_remaining(), Duration::MAX, "unbounded budget");
        }
        assert_eq!(d.now(), HostTime(0), "no clock");
    }

    #[test]
    fn steps_spend_one_per_query() {
        let d = Steps::new(2);
        assert_eq!(d.time_remaining(), Duration::MAX, "first step");
        assert_eq!(d.time_remaining(), Duration::MAX, "second step");
        assert_eq!(d.time_remaining(), Duration::ZERO, "exhausted");
        assert_eq!(d.time_remaining(), Duration::ZERO, "stays exhausted");
        assert_eq!(d.remaining(), 0, "nothing left");
    }

    #[test]
    fn steps_clock_is_monotonic() {
        let d = Steps::new(1);
        let before = d.now();
        let _ = d.time_remaining();
        let _ = d.time_remaining();
        assert!(d.now() > before, "clock advances per query");
    }

    #[cfg(feature = "std")]
    #[test]
    fn wall_clock_counts_down() {
        let epoch = std::time::Instant::now();
        let d = WallClock::new(epoch, Duration(60_000_000));
        assert!(d.time_remaining() > Duration::ZERO, "fresh budget");
        let expired = WallClock::new(epoch, Duration::ZERO);
        assert_eq!(expired.time_remaining(), Duration::ZERO, "empty budget");
    }
}
