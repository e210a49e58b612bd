//! Drift-corrected pacing.
//!
//! The clock accumulates wall time between polls and releases one advance per
//! elapsed frame interval. Late polls leave debt behind, so the next advance
//! comes early and the average rate holds. Debt beyond `max_debt_intervals`
//! is dropped (resync) instead of being paid back in a burst.
//!
//! A clock only measures play time. The player drops it on pause and builds
//! a fresh one on resume, so paused wall time never turns into debt.

use std::time::{Duration, Instant};
use tracing::trace;

/// Result of one poll.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClockSignal {
    /// One frame interval has elapsed: show the next tick.
    Advance,
    /// Keep showing the current frame.
    Wait,
}

#[derive(Debug, Clone)]
pub struct PlaybackClock {
    interval: Duration,
    accumulated: Duration,
    started_at: Instant,
    last_poll: Instant,
    max_debt_intervals: u32,
    advances: u64,
    resyncs: u64,
}

impl PlaybackClock {
    /// Clock ticking at `fps`, starting at `now`.
    pub fn new(fps: u32, now: Instant) -> Self {
        Self {
            interval: Duration::from_nanos(1_000_000_000 / fps.max(1) as u64),
            accumulated: Duration::ZERO,
            started_at: now,
            last_poll: now,
            max_debt_intervals: 3,
            advances: 0,
            resyncs: 0,
        }
    }

    pub fn with_max_debt(mut self, intervals: u32) -> Self {
        self.max_debt_intervals = intervals;
        self
    }

    /// Let the very next poll advance, so the first frame shows without
    /// waiting a full interval.
    pub fn prime(&mut self) {
        self.accumulated = self.accumulated.max(self.interval);
    }

    #[inline]
    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Fold the time since the last poll into the debt and decide.
    pub fn poll(&mut self, now: Instant) -> ClockSignal {
        // Instants from the caller may arrive out of order; never go back
        let delta = now.saturating_duration_since(self.last_poll);
        self.last_poll = self.last_poll.max(now);
        self.accumulated += delta;

        if self.accumulated < self.interval {
            return ClockSignal::Wait;
        }

        self.accumulated -= self.interval;
        self.advances += 1;

        let max_debt = self.interval * self.max_debt_intervals;
        if self.accumulated > max_debt {
            let dropped = self.accumulated.as_nanos() / self.interval.as_nanos().max(1);
            // Keep the sub-interval phase, drop whole intervals
            self.accumulated = Duration::from_nanos(
                (self.accumulated.as_nanos() % self.interval.as_nanos().max(1)) as u64,
            );
            self.resyncs += 1;
            trace!("Clock resync: dropped {} intervals of debt", dropped);
        }

        ClockSignal::Advance
    }

    /// How long the caller may sleep before the next advance is due.
    pub fn time_until_advance(&self, now: Instant) -> Duration {
        let pending = self.accumulated + now.saturating_duration_since(self.last_poll);
        self.interval.saturating_sub(pending)
    }

    /// Play time observed up to the last poll.
    pub fn elapsed(&self) -> Duration {
        self.last_poll.saturating_duration_since(self.started_at)
    }

    /// Play time up to `now`.
    pub fn elapsed_at(&self, now: Instant) -> Duration {
        now.max(self.last_poll).saturating_duration_since(self.started_at)
    }

    /// Debt carried into the next poll.
    pub fn debt(&self) -> Duration {
        self.accumulated
    }

    pub fn advances(&self) -> u64 {
        self.advances
    }

    pub fn resyncs(&self) -> u64 {
        self.resyncs
    }
}
