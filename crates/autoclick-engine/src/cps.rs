//! Clicks-per-second measurement with an inactivity watchdog.
//!
//! [`CpsTracker`] is a pure state machine driven by explicit instants. It owns
//! two deadlines: the next periodic sample and the inactivity limit measured
//! from the most recent click. [`CpsTracker::due_at`] exposes the earlier of
//! the two so a single timer can drive both.

use std::time::Duration;

use tokio::time::Instant;

/// Quiet period after which the counter and rate are reset.
pub const INACTIVITY_LIMIT: Duration = Duration::from_millis(5_000);
/// How often the rate is recomputed while tracking.
pub const SAMPLE_PERIOD: Duration = Duration::from_secs(1);

/// Whether a measurement window is open.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CpsPhase {
    /// No window; the rate reads zero.
    Stopped,
    /// A window opened at the first click after a stop.
    Tracking,
}

/// Outcome of [`CpsTracker::poll`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CpsPoll {
    /// Nothing was due.
    Idle,
    /// A new rate was computed.
    Sample(f64),
    /// The inactivity limit elapsed; the caller must zero the counter.
    Inactive,
}

/// Average rate over a window: zero when nothing was counted or no time has passed.
pub fn clicks_per_second(count: u64, elapsed: Duration) -> f64 {
    let secs = elapsed.as_secs_f64();
    if count == 0 || secs <= 0.0 {
        0.0
    } else {
        count as f64 / secs
    }
}

/// Sampling and inactivity state for the click counter.
#[derive(Debug, Clone)]
pub struct CpsTracker {
    /// Quiet period before an inactivity reset.
    limit: Duration,
    /// Sampling cadence.
    period: Duration,
    /// Start of the current window while tracking.
    window_start: Option<Instant>,
    /// Next sample deadline while tracking.
    next_sample: Option<Instant>,
    /// Inactivity deadline; armed by clicks, independent of the window.
    inactive_at: Option<Instant>,
    /// Last computed rate.
    current: f64,
}

impl Default for CpsTracker {
    fn default() -> Self {
        Self::new(INACTIVITY_LIMIT, SAMPLE_PERIOD)
    }
}

impl CpsTracker {
    /// Tracker with a custom inactivity limit and sampling period.
    pub fn new(limit: Duration, period: Duration) -> Self {
        Self {
            limit,
            period,
            window_start: None,
            next_sample: None,
            inactive_at: None,
            current: 0.0,
        }
    }

    /// Current phase.
    pub fn phase(&self) -> CpsPhase {
        if self.window_start.is_some() {
            CpsPhase::Tracking
        } else {
            CpsPhase::Stopped
        }
    }

    /// Most recent rate; zero while stopped.
    pub fn current(&self) -> f64 {
        self.current
    }

    /// Start of the open window, if any.
    pub fn window_start(&self) -> Option<Instant> {
        self.window_start
    }

    /// Inactivity deadline, if armed.
    pub fn inactive_at(&self) -> Option<Instant> {
        self.inactive_at
    }

    /// Record a click at `now`; `previous` is the count before it.
    ///
    /// Re-arms the inactivity deadline. A window opens only for the first
    /// click after the counter was zero; clicks after [`Self::end_window`]
    /// leave the rate at zero until the counter resets. Returns true when a
    /// new window was opened.
    pub fn on_click(&mut self, previous: u64, now: Instant) -> bool {
        self.inactive_at = Some(now + self.limit);
        if previous != 0 || self.window_start.is_some() {
            return false;
        }
        self.open_window(now);
        true
    }

    /// Open a window at `now` and arm the inactivity deadline, regardless of
    /// the count. Used when a persisted count is restored.
    pub fn resume(&mut self, now: Instant) {
        self.inactive_at = Some(now + self.limit);
        self.open_window(now);
    }

    /// Start a window at `now` with a fresh sample deadline.
    fn open_window(&mut self, now: Instant) {
        self.window_start = Some(now);
        self.next_sample = Some(now + self.period);
        self.current = 0.0;
    }

    /// Earliest pending deadline.
    pub fn due_at(&self) -> Option<Instant> {
        match (self.next_sample, self.inactive_at) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        }
    }

    /// Process whatever is due at `now` given the counter value `count`.
    ///
    /// Inactivity takes precedence over sampling. Missed sample slots are
    /// skipped rather than replayed.
    pub fn poll(&mut self, count: u64, now: Instant) -> CpsPoll {
        if self.inactive_at.is_some_and(|at| at <= now) {
            self.reset();
            return CpsPoll::Inactive;
        }
        let (Some(start), Some(next)) = (self.window_start, self.next_sample) else {
            return CpsPoll::Idle;
        };
        if next > now {
            return CpsPoll::Idle;
        }
        let mut following = next + self.period;
        while following <= now {
            following += self.period;
        }
        self.next_sample = Some(following);
        self.current = clicks_per_second(count, now.saturating_duration_since(start));
        CpsPoll::Sample(self.current)
    }

    /// Close the window and disarm the inactivity deadline.
    pub fn reset(&mut self) {
        self.end_window();
        self.inactive_at = None;
    }

    /// Close the window but keep the inactivity deadline armed.
    pub fn end_window(&mut self) {
        self.window_start = None;
        self.next_sample = None;
        self.current = 0.0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ms(n: u64) -> Duration {
        Duration::from_millis(n)
    }

    #[test]
    fn rate_guards_zero_elapsed() {
        assert_eq!(clicks_per_second(10, Duration::ZERO), 0.0);
        assert_eq!(clicks_per_second(0, ms(1_000)), 0.0);
        assert_eq!(clicks_per_second(10, ms(2_000)), 5.0);
    }

    #[test]
    fn first_click_opens_window() {
        let t0 = Instant::now();
        let mut cps = CpsTracker::default();
        assert_eq!(cps.phase(), CpsPhase::Stopped);
        assert!(cps.on_click(0, t0));
        assert!(!cps.on_click(1, t0 + ms(10)));
        assert_eq!(cps.window_start(), Some(t0));
        assert_eq!(cps.due_at(), Some(t0 + ms(1_000)));
    }

    #[test]
    fn samples_each_period() {
        let t0 = Instant::now();
        let mut cps = CpsTracker::default();
        cps.on_click(0, t0);
        assert_eq!(cps.poll(10, t0 + ms(999)), CpsPoll::Idle);
        assert_eq!(cps.poll(10, t0 + ms(1_000)), CpsPoll::Sample(10.0));
        assert_eq!(cps.poll(10, t0 + ms(2_000)), CpsPoll::Sample(5.0));
        assert_eq!(cps.current(), 5.0);
    }

    #[test]
    fn missed_samples_are_skipped() {
        let t0 = Instant::now();
        let mut cps = CpsTracker::new(ms(60_000), ms(1_000));
        cps.on_click(0, t0);
        assert_eq!(cps.poll(30, t0 + ms(3_500)), CpsPoll::Sample(30.0 / 3.5));
        assert_eq!(cps.due_at(), Some(t0 + ms(4_000)));
    }

    #[test]
    fn inactivity_is_measured_from_last_click() {
        let t0 = Instant::now();
        let mut cps = CpsTracker::default();
        cps.on_click(0, t0);
        cps.on_click(1, t0 + ms(3_000));
        assert_ne!(cps.poll(2, t0 + ms(5_000)), CpsPoll::Inactive);
        assert_eq!(cps.poll(2, t0 + ms(8_000)), CpsPoll::Inactive);
        assert_eq!(cps.phase(), CpsPhase::Stopped);
        assert_eq!(cps.current(), 0.0);
        assert_eq!(cps.due_at(), None);
    }

    #[test]
    fn end_window_keeps_watchdog() {
        let t0 = Instant::now();
        let mut cps = CpsTracker::default();
        cps.on_click(0, t0);
        cps.end_window();
        assert_eq!(cps.phase(), CpsPhase::Stopped);
        assert_eq!(cps.due_at(), Some(t0 + INACTIVITY_LIMIT));
        assert_eq!(cps.poll(1, t0 + INACTIVITY_LIMIT), CpsPoll::Inactive);
    }

    #[test]
    fn click_after_ended_window_keeps_rate_at_zero() {
        let t0 = Instant::now();
        let mut cps = CpsTracker::default();
        cps.on_click(0, t0);
        assert_eq!(cps.poll(200, t0 + ms(2_000)), CpsPoll::Sample(100.0));
        cps.end_window();

        assert!(!cps.on_click(200, t0 + ms(2_100)));
        assert_eq!(cps.phase(), CpsPhase::Stopped);
        assert_eq!(cps.poll(201, t0 + ms(3_101)), CpsPoll::Idle);
        assert_eq!(cps.current(), 0.0);
        assert_eq!(cps.due_at(), Some(t0 + ms(2_100) + INACTIVITY_LIMIT));

        cps.reset();
        assert!(cps.on_click(0, t0 + ms(4_000)));
    }
}
