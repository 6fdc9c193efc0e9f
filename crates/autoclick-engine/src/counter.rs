use tokio::time::Instant;

/// Monotonic click count with the time of the most recent increment.
///
/// The count only changes through [`increment`](Self::increment), [`reset`](Self::reset)
/// and [`restore`](Self::restore).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ClickCounter {
    count: u64,
    last_click_at: Option<Instant>,
}

impl ClickCounter {
    /// A zeroed counter.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one click at `now` and return the new count.
    pub fn increment(&mut self, now: Instant) -> u64 {
        self.count = self.count.saturating_add(1);
        self.last_click_at = Some(now);
        self.count
    }

    /// Zero the count.
    pub fn reset(&mut self) {
        self.count = 0;
        self.last_click_at = None;
    }

    /// Restore a persisted count. `now` stands in for the last click so the
    /// inactivity limit applies from the moment of restoration.
    pub fn restore(&mut self, count: u64, now: Instant) {
        self.count = count;
        self.last_click_at = (count > 0).then_some(now);
    }

    /// Current count.
    pub fn count(&self) -> u64 {
        self.count
    }

    /// Time of the most recent click, if any.
    pub fn last_click_at(&self) -> Option<Instant> {
        self.last_click_at
    }
}
