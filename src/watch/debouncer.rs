use std::time::{Duration, Instant};

/// Quiet period a file must observe before it is reloaded.
pub(super) const DEBOUNCE: Duration = Duration::from_millis(100);
/// Minimum gap between the end of one reload and the start of the next.
pub(super) const RELOAD_COOLDOWN: Duration = Duration::from_millis(100);
/// Longest a change may stay pending while events keep arriving.
pub(super) const MAX_WAIT: Duration = Duration::from_secs(1);

/// Pure debouncer for one file: timing only, no I/O.
///
/// Trailing edge: a burst collapses into one reload once it settles.
/// A file that never goes quiet still reloads every [`MAX_WAIT`].
/// Events arriving during the cooldown are held, not lost.
#[derive(Debug, Default)]
pub(super) struct Debouncer {
    /// First event of the pending change
    pub(super) first_event: Option<Instant>,
    pub(super) last_event: Option<Instant>,
    pub(super) last_reload: Option<Instant>,
}

impl Debouncer {
    pub(super) fn new() -> Self {
        Self::default()
    }

    /// Record a relevant raw event.
    pub(super) fn record(&mut self) {
        let now = Instant::now();
        self.first_event.get_or_insert(now);
        self.last_event = Some(now);
    }

    pub(super) fn is_pending(&self) -> bool {
        self.last_event.is_some()
    }

    pub(super) fn is_ready(&self) -> bool {
        let Some(last_event) = self.last_event else {
            return false;
        };

        let overdue = self.first_event.is_some_and(|t| t.elapsed() >= MAX_WAIT);
        if last_event.elapsed() < DEBOUNCE && !overdue {
            return false;
        }

        if let Some(last_reload) = self.last_reload
            && last_reload.elapsed() < RELOAD_COOLDOWN
        {
            return false;
        }

        true
    }

    /// Consume the pending change if debounce + cooldown elapsed.
    pub(super) fn take_if_ready(&mut self) -> bool {
        if !self.is_ready() {
            return false;
        }
        self.first_event = None;
        self.last_event = None;
        true
    }

    /// Mark a reload as finished; starts the cooldown.
    pub(super) fn reloaded(&mut self) {
        self.last_reload = Some(Instant::now());
    }

    /// Precise sleep duration until next possible ready time.
    pub(super) fn sleep_duration(&self) -> Duration {
        let Some(last_event) = self.last_event else {
            return Duration::from_secs(86400);
        };

        let debounce_remaining = DEBOUNCE.saturating_sub(last_event.elapsed());
        let settle_remaining = match self.first_event {
            Some(first) => debounce_remaining.min(MAX_WAIT.saturating_sub(first.elapsed())),
            None => debounce_remaining,
        };

        let cooldown_remaining = self
            .last_reload
            .map(|t| RELOAD_COOLDOWN.saturating_sub(t.elapsed()))
            .unwrap_or(Duration::ZERO);

        settle_remaining
            .max(cooldown_remaining)
            .max(Duration::from_millis(1))
    }
}
