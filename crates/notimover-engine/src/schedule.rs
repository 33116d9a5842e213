//! Pass scheduling: event debouncing and poll throttling.

use std::time::Duration;

use tokio::time::Instant;

/// Leading-edge debouncer with a single trailing fire.
///
/// The first event fires immediately and opens a window. Events inside the
/// window are coalesced into one trailing fire at the window's end, which
/// opens a fresh window.
#[derive(Clone, Debug)]
pub struct Debouncer {
    /// Window length.
    window: Duration,
    /// End of the current window.
    until: Option<Instant>,
    /// An event arrived inside the current window.
    trailing: bool,
}

impl Debouncer {
    /// Create a debouncer with the given window.
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            until: None,
            trailing: false,
        }
    }

    /// Record an event at `now`. Returns true when a pass should run now.
    pub fn on_event(&mut self, now: Instant) -> bool {
        match self.until {
            Some(until) if now < until => {
                self.trailing = true;
                false
            }
            _ => {
                self.until = Some(now + self.window);
                self.trailing = false;
                true
            }
        }
    }

    /// When the trailing pass is due, if one is pending.
    pub fn deadline(&self) -> Option<Instant> {
        if self.trailing { self.until } else { None }
    }

    /// Called when [`deadline`](Self::deadline) elapses. Returns true when the
    /// trailing pass should run.
    pub fn on_deadline(&mut self, now: Instant) -> bool {
        match self.until {
            Some(until) if self.trailing && now >= until => {
                self.trailing = false;
                self.until = Some(now + self.window);
                true
            }
            _ => false,
        }
    }

    /// Drop any pending trailing pass.
    pub fn reset(&mut self) {
        self.until = None;
        self.trailing = false;
    }
}

/// Minimum spacing between passes.
#[derive(Clone, Debug)]
pub struct Throttle {
    /// Minimum spacing.
    min: Duration,
    /// Time of the last pass.
    last: Option<Instant>,
}

impl Throttle {
    /// Create a throttle with minimum spacing `min`.
    pub fn new(min: Duration) -> Self {
        Self { min, last: None }
    }

    /// True when a throttled pass may run at `now`.
    pub fn ready(&self, now: Instant) -> bool {
        self.last.is_none_or(|last| now.duration_since(last) >= self.min)
    }

    /// Record that a pass ran at `now`.
    pub fn note(&mut self, now: Instant) {
        self.last = Some(now);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MS: Duration = Duration::from_millis(1);

    #[test]
    fn burst_yields_leading_and_one_trailing() {
        let t0 = Instant::now();
        let mut d = Debouncer::new(500 * MS);
        assert!(d.on_event(t0));
        assert!(!d.on_event(t0 + 10 * MS));
        assert!(!d.on_event(t0 + 200 * MS));
        assert!(!d.on_event(t0 + 499 * MS));
        assert_eq!(d.deadline(), Some(t0 + 500 * MS));
        assert!(!d.on_deadline(t0 + 400 * MS));
        assert!(d.on_deadline(t0 + 500 * MS));
        assert_eq!(d.deadline(), None);
        assert!(!d.on_deadline(t0 + 600 * MS));
    }

    #[test]
    fn quiet_event_fires_immediately() {
        let t0 = Instant::now();
        let mut d = Debouncer::new(500 * MS);
        assert!(d.on_event(t0));
        assert_eq!(d.deadline(), None);
        assert!(d.on_event(t0 + 600 * MS));
    }

    #[test]
    fn throttle_spaces_passes() {
        let t0 = Instant::now();
        let mut t = Throttle::new(200 * MS);
        assert!(t.ready(t0));
        t.note(t0);
        assert!(!t.ready(t0 + 150 * MS));
        assert!(t.ready(t0 + 200 * MS));
    }
}
