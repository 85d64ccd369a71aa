use std::time::{Duration, Instant};

/// Suppresses contact bounce: after an accepted edge, further edges within
/// `window` are rejected.
#[derive(Debug, Clone)]
pub struct Debouncer {
    window: Duration,
    last_accepted: Option<Instant>,
}

impl Debouncer {
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            last_accepted: None,
        }
    }

    /// Returns true if an edge observed at `now` should count as a press.
    pub fn accept(&mut self, now: Instant) -> bool {
        match self.last_accepted {
            Some(last) if now.saturating_duration_since(last) < self.window => false,
            _ => {
                self.last_accepted = Some(now);
                true
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bounces_inside_window_are_dropped() {
        let start = Instant::now();
        let mut debouncer = Debouncer::new(Duration::from_millis(300));

        assert!(debouncer.accept(start));
        assert!(!debouncer.accept(start + Duration::from_millis(5)));
        assert!(!debouncer.accept(start + Duration::from_millis(299)));
        assert!(debouncer.accept(start + Duration::from_millis(300)));
    }

    #[test]
    fn rejected_edges_do_not_extend_window() {
        let start = Instant::now();
        let mut debouncer = Debouncer::new(Duration::from_millis(100));

        assert!(debouncer.accept(start));
        assert!(!debouncer.accept(start + Duration::from_millis(90)));
        assert!(debouncer.accept(start + Duration::from_millis(110)));
    }

    #[test]
    fn zero_window_accepts_everything() {
        let start = Instant::now();
        let mut debouncer = Debouncer::new(Duration::ZERO);
        assert!(debouncer.accept(start));
        assert!(debouncer.accept(start));
    }
}
