use std::{collections::VecDeque, time::Duration};

use tokio::time::Instant;

/// Heuristic burst detector over the last `window` inbound messages.
///
/// Fires when the whole window arrived faster than `min_gap * (window - 1)`.
/// Sustained moderate traffic never trips it.
#[derive(Clone, Debug)]
pub struct FloodGuard {
    window: usize,
    min_gap: Duration,
    seen: VecDeque<Instant>,
}

impl FloodGuard {
    pub fn new(window: usize, min_gap: Duration) -> Self {
        let window = window.max(2);
        Self {
            window,
            min_gap,
            seen: VecDeque::with_capacity(window),
        }
    }

    /// Record an inbound message at `now`; returns `true` if it is part of a flood.
    pub fn check(&mut self, now: Instant) -> bool {
        if self.seen.len() == self.window {
            self.seen.pop_front();
        }
        self.seen.push_back(now);

        if self.seen.len() < self.window {
            return false;
        }

        // Sum of consecutive gaps telescopes to newest - oldest.
        let (Some(oldest), Some(newest)) = (self.seen.front(), self.seen.back()) else {
            return false;
        };
        let span = newest.saturating_duration_since(*oldest);
        span < self.min_gap * (self.window as u32 - 1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn three_messages_within_a_second_trip_on_the_third() {
        let mut guard = FloodGuard::new(3, Duration::from_millis(700));
        let t0 = Instant::now();
        assert!(!guard.check(t0));
        assert!(!guard.check(t0 + Duration::from_millis(400)));
        assert!(guard.check(t0 + Duration::from_millis(900)));
    }

    #[test]
    fn messages_a_second_apart_never_trip() {
        let mut guard = FloodGuard::new(3, Duration::from_millis(700));
        let t0 = Instant::now();
        for i in 0..6 {
            assert!(!guard.check(t0 + Duration::from_secs(i)));
        }
    }

    #[test]
    fn window_slides_after_a_burst() {
        let mut guard = FloodGuard::new(3, Duration::from_millis(700));
        let t0 = Instant::now();
        guard.check(t0);
        guard.check(t0 + Duration::from_millis(100));
        assert!(guard.check(t0 + Duration::from_millis(200)));
        // Window is now [100ms, 200ms, 3s]: span 2.9s.
        assert!(!guard.check(t0 + Duration::from_secs(3)));
    }

    #[test]
    fn exact_threshold_is_not_a_flood() {
        let mut guard = FloodGuard::new(3, Duration::from_millis(700));
        let t0 = Instant::now();
        guard.check(t0);
        guard.check(t0 + Duration::from_millis(700));
        assert!(!guard.check(t0 + Duration::from_millis(1400)));
    }
}
