use std::time::{Duration, Instant};

/// An interval timer that "rings" once its duration has elapsed.
pub struct Timer {
    duration: Duration,
    last: Instant,
}

impl Timer {
    pub fn new(duration: Duration) -> Self {
        Self {
            duration,
            last: Instant::now(),
        }
    }

    /// Returns whether the interval has elapsed since the last reset.
    pub fn ringing(&self) -> bool {
        self.last.elapsed() >= self.duration
    }

    /// Same check against a caller-supplied clock, for deterministic tests.
    pub fn ringing_at(&self, now: Instant) -> bool {
        now.saturating_duration_since(self.last) >= self.duration
    }

    pub fn reset(&mut self) {
        self.last = Instant::now();
    }

    pub fn reset_at(&mut self, now: Instant) {
        self.last = now;
    }
}
