use std::time::{Duration, Instant};

/// Enforces the per-connection bytes-per-second budget over a rolling
/// one-second window.
pub struct BandwidthMonitor {
    limit_bytes_per_second: usize,
    window_start: Instant,
    bytes_this_second: usize,
    total_bytes: u64,
}

impl BandwidthMonitor {
    /// A limit of 0 means unlimited.
    pub fn new(limit_bytes_per_second: usize) -> Self {
        Self {
            limit_bytes_per_second,
            window_start: Instant::now(),
            bytes_this_second: 0,
            total_bytes: 0,
        }
    }

    pub fn set_limit(&mut self, limit_bytes_per_second: usize) {
        self.limit_bytes_per_second = limit_bytes_per_second;
    }

    pub fn limit(&self) -> usize {
        self.limit_bytes_per_second
    }

    fn roll_window(&mut self, now: Instant) {
        if now.saturating_duration_since(self.window_start) >= Duration::from_secs(1) {
            self.window_start = now;
            self.bytes_this_second = 0;
        }
    }

    /// Whether the current window's budget is spent.
    pub fn exhausted(&mut self, now: Instant) -> bool {
        self.roll_window(now);
        self.limit_bytes_per_second != 0 && self.bytes_this_second >= self.limit_bytes_per_second
    }

    pub fn record_sent(&mut self, bytes: usize, now: Instant) {
        self.roll_window(now);
        self.bytes_this_second += bytes;
        self.total_bytes += bytes as u64;
    }

    pub fn bytes_this_second(&self) -> usize {
        self.bytes_this_second
    }

    pub fn total_bytes(&self) -> u64 {
        self.total_bytes
    }
}
