use std::collections::VecDeque;
use std::time::Duration;

use crate::constants::{MIN_RESEND_TIMEOUT, RTT_RESEND_FACTOR, RTT_SAMPLE_WINDOW};

/// Smoothing factor for the RTT and jitter estimators.
const EWMA_ALPHA: f32 = 0.1;

/// Observed link quality for one connection: smoothed round-trip time,
/// jitter, and packet loss over a moving window of samples.
pub struct NetworkConditions {
    rtt_samples: VecDeque<Duration>,
    smoothed_rtt_ms: f32,
    jitter_ms: f32,
    packets_sent: u64,
    packets_lost: u64,
    // loss over the most recent window, to track current rather than
    // lifetime conditions
    window_sent: u32,
    window_lost: u32,
    loss_rate: f32,
}

impl NetworkConditions {
    pub fn new() -> Self {
        Self {
            rtt_samples: VecDeque::with_capacity(RTT_SAMPLE_WINDOW),
            smoothed_rtt_ms: 0.0,
            jitter_ms: 0.0,
            packets_sent: 0,
            packets_lost: 0,
            window_sent: 0,
            window_lost: 0,
            loss_rate: 0.0,
        }
    }

    pub fn record_rtt(&mut self, sample: Duration) {
        if self.rtt_samples.len() == RTT_SAMPLE_WINDOW {
            self.rtt_samples.pop_front();
        }
        self.rtt_samples.push_back(sample);

        let sample_ms = sample.as_secs_f32() * 1000.0;
        if self.smoothed_rtt_ms == 0.0 {
            self.smoothed_rtt_ms = sample_ms;
        } else {
            let deviation = (sample_ms - self.smoothed_rtt_ms).abs();
            self.jitter_ms += EWMA_ALPHA * (deviation - self.jitter_ms);
            self.smoothed_rtt_ms += EWMA_ALPHA * (sample_ms - self.smoothed_rtt_ms);
        }
    }

    pub fn record_packet_sent(&mut self) {
        self.packets_sent += 1;
        self.window_sent += 1;
        self.roll_loss_window();
    }

    pub fn record_packet_lost(&mut self) {
        self.packets_lost += 1;
        self.window_lost += 1;
        self.roll_loss_window();
    }

    fn roll_loss_window(&mut self) {
        if self.window_sent as usize >= RTT_SAMPLE_WINDOW {
            self.loss_rate = self.window_lost as f32 / self.window_sent as f32;
            self.window_sent = 0;
            self.window_lost = 0;
        }
    }

    /// Smoothed round-trip time in milliseconds.
    pub fn rtt_ms(&self) -> f32 {
        self.smoothed_rtt_ms
    }

    pub fn jitter_ms(&self) -> f32 {
        self.jitter_ms
    }

    /// Lost/sent as a moving fraction over the most recent window.
    pub fn loss_rate(&self) -> f32 {
        if self.window_sent == 0 {
            return self.loss_rate;
        }
        // blend the closed window with the partial one
        let partial = self.window_lost as f32 / self.window_sent as f32;
        (self.loss_rate + partial) / 2.0
    }

    pub fn packets_sent(&self) -> u64 {
        self.packets_sent
    }

    pub fn packets_lost(&self) -> u64 {
        self.packets_lost
    }

    /// RTT-adaptive retransmission timeout.
    pub fn resend_timeout(&self) -> Duration {
        let timeout = Duration::from_secs_f32(self.smoothed_rtt_ms * RTT_RESEND_FACTOR / 1000.0);
        timeout.max(MIN_RESEND_TIMEOUT)
    }
}

impl Default for NetworkConditions {
    fn default() -> Self {
        Self::new()
    }
}
