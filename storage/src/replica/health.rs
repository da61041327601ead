/// Health of one read replica as observed by the validation worker.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ReplicaHealth {
    Healthy,
    /// Validation flakes but has not crossed the failure threshold.
    Degraded,
    /// Reachable but replication lag exceeds the allowed ceiling.
    Lagging,
    /// Did not answer the last validation.
    Unreachable,
    /// Crossed the consecutive-failure threshold; out of rotation.
    Failed,
}

impl ReplicaHealth {
    /// Whether the load policies may rank this replica at all.
    pub fn routable(self) -> bool {
        !matches!(self, ReplicaHealth::Unreachable | ReplicaHealth::Failed)
    }
}

/// Time-hysteretic health state: a replica moves to `Failed` only after N
/// consecutive failed validations and returns to `Healthy` only after M
/// consecutive successes, so a flapping link cannot thrash the rotation.
pub struct HealthTracker {
    state: ReplicaHealth,
    consecutive_failures: u32,
    consecutive_successes: u32,
    fail_threshold: u32,
    recover_threshold: u32,
}

impl HealthTracker {
    pub fn new(fail_threshold: u32, recover_threshold: u32) -> Self {
        Self {
            state: ReplicaHealth::Healthy,
            consecutive_failures: 0,
            consecutive_successes: 0,
            fail_threshold: fail_threshold.max(1),
            recover_threshold: recover_threshold.max(1),
        }
    }

    pub fn state(&self) -> ReplicaHealth {
        self.state
    }

    pub fn record_success(&mut self) {
        self.consecutive_failures = 0;
        self.consecutive_successes += 1;
        match self.state {
            ReplicaHealth::Healthy | ReplicaHealth::Lagging => {}
            _ => {
                if self.consecutive_successes >= self.recover_threshold {
                    self.state = ReplicaHealth::Healthy;
                }
            }
        }
    }

    pub fn record_failure(&mut self) {
        self.consecutive_successes = 0;
        self.consecutive_failures += 1;
        if self.consecutive_failures >= self.fail_threshold {
            self.state = ReplicaHealth::Failed;
        } else {
            self.state = match self.state {
                ReplicaHealth::Failed => ReplicaHealth::Failed,
                _ => ReplicaHealth::Unreachable,
            };
        }
    }

    /// Lag observations move a routable replica between Healthy and
    /// Lagging without touching the failure counters.
    pub fn record_lag(&mut self, lag_ms: u64, max_lag_ms: u64) {
        if !self.state.routable() {
            return;
        }
        self.state = if lag_ms > max_lag_ms {
            ReplicaHealth::Lagging
        } else if self.state == ReplicaHealth::Lagging {
            ReplicaHealth::Healthy
        } else {
            self.state
        };
    }
}
