use std::time::{Duration, Instant};

use crate::driver::Endpoint;

/// One recyclable storage session slot. The underlying wire connection
/// belongs to the driver; the pool tracks lifecycle and health here.
pub struct Session {
    id: u64,
    endpoint: Endpoint,
    created_at: Instant,
    last_used_at: Instant,
    broken: bool,
}

impl Session {
    pub(crate) fn new(id: u64, endpoint: Endpoint) -> Self {
        let now = Instant::now();
        Self {
            id,
            endpoint,
            created_at: now,
            last_used_at: now,
            broken: false,
        }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn endpoint(&self) -> &Endpoint {
        &self.endpoint
    }

    pub fn age(&self) -> Duration {
        self.created_at.elapsed()
    }

    pub fn idle_for(&self) -> Duration {
        self.last_used_at.elapsed()
    }

    pub(crate) fn touch(&mut self) {
        self.last_used_at = Instant::now();
    }

    /// A broken session is discarded on release instead of recycled.
    pub fn mark_broken(&mut self) {
        self.broken = true;
    }

    pub fn is_broken(&self) -> bool {
        self.broken
    }

    pub(crate) fn expired(&self, max_lifetime: Duration) -> bool {
        self.age() >= max_lifetime
    }
}
