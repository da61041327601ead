use std::default::Default;
use std::time::Duration;

/// What kind of data an entry holds; picks the TTL at put time.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DataKind {
    /// Live entity state: short TTL, changes constantly.
    OnlineEntity,
    /// Static reference data: long TTL, effectively immutable.
    StaticReference,
    /// Reports and query results: very short TTL.
    Report,
}

/// Contains Config properties which will be used by one named cache.
#[derive(Clone)]
pub struct CacheConfig {
    pub name: String,
    /// Entry capacity of the small hot tier.
    pub l1_size: usize,
    /// Entry capacity of the larger warm tier.
    pub l2_size: usize,
    /// TTL for online entity data.
    pub active_ttl: Duration,
    /// TTL for static reference data.
    pub inactive_ttl: Duration,
    /// TTL for report/query data.
    pub report_ttl: Duration,
    /// How long a dirty entry may age before the write-behind worker
    /// flushes it.
    pub write_delay: Duration,
    pub enable_write_behind: bool,
    /// Flush attempts before a persistence alert is raised.
    pub max_flush_retries: u32,
    /// Base of the exponential backoff between flush retries.
    pub retry_backoff: Duration,
    /// Above this many dirty entries, writes flush the oldest dirty entry
    /// synchronously to shed pressure.
    pub dirty_depth_sync_threshold: usize,
}

impl CacheConfig {
    pub fn ttl_for(&self, kind: DataKind) -> Duration {
        match kind {
            DataKind::OnlineEntity => self.active_ttl,
            DataKind::StaticReference => self.inactive_ttl,
            DataKind::Report => self.report_ttl,
        }
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            name: "default".to_string(),
            l1_size: 1024,
            l2_size: 8192,
            active_ttl: Duration::from_secs(300),
            inactive_ttl: Duration::from_secs(3600),
            report_ttl: Duration::from_secs(30),
            write_delay: Duration::from_secs(30),
            enable_write_behind: true,
            max_flush_retries: 5,
            retry_backoff: Duration::from_millis(500),
            dirty_depth_sync_threshold: 256,
        }
    }
}
