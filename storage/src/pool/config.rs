use std::default::Default;
use std::time::Duration;

/// Contains Config properties which will be used by one connection pool.
#[derive(Clone)]
pub struct PoolConfig {
    /// Name used in logs and error context (e.g. "shard_0").
    pub name: String,
    pub host: String,
    pub port: u16,
    /// Sessions kept alive even when idle.
    pub min: usize,
    /// Hard ceiling on live sessions.
    pub max: usize,
    /// Sessions created eagerly at pool construction.
    pub initial: usize,
    pub acquire_timeout: Duration,
    /// Idle sessions beyond `min` are closed after this.
    pub idle_timeout: Duration,
    /// Sessions are recycled after this regardless of activity.
    pub max_lifetime: Duration,
    pub validation_query: String,
    pub test_on_borrow: bool,
    pub test_on_return: bool,
    pub test_while_idle: bool,
    /// Interval of the idle-validation worker.
    pub validation_interval: Duration,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            name: "default".to_string(),
            host: "127.0.0.1".to_string(),
            port: 3306,
            min: 2,
            max: 16,
            initial: 2,
            acquire_timeout: Duration::from_secs(5),
            idle_timeout: Duration::from_secs(300),
            max_lifetime: Duration::from_secs(3600),
            validation_query: "SELECT 1".to_string(),
            test_on_borrow: true,
            test_on_return: false,
            test_while_idle: true,
            validation_interval: Duration::from_secs(30),
        }
    }
}
