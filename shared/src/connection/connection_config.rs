use std::default::Default;
use std::time::Duration;

use super::compression_config::CompressionConfig;

/// Contains Config properties which will be used by a connection's send
/// pipeline and timeout handling.
#[derive(Clone)]
pub struct ConnectionConfig {
    /// Outbound byte budget per second. 0 = unlimited.
    pub bandwidth_limit_bytes_per_second: usize,
    /// Whether small packets at or below Normal priority are aggregated
    /// into MTU-sized frames.
    pub enable_aggregation: bool,
    /// Whether packet bodies are compressed when that makes them smaller.
    pub enable_compression: bool,
    /// Optional compression tuning; None uses the codec defaults.
    pub compression: Option<CompressionConfig>,
    /// How often the adaptive quality helper re-evaluates the connection.
    pub adaptation_interval: Duration,
    /// The connection is dropped after this long without hearing from the
    /// remote host.
    pub disconnection_timeout_duration: Duration,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            bandwidth_limit_bytes_per_second: 0,
            enable_aggregation: true,
            enable_compression: false,
            compression: None,
            adaptation_interval: Duration::from_secs(5),
            disconnection_timeout_duration: Duration::from_secs(10),
        }
    }
}
