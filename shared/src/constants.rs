use std::time::Duration;

pub use realm_serde::MTU_SIZE_BYTES;

/// Bytes of the aggregate body consumed by the 2-byte child count.
pub const AGGREGATE_COUNT_BYTES: usize = 2;

/// Bytes of framing per aggregated child (4-byte child length).
pub const AGGREGATE_CHILD_HEADER_BYTES: usize = 4;

/// Maximum aggregate body size: MTU-safe payload minus the child count.
pub const AGGREGATE_MAX_BYTES: usize = MTU_SIZE_BYTES - AGGREGATE_COUNT_BYTES;

/// An aggregate is force-flushed once it is this full.
pub const AGGREGATE_FLUSH_FILL: f32 = 0.8;

/// An aggregate is force-flushed once its oldest packet is this old.
pub const AGGREGATE_FLUSH_AGE: Duration = Duration::from_millis(10);

/// Queued packets older than this are dropped instead of sent.
pub const STALE_PACKET_AGE: Duration = Duration::from_secs(5);

/// Number of RTT samples in the moving estimation window.
pub const RTT_SAMPLE_WINDOW: usize = 100;

/// Retransmit timeout multiplier applied to the smoothed RTT.
pub const RTT_RESEND_FACTOR: f32 = 1.5;

/// Floor for the retransmit timeout so a near-zero RTT cannot spin resends.
pub const MIN_RESEND_TIMEOUT: Duration = Duration::from_millis(25);
