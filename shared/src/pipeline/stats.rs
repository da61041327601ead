/// Counters for one connection's send pipeline.
#[derive(Clone, Copy, Debug, Default)]
pub struct ConnectionStats {
    pub packets_sent: u64,
    pub packets_received: u64,
    pub bytes_sent: u64,
    pub bytes_received: u64,
    /// Stale queue drops plus retransmit-timeout presumed losses.
    pub packets_lost: u64,
    /// Queue entries dropped because they aged past the staleness bound.
    pub packets_dropped_stale: u64,
    pub duplicates_received: u64,
    pub retransmissions: u64,
    pub aggregates_sent: u64,
    /// Packets whose body went out compressed.
    pub compressed_packets: u64,
    /// Bytes saved by compression across all compressed packets.
    pub compression_saved_bytes: u64,
}
