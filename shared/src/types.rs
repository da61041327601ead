use realm_serde::SerdeErr;

/// One discrete world-state advancement step. Wire ticks are 32-bit.
pub type Tick = u32;

/// Wire-level packet sequence number.
pub type PacketSeq = u32;

/// Per-stream message index used by the reliability modes.
pub type MessageIndex = u16;

/// Identifies a logical stream within one connection (e.g. one entity's
/// position updates). Sequenced modes retain only the newest message per
/// stream; ordered mode releases in sequence per stream.
pub type StreamKey = u16;

/// Outbound queue priority, drained from `Critical` down to `Bulk`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Priority {
    Critical,
    High,
    Normal,
    Low,
    Bulk,
}

impl Priority {
    pub const COUNT: usize = 5;

    pub const ALL: [Priority; Priority::COUNT] = [
        Priority::Critical,
        Priority::High,
        Priority::Normal,
        Priority::Low,
        Priority::Bulk,
    ];

    pub fn index(self) -> usize {
        match self {
            Priority::Critical => 0,
            Priority::High => 1,
            Priority::Normal => 2,
            Priority::Low => 3,
            Priority::Bulk => 4,
        }
    }

    /// Only priorities at or below Normal are eligible for aggregation.
    pub fn aggregatable(self) -> bool {
        self >= Priority::Normal
    }
}

/// Delivery guarantee for one outgoing packet.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Reliability {
    /// Send once, forget.
    Unreliable,
    /// Send once; the receiver discards packets older than the newest seen.
    UnreliableSequenced,
    /// Retransmit until acknowledged; duplicates removed on receipt.
    Reliable,
    /// Reliable, and the receiver buffers and releases in sequence.
    ReliableOrdered,
    /// Reliable, but only the newest packet per stream is retained in the
    /// retransmit window.
    ReliableSequenced,
}

impl Reliability {
    pub fn is_reliable(self) -> bool {
        matches!(
            self,
            Reliability::Reliable | Reliability::ReliableOrdered | Reliability::ReliableSequenced
        )
    }

    pub fn to_u8(self) -> u8 {
        match self {
            Reliability::Unreliable => 0,
            Reliability::UnreliableSequenced => 1,
            Reliability::Reliable => 2,
            Reliability::ReliableOrdered => 3,
            Reliability::ReliableSequenced => 4,
        }
    }

    pub fn from_u8(value: u8) -> Result<Self, SerdeErr> {
        match value {
            0 => Ok(Reliability::Unreliable),
            1 => Ok(Reliability::UnreliableSequenced),
            2 => Ok(Reliability::Reliable),
            3 => Ok(Reliability::ReliableOrdered),
            4 => Ok(Reliability::ReliableSequenced),
            _ => Err(SerdeErr::UnknownDiscriminant {
                type_name: "Reliability",
                value: value as u16,
            }),
        }
    }
}
