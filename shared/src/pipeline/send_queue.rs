use std::collections::VecDeque;
use std::time::Instant;

use realm_serde::{ByteReader, ByteWriter, SerdeErr};

use crate::types::{MessageIndex, Priority, Reliability, StreamKey};

/// One game payload with its delivery metadata, as carried inside a Data
/// packet or an aggregated child. Frames self-describe so aggregation and
/// retransmission can move them between packets freely.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DataFrame {
    /// The payload is a delta against an acknowledged baseline.
    pub delta: bool,
    pub reliability: Reliability,
    pub stream: StreamKey,
    pub message_index: MessageIndex,
    pub payload: Vec<u8>,
}

impl DataFrame {
    /// Serialized size: flags + reliability + stream + index + length-prefixed
    /// payload.
    pub const HEADER_BYTES: usize = 1 + 1 + 2 + 2 + 2;

    pub fn wire_len(&self) -> usize {
        Self::HEADER_BYTES + self.payload.len()
    }

    pub fn ser(&self, writer: &mut ByteWriter) {
        writer.write_u8(self.delta as u8);
        writer.write_u8(self.reliability.to_u8());
        writer.write_u16(self.stream);
        writer.write_u16(self.message_index);
        writer.write_prefixed_bytes(&self.payload);
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut writer = ByteWriter::with_capacity(self.wire_len());
        self.ser(&mut writer);
        writer.to_bytes()
    }

    pub fn de(reader: &mut ByteReader) -> Result<Self, SerdeErr> {
        let delta = reader.read_u8()? != 0;
        let reliability = Reliability::from_u8(reader.read_u8()?)?;
        let stream = reader.read_u16()?;
        let message_index = reader.read_u16()?;
        let payload = reader.read_prefixed_bytes()?.to_vec();
        Ok(Self {
            delta,
            reliability,
            stream,
            message_index,
            payload,
        })
    }
}

/// An entry waiting in one of the five priority queues.
pub struct QueuedPacket {
    pub frame: DataFrame,
    pub priority: Priority,
    pub enqueued: Instant,
}

/// The five outbound FIFO queues, indexed by priority.
pub struct PriorityQueues {
    queues: [VecDeque<QueuedPacket>; Priority::COUNT],
}

impl PriorityQueues {
    pub fn new() -> Self {
        Self {
            queues: Default::default(),
        }
    }

    pub fn push(&mut self, packet: QueuedPacket) {
        self.queues[packet.priority.index()].push_back(packet);
    }

    pub fn front(&self, priority: Priority) -> Option<&QueuedPacket> {
        self.queues[priority.index()].front()
    }

    pub fn pop(&mut self, priority: Priority) -> Option<QueuedPacket> {
        self.queues[priority.index()].pop_front()
    }

    pub fn len(&self, priority: Priority) -> usize {
        self.queues[priority.index()].len()
    }

    pub fn is_empty(&self) -> bool {
        self.queues.iter().all(VecDeque::is_empty)
    }

    pub fn total_len(&self) -> usize {
        self.queues.iter().map(VecDeque::len).sum()
    }
}

impl Default for PriorityQueues {
    fn default() -> Self {
        Self::new()
    }
}
