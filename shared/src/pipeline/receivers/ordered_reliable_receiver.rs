use std::collections::HashMap;

use crate::pipeline::send_queue::DataFrame;
use crate::sequence::sequence_less_than;
use crate::types::{MessageIndex, StreamKey};

struct OrderedStream {
    next_release: MessageIndex,
    buffer: HashMap<MessageIndex, DataFrame>,
}

impl OrderedStream {
    fn new() -> Self {
        Self {
            next_release: 0,
            buffer: HashMap::new(),
        }
    }
}

/// Receiver for reliable-ordered frames: buffers out-of-order arrivals and
/// releases them in per-stream message-index order.
pub struct OrderedReliableReceiver {
    streams: HashMap<StreamKey, OrderedStream>,
}

impl OrderedReliableReceiver {
    pub fn new() -> Self {
        Self {
            streams: HashMap::new(),
        }
    }

    /// Accepts one frame and returns every frame that is now releasable in
    /// order, oldest first. Duplicates release nothing.
    pub fn receive(&mut self, frame: DataFrame) -> Vec<DataFrame> {
        let stream = self
            .streams
            .entry(frame.stream)
            .or_insert_with(OrderedStream::new);

        // already released or already buffered: duplicate
        if sequence_less_than(frame.message_index, stream.next_release)
            || stream.buffer.contains_key(&frame.message_index)
        {
            return Vec::new();
        }

        stream.buffer.insert(frame.message_index, frame);

        let mut released = Vec::new();
        while let Some(next) = stream.buffer.remove(&stream.next_release) {
            released.push(next);
            stream.next_release = stream.next_release.wrapping_add(1);
        }
        released
    }

    /// Frames buffered but not yet releasable, across all streams.
    pub fn buffered_count(&self) -> usize {
        self.streams.values().map(|stream| stream.buffer.len()).sum()
    }
}

impl Default for OrderedReliableReceiver {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Reliability;

    fn frame(stream: StreamKey, index: MessageIndex) -> DataFrame {
        DataFrame {
            delta: false,
            reliability: Reliability::ReliableOrdered,
            stream,
            message_index: index,
            payload: vec![index as u8],
        }
    }

    #[test]
    fn in_order_frames_release_immediately() {
        let mut receiver = OrderedReliableReceiver::new();
        assert_eq!(receiver.receive(frame(1, 0)).len(), 1);
        assert_eq!(receiver.receive(frame(1, 1)).len(), 1);
    }

    #[test]
    fn gap_holds_release_until_filled() {
        let mut receiver = OrderedReliableReceiver::new();
        assert_eq!(receiver.receive(frame(1, 0)).len(), 1);
        // index 2 arrives before 1
        assert!(receiver.receive(frame(1, 2)).is_empty());
        assert_eq!(receiver.buffered_count(), 1);

        let released = receiver.receive(frame(1, 1));
        let indices: Vec<MessageIndex> =
            released.iter().map(|released| released.message_index).collect();
        assert_eq!(indices, vec![1, 2]);
        assert_eq!(receiver.buffered_count(), 0);
    }

    #[test]
    fn duplicate_releases_nothing() {
        let mut receiver = OrderedReliableReceiver::new();
        assert_eq!(receiver.receive(frame(1, 0)).len(), 1);
        assert!(receiver.receive(frame(1, 0)).is_empty());

        assert!(receiver.receive(frame(1, 2)).is_empty());
        assert!(receiver.receive(frame(1, 2)).is_empty());
        assert_eq!(receiver.buffered_count(), 1);
    }

    #[test]
    fn streams_are_independent() {
        let mut receiver = OrderedReliableReceiver::new();
        assert!(receiver.receive(frame(1, 1)).is_empty());
        assert_eq!(receiver.receive(frame(2, 0)).len(), 1);
    }
}
