use std::collections::HashMap;

use crate::pipeline::send_queue::DataFrame;
use crate::sequence_list::SequenceList;
use crate::types::StreamKey;

/// How far behind the newest message index duplicates are still detected.
const DEDUPE_WINDOW: u16 = 512;

/// Receiver for plain reliable frames: delivered on arrival in any order,
/// with duplicates (from retransmits racing their acks) removed.
pub struct UnorderedReliableReceiver {
    seen_per_stream: HashMap<StreamKey, SequenceList>,
}

impl UnorderedReliableReceiver {
    pub fn new() -> Self {
        Self {
            seen_per_stream: HashMap::new(),
        }
    }

    /// Returns the frame unless it was already delivered once.
    pub fn receive(&mut self, frame: DataFrame) -> Option<DataFrame> {
        let seen = self
            .seen_per_stream
            .entry(frame.stream)
            .or_insert_with(|| SequenceList::new(DEDUPE_WINDOW));
        if seen.insert(frame.message_index) {
            Some(frame)
        } else {
            None
        }
    }
}

impl Default for UnorderedReliableReceiver {
    fn default() -> Self {
        Self::new()
    }
}
