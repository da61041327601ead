use std::collections::HashMap;

use crate::pipeline::send_queue::DataFrame;
use crate::sequence::sequence_greater_than;
use crate::types::{MessageIndex, StreamKey};

/// Receiver for the two sequenced modes (reliable and unreliable): only a
/// frame newer than the newest already seen on its stream is delivered;
/// older and duplicate frames are discarded.
pub struct SequencedReceiver {
    newest_per_stream: HashMap<StreamKey, MessageIndex>,
}

impl SequencedReceiver {
    pub fn new() -> Self {
        Self {
            newest_per_stream: HashMap::new(),
        }
    }

    /// Returns the frame when it is the newest on its stream, None otherwise.
    pub fn receive(&mut self, frame: DataFrame) -> Option<DataFrame> {
        match self.newest_per_stream.get(&frame.stream) {
            Some(&newest) if !sequence_greater_than(frame.message_index, newest) => None,
            _ => {
                self.newest_per_stream.insert(frame.stream, frame.message_index);
                Some(frame)
            }
        }
    }
}

impl Default for SequencedReceiver {
    fn default() -> Self {
        Self::new()
    }
}
