use std::collections::HashMap;
use std::time::{Duration, Instant};

use log::trace;

use crate::pipeline::send_queue::DataFrame;
use crate::sequence::sequence_greater_than;
use crate::types::{MessageIndex, PacketSeq, Priority, Reliability, StreamKey};

/// Opaque handle to one tracked retransmit record.
pub type RecordId = u64;

struct RetransmitRecord {
    frame: DataFrame,
    priority: Priority,
    last_sent: Instant,
    /// Every wire sequence that has carried this frame; an ack of any one of
    /// them delivers the record.
    wire_sequences: Vec<PacketSeq>,
    resend_count: u32,
}

/// The retransmit window shared by the three reliable modes.
///
/// Reliable and reliable-ordered frames stay tracked until acknowledged.
/// Reliable-sequenced frames are superseded: tracking a newer frame on the
/// same stream discards any older tracked frame for that stream.
pub struct ReliableSender {
    records: HashMap<RecordId, RetransmitRecord>,
    sequence_to_record: HashMap<PacketSeq, RecordId>,
    next_record_id: RecordId,
}

impl ReliableSender {
    pub fn new() -> Self {
        Self {
            records: HashMap::new(),
            sequence_to_record: HashMap::new(),
            next_record_id: 0,
        }
    }

    /// Starts tracking a reliable frame at first send. For the sequenced
    /// mode, discards any older record on the same stream first.
    pub fn track(&mut self, frame: DataFrame, priority: Priority, now: Instant) -> RecordId {
        debug_assert!(frame.reliability.is_reliable());

        if frame.reliability == Reliability::ReliableSequenced {
            let stream = frame.stream;
            let index = frame.message_index;
            let superseded: Vec<RecordId> = self
                .records
                .iter()
                .filter(|(_, record)| {
                    record.frame.stream == stream
                        && record.frame.reliability == Reliability::ReliableSequenced
                        && sequence_greater_than(index, record.frame.message_index)
                })
                .map(|(id, _)| *id)
                .collect();
            for id in superseded {
                trace!("reliable-sequenced stream {stream}: superseding record {id}");
                self.remove_record(id);
            }
        }

        let id = self.next_record_id;
        self.next_record_id += 1;
        self.records.insert(
            id,
            RetransmitRecord {
                frame,
                priority,
                last_sent: now,
                wire_sequences: Vec::new(),
                resend_count: 0,
            },
        );
        id
    }

    /// Records that `record` went out in the packet with `sequence`.
    pub fn note_sent(&mut self, record: RecordId, sequence: PacketSeq, now: Instant) {
        if let Some(entry) = self.records.get_mut(&record) {
            entry.wire_sequences.push(sequence);
            entry.last_sent = now;
            self.sequence_to_record.insert(sequence, record);
        }
    }

    /// Frames whose last send is older than the RTT-adaptive timeout, ready
    /// to be re-emitted. Each returned frame's resend counter is bumped and
    /// its last-sent time reset so one drain pass resends once.
    pub fn due_for_resend(
        &mut self,
        now: Instant,
        timeout: Duration,
    ) -> Vec<(RecordId, DataFrame, Priority)> {
        let mut due = Vec::new();
        for (id, record) in &mut self.records {
            if now.saturating_duration_since(record.last_sent) >= timeout {
                record.resend_count += 1;
                record.last_sent = now;
                due.push((*id, record.frame.clone(), record.priority));
            }
        }
        due
    }

    /// Processes an acknowledged wire sequence. Returns the delivered
    /// frame's (stream, message index) when a tracked record was delivered
    /// by it, so the caller can confirm application-level delivery.
    pub fn notify_acked(&mut self, sequence: PacketSeq) -> Option<(StreamKey, MessageIndex)> {
        let record_id = self.sequence_to_record.get(&sequence).copied()?;
        let record = self.records.get(&record_id)?;
        let delivered = (record.frame.stream, record.frame.message_index);
        self.remove_record(record_id);
        Some(delivered)
    }

    pub fn has_pending(&self) -> bool {
        !self.records.is_empty()
    }

    pub fn pending_count(&self) -> usize {
        self.records.len()
    }

    /// Drops everything; used when the owning connection closes.
    pub fn clear(&mut self) {
        self.records.clear();
        self.sequence_to_record.clear();
    }

    fn remove_record(&mut self, id: RecordId) {
        if let Some(record) = self.records.remove(&id) {
            for sequence in record.wire_sequences {
                self.sequence_to_record.remove(&sequence);
            }
        }
    }
}

impl Default for ReliableSender {
    fn default() -> Self {
        Self::new()
    }
}
