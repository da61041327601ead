use std::collections::HashMap;
use std::time::{Duration, Instant};

use crate::sequence::{packet_seq_diff, packet_seq_greater_than};
use crate::types::PacketSeq;

/// Width of the ack bitfield: one bit per sequence preceding the latest ack.
const ACK_BITFIELD_WIDTH: u32 = 32;

/// Sent packets unacked after this long are forgotten for RTT purposes (the
/// reliability layer has its own retransmit records).
const SENT_RECORD_MAX_AGE: Duration = Duration::from_secs(10);

/// Tracks sent sequences awaiting acknowledgement and received sequences to
/// be acknowledged, and detects duplicate receipts.
pub struct AckManager {
    next_sequence: PacketSeq,
    sent: HashMap<PacketSeq, Instant>,
    latest_received: Option<PacketSeq>,
    // bit i set = (latest_received - 1 - i) was received
    received_bitfield: u32,
    ack_pending: bool,
}

impl AckManager {
    pub fn new() -> Self {
        Self {
            // sequence 0 is reserved so an ack field of 0 can mean "nothing
            // received yet"
            next_sequence: 1,
            sent: HashMap::new(),
            latest_received: None,
            received_bitfield: 0,
            ack_pending: false,
        }
    }

    // Outgoing

    /// Allocates the wire sequence for the next outgoing packet.
    pub fn next_outgoing_sequence(&mut self) -> PacketSeq {
        let sequence = self.next_sequence;
        self.next_sequence = self.next_sequence.wrapping_add(1);
        sequence
    }

    /// Records the send time of `sequence` for RTT estimation.
    pub fn track_sent(&mut self, sequence: PacketSeq, now: Instant) {
        self.sent.insert(sequence, now);
        self.sent
            .retain(|_, sent_at| now.saturating_duration_since(*sent_at) < SENT_RECORD_MAX_AGE);
    }

    // Incoming

    /// Records receipt of a remote sequence. Returns false when the sequence
    /// is a duplicate or too old to track, in which case the packet must be
    /// discarded.
    pub fn process_incoming_sequence(&mut self, sequence: PacketSeq) -> bool {
        let Some(latest) = self.latest_received else {
            self.latest_received = Some(sequence);
            return true;
        };

        if sequence == latest {
            return false;
        }

        if packet_seq_greater_than(sequence, latest) {
            let advance = packet_seq_diff(latest, sequence) as u32;
            if advance >= ACK_BITFIELD_WIDTH {
                self.received_bitfield = 0;
            } else {
                self.received_bitfield = (self.received_bitfield << advance) | (1 << (advance - 1));
            }
            self.latest_received = Some(sequence);
            return true;
        }

        // older than latest: position within the bitfield window, or too old
        let behind = packet_seq_diff(sequence, latest) as u32;
        if behind > ACK_BITFIELD_WIDTH {
            return false;
        }
        let bit = 1 << (behind - 1);
        if self.received_bitfield & bit != 0 {
            return false;
        }
        self.received_bitfield |= bit;
        true
    }

    /// Marks that an acknowledgement should be emitted on the next drain.
    pub fn mark_ack_pending(&mut self) {
        self.ack_pending = true;
    }

    pub fn take_ack_pending(&mut self) -> bool {
        std::mem::take(&mut self.ack_pending)
    }

    /// The ack header value: highest remote sequence seen (0 before any).
    pub fn ack_header(&self) -> PacketSeq {
        self.latest_received.unwrap_or(0)
    }

    /// The (latest, bitfield) pair carried by a dedicated Ack packet.
    pub fn ack_bitfield(&self) -> (PacketSeq, u32) {
        (self.latest_received.unwrap_or(0), self.received_bitfield)
    }

    /// Processes a received (latest, bitfield) acknowledgement. Returns the
    /// newly acknowledged sequences together with an RTT sample for each one
    /// still in the sent window.
    pub fn process_ack(
        &mut self,
        ack: PacketSeq,
        bitfield: u32,
        now: Instant,
    ) -> Vec<(PacketSeq, Option<Duration>)> {
        let mut acked = Vec::new();

        let mut note = |sequence: PacketSeq, sent: &mut HashMap<PacketSeq, Instant>| {
            if let Some(sent_at) = sent.remove(&sequence) {
                acked.push((sequence, Some(now.saturating_duration_since(sent_at))));
            } else {
                acked.push((sequence, None));
            }
        };

        note(ack, &mut self.sent);
        for bit in 0..ACK_BITFIELD_WIDTH {
            if bitfield & (1 << bit) != 0 {
                note(ack.wrapping_sub(bit + 1), &mut self.sent);
            }
        }

        acked
    }
}

impl Default for AckManager {
    fn default() -> Self {
        Self::new()
    }
}
