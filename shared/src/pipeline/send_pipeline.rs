use std::collections::HashMap;
use std::time::Instant;

use log::warn;

use realm_serde::{ByteReader, ByteWriter};

use crate::connection::ack_manager::AckManager;
use crate::connection::bandwidth_monitor::BandwidthMonitor;
use crate::connection::cipher::PacketCipher;
use crate::connection::connection_config::ConnectionConfig;
use crate::connection::decoder::Decoder;
use crate::connection::encoder::Encoder;
use crate::connection::error::ConnectionError;
use crate::connection::network_conditions::NetworkConditions;
use crate::connection::packet_type::PacketType;
use crate::connection::standard_header::{frame_packet, parse_frame, PacketFlags, StandardHeader};
use crate::constants::STALE_PACKET_AGE;
use crate::pipeline::aggregator::{parse_aggregate, PacketAggregator};
use crate::pipeline::receivers::ordered_reliable_receiver::OrderedReliableReceiver;
use crate::pipeline::receivers::sequenced_receiver::SequencedReceiver;
use crate::pipeline::receivers::unordered_reliable_receiver::UnorderedReliableReceiver;
use crate::pipeline::send_queue::{DataFrame, PriorityQueues, QueuedPacket};
use crate::pipeline::senders::reliable_sender::{RecordId, ReliableSender};
use crate::pipeline::stats::ConnectionStats;
use crate::types::{MessageIndex, Priority, Reliability, StreamKey};

/// A payload delivered to the application after the receive-side reliability
/// rules have been applied.
#[derive(Debug, PartialEq, Eq)]
pub struct ReceivedMessage {
    pub stream: StreamKey,
    pub delta: bool,
    pub payload: Vec<u8>,
}

/// Result of processing one incoming wire packet.
#[derive(Default)]
pub struct IncomingPackets {
    pub messages: Vec<ReceivedMessage>,
    /// The remote host announced it is closing the connection.
    pub closed: bool,
}

/// The per-connection send pipeline: five priority queues drained under a
/// byte budget, with aggregation, compression, and the five reliability
/// modes layered on top of a raw datagram transport.
pub struct SendPipeline {
    aggregation_enabled: bool,
    compression_enabled: bool,

    queues: PriorityQueues,
    bandwidth: BandwidthMonitor,
    acks: AckManager,
    conditions: NetworkConditions,

    reliable_sender: ReliableSender,
    ordered_receiver: OrderedReliableReceiver,
    sequenced_reliable_receiver: SequencedReceiver,
    sequenced_unreliable_receiver: SequencedReceiver,
    unordered_receiver: UnorderedReliableReceiver,

    aggregator: PacketAggregator,
    // reliable records carried by the pending aggregate
    aggregate_records: Vec<RecordId>,

    encoder: Encoder,
    decoder: Decoder,
    cipher: Option<Box<dyn PacketCipher>>,

    next_index_per_stream: HashMap<StreamKey, MessageIndex>,
    control_queue: Vec<(PacketType, Vec<u8>)>,
    pending_pings: HashMap<u32, Instant>,
    next_ping_nonce: u32,

    // reliable frames confirmed delivered since the last collection
    delivered: Vec<(StreamKey, MessageIndex)>,

    stats: ConnectionStats,
}

impl SendPipeline {
    pub fn new(config: &ConnectionConfig) -> Result<Self, ConnectionError> {
        let compression_mode = config
            .compression
            .as_ref()
            .and_then(|compression| compression.server_to_client.clone());
        Ok(Self {
            aggregation_enabled: config.enable_aggregation,
            compression_enabled: config.enable_compression,
            queues: PriorityQueues::new(),
            bandwidth: BandwidthMonitor::new(config.bandwidth_limit_bytes_per_second),
            acks: AckManager::new(),
            conditions: NetworkConditions::new(),
            reliable_sender: ReliableSender::new(),
            ordered_receiver: OrderedReliableReceiver::new(),
            sequenced_reliable_receiver: SequencedReceiver::new(),
            sequenced_unreliable_receiver: SequencedReceiver::new(),
            unordered_receiver: UnorderedReliableReceiver::new(),
            aggregator: PacketAggregator::new(),
            aggregate_records: Vec::new(),
            encoder: Encoder::new(compression_mode.clone())?,
            decoder: Decoder::new(compression_mode)?,
            cipher: None,
            next_index_per_stream: HashMap::new(),
            control_queue: Vec::new(),
            pending_pings: HashMap::new(),
            next_ping_nonce: 0,
            delivered: Vec::new(),
            stats: ConnectionStats::default(),
        })
    }

    /// Installs the connection's cipher; from here on every body is
    /// encrypted and the encrypted flag bit set.
    pub fn set_cipher(&mut self, cipher: Box<dyn PacketCipher>) {
        self.cipher = Some(cipher);
    }

    pub fn set_aggregation_enabled(&mut self, enabled: bool) {
        self.aggregation_enabled = enabled;
    }

    pub fn set_compression_enabled(&mut self, enabled: bool) {
        self.compression_enabled = enabled;
    }

    pub fn set_bandwidth_limit(&mut self, bytes_per_second: usize) {
        self.bandwidth.set_limit(bytes_per_second);
    }

    pub fn stats(&self) -> &ConnectionStats {
        &self.stats
    }

    pub fn conditions(&self) -> &NetworkConditions {
        &self.conditions
    }

    pub fn bytes_sent_this_second(&self) -> usize {
        self.bandwidth.bytes_this_second()
    }

    pub fn bandwidth_limit(&self) -> usize {
        self.bandwidth.limit()
    }

    pub fn queued_count(&self) -> usize {
        self.queues.total_len()
    }

    pub fn pending_reliable_count(&self) -> usize {
        self.reliable_sender.pending_count()
    }

    // Outgoing

    /// Enqueues a payload and drains whatever the budget allows right now.
    /// Returns the wire packets ready to hand to the transport.
    pub fn send(
        &mut self,
        payload: Vec<u8>,
        priority: Priority,
        reliability: Reliability,
        stream: StreamKey,
        delta: bool,
        now: Instant,
    ) -> Result<Vec<Vec<u8>>, ConnectionError> {
        self.enqueue(payload, priority, reliability, stream, delta, now);
        self.drain(now)
    }

    /// Enqueues without draining; callers batching many sends drain once.
    /// Returns the message index assigned on the stream, which reappears in
    /// `take_delivered` once a reliable frame is confirmed.
    pub fn enqueue(
        &mut self,
        payload: Vec<u8>,
        priority: Priority,
        reliability: Reliability,
        stream: StreamKey,
        delta: bool,
        now: Instant,
    ) -> MessageIndex {
        let index_slot = self.next_index_per_stream.entry(stream).or_insert(0);
        let message_index = *index_slot;
        *index_slot = index_slot.wrapping_add(1);

        self.queues.push(QueuedPacket {
            frame: DataFrame {
                delta,
                reliability,
                stream,
                message_index,
                payload,
            },
            priority,
            enqueued: now,
        });
        message_index
    }

    /// Queues a ping probe; the RTT sample is taken when the pong returns.
    pub fn send_ping(&mut self, now: Instant) {
        let nonce = self.next_ping_nonce;
        self.next_ping_nonce = self.next_ping_nonce.wrapping_add(1);
        self.pending_pings.insert(nonce, now);

        let mut writer = ByteWriter::with_capacity(4);
        writer.write_u32(nonce);
        self.control_queue.push((PacketType::Ping, writer.to_bytes()));
    }

    pub fn send_heartbeat(&mut self) {
        self.control_queue.push((PacketType::Heartbeat, Vec::new()));
    }

    pub fn send_disconnect(&mut self) {
        self.control_queue.push((PacketType::Disconnect, Vec::new()));
    }

    /// Drains queued packets under the byte budget, in priority order,
    /// dropping stale entries, aggregating small ones, and retransmitting
    /// overdue reliable frames. Returns finished wire packets.
    pub fn drain(&mut self, now: Instant) -> Result<Vec<Vec<u8>>, ConnectionError> {
        let mut out = Vec::new();

        // control packets bypass the budget: they are tiny and keep the
        // connection alive
        let control = std::mem::take(&mut self.control_queue);
        for (packet_type, body) in control {
            let packet = self.emit(packet_type, body, PacketFlags::default(), &[], now)?;
            out.push(packet);
        }

        if self.acks.take_ack_pending() {
            let (latest, bitfield) = self.acks.ack_bitfield();
            let mut writer = ByteWriter::with_capacity(8);
            writer.write_u32(latest);
            writer.write_u32(bitfield);
            let packet =
                self.emit(PacketType::Ack, writer.to_bytes(), PacketFlags::default(), &[], now)?;
            out.push(packet);
        }

        // overdue reliable frames are resent ahead of new traffic
        let timeout = self.conditions.resend_timeout();
        for (record, frame, _priority) in self.reliable_sender.due_for_resend(now, timeout) {
            if self.bandwidth.exhausted(now) {
                break;
            }
            self.stats.retransmissions += 1;
            self.stats.packets_lost += 1;
            self.conditions.record_packet_lost();
            let flags = PacketFlags {
                delta: frame.delta,
                ..PacketFlags::default()
            };
            let packet = self.emit(PacketType::Data, frame.to_bytes(), flags, &[record], now)?;
            out.push(packet);
        }

        'priorities: for priority in Priority::ALL {
            loop {
                let Some(head) = self.queues.front(priority) else {
                    break;
                };

                // stale entries are dropped, not sent
                if now.saturating_duration_since(head.enqueued) > STALE_PACKET_AGE {
                    self.queues.pop(priority);
                    self.stats.packets_dropped_stale += 1;
                    self.stats.packets_lost += 1;
                    continue;
                }

                if self.bandwidth.exhausted(now) {
                    break 'priorities;
                }

                let queued = match self.queues.pop(priority) {
                    Some(queued) => queued,
                    None => break,
                };
                let frame = queued.frame;

                let record = if frame.reliability.is_reliable() {
                    Some(self.reliable_sender.track(frame.clone(), priority, now))
                } else {
                    None
                };

                let frame_bytes = frame.to_bytes();
                if self.aggregation_enabled && priority.aggregatable() {
                    if !self.aggregator.fits(frame_bytes.len()) {
                        if let Some(packet) = self.flush_aggregate(now)? {
                            out.push(packet);
                        }
                    }
                    if self.aggregator.fits(frame_bytes.len()) {
                        self.aggregator.add(frame_bytes, now);
                        if let Some(record) = record {
                            self.aggregate_records.push(record);
                        }
                        continue;
                    }
                    // frame alone exceeds the aggregate budget: fall through
                }

                if let Some(packet) = self.flush_aggregate(now)? {
                    out.push(packet);
                }
                let flags = PacketFlags {
                    delta: frame.delta,
                    ..PacketFlags::default()
                };
                let records: Vec<RecordId> = record.into_iter().collect();
                let packet = self.emit(PacketType::Data, frame_bytes, flags, &records, now)?;
                out.push(packet);
            }
        }

        if self.aggregator.should_flush(now) {
            if let Some(packet) = self.flush_aggregate(now)? {
                out.push(packet);
            }
        }

        Ok(out)
    }

    fn flush_aggregate(&mut self, now: Instant) -> Result<Option<Vec<u8>>, ConnectionError> {
        let Some(body) = self.aggregator.flush() else {
            return Ok(None);
        };
        let records = std::mem::take(&mut self.aggregate_records);
        let flags = PacketFlags {
            aggregated: true,
            ..PacketFlags::default()
        };
        self.stats.aggregates_sent += 1;
        let packet = self.emit(PacketType::Aggregate, body, flags, &records, now)?;
        Ok(Some(packet))
    }

    fn emit(
        &mut self,
        packet_type: PacketType,
        body: Vec<u8>,
        mut flags: PacketFlags,
        records: &[RecordId],
        now: Instant,
    ) -> Result<Vec<u8>, ConnectionError> {
        let mut body = body;

        if self.compression_enabled && !body.is_empty() {
            if let Some(compressed) = self.encoder.encode(&body)? {
                self.stats.compressed_packets += 1;
                self.stats.compression_saved_bytes += (body.len() - compressed.len()) as u64;
                body = compressed.to_vec();
                flags.compressed = true;
            }
        }

        if let Some(cipher) = &self.cipher {
            cipher.encrypt(&mut body);
            flags.encrypted = true;
        }

        let sequence = self.acks.next_outgoing_sequence();
        let header = StandardHeader {
            packet_type,
            flags,
            sequence,
            ack: self.acks.ack_header(),
        };
        let bytes = frame_packet(&header, &body);

        self.acks.track_sent(sequence, now);
        for record in records {
            self.reliable_sender.note_sent(*record, sequence, now);
        }

        self.bandwidth.record_sent(bytes.len(), now);
        self.conditions.record_packet_sent();
        self.stats.packets_sent += 1;
        self.stats.bytes_sent += bytes.len() as u64;

        Ok(bytes)
    }

    // Incoming

    /// Parses one wire packet, applies acks and the receive-side reliability
    /// rules, and returns the payloads released to the application.
    pub fn process_incoming(
        &mut self,
        bytes: &[u8],
        now: Instant,
    ) -> Result<IncomingPackets, ConnectionError> {
        let (header, body) = parse_frame(bytes)?;

        self.stats.packets_received += 1;
        self.stats.bytes_received += bytes.len() as u64;

        // piggybacked ack of the remote's highest-seen sequence
        if header.ack != 0 {
            self.apply_ack(header.ack, 0, now);
        }

        if !self.acks.process_incoming_sequence(header.sequence) {
            self.stats.duplicates_received += 1;
            return Ok(IncomingPackets::default());
        }

        let mut body = body.to_vec();
        if header.flags.encrypted {
            match &self.cipher {
                Some(cipher) => cipher.decrypt(&mut body)?,
                None => return Err(ConnectionError::CipherMissing),
            }
        }
        if header.flags.compressed {
            body = self.decoder.decode(&body)?.to_vec();
        }

        let mut incoming = IncomingPackets::default();
        let mut reader = ByteReader::new(&body);
        match header.packet_type {
            PacketType::Data => {
                let frame = DataFrame::de(&mut reader)?;
                if frame.reliability.is_reliable() {
                    self.acks.mark_ack_pending();
                }
                self.route(frame, &mut incoming.messages);
            }
            PacketType::Aggregate => {
                for child in parse_aggregate(&body)? {
                    let mut child_reader = ByteReader::new(child);
                    let frame = DataFrame::de(&mut child_reader)?;
                    if frame.reliability.is_reliable() {
                        self.acks.mark_ack_pending();
                    }
                    self.route(frame, &mut incoming.messages);
                }
            }
            PacketType::Ack => {
                let latest = reader.read_u32()?;
                let bitfield = reader.read_u32()?;
                self.apply_ack(latest, bitfield, now);
            }
            PacketType::Ping => {
                let nonce = reader.read_u32()?;
                let mut writer = ByteWriter::with_capacity(4);
                writer.write_u32(nonce);
                self.control_queue.push((PacketType::Pong, writer.to_bytes()));
            }
            PacketType::Pong => {
                let nonce = reader.read_u32()?;
                if let Some(sent_at) = self.pending_pings.remove(&nonce) {
                    self.conditions.record_rtt(now.saturating_duration_since(sent_at));
                } else {
                    warn!("pong for unknown ping nonce {nonce}");
                }
            }
            PacketType::Heartbeat => {}
            PacketType::Disconnect => {
                incoming.closed = true;
            }
        }

        Ok(incoming)
    }

    fn apply_ack(&mut self, latest: u32, bitfield: u32, now: Instant) {
        for (sequence, rtt) in self.acks.process_ack(latest, bitfield, now) {
            if let Some(delivered) = self.reliable_sender.notify_acked(sequence) {
                self.delivered.push(delivered);
            }
            if let Some(rtt) = rtt {
                self.conditions.record_rtt(rtt);
            }
        }
    }

    /// Drains the (stream, message index) pairs whose reliable delivery has
    /// been confirmed since the last call. The sync layer uses these to
    /// promote snapshot baselines.
    pub fn take_delivered(&mut self) -> Vec<(StreamKey, MessageIndex)> {
        std::mem::take(&mut self.delivered)
    }

    fn route(&mut self, frame: DataFrame, messages: &mut Vec<ReceivedMessage>) {
        let mut deliver = |frame: DataFrame| {
            messages.push(ReceivedMessage {
                stream: frame.stream,
                delta: frame.delta,
                payload: frame.payload,
            });
        };

        match frame.reliability {
            Reliability::Unreliable => deliver(frame),
            Reliability::UnreliableSequenced => {
                if let Some(frame) = self.sequenced_unreliable_receiver.receive(frame) {
                    deliver(frame);
                }
            }
            Reliability::Reliable => {
                if let Some(frame) = self.unordered_receiver.receive(frame) {
                    deliver(frame);
                }
            }
            Reliability::ReliableOrdered => {
                for frame in self.ordered_receiver.receive(frame) {
                    deliver(frame);
                }
            }
            Reliability::ReliableSequenced => {
                if let Some(frame) = self.sequenced_reliable_receiver.receive(frame) {
                    deliver(frame);
                }
            }
        }
    }
}
