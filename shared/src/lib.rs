//! # Realm Shared
//! Wire protocol, reliability channels and delta sync shared between the
//! realm server crates.

#![deny(trivial_numeric_casts, unstable_features, unused_import_braces)]

#[macro_use]
extern crate cfg_if;

pub use realm_serde::{
    pack_float, pack_vec3, unpack_float, unpack_vec3, ByteReader, ByteWriter, QuantizeError,
    SerdeErr, MTU_SIZE_BYTES,
};

mod backends;
mod connection;
mod constants;
mod pipeline;
mod sequence;
mod sequence_list;
mod snapshot;
mod types;

pub use backends::Timer;
pub use connection::{
    ack_manager::AckManager,
    bandwidth_monitor::BandwidthMonitor,
    cipher::PacketCipher,
    compression_config::{CompressionConfig, CompressionMode},
    connection_config::ConnectionConfig,
    decoder::Decoder,
    encoder::Encoder,
    error::{ConnectionError, DecoderError, EncoderError},
    network_conditions::NetworkConditions,
    packet_type::PacketType,
    standard_header::{
        frame_packet, parse_frame, PacketFlags, StandardHeader, HEADER_BYTES, LENGTH_PREFIX_BYTES,
    },
};
pub use constants::{
    AGGREGATE_CHILD_HEADER_BYTES, AGGREGATE_COUNT_BYTES, AGGREGATE_FLUSH_AGE, AGGREGATE_FLUSH_FILL,
    AGGREGATE_MAX_BYTES, MIN_RESEND_TIMEOUT, RTT_RESEND_FACTOR, RTT_SAMPLE_WINDOW,
    STALE_PACKET_AGE,
};
pub use pipeline::{
    adaptive::{AdaptiveQuality, QualitySettings},
    aggregator::{parse_aggregate, PacketAggregator},
    receivers::{
        ordered_reliable_receiver::OrderedReliableReceiver, sequenced_receiver::SequencedReceiver,
        unordered_reliable_receiver::UnorderedReliableReceiver,
    },
    send_pipeline::{IncomingPackets, ReceivedMessage, SendPipeline},
    send_queue::{DataFrame, PriorityQueues, QueuedPacket},
    senders::reliable_sender::{RecordId, ReliableSender},
    stats::ConnectionStats,
};
pub use sequence::{
    packet_seq_diff, packet_seq_greater_than, packet_seq_less_than, sequence_greater_than,
    sequence_less_than, wrapping_diff,
};
pub use sequence_list::SequenceList;
pub use snapshot::{
    baseline::{BaselineStore, NetEntityId},
    delta::{apply_delta, create_delta, DeltaError, DeltaPacket, FieldChange},
    field_value::FieldValue,
    snapshot::EntitySnapshot,
};
pub use types::{MessageIndex, PacketSeq, Priority, Reliability, StreamKey, Tick};
