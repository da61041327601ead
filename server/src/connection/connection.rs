use std::collections::{HashMap, VecDeque};
use std::time::Instant;

use log::warn;

use realm_shared::{
    AdaptiveQuality, BaselineStore, ConnectionConfig, ConnectionError, IncomingPackets,
    MessageIndex, Priority, QualitySettings, Reliability, SendPipeline, StreamKey, Tick, Timer,
};
use realm_world::Entity;

use crate::messages::InputMessage;
use crate::user::UserKey;

/// The control stream: despawn and other entity-lifecycle messages travel
/// here reliable-ordered.
pub const CONTROL_STREAM: StreamKey = 0;

/// Input events are kept this long for lag compensation.
const INPUT_HISTORY_TICKS_PER_SECOND: u32 = 2;

/// Everything the server tracks per connected client: the send pipeline,
/// snapshot baselines, the current interest set, adaptive quality state,
/// and buffered inputs.
pub struct Connection {
    pub user_key: UserKey,
    /// Rings once nothing has been heard from the client for the
    /// configured disconnection timeout.
    liveness: Timer,
    pub pipeline: SendPipeline,
    pub baselines: BaselineStore,

    /// Entities currently in this observer's interest set.
    pub interest: Vec<Entity>,
    /// Wire stream allocated to each replicated entity.
    streams: HashMap<Entity, StreamKey>,
    next_stream: StreamKey,
    /// Sent-but-unacknowledged entity updates: (stream, message index) to
    /// (entity, tick), resolved into baseline promotions on delivery.
    in_flight_updates: HashMap<(StreamKey, MessageIndex), (u64, Tick)>,
    /// Last tick each interest entity was updated, for cadence gating.
    pub last_update_tick: HashMap<Entity, Tick>,

    pub quality: QualitySettings,
    adaptation_timer: Timer,

    /// Inputs not yet applied by the tick thread, oldest first.
    pending_inputs: VecDeque<InputMessage>,
    /// Applied inputs kept for the lag-compensation window, with the tick
    /// they arrived on.
    pub input_history: VecDeque<(Tick, InputMessage)>,
    pub manual_disconnect: bool,
}

impl Connection {
    pub fn new(config: &ConnectionConfig, user_key: UserKey) -> Result<Self, ConnectionError> {
        let mut pipeline = SendPipeline::new(config)?;
        pipeline.set_bandwidth_limit(config.bandwidth_limit_bytes_per_second);
        Ok(Self {
            user_key,
            liveness: Timer::new(config.disconnection_timeout_duration),
            pipeline,
            baselines: BaselineStore::new(),
            interest: Vec::new(),
            streams: HashMap::new(),
            next_stream: CONTROL_STREAM + 1,
            in_flight_updates: HashMap::new(),
            last_update_tick: HashMap::new(),
            quality: QualitySettings::best(),
            adaptation_timer: Timer::new(config.adaptation_interval),
            pending_inputs: VecDeque::new(),
            input_history: VecDeque::new(),
            manual_disconnect: false,
        })
    }

    /// The wire stream carrying this entity's state updates.
    pub fn stream_for(&mut self, entity: Entity) -> StreamKey {
        if let Some(stream) = self.streams.get(&entity) {
            return *stream;
        }
        let stream = self.next_stream;
        self.next_stream = self.next_stream.wrapping_add(1).max(CONTROL_STREAM + 1);
        self.streams.insert(entity, stream);
        stream
    }

    /// Enqueues one entity update and records it for baseline promotion
    /// when its delivery is confirmed.
    pub fn enqueue_update(
        &mut self,
        entity: Entity,
        tick: Tick,
        payload: Vec<u8>,
        priority: Priority,
        reliability: Reliability,
        delta: bool,
        now: Instant,
    ) {
        let stream = self.stream_for(entity);
        let index = self
            .pipeline
            .enqueue(payload, priority, reliability, stream, delta, now);
        if reliability.is_reliable() {
            self.in_flight_updates
                .insert((stream, index), (entity.to_u64(), tick));
        }
    }

    /// Promotes baselines for every update the remote end has confirmed.
    pub fn apply_delivery_confirmations(&mut self) {
        for delivered in self.pipeline.take_delivered() {
            if let Some((entity, tick)) = self.in_flight_updates.remove(&delivered) {
                self.baselines.acknowledge(entity, tick);
            }
        }
    }

    /// Processes one raw packet, buffering any inputs it carried. Returns
    /// whether the remote end closed the connection.
    pub fn process_incoming(
        &mut self,
        bytes: &[u8],
        tick: Tick,
        now: Instant,
    ) -> Result<bool, ConnectionError> {
        let IncomingPackets { messages, closed } = self.pipeline.process_incoming(bytes, now)?;
        // anything parseable from the client counts as a sign of life
        self.liveness.reset_at(now);

        for message in messages {
            match InputMessage::from_bytes(&message.payload) {
                Ok(input) => {
                    self.pending_inputs.push_back(input);
                    self.input_history.push_back((tick, input));
                }
                Err(error) => {
                    warn!(
                        "user {}: undecodable input payload ({error})",
                        self.user_key.to_u64()
                    );
                }
            }
        }
        Ok(closed)
    }

    /// Inputs received since the last drain, oldest first. The history
    /// copy is retained for the lag-compensation window.
    pub fn drain_new_inputs(&mut self) -> Vec<InputMessage> {
        self.pending_inputs.drain(..).collect()
    }

    /// Truncates input history older than two seconds of ticks.
    pub fn truncate_input_history(&mut self, tick: Tick, tick_hz: u32) {
        let keep_ticks = tick_hz * INPUT_HISTORY_TICKS_PER_SECOND;
        while let Some((received, _)) = self.input_history.front() {
            if tick.saturating_sub(*received) > keep_ticks {
                self.input_history.pop_front();
            } else {
                break;
            }
        }
    }

    /// Forgets an entity that left interest: its baseline, stream and
    /// cadence bookkeeping go with it.
    pub fn forget_entity(&mut self, entity: Entity) {
        self.baselines.forget(entity.to_u64());
        self.last_update_tick.remove(&entity);
        if let Some(stream) = self.streams.remove(&entity) {
            self.in_flight_updates
                .retain(|(in_flight_stream, _), _| *in_flight_stream != stream);
        }
    }

    /// Re-evaluates quality settings when the adaptation interval elapses.
    pub fn adapt(&mut self, now: Instant) {
        if !self.adaptation_timer.ringing_at(now) {
            return;
        }
        self.adaptation_timer.reset_at(now);

        let quality = AdaptiveQuality::evaluate(
            self.pipeline.conditions(),
            self.pipeline.bytes_sent_this_second(),
            self.pipeline.bandwidth_limit(),
        );
        if quality != self.quality {
            self.quality = quality;
            self.pipeline.set_compression_enabled(quality.enable_compression);
            self.pipeline.set_aggregation_enabled(quality.enable_aggregation);
        }
    }

    /// Whether this connection should be reaped: the client has gone
    /// silent past the timeout, or the server marked it for removal.
    pub fn should_drop(&self) -> bool {
        self.liveness.ringing() || self.manual_disconnect
    }
}
