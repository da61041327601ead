use std::collections::HashMap;
use std::time::Instant;

use realm_server::{InputMessage, SyncMessage, UserKey};
use realm_shared::{
    apply_delta, ConnectionConfig, ConnectionError, DeltaError, EntitySnapshot, Priority,
    Reliability, SendPipeline,
};

/// The remote half of one connection: a send pipeline plus the applied
/// entity state, standing in for a real game client.
pub struct TestClient {
    pub user: UserKey,
    pipeline: SendPipeline,
    /// Entity state as this client has reconstructed it.
    pub entities: HashMap<u64, EntitySnapshot>,
    /// Entities the server has despawned for us, in arrival order.
    pub despawned: Vec<u64>,
    /// Deltas rejected because their baseline tick did not match; each one
    /// would trigger a full-snapshot request.
    pub baseline_mismatches: u32,
    /// Count of delta messages applied (not full snapshots).
    pub deltas_applied: u32,
    /// Count of full snapshots applied.
    pub snapshots_applied: u32,
    outgoing: Vec<Vec<u8>>,
}

impl TestClient {
    pub fn new(user: UserKey) -> Self {
        let config = ConnectionConfig {
            enable_aggregation: false,
            ..ConnectionConfig::default()
        };
        Self {
            user,
            pipeline: SendPipeline::new(&config).expect("default pipeline config is valid"),
            entities: HashMap::new(),
            despawned: Vec::new(),
            baseline_mismatches: 0,
            deltas_applied: 0,
            snapshots_applied: 0,
            outgoing: Vec::new(),
        }
    }

    /// Feeds one wire packet from the server into the client's pipeline
    /// and applies whatever sync messages it releases.
    pub fn receive_packet(&mut self, bytes: &[u8], now: Instant) -> Result<(), ConnectionError> {
        let incoming = self.pipeline.process_incoming(bytes, now)?;
        for message in incoming.messages {
            match SyncMessage::from_bytes(&message.payload) {
                Ok(SyncMessage::FullSnapshot { entity, snapshot }) => {
                    self.snapshots_applied += 1;
                    self.entities.insert(entity, snapshot);
                }
                Ok(SyncMessage::Delta { entity, delta }) => {
                    match self.entities.get(&entity) {
                        Some(baseline) => match apply_delta(baseline, &delta) {
                            Ok(next) => {
                                self.deltas_applied += 1;
                                self.entities.insert(entity, next);
                            }
                            Err(DeltaError::BaselineMismatch { .. }) => {
                                // discard and (in a real client) request a
                                // full snapshot
                                self.baseline_mismatches += 1;
                            }
                            Err(_) => {
                                self.baseline_mismatches += 1;
                            }
                        },
                        None => {
                            self.baseline_mismatches += 1;
                        }
                    }
                }
                Ok(SyncMessage::Despawn { entity }) => {
                    self.entities.remove(&entity);
                    self.despawned.push(entity);
                }
                Err(_) => {
                    // not a sync message; ignore (tests only send sync)
                }
            }
        }
        Ok(())
    }

    /// Queues an input message for the server.
    pub fn send_input(&mut self, input: InputMessage, now: Instant) {
        self.pipeline
            .enqueue(input.to_bytes(), Priority::High, Reliability::Reliable, 1, false, now);
    }

    /// Drains the pipeline (acks included) into the outgoing buffer.
    pub fn drain(&mut self, now: Instant) {
        if let Ok(packets) = self.pipeline.drain(now) {
            self.outgoing.extend(packets);
        }
    }

    pub fn take_outgoing(&mut self) -> Vec<Vec<u8>> {
        std::mem::take(&mut self.outgoing)
    }

    /// Convenience: the position this client currently holds for `entity`.
    pub fn position_of(&self, entity: u64) -> Option<[f32; 3]> {
        match self.entities.get(&entity)?.get("position") {
            Some(realm_shared::FieldValue::Vec3(position)) => Some(*position),
            _ => None,
        }
    }
}
