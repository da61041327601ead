use std::collections::HashSet;
use std::time::Instant;

use log::warn;

use realm_shared::{
    apply_delta, create_delta, ConnectionError, DeltaPacket, EntitySnapshot, FieldValue, Priority,
    Reliability, Tick,
};
use realm_world::{Combat, Entity, Health, NetworkBinding, Tag, TagCategory, Transform, World};

use crate::connection::{Connection, CONTROL_STREAM};
use crate::interest::{compute_interest, InterestEntry};
use crate::messages::SyncMessage;

/// Builds the replicated snapshot of one entity at `tick`. Only entities
/// carrying a network binding are replicated: the binding is what ties a
/// replicated entity into the sync layer.
pub fn snapshot_entity(world: &World, entity: Entity, tick: Tick) -> Option<EntitySnapshot> {
    world.get_component::<NetworkBinding>(entity)?;
    let transform = world.get_component::<Transform>(entity)?;

    let mut snapshot = EntitySnapshot::new(tick);
    snapshot.set("position", FieldValue::Vec3(transform.position));
    snapshot.set("velocity", FieldValue::Vec3(transform.velocity));

    if let Some(health) = world.get_component::<Health>(entity) {
        snapshot.set("hp", FieldValue::Float(health.current));
        snapshot.set("max_hp", FieldValue::Float(health.maximum));
        snapshot.set("dead", FieldValue::Bool(health.is_dead()));
    }
    if let Some(combat) = world.get_component::<Combat>(entity) {
        let target = combat.target.map(Entity::to_u64).unwrap_or(0);
        snapshot.set("target", FieldValue::UInt(target));
    }
    if let Some(tag) = world.get_component::<Tag>(entity) {
        snapshot.set("name", FieldValue::Str(tag.name.clone()));
        snapshot.set("category", FieldValue::UInt(tag.category.code() as u64));
    }

    Some(snapshot)
}

/// A delta touching nothing but movement fields rides the sequenced
/// channel: only the newest position matters. Anything else (combat,
/// health, naming) must arrive, so it goes reliable.
fn reliability_for_delta(delta: &DeltaPacket) -> Reliability {
    let movement_only = delta
        .changes
        .iter()
        .all(|(name, _)| name == "position" || name == "velocity");
    if movement_only {
        Reliability::ReliableSequenced
    } else {
        Reliability::Reliable
    }
}

fn priority_for(entry: &InterestEntry, category: Option<TagCategory>) -> Priority {
    match category {
        Some(TagCategory::Player) | Some(TagCategory::Boss) => Priority::High,
        _ if entry.distance <= 20.0 => Priority::High,
        _ if entry.distance <= 100.0 => Priority::Normal,
        _ => Priority::Low,
    }
}

/// Walks each connection's interest set after the systems have run and
/// turns world changes into prioritized update packets.
pub struct SyncOrchestrator {
    interest_k: usize,
    max_view_distance: f32,
    tick_hz: u32,
    /// The tick most recently synchronized, recorded for lag compensation.
    last_synced_tick: Tick,
}

impl SyncOrchestrator {
    pub fn new(interest_k: usize, max_view_distance: f32, tick_hz: u32) -> Self {
        Self {
            interest_k,
            max_view_distance,
            tick_hz: tick_hz.max(1),
            last_synced_tick: 0,
        }
    }

    pub fn last_synced_tick(&self) -> Tick {
        self.last_synced_tick
    }

    /// Synchronizes one connection for the world's current tick and
    /// returns the wire packets to hand to the transport.
    pub fn sync_connection(
        &mut self,
        world: &mut World,
        connection: &mut Connection,
        avatar: Option<Entity>,
        now: Instant,
    ) -> Result<Vec<Vec<u8>>, ConnectionError> {
        let tick = world.tick();
        self.last_synced_tick = tick;

        // confirmed deliveries first: deltas built this tick should use
        // the freshest acknowledged baselines
        connection.apply_delivery_confirmations();

        let Some(avatar) = avatar else {
            // no avatar yet: nothing to observe, but control traffic and
            // retransmissions still flow
            return connection.pipeline.drain(now);
        };
        let Some(center) = world
            .get_component::<Transform>(avatar)
            .map(|transform| transform.position)
        else {
            return connection.pipeline.drain(now);
        };

        let interest = compute_interest(
            world,
            avatar,
            center,
            self.interest_k,
            self.max_view_distance,
        );
        let current: HashSet<Entity> = interest.iter().map(|entry| entry.entity).collect();

        // entities that left interest this tick despawn reliable-ordered
        let previous = std::mem::take(&mut connection.interest);
        for entity in previous {
            if current.contains(&entity) {
                continue;
            }
            let payload = SyncMessage::Despawn {
                entity: entity.to_u64(),
            }
            .to_bytes();
            connection.pipeline.enqueue(
                payload,
                Priority::High,
                Reliability::ReliableOrdered,
                CONTROL_STREAM,
                false,
                now,
            );
            connection.forget_entity(entity);
        }

        for entry in &interest {
            let entity = entry.entity;
            let rate = entry.update_rate_hz.min(connection.quality.update_rate_hz);
            if rate == 0 {
                continue;
            }
            let interval_ticks = (self.tick_hz / rate as u32).max(1);
            if let Some(last) = connection.last_update_tick.get(&entity) {
                if tick.saturating_sub(*last) < interval_ticks {
                    continue;
                }
            }

            let Some(snapshot) = snapshot_entity(world, entity, tick) else {
                continue;
            };
            let category = world
                .get_component::<Tag>(entity)
                .map(|tag| tag.category);
            let priority = priority_for(entry, category);

            match connection.baselines.acked(entity.to_u64()).cloned() {
                Some(baseline) => {
                    let delta = create_delta(&baseline, &snapshot);
                    if delta.is_empty() {
                        connection.last_update_tick.insert(entity, tick);
                        continue;
                    }
                    // record what the remote will reconstruct, so both ends
                    // agree exactly once this delta is acknowledged
                    let reconstructed = match apply_delta(&baseline, &delta) {
                        Ok(reconstructed) => reconstructed,
                        Err(error) => {
                            warn!(
                                "sync: self-application of delta for entity {} failed: {error}",
                                entity.to_u64()
                            );
                            continue;
                        }
                    };
                    let reliability = reliability_for_delta(&delta);
                    let payload = SyncMessage::Delta {
                        entity: entity.to_u64(),
                        delta,
                    }
                    .to_bytes();
                    connection.baselines.record_sent(entity.to_u64(), reconstructed);
                    connection.enqueue_update(
                        entity, tick, payload, priority, reliability, true, now,
                    );
                }
                None => {
                    // no acknowledged baseline: full snapshot, baseline
                    // pending until the client confirms it
                    let payload = SyncMessage::FullSnapshot {
                        entity: entity.to_u64(),
                        snapshot: snapshot.clone(),
                    }
                    .to_bytes();
                    connection.baselines.record_sent(entity.to_u64(), snapshot);
                    connection.enqueue_update(
                        entity,
                        tick,
                        payload,
                        priority,
                        Reliability::Reliable,
                        false,
                        now,
                    );
                }
            }
            connection.last_update_tick.insert(entity, tick);
        }

        connection.interest = current.into_iter().collect();
        connection.adapt(now);
        connection.truncate_input_history(tick, self.tick_hz);
        connection.pipeline.drain(now)
    }

    /// Sends a transient effect attached to an entity: fire-and-forget at
    /// low priority, the class of traffic that is dropped first under
    /// back-pressure.
    pub fn send_effect(
        &self,
        connection: &mut Connection,
        entity: Entity,
        payload: Vec<u8>,
        now: Instant,
    ) {
        let stream = connection.stream_for(entity);
        connection
            .pipeline
            .enqueue(payload, Priority::Low, Reliability::Unreliable, stream, false, now);
    }
}
