use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::Instant;

use log::{info, warn};

use realm_ai::TreeFactory;
use realm_shared::{BandwidthMonitor, ByteWriter, FieldValue};
use realm_storage::{ConnectionPool, DataKind, GameCache};
use realm_world::{
    AiAgent, BehaviorSystem, Combat, CombatSystem, Entity, HasStorage, Health, HealthRegenSystem,
    MovementSystem, NetworkBinding, NpcActor, RespawnSystem, Scheduler, Stats, Tag, TagCategory,
    Transform, World, WorldConfig,
};

use crate::connection::Connection;
use crate::error::ServerError;
use crate::events::{DisconnectReason, ServerEvent};
use crate::messages::InputMessage;
use crate::sync::SyncOrchestrator;
use crate::transport::{PacketReceiver, PacketSender};
use crate::user::{User, UserKey};

use super::server_config::ServerConfig;

/// The persistence stack the server drains and closes at shutdown:
/// write-behind cache first, then the pools under it.
pub struct PersistenceHandle {
    pub cache: Arc<GameCache<String, Vec<u8>>>,
    pub pools: Vec<Arc<ConnectionPool>>,
}

struct Shard {
    world: World,
    scheduler: Scheduler,
}

/// The realm world server core: shards with their schedulers, connected
/// users with their send pipelines, the sync orchestrator, and the
/// persistence hand-off. The surrounding process owns the socket accept
/// loop and the tick clock; it calls `tick` at the configured rate.
pub struct RealmServer {
    config: ServerConfig,
    shards: Vec<Shard>,
    users: HashMap<UserKey, User>,
    connections: HashMap<UserKey, Connection>,
    orchestrator: SyncOrchestrator,
    sender: Box<dyn PacketSender>,
    receiver: Box<dyn PacketReceiver>,
    global_bandwidth: BandwidthMonitor,
    persistence: Option<PersistenceHandle>,
    events: VecDeque<ServerEvent>,
    next_user_id: u64,
    shard_cursor: usize,
    accepting: bool,
}

impl RealmServer {
    /// Builds the server. `behavior_factory` is invoked once per shard so
    /// each world gets its own tree factory instance.
    pub fn new(
        config: ServerConfig,
        sender: Box<dyn PacketSender>,
        receiver: Box<dyn PacketReceiver>,
        persistence: Option<PersistenceHandle>,
        behavior_factory: impl Fn() -> TreeFactory<NpcActor>,
    ) -> Self {
        let world_config = WorldConfig {
            cell_size: config.world.cell_size,
        };

        let mut shards = Vec::with_capacity(config.world.shards.max(1));
        for _ in 0..config.world.shards.max(1) {
            let mut scheduler = Scheduler::new();
            scheduler.register_system(Box::new(MovementSystem));
            scheduler.register_system(Box::new(CombatSystem));
            scheduler.register_system(Box::new(HealthRegenSystem));
            scheduler.register_system(Box::new(BehaviorSystem::new(behavior_factory())));
            scheduler.register_system(Box::new(RespawnSystem));
            shards.push(Shard {
                world: World::new(&world_config),
                scheduler,
            });
        }

        let orchestrator = SyncOrchestrator::new(
            config.world.interest_k,
            config.world.max_view_distance,
            config.world.tick_hz,
        );

        info!(
            "realm server: {} shard(s) at {} Hz, port {}",
            shards.len(),
            config.world.tick_hz,
            config.network.port
        );

        Self {
            shards,
            users: HashMap::new(),
            connections: HashMap::new(),
            orchestrator,
            sender,
            receiver,
            global_bandwidth: BandwidthMonitor::new(config.network.bandwidth_limit_global_bps / 8),
            persistence,
            events: VecDeque::new(),
            next_user_id: 1,
            shard_cursor: 0,
            accepting: true,
            config,
        }
    }

    pub fn shard_count(&self) -> usize {
        self.shards.len()
    }

    pub fn world(&self, shard: usize) -> Option<&World> {
        self.shards.get(shard).map(|shard| &shard.world)
    }

    pub fn world_mut(&mut self, shard: usize) -> Option<&mut World> {
        self.shards.get_mut(shard).map(|shard| &mut shard.world)
    }

    pub fn connection(&self, user: UserKey) -> Option<&Connection> {
        self.connections.get(&user)
    }

    pub fn connection_mut(&mut self, user: UserKey) -> Option<&mut Connection> {
        self.connections.get_mut(&user)
    }

    pub fn user(&self, user: UserKey) -> Option<&User> {
        self.users.get(&user)
    }

    pub fn connected_count(&self) -> usize {
        self.connections.len()
    }

    pub fn drain_events(&mut self) -> Vec<ServerEvent> {
        self.events.drain(..).collect()
    }

    // Connections

    /// Registers a new connection, assigning it to a shard round-robin.
    pub fn connect(&mut self) -> Result<UserKey, ServerError> {
        if !self.accepting {
            return Err(ServerError::ShuttingDown);
        }

        let user_key = UserKey::from_u64(self.next_user_id);
        self.next_user_id += 1;

        let shard = self.shard_cursor % self.shards.len();
        self.shard_cursor = self.shard_cursor.wrapping_add(1);

        let mut connection_config = self.config.connection.clone();
        connection_config.bandwidth_limit_bytes_per_second =
            self.config.network.bandwidth_limit_per_connection_bps / 8;
        connection_config.enable_aggregation = self.config.network.enable_aggregation;
        connection_config.enable_compression = self.config.network.enable_compression;
        connection_config.adaptation_interval = self.config.network.adaptation_interval;

        let connection = Connection::new(&connection_config, user_key)?;
        self.users.insert(user_key, User::new(user_key, shard));
        self.connections.insert(user_key, connection);
        self.events.push_back(ServerEvent::connected(user_key));
        info!("user {} connected to shard {shard}", user_key.to_u64());
        Ok(user_key)
    }

    /// Closes a connection. The user's owned entities transition to the
    /// unowned state and stay in the world; their persisted state remains
    /// cached for the reconnect window.
    pub fn disconnect(&mut self, user_key: UserKey, reason: DisconnectReason) {
        let Some(user) = self.users.remove(&user_key) else {
            return;
        };
        if let Some(mut connection) = self.connections.remove(&user_key) {
            connection.pipeline.send_disconnect();
            if let Ok(packets) = connection.pipeline.drain(Instant::now()) {
                for packet in packets {
                    let _ = self.sender.send(user_key, &packet);
                }
            }
        }

        if let (Some(avatar), Some(shard)) = (user.avatar, self.shards.get_mut(user.shard)) {
            if let Some(binding) = shard.world.get_component_mut::<NetworkBinding>(avatar) {
                binding.owner_connection = None;
            }
        }

        self.events
            .push_back(ServerEvent::disconnected(user_key, reason));
        info!("user {} disconnected: {reason:?}", user_key.to_u64());
    }

    // Spawning

    /// Creates a player avatar owned by `user_key` in the user's shard.
    pub fn spawn_avatar(
        &mut self,
        user_key: UserKey,
        name: &str,
        position: [f32; 3],
    ) -> Result<Entity, ServerError> {
        let Some(user) = self.users.get_mut(&user_key) else {
            return Err(ServerError::UnknownUser {
                user: user_key.to_u64(),
            });
        };
        let shard_index = user.shard;
        let shard = &mut self.shards[shard_index];
        if shard.world.entity_count() >= self.config.world.max_entities_per_shard {
            return Err(ServerError::ShardFull { shard: shard_index });
        }

        let entity = shard.world.create_entity();
        shard.world.add_component(entity, Transform::at(position));
        let mut health = Health::full(100.0);
        health.regen_per_second = 1.0;
        health.respawn_delay_ticks = self.config.world.tick_hz * 5;
        health.spawn_point = position;
        shard.world.add_component(entity, health);
        shard.world.add_component(entity, Combat::new(5.0, 10.0, self.config.world.tick_hz));
        shard.world.add_component(entity, Stats::default());
        shard
            .world
            .add_component(entity, Tag::new(name, TagCategory::Player));
        shard.world.add_component(
            entity,
            NetworkBinding {
                owner_connection: Some(user_key.to_u64()),
                ..NetworkBinding::default()
            },
        );
        shard.world.flush_spatial();

        user.avatar = Some(entity);
        Ok(entity)
    }

    /// Creates an AI-driven actor in `shard`.
    pub fn spawn_npc(
        &mut self,
        shard_index: usize,
        name: &str,
        category: TagCategory,
        position: [f32; 3],
        agent: AiAgent,
    ) -> Result<Entity, ServerError> {
        let Some(shard) = self.shards.get_mut(shard_index) else {
            return Err(ServerError::ShardFull { shard: shard_index });
        };
        if shard.world.entity_count() >= self.config.world.max_entities_per_shard {
            return Err(ServerError::ShardFull { shard: shard_index });
        }

        let entity = shard.world.create_entity();
        shard.world.add_component(entity, Transform::at(position));
        let mut health = Health::full(50.0);
        health.spawn_point = position;
        shard.world.add_component(entity, health);
        shard
            .world
            .add_component(entity, Combat::new(3.0, 5.0, self.config.world.tick_hz));
        shard.world.add_component(entity, Stats::default());
        shard.world.add_component(entity, Tag::new(name, category));
        shard.world.add_component(entity, agent);
        shard
            .world
            .add_component(entity, NetworkBinding::default());
        shard.world.flush_spatial();
        Ok(entity)
    }

    // The tick

    /// One full server tick: drain inbound packets, apply inputs, run the
    /// shard schedulers, persist dirty components, synchronize every
    /// connection, and reap dead connections.
    pub fn tick(&mut self, dt: f32, now: Instant) {
        self.read_incoming(now);
        self.apply_inputs();

        for shard in &mut self.shards {
            shard.scheduler.tick(&mut shard.world, dt);
        }

        self.persist_dirty_components();
        self.synchronize_connections(now);
        self.reap_dead_connections();

        if let Some(shard) = self.shards.first() {
            self.events.push_back(ServerEvent::TickCompleted {
                tick: shard.world.tick(),
            });
        }
    }

    fn read_incoming(&mut self, now: Instant) {
        let mut to_drop: Vec<UserKey> = Vec::new();
        loop {
            match self.receiver.receive() {
                Ok(Some((user_key, payload))) => {
                    let Some(user) = self.users.get(&user_key) else {
                        warn!("packet from unknown user {}", user_key.to_u64());
                        continue;
                    };
                    let tick = self.shards[user.shard].world.tick();
                    let Some(connection) = self.connections.get_mut(&user_key) else {
                        continue;
                    };
                    match connection.process_incoming(&payload, tick, now) {
                        Ok(false) => {}
                        Ok(true) => to_drop.push(user_key),
                        Err(error) => {
                            warn!(
                                "user {}: dropping malformed packet: {error}",
                                user_key.to_u64()
                            );
                        }
                    }
                }
                Ok(None) => break,
                Err(_) => break,
            }
        }
        for user_key in to_drop {
            self.disconnect(user_key, DisconnectReason::RemoteClosed);
        }
    }

    fn apply_inputs(&mut self) {
        for (user_key, connection) in &mut self.connections {
            let Some(user) = self.users.get(user_key) else {
                continue;
            };
            let Some(avatar) = user.avatar else {
                connection.drain_new_inputs();
                continue;
            };
            let world = &mut self.shards[user.shard].world;

            for input in connection.drain_new_inputs() {
                match input {
                    InputMessage::Move { direction } => {
                        let speed = world
                            .get_component::<Stats>(avatar)
                            .map(|stats| stats.move_speed)
                            .unwrap_or(1.0);
                        let dead = world
                            .get_component::<Health>(avatar)
                            .map(Health::is_dead)
                            .unwrap_or(true);
                        if dead {
                            continue;
                        }
                        if let Some(transform) = world.get_component_mut::<Transform>(avatar) {
                            let length = (direction[0] * direction[0]
                                + direction[1] * direction[1]
                                + direction[2] * direction[2])
                                .sqrt();
                            transform.velocity = if length > 1e-3 {
                                [
                                    direction[0] / length * speed,
                                    direction[1] / length * speed,
                                    direction[2] / length * speed,
                                ]
                            } else {
                                [0.0, 0.0, 0.0]
                            };
                        }
                    }
                    InputMessage::Target { entity } => {
                        if let Some(combat) = world.get_component_mut::<Combat>(avatar) {
                            combat.target = if entity == 0 {
                                None
                            } else {
                                Some(Entity::from_u64(entity))
                            };
                        }
                    }
                    InputMessage::AckTick { tick } => {
                        if let Some(binding) =
                            world.get_component_mut::<NetworkBinding>(avatar)
                        {
                            binding.last_ack_tick = binding.last_ack_tick.max(tick);
                        }
                    }
                }
            }
        }
    }

    /// Components marked persisted that were mutated this tick enter the
    /// cache dirty; the write-behind worker flushes them later.
    fn persist_dirty_components(&mut self) {
        let Some(persistence) = &self.persistence else {
            return;
        };

        for (shard_index, shard) in self.shards.iter_mut().enumerate() {
            let mut dirty: Vec<Entity> = Vec::new();
            dirty.extend(HasStorage::<Transform>::storage_mut(&mut shard.world).take_dirty());
            dirty.extend(HasStorage::<Health>::storage_mut(&mut shard.world).take_dirty());
            dirty.extend(HasStorage::<Stats>::storage_mut(&mut shard.world).take_dirty());
            dirty.sort_unstable();
            dirty.dedup();

            for entity in dirty {
                let Some(record) = persisted_record(&shard.world, entity) else {
                    continue;
                };
                let key = format!("entity:{shard_index}:{}", entity.to_u64());
                if let Err(error) =
                    persistence
                        .cache
                        .write(&key, record, DataKind::OnlineEntity, true)
                {
                    warn!("persistence write for {key} failed: {error}");
                }
            }
        }
    }

    fn synchronize_connections(&mut self, now: Instant) {
        let mut failed: Vec<UserKey> = Vec::new();

        for (user_key, connection) in &mut self.connections {
            let Some(user) = self.users.get(user_key) else {
                continue;
            };
            let world = &mut self.shards[user.shard].world;

            let packets =
                match self
                    .orchestrator
                    .sync_connection(world, connection, user.avatar, now)
                {
                    Ok(packets) => packets,
                    Err(error) => {
                        warn!("sync failed for user {}: {error}", user_key.to_u64());
                        continue;
                    }
                };

            for packet in packets {
                if self.global_bandwidth.exhausted(now) {
                    // global budget spent: the rest stays queued for the
                    // next drain
                    break;
                }
                self.global_bandwidth.record_sent(packet.len(), now);
                if self.sender.send(*user_key, &packet).is_err() {
                    failed.push(*user_key);
                    break;
                }
            }
        }

        for user_key in failed {
            self.disconnect(user_key, DisconnectReason::TransportFailed);
        }
    }

    fn reap_dead_connections(&mut self) {
        let timed_out: Vec<UserKey> = self
            .connections
            .iter()
            .filter(|(_, connection)| connection.should_drop())
            .map(|(user_key, _)| *user_key)
            .collect();
        for user_key in timed_out {
            self.disconnect(user_key, DisconnectReason::TimedOut);
        }
    }

    // Shutdown

    /// Stops accepting connections, closes every connection, drains the
    /// write-behind cache up to `deadline`, then closes the pools. A clean
    /// drain returns Ok; otherwise the count of entries left dirty, which
    /// the embedding process maps to a non-zero exit code.
    pub fn shutdown(&mut self, deadline: Instant) -> Result<(), usize> {
        info!("realm server: shutting down");
        self.accepting = false;

        let users: Vec<UserKey> = self.connections.keys().copied().collect();
        for user_key in users {
            self.disconnect(user_key, DisconnectReason::Kicked);
        }

        let mut result = Ok(());
        if let Some(persistence) = self.persistence.take() {
            persistence.cache.shutdown();
            result = persistence.cache.drain(deadline);
            for pool in &persistence.pools {
                pool.shutdown();
            }
        }
        result
    }
}

/// Serializes the persisted slice of one entity (transform, health,
/// stats) into a storable record.
fn persisted_record(world: &World, entity: Entity) -> Option<Vec<u8>> {
    let transform = world.get_component::<Transform>(entity)?;

    let mut writer = ByteWriter::new();
    writer.write_u64(entity.to_u64());
    FieldValue::Vec3(transform.position).ser(&mut writer);
    if let Some(health) = world.get_component::<Health>(entity) {
        FieldValue::Float(health.current).ser(&mut writer);
        FieldValue::Float(health.maximum).ser(&mut writer);
    }
    if let Some(stats) = world.get_component::<Stats>(entity) {
        FieldValue::Float(stats.attack_power).ser(&mut writer);
        FieldValue::Float(stats.defense).ser(&mut writer);
        FieldValue::Float(stats.move_speed).ser(&mut writer);
    }
    Some(writer.to_bytes())
}
