use std::collections::{HashMap, HashSet};

use log::warn;

use realm_ai::{AiActor, BehaviorTree, TreeFactory};

use crate::component::entities_with_3;
use crate::components::{AiAgent, Combat, Health, Tag, Transform};
use crate::entity::Entity;
use crate::error::WorldError;
use crate::scheduler::System;
use crate::world::World;

/// The world as one AI-driven entity sees it for one tick, plus the
/// commands its tree issued. Trees run against this snapshot so tree
/// instances stay `'static` while the world is borrowed elsewhere.
pub struct NpcActor {
    pub entity: u64,
    position: [f32; 3],
    health_fraction: f32,
    attack_ready: bool,
    hostiles: Vec<(u64, [f32; 3])>,
    move_request: Option<[f32; 3]>,
    attack_request: Option<u64>,
}

impl AiActor for NpcActor {
    fn position(&self) -> [f32; 3] {
        self.position
    }

    fn find_hostile_within(&self, radius: f32) -> Option<u64> {
        let mut best: Option<(u64, f32)> = None;
        for (entity, position) in &self.hostiles {
            let dx = position[0] - self.position[0];
            let dy = position[1] - self.position[1];
            let dz = position[2] - self.position[2];
            let distance = (dx * dx + dy * dy + dz * dz).sqrt();
            if distance <= radius && best.map(|(_, d)| distance < d).unwrap_or(true) {
                best = Some((*entity, distance));
            }
        }
        best.map(|(entity, _)| entity)
    }

    fn position_of(&self, entity: u64) -> Option<[f32; 3]> {
        self.hostiles
            .iter()
            .find(|(hostile, _)| *hostile == entity)
            .map(|(_, position)| *position)
    }

    fn move_toward(&mut self, target: [f32; 3]) {
        self.move_request = Some(target);
    }

    fn attack(&mut self, target: u64) -> bool {
        if self.attack_ready {
            self.attack_request = Some(target);
            true
        } else {
            false
        }
    }

    fn health_fraction(&self) -> f32 {
        self.health_fraction
    }
}

/// Runs each AI agent's behavior tree once per tick. Tree instances are
/// created on demand from the factory and dropped when their entity dies
/// for good (is destroyed).
pub struct BehaviorSystem {
    factory: TreeFactory<NpcActor>,
    instances: HashMap<Entity, BehaviorTree<NpcActor>>,
    missing_trees: HashSet<String>,
}

impl BehaviorSystem {
    pub fn new(factory: TreeFactory<NpcActor>) -> Self {
        Self {
            factory,
            instances: HashMap::new(),
            missing_trees: HashSet::new(),
        }
    }

    pub fn instance_count(&self) -> usize {
        self.instances.len()
    }

    fn gather_hostiles(world: &mut World, entity: Entity, agent: &AiAgent) -> Vec<(u64, [f32; 3])> {
        let Some(origin) = world
            .get_component::<Transform>(entity)
            .map(|transform| transform.position)
        else {
            return Vec::new();
        };

        let nearby = world.entities_within(origin, agent.sensor_radius);
        nearby
            .into_iter()
            .filter(|other| *other != entity)
            .filter(|other| {
                world
                    .get_component::<Tag>(*other)
                    .map(|tag| agent.hostile_categories.contains(&tag.category))
                    .unwrap_or(false)
            })
            .filter(|other| {
                world
                    .get_component::<Health>(*other)
                    .map(|health| !health.is_dead())
                    .unwrap_or(true)
            })
            .filter_map(|other| {
                world
                    .get_component::<Transform>(other)
                    .map(|transform| (other.to_u64(), transform.position))
            })
            .collect()
    }
}

impl System for BehaviorSystem {
    fn name(&self) -> &str {
        "behavior"
    }

    fn update(&mut self, world: &mut World, _dt: f32) -> Result<(), WorldError> {
        let tick = world.tick();
        let agents = entities_with_3::<World, AiAgent, Transform, Health>(world);

        for entity in agents {
            if world
                .get_component::<Health>(entity)
                .map(Health::is_dead)
                .unwrap_or(true)
            {
                continue;
            }
            let Some(agent) = world.get_component::<AiAgent>(entity).cloned() else {
                continue;
            };

            if !self.instances.contains_key(&entity) {
                match self.factory.create(&agent.tree) {
                    Ok(tree) => {
                        self.instances.insert(entity, tree);
                    }
                    Err(error) => {
                        if self.missing_trees.insert(agent.tree.clone()) {
                            warn!("behavior system: {error}");
                        }
                        continue;
                    }
                }
            }

            let mut actor = NpcActor {
                entity: entity.to_u64(),
                position: world
                    .get_component::<Transform>(entity)
                    .map(|transform| transform.position)
                    .unwrap_or([0.0, 0.0, 0.0]),
                health_fraction: world
                    .get_component::<Health>(entity)
                    .map(Health::fraction)
                    .unwrap_or(0.0),
                attack_ready: world
                    .get_component::<Combat>(entity)
                    .map(|combat| combat.attack_ready(tick))
                    .unwrap_or(false),
                hostiles: Self::gather_hostiles(world, entity, &agent),
                move_request: None,
                attack_request: None,
            };

            if let Some(tree) = self.instances.get_mut(&entity) {
                tree.execute(&mut actor);
            }

            // apply the command buffer back onto the world
            let speed = world
                .get_component::<crate::components::Stats>(entity)
                .map(|stats| stats.move_speed)
                .unwrap_or(1.0);
            if let Some(transform) = world.get_component_mut::<Transform>(entity) {
                match actor.move_request {
                    Some(goal) => {
                        let dx = goal[0] - transform.position[0];
                        let dy = goal[1] - transform.position[1];
                        let dz = goal[2] - transform.position[2];
                        let length = (dx * dx + dy * dy + dz * dz).sqrt();
                        if length > 1e-3 {
                            transform.velocity =
                                [dx / length * speed, dy / length * speed, dz / length * speed];
                        } else {
                            transform.velocity = [0.0, 0.0, 0.0];
                        }
                    }
                    None => {
                        transform.velocity = [0.0, 0.0, 0.0];
                    }
                }
            }
            if let Some(target) = actor.attack_request {
                if let Some(combat) = world.get_component_mut::<Combat>(entity) {
                    combat.target = Some(Entity::from_u64(target));
                }
            }
        }

        // trees for destroyed entities are dropped with their arena
        self.instances.retain(|entity, _| world.is_alive(*entity));

        Ok(())
    }
}
