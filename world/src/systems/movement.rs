use crate::component::HasStorage;
use crate::components::{Health, Transform};
use crate::entity::Entity;
use crate::error::WorldError;
use crate::scheduler::System;
use crate::world::World;

/// Integrates velocity into position. Dead entities are not moved.
pub struct MovementSystem;

impl System for MovementSystem {
    fn name(&self) -> &str {
        "movement"
    }

    fn update(&mut self, world: &mut World, dt: f32) -> Result<(), WorldError> {
        let movers: Vec<Entity> = HasStorage::<Transform>::storage(world).entities().collect();
        for entity in movers {
            if let Some(health) = world.get_component::<Health>(entity) {
                if health.is_dead() {
                    continue;
                }
            }
            // check velocity through the shared ref first so stationary
            // entities do not get flagged dirty
            let stationary = world
                .get_component::<Transform>(entity)
                .map(|transform| transform.velocity == [0.0, 0.0, 0.0])
                .unwrap_or(true);
            if stationary {
                continue;
            }
            let Some(transform) = world.get_component_mut::<Transform>(entity) else {
                continue;
            };
            transform.position[0] += transform.velocity[0] * dt;
            transform.position[1] += transform.velocity[1] * dt;
            transform.position[2] += transform.velocity[2] * dt;
        }
        Ok(())
    }
}
