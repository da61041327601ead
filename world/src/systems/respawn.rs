use log::trace;

use crate::component::HasStorage;
use crate::components::{Health, Transform};
use crate::entity::Entity;
use crate::error::WorldError;
use crate::scheduler::System;
use crate::world::World;

/// The only system allowed to touch dead entities: once the respawn delay
/// has elapsed the entity returns to its spawn point at full health.
pub struct RespawnSystem;

impl System for RespawnSystem {
    fn name(&self) -> &str {
        "respawn"
    }

    fn update(&mut self, world: &mut World, _dt: f32) -> Result<(), WorldError> {
        let tick = world.tick();
        let entities: Vec<Entity> = HasStorage::<Health>::storage(world).entities().collect();

        for entity in entities {
            let due = {
                let Some(health) = world.get_component::<Health>(entity) else {
                    continue;
                };
                match (health.is_dead(), health.died_at_tick) {
                    (true, Some(died_at)) => {
                        tick.saturating_sub(died_at) >= health.respawn_delay_ticks
                    }
                    _ => false,
                }
            };
            if !due {
                continue;
            }

            let Some(health) = world.get_component_mut::<Health>(entity) else {
                continue;
            };
            health.current = health.maximum;
            health.died_at_tick = None;
            let spawn_point = health.spawn_point;
            if let Some(transform) = world.get_component_mut::<Transform>(entity) {
                transform.position = spawn_point;
                transform.velocity = [0.0, 0.0, 0.0];
            }
            trace!("entity {} respawned at tick {tick}", entity.to_u64());
        }

        Ok(())
    }
}
