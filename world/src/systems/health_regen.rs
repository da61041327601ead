use crate::component::HasStorage;
use crate::components::{Combat, Health};
use crate::entity::Entity;
use crate::error::WorldError;
use crate::scheduler::System;
use crate::world::World;

/// Ticks an entity must go undamaged before regeneration resumes.
const OUT_OF_COMBAT_TICKS: u32 = 150;

/// Restores health over time for living entities that have been out of
/// combat long enough. The dead are left to the respawn system.
pub struct HealthRegenSystem;

impl System for HealthRegenSystem {
    fn name(&self) -> &str {
        "health_regen"
    }

    fn update(&mut self, world: &mut World, dt: f32) -> Result<(), WorldError> {
        let tick = world.tick();
        let entities: Vec<Entity> = HasStorage::<Health>::storage(world).entities().collect();

        for entity in entities {
            let regen_blocked = {
                let Some(health) = world.get_component::<Health>(entity) else {
                    continue;
                };
                health.is_dead()
                    || health.regen_per_second <= 0.0
                    || health.current >= health.maximum
            };
            if regen_blocked {
                continue;
            }

            let recently_damaged = world
                .get_component::<Combat>(entity)
                .and_then(|combat| combat.last_damaged_tick)
                .map(|damaged| tick.saturating_sub(damaged) < OUT_OF_COMBAT_TICKS)
                .unwrap_or(false);
            if recently_damaged {
                continue;
            }

            if let Some(health) = world.get_component_mut::<Health>(entity) {
                health.current = (health.current + health.regen_per_second * dt).min(health.maximum);
            }
        }

        Ok(())
    }
}
