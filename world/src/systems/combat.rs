use log::trace;

use crate::component::entities_with_2;
use crate::components::{Combat, Health, Stats, Transform};
use crate::entity::Entity;
use crate::error::WorldError;
use crate::scheduler::System;
use crate::world::World;

/// Resolves attacks: an entity with a live target in range and an elapsed
/// cooldown lands one hit per cooldown window. Dead attackers are skipped;
/// dead targets are dropped.
pub struct CombatSystem;

impl CombatSystem {
    fn damage(base: f32, attacker_power: f32, defender_defense: f32) -> f32 {
        // flat mitigation curve: 100 defense halves incoming damage
        (base + attacker_power) * 100.0 / (100.0 + defender_defense.max(0.0))
    }

    fn distance(world: &World, a: Entity, b: Entity) -> Option<f32> {
        let ta = world.get_component::<Transform>(a)?;
        let tb = world.get_component::<Transform>(b)?;
        let dx = ta.position[0] - tb.position[0];
        let dy = ta.position[1] - tb.position[1];
        let dz = ta.position[2] - tb.position[2];
        Some((dx * dx + dy * dy + dz * dz).sqrt())
    }
}

impl System for CombatSystem {
    fn name(&self) -> &str {
        "combat"
    }

    fn update(&mut self, world: &mut World, _dt: f32) -> Result<(), WorldError> {
        let tick = world.tick();
        let attackers = entities_with_2::<World, Combat, Transform>(world);

        for attacker in attackers {
            // dead sub-state: combat must not schedule this entity
            if world
                .get_component::<Health>(attacker)
                .map(Health::is_dead)
                .unwrap_or(false)
            {
                continue;
            }

            let Some(combat) = world.get_component::<Combat>(attacker) else {
                continue;
            };
            let Some(target) = combat.target else {
                continue;
            };
            let range = combat.attack_range;
            let base_damage = combat.base_damage;
            let ready = combat.attack_ready(tick);

            // a dead or vanished target is dropped
            let target_dead = world
                .get_component::<Health>(target)
                .map(Health::is_dead)
                .unwrap_or(true);
            if !world.is_alive(target) || target_dead {
                if let Some(combat) = world.get_component_mut::<Combat>(attacker) {
                    combat.target = None;
                }
                continue;
            }

            if !ready {
                continue;
            }
            match Self::distance(world, attacker, target) {
                Some(distance) if distance <= range => {}
                _ => continue,
            }

            let attack_power = world
                .get_component::<Stats>(attacker)
                .map(|stats| stats.attack_power)
                .unwrap_or(0.0);
            let defense = world
                .get_component::<Stats>(target)
                .map(|stats| stats.defense)
                .unwrap_or(0.0);
            let damage = Self::damage(base_damage, attack_power, defense);

            if let Some(health) = world.get_component_mut::<Health>(target) {
                health.current = (health.current - damage).max(0.0);
                if health.is_dead() && health.died_at_tick.is_none() {
                    health.died_at_tick = Some(tick);
                    trace!(
                        "entity {} died at tick {tick}",
                        target.to_u64()
                    );
                }
            }
            if let Some(victim_combat) = world.get_component_mut::<Combat>(target) {
                victim_combat.last_damaged_tick = Some(tick);
            }
            if let Some(combat) = world.get_component_mut::<Combat>(attacker) {
                combat.last_attack_tick = Some(tick);
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::world::WorldConfig;

    fn spawn_fighter(world: &mut World, position: [f32; 3], hp: f32) -> Entity {
        let entity = world.create_entity();
        world.add_component(entity, Transform::at(position));
        world.add_component(entity, Health::full(hp));
        world.add_component(entity, Combat::new(5.0, 10.0, 10));
        world.add_component(entity, Stats::default());
        entity
    }

    #[test]
    fn attack_in_range_applies_damage() {
        let mut world = World::new(&WorldConfig::default());
        let attacker = spawn_fighter(&mut world, [0.0, 0.0, 0.0], 100.0);
        let victim = spawn_fighter(&mut world, [3.0, 0.0, 0.0], 100.0);
        world.get_component_mut::<Combat>(attacker).unwrap().target = Some(victim);
        world.advance_tick();

        CombatSystem.update(&mut world, 0.05).unwrap();

        let health = world.get_component::<Health>(victim).unwrap();
        assert!(health.current < 100.0);
        let combat = world.get_component::<Combat>(attacker).unwrap();
        assert_eq!(combat.last_attack_tick, Some(world.tick()));
    }

    #[test]
    fn out_of_range_target_is_untouched() {
        let mut world = World::new(&WorldConfig::default());
        let attacker = spawn_fighter(&mut world, [0.0, 0.0, 0.0], 100.0);
        let victim = spawn_fighter(&mut world, [100.0, 0.0, 0.0], 100.0);
        world.get_component_mut::<Combat>(attacker).unwrap().target = Some(victim);
        world.advance_tick();

        CombatSystem.update(&mut world, 0.05).unwrap();

        assert_eq!(world.get_component::<Health>(victim).unwrap().current, 100.0);
    }

    #[test]
    fn cooldown_limits_attack_rate() {
        let mut world = World::new(&WorldConfig::default());
        let attacker = spawn_fighter(&mut world, [0.0, 0.0, 0.0], 100.0);
        let victim = spawn_fighter(&mut world, [3.0, 0.0, 0.0], 1000.0);
        world.get_component_mut::<Combat>(attacker).unwrap().target = Some(victim);

        world.advance_tick();
        CombatSystem.update(&mut world, 0.05).unwrap();
        let after_first = world.get_component::<Health>(victim).unwrap().current;

        // next tick is inside the 10-tick cooldown
        world.advance_tick();
        CombatSystem.update(&mut world, 0.05).unwrap();
        assert_eq!(
            world.get_component::<Health>(victim).unwrap().current,
            after_first
        );
    }

    #[test]
    fn dead_attacker_is_skipped() {
        let mut world = World::new(&WorldConfig::default());
        let attacker = spawn_fighter(&mut world, [0.0, 0.0, 0.0], 100.0);
        let victim = spawn_fighter(&mut world, [3.0, 0.0, 0.0], 100.0);
        world.get_component_mut::<Combat>(attacker).unwrap().target = Some(victim);
        world.get_component_mut::<Health>(attacker).unwrap().current = 0.0;
        world.advance_tick();

        CombatSystem.update(&mut world, 0.05).unwrap();

        assert_eq!(world.get_component::<Health>(victim).unwrap().current, 100.0);
    }

    #[test]
    fn killing_blow_records_death_tick() {
        let mut world = World::new(&WorldConfig::default());
        let attacker = spawn_fighter(&mut world, [0.0, 0.0, 0.0], 100.0);
        let victim = spawn_fighter(&mut world, [3.0, 0.0, 0.0], 5.0);
        world.get_component_mut::<Combat>(attacker).unwrap().target = Some(victim);
        world.advance_tick();

        CombatSystem.update(&mut world, 0.05).unwrap();

        let health = world.get_component::<Health>(victim).unwrap();
        assert!(health.is_dead());
        assert_eq!(health.died_at_tick, Some(world.tick()));
    }

    #[test]
    fn dead_target_is_dropped() {
        let mut world = World::new(&WorldConfig::default());
        let attacker = spawn_fighter(&mut world, [0.0, 0.0, 0.0], 100.0);
        let victim = spawn_fighter(&mut world, [3.0, 0.0, 0.0], 100.0);
        world.get_component_mut::<Combat>(attacker).unwrap().target = Some(victim);
        world.get_component_mut::<Health>(victim).unwrap().current = 0.0;
        world.advance_tick();

        CombatSystem.update(&mut world, 0.05).unwrap();

        assert_eq!(world.get_component::<Combat>(attacker).unwrap().target, None);
    }
}
