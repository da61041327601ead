use log::{error, warn};
use realm_shared::Tick;

use crate::error::WorldError;
use crate::world::World;

/// How many ticks a system is skipped after an internal error.
const DEFAULT_QUARANTINE_TICKS: u32 = 10;

/// One per-tick unit of game logic. Systems run in registration order; the
/// observable effects of system N are visible to system N+1. Updates must
/// derive all timing from `dt` and the world tick, never wall-clock, so a
/// tick is a pure function of its inputs.
pub trait System {
    fn name(&self) -> &str;
    fn update(&mut self, world: &mut World, dt: f32) -> Result<(), WorldError>;
}

struct SystemEntry {
    system: Box<dyn System>,
    /// The system is skipped while the world tick is below this.
    quarantined_until: Option<Tick>,
    failures: u64,
}

/// Invokes registered systems over the world, once per tick, in
/// registration order. A system that reports an internal error is logged
/// with full context and quarantined for a few ticks so one misbehaving
/// system cannot stall the shard.
pub struct Scheduler {
    systems: Vec<SystemEntry>,
    quarantine_ticks: u32,
}

impl Scheduler {
    pub fn new() -> Self {
        Self {
            systems: Vec::new(),
            quarantine_ticks: DEFAULT_QUARANTINE_TICKS,
        }
    }

    pub fn with_quarantine_ticks(quarantine_ticks: u32) -> Self {
        Self {
            systems: Vec::new(),
            quarantine_ticks,
        }
    }

    /// Appends a system to the active list.
    pub fn register_system(&mut self, system: Box<dyn System>) {
        self.systems.push(SystemEntry {
            system,
            quarantined_until: None,
            failures: 0,
        });
    }

    pub fn system_count(&self) -> usize {
        self.systems.len()
    }

    pub fn failure_count(&self, name: &str) -> u64 {
        self.systems
            .iter()
            .find(|entry| entry.system.name() == name)
            .map(|entry| entry.failures)
            .unwrap_or(0)
    }

    /// Advances the world one tick and runs every non-quarantined system.
    /// Spatial index writes are applied after each system so later systems
    /// and the sync pass observe fresh cell membership.
    pub fn tick(&mut self, world: &mut World, dt: f32) -> Tick {
        let tick = world.advance_tick();

        for entry in &mut self.systems {
            if let Some(until) = entry.quarantined_until {
                if tick < until {
                    continue;
                }
                entry.quarantined_until = None;
            }

            match entry.system.update(world, dt) {
                Ok(()) => {}
                Err(WorldError::Internal { system, reason }) => {
                    entry.failures += 1;
                    entry.quarantined_until = Some(tick + self.quarantine_ticks);
                    error!(
                        "tick {tick}: internal error in system '{system}': {reason}; \
                         quarantined for {} ticks",
                        self.quarantine_ticks
                    );
                }
                Err(other) => {
                    entry.failures += 1;
                    warn!(
                        "tick {tick}: system '{}' reported: {other}",
                        entry.system.name()
                    );
                }
            }

            world.flush_spatial();
        }

        tick
    }
}

impl Default for Scheduler {
    fn default() -> Self {
        Self::new()
    }
}
