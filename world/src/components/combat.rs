use realm_shared::Tick;

use crate::component::{Component, ComponentKind};
use crate::entity::Entity;

/// Current target and attack timing for a combat-capable entity.
#[derive(Clone, Debug, PartialEq)]
pub struct Combat {
    pub target: Option<Entity>,
    pub last_attack_tick: Option<Tick>,
    pub attack_cooldown_ticks: u32,
    pub attack_range: f32,
    pub base_damage: f32,
    /// Set on the victim when damage lands; drives out-of-combat regen.
    pub last_damaged_tick: Option<Tick>,
}

impl Combat {
    pub fn new(attack_range: f32, base_damage: f32, attack_cooldown_ticks: u32) -> Self {
        Self {
            target: None,
            last_attack_tick: None,
            attack_cooldown_ticks,
            attack_range,
            base_damage,
            last_damaged_tick: None,
        }
    }

    /// Whether the cooldown has elapsed at `tick`.
    pub fn attack_ready(&self, tick: Tick) -> bool {
        match self.last_attack_tick {
            None => true,
            Some(last) => tick.saturating_sub(last) >= self.attack_cooldown_ticks,
        }
    }
}

impl Component for Combat {
    const KIND: ComponentKind = ComponentKind::Combat;
}
