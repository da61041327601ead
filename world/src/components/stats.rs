use crate::component::{Component, ComponentKind};

/// Scalars affecting damage, healing and movement.
#[derive(Clone, Debug, PartialEq)]
pub struct Stats {
    pub attack_power: f32,
    pub defense: f32,
    pub healing_power: f32,
    pub move_speed: f32,
}

impl Default for Stats {
    fn default() -> Self {
        Self {
            attack_power: 10.0,
            defense: 0.0,
            healing_power: 0.0,
            move_speed: 5.0,
        }
    }
}

impl Component for Stats {
    const KIND: ComponentKind = ComponentKind::Stats;
}
