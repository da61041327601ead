use realm_shared::Tick;

use crate::component::{Component, ComponentKind};

/// Hit points plus the death/respawn bookkeeping. An entity whose current
/// health is zero is in the dead sub-state: combat and movement systems must
/// not schedule it; only respawn handling may read it.
#[derive(Clone, Debug, PartialEq)]
pub struct Health {
    pub current: f32,
    pub maximum: f32,
    pub regen_per_second: f32,
    pub died_at_tick: Option<Tick>,
    pub respawn_delay_ticks: u32,
    pub spawn_point: [f32; 3],
}

impl Health {
    pub fn full(maximum: f32) -> Self {
        Self {
            current: maximum,
            maximum,
            regen_per_second: 0.0,
            died_at_tick: None,
            respawn_delay_ticks: 0,
            spawn_point: [0.0, 0.0, 0.0],
        }
    }

    pub fn is_dead(&self) -> bool {
        self.current <= 0.0
    }

    pub fn fraction(&self) -> f32 {
        if self.maximum <= 0.0 {
            return 0.0;
        }
        (self.current / self.maximum).clamp(0.0, 1.0)
    }
}

impl Component for Health {
    const KIND: ComponentKind = ComponentKind::Health;
}
