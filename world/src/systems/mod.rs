mod behavior;
mod combat;
mod health_regen;
mod movement;
mod respawn;

pub use behavior::{BehaviorSystem, NpcActor};
pub use combat::CombatSystem;
pub use health_regen::HealthRegenSystem;
pub use movement::MovementSystem;
pub use respawn::RespawnSystem;
