//! # Realm World
//! One shard's game state: the entity store and its static component
//! registry, the per-tick system scheduler, the spatial interest index, and
//! the stock gameplay systems.

mod component;
mod components;
mod entity;
mod error;
mod scheduler;
mod spatial;
mod systems;
mod world;

pub use component::{
    entities_with_2, entities_with_3, for_each_2, for_each_3, Component, ComponentKind,
    ComponentStorage, HasStorage, PolicyFlags,
};
pub use components::{AiAgent, Combat, Health, NetworkBinding, Stats, Tag, TagCategory, Transform};
pub use entity::{Entity, EntityAllocator};
pub use error::WorldError;
pub use scheduler::{Scheduler, System};
pub use spatial::SpatialGrid;
pub use systems::{
    BehaviorSystem, CombatSystem, HealthRegenSystem, MovementSystem, NpcActor, RespawnSystem,
};
pub use world::{World, WorldConfig};
