use std::collections::HashSet;

use log::trace;
use realm_shared::Tick;

use crate::component::{Component, ComponentStorage, HasStorage};
use crate::components::{AiAgent, Combat, Health, NetworkBinding, Stats, Tag, Transform};
use crate::entity::{Entity, EntityAllocator};
use crate::spatial::SpatialGrid;

/// World tuning owned by the world itself; the server config embeds one per
/// shard.
#[derive(Clone)]
pub struct WorldConfig {
    /// Edge length of one spatial index cell.
    pub cell_size: f32,
}

impl Default for WorldConfig {
    fn default() -> Self {
        Self { cell_size: 25.0 }
    }
}

/// One shard's entire game state: the entity allocator, the static registry
/// of component storages, and the spatial index. Strictly single-threaded
/// within its owning tick thread; no locks anywhere.
pub struct World {
    allocator: EntityAllocator,
    alive: HashSet<Entity>,
    tick: Tick,

    transforms: ComponentStorage<Transform>,
    healths: ComponentStorage<Health>,
    combats: ComponentStorage<Combat>,
    stats: ComponentStorage<Stats>,
    network_bindings: ComponentStorage<NetworkBinding>,
    tags: ComponentStorage<Tag>,
    ai_agents: ComponentStorage<AiAgent>,

    spatial: SpatialGrid,
}

macro_rules! impl_has_storage {
    ($component:ty, $field:ident) => {
        impl HasStorage<$component> for World {
            fn storage(&self) -> &ComponentStorage<$component> {
                &self.$field
            }

            fn storage_mut(&mut self) -> &mut ComponentStorage<$component> {
                &mut self.$field
            }
        }
    };
}

impl_has_storage!(Transform, transforms);
impl_has_storage!(Health, healths);
impl_has_storage!(Combat, combats);
impl_has_storage!(Stats, stats);
impl_has_storage!(NetworkBinding, network_bindings);
impl_has_storage!(Tag, tags);
impl_has_storage!(AiAgent, ai_agents);

impl World {
    pub fn new(config: &WorldConfig) -> Self {
        Self {
            allocator: EntityAllocator::new(),
            alive: HashSet::new(),
            tick: 0,
            transforms: ComponentStorage::new(),
            healths: ComponentStorage::new(),
            combats: ComponentStorage::new(),
            stats: ComponentStorage::new(),
            network_bindings: ComponentStorage::new(),
            tags: ComponentStorage::new(),
            ai_agents: ComponentStorage::new(),
            spatial: SpatialGrid::new(config.cell_size),
        }
    }

    // Entities

    /// Returns an id never previously returned. Cannot fail.
    pub fn create_entity(&mut self) -> Entity {
        let entity = self.allocator.allocate();
        self.alive.insert(entity);
        entity
    }

    /// Removes `entity` from every component storage and the spatial index.
    /// Idempotent; the id stays invalid forever.
    pub fn destroy_entity(&mut self, entity: Entity) {
        if !self.alive.remove(&entity) {
            return;
        }
        trace!("destroying entity {}", entity.to_u64());
        self.transforms.remove(entity);
        self.healths.remove(entity);
        self.combats.remove(entity);
        self.stats.remove(entity);
        self.network_bindings.remove(entity);
        self.tags.remove(entity);
        self.ai_agents.remove(entity);
        self.spatial.remove(entity);
    }

    pub fn is_alive(&self, entity: Entity) -> bool {
        self.alive.contains(&entity)
    }

    pub fn entity_count(&self) -> usize {
        self.alive.len()
    }

    // Components — absence is not an error; all operations are total.

    /// Inserts or replaces, marking the per-storage dirty bit. Adding to a
    /// destroyed entity is a no-op.
    pub fn add_component<T: Component>(&mut self, entity: Entity, value: T)
    where
        World: HasStorage<T>,
    {
        if !self.alive.contains(&entity) {
            return;
        }
        HasStorage::<T>::storage_mut(self).set(entity, value);
    }

    pub fn get_component<T: Component>(&self, entity: Entity) -> Option<&T>
    where
        World: HasStorage<T>,
    {
        HasStorage::<T>::storage(self).get(entity)
    }

    /// Mutable access; marks the entity dirty in that storage.
    pub fn get_component_mut<T: Component>(&mut self, entity: Entity) -> Option<&mut T>
    where
        World: HasStorage<T>,
    {
        HasStorage::<T>::storage_mut(self).get_mut(entity)
    }

    pub fn remove_component<T: Component>(&mut self, entity: Entity) -> Option<T>
    where
        World: HasStorage<T>,
    {
        let removed = HasStorage::<T>::storage_mut(self).remove(entity);
        if removed.is_some() && T::KIND.policy().spatially_indexed {
            self.spatial.remove(entity);
        }
        removed
    }

    // Tick clock

    pub fn tick(&self) -> Tick {
        self.tick
    }

    pub fn advance_tick(&mut self) -> Tick {
        self.tick += 1;
        self.tick
    }

    // Spatial index

    /// Applies pending transform writes to the spatial index. Called after
    /// each system update so queries within the tick observe fresh cells;
    /// the transform dirty set itself is left for the sync pass to drain.
    pub fn flush_spatial(&mut self) {
        let dirty: Vec<Entity> = self.transforms.dirty().iter().copied().collect();
        for entity in dirty {
            if let Some(transform) = self.transforms.get(entity) {
                self.spatial.update(entity, transform.position);
            }
        }
    }

    /// Entities with a transform strictly within `radius` of `center`,
    /// unordered. The boundary itself is excluded.
    pub fn entities_within(&mut self, center: [f32; 3], radius: f32) -> Vec<Entity> {
        let candidates = self.spatial.query(center, radius);
        let transforms = &self.transforms;
        candidates
            .into_iter()
            .filter(|entity| {
                transforms
                    .get(*entity)
                    .map(|transform| {
                        let dx = transform.position[0] - center[0];
                        let dy = transform.position[1] - center[1];
                        let dz = transform.position[2] - center[2];
                        (dx * dx + dy * dy + dz * dz).sqrt() < radius
                    })
                    .unwrap_or(false)
            })
            .collect()
    }

    pub fn spatial_len(&self) -> usize {
        self.spatial.len()
    }
}
