use std::collections::{HashMap, HashSet};

use crate::entity::Entity;

/// Replication/persistence/indexing policy for one component kind.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PolicyFlags {
    /// Streamed to observing connections.
    pub replicated: bool,
    /// Written through the cache to storage.
    pub persisted: bool,
    /// Drives spatial index membership (transform only).
    pub spatially_indexed: bool,
}

/// The closed set of component kinds this world carries. Kinds are a static
/// registry: storages are concrete fields on the world, there is no runtime
/// downcasting.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ComponentKind {
    Transform,
    Health,
    Combat,
    Stats,
    NetworkBinding,
    Tag,
    AiAgent,
}

impl ComponentKind {
    pub const ALL: [ComponentKind; 7] = [
        ComponentKind::Transform,
        ComponentKind::Health,
        ComponentKind::Combat,
        ComponentKind::Stats,
        ComponentKind::NetworkBinding,
        ComponentKind::Tag,
        ComponentKind::AiAgent,
    ];

    pub fn name(self) -> &'static str {
        match self {
            ComponentKind::Transform => "transform",
            ComponentKind::Health => "health",
            ComponentKind::Combat => "combat",
            ComponentKind::Stats => "stats",
            ComponentKind::NetworkBinding => "network_binding",
            ComponentKind::Tag => "tag",
            ComponentKind::AiAgent => "ai_agent",
        }
    }

    pub fn policy(self) -> PolicyFlags {
        match self {
            ComponentKind::Transform => PolicyFlags {
                replicated: true,
                persisted: true,
                spatially_indexed: true,
            },
            ComponentKind::Health => PolicyFlags {
                replicated: true,
                persisted: true,
                spatially_indexed: false,
            },
            ComponentKind::Combat => PolicyFlags {
                replicated: true,
                persisted: false,
                spatially_indexed: false,
            },
            ComponentKind::Stats => PolicyFlags {
                replicated: false,
                persisted: true,
                spatially_indexed: false,
            },
            ComponentKind::NetworkBinding => PolicyFlags {
                replicated: false,
                persisted: false,
                spatially_indexed: false,
            },
            ComponentKind::Tag => PolicyFlags {
                replicated: true,
                persisted: false,
                spatially_indexed: false,
            },
            ComponentKind::AiAgent => PolicyFlags {
                replicated: false,
                persisted: false,
                spatially_indexed: false,
            },
        }
    }
}

/// A value type storable in a component table.
pub trait Component: Clone + 'static {
    const KIND: ComponentKind;
}

/// A sparse table mapping entities to component values, with a dirty set
/// accumulated since the last sync pass.
pub struct ComponentStorage<T> {
    values: HashMap<Entity, T>,
    dirty: HashSet<Entity>,
}

impl<T: Component> ComponentStorage<T> {
    pub fn new() -> Self {
        Self {
            values: HashMap::new(),
            dirty: HashSet::new(),
        }
    }

    pub fn get(&self, entity: Entity) -> Option<&T> {
        self.values.get(&entity)
    }

    /// Mutable access marks the entity dirty: callers take it to write.
    pub fn get_mut(&mut self, entity: Entity) -> Option<&mut T> {
        let value = self.values.get_mut(&entity);
        if value.is_some() {
            self.dirty.insert(entity);
        }
        value
    }

    /// Insert-or-replace. Marks the entity dirty.
    pub fn set(&mut self, entity: Entity, value: T) {
        self.values.insert(entity, value);
        self.dirty.insert(entity);
    }

    pub fn remove(&mut self, entity: Entity) -> Option<T> {
        self.dirty.remove(&entity);
        self.values.remove(&entity)
    }

    pub fn contains(&self, entity: Entity) -> bool {
        self.values.contains_key(&entity)
    }

    /// Non-mutating iteration; order unspecified but stable within a call.
    pub fn iter(&self) -> impl Iterator<Item = (&Entity, &T)> {
        self.values.iter()
    }

    pub fn entities(&self) -> impl Iterator<Item = Entity> + '_ {
        self.values.keys().copied()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// The entities mutated since the last drain, without clearing.
    pub fn dirty(&self) -> &HashSet<Entity> {
        &self.dirty
    }

    /// Drains the dirty set; the sync pass calls this once per tick.
    pub fn take_dirty(&mut self) -> HashSet<Entity> {
        std::mem::take(&mut self.dirty)
    }

    pub fn mark_dirty(&mut self, entity: Entity) {
        if self.values.contains_key(&entity) {
            self.dirty.insert(entity);
        }
    }
}

impl<T: Component> Default for ComponentStorage<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// Capability trait giving generic access to one kind's storage on the
/// world. The world implements it once per kind in its static registry.
pub trait HasStorage<T: Component> {
    fn storage(&self) -> &ComponentStorage<T>;
    fn storage_mut(&mut self) -> &mut ComponentStorage<T>;
}

/// Entities holding both listed kinds. Callers collect before mutating:
/// storages must not change shape during iteration.
pub fn entities_with_2<W, A, B>(world: &W) -> Vec<Entity>
where
    W: HasStorage<A> + HasStorage<B>,
    A: Component,
    B: Component,
{
    let a = HasStorage::<A>::storage(world);
    let b = HasStorage::<B>::storage(world);
    a.entities().filter(|entity| b.contains(*entity)).collect()
}

/// Entities holding all three listed kinds.
pub fn entities_with_3<W, A, B, C>(world: &W) -> Vec<Entity>
where
    W: HasStorage<A> + HasStorage<B> + HasStorage<C>,
    A: Component,
    B: Component,
    C: Component,
{
    let a = HasStorage::<A>::storage(world);
    let b = HasStorage::<B>::storage(world);
    let c = HasStorage::<C>::storage(world);
    a.entities()
        .filter(|entity| b.contains(*entity) && c.contains(*entity))
        .collect()
}

/// Invokes `f` for every entity holding both kinds, read-only.
pub fn for_each_2<W, A, B>(world: &W, mut f: impl FnMut(Entity, &A, &B))
where
    W: HasStorage<A> + HasStorage<B>,
    A: Component,
    B: Component,
{
    let a = HasStorage::<A>::storage(world);
    let b = HasStorage::<B>::storage(world);
    for (entity, value_a) in a.iter() {
        if let Some(value_b) = b.get(*entity) {
            f(*entity, value_a, value_b);
        }
    }
}

/// Invokes `f` for every entity holding all three kinds, read-only.
pub fn for_each_3<W, A, B, C>(world: &W, mut f: impl FnMut(Entity, &A, &B, &C))
where
    W: HasStorage<A> + HasStorage<B> + HasStorage<C>,
    A: Component,
    B: Component,
    C: Component,
{
    let a = HasStorage::<A>::storage(world);
    let b = HasStorage::<B>::storage(world);
    let c = HasStorage::<C>::storage(world);
    for (entity, value_a) in a.iter() {
        if let (Some(value_b), Some(value_c)) = (b.get(*entity), c.get(*entity)) {
            f(*entity, value_a, value_b, value_c);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::Entity;

    #[derive(Clone, Debug, PartialEq)]
    struct Marker(u32);

    impl Component for Marker {
        const KIND: ComponentKind = ComponentKind::Tag;
    }

    #[test]
    fn set_get_remove() {
        let mut storage = ComponentStorage::new();
        let entity = Entity::from_u64(1);

        assert_eq!(storage.get(entity), None);
        storage.set(entity, Marker(5));
        assert_eq!(storage.get(entity), Some(&Marker(5)));
        storage.set(entity, Marker(6)); // replace
        assert_eq!(storage.get(entity), Some(&Marker(6)));
        assert_eq!(storage.len(), 1);

        assert_eq!(storage.remove(entity), Some(Marker(6)));
        assert_eq!(storage.remove(entity), None);
    }

    #[test]
    fn set_and_get_mut_mark_dirty() {
        let mut storage = ComponentStorage::new();
        let entity = Entity::from_u64(1);

        storage.set(entity, Marker(0));
        assert!(storage.dirty().contains(&entity));

        storage.take_dirty();
        assert!(storage.dirty().is_empty());

        storage.get_mut(entity).unwrap().0 = 9;
        assert!(storage.dirty().contains(&entity));
    }

    #[test]
    fn get_mut_of_absent_entity_stays_clean() {
        let mut storage = ComponentStorage::<Marker>::new();
        let entity = Entity::from_u64(1);

        assert!(storage.get_mut(entity).is_none());
        assert!(storage.dirty().is_empty());
    }

    #[test]
    fn membership_matches_iteration() {
        let mut storage = ComponentStorage::new();
        let present = Entity::from_u64(1);
        let absent = Entity::from_u64(2);
        storage.set(present, Marker(1));

        let iterated: Vec<Entity> = storage.entities().collect();
        assert!(iterated.contains(&present));
        assert!(!iterated.contains(&absent));
        assert!(storage.contains(present));
        assert!(!storage.contains(absent));
    }

    #[test]
    fn every_kind_has_a_name_and_policy() {
        for kind in ComponentKind::ALL {
            assert!(!kind.name().is_empty());
            let policy = kind.policy();
            if policy.spatially_indexed {
                // only the transform drives the spatial index
                assert_eq!(kind, ComponentKind::Transform);
            }
        }
    }
}
