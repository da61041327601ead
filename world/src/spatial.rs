use std::collections::HashMap;

use crate::entity::Entity;

type Cell = (i32, i32, i32);

/// A uniform 3D grid over entity positions. Membership moves are O(1): an
/// entity's old cell entry is left behind and swept lazily the next time a
/// query touches that cell.
pub struct SpatialGrid {
    cell_size: f32,
    cells: HashMap<Cell, Vec<Entity>>,
    memberships: HashMap<Entity, Cell>,
}

impl SpatialGrid {
    pub fn new(cell_size: f32) -> Self {
        debug_assert!(cell_size > 0.0);
        Self {
            cell_size,
            cells: HashMap::new(),
            memberships: HashMap::new(),
        }
    }

    fn cell_of(&self, position: [f32; 3]) -> Cell {
        (
            (position[0] / self.cell_size).floor() as i32,
            (position[1] / self.cell_size).floor() as i32,
            (position[2] / self.cell_size).floor() as i32,
        )
    }

    /// Inserts or moves `entity` to the cell containing `position`.
    pub fn update(&mut self, entity: Entity, position: [f32; 3]) {
        let cell = self.cell_of(position);
        match self.memberships.get(&entity) {
            Some(current) if *current == cell => {}
            _ => {
                // the stale entry in the old cell is swept at query time; a
                // stale entry in the re-entered cell must not be duplicated
                self.memberships.insert(entity, cell);
                let entries = self.cells.entry(cell).or_default();
                if !entries.contains(&entity) {
                    entries.push(entity);
                }
            }
        }
    }

    /// Removes `entity`; its cell entries become stale and are swept lazily.
    pub fn remove(&mut self, entity: Entity) {
        self.memberships.remove(&entity);
    }

    pub fn contains(&self, entity: Entity) -> bool {
        self.memberships.contains_key(&entity)
    }

    pub fn len(&self) -> usize {
        self.memberships.len()
    }

    pub fn is_empty(&self) -> bool {
        self.memberships.is_empty()
    }

    /// Entities whose current cell intersects the axis-aligned cube of
    /// half-extent `radius` around `center`. Cell-granular: the caller
    /// applies the precise distance test. Results are unordered and free of
    /// duplicates; stale entries encountered along the way are dropped.
    pub fn query(&mut self, center: [f32; 3], radius: f32) -> Vec<Entity> {
        let min = self.cell_of([center[0] - radius, center[1] - radius, center[2] - radius]);
        let max = self.cell_of([center[0] + radius, center[1] + radius, center[2] + radius]);

        let mut result = Vec::new();
        for x in min.0..=max.0 {
            for y in min.1..=max.1 {
                for z in min.2..=max.2 {
                    let cell = (x, y, z);
                    let Some(entries) = self.cells.get_mut(&cell) else {
                        continue;
                    };
                    // sweep: keep only entries that still live in this cell
                    let memberships = &self.memberships;
                    entries.retain(|entry| memberships.get(entry) == Some(&cell));
                    if entries.is_empty() {
                        self.cells.remove(&cell);
                        continue;
                    }
                    result.extend(entries.iter().copied());
                }
            }
        }
        result
    }
}
