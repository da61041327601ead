use realm_world::{Entity, HasStorage, Tag, TagCategory, Transform, World};

/// Update cadence bands by distance. The boundary of the last band is the
/// max view distance, which is itself excluded.
const BANDS: [(f32, u8); 5] = [(20.0, 30), (50.0, 15), (100.0, 10), (150.0, 5), (f32::MAX, 2)];

/// One entity an observer should hear about this tick.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct InterestEntry {
    pub entity: Entity,
    pub distance: f32,
    /// Updates per second this entity deserves at this distance.
    pub update_rate_hz: u8,
}

/// Updates per second for an entity at `distance`, with `max_view` as the
/// hard cutoff. Exactly at `max_view` is out of interest (0 Hz).
pub fn update_rate_for_distance(distance: f32, max_view: f32) -> u8 {
    if distance >= max_view {
        return 0;
    }
    for (bound, rate) in BANDS {
        if distance <= bound {
            return rate;
        }
    }
    0
}

/// Priority boost multiplier for entity categories an observer cares most
/// about.
fn category_boost(category: Option<TagCategory>) -> f32 {
    match category {
        Some(TagCategory::Player) | Some(TagCategory::Boss) => 0.5,
        _ => 1.0,
    }
}

/// The top-K nearest entities around `center`, excluding `observer`
/// itself, with players and bosses boosted ahead of scenery at equal
/// distance. Entities at or beyond `max_view` are excluded outright.
pub fn compute_interest(
    world: &mut World,
    observer: Entity,
    center: [f32; 3],
    k: usize,
    max_view: f32,
) -> Vec<InterestEntry> {
    let nearby = world.entities_within(center, max_view);

    let mut entries: Vec<(f32, InterestEntry)> = Vec::with_capacity(nearby.len());
    for entity in nearby {
        if entity == observer {
            continue;
        }
        let Some(transform) = world.get_component::<Transform>(entity) else {
            continue;
        };
        let dx = transform.position[0] - center[0];
        let dy = transform.position[1] - center[1];
        let dz = transform.position[2] - center[2];
        let distance = (dx * dx + dy * dy + dz * dz).sqrt();

        let category = HasStorage::<Tag>::storage(world)
            .get(entity)
            .map(|tag| tag.category);
        let ranking = distance * category_boost(category);

        entries.push((
            ranking,
            InterestEntry {
                entity,
                distance,
                update_rate_hz: update_rate_for_distance(distance, max_view),
            },
        ));
    }

    entries.sort_by(|a, b| a.0.partial_cmp(&b.0).unwrap_or(std::cmp::Ordering::Equal));
    entries.truncate(k);
    entries.into_iter().map(|(_, entry)| entry).collect()
}
