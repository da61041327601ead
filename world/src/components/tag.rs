use crate::component::{Component, ComponentKind};

/// Broad category used for interest priority and hostility filtering.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TagCategory {
    Player,
    Npc,
    Monster,
    Boss,
    Object,
    Projectile,
}

impl TagCategory {
    /// Stable wire code for replication.
    pub fn code(self) -> u8 {
        match self {
            TagCategory::Player => 0,
            TagCategory::Npc => 1,
            TagCategory::Monster => 2,
            TagCategory::Boss => 3,
            TagCategory::Object => 4,
            TagCategory::Projectile => 5,
        }
    }
}

/// Human-readable name and category.
#[derive(Clone, Debug, PartialEq)]
pub struct Tag {
    pub name: String,
    pub category: TagCategory,
}

impl Tag {
    pub fn new(name: &str, category: TagCategory) -> Self {
        Self {
            name: name.to_string(),
            category,
        }
    }
}

impl Component for Tag {
    const KIND: ComponentKind = ComponentKind::Tag;
}
