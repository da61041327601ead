use crate::component::{Component, ComponentKind};

/// Position, orientation and velocity. The single source of truth for
/// spatial index membership.
#[derive(Clone, Debug, PartialEq)]
pub struct Transform {
    pub position: [f32; 3],
    /// Orientation quaternion (x, y, z, w).
    pub orientation: [f32; 4],
    pub velocity: [f32; 3],
}

impl Transform {
    pub fn at(position: [f32; 3]) -> Self {
        Self {
            position,
            ..Self::default()
        }
    }
}

impl Default for Transform {
    fn default() -> Self {
        Self {
            position: [0.0, 0.0, 0.0],
            orientation: [0.0, 0.0, 0.0, 1.0],
            velocity: [0.0, 0.0, 0.0],
        }
    }
}

impl Component for Transform {
    const KIND: ComponentKind = ComponentKind::Transform;
}
