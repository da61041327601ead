use crate::component::{Component, ComponentKind};
use crate::components::tag::TagCategory;

/// Marks an entity as driven by a named behavior tree. The tree itself is
/// instantiated by the behavior system from the tree factory; this component
/// only carries the data-driven parameters.
#[derive(Clone, Debug, PartialEq)]
pub struct AiAgent {
    /// Factory name of the tree to instantiate.
    pub tree: String,
    /// Categories this agent treats as hostile.
    pub hostile_categories: Vec<TagCategory>,
    /// How far the agent can sense hostiles.
    pub sensor_radius: f32,
}

impl AiAgent {
    pub fn new(tree: &str, hostile_categories: Vec<TagCategory>, sensor_radius: f32) -> Self {
        Self {
            tree: tree.to_string(),
            hostile_categories,
            sensor_radius,
        }
    }
}

impl Component for AiAgent {
    const KIND: ComponentKind = ComponentKind::AiAgent;
}
