//! # Realm AI
//! Behavior tree runtime for non-player actors: composite/decorator/leaf
//! execution over an (actor, blackboard) pair, a declarative builder, and a
//! name-keyed factory.

mod behaviors;
mod blackboard;
mod builder;
mod error;
mod factory;
mod node;
mod tree;

pub use behaviors::{
    attack_target, find_target, flee_to, has_target, is_low_health, move_to_target, patrol,
    AiActor, KEY_PATROL_INDEX, KEY_TARGET,
};
pub use blackboard::{BbValue, Blackboard};
pub use builder::TreeBuilder;
pub use error::{BuildError, FactoryError};
pub use factory::TreeFactory;
pub use node::{ActionFn, ConditionFn, NodeIndex, NodeStatus, ParallelPolicy};
pub use tree::BehaviorTree;
