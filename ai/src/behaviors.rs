//! Stock leaf and condition vocabulary for actor trees.
//!
//! These are mechanisms, not content: radii, waypoints and thresholds all
//! arrive as parameters from whatever data source defines the trees. Actors
//! expose their world through the [`AiActor`] capability trait so the tree
//! runtime stays independent of the world representation.

use crate::blackboard::Blackboard;
use crate::node::{ActionFn, ConditionFn, NodeStatus};

/// Blackboard key holding the current target entity.
pub const KEY_TARGET: &str = "target";

/// Blackboard key holding the current patrol waypoint index.
pub const KEY_PATROL_INDEX: &str = "patrol_index";

/// What a behavior-tree actor can observe and do in its world.
pub trait AiActor {
    fn position(&self) -> [f32; 3];

    /// Nearest hostile within `radius`, if any.
    fn find_hostile_within(&self, radius: f32) -> Option<u64>;

    fn position_of(&self, entity: u64) -> Option<[f32; 3]>;

    /// Requests movement toward a point this tick.
    fn move_toward(&mut self, target: [f32; 3]);

    /// Attempts an attack; false when out of range, dead, or on cooldown.
    fn attack(&mut self, target: u64) -> bool;

    /// Current health as a fraction of maximum.
    fn health_fraction(&self) -> f32;
}

fn distance(a: [f32; 3], b: [f32; 3]) -> f32 {
    let dx = a[0] - b[0];
    let dy = a[1] - b[1];
    let dz = a[2] - b[2];
    (dx * dx + dy * dy + dz * dz).sqrt()
}

/// Scans for a hostile within `radius` and stores it under [`KEY_TARGET`].
/// Succeeds when a target is found or already known and still present.
pub fn find_target<A: AiActor>(radius: f32) -> ActionFn<A> {
    Box::new(move |actor: &mut A, blackboard: &mut Blackboard| {
        if let Some(existing) = blackboard.get_entity(KEY_TARGET) {
            if actor.position_of(existing).is_some() {
                return NodeStatus::Success;
            }
            blackboard.remove(KEY_TARGET);
        }
        match actor.find_hostile_within(radius) {
            Some(target) => {
                blackboard.set_entity(KEY_TARGET, target);
                NodeStatus::Success
            }
            None => NodeStatus::Failure,
        }
    })
}

/// Moves toward the blackboard target until within `arrive_distance`.
/// Running while approaching, success on arrival, failure when the target
/// is gone.
pub fn move_to_target<A: AiActor>(arrive_distance: f32) -> ActionFn<A> {
    Box::new(move |actor: &mut A, blackboard: &mut Blackboard| {
        let Some(target) = blackboard.get_entity(KEY_TARGET) else {
            return NodeStatus::Failure;
        };
        let Some(goal) = actor.position_of(target) else {
            blackboard.remove(KEY_TARGET);
            return NodeStatus::Failure;
        };
        if distance(actor.position(), goal) <= arrive_distance {
            return NodeStatus::Success;
        }
        actor.move_toward(goal);
        NodeStatus::Running
    })
}

/// Attacks the blackboard target. Success on a landed attack, running while
/// the attack is unavailable, failure when the target is gone.
pub fn attack_target<A: AiActor>() -> ActionFn<A> {
    Box::new(move |actor: &mut A, blackboard: &mut Blackboard| {
        let Some(target) = blackboard.get_entity(KEY_TARGET) else {
            return NodeStatus::Failure;
        };
        if actor.position_of(target).is_none() {
            blackboard.remove(KEY_TARGET);
            return NodeStatus::Failure;
        }
        if actor.attack(target) {
            NodeStatus::Success
        } else {
            NodeStatus::Running
        }
    })
}

/// Walks the waypoint loop, advancing the blackboard index on each arrival.
/// Always running: a patrol has no natural end.
pub fn patrol<A: AiActor>(waypoints: Vec<[f32; 3]>, arrive_distance: f32) -> ActionFn<A> {
    Box::new(move |actor: &mut A, blackboard: &mut Blackboard| {
        if waypoints.is_empty() {
            return NodeStatus::Failure;
        }
        let index = blackboard.get_int(KEY_PATROL_INDEX).unwrap_or(0) as usize % waypoints.len();
        let goal = waypoints[index];
        if distance(actor.position(), goal) <= arrive_distance {
            let next = (index + 1) % waypoints.len();
            blackboard.set_int(KEY_PATROL_INDEX, next as i64);
            actor.move_toward(waypoints[next]);
        } else {
            actor.move_toward(goal);
        }
        NodeStatus::Running
    })
}

/// Moves toward a fixed retreat point. Success on arrival.
pub fn flee_to<A: AiActor>(retreat: [f32; 3], arrive_distance: f32) -> ActionFn<A> {
    Box::new(move |actor: &mut A, _blackboard: &mut Blackboard| {
        if distance(actor.position(), retreat) <= arrive_distance {
            return NodeStatus::Success;
        }
        actor.move_toward(retreat);
        NodeStatus::Running
    })
}

/// Condition: health below `threshold` of maximum.
pub fn is_low_health<A: AiActor>(threshold: f32) -> ConditionFn<A> {
    Box::new(move |actor: &A, _blackboard: &Blackboard| actor.health_fraction() < threshold)
}

/// Condition: a target is on the blackboard.
pub fn has_target<A: AiActor>() -> ConditionFn<A> {
    Box::new(|_actor: &A, blackboard: &Blackboard| blackboard.get_entity(KEY_TARGET).is_some())
}
