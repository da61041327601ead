use crate::blackboard::Blackboard;
use crate::node::{Node, NodeIndex, NodeKind, NodeStatus, ParallelPolicy};

/// One behavior tree instance: an arena of nodes, the root index, and the
/// blackboard scoped to this instance's lifetime.
pub struct BehaviorTree<A> {
    name: String,
    nodes: Vec<Node<A>>,
    root: NodeIndex,
    blackboard: Blackboard,
}

impl<A> std::fmt::Debug for BehaviorTree<A> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BehaviorTree")
            .field("name", &self.name)
            .field("node_count", &self.nodes.len())
            .field("root", &self.root)
            .finish()
    }
}

impl<A> BehaviorTree<A> {
    pub(crate) fn new(name: String, nodes: Vec<Node<A>>, root: NodeIndex) -> Self {
        Self {
            name,
            nodes,
            root,
            blackboard: Blackboard::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn blackboard(&self) -> &Blackboard {
        &self.blackboard
    }

    pub fn blackboard_mut(&mut self) -> &mut Blackboard {
        &mut self.blackboard
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Executes one tick of the tree against `actor`.
    pub fn execute(&mut self, actor: &mut A) -> NodeStatus {
        let root = self.root;
        let mut blackboard = std::mem::take(&mut self.blackboard);
        let status = execute_node(&mut self.nodes, root, actor, &mut blackboard);
        self.blackboard = blackboard;
        status
    }

    /// The status the root reported on the most recent execute (Idle
    /// before the first, and again after a reset).
    pub fn last_status(&self) -> NodeStatus {
        self.nodes[self.root].state.last_status
    }

    /// Clears all per-node iteration state, depth-first. Idempotent.
    pub fn reset(&mut self) {
        reset_node(&mut self.nodes, self.root);
    }
}

fn reset_node<A>(nodes: &mut Vec<Node<A>>, index: NodeIndex) {
    nodes[index].state.clear();
    let children = owned_children(&nodes[index].kind);
    for child in children {
        reset_node(nodes, child);
    }
}

fn owned_children<A>(kind: &NodeKind<A>) -> Vec<NodeIndex> {
    match kind {
        NodeKind::Sequence { children }
        | NodeKind::Selector { children }
        | NodeKind::Parallel { children, .. } => children.clone(),
        NodeKind::Inverter { child }
        | NodeKind::Repeater { child, .. }
        | NodeKind::Condition { child, .. } => vec![*child],
        NodeKind::Action { .. } | NodeKind::Taken => Vec::new(),
    }
}

/// Executes one node. The node's kind is checked out of the arena for the
/// duration so children (always distinct nodes) can be executed through the
/// same slice.
fn execute_node<A>(
    nodes: &mut Vec<Node<A>>,
    index: NodeIndex,
    actor: &mut A,
    blackboard: &mut Blackboard,
) -> NodeStatus {
    let mut kind = std::mem::replace(&mut nodes[index].kind, NodeKind::Taken);
    let status = match &mut kind {
        NodeKind::Sequence { children } => {
            execute_sequence(nodes, index, children, actor, blackboard)
        }
        NodeKind::Selector { children } => {
            execute_selector(nodes, index, children, actor, blackboard)
        }
        NodeKind::Parallel {
            children,
            success,
            failure,
        } => execute_parallel(nodes, index, children, *success, *failure, actor, blackboard),
        NodeKind::Inverter { child } => match execute_node(nodes, *child, actor, blackboard) {
            NodeStatus::Success => NodeStatus::Failure,
            NodeStatus::Failure => NodeStatus::Success,
            passthrough => passthrough,
        },
        NodeKind::Repeater { child, count } => {
            execute_repeater(nodes, index, *child, *count, actor, blackboard)
        }
        NodeKind::Condition { child, predicate } => {
            if predicate(actor, blackboard) {
                execute_node(nodes, *child, actor, blackboard)
            } else {
                NodeStatus::Failure
            }
        }
        NodeKind::Action { action } => action(actor, blackboard),
        NodeKind::Taken => NodeStatus::Failure,
    };
    nodes[index].kind = kind;
    nodes[index].state.last_status = status;
    status
}

fn execute_sequence<A>(
    nodes: &mut Vec<Node<A>>,
    index: NodeIndex,
    children: &[NodeIndex],
    actor: &mut A,
    blackboard: &mut Blackboard,
) -> NodeStatus {
    loop {
        let cursor = nodes[index].state.cursor;
        if cursor >= children.len() {
            nodes[index].state.cursor = 0;
            return NodeStatus::Success;
        }
        match execute_node(nodes, children[cursor], actor, blackboard) {
            NodeStatus::Running => return NodeStatus::Running,
            NodeStatus::Failure => {
                nodes[index].state.cursor = 0;
                return NodeStatus::Failure;
            }
            NodeStatus::Success | NodeStatus::Idle => {
                nodes[index].state.cursor += 1;
            }
        }
    }
}

fn execute_selector<A>(
    nodes: &mut Vec<Node<A>>,
    index: NodeIndex,
    children: &[NodeIndex],
    actor: &mut A,
    blackboard: &mut Blackboard,
) -> NodeStatus {
    loop {
        let cursor = nodes[index].state.cursor;
        if cursor >= children.len() {
            nodes[index].state.cursor = 0;
            return NodeStatus::Failure;
        }
        match execute_node(nodes, children[cursor], actor, blackboard) {
            NodeStatus::Running => return NodeStatus::Running,
            NodeStatus::Success => {
                nodes[index].state.cursor = 0;
                return NodeStatus::Success;
            }
            NodeStatus::Failure | NodeStatus::Idle => {
                nodes[index].state.cursor += 1;
            }
        }
    }
}

fn execute_parallel<A>(
    nodes: &mut Vec<Node<A>>,
    index: NodeIndex,
    children: &[NodeIndex],
    success: ParallelPolicy,
    failure: ParallelPolicy,
    actor: &mut A,
    blackboard: &mut Blackboard,
) -> NodeStatus {
    if children.is_empty() {
        return NodeStatus::Success;
    }

    let mut running = 0usize;
    for (slot, child) in children.iter().enumerate() {
        let already_terminal = nodes[index].state.child_statuses[slot]
            .map(NodeStatus::is_terminal)
            .unwrap_or(false);
        if already_terminal {
            continue;
        }
        let status = execute_node(nodes, *child, actor, blackboard);
        nodes[index].state.child_statuses[slot] = Some(status);
        if status == NodeStatus::Running {
            running += 1;
        }
    }

    let successes = nodes[index]
        .state
        .child_statuses
        .iter()
        .filter(|slot| **slot == Some(NodeStatus::Success))
        .count();
    let failures = nodes[index]
        .state
        .child_statuses
        .iter()
        .filter(|slot| **slot == Some(NodeStatus::Failure))
        .count();

    // success policy is evaluated before the failure policy when both could
    // fire in the same tick
    let success_fired = match success {
        ParallelPolicy::RequireOne => successes >= 1,
        ParallelPolicy::RequireAll => successes == children.len(),
    };
    if success_fired {
        return NodeStatus::Success;
    }

    let failure_fired = match failure {
        ParallelPolicy::RequireOne => failures >= 1,
        ParallelPolicy::RequireAll => failures == children.len(),
    };
    if failure_fired {
        return NodeStatus::Failure;
    }

    if running > 0 {
        NodeStatus::Running
    } else {
        // every child is terminal yet neither policy fired
        NodeStatus::Failure
    }
}

fn execute_repeater<A>(
    nodes: &mut Vec<Node<A>>,
    index: NodeIndex,
    child: NodeIndex,
    count: i32,
    actor: &mut A,
    blackboard: &mut Blackboard,
) -> NodeStatus {
    // zero repeats: succeed without touching the child
    if count == 0 {
        return NodeStatus::Success;
    }

    match execute_node(nodes, child, actor, blackboard) {
        NodeStatus::Running => NodeStatus::Running,
        NodeStatus::Failure => {
            reset_node(nodes, child);
            nodes[index].state.completed_runs = 0;
            if count < 0 {
                NodeStatus::Running
            } else {
                NodeStatus::Failure
            }
        }
        NodeStatus::Success | NodeStatus::Idle => {
            reset_node(nodes, child);
            if count < 0 {
                return NodeStatus::Running;
            }
            nodes[index].state.completed_runs += 1;
            if nodes[index].state.completed_runs >= count as u32 {
                nodes[index].state.completed_runs = 0;
                NodeStatus::Success
            } else {
                NodeStatus::Running
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::TreeBuilder;

    /// Minimal actor for the runtime tests: a counter per named action.
    #[derive(Default)]
    struct Probe {
        calls: Vec<&'static str>,
    }

    fn action_returning(
        label: &'static str,
        status: NodeStatus,
    ) -> crate::node::ActionFn<Probe> {
        Box::new(move |actor: &mut Probe, _bb| {
            actor.calls.push(label);
            status
        })
    }

    fn build_tree(
        build: impl FnOnce(&mut TreeBuilder<Probe>),
    ) -> BehaviorTree<Probe> {
        let mut builder = TreeBuilder::new("test");
        build(&mut builder);
        builder.build().unwrap()
    }

    #[test]
    fn empty_sequence_succeeds() {
        let mut tree = build_tree(|builder| {
            builder.sequence();
            builder.end();
        });
        let mut probe = Probe::default();
        assert_eq!(tree.execute(&mut probe), NodeStatus::Success);
    }

    #[test]
    fn empty_selector_fails() {
        let mut tree = build_tree(|builder| {
            builder.selector();
            builder.end();
        });
        let mut probe = Probe::default();
        assert_eq!(tree.execute(&mut probe), NodeStatus::Failure);
    }

    #[test]
    fn empty_parallel_succeeds() {
        let mut tree = build_tree(|builder| {
            builder.parallel(ParallelPolicy::RequireAll, ParallelPolicy::RequireOne);
            builder.end();
        });
        let mut probe = Probe::default();
        assert_eq!(tree.execute(&mut probe), NodeStatus::Success);
    }

    #[test]
    fn sequence_stops_at_first_failure() {
        let mut tree = build_tree(|builder| {
            builder.sequence();
            builder.action("a", action_returning("a", NodeStatus::Success));
            builder.action("b", action_returning("b", NodeStatus::Failure));
            builder.action("c", action_returning("c", NodeStatus::Success));
            builder.end();
        });
        let mut probe = Probe::default();

        assert_eq!(tree.execute(&mut probe), NodeStatus::Failure);
        assert_eq!(probe.calls, vec!["a", "b"]);
    }

    #[test]
    fn sequence_resumes_from_running_child() {
        let mut tree = build_tree(|builder| {
            builder.sequence();
            builder.action("a", action_returning("a", NodeStatus::Success));
            builder.action("b", action_returning("b", NodeStatus::Running));
            builder.end();
        });
        let mut probe = Probe::default();

        assert_eq!(tree.execute(&mut probe), NodeStatus::Running);
        assert_eq!(tree.execute(&mut probe), NodeStatus::Running);
        // "a" ran once; "b" ran both ticks
        assert_eq!(probe.calls, vec!["a", "b", "b"]);
    }

    #[test]
    fn selector_stops_at_first_success() {
        let mut tree = build_tree(|builder| {
            builder.selector();
            builder.action("a", action_returning("a", NodeStatus::Failure));
            builder.action("b", action_returning("b", NodeStatus::Success));
            builder.action("c", action_returning("c", NodeStatus::Success));
            builder.end();
        });
        let mut probe = Probe::default();

        assert_eq!(tree.execute(&mut probe), NodeStatus::Success);
        assert_eq!(probe.calls, vec!["a", "b"]);
    }

    #[test]
    fn inverter_swaps_terminal_statuses() {
        let mut tree = build_tree(|builder| {
            builder.inverter();
            builder.action("a", action_returning("a", NodeStatus::Success));
        });
        let mut probe = Probe::default();
        assert_eq!(tree.execute(&mut probe), NodeStatus::Failure);
    }

    #[test]
    fn inverter_passes_running_through() {
        let mut tree = build_tree(|builder| {
            builder.inverter();
            builder.action("a", action_returning("a", NodeStatus::Running));
        });
        let mut probe = Probe::default();
        assert_eq!(tree.execute(&mut probe), NodeStatus::Running);
    }

    #[test]
    fn repeater_zero_succeeds_without_executing() {
        let mut tree = build_tree(|builder| {
            builder.repeater(0);
            builder.action("a", action_returning("a", NodeStatus::Success));
        });
        let mut probe = Probe::default();

        assert_eq!(tree.execute(&mut probe), NodeStatus::Success);
        assert!(probe.calls.is_empty());
    }

    #[test]
    fn repeater_accumulates_successes() {
        let mut tree = build_tree(|builder| {
            builder.repeater(3);
            builder.action("a", action_returning("a", NodeStatus::Success));
        });
        let mut probe = Probe::default();

        assert_eq!(tree.execute(&mut probe), NodeStatus::Running);
        assert_eq!(tree.execute(&mut probe), NodeStatus::Running);
        assert_eq!(tree.execute(&mut probe), NodeStatus::Success);
        assert_eq!(probe.calls.len(), 3);
    }

    #[test]
    fn repeater_fails_on_child_failure() {
        let mut tree = build_tree(|builder| {
            builder.repeater(3);
            builder.action("a", action_returning("a", NodeStatus::Failure));
        });
        let mut probe = Probe::default();
        assert_eq!(tree.execute(&mut probe), NodeStatus::Failure);
    }

    #[test]
    fn infinite_repeater_always_runs() {
        let mut tree = build_tree(|builder| {
            builder.repeater(-1);
            builder.action("a", action_returning("a", NodeStatus::Success));
        });
        let mut probe = Probe::default();

        for _ in 0..10 {
            assert_eq!(tree.execute(&mut probe), NodeStatus::Running);
        }
        assert_eq!(probe.calls.len(), 10);
    }

    #[test]
    fn condition_false_skips_child() {
        let mut tree = build_tree(|builder| {
            builder.condition(Box::new(|_actor: &Probe, _bb| false));
            builder.action("a", action_returning("a", NodeStatus::Success));
        });
        let mut probe = Probe::default();

        assert_eq!(tree.execute(&mut probe), NodeStatus::Failure);
        assert!(probe.calls.is_empty());
    }

    #[test]
    fn condition_true_returns_child_status() {
        let mut tree = build_tree(|builder| {
            builder.condition(Box::new(|_actor: &Probe, _bb| true));
            builder.action("a", action_returning("a", NodeStatus::Running));
        });
        let mut probe = Probe::default();
        assert_eq!(tree.execute(&mut probe), NodeStatus::Running);
    }

    #[test]
    fn parallel_require_one_success_terminates() {
        let mut tree = build_tree(|builder| {
            builder.parallel(ParallelPolicy::RequireOne, ParallelPolicy::RequireAll);
            builder.action("a", action_returning("a", NodeStatus::Running));
            builder.action("b", action_returning("b", NodeStatus::Success));
            builder.end();
        });
        let mut probe = Probe::default();
        assert_eq!(tree.execute(&mut probe), NodeStatus::Success);
    }

    #[test]
    fn parallel_terminal_child_is_not_reexecuted() {
        let mut tree = build_tree(|builder| {
            builder.parallel(ParallelPolicy::RequireAll, ParallelPolicy::RequireOne);
            builder.action("done", action_returning("done", NodeStatus::Success));
            builder.action("busy", action_returning("busy", NodeStatus::Running));
            builder.end();
        });
        let mut probe = Probe::default();

        assert_eq!(tree.execute(&mut probe), NodeStatus::Running);
        assert_eq!(tree.execute(&mut probe), NodeStatus::Running);
        // "done" executed once, "busy" twice
        assert_eq!(probe.calls, vec!["done", "busy", "busy"]);
    }

    #[test]
    fn parallel_success_policy_wins_over_failure_policy() {
        let mut tree = build_tree(|builder| {
            builder.parallel(ParallelPolicy::RequireOne, ParallelPolicy::RequireOne);
            builder.action("good", action_returning("good", NodeStatus::Success));
            builder.action("bad", action_returning("bad", NodeStatus::Failure));
            builder.end();
        });
        let mut probe = Probe::default();
        assert_eq!(tree.execute(&mut probe), NodeStatus::Success);
    }

    #[test]
    fn last_status_tracks_the_root() {
        let mut tree = build_tree(|builder| {
            builder.action("a", action_returning("a", NodeStatus::Success));
        });
        assert_eq!(tree.last_status(), NodeStatus::Idle);

        tree.execute(&mut Probe::default());
        assert_eq!(tree.last_status(), NodeStatus::Success);

        tree.reset();
        assert_eq!(tree.last_status(), NodeStatus::Idle);
    }

    #[test]
    fn reset_then_execute_matches_first_execute() {
        let mut tree = build_tree(|builder| {
            builder.sequence();
            builder.action("a", action_returning("a", NodeStatus::Success));
            builder.action("b", action_returning("b", NodeStatus::Running));
            builder.end();
        });

        let mut first_probe = Probe::default();
        let first = tree.execute(&mut first_probe);

        tree.execute(&mut Probe::default());
        tree.reset();
        tree.reset(); // idempotent

        let mut probe = Probe::default();
        assert_eq!(tree.execute(&mut probe), first);
        assert_eq!(probe.calls, first_probe.calls);
    }

    #[test]
    fn blackboard_is_scoped_to_the_instance() {
        let mut tree = build_tree(|builder| {
            builder.action(
                "remember",
                Box::new(|_actor: &mut Probe, blackboard| {
                    let seen = blackboard.get_int("seen").unwrap_or(0);
                    blackboard.set_int("seen", seen + 1);
                    NodeStatus::Success
                }),
            );
        });
        let mut probe = Probe::default();

        tree.execute(&mut probe);
        tree.execute(&mut probe);
        assert_eq!(tree.blackboard().get_int("seen"), Some(2));
    }
}
