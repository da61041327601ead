use crate::blackboard::Blackboard;

/// Index of a node within its tree's arena. Nodes never outlive their tree
/// and are freed by dropping the arena, so no shared ownership is needed.
pub type NodeIndex = usize;

/// Result of executing a behavior tree node for one tick.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NodeStatus {
    Idle,
    Running,
    Success,
    Failure,
}

impl NodeStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, NodeStatus::Success | NodeStatus::Failure)
    }
}

/// Termination policy for a parallel node, applied separately to success
/// and failure.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ParallelPolicy {
    RequireOne,
    RequireAll,
}

/// A leaf action: an opaque callable over the actor and the tree's
/// blackboard.
pub type ActionFn<A> = Box<dyn FnMut(&mut A, &mut Blackboard) -> NodeStatus + Send>;

/// A condition predicate gating a decorator's child.
pub type ConditionFn<A> = Box<dyn Fn(&A, &Blackboard) -> bool + Send>;

pub(crate) enum NodeKind<A> {
    Sequence {
        children: Vec<NodeIndex>,
    },
    Selector {
        children: Vec<NodeIndex>,
    },
    Parallel {
        children: Vec<NodeIndex>,
        success: ParallelPolicy,
        failure: ParallelPolicy,
    },
    Inverter {
        child: NodeIndex,
    },
    Repeater {
        child: NodeIndex,
        /// -1 repeats forever.
        count: i32,
    },
    Condition {
        child: NodeIndex,
        predicate: ConditionFn<A>,
    },
    Action {
        action: ActionFn<A>,
    },
    /// Transient marker while a node's kind is checked out during
    /// execution; never observable between calls.
    Taken,
}

/// Per-node iteration state, cleared by reset.
pub(crate) struct NodeState {
    /// Current child for sequence/selector.
    pub cursor: usize,
    /// Accumulated successes for repeater.
    pub completed_runs: u32,
    /// Terminal results already reported by parallel children.
    pub child_statuses: Vec<Option<NodeStatus>>,
    pub last_status: NodeStatus,
}

impl NodeState {
    pub fn new(child_count: usize) -> Self {
        Self {
            cursor: 0,
            completed_runs: 0,
            child_statuses: vec![None; child_count],
            last_status: NodeStatus::Idle,
        }
    }

    pub fn clear(&mut self) {
        self.cursor = 0;
        self.completed_runs = 0;
        for slot in &mut self.child_statuses {
            *slot = None;
        }
        self.last_status = NodeStatus::Idle;
    }
}

pub(crate) struct Node<A> {
    pub name: String,
    pub kind: NodeKind<A>,
    pub state: NodeState,
}
