use crate::error::BuildError;
use crate::node::{
    ActionFn, ConditionFn, Node, NodeIndex, NodeKind, NodeState, ParallelPolicy,
};
use crate::tree::BehaviorTree;

/// An open scope on the builder's nesting stack. Composites stay open until
/// `end()`; a decorator adopts exactly the next declared node and closes
/// itself.
enum Scope {
    Composite(NodeIndex),
    Decorator(NodeIndex),
}

/// Assembles a behavior tree from a declarative left-to-right description.
///
/// A parent-composite stack tracks nesting, so
/// `selector / sequence / action.. / end / action / end` reads in
/// declaration order. Validation problems are collected and reported
/// together by `build()`.
pub struct TreeBuilder<A> {
    name: String,
    nodes: Vec<Node<A>>,
    stack: Vec<Scope>,
    root: Option<NodeIndex>,
    errors: Vec<BuildError>,
}

impl<A> TreeBuilder<A> {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            nodes: Vec::new(),
            stack: Vec::new(),
            root: None,
            errors: Vec::new(),
        }
    }

    /// Opens a sequence composite.
    pub fn sequence(&mut self) -> &mut Self {
        let index = self.push_node("sequence", NodeKind::Sequence { children: Vec::new() });
        self.attach(index);
        self.stack.push(Scope::Composite(index));
        self
    }

    /// Opens a selector composite.
    pub fn selector(&mut self) -> &mut Self {
        let index = self.push_node("selector", NodeKind::Selector { children: Vec::new() });
        self.attach(index);
        self.stack.push(Scope::Composite(index));
        self
    }

    /// Opens a parallel composite with its termination policies.
    pub fn parallel(&mut self, success: ParallelPolicy, failure: ParallelPolicy) -> &mut Self {
        let index = self.push_node(
            "parallel",
            NodeKind::Parallel {
                children: Vec::new(),
                success,
                failure,
            },
        );
        self.attach(index);
        self.stack.push(Scope::Composite(index));
        self
    }

    /// Closes the innermost open composite.
    pub fn end(&mut self) -> &mut Self {
        match self.stack.pop() {
            Some(Scope::Composite(_)) => {
                self.close_finished_decorators();
            }
            Some(scope @ Scope::Decorator(_)) => {
                // a decorator is closed by its child, not by end(); put it
                // back and record the misuse
                self.stack.push(scope);
                self.errors.push(BuildError::EndWithoutScope {
                    tree: self.name.clone(),
                });
            }
            None => {
                self.errors.push(BuildError::EndWithoutScope {
                    tree: self.name.clone(),
                });
            }
        }
        self
    }

    /// Declares an inverter decorator over the next node.
    pub fn inverter(&mut self) -> &mut Self {
        let index = self.push_node("inverter", NodeKind::Inverter { child: usize::MAX });
        self.attach(index);
        self.stack.push(Scope::Decorator(index));
        self
    }

    /// Declares a repeater decorator over the next node. -1 repeats forever.
    pub fn repeater(&mut self, count: i32) -> &mut Self {
        let index = self.push_node(
            "repeater",
            NodeKind::Repeater {
                child: usize::MAX,
                count,
            },
        );
        self.attach(index);
        self.stack.push(Scope::Decorator(index));
        self
    }

    /// Declares a condition decorator over the next node.
    pub fn condition(&mut self, predicate: ConditionFn<A>) -> &mut Self {
        let index = self.push_node(
            "condition",
            NodeKind::Condition {
                child: usize::MAX,
                predicate,
            },
        );
        self.attach(index);
        self.stack.push(Scope::Decorator(index));
        self
    }

    /// Declares a leaf action.
    pub fn action(&mut self, name: &str, action: ActionFn<A>) -> &mut Self {
        let index = self.push_node(name, NodeKind::Action { action });
        self.attach(index);
        self.close_finished_decorators();
        self
    }

    /// Validates and materializes the tree, reporting every problem found.
    pub fn build(mut self) -> Result<BehaviorTree<A>, Vec<BuildError>> {
        if !self.stack.is_empty() {
            let open_composites = self
                .stack
                .iter()
                .filter(|scope| matches!(scope, Scope::Composite(_)))
                .count();
            if open_composites > 0 {
                self.errors.push(BuildError::UnclosedScopes {
                    tree: self.name.clone(),
                    count: open_composites,
                });
            }
        }

        let Some(root) = self.root else {
            self.errors.push(BuildError::EmptyTree {
                tree: self.name.clone(),
            });
            return Err(self.errors);
        };

        for node in &self.nodes {
            match &node.kind {
                NodeKind::Sequence { children }
                | NodeKind::Selector { children }
                | NodeKind::Parallel { children, .. } => {
                    if children.is_empty() {
                        self.errors.push(BuildError::EmptyComposite {
                            node: node.name.clone(),
                        });
                    }
                }
                NodeKind::Inverter { child }
                | NodeKind::Repeater { child, .. }
                | NodeKind::Condition { child, .. } => {
                    if *child == usize::MAX {
                        self.errors.push(BuildError::MissingDecoratorChild {
                            node: node.name.clone(),
                        });
                    }
                }
                NodeKind::Action { .. } | NodeKind::Taken => {}
            }
        }

        if !self.errors.is_empty() {
            return Err(self.errors);
        }

        // parallel nodes size their status vectors to their children
        for node in &mut self.nodes {
            if let NodeKind::Parallel { children, .. } = &node.kind {
                node.state = NodeState::new(children.len());
            }
        }

        Ok(BehaviorTree::new(self.name, self.nodes, root))
    }

    fn push_node(&mut self, name: &str, kind: NodeKind<A>) -> NodeIndex {
        let index = self.nodes.len();
        self.nodes.push(Node {
            name: name.to_string(),
            kind,
            state: NodeState::new(0),
        });
        index
    }

    /// Attaches a freshly declared node to the innermost open scope, or
    /// makes it the root.
    fn attach(&mut self, index: NodeIndex) {
        match self.stack.last() {
            Some(Scope::Composite(parent)) => {
                let parent = *parent;
                match &mut self.nodes[parent].kind {
                    NodeKind::Sequence { children }
                    | NodeKind::Selector { children }
                    | NodeKind::Parallel { children, .. } => children.push(index),
                    _ => {}
                }
            }
            Some(Scope::Decorator(parent)) => {
                let parent = *parent;
                match &mut self.nodes[parent].kind {
                    NodeKind::Inverter { child }
                    | NodeKind::Repeater { child, .. }
                    | NodeKind::Condition { child, .. } => *child = index,
                    _ => {}
                }
            }
            None => {
                if self.root.is_some() {
                    self.errors.push(BuildError::MultipleRoots {
                        tree: self.name.clone(),
                    });
                } else {
                    self.root = Some(index);
                }
            }
        }
    }

    /// A decorator scope closes as soon as its single child is attached;
    /// chained decorators close transitively.
    fn close_finished_decorators(&mut self) {
        while let Some(&Scope::Decorator(index)) = self.stack.last() {
            let filled = match &self.nodes[index].kind {
                NodeKind::Inverter { child }
                | NodeKind::Repeater { child, .. }
                | NodeKind::Condition { child, .. } => *child != usize::MAX,
                _ => true,
            };
            if filled {
                self.stack.pop();
            } else {
                break;
            }
        }
    }
}
