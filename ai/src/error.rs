use thiserror::Error;

/// Validation problems found while materializing a declarative tree. The
/// builder collects every problem instead of stopping at the first, so a
/// caller sees the full set at once.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BuildError {
    /// A sequence/selector/parallel node was declared with no children
    #[error("composite node '{node}' has no children")]
    EmptyComposite { node: String },

    /// A decorator was declared but no child followed it
    #[error("decorator node '{node}' is missing its child")]
    MissingDecoratorChild { node: String },

    /// A node was declared at the root level when a root already existed
    #[error("tree '{tree}' declares more than one root node")]
    MultipleRoots { tree: String },

    /// end() was called with no open composite scope
    #[error("end() called with no open composite in tree '{tree}'")]
    EndWithoutScope { tree: String },

    /// build() was called while composite scopes were still open
    #[error("{count} composite scope(s) left open in tree '{tree}'")]
    UnclosedScopes { tree: String, count: usize },

    /// build() was called on a builder with no nodes at all
    #[error("tree '{tree}' has no nodes")]
    EmptyTree { tree: String },
}

/// Errors from the tree factory
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FactoryError {
    /// No constructor registered under the requested name
    #[error("no behavior tree registered under '{name}'")]
    UnknownTree { name: String },
}
