use std::collections::HashMap;

use log::info;

use crate::error::FactoryError;
use crate::tree::BehaviorTree;

type Constructor<A> = Box<dyn Fn() -> BehaviorTree<A> + Send + Sync>;

/// Maps tree names to constructors. Each `create` returns a fresh tree
/// instance with its own node state and blackboard.
pub struct TreeFactory<A> {
    constructors: HashMap<String, Constructor<A>>,
}

impl<A> TreeFactory<A> {
    pub fn new() -> Self {
        Self {
            constructors: HashMap::new(),
        }
    }

    /// Registers a constructor under `name`, replacing any previous one.
    pub fn register(
        &mut self,
        name: &str,
        constructor: impl Fn() -> BehaviorTree<A> + Send + Sync + 'static,
    ) {
        info!("behavior tree factory: registered '{name}'");
        self.constructors.insert(name.to_string(), Box::new(constructor));
    }

    /// Builds a fresh instance of the named tree.
    pub fn create(&self, name: &str) -> Result<BehaviorTree<A>, FactoryError> {
        let constructor = self
            .constructors
            .get(name)
            .ok_or_else(|| FactoryError::UnknownTree {
                name: name.to_string(),
            })?;
        Ok(constructor())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.constructors.contains_key(name)
    }

    pub fn names(&self) -> Vec<&str> {
        self.constructors.keys().map(String::as_str).collect()
    }
}

impl<A> Default for TreeFactory<A> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::TreeBuilder;
    use crate::node::NodeStatus;

    struct Actor;

    fn register_idle(factory: &mut TreeFactory<Actor>, name: &'static str) {
        factory.register(name, move || {
            let mut builder = TreeBuilder::new(name);
            builder.action("idle", Box::new(|_actor, _bb| NodeStatus::Running));
            builder.build().expect("static test tree must be valid")
        });
    }

    #[test]
    fn create_returns_fresh_instances() {
        let mut factory = TreeFactory::new();
        register_idle(&mut factory, "idle");

        let mut first = factory.create("idle").unwrap();
        first.blackboard_mut().set_int("marker", 7);
        let second = factory.create("idle").unwrap();

        assert_eq!(second.blackboard().get_int("marker"), None);
    }

    #[test]
    fn unknown_name_is_an_error() {
        let factory = TreeFactory::<Actor>::new();
        let error = factory.create("ghost").err().unwrap();
        assert_eq!(
            error,
            FactoryError::UnknownTree {
                name: "ghost".into()
            }
        );
    }

    #[test]
    fn contains_and_names() {
        let mut factory = TreeFactory::new();
        register_idle(&mut factory, "idle");

        assert!(factory.contains("idle"));
        assert!(!factory.contains("other"));
        assert_eq!(factory.names(), vec!["idle"]);
    }
}
