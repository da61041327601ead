use realm_shared::Tick;

use crate::component::{Component, ComponentKind};

/// Binds a replicated entity to its owning connection. Every replicated
/// component on an entity requires this binding to exist.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct NetworkBinding {
    /// The connection that owns (controls) this entity, if any. Observed
    /// entities have bindings without owners.
    pub owner_connection: Option<u64>,
    /// Highest tick this entity's owner has acknowledged.
    pub last_ack_tick: Tick,
    /// Per-kind dirty sub-flags maintained by the sync pass.
    pub dirty_flags: u8,
}

impl Component for NetworkBinding {
    const KIND: ComponentKind = ComponentKind::NetworkBinding;
}
