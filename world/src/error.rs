use thiserror::Error;

/// Errors observable from world operations and systems
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WorldError {
    /// No such entity (or it has been destroyed)
    #[error("entity {entity} not found")]
    NotFound { entity: u64 },

    /// Operation rejected by the entity's current state (e.g. dead)
    #[error("invalid state for entity {entity}: {reason}")]
    InvalidState { entity: u64, reason: &'static str },

    /// Invariant violation inside a system; fatal for the current tick of
    /// that system, which gets quarantined
    #[error("internal error in system '{system}': {reason}")]
    Internal { system: String, reason: String },
}
