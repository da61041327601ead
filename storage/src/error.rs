use thiserror::Error;

/// Errors the storage driver reports for one query execution
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DriverError {
    /// The endpoint did not answer
    #[error("endpoint {endpoint} unreachable")]
    Unreachable { endpoint: String },

    /// The query exceeded its time budget
    #[error("query timed out against {endpoint}")]
    Timeout { endpoint: String },

    /// The endpoint rejected the credentials
    #[error("authentication failed against {endpoint}")]
    Auth { endpoint: String },

    /// The query text was malformed
    #[error("syntax error: {message}")]
    Syntax { message: String },

    /// A constraint rejected the write
    #[error("constraint violation: {message}")]
    Constraint { message: String },

    /// Anything else
    #[error("driver error: {message}")]
    Other { message: String },
}

/// Errors observable by callers into the storage layer
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StorageError {
    /// No such partition, cache key, table or session
    #[error("not found: {what}")]
    NotFound { what: String },

    /// Operation rejected by current state (inactive partition, broken
    /// session, terminal order status, pool shut down)
    #[error("invalid state: {reason}")]
    InvalidState { reason: String },

    /// A blocking operation exceeded its budget
    #[error("{operation} timed out after {waited_ms} ms")]
    Timeout {
        operation: &'static str,
        waited_ms: u64,
    },

    /// Peer endpoint or replica unreachable
    #[error("unreachable: {endpoint}")]
    Unreachable { endpoint: String },

    /// Pool at max and nothing available before the timeout
    #[error("pool '{pool}' exhausted")]
    Exhausted { pool: String },

    /// Another caller holds the in-flight load for this key
    #[error("load already in flight; await the in-flight handle")]
    WouldBlock,

    /// Write rejected by a domain constraint
    #[error("conflict: {reason}")]
    Conflict { reason: String },

    /// Invariant violation; logged with full context at the raise site
    #[error("internal: {reason}")]
    Internal { reason: String },

    /// A driver error that maps to no richer kind, surfaced verbatim
    #[error(transparent)]
    Driver(#[from] DriverError),
}

impl StorageError {
    /// Translates a driver error at the router boundary into the caller
    /// visible kind.
    pub fn from_driver(error: DriverError) -> Self {
        match error {
            DriverError::Unreachable { endpoint } => StorageError::Unreachable { endpoint },
            DriverError::Timeout { .. } => StorageError::Timeout {
                operation: "query",
                waited_ms: 0,
            },
            DriverError::Constraint { message } => StorageError::Conflict { reason: message },
            other => StorageError::Driver(other),
        }
    }
}
