use thiserror::Error;

use realm_shared::ConnectionError;
use realm_storage::StorageError;

use crate::transport::SendError;

/// Errors surfaced by server operations
#[derive(Debug, Error)]
pub enum ServerError {
    /// A connection's packet processing failed
    #[error(transparent)]
    Connection(#[from] ConnectionError),

    /// The storage layer rejected an operation
    #[error(transparent)]
    Storage(#[from] StorageError),

    /// The transport could not deliver
    #[error(transparent)]
    Transport(#[from] SendError),

    /// No such connected user
    #[error("unknown user {user}")]
    UnknownUser { user: u64 },

    /// The server is no longer accepting connections
    #[error("server is shutting down")]
    ShuttingDown,

    /// The target shard is at its entity ceiling
    #[error("shard {shard} is at its entity limit")]
    ShardFull { shard: usize },
}
