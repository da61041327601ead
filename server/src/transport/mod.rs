mod channel;

pub use channel::PacketChannel;

use thiserror::Error;

use crate::user::UserKey;

/// The transport could not deliver a payload
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("transport failed to send to user {user}")]
pub struct SendError {
    pub user: u64,
}

/// The transport's receive side is gone
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("transport receive side closed")]
pub struct RecvError;

/// Sends finished wire packets toward a user's socket. The accept loop and
/// socket ownership live with the surrounding collaborator; the core only
/// hands bytes across this seam.
pub trait PacketSender: Send {
    fn send(&self, user: UserKey, payload: &[u8]) -> Result<(), SendError>;
}

/// Produces raw packets read from user sockets.
pub trait PacketReceiver: Send {
    fn receive(&mut self) -> Result<Option<(UserKey, Vec<u8>)>, RecvError>;
}
