use realm_shared::Tick;

use crate::user::UserKey;

/// Why a connection went away.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DisconnectReason {
    /// The remote end announced it was leaving.
    RemoteClosed,
    /// Nothing was heard within the disconnection timeout.
    TimedOut,
    /// The transport refused delivery (peer gone, queue wedged).
    TransportFailed,
    /// The server initiated the disconnect.
    Kicked,
}

/// Observable happenings collected during a tick, drained by the embedding
/// process.
#[derive(Clone, Debug, PartialEq)]
pub enum ServerEvent {
    Connected { user: u64 },
    Disconnected { user: u64, reason: DisconnectReason },
    TickCompleted { tick: Tick },
    /// Write-behind retries were exhausted for some cache entry.
    PersistenceAlert,
}

impl ServerEvent {
    pub fn connected(user: UserKey) -> Self {
        ServerEvent::Connected {
            user: user.to_u64(),
        }
    }

    pub fn disconnected(user: UserKey, reason: DisconnectReason) -> Self {
        ServerEvent::Disconnected {
            user: user.to_u64(),
            reason,
        }
    }
}
