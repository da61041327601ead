//! # Realm Server
//! The world server core: per-connection send pipelines and snapshot
//! baselines, interest-managed sync orchestration over the shard worlds,
//! and the persistence hand-off behind the tick loop.

#![deny(
    trivial_casts,
    trivial_numeric_casts,
    unstable_features,
    unused_import_braces
)]

pub mod transport;

mod connection;
mod error;
mod events;
mod interest;
mod messages;
mod server;
mod sync;
mod user;

pub use connection::{Connection, CONTROL_STREAM};
pub use error::ServerError;
pub use events::{DisconnectReason, ServerEvent};
pub use interest::{compute_interest, update_rate_for_distance, InterestEntry};
pub use messages::{InputMessage, SyncMessage};
pub use server::{NetworkSettings, PersistenceHandle, RealmServer, ServerConfig, WorldSettings};
pub use sync::{snapshot_entity, SyncOrchestrator};
pub use user::{User, UserKey};
