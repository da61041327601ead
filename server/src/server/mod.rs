mod server;
pub use server::{PersistenceHandle, RealmServer};

mod server_config;
pub use server_config::{NetworkSettings, ServerConfig, WorldSettings};
