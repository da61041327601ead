use std::default::Default;
use std::time::Duration;

use realm_shared::ConnectionConfig;

/// World simulation settings, applied per shard.
#[derive(Clone)]
pub struct WorldSettings {
    /// Fixed tick rate of the simulation.
    pub tick_hz: u32,
    /// Independent world instances, each with its own tick thread.
    pub shards: usize,
    pub max_entities_per_shard: usize,
    /// How many nearest entities one observer is told about.
    pub interest_k: usize,
    /// Entities at or beyond this distance are never in an interest set.
    pub max_view_distance: f32,
    /// Spatial index cell edge length.
    pub cell_size: f32,
}

impl Default for WorldSettings {
    fn default() -> Self {
        Self {
            tick_hz: 30,
            shards: 1,
            max_entities_per_shard: 10_000,
            interest_k: 64,
            max_view_distance: 200.0,
            cell_size: 25.0,
        }
    }
}

/// Network-facing settings.
#[derive(Clone)]
pub struct NetworkSettings {
    pub port: u16,
    /// Aggregate outbound budget across all connections. 0 = unlimited.
    pub bandwidth_limit_global_bps: usize,
    /// Outbound budget per connection. 0 = unlimited.
    pub bandwidth_limit_per_connection_bps: usize,
    pub enable_compression: bool,
    pub enable_aggregation: bool,
    /// How often per-connection quality settings are re-evaluated.
    pub adaptation_interval: Duration,
}

impl Default for NetworkSettings {
    fn default() -> Self {
        Self {
            port: 14191,
            bandwidth_limit_global_bps: 0,
            bandwidth_limit_per_connection_bps: 0,
            enable_compression: false,
            enable_aggregation: true,
            adaptation_interval: Duration::from_secs(5),
        }
    }
}

/// Contains Config properties which will be used by the Server
#[derive(Clone)]
pub struct ServerConfig {
    pub world: WorldSettings,
    pub network: NetworkSettings,
    /// Used to configure the connections with clients.
    pub connection: ConnectionConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            world: WorldSettings::default(),
            network: NetworkSettings::default(),
            connection: ConnectionConfig::default(),
        }
    }
}
