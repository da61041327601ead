//! # Realm Storage
//! Everything behind the simulation loop: bounded connection pools, shard
//! and partition routing, the two-tier write-behind cache, and read-replica
//! query routing. Internally synchronized; the game tick never blocks here.

mod cache;
mod driver;
mod error;
mod market;
mod partition;
mod pool;
mod replica;
mod shard;

pub use cache::{
    CacheConfig, CacheEntry, CacheSource, CacheStatsSnapshot, CacheValue, DataKind, FlushSink,
    GameCache,
};
pub use driver::{Endpoint, Row, StorageDriver, Value};
pub use error::{DriverError, StorageError};
pub use market::{MarketOrder, OrderSide, OrderStatus};
pub use partition::{
    MaintenanceAction, PartitionDescriptor, PartitionKey, PartitionRouter, PartitionStrategy,
    RouteTarget, TableConfig,
};
pub use pool::{ConnectionPool, PoolConfig, Session, SessionGuard};
pub use replica::{
    Consistency, HealthTracker, LoadPolicy, QueryKind, QueryRouter, ReplicaConfig, ReplicaHealth,
    RouteDecision,
};
pub use shard::{hash64, ShardRouter};
