mod cache;
mod config;
mod entry;
mod tier;

pub use cache::{CacheSource, CacheStatsSnapshot, FlushSink, GameCache};
pub use config::{CacheConfig, DataKind};
pub use entry::{CacheEntry, CacheValue};
