use std::time::SystemTime;

/// Metadata for one physical subtable of a logical table.
#[derive(Clone, Debug)]
pub struct PartitionDescriptor {
    pub partition_id: u64,
    pub logical_table: String,
    pub physical_table: String,
    pub host: String,
    pub port: u16,
    /// Inclusive lower bound for range partitions.
    pub min_key: Option<i64>,
    /// Exclusive upper bound for range partitions.
    pub max_key: Option<i64>,
    /// Bucket number for hash/list/round-robin partitions.
    pub bucket: Option<u32>,
    pub active: bool,
    /// Set while the partition is being migrated away from.
    pub read_only: bool,
    pub row_count: u64,
    pub data_bytes: u64,
    /// When the partition was marked inactive; drives retention.
    pub deactivated_at: Option<SystemTime>,
}

impl PartitionDescriptor {
    /// Whether an integer key falls inside this partition's range bounds.
    pub fn covers_int(&self, key: i64) -> bool {
        match (self.min_key, self.max_key) {
            (Some(min), Some(max)) => key >= min && key < max,
            (Some(min), None) => key >= min,
            (None, Some(max)) => key < max,
            (None, None) => false,
        }
    }
}
