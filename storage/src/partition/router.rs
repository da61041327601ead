use std::collections::{HashMap, VecDeque};
use std::time::{Duration, SystemTime};

use log::{info, warn};

use crate::driver::{Endpoint, StorageDriver};
use crate::error::StorageError;
use crate::shard::hash64;

use super::descriptor::PartitionDescriptor;

/// How a logical table maps keys onto physical partitions.
#[derive(Clone, Debug)]
pub enum PartitionStrategy {
    /// Contiguous integer key ranges of fixed width.
    Range { width: i64 },
    /// Fixed pre-created hash buckets.
    Hash { buckets: u32 },
    /// Discrete key values mapped to named buckets.
    List { map: HashMap<String, u32> },
    /// Writes rotate across a fixed set of targets.
    RoundRobin { targets: u32 },
    /// Hash buckets subdivided into integer ranges.
    Composite { buckets: u32, range_width: i64 },
}

/// Per-logical-table partitioning configuration.
#[derive(Clone, Debug)]
pub struct TableConfig {
    pub strategy: PartitionStrategy,
    /// Columns forming the partition key, used when phrasing migration
    /// statements.
    pub key_columns: Vec<String>,
    pub max_rows: u64,
    pub max_bytes: u64,
    pub retention: Duration,
    /// Range tables may materialize a new partition lazily when a key
    /// falls beyond existing ranges.
    pub auto_create: bool,
}

/// A key being routed. Integer keys support range strategies; text keys
/// hash.
#[derive(Clone, Copy, Debug)]
pub enum PartitionKey<'k> {
    Int(i64),
    Text(&'k str),
}

impl PartitionKey<'_> {
    fn canonical(&self) -> String {
        match self {
            PartitionKey::Int(value) => value.to_string(),
            PartitionKey::Text(value) => (*value).to_string(),
        }
    }

    fn as_int(&self) -> Option<i64> {
        match self {
            PartitionKey::Int(value) => Some(*value),
            PartitionKey::Text(value) => value.parse().ok(),
        }
    }
}

/// Where a routed operation lands.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RouteTarget {
    pub partition_id: u64,
    pub physical_table: String,
    pub read_only: bool,
}

/// Maintenance work discovered by the scheduler scan.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum MaintenanceAction {
    Split { table: String, partition_id: u64 },
    Merge { table: String, left: u64, right: u64 },
    Drop { table: String, partition_id: u64 },
}

struct TableState {
    config: TableConfig,
    partitions: Vec<PartitionDescriptor>,
    round_robin_cursor: u32,
    pending_splits: VecDeque<u64>,
}

/// Maps (logical table, key) to a physical partition, and runs the
/// split/merge/retention lifecycle over the partition set.
pub struct PartitionRouter {
    endpoint: Endpoint,
    tables: HashMap<String, TableState>,
    next_partition_id: u64,
}

impl PartitionRouter {
    pub fn new(endpoint: Endpoint) -> Self {
        Self {
            endpoint,
            tables: HashMap::new(),
            next_partition_id: 1,
        }
    }

    fn allocate_id(&mut self) -> u64 {
        let id = self.next_partition_id;
        self.next_partition_id += 1;
        id
    }

    fn descriptor(
        &mut self,
        table: &str,
        physical: String,
        min_key: Option<i64>,
        max_key: Option<i64>,
        bucket: Option<u32>,
    ) -> PartitionDescriptor {
        PartitionDescriptor {
            partition_id: self.allocate_id(),
            logical_table: table.to_string(),
            physical_table: physical,
            host: self.endpoint.host.clone(),
            port: self.endpoint.port,
            min_key,
            max_key,
            bucket,
            active: true,
            read_only: false,
            row_count: 0,
            data_bytes: 0,
            deactivated_at: None,
        }
    }

    /// Registers a logical table, pre-creating the fixed partitions its
    /// strategy calls for.
    pub fn register_table(&mut self, table: &str, config: TableConfig) {
        let mut partitions = Vec::new();
        match &config.strategy {
            PartitionStrategy::Hash { buckets } | PartitionStrategy::RoundRobin { targets: buckets } => {
                for bucket in 0..*buckets {
                    let physical = format!("{table}_p{bucket}");
                    partitions.push(self.descriptor(table, physical, None, None, Some(bucket)));
                }
            }
            PartitionStrategy::List { map } => {
                let mut buckets: Vec<u32> = map.values().copied().collect();
                buckets.sort_unstable();
                buckets.dedup();
                for bucket in buckets {
                    let physical = format!("{table}_p{bucket}");
                    partitions.push(self.descriptor(table, physical, None, None, Some(bucket)));
                }
            }
            PartitionStrategy::Range { .. } | PartitionStrategy::Composite { .. } => {
                // range partitions materialize on first touch
            }
        }

        info!(
            "partition router: registered table '{table}' with {} pre-created partition(s)",
            partitions.len()
        );
        self.tables.insert(
            table.to_string(),
            TableState {
                config,
                partitions,
                round_robin_cursor: 0,
                pending_splits: VecDeque::new(),
            },
        );
    }

    pub fn partitions(&self, table: &str) -> Option<&[PartitionDescriptor]> {
        self.tables.get(table).map(|state| state.partitions.as_slice())
    }

    /// Routes `key` within `table`. For any key routed under a strategy,
    /// exactly one active partition contains it; during a split window the
    /// active child wins and the inactive parent is served read-only.
    pub fn route(&mut self, table: &str, key: PartitionKey) -> Result<RouteTarget, StorageError> {
        let Some(state) = self.tables.get(table) else {
            return Err(StorageError::NotFound {
                what: format!("table '{table}'"),
            });
        };

        match &state.config.strategy {
            PartitionStrategy::Range { width } => {
                let width = *width;
                let Some(int_key) = key.as_int() else {
                    return Err(StorageError::InvalidState {
                        reason: format!("table '{table}' requires integer keys"),
                    });
                };
                self.route_range(table, int_key, width)
            }
            PartitionStrategy::Hash { buckets } => {
                let bucket_count = *buckets;
                let hash = hash64(&key.canonical());
                self.route_bucket(table, hash, bucket_count)
            }
            PartitionStrategy::List { map } => {
                let canonical = key.canonical();
                let Some(bucket) = map.get(&canonical).copied() else {
                    return Err(StorageError::NotFound {
                        what: format!("list mapping for key '{canonical}' in table '{table}'"),
                    });
                };
                self.route_fixed_bucket(table, bucket)
            }
            PartitionStrategy::RoundRobin { targets } => {
                let targets = *targets;
                let state = self.tables.get_mut(table).expect("checked above");
                let bucket = state.round_robin_cursor % targets;
                state.round_robin_cursor = state.round_robin_cursor.wrapping_add(1);
                self.route_fixed_bucket(table, bucket)
            }
            PartitionStrategy::Composite { buckets, range_width } => {
                let (buckets, range_width) = (*buckets, *range_width);
                let Some(int_key) = key.as_int() else {
                    return Err(StorageError::InvalidState {
                        reason: format!("table '{table}' requires integer keys"),
                    });
                };
                let bucket = (hash64(&key.canonical()) % buckets as u64) as u32;
                self.route_composite(table, bucket, int_key, range_width)
            }
        }
    }

    fn route_range(
        &mut self,
        table: &str,
        key: i64,
        width: i64,
    ) -> Result<RouteTarget, StorageError> {
        let state = self.tables.get(table).expect("caller checked");

        // active partitions win over inactive ones during a split window
        if let Some(found) = state
            .partitions
            .iter()
            .find(|partition| partition.active && partition.covers_int(key))
        {
            return Ok(RouteTarget {
                partition_id: found.partition_id,
                physical_table: found.physical_table.clone(),
                read_only: found.read_only,
            });
        }
        if let Some(found) = state
            .partitions
            .iter()
            .find(|partition| !partition.active && partition.covers_int(key))
        {
            return Ok(RouteTarget {
                partition_id: found.partition_id,
                physical_table: found.physical_table.clone(),
                read_only: true,
            });
        }

        if !state.config.auto_create {
            return Err(StorageError::NotFound {
                what: format!("partition covering key {key} in table '{table}'"),
            });
        }

        // materialize the aligned range lazily
        let start = key.div_euclid(width) * width;
        let physical = format!("{table}_r{start}");
        let descriptor = self.descriptor(table, physical, Some(start), Some(start + width), None);
        let target = RouteTarget {
            partition_id: descriptor.partition_id,
            physical_table: descriptor.physical_table.clone(),
            read_only: false,
        };
        info!(
            "partition router: auto-created {} for table '{table}' covering [{start}, {})",
            descriptor.physical_table,
            start + width
        );
        self.tables
            .get_mut(table)
            .expect("caller checked")
            .partitions
            .push(descriptor);
        Ok(target)
    }

    fn route_bucket(
        &self,
        table: &str,
        hash: u64,
        bucket_count: u32,
    ) -> Result<RouteTarget, StorageError> {
        let state = self.tables.get(table).expect("caller checked");
        let bucket = (hash % bucket_count as u64) as u32;

        // after a split a bucket is owned by two active children; the
        // secondary hash bit picks between them deterministically
        let mut active: Vec<&PartitionDescriptor> = state
            .partitions
            .iter()
            .filter(|partition| partition.bucket == Some(bucket) && partition.active)
            .collect();
        active.sort_by_key(|partition| partition.partition_id);

        match active.len() {
            0 => {}
            1 => {
                let owner = active[0];
                return Ok(RouteTarget {
                    partition_id: owner.partition_id,
                    physical_table: owner.physical_table.clone(),
                    read_only: owner.read_only,
                });
            }
            n => {
                let child = active[((hash / bucket_count as u64) % n as u64) as usize];
                return Ok(RouteTarget {
                    partition_id: child.partition_id,
                    physical_table: child.physical_table.clone(),
                    read_only: child.read_only,
                });
            }
        }

        // no active owner: an inactive parent still serves reads during
        // migration
        if let Some(parent) = state
            .partitions
            .iter()
            .find(|partition| partition.bucket == Some(bucket))
        {
            return Ok(RouteTarget {
                partition_id: parent.partition_id,
                physical_table: parent.physical_table.clone(),
                read_only: true,
            });
        }

        Err(StorageError::InvalidState {
            reason: format!("bucket {bucket} of table '{table}' has been dropped"),
        })
    }

    fn route_fixed_bucket(&self, table: &str, bucket: u32) -> Result<RouteTarget, StorageError> {
        let state = self.tables.get(table).expect("caller checked");
        let Some(owner) = state
            .partitions
            .iter()
            .find(|partition| partition.bucket == Some(bucket) && partition.active)
        else {
            return Err(StorageError::NotFound {
                what: format!("bucket {bucket} of table '{table}'"),
            });
        };
        Ok(RouteTarget {
            partition_id: owner.partition_id,
            physical_table: owner.physical_table.clone(),
            read_only: owner.read_only,
        })
    }

    fn route_composite(
        &mut self,
        table: &str,
        bucket: u32,
        key: i64,
        range_width: i64,
    ) -> Result<RouteTarget, StorageError> {
        let start = key.div_euclid(range_width) * range_width;
        let state = self.tables.get(table).expect("caller checked");
        if let Some(found) = state.partitions.iter().find(|partition| {
            partition.active && partition.bucket == Some(bucket) && partition.covers_int(key)
        }) {
            return Ok(RouteTarget {
                partition_id: found.partition_id,
                physical_table: found.physical_table.clone(),
                read_only: found.read_only,
            });
        }

        // composite sub-ranges always materialize lazily
        let physical = format!("{table}_b{bucket}_r{start}");
        let descriptor = self.descriptor(
            table,
            physical,
            Some(start),
            Some(start + range_width),
            Some(bucket),
        );
        let target = RouteTarget {
            partition_id: descriptor.partition_id,
            physical_table: descriptor.physical_table.clone(),
            read_only: false,
        };
        self.tables
            .get_mut(table)
            .expect("caller checked")
            .partitions
            .push(descriptor);
        Ok(target)
    }

    /// Adjusts a partition's row/byte statistics after a flush or
    /// migration.
    pub fn record_stats(&mut self, table: &str, partition_id: u64, rows: i64, bytes: i64) {
        let Some(state) = self.tables.get_mut(table) else {
            return;
        };
        if let Some(partition) = state
            .partitions
            .iter_mut()
            .find(|partition| partition.partition_id == partition_id)
        {
            partition.row_count = partition.row_count.saturating_add_signed(rows);
            partition.data_bytes = partition.data_bytes.saturating_add_signed(bytes);
        }
    }

    /// Scans every table for partitions over their split thresholds, merge
    /// candidates, and inactive partitions past retention. Split triggers
    /// are also enqueued internally so `perform_split` can drain them.
    pub fn check_maintenance(&mut self, now: SystemTime) -> Vec<MaintenanceAction> {
        let mut actions = Vec::new();

        for (table, state) in &mut self.tables {
            let max_rows = state.config.max_rows;
            let max_bytes = state.config.max_bytes;

            for partition in &state.partitions {
                if partition.active
                    && (partition.row_count > max_rows || partition.data_bytes > max_bytes)
                    && !state.pending_splits.contains(&partition.partition_id)
                {
                    state.pending_splits.push_back(partition.partition_id);
                    actions.push(MaintenanceAction::Split {
                        table: table.clone(),
                        partition_id: partition.partition_id,
                    });
                }
            }

            // adjacent range partitions whose combined size stays under
            // half the ceiling are merge candidates
            let mut ranges: Vec<&PartitionDescriptor> = state
                .partitions
                .iter()
                .filter(|partition| partition.active && partition.min_key.is_some())
                .collect();
            ranges.sort_by_key(|partition| partition.min_key);
            for pair in ranges.windows(2) {
                let (left, right) = (pair[0], pair[1]);
                if left.max_key == right.min_key
                    && left.row_count + right.row_count < max_rows / 2
                    && left.data_bytes + right.data_bytes < max_bytes / 2
                {
                    actions.push(MaintenanceAction::Merge {
                        table: table.clone(),
                        left: left.partition_id,
                        right: right.partition_id,
                    });
                }
            }

            for partition in &state.partitions {
                if let Some(deactivated_at) = partition.deactivated_at {
                    let expired = now
                        .duration_since(deactivated_at)
                        .map(|age| age >= state.config.retention)
                        .unwrap_or(false);
                    if expired {
                        actions.push(MaintenanceAction::Drop {
                            table: table.clone(),
                            partition_id: partition.partition_id,
                        });
                    }
                }
            }
        }

        actions
    }

    /// Splits `partition_id` into two partitions covering the same key
    /// space, marks the original inactive (read-only until migration
    /// completes) and requests data migration through the driver.
    pub fn perform_split(
        &mut self,
        table: &str,
        partition_id: u64,
        driver: &dyn StorageDriver,
        now: SystemTime,
    ) -> Result<(u64, u64), StorageError> {
        let left_id = self.allocate_id();
        let right_id = self.allocate_id();
        let endpoint = self.endpoint.clone();

        let Some(state) = self.tables.get_mut(table) else {
            return Err(StorageError::NotFound {
                what: format!("table '{table}'"),
            });
        };
        let Some(parent_index) = state
            .partitions
            .iter()
            .position(|partition| partition.partition_id == partition_id)
        else {
            return Err(StorageError::NotFound {
                what: format!("partition {partition_id} of table '{table}'"),
            });
        };
        if !state.partitions[parent_index].active {
            return Err(StorageError::InvalidState {
                reason: format!("partition {partition_id} is not active"),
            });
        }

        let parent = state.partitions[parent_index].clone();
        let half_rows = parent.row_count / 2;
        let half_bytes = parent.data_bytes / 2;

        let make_child = |id: u64, suffix: &str, min: Option<i64>, max: Option<i64>| {
            PartitionDescriptor {
                partition_id: id,
                logical_table: parent.logical_table.clone(),
                physical_table: format!("{table}_p{suffix}"),
                host: parent.host.clone(),
                port: parent.port,
                min_key: min,
                max_key: max,
                bucket: parent.bucket,
                active: true,
                read_only: false,
                row_count: half_rows,
                data_bytes: half_bytes,
                deactivated_at: None,
            }
        };

        let (left, right) = match (parent.min_key, parent.max_key) {
            (Some(min), Some(max)) => {
                let mid = min + (max - min) / 2;
                let mut left = make_child(left_id, &left_id.to_string(), Some(min), Some(mid));
                let mut right = make_child(right_id, &right_id.to_string(), Some(mid), Some(max));
                left.physical_table = format!("{table}_r{min}_{mid}");
                right.physical_table = format!("{table}_r{mid}_{max}");
                (left, right)
            }
            _ => (
                make_child(left_id, &left_id.to_string(), None, None),
                make_child(right_id, &right_id.to_string(), None, None),
            ),
        };

        // migration request: the driver moves the rows; the router only
        // tracks the metadata transition
        let key_column = state
            .config
            .key_columns
            .first()
            .cloned()
            .unwrap_or_else(|| "id".to_string());
        for child in [&left, &right] {
            driver
                .execute(
                    &endpoint,
                    &format!(
                        "INSERT INTO {} SELECT * FROM {} WHERE partition_of({key_column}) = ?",
                        child.physical_table, parent.physical_table
                    ),
                    &[crate::driver::Value::UInt(child.partition_id)],
                )
                .map_err(StorageError::from_driver)?;
        }

        {
            let parent = &mut state.partitions[parent_index];
            parent.active = false;
            parent.read_only = true;
            parent.deactivated_at = Some(now);
        }
        state
            .pending_splits
            .retain(|pending| *pending != partition_id);
        info!(
            "partition router: split {table}/{partition_id} into {} and {}",
            left_id, right_id
        );
        state.partitions.push(left);
        state.partitions.push(right);

        Ok((left_id, right_id))
    }

    /// Drops inactive partitions older than the retention window. Routes
    /// that land on a dropped partition surface `invalid-state`.
    pub fn drop_expired(&mut self, now: SystemTime) -> usize {
        let mut dropped = 0;
        for (table, state) in &mut self.tables {
            let retention = state.config.retention;
            let before = state.partitions.len();
            state.partitions.retain(|partition| {
                let expired = partition
                    .deactivated_at
                    .and_then(|at| now.duration_since(at).ok())
                    .map(|age| age >= retention)
                    .unwrap_or(false);
                if expired {
                    warn!(
                        "partition router: dropping expired partition {} of '{table}'",
                        partition.partition_id
                    );
                }
                !expired
            });
            dropped += before - state.partitions.len();
        }
        dropped
    }
}
