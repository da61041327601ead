use std::collections::HashMap;
use std::hash::Hash;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use log::{error, info, warn};
use parking_lot::{Condvar, Mutex};

use crate::error::StorageError;

use super::config::{CacheConfig, DataKind};
use super::entry::{CacheEntry, CacheValue};
use super::tier::LruTier;

/// Where a cache hit was served from.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CacheSource {
    L1,
    L2,
    Miss,
}

/// Persists one dirty entry. The production sink routes through the
/// partition router and a connection pool; tests record.
pub trait FlushSink<K, V>: Send + Sync {
    fn flush(&self, key: &K, value: &V) -> Result<(), StorageError>;
}

/// Point-in-time copy of the cache counters.
#[derive(Clone, Copy, Debug, Default)]
pub struct CacheStatsSnapshot {
    pub hits_l1: u64,
    pub hits_l2: u64,
    pub misses: u64,
    pub flushes: u64,
    pub flush_failures: u64,
    pub alerts: u64,
    pub shared_loads: u64,
}

struct LoadSlot<V> {
    result: Mutex<Option<Result<Option<V>, StorageError>>>,
    ready: Condvar,
}

/// Two-tier cache with TTLs, dirty-aware eviction and deferred
/// persistence.
///
/// The dirty copy of any key lives in L1 only: L1 never evicts dirty
/// entries, so a pending write cannot be lost. L2 holds clean warm copies
/// of entries marked important. Internally synchronized; one mutex per
/// tier plus the in-flight-loads map.
pub struct GameCache<K, V>
where
    K: Hash + Eq + Clone + Send + Sync + 'static,
    V: CacheValue + Send + Sync,
{
    config: CacheConfig,
    l1: Mutex<LruTier<K, V>>,
    l2: Mutex<LruTier<K, V>>,
    in_flight: Mutex<HashMap<K, Arc<LoadSlot<V>>>>,
    sink: Arc<dyn FlushSink<K, V>>,

    hits_l1: AtomicU64,
    hits_l2: AtomicU64,
    misses: AtomicU64,
    flushes: AtomicU64,
    flush_failures: AtomicU64,
    alerts: AtomicU64,
    shared_loads: AtomicU64,

    shutdown: AtomicBool,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl<K, V> GameCache<K, V>
where
    K: Hash + Eq + Clone + Send + Sync + 'static,
    V: CacheValue + Send + Sync,
{
    pub fn new(config: CacheConfig, sink: Arc<dyn FlushSink<K, V>>) -> Arc<Self> {
        Arc::new(Self {
            l1: Mutex::new(LruTier::new(config.l1_size)),
            l2: Mutex::new(LruTier::new(config.l2_size)),
            in_flight: Mutex::new(HashMap::new()),
            sink,
            hits_l1: AtomicU64::new(0),
            hits_l2: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            flushes: AtomicU64::new(0),
            flush_failures: AtomicU64::new(0),
            alerts: AtomicU64::new(0),
            shared_loads: AtomicU64::new(0),
            shutdown: AtomicBool::new(false),
            worker: Mutex::new(None),
            config,
        })
    }

    pub fn name(&self) -> &str {
        &self.config.name
    }

    pub fn stats(&self) -> CacheStatsSnapshot {
        CacheStatsSnapshot {
            hits_l1: self.hits_l1.load(Ordering::Relaxed),
            hits_l2: self.hits_l2.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            flushes: self.flushes.load(Ordering::Relaxed),
            flush_failures: self.flush_failures.load(Ordering::Relaxed),
            alerts: self.alerts.load(Ordering::Relaxed),
            shared_loads: self.shared_loads.load(Ordering::Relaxed),
        }
    }

    pub fn dirty_count(&self) -> usize {
        self.l1.lock().dirty_count()
    }

    /// Looks the key up in L1 then L2; an L2 hit is promoted to the hot
    /// tier with its original timestamps.
    pub fn get(&self, key: &K) -> (Option<V>, CacheSource) {
        let now = Instant::now();

        {
            let mut l1 = self.l1.lock();
            if let Ok(entry) = l1.get(key, now) {
                self.hits_l1.fetch_add(1, Ordering::Relaxed);
                return (Some(entry.value.clone()), CacheSource::L1);
            }
        }

        let promoted = {
            let mut l2 = self.l2.lock();
            let live = l2.get(key, now).is_ok();
            if live {
                l2.pop(key)
            } else {
                None
            }
        };
        if let Some(entry) = promoted {
            self.hits_l2.fetch_add(1, Ordering::Relaxed);
            let value = entry.value.clone();
            let mut l1 = self.l1.lock();
            if l1.put(key.clone(), entry).is_err() {
                // hot tier is wedged on dirty entries; serve the value and
                // let the warm copy go
                warn!("cache '{}': promotion skipped, L1 all dirty", self.config.name);
            }
            return (Some(value), CacheSource::L2);
        }

        self.misses.fetch_add(1, Ordering::Relaxed);
        (None, CacheSource::Miss)
    }

    /// Inserts a clean entry (a loaded value). L1 always; L2 when marked
    /// important. TTL comes from the data-kind table.
    pub fn put(&self, key: &K, value: V, kind: DataKind, important: bool) -> Result<(), StorageError> {
        let now = Instant::now();
        let ttl = self.config.ttl_for(kind);

        self.insert_l1(key, CacheEntry::new(value.clone(), ttl, important, now))?;
        if important {
            let mut l2 = self.l2.lock();
            // L2 copies are always clean, so this cannot fail on dirt
            let _ = l2.put(key.clone(), CacheEntry::new(value, ttl, important, now));
        }
        Ok(())
    }

    /// Inserts or overwrites with a dirty entry: the write-behind worker
    /// will persist it after the configured delay. Above the dirty-depth
    /// threshold the oldest dirty entry is flushed synchronously.
    pub fn write(&self, key: &K, value: V, kind: DataKind, important: bool) -> Result<(), StorageError> {
        let now = Instant::now();
        let ttl = self.config.ttl_for(kind);

        let mut entry = CacheEntry::new(value.clone(), ttl, important, now);
        entry.mark_dirty(now);
        self.insert_l1(key, entry)?;
        if important {
            let mut l2 = self.l2.lock();
            let _ = l2.put(key.clone(), CacheEntry::new(value, ttl, important, now));
        }

        if self.dirty_count() > self.config.dirty_depth_sync_threshold {
            self.flush_oldest_dirty();
        }
        Ok(())
    }

    fn insert_l1(&self, key: &K, entry: CacheEntry<V>) -> Result<(), StorageError> {
        let mut l1 = self.l1.lock();
        let (key_back, entry) = match l1.put(key.clone(), entry) {
            Ok(()) => return Ok(()),
            Err(rejected) => rejected,
        };

        // every entry is dirty: the put blocks on a flush of the oldest
        // dirty one, then retries
        let Some(victim) = l1.oldest_dirty_key() else {
            return Err(StorageError::Internal {
                reason: format!("cache '{}': full with no dirty entry", self.config.name),
            });
        };
        let Some(value) = l1.peek(&victim).map(|victim_entry| victim_entry.value.clone()) else {
            return Err(StorageError::Internal {
                reason: format!("cache '{}': oldest dirty key vanished", self.config.name),
            });
        };
        self.sink.flush(&victim, &value)?;
        self.flushes.fetch_add(1, Ordering::Relaxed);
        if let Some(victim_entry) = l1.entry_mut(&victim) {
            victim_entry.mark_flushed();
        }

        l1.put(key_back, entry).map_err(|_| StorageError::Internal {
            reason: format!("cache '{}': put still blocked after flush", self.config.name),
        })
    }

    /// Best-effort synchronous flush of the oldest dirty entry, used for
    /// dirty-depth back-pressure.
    fn flush_oldest_dirty(&self) {
        let target = {
            let l1 = self.l1.lock();
            l1.oldest_dirty_key().and_then(|key| {
                l1.peek(&key)
                    .map(|entry| (key, entry.value.clone(), entry.last_modified))
            })
        };
        let Some((key, value, modified_at)) = target else {
            return;
        };
        match self.sink.flush(&key, &value) {
            Ok(()) => {
                self.flushes.fetch_add(1, Ordering::Relaxed);
                let mut l1 = self.l1.lock();
                if let Some(entry) = l1.entry_mut(&key) {
                    // only clear dirt if nothing changed while flushing
                    if entry.last_modified == modified_at {
                        entry.mark_flushed();
                    }
                }
            }
            Err(error) => {
                self.flush_failures.fetch_add(1, Ordering::Relaxed);
                warn!("cache '{}': back-pressure flush failed: {error}", self.config.name);
            }
        }
    }

    /// Flushes first when dirty, then removes the key from both tiers.
    pub fn invalidate(&self, key: &K) -> Result<(), StorageError> {
        let to_flush = {
            let l1 = self.l1.lock();
            l1.peek(key)
                .filter(|entry| entry.dirty)
                .map(|entry| entry.value.clone())
        };
        if let Some(value) = to_flush {
            self.sink.flush(key, &value)?;
            self.flushes.fetch_add(1, Ordering::Relaxed);
        }
        self.l1.lock().pop(key);
        self.l2.lock().pop(key);
        Ok(())
    }

    /// Cache-aside load with stampede control: at most one concurrent load
    /// per key; late callers block on the in-flight result and share it.
    pub fn get_or_load(
        &self,
        key: &K,
        kind: DataKind,
        important: bool,
        loader: impl FnOnce() -> Result<Option<V>, StorageError>,
    ) -> Result<Option<V>, StorageError> {
        if let (Some(value), _) = self.get(key) {
            return Ok(Some(value));
        }

        let (slot, leader) = {
            let mut in_flight = self.in_flight.lock();
            match in_flight.get(key) {
                Some(slot) => (Arc::clone(slot), false),
                None => {
                    let slot = Arc::new(LoadSlot {
                        result: Mutex::new(None),
                        ready: Condvar::new(),
                    });
                    in_flight.insert(key.clone(), Arc::clone(&slot));
                    (slot, true)
                }
            }
        };

        if leader {
            let result = loader();
            if let Ok(Some(value)) = &result {
                // a load failure deliberately caches nothing
                let _ = self.put(key, value.clone(), kind, important);
            }
            *slot.result.lock() = Some(result.clone());
            slot.ready.notify_all();
            self.in_flight.lock().remove(key);
            result
        } else {
            self.shared_loads.fetch_add(1, Ordering::Relaxed);
            let mut guard = slot.result.lock();
            while guard.is_none() {
                slot.ready.wait(&mut guard);
            }
            guard.clone().unwrap_or(Ok(None))
        }
    }

    /// Non-blocking variant: a second caller during an in-flight load gets
    /// `WouldBlock` instead of waiting.
    pub fn try_get_or_load(
        &self,
        key: &K,
        kind: DataKind,
        important: bool,
        loader: impl FnOnce() -> Result<Option<V>, StorageError>,
    ) -> Result<Option<V>, StorageError> {
        if let (Some(value), _) = self.get(key) {
            return Ok(Some(value));
        }
        if self.in_flight.lock().contains_key(key) {
            return Err(StorageError::WouldBlock);
        }
        self.get_or_load(key, kind, important, loader)
    }

    /// One write-behind pass: flush every dirty entry whose modification
    /// age has reached the write delay (and whose backoff window, if any,
    /// has passed). Returns (flushed, failed).
    pub fn flush_due(&self, now: Instant) -> (usize, usize) {
        let due = {
            let l1 = self.l1.lock();
            l1.due_for_flush(now, self.config.write_delay)
        };

        let mut flushed = 0;
        let mut failed = 0;
        for key in due {
            let Some((value, modified_at)) = ({
                let l1 = self.l1.lock();
                l1.peek(&key)
                    .filter(|entry| entry.dirty)
                    .map(|entry| (entry.value.clone(), entry.last_modified))
            }) else {
                continue;
            };

            match self.sink.flush(&key, &value) {
                Ok(()) => {
                    flushed += 1;
                    self.flushes.fetch_add(1, Ordering::Relaxed);
                    let mut l1 = self.l1.lock();
                    if let Some(entry) = l1.entry_mut(&key) {
                        if entry.last_modified == modified_at {
                            entry.mark_flushed();
                        }
                        // modified mid-flight: stays dirty, the newer value
                        // goes out next pass (last-write-wins per key)
                    }
                }
                Err(error) => {
                    failed += 1;
                    self.flush_failures.fetch_add(1, Ordering::Relaxed);
                    let mut l1 = self.l1.lock();
                    if let Some(entry) = l1.entry_mut(&key) {
                        entry.retry_count += 1;
                        if entry.retry_count >= self.config.max_flush_retries {
                            entry.alerted = true;
                            self.alerts.fetch_add(1, Ordering::Relaxed);
                            error!(
                                "cache '{}': persistence alert, entry failed {} flush attempts: {error}",
                                self.config.name, entry.retry_count
                            );
                        } else {
                            let backoff = self.config.retry_backoff
                                * 2u32.saturating_pow(entry.retry_count - 1);
                            let jitter =
                                Duration::from_millis(fastrand::u64(0..=50));
                            entry.next_retry_at = Some(now + backoff + jitter);
                        }
                    }
                }
            }
        }
        (flushed, failed)
    }

    /// Flushes every dirty entry regardless of delay, retrying until clean
    /// or the deadline expires. Returns the number left dirty on failure.
    pub fn drain(&self, deadline: Instant) -> Result<(), usize> {
        loop {
            let dirty = self.l1.lock().dirty_keys();
            if dirty.is_empty() {
                return Ok(());
            }

            for key in dirty {
                let Some(value) = ({
                    let l1 = self.l1.lock();
                    l1.peek(&key)
                        .filter(|entry| entry.dirty)
                        .map(|entry| entry.value.clone())
                }) else {
                    continue;
                };
                if self.sink.flush(&key, &value).is_ok() {
                    self.flushes.fetch_add(1, Ordering::Relaxed);
                    let mut l1 = self.l1.lock();
                    if let Some(entry) = l1.entry_mut(&key) {
                        entry.mark_flushed();
                    }
                } else {
                    self.flush_failures.fetch_add(1, Ordering::Relaxed);
                }
            }

            if Instant::now() >= deadline {
                let remaining = self.l1.lock().dirty_count();
                if remaining > 0 {
                    return Err(remaining);
                }
                return Ok(());
            }
            std::thread::sleep(Duration::from_millis(10));
        }
    }

    /// Starts the write-behind worker: a scan at least every second.
    pub fn start_worker(self: &Arc<Self>) {
        if !self.config.enable_write_behind {
            return;
        }
        let cache = Arc::clone(self);
        let handle = std::thread::spawn(move || {
            info!("cache '{}': write-behind worker started", cache.config.name);
            while !cache.shutdown.load(Ordering::Acquire) {
                std::thread::sleep(Duration::from_secs(1));
                if cache.shutdown.load(Ordering::Acquire) {
                    break;
                }
                cache.flush_due(Instant::now());
            }
        });
        *self.worker.lock() = Some(handle);
    }

    pub fn shutdown(&self) {
        self.shutdown.store(true, Ordering::Release);
        if let Some(handle) = self.worker.lock().take() {
            let _ = handle.join();
        }
    }
}
