use std::hash::Hash;
use std::time::Instant;

use lru::LruCache;

use super::entry::{CacheEntry, CacheValue};

// When a full tier holds only dirty entries, put hands the rejected pair
// back so the caller can flush and retry without losing the value.

/// One LRU tier with per-entry TTL and dirty-aware eviction. Backed by an
/// unbounded `lru::LruCache`; capacity is enforced here because the stock
/// eviction cannot skip dirty entries.
pub struct LruTier<K: Hash + Eq, V> {
    entries: LruCache<K, CacheEntry<V>>,
    capacity: usize,
}

impl<K: Hash + Eq + Clone, V: CacheValue> LruTier<K, V> {
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: LruCache::unbounded(),
            capacity: capacity.max(1),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Touches and returns the live entry for `key`. Expired entries are
    /// removed and reported as `Err(true)`; a plain miss is `Err(false)`.
    pub fn get(&mut self, key: &K, now: Instant) -> Result<&mut CacheEntry<V>, bool> {
        let expired = match self.entries.peek(key) {
            None => return Err(false),
            Some(entry) => entry.expired(now),
        };
        if expired {
            // expired entries are dropped even when dirty: their write has
            // either flushed by now or will be re-created by the next load
            self.entries.pop(key);
            return Err(true);
        }
        match self.entries.get_mut(key) {
            Some(entry) => {
                entry.last_accessed = now;
                Ok(entry)
            }
            None => Err(false),
        }
    }

    pub fn peek(&self, key: &K) -> Option<&CacheEntry<V>> {
        self.entries.peek(key)
    }

    pub fn contains(&self, key: &K) -> bool {
        self.entries.contains(key)
    }

    pub fn pop(&mut self, key: &K) -> Option<CacheEntry<V>> {
        self.entries.pop(key)
    }

    /// Inserts `entry`, evicting clean LRU entries as needed. When the
    /// tier is full of dirty entries the pair is handed back: the caller
    /// must flush something before retrying.
    pub fn put(&mut self, key: K, entry: CacheEntry<V>) -> Result<(), (K, CacheEntry<V>)> {
        while self.entries.len() >= self.capacity && !self.entries.contains(&key) {
            let Some(victim) = self.lru_clean_key() else {
                return Err((key, entry));
            };
            self.entries.pop(&victim);
        }
        self.entries.put(key, entry);
        Ok(())
    }

    /// The least recently used key whose entry is clean.
    fn lru_clean_key(&self) -> Option<K> {
        self.entries
            .iter()
            .rev()
            .find(|(_, entry)| entry.evictable())
            .map(|(key, _)| key.clone())
    }

    /// The dirty entry that has waited longest since modification.
    pub fn oldest_dirty_key(&self) -> Option<K> {
        self.entries
            .iter()
            .filter(|(_, entry)| entry.dirty)
            .min_by_key(|(_, entry)| entry.last_modified)
            .map(|(key, _)| key.clone())
    }

    pub fn entry_mut(&mut self, key: &K) -> Option<&mut CacheEntry<V>> {
        self.entries.peek_mut(key)
    }

    pub fn dirty_count(&self) -> usize {
        self.entries.iter().filter(|(_, entry)| entry.dirty).count()
    }

    /// Keys of entries due for a write-behind flush at `now`.
    pub fn due_for_flush(&self, now: Instant, write_delay: std::time::Duration) -> Vec<K> {
        self.entries
            .iter()
            .filter(|(_, entry)| {
                entry.dirty
                    && !entry.alerted
                    && now.saturating_duration_since(entry.last_modified) >= write_delay
                    && entry.next_retry_at.map(|at| now >= at).unwrap_or(true)
            })
            .map(|(key, _)| key.clone())
            .collect()
    }

    pub fn dirty_keys(&self) -> Vec<K> {
        self.entries
            .iter()
            .filter(|(_, entry)| entry.dirty)
            .map(|(key, _)| key.clone())
            .collect()
    }
}
