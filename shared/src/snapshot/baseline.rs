use std::collections::{BTreeMap, HashMap};

use crate::types::Tick;

use super::snapshot::EntitySnapshot;

/// Wire-level entity id used by the sync layer. The world's entity type
/// converts to and from this.
pub type NetEntityId = u64;

/// Per-connection store of the last snapshot each remote entity has
/// acknowledged, plus the in-flight snapshots awaiting acknowledgement.
///
/// Deltas are always built against the acknowledged baseline; sent snapshots
/// are promoted when the carrying packet's delivery is confirmed.
pub struct BaselineStore {
    acked: HashMap<NetEntityId, EntitySnapshot>,
    pending: HashMap<NetEntityId, BTreeMap<Tick, EntitySnapshot>>,
}

impl BaselineStore {
    pub fn new() -> Self {
        Self {
            acked: HashMap::new(),
            pending: HashMap::new(),
        }
    }

    /// The acknowledged baseline for `entity`, if any.
    pub fn acked(&self, entity: NetEntityId) -> Option<&EntitySnapshot> {
        self.acked.get(&entity)
    }

    pub fn has_baseline(&self, entity: NetEntityId) -> bool {
        self.acked.contains_key(&entity)
    }

    /// Records a snapshot sent at its tick, awaiting acknowledgement. For
    /// quantized deltas the caller passes the *reconstructed* snapshot (the
    /// one the remote will hold after applying), so both ends agree exactly.
    pub fn record_sent(&mut self, entity: NetEntityId, snapshot: EntitySnapshot) {
        self.pending
            .entry(entity)
            .or_default()
            .insert(snapshot.tick, snapshot);
    }

    /// Promotes the pending snapshot at `tick` to the acknowledged baseline
    /// and drops everything older. Returns false when no such snapshot is
    /// in flight (a stale or duplicate ack).
    pub fn acknowledge(&mut self, entity: NetEntityId, tick: Tick) -> bool {
        let Some(in_flight) = self.pending.get_mut(&entity) else {
            return false;
        };
        let Some(snapshot) = in_flight.remove(&tick) else {
            return false;
        };

        // anything older than the new baseline can never be promoted
        *in_flight = in_flight.split_off(&tick);
        if in_flight.is_empty() {
            self.pending.remove(&entity);
        }

        match self.acked.get(&entity) {
            Some(current) if current.tick >= tick => false,
            _ => {
                self.acked.insert(entity, snapshot);
                true
            }
        }
    }

    /// Forgets everything about `entity` (despawn or interest exit).
    pub fn forget(&mut self, entity: NetEntityId) {
        self.acked.remove(&entity);
        self.pending.remove(&entity);
    }

    pub fn tracked_count(&self) -> usize {
        self.acked.len()
    }

    pub fn pending_count(&self) -> usize {
        self.pending.values().map(BTreeMap::len).sum()
    }
}

impl Default for BaselineStore {
    fn default() -> Self {
        Self::new()
    }
}
