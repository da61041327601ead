use crate::shard::hash64;

/// How reads spread across the healthy replicas.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LoadPolicy {
    RoundRobin,
    LeastConnections,
    Weighted,
    LatencyBased,
    ConsistentHash,
}

/// What the policy sees of one candidate replica. Candidates have already
/// passed the health and lag filters.
#[derive(Clone, Copy, Debug)]
pub struct Candidate {
    pub index: usize,
    pub weight: u32,
    pub active_connections: u32,
    pub avg_latency_ms: f32,
}

impl LoadPolicy {
    /// Picks one candidate. `cursor` carries the round-robin position;
    /// `key` feeds the consistent hash.
    pub fn choose(
        self,
        candidates: &[Candidate],
        cursor: usize,
        key: Option<&str>,
    ) -> Option<usize> {
        if candidates.is_empty() {
            return None;
        }
        let picked = match self {
            LoadPolicy::RoundRobin => candidates[cursor % candidates.len()].index,
            LoadPolicy::LeastConnections => {
                candidates
                    .iter()
                    .min_by_key(|candidate| candidate.active_connections)?
                    .index
            }
            LoadPolicy::Weighted => {
                // deterministic weighted spread: widest weight wins ties by
                // rotating cursor over a weight-expanded wheel
                let total: u64 = candidates.iter().map(|c| c.weight.max(1) as u64).sum();
                let mut slot = (cursor as u64) % total.max(1);
                let mut picked = candidates[0].index;
                for candidate in candidates {
                    let weight = candidate.weight.max(1) as u64;
                    if slot < weight {
                        picked = candidate.index;
                        break;
                    }
                    slot -= weight;
                }
                picked
            }
            LoadPolicy::LatencyBased => {
                candidates
                    .iter()
                    .min_by(|a, b| {
                        a.avg_latency_ms
                            .partial_cmp(&b.avg_latency_ms)
                            .unwrap_or(std::cmp::Ordering::Equal)
                    })?
                    .index
            }
            LoadPolicy::ConsistentHash => {
                let key = key.unwrap_or("");
                candidates[(hash64(key) % candidates.len() as u64) as usize].index
            }
        };
        Some(picked)
    }
}
