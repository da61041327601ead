use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use log::{info, warn};
use parking_lot::Mutex;

use crate::driver::{Row, StorageDriver, Value};
use crate::error::StorageError;
use crate::pool::ConnectionPool;

use super::health::{HealthTracker, ReplicaHealth};
use super::policy::{Candidate, LoadPolicy};
use super::query::{Consistency, QueryKind};

/// Consecutive failed validations before a replica is taken out of
/// rotation, and consecutive successes before it returns.
const FAIL_THRESHOLD: u32 = 3;
const RECOVER_THRESHOLD: u32 = 2;

/// Configuration of one read replica.
#[derive(Clone)]
pub struct ReplicaConfig {
    pub host: String,
    pub port: u16,
    pub weight: u32,
    pub region: String,
    /// Reads are not routed here while replication lag exceeds this.
    pub max_lag_ms: u64,
    /// Query substrings this replica uniquely serves (e.g. analytics);
    /// matching reads route here regardless of the load policy.
    pub dedicated_patterns: Vec<String>,
}

struct ReplicaState {
    config: ReplicaConfig,
    pool: Arc<ConnectionPool>,
    health: HealthTracker,
    lag_ms: u64,
    active_connections: u32,
    avg_latency_ms: f32,
    total_queries: u64,
    failed_queries: u64,
}

/// Where one query was routed.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RouteDecision {
    Primary,
    Replica(usize),
}

/// Read/write splitting over a primary and a set of replicas, with
/// hysteretic replica health, lag ceilings, load policies and dedicated
/// replica patterns.
pub struct QueryRouter {
    primary: Arc<ConnectionPool>,
    replicas: Mutex<Vec<ReplicaState>>,
    policy: LoadPolicy,
    cursor: AtomicUsize,
    acquire_timeout: Duration,
    driver: Arc<dyn StorageDriver>,
    validation_query: String,
}

impl QueryRouter {
    pub fn new(
        primary: Arc<ConnectionPool>,
        policy: LoadPolicy,
        driver: Arc<dyn StorageDriver>,
    ) -> Self {
        Self {
            primary,
            replicas: Mutex::new(Vec::new()),
            policy,
            cursor: AtomicUsize::new(0),
            acquire_timeout: Duration::from_secs(5),
            driver,
            validation_query: "SELECT 1".to_string(),
        }
    }

    pub fn add_replica(&self, config: ReplicaConfig, pool: Arc<ConnectionPool>) -> usize {
        let mut replicas = self.replicas.lock();
        info!(
            "query router: added replica {}:{} (region {})",
            config.host, config.port, config.region
        );
        replicas.push(ReplicaState {
            config,
            pool,
            health: HealthTracker::new(FAIL_THRESHOLD, RECOVER_THRESHOLD),
            lag_ms: 0,
            active_connections: 0,
            avg_latency_ms: 0.0,
            total_queries: 0,
            failed_queries: 0,
        });
        replicas.len() - 1
    }

    pub fn replica_health(&self, index: usize) -> Option<ReplicaHealth> {
        self.replicas
            .lock()
            .get(index)
            .map(|replica| replica.health.state())
    }

    /// Observed replication lag, fed by the monitoring collaborator.
    pub fn set_replica_lag(&self, index: usize, lag_ms: u64) {
        let mut replicas = self.replicas.lock();
        if let Some(replica) = replicas.get_mut(index) {
            replica.lag_ms = lag_ms;
            let max_lag = replica.config.max_lag_ms;
            replica.health.record_lag(lag_ms, max_lag);
        }
    }

    /// One validation pass over every replica; drives the hysteretic
    /// health transitions.
    pub fn run_validation_round(&self) {
        let mut replicas = self.replicas.lock();
        for replica in replicas.iter_mut() {
            let endpoint = replica.pool.endpoint().clone();
            if self.driver.validate(&endpoint, &self.validation_query) {
                replica.health.record_success();
            } else {
                warn!("query router: replica {endpoint} failed validation");
                replica.health.record_failure();
            }
        }
    }

    /// Decides where `query` goes without executing it.
    ///
    /// Writes, DDL, transaction control, and strong / read-your-writes
    /// reads go to primary. Bounded-staleness reads accept a replica whose
    /// lag is inside the bound. Eventual reads follow the load policy.
    pub fn route(&self, query: &str, consistency: Consistency, key: Option<&str>) -> RouteDecision {
        match QueryKind::classify(query) {
            QueryKind::Read => {}
            _ => return RouteDecision::Primary,
        }
        let staleness_bound = match consistency {
            Consistency::Strong | Consistency::ReadYourWrites => return RouteDecision::Primary,
            Consistency::BoundedStaleness { max_lag_ms } => Some(max_lag_ms),
            Consistency::Eventual => None,
        };

        let replicas = self.replicas.lock();

        // dedicated replicas win over the policy for their patterns
        if let Some(index) = replicas.iter().position(|replica| {
            replica.health.state().routable()
                && replica
                    .config
                    .dedicated_patterns
                    .iter()
                    .any(|pattern| query.contains(pattern.as_str()))
        }) {
            return RouteDecision::Replica(index);
        }

        let candidates: Vec<Candidate> = replicas
            .iter()
            .enumerate()
            .filter(|(_, replica)| {
                replica.health.state().routable()
                    && replica.lag_ms <= replica.config.max_lag_ms
                    && staleness_bound
                        .map(|bound| replica.lag_ms <= bound)
                        .unwrap_or(true)
            })
            .map(|(index, replica)| Candidate {
                index,
                weight: replica.config.weight,
                active_connections: replica.active_connections,
                avg_latency_ms: replica.avg_latency_ms,
            })
            .collect();

        let cursor = self.cursor.fetch_add(1, Ordering::Relaxed);
        match self.policy.choose(&candidates, cursor, key) {
            Some(index) => RouteDecision::Replica(index),
            None => RouteDecision::Primary,
        }
    }

    /// Routes and executes. A replica failure bumps that replica's failure
    /// counters and the query retries once on primary; write errors
    /// surface to the caller directly.
    pub fn execute(
        &self,
        query: &str,
        params: &[Value],
        consistency: Consistency,
        key: Option<&str>,
    ) -> Result<Vec<Row>, StorageError> {
        match self.route(query, consistency, key) {
            RouteDecision::Primary => self.execute_on_primary(query, params),
            RouteDecision::Replica(index) => {
                match self.execute_on_replica(index, query, params) {
                    Ok(rows) => Ok(rows),
                    Err(error) => {
                        warn!(
                            "query router: replica {index} failed ({error}); retrying on primary"
                        );
                        self.execute_on_primary(query, params)
                    }
                }
            }
        }
    }

    fn execute_on_primary(&self, query: &str, params: &[Value]) -> Result<Vec<Row>, StorageError> {
        let mut guard = self.primary.acquire(self.acquire_timeout)?;
        guard.execute(query, params)
    }

    fn execute_on_replica(
        &self,
        index: usize,
        query: &str,
        params: &[Value],
    ) -> Result<Vec<Row>, StorageError> {
        let pool = {
            let mut replicas = self.replicas.lock();
            let Some(replica) = replicas.get_mut(index) else {
                return Err(StorageError::NotFound {
                    what: format!("replica {index}"),
                });
            };
            replica.active_connections += 1;
            replica.total_queries += 1;
            Arc::clone(&replica.pool)
        };

        let started = Instant::now();
        let result = pool
            .acquire(self.acquire_timeout)
            .and_then(|mut guard| guard.execute(query, params));
        let elapsed_ms = started.elapsed().as_secs_f32() * 1000.0;

        let mut replicas = self.replicas.lock();
        if let Some(replica) = replicas.get_mut(index) {
            replica.active_connections = replica.active_connections.saturating_sub(1);
            match &result {
                Ok(_) => {
                    replica.avg_latency_ms = if replica.avg_latency_ms == 0.0 {
                        elapsed_ms
                    } else {
                        replica.avg_latency_ms * 0.9 + elapsed_ms * 0.1
                    };
                }
                Err(_) => {
                    replica.failed_queries += 1;
                    replica.health.record_failure();
                }
            }
        }
        result
    }

    pub fn shutdown(&self) {
        self.primary.shutdown();
        for replica in self.replicas.lock().iter() {
            replica.pool.shutdown();
        }
    }
}
