/// Replica fallback scenario: bounded-staleness reads avoid lagging
/// replicas, a dead replica leaves rotation after consecutive validation
/// failures, and recovers only after consecutive successes.
use std::sync::Arc;

use realm_storage::{
    Consistency, ConnectionPool, LoadPolicy, PoolConfig, QueryRouter, ReplicaConfig,
    ReplicaHealth, RouteDecision, StorageDriver, Value,
};
use realm_test::MockDriver;

fn pool(name: &str, port: u16, driver: &Arc<MockDriver>) -> Arc<ConnectionPool> {
    ConnectionPool::new(
        PoolConfig {
            name: name.to_string(),
            host: "db".to_string(),
            port,
            min: 0,
            max: 4,
            initial: 0,
            test_on_borrow: false,
            ..PoolConfig::default()
        },
        Arc::clone(driver) as Arc<dyn StorageDriver>,
    )
}

/// One primary (3306) and two replicas (3307, 3308), replica-2 lagging
/// 5000 ms against a 1000 ms ceiling.
fn scenario() -> (QueryRouter, Arc<MockDriver>) {
    let driver = MockDriver::new();
    let router = QueryRouter::new(
        pool("primary", 3306, &driver),
        LoadPolicy::RoundRobin,
        Arc::clone(&driver) as Arc<dyn StorageDriver>,
    );
    for port in [3307u16, 3308] {
        router.add_replica(
            ReplicaConfig {
                host: "db".to_string(),
                port,
                weight: 1,
                region: "main".to_string(),
                max_lag_ms: 1000,
                dedicated_patterns: Vec::new(),
            },
            pool(&format!("replica_{port}"), port, &driver),
        );
    }
    router.set_replica_lag(1, 5000);
    (router, driver)
}

const QUERY: &str = "SELECT * FROM characters WHERE id = ?";

#[test]
fn bounded_staleness_routes_to_the_fresh_replica() {
    let (router, _driver) = scenario();

    for _ in 0..4 {
        let decision = router.route(QUERY, Consistency::BoundedStaleness { max_lag_ms: 1000 }, None);
        assert_eq!(decision, RouteDecision::Replica(0));
    }
}

#[test]
fn dead_replica_fails_out_then_recovers() {
    let (router, driver) = scenario();

    // kill replica-1; it takes consecutive failed validations to leave
    driver.set_down("db:3307", true);
    router.run_validation_round();
    assert_ne!(router.replica_health(0), Some(ReplicaHealth::Failed));
    router.run_validation_round();
    router.run_validation_round();
    assert_eq!(router.replica_health(0), Some(ReplicaHealth::Failed));

    // replica-1 failed, replica-2 too stale: the read lands on primary
    let decision = router.route(QUERY, Consistency::BoundedStaleness { max_lag_ms: 1000 }, None);
    assert_eq!(decision, RouteDecision::Primary);

    // restore; one success is not enough, consecutive successes are
    driver.set_down("db:3307", false);
    router.run_validation_round();
    assert_eq!(router.replica_health(0), Some(ReplicaHealth::Failed));
    router.run_validation_round();
    assert_eq!(router.replica_health(0), Some(ReplicaHealth::Healthy));

    let decision = router.route(QUERY, Consistency::BoundedStaleness { max_lag_ms: 1000 }, None);
    assert_eq!(decision, RouteDecision::Replica(0));
}

#[test]
fn replica_execution_failure_falls_back_to_primary_once() {
    let (router, driver) = scenario();

    // replica-1 validates fine but refuses queries
    driver.set_down("db:3307", true);

    let rows = router
        .execute(QUERY, &[Value::UInt(7)], Consistency::BoundedStaleness { max_lag_ms: 1000 }, None)
        .unwrap();
    assert_eq!(
        rows[0].get("endpoint"),
        Some(&Value::Text("db:3306".to_string()))
    );
    // the failed attempt was charged to the replica
    assert_ne!(router.replica_health(0), Some(ReplicaHealth::Healthy));
}

#[test]
fn writes_never_touch_replicas() {
    let (router, driver) = scenario();

    router
        .execute(
            "UPDATE characters SET hp = 10 WHERE id = 7",
            &[],
            Consistency::Eventual,
            None,
        )
        .unwrap();

    assert!(driver.statements_against("db:3307").is_empty());
    assert!(driver.statements_against("db:3308").is_empty());
    assert_eq!(driver.statements_against("db:3306").len(), 1);
}
