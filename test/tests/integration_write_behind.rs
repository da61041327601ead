/// Write-behind persistence through the server: dirty components enter
/// the cache, flushes coalesce to the latest value, and shutdown drains
/// cleanly (or reports what stayed dirty).
use std::sync::Arc;
use std::time::{Duration, Instant};

use realm_server::{PersistenceHandle, ServerConfig};
use realm_storage::{CacheConfig, DataKind, FlushSink, GameCache};
use realm_test::{RecordingSink, TestHarness};
use realm_world::Transform;

fn cache_with_sink(
    write_delay: Duration,
    sink: &Arc<RecordingSink>,
) -> Arc<GameCache<String, Vec<u8>>> {
    GameCache::new(
        CacheConfig {
            name: "player".to_string(),
            write_delay,
            enable_write_behind: false, // tests drive flush passes directly
            ..CacheConfig::default()
        },
        Arc::clone(sink) as Arc<dyn FlushSink<String, Vec<u8>>>,
    )
}

#[test]
fn dirty_components_reach_the_cache_and_drain_at_shutdown() {
    let sink = RecordingSink::new();
    let cache = cache_with_sink(Duration::from_secs(30), &sink);
    let persistence = PersistenceHandle {
        cache: Arc::clone(&cache),
        pools: Vec::new(),
    };

    let mut harness = TestHarness::new(ServerConfig::default(), Some(persistence));
    let user = harness.connect_client().unwrap();
    let avatar = harness
        .server
        .spawn_avatar(user, "hero", [0.0, 0.0, 0.0])
        .unwrap();

    harness.tick_and_pump(0.033, Instant::now());
    // the spawn marked components dirty, so the avatar's record is cached
    assert!(cache.dirty_count() > 0);

    // clean shutdown flushes everything within the deadline
    let result = harness
        .server
        .shutdown(Instant::now() + Duration::from_secs(1));
    assert!(result.is_ok());
    assert_eq!(cache.dirty_count(), 0);

    let expected_key = format!("entity:0:{}", avatar.to_u64());
    assert!(sink
        .flushed()
        .iter()
        .any(|(key, _)| *key == expected_key));
}

#[test]
fn repeated_writes_coalesce_into_one_flush_of_the_latest_value() {
    let sink = RecordingSink::new();
    let cache = cache_with_sink(Duration::from_secs(30), &sink);
    let start = Instant::now();

    cache
        .write(&"player:42".to_string(), b"hp=90".to_vec(), DataKind::OnlineEntity, true)
        .unwrap();
    // modified again at t+5s, before the write delay elapses
    cache
        .write(&"player:42".to_string(), b"hp=80".to_vec(), DataKind::OnlineEntity, true)
        .unwrap();

    let (flushed, _) = cache.flush_due(start + Duration::from_secs(10));
    assert_eq!(flushed, 0, "nothing is due before the delay");

    let (flushed, _) = cache.flush_due(start + Duration::from_secs(35));
    assert_eq!(flushed, 1, "exactly one flush after the delay");
    assert_eq!(
        sink.flushed(),
        vec![("player:42".to_string(), b"hp=80".to_vec())]
    );
}

#[test]
fn invalidate_before_flush_coalesces_then_removes() {
    let sink = RecordingSink::new();
    let cache = cache_with_sink(Duration::from_secs(30), &sink);

    cache
        .write(&"player:42".to_string(), b"hp=80".to_vec(), DataKind::OnlineEntity, true)
        .unwrap();
    cache.invalidate(&"player:42".to_string()).unwrap();

    assert_eq!(sink.flush_count(), 1);
    let (value, _) = cache.get(&"player:42".to_string());
    assert_eq!(value, None);

    // nothing left for the write-behind pass
    let (flushed, _) = cache.flush_due(Instant::now() + Duration::from_secs(60));
    assert_eq!(flushed, 0);
}

#[test]
fn shutdown_with_unreachable_storage_reports_dirty_entries() {
    let sink = RecordingSink::new();
    sink.set_failing(true);
    let cache = cache_with_sink(Duration::from_secs(30), &sink);
    let persistence = PersistenceHandle {
        cache: Arc::clone(&cache),
        pools: Vec::new(),
    };

    let mut harness = TestHarness::new(ServerConfig::default(), Some(persistence));
    let user = harness.connect_client().unwrap();
    let avatar = harness
        .server
        .spawn_avatar(user, "hero", [0.0, 0.0, 0.0])
        .unwrap();
    harness.tick_and_pump(0.033, Instant::now());

    // nudge the avatar so there is definitely dirty state
    {
        let world = harness.server.world_mut(0).unwrap();
        world
            .get_component_mut::<Transform>(avatar)
            .unwrap()
            .position = [5.0, 0.0, 0.0];
    }
    harness.tick_and_pump(0.033, Instant::now());

    let result = harness
        .server
        .shutdown(Instant::now() + Duration::from_millis(100));
    assert!(matches!(result, Err(remaining) if remaining > 0));
}
