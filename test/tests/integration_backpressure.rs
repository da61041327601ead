/// Back-pressure scenario: a 100 KB/s connection asked to carry 250 KB of
/// low-priority effect traffic sends what the budget allows, leaves the
/// rest queued, and drops entries once they age past the staleness bound.
use std::time::{Duration, Instant};

use realm_shared::{ConnectionConfig, Priority, Reliability, SendPipeline, STALE_PACKET_AGE};

const LIMIT_BYTES_PER_SECOND: usize = 100_000;
const EFFECT_BYTES: usize = 1000;
const EFFECT_COUNT: usize = 250;

fn loaded_pipeline(now: Instant) -> SendPipeline {
    let mut pipeline = SendPipeline::new(&ConnectionConfig {
        bandwidth_limit_bytes_per_second: LIMIT_BYTES_PER_SECOND,
        enable_aggregation: false,
        ..ConnectionConfig::default()
    })
    .expect("pipeline config is valid");

    for index in 0..EFFECT_COUNT {
        pipeline.enqueue(
            vec![0xAB; EFFECT_BYTES],
            Priority::Low,
            Reliability::Unreliable,
            index as u16,
            false,
            now,
        );
    }
    pipeline
}

#[test]
fn byte_budget_caps_each_second_of_sending() {
    let start = Instant::now();
    let mut pipeline = loaded_pipeline(start);

    let first_second = pipeline.drain(start).unwrap();
    let sent_bytes: usize = first_second.iter().map(Vec::len).sum();
    assert!(sent_bytes <= LIMIT_BYTES_PER_SECOND + 2 * EFFECT_BYTES);
    assert!(sent_bytes >= LIMIT_BYTES_PER_SECOND - 2 * EFFECT_BYTES);

    // most of the queue is still waiting
    assert!(pipeline.queued_count() > EFFECT_COUNT / 2);

    // the next second's budget moves another slice
    let second_second = pipeline.drain(start + Duration::from_millis(1100)).unwrap();
    assert!(!second_second.is_empty());
    assert!(pipeline.queued_count() > 0);
}

#[test]
fn entries_older_than_the_staleness_bound_are_dropped_and_counted() {
    let start = Instant::now();
    let mut pipeline = loaded_pipeline(start);

    // one second's worth goes out
    let _ = pipeline.drain(start).unwrap();
    let queued_before_drop = pipeline.queued_count();
    assert!(queued_before_drop > 0);

    // long past the staleness bound, the survivors are dropped, not sent
    let late = start + STALE_PACKET_AGE + Duration::from_millis(200);
    let packets = pipeline.drain(late).unwrap();
    assert!(packets.is_empty());
    assert_eq!(pipeline.queued_count(), 0);

    let stats = pipeline.stats();
    assert_eq!(stats.packets_dropped_stale as usize, queued_before_drop);
    assert!(stats.packets_lost >= stats.packets_dropped_stale);
}

#[test]
fn critical_traffic_is_unaffected_by_a_clogged_low_queue() {
    let start = Instant::now();
    let mut pipeline = loaded_pipeline(start);

    pipeline.enqueue(
        b"combat-state".to_vec(),
        Priority::Critical,
        Reliability::Reliable,
        999,
        false,
        start,
    );

    let packets = pipeline.drain(start).unwrap();
    // the critical packet is in the first slice out the door
    assert!(!packets.is_empty());
    let first = &packets[0];
    assert!(first.len() < 200, "critical packet went out first and alone");
}
