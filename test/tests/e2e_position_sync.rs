/// End-to-end two-player position sync: full snapshots establish
/// baselines, acknowledged baselines turn into field deltas, and entities
/// leaving interest despawn.
use std::time::Instant;

use realm_server::ServerConfig;
use realm_shared::FieldValue;
use realm_test::TestHarness;
use realm_world::Transform;

fn two_player_harness() -> (TestHarness, realm_server::UserKey, realm_server::UserKey, u64, u64) {
    let mut harness = TestHarness::new(ServerConfig::default(), None);
    let user_a = harness.connect_client().unwrap();
    let user_b = harness.connect_client().unwrap();

    let avatar_a = harness
        .server
        .spawn_avatar(user_a, "player_a", [0.0, 0.0, 0.0])
        .unwrap();
    let avatar_b = harness
        .server
        .spawn_avatar(user_b, "player_b", [10.0, 0.0, 0.0])
        .unwrap();

    (harness, user_a, user_b, avatar_a.to_u64(), avatar_b.to_u64())
}

#[test]
fn full_snapshots_establish_mutual_visibility() {
    let (mut harness, user_a, user_b, id_a, id_b) = two_player_harness();
    let now = Instant::now();

    harness.tick_and_pump(0.033, now);

    // each observer sees the other, never itself
    assert!(harness.client(user_a).entities.contains_key(&id_b));
    assert!(!harness.client(user_a).entities.contains_key(&id_a));
    assert!(harness.client(user_b).entities.contains_key(&id_a));
    assert!(!harness.client(user_b).entities.contains_key(&id_b));

    assert_eq!(
        harness.client(user_b).position_of(id_a),
        Some([0.0, 0.0, 0.0])
    );
}

#[test]
fn movement_reaches_the_observer_as_a_delta() {
    let (mut harness, user_a, user_b, id_a, _id_b) = two_player_harness();
    let start = Instant::now();

    // tick 1: full snapshots; tick 2: acks promote baselines
    let now = harness.run_ticks(2, 0.033, start);

    // A moves to (1, 0, 0)
    {
        let world = harness.server.world_mut(0).unwrap();
        let entity = realm_world::Entity::from_u64(id_a);
        world
            .get_component_mut::<Transform>(entity)
            .unwrap()
            .position = [1.0, 0.0, 0.0];
    }

    let before_deltas = harness.client(user_b).deltas_applied;
    harness.tick_and_pump(0.033, now);

    let client_b = harness.client(user_b);
    assert!(client_b.deltas_applied > before_deltas, "B received a delta");
    assert_eq!(client_b.baseline_mismatches, 0);
    let position = client_b.position_of(id_a).unwrap();
    assert!((position[0] - 1.0).abs() <= 0.005);
    assert!(position[1].abs() <= 0.005);
    assert!(position[2].abs() <= 0.005);

    // A heard nothing about itself
    assert!(!harness.client(user_a).entities.contains_key(&id_a));
}

#[test]
fn acked_baselines_chain_across_ticks() {
    let (mut harness, _user_a, user_b, id_a, _id_b) = two_player_harness();
    let start = Instant::now();
    let mut now = harness.run_ticks(2, 0.033, start);

    // two successive moves, each synced and acked before the next
    for (step, x) in [1.0f32, 2.0].into_iter().enumerate() {
        {
            let world = harness.server.world_mut(0).unwrap();
            let entity = realm_world::Entity::from_u64(id_a);
            world
                .get_component_mut::<Transform>(entity)
                .unwrap()
                .position = [x, 0.0, 0.0];
        }
        now = harness.run_ticks(2, 0.033, now);

        let client_b = harness.client(user_b);
        assert_eq!(client_b.baseline_mismatches, 0, "step {step}");
        let position = client_b.position_of(id_a).unwrap();
        assert!((position[0] - x).abs() <= 0.01, "step {step}");
    }
}

#[test]
fn leaving_interest_despawns_reliably() {
    let (mut harness, user_a, _user_b, _id_a, id_b) = two_player_harness();
    let start = Instant::now();
    let now = harness.run_ticks(2, 0.033, start);

    assert!(harness.client(user_a).entities.contains_key(&id_b));

    // B teleports far outside the view distance
    {
        let world = harness.server.world_mut(0).unwrap();
        let entity = realm_world::Entity::from_u64(id_b);
        world
            .get_component_mut::<Transform>(entity)
            .unwrap()
            .position = [10_000.0, 0.0, 0.0];
    }
    harness.run_ticks(2, 0.033, now);

    let client_a = harness.client(user_a);
    assert!(client_a.despawned.contains(&id_b));
    assert!(!client_a.entities.contains_key(&id_b));
}

#[test]
fn distant_entities_update_at_a_reduced_cadence() {
    let mut harness = TestHarness::new(ServerConfig::default(), None);
    let user_a = harness.connect_client().unwrap();
    let user_b = harness.connect_client().unwrap();
    harness
        .server
        .spawn_avatar(user_a, "watcher", [0.0, 0.0, 0.0])
        .unwrap();
    // B sits in the 2 Hz band (distance 180 of max view 200)
    let avatar_b = harness
        .server
        .spawn_avatar(user_b, "wanderer", [180.0, 0.0, 0.0])
        .unwrap();

    let start = Instant::now();
    let mut now = harness.run_ticks(2, 0.033, start);

    // B jitters every tick for one simulated second (30 ticks at 30 Hz)
    let before = {
        let client = harness.client(user_a);
        client.deltas_applied + client.snapshots_applied
    };
    for step in 0..30 {
        {
            let world = harness.server.world_mut(0).unwrap();
            world
                .get_component_mut::<Transform>(avatar_b)
                .unwrap()
                .position = [180.0, 0.1 * (step + 1) as f32, 0.0];
        }
        harness.tick_and_pump(0.033, now);
        now += std::time::Duration::from_secs_f32(0.033);
    }

    let client = harness.client(user_a);
    let updates = client.deltas_applied + client.snapshots_applied - before;
    // 2 Hz over one second allows about two updates; never the full 30
    assert!(updates <= 4, "got {updates} updates for a 2 Hz entity");
    assert!(updates >= 1);
}

#[test]
fn snapshots_carry_replicated_fields() {
    let (mut harness, user_a, _user_b, _id_a, id_b) = two_player_harness();
    harness.tick_and_pump(0.033, Instant::now());

    let snapshot = harness.client(user_a).entities.get(&id_b).unwrap();
    assert!(matches!(snapshot.get("position"), Some(FieldValue::Vec3(_))));
    assert!(matches!(snapshot.get("hp"), Some(FieldValue::Float(_))));
    assert!(matches!(snapshot.get("dead"), Some(FieldValue::Bool(false))));
    assert_eq!(
        snapshot.get("name"),
        Some(&FieldValue::Str("player_b".to_string()))
    );
}
