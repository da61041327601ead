/// Behavior tree patrol scenario: with no hostile in range the NPC walks
/// its waypoint loop forever; a hostile appearing pulls it into the
/// find-move-attack branch.
use realm_ai::{attack_target, find_target, move_to_target, patrol, TreeBuilder, TreeFactory};
use realm_world::{
    AiAgent, BehaviorSystem, Combat, CombatSystem, Entity, Health, MovementSystem, NpcActor,
    Scheduler, Stats, Tag, TagCategory, Transform, World, WorldConfig,
};

const P1: [f32; 3] = [0.0, 0.0, 0.0];
const P2: [f32; 3] = [10.0, 0.0, 0.0];
const P3: [f32; 3] = [10.0, 10.0, 0.0];

fn guard_factory() -> TreeFactory<NpcActor> {
    let mut factory = TreeFactory::new();
    factory.register("guard", || {
        let mut builder = TreeBuilder::new("guard");
        builder.selector();
        builder.sequence();
        builder.action("find_target", find_target::<NpcActor>(20.0));
        builder.action("move_to_target", move_to_target::<NpcActor>(2.0));
        builder.action("attack", attack_target::<NpcActor>());
        builder.end();
        builder.action("patrol", patrol::<NpcActor>(vec![P1, P2, P3], 1.0));
        builder.end();
        builder.build().expect("guard tree is valid")
    });
    factory
}

fn distance(a: [f32; 3], b: [f32; 3]) -> f32 {
    let dx = a[0] - b[0];
    let dy = a[1] - b[1];
    let dz = a[2] - b[2];
    (dx * dx + dy * dy + dz * dz).sqrt()
}

fn spawn_guard(world: &mut World) -> Entity {
    let npc = world.create_entity();
    world.add_component(npc, Transform::at(P1));
    world.add_component(npc, Health::full(50.0));
    world.add_component(npc, Combat::new(3.0, 5.0, 10));
    world.add_component(npc, Stats::default());
    world.add_component(npc, Tag::new("guard", TagCategory::Npc));
    world.add_component(npc, AiAgent::new("guard", vec![TagCategory::Player], 30.0));
    npc
}

fn patrol_world() -> (World, Scheduler, Entity) {
    let mut world = World::new(&WorldConfig::default());
    let npc = spawn_guard(&mut world);
    world.flush_spatial();

    let mut scheduler = Scheduler::new();
    scheduler.register_system(Box::new(BehaviorSystem::new(guard_factory())));
    scheduler.register_system(Box::new(MovementSystem));
    scheduler.register_system(Box::new(CombatSystem));
    (world, scheduler, npc)
}

#[test]
fn npc_visits_waypoints_in_order_and_wraps() {
    let (mut world, mut scheduler, npc) = patrol_world();

    let mut first_near_p2 = None;
    let mut first_near_p3 = None;
    let mut back_near_p1 = None;

    for tick in 0..400 {
        scheduler.tick(&mut world, 0.1);
        let position = world.get_component::<Transform>(npc).unwrap().position;

        if first_near_p2.is_none() && distance(position, P2) < 1.5 {
            first_near_p2 = Some(tick);
        }
        if first_near_p2.is_some() && first_near_p3.is_none() && distance(position, P3) < 1.5 {
            first_near_p3 = Some(tick);
        }
        if first_near_p3.is_some() && back_near_p1.is_none() && distance(position, P1) < 1.5 {
            back_near_p1 = Some(tick);
        }
    }

    let p2_tick = first_near_p2.expect("reached p2");
    let p3_tick = first_near_p3.expect("reached p3");
    let p1_tick = back_near_p1.expect("wrapped back to p1");
    assert!(p2_tick < p3_tick);
    assert!(p3_tick < p1_tick);

    // nothing hostile around: never acquired a target
    assert_eq!(world.get_component::<Combat>(npc).unwrap().target, None);
}

#[test]
fn hostile_in_range_pulls_the_npc_off_patrol() {
    let (mut world, mut scheduler, npc) = patrol_world();

    // let the patrol get going
    for _ in 0..10 {
        scheduler.tick(&mut world, 0.1);
    }

    // a hostile appears at distance ~10 from the guard
    let guard_position = world.get_component::<Transform>(npc).unwrap().position;
    let hostile_position = [
        guard_position[0] + 10.0,
        guard_position[1],
        guard_position[2],
    ];
    let hostile = world.create_entity();
    world.add_component(hostile, Transform::at(hostile_position));
    world.add_component(hostile, Health::full(100.0));
    world.add_component(hostile, Tag::new("intruder", TagCategory::Player));
    world.flush_spatial();

    let before = distance(
        world.get_component::<Transform>(npc).unwrap().position,
        hostile_position,
    );
    for _ in 0..20 {
        scheduler.tick(&mut world, 0.1);
    }
    let after = distance(
        world.get_component::<Transform>(npc).unwrap().position,
        hostile_position,
    );

    // the guard is closing on the intruder instead of patrolling
    assert!(after < before);

    // and once in range it starts attacking
    for _ in 0..100 {
        scheduler.tick(&mut world, 0.1);
    }
    assert_eq!(
        world.get_component::<Combat>(npc).unwrap().target,
        Some(hostile)
    );
    assert!(world.get_component::<Health>(hostile).unwrap().current < 100.0);
}
