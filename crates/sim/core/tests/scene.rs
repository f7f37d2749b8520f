mod common;

use std::sync::{Arc, Mutex};

use common::{build, entry, first_entry, increment, run, scene_config, sim_config, started, variable, SCENE};
use sim_core::logic::behavior::BehaviorLogic;
use sim_core::schema::{PopulationFilter, SensorConfig};
use sim_core::state::ActorFields;
use sim_core::{
    ActionConfig, ActorConfig, ActorFlags, ActorId, ActorKind, AgentConfig, BehaviorConfig,
    ClientAction, CollisionFlags, ConfigLibrary, EntityKey, EntryId, HandlerConfig, HandlerKind,
    InputFrame, MobileConfig, PlacedActor, Scene, SceneEnv, SceneError, SessionId, SessionOracle,
    Shape, ShapeConfig, SimConfig, SpawnOrigin, TargetConfig, TileMap, Timestamp, Transform, Value,
    Vector2,
};

fn at(x: f32, y: f32) -> Transform {
    Transform::new(Vector2::new(x, y), 0.0)
}

fn mobile() -> ActorConfig {
    ActorConfig {
        kind: ActorKind::Mobile(MobileConfig::default()),
        ..ActorConfig::default()
    }
}

fn spawn(scene: &mut Scene, config: &str, x: f32, y: f32) -> ActorId {
    scene
        .spawn_actor(config, at(x, y), SpawnOrigin::default())
        .expect("actor spawns")
}

fn x_of(scene: &Scene, id: ActorId) -> f32 {
    scene.actor(id).expect("actor exists").base.transform.translation.x
}

// ============================================================================
// Lifecycle
// ============================================================================

#[test]
fn tick_requires_a_running_scene() {
    let mut scene = build(sim_config(), ConfigLibrary::new(), &scene_config(vec![]));

    assert!(matches!(scene.tick(Timestamp(10)), Err(SceneError::NotRunning)));

    scene.start(Timestamp(100)).expect("start");
    assert!(matches!(scene.start(Timestamp(100)), Err(SceneError::AlreadyStarted)));
    assert!(matches!(
        scene.tick(Timestamp(50)),
        Err(SceneError::ClockReversed { .. })
    ));
    assert_eq!(scene.now(), Timestamp(100));
}

#[test]
fn placed_actors_are_spawned_on_start() {
    let mut config = scene_config(vec![entry("origin", 0.0, 0.0)]);
    config.actors.push(PlacedActor {
        config: "crate".to_owned(),
        transform: at(2.0, 3.0),
    });
    let scene = started(ConfigLibrary::new().with("crate", ActorConfig::default()), &config);

    let actors: Vec<_> = scene.actors().collect();
    assert_eq!(actors.len(), 1);
    assert_eq!(actors[0].config().name, "crate");
    assert_eq!(actors[0].base.transform.translation, Vector2::new(2.0, 3.0));
}

#[test]
fn destroyed_actors_stay_queryable_until_the_next_tick() {
    let mut watcher = entry("census", 0.0, 0.0);
    let filter = PopulationFilter {
        configs: vec!["crate".to_owned()],
        tags: Vec::new(),
    };
    watcher.handlers = vec![
        HandlerConfig::new(
            HandlerKind::ActorAdded {
                filter: filter.clone(),
            },
            increment("added"),
        ),
        HandlerConfig::new(HandlerKind::ActorRemoved { filter }, increment("removed")),
    ];
    let library = ConfigLibrary::new()
        .with("crate", ActorConfig::default())
        .with("barrel", ActorConfig::default());
    let mut scene = started(library, &scene_config(vec![watcher]));

    let boxed = spawn(&mut scene, "crate", 1.0, 0.0);
    spawn(&mut scene, "barrel", 3.0, 0.0);
    assert_eq!(variable(&scene, first_entry(), "added"), Value::Number(1.0));

    assert!(scene.destroy_actor(boxed, false).expect("destroy"));
    assert!(!scene.destroy_actor(boxed, false).expect("second destroy"));
    assert_eq!(variable(&scene, first_entry(), "removed"), Value::Number(1.0));
    assert!(scene.contains(EntityKey::Actor(boxed)));

    scene.tick(Timestamp(100)).expect("tick");
    assert!(!scene.contains(EntityKey::Actor(boxed)));
    assert_eq!(scene.actors().count(), 1);
}

// ============================================================================
// Signals
// ============================================================================

#[test]
fn signal_handlers_do_not_reenter_themselves() {
    let mut echo = entry("echo", 0.0, 0.0);
    echo.handlers = vec![HandlerConfig::new(
        HandlerKind::Signal {
            name: "ping".to_owned(),
        },
        ActionConfig::Compound {
            actions: vec![
                increment("count"),
                ActionConfig::Signal {
                    target: TargetConfig::Source,
                    name: "ping".to_owned(),
                },
            ],
            stop_on_failure: false,
        },
    )];
    let mut scene = started(ConfigLibrary::new(), &scene_config(vec![echo]));

    assert!(scene.signal(first_entry(), "ping", None));

    assert_eq!(variable(&scene, first_entry(), "count"), Value::Number(1.0));
}

#[test]
fn signal_edges_fire_on_the_first_signal_and_the_first_silent_tick() {
    let mut horn = entry("horn", 0.0, 0.0);
    let hum = || "hum".to_owned();
    horn.handlers = vec![
        HandlerConfig::new(HandlerKind::SignalStart { name: hum() }, increment("starts")),
        HandlerConfig::new(HandlerKind::SignalStop { name: hum() }, increment("stops")),
    ];
    let mut scene = started(ConfigLibrary::new(), &scene_config(vec![horn]));
    let starts = |scene: &Scene| variable(scene, first_entry(), "starts");
    let stops = |scene: &Scene| variable(scene, first_entry(), "stops");

    scene.signal(first_entry(), "hum", None);
    assert_eq!(starts(&scene), Value::Number(1.0));

    // A signal every tick keeps both edges quiet.
    scene.tick(Timestamp(100)).expect("tick");
    scene.signal(first_entry(), "hum", None);
    scene.tick(Timestamp(200)).expect("tick");
    assert_eq!(starts(&scene), Value::Number(1.0));
    assert_eq!(stops(&scene), Value::Null);

    scene.tick(Timestamp(300)).expect("tick");
    assert_eq!(stops(&scene), Value::Number(1.0));
    scene.tick(Timestamp(400)).expect("tick");
    assert_eq!(stops(&scene), Value::Number(1.0));

    scene.signal(first_entry(), "hum", None);
    assert_eq!(starts(&scene), Value::Number(2.0));
}

// ============================================================================
// Movement
// ============================================================================

#[test]
fn patrol_walks_its_route_without_switching() {
    let mut route_a = entry("route-a", 0.0, 0.0);
    route_a.tags = vec!["route".to_owned()];
    route_a.path = vec![
        Vector2::new(0.0, 0.0),
        Vector2::new(4.0, 0.0),
        Vector2::new(4.0, 4.0),
        Vector2::new(0.0, 4.0),
    ];
    let mut route_b = entry("route-b", 0.0, 0.0);
    route_b.tags = vec!["route".to_owned()];
    route_b.path = vec![
        Vector2::new(0.05, 0.0),
        Vector2::new(4.05, 0.0),
        Vector2::new(8.0, 8.0),
    ];
    let guard = ActorConfig {
        kind: ActorKind::Agent(AgentConfig {
            behavior: BehaviorConfig::Patrol {
                target: TargetConfig::tagged("route"),
                branch_radius: -1.0,
            },
            ..AgentConfig::default()
        }),
        ..ActorConfig::default()
    };
    let mut scene = started(
        ConfigLibrary::new().with("guard", guard),
        &scene_config(vec![route_a, route_b]),
    );
    let id = spawn(&mut scene, "guard", 0.0, 0.0);

    let route = EntityKey::Entry(EntryId(0));
    let mut furthest = 0;
    let mut now = 0;
    while now < 20_000 {
        now += 100;
        scene.tick(Timestamp(now)).expect("tick");
        assert_eq!(scene.behavior_target(id), Some(route));
        let Some(BehaviorLogic::Patrol(patrol)) = scene
            .actor(id)
            .and_then(|actor| actor.agent())
            .and_then(|agent| agent.behavior())
        else {
            panic!("guard should be patrolling");
        };
        assert_eq!(patrol.route(), Some(route));
        furthest = furthest.max(patrol.cursor());
    }
    assert!(furthest >= 2, "guard never got past the first corner");
}

#[test]
fn mobiles_stop_against_solid_tiles() {
    let mut map = TileMap::open(10, 3);
    for y in 0..3 {
        map.set_tile(5, y, CollisionFlags::SOLID);
    }
    let mut scene = Scene::new(
        sim_config(),
        ConfigLibrary::new().with("runner", mobile()),
        &scene_config(vec![]),
        SceneEnv::with_map(Arc::new(map)),
    );
    scene.start(Timestamp::ZERO).expect("start");
    let id = spawn(&mut scene, "runner", 1.5, 1.5);
    scene.steer(id.into(), 0.0);

    run(&mut scene, 5_000, 100);

    let x = x_of(&scene, id);
    assert!(x > 4.3 && x <= 4.51, "runner ended at {x}");
}

#[test]
fn rotating_a_moving_mobile_turns_its_heading() {
    let mut scene = started(
        ConfigLibrary::new().with("runner", mobile()),
        &scene_config(vec![]),
    );
    let id = spawn(&mut scene, "runner", 0.0, 0.0);
    scene.steer(id.into(), 0.0);

    scene
        .rotate_actor(id, std::f32::consts::FRAC_PI_2)
        .expect("rotate");
    let actor = scene.actor(id).expect("runner");
    let heading = actor.mobile().expect("mobile").direction;
    assert!((heading - std::f32::consts::FRAC_PI_2).abs() < 1e-5);
    assert!((actor.base.transform.rotation - heading).abs() < 1e-5);

    run(&mut scene, 1_000, 100);

    let position = scene.actor(id).expect("runner").base.transform.translation;
    assert!(position.x.abs() < 1e-3, "runner drifted along x to {}", position.x);
    assert!((position.y - 2.0).abs() < 1e-3, "runner ended at y={}", position.y);
}

#[test]
fn unobserved_mobiles_enter_stasis_and_skip_the_gap() {
    let config = SimConfig {
        default_stasis_interval: 1_000,
        ..SimConfig::with_seed(7)
    };
    let mut scene = build(
        config,
        ConfigLibrary::new().with("drifter", mobile()),
        &scene_config(vec![]),
    );
    scene.start(Timestamp::ZERO).expect("start");
    let id = spawn(&mut scene, "drifter", 0.0, 0.0);
    scene.steer(id.into(), 0.0);

    scene.tick(Timestamp(500)).expect("tick");
    assert!((x_of(&scene, id) - 1.0).abs() < 1e-4);

    scene.tick(Timestamp(1_100)).expect("tick");
    assert!(scene.actor(id).expect("drifter").in_stasis());
    assert!((x_of(&scene, id) - 1.0).abs() < 1e-4);

    scene.tick(Timestamp(3_000)).expect("tick");
    assert!((x_of(&scene, id) - 1.0).abs() < 1e-4);

    scene.snapshot(id).expect("snapshot");
    assert!(!scene.actor(id).expect("drifter").in_stasis());

    scene.tick(Timestamp(3_500)).expect("tick");
    assert!((x_of(&scene, id) - 2.0).abs() < 1e-4);
}

#[test]
fn warp_falls_back_when_no_ring_is_free() {
    let crate_config = ActorConfig {
        spawn_mask: CollisionFlags::ACTOR,
        ..ActorConfig::default()
    };
    let config = SimConfig {
        placement_rings: 0,
        ..sim_config()
    };
    let mut scene = build(
        config,
        ConfigLibrary::new().with("crate", crate_config),
        &scene_config(vec![]),
    );
    scene.start(Timestamp::ZERO).expect("start");
    spawn(&mut scene, "crate", 5.0, 0.0);
    let mover = spawn(&mut scene, "crate", 0.0, 0.0);

    scene.warp_actor(mover, at(5.0, 0.0)).expect("warp");

    assert_eq!(x_of(&scene, mover), 0.0);
    assert!(scene.actor(mover).expect("mover").flags().contains(ActorFlags::WARP));
}

fn boxed(size: f32, spawn_mask: CollisionFlags) -> ActorConfig {
    ActorConfig {
        shape: ShapeConfig::Rect {
            width: size,
            height: size,
        },
        spawn_mask,
        ..ActorConfig::default()
    }
}

#[test]
fn warp_lands_on_the_first_free_ring_position() {
    let mut scene = started(
        ConfigLibrary::new().with("crate", boxed(1.0, CollisionFlags::ACTOR)),
        &scene_config(vec![]),
    );
    spawn(&mut scene, "crate", 5.0, 0.0);
    let mover = spawn(&mut scene, "crate", 0.0, 0.0);

    scene.warp_actor(mover, at(5.0, 0.0)).expect("warp");

    let actor = scene.actor(mover).expect("mover");
    assert_eq!(actor.base.transform.translation, Vector2::new(4.0, -1.0));
    assert!(actor.flags().contains(ActorFlags::WARP));

    scene.tick(Timestamp(100)).expect("tick");
    assert!(!scene.actor(mover).expect("mover").flags().contains(ActorFlags::WARP));
}

#[test]
fn ring_search_steps_by_the_actor_footprint() {
    let library = ConfigLibrary::new()
        .with("stone", boxed(0.5, CollisionFlags::empty()))
        .with("pebble", boxed(0.5, CollisionFlags::ACTOR));
    let mut scene = started(library, &scene_config(vec![]));
    spawn(&mut scene, "stone", 5.0, 0.0);
    let pebble = spawn(&mut scene, "pebble", 0.0, 0.0);

    scene.warp_actor(pebble, at(5.0, 0.0)).expect("warp");

    let landed = scene.actor(pebble).expect("pebble").base.transform.translation;
    assert_eq!(landed, Vector2::new(4.5, -0.5));
}

/// 12x7 open map with a sealed one-tile room at (9, 3).
fn sealed_room(open_door: bool) -> TileMap {
    let mut map = TileMap::open(12, 7);
    for x in 8..=10 {
        for y in 2..=4 {
            if (x, y) != (9, 3) {
                map.set_tile(x, y, CollisionFlags::SOLID);
            }
        }
    }
    if open_door {
        map.set_tile(8, 3, CollisionFlags::empty());
    }
    map
}

fn warp_into_room(open_door: bool) -> Vector2 {
    let scout = ActorConfig {
        shape: ShapeConfig::Circle { radius: 0.25 },
        spawn_mask: CollisionFlags::SOLID,
        ..ActorConfig::default()
    };
    let mut scene = Scene::new(
        sim_config(),
        ConfigLibrary::new().with("scout", scout),
        &scene_config(vec![]),
        SceneEnv::with_map(Arc::new(sealed_room(open_door))),
    );
    scene.start(Timestamp::ZERO).expect("start");
    let scout = spawn(&mut scene, "scout", 2.5, 3.5);

    scene.warp_actor(scout, at(9.5, 3.5)).expect("warp");
    scene.actor(scout).expect("scout").base.transform.translation
}

#[test]
fn warp_refuses_destinations_unreachable_from_the_old_position() {
    assert_eq!(warp_into_room(false), Vector2::new(2.5, 3.5));
}

#[test]
fn warp_enters_a_room_once_it_has_a_way_in() {
    assert_eq!(warp_into_room(true), Vector2::new(9.5, 3.5));
}

#[test]
fn pawns_replay_input_at_its_sample_time() {
    let pawn = ActorConfig {
        kind: ActorKind::Pawn(MobileConfig::default()),
        ..ActorConfig::default()
    };
    let library = ConfigLibrary::new()
        .with("pawn", pawn)
        .with("crate", ActorConfig::default());
    let mut scene = started(library, &scene_config(vec![]));
    let id = spawn(&mut scene, "pawn", 0.0, 0.0);

    let frame = |timestamp| InputFrame {
        timestamp: Timestamp(timestamp),
        direction: Some(0.0),
        rotation: 0.0,
    };
    assert!(scene.submit_input(id, frame(100)).expect("input"));
    assert!(!scene.submit_input(id, frame(50)).expect("stale input"));

    scene.tick(Timestamp(1_100)).expect("tick");
    assert!((x_of(&scene, id) - 2.0).abs() < 1e-3);

    let other = spawn(&mut scene, "crate", 0.0, 0.0);
    assert!(matches!(
        scene.submit_input(other, frame(1_200)),
        Err(SceneError::NotPawn(_))
    ));
}

// ============================================================================
// Sensors
// ============================================================================

#[test]
fn intersection_start_and_stop_fire_once_per_pass() {
    let mut gate = entry("gate", 5.0, 0.0);
    gate.shape = ShapeConfig::Rect {
        width: 2.0,
        height: 2.0,
    };
    gate.handlers = vec![
        HandlerConfig::new(
            HandlerKind::IntersectionStart {
                sensor: SensorConfig::default(),
            },
            increment("entered"),
        ),
        HandlerConfig::new(
            HandlerKind::IntersectionStop {
                sensor: SensorConfig::default(),
            },
            increment("left"),
        ),
    ];
    let mut scene = started(ConfigLibrary::new().with("runner", mobile()), &scene_config(vec![gate]));
    let id = spawn(&mut scene, "runner", 0.0, 0.0);
    scene.steer(id.into(), 0.0);

    run(&mut scene, 2_500, 100);
    assert_eq!(variable(&scene, first_entry(), "entered"), Value::Number(1.0));
    assert_eq!(variable(&scene, first_entry(), "left"), Value::Null);

    run(&mut scene, 5_000, 100);
    assert_eq!(variable(&scene, first_entry(), "entered"), Value::Number(1.0));
    assert_eq!(variable(&scene, first_entry(), "left"), Value::Number(1.0));
}

#[test]
fn intersection_count_fires_on_each_threshold_crossing() {
    let mut pen = entry("pen", 0.0, 0.0);
    pen.shape = ShapeConfig::Rect {
        width: 4.0,
        height: 4.0,
    };
    pen.handlers = vec![HandlerConfig::new(
        HandlerKind::IntersectionCount {
            sensor: SensorConfig::default(),
            threshold: 2,
            stop_action: Some(Box::new(increment("cleared"))),
        },
        increment("crowded"),
    )];
    let mut scene = started(ConfigLibrary::new().with("crate", ActorConfig::default()), &scene_config(vec![pen]));
    let crowded = |scene: &Scene| variable(scene, first_entry(), "crowded");
    let cleared = |scene: &Scene| variable(scene, first_entry(), "cleared");

    let first = spawn(&mut scene, "crate", -0.5, 0.0);
    spawn(&mut scene, "crate", 10.0, 0.0);
    scene.tick(Timestamp(100)).expect("tick");
    assert_eq!(crowded(&scene), Value::Null);

    let second = spawn(&mut scene, "crate", 0.5, 0.0);
    scene.tick(Timestamp(200)).expect("tick");
    assert_eq!(crowded(&scene), Value::Number(1.0));

    let third = spawn(&mut scene, "crate", 0.0, 1.0);
    scene.tick(Timestamp(300)).expect("tick");
    scene.destroy_actor(third, false).expect("destroy");
    scene.tick(Timestamp(400)).expect("tick");
    assert_eq!(crowded(&scene), Value::Number(1.0));
    assert_eq!(cleared(&scene), Value::Null);

    scene.destroy_actor(second, false).expect("destroy");
    scene.tick(Timestamp(500)).expect("tick");
    assert_eq!(cleared(&scene), Value::Number(1.0));

    scene.destroy_actor(first, false).expect("destroy");
    scene.tick(Timestamp(600)).expect("tick");
    assert_eq!(cleared(&scene), Value::Number(1.0));

    spawn(&mut scene, "crate", -1.0, -1.0);
    spawn(&mut scene, "crate", 1.0, 1.0);
    scene.tick(Timestamp(700)).expect("tick");
    assert_eq!(crowded(&scene), Value::Number(2.0));
}

// ============================================================================
// Replication
// ============================================================================

#[test]
fn replication_reports_deltas_once_per_tick() {
    let mut scene = started(ConfigLibrary::new().with("drifter", mobile()), &scene_config(vec![]));
    let id = spawn(&mut scene, "drifter", 0.0, 0.0);
    let interest = Shape::circle(Vector2::ZERO, 50.0);

    let first = scene.replicate(&interest);
    assert_eq!(first.len(), 1);
    assert_eq!(first[0].snapshot.id, id);
    assert!(first[0].delta.is_none());
    assert_eq!(scene.replicate(&interest), first);

    scene.steer(id.into(), 0.0);
    scene.tick(Timestamp(500)).expect("tick");

    let second = scene.replicate(&interest);
    let delta = second[0].delta.as_ref().expect("actor moved");
    assert!(delta.fields.contains(ActorFields::TRANSLATION));
    let moved = delta.translation.expect("translation");
    assert!((moved.x - 1.0).abs() < 1e-4 && moved.y.abs() < 1e-4);

    let far = Shape::circle(Vector2::new(500.0, 500.0), 1.0);
    assert!(scene.replicate(&far).is_empty());
}

// ============================================================================
// Sessions
// ============================================================================

#[derive(Default)]
struct RecordingSessions {
    moves: Mutex<Vec<(SessionId, String, Option<String>)>>,
    actions: Mutex<Vec<(SessionId, String)>>,
}

impl SessionOracle for RecordingSessions {
    fn move_body(&self, session: SessionId, scene: &str, portal: Option<&str>) {
        self.moves
            .lock()
            .expect("lock")
            .push((session, scene.to_owned(), portal.map(str::to_owned)));
    }

    fn force_client_action(&self, session: SessionId, action: &ClientAction) {
        self.actions
            .lock()
            .expect("lock")
            .push((session, action.name.clone()));
    }
}

#[test]
fn move_all_sends_every_occupant_through_the_session_oracle() {
    let sessions = Arc::new(RecordingSessions::default());
    let pawn = ActorConfig {
        kind: ActorKind::Pawn(MobileConfig::default()),
        ..ActorConfig::default()
    };
    let mut scene = Scene::new(
        sim_config(),
        ConfigLibrary::new().with("pawn", pawn),
        &scene_config(vec![entry("exit", 0.0, 0.0)]),
        SceneEnv::empty().with_sessions(sessions.clone()),
    );
    scene.start(Timestamp::ZERO).expect("start");
    let first = spawn(&mut scene, "pawn", 0.0, 0.0);
    let second = spawn(&mut scene, "pawn", 3.0, 0.0);
    scene.add_occupant(first, SessionId(1)).expect("occupant");
    scene.add_occupant(second, SessionId(2)).expect("occupant");

    assert!(scene.run_action(
        &ActionConfig::MoveAll {
            scene: "cellar".to_owned(),
            portal: Some("stairs".to_owned()),
        },
        first_entry(),
        None,
    ));

    let moves = sessions.moves.lock().expect("lock").clone();
    assert_eq!(
        moves,
        vec![
            (SessionId(1), "cellar".to_owned(), Some("stairs".to_owned())),
            (SessionId(2), "cellar".to_owned(), Some("stairs".to_owned())),
        ]
    );

    scene
        .force_client_action(
            first.into(),
            &ClientAction {
                name: "shake".to_owned(),
                argument: Value::Null,
            },
        )
        .expect("client action");
    assert_eq!(
        sessions.actions.lock().expect("lock").as_slice(),
        &[(SessionId(1), "shake".to_owned())]
    );
}

// ============================================================================
// Transfer
// ============================================================================

fn beacon_library() -> ConfigLibrary {
    let beacon = ActorConfig {
        flags: vec!["lit".to_owned()],
        handlers: vec![HandlerConfig::new(
            HandlerKind::Timer {
                interval: 1_000,
                offset: 0,
                limit: 0,
                warning: None,
            },
            increment("pulses"),
        )],
        ..ActorConfig::default()
    };
    ConfigLibrary::new().with("beacon", beacon)
}

#[test]
fn transfer_carries_actor_state_and_pending_timers() {
    let config = scene_config(vec![entry("origin", 0.0, 0.0)]);
    let mut source = started(beacon_library(), &config);
    let beacon = spawn(&mut source, "beacon", 2.0, 2.0);
    source.set_flag(beacon, "lit", true).expect("flag");
    run(&mut source, 1_500, 100);
    assert_eq!(variable(&source, beacon, "pulses"), Value::Number(1.0));

    let mut destination = build(sim_config(), beacon_library(), &config);
    let refs = destination.transfer_from(&source).expect("transfer");

    let mapped = refs.map_actor(beacon).expect("beacon mapped");
    let actor = destination.actor(mapped).expect("mirrored beacon");
    assert_eq!(actor.flag("lit"), Some(true));
    assert_eq!(actor.base.transform.translation, Vector2::new(2.0, 2.0));
    assert_eq!(variable(&destination, mapped, "pulses"), Value::Number(1.0));
    assert_eq!(destination.now(), Timestamp(1_500));

    destination.tick(Timestamp(2_000)).expect("tick");
    assert_eq!(variable(&destination, mapped, "pulses"), Value::Number(2.0));
}

#[test]
fn transfer_rearms_delayed_actions_started_outside_handlers() {
    let config = scene_config(vec![entry("origin", 0.0, 0.0)]);
    let mut source = started(ConfigLibrary::new(), &config);
    run(&mut source, 200, 100);
    assert!(source.run_action(
        &ActionConfig::delayed(increment("late"), 1_000, 0),
        first_entry(),
        None,
    ));
    run(&mut source, 600, 100);
    assert_eq!(source.pending_intervals(), 1);

    let mut destination = build(sim_config(), ConfigLibrary::new(), &config);
    destination.transfer_from(&source).expect("transfer");
    assert_eq!(destination.pending_intervals(), 1);

    run(&mut destination, 1_100, 100);
    assert_eq!(variable(&destination, first_entry(), "late"), Value::Null);

    run(&mut destination, 1_200, 100);
    assert_eq!(variable(&destination, first_entry(), "late"), Value::Number(1.0));
    assert_eq!(destination.pending_intervals(), 0);

    // Script ids keep counting from the source so new runs never collide.
    assert!(destination.run_action(
        &ActionConfig::delayed(increment("late"), 100, 0),
        first_entry(),
        None,
    ));
    run(&mut destination, 1_300, 100);
    assert_eq!(variable(&destination, first_entry(), "late"), Value::Number(2.0));
}

#[test]
fn transfer_rejects_other_maps_and_started_scenes() {
    let config = scene_config(vec![]);
    let source = started(beacon_library(), &config);

    let mut other = build(
        sim_config(),
        beacon_library(),
        &sim_core::SceneConfig {
            name: format!("{SCENE}-annex"),
            ..config.clone()
        },
    );
    assert!(matches!(
        other.transfer_from(&source),
        Err(SceneError::SceneMismatch { .. })
    ));

    let mut running = started(beacon_library(), &config);
    assert!(matches!(
        running.transfer_from(&source),
        Err(SceneError::AlreadyStarted)
    ));
}
