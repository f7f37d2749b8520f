mod common;

use std::sync::Arc;

use common::{entry, first_entry, increment, mark, run, scene_config, sim_config, started, variable};
use sim_core::schema::{ExpressionCase, SwitchCase, WeightedAction};
use sim_core::{
    ActionConfig, ActorConfig, CollisionFlags, ConditionConfig, ConfigLibrary, EntityKey,
    ExpressionConfig, IntervalId, Scene, SceneEnv, TargetConfig, TileMap, Timestamp, Value, Vector2,
};

fn library() -> ConfigLibrary {
    ConfigLibrary::new().with("crate", ActorConfig::default())
}

// ============================================================================
// Spawning
// ============================================================================

#[test]
fn spawn_at_source_places_one_actor_on_the_source() {
    let mut scene = started(library(), &scene_config(vec![entry("origin", 3.0, 4.0)]));

    let spawned = scene.run_action(
        &ActionConfig::spawn("crate", TargetConfig::Source),
        first_entry(),
        None,
    );

    assert!(spawned);
    let actors: Vec<_> = scene.actors().collect();
    assert_eq!(actors.len(), 1);
    assert_eq!(actors[0].base.transform.translation, Vector2::new(3.0, 4.0));
    assert_eq!(actors[0].source(), Some(first_entry()));
}

#[test]
fn spawn_of_unknown_config_fails() {
    let mut scene = started(library(), &scene_config(vec![entry("origin", 0.0, 0.0)]));

    let spawned = scene.run_action(
        &ActionConfig::spawn("ghost", TargetConfig::Source),
        first_entry(),
        None,
    );

    assert!(!spawned);
    assert_eq!(scene.actors().count(), 0);
}

fn scatter(count: u32, range: i32, collision_mask: CollisionFlags) -> ActionConfig {
    ActionConfig::SpawnRandomTranslatedActor {
        actor: "crate".to_owned(),
        location: TargetConfig::Source,
        count,
        step: 1.0,
        range,
        collision_mask,
    }
}

#[test]
fn scatter_never_reuses_an_offset() {
    let mut scene = started(library(), &scene_config(vec![entry("origin", 2.0, 2.0)]));

    assert!(scene.run_action(&scatter(3, 0, CollisionFlags::empty()), first_entry(), None));

    let actors: Vec<_> = scene.actors().collect();
    assert_eq!(actors.len(), 1);
    assert_eq!(actors[0].base.transform.translation, Vector2::new(2.0, 2.0));
}

#[test]
fn scatter_rejects_offsets_behind_walls() {
    // Open 5x5 map whose centre tile is boxed in on all sides.
    let mut map = TileMap::open(5, 5);
    for x in 1..=3 {
        for y in 1..=3 {
            if (x, y) != (2, 2) {
                map.set_tile(x, y, CollisionFlags::SOLID);
            }
        }
    }
    let mut scene = Scene::new(
        sim_config(),
        library(),
        &scene_config(vec![entry("origin", 2.5, 2.5)]),
        SceneEnv::with_map(Arc::new(map)),
    );
    scene.start(Timestamp::ZERO).expect("start");

    let spawned = scene.run_action(&scatter(9, 1, CollisionFlags::SOLID), first_entry(), None);

    let actors: Vec<_> = scene.actors().collect();
    assert!(actors.len() <= 1);
    assert_eq!(spawned, actors.len() == 1);
    for actor in actors {
        assert_eq!(actor.base.transform.translation, Vector2::new(2.5, 2.5));
    }
}

// ============================================================================
// Control flow
// ============================================================================

#[test]
fn switch_runs_only_the_first_matching_case() {
    let mut scene = started(library(), &scene_config(vec![entry("origin", 0.0, 0.0)]));
    let action = ActionConfig::Switch {
        cases: vec![
            SwitchCase {
                condition: ConditionConfig::not(ConditionConfig::Always),
                action: mark("x"),
            },
            SwitchCase {
                condition: ConditionConfig::Always,
                action: mark("y"),
            },
        ],
        default: Some(Box::new(mark("z"))),
    };

    assert!(scene.run_action(&action, first_entry(), None));

    assert_eq!(variable(&scene, first_entry(), "x"), Value::Null);
    assert_eq!(variable(&scene, first_entry(), "y"), Value::Bool(true));
    assert_eq!(variable(&scene, first_entry(), "z"), Value::Null);
}

#[test]
fn compound_stops_after_the_first_failure() {
    let mut scene = started(library(), &scene_config(vec![entry("origin", 0.0, 0.0)]));
    let action = ActionConfig::Compound {
        actions: vec![mark("a"), ActionConfig::fail(mark("b")), mark("c")],
        stop_on_failure: true,
    };

    // The first action succeeded, so the accumulated result is true.
    assert!(scene.run_action(&action, first_entry(), None));

    assert_eq!(variable(&scene, first_entry(), "a"), Value::Bool(true));
    assert_eq!(variable(&scene, first_entry(), "b"), Value::Bool(true));
    assert_eq!(variable(&scene, first_entry(), "c"), Value::Null);
}

#[test]
fn compound_without_stop_runs_everything() {
    let mut scene = started(library(), &scene_config(vec![entry("origin", 0.0, 0.0)]));
    let action = ActionConfig::Compound {
        actions: vec![ActionConfig::fail(mark("a")), mark("b")],
        stop_on_failure: false,
    };

    assert!(scene.run_action(&action, first_entry(), None));
    assert_eq!(variable(&scene, first_entry(), "b"), Value::Bool(true));
}

#[test]
fn expression_switch_does_not_coerce_null_to_a_string() {
    let mut scene = started(library(), &scene_config(vec![entry("origin", 0.0, 0.0)]));
    let action = ActionConfig::ExpressionSwitch {
        expression: ExpressionConfig::reference("hp"),
        cases: vec![ExpressionCase {
            value: Value::from("10"),
            action: mark("matched"),
        }],
        default: None,
    };

    assert!(!scene.run_action(&action, first_entry(), None));
    assert_eq!(variable(&scene, first_entry(), "matched"), Value::Null);
}

#[test]
fn expression_switch_matches_equal_values() {
    let mut scene = started(library(), &scene_config(vec![entry("origin", 0.0, 0.0)]));
    scene.set_variable(first_entry(), "hp", Value::from(10), None);
    let action = ActionConfig::ExpressionSwitch {
        expression: ExpressionConfig::reference("hp"),
        cases: vec![
            ExpressionCase {
                value: Value::from("10"),
                action: mark("string"),
            },
            ExpressionCase {
                value: Value::Number(10.0),
                action: mark("number"),
            },
        ],
        default: None,
    };

    assert!(scene.run_action(&action, first_entry(), None));
    assert_eq!(variable(&scene, first_entry(), "string"), Value::Null);
    assert_eq!(variable(&scene, first_entry(), "number"), Value::Bool(true));
}

#[test]
fn conditional_falls_through_to_otherwise() {
    let mut scene = started(library(), &scene_config(vec![entry("origin", 0.0, 0.0)]));
    let action = ActionConfig::Conditional {
        condition: ConditionConfig::not(ConditionConfig::Always),
        action: Box::new(mark("then")),
        otherwise: Some(Box::new(mark("else"))),
    };

    assert!(scene.run_action(&action, first_entry(), None));
    assert_eq!(variable(&scene, first_entry(), "then"), Value::Null);
    assert_eq!(variable(&scene, first_entry(), "else"), Value::Bool(true));
}

#[test]
fn fire_effect_succeeds_without_locations() {
    let mut scene = started(library(), &scene_config(vec![entry("origin", 1.0, 1.0)]));

    let fired = scene.run_action(
        &ActionConfig::FireEffect {
            effect: "sparkle".to_owned(),
            location: TargetConfig::tagged("nowhere"),
        },
        first_entry(),
        None,
    );

    assert!(fired);
    assert!(scene.drain_effects().is_empty());

    scene.run_action(
        &ActionConfig::FireEffect {
            effect: "sparkle".to_owned(),
            location: TargetConfig::Source,
        },
        first_entry(),
        None,
    );
    let effects = scene.drain_effects();
    assert_eq!(effects.len(), 1);
    assert_eq!(effects[0].name, "sparkle");
    assert_eq!(effects[0].transform.translation, Vector2::new(1.0, 1.0));
}

fn weighted(weight: f32, action: ActionConfig) -> WeightedAction {
    WeightedAction { weight, action }
}

#[test]
fn random_picks_in_proportion_to_weight() {
    let mut scene = started(library(), &scene_config(vec![entry("origin", 0.0, 0.0)]));
    let action = ActionConfig::Random {
        actions: vec![
            weighted(0.0, mark("never")),
            weighted(3.0, increment("heavy")),
            weighted(1.0, increment("light")),
        ],
    };

    for _ in 0..400 {
        assert!(scene.run_action(&action, first_entry(), None));
    }

    let count = |name: &str| match variable(&scene, first_entry(), name) {
        Value::Number(n) => n,
        other => panic!("{name} is {other:?}"),
    };
    assert_eq!(variable(&scene, first_entry(), "never"), Value::Null);
    assert_eq!(count("heavy") + count("light"), 400.0);
    assert!(count("heavy") > count("light"));
    assert!(count("light") > 0.0);
}

#[test]
fn random_without_positive_weight_succeeds_doing_nothing() {
    let mut scene = started(library(), &scene_config(vec![entry("origin", 0.0, 0.0)]));
    let action = ActionConfig::Random {
        actions: vec![weighted(0.0, mark("zero")), weighted(-1.0, mark("negative"))],
    };

    assert!(scene.run_action(&action, first_entry(), None));
    assert!(scene.run_action(&ActionConfig::Random { actions: vec![] }, first_entry(), None));

    assert_eq!(variable(&scene, first_entry(), "zero"), Value::Null);
    assert_eq!(variable(&scene, first_entry(), "negative"), Value::Null);
}

#[test]
fn random_ignores_unbounded_weights() {
    let mut scene = started(library(), &scene_config(vec![entry("origin", 0.0, 0.0)]));
    let infinite = ActionConfig::Random {
        actions: vec![weighted(f32::INFINITY, mark("infinite")), weighted(1.0, mark("finite"))],
    };
    let nan = ActionConfig::Random {
        actions: vec![weighted(f32::NAN, mark("nan")), weighted(1.0, mark("sane"))],
    };

    assert!(scene.run_action(&infinite, first_entry(), None));
    assert_eq!(variable(&scene, first_entry(), "infinite"), Value::Null);
    assert_eq!(variable(&scene, first_entry(), "finite"), Value::Null);

    assert!(scene.run_action(&nan, first_entry(), None));
    assert_eq!(variable(&scene, first_entry(), "nan"), Value::Null);
    assert_eq!(variable(&scene, first_entry(), "sane"), Value::Bool(true));
}

// ============================================================================
// Delayed execution
// ============================================================================

#[test]
fn delayed_action_fires_once_the_clock_reaches_it() {
    let mut scene = started(library(), &scene_config(vec![entry("origin", 0.0, 0.0)]));

    assert!(scene.run_action(
        &ActionConfig::delayed(increment("count"), 500, 0),
        first_entry(),
        None,
    ));
    assert_eq!(scene.pending_intervals(), 1);

    scene.tick(Timestamp(400)).expect("tick");
    assert_eq!(variable(&scene, first_entry(), "count"), Value::Null);

    scene.tick(Timestamp(500)).expect("tick");
    assert_eq!(variable(&scene, first_entry(), "count"), Value::Number(1.0));
    assert_eq!(scene.pending_intervals(), 0);

    run(&mut scene, 2_000, 100);
    assert_eq!(variable(&scene, first_entry(), "count"), Value::Number(1.0));
}

#[test]
fn delayed_variance_stays_in_bounds_and_never_fires_in_the_past() {
    let mut scene = started(library(), &scene_config(vec![entry("origin", 0.0, 0.0)]));
    run(&mut scene, 1_000, 500);

    for _ in 0..40 {
        scene.run_action(&ActionConfig::delayed(increment("count"), 100, 500), first_entry(), None);
    }
    for _ in 0..40 {
        scene.run_action(&ActionConfig::delayed(increment("count"), 1_000, 200), first_entry(), None);
    }
    assert_eq!(scene.pending_intervals(), 80);

    let fire_at = |id| scene.interval_fire_at(IntervalId(id)).expect("pending").0;
    let clamped: Vec<i64> = (0..40).map(fire_at).collect();
    let spread: Vec<i64> = (40..80).map(fire_at).collect();
    assert!(clamped.iter().all(|at| (1_000..=1_600).contains(at)));
    assert!(clamped.contains(&1_000));
    assert!(spread.iter().all(|at| (1_800..=2_200).contains(at)));
    assert!(spread.iter().any(|at| *at != spread[0]));

    run(&mut scene, 2_200, 50);
    assert_eq!(variable(&scene, first_entry(), "count"), Value::Number(80.0));
    assert_eq!(scene.pending_intervals(), 0);
}

#[test]
fn delayed_action_is_dropped_when_the_scene_shuts_down() {
    let mut scene = started(library(), &scene_config(vec![entry("origin", 0.0, 0.0)]));
    scene.run_action(
        &ActionConfig::delayed(mark("late"), 1_000, 0),
        first_entry(),
        None,
    );

    scene.shutdown(Timestamp(100));

    assert_eq!(scene.pending_intervals(), 0);
    assert!(scene.tick(Timestamp(2_000)).is_err());
    assert_eq!(variable(&scene, first_entry(), "late"), Value::Null);
    assert!(!scene.run_action(
        &ActionConfig::delayed(mark("later"), 10, 0),
        first_entry(),
        None,
    ));
}

// ============================================================================
// Targeting
// ============================================================================

#[test]
fn targeted_runs_once_per_target_with_it_as_activator() {
    let mut first = entry("lamp", 0.0, 0.0);
    first.tags = vec!["lamp".to_owned()];
    let mut second = entry("lamp", 2.0, 0.0);
    second.tags = vec!["lamp".to_owned()];
    let mut scene = started(library(), &scene_config(vec![entry("switch", 0.0, 0.0), first, second]));

    let action = ActionConfig::Targeted {
        target: TargetConfig::tagged("lamp"),
        action: Box::new(ActionConfig::SetVariable {
            target: TargetConfig::Activator,
            name: "lit".to_owned(),
            value: ExpressionConfig::constant(true),
        }),
    };
    assert!(scene.run_action(&action, first_entry(), None));

    for key in scene.tagged("lamp") {
        assert_eq!(variable(&scene, key, "lit"), Value::Bool(true));
    }
    assert_eq!(variable(&scene, first_entry(), "lit"), Value::Null);
    assert!(matches!(scene.tagged("lamp")[0], EntityKey::Entry(_)));
}
