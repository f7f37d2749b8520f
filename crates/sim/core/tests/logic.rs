mod common;

use std::collections::BTreeSet;
use std::sync::Arc;

use chrono::{TimeZone, Utc};
use common::{entry, first_entry, increment, run, scene_config, sim_config, started, variable};
use sim_core::logic::{ConditionLogic, ScriptId, TargetLogic};
use sim_core::schema::{LogicClass, RegionConfig, TimerWarning};
use sim_core::{
    ActorConfig, ActorId, ConditionConfig, ConfigLibrary, EntityKey, ExpressionConfig, FixedClock,
    HandlerConfig, HandlerKind, LogicContext, LogicOwner, Scene, SceneEnv, Shape, SpawnOrigin,
    TargetConfig, Timestamp, Transform, Value, Vector2,
};

fn library() -> ConfigLibrary {
    ConfigLibrary::new()
        .with(
            "guard",
            ActorConfig {
                tags: vec!["guard".to_owned()],
                flags: vec!["lit".to_owned()],
                ..ActorConfig::default()
            },
        )
        .with("crate", ActorConfig::default())
}

struct Yard {
    scene: Scene,
    near: ActorId,
    far: ActorId,
    crate_id: ActorId,
}

/// Guards at x = 1 and x = 5, a crate at x = 10, one entry at the origin.
fn yard() -> Yard {
    let mut scene = started(library(), &scene_config(vec![entry("origin", 0.0, 0.0)]));
    let mut spawn = |config: &str, x: f32| {
        scene
            .spawn_actor(config, Transform::new(Vector2::new(x, 0.0), 0.0), SpawnOrigin::default())
            .expect("actor spawns")
    };
    let near = spawn("guard", 1.0);
    let far = spawn("guard", 5.0);
    let crate_id = spawn("crate", 10.0);
    Yard {
        scene,
        near,
        far,
        crate_id,
    }
}

fn owner() -> LogicOwner {
    LogicOwner::Script(ScriptId(0))
}

fn check(scene: &mut Scene, config: &ConditionConfig, activator: Option<EntityKey>) -> bool {
    let mut logic = ConditionLogic::new(config);
    let mut ctx = LogicContext::new(scene, first_entry(), owner());
    logic.is_satisfied(&mut ctx, activator)
}

fn resolve(scene: &mut Scene, config: &TargetConfig, activator: Option<EntityKey>) -> Vec<EntityKey> {
    let mut logic = TargetLogic::new(config);
    let mut ctx = LogicContext::new(scene, first_entry(), owner());
    logic.resolve_all(&mut ctx, activator)
}

fn set(keys: &[EntityKey]) -> BTreeSet<EntityKey> {
    keys.iter().copied().collect()
}

// ============================================================================
// Conditions
// ============================================================================

#[test]
fn tagged_quantifies_over_resolved_targets() {
    let mut yard = yard();
    let tagged = |target: TargetConfig, all: bool| ConditionConfig::Tagged {
        target,
        tag: "guard".to_owned(),
        all,
    };

    assert!(check(&mut yard.scene, &tagged(TargetConfig::tagged("guard"), true), None));
    let actors = TargetConfig::InstanceOf(LogicClass::Actor);
    assert!(check(&mut yard.scene, &tagged(actors.clone(), false), None));
    assert!(!check(&mut yard.scene, &tagged(actors, true), None));
    assert!(!check(&mut yard.scene, &tagged(TargetConfig::Activator, false), None));
}

#[test]
fn distance_within_compares_translations() {
    let mut yard = yard();
    let within = |all_second: bool| ConditionConfig::DistanceWithin {
        first: TargetConfig::Source,
        second: TargetConfig::tagged("guard"),
        minimum: 0.0,
        maximum: 2.0,
        all_first: false,
        all_second,
    };

    assert!(check(&mut yard.scene, &within(false), None));
    assert!(!check(&mut yard.scene, &within(true), None));
}

#[test]
fn limit_is_spent_by_each_success() {
    let mut yard = yard();
    let mut limit = ConditionLogic::new(&ConditionConfig::Limit { limit: 2 });
    let mut ctx = LogicContext::new(&mut yard.scene, first_entry(), owner());

    assert!(limit.is_satisfied(&mut ctx, None));
    assert!(limit.is_satisfied(&mut ctx, None));
    assert!(!limit.is_satisfied(&mut ctx, None));
}

#[test]
fn cooldown_blocks_until_the_period_has_passed() {
    let mut yard = yard();
    let mut cooldown = ConditionLogic::new(&ConditionConfig::Cooldown { period: 100 });

    let mut ctx = LogicContext::new(&mut yard.scene, first_entry(), owner());
    assert!(cooldown.is_satisfied(&mut ctx, None));
    assert!(!cooldown.is_satisfied(&mut ctx, None));

    yard.scene.tick(Timestamp(100)).expect("tick");
    let mut ctx = LogicContext::new(&mut yard.scene, first_entry(), owner());
    assert!(!cooldown.is_satisfied(&mut ctx, None));

    yard.scene.tick(Timestamp(101)).expect("tick");
    let mut ctx = LogicContext::new(&mut yard.scene, first_entry(), owner());
    assert!(cooldown.is_satisfied(&mut ctx, None));
}

#[test]
fn is_matches_identity() {
    let mut yard = yard();
    let is_guard = ConditionConfig::Is {
        first: TargetConfig::Activator,
        second: TargetConfig::tagged("guard"),
        all: false,
    };

    assert!(check(&mut yard.scene, &is_guard, Some(yard.far.into())));
    assert!(!check(&mut yard.scene, &is_guard, Some(yard.crate_id.into())));
    assert!(!check(&mut yard.scene, &is_guard, None));
}

#[test]
fn flag_set_reads_custom_flags() {
    let mut yard = yard();
    let lit = ConditionConfig::FlagSet {
        target: TargetConfig::Activator,
        flag: "lit".to_owned(),
        all: false,
    };

    assert!(!check(&mut yard.scene, &lit, Some(yard.near.into())));
    yard.scene.set_flag(yard.near, "lit", true).expect("flag exists");
    assert!(check(&mut yard.scene, &lit, Some(yard.near.into())));
    assert!(!check(&mut yard.scene, &lit, Some(yard.crate_id.into())));
}

#[test]
fn intersecting_tests_resolved_regions() {
    let mut yard = yard();
    let guards = RegionConfig::Default {
        location: TargetConfig::tagged("guard"),
        expansion: 0.0,
    };
    let window = |x: f32| ConditionConfig::Intersecting {
        first: RegionConfig::Fixed(Shape::circle(Vector2::new(x, 0.0), 0.1)),
        second: guards.clone(),
        all_first: false,
        all_second: false,
    };

    assert!(check(&mut yard.scene, &window(5.0), None));
    assert!(!check(&mut yard.scene, &window(3.0), None));
}

#[test]
fn combinators_and_expressions() {
    let mut yard = yard();
    let never = ConditionConfig::not(ConditionConfig::Always);

    assert!(check(
        &mut yard.scene,
        &ConditionConfig::Any(vec![never.clone(), ConditionConfig::Always]),
        None
    ));
    assert!(!check(
        &mut yard.scene,
        &ConditionConfig::All(vec![never, ConditionConfig::Always]),
        None
    ));
    assert!(check(&mut yard.scene, &ConditionConfig::All(Vec::new()), None));
    assert!(check(
        &mut yard.scene,
        &ConditionConfig::evaluate(ExpressionConfig::constant(true)),
        None
    ));
    assert!(check(
        &mut yard.scene,
        &ConditionConfig::InstanceOf {
            target: TargetConfig::Source,
            class: LogicClass::Entry,
            all: true,
        },
        None
    ));
}

#[test]
fn date_range_reads_the_wall_clock() {
    let noon = Utc.with_ymd_and_hms(2026, 6, 1, 12, 0, 0).unwrap();
    let range = |start_hour: u32, end_hour: u32| ConditionConfig::DateRange {
        start: Some(Utc.with_ymd_and_hms(2026, 6, 1, start_hour, 0, 0).unwrap()),
        end: Some(Utc.with_ymd_and_hms(2026, 6, 1, end_hour, 0, 0).unwrap()),
    };

    let mut scene = Scene::new(
        sim_config(),
        library(),
        &scene_config(vec![entry("origin", 0.0, 0.0)]),
        SceneEnv::empty().with_clock(Arc::new(FixedClock(noon))),
    );
    scene.start(Timestamp::ZERO).expect("start");
    assert!(check(&mut scene, &range(9, 17), None));
    assert!(!check(&mut scene, &range(13, 17), None));

    let mut unclocked = yard();
    assert!(!check(&mut unclocked.scene, &range(9, 17), None));
}

// ============================================================================
// Targets
// ============================================================================

#[test]
fn nearest_and_farthest_subsets_measure_from_the_location() {
    let mut yard = yard();
    let subset = |nearest: bool| {
        let target = Box::new(TargetConfig::tagged("guard"));
        let location = Box::new(TargetConfig::Source);
        if nearest {
            TargetConfig::NearestSubset {
                target,
                location,
                size: 1,
            }
        } else {
            TargetConfig::FarthestSubset {
                target,
                location,
                size: 1,
            }
        }
    };

    assert_eq!(resolve(&mut yard.scene, &subset(true), None), vec![yard.near.into()]);
    assert_eq!(resolve(&mut yard.scene, &subset(false), None), vec![yard.far.into()]);
}

#[test]
fn random_subset_picks_from_the_candidates() {
    let mut yard = yard();
    let config = TargetConfig::RandomSubset {
        target: Box::new(TargetConfig::InstanceOf(LogicClass::Actor)),
        size: 2,
    };

    let picked = resolve(&mut yard.scene, &config, None);
    assert_eq!(picked.len(), 2);
    let all = set(&[yard.near.into(), yard.far.into(), yard.crate_id.into()]);
    assert!(set(&picked).is_subset(&all));
    assert_eq!(set(&picked).len(), 2);
}

#[test]
fn excluding_and_conditional_filter_candidates() {
    let mut yard = yard();
    let excluding = TargetConfig::Excluding {
        target: Box::new(TargetConfig::tagged("guard")),
        excluded: Box::new(TargetConfig::Activator),
    };
    assert_eq!(
        resolve(&mut yard.scene, &excluding, Some(yard.near.into())),
        vec![yard.far.into()]
    );

    let conditional = TargetConfig::Conditional {
        target: Box::new(TargetConfig::InstanceOf(LogicClass::Actor)),
        condition: Box::new(ConditionConfig::Tagged {
            target: TargetConfig::Source,
            tag: "guard".to_owned(),
            all: true,
        }),
    };
    assert_eq!(
        set(&resolve(&mut yard.scene, &conditional, None)),
        set(&[yard.near.into(), yard.far.into()])
    );
}

#[test]
fn intersecting_target_collects_actors_in_the_region() {
    let mut yard = yard();
    let config = TargetConfig::Intersecting {
        region: Box::new(RegionConfig::Fixed(Shape::circle(Vector2::new(5.0, 0.0), 1.0))),
        actors: true,
        entries: false,
    };
    assert_eq!(resolve(&mut yard.scene, &config, None), vec![yard.far.into()]);
}

#[test]
fn activator_of_follows_spawn_attribution() {
    let mut yard = yard();
    let spawned = yard
        .scene
        .spawn_actor(
            "crate",
            Transform::new(Vector2::new(7.0, 0.0), 0.0),
            SpawnOrigin {
                source: Some(first_entry()),
                activator: Some(yard.near.into()),
            },
        )
        .expect("spawn");

    let config = TargetConfig::ActivatorOf(Box::new(TargetConfig::Activator));
    assert_eq!(
        resolve(&mut yard.scene, &config, Some(spawned.into())),
        vec![yard.near.into()]
    );

    yard.scene.destroy_actor(yard.near, false).expect("destroy");
    yard.scene.tick(Timestamp(100)).expect("tick");
    assert!(resolve(&mut yard.scene, &config, Some(spawned.into())).is_empty());
}

// ============================================================================
// Timers
// ============================================================================

#[test]
fn timers_warn_ahead_of_each_limited_expiry() {
    let mut clock = entry("clock", 0.0, 0.0);
    clock.handlers = vec![HandlerConfig::new(
        HandlerKind::Timer {
            interval: 100,
            offset: 50,
            limit: 3,
            warning: Some(Box::new(TimerWarning {
                lead: 30,
                action: increment("warned"),
            })),
        },
        increment("fired"),
    )];
    let mut scene = started(ConfigLibrary::new(), &scene_config(vec![clock]));

    run(&mut scene, 140, 10);
    assert_eq!(variable(&scene, first_entry(), "warned"), Value::Number(1.0));
    assert_eq!(variable(&scene, first_entry(), "fired"), Value::Null);

    run(&mut scene, 150, 10);
    assert_eq!(variable(&scene, first_entry(), "fired"), Value::Number(1.0));

    run(&mut scene, 1_000, 50);
    assert_eq!(variable(&scene, first_entry(), "fired"), Value::Number(3.0));
    assert_eq!(variable(&scene, first_entry(), "warned"), Value::Number(3.0));
    assert_eq!(scene.pending_intervals(), 0);
}
