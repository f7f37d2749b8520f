#![allow(dead_code)]

use sim_core::schema::{BinaryOp, ExpressionConfig};
use sim_core::{
    ActionConfig, ConfigLibrary, EntityKey, EntryConfig, EntryId, Scene, SceneConfig, SceneEnv,
    SimConfig, Timestamp, Transform, Value, Vector2,
};

pub const SCENE: &str = "courtyard";

/// Deterministic config with stasis disabled so unobserved actors keep ticking.
pub fn sim_config() -> SimConfig {
    SimConfig {
        default_stasis_interval: 0,
        ..SimConfig::with_seed(7)
    }
}

pub fn entry(name: &str, x: f32, y: f32) -> EntryConfig {
    EntryConfig {
        name: name.to_owned(),
        transform: Transform::new(Vector2::new(x, y), 0.0),
        ..EntryConfig::default()
    }
}

pub fn scene_config(entries: Vec<EntryConfig>) -> SceneConfig {
    SceneConfig {
        name: SCENE.to_owned(),
        entries,
        actors: Vec::new(),
    }
}

pub fn build(config: SimConfig, library: ConfigLibrary, scene: &SceneConfig) -> Scene {
    Scene::new(config, library, scene, SceneEnv::empty())
}

/// Builds and starts a scene at time zero.
pub fn started(library: ConfigLibrary, scene: &SceneConfig) -> Scene {
    let mut scene = build(sim_config(), library, scene);
    scene.start(Timestamp::ZERO).expect("scene starts");
    scene
}

/// Ticks from the current time to `until` in `step` millisecond increments.
pub fn run(scene: &mut Scene, until: i64, step: i64) {
    let mut now = scene.now().0;
    while now < until {
        now = (now + step).min(until);
        scene.tick(Timestamp(now)).expect("tick succeeds");
    }
}

pub fn variable(scene: &Scene, key: impl Into<EntityKey>, name: &str) -> Value {
    scene
        .logic(key.into())
        .map(|logic| logic.variable(name))
        .unwrap_or_default()
}

pub fn first_entry() -> EntityKey {
    EntityKey::Entry(EntryId(0))
}

/// `name = previous + 1` on the source.
pub fn increment(name: &str) -> ActionConfig {
    ActionConfig::set_variable(
        name,
        ExpressionConfig::binary(
            BinaryOp::Add,
            ExpressionConfig::Previous,
            ExpressionConfig::constant(1),
        ),
    )
}

/// `name = true` on the source.
pub fn mark(name: &str) -> ActionConfig {
    ActionConfig::set_variable(name, ExpressionConfig::constant(true))
}
