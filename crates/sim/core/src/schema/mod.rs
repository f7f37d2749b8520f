//! Declarative configuration trees consumed by the logic engines.
//!
//! Every family (actions, conditions, targets, regions, expressions,
//! handlers, behaviors) is a closed sum type. The trees are immutable and
//! shared; runtime state lives in the instances built from them under
//! [`crate::logic`]. Optional children are `Option`s so nullability survives
//! serialization.
mod action;
mod behavior;
mod condition;
mod expression;
mod handler;
mod target;

use std::collections::BTreeMap;
use std::sync::Arc;

pub use action::{ActionConfig, ExpressionCase, LogLevel, SwitchCase, WeightedAction};
pub use behavior::{BehaviorConfig, StepConfig, TurnPolicy, WanderConfig, WeightedBehavior};
pub use condition::{ConditionConfig, LogicClass};
pub use expression::{BinaryOp, ExpressionConfig, UnaryOp};
pub use handler::{HandlerConfig, HandlerKind, PopulationFilter, SensorConfig, TimerWarning};
pub use target::{RegionConfig, ShapeConfig, TargetConfig};

use crate::geom::{Transform, Vector2};
use crate::state::{CollisionFlags, Value};

/// Movement parameters shared by every mobile actor kind.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct MobileConfig {
    /// Units per second.
    pub speed: f32,
    /// Overrides the scene's default stasis interval; 0 disables stasis.
    pub stasis_interval: Option<i64>,
    /// Advancer integration step in milliseconds.
    pub sub_step: i64,
}

impl Default for MobileConfig {
    fn default() -> Self {
        Self {
            speed: 2.0,
            stasis_interval: None,
            sub_step: 50,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct AgentConfig {
    pub mobile: MobileConfig,
    /// Radians per second; 0 turns instantly.
    pub turn_rate: f32,
    pub behavior: BehaviorConfig,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            mobile: MobileConfig::default(),
            turn_rate: 0.0,
            behavior: BehaviorConfig::Idle,
        }
    }
}

/// Simulation role of an actor.
#[derive(Clone, Debug, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ActorKind {
    /// Never moves on its own.
    #[default]
    Static,
    Mobile(MobileConfig),
    /// Autonomous mobile driven by a behavior.
    Agent(AgentConfig),
    /// Mobile driven by a client's input frames.
    Pawn(MobileConfig),
}

/// Resolved configuration of one actor type.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct ActorConfig {
    /// Library key; assigned by [`ConfigLibrary::insert`].
    pub name: String,
    pub kind: ActorKind,
    /// Local shape centered on the actor's transform.
    pub shape: ShapeConfig,
    /// Categories this actor occupies.
    pub collision_flags: CollisionFlags,
    /// Categories that block this actor's movement.
    pub collision_mask: CollisionFlags,
    /// Non-empty enables spawn and warp placement search against this mask.
    pub spawn_mask: CollisionFlags,
    pub tags: Vec<String>,
    /// Names of additional per-actor flag bits.
    pub flags: Vec<String>,
    pub variables: BTreeMap<String, Value>,
    pub handlers: Vec<HandlerConfig>,
}

impl Default for ActorConfig {
    fn default() -> Self {
        Self {
            name: String::new(),
            kind: ActorKind::Static,
            shape: ShapeConfig::Circle { radius: 0.5 },
            collision_flags: CollisionFlags::ACTOR,
            collision_mask: CollisionFlags::SOLID,
            spawn_mask: CollisionFlags::empty(),
            tags: Vec::new(),
            flags: Vec::new(),
            variables: BTreeMap::new(),
            handlers: Vec::new(),
        }
    }
}

impl ActorConfig {
    pub fn mobile(&self) -> Option<&MobileConfig> {
        match &self.kind {
            ActorKind::Static => None,
            ActorKind::Mobile(mobile) | ActorKind::Pawn(mobile) => Some(mobile),
            ActorKind::Agent(agent) => Some(&agent.mobile),
        }
    }
}

/// Static logic object placed in a scene: areas, markers, patrol paths.
#[derive(Clone, Debug, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct EntryConfig {
    pub name: String,
    pub tags: Vec<String>,
    pub shape: ShapeConfig,
    pub transform: Transform,
    /// World-space patrol waypoints.
    pub path: Vec<Vector2>,
    pub variables: BTreeMap<String, Value>,
    pub handlers: Vec<HandlerConfig>,
}

/// Actor present when a scene starts.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PlacedActor {
    pub config: String,
    #[cfg_attr(feature = "serde", serde(default))]
    pub transform: Transform,
}

#[derive(Clone, Debug, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct SceneConfig {
    pub name: String,
    pub entries: Vec<EntryConfig>,
    pub actors: Vec<PlacedActor>,
}

/// Actor configs keyed by name.
#[derive(Clone, Debug, Default)]
pub struct ConfigLibrary {
    actors: BTreeMap<String, Arc<ActorConfig>>,
}

impl ConfigLibrary {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a config under `name`, overwriting its `name` field.
    pub fn insert(&mut self, name: impl Into<String>, mut config: ActorConfig) -> Arc<ActorConfig> {
        let name = name.into();
        config.name = name.clone();
        let config = Arc::new(config);
        self.actors.insert(name, config.clone());
        config
    }

    pub fn with(mut self, name: impl Into<String>, config: ActorConfig) -> Self {
        self.insert(name, config);
        self
    }

    pub fn get(&self, name: &str) -> Option<Arc<ActorConfig>> {
        self.actors.get(name).cloned()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.actors.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.actors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.actors.is_empty()
    }
}

impl FromIterator<(String, ActorConfig)> for ConfigLibrary {
    fn from_iter<T: IntoIterator<Item = (String, ActorConfig)>>(iter: T) -> Self {
        let mut library = Self::new();
        for (name, config) in iter {
            library.insert(name, config);
        }
        library
    }
}
