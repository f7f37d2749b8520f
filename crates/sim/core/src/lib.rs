//! Authoritative tick simulation for tile-based multiplayer scenes.
//!
//! `sim-core` hosts the live population of one map: actors, entries, their
//! declarative logic trees and the per-tick pass that advances them. Content
//! is described by the configuration schema in [`schema`]; the engines in
//! [`logic`] instantiate it, and [`scene::Scene`] owns the state every
//! instance reads and mutates. Services the simulation consumes but does not
//! implement (static collision, pathfinding, client sessions, wall-clock time)
//! are reached through the oracle traits in [`env`].
//!
//! The crate performs no I/O and never blocks. Scene randomness comes from a
//! generator seeded by [`SimConfig::seed`], so a scene fed the same inputs
//! replays identically.
pub mod config;
pub mod env;
pub mod error;
pub mod geom;
pub mod logic;
pub mod scene;
pub mod schema;
pub mod state;

pub use config::SimConfig;
pub use env::{
    ClientAction, CollisionOracle, FixedClock, OracleError, PathOracle, PathRequest, SceneEnv,
    SessionId, SessionOracle, SystemClock, TileMap, WallClock,
};
pub use error::{ErrorSeverity, SimError};
pub use geom::{Rect, Shape, Transform, Vector2};
pub use logic::{
    HandlerEvent, HandlerKey, IntervalId, LogicContext, LogicError, LogicOwner, RefMap,
};
pub use scene::{
    Actor, ActorReplica, ActorRole, Entry, FiredEffect, InputFrame, Scene, SceneError,
    ScenePhase, SpawnOrigin,
};
pub use schema::{
    ActionConfig, ActorConfig, ActorKind, AgentConfig, BehaviorConfig, ConditionConfig,
    ConfigLibrary, EntryConfig, ExpressionConfig, HandlerConfig, HandlerKind, MobileConfig,
    PlacedActor, SceneConfig, ShapeConfig, TargetConfig,
};
pub use state::{
    ActorDelta, ActorFlags, ActorId, ActorSnapshot, CollisionFlags, EntityKey, EntryId,
    Timestamp, Value,
};
