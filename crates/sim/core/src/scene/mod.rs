//! The scene: the live population of one map and the tick that drives it.
//!
//! A [`Scene`] owns every actor and entry, the shape indexes, the sensor
//! registry, the interval queue and the seeded random generator. It is the
//! only mutable state logic ever touches: every logic call receives a
//! [`LogicContext`](crate::logic::LogicContext) borrowing the whole scene.
//!
//! # Tick order
//!
//! 1. Actors destroyed during the previous tick are removed.
//! 2. Warp flags are cleared.
//! 3. Due intervals fire in `(fire_at, id)` order.
//! 4. Tick handlers run.
//! 5. Actors tick in id order: mobiles advance, report collisions, update
//!    their shape and trigger sensors; agents run their behavior; pawns
//!    replay input.
//! 6. Sensors settle: untouched occupants trigger, enter/leave edges and
//!    count changes are delivered.
//!
//! # Borrowing
//!
//! Handlers and behaviors are moved out of their owner while they run and
//! moved back afterwards. A nested event addressed to a running instance
//! finds the slot empty and is dropped; nesting depth is bounded by
//! [`SimConfig::max_logic_depth`].
mod actor;
mod advancer;
mod dispatch;
mod entry;
mod error;
mod index;
mod lifecycle;
mod motion;
mod placement;
mod replication;
mod sensor;
mod tick;
mod timers;
mod transfer;

use std::collections::BTreeMap;

use rand::SeedableRng;
use rand::rngs::StdRng;

pub use actor::{Actor, ActorRole, AgentState, InputFrame, Mobile, PawnState};
pub use advancer::{AdvanceEnv, Advancer, Body, LinearAdvancer};
pub use entry::Entry;
pub use error::SceneError;
pub use index::{IndexedShape, ShapeIndex, ShapeObserver};
pub use replication::{ActorReplica, FiredEffect};
pub use sensor::Sensor;

use dispatch::{Listeners, ScriptRun};
use sensor::SensorIndex;
use timers::TimerQueue;

use crate::config::SimConfig;
use crate::env::{PathRequest, SceneEnv, SessionId};
use crate::geom::{Shape, Vector2};
use crate::logic::{HandlerKey, IntervalId, LogicOwner, ScriptId};
use crate::schema::{ConfigLibrary, LogicClass, PlacedActor, SceneConfig};
use crate::state::{ActorId, CollisionFlags, EntityKey, EntryId, LogicBase, Timestamp};

/// Attribution recorded on a spawned actor.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SpawnOrigin {
    /// Entity whose logic performed the spawn.
    pub source: Option<EntityKey>,
    pub activator: Option<EntityKey>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, strum::Display)]
#[strum(serialize_all = "snake_case")]
pub enum ScenePhase {
    Created,
    Running,
    Stopped,
}

/// Distance between samples taken by [`Scene::line_clear`].
const LINE_SAMPLE_STEP: f32 = 0.25;

#[derive(Debug)]
pub struct Scene {
    name: String,
    config: SimConfig,
    library: ConfigLibrary,
    placed: Vec<PlacedActor>,
    env: SceneEnv,
    rng: StdRng,
    now: Timestamp,
    phase: ScenePhase,
    next_actor: u32,
    actors: BTreeMap<ActorId, Actor>,
    entries: BTreeMap<EntryId, Entry>,
    actor_shapes: ShapeIndex<ActorId>,
    entry_shapes: ShapeIndex<EntryId>,
    sensors: SensorIndex,
    listeners: Listeners,
    timers: TimerQueue,
    scripts: BTreeMap<ScriptId, ScriptRun>,
    next_script: u32,
    pending_removal: Vec<ActorId>,
    occupants: BTreeMap<ActorId, SessionId>,
    effects: Vec<FiredEffect>,
    depth: u32,
}

impl Scene {
    /// Builds the scene and its entries. Nothing runs until [`Scene::start`].
    pub fn new(config: SimConfig, library: ConfigLibrary, scene: &SceneConfig, env: SceneEnv) -> Self {
        let mut this = Self {
            name: scene.name.clone(),
            rng: StdRng::seed_from_u64(config.seed),
            config,
            library,
            placed: scene.actors.clone(),
            env,
            now: Timestamp::ZERO,
            phase: ScenePhase::Created,
            next_actor: 0,
            actors: BTreeMap::new(),
            entries: BTreeMap::new(),
            actor_shapes: ShapeIndex::new(),
            entry_shapes: ShapeIndex::new(),
            sensors: SensorIndex::default(),
            listeners: Listeners::default(),
            timers: TimerQueue::default(),
            scripts: BTreeMap::new(),
            next_script: 0,
            pending_removal: Vec::new(),
            occupants: BTreeMap::new(),
            effects: Vec::new(),
            depth: 0,
        };
        for (index, entry_config) in scene.entries.iter().enumerate() {
            let id = EntryId(index as u32);
            let entry = Entry::new(id, entry_config);
            this.entry_shapes.insert(id, entry.shape(), CollisionFlags::empty());
            this.entries.insert(id, entry);
            this.register_handlers(id.into());
        }
        this
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn now(&self) -> Timestamp {
        self.now
    }

    pub fn config(&self) -> &SimConfig {
        &self.config
    }

    pub fn library(&self) -> &ConfigLibrary {
        &self.library
    }

    pub fn env(&self) -> &SceneEnv {
        &self.env
    }

    pub fn rng(&mut self) -> &mut StdRng {
        &mut self.rng
    }

    pub fn phase(&self) -> ScenePhase {
        self.phase
    }

    pub fn is_running(&self) -> bool {
        self.phase == ScenePhase::Running
    }

    // ===== entity lookup =====

    /// Whether `key` is present. Destroyed actors stay present until the
    /// start of the next tick.
    pub fn contains(&self, key: EntityKey) -> bool {
        match key {
            EntityKey::Actor(id) => self.actors.contains_key(&id),
            EntityKey::Entry(id) => self.entries.contains_key(&id),
        }
    }

    pub fn logic(&self, key: EntityKey) -> Option<&LogicBase> {
        match key {
            EntityKey::Actor(id) => self.actors.get(&id).map(|actor| &actor.base),
            EntityKey::Entry(id) => self.entries.get(&id).map(|entry| &entry.base),
        }
    }

    pub fn logic_mut(&mut self, key: EntityKey) -> Option<&mut LogicBase> {
        match key {
            EntityKey::Actor(id) => self.actors.get_mut(&id).map(|actor| &mut actor.base),
            EntityKey::Entry(id) => self.entries.get_mut(&id).map(|entry| &mut entry.base),
        }
    }

    pub fn actor(&self, id: ActorId) -> Option<&Actor> {
        self.actors.get(&id)
    }

    pub(crate) fn actor_mut(&mut self, id: ActorId) -> Option<&mut Actor> {
        self.actors.get_mut(&id)
    }

    pub fn actors(&self) -> impl Iterator<Item = &Actor> {
        self.actors.values()
    }

    pub fn entry(&self, id: EntryId) -> Option<&Entry> {
        self.entries.get(&id)
    }

    pub fn entries(&self) -> impl Iterator<Item = &Entry> {
        self.entries.values()
    }

    /// First entry with the given name.
    pub fn entry_named(&self, name: &str) -> Option<EntryId> {
        self.entries
            .iter()
            .find(|(_, entry)| entry.name() == name)
            .map(|(id, _)| *id)
    }

    /// Actors then entries carrying `tag`, each in id order.
    pub fn tagged(&self, tag: &str) -> Vec<EntityKey> {
        self.actors
            .values()
            .map(|actor| &actor.base)
            .chain(self.entries.values().map(|entry| &entry.base))
            .filter(|base| base.has_tag(tag))
            .map(|base| base.key)
            .collect()
    }

    pub fn instances_of(&self, class: LogicClass) -> Vec<EntityKey> {
        if class == LogicClass::Entry {
            return self.entries.keys().map(|id| EntityKey::Entry(*id)).collect();
        }
        self.actors
            .values()
            .filter(|actor| actor.is_instance_of(class))
            .map(|actor| EntityKey::Actor(actor.id()))
            .collect()
    }

    pub fn is_instance_of(&self, key: EntityKey, class: LogicClass) -> bool {
        match key {
            EntityKey::Actor(id) => self
                .actors
                .get(&id)
                .is_some_and(|actor| actor.is_instance_of(class)),
            EntityKey::Entry(id) => class == LogicClass::Entry && self.entries.contains_key(&id),
        }
    }

    pub fn shape_of(&self, key: EntityKey) -> Option<Shape> {
        match key {
            EntityKey::Actor(id) => self.actors.get(&id).map(Actor::shape),
            EntityKey::Entry(id) => self.entries.get(&id).map(Entry::shape),
        }
    }

    pub fn intersecting_actors<'a>(&'a self, shape: &'a Shape) -> impl Iterator<Item = ActorId> + 'a {
        self.actor_shapes.intersecting(shape)
    }

    pub fn intersecting_entries<'a>(&'a self, shape: &'a Shape) -> impl Iterator<Item = EntryId> + 'a {
        self.entry_shapes.intersecting(shape)
    }

    /// Entity the agent's behavior is oriented toward, if it still exists.
    pub fn behavior_target(&self, id: ActorId) -> Option<EntityKey> {
        self.actors
            .get(&id)
            .and_then(Actor::agent)
            .and_then(AgentState::current_target)
            .filter(|key| self.contains(*key))
    }

    // ===== sessions =====

    /// Actors bound to a client session, in id order.
    pub fn occupants(&self) -> Vec<ActorId> {
        self.occupants.keys().copied().collect()
    }

    pub fn session_of(&self, actor: ActorId) -> Option<SessionId> {
        self.occupants.get(&actor).copied()
    }

    // ===== collision and paths =====

    /// Whether `shape` overlaps static geometry or another actor under `mask`.
    pub fn collides(&self, mask: CollisionFlags, shape: &Shape, exclude: Option<ActorId>) -> bool {
        if mask.is_empty() {
            return false;
        }
        let world = self
            .env
            .collision()
            .is_ok_and(|collision| collision.collides(mask, shape));
        world
            || self
                .actor_shapes
                .intersecting_masked(shape, mask, exclude)
                .next()
                .is_some()
    }

    /// Whether a point can travel from `from` to `to` without touching
    /// static geometry under `mask`. An empty mask is always clear.
    pub fn line_clear(&self, mask: CollisionFlags, from: Vector2, to: Vector2) -> bool {
        if mask.is_empty() {
            return true;
        }
        let Ok(collision) = self.env.collision() else {
            return true;
        };
        let samples = (from.distance(to) / LINE_SAMPLE_STEP).ceil().max(1.0) as usize;
        (0..=samples).all(|step| {
            let point = from + (to - from) * (step as f32 / samples as f32);
            !collision.collides(mask, &Shape::Point(point))
        })
    }

    /// Waypoints for `actor` to reach `to`. Without a path oracle the
    /// destination itself is the only waypoint.
    pub fn find_path(&self, actor: ActorId, to: Vector2) -> Option<Vec<Vector2>> {
        let actor = self.actors.get(&actor)?;
        let Ok(paths) = self.env.paths() else {
            return Some(vec![to]);
        };
        let request = PathRequest::new(
            actor.base.transform.translation,
            to,
            self.config.max_path_length,
            actor.config().collision_mask,
        );
        paths.path(&request)
    }

    // ===== intervals =====

    /// Arms a one-shot interval delivered to `owner` once the clock reaches `fire_at`.
    pub fn schedule(&mut self, fire_at: Timestamp, owner: LogicOwner) -> IntervalId {
        self.timers.schedule(fire_at, owner)
    }

    pub fn cancel(&mut self, id: IntervalId) -> bool {
        self.timers.cancel(id)
    }

    pub fn interval_fire_at(&self, id: IntervalId) -> Option<Timestamp> {
        self.timers.fire_at(id)
    }

    pub fn pending_intervals(&self) -> usize {
        self.timers.len()
    }

    /// Sensor state of a handler, if it has one.
    pub fn sensor(&self, key: HandlerKey) -> Option<&Sensor> {
        self.sensors.get(key)
    }
}
