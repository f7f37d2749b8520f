//! Scene start and shutdown, actor spawning and removal, occupants.

use std::sync::Arc;

use tracing::{debug, info, trace};

use super::{Actor, FiredEffect, Scene, SceneError, ScenePhase, SpawnOrigin};
use crate::env::{ClientAction, SessionId};
use crate::geom::Transform;
use crate::logic::handler::Listen;
use crate::logic::{HandlerEvent, LogicError};
use crate::schema::ActorConfig;
use crate::state::{ActorId, EntityKey, Timestamp};

impl Scene {
    /// Starts the scene at `timestamp`: entries receive startup and the
    /// placed actors are spawned.
    pub fn start(&mut self, timestamp: Timestamp) -> Result<(), SceneError> {
        if self.phase != ScenePhase::Created {
            return Err(SceneError::AlreadyStarted);
        }
        self.phase = ScenePhase::Running;
        self.now = timestamp;
        info!(
            target: "sim::scene",
            scene = %self.name,
            entries = self.entries.len(),
            placed = self.placed.len(),
            "Scene started"
        );

        let entries: Vec<EntityKey> = self.entries.keys().map(|id| EntityKey::Entry(*id)).collect();
        for entry in entries {
            self.dispatch_owner(entry, &HandlerEvent::Startup);
        }
        for placed in std::mem::take(&mut self.placed) {
            self.spawn_actor(&placed.config, placed.transform, SpawnOrigin::default())?;
        }
        Ok(())
    }

    /// Destroys every actor as part of the scene ending and stops the clock.
    ///
    /// Pending intervals are dropped without firing.
    pub fn shutdown(&mut self, timestamp: Timestamp) {
        if self.phase != ScenePhase::Running {
            return;
        }
        self.now = self.now.max(timestamp);
        let ids: Vec<ActorId> = self.actors.keys().copied().collect();
        for id in ids {
            // Destroying an existing actor cannot fail.
            let _ = self.destroy_actor(id, true);
        }
        let entries: Vec<EntityKey> = self.entries.keys().map(|id| EntityKey::Entry(*id)).collect();
        for entry in entries {
            self.dispatch_owner(entry, &HandlerEvent::Shutdown { end_scene: true });
        }
        self.phase = ScenePhase::Stopped;
        self.process_removals();
        let dropped = self.timers.clear();
        self.scripts.clear();
        info!(target: "sim::scene", scene = %self.name, dropped, "Scene shut down");
    }

    /// Spawns an instance of the named actor config.
    ///
    /// Configs with a spawn mask are moved to the nearest free ring position
    /// around `transform`.
    pub fn spawn_actor(
        &mut self,
        config: &str,
        transform: Transform,
        origin: SpawnOrigin,
    ) -> Result<ActorId, SceneError> {
        if !self.is_running() {
            return Err(SceneError::NotRunning);
        }
        let config = self
            .library
            .get(config)
            .ok_or_else(|| SceneError::UnknownConfig(config.to_owned()))?;
        let transform = if config.spawn_mask.is_empty() {
            transform
        } else {
            let translation = self.place(&config, transform, transform.translation, None, None);
            Transform::new(translation, transform.rotation)
        };

        let id = self.insert_actor(Arc::clone(&config), transform, origin);
        debug!(target: "sim::scene", %id, config = %config.name, "Actor spawned");

        let key = EntityKey::Actor(id);
        self.dispatch_owner(key, &HandlerEvent::Startup);
        self.with_behavior(id, |behavior, ctx| behavior.start(ctx));
        self.broadcast(Listen::Population, &HandlerEvent::ActorAdded(id));
        Ok(id)
    }

    /// Creates and indexes an actor without running any of its logic.
    pub(super) fn insert_actor(
        &mut self,
        config: Arc<ActorConfig>,
        transform: Transform,
        origin: SpawnOrigin,
    ) -> ActorId {
        let id = ActorId(self.next_actor);
        self.next_actor += 1;
        let actor = Actor::new(id, config, transform, self.now, origin, &self.config);
        self.actor_shapes
            .insert(id, actor.shape(), actor.config().collision_flags);
        self.actors.insert(id, actor);
        self.register_handlers(id.into());
        id
    }

    /// Marks an actor destroyed. Physical removal waits for the next tick.
    ///
    /// Returns `Ok(false)` when the actor was already destroyed.
    pub fn destroy_actor(&mut self, id: ActorId, end_scene: bool) -> Result<bool, SceneError> {
        let now = self.now;
        let actor = self.actors.get_mut(&id).ok_or(SceneError::UnknownActor(id))?;
        if actor.is_destroyed() {
            return Ok(false);
        }
        actor.destroyed = Some(now);
        actor.end_scene = end_scene;
        if let Some(mobile) = actor.mobile_mut() {
            mobile.moving = false;
        }
        debug!(target: "sim::scene", %id, end_scene, "Actor destroyed");

        self.dispatch_owner(id.into(), &HandlerEvent::Shutdown { end_scene });
        self.with_behavior(id, |behavior, ctx| behavior.stop(ctx));
        self.broadcast(Listen::Population, &HandlerEvent::ActorRemoved(id));
        if self.occupants.contains_key(&id) {
            self.remove_occupant(id);
        }
        self.pending_removal.push(id);
        Ok(true)
    }

    /// Removes actors destroyed before this point from the scene.
    pub(super) fn process_removals(&mut self) {
        for id in std::mem::take(&mut self.pending_removal) {
            let Some(actor) = self.actors.remove(&id) else {
                continue;
            };
            let key = EntityKey::Actor(id);
            self.actor_shapes.remove(id);
            self.unregister_handlers(key);
            let mut cancelled = 0;
            for handler in actor.handlers.iter().flatten() {
                cancelled += self.cancel_logic(handler);
            }
            if let Some(behavior) = actor.agent().and_then(|agent| agent.behavior.as_ref()) {
                cancelled += self.cancel_logic(behavior);
            }
            trace!(target: "sim::scene", %id, cancelled, "Actor removed");
        }
    }

    // ===== occupants =====

    /// Binds a client session to a pawn.
    pub fn add_occupant(&mut self, actor: ActorId, session: SessionId) -> Result<(), SceneError> {
        let found = self.actors.get(&actor).ok_or(SceneError::UnknownActor(actor))?;
        if found.is_destroyed() {
            return Err(SceneError::Destroyed(actor));
        }
        if found.pawn().is_none() {
            return Err(SceneError::NotPawn(actor));
        }
        if self.occupants.insert(actor, session).is_none() {
            debug!(target: "sim::scene", %actor, %session, "Occupant entered");
            self.broadcast(Listen::Occupants, &HandlerEvent::OccupantEntered(actor));
        }
        Ok(())
    }

    /// Unbinds the actor's session. Returns false when it had none.
    pub fn remove_occupant(&mut self, actor: ActorId) -> bool {
        let Some(session) = self.occupants.remove(&actor) else {
            return false;
        };
        debug!(target: "sim::scene", %actor, %session, "Occupant left");
        self.broadcast(Listen::Occupants, &HandlerEvent::OccupantLeft(actor));
        true
    }

    fn session_for(&self, key: EntityKey) -> Result<SessionId, LogicError> {
        let actor = key.actor().ok_or(LogicError::NotAnActor(key))?;
        self.occupants
            .get(&actor)
            .copied()
            .ok_or(LogicError::NoSession(key))
    }

    /// Posts a client action to the session occupying `key`.
    pub fn force_client_action(&mut self, key: EntityKey, action: &ClientAction) -> Result<(), LogicError> {
        let session = self.session_for(key)?;
        self.env.sessions()?.force_client_action(session, action);
        trace!(target: "sim::scene", %key, %session, action = %action.name, "Client action forced");
        Ok(())
    }

    /// Asks the session occupying `key` to move its body to another scene.
    pub fn move_body(&mut self, key: EntityKey, scene: &str, portal: Option<&str>) -> Result<(), LogicError> {
        let session = self.session_for(key)?;
        self.env.sessions()?.move_body(session, scene, portal);
        debug!(target: "sim::scene", %key, %session, scene, ?portal, "Body moved");
        Ok(())
    }

    // ===== effects =====

    pub fn fire_effect(&mut self, name: &str, transform: Transform, source: Option<EntityKey>) {
        trace!(target: "sim::scene", effect = name, "Effect fired");
        self.effects.push(FiredEffect {
            name: name.to_owned(),
            transform,
            timestamp: self.now,
            source,
        });
    }

    /// Takes the effects fired since the last drain.
    pub fn drain_effects(&mut self) -> Vec<FiredEffect> {
        std::mem::take(&mut self.effects)
    }
}
