//! Direct manipulation of actor placement and movement intent.

use tracing::{debug, trace};

use super::{InputFrame, Scene, SceneError};
use crate::geom::{Transform, normalize_angle};
use crate::logic::LogicError;
use crate::state::{ActorFlags, ActorId, EntityKey};

impl Scene {
    fn live_actor(&mut self, id: ActorId) -> Result<&mut super::Actor, SceneError> {
        let actor = self.actors.get_mut(&id).ok_or(SceneError::UnknownActor(id))?;
        if actor.is_destroyed() {
            return Err(SceneError::Destroyed(id));
        }
        Ok(actor)
    }

    /// Re-places the actor's shape at its transform and refreshes the
    /// sensors attached to it.
    pub(super) fn refresh_shape(&mut self, id: ActorId) {
        let Some(actor) = self.actors.get_mut(&id) else {
            return;
        };
        let shape = actor.placed_shape();
        let transform = actor.base.transform;
        actor.shape = shape;
        self.actor_shapes
            .update(id, shape, &transform, &mut self.sensors);
    }

    /// Turns the actor by `delta`; a mobile's heading turns with it.
    pub fn rotate_actor(&mut self, id: ActorId, delta: f32) -> Result<(), SceneError> {
        let actor = self.live_actor(id)?;
        let rotation = normalize_angle(actor.base.transform.rotation + delta);
        actor.base.transform.rotation = rotation;
        if let Some(mobile) = actor.mobile_mut() {
            mobile.direction = normalize_angle(mobile.direction + delta);
        }
        if let Some(agent) = actor.agent_mut() {
            agent.target_rotation = None;
        }
        self.refresh_shape(id);
        Ok(())
    }

    /// Moves an actor instantly and raises its warp flag for this tick.
    ///
    /// Configs with a spawn mask search for a free position around the
    /// destination that is reachable from where the actor stood, and stay
    /// there when none exists.
    pub fn warp_actor(&mut self, id: ActorId, destination: Transform) -> Result<(), SceneError> {
        let actor = self.live_actor(id)?;
        let config = actor.shared_config();
        let origin = actor.base.transform.translation;
        let translation = if config.spawn_mask.is_empty() {
            destination.translation
        } else {
            self.place(&config, destination, origin, Some(id), Some(origin))
        };

        let now = self.now;
        let actor = self.live_actor(id)?;
        actor.base.transform = Transform::new(translation, destination.rotation);
        actor.flags.insert(ActorFlags::WARP);
        if let Some(mobile) = actor.mobile_mut() {
            mobile.advancer.jump(now);
        }
        if let Some(agent) = actor.agent_mut() {
            agent.target_rotation = None;
        }
        debug!(target: "sim::scene", %id, x = translation.x, y = translation.y, "Actor warped");
        self.refresh_shape(id);
        Ok(())
    }

    pub fn set_flag(&mut self, id: ActorId, flag: &str, value: bool) -> Result<(), LogicError> {
        let actor = self
            .actors
            .get_mut(&id)
            .ok_or(LogicError::NotAnActor(id.into()))?;
        actor.set_flag(flag, value)
    }

    // ===== movement intent =====

    /// Starts moving along `direction` and turns toward it.
    pub fn steer(&mut self, key: EntityKey, direction: f32) {
        let Some(actor) = key.actor().and_then(|id| self.actors.get_mut(&id)) else {
            return;
        };
        let direction = normalize_angle(direction);
        let Some(mobile) = actor.mobile_mut() else {
            return;
        };
        mobile.direction = direction;
        mobile.moving = true;
        actor.flags.insert(ActorFlags::MOVING);
        if let Some(agent) = actor.agent_mut() {
            agent.target_rotation = Some(direction);
        }
    }

    pub fn halt(&mut self, key: EntityKey) {
        let Some(actor) = key.actor().and_then(|id| self.actors.get_mut(&id)) else {
            return;
        };
        if let Some(mobile) = actor.mobile_mut() {
            mobile.moving = false;
            actor.flags.remove(ActorFlags::MOVING);
        }
    }

    /// Turns toward `rotation`; agents turn at their turn rate, other actors
    /// snap.
    pub fn face(&mut self, key: EntityKey, rotation: f32) {
        let Some(id) = key.actor() else {
            return;
        };
        let Some(actor) = self.actors.get_mut(&id) else {
            return;
        };
        let rotation = normalize_angle(rotation);
        match actor.agent_mut() {
            Some(agent) => agent.target_rotation = Some(rotation),
            None => {
                actor.base.transform.rotation = rotation;
                self.refresh_shape(id);
            }
        }
    }

    /// Overrides the configured speed; `None` restores it.
    pub fn set_speed(&mut self, key: EntityKey, speed: Option<f32>) {
        if let Some(mobile) = key
            .actor()
            .and_then(|id| self.actors.get_mut(&id))
            .and_then(|actor| actor.mobile_mut())
        {
            mobile.speed_override = speed.map(|speed| speed.max(0.0));
        }
    }

    // ===== pawn input =====

    /// Queues a client input frame for a pawn.
    ///
    /// Frames older than the newest accepted frame are dropped and reported
    /// as `Ok(false)`.
    pub fn submit_input(&mut self, id: ActorId, frame: InputFrame) -> Result<bool, SceneError> {
        let actor = self.live_actor(id)?;
        let (_, pawn) = actor.pawn_mut().ok_or(SceneError::NotPawn(id))?;
        if pawn.last_input.is_some_and(|last| frame.timestamp < last) {
            trace!(target: "sim::scene", %id, frame = %frame.timestamp, "Stale input dropped");
            return Ok(false);
        }
        pawn.last_input = Some(frame.timestamp);
        pawn.inputs.push_back(frame);
        Ok(true)
    }
}
