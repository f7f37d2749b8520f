//! The per-tick simulation pass.

use std::collections::BTreeSet;

use tracing::{debug, trace};

use super::advancer::AdvanceEnv;
use super::{Actor, Scene, SceneError, ShapeIndex};
use crate::env::CollisionOracle;
use crate::geom::{Shape, Vector2};
use crate::logic::HandlerEvent;
use crate::logic::handler::Listen;
use crate::state::{ActorFlags, ActorId, CollisionFlags, EntityKey, Timestamp};

/// What a moving actor can bump into: level geometry and other actors.
struct Surroundings<'a> {
    collision: Option<&'a dyn CollisionOracle>,
    actors: &'a ShapeIndex<ActorId>,
    exclude: ActorId,
}

impl AdvanceEnv for Surroundings<'_> {
    fn penetration(&self, mask: CollisionFlags, shape: &Shape) -> Option<Vector2> {
        let world = self
            .collision
            .and_then(|collision| collision.penetration(mask, shape));
        let actors = self.actors.penetration(shape, mask, Some(self.exclude));
        match (world, actors) {
            (Some(a), Some(b)) => Some(if a.length() >= b.length() { a } else { b }),
            (a, b) => a.or(b),
        }
    }
}

impl Scene {
    /// Advances the scene to `timestamp`.
    pub fn tick(&mut self, timestamp: Timestamp) -> Result<(), SceneError> {
        if !self.is_running() {
            return Err(SceneError::NotRunning);
        }
        if timestamp < self.now {
            return Err(SceneError::ClockReversed {
                now: self.now,
                requested: timestamp,
            });
        }
        self.now = timestamp;
        trace!(target: "sim::scene", scene = %self.name, now = %timestamp, "Tick");

        self.process_removals();
        for actor in self.actors.values_mut() {
            actor.flags.remove(ActorFlags::WARP);
        }
        self.fire_due_intervals();
        self.broadcast(Listen::Tick, &HandlerEvent::Tick);

        let ids: Vec<ActorId> = self.actors.keys().copied().collect();
        for id in ids {
            self.tick_actor(id);
        }
        self.settle_sensors();
        Ok(())
    }

    fn tick_actor(&mut self, id: ActorId) {
        let now = self.now;
        let Some(actor) = self.actors.get_mut(&id) else {
            return;
        };
        if actor.is_destroyed() {
            return;
        }
        let Some(mobile) = actor.mobile_mut() else {
            return;
        };
        if mobile.stasis {
            return;
        }
        if mobile.stasis_due(now) {
            mobile.stasis = true;
            debug!(target: "sim::scene", %id, "Actor entered stasis");
            self.with_behavior(id, |behavior, ctx| behavior.on_stasis(ctx, true));
            return;
        }

        let mut penetrations = Vec::new();
        {
            let env = Surroundings {
                collision: self.env.collision().ok(),
                actors: &self.actor_shapes,
                exclude: id,
            };
            advance_with_input(actor, &env, now, &mut penetrations);
        }
        if let Some(penetration) = Vector2::mean(penetrations) {
            self.with_behavior(id, |behavior, ctx| behavior.on_collision(ctx, penetration));
        }

        self.refresh_shape(id);
        self.trigger_sensors(id);

        self.with_behavior(id, |behavior, ctx| behavior.tick(ctx));
    }

    /// Delivers a trigger to every sensor the actor touches, once per tick.
    fn trigger_sensors(&mut self, id: ActorId) {
        let Some(actor) = self.actors.get(&id) else {
            return;
        };
        if actor.is_destroyed() {
            return;
        }
        let hits = self
            .sensors
            .detecting(id, actor.config().collision_flags, &actor.shape());
        for key in hits {
            let fresh = self
                .sensors
                .get_mut(key)
                .is_some_and(|sensor| sensor.touched.insert(id));
            if fresh {
                self.dispatch(key, &HandlerEvent::SensorTrigger(id));
            }
        }
    }

    /// Reconciles every sensor with the actors now inside it.
    fn settle_sensors(&mut self) {
        for key in self.sensors.keys() {
            let Some(sensor) = self.sensors.get(key) else {
                continue;
            };
            let current: BTreeSet<ActorId> = self
                .actor_shapes
                .intersecting(&sensor.shape)
                .filter(|id| key.entity != EntityKey::Actor(*id))
                .filter(|id| {
                    self.actors.get(id).is_some_and(|actor| {
                        !actor.is_destroyed() && sensor.config.matches(actor.config().collision_flags)
                    })
                })
                .collect();
            let untouched: Vec<ActorId> = current.difference(&sensor.touched).copied().collect();
            let entered: Vec<ActorId> = current.difference(&sensor.inside).copied().collect();
            let left: Vec<ActorId> = sensor.inside.difference(&current).copied().collect();
            let previous = sensor.inside.len();
            let count = current.len();

            if let Some(sensor) = self.sensors.get_mut(key) {
                sensor.inside = current;
                sensor.touched.clear();
            }

            for id in untouched {
                self.dispatch(key, &HandlerEvent::SensorTrigger(id));
            }
            for id in entered {
                self.dispatch(key, &HandlerEvent::SensorEntered(id));
            }
            for id in left {
                self.dispatch(key, &HandlerEvent::SensorLeft(id));
            }
            if previous != count {
                self.dispatch(
                    key,
                    &HandlerEvent::SensorCount {
                        previous,
                        current: count,
                    },
                );
            }
        }
    }
}

/// Integrates the actor to `now`, replaying queued pawn input at the
/// timestamps it was sampled.
fn advance_with_input(actor: &mut Actor, env: &dyn AdvanceEnv, now: Timestamp, penetrations: &mut Vec<Vector2>) {
    loop {
        let frame = match actor.pawn_mut() {
            Some((_, pawn)) if pawn.inputs.front().is_some_and(|frame| frame.timestamp <= now) => {
                pawn.inputs.pop_front()
            }
            _ => None,
        };
        let Some(frame) = frame else {
            break;
        };
        actor.advance(env, frame.timestamp, penetrations);
        if let Some((mobile, _)) = actor.pawn_mut() {
            match frame.direction {
                Some(direction) => {
                    mobile.direction = direction;
                    mobile.moving = true;
                }
                None => mobile.moving = false,
            }
        }
        actor.base.transform.rotation = frame.rotation;
        actor.flags.set(ActorFlags::MOVING, frame.direction.is_some());
    }
    actor.advance(env, now, penetrations);
}
