//! Observation and replication of actor state to clients.
//!
//! Observing an actor keeps it out of stasis; an actor already in stasis is
//! woken and its advancer jumps to the present so the unobserved interval is
//! skipped rather than integrated.

use tracing::debug;

use super::Scene;
use crate::geom::{Shape, Transform};
use crate::state::{ActorDelta, ActorId, ActorSnapshot, EntityKey, Timestamp};

/// A one-shot visual or audio effect requested by logic.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct FiredEffect {
    pub name: String,
    pub transform: Transform,
    pub timestamp: Timestamp,
    pub source: Option<EntityKey>,
}

/// Replicated state of one actor for the current tick.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ActorReplica {
    pub snapshot: ActorSnapshot,
    /// Changes since the previous tick's snapshot; `None` for a first
    /// snapshot or an unchanged actor.
    pub delta: Option<ActorDelta>,
}

impl Scene {
    /// Marks the actor observed now, waking it from stasis.
    fn observe(&mut self, id: ActorId) {
        let now = self.now;
        let Some(mobile) = self.actors.get_mut(&id).and_then(|actor| actor.mobile_mut()) else {
            return;
        };
        mobile.last_observed = now;
        if !mobile.stasis {
            return;
        }
        mobile.stasis = false;
        mobile.advancer.jump(now);
        debug!(target: "sim::scene", %id, "Actor left stasis");
        self.with_behavior(id, |behavior, ctx| behavior.on_stasis(ctx, false));
    }

    /// Current snapshot of one actor. Counts as an observation.
    pub fn snapshot(&mut self, id: ActorId) -> Option<ActorSnapshot> {
        self.observe(id);
        self.actors.get(&id).map(|actor| actor.snapshot())
    }

    /// Snapshots and deltas of every actor intersecting `interest`.
    ///
    /// Each actor's snapshot is taken at most once per tick; later calls in
    /// the same tick return the cached replica.
    pub fn replicate(&mut self, interest: &Shape) -> Vec<ActorReplica> {
        let now = self.now;
        let ids: Vec<ActorId> = self.actor_shapes.intersecting(interest).collect();
        let mut replicas = Vec::with_capacity(ids.len());
        for id in ids {
            self.observe(id);
            let Some(actor) = self.actors.get_mut(&id) else {
                continue;
            };
            if actor.replication.tick != Some(now) {
                let current = actor.snapshot();
                let previous = actor.replication.current.replace(current.clone());
                actor.replication.delta = previous
                    .as_ref()
                    .and_then(|previous| ActorDelta::between(previous, &current));
                actor.replication.tick = Some(now);
            }
            if let Some(snapshot) = actor.replication.current.clone() {
                replicas.push(ActorReplica {
                    snapshot,
                    delta: actor.replication.delta.clone(),
                });
            }
        }
        replicas
    }
}
