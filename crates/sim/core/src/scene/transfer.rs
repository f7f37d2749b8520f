//! Hand-over of live state from a retiring scene to its replacement.
//!
//! The destination mirrors every live actor of the source, then each logic
//! instance copies its counterpart's state with references rewritten through
//! the [`RefMap`]. Occupants are not carried over; sessions re-enter the new
//! scene on their own.

use tracing::info;

use super::dispatch::ScriptRun;
use super::{Actor, Scene, SceneError, ScenePhase, SpawnOrigin};
use crate::logic::{
    ActionLogic, HandlerKey, HandlerLogic, LogicNode, LogicOwner, RefMap, TransferContext,
};
use crate::state::{ActorId, EntityKey};

impl Scene {
    /// Starts this freshly built scene as a mirror of `source`, a live scene
    /// of the same map. No startup logic runs; the caller retires `source`
    /// afterwards.
    pub fn transfer_from(&mut self, source: &Scene) -> Result<RefMap, SceneError> {
        if source.name != self.name {
            return Err(SceneError::SceneMismatch {
                source_scene: source.name.clone(),
                destination: self.name.clone(),
            });
        }
        if self.phase != ScenePhase::Created {
            return Err(SceneError::AlreadyStarted);
        }
        // The mirrored population replaces the placed actors and startup logic.
        self.phase = ScenePhase::Running;
        self.placed.clear();
        self.now = source.now;

        let mut refs = RefMap::new();
        for id in source.entries.keys() {
            if self.entries.contains_key(id) {
                refs.insert(EntityKey::Entry(*id), EntityKey::Entry(*id));
            }
        }
        for actor in source.actors.values().filter(|actor| !actor.is_destroyed()) {
            let id = self.insert_actor(
                actor.shared_config(),
                actor.base.transform,
                SpawnOrigin::default(),
            );
            refs.insert(actor.id().into(), id.into());
        }

        let now = self.now;
        for (from, to) in refs.iter() {
            match (from, to) {
                (EntityKey::Actor(from), EntityKey::Actor(to)) => {
                    let Some(original) = source.actors.get(&from) else {
                        continue;
                    };
                    if let Some(actor) = self.actors.get_mut(&to) {
                        actor.transfer_state(original, now);
                        actor.set_origin(refs.map(original.source()), refs.map(original.activator()));
                    }
                    self.refresh_shape(to);
                    self.transfer_handlers(to.into(), &original.handlers, &refs);
                    self.transfer_behavior(to, original, &refs);
                }
                (EntityKey::Entry(from), EntityKey::Entry(to)) => {
                    let Some(original) = source.entries.get(&from) else {
                        continue;
                    };
                    if let Some(entry) = self.entries.get_mut(&to) {
                        entry.base.transfer(&original.base);
                    }
                    self.transfer_handlers(to.into(), &original.handlers, &refs);
                }
                _ => {}
            }
        }

        self.transfer_scripts(source, &refs);

        for key in source.sensors.keys() {
            let (Some(original), Some(entity)) = (source.sensors.get(key), refs.get(key.entity)) else {
                continue;
            };
            if let Some(sensor) = self.sensors.get_mut(HandlerKey::new(entity, key.index)) {
                sensor.inside = original
                    .inside
                    .iter()
                    .filter_map(|id| refs.map_actor(*id))
                    .collect();
                sensor.touched.clear();
            }
        }

        info!(
            target: "sim::scene",
            scene = %self.name,
            mapped = refs.len(),
            pending = self.timers.len(),
            "Scene state transferred"
        );
        Ok(refs)
    }

    /// Rebuilds ad-hoc action runs that still wait on intervals, keeping
    /// their script ids and original fire times.
    fn transfer_scripts(&mut self, source: &Scene, refs: &RefMap) {
        self.next_script = self.next_script.max(source.next_script);
        for (id, original) in &source.scripts {
            let Some(owner) = refs.get(original.source) else {
                continue;
            };
            let mut action = ActionLogic::new(&original.config);
            action.transfer(
                &original.action,
                &mut TransferContext {
                    scene: self,
                    refs,
                    owner: LogicOwner::Script(*id),
                },
            );
            self.retain_script(
                *id,
                ScriptRun {
                    source: owner,
                    config: original.config.clone(),
                    action,
                },
            );
        }
    }

    fn transfer_handlers(&mut self, entity: EntityKey, originals: &[Option<HandlerLogic>], refs: &RefMap) {
        for (index, original) in originals.iter().enumerate() {
            let Some(original) = original else {
                continue;
            };
            let key = HandlerKey::new(entity, index);
            let Some(mut handler) = self.take_handler(key) else {
                continue;
            };
            handler.transfer(
                original,
                &mut TransferContext {
                    scene: self,
                    refs,
                    owner: LogicOwner::Handler(key),
                },
            );
            self.restore_handler(key, handler);
        }
    }

    fn transfer_behavior(&mut self, id: ActorId, original: &Actor, refs: &RefMap) {
        let Some(from) = original.agent().and_then(|agent| agent.behavior()) else {
            return;
        };
        let Some(mut behavior) = self
            .actors
            .get_mut(&id)
            .and_then(Actor::agent_mut)
            .and_then(|agent| agent.behavior.take())
        else {
            return;
        };
        behavior.transfer(
            from,
            &mut TransferContext {
                scene: self,
                refs,
                owner: LogicOwner::Behavior(id),
            },
        );
        if let Some(agent) = self.actors.get_mut(&id).and_then(Actor::agent_mut) {
            agent.current_target = behavior.current_target();
            agent.behavior = Some(behavior);
        }
    }
}
