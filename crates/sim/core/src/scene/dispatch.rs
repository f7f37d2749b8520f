//! Event routing into handlers, behaviors and ad-hoc scripts.

use std::collections::BTreeSet;

use tracing::{trace, warn};

use super::{Actor, Scene, SceneError};
use crate::logic::handler::Listen;
use crate::logic::{
    ActionLogic, BehaviorLogic, HandlerEvent, HandlerKey, HandlerLogic, IntervalId, LogicContext,
    LogicNode, LogicOwner, ScriptId,
};
use crate::schema::{ActionConfig, SensorConfig};
use crate::state::{ActorId, EntityKey, Value};

/// Handlers subscribed to scene-wide event streams.
#[derive(Clone, Debug, Default)]
pub(crate) struct Listeners {
    tick: BTreeSet<HandlerKey>,
    population: BTreeSet<HandlerKey>,
    occupants: BTreeSet<HandlerKey>,
}

impl Listeners {
    fn set(&self, listen: Listen) -> Option<&BTreeSet<HandlerKey>> {
        match listen {
            Listen::Tick => Some(&self.tick),
            Listen::Population => Some(&self.population),
            Listen::Occupants => Some(&self.occupants),
            Listen::Owner | Listen::Sensor => None,
        }
    }

    fn insert(&mut self, listen: Listen, key: HandlerKey) {
        let set = match listen {
            Listen::Tick => &mut self.tick,
            Listen::Population => &mut self.population,
            Listen::Occupants => &mut self.occupants,
            Listen::Owner | Listen::Sensor => return,
        };
        set.insert(key);
    }

    fn keys(&self, listen: Listen) -> Vec<HandlerKey> {
        self.set(listen)
            .map(|set| set.iter().copied().collect())
            .unwrap_or_default()
    }

    fn remove_entity(&mut self, entity: EntityKey) {
        for set in [&mut self.tick, &mut self.population, &mut self.occupants] {
            set.retain(|key| key.entity != entity);
        }
    }
}

/// Action run through [`Scene::run_action`] that still has intervals pending.
#[derive(Debug)]
pub(crate) struct ScriptRun {
    pub source: EntityKey,
    pub config: ActionConfig,
    pub action: ActionLogic,
}

impl Scene {
    fn handler_slots(&mut self, entity: EntityKey) -> Option<&mut Vec<Option<HandlerLogic>>> {
        match entity {
            EntityKey::Actor(id) => self.actors.get_mut(&id).map(|actor| &mut actor.handlers),
            EntityKey::Entry(id) => self.entries.get_mut(&id).map(|entry| &mut entry.handlers),
        }
    }

    fn handler_count(&self, entity: EntityKey) -> usize {
        match entity {
            EntityKey::Actor(id) => self.actors.get(&id).map_or(0, |actor| actor.handlers.len()),
            EntityKey::Entry(id) => self.entries.get(&id).map_or(0, |entry| entry.handlers.len()),
        }
    }

    /// Subscribes the entity's handlers to the streams they listen to and
    /// places their sensors.
    pub(super) fn register_handlers(&mut self, entity: EntityKey) {
        let (Some(shape), Some(transform)) = (
            self.shape_of(entity),
            self.logic(entity).map(|logic| logic.transform),
        ) else {
            return;
        };
        let registrations: Vec<(usize, Listen, Option<SensorConfig>)> = self
            .handler_slots(entity)
            .map(|slots| {
                slots
                    .iter()
                    .enumerate()
                    .filter_map(|(index, slot)| {
                        let handler = slot.as_ref()?;
                        Some((index, handler.listens(), handler.sensor().cloned()))
                    })
                    .collect()
            })
            .unwrap_or_default();
        for (index, listen, sensor) in registrations {
            let key = HandlerKey::new(entity, index);
            match (listen, sensor) {
                (Listen::Sensor, Some(sensor)) => {
                    self.sensors.register(key, &sensor, &shape, &transform)
                }
                (listen, _) => self.listeners.insert(listen, key),
            }
        }
    }

    pub(super) fn unregister_handlers(&mut self, entity: EntityKey) {
        self.listeners.remove_entity(entity);
        self.sensors.unregister_entity(entity);
    }

    /// Cancels every interval still pending in `node`.
    pub(crate) fn cancel_logic(&mut self, node: &impl LogicNode) -> usize {
        let mut pending = Vec::new();
        node.collect_intervals(&mut pending);
        pending
            .into_iter()
            .filter(|id| self.timers.cancel(*id))
            .count()
    }

    fn enter(&mut self, what: &dyn std::fmt::Display) -> bool {
        if self.depth >= self.config.max_logic_depth {
            warn!(
                target: "sim::scene",
                %what,
                depth = self.depth,
                "Logic nesting limit reached; call dropped"
            );
            return false;
        }
        self.depth += 1;
        true
    }

    fn leave(&mut self) {
        self.depth = self.depth.saturating_sub(1);
    }

    /// Delivers `event` to one handler. Returns whether an action ran.
    pub(crate) fn dispatch(&mut self, key: HandlerKey, event: &HandlerEvent) -> bool {
        let Some(mut handler) = self.take_handler(key) else {
            trace!(target: "sim::handler", handler = %key, ?event, "Handler busy or gone; event dropped");
            return false;
        };
        if !self.enter(&key) {
            self.restore_handler(key, handler);
            return false;
        }
        let handled = handler.handle(
            &mut LogicContext::new(self, key.entity, LogicOwner::Handler(key)),
            event,
        );
        self.leave();
        self.restore_handler(key, handler);
        handled
    }

    /// Moves a handler out of its slot; `None` while it is already running.
    pub(super) fn take_handler(&mut self, key: HandlerKey) -> Option<HandlerLogic> {
        self.handler_slots(key.entity)
            .and_then(|slots| slots.get_mut(key.index))
            .and_then(Option::take)
    }

    pub(super) fn restore_handler(&mut self, key: HandlerKey, handler: HandlerLogic) {
        match self
            .handler_slots(key.entity)
            .and_then(|slots| slots.get_mut(key.index))
        {
            Some(slot) => *slot = Some(handler),
            None => {
                // Owner was removed while the handler ran.
                self.cancel_logic(&handler);
            }
        }
    }

    /// Delivers `event` to every handler of `entity`.
    pub(crate) fn dispatch_owner(&mut self, entity: EntityKey, event: &HandlerEvent) -> bool {
        let mut handled = false;
        for index in 0..self.handler_count(entity) {
            handled |= self.dispatch(HandlerKey::new(entity, index), event);
        }
        handled
    }

    pub(crate) fn broadcast(&mut self, listen: Listen, event: &HandlerEvent) {
        for key in self.listeners.keys(listen) {
            self.dispatch(key, event);
        }
    }

    /// Runs `run` against the agent's behavior. Returns false when the actor
    /// has no behavior or it is already running.
    pub(crate) fn with_behavior(
        &mut self,
        id: ActorId,
        run: impl FnOnce(&mut BehaviorLogic, &mut LogicContext<'_>),
    ) -> bool {
        let Some(mut behavior) = self
            .actors
            .get_mut(&id)
            .and_then(Actor::agent_mut)
            .and_then(|agent| agent.behavior.take())
        else {
            return false;
        };
        let entered = self.enter(&id);
        if entered {
            run(
                &mut behavior,
                &mut LogicContext::new(self, id.into(), LogicOwner::Behavior(id)),
            );
            self.leave();
        }
        match self.actors.get_mut(&id).and_then(Actor::agent_mut) {
            Some(agent) => {
                agent.current_target = behavior.current_target();
                agent.behavior = Some(behavior);
            }
            None => {
                self.cancel_logic(&behavior);
            }
        }
        entered
    }

    /// Sends a named signal to every handler of `target`.
    pub fn signal(&mut self, target: EntityKey, name: &str, activator: Option<EntityKey>) -> bool {
        trace!(target: "sim::handler", %target, signal = name, "Signal");
        self.dispatch_owner(
            target,
            &HandlerEvent::Signal {
                name: name.to_owned(),
                activator,
            },
        )
    }

    /// Delivers a client request from `actor` to `target`'s request handlers.
    pub fn request(&mut self, actor: ActorId, target: EntityKey, name: &str) -> Result<bool, SceneError> {
        if !self.is_running() {
            return Err(SceneError::NotRunning);
        }
        if !self.actors.contains_key(&actor) {
            return Err(SceneError::UnknownActor(actor));
        }
        if !self.contains(target) {
            return Err(SceneError::UnknownEntity(target));
        }
        Ok(self.dispatch_owner(
            target,
            &HandlerEvent::Request {
                name: name.to_owned(),
                activator: Some(actor.into()),
            },
        ))
    }

    /// Writes a variable, notifying the owner's handlers when the value changed.
    pub fn set_variable(
        &mut self,
        key: EntityKey,
        name: &str,
        value: Value,
        activator: Option<EntityKey>,
    ) -> bool {
        let Some(base) = self.logic_mut(key) else {
            return false;
        };
        let previous = base.set_variable(name, value.clone());
        if previous == value {
            return false;
        }
        self.dispatch_owner(
            key,
            &HandlerEvent::VariableChanged {
                name: name.to_owned(),
                activator,
            },
        );
        true
    }

    /// Runs an action tree outside any handler with `source` as its owner.
    ///
    /// Intervals the action schedules keep it alive until they fire.
    pub fn run_action(
        &mut self,
        config: &ActionConfig,
        source: EntityKey,
        activator: Option<EntityKey>,
    ) -> bool {
        let id = ScriptId(self.next_script);
        self.next_script += 1;
        let mut action = ActionLogic::new(config);
        let now = self.now;
        let succeeded = {
            let mut ctx = LogicContext::new(self, source, LogicOwner::Script(id));
            action.should_execute(&mut ctx, activator) && action.execute(&mut ctx, now, activator)
        };
        self.retain_script(
            id,
            ScriptRun {
                source,
                config: config.clone(),
                action,
            },
        );
        succeeded
    }

    pub(super) fn retain_script(&mut self, id: ScriptId, run: ScriptRun) {
        let mut pending = Vec::new();
        run.action.collect_intervals(&mut pending);
        if !pending.is_empty() {
            self.scripts.insert(id, run);
        }
    }

    /// Fires every interval due at the current time that was scheduled
    /// before this pass began.
    pub(super) fn fire_due_intervals(&mut self) {
        let watermark = self.timers.watermark();
        while let Some((id, owner)) = self.timers.pop_due(self.now, watermark) {
            self.deliver_interval(id, owner);
        }
    }

    fn deliver_interval(&mut self, id: IntervalId, owner: LogicOwner) {
        let delivered = match owner {
            LogicOwner::Handler(key) => {
                let Some(mut handler) = self.take_handler(key) else {
                    trace!(target: "sim::scene", %id, handler = %key, "Interval owner gone");
                    return;
                };
                let delivered =
                    handler.fire_interval(&mut LogicContext::new(self, key.entity, owner), id);
                self.restore_handler(key, handler);
                delivered
            }
            LogicOwner::Behavior(actor) => {
                let mut delivered = false;
                self.with_behavior(actor, |behavior, ctx| {
                    delivered = behavior.fire_interval(ctx, id);
                });
                delivered
            }
            LogicOwner::Script(script) => {
                let Some(mut run) = self.scripts.remove(&script) else {
                    trace!(target: "sim::scene", %id, "Interval script gone");
                    return;
                };
                let delivered =
                    run.action.fire_interval(&mut LogicContext::new(self, run.source, owner), id);
                self.retain_script(script, run);
                delivered
            }
        };
        if !delivered {
            trace!(target: "sim::scene", %id, ?owner, "Interval had no receiver");
        }
    }
}
