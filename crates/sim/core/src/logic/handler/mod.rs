//! Event handlers: bindings from scene events to actions.
//!
//! A handler never subscribes itself. The scene inspects [`HandlerLogic::listens`]
//! and [`HandlerLogic::sensor`] when the owner starts and routes matching
//! [`HandlerEvent`]s through `dispatch`; [`HandlerLogic::handle`] decides
//! whether the event runs the bound action.
mod timer;

pub use timer::{TimerFire, TimerState};

use tracing::trace;

use super::{ActionLogic, IntervalId, LogicContext, LogicNode, TransferContext};
use crate::schema::{HandlerConfig, HandlerKind, PopulationFilter, SensorConfig};
use crate::state::{ActorId, EntityKey};

/// Scene events delivered to handlers.
#[derive(Clone, Debug, PartialEq)]
pub enum HandlerEvent {
    Startup,
    Shutdown { end_scene: bool },
    Tick,
    Signal { name: String, activator: Option<EntityKey> },
    Request { name: String, activator: Option<EntityKey> },
    ActorAdded(ActorId),
    ActorRemoved(ActorId),
    OccupantEntered(ActorId),
    OccupantLeft(ActorId),
    VariableChanged { name: String, activator: Option<EntityKey> },
    /// An actor touched the handler's sensor this tick.
    SensorTrigger(ActorId),
    SensorEntered(ActorId),
    SensorLeft(ActorId),
    /// Number of matching actors inside the sensor before and after a tick.
    SensorCount { previous: usize, current: usize },
}

/// Scene-wide event streams a handler must be subscribed to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Listen {
    /// Only events addressed to the owner.
    Owner,
    Tick,
    Population,
    Occupants,
    Sensor,
}

#[derive(Debug)]
enum Trigger {
    Startup,
    Shutdown { end_scene: bool },
    Tick,
    Timer(TimerState),
    Signal { name: String },
    SignalStart { name: String, active: bool, received: bool },
    SignalStop {
        name: String,
        active: bool,
        received: bool,
        activator: Option<EntityKey>,
    },
    Intersection(SensorConfig),
    IntersectionStart(SensorConfig),
    IntersectionStop(SensorConfig),
    IntersectionCount {
        sensor: SensorConfig,
        threshold: usize,
        stop_action: Option<Box<ActionLogic>>,
    },
    Request { name: String },
    ActorAdded(PopulationFilter),
    ActorRemoved(PopulationFilter),
    OccupantEntered,
    OccupantLeft,
    VariableChanged { name: String },
}

#[derive(Debug)]
pub struct HandlerLogic {
    trigger: Trigger,
    action: ActionLogic,
}

impl HandlerLogic {
    pub fn new(config: &HandlerConfig) -> Self {
        let trigger = match &config.kind {
            HandlerKind::Startup => Trigger::Startup,
            HandlerKind::Shutdown { end_scene } => Trigger::Shutdown {
                end_scene: *end_scene,
            },
            HandlerKind::Tick => Trigger::Tick,
            HandlerKind::Timer {
                interval,
                offset,
                limit,
                warning,
            } => Trigger::Timer(TimerState::new(*interval, *offset, *limit, warning.as_deref())),
            HandlerKind::Signal { name } => Trigger::Signal { name: name.clone() },
            HandlerKind::SignalStart { name } => Trigger::SignalStart {
                name: name.clone(),
                active: false,
                received: false,
            },
            HandlerKind::SignalStop { name } => Trigger::SignalStop {
                name: name.clone(),
                active: false,
                received: false,
                activator: None,
            },
            HandlerKind::Intersection { sensor } => Trigger::Intersection(sensor.clone()),
            HandlerKind::IntersectionStart { sensor } => Trigger::IntersectionStart(sensor.clone()),
            HandlerKind::IntersectionStop { sensor } => Trigger::IntersectionStop(sensor.clone()),
            HandlerKind::IntersectionCount {
                sensor,
                threshold,
                stop_action,
            } => Trigger::IntersectionCount {
                sensor: sensor.clone(),
                threshold: *threshold as usize,
                stop_action: stop_action.as_deref().map(|action| Box::new(ActionLogic::new(action))),
            },
            HandlerKind::Request { name } => Trigger::Request { name: name.clone() },
            HandlerKind::ActorAdded { filter } => Trigger::ActorAdded(filter.clone()),
            HandlerKind::ActorRemoved { filter } => Trigger::ActorRemoved(filter.clone()),
            HandlerKind::OccupantEntered => Trigger::OccupantEntered,
            HandlerKind::OccupantLeft => Trigger::OccupantLeft,
            HandlerKind::VariableChanged { name } => {
                Trigger::VariableChanged { name: name.clone() }
            }
        };
        Self {
            trigger,
            action: ActionLogic::new(&config.action),
        }
    }

    pub fn listens(&self) -> Listen {
        match &self.trigger {
            Trigger::Tick | Trigger::SignalStart { .. } | Trigger::SignalStop { .. } => Listen::Tick,
            Trigger::ActorAdded(_) | Trigger::ActorRemoved(_) => Listen::Population,
            Trigger::OccupantEntered | Trigger::OccupantLeft => Listen::Occupants,
            Trigger::Intersection(_)
            | Trigger::IntersectionStart(_)
            | Trigger::IntersectionStop(_)
            | Trigger::IntersectionCount { .. } => Listen::Sensor,
            Trigger::Startup
            | Trigger::Shutdown { .. }
            | Trigger::Timer(_)
            | Trigger::Signal { .. }
            | Trigger::Request { .. }
            | Trigger::VariableChanged { .. } => Listen::Owner,
        }
    }

    pub fn sensor(&self) -> Option<&SensorConfig> {
        match &self.trigger {
            Trigger::Intersection(sensor)
            | Trigger::IntersectionStart(sensor)
            | Trigger::IntersectionStop(sensor)
            | Trigger::IntersectionCount { sensor, .. } => Some(sensor),
            _ => None,
        }
    }

    pub fn timer(&self) -> Option<&TimerState> {
        match &self.trigger {
            Trigger::Timer(timer) => Some(timer),
            _ => None,
        }
    }

    /// Reacts to `event`; returns whether an action ran.
    pub fn handle(&mut self, ctx: &mut LogicContext<'_>, event: &HandlerEvent) -> bool {
        let activator = match (&mut self.trigger, event) {
            (Trigger::Startup, HandlerEvent::Startup) => None,
            (Trigger::Timer(timer), HandlerEvent::Startup) => {
                timer.start(ctx);
                return false;
            }
            (
                Trigger::Shutdown { end_scene },
                HandlerEvent::Shutdown {
                    end_scene: scene_ending,
                },
            ) => {
                if *scene_ending && !*end_scene {
                    trace!(target: "sim::handler", source = %ctx.source, "Shutdown handler skipped at scene end");
                    return false;
                }
                None
            }
            (Trigger::Tick, HandlerEvent::Tick) => None,
            (Trigger::Signal { name }, HandlerEvent::Signal { name: signal, activator })
            | (Trigger::Request { name }, HandlerEvent::Request { name: signal, activator })
            | (
                Trigger::VariableChanged { name },
                HandlerEvent::VariableChanged {
                    name: signal,
                    activator,
                },
            ) => {
                if name.as_str() != signal.as_str() {
                    return false;
                }
                *activator
            }
            (
                Trigger::SignalStart {
                    name,
                    active,
                    received,
                },
                HandlerEvent::Signal {
                    name: signal,
                    activator,
                },
            ) => {
                if name.as_str() != signal.as_str() {
                    return false;
                }
                *received = true;
                if *active {
                    return false;
                }
                *active = true;
                *activator
            }
            (
                Trigger::SignalStop {
                    name,
                    active,
                    received,
                    activator: last,
                },
                HandlerEvent::Signal {
                    name: signal,
                    activator,
                },
            ) => {
                if name.as_str() == signal.as_str() {
                    *received = true;
                    *active = true;
                    *last = *activator;
                }
                return false;
            }
            (Trigger::SignalStart { active, received, .. }, HandlerEvent::Tick) => {
                *active = std::mem::take(received) && *active;
                return false;
            }
            (
                Trigger::SignalStop {
                    active,
                    received,
                    activator,
                    ..
                },
                HandlerEvent::Tick,
            ) => {
                if std::mem::take(received) || !*active {
                    return false;
                }
                *active = false;
                activator.take()
            }
            (Trigger::Intersection(_), HandlerEvent::SensorTrigger(actor))
            | (Trigger::IntersectionStart(_), HandlerEvent::SensorEntered(actor))
            | (Trigger::IntersectionStop(_), HandlerEvent::SensorLeft(actor)) => {
                Some(EntityKey::Actor(*actor))
            }
            (
                Trigger::IntersectionCount {
                    threshold,
                    stop_action,
                    ..
                },
                HandlerEvent::SensorCount { previous, current },
            ) => {
                if *previous < *threshold && *current >= *threshold {
                    None
                } else if *previous >= *threshold && *current < *threshold {
                    let now = ctx.now();
                    return stop_action
                        .as_mut()
                        .is_some_and(|action| action.execute(ctx, now, None));
                } else {
                    return false;
                }
            }
            (Trigger::ActorAdded(filter), HandlerEvent::ActorAdded(actor))
            | (Trigger::ActorRemoved(filter), HandlerEvent::ActorRemoved(actor)) => {
                if !matches_population(ctx, filter, *actor) {
                    return false;
                }
                Some(EntityKey::Actor(*actor))
            }
            (Trigger::OccupantEntered, HandlerEvent::OccupantEntered(actor))
            | (Trigger::OccupantLeft, HandlerEvent::OccupantLeft(actor)) => {
                Some(EntityKey::Actor(*actor))
            }
            _ => return false,
        };
        let now = ctx.now();
        self.action.execute(ctx, now, activator);
        true
    }
}

fn matches_population(ctx: &LogicContext<'_>, filter: &PopulationFilter, actor: ActorId) -> bool {
    let Some(actor) = ctx.scene.actor(actor) else {
        return false;
    };
    let config_matches =
        filter.configs.is_empty() || filter.configs.iter().any(|name| *name == actor.config().name);
    let tag_matches =
        filter.tags.is_empty() || filter.tags.iter().any(|tag| actor.base.has_tag(tag));
    config_matches && tag_matches
}

impl LogicNode for HandlerLogic {
    fn fire_interval(&mut self, ctx: &mut LogicContext<'_>, id: IntervalId) -> bool {
        if let Trigger::Timer(timer) = &mut self.trigger {
            match timer.fire(ctx, id) {
                Some(TimerFire::Expired) => {
                    let now = ctx.now();
                    self.action.execute(ctx, now, None);
                    return true;
                }
                Some(TimerFire::Warned) => return true,
                None => {
                    if timer.delegate(ctx, id) {
                        return true;
                    }
                }
            }
        }
        if let Trigger::IntersectionCount {
            stop_action: Some(action),
            ..
        } = &mut self.trigger
            && action.fire_interval(ctx, id)
        {
            return true;
        }
        self.action.fire_interval(ctx, id)
    }

    fn collect_intervals(&self, out: &mut Vec<IntervalId>) {
        match &self.trigger {
            Trigger::Timer(timer) => timer.collect_intervals(out),
            Trigger::IntersectionCount {
                stop_action: Some(action),
                ..
            } => action.collect_intervals(out),
            _ => {}
        }
        self.action.collect_intervals(out);
    }

    fn transfer(&mut self, source: &Self, tx: &mut TransferContext<'_>) {
        match (&mut self.trigger, &source.trigger) {
            (Trigger::Timer(timer), Trigger::Timer(from)) => timer.transfer(from, tx),
            (
                Trigger::SignalStart {
                    active, received, ..
                },
                Trigger::SignalStart {
                    active: from_active,
                    received: from_received,
                    ..
                },
            ) => {
                *active = *from_active;
                *received = *from_received;
            }
            (
                Trigger::SignalStop {
                    active,
                    received,
                    activator,
                    ..
                },
                Trigger::SignalStop {
                    active: from_active,
                    received: from_received,
                    activator: from_activator,
                    ..
                },
            ) => {
                *active = *from_active;
                *received = *from_received;
                *activator = tx.refs.map(*from_activator);
            }
            (
                Trigger::IntersectionCount {
                    stop_action: Some(action),
                    ..
                },
                Trigger::IntersectionCount {
                    stop_action: Some(from),
                    ..
                },
            ) => action.transfer(from, tx),
            _ => {}
        }
        self.action.transfer(&source.action, tx);
    }
}
