//! Action execution.
//!
//! `execute` reports a success flag that enclosing control flow (compound,
//! conditional, switch, condition-as-action) reacts to. Side effects are
//! applied immediately through the scene; nothing here propagates errors.
mod actor;
mod delayed;
mod spawn;

pub use delayed::{DelayedLogic, PendingAction};
pub use spawn::{Placement, SpawnLogic};

use rand::Rng;
use tracing::{debug, error, info, trace, warn};

use super::{
    ConditionLogic, ExpressionLogic, IntervalId, LogicContext, LogicNode, TargetLogic,
    TransferContext,
};
use crate::env::ClientAction;
use crate::geom::Transform;
use crate::schema::{ActionConfig, LogLevel};
use crate::state::{EntityKey, Timestamp, Value};

#[derive(Debug)]
pub enum ActionLogic {
    Spawn(SpawnLogic),
    Destroy {
        target: TargetLogic,
        end_scene: bool,
    },
    Rotate {
        target: TargetLogic,
        rotation: f32,
        variable: Option<String>,
    },
    Warp {
        target: TargetLogic,
        location: TargetLogic,
        /// Local offset composed into the location's frame.
        transform: Option<Transform>,
    },
    FireEffect {
        effect: String,
        location: TargetLogic,
    },
    Signal {
        target: TargetLogic,
        name: String,
    },
    MoveBody {
        target: TargetLogic,
        scene: String,
        portal: Option<String>,
    },
    MoveAll {
        scene: String,
        portal: Option<String>,
    },
    Conditional {
        condition: ConditionLogic,
        action: Box<ActionLogic>,
        otherwise: Option<Box<ActionLogic>>,
        /// Result of a satisfied `should_execute` check, consumed by `execute`.
        checked: Option<bool>,
    },
    Switch {
        cases: Vec<(ConditionLogic, ActionLogic)>,
        default: Option<Box<ActionLogic>>,
    },
    ExpressionSwitch {
        expression: ExpressionLogic,
        cases: Vec<(Value, ActionLogic)>,
        default: Option<Box<ActionLogic>>,
    },
    Compound {
        actions: Vec<ActionLogic>,
        stop_on_failure: bool,
    },
    Random {
        actions: Vec<(f32, ActionLogic)>,
    },
    Delayed(DelayedLogic),
    SetVariable {
        target: TargetLogic,
        name: String,
        value: ExpressionLogic,
    },
    SetFlag {
        target: TargetLogic,
        flag: String,
        value: bool,
    },
    ForceClientAction {
        target: TargetLogic,
        action: ClientAction,
    },
    Targeted {
        target: TargetLogic,
        action: Box<ActionLogic>,
    },
    ServerLog {
        level: LogLevel,
        message: String,
    },
    Fail(Box<ActionLogic>),
}

impl ActionLogic {
    pub fn new(config: &ActionConfig) -> Self {
        let boxed = |config: &ActionConfig| Box::new(Self::new(config));
        match config {
            ActionConfig::SpawnActor {
                actor,
                location,
                rotation,
                variance,
                relative,
            } => ActionLogic::Spawn(SpawnLogic::new(
                actor,
                location,
                Placement::Fixed {
                    rotation: *rotation,
                    variance: variance.abs(),
                    relative: *relative,
                },
            )),
            ActionConfig::SpawnTransformedActor {
                actor,
                location,
                transform,
            } => ActionLogic::Spawn(SpawnLogic::new(
                actor,
                location,
                Placement::Transformed(*transform),
            )),
            ActionConfig::SpawnFacingActor {
                actor,
                location,
                facing,
            } => ActionLogic::Spawn(SpawnLogic::new(
                actor,
                location,
                Placement::Facing(TargetLogic::new(facing)),
            )),
            ActionConfig::SpawnRandomTranslatedActor {
                actor,
                location,
                count,
                step,
                range,
                collision_mask,
            } => ActionLogic::Spawn(SpawnLogic::new(
                actor,
                location,
                Placement::RandomTranslated {
                    count: *count,
                    step: *step,
                    range: (*range).max(0),
                    collision_mask: *collision_mask,
                },
            )),
            ActionConfig::DestroyActor { target, end_scene } => ActionLogic::Destroy {
                target: TargetLogic::new(target),
                end_scene: *end_scene,
            },
            ActionConfig::RotateActor {
                target,
                rotation,
                variable,
            } => ActionLogic::Rotate {
                target: TargetLogic::new(target),
                rotation: *rotation,
                variable: variable.clone(),
            },
            ActionConfig::WarpActor { target, location } => ActionLogic::Warp {
                target: TargetLogic::new(target),
                location: TargetLogic::new(location),
                transform: None,
            },
            ActionConfig::WarpTransformedActor {
                target,
                location,
                transform,
            } => ActionLogic::Warp {
                target: TargetLogic::new(target),
                location: TargetLogic::new(location),
                transform: Some(*transform),
            },
            ActionConfig::FireEffect { effect, location } => ActionLogic::FireEffect {
                effect: effect.clone(),
                location: TargetLogic::new(location),
            },
            ActionConfig::Signal { target, name } => ActionLogic::Signal {
                target: TargetLogic::new(target),
                name: name.clone(),
            },
            ActionConfig::MoveBody {
                target,
                scene,
                portal,
            } => ActionLogic::MoveBody {
                target: TargetLogic::new(target),
                scene: scene.clone(),
                portal: portal.clone(),
            },
            ActionConfig::MoveAll { scene, portal } => ActionLogic::MoveAll {
                scene: scene.clone(),
                portal: portal.clone(),
            },
            ActionConfig::Conditional {
                condition,
                action,
                otherwise,
            } => ActionLogic::Conditional {
                condition: ConditionLogic::new(condition),
                action: boxed(action),
                otherwise: otherwise.as_deref().map(boxed),
                checked: None,
            },
            ActionConfig::Switch { cases, default } => ActionLogic::Switch {
                cases: cases
                    .iter()
                    .map(|case| (ConditionLogic::new(&case.condition), Self::new(&case.action)))
                    .collect(),
                default: default.as_deref().map(boxed),
            },
            ActionConfig::ExpressionSwitch {
                expression,
                cases,
                default,
            } => ActionLogic::ExpressionSwitch {
                expression: ExpressionLogic::new(expression),
                cases: cases
                    .iter()
                    .map(|case| (case.value.clone(), Self::new(&case.action)))
                    .collect(),
                default: default.as_deref().map(boxed),
            },
            ActionConfig::Compound {
                actions,
                stop_on_failure,
            } => ActionLogic::Compound {
                actions: actions.iter().map(Self::new).collect(),
                stop_on_failure: *stop_on_failure,
            },
            ActionConfig::Random { actions } => ActionLogic::Random {
                actions: actions
                    .iter()
                    .map(|weighted| (weighted.weight, Self::new(&weighted.action)))
                    .collect(),
            },
            ActionConfig::Delayed {
                action,
                delay,
                variance,
            } => ActionLogic::Delayed(DelayedLogic::new(Self::new(action), *delay, *variance)),
            ActionConfig::SetVariable {
                target,
                name,
                value,
            } => ActionLogic::SetVariable {
                target: TargetLogic::new(target),
                name: name.clone(),
                value: ExpressionLogic::new(value),
            },
            ActionConfig::SetFlag {
                target,
                flag,
                value,
            } => ActionLogic::SetFlag {
                target: TargetLogic::new(target),
                flag: flag.clone(),
                value: *value,
            },
            ActionConfig::ForceClientAction { target, action } => {
                ActionLogic::ForceClientAction {
                    target: TargetLogic::new(target),
                    action: action.clone(),
                }
            }
            ActionConfig::Targeted { target, action } => ActionLogic::Targeted {
                target: TargetLogic::new(target),
                action: boxed(action),
            },
            ActionConfig::ServerLog { level, message } => ActionLogic::ServerLog {
                level: *level,
                message: message.clone(),
            },
            ActionConfig::Fail(action) => ActionLogic::Fail(boxed(action)),
        }
    }

    /// Cheap pre-check used by composite actions. A false answer means
    /// `execute` would do nothing and report failure.
    pub fn should_execute(&mut self, ctx: &mut LogicContext<'_>, activator: Option<EntityKey>) -> bool {
        match self {
            ActionLogic::Conditional {
                condition,
                otherwise,
                checked,
                ..
            } => {
                if otherwise.is_some() {
                    return true;
                }
                let satisfied = condition.is_satisfied(ctx, activator);
                *checked = satisfied.then_some(true);
                satisfied
            }
            _ => true,
        }
    }

    pub fn execute(
        &mut self,
        ctx: &mut LogicContext<'_>,
        timestamp: Timestamp,
        activator: Option<EntityKey>,
    ) -> bool {
        match self {
            ActionLogic::Spawn(spawn) => spawn.execute(ctx, activator),
            ActionLogic::Destroy { target, end_scene } => {
                let keys = target.resolve_all(ctx, activator);
                actor::destroy(ctx, &keys, *end_scene)
            }
            ActionLogic::Rotate {
                target,
                rotation,
                variable,
            } => {
                let delta = match variable {
                    Some(name) => ctx
                        .scene
                        .logic(ctx.source)
                        .map_or(0.0, |logic| logic.variable(name).to_f64() as f32),
                    None => *rotation,
                };
                let keys = target.resolve_all(ctx, activator);
                actor::rotate(ctx, &keys, delta)
            }
            ActionLogic::Warp {
                target,
                location,
                transform,
            } => {
                let Some(destination) = location
                    .resolve_first(ctx, activator)
                    .and_then(|key| ctx.scene.logic(key))
                    .map(|logic| match transform {
                        Some(local) => logic.transform.compose(local),
                        None => logic.transform,
                    })
                else {
                    trace!(target: "sim::action", "Warp without a location");
                    return false;
                };
                let keys = target.resolve_all(ctx, activator);
                actor::warp(ctx, &keys, destination)
            }
            ActionLogic::FireEffect { effect, location } => {
                for key in location.resolve_all(ctx, activator) {
                    if let Some(transform) = ctx.scene.logic(key).map(|logic| logic.transform) {
                        ctx.scene.fire_effect(effect, transform, Some(ctx.source));
                    }
                }
                true
            }
            ActionLogic::Signal { target, name } => {
                let keys = target.resolve_all(ctx, activator);
                for key in &keys {
                    ctx.scene.signal(*key, name, Some(ctx.source));
                }
                !keys.is_empty()
            }
            ActionLogic::MoveBody {
                target,
                scene,
                portal,
            } => {
                let keys = target.resolve_all(ctx, activator);
                actor::move_body(ctx, &keys, scene, portal.as_deref())
            }
            ActionLogic::MoveAll { scene, portal } => {
                for occupant in ctx.scene.occupants() {
                    if let Err(error) = ctx.scene.move_body(occupant.into(), scene, portal.as_deref()) {
                        warn!(target: "sim::action", %occupant, %error, "Failed to move occupant");
                    }
                }
                true
            }
            ActionLogic::Conditional {
                condition,
                action,
                otherwise,
                checked,
            } => {
                let satisfied = match checked.take() {
                    Some(satisfied) => satisfied,
                    None => condition.is_satisfied(ctx, activator),
                };
                if satisfied {
                    action.execute(ctx, timestamp, activator)
                } else if let Some(otherwise) = otherwise {
                    otherwise.execute(ctx, timestamp, activator)
                } else {
                    false
                }
            }
            ActionLogic::Switch { cases, default } => {
                for (condition, action) in cases.iter_mut() {
                    if condition.is_satisfied(ctx, activator) {
                        return action.execute(ctx, timestamp, activator);
                    }
                }
                default
                    .as_mut()
                    .is_some_and(|action| action.execute(ctx, timestamp, activator))
            }
            ActionLogic::ExpressionSwitch {
                expression,
                cases,
                default,
            } => {
                let value = expression.evaluate(ctx, activator, &Value::Null);
                if let Some((_, action)) = cases.iter_mut().find(|(case, _)| *case == value) {
                    return action.execute(ctx, timestamp, activator);
                }
                default
                    .as_mut()
                    .is_some_and(|action| action.execute(ctx, timestamp, activator))
            }
            ActionLogic::Compound {
                actions,
                stop_on_failure,
            } => {
                let mut result = false;
                for action in actions.iter_mut() {
                    let success = action.should_execute(ctx, activator)
                        && action.execute(ctx, timestamp, activator);
                    result |= success;
                    if *stop_on_failure && !success {
                        break;
                    }
                }
                result
            }
            ActionLogic::Random { actions } => {
                let total: f32 = actions.iter().map(|(weight, _)| weight.max(0.0)).sum();
                if !(total > 0.0 && total.is_finite()) {
                    return true;
                }
                let mut pick = ctx.scene.rng().gen_range(0.0..total);
                let mut chosen = None;
                for (index, (weight, _)) in actions.iter().enumerate() {
                    if !(*weight > 0.0) {
                        continue;
                    }
                    chosen = Some(index);
                    if pick < *weight {
                        break;
                    }
                    pick -= weight;
                }
                // Rounding can leave `pick` past the last bucket; the last
                // positive weight wins then.
                match chosen {
                    Some(index) => actions[index].1.execute(ctx, timestamp, activator),
                    None => true,
                }
            }
            ActionLogic::Delayed(delayed) => delayed.execute(ctx, timestamp, activator),
            ActionLogic::SetVariable {
                target,
                name,
                value,
            } => {
                let keys = target.resolve_all(ctx, activator);
                for key in &keys {
                    let previous = ctx
                        .scene
                        .logic(*key)
                        .map(|logic| logic.variable(name))
                        .unwrap_or_default();
                    let next = value.evaluate(ctx, activator, &previous);
                    ctx.scene.set_variable(*key, name, next, activator);
                }
                !keys.is_empty()
            }
            ActionLogic::SetFlag {
                target,
                flag,
                value,
            } => {
                let keys = target.resolve_all(ctx, activator);
                actor::set_flag(ctx, &keys, flag, *value)
            }
            ActionLogic::ForceClientAction { target, action } => {
                let keys = target.resolve_all(ctx, activator);
                actor::force_client_action(ctx, &keys, action)
            }
            ActionLogic::Targeted { target, action } => {
                let mut result = false;
                for key in target.resolve_all(ctx, activator) {
                    result |= action.execute(ctx, timestamp, Some(key));
                }
                result
            }
            ActionLogic::ServerLog { level, message } => {
                let source = ctx.source;
                let activator = activator.map(|key| key.to_string()).unwrap_or_default();
                match level {
                    LogLevel::Trace => trace!(target: "sim::script", %source, %activator, "{message}"),
                    LogLevel::Debug => debug!(target: "sim::script", %source, %activator, "{message}"),
                    LogLevel::Info => info!(target: "sim::script", %source, %activator, "{message}"),
                    LogLevel::Warn => warn!(target: "sim::script", %source, %activator, "{message}"),
                    LogLevel::Error => error!(target: "sim::script", %source, %activator, "{message}"),
                }
                true
            }
            ActionLogic::Fail(action) => {
                action.execute(ctx, timestamp, activator);
                false
            }
        }
    }
}

impl LogicNode for ActionLogic {
    fn fire_interval(&mut self, ctx: &mut LogicContext<'_>, id: IntervalId) -> bool {
        match self {
            ActionLogic::Spawn(spawn) => spawn.fire_interval(ctx, id),
            ActionLogic::Destroy { target, .. }
            | ActionLogic::Signal { target, .. }
            | ActionLogic::MoveBody { target, .. }
            | ActionLogic::SetFlag { target, .. }
            | ActionLogic::ForceClientAction { target, .. }
            | ActionLogic::Rotate { target, .. } => target.fire_interval(ctx, id),
            ActionLogic::Warp {
                target, location, ..
            } => target.fire_interval(ctx, id) || location.fire_interval(ctx, id),
            ActionLogic::FireEffect { location, .. } => location.fire_interval(ctx, id),
            ActionLogic::Conditional {
                condition,
                action,
                otherwise,
                ..
            } => {
                condition.fire_interval(ctx, id)
                    || action.fire_interval(ctx, id)
                    || otherwise.fire_interval(ctx, id)
            }
            ActionLogic::Switch { cases, default } => {
                cases.iter_mut().any(|(condition, action)| {
                    condition.fire_interval(ctx, id) || action.fire_interval(ctx, id)
                }) || default.fire_interval(ctx, id)
            }
            ActionLogic::ExpressionSwitch {
                expression,
                cases,
                default,
            } => {
                expression.fire_interval(ctx, id)
                    || cases
                        .iter_mut()
                        .any(|(_, action)| action.fire_interval(ctx, id))
                    || default.fire_interval(ctx, id)
            }
            ActionLogic::Compound { actions, .. } => actions.fire_interval(ctx, id),
            ActionLogic::Random { actions } => actions
                .iter_mut()
                .any(|(_, action)| action.fire_interval(ctx, id)),
            ActionLogic::Delayed(delayed) => delayed.fire_interval(ctx, id),
            ActionLogic::SetVariable { target, value, .. } => {
                target.fire_interval(ctx, id) || value.fire_interval(ctx, id)
            }
            ActionLogic::Targeted { target, action } => {
                target.fire_interval(ctx, id) || action.fire_interval(ctx, id)
            }
            ActionLogic::Fail(action) => action.fire_interval(ctx, id),
            ActionLogic::MoveAll { .. } | ActionLogic::ServerLog { .. } => false,
        }
    }

    fn collect_intervals(&self, out: &mut Vec<IntervalId>) {
        match self {
            ActionLogic::Spawn(spawn) => spawn.collect_intervals(out),
            ActionLogic::Destroy { target, .. }
            | ActionLogic::Signal { target, .. }
            | ActionLogic::MoveBody { target, .. }
            | ActionLogic::SetFlag { target, .. }
            | ActionLogic::ForceClientAction { target, .. }
            | ActionLogic::Rotate { target, .. } => target.collect_intervals(out),
            ActionLogic::Warp {
                target, location, ..
            } => {
                target.collect_intervals(out);
                location.collect_intervals(out);
            }
            ActionLogic::FireEffect { location, .. } => location.collect_intervals(out),
            ActionLogic::Conditional {
                condition,
                action,
                otherwise,
                ..
            } => {
                condition.collect_intervals(out);
                action.collect_intervals(out);
                otherwise.collect_intervals(out);
            }
            ActionLogic::Switch { cases, default } => {
                for (condition, action) in cases {
                    condition.collect_intervals(out);
                    action.collect_intervals(out);
                }
                default.collect_intervals(out);
            }
            ActionLogic::ExpressionSwitch {
                expression,
                cases,
                default,
            } => {
                expression.collect_intervals(out);
                for (_, action) in cases {
                    action.collect_intervals(out);
                }
                default.collect_intervals(out);
            }
            ActionLogic::Compound { actions, .. } => actions.collect_intervals(out),
            ActionLogic::Random { actions } => {
                for (_, action) in actions {
                    action.collect_intervals(out);
                }
            }
            ActionLogic::Delayed(delayed) => delayed.collect_intervals(out),
            ActionLogic::SetVariable { target, value, .. } => {
                target.collect_intervals(out);
                value.collect_intervals(out);
            }
            ActionLogic::Targeted { target, action } => {
                target.collect_intervals(out);
                action.collect_intervals(out);
            }
            ActionLogic::Fail(action) => action.collect_intervals(out),
            ActionLogic::MoveAll { .. } | ActionLogic::ServerLog { .. } => {}
        }
    }

    fn transfer(&mut self, source: &Self, tx: &mut TransferContext<'_>) {
        match (self, source) {
            (ActionLogic::Spawn(spawn), ActionLogic::Spawn(from)) => spawn.transfer(from, tx),
            (ActionLogic::Destroy { target, .. }, ActionLogic::Destroy { target: from, .. })
            | (ActionLogic::Signal { target, .. }, ActionLogic::Signal { target: from, .. })
            | (ActionLogic::MoveBody { target, .. }, ActionLogic::MoveBody { target: from, .. })
            | (ActionLogic::SetFlag { target, .. }, ActionLogic::SetFlag { target: from, .. })
            | (
                ActionLogic::ForceClientAction { target, .. },
                ActionLogic::ForceClientAction { target: from, .. },
            )
            | (ActionLogic::Rotate { target, .. }, ActionLogic::Rotate { target: from, .. }) => {
                target.transfer(from, tx)
            }
            (
                ActionLogic::Warp {
                    target, location, ..
                },
                ActionLogic::Warp {
                    target: from_target,
                    location: from_location,
                    ..
                },
            ) => {
                target.transfer(from_target, tx);
                location.transfer(from_location, tx);
            }
            (
                ActionLogic::FireEffect { location, .. },
                ActionLogic::FireEffect { location: from, .. },
            ) => location.transfer(from, tx),
            (
                ActionLogic::Conditional {
                    condition,
                    action,
                    otherwise,
                    ..
                },
                ActionLogic::Conditional {
                    condition: from_condition,
                    action: from_action,
                    otherwise: from_otherwise,
                    ..
                },
            ) => {
                condition.transfer(from_condition, tx);
                action.transfer(from_action, tx);
                otherwise.transfer(from_otherwise, tx);
            }
            (
                ActionLogic::Switch { cases, default },
                ActionLogic::Switch {
                    cases: from_cases,
                    default: from_default,
                },
            ) => {
                for ((condition, action), (from_condition, from_action)) in
                    cases.iter_mut().zip(from_cases)
                {
                    condition.transfer(from_condition, tx);
                    action.transfer(from_action, tx);
                }
                default.transfer(from_default, tx);
            }
            (
                ActionLogic::ExpressionSwitch {
                    expression,
                    cases,
                    default,
                },
                ActionLogic::ExpressionSwitch {
                    expression: from_expression,
                    cases: from_cases,
                    default: from_default,
                },
            ) => {
                expression.transfer(from_expression, tx);
                for ((_, action), (_, from_action)) in cases.iter_mut().zip(from_cases) {
                    action.transfer(from_action, tx);
                }
                default.transfer(from_default, tx);
            }
            (ActionLogic::Compound { actions, .. }, ActionLogic::Compound { actions: from, .. }) => {
                actions.transfer(from, tx)
            }
            (ActionLogic::Random { actions }, ActionLogic::Random { actions: from }) => {
                for ((_, action), (_, from_action)) in actions.iter_mut().zip(from) {
                    action.transfer(from_action, tx);
                }
            }
            (ActionLogic::Delayed(delayed), ActionLogic::Delayed(from)) => {
                delayed.transfer(from, tx)
            }
            (
                ActionLogic::SetVariable { target, value, .. },
                ActionLogic::SetVariable {
                    target: from_target,
                    value: from_value,
                    ..
                },
            ) => {
                target.transfer(from_target, tx);
                value.transfer(from_value, tx);
            }
            (
                ActionLogic::Targeted { target, action },
                ActionLogic::Targeted {
                    target: from_target,
                    action: from_action,
                },
            ) => {
                target.transfer(from_target, tx);
                action.transfer(from_action, tx);
            }
            (ActionLogic::Fail(action), ActionLogic::Fail(from)) => action.transfer(from, tx),
            _ => {}
        }
    }
}
