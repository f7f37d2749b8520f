//! Condition evaluation.
//!
//! Conditions are side-effect free except `Limit` and `Cooldown`, which
//! consume uses as they are checked, and `Action`, which runs its action.

use chrono::{DateTime, Utc};
use rand::Rng;
use tracing::{debug, trace};

use super::{
    ActionLogic, ExpressionLogic, IntervalId, LogicContext, LogicNode, RegionLogic, TargetLogic,
    TransferContext, quantify,
};
use crate::schema::{ConditionConfig, LogicClass};
use crate::state::{EntityKey, Timestamp, Value};

#[derive(Debug)]
pub enum ConditionLogic {
    Tagged {
        target: TargetLogic,
        tag: String,
        all: bool,
    },
    InstanceOf {
        target: TargetLogic,
        class: LogicClass,
        all: bool,
    },
    Intersecting {
        first: RegionLogic,
        second: RegionLogic,
        all_first: bool,
        all_second: bool,
    },
    DistanceWithin {
        first: TargetLogic,
        second: TargetLogic,
        minimum: f32,
        maximum: f32,
        all_first: bool,
        all_second: bool,
    },
    Random {
        probability: f32,
    },
    Limit {
        remaining: u32,
    },
    Cooldown {
        period: i64,
        next_allowed: Option<Timestamp>,
    },
    All(Vec<ConditionLogic>),
    Any(Vec<ConditionLogic>),
    FlagSet {
        target: TargetLogic,
        flag: String,
        all: bool,
    },
    Not(Box<ConditionLogic>),
    Always,
    Evaluate(ExpressionLogic),
    Action(Box<ActionLogic>),
    Is {
        first: TargetLogic,
        second: TargetLogic,
        all: bool,
    },
    DateRange {
        start: Option<DateTime<Utc>>,
        end: Option<DateTime<Utc>>,
    },
}

impl ConditionLogic {
    pub fn new(config: &ConditionConfig) -> Self {
        match config {
            ConditionConfig::Tagged { target, tag, all } => ConditionLogic::Tagged {
                target: TargetLogic::new(target),
                tag: tag.clone(),
                all: *all,
            },
            ConditionConfig::InstanceOf { target, class, all } => ConditionLogic::InstanceOf {
                target: TargetLogic::new(target),
                class: *class,
                all: *all,
            },
            ConditionConfig::Intersecting {
                first,
                second,
                all_first,
                all_second,
            } => ConditionLogic::Intersecting {
                first: RegionLogic::new(first),
                second: RegionLogic::new(second),
                all_first: *all_first,
                all_second: *all_second,
            },
            ConditionConfig::DistanceWithin {
                first,
                second,
                minimum,
                maximum,
                all_first,
                all_second,
            } => ConditionLogic::DistanceWithin {
                first: TargetLogic::new(first),
                second: TargetLogic::new(second),
                minimum: *minimum,
                maximum: *maximum,
                all_first: *all_first,
                all_second: *all_second,
            },
            ConditionConfig::Random { probability } => ConditionLogic::Random {
                probability: *probability,
            },
            ConditionConfig::Limit { limit } => ConditionLogic::Limit { remaining: *limit },
            ConditionConfig::Cooldown { period } => ConditionLogic::Cooldown {
                period: *period,
                next_allowed: None,
            },
            ConditionConfig::All(conditions) => {
                ConditionLogic::All(conditions.iter().map(Self::new).collect())
            }
            ConditionConfig::Any(conditions) => {
                ConditionLogic::Any(conditions.iter().map(Self::new).collect())
            }
            ConditionConfig::FlagSet { target, flag, all } => ConditionLogic::FlagSet {
                target: TargetLogic::new(target),
                flag: flag.clone(),
                all: *all,
            },
            ConditionConfig::Not(inner) => ConditionLogic::Not(Box::new(Self::new(inner))),
            ConditionConfig::Always => ConditionLogic::Always,
            ConditionConfig::Evaluate(expression) => {
                ConditionLogic::Evaluate(ExpressionLogic::new(expression))
            }
            ConditionConfig::Action(action) => {
                ConditionLogic::Action(Box::new(ActionLogic::new(action)))
            }
            ConditionConfig::Is { first, second, all } => ConditionLogic::Is {
                first: TargetLogic::new(first),
                second: TargetLogic::new(second),
                all: *all,
            },
            ConditionConfig::DateRange { start, end } => ConditionLogic::DateRange {
                start: *start,
                end: *end,
            },
        }
    }

    pub fn is_satisfied(&mut self, ctx: &mut LogicContext<'_>, activator: Option<EntityKey>) -> bool {
        match self {
            ConditionLogic::Tagged { target, tag, all } => {
                let keys = target.resolve_all(ctx, activator);
                quantify(*all, keys, |key| {
                    ctx.scene.logic(key).is_some_and(|logic| logic.has_tag(tag))
                })
            }
            ConditionLogic::InstanceOf { target, class, all } => {
                let keys = target.resolve_all(ctx, activator);
                quantify(*all, keys, |key| ctx.scene.is_instance_of(key, *class))
            }
            ConditionLogic::Intersecting {
                first,
                second,
                all_first,
                all_second,
            } => {
                let first = first.resolve_all(ctx, activator);
                let second = second.resolve_all(ctx, activator);
                quantify(*all_first, &first, |a| {
                    quantify(*all_second, &second, |b| a.intersects(b))
                })
            }
            ConditionLogic::DistanceWithin {
                first,
                second,
                minimum,
                maximum,
                all_first,
                all_second,
            } => {
                let positions = |ctx: &LogicContext<'_>, keys: Vec<EntityKey>| {
                    keys.into_iter()
                        .filter_map(|key| ctx.scene.logic(key))
                        .map(|logic| logic.transform.translation)
                        .collect::<Vec<_>>()
                };
                let first = first.resolve_all(ctx, activator);
                let first = positions(ctx, first);
                let second = second.resolve_all(ctx, activator);
                let second = positions(ctx, second);
                quantify(*all_first, &first, |a| {
                    quantify(*all_second, &second, |b| {
                        let distance = a.distance(*b);
                        distance >= *minimum && distance <= *maximum
                    })
                })
            }
            ConditionLogic::Random { probability } => {
                if !(*probability > 0.0) {
                    return false;
                }
                ctx.scene.rng().gen_bool(f64::from(probability.min(1.0)))
            }
            ConditionLogic::Limit { remaining } => {
                if *remaining == 0 {
                    return false;
                }
                *remaining -= 1;
                true
            }
            ConditionLogic::Cooldown {
                period,
                next_allowed,
            } => {
                let now = ctx.now();
                if next_allowed.is_some_and(|next| now <= next) {
                    trace!(target: "sim::condition", %now, "Cooldown active");
                    return false;
                }
                *next_allowed = Some(now + *period);
                true
            }
            ConditionLogic::All(conditions) => conditions
                .iter_mut()
                .all(|condition| condition.is_satisfied(ctx, activator)),
            ConditionLogic::Any(conditions) => conditions
                .iter_mut()
                .any(|condition| condition.is_satisfied(ctx, activator)),
            ConditionLogic::FlagSet { target, flag, all } => {
                let keys = target.resolve_all(ctx, activator);
                quantify(*all, keys, |key| {
                    key.actor()
                        .and_then(|id| ctx.scene.actor(id))
                        .and_then(|actor| actor.flag(flag))
                        .unwrap_or(false)
                })
            }
            ConditionLogic::Not(inner) => !inner.is_satisfied(ctx, activator),
            ConditionLogic::Always => true,
            ConditionLogic::Evaluate(expression) => {
                expression.evaluate(ctx, activator, &Value::Null).to_bool()
            }
            ConditionLogic::Action(action) => {
                let now = ctx.now();
                action.execute(ctx, now, activator)
            }
            ConditionLogic::Is { first, second, all } => {
                let first = first.resolve_all(ctx, activator);
                let second = second.resolve_all(ctx, activator);
                quantify(*all, first, |key| second.contains(&key))
            }
            ConditionLogic::DateRange { start, end } => {
                let now = match ctx.scene.env().clock() {
                    Ok(clock) => clock.now(),
                    Err(error) => {
                        debug!(target: "sim::condition", %error, "Date range without a clock");
                        return false;
                    }
                };
                start.is_none_or(|start| now >= start) && end.is_none_or(|end| now <= end)
            }
        }
    }
}

impl LogicNode for ConditionLogic {
    fn fire_interval(&mut self, ctx: &mut LogicContext<'_>, id: IntervalId) -> bool {
        match self {
            ConditionLogic::Tagged { target, .. }
            | ConditionLogic::InstanceOf { target, .. }
            | ConditionLogic::FlagSet { target, .. } => target.fire_interval(ctx, id),
            ConditionLogic::Intersecting { first, second, .. } => {
                first.fire_interval(ctx, id) || second.fire_interval(ctx, id)
            }
            ConditionLogic::DistanceWithin { first, second, .. }
            | ConditionLogic::Is { first, second, .. } => {
                first.fire_interval(ctx, id) || second.fire_interval(ctx, id)
            }
            ConditionLogic::All(conditions) | ConditionLogic::Any(conditions) => {
                conditions.fire_interval(ctx, id)
            }
            ConditionLogic::Not(inner) => inner.fire_interval(ctx, id),
            ConditionLogic::Evaluate(expression) => expression.fire_interval(ctx, id),
            ConditionLogic::Action(action) => action.fire_interval(ctx, id),
            ConditionLogic::Random { .. }
            | ConditionLogic::Limit { .. }
            | ConditionLogic::Cooldown { .. }
            | ConditionLogic::Always
            | ConditionLogic::DateRange { .. } => false,
        }
    }

    fn collect_intervals(&self, out: &mut Vec<IntervalId>) {
        match self {
            ConditionLogic::Tagged { target, .. }
            | ConditionLogic::InstanceOf { target, .. }
            | ConditionLogic::FlagSet { target, .. } => target.collect_intervals(out),
            ConditionLogic::Intersecting { first, second, .. } => {
                first.collect_intervals(out);
                second.collect_intervals(out);
            }
            ConditionLogic::DistanceWithin { first, second, .. }
            | ConditionLogic::Is { first, second, .. } => {
                first.collect_intervals(out);
                second.collect_intervals(out);
            }
            ConditionLogic::All(conditions) | ConditionLogic::Any(conditions) => {
                conditions.collect_intervals(out)
            }
            ConditionLogic::Not(inner) => inner.collect_intervals(out),
            ConditionLogic::Evaluate(expression) => expression.collect_intervals(out),
            ConditionLogic::Action(action) => action.collect_intervals(out),
            ConditionLogic::Random { .. }
            | ConditionLogic::Limit { .. }
            | ConditionLogic::Cooldown { .. }
            | ConditionLogic::Always
            | ConditionLogic::DateRange { .. } => {}
        }
    }

    fn transfer(&mut self, source: &Self, tx: &mut TransferContext<'_>) {
        match (self, source) {
            (ConditionLogic::Limit { remaining }, ConditionLogic::Limit { remaining: from }) => {
                *remaining = *from;
            }
            (
                ConditionLogic::Cooldown { next_allowed, .. },
                ConditionLogic::Cooldown {
                    next_allowed: from, ..
                },
            ) => *next_allowed = *from,
            (ConditionLogic::Tagged { target, .. }, ConditionLogic::Tagged { target: from, .. })
            | (
                ConditionLogic::InstanceOf { target, .. },
                ConditionLogic::InstanceOf { target: from, .. },
            )
            | (ConditionLogic::FlagSet { target, .. }, ConditionLogic::FlagSet { target: from, .. }) => {
                target.transfer(from, tx)
            }
            (
                ConditionLogic::Intersecting { first, second, .. },
                ConditionLogic::Intersecting {
                    first: from_first,
                    second: from_second,
                    ..
                },
            ) => {
                first.transfer(from_first, tx);
                second.transfer(from_second, tx);
            }
            (
                ConditionLogic::DistanceWithin { first, second, .. },
                ConditionLogic::DistanceWithin {
                    first: from_first,
                    second: from_second,
                    ..
                },
            )
            | (
                ConditionLogic::Is { first, second, .. },
                ConditionLogic::Is {
                    first: from_first,
                    second: from_second,
                    ..
                },
            ) => {
                first.transfer(from_first, tx);
                second.transfer(from_second, tx);
            }
            (ConditionLogic::All(conditions), ConditionLogic::All(from))
            | (ConditionLogic::Any(conditions), ConditionLogic::Any(from)) => {
                conditions.transfer(from, tx)
            }
            (ConditionLogic::Not(inner), ConditionLogic::Not(from)) => inner.transfer(from, tx),
            (ConditionLogic::Evaluate(expression), ConditionLogic::Evaluate(from)) => {
                expression.transfer(from, tx)
            }
            (ConditionLogic::Action(action), ConditionLogic::Action(from)) => {
                action.transfer(from, tx)
            }
            _ => {}
        }
    }
}
