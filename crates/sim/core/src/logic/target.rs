//! Target resolution.
//!
//! Resolution always appends to the caller's collection so composite targets
//! can share one buffer. Only live entities are produced; an empty result is a
//! valid outcome, never an error.

use rand::seq::SliceRandom;

use super::{
    ConditionLogic, IntervalId, LogicContext, LogicNode, RegionLogic, TransferContext,
};
use crate::geom::Vector2;
use crate::schema::{LogicClass, TargetConfig};
use crate::state::EntityKey;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SubsetMode {
    Random,
    Nearest,
    Farthest,
}

#[derive(Debug)]
pub enum TargetLogic {
    Source,
    Activator,
    ActivatorOf(Box<TargetLogic>),
    Tagged(String),
    InstanceOf(LogicClass),
    Intersecting {
        region: Box<RegionLogic>,
        actors: bool,
        entries: bool,
    },
    Subset {
        mode: SubsetMode,
        target: Box<TargetLogic>,
        location: Box<TargetLogic>,
        size: usize,
    },
    Conditional {
        target: Box<TargetLogic>,
        condition: Box<ConditionLogic>,
    },
    Compound(Vec<TargetLogic>),
    Behavior(Box<TargetLogic>),
    Excluding {
        target: Box<TargetLogic>,
        excluded: Box<TargetLogic>,
    },
    Randomized(Box<TargetLogic>),
}

impl TargetLogic {
    pub fn new(config: &TargetConfig) -> Self {
        let boxed = |config: &TargetConfig| Box::new(Self::new(config));
        match config {
            TargetConfig::Source => TargetLogic::Source,
            TargetConfig::Activator => TargetLogic::Activator,
            TargetConfig::ActivatorOf(inner) => TargetLogic::ActivatorOf(boxed(inner)),
            TargetConfig::Tagged(tag) => TargetLogic::Tagged(tag.clone()),
            TargetConfig::InstanceOf(class) => TargetLogic::InstanceOf(*class),
            TargetConfig::Intersecting {
                region,
                actors,
                entries,
            } => TargetLogic::Intersecting {
                region: Box::new(RegionLogic::new(region)),
                actors: *actors,
                entries: *entries,
            },
            TargetConfig::RandomSubset { target, size } => TargetLogic::Subset {
                mode: SubsetMode::Random,
                target: boxed(target),
                location: Box::new(TargetLogic::Source),
                size: *size,
            },
            TargetConfig::NearestSubset {
                target,
                location,
                size,
            } => TargetLogic::Subset {
                mode: SubsetMode::Nearest,
                target: boxed(target),
                location: boxed(location),
                size: *size,
            },
            TargetConfig::FarthestSubset {
                target,
                location,
                size,
            } => TargetLogic::Subset {
                mode: SubsetMode::Farthest,
                target: boxed(target),
                location: boxed(location),
                size: *size,
            },
            TargetConfig::Conditional { target, condition } => TargetLogic::Conditional {
                target: boxed(target),
                condition: Box::new(ConditionLogic::new(condition)),
            },
            TargetConfig::Compound(targets) => {
                TargetLogic::Compound(targets.iter().map(Self::new).collect())
            }
            TargetConfig::Behavior(inner) => TargetLogic::Behavior(boxed(inner)),
            TargetConfig::Excluding { target, excluded } => TargetLogic::Excluding {
                target: boxed(target),
                excluded: boxed(excluded),
            },
            TargetConfig::Randomized(inner) => TargetLogic::Randomized(boxed(inner)),
        }
    }

    /// Appends the resolved entities to `out`.
    pub fn resolve(
        &mut self,
        ctx: &mut LogicContext<'_>,
        activator: Option<EntityKey>,
        out: &mut Vec<EntityKey>,
    ) {
        match self {
            TargetLogic::Source => {
                if ctx.scene.contains(ctx.source) {
                    out.push(ctx.source);
                }
            }
            TargetLogic::Activator => {
                if let Some(key) = activator
                    && ctx.scene.contains(key)
                {
                    out.push(key);
                }
            }
            TargetLogic::ActivatorOf(inner) => {
                let mut candidates = Vec::new();
                inner.resolve(ctx, activator, &mut candidates);
                for key in candidates {
                    let Some(actor) = key.actor().and_then(|id| ctx.scene.actor(id)) else {
                        continue;
                    };
                    if let Some(activated_by) = actor.activator()
                        && ctx.scene.contains(activated_by)
                    {
                        out.push(activated_by);
                    }
                }
            }
            TargetLogic::Tagged(tag) => out.extend(ctx.scene.tagged(tag)),
            TargetLogic::InstanceOf(class) => out.extend(ctx.scene.instances_of(*class)),
            TargetLogic::Intersecting {
                region,
                actors,
                entries,
            } => {
                let mut shapes = Vec::new();
                region.resolve(ctx, activator, &mut shapes);
                let start = out.len();
                for shape in &shapes {
                    if *actors {
                        out.extend(ctx.scene.intersecting_actors(shape).map(EntityKey::Actor));
                    }
                    if *entries {
                        out.extend(ctx.scene.intersecting_entries(shape).map(EntityKey::Entry));
                    }
                }
                dedup_from(out, start);
            }
            TargetLogic::Subset {
                mode,
                target,
                location,
                size,
            } => {
                let mut candidates = Vec::new();
                target.resolve(ctx, activator, &mut candidates);
                if candidates.len() > *size {
                    match mode {
                        SubsetMode::Random => {
                            let mut picked =
                                rand::seq::index::sample(ctx.scene.rng(), candidates.len(), *size)
                                    .into_vec();
                            picked.sort_unstable();
                            candidates = picked.into_iter().map(|index| candidates[index]).collect();
                        }
                        SubsetMode::Nearest | SubsetMode::Farthest => {
                            let mut locations = Vec::new();
                            location.resolve(ctx, activator, &mut locations);
                            let reference = Vector2::mean(
                                locations
                                    .iter()
                                    .filter_map(|key| ctx.scene.logic(*key))
                                    .map(|logic| logic.transform.translation),
                            )
                            .unwrap_or(Vector2::ZERO);
                            let distance = |key: &EntityKey| {
                                ctx.scene
                                    .logic(*key)
                                    .map_or(f32::MAX, |logic| {
                                        logic.transform.translation.distance_squared(reference)
                                    })
                            };
                            // Stable sort keeps resolve order among equal distances.
                            if *mode == SubsetMode::Nearest {
                                candidates.sort_by(|a, b| distance(a).total_cmp(&distance(b)));
                            } else {
                                candidates.sort_by(|a, b| distance(b).total_cmp(&distance(a)));
                            }
                            candidates.truncate(*size);
                        }
                    }
                }
                out.extend(candidates);
            }
            TargetLogic::Conditional { target, condition } => {
                let mut candidates = Vec::new();
                target.resolve(ctx, activator, &mut candidates);
                for candidate in candidates {
                    if condition.is_satisfied(&mut ctx.with_source(candidate), activator) {
                        out.push(candidate);
                    }
                }
            }
            TargetLogic::Compound(targets) => {
                for target in targets {
                    target.resolve(ctx, activator, out);
                }
            }
            TargetLogic::Behavior(inner) => {
                let mut candidates = Vec::new();
                inner.resolve(ctx, activator, &mut candidates);
                for key in candidates {
                    if let Some(target) = key.actor().and_then(|id| ctx.scene.behavior_target(id)) {
                        out.push(target);
                    }
                }
            }
            TargetLogic::Excluding { target, excluded } => {
                let mut candidates = Vec::new();
                target.resolve(ctx, activator, &mut candidates);
                let mut removed = Vec::new();
                excluded.resolve(ctx, activator, &mut removed);
                out.extend(candidates.into_iter().filter(|key| !removed.contains(key)));
            }
            TargetLogic::Randomized(inner) => {
                let start = out.len();
                inner.resolve(ctx, activator, out);
                out[start..].shuffle(ctx.scene.rng());
            }
        }
    }

    /// Resolves into a fresh collection.
    pub fn resolve_all(&mut self, ctx: &mut LogicContext<'_>, activator: Option<EntityKey>) -> Vec<EntityKey> {
        let mut out = Vec::new();
        self.resolve(ctx, activator, &mut out);
        out
    }

    /// First resolved entity, if any.
    pub fn resolve_first(&mut self, ctx: &mut LogicContext<'_>, activator: Option<EntityKey>) -> Option<EntityKey> {
        self.resolve_all(ctx, activator).into_iter().next()
    }
}

/// Removes duplicates appended after `start`, keeping first occurrences.
fn dedup_from(out: &mut Vec<EntityKey>, start: usize) {
    let mut seen = std::collections::BTreeSet::new();
    let mut index = start;
    while index < out.len() {
        if seen.insert(out[index]) {
            index += 1;
        } else {
            out.remove(index);
        }
    }
}

impl LogicNode for TargetLogic {
    fn fire_interval(&mut self, ctx: &mut LogicContext<'_>, id: IntervalId) -> bool {
        match self {
            TargetLogic::ActivatorOf(inner)
            | TargetLogic::Behavior(inner)
            | TargetLogic::Randomized(inner) => inner.fire_interval(ctx, id),
            TargetLogic::Intersecting { region, .. } => region.fire_interval(ctx, id),
            TargetLogic::Subset {
                target, location, ..
            } => target.fire_interval(ctx, id) || location.fire_interval(ctx, id),
            TargetLogic::Conditional { target, condition } => {
                target.fire_interval(ctx, id) || condition.fire_interval(ctx, id)
            }
            TargetLogic::Compound(targets) => targets.fire_interval(ctx, id),
            TargetLogic::Excluding { target, excluded } => {
                target.fire_interval(ctx, id) || excluded.fire_interval(ctx, id)
            }
            TargetLogic::Source
            | TargetLogic::Activator
            | TargetLogic::Tagged(_)
            | TargetLogic::InstanceOf(_) => false,
        }
    }

    fn collect_intervals(&self, out: &mut Vec<IntervalId>) {
        match self {
            TargetLogic::ActivatorOf(inner)
            | TargetLogic::Behavior(inner)
            | TargetLogic::Randomized(inner) => inner.collect_intervals(out),
            TargetLogic::Intersecting { region, .. } => region.collect_intervals(out),
            TargetLogic::Subset {
                target, location, ..
            } => {
                target.collect_intervals(out);
                location.collect_intervals(out);
            }
            TargetLogic::Conditional { target, condition } => {
                target.collect_intervals(out);
                condition.collect_intervals(out);
            }
            TargetLogic::Compound(targets) => targets.collect_intervals(out),
            TargetLogic::Excluding { target, excluded } => {
                target.collect_intervals(out);
                excluded.collect_intervals(out);
            }
            TargetLogic::Source
            | TargetLogic::Activator
            | TargetLogic::Tagged(_)
            | TargetLogic::InstanceOf(_) => {}
        }
    }

    fn transfer(&mut self, source: &Self, tx: &mut TransferContext<'_>) {
        match (self, source) {
            (TargetLogic::ActivatorOf(inner), TargetLogic::ActivatorOf(from))
            | (TargetLogic::Behavior(inner), TargetLogic::Behavior(from))
            | (TargetLogic::Randomized(inner), TargetLogic::Randomized(from)) => {
                inner.transfer(from, tx)
            }
            (
                TargetLogic::Intersecting { region, .. },
                TargetLogic::Intersecting { region: from, .. },
            ) => region.transfer(from, tx),
            (
                TargetLogic::Subset {
                    target, location, ..
                },
                TargetLogic::Subset {
                    target: from_target,
                    location: from_location,
                    ..
                },
            ) => {
                target.transfer(from_target, tx);
                location.transfer(from_location, tx);
            }
            (
                TargetLogic::Conditional { target, condition },
                TargetLogic::Conditional {
                    target: from_target,
                    condition: from_condition,
                },
            ) => {
                target.transfer(from_target, tx);
                condition.transfer(from_condition, tx);
            }
            (TargetLogic::Compound(targets), TargetLogic::Compound(from)) => {
                targets.transfer(from, tx)
            }
            (
                TargetLogic::Excluding { target, excluded },
                TargetLogic::Excluding {
                    target: from_target,
                    excluded: from_excluded,
                },
            ) => {
                target.transfer(from_target, tx);
                excluded.transfer(from_excluded, tx);
            }
            _ => {}
        }
    }
}
