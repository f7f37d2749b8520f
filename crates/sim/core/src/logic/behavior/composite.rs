//! Behaviors composed of other behaviors.

use rand::Rng;
use tracing::debug;

use super::{BehaviorLogic, Evaluation};
use crate::geom::Vector2;
use crate::logic::{IntervalId, LogicContext, LogicNode, TransferContext};
use crate::schema::WeightedBehavior;
use crate::state::EntityKey;

/// Periodically hands control to a weighted random sub-behavior.
#[derive(Debug)]
pub struct RandomLogic {
    interval: i64,
    choices: Vec<(f32, BehaviorLogic)>,
    active: Option<usize>,
    evaluation: Evaluation,
}

impl RandomLogic {
    pub fn new(interval: i64, behaviors: &[WeightedBehavior]) -> Self {
        Self {
            interval,
            choices: behaviors
                .iter()
                .map(|weighted| (weighted.weight, BehaviorLogic::new(&weighted.behavior)))
                .collect(),
            active: None,
            evaluation: Evaluation::default(),
        }
    }

    pub fn active(&self) -> Option<usize> {
        self.active
    }

    fn current(&mut self) -> Option<&mut BehaviorLogic> {
        let index = self.active?;
        self.choices.get_mut(index).map(|(_, behavior)| behavior)
    }

    pub fn start(&mut self, ctx: &mut LogicContext<'_>) {
        let now = ctx.now();
        self.evaluation.advance(now);
        self.reselect(ctx);
    }

    pub fn tick(&mut self, ctx: &mut LogicContext<'_>) {
        self.reselect(ctx);
        if let Some(behavior) = self.current() {
            behavior.tick(ctx);
        }
    }

    pub fn on_collision(&mut self, ctx: &mut LogicContext<'_>, penetration: Vector2) {
        if let Some(behavior) = self.current() {
            behavior.on_collision(ctx, penetration);
        }
    }

    pub fn on_stasis(&mut self, ctx: &mut LogicContext<'_>, entering: bool) {
        if let Some(behavior) = self.current() {
            behavior.on_stasis(ctx, entering);
        }
    }

    pub fn stop(&mut self, ctx: &mut LogicContext<'_>) {
        if let Some(behavior) = self.current() {
            behavior.stop(ctx);
        }
        self.active = None;
        self.evaluation.postpone();
    }

    pub fn current_target(&self) -> Option<EntityKey> {
        let index = self.active?;
        self.choices.get(index)?.1.current_target()
    }

    fn reselect(&mut self, ctx: &mut LogicContext<'_>) {
        let now = ctx.now();
        if !self.evaluation.due(now) {
            return;
        }
        self.evaluation.schedule_next(now, self.interval);
        let total: f32 = self.choices.iter().map(|(weight, _)| weight.max(0.0)).sum();
        if !(total > 0.0 && total.is_finite()) {
            return;
        }
        let mut pick = ctx.scene.rng().gen_range(0.0..total);
        let mut chosen = None;
        for (index, (weight, _)) in self.choices.iter().enumerate() {
            if !(*weight > 0.0) {
                continue;
            }
            chosen = Some(index);
            if pick < *weight {
                break;
            }
            pick -= weight;
        }
        let Some(chosen) = chosen else {
            return;
        };
        if let Some(behavior) = self.current() {
            behavior.stop(ctx);
        }
        debug!(target: "sim::behavior", source = %ctx.source, chosen, "Random behavior selected");
        self.active = Some(chosen);
        self.choices[chosen].1.start(ctx);
    }
}

impl LogicNode for RandomLogic {
    fn fire_interval(&mut self, ctx: &mut LogicContext<'_>, id: IntervalId) -> bool {
        self.choices
            .iter_mut()
            .any(|(_, behavior)| behavior.fire_interval(ctx, id))
    }

    fn collect_intervals(&self, out: &mut Vec<IntervalId>) {
        for (_, behavior) in &self.choices {
            behavior.collect_intervals(out);
        }
    }

    fn transfer(&mut self, source: &Self, tx: &mut TransferContext<'_>) {
        self.active = source.active;
        self.evaluation = source.evaluation;
        for ((_, behavior), (_, from)) in self.choices.iter_mut().zip(&source.choices) {
            behavior.transfer(from, tx);
        }
    }
}

/// Two behaviors run in lockstep.
#[derive(Debug)]
pub struct CombinedLogic {
    first: Box<BehaviorLogic>,
    second: Box<BehaviorLogic>,
}

impl CombinedLogic {
    pub fn new(first: BehaviorLogic, second: BehaviorLogic) -> Self {
        Self {
            first: Box::new(first),
            second: Box::new(second),
        }
    }

    pub fn start(&mut self, ctx: &mut LogicContext<'_>) {
        self.first.start(ctx);
        self.second.start(ctx);
    }

    pub fn tick(&mut self, ctx: &mut LogicContext<'_>) {
        self.first.tick(ctx);
        self.second.tick(ctx);
    }

    pub fn on_collision(&mut self, ctx: &mut LogicContext<'_>, penetration: Vector2) {
        self.first.on_collision(ctx, penetration);
        self.second.on_collision(ctx, penetration);
    }

    pub fn on_stasis(&mut self, ctx: &mut LogicContext<'_>, entering: bool) {
        self.first.on_stasis(ctx, entering);
        self.second.on_stasis(ctx, entering);
    }

    pub fn stop(&mut self, ctx: &mut LogicContext<'_>) {
        self.first.stop(ctx);
        self.second.stop(ctx);
    }

    pub fn current_target(&self) -> Option<EntityKey> {
        self.first
            .current_target()
            .or_else(|| self.second.current_target())
    }
}

impl LogicNode for CombinedLogic {
    fn fire_interval(&mut self, ctx: &mut LogicContext<'_>, id: IntervalId) -> bool {
        self.first.fire_interval(ctx, id) || self.second.fire_interval(ctx, id)
    }

    fn collect_intervals(&self, out: &mut Vec<IntervalId>) {
        self.first.collect_intervals(out);
        self.second.collect_intervals(out);
    }

    fn transfer(&mut self, source: &Self, tx: &mut TransferContext<'_>) {
        self.first.transfer(&source.first, tx);
        self.second.transfer(&source.second, tx);
    }
}
