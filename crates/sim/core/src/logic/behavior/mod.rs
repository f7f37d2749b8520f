//! Agent behaviors.
//!
//! A behavior is owned by its agent and driven by the scene: `start` when the
//! agent starts, `tick` once per agent tick, `on_collision` with the mean
//! penetration of a tick that collided, `on_stasis` around stasis, and `stop`
//! when the agent goes away. Behaviors steer through the scene (`steer`,
//! `halt`, `face`, `set_speed`); the advancer does the moving.
mod composite;
mod evaluation;
mod path;
mod scripted;
mod wander;

pub use composite::{CombinedLogic, RandomLogic};
pub use evaluation::Evaluation;
pub use path::{FollowLogic, PathFollower, PatrolLogic};
pub use scripted::{ScriptedLogic, StepLogic};
pub use wander::{WanderLogic, WanderMode};

use super::{ActionLogic, IntervalId, LogicContext, LogicNode, TargetLogic, TransferContext};
use crate::geom::Vector2;
use crate::schema::BehaviorConfig;
use crate::state::EntityKey;

#[derive(Debug)]
pub enum BehaviorLogic {
    Idle,
    Wander(WanderLogic),
    Patrol(PatrolLogic),
    Follow(FollowLogic),
    Random(RandomLogic),
    Scripted(ScriptedLogic),
    Combined(CombinedLogic),
}

impl BehaviorLogic {
    pub fn new(config: &BehaviorConfig) -> Self {
        match config {
            BehaviorConfig::Idle => BehaviorLogic::Idle,
            BehaviorConfig::Wander(wander) => {
                BehaviorLogic::Wander(WanderLogic::new(wander, WanderMode::Free))
            }
            BehaviorConfig::WanderCollision { wander, action } => BehaviorLogic::Wander(
                WanderLogic::new(wander, WanderMode::Collision(Box::new(ActionLogic::new(action)))),
            ),
            BehaviorConfig::GridWander { wander, policy } => {
                BehaviorLogic::Wander(WanderLogic::new(wander, WanderMode::Grid(*policy)))
            }
            BehaviorConfig::Patrol {
                target,
                branch_radius,
            } => BehaviorLogic::Patrol(PatrolLogic::new(TargetLogic::new(target), *branch_radius)),
            BehaviorConfig::Follow {
                target,
                minimum,
                maximum,
                interval,
            } => BehaviorLogic::Follow(FollowLogic::new(
                TargetLogic::new(target),
                *minimum,
                *maximum,
                *interval,
            )),
            BehaviorConfig::Random {
                interval,
                behaviors,
            } => BehaviorLogic::Random(RandomLogic::new(*interval, behaviors)),
            BehaviorConfig::Scripted { steps } => BehaviorLogic::Scripted(ScriptedLogic::new(steps)),
            BehaviorConfig::Combined { first, second } => BehaviorLogic::Combined(
                CombinedLogic::new(Self::new(first), Self::new(second)),
            ),
        }
    }

    pub fn start(&mut self, ctx: &mut LogicContext<'_>) {
        match self {
            BehaviorLogic::Idle => ctx.scene.halt(ctx.source),
            BehaviorLogic::Wander(wander) => wander.start(ctx),
            BehaviorLogic::Patrol(patrol) => patrol.start(ctx),
            BehaviorLogic::Follow(follow) => follow.start(ctx),
            BehaviorLogic::Random(random) => random.start(ctx),
            BehaviorLogic::Scripted(scripted) => scripted.start(ctx),
            BehaviorLogic::Combined(combined) => combined.start(ctx),
        }
    }

    pub fn tick(&mut self, ctx: &mut LogicContext<'_>) {
        match self {
            BehaviorLogic::Idle => {}
            BehaviorLogic::Wander(wander) => wander.tick(ctx),
            BehaviorLogic::Patrol(patrol) => patrol.tick(ctx),
            BehaviorLogic::Follow(follow) => follow.tick(ctx),
            BehaviorLogic::Random(random) => random.tick(ctx),
            BehaviorLogic::Scripted(scripted) => scripted.tick(ctx),
            BehaviorLogic::Combined(combined) => combined.tick(ctx),
        }
    }

    /// Reports the mean penetration of a tick in which the agent collided.
    pub fn on_collision(&mut self, ctx: &mut LogicContext<'_>, penetration: Vector2) {
        match self {
            BehaviorLogic::Wander(wander) => wander.on_collision(ctx, penetration),
            BehaviorLogic::Random(random) => random.on_collision(ctx, penetration),
            BehaviorLogic::Combined(combined) => combined.on_collision(ctx, penetration),
            BehaviorLogic::Idle
            | BehaviorLogic::Patrol(_)
            | BehaviorLogic::Follow(_)
            | BehaviorLogic::Scripted(_) => {}
        }
    }

    /// Called with `true` when the agent enters stasis and `false` when it leaves.
    pub fn on_stasis(&mut self, ctx: &mut LogicContext<'_>, entering: bool) {
        match self {
            BehaviorLogic::Random(random) => random.on_stasis(ctx, entering),
            BehaviorLogic::Combined(combined) => combined.on_stasis(ctx, entering),
            BehaviorLogic::Follow(follow) if !entering => follow.start(ctx),
            _ => {}
        }
    }

    pub fn stop(&mut self, ctx: &mut LogicContext<'_>) {
        match self {
            BehaviorLogic::Idle => {}
            BehaviorLogic::Wander(wander) => wander.stop(ctx),
            BehaviorLogic::Patrol(patrol) => patrol.stop(ctx),
            BehaviorLogic::Follow(follow) => follow.stop(ctx),
            BehaviorLogic::Random(random) => random.stop(ctx),
            BehaviorLogic::Scripted(scripted) => scripted.stop(ctx),
            BehaviorLogic::Combined(combined) => combined.stop(ctx),
        }
    }

    /// Entity the behavior is currently oriented toward.
    pub fn current_target(&self) -> Option<EntityKey> {
        match self {
            BehaviorLogic::Patrol(patrol) => patrol.route(),
            BehaviorLogic::Follow(follow) => follow.current_target(),
            BehaviorLogic::Random(random) => random.current_target(),
            BehaviorLogic::Combined(combined) => combined.current_target(),
            BehaviorLogic::Idle | BehaviorLogic::Wander(_) | BehaviorLogic::Scripted(_) => None,
        }
    }
}

/// Current translation of the executing agent.
pub(crate) fn position(ctx: &LogicContext<'_>) -> Option<Vector2> {
    ctx.scene
        .logic(ctx.source)
        .map(|logic| logic.transform.translation)
}

impl LogicNode for BehaviorLogic {
    fn fire_interval(&mut self, ctx: &mut LogicContext<'_>, id: IntervalId) -> bool {
        match self {
            BehaviorLogic::Idle => false,
            BehaviorLogic::Wander(wander) => wander.fire_interval(ctx, id),
            BehaviorLogic::Patrol(patrol) => patrol.fire_interval(ctx, id),
            BehaviorLogic::Follow(follow) => follow.fire_interval(ctx, id),
            BehaviorLogic::Random(random) => random.fire_interval(ctx, id),
            BehaviorLogic::Scripted(scripted) => scripted.fire_interval(ctx, id),
            BehaviorLogic::Combined(combined) => combined.fire_interval(ctx, id),
        }
    }

    fn collect_intervals(&self, out: &mut Vec<IntervalId>) {
        match self {
            BehaviorLogic::Idle => {}
            BehaviorLogic::Wander(wander) => wander.collect_intervals(out),
            BehaviorLogic::Patrol(patrol) => patrol.collect_intervals(out),
            BehaviorLogic::Follow(follow) => follow.collect_intervals(out),
            BehaviorLogic::Random(random) => random.collect_intervals(out),
            BehaviorLogic::Scripted(scripted) => scripted.collect_intervals(out),
            BehaviorLogic::Combined(combined) => combined.collect_intervals(out),
        }
    }

    fn transfer(&mut self, source: &Self, tx: &mut TransferContext<'_>) {
        match (self, source) {
            (BehaviorLogic::Wander(wander), BehaviorLogic::Wander(from)) => {
                wander.transfer(from, tx)
            }
            (BehaviorLogic::Patrol(patrol), BehaviorLogic::Patrol(from)) => {
                patrol.transfer(from, tx)
            }
            (BehaviorLogic::Follow(follow), BehaviorLogic::Follow(from)) => {
                follow.transfer(from, tx)
            }
            (BehaviorLogic::Random(random), BehaviorLogic::Random(from)) => {
                random.transfer(from, tx)
            }
            (BehaviorLogic::Scripted(scripted), BehaviorLogic::Scripted(from)) => {
                scripted.transfer(from, tx)
            }
            (BehaviorLogic::Combined(combined), BehaviorLogic::Combined(from)) => {
                combined.transfer(from, tx)
            }
            _ => {}
        }
    }
}
