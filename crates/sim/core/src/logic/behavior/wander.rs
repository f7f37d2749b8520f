//! Random walking within an optional radius of the starting point.

use std::f32::consts::{FRAC_PI_2, PI};

use rand::Rng;
use tracing::trace;

use super::{Evaluation, position};
use crate::geom::{Vector2, normalize_angle};
use crate::logic::{ActionLogic, IntervalId, LogicContext, LogicNode, TransferContext};
use crate::schema::{TurnPolicy, WanderConfig};

#[derive(Debug)]
pub enum WanderMode {
    /// Collisions reflect the heading.
    Free,
    /// Collisions run the action with the agent as activator.
    Collision(Box<ActionLogic>),
    /// Headings snap to the four cardinal directions.
    Grid(TurnPolicy),
}

#[derive(Debug)]
pub struct WanderLogic {
    config: WanderConfig,
    mode: WanderMode,
    origin: Option<Vector2>,
    heading: f32,
    evaluation: Evaluation,
}

impl WanderLogic {
    pub fn new(config: &WanderConfig, mode: WanderMode) -> Self {
        Self {
            config: config.clone(),
            mode,
            origin: None,
            heading: 0.0,
            evaluation: Evaluation::default(),
        }
    }

    pub fn origin(&self) -> Option<Vector2> {
        self.origin
    }

    pub fn heading(&self) -> f32 {
        self.heading
    }

    pub fn start(&mut self, ctx: &mut LogicContext<'_>) {
        self.origin = position(ctx);
        if let Some(rotation) = ctx.scene.logic(ctx.source).map(|logic| logic.transform.rotation) {
            self.heading = self.snap(rotation);
        }
        let now = ctx.now();
        self.evaluation.advance(now);
    }

    pub fn tick(&mut self, ctx: &mut LogicContext<'_>) {
        let now = ctx.now();
        if let (Some(origin), Some(here)) = (self.origin, position(ctx))
            && self.config.radius > 0.0
            && here.distance(origin) > self.config.radius
            && Vector2::from_angle(self.heading).dot(here - origin) > 0.0
        {
            trace!(target: "sim::behavior", source = %ctx.source, "Wander returning to origin");
            let back = self.snap(here.direction_to(origin));
            self.steer(ctx, back);
            self.evaluation
                .schedule_jittered(ctx, self.config.interval, self.config.variance);
            return;
        }
        if !self.evaluation.due(now) {
            return;
        }
        let change = self.config.directional_change.abs();
        let turn = if change > 0.0 {
            ctx.scene.rng().gen_range(-change..=change)
        } else {
            0.0
        };
        let heading = self.snap(self.heading + turn);
        self.steer(ctx, heading);
        self.evaluation
            .schedule_jittered(ctx, self.config.interval, self.config.variance);
    }

    pub fn on_collision(&mut self, ctx: &mut LogicContext<'_>, penetration: Vector2) {
        let heading = match &mut self.mode {
            WanderMode::Collision(action) => {
                let now = ctx.now();
                let agent = Some(ctx.source);
                action.execute(ctx, now, agent);
                return;
            }
            WanderMode::Grid(policy) => {
                let policy = match policy {
                    TurnPolicy::Random => match ctx.scene.rng().gen_range(0..3) {
                        0 => TurnPolicy::Reverse,
                        1 => TurnPolicy::Left,
                        _ => TurnPolicy::Right,
                    },
                    fixed => *fixed,
                };
                let turn = match policy {
                    TurnPolicy::Left => FRAC_PI_2,
                    TurnPolicy::Right => -FRAC_PI_2,
                    TurnPolicy::Reverse | TurnPolicy::Random => PI,
                };
                self.snap(self.heading + turn)
            }
            WanderMode::Free => {
                let normal = penetration.normalized();
                let direction = Vector2::from_angle(self.heading);
                let reflected = direction - normal * (2.0 * direction.dot(normal));
                let change = self.config.directional_change.abs() / 4.0;
                let jitter = if change > 0.0 {
                    ctx.scene.rng().gen_range(-change..=change)
                } else {
                    0.0
                };
                reflected.angle() + jitter
            }
        };
        self.steer(ctx, heading);
        self.evaluation
            .schedule_jittered(ctx, self.config.interval, self.config.variance);
    }

    pub fn stop(&mut self, ctx: &mut LogicContext<'_>) {
        self.evaluation.postpone();
        ctx.scene.halt(ctx.source);
    }

    fn steer(&mut self, ctx: &mut LogicContext<'_>, heading: f32) {
        self.heading = normalize_angle(heading);
        ctx.scene.steer(ctx.source, self.heading);
    }

    fn snap(&self, angle: f32) -> f32 {
        match self.mode {
            WanderMode::Grid(_) => normalize_angle((angle / FRAC_PI_2).round() * FRAC_PI_2),
            _ => angle,
        }
    }
}

impl LogicNode for WanderLogic {
    fn fire_interval(&mut self, ctx: &mut LogicContext<'_>, id: IntervalId) -> bool {
        match &mut self.mode {
            WanderMode::Collision(action) => action.fire_interval(ctx, id),
            _ => false,
        }
    }

    fn collect_intervals(&self, out: &mut Vec<IntervalId>) {
        if let WanderMode::Collision(action) = &self.mode {
            action.collect_intervals(out);
        }
    }

    fn transfer(&mut self, source: &Self, tx: &mut TransferContext<'_>) {
        self.origin = source.origin;
        self.heading = source.heading;
        self.evaluation = source.evaluation;
        if let (WanderMode::Collision(action), WanderMode::Collision(from)) =
            (&mut self.mode, &source.mode)
        {
            action.transfer(from, tx);
        }
    }
}
