//! Path-following behaviors: patrol routes and target following.

use std::collections::VecDeque;

use rand::seq::SliceRandom;
use tracing::{debug, trace};

use super::{Evaluation, position};
use crate::geom::Vector2;
use crate::logic::{IntervalId, LogicContext, LogicNode, TargetLogic, TransferContext};
use crate::state::EntityKey;

/// Milliseconds between attempts to find a patrol route.
const ROUTE_RETRY: i64 = 1_000;

/// Steers an agent through a queue of waypoints.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct PathFollower {
    waypoints: VecDeque<Vector2>,
}

impl PathFollower {
    pub fn set(&mut self, waypoints: impl IntoIterator<Item = Vector2>) {
        self.waypoints = waypoints.into_iter().collect();
    }

    pub fn clear(&mut self) {
        self.waypoints.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.waypoints.is_empty()
    }

    pub fn destination(&self) -> Option<Vector2> {
        self.waypoints.back().copied()
    }

    /// Drops reached waypoints and steers toward the next one. Returns true
    /// once the last waypoint has been reached; the agent is halted then.
    pub fn step(&mut self, ctx: &mut LogicContext<'_>) -> bool {
        let Some(here) = position(ctx) else {
            return false;
        };
        let arrival = ctx.scene.config().arrival_distance;
        while let Some(next) = self.waypoints.front()
            && here.distance(*next) <= arrival
        {
            self.waypoints.pop_front();
        }
        match self.waypoints.front() {
            Some(next) => {
                ctx.scene.steer(ctx.source, here.direction_to(*next));
                false
            }
            None => {
                ctx.scene.halt(ctx.source);
                true
            }
        }
    }
}

/// Walks the waypoint loop of a scene entry.
#[derive(Debug)]
pub struct PatrolLogic {
    target: TargetLogic,
    branch_radius: f32,
    route: Option<EntityKey>,
    path: Vec<Vector2>,
    cursor: usize,
    evaluation: Evaluation,
}

impl PatrolLogic {
    pub fn new(target: TargetLogic, branch_radius: f32) -> Self {
        Self {
            target,
            branch_radius,
            route: None,
            path: Vec::new(),
            cursor: 0,
            evaluation: Evaluation::default(),
        }
    }

    pub fn route(&self) -> Option<EntityKey> {
        self.route
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn start(&mut self, ctx: &mut LogicContext<'_>) {
        let now = ctx.now();
        self.evaluation.advance(now);
        self.select_route(ctx);
    }

    pub fn tick(&mut self, ctx: &mut LogicContext<'_>) {
        if self.route.is_none() {
            self.select_route(ctx);
        }
        let (Some(here), Some(waypoint)) = (position(ctx), self.path.get(self.cursor).copied()) else {
            return;
        };
        if here.distance(waypoint) <= ctx.scene.config().arrival_distance {
            self.arrive(ctx, waypoint);
        }
        if let Some(next) = self.path.get(self.cursor) {
            ctx.scene.steer(ctx.source, here.direction_to(*next));
        }
    }

    pub fn stop(&mut self, ctx: &mut LogicContext<'_>) {
        ctx.scene.halt(ctx.source);
    }

    fn select_route(&mut self, ctx: &mut LogicContext<'_>) {
        let now = ctx.now();
        if !self.evaluation.due(now) {
            return;
        }
        let found = self
            .target
            .resolve_all(ctx, None)
            .into_iter()
            .find_map(|key| patrol_path(ctx, key).map(|path| (key, path)));
        let Some((route, path)) = found else {
            trace!(target: "sim::behavior", source = %ctx.source, "No patrol route");
            self.evaluation.schedule_next(now, ROUTE_RETRY);
            return;
        };
        let here = position(ctx).unwrap_or(Vector2::ZERO);
        self.cursor = nearest_node(&path, here);
        self.route = Some(route);
        self.path = path;
        self.evaluation.postpone();
        debug!(target: "sim::behavior", source = %ctx.source, %route, cursor = self.cursor, "Patrol route selected");
    }

    /// Picks the next node after reaching `node`, possibly switching routes.
    fn arrive(&mut self, ctx: &mut LogicContext<'_>, node: Vector2) {
        let next = (self.cursor + 1) % self.path.len();
        if self.branch_radius < 0.0 {
            self.cursor = next;
            return;
        }
        let mut choices = vec![(self.route, None, next)];
        for key in self.target.resolve_all(ctx, None) {
            if Some(key) == self.route {
                continue;
            }
            let Some(path) = patrol_path(ctx, key) else {
                continue;
            };
            for (index, point) in path.iter().enumerate() {
                if point.distance(node) <= self.branch_radius {
                    let following = (index + 1) % path.len();
                    choices.push((Some(key), Some(path.clone()), following));
                }
            }
        }
        if let Some((route, path, cursor)) = choices.choose(ctx.scene.rng()).cloned() {
            if let Some(path) = path {
                debug!(target: "sim::behavior", source = %ctx.source, ?route, "Patrol branched");
                self.path = path;
            }
            self.route = route;
            self.cursor = cursor;
        }
    }
}

fn patrol_path(ctx: &LogicContext<'_>, key: EntityKey) -> Option<Vec<Vector2>> {
    let entry = ctx.scene.entry(key.entry()?)?;
    (!entry.path().is_empty()).then(|| entry.path().to_vec())
}

fn nearest_node(path: &[Vector2], point: Vector2) -> usize {
    path.iter()
        .enumerate()
        .min_by(|(_, a), (_, b)| {
            a.distance_squared(point)
                .total_cmp(&b.distance_squared(point))
        })
        .map_or(0, |(index, _)| index)
}

impl LogicNode for PatrolLogic {
    fn fire_interval(&mut self, ctx: &mut LogicContext<'_>, id: IntervalId) -> bool {
        self.target.fire_interval(ctx, id)
    }

    fn collect_intervals(&self, out: &mut Vec<IntervalId>) {
        self.target.collect_intervals(out);
    }

    fn transfer(&mut self, source: &Self, tx: &mut TransferContext<'_>) {
        self.route = tx.refs.map(source.route);
        if self.route.is_some() {
            self.path = source.path.clone();
            self.cursor = source.cursor;
            self.evaluation = source.evaluation;
        } else {
            // Route did not survive the transfer; pick one on the next tick.
            self.evaluation.advance(crate::state::Timestamp::ZERO);
        }
        self.target.transfer(&source.target, tx);
    }
}

/// Keeps the nearest resolved target within a distance band.
#[derive(Debug)]
pub struct FollowLogic {
    target: TargetLogic,
    minimum: f32,
    maximum: f32,
    interval: i64,
    evaluation: Evaluation,
    follower: PathFollower,
    current: Option<EntityKey>,
}

impl FollowLogic {
    pub fn new(target: TargetLogic, minimum: f32, maximum: f32, interval: i64) -> Self {
        Self {
            target,
            minimum,
            maximum: maximum.max(minimum),
            interval,
            evaluation: Evaluation::default(),
            follower: PathFollower::default(),
            current: None,
        }
    }

    pub fn current_target(&self) -> Option<EntityKey> {
        self.current
    }

    pub fn start(&mut self, ctx: &mut LogicContext<'_>) {
        let now = ctx.now();
        self.evaluation.advance(now);
    }

    pub fn tick(&mut self, ctx: &mut LogicContext<'_>) {
        let now = ctx.now();
        let Some(here) = position(ctx) else {
            return;
        };
        if self.evaluation.due(now) {
            self.evaluation.schedule_next(now, self.interval);
            self.reevaluate(ctx, here);
        }
        let Some(there) = self
            .current
            .and_then(|key| ctx.scene.logic(key))
            .map(|logic| logic.transform.translation)
        else {
            self.current = None;
            self.follower.clear();
            ctx.scene.halt(ctx.source);
            return;
        };
        let distance = here.distance(there);
        if distance < self.minimum {
            self.follower.clear();
            ctx.scene.steer(ctx.source, there.direction_to(here));
        } else if distance <= self.maximum {
            self.follower.clear();
            ctx.scene.halt(ctx.source);
            ctx.scene.face(ctx.source, here.direction_to(there));
        } else if !self.follower.is_empty() {
            self.follower.step(ctx);
        } else {
            ctx.scene.halt(ctx.source);
            ctx.scene.face(ctx.source, here.direction_to(there));
        }
    }

    fn reevaluate(&mut self, ctx: &mut LogicContext<'_>, here: Vector2) {
        let nearest = self
            .target
            .resolve_all(ctx, None)
            .into_iter()
            .filter(|key| *key != ctx.source)
            .filter_map(|key| {
                ctx.scene
                    .logic(key)
                    .map(|logic| (key, logic.transform.translation.distance_squared(here)))
            })
            .min_by(|(_, a), (_, b)| a.total_cmp(b));
        self.current = nearest.map(|(key, _)| key);
        let Some(there) = self
            .current
            .and_then(|key| ctx.scene.logic(key))
            .map(|logic| logic.transform.translation)
        else {
            return;
        };
        if here.distance(there) <= self.maximum {
            return;
        }
        let Some(actor) = ctx.source.actor() else {
            return;
        };
        match ctx.scene.find_path(actor, there) {
            Some(path) => self.follower.set(path),
            None => {
                trace!(target: "sim::behavior", source = %ctx.source, "No path to follow target");
                self.follower.clear();
            }
        }
    }

    pub fn stop(&mut self, ctx: &mut LogicContext<'_>) {
        self.follower.clear();
        ctx.scene.halt(ctx.source);
    }
}

impl LogicNode for FollowLogic {
    fn fire_interval(&mut self, ctx: &mut LogicContext<'_>, id: IntervalId) -> bool {
        self.target.fire_interval(ctx, id)
    }

    fn collect_intervals(&self, out: &mut Vec<IntervalId>) {
        self.target.collect_intervals(out);
    }

    fn transfer(&mut self, source: &Self, tx: &mut TransferContext<'_>) {
        self.current = tx.refs.map(source.current);
        self.follower = source.follower.clone();
        self.evaluation = source.evaluation;
        self.target.transfer(&source.target, tx);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nearest_node_prefers_first_on_ties() {
        let path = [
            Vector2::new(0.0, 0.0),
            Vector2::new(4.0, 0.0),
            Vector2::new(2.0, 2.0),
            Vector2::new(2.0, -2.0),
        ];
        assert_eq!(nearest_node(&path, Vector2::new(3.5, 0.2)), 1);
        assert_eq!(nearest_node(&path, Vector2::new(2.0, 0.0)), 0);
        assert_eq!(nearest_node(&[], Vector2::ZERO), 0);
    }
}
