use std::collections::BTreeMap;

use rand::Rng;
use tracing::{debug, warn};

use super::ActionLogic;
use crate::logic::{IntervalId, LogicContext, LogicNode, TransferContext};
use crate::state::{EntityKey, Timestamp};

/// Execution armed by a [`DelayedLogic`], waiting for its interval.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PendingAction {
    pub fire_at: Timestamp,
    pub source: EntityKey,
    pub activator: Option<EntityKey>,
}

/// Runs its action once per execution, `delay ± variance` milliseconds later.
#[derive(Debug)]
pub struct DelayedLogic {
    action: Box<ActionLogic>,
    delay: i64,
    variance: i64,
    pending: BTreeMap<IntervalId, PendingAction>,
}

impl DelayedLogic {
    pub fn new(action: ActionLogic, delay: i64, variance: i64) -> Self {
        Self {
            action: Box::new(action),
            delay,
            variance: variance.abs(),
            pending: BTreeMap::new(),
        }
    }

    pub fn pending(&self) -> impl Iterator<Item = (IntervalId, &PendingAction)> {
        self.pending.iter().map(|(id, pending)| (*id, pending))
    }

    pub(super) fn execute(
        &mut self,
        ctx: &mut LogicContext<'_>,
        timestamp: Timestamp,
        activator: Option<EntityKey>,
    ) -> bool {
        if !ctx.scene.is_running() {
            warn!(target: "sim::action", source = %ctx.source, "Delayed action scheduled on a stopped scene");
            return false;
        }
        let jitter = if self.variance > 0 {
            ctx.scene.rng().gen_range(-self.variance..=self.variance)
        } else {
            0
        };
        let fire_at = timestamp + (self.delay + jitter).max(0);
        let id = ctx.scene.schedule(fire_at, ctx.owner);
        self.pending.insert(
            id,
            PendingAction {
                fire_at,
                source: ctx.source,
                activator,
            },
        );
        debug!(target: "sim::action", %id, %fire_at, "Delayed action armed");
        true
    }
}

impl LogicNode for DelayedLogic {
    fn fire_interval(&mut self, ctx: &mut LogicContext<'_>, id: IntervalId) -> bool {
        let Some(pending) = self.pending.remove(&id) else {
            return self.action.fire_interval(ctx, id);
        };
        if !ctx.scene.is_running() {
            warn!(target: "sim::action", %id, "Delayed action fired after the scene stopped");
            return true;
        }
        let now = ctx.now();
        self.action
            .execute(&mut ctx.with_source(pending.source), now, pending.activator);
        true
    }

    fn collect_intervals(&self, out: &mut Vec<IntervalId>) {
        out.extend(self.pending.keys().copied());
        self.action.collect_intervals(out);
    }

    /// Re-arms every pending execution against the destination scene at its
    /// original absolute time.
    fn transfer(&mut self, source: &Self, tx: &mut TransferContext<'_>) {
        for pending in source.pending.values() {
            let Some(mapped) = tx.refs.get(pending.source).or_else(|| tx.owner.entity()) else {
                continue;
            };
            let id = tx.rearm(pending.fire_at);
            self.pending.insert(
                id,
                PendingAction {
                    fire_at: pending.fire_at,
                    source: mapped,
                    activator: tx.refs.map(pending.activator),
                },
            );
        }
        self.action.transfer(&source.action, tx);
    }
}
