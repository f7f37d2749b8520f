use tracing::trace;

use crate::logic::{ActionLogic, IntervalId, LogicContext, LogicNode, TransferContext};
use crate::schema::TimerWarning;
use crate::state::Timestamp;

/// Periodic expiry state of a timer handler.
///
/// Expirations fall at `started + offset + n * interval` for `n >= 1`; each
/// one may be preceded by a warning `lead` milliseconds earlier.
#[derive(Debug)]
pub struct TimerState {
    interval: i64,
    offset: i64,
    /// 0 repeats forever.
    limit: u32,
    warning: Option<(i64, ActionLogic)>,
    fired: u32,
    expiry: Option<(IntervalId, Timestamp)>,
    alert: Option<(IntervalId, Timestamp)>,
}

/// What a delivered interval meant to the timer.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TimerFire {
    Expired,
    Warned,
}

impl TimerState {
    pub fn new(interval: i64, offset: i64, limit: u32, warning: Option<&TimerWarning>) -> Self {
        Self {
            interval: interval.max(1),
            offset: offset.max(0),
            limit,
            warning: warning.map(|warning| (warning.lead, ActionLogic::new(&warning.action))),
            fired: 0,
            expiry: None,
            alert: None,
        }
    }

    pub fn fired(&self) -> u32 {
        self.fired
    }

    pub fn next_expiry(&self) -> Option<Timestamp> {
        self.expiry.map(|(_, at)| at)
    }

    fn exhausted(&self) -> bool {
        self.limit != 0 && self.fired >= self.limit
    }

    /// Arms the first expiry relative to `now`.
    pub fn start(&mut self, ctx: &mut LogicContext<'_>) {
        let first = ctx.now() + self.offset + self.interval;
        self.arm(ctx, first);
    }

    fn arm(&mut self, ctx: &mut LogicContext<'_>, at: Timestamp) {
        let now = ctx.now();
        self.expiry = Some((ctx.scene.schedule(at, ctx.owner), at));
        self.alert = match &self.warning {
            Some((lead, _)) if at - *lead >= now => {
                let warn_at = at - *lead;
                Some((ctx.scene.schedule(warn_at, ctx.owner), warn_at))
            }
            _ => None,
        };
    }

    /// Consumes `id` if it is one of this timer's intervals.
    pub fn fire(&mut self, ctx: &mut LogicContext<'_>, id: IntervalId) -> Option<TimerFire> {
        if let Some((alert, _)) = self.alert
            && alert == id
        {
            self.alert = None;
            if let Some((_, action)) = &mut self.warning {
                let now = ctx.now();
                action.execute(ctx, now, None);
            }
            return Some(TimerFire::Warned);
        }
        let (expiry, at) = self.expiry?;
        if expiry != id {
            return None;
        }
        self.expiry = None;
        self.fired += 1;
        if !self.exhausted() {
            self.arm(ctx, at + self.interval);
        } else {
            trace!(target: "sim::handler", fired = self.fired, "Timer exhausted");
        }
        Some(TimerFire::Expired)
    }

    pub fn delegate(&mut self, ctx: &mut LogicContext<'_>, id: IntervalId) -> bool {
        match &mut self.warning {
            Some((_, action)) => action.fire_interval(ctx, id),
            None => false,
        }
    }

    pub fn collect_intervals(&self, out: &mut Vec<IntervalId>) {
        out.extend(self.expiry.map(|(id, _)| id));
        out.extend(self.alert.map(|(id, _)| id));
        if let Some((_, action)) = &self.warning {
            action.collect_intervals(out);
        }
    }

    /// Continues the source timer's schedule at the same absolute times.
    pub fn transfer(&mut self, source: &Self, tx: &mut TransferContext<'_>) {
        self.fired = source.fired;
        self.expiry = source.expiry.map(|(_, at)| (tx.rearm(at), at));
        self.alert = source.alert.map(|(_, at)| (tx.rearm(at), at));
        if let (Some((_, action)), Some((_, from))) = (&mut self.warning, &source.warning) {
            action.transfer(from, tx);
        }
    }
}
