use rand::Rng;

use crate::logic::LogicContext;
use crate::state::Timestamp;

/// Re-decision schedule shared by interval-driven behaviors.
///
/// A behavior re-evaluates on the first tick at or after `next`. `None`
/// postpones evaluation until something reschedules it.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Evaluation {
    next: Option<Timestamp>,
}

impl Evaluation {
    /// Evaluates on the next tick.
    pub fn advance(&mut self, now: Timestamp) {
        self.next = Some(now);
    }

    pub fn postpone(&mut self) {
        self.next = None;
    }

    pub fn schedule_next(&mut self, now: Timestamp, interval: i64) {
        self.next = Some(now + interval.max(0));
    }

    /// Schedules `interval ± variance` milliseconds ahead.
    pub fn schedule_jittered(&mut self, ctx: &mut LogicContext<'_>, interval: i64, variance: i64) {
        let variance = variance.abs();
        let jitter = if variance > 0 {
            ctx.scene.rng().gen_range(-variance..=variance)
        } else {
            0
        };
        let now = ctx.now();
        self.schedule_next(now, interval + jitter);
    }

    pub fn due(&self, now: Timestamp) -> bool {
        self.next.is_some_and(|next| now >= next)
    }

    pub fn next(&self) -> Option<Timestamp> {
        self.next
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn postponed_evaluation_is_never_due() {
        let mut evaluation = Evaluation::default();
        assert!(!evaluation.due(Timestamp::MAX));
        evaluation.advance(Timestamp(100));
        assert!(evaluation.due(Timestamp(100)));
        evaluation.postpone();
        assert!(!evaluation.due(Timestamp(200)));
    }

    #[test]
    fn schedule_next_is_relative_to_now() {
        let mut evaluation = Evaluation::default();
        evaluation.schedule_next(Timestamp(1_000), 500);
        assert!(!evaluation.due(Timestamp(1_499)));
        assert!(evaluation.due(Timestamp(1_500)));
        evaluation.schedule_next(Timestamp(1_000), -20);
        assert_eq!(evaluation.next(), Some(Timestamp(1_000)));
    }
}
