//! One-shot intervals on the scene's virtual clock.

use std::collections::BTreeMap;

use crate::logic::{IntervalId, LogicOwner};
use crate::state::Timestamp;

/// Pending intervals ordered by `(fire_at, id)`.
///
/// Ids increase monotonically, so equal fire times run in scheduling order.
/// Cancellation removes the entry at once; a cancelled interval can never be
/// popped.
#[derive(Clone, Debug, Default)]
pub(crate) struct TimerQueue {
    next_id: u64,
    queue: BTreeMap<(Timestamp, IntervalId), LogicOwner>,
    fire_times: BTreeMap<IntervalId, Timestamp>,
}

impl TimerQueue {
    pub fn schedule(&mut self, fire_at: Timestamp, owner: LogicOwner) -> IntervalId {
        let id = IntervalId(self.next_id);
        self.next_id += 1;
        self.queue.insert((fire_at, id), owner);
        self.fire_times.insert(id, fire_at);
        id
    }

    pub fn cancel(&mut self, id: IntervalId) -> bool {
        let Some(fire_at) = self.fire_times.remove(&id) else {
            return false;
        };
        self.queue.remove(&(fire_at, id));
        true
    }

    pub fn fire_at(&self, id: IntervalId) -> Option<Timestamp> {
        self.fire_times.get(&id).copied()
    }

    /// First id that has not been handed out yet.
    pub fn watermark(&self) -> IntervalId {
        IntervalId(self.next_id)
    }

    /// Removes and returns the earliest interval due at `now` that was
    /// scheduled before `watermark`.
    pub fn pop_due(&mut self, now: Timestamp, watermark: IntervalId) -> Option<(IntervalId, LogicOwner)> {
        let (fire_at, id) = self
            .queue
            .range(..=(now, IntervalId(u64::MAX)))
            .map(|(key, _)| *key)
            .find(|(_, id)| *id < watermark)?;
        let owner = self.queue.remove(&(fire_at, id))?;
        self.fire_times.remove(&id);
        Some((id, owner))
    }

    pub fn clear(&mut self) -> usize {
        let pending = self.queue.len();
        self.queue.clear();
        self.fire_times.clear();
        pending
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logic::ScriptId;

    const OWNER: LogicOwner = LogicOwner::Script(ScriptId(0));

    #[test]
    fn pops_in_time_then_id_order() {
        let mut timers = TimerQueue::default();
        let late = timers.schedule(Timestamp(200), OWNER);
        let early = timers.schedule(Timestamp(100), OWNER);
        let tied = timers.schedule(Timestamp(100), OWNER);
        let watermark = timers.watermark();

        assert_eq!(timers.pop_due(Timestamp(150), watermark), Some((early, OWNER)));
        assert_eq!(timers.pop_due(Timestamp(150), watermark), Some((tied, OWNER)));
        assert_eq!(timers.pop_due(Timestamp(150), watermark), None);
        assert_eq!(timers.pop_due(Timestamp(200), watermark), Some((late, OWNER)));
    }

    #[test]
    fn intervals_scheduled_after_the_watermark_wait() {
        let mut timers = TimerQueue::default();
        let watermark = timers.watermark();
        timers.schedule(Timestamp(0), OWNER);

        assert_eq!(timers.pop_due(Timestamp(10), watermark), None);
        assert_eq!(timers.len(), 1);
    }

    #[test]
    fn cancelled_intervals_never_fire() {
        let mut timers = TimerQueue::default();
        let id = timers.schedule(Timestamp(5), OWNER);

        assert!(timers.cancel(id));
        assert!(!timers.cancel(id));
        assert_eq!(timers.fire_at(id), None);
        assert_eq!(timers.pop_due(Timestamp(10), timers.watermark()), None);
    }
}
