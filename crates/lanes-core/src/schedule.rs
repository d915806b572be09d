//! Cancellable delayed and periodic tasks on a virtual timeline.
//!
//! The scheduler never sleeps or spawns. It keeps a queue ordered by due
//! time and hands back whatever is due when the owner calls
//! [`Scheduler::pop_due`] with the current clock reading. Ties fire in the
//! order they were scheduled.
//!
//! Periodic timers are re-armed from their previous due time rather than
//! from the moment they were popped, so a late driver does not accumulate
//! drift. If the driver falls more than one period behind, the missed
//! periods are coalesced into a single firing.

use std::collections::{BTreeMap, BTreeSet};

/// Handle to a scheduled timer. Cancelling a stale handle is a no-op.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TimerId(u64);

/// How often a timer fires.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cadence {
    Once,
    /// Fire every `n` milliseconds.
    Every(i64),
}

#[derive(Debug, Clone)]
struct Timer<T> {
    due_millis: i64,
    cadence: Cadence,
    task: T,
}

/// A timer that came due.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fired<T> {
    pub id: TimerId,
    pub due_millis: i64,
    pub task: T,
}

/// Virtual-time task queue.
#[derive(Debug, Clone)]
pub struct Scheduler<T> {
    timers: BTreeMap<TimerId, Timer<T>>,
    queue: BTreeSet<(i64, TimerId)>,
    next_id: u64,
}

impl<T> Default for Scheduler<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Scheduler<T> {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            timers: BTreeMap::new(),
            queue: BTreeSet::new(),
            next_id: 0,
        }
    }

    /// Fire `task` once, `delay_millis` after `now_millis`.
    pub fn schedule_once(&mut self, now_millis: i64, delay_millis: i64, task: T) -> TimerId {
        self.insert(
            now_millis.saturating_add(delay_millis.max(0)),
            Cadence::Once,
            task,
        )
    }

    /// Fire `task` every `period_millis`, first at `now_millis + period_millis`.
    pub fn schedule_every(&mut self, now_millis: i64, period_millis: i64, task: T) -> TimerId {
        let period = period_millis.max(1);
        self.insert(
            now_millis.saturating_add(period),
            Cadence::Every(period),
            task,
        )
    }

    /// Cancel a timer. Returns `false` if it already fired (one-shot) or was
    /// cancelled before.
    pub fn cancel(&mut self, id: TimerId) -> bool {
        match self.timers.remove(&id) {
            Some(timer) => {
                self.queue.remove(&(timer.due_millis, id));
                true
            }
            None => false,
        }
    }

    /// Whether `id` is still pending.
    #[must_use]
    pub fn is_scheduled(&self, id: TimerId) -> bool {
        self.timers.contains_key(&id)
    }

    /// Due time of `id`, if still pending.
    #[must_use]
    pub fn due_millis(&self, id: TimerId) -> Option<i64> {
        self.timers.get(&id).map(|timer| timer.due_millis)
    }

    /// Earliest pending due time.
    #[must_use]
    pub fn next_due_millis(&self) -> Option<i64> {
        self.queue.first().map(|(due, _)| *due)
    }

    /// Number of pending timers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.timers.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.timers.is_empty()
    }

    /// Cancel everything.
    pub fn clear(&mut self) {
        self.timers.clear();
        self.queue.clear();
    }

    fn insert(&mut self, due_millis: i64, cadence: Cadence, task: T) -> TimerId {
        let id = TimerId(self.next_id);
        self.next_id += 1;
        self.queue.insert((due_millis, id));
        self.timers.insert(
            id,
            Timer {
                due_millis,
                cadence,
                task,
            },
        );
        id
    }
}

impl<T: Clone> Scheduler<T> {
    /// Pop the earliest timer due at or before `now_millis`.
    ///
    /// One-shot timers are removed. Periodic timers are re-armed at the next
    /// period boundary strictly after `now_millis` and keep their id.
    pub fn pop_due(&mut self, now_millis: i64) -> Option<Fired<T>> {
        let &(due_millis, id) = self.queue.first()?;
        if due_millis > now_millis {
            return None;
        }
        self.queue.remove(&(due_millis, id));

        let timer = self.timers.get_mut(&id)?;
        match timer.cadence {
            Cadence::Once => {
                let timer = self.timers.remove(&id)?;
                Some(Fired {
                    id,
                    due_millis,
                    task: timer.task,
                })
            }
            Cadence::Every(period) => {
                let mut next = due_millis.saturating_add(period);
                if next <= now_millis {
                    let behind = now_millis - next;
                    next = next.saturating_add((behind / period + 1) * period);
                }
                timer.due_millis = next;
                let task = timer.task.clone();
                self.queue.insert((next, id));
                Some(Fired {
                    id,
                    due_millis,
                    task,
                })
            }
        }
    }
}
