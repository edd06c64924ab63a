// Copyright (c) 2025 Graphcore Ltd. All rights reserved.

//! The overall owner of time within a simulation.

use std::cell::{Cell, RefCell};
use std::collections::BTreeMap;
use std::rc::Rc;
use std::task::Waker;

use hsa_track::entity::Entity;
use hsa_track::set_time;

use crate::events::EventPriority;
use crate::time::{Tick, ticks_to_ns};

/// The point on the timeline that a task wakes at.
pub type WakeKey = (Tick, EventPriority);

/// A task waiting for a particular [`WakeKey`].
struct Sleeper {
    id: u64,
    waker: Waker,
}

/// Holds the current simulation time and the tasks waiting for it to move
/// on.
///
/// Every change of time is reported to the tracker so that log output can be
/// correlated with the simulated timeline.
pub struct SimTime {
    pub entity: Rc<Entity>,

    now: Cell<WakeKey>,

    /// Sleeping tasks by the time they are due. Tasks due at the same time
    /// are kept in the order they went to sleep.
    waiting: RefCell<BTreeMap<WakeKey, Vec<Sleeper>>>,

    next_id: Cell<u64>,
}

impl SimTime {
    #[must_use]
    pub fn new(parent: &Rc<Entity>) -> Self {
        Self {
            entity: Rc::new(Entity::new(parent, "time")),
            now: Cell::new((0, EventPriority::MINIMUM)),
            waiting: RefCell::new(BTreeMap::new()),
            next_id: Cell::new(0),
        }
    }

    /// Park `waker` until `when`. Returns an id that can be used to
    /// [`cancel`](SimTime::cancel) the wake-up.
    pub fn sleep(&self, when: WakeKey, waker: Waker) -> u64 {
        let now = self.tick_now();
        assert!(
            when.0 >= now,
            "Wake-up scheduled in the past ({} < {now})",
            when.0
        );
        let id = self.next_id.get();
        self.next_id.set(id + 1);
        self.waiting
            .borrow_mut()
            .entry(when)
            .or_default()
            .push(Sleeper { id, waker });
        id
    }

    /// Forget a wake-up that has not yet happened.
    pub fn cancel(&self, when: WakeKey, id: u64) {
        let mut waiting = self.waiting.borrow_mut();
        if let Some(sleepers) = waiting.get_mut(&when) {
            sleepers.retain(|sleeper| sleeper.id != id);
            if sleepers.is_empty() {
                waiting.remove(&when);
            }
        }
    }

    /// True once the timeline has reached `when`.
    #[must_use]
    pub fn has_reached(&self, when: WakeKey) -> bool {
        self.now.get() >= when
    }

    /// Move on to the next time that has sleeping tasks, as long as it is no
    /// later than `limit`, and return their wakers.
    pub fn advance_time(&self, limit: Option<Tick>) -> Option<Vec<Waker>> {
        let mut waiting = self.waiting.borrow_mut();
        let (&when, _) = waiting.first_key_value()?;
        if limit.is_some_and(|limit| when.0 > limit) {
            return None;
        }
        let sleepers = waiting.remove(&when)?;
        drop(waiting);

        self.move_to(when);
        Some(sleepers.into_iter().map(|sleeper| sleeper.waker).collect())
    }

    /// Move time forward to `tick` without waking anything.
    ///
    /// Time can never move backwards.
    pub fn advance_to(&self, tick: Tick) {
        self.move_to((tick, EventPriority::MINIMUM));
    }

    fn move_to(&self, when: WakeKey) {
        let now = self.tick_now();
        assert!(when.0 >= now, "Time moving backwards ({} < {now})", when.0);
        if when.0 != now {
            set_time!(self.entity ; ticks_to_ns(when.0));
        }
        self.now.set(when.max(self.now.get()));
    }

    /// The time of the next wake-up, if any task is sleeping.
    #[must_use]
    pub fn next_wake(&self) -> Option<Tick> {
        self.waiting
            .borrow()
            .first_key_value()
            .map(|(when, _)| when.0)
    }

    #[must_use]
    pub fn tick_now(&self) -> Tick {
        self.now.get().0
    }

    #[must_use]
    pub fn time_now_ns(&self) -> f64 {
        ticks_to_ns(self.tick_now())
    }
}

#[cfg(test)]
mod tests {
    use std::task::Waker;

    use hsa_track::entity::toplevel;
    use hsa_track::test_helpers::check_and_clear;
    use hsa_track::test_init;

    use super::*;

    #[test]
    fn time_changes_are_tracked() {
        let (test_tracker, tracker) = test_init!(10);
        let top = toplevel(&tracker, "top");
        let time = SimTime::new(&top);
        check_and_clear(
            &test_tracker,
            &["0: created 10, top", "10: created 11, top::time"],
        );

        time.advance_to(0);
        time.advance_to(1500);
        time.advance_to(1500);
        check_and_clear(&test_tracker, &["11: set time 1.5ns"]);
        assert_eq!(time.tick_now(), 1500);
    }

    #[test]
    fn wake_ups_in_time_then_priority_order() {
        let (_test_tracker, tracker) = test_init!(10);
        let top = toplevel(&tracker, "top");
        let time = SimTime::new(&top);

        time.sleep((20, EventPriority::DEFAULT), Waker::noop().clone());
        time.sleep((10, EventPriority::CPU_TICK), Waker::noop().clone());
        let cancelled = time.sleep((10, EventPriority::DEFAULT), Waker::noop().clone());
        time.sleep((10, EventPriority::DEFAULT), Waker::noop().clone());
        time.cancel((10, EventPriority::DEFAULT), cancelled);
        assert_eq!(time.next_wake(), Some(10));

        assert_eq!(time.advance_time(None).map(|w| w.len()), Some(1));
        assert!(time.has_reached((10, EventPriority::DEFAULT)));
        assert!(!time.has_reached((10, EventPriority::CPU_TICK)));

        assert_eq!(time.advance_time(Some(15)).map(|w| w.len()), Some(1));
        assert!(time.advance_time(Some(15)).is_none());
        assert_eq!(time.tick_now(), 10);

        assert_eq!(time.advance_time(None).map(|w| w.len()), Some(1));
        assert_eq!(time.tick_now(), 20);
        assert!(time.advance_time(None).is_none());
    }

    #[test]
    #[should_panic(expected = "Time moving backwards")]
    fn time_cannot_go_backwards() {
        let (_test_tracker, tracker) = test_init!(10);
        let top = toplevel(&tracker, "top");
        let time = SimTime::new(&top);
        time.advance_to(10);
        time.advance_to(5);
    }
}
