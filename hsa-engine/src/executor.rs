// Copyright (c) 2025 Graphcore Ltd. All rights reserved.

//! Single-threaded executor.
//!
//! Every component runs as one or more tasks. A task runs until it has to
//! wait, either for simulated time to pass or for an
//! [event](crate::events) to be triggered. When no task is ready to run the
//! executor moves time on to the next wake-up.

use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::future::Future;
use std::rc::{Rc, Weak};
use std::task::{Context, Poll, RawWaker, RawWakerVTable, Waker};

use futures::future::LocalBoxFuture;
use hsa_track::entity::Entity;
use hsa_track::trace;

use crate::time::Tick;
use crate::time::simtime::SimTime;
use crate::types::SimResult;

struct Task {
    /// Cleared once the future has completed.
    future: RefCell<Option<LocalBoxFuture<'static, SimResult>>>,

    /// Set while the task is in the ready queue so that repeated wakes only
    /// queue it once.
    queued: Cell<bool>,

    executor_state: Weak<ExecutorState>,
}

impl Task {
    fn schedule(self: Rc<Self>) {
        if self.queued.replace(true) {
            return;
        }
        if let Some(state) = self.executor_state.upgrade() {
            state.ready.borrow_mut().push_back(self);
        }
    }

    fn poll(self: &Rc<Self>) -> Poll<SimResult> {
        self.queued.set(false);
        let mut slot = self.future.borrow_mut();
        let Some(future) = slot.as_mut() else {
            return Poll::Ready(Ok(()));
        };
        let waker = waker_for_task(self.clone());
        let mut context = Context::from_waker(&waker);
        let result = future.as_mut().poll(&mut context);
        if result.is_ready() {
            *slot = None;
        }
        result
    }
}

// Tasks are reference counted and never leave the executor's thread, so the
// waker carries an `Rc<Task>` as its data pointer.
static TASK_WAKER_VTABLE: RawWakerVTable =
    RawWakerVTable::new(clone_raw_waker, wake_task, wake_task_by_ref, drop_raw_waker);

fn waker_for_task(task: Rc<Task>) -> Waker {
    let ptr = Rc::into_raw(task) as *const ();
    unsafe { Waker::from_raw(RawWaker::new(ptr, &TASK_WAKER_VTABLE)) }
}

unsafe fn clone_raw_waker(data: *const ()) -> RawWaker {
    unsafe { Rc::increment_strong_count(data as *const Task) };
    RawWaker::new(data, &TASK_WAKER_VTABLE)
}

unsafe fn wake_task(data: *const ()) {
    let task = unsafe { Rc::from_raw(data as *const Task) };
    task.schedule();
}

unsafe fn wake_task_by_ref(data: *const ()) {
    unsafe { Rc::increment_strong_count(data as *const Task) };
    let task = unsafe { Rc::from_raw(data as *const Task) };
    task.schedule();
}

unsafe fn drop_raw_waker(data: *const ()) {
    drop(unsafe { Rc::from_raw(data as *const Task) });
}

struct ExecutorState {
    ready: RefCell<VecDeque<Rc<Task>>>,
    time: Rc<SimTime>,
}

impl ExecutorState {
    fn spawn(self: &Rc<Self>, future: impl Future<Output = SimResult> + 'static) {
        let task = Rc::new(Task {
            future: RefCell::new(Some(Box::pin(future))),
            queued: Cell::new(false),
            executor_state: Rc::downgrade(self),
        });
        task.schedule();
    }
}

/// Single-threaded executor
///
/// This is a thin-wrapper (using [`Rc`]) around the real executor, so that this
/// struct can be cloned and passed around.
#[derive(Clone)]
pub struct Executor {
    pub entity: Rc<Entity>,
    state: Rc<ExecutorState>,
}

impl Executor {
    pub fn spawn(&self, future: impl Future<Output = SimResult> + 'static) {
        self.state.spawn(future);
    }

    /// Run until no task is ready and none is waiting for time to pass.
    ///
    /// Tasks that are still waiting on events that nobody will trigger are
    /// left pending.
    pub fn run(&self) -> SimResult {
        self.run_to(None)
    }

    /// Run everything due at or before `until` and then move time to
    /// `until`.
    pub fn run_until(&self, until: Tick) -> SimResult {
        self.run_to(Some(until))?;
        if until > self.state.time.tick_now() {
            self.state.time.advance_to(until);
        }
        Ok(())
    }

    fn run_to(&self, limit: Option<Tick>) -> SimResult {
        loop {
            while self.step()? {}
            match self.state.time.advance_time(limit) {
                Some(wakers) => {
                    trace!(self.entity ; "wake {} tasks", wakers.len());
                    for waker in wakers {
                        waker.wake();
                    }
                }
                None => return Ok(()),
            }
        }
    }

    /// Poll every task that is ready to run, without moving time.
    ///
    /// Returns whether there were any tasks to poll. Tasks woken while
    /// polling are left for the next step.
    pub fn step(&self) -> Result<bool, crate::types::SimError> {
        let tasks: Vec<Rc<Task>> = self.state.ready.borrow_mut().drain(..).collect();
        if tasks.is_empty() {
            return Ok(false);
        }
        for task in tasks {
            if let Poll::Ready(Err(e)) = task.poll() {
                return Err(e);
            }
        }
        Ok(true)
    }

    #[must_use]
    pub fn time(&self) -> &Rc<SimTime> {
        &self.state.time
    }

    #[must_use]
    pub fn tick_now(&self) -> Tick {
        self.state.time.tick_now()
    }

    #[must_use]
    pub fn time_now_ns(&self) -> f64 {
        self.state.time.time_now_ns()
    }
}

/// `Spawner` spawns new futures into the executor.
#[derive(Clone)]
pub struct Spawner {
    state: Rc<ExecutorState>,
}

impl Spawner {
    pub fn spawn(&self, future: impl Future<Output = SimResult> + 'static) {
        self.state.spawn(future);
    }
}

pub fn new_executor_and_spawner(top: &Rc<Entity>) -> (Executor, Spawner) {
    let state = Rc::new(ExecutorState {
        ready: RefCell::new(VecDeque::new()),
        time: Rc::new(SimTime::new(top)),
    });
    let entity = Rc::new(Entity::new(top, "executor"));
    (
        Executor {
            entity,
            state: state.clone(),
        },
        Spawner { state },
    )
}
