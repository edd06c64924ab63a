// Copyright (c) 2025 Graphcore Ltd. All rights reserved.

use std::cell::RefCell;
use std::future::Future;
use std::rc::Rc;

use hsa_track::Tracker;
use hsa_track::entity::{Entity, toplevel};
use hsa_track::tracker::stdout_tracker;

use crate::executor::{self, Executor, Spawner};
use crate::time::Tick;
use crate::time::clock::Clock;
use crate::types::{Component, SimError, SimResult};

pub struct Engine {
    pub executor: Executor,
    pub spawner: Spawner,
    toplevel: Rc<Entity>,
    tracker: Tracker,

    /// Components whose `run()` has not been spawned yet.
    components: RefCell<Vec<Component>>,

    default_clock: Clock,
    clocks: RefCell<Vec<Clock>>,
}

impl Engine {
    /// Create a standalone engine.
    pub fn new(tracker: &Tracker) -> Self {
        let toplevel = toplevel(tracker, "top");
        let (executor, spawner) = executor::new_executor_and_spawner(&toplevel);
        let default_clock = Clock::one_ghz(executor.time());
        Self {
            executor,
            spawner,
            toplevel,
            tracker: tracker.clone(),
            components: RefCell::new(Vec::new()),
            clocks: RefCell::new(vec![default_clock.clone()]),
            default_clock,
        }
    }

    /// Have the `run()` of `component` spawned when the simulation starts.
    pub fn register(&self, component: Component) {
        self.components.borrow_mut().push(component);
    }

    fn spawn_components(&self) {
        let components: Vec<Component> = self.components.borrow_mut().drain(..).collect();
        for component in components {
            self.executor
                .spawn(async move { component.run().await });
        }
    }

    /// Run until there is nothing left to do.
    pub fn run(&mut self) -> SimResult {
        self.spawn_components();
        self.executor.run()
    }

    /// Run everything due up to and including time `until`.
    pub fn run_until(&mut self, until: Tick) -> SimResult {
        self.spawn_components();
        self.executor.run_until(until)
    }

    pub fn spawn(&self, future: impl Future<Output = SimResult> + 'static) {
        self.executor.spawn(future);
    }

    /// Returns a handle that components use to start their own tasks.
    #[must_use]
    pub fn spawner(&self) -> Spawner {
        self.spawner.clone()
    }

    #[must_use]
    pub fn top(&self) -> &Rc<Entity> {
        &self.toplevel
    }

    #[must_use]
    pub fn tracker(&self) -> Tracker {
        self.tracker.clone()
    }

    /// A 1GHz clock, so cycles are 1ns.
    #[must_use]
    pub fn default_clock(&self) -> Clock {
        self.default_clock.clone()
    }

    /// Get the clock running at `freq_mhz`, creating it the first time.
    pub fn clock_mhz(&self, freq_mhz: f64) -> Result<Clock, SimError> {
        let mut clocks = self.clocks.borrow_mut();
        if let Some(clock) = clocks.iter().find(|clock| clock.freq_mhz() == freq_mhz) {
            return Ok(clock.clone());
        }
        let clock = Clock::new(freq_mhz, self.executor.time())?;
        clocks.push(clock.clone());
        Ok(clock)
    }

    #[must_use]
    pub fn tick_now(&self) -> Tick {
        self.executor.tick_now()
    }

    #[must_use]
    pub fn time_now_ns(&self) -> f64 {
        self.executor.time_now_ns()
    }
}

impl Default for Engine {
    fn default() -> Self {
        let tracker = stdout_tracker(log::Level::Warn);
        Self::new(&tracker)
    }
}
