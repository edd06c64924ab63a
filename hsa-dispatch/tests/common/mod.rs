// Copyright (c) 2025 Graphcore Ltd. All rights reserved.

#![allow(dead_code)]

use std::rc::Rc;

use hsa_dispatch::config::DispatcherConfig;
use hsa_dispatch::dispatcher::Dispatcher;
use hsa_dispatch::task::{DispatchId, WavefrontContext};
use hsa_dispatch::test_helpers::{MockFabric, MockHost, MockScheduler};
use hsa_engine::engine::Engine;
use hsa_engine::test_helpers::start_test;

/// One fabric clock period in ticks.
pub const PERIOD: u64 = 1000;

pub struct Harness {
    pub engine: Engine,
    pub fabric: Rc<MockFabric>,
    pub scheduler: Rc<MockScheduler>,
    pub host: Rc<MockHost>,
    pub dispatcher: Rc<Dispatcher>,
}

pub fn harness(full_filepath: &str) -> Harness {
    harness_with_config(full_filepath, DispatcherConfig::default())
}

pub fn harness_with_config(full_filepath: &str, config: DispatcherConfig) -> Harness {
    let engine = start_test(full_filepath);
    let fabric = Rc::new(MockFabric::default());
    fabric.set_clock_period(PERIOD);
    let scheduler = Rc::new(MockScheduler::default());
    let host = Rc::new(MockHost::default());
    let top = engine.top().clone();
    let dispatcher = Dispatcher::new_and_register_with_scheduler(
        &engine,
        &top,
        "dispatcher",
        config,
        fabric.clone(),
        host.clone(),
        scheduler.clone(),
    )
    .unwrap();
    Harness {
        engine,
        fabric,
        scheduler,
        host,
        dispatcher,
    }
}

impl Harness {
    pub fn run(&mut self) {
        self.engine.run().unwrap();
    }

    pub fn now(&self) -> u64 {
        self.engine.tick_now()
    }

    pub fn complete(&self, id: u32, wg_id: u32) {
        self.dispatcher
            .notify_wg_completed(&WavefrontContext::new(DispatchId(id), wg_id));
    }

    /// Retire workgroups `first..last` of kernel `id` one at a time.
    pub fn complete_range(&self, id: u32, first: u32, last: u32) {
        for wg_id in first..last {
            self.complete(id, wg_id);
        }
    }
}
