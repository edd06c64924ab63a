// Copyright (c) 2025 Graphcore Ltd. All rights reserved.

mod common;

use std::cell::OnceCell;
use std::rc::{Rc, Weak};

use common::{PERIOD, harness};
use hsa_dispatch::config::DispatcherConfig;
use hsa_dispatch::dispatcher::Dispatcher;
use hsa_dispatch::task::{DispatchId, KernelTask};
use hsa_dispatch::test_helpers::{FabricCall, MockFabric, MockHost, MockScheduler, SchedulerCall};
use hsa_dispatch::traits::ComputeFabric;
use hsa_engine::test_helpers::start_test;
use hsa_engine::time::Tick;

/// A fabric whose caches answer straight away: one request of each issued
/// batch resolves before the issuing call returns.
struct InstantCaches {
    inner: MockFabric,
    dispatcher: OnceCell<Weak<Dispatcher>>,
}

impl InstantCaches {
    fn dispatcher(&self) -> Rc<Dispatcher> {
        self.dispatcher.get().and_then(Weak::upgrade).unwrap()
    }
}

impl ComputeFabric for InstantCaches {
    fn requires_acquire_invalidate(&self) -> bool {
        self.inner.requires_acquire_invalidate()
    }

    fn releases_at_kernel_end(&self) -> bool {
        self.inner.releases_at_kernel_end()
    }

    fn prepare_invalidate(&self, task: &KernelTask, flush: bool) -> u32 {
        let issued = self.inner.prepare_invalidate(task, flush);
        self.dispatcher().update_inv_counter(task.dispatch_id(), -1);
        issued
    }

    fn prepare_writeback(&self, task: &KernelTask) -> u32 {
        let issued = self.inner.prepare_writeback(task);
        assert!(!self.dispatcher().update_wb_counter(task.dispatch_id(), -1));
        issued
    }

    fn bind_context(&self, context_id: u32) {
        self.inner.bind_context(context_id);
    }

    fn dispatch_workgroups(&self, task: &KernelTask) -> u32 {
        self.inner.dispatch_workgroups(task)
    }

    fn clock_period(&self) -> Tick {
        self.inner.clock_period()
    }
}

fn instant_caches(
    full_filepath: &str,
    issued: u32,
) -> (hsa_engine::engine::Engine, Rc<InstantCaches>, Rc<Dispatcher>) {
    let engine = start_test(full_filepath);
    let inner = MockFabric::default();
    inner.set_clock_period(PERIOD);
    inner.set_acquire_invalidate(true);
    inner.set_invalidates_issued(issued);
    inner.set_writebacks_issued(issued);
    let fabric = Rc::new(InstantCaches {
        inner,
        dispatcher: OnceCell::new(),
    });
    let scheduler = Rc::new(MockScheduler::default());
    scheduler.set_invalidate_flush(true);
    scheduler.set_writeback_flush(true);
    let top = engine.top().clone();
    let dispatcher = Dispatcher::new_and_register_with_scheduler(
        &engine,
        &top,
        "dispatcher",
        DispatcherConfig::default(),
        fabric.clone(),
        Rc::new(MockHost::default()),
        scheduler,
    )
    .unwrap();
    assert!(fabric.dispatcher.set(Rc::downgrade(&dispatcher)).is_ok());
    (engine, fabric, dispatcher)
}

#[test]
fn invalidate_is_requested_once() {
    let mut h = harness(file!());
    h.fabric.set_acquire_invalidate(true);
    h.scheduler.set_invalidate_flush(true);

    let id = DispatchId(1);
    h.dispatcher.submit(KernelTask::new(id, "k", 1));
    h.run();
    h.dispatcher.schedule_dispatch();
    h.run();

    let requests: Vec<_> = h
        .fabric
        .calls()
        .into_iter()
        .filter(|c| matches!(c, FabricCall::PrepareInvalidate { .. }))
        .collect();
    assert_eq!(
        requests,
        vec![FabricCall::PrepareInvalidate {
            kernel: id,
            flush: true
        }]
    );
    assert_eq!(h.fabric.dispatched(id), 0);
}

#[test]
fn flush_queries_use_chiplet_offset_and_kind() {
    let mut h = common::harness_with_config(
        file!(),
        hsa_dispatch::config::DispatcherConfig {
            gpu_id: hsa_dispatch::config::STARTING_GPU_ID + 2,
            ..Default::default()
        },
    );
    h.fabric.set_acquire_invalidate(true);
    h.fabric.set_invalidates_issued(0);

    h.dispatcher
        .submit(KernelTask::new(DispatchId(1), "k", 1).with_queues(0, 5).with_global_kernel_id(11));
    h.run();

    let queries: Vec<_> = h
        .scheduler
        .calls()
        .into_iter()
        .filter(|c| matches!(c, SchedulerCall::FlushRequired { .. }))
        .collect();
    assert_eq!(
        queries,
        vec![
            SchedulerCall::FlushRequired {
                chiplet: 2,
                kernel_id: 11,
                queue_id: 5,
                invalidate: true
            },
            SchedulerCall::FlushRequired {
                chiplet: 2,
                kernel_id: 11,
                queue_id: 5,
                invalidate: false
            },
        ]
    );
}

#[test]
fn writeback_blocks_until_resolved() {
    let mut h = harness(file!());
    h.scheduler.set_writeback_flush(true);
    h.fabric.set_writebacks_issued(2);

    let id = DispatchId(4);
    h.dispatcher.submit(KernelTask::new(id, "k", 1));
    h.run();
    assert_eq!(h.fabric.dispatched(id), 0);
    assert_eq!(h.dispatcher.outstanding_wbs(id), 2);

    assert!(!h.dispatcher.update_wb_counter(id, -1));
    assert!(!h.dispatcher.tick_scheduled());
    assert!(h.dispatcher.update_wb_counter(id, -1));
    assert_eq!(h.dispatcher.outstanding_wbs(id), 0);

    // Resolving the last writeback arms the tick just like an invalidate.
    assert!(h.dispatcher.tick_scheduled());
    h.run();
    assert_eq!(h.fabric.dispatched(id), 1);
    assert_eq!(
        h.fabric
            .calls()
            .iter()
            .filter(|c| matches!(c, FabricCall::PrepareWriteback { .. }))
            .count(),
        1
    );
}

#[test]
fn release_at_end_skips_writeback() {
    let mut h = harness(file!());
    h.fabric.set_release_at_end(true);
    h.scheduler.set_writeback_flush(true);

    let id = DispatchId(2);
    h.dispatcher.submit(KernelTask::new(id, "k", 3));
    h.run();
    assert_eq!(h.fabric.dispatched(id), 3);
    assert!(
        !h.fabric
            .calls()
            .iter()
            .any(|c| matches!(c, FabricCall::PrepareWriteback { .. }))
    );

    // A release issued by the fabric at kernel end is still counted.
    h.dispatcher.update_wb_counter(id, 1);
    assert_eq!(h.dispatcher.outstanding_wbs(id), 1);
    assert!(h.dispatcher.update_wb_counter(id, -1));
}

#[test]
fn cross_chiplet_flush_gates_dispatch() {
    let mut h = harness(file!());
    h.scheduler.set_cross_chiplet_flush_done(false);

    let id = DispatchId(9);
    h.dispatcher.submit(KernelTask::new(id, "k", 1));
    h.run();
    assert_eq!(h.fabric.dispatched(id), 0);
    assert!(h.dispatcher.lookup(id).is_inv_done());
    assert!(h.dispatcher.lookup(id).is_wb_done());

    h.scheduler.set_cross_chiplet_flush_done(true);
    h.dispatcher.schedule_dispatch();
    h.run();
    assert_eq!(h.fabric.dispatched(id), 1);
}

#[test]
fn context_is_bound_before_dispatch() {
    let mut h = harness(file!());
    h.fabric.set_free_slots(2);

    let id = DispatchId(1);
    h.dispatcher
        .submit(KernelTask::new(id, "k", 3).with_context(42));
    h.run();

    let calls = h.fabric.calls();
    let bind = calls
        .iter()
        .position(|c| *c == FabricCall::BindContext(42))
        .unwrap();
    let dispatch = calls
        .iter()
        .position(|c| matches!(c, FabricCall::Dispatch { .. }))
        .unwrap();
    assert!(bind < dispatch);
    assert_eq!(h.dispatcher.lookup(id).next_wg(), 2);

    h.fabric.release_slots(1);
    h.dispatcher.schedule_dispatch();
    h.run();
    assert!(h.fabric.calls().contains(&FabricCall::Dispatch {
        kernel: id,
        first_wg: 2,
        accepted: 1
    }));
}

#[test]
#[should_panic(expected = "expected +1 or -1")]
fn invalid_delta_is_fatal() {
    let h = harness(file!());
    let id = DispatchId(1);
    h.dispatcher.submit(KernelTask::new(id, "k", 1));
    h.dispatcher.update_inv_counter(id, 3);
}

#[test]
#[should_panic(expected = "unknown kernel 8")]
fn resolving_unknown_kernel_is_fatal() {
    let h = harness(file!());
    h.dispatcher.update_wb_counter(DispatchId(8), -1);
}

#[test]
fn requests_resolved_while_issuing_are_counted() {
    let (mut engine, fabric, dispatcher) = instant_caches(file!(), 1);

    let id = DispatchId(3);
    dispatcher.submit(KernelTask::new(id, "k", 2));
    engine.run().unwrap();

    let task = dispatcher.lookup(id);
    assert_eq!(task.outstanding_invs(), 0);
    assert_eq!(task.outstanding_wbs(), 0);
    assert_eq!(fabric.inner.dispatched(id), 2);
    assert_eq!(engine.tick_now(), PERIOD);
}

#[test]
fn partly_resolved_batch_still_blocks() {
    let (mut engine, fabric, dispatcher) = instant_caches(file!(), 3);

    let id = DispatchId(5);
    dispatcher.submit(KernelTask::new(id, "k", 1));
    engine.run().unwrap();
    assert_eq!(dispatcher.lookup(id).outstanding_invs(), 2);
    assert_eq!(dispatcher.outstanding_wbs(id), 2);
    assert_eq!(fabric.inner.dispatched(id), 0);

    for _ in 0..2 {
        dispatcher.update_inv_counter(id, -1);
    }
    assert!(!dispatcher.update_wb_counter(id, -1));
    assert!(dispatcher.update_wb_counter(id, -1));
    engine.run().unwrap();
    assert_eq!(fabric.inner.dispatched(id), 1);
}
