// Copyright (c) 2025 Graphcore Ltd. All rights reserved.

mod common;

use std::rc::Rc;

use common::harness;
use hsa_dispatch::config::DispatcherConfig;
use hsa_dispatch::dispatcher::Dispatcher;
use hsa_dispatch::task::{DispatchId, KernelTask};
use hsa_dispatch::test_helpers::{MockFabric, MockHost, MockScheduler, SchedulerCall};
use hsa_engine::test_helpers::start_test;

#[test]
fn finished_tasks_are_retired() {
    let mut h = harness(file!());
    for id in 0..4 {
        h.dispatcher.submit(KernelTask::new(DispatchId(id), "k", 2));
    }
    h.run();
    assert_eq!(h.dispatcher.live_tasks(), 4);

    h.complete_range(0, 0, 2);
    h.complete_range(2, 0, 2);
    assert_eq!(h.dispatcher.live_tasks(), 2);
    assert!(!h.dispatcher.is_live(DispatchId(0)));
    assert!(h.dispatcher.is_live(DispatchId(1)));

    // A retired id can be used again.
    h.dispatcher.submit(KernelTask::new(DispatchId(0), "again", 1));
    h.run();
    assert_eq!(h.dispatcher.lookup(DispatchId(0)).name(), "again");
    assert_eq!(h.dispatcher.stats().num_kernels_launched.value(), 5);
}

#[test]
fn workgroups_retiring_during_dispatch() {
    // Retirements reported before the dispatch loop records the issue still
    // leave the task to be retired once dispatch finishes.
    let mut h = harness(file!());
    h.fabric.set_free_slots(1);
    let id = DispatchId(1);
    h.dispatcher.submit(KernelTask::new(id, "k", 2));
    h.run();
    h.complete(1, 0);
    h.complete(1, 1);
    assert!(h.dispatcher.is_live(id));
    assert_eq!(h.scheduler.kernel_completions(1), 1);

    h.fabric.release_slots(1);
    h.run();
    assert!(!h.dispatcher.is_live(id));
}

#[test]
fn launched_counts_submissions() {
    let mut h = harness(file!());
    h.fabric.set_free_slots(0);
    h.dispatcher.submit(KernelTask::new(DispatchId(1), "k", 1));
    h.dispatcher.submit(KernelTask::new(DispatchId(2), "k", 1));
    h.run();
    h.dispatcher.schedule_dispatch();
    h.run();

    let stats = h.dispatcher.stats();
    assert_eq!(stats.num_kernels_launched.value(), 2);
    assert_eq!(stats.cycles_waiting_for_dispatch.value(), 2);

    let mut out = String::new();
    stats.dump(&mut out, "dispatcher").unwrap();
    assert!(out.contains("dispatcher.num_kernels_launched"));
}

#[test]
fn empty_tick_does_not_count_as_waiting() {
    let mut h = harness(file!());
    h.dispatcher.schedule_dispatch();
    h.run();
    assert_eq!(h.dispatcher.stats().cycles_waiting_for_dispatch.value(), 0);
}

#[test]
fn mem_sync_completion_is_forwarded() {
    let h = harness(file!());
    h.dispatcher.notify_mem_sync_completion(1, 2, 3, true);
    assert_eq!(
        h.scheduler.calls(),
        vec![SchedulerCall::MemSyncCompletion {
            queue_id: 1,
            kernel_id: 2,
            chiplet_id: 3,
            is_invalidate: true
        }]
    );
}

#[test]
fn scheduler_can_be_bound_later() {
    let mut engine = start_test(file!());
    let fabric = Rc::new(MockFabric::default());
    let top = engine.top().clone();
    let dispatcher = Dispatcher::new_and_register(
        &engine,
        &top,
        "dispatcher",
        DispatcherConfig::default(),
        fabric.clone(),
        Rc::new(MockHost::default()),
    )
    .unwrap();

    dispatcher.submit(KernelTask::new(DispatchId(1), "k", 1));
    dispatcher.bind_scheduler(Rc::new(MockScheduler::default()));
    engine.run().unwrap();
    assert_eq!(fabric.dispatched(DispatchId(1)), 1);
}

#[test]
fn invalid_config_is_an_error() {
    let engine = start_test(file!());
    let top = engine.top().clone();
    let result = Dispatcher::new_and_register(
        &engine,
        &top,
        "dispatcher",
        DispatcherConfig {
            threshold: -0.1,
            ..Default::default()
        },
        Rc::new(MockFabric::default()),
        Rc::new(MockHost::default()),
    );
    assert!(result.is_err());
}

#[test]
#[should_panic(expected = "global scheduler already bound")]
fn scheduler_binds_once() {
    let h = harness(file!());
    h.dispatcher.bind_scheduler(Rc::new(MockScheduler::default()));
}

#[test]
#[should_panic(expected = "global scheduler used before being bound")]
fn tick_needs_scheduler() {
    let mut engine = start_test(file!());
    let top = engine.top().clone();
    let dispatcher = Dispatcher::new_and_register(
        &engine,
        &top,
        "dispatcher",
        DispatcherConfig::default(),
        Rc::new(MockFabric::default()),
        Rc::new(MockHost::default()),
    )
    .unwrap();
    dispatcher.submit(KernelTask::new(DispatchId(1), "k", 1));
    engine.run().unwrap();
}

#[test]
#[should_panic(expected = "kernel 3 submitted while already live")]
fn duplicate_submission_is_fatal() {
    let h = harness(file!());
    h.dispatcher.submit(KernelTask::new(DispatchId(3), "a", 1));
    h.dispatcher.submit(KernelTask::new(DispatchId(3), "b", 1));
}

#[test]
#[should_panic(expected = "has no workgroups")]
fn empty_kernel_is_fatal() {
    let h = harness(file!());
    h.dispatcher.submit(KernelTask::new(DispatchId(3), "a", 0));
}

#[test]
#[should_panic(expected = "unknown kernel 12")]
fn lookup_of_unknown_kernel_is_fatal() {
    let h = harness(file!());
    let _ = h.dispatcher.lookup(DispatchId(12));
}
