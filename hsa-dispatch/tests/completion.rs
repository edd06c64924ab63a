// Copyright (c) 2025 Graphcore Ltd. All rights reserved.

mod common;

use common::{PERIOD, harness, harness_with_config};
use hsa_dispatch::config::{DispatcherConfig, NearCompletionMode};
use hsa_dispatch::task::{DispatchId, KernelTask, SignalHandle, WavefrontContext};
use hsa_dispatch::test_helpers::SchedulerCall;

#[test]
fn owning_chiplet_decrements_signal() {
    let mut h = harness(file!());
    let signal = SignalHandle(0x1000);
    h.host.set_signal(signal, 1);

    h.dispatcher
        .submit(KernelTask::new(DispatchId(1), "k", 1).with_chiplet(1).with_signal(signal));
    h.run();
    h.complete(1, 0);

    assert_eq!(h.host.signal(signal), 0);
    assert_eq!(h.host.signal_writes(), 1);
}

#[test]
fn signal_decremented_once_across_chiplets() {
    let mut h = harness(file!());
    let signal = SignalHandle(0x2000);
    h.host.set_signal(signal, 1);

    // The same kernel split over chiplets 0, 1 and 2.
    for chiplet in 0..3 {
        h.dispatcher.submit(
            KernelTask::new(DispatchId(10 + chiplet), "k", 2)
                .with_chiplet(chiplet)
                .with_global_kernel_id(5)
                .with_signal(signal),
        );
    }
    h.run();
    for chiplet in 0..3 {
        h.complete_range(10 + chiplet, 0, 2);
    }

    assert_eq!(h.host.signal(signal), 0);
    assert_eq!(h.host.signal_writes(), 1);
    assert_eq!(h.host.finalized().len(), 3);
    assert_eq!(h.scheduler.kernel_completions(5), 3);
}

#[test]
fn every_workgroup_is_reported() {
    let mut h = harness(file!());
    h.dispatcher
        .submit(KernelTask::new(DispatchId(1), "k", 3).with_queues(0, 2));
    h.run();
    h.complete_range(1, 0, 3);

    let finished: Vec<u32> = h
        .scheduler
        .calls()
        .iter()
        .filter_map(|c| match c {
            SchedulerCall::WgFinished { wg_id, .. } => Some(*wg_id),
            _ => None,
        })
        .collect();
    assert_eq!(finished, vec![0, 1, 2]);
}

#[test]
fn completion_arms_tick_once() {
    let mut h = harness(file!());
    h.dispatcher.submit(KernelTask::new(DispatchId(1), "k", 4));
    h.run();
    assert!(!h.dispatcher.tick_scheduled());

    h.complete(1, 0);
    h.complete(1, 1);
    assert!(h.dispatcher.tick_scheduled());
    assert_eq!(h.dispatcher.next_tick(), Some(2 * PERIOD));
}

#[test]
fn reaching_kernel_end() {
    let mut h = harness(file!());
    let id = DispatchId(1);
    h.dispatcher.submit(KernelTask::new(id, "k", 2));
    h.run();

    let ctx = WavefrontContext::new(id, 0).on_cu(3);
    assert!(!h.dispatcher.is_reaching_kernel_end(&ctx));
    h.dispatcher.notify_wg_completed(&ctx);
    assert!(h.dispatcher.is_reaching_kernel_end(&WavefrontContext::new(id, 1)));
    assert_eq!(h.dispatcher.lookup(id).completed_wgs(), 1);
}

#[test]
fn exact_mode_misses_batched_jump() {
    let mut h = harness_with_config(
        file!(),
        DispatcherConfig {
            threshold: 0.5,
            ..Default::default()
        },
    );
    let id = DispatchId(1);
    h.dispatcher.submit(KernelTask::new(id, "k", 10));
    h.run();

    h.dispatcher
        .notify_wgs_completed(&WavefrontContext::new(id, 0), 4);
    h.dispatcher
        .notify_wgs_completed(&WavefrontContext::new(id, 4), 2);
    assert_eq!(h.scheduler.more_work_requests(1), 0);
}

#[test]
fn crossing_mode_catches_batched_jump() {
    let mut h = harness_with_config(
        file!(),
        DispatcherConfig {
            threshold: 0.5,
            near_completion: NearCompletionMode::Crossing,
            ..Default::default()
        },
    );
    let id = DispatchId(1);
    h.dispatcher.submit(KernelTask::new(id, "k", 10));
    h.run();

    h.dispatcher
        .notify_wgs_completed(&WavefrontContext::new(id, 0), 4);
    h.dispatcher
        .notify_wgs_completed(&WavefrontContext::new(id, 4), 2);
    assert_eq!(h.scheduler.more_work_requests(1), 1);

    h.dispatcher
        .notify_wgs_completed(&WavefrontContext::new(id, 6), 4);
    assert_eq!(h.scheduler.more_work_requests(1), 1);
    assert_eq!(h.scheduler.kernel_completions(1), 1);
    assert_eq!(
        h.scheduler.count(|c| matches!(c, SchedulerCall::WgFinished { .. })),
        10
    );
}

#[test]
#[should_panic(expected = "completed 3 workgroups out of 2")]
fn completing_beyond_total_is_fatal() {
    let mut h = harness(file!());
    // Keep the task live by holding back its last workgroup from the fabric.
    h.fabric.set_free_slots(1);
    h.dispatcher.submit(KernelTask::new(DispatchId(1), "k", 2));
    h.run();
    h.dispatcher
        .notify_wgs_completed(&WavefrontContext::new(DispatchId(1), 0), 3);
}

#[test]
#[should_panic(expected = "unknown kernel 1")]
fn completion_after_retirement_is_fatal() {
    let mut h = harness(file!());
    h.dispatcher.submit(KernelTask::new(DispatchId(1), "k", 1));
    h.run();
    h.complete(1, 0);
    h.complete(1, 0);
}

#[test]
#[should_panic(expected = "unknown kernel 6")]
fn end_query_for_unknown_kernel_is_fatal() {
    let h = harness(file!());
    h.dispatcher.submit(KernelTask::new(DispatchId(5), "k", 2));
    let _ = h
        .dispatcher
        .is_reaching_kernel_end(&WavefrontContext::new(DispatchId(6), 0));
}
