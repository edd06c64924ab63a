// Copyright (c) 2025 Graphcore Ltd. All rights reserved.

mod common;

use common::{Harness, PERIOD, harness, harness_with_config};
use figment::Figment;
use figment::providers::Serialized;
use hsa_dispatch::checkpoint::DispatcherCheckpoint;
use hsa_dispatch::config::{DispatcherConfig, TieBreak};
use hsa_dispatch::task::{DispatchId, KernelTask, SignalHandle};

/// Three kernels stalled for lack of room, with a retry tick pending.
fn stalled(h: &mut Harness) {
    h.fabric.set_free_slots(0);
    h.dispatcher
        .submit(KernelTask::new(DispatchId(1), "a", 2).with_priority(1));
    h.dispatcher.submit(
        KernelTask::new(DispatchId(2), "b", 2)
            .with_priority(4)
            .with_signal(SignalHandle(0x80)),
    );
    h.dispatcher
        .submit(KernelTask::new(DispatchId(3), "c", 2).with_priority(1));
    h.run();
    h.dispatcher.schedule_dispatch();
}

#[test]
fn checkpoint_contents() {
    let mut h = harness(file!());
    stalled(&mut h);

    let checkpoint = h.dispatcher.checkpoint();
    assert_eq!(checkpoint.tick, Some(2 * PERIOD));
    assert_eq!(checkpoint.tasks.len(), 3);
    assert_eq!(
        checkpoint.queue,
        [2, 1, 3].map(DispatchId).to_vec()
    );
    assert!(checkpoint.tasks.iter().all(|t| t.is_inv_done()));
}

#[test]
fn restore_resumes_dispatch() {
    let mut h = harness(file!());
    stalled(&mut h);
    let checkpoint = h.dispatcher.checkpoint();

    let mut restored = harness(file!());
    restored.dispatcher.restore(&checkpoint).unwrap();
    assert_eq!(restored.dispatcher.next_tick(), Some(2 * PERIOD));
    assert_eq!(restored.dispatcher.live_tasks(), 3);
    assert_eq!(restored.dispatcher.queued(), 3);
    assert_eq!(restored.dispatcher.checkpoint(), checkpoint);

    restored.run();
    assert_eq!(restored.now(), 2 * PERIOD);
    assert_eq!(
        restored.fabric.launch_order(),
        [2, 1, 3].map(DispatchId).to_vec()
    );
}

#[test]
fn restore_keeps_lifo_order() {
    let config = DispatcherConfig {
        tie_break: TieBreak::Lifo,
        ..Default::default()
    };
    let mut h = harness_with_config(file!(), config.clone());
    stalled(&mut h);
    let checkpoint = h.dispatcher.checkpoint();
    assert_eq!(
        checkpoint.queue,
        [2, 3, 1].map(DispatchId).to_vec()
    );

    let mut restored = harness_with_config(file!(), config);
    restored.dispatcher.restore(&checkpoint).unwrap();
    assert_eq!(restored.dispatcher.checkpoint().queue, checkpoint.queue);
    restored.run();
    assert_eq!(
        restored.fabric.launch_order(),
        [2, 3, 1].map(DispatchId).to_vec()
    );
}

#[test]
fn restore_replaces_pending_tick() {
    let mut h = harness(file!());
    h.dispatcher
        .submit(KernelTask::new(DispatchId(1), "a", 1));
    assert!(h.dispatcher.tick_scheduled());

    h.dispatcher
        .restore(&DispatcherCheckpoint::default())
        .unwrap();
    assert!(!h.dispatcher.tick_scheduled());
    assert_eq!(h.dispatcher.live_tasks(), 0);

    h.run();
    assert_eq!(h.now(), 0);
    assert!(h.fabric.calls().is_empty());
}

#[test]
fn restore_moves_pending_tick_earlier() {
    let mut h = harness(file!());
    stalled(&mut h);
    let checkpoint = h.dispatcher.checkpoint();

    let mut restored = harness(file!());
    restored.dispatcher.restore(&checkpoint).unwrap();
    restored.engine.run_until(0).unwrap();

    let earlier = DispatcherCheckpoint {
        tick: Some(PERIOD),
        ..checkpoint
    };
    restored.dispatcher.restore(&earlier).unwrap();
    restored.run();

    // The wait for the replaced tick is dropped and never moves time on.
    assert_eq!(restored.now(), PERIOD);
    assert_eq!(
        restored.fabric.launch_order(),
        [2, 1, 3].map(DispatchId).to_vec()
    );
    assert!(!restored.dispatcher.tick_scheduled());
}

#[test]
fn bad_checkpoints_are_rejected() {
    let mut h = harness(file!());
    stalled(&mut h);
    let good = h.dispatcher.checkpoint();

    let unknown = DispatcherCheckpoint {
        queue: vec![DispatchId(99)],
        ..good.clone()
    };
    assert!(h.dispatcher.restore(&unknown).is_err());

    let mut twice = good.clone();
    twice.queue.push(DispatchId(1));
    assert!(h.dispatcher.restore(&twice).is_err());

    let mut duplicate = good.clone();
    duplicate.tasks.push(duplicate.tasks[0].clone());
    assert!(h.dispatcher.restore(&duplicate).is_err());

    let past = DispatcherCheckpoint {
        tick: Some(PERIOD / 2),
        ..good.clone()
    };
    assert!(h.dispatcher.restore(&past).is_err());

    // Nothing was changed by the failed attempts.
    assert_eq!(h.dispatcher.checkpoint(), good);
}

#[test]
fn checkpoint_serializes() {
    let mut h = harness(file!());
    stalled(&mut h);
    let checkpoint = h.dispatcher.checkpoint();

    let loaded: DispatcherCheckpoint = Figment::from(Serialized::defaults(&checkpoint))
        .extract()
        .unwrap();
    assert_eq!(loaded, checkpoint);
}
