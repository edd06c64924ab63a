// Copyright (c) 2025 Graphcore Ltd. All rights reserved.

//! Synthetic kernel launches.
//!
//! Each hardware queue gets the same number of identical kernels. Queues with
//! a higher index have a higher priority. All kernels on a queue share one
//! completion signal that starts at the number of kernels on that queue, so
//! every signal reads zero once the workload has finished.

use hsa_dispatch::task::{DispatchId, KernelTask, PacketRef, SignalHandle};

use crate::config::Params;

const PACKET_BASE: u64 = 0x1_0000;
const PACKET_SIZE: u64 = 64;
const SIGNAL_BASE: u64 = 0x8_0000;
const SIGNAL_SIZE: u64 = 8;

#[must_use]
pub fn completion_signal(queue_id: u32) -> SignalHandle {
    SignalHandle(SIGNAL_BASE + u64::from(queue_id) * SIGNAL_SIZE)
}

/// Completion signals with their starting values.
#[must_use]
pub fn completion_signals(params: &Params) -> Vec<(SignalHandle, i64)> {
    (0..params.num_queues)
        .map(|queue_id| {
            (
                completion_signal(queue_id),
                i64::from(params.kernels_per_queue),
            )
        })
        .collect()
}

/// The kernels of each queue, in submission order.
#[must_use]
pub fn build(params: &Params) -> Vec<Vec<KernelTask>> {
    let mut next_id = 1;
    (0..params.num_queues)
        .map(|queue_id| {
            (0..params.kernels_per_queue)
                .map(|index| {
                    let id = next_id;
                    next_id += 1;
                    KernelTask::new(
                        DispatchId(id),
                        &format!("q{queue_id}_kernel{index}"),
                        params.wgs_per_kernel,
                    )
                    .with_priority(queue_id)
                    .with_queues(queue_id, queue_id)
                    .with_chiplet(params.dispatcher.completion_owner_chiplet)
                    .with_context(queue_id)
                    .with_packet(PacketRef(PACKET_BASE + u64::from(id) * PACKET_SIZE))
                    .with_signal(completion_signal(queue_id))
                })
                .collect()
        })
        .collect()
}
