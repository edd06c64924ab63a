// Copyright (c) 2025 Graphcore Ltd. All rights reserved.

//! The per-launch record of a kernel owned by the dispatcher.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Identifies a kernel launch. Unique among the tasks that are live in a
/// dispatcher.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DispatchId(pub u32);

impl fmt::Display for DispatchId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Reference to the host AQL packet that launched a kernel.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PacketRef(pub u64);

/// Address of a host completion signal.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SignalHandle(pub u64);

impl fmt::Display for SignalHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#x}", self.0)
    }
}

/// Identity of the wavefront reporting a workgroup retirement.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct WavefrontContext {
    pub kernel_id: DispatchId,
    pub wg_id: u32,

    /// Compute unit the workgroup ran on, when the reporter knows it.
    pub cu_id: Option<u32>,
}

impl WavefrontContext {
    #[must_use]
    pub fn new(kernel_id: DispatchId, wg_id: u32) -> Self {
        Self {
            kernel_id,
            wg_id,
            cu_id: None,
        }
    }

    #[must_use]
    pub fn on_cu(mut self, cu_id: u32) -> Self {
        self.cu_id = Some(cu_id);
        self
    }
}

/// A kernel launch as seen by the dispatcher.
///
/// The workgroup counts all refer to this chiplet's share of the kernel.
///
/// Hazard state is tracked as a count of outstanding requests plus a flag
/// recording whether the hazard has been started at all. A hazard is done
/// once it has been started and nothing is outstanding, so a task that has
/// not yet been looked at by the dispatcher is never considered clean.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct KernelTask {
    name: String,
    dispatch_id: DispatchId,
    priority: u32,
    queue_id: u32,
    global_queue_id: u32,
    global_kernel_id: u32,
    chiplet_id: u32,
    context_id: u32,
    packet: PacketRef,
    completion_signal: Option<SignalHandle>,

    total_wgs: u32,
    dispatched_wgs: u32,
    completed_wgs: u32,

    inv_started: bool,
    outstanding_invs: u32,
    wb_started: bool,
    outstanding_wbs: u32,

    near_completion_notified: bool,
}

impl KernelTask {
    #[must_use]
    pub fn new(dispatch_id: DispatchId, name: &str, total_wgs: u32) -> Self {
        Self {
            name: name.to_string(),
            dispatch_id,
            priority: 0,
            queue_id: 0,
            global_queue_id: 0,
            global_kernel_id: dispatch_id.0,
            chiplet_id: 0,
            context_id: 0,
            packet: PacketRef::default(),
            completion_signal: None,
            total_wgs,
            dispatched_wgs: 0,
            completed_wgs: 0,
            inv_started: false,
            outstanding_invs: 0,
            wb_started: false,
            outstanding_wbs: 0,
            near_completion_notified: false,
        }
    }

    #[must_use]
    pub fn with_priority(mut self, priority: u32) -> Self {
        self.priority = priority;
        self
    }

    /// Set the host queue and the global (cross-device) queue ids.
    #[must_use]
    pub fn with_queues(mut self, queue_id: u32, global_queue_id: u32) -> Self {
        self.queue_id = queue_id;
        self.global_queue_id = global_queue_id;
        self
    }

    #[must_use]
    pub fn with_global_kernel_id(mut self, global_kernel_id: u32) -> Self {
        self.global_kernel_id = global_kernel_id;
        self
    }

    #[must_use]
    pub fn with_chiplet(mut self, chiplet_id: u32) -> Self {
        self.chiplet_id = chiplet_id;
        self
    }

    #[must_use]
    pub fn with_context(mut self, context_id: u32) -> Self {
        self.context_id = context_id;
        self
    }

    #[must_use]
    pub fn with_packet(mut self, packet: PacketRef) -> Self {
        self.packet = packet;
        self
    }

    #[must_use]
    pub fn with_signal(mut self, signal: SignalHandle) -> Self {
        self.completion_signal = Some(signal);
        self
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn dispatch_id(&self) -> DispatchId {
        self.dispatch_id
    }

    #[must_use]
    pub fn priority(&self) -> u32 {
        self.priority
    }

    #[must_use]
    pub fn queue_id(&self) -> u32 {
        self.queue_id
    }

    #[must_use]
    pub fn global_queue_id(&self) -> u32 {
        self.global_queue_id
    }

    #[must_use]
    pub fn global_kernel_id(&self) -> u32 {
        self.global_kernel_id
    }

    #[must_use]
    pub fn chiplet_id(&self) -> u32 {
        self.chiplet_id
    }

    #[must_use]
    pub fn context_id(&self) -> u32 {
        self.context_id
    }

    #[must_use]
    pub fn packet(&self) -> PacketRef {
        self.packet
    }

    #[must_use]
    pub fn completion_signal(&self) -> Option<SignalHandle> {
        self.completion_signal
    }

    #[must_use]
    pub fn total_wgs(&self) -> u32 {
        self.total_wgs
    }

    /// Index of the next workgroup to be issued.
    #[must_use]
    pub fn next_wg(&self) -> u32 {
        self.dispatched_wgs
    }

    #[must_use]
    pub fn remaining_wgs(&self) -> u32 {
        self.total_wgs - self.dispatched_wgs
    }

    #[must_use]
    pub fn completed_wgs(&self) -> u32 {
        self.completed_wgs
    }

    /// All workgroups have been issued to the fabric (not necessarily run).
    #[must_use]
    pub fn is_dispatch_complete(&self) -> bool {
        self.dispatched_wgs == self.total_wgs
    }

    /// All workgroups have retired.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.completed_wgs == self.total_wgs
    }

    #[must_use]
    pub fn inv_started(&self) -> bool {
        self.inv_started
    }

    #[must_use]
    pub fn outstanding_invs(&self) -> u32 {
        self.outstanding_invs
    }

    #[must_use]
    pub fn is_inv_done(&self) -> bool {
        self.inv_started && self.outstanding_invs == 0
    }

    #[must_use]
    pub fn wb_started(&self) -> bool {
        self.wb_started
    }

    #[must_use]
    pub fn outstanding_wbs(&self) -> u32 {
        self.outstanding_wbs
    }

    #[must_use]
    pub fn is_wb_done(&self) -> bool {
        self.wb_started && self.outstanding_wbs == 0
    }

    #[must_use]
    pub fn near_completion_notified(&self) -> bool {
        self.near_completion_notified
    }

    /// No invalidate is needed before this kernel runs.
    pub fn mark_inv_done(&mut self) {
        self.inv_started = true;
    }

    /// An invalidate has been requested and `issued` requests are now in
    /// flight.
    pub fn begin_invalidate(&mut self, issued: u32) {
        self.inv_started = true;
        self.outstanding_invs += issued;
    }

    /// No writeback is needed for this kernel.
    pub fn mark_wb_done(&mut self) {
        self.wb_started = true;
    }

    pub fn begin_writeback(&mut self, issued: u32) {
        self.wb_started = true;
        self.outstanding_wbs += issued;
    }

    pub fn update_outstanding_invs(&mut self, delta: i32) {
        self.outstanding_invs = apply_delta(self.outstanding_invs, delta, || {
            format!("kernel {} invalidate count", self.dispatch_id)
        });
    }

    pub fn update_outstanding_wbs(&mut self, delta: i32) {
        self.outstanding_wbs = apply_delta(self.outstanding_wbs, delta, || {
            format!("kernel {} writeback count", self.dispatch_id)
        });
    }

    /// Record that the fabric accepted `count` more workgroups.
    pub fn record_dispatched(&mut self, count: u32) {
        assert!(
            count <= self.remaining_wgs(),
            "kernel {} dispatched {count} workgroups with only {} remaining",
            self.dispatch_id,
            self.remaining_wgs()
        );
        self.dispatched_wgs += count;
    }

    /// Record that `count` more workgroups have retired.
    pub fn record_completed(&mut self, count: u32) {
        assert!(
            self.completed_wgs + count <= self.total_wgs,
            "kernel {} completed {} workgroups out of {}",
            self.dispatch_id,
            self.completed_wgs + count,
            self.total_wgs
        );
        self.completed_wgs += count;
    }

    pub(crate) fn set_near_completion_notified(&mut self) {
        self.near_completion_notified = true;
    }
}

fn apply_delta(value: u32, delta: i32, what: impl Fn() -> String) -> u32 {
    match delta {
        1 => value + 1,
        -1 => match value.checked_sub(1) {
            Some(value) => value,
            None => panic!("{} decremented below zero", what()),
        },
        _ => panic!("{} updated by {delta}, expected +1 or -1", what()),
    }
}

impl fmt::Display for KernelTask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}({}) {}/{} dispatched, {} completed",
            self.name, self.dispatch_id, self.dispatched_wgs, self.total_wgs, self.completed_wgs
        )
    }
}
