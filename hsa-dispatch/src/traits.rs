// Copyright (c) 2025 Graphcore Ltd. All rights reserved.

//! The interfaces of the components the dispatcher works with.
//!
//! All calls are made synchronously from within the dispatcher's own event
//! processing. Implementations are free to call back into the dispatcher
//! (for example to report a workgroup retirement) as the dispatcher never
//! holds any of its internal state borrowed across these calls. Requests
//! resolved from inside `prepare_invalidate` or `prepare_writeback` are still
//! counted in the number those calls return.

use hsa_engine::time::Tick;

use crate::task::{KernelTask, PacketRef, SignalHandle};

/// The shader array that workgroups are issued onto.
pub trait ComputeFabric {
    /// Caches must be invalidated before a kernel starts.
    fn requires_acquire_invalidate(&self) -> bool;

    /// The fabric performs its own writeback when a kernel ends, so the
    /// dispatcher never has to wait for one.
    fn releases_at_kernel_end(&self) -> bool;

    /// Start invalidating caches for `task`. Returns the number of requests
    /// issued; each one is later resolved with
    /// [`update_inv_counter`](crate::dispatcher::Dispatcher::update_inv_counter).
    fn prepare_invalidate(&self, task: &KernelTask, flush: bool) -> u32;

    /// Start writing back caches for `task`. Returns the number of requests
    /// issued; each one is later resolved with
    /// [`update_wb_counter`](crate::dispatcher::Dispatcher::update_wb_counter).
    fn prepare_writeback(&self, task: &KernelTask) -> u32;

    fn bind_context(&self, context_id: u32);

    /// Try to issue workgroups of `task` starting at
    /// [`next_wg`](KernelTask::next_wg). Returns how many were accepted,
    /// zero if no compute unit currently has room.
    fn dispatch_workgroups(&self, task: &KernelTask) -> u32;

    fn clock_period(&self) -> Tick;
}

/// Events reported to the global scheduler's event log.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SchedulingEvent {
    /// A device is about to run out of work.
    GpuRequest,
}

/// The system-wide scheduler that assigns kernels to chiplets.
pub trait GlobalScheduler {
    fn cross_chiplet_flush_done(&self, kernel_id: u32, queue_id: u32) -> bool;

    /// Whether a cache flush is needed around `kernel_id` on `chiplet`.
    /// `invalidate` selects the invalidate (true) or writeback (false) query.
    fn flush_required(&self, chiplet: u32, kernel_id: u32, queue_id: u32, invalidate: bool) -> bool;

    fn kernel_wg_finished(&self, queue_id: u32, kernel_id: u32, wg_id: u32);

    fn kernel_complete(&self, queue_id: u32, kernel_id: u32);

    fn record_event(&self, event: SchedulingEvent, queue_id: u32, chiplet: u32, kernel_id: u32);

    fn mark_dispatched(&self, queue_id: u32, kernel_id: u32);

    fn request_scheduling_decision(&self, queue_id: u32, immediate: bool);

    fn notify_mem_sync_completion(
        &self,
        queue_id: u32,
        kernel_id: u32,
        chiplet_id: u32,
        is_invalidate: bool,
    );
}

/// The host packet processor and signal memory.
pub trait HostSync {
    fn finalize_packet(&self, packet: PacketRef, queue_id: u32);

    fn read_signal(&self, signal: SignalHandle) -> i64;

    fn write_signal(&self, signal: SignalHandle, value: i64);
}
