// Copyright (c) 2025 Graphcore Ltd. All rights reserved.

//! Recording stand-ins for the dispatcher's collaborators.
//!
//! Each mock logs the calls it receives so that tests can assert on the
//! exact interaction, and exposes setters to steer the answers it gives.

use std::cell::{Cell, RefCell};
use std::collections::{HashMap, HashSet};

use hsa_engine::time::{TICKS_PER_NS, Tick};

use crate::task::{DispatchId, KernelTask, PacketRef, SignalHandle};
use crate::traits::{ComputeFabric, GlobalScheduler, HostSync, SchedulingEvent};

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FabricCall {
    PrepareInvalidate { kernel: DispatchId, flush: bool },
    PrepareWriteback { kernel: DispatchId },
    BindContext(u32),
    Dispatch {
        kernel: DispatchId,
        first_wg: u32,
        accepted: u32,
    },
}

/// A fabric with a pool of free workgroup slots.
pub struct MockFabric {
    acquire_invalidate: Cell<bool>,
    release_at_end: Cell<bool>,
    free_slots: Cell<u32>,
    no_fit: RefCell<HashSet<DispatchId>>,
    invalidates_issued: Cell<u32>,
    invalidates_issued_for: RefCell<HashMap<DispatchId, u32>>,
    writebacks_issued: Cell<u32>,
    clock_period: Cell<Tick>,
    calls: RefCell<Vec<FabricCall>>,
}

impl Default for MockFabric {
    fn default() -> Self {
        Self {
            acquire_invalidate: Cell::new(false),
            release_at_end: Cell::new(false),
            free_slots: Cell::new(u32::MAX),
            no_fit: RefCell::new(HashSet::new()),
            invalidates_issued: Cell::new(1),
            invalidates_issued_for: RefCell::new(HashMap::new()),
            writebacks_issued: Cell::new(1),
            clock_period: Cell::new(TICKS_PER_NS),
            calls: RefCell::new(Vec::new()),
        }
    }
}

impl MockFabric {
    pub fn set_acquire_invalidate(&self, value: bool) {
        self.acquire_invalidate.set(value);
    }

    pub fn set_release_at_end(&self, value: bool) {
        self.release_at_end.set(value);
    }

    pub fn set_free_slots(&self, slots: u32) {
        self.free_slots.set(slots);
    }

    /// Return `slots` to the free pool.
    pub fn release_slots(&self, slots: u32) {
        self.free_slots.set(self.free_slots.get().saturating_add(slots));
    }

    /// Control whether any workgroup of `kernel` fits, whatever the free
    /// slots.
    pub fn set_fits(&self, kernel: DispatchId, fits: bool) {
        let mut no_fit = self.no_fit.borrow_mut();
        if fits {
            no_fit.remove(&kernel);
        } else {
            no_fit.insert(kernel);
        }
    }

    #[must_use]
    pub fn free_slots(&self) -> u32 {
        self.free_slots.get()
    }

    /// Number of requests each call to `prepare_invalidate` reports.
    pub fn set_invalidates_issued(&self, issued: u32) {
        self.invalidates_issued.set(issued);
    }

    /// Override the number of invalidate requests reported for `kernel`.
    pub fn set_invalidates_issued_for(&self, kernel: DispatchId, issued: u32) {
        self.invalidates_issued_for
            .borrow_mut()
            .insert(kernel, issued);
    }

    pub fn set_writebacks_issued(&self, issued: u32) {
        self.writebacks_issued.set(issued);
    }

    pub fn set_clock_period(&self, period: Tick) {
        self.clock_period.set(period);
    }

    #[must_use]
    pub fn calls(&self) -> Vec<FabricCall> {
        self.calls.borrow().clone()
    }

    pub fn clear_calls(&self) {
        self.calls.borrow_mut().clear();
    }

    /// Total workgroups of `kernel` accepted so far.
    #[must_use]
    pub fn dispatched(&self, kernel: DispatchId) -> u32 {
        self.calls
            .borrow()
            .iter()
            .map(|call| match call {
                FabricCall::Dispatch {
                    kernel: k,
                    accepted,
                    ..
                } if *k == kernel => *accepted,
                _ => 0,
            })
            .sum()
    }

    /// Kernels in the order they first had workgroups accepted.
    #[must_use]
    pub fn launch_order(&self) -> Vec<DispatchId> {
        let mut order = Vec::new();
        for call in self.calls.borrow().iter() {
            if let FabricCall::Dispatch {
                kernel, accepted, ..
            } = call
            {
                if *accepted > 0 && !order.contains(kernel) {
                    order.push(*kernel);
                }
            }
        }
        order
    }
}

impl ComputeFabric for MockFabric {
    fn requires_acquire_invalidate(&self) -> bool {
        self.acquire_invalidate.get()
    }

    fn releases_at_kernel_end(&self) -> bool {
        self.release_at_end.get()
    }

    fn prepare_invalidate(&self, task: &KernelTask, flush: bool) -> u32 {
        self.calls.borrow_mut().push(FabricCall::PrepareInvalidate {
            kernel: task.dispatch_id(),
            flush,
        });
        self.invalidates_issued_for
            .borrow()
            .get(&task.dispatch_id())
            .copied()
            .unwrap_or(self.invalidates_issued.get())
    }

    fn prepare_writeback(&self, task: &KernelTask) -> u32 {
        self.calls.borrow_mut().push(FabricCall::PrepareWriteback {
            kernel: task.dispatch_id(),
        });
        self.writebacks_issued.get()
    }

    fn bind_context(&self, context_id: u32) {
        self.calls
            .borrow_mut()
            .push(FabricCall::BindContext(context_id));
    }

    fn dispatch_workgroups(&self, task: &KernelTask) -> u32 {
        let accepted = if self.no_fit.borrow().contains(&task.dispatch_id()) {
            0
        } else {
            task.remaining_wgs().min(self.free_slots.get())
        };
        self.free_slots.set(self.free_slots.get() - accepted);
        self.calls.borrow_mut().push(FabricCall::Dispatch {
            kernel: task.dispatch_id(),
            first_wg: task.next_wg(),
            accepted,
        });
        accepted
    }

    fn clock_period(&self) -> Tick {
        self.clock_period.get()
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SchedulerCall {
    FlushRequired {
        chiplet: u32,
        kernel_id: u32,
        queue_id: u32,
        invalidate: bool,
    },
    WgFinished {
        queue_id: u32,
        kernel_id: u32,
        wg_id: u32,
    },
    KernelComplete {
        queue_id: u32,
        kernel_id: u32,
    },
    RecordEvent {
        event: SchedulingEvent,
        queue_id: u32,
        chiplet: u32,
        kernel_id: u32,
    },
    MarkDispatched {
        queue_id: u32,
        kernel_id: u32,
    },
    SchedulingDecision {
        queue_id: u32,
        immediate: bool,
    },
    MemSyncCompletion {
        queue_id: u32,
        kernel_id: u32,
        chiplet_id: u32,
        is_invalidate: bool,
    },
}

pub struct MockScheduler {
    invalidate_flush: Cell<bool>,
    writeback_flush: Cell<bool>,
    cross_chiplet_flush_done: Cell<bool>,
    calls: RefCell<Vec<SchedulerCall>>,
}

impl Default for MockScheduler {
    fn default() -> Self {
        Self {
            invalidate_flush: Cell::new(false),
            writeback_flush: Cell::new(false),
            cross_chiplet_flush_done: Cell::new(true),
            calls: RefCell::new(Vec::new()),
        }
    }
}

impl MockScheduler {
    /// Answer for `flush_required` for an invalidate.
    pub fn set_invalidate_flush(&self, value: bool) {
        self.invalidate_flush.set(value);
    }

    /// Answer for `flush_required` for a writeback.
    pub fn set_writeback_flush(&self, value: bool) {
        self.writeback_flush.set(value);
    }

    pub fn set_cross_chiplet_flush_done(&self, value: bool) {
        self.cross_chiplet_flush_done.set(value);
    }

    #[must_use]
    pub fn calls(&self) -> Vec<SchedulerCall> {
        self.calls.borrow().clone()
    }

    pub fn clear_calls(&self) {
        self.calls.borrow_mut().clear();
    }

    #[must_use]
    pub fn count(&self, matches: impl Fn(&SchedulerCall) -> bool) -> usize {
        self.calls.borrow().iter().filter(|c| matches(c)).count()
    }

    #[must_use]
    pub fn kernel_completions(&self, kernel_id: u32) -> usize {
        self.count(|c| matches!(c, SchedulerCall::KernelComplete { kernel_id: k, .. } if *k == kernel_id))
    }

    #[must_use]
    pub fn more_work_requests(&self, kernel_id: u32) -> usize {
        self.count(|c| {
            matches!(c, SchedulerCall::RecordEvent {
                event: SchedulingEvent::GpuRequest,
                kernel_id: k,
                ..
            } if *k == kernel_id)
        })
    }

    fn record(&self, call: SchedulerCall) {
        self.calls.borrow_mut().push(call);
    }
}

impl GlobalScheduler for MockScheduler {
    fn cross_chiplet_flush_done(&self, _kernel_id: u32, _queue_id: u32) -> bool {
        self.cross_chiplet_flush_done.get()
    }

    fn flush_required(&self, chiplet: u32, kernel_id: u32, queue_id: u32, invalidate: bool) -> bool {
        self.record(SchedulerCall::FlushRequired {
            chiplet,
            kernel_id,
            queue_id,
            invalidate,
        });
        if invalidate {
            self.invalidate_flush.get()
        } else {
            self.writeback_flush.get()
        }
    }

    fn kernel_wg_finished(&self, queue_id: u32, kernel_id: u32, wg_id: u32) {
        self.record(SchedulerCall::WgFinished {
            queue_id,
            kernel_id,
            wg_id,
        });
    }

    fn kernel_complete(&self, queue_id: u32, kernel_id: u32) {
        self.record(SchedulerCall::KernelComplete {
            queue_id,
            kernel_id,
        });
    }

    fn record_event(&self, event: SchedulingEvent, queue_id: u32, chiplet: u32, kernel_id: u32) {
        self.record(SchedulerCall::RecordEvent {
            event,
            queue_id,
            chiplet,
            kernel_id,
        });
    }

    fn mark_dispatched(&self, queue_id: u32, kernel_id: u32) {
        self.record(SchedulerCall::MarkDispatched {
            queue_id,
            kernel_id,
        });
    }

    fn request_scheduling_decision(&self, queue_id: u32, immediate: bool) {
        self.record(SchedulerCall::SchedulingDecision {
            queue_id,
            immediate,
        });
    }

    fn notify_mem_sync_completion(
        &self,
        queue_id: u32,
        kernel_id: u32,
        chiplet_id: u32,
        is_invalidate: bool,
    ) {
        self.record(SchedulerCall::MemSyncCompletion {
            queue_id,
            kernel_id,
            chiplet_id,
            is_invalidate,
        });
    }
}

/// Host signal memory and packet processor.
#[derive(Default)]
pub struct MockHost {
    signals: RefCell<HashMap<SignalHandle, i64>>,
    finalized: RefCell<Vec<(PacketRef, u32)>>,
    signal_writes: Cell<u32>,
}

impl MockHost {
    pub fn set_signal(&self, signal: SignalHandle, value: i64) {
        self.signals.borrow_mut().insert(signal, value);
    }

    #[must_use]
    pub fn signal(&self, signal: SignalHandle) -> i64 {
        self.signals.borrow().get(&signal).copied().unwrap_or(0)
    }

    #[must_use]
    pub fn signal_writes(&self) -> u32 {
        self.signal_writes.get()
    }

    #[must_use]
    pub fn finalized(&self) -> Vec<(PacketRef, u32)> {
        self.finalized.borrow().clone()
    }
}

impl HostSync for MockHost {
    fn finalize_packet(&self, packet: PacketRef, queue_id: u32) {
        self.finalized.borrow_mut().push((packet, queue_id));
    }

    fn read_signal(&self, signal: SignalHandle) -> i64 {
        self.signal(signal)
    }

    fn write_signal(&self, signal: SignalHandle, value: i64) {
        self.signal_writes.set(self.signal_writes.get() + 1);
        self.set_signal(signal, value);
    }
}
