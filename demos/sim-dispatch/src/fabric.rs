// Copyright (c) 2025 Graphcore Ltd. All rights reserved.

//! A compute fabric made of compute units with a fixed number of workgroup
//! slots each.
//!
//! Every workgroup holds its slot for a fixed number of cycles and is then
//! reported back to the dispatcher. Cache invalidates are issued as one
//! request per compute unit and writebacks as a single request. Both resolve
//! after a fixed latency. Each of these delays runs as its own task on the
//! fabric clock.

use std::cell::{Cell, OnceCell, RefCell};
use std::fmt;
use std::rc::{Rc, Weak};

use hsa_dispatch::dispatcher::Dispatcher;
use hsa_dispatch::task::{DispatchId, KernelTask, WavefrontContext};
use hsa_dispatch::traits::ComputeFabric;
use hsa_engine::engine::Engine;
use hsa_engine::executor::Spawner;
use hsa_engine::sim_error;
use hsa_engine::stats::{Counter, dump};
use hsa_engine::time::Tick;
use hsa_engine::time::clock::Clock;
use hsa_engine::types::{SimError, SimResult};
use hsa_track::entity::Entity;
use hsa_track::{debug, trace};

use crate::config::Params;

/// The kernel a memory synchronisation request was issued for.
#[derive(Clone, Copy)]
struct SyncTarget {
    dispatch_id: DispatchId,
    queue_id: u32,
    kernel_id: u32,
    chiplet_id: u32,
}

impl SyncTarget {
    fn of(task: &KernelTask) -> Self {
        Self {
            dispatch_id: task.dispatch_id(),
            queue_id: task.global_queue_id(),
            kernel_id: task.global_kernel_id(),
            chiplet_id: task.chiplet_id(),
        }
    }
}

pub struct FabricStats {
    pub wgs_dispatched: Counter,
    pub wgs_completed: Counter,
    pub invalidate_requests: Counter,
    pub writeback_requests: Counter,
    pub context_switches: Counter,
    pub peak_busy_slots: Counter,
}

impl FabricStats {
    fn new() -> Self {
        Self {
            wgs_dispatched: Counter::new("wgs_dispatched", "workgroups issued to compute units"),
            wgs_completed: Counter::new("wgs_completed", "workgroups retired"),
            invalidate_requests: Counter::new(
                "invalidate_requests",
                "cache invalidate requests issued",
            ),
            writeback_requests: Counter::new(
                "writeback_requests",
                "cache writeback requests issued",
            ),
            context_switches: Counter::new("context_switches", "changes of bound context"),
            peak_busy_slots: Counter::new("peak_busy_slots", "most workgroup slots in use at once"),
        }
    }

    fn counters(&self) -> [&Counter; 6] {
        [
            &self.wgs_dispatched,
            &self.wgs_completed,
            &self.invalidate_requests,
            &self.writeback_requests,
            &self.context_switches,
            &self.peak_busy_slots,
        ]
    }

    pub fn prepare(&self) {
        for counter in self.counters() {
            counter.prepare();
        }
    }

    pub fn dump<W: fmt::Write>(&self, out: &mut W, prefix: &str) -> fmt::Result {
        dump(out, prefix, &self.counters())
    }
}

pub struct ModelFabric {
    pub entity: Rc<Entity>,
    weak_self: Weak<Self>,
    spawner: Spawner,
    clock: Clock,

    /// Latencies in fabric clock cycles.
    wg_cycles: u64,
    mem_sync_cycles: u64,
    invalidate_flush_cycles: u64,

    acquire_invalidate: bool,
    release_at_end: bool,
    slots_per_cu: u32,

    /// Busy slots on each compute unit.
    busy: RefCell<Vec<u32>>,
    bound_context: Cell<Option<u32>>,
    dispatcher: OnceCell<Weak<Dispatcher>>,

    pub stats: FabricStats,
}

impl ModelFabric {
    pub fn new_and_register(
        engine: &Engine,
        parent: &Rc<Entity>,
        name: &str,
        clock: &Clock,
        params: &Params,
    ) -> Result<Rc<Self>, SimError> {
        if params.num_cus == 0 || params.slots_per_cu == 0 {
            return sim_error!(format!(
                "{name}: fabric needs at least one compute unit with one slot"
            ));
        }
        let entity = Rc::new(Entity::new(parent, name));
        let rc_self = Rc::new_cyclic(|weak: &Weak<Self>| Self {
            entity,
            weak_self: weak.clone(),
            spawner: engine.spawner(),
            clock: clock.clone(),
            wg_cycles: params.wg_cycles,
            mem_sync_cycles: params.mem_sync_cycles,
            invalidate_flush_cycles: if params.invalidate_flush {
                params.mem_sync_cycles
            } else {
                0
            },
            acquire_invalidate: params.acquire_invalidate,
            release_at_end: params.release_at_end,
            slots_per_cu: params.slots_per_cu,
            busy: RefCell::new(vec![0; params.num_cus as usize]),
            bound_context: Cell::new(None),
            dispatcher: OnceCell::new(),
            stats: FabricStats::new(),
        });
        Ok(rc_self)
    }

    /// Attach the dispatcher that workgroup retirements and hazard
    /// resolutions are reported to.
    pub fn connect(&self, dispatcher: &Rc<Dispatcher>) {
        if self.dispatcher.set(Rc::downgrade(dispatcher)).is_err() {
            panic!("{}: dispatcher already connected", self.entity);
        }
    }

    fn dispatcher(&self) -> Result<Rc<Dispatcher>, SimError> {
        match self.dispatcher.get().and_then(Weak::upgrade) {
            Some(dispatcher) => Ok(dispatcher),
            None => sim_error!(format!("{}: no dispatcher connected", self.entity)),
        }
    }

    #[must_use]
    pub fn busy_slots(&self) -> u32 {
        self.busy.borrow().iter().sum()
    }

    /// Take a slot on the least loaded compute unit that has one free.
    fn claim_slot(&self) -> Option<u32> {
        let mut busy = self.busy.borrow_mut();
        let (cu, slots) = busy
            .iter_mut()
            .enumerate()
            .filter(|(_, slots)| **slots < self.slots_per_cu)
            .min_by_key(|(_, slots)| **slots)?;
        *slots += 1;
        Some(cu as u32)
    }

    fn release_slot(&self, cu: u32) -> SimResult {
        let mut busy = self.busy.borrow_mut();
        match busy.get_mut(cu as usize) {
            Some(slots) if *slots > 0 => {
                *slots -= 1;
                Ok(())
            }
            _ => sim_error!(format!(
                "{}: no busy slot to release on CU {cu}",
                self.entity
            )),
        }
    }

    /// Run `f` on this fabric `cycles` clock cycles from now.
    fn after(&self, cycles: u64, f: impl FnOnce(&ModelFabric) -> SimResult + 'static) {
        let fabric = self.weak_self.clone();
        let clock = self.clock.clone();
        self.spawner.spawn(async move {
            clock.wait_ticks(cycles).await;
            match fabric.upgrade() {
                Some(fabric) => f(&fabric),
                None => Ok(()),
            }
        });
    }

    fn start_workgroup(&self, ctx: WavefrontContext) {
        self.stats.wgs_dispatched.inc();
        trace!(self.entity ; "start kernel {} wg {} on CU {:?}", ctx.kernel_id, ctx.wg_id, ctx.cu_id);
        self.after(self.wg_cycles, move |fabric| {
            fabric.complete_workgroup(&ctx)
        });
    }

    fn complete_workgroup(&self, ctx: &WavefrontContext) -> SimResult {
        if let Some(cu) = ctx.cu_id {
            self.release_slot(cu)?;
        }
        self.stats.wgs_completed.inc();

        let dispatcher = self.dispatcher()?;
        if self.release_at_end && dispatcher.is_reaching_kernel_end(ctx) {
            debug!(self.entity ; "kernel {} releasing at end", ctx.kernel_id);
        }
        dispatcher.notify_wg_completed(ctx);
        Ok(())
    }

    fn resolve_invalidate(&self, target: SyncTarget) -> SimResult {
        let dispatcher = self.dispatcher()?;
        dispatcher.update_inv_counter(target.dispatch_id, -1);
        if dispatcher.with_task(target.dispatch_id, KernelTask::is_inv_done) {
            debug!(self.entity ; "kernel {} invalidate complete", target.dispatch_id);
            dispatcher.notify_mem_sync_completion(
                target.queue_id,
                target.kernel_id,
                target.chiplet_id,
                true,
            );
        }
        Ok(())
    }

    fn resolve_writeback(&self, target: SyncTarget) -> SimResult {
        let dispatcher = self.dispatcher()?;
        if dispatcher.update_wb_counter(target.dispatch_id, -1) {
            debug!(self.entity ; "kernel {} writeback complete", target.dispatch_id);
            dispatcher.notify_mem_sync_completion(
                target.queue_id,
                target.kernel_id,
                target.chiplet_id,
                false,
            );
        }
        Ok(())
    }
}

impl ComputeFabric for ModelFabric {
    fn requires_acquire_invalidate(&self) -> bool {
        self.acquire_invalidate
    }

    fn releases_at_kernel_end(&self) -> bool {
        self.release_at_end
    }

    fn prepare_invalidate(&self, task: &KernelTask, flush: bool) -> u32 {
        let target = SyncTarget::of(task);
        let num_cus = self.busy.borrow().len() as u32;
        let mut latency = self.mem_sync_cycles;
        if flush {
            latency += self.invalidate_flush_cycles;
        }
        for cu in 0..num_cus {
            // Requests queue up behind each other at the memory system.
            self.after(latency + u64::from(cu), move |fabric| {
                fabric.resolve_invalidate(target)
            });
        }
        self.stats.invalidate_requests.add(u64::from(num_cus));
        num_cus
    }

    fn prepare_writeback(&self, task: &KernelTask) -> u32 {
        let target = SyncTarget::of(task);
        self.after(self.mem_sync_cycles, move |fabric| {
            fabric.resolve_writeback(target)
        });
        self.stats.writeback_requests.inc();
        1
    }

    fn bind_context(&self, context_id: u32) {
        if self.bound_context.replace(Some(context_id)) != Some(context_id) {
            trace!(self.entity ; "bind context {context_id}");
            self.stats.context_switches.inc();
        }
    }

    fn dispatch_workgroups(&self, task: &KernelTask) -> u32 {
        let first_wg = task.next_wg();
        let mut accepted = 0;
        while accepted < task.remaining_wgs() {
            let Some(cu) = self.claim_slot() else {
                break;
            };
            let ctx = WavefrontContext::new(task.dispatch_id(), first_wg + accepted).on_cu(cu);
            self.start_workgroup(ctx);
            accepted += 1;
        }

        let busy = u64::from(self.busy_slots());
        if busy > self.stats.peak_busy_slots.value() {
            self.stats.peak_busy_slots.set(busy);
        }
        accepted
    }

    fn clock_period(&self) -> Tick {
        self.clock.period()
    }
}
