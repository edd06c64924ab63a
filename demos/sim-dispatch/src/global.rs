// Copyright (c) 2025 Graphcore Ltd. All rights reserved.

//! A global scheduler that feeds each hardware queue's kernels to the
//! dispatcher in order.
//!
//! The first kernel of every queue is submitted when the simulation starts
//! running. The next kernel
//! of a queue is submitted as soon as the dispatcher reports that the current
//! one is nearly done, or when it completes if that report never came.

use std::cell::{OnceCell, RefCell};
use std::collections::{HashSet, VecDeque};
use std::fmt;
use std::rc::{Rc, Weak};

use async_trait::async_trait;
use hsa_dispatch::dispatcher::Dispatcher;
use hsa_dispatch::task::KernelTask;
use hsa_dispatch::traits::{GlobalScheduler, SchedulingEvent};
use hsa_engine::engine::Engine;
use hsa_engine::stats::{Counter, dump};
use hsa_engine::traits::Runnable;
use hsa_engine::types::SimResult;
use hsa_track::entity::Entity;
use hsa_track::{debug, info, trace, warn};

pub struct SchedulerStats {
    pub kernels_submitted: Counter,
    pub kernels_completed: Counter,
    pub wgs_finished: Counter,
    pub gpu_requests: Counter,
    pub mem_syncs: Counter,
}

impl SchedulerStats {
    fn new() -> Self {
        Self {
            kernels_submitted: Counter::new("kernels_submitted", "kernels handed to the dispatcher"),
            kernels_completed: Counter::new("kernels_completed", "kernels reported complete"),
            wgs_finished: Counter::new("wgs_finished", "workgroup completions reported"),
            gpu_requests: Counter::new("gpu_requests", "requests for more work"),
            mem_syncs: Counter::new("mem_syncs", "memory synchronisations completed"),
        }
    }

    fn counters(&self) -> [&Counter; 5] {
        [
            &self.kernels_submitted,
            &self.kernels_completed,
            &self.wgs_finished,
            &self.gpu_requests,
            &self.mem_syncs,
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

pub struct ModelScheduler {
    pub entity: Rc<Entity>,
    invalidate_flush: bool,
    writeback: bool,

    /// Kernels still to be submitted, per queue.
    queues: RefCell<Vec<VecDeque<KernelTask>>>,

    /// Kernels whose successor has already been requested.
    advanced: RefCell<HashSet<u32>>,

    dispatcher: OnceCell<Weak<Dispatcher>>,
    pub stats: SchedulerStats,
}

impl ModelScheduler {
    #[must_use]
    pub fn new_and_register(
        engine: &Engine,
        parent: &Rc<Entity>,
        name: &str,
        queues: Vec<Vec<KernelTask>>,
        invalidate_flush: bool,
        writeback: bool,
    ) -> Rc<Self> {
        let rc_self = Rc::new(Self {
            entity: Rc::new(Entity::new(parent, name)),
            invalidate_flush,
            writeback,
            queues: RefCell::new(queues.into_iter().map(VecDeque::from).collect()),
            advanced: RefCell::new(HashSet::new()),
            dispatcher: OnceCell::new(),
            stats: SchedulerStats::new(),
        });
        engine.register(rc_self.clone());
        rc_self
    }

    pub fn connect(&self, dispatcher: &Rc<Dispatcher>) {
        if self.dispatcher.set(Rc::downgrade(dispatcher)).is_err() {
            panic!("{}: dispatcher already connected", self.entity);
        }
    }

    /// Kernels not yet handed to the dispatcher.
    #[must_use]
    pub fn pending(&self) -> usize {
        self.queues.borrow().iter().map(VecDeque::len).sum()
    }

    fn submit_next(&self, queue_id: u32) {
        let Some(dispatcher) = self.dispatcher.get().and_then(Weak::upgrade) else {
            warn!(self.entity ; "no dispatcher to submit to");
            return;
        };
        let next = self
            .queues
            .borrow_mut()
            .get_mut(queue_id as usize)
            .and_then(VecDeque::pop_front);
        match next {
            Some(task) => {
                debug!(self.entity ; "queue {queue_id}: submit kernel {}", task.dispatch_id());
                self.stats.kernels_submitted.inc();
                dispatcher.submit(task);
            }
            None => {
                debug!(self.entity ; "queue {queue_id}: empty");
            }
        }
    }
}

#[async_trait(?Send)]
impl Runnable for ModelScheduler {
    /// Submit the first kernel of every queue.
    async fn run(&self) -> SimResult {
        let num_queues = self.queues.borrow().len() as u32;
        for queue_id in 0..num_queues {
            self.submit_next(queue_id);
        }
        Ok(())
    }
}

impl GlobalScheduler for ModelScheduler {
    fn cross_chiplet_flush_done(&self, _kernel_id: u32, _queue_id: u32) -> bool {
        true
    }

    fn flush_required(&self, _chiplet: u32, _kernel_id: u32, _queue_id: u32, invalidate: bool) -> bool {
        if invalidate {
            self.invalidate_flush
        } else {
            self.writeback
        }
    }

    fn kernel_wg_finished(&self, queue_id: u32, kernel_id: u32, wg_id: u32) {
        trace!(self.entity ; "queue {queue_id}: kernel {kernel_id} wg {wg_id} finished");
        self.stats.wgs_finished.inc();
    }

    fn kernel_complete(&self, queue_id: u32, kernel_id: u32) {
        info!(self.entity ; "queue {queue_id}: kernel {kernel_id} complete");
        self.stats.kernels_completed.inc();
        let advanced = self.advanced.borrow_mut().remove(&kernel_id);
        if !advanced {
            self.submit_next(queue_id);
        }
    }

    fn record_event(&self, event: SchedulingEvent, queue_id: u32, chiplet: u32, kernel_id: u32) {
        match event {
            SchedulingEvent::GpuRequest => {
                debug!(self.entity ; "queue {queue_id}: chiplet {chiplet} requests work after kernel {kernel_id}");
                self.stats.gpu_requests.inc();
            }
        }
    }

    fn mark_dispatched(&self, _queue_id: u32, kernel_id: u32) {
        self.advanced.borrow_mut().insert(kernel_id);
    }

    fn request_scheduling_decision(&self, queue_id: u32, immediate: bool) {
        trace!(self.entity ; "queue {queue_id}: scheduling decision (immediate: {immediate})");
        self.submit_next(queue_id);
    }

    fn notify_mem_sync_completion(
        &self,
        queue_id: u32,
        kernel_id: u32,
        chiplet_id: u32,
        is_invalidate: bool,
    ) {
        let kind = if is_invalidate { "invalidate" } else { "writeback" };
        debug!(self.entity ; "queue {queue_id}: {kind} for kernel {kernel_id} on chiplet {chiplet_id} done");
        self.stats.mem_syncs.inc();
    }
}
