// Copyright (c) 2025 Graphcore Ltd. All rights reserved.

//! The kernel dispatcher.
//!
//! Kernel launches are [submitted](Dispatcher::submit) by the host packet
//! processor. Each one is recorded in the task table and queued by priority.
//! Submission arms a single dispatch tick one fabric clock period ahead. The
//! dispatcher's [`run()`](Runnable::run) task waits for the armed tick and,
//! when it arrives, works through the ready queue:
//!
//!  - the [`HazardGate`] requests any cache invalidate or writeback the task
//!    still needs and decides whether it is clear to go;
//!  - a task that is clear issues workgroups onto the [`ComputeFabric`] until
//!    all have been issued or the fabric has no room left;
//!  - a task that is blocked, or that ran out of room, is put back in the
//!    queue for the next tick. It does not stop lower priority tasks being
//!    tried in this tick.
//!
//! The tick is not re-armed by the dispatch pass itself. It is armed again by
//! the next submission, workgroup retirement or hazard resolution, or by an
//! explicit [`schedule_dispatch`](Dispatcher::schedule_dispatch).
//!
//! Workgroup retirements are reported with
//! [`notify_wg_completed`](Dispatcher::notify_wg_completed). The
//! [`CompletionTracker`] decides when to ask the [`GlobalScheduler`] for more
//! work and when the kernel has finished, at which point the host is told
//! and the task is retired from the table.

use std::cell::{Cell, OnceCell, RefCell};
use std::collections::{HashSet, VecDeque};
use std::rc::Rc;

use async_trait::async_trait;
use futures::{FutureExt, select_biased};
use hsa_engine::engine::Engine;
use hsa_engine::events::EventPriority;
use hsa_engine::events::repeated::Repeated;
use hsa_engine::sim_error;
use hsa_engine::time::Tick;
use hsa_engine::time::clock::Clock;
use hsa_engine::traits::{Event, Runnable};
use hsa_engine::types::{SimError, SimResult};
use hsa_track::entity::Entity;
use hsa_track::{debug, info, trace};

use crate::checkpoint::DispatcherCheckpoint;
use crate::completion::{CompletionTracker, Milestone};
use crate::config::{DispatcherConfig, TieBreak};
use crate::hazard::{HazardGate, HazardPlan, InvalidateStep, WritebackStep};
use crate::ready_queue::{ReadyEntry, ReadyQueue};
use crate::stats::DispatcherStats;
use crate::table::{TaskSlot, TaskTable};
use crate::task::{DispatchId, KernelTask, WavefrontContext};
use crate::traits::{ComputeFabric, GlobalScheduler, HostSync, SchedulingEvent};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum HazardKind {
    Invalidate,
    Writeback,
}

/// Hazard requests the fabric is in the middle of issuing for one kernel.
///
/// Resolutions reported before the fabric has said how many requests it
/// issued are counted here and taken off that number afterwards.
struct Issuing {
    kernel_id: DispatchId,
    kind: HazardKind,
    resolved: u32,
}

struct DispatchState {
    tasks: TaskTable,
    queue: ReadyQueue,

    /// Kernels completed since the last tick, reported at the end of the next.
    done: VecDeque<DispatchId>,

    issuing: Option<Issuing>,
}

enum Attempt {
    Blocked,
    NoFit { launched: bool },
    Dispatched { launched: bool },
}

pub struct Dispatcher {
    pub entity: Rc<Entity>,
    config: DispatcherConfig,
    completion: CompletionTracker,

    clock: Clock,

    /// When the next dispatch pass is due, if one is armed.
    tick: Cell<Option<Tick>>,
    tick_changed: Repeated<()>,

    fabric: Rc<dyn ComputeFabric>,
    host: Rc<dyn HostSync>,
    global_scheduler: OnceCell<Rc<dyn GlobalScheduler>>,

    state: RefCell<DispatchState>,
    stats: DispatcherStats,
}

impl Dispatcher {
    /// Create a dispatcher and register it with the engine so that its tick
    /// task starts with the simulation. The global scheduler must be attached
    /// with [`bind_scheduler`](Dispatcher::bind_scheduler) before the first
    /// tick.
    pub fn new_and_register(
        engine: &Engine,
        parent: &Rc<Entity>,
        name: &str,
        config: DispatcherConfig,
        fabric: Rc<dyn ComputeFabric>,
        host: Rc<dyn HostSync>,
    ) -> Result<Rc<Self>, SimError> {
        config.validate()?;
        let entity = Rc::new(Entity::new(parent, name));
        let rc_self = Rc::new(Self {
            entity,
            completion: CompletionTracker::new(&config),
            state: RefCell::new(DispatchState {
                tasks: TaskTable::new(),
                queue: ReadyQueue::new(config.tie_break),
                done: VecDeque::new(),
                issuing: None,
            }),
            config,
            clock: engine.default_clock(),
            tick: Cell::new(None),
            tick_changed: Repeated::default(),
            fabric,
            host,
            global_scheduler: OnceCell::new(),
            stats: DispatcherStats::new(),
        });
        engine.register(rc_self.clone());
        Ok(rc_self)
    }

    pub fn new_and_register_with_scheduler(
        engine: &Engine,
        parent: &Rc<Entity>,
        name: &str,
        config: DispatcherConfig,
        fabric: Rc<dyn ComputeFabric>,
        host: Rc<dyn HostSync>,
        global_scheduler: Rc<dyn GlobalScheduler>,
    ) -> Result<Rc<Self>, SimError> {
        let rc_self = Self::new_and_register(engine, parent, name, config, fabric, host)?;
        rc_self.bind_scheduler(global_scheduler);
        Ok(rc_self)
    }

    /// Attach the global scheduler. Can only be done once.
    pub fn bind_scheduler(&self, global_scheduler: Rc<dyn GlobalScheduler>) {
        if self.global_scheduler.set(global_scheduler).is_err() {
            panic!("{}: global scheduler already bound", self.entity);
        }
    }

    fn global_scheduler(&self) -> Rc<dyn GlobalScheduler> {
        match self.global_scheduler.get() {
            Some(global_scheduler) => global_scheduler.clone(),
            None => panic!("{}: global scheduler used before being bound", self.entity),
        }
    }

    #[must_use]
    pub fn config(&self) -> &DispatcherConfig {
        &self.config
    }

    #[must_use]
    pub fn stats(&self) -> &DispatcherStats {
        &self.stats
    }

    /// Accept a new kernel launch.
    ///
    /// The dispatch id must not belong to a live task and the kernel must
    /// have at least one workgroup.
    pub fn submit(&self, task: KernelTask) {
        assert!(
            task.total_wgs() > 0,
            "{}: kernel {} has no workgroups",
            self.entity,
            task.dispatch_id()
        );
        self.stats.num_kernels_launched.inc();
        info!(self.entity ; "launching kernel: {}, dispatch ID: {}", task.name(), task.dispatch_id());

        {
            let mut state = self.state.borrow_mut();
            let id = task.dispatch_id();
            let priority = task.priority();
            let slot = state.tasks.insert(task);
            state.queue.push(id, slot, priority);
        }
        self.arm_tick();
    }

    /// Request a dispatch pass if one is not already pending.
    pub fn schedule_dispatch(&self) {
        self.arm_tick();
    }

    fn arm_tick(&self) {
        if self.tick.get().is_none() {
            self.set_tick(Some(self.clock.tick_now() + self.fabric.clock_period()));
        }
    }

    fn set_tick(&self, when: Option<Tick>) {
        self.tick.set(when);
        self.tick_changed.notify();
    }

    #[must_use]
    pub fn tick_scheduled(&self) -> bool {
        self.tick.get().is_some()
    }

    #[must_use]
    pub fn next_tick(&self) -> Option<Tick> {
        self.tick.get()
    }

    /// One dispatch pass over the ready queue.
    ///
    /// Every queued task is tried at most once. Tasks that cannot make
    /// progress are put back in the queue once the pass is over.
    pub fn exec(&self) -> SimResult {
        let global_scheduler = self.global_scheduler();

        let pending = self.state.borrow().queue.len();
        debug!(self.entity ; "Launching {pending} kernels");
        if pending > 0 {
            self.stats.cycles_waiting_for_dispatch.inc();
        }

        let mut retry = Vec::new();
        let mut disp_count = 0;
        while let Some(entry) = self.pop_ready() {
            let launched = match self.attempt(&entry, global_scheduler.as_ref()) {
                Attempt::Blocked => {
                    retry.push(entry);
                    false
                }
                Attempt::NoFit { launched } => {
                    retry.push(entry);
                    launched
                }
                Attempt::Dispatched { launched } => launched,
            };
            if launched {
                disp_count += 1;
            }
        }

        let fail_count = retry.len();
        {
            let mut state = self.state.borrow_mut();
            for entry in retry {
                state.queue.requeue(entry);
            }
        }
        debug!(self.entity ; "Kernels dispatched: {disp_count} | {fail_count} failures");

        let done: Vec<DispatchId> = self.state.borrow_mut().done.drain(..).collect();
        debug!(self.entity ; "Returning {} kernels", done.len());
        for id in done {
            debug!(self.entity ; "Kernel {id} completed");
        }
        Ok(())
    }

    fn pop_ready(&self) -> Option<ReadyEntry> {
        self.state.borrow_mut().queue.pop()
    }

    fn attempt(&self, entry: &ReadyEntry, global_scheduler: &dyn GlobalScheduler) -> Attempt {
        let id = entry.dispatch_id;
        let gate = HazardGate::new(
            self.fabric.as_ref(),
            global_scheduler,
            self.config.chiplet_offset(),
        );

        let task = self.snapshot(entry.slot);
        let plan = gate.plan(&task);
        self.apply_hazard_plan(entry.slot, &task, plan);

        let task = self.snapshot(entry.slot);
        if !gate.is_ready(&task) {
            debug!(self.entity ; "kernel {id} failed to launch, due to [{}] pending invalidate requests and [{}] flush requests",
                task.outstanding_invs(), task.outstanding_wbs());
            return Attempt::Blocked;
        }

        let mut launched = false;
        loop {
            let task = self.snapshot(entry.slot);
            if task.is_dispatch_complete() {
                break;
            }

            self.fabric.bind_context(task.context_id());
            trace!(self.entity ; "Attempt kernel launch tick:{} kernel:{id}", self.clock.tick_now());
            let accepted = self.fabric.dispatch_workgroups(&task);
            if accepted == 0 {
                debug!(self.entity ; "kernel {id} failed to launch");
                return Attempt::NoFit { launched };
            }
            self.with_slot_mut(entry.slot, |task| task.record_dispatched(accepted));
            if !launched {
                launched = true;
                info!(self.entity ; "Launched kernel {id}");
            }
        }

        self.retire_if_finished(id);
        Attempt::Dispatched { launched }
    }

    fn apply_hazard_plan(&self, slot: TaskSlot, task: &KernelTask, plan: HazardPlan) {
        let id = task.dispatch_id();
        match plan.invalidate {
            InvalidateStep::Request { flush } => {
                self.open_issue(id, HazardKind::Invalidate);
                let issued = self.fabric.prepare_invalidate(task, flush);
                let resolved = self.close_issue(id, HazardKind::Invalidate, issued);
                debug!(self.entity ; "kernel {id} issued {issued} invalidate requests (flush: {flush}), {resolved} already resolved");
                self.with_slot_mut(slot, |task| task.begin_invalidate(issued - resolved));
            }
            InvalidateStep::NotRequired => self.with_slot_mut(slot, KernelTask::mark_inv_done),
            InvalidateStep::AlreadyStarted => {}
        }

        match plan.writeback {
            WritebackStep::Request => {
                self.open_issue(id, HazardKind::Writeback);
                let issued = self.fabric.prepare_writeback(task);
                let resolved = self.close_issue(id, HazardKind::Writeback, issued);
                debug!(self.entity ; "kernel {id} issued {issued} writeback requests, {resolved} already resolved");
                self.with_slot_mut(slot, |task| task.begin_writeback(issued - resolved));
            }
            WritebackStep::NotRequired => self.with_slot_mut(slot, KernelTask::mark_wb_done),
            WritebackStep::AlreadyStarted | WritebackStep::ReleasedAtEnd => {}
        }
    }

    fn open_issue(&self, kernel_id: DispatchId, kind: HazardKind) {
        self.state.borrow_mut().issuing = Some(Issuing {
            kernel_id,
            kind,
            resolved: 0,
        });
    }

    /// End the issue window and return how many of the `issued` requests
    /// were resolved inside it.
    fn close_issue(&self, kernel_id: DispatchId, kind: HazardKind, issued: u32) -> u32 {
        let resolved = self
            .state
            .borrow_mut()
            .issuing
            .take()
            .map_or(0, |issuing| issuing.resolved);
        assert!(
            resolved <= issued,
            "{}: kernel {kernel_id} resolved {resolved} {kind:?} requests but only issued {issued}",
            self.entity
        );
        resolved
    }

    /// Count a resolution against the requests being issued, if `kernel_id`
    /// is in the middle of issuing requests of this `kind`.
    fn resolve_while_issuing(&self, kernel_id: DispatchId, kind: HazardKind, delta: i32) -> bool {
        let mut state = self.state.borrow_mut();
        match state.issuing.as_mut() {
            Some(issuing) if delta == -1 && issuing.kernel_id == kernel_id && issuing.kind == kind => {
                issuing.resolved += 1;
                true
            }
            _ => false,
        }
    }

    /// True if the next workgroup to retire will be the kernel's last.
    #[must_use]
    pub fn is_reaching_kernel_end(&self, ctx: &WavefrontContext) -> bool {
        self.with_task(ctx.kernel_id, CompletionTracker::is_reaching_end)
    }

    /// Report that a workgroup has retired.
    pub fn notify_wg_completed(&self, ctx: &WavefrontContext) {
        self.notify_wgs_completed(ctx, 1);
    }

    /// Report that `count` workgroups, numbered consecutively from
    /// `ctx.wg_id`, have retired together.
    ///
    /// The kernel is found by `ctx.kernel_id`; a report for a kernel that is
    /// not live panics.
    pub fn notify_wgs_completed(&self, ctx: &WavefrontContext, count: u32) {
        assert!(
            count > 0,
            "{}: empty completion report for kernel {}",
            self.entity,
            ctx.kernel_id
        );
        let global_scheduler = self.global_scheduler();
        let id = ctx.kernel_id;

        let (task, milestone) = self.with_task_mut(id, |task| {
            let previous = task.completed_wgs();
            task.record_completed(count);
            let milestone = self.completion.classify(task, previous);
            if milestone == Milestone::NearCompletion {
                task.set_near_completion_notified();
            }
            (task.clone(), milestone)
        });

        debug!(self.entity ; "notify WgCompl {} completed WGs are {}", ctx.wg_id, task.completed_wgs());
        let now = self.clock.tick_now();
        match ctx.cu_id {
            Some(cu_id) => {
                trace!(self.entity ; "WG complete tick:{now} wg:{} kernel:{id} cu:{cu_id}", ctx.wg_id);
            }
            None => {
                trace!(self.entity ; "WG complete tick:{now} wg:{} kernel:{id}", ctx.wg_id);
            }
        }

        let queue_id = task.global_queue_id();
        let kernel_id = task.global_kernel_id();
        for wg_id in ctx.wg_id..ctx.wg_id + count {
            global_scheduler.kernel_wg_finished(queue_id, kernel_id, wg_id);
        }

        match milestone {
            Milestone::Complete => self.kernel_complete(&task, global_scheduler.as_ref()),
            Milestone::NearCompletion => {
                debug!(self.entity ; "Queue[{queue_id}] Kernel[{kernel_id}] almost done ({}/{} WGs), requesting more work",
                    task.completed_wgs(), task.total_wgs());
                global_scheduler.record_event(SchedulingEvent::GpuRequest, queue_id, 0, kernel_id);
                global_scheduler.mark_dispatched(queue_id, kernel_id);
                global_scheduler.request_scheduling_decision(queue_id, false);
            }
            Milestone::InProgress => {}
        }

        self.arm_tick();
        self.retire_if_finished(id);
    }

    fn kernel_complete(&self, task: &KernelTask, global_scheduler: &dyn GlobalScheduler) {
        let id = task.dispatch_id();
        self.host.finalize_packet(task.packet(), task.queue_id());

        match task.completion_signal() {
            Some(signal) if task.chiplet_id() == self.config.completion_owner_chiplet => {
                let value = self.host.read_signal(signal);
                debug!(self.entity ; "HSA AQL kernel complete with completion signal {signal}, value {value}, chiplet {}",
                    task.chiplet_id());
                self.host.write_signal(signal, value - 1);
            }
            Some(signal) => {
                debug!(self.entity ; "HSA AQL kernel complete, signal {signal} is owned by chiplet {}",
                    self.config.completion_owner_chiplet);
            }
            None => {
                debug!(self.entity ; "HSA AQL kernel complete, no completion signal");
            }
        }

        trace!(self.entity ; "Kernel complete tick:{} kernel:{id}", self.clock.tick_now());
        info!(self.entity ; "Completed kernel {id}");
        global_scheduler.kernel_complete(task.global_queue_id(), task.global_kernel_id());
        self.state.borrow_mut().done.push_back(id);
    }

    /// Remove a task once every workgroup has been issued and has retired.
    fn retire_if_finished(&self, id: DispatchId) {
        let mut state = self.state.borrow_mut();
        let finished = state
            .tasks
            .get(id)
            .is_some_and(|task| task.is_dispatch_complete() && task.is_complete());
        if finished {
            state.tasks.remove(id);
            drop(state);
            debug!(self.entity ; "kernel {id} retired");
        }
    }

    /// Adjust the number of invalidate requests outstanding for a kernel.
    ///
    /// When the last one resolves the dispatch tick is armed so the kernel
    /// can be tried again. A request may resolve while the fabric is still
    /// inside [`prepare_invalidate`](ComputeFabric::prepare_invalidate); it is
    /// then taken off the number of requests the fabric reports.
    pub fn update_inv_counter(&self, kernel_id: DispatchId, delta: i32) {
        if self.resolve_while_issuing(kernel_id, HazardKind::Invalidate, delta) {
            trace!(self.entity ; "kernel {kernel_id} invalidate resolved while issuing");
            return;
        }
        let done = self.with_task_mut(kernel_id, |task| {
            task.update_outstanding_invs(delta);
            if delta < 0 && task.outstanding_invs() == 0 {
                task.mark_inv_done();
            }
            task.is_inv_done()
        });
        trace!(self.entity ; "kernel {kernel_id} invalidate counter {delta:+}");
        if done {
            self.arm_tick();
        }
    }

    /// Adjust the number of writeback requests outstanding for a kernel.
    ///
    /// Returns true if no writebacks remain. As for invalidates, the
    /// dispatch tick is armed when the last one resolves. A resolution
    /// reported from inside [`prepare_writeback`](ComputeFabric::prepare_writeback)
    /// returns false as the number issued is not yet known.
    pub fn update_wb_counter(&self, kernel_id: DispatchId, delta: i32) -> bool {
        if self.resolve_while_issuing(kernel_id, HazardKind::Writeback, delta) {
            trace!(self.entity ; "kernel {kernel_id} writeback resolved while issuing");
            return false;
        }
        let (none_left, resolved) = self.with_task_mut(kernel_id, |task| {
            task.update_outstanding_wbs(delta);
            let none_left = task.outstanding_wbs() == 0;
            let resolved = delta < 0 && none_left;
            if resolved {
                task.mark_wb_done();
            }
            (none_left, resolved)
        });
        trace!(self.entity ; "kernel {kernel_id} writeback counter {delta:+}");
        if resolved {
            self.arm_tick();
        }
        none_left
    }

    #[must_use]
    pub fn outstanding_wbs(&self, kernel_id: DispatchId) -> u32 {
        self.with_task(kernel_id, KernelTask::outstanding_wbs)
    }

    /// Forward a memory synchronisation completion to the global scheduler.
    pub fn notify_mem_sync_completion(
        &self,
        queue_id: u32,
        kernel_id: u32,
        chiplet_id: u32,
        is_invalidate: bool,
    ) {
        self.global_scheduler()
            .notify_mem_sync_completion(queue_id, kernel_id, chiplet_id, is_invalidate);
    }

    /// A copy of the current state of a live task.
    #[must_use]
    pub fn lookup(&self, kernel_id: DispatchId) -> KernelTask {
        self.with_task(kernel_id, KernelTask::clone)
    }

    pub fn with_task<R>(&self, kernel_id: DispatchId, f: impl FnOnce(&KernelTask) -> R) -> R {
        let state = self.state.borrow();
        match state.tasks.get(kernel_id) {
            Some(task) => f(task),
            None => panic!("{}: unknown kernel {kernel_id}", self.entity),
        }
    }

    #[must_use]
    pub fn is_live(&self, kernel_id: DispatchId) -> bool {
        self.state.borrow().tasks.contains(kernel_id)
    }

    #[must_use]
    pub fn live_tasks(&self) -> usize {
        self.state.borrow().tasks.len()
    }

    #[must_use]
    pub fn queued(&self) -> usize {
        self.state.borrow().queue.len()
    }

    fn with_task_mut<R>(&self, kernel_id: DispatchId, f: impl FnOnce(&mut KernelTask) -> R) -> R {
        let mut state = self.state.borrow_mut();
        match state.tasks.get_mut(kernel_id) {
            Some(task) => f(task),
            None => panic!("{}: unknown kernel {kernel_id}", self.entity),
        }
    }

    fn with_slot_mut<R>(&self, slot: TaskSlot, f: impl FnOnce(&mut KernelTask) -> R) -> R {
        let mut state = self.state.borrow_mut();
        match state.tasks.get_slot_mut(slot) {
            Some(task) => f(task),
            None => panic!("{}: queued task {slot:?} is no longer live", self.entity),
        }
    }

    fn snapshot(&self, slot: TaskSlot) -> KernelTask {
        let state = self.state.borrow();
        match state.tasks.get_slot(slot) {
            Some(task) => task.clone(),
            None => panic!("{}: queued task {slot:?} is no longer live", self.entity),
        }
    }

    /// Capture the pending tick, the live tasks and the queue order.
    #[must_use]
    pub fn checkpoint(&self) -> DispatcherCheckpoint {
        let state = self.state.borrow();
        DispatcherCheckpoint {
            tick: self.tick.get(),
            tasks: state.tasks.iter().cloned().collect(),
            queue: state.queue.in_order(),
        }
    }

    /// Replace the current state with a checkpoint.
    ///
    /// Any pending tick is cancelled and the saved one, if any, re-armed.
    pub fn restore(&self, checkpoint: &DispatcherCheckpoint) -> SimResult {
        let mut tasks = TaskTable::new();
        for task in &checkpoint.tasks {
            if tasks.contains(task.dispatch_id()) {
                return sim_error!(format!(
                    "{}: checkpoint contains kernel {} more than once",
                    self.entity,
                    task.dispatch_id()
                ));
            }
            tasks.insert(task.clone());
        }

        let mut queue = ReadyQueue::new(self.config.tie_break);
        let mut seen = HashSet::new();
        let order: Vec<DispatchId> = match self.config.tie_break {
            TieBreak::Fifo => checkpoint.queue.clone(),
            TieBreak::Lifo => checkpoint.queue.iter().rev().copied().collect(),
        };
        for id in order {
            let (Some(slot), Some(task)) = (tasks.slot_of(id), tasks.get(id)) else {
                return sim_error!(format!(
                    "{}: checkpoint queues unknown kernel {id}",
                    self.entity
                ));
            };
            if !seen.insert(id) {
                return sim_error!(format!(
                    "{}: checkpoint queues kernel {id} more than once",
                    self.entity
                ));
            }
            queue.push(id, slot, task.priority());
        }

        if let Some(when) = checkpoint.tick {
            let now = self.clock.tick_now();
            if when < now {
                return sim_error!(format!(
                    "{}: checkpoint tick {when} is before the current time {now}",
                    self.entity
                ));
            }
        }

        {
            let mut state = self.state.borrow_mut();
            state.tasks = tasks;
            state.queue = queue;
            state.done.clear();
        }
        self.set_tick(checkpoint.tick);
        info!(self.entity ; "restored {} kernels, {} queued", checkpoint.tasks.len(), checkpoint.queue.len());
        Ok(())
    }
}

#[async_trait(?Send)]
impl Runnable for Dispatcher {
    /// Wait for each armed tick and run a dispatch pass when it arrives.
    ///
    /// The pass runs after any other task woken in the same tick. Re-arming
    /// or cancelling the tick abandons the current wait.
    async fn run(&self) -> SimResult {
        loop {
            let mut changed = self.tick_changed.listen().fuse();
            let Some(when) = self.tick.get() else {
                changed.await;
                continue;
            };
            let mut due = self.clock.wait_until(when, EventPriority::CPU_TICK).fuse();
            select_biased! {
                () = changed => {}
                () = due => {
                    self.tick.set(None);
                    self.exec()?;
                }
            }
        }
    }
}
