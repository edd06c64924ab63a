// Copyright (c) 2025 Graphcore Ltd. All rights reserved.

//! Wiring of the dispatcher to the model collaborators.

use std::fmt;
use std::rc::Rc;

use hsa_dispatch::dispatcher::Dispatcher;
use hsa_dispatch::task::SignalHandle;
use hsa_engine::engine::Engine;
use hsa_engine::sim_error;
use hsa_engine::types::{SimError, SimResult};
use hsa_track::info;

use crate::config::Params;
use crate::fabric::ModelFabric;
use crate::global::ModelScheduler;
use crate::host::ModelHost;
use crate::workload;

pub struct Simulation {
    pub engine: Engine,
    pub fabric: Rc<ModelFabric>,
    pub scheduler: Rc<ModelScheduler>,
    pub host: Rc<ModelHost>,
    pub dispatcher: Rc<Dispatcher>,
    signals: Vec<SignalHandle>,
}

impl Simulation {
    pub fn new(engine: Engine, params: &Params) -> Result<Self, SimError> {
        params.validate()?;
        let top = engine.top().clone();
        let clock = engine.clock_mhz(params.clock_mhz)?;

        let fabric = ModelFabric::new_and_register(&engine, &top, "fabric", &clock, params)?;
        let host = ModelHost::new_and_register(&top, "host");
        let dispatcher = Dispatcher::new_and_register(
            &engine,
            &top,
            "dispatcher",
            params.dispatcher.clone(),
            fabric.clone(),
            host.clone(),
        )?;
        let scheduler = ModelScheduler::new_and_register(
            &engine,
            &top,
            "scheduler",
            workload::build(params),
            params.invalidate_flush,
            params.writeback,
        );
        dispatcher.bind_scheduler(scheduler.clone());
        fabric.connect(&dispatcher);
        scheduler.connect(&dispatcher);

        let mut signals = Vec::new();
        for (signal, value) in workload::completion_signals(params) {
            host.set_signal(signal, value);
            signals.push(signal);
        }

        info!(top ; "{} queues of {} kernels, {} workgroups each",
            params.num_queues, params.kernels_per_queue, params.wgs_per_kernel);
        Ok(Self {
            engine,
            fabric,
            scheduler,
            host,
            dispatcher,
            signals,
        })
    }

    /// Run the workload until everything has completed.
    pub fn run(&mut self) -> SimResult {
        self.engine.run()?;
        self.check_complete()
    }

    /// Check that every kernel was submitted, dispatched and retired.
    pub fn check_complete(&self) -> SimResult {
        let pending = self.scheduler.pending();
        if pending > 0 {
            return sim_error!(format!("{pending} kernels were never submitted"));
        }
        let live = self.dispatcher.live_tasks();
        if live > 0 {
            return sim_error!(format!("{live} kernels did not complete"));
        }
        for signal in &self.signals {
            let value = self.host.signal(*signal);
            if value != 0 {
                return sim_error!(format!("completion signal {signal} left at {value}"));
            }
        }
        Ok(())
    }

    /// All statistics, one line per counter.
    pub fn report(&self) -> Result<String, fmt::Error> {
        let mut out = String::new();
        self.dispatcher.stats().prepare();
        self.dispatcher.stats().dump(&mut out, "dispatcher")?;
        self.fabric.stats.prepare();
        self.fabric.stats.dump(&mut out, "fabric")?;
        self.scheduler.stats.prepare();
        self.scheduler.stats.dump(&mut out, "scheduler")?;
        self.host.prepare();
        self.host.dump(&mut out, "host")?;
        Ok(out)
    }
}
