// Copyright (c) 2025 Graphcore Ltd. All rights reserved.

//! Run a synthetic kernel workload through the dispatcher model.
//!
//! For example, run using:
//!   cargo run --bin sim-dispatch -- --num-cus 2 --stdout-level debug

use anyhow::Result;
use clap::Parser;
use hsa_engine::engine::Engine;
use hsa_track::builder::{TrackerConfig, TrackersConfig, setup_trackers};
use sim_dispatch::config::Config;
use sim_dispatch::sim::Simulation;

fn main() -> Result<()> {
    let config = Config::load(Config::parse())?;
    let params = config.params()?;

    let stdout_filter_regex = config.stdout_filter_regex.clone().unwrap_or_default();
    let level = config.stdout_level.unwrap_or(log::Level::Warn);
    let trackers = TrackersConfig {
        stdout: TrackerConfig {
            enable: true,
            level,
            filter_regex: &stdout_filter_regex,
            file: None,
        },
        log_file: TrackerConfig {
            enable: config.log_file.is_some(),
            level,
            filter_regex: &stdout_filter_regex,
            file: config.log_file.as_deref(),
        },
    };
    let tracker = setup_trackers(&trackers)?;

    let engine = Engine::new(&tracker);
    let mut sim = Simulation::new(engine, &params)?;
    sim.run()?;

    println!("Ran simulation. Time now {}ns", sim.engine.time_now_ns());
    print!("{}", sim.report()?);
    Ok(())
}
