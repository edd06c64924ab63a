// Copyright (c) 2025 Graphcore Ltd. All rights reserved.

#![allow(dead_code)]

use hsa_engine::test_helpers::start_test;
use sim_dispatch::config::{Config, Params};
use sim_dispatch::sim::Simulation;

/// A workload small enough to follow by hand.
pub fn small_config() -> Config {
    Config {
        num_cus: Some(2),
        slots_per_cu: Some(2),
        wg_cycles: Some(10),
        mem_sync_cycles: Some(5),
        num_queues: Some(2),
        kernels_per_queue: Some(3),
        wgs_per_kernel: Some(10),
        ..Default::default()
    }
}

pub fn run(full_filepath: &str, config: &Config) -> (Simulation, Params) {
    let params = config.params().unwrap();
    let mut sim = Simulation::new(start_test(full_filepath), &params).unwrap();
    sim.run().unwrap();
    (sim, params)
}
