// Copyright (c) 2025 Graphcore Ltd. All rights reserved.

//! Simulation parameters.
//!
//! Values are layered, each source overriding the ones before it:
//!
//!  1. the defaults below;
//!  2. a TOML file given with `--conf-file`;
//!  3. environment variables prefixed with `HSA_` (for example
//!     `HSA_NUM_CUS=8`);
//!  4. command-line flags that were given explicitly.
//!
//! Every field is optional so that a source only sets what it mentions.
//! [`Config::params`] turns the merged result into concrete [`Params`].

use std::path::{Path, PathBuf};

use clap::Parser;
use figment::Figment;
use figment::providers::{Env, Format, Serialized, Toml};
use hsa_dispatch::config::{DispatcherConfig, NearCompletionMode, TieBreak};
use hsa_engine::sim_error;
use hsa_engine::types::SimError;
use serde::{Deserialize, Serialize};

pub const ENV_PREFIX: &str = "HSA_";

/// Command-line arguments and configuration file contents.
#[derive(Parser, Serialize, Deserialize, Clone, Debug, PartialEq)]
#[command(about = "Run a synthetic kernel workload through the GPU dispatcher model")]
pub struct Config {
    /// Number of compute units on the device.
    #[arg(long)]
    pub num_cus: Option<u32>,

    /// Workgroup slots on each compute unit.
    #[arg(long)]
    pub slots_per_cu: Option<u32>,

    /// Device clock frequency in MHz.
    #[arg(long)]
    pub clock_mhz: Option<f64>,

    /// Cycles a workgroup holds its slot.
    #[arg(long)]
    pub wg_cycles: Option<u64>,

    /// Cycles for a cache invalidate or writeback request to resolve.
    #[arg(long)]
    pub mem_sync_cycles: Option<u64>,

    /// Invalidate the compute unit caches before each kernel starts.
    #[arg(long)]
    pub acquire_invalidate: Option<bool>,

    /// Have invalidates flush dirty lines as well.
    #[arg(long)]
    pub invalidate_flush: Option<bool>,

    /// Write back dirty data before each kernel starts.
    #[arg(long)]
    pub writeback: Option<bool>,

    /// Release at kernel end rather than writing back before launch.
    #[arg(long)]
    pub release_at_end: Option<bool>,

    /// Number of hardware queues feeding the device.
    #[arg(long)]
    pub num_queues: Option<u32>,

    /// Kernels submitted on each queue.
    #[arg(long)]
    pub kernels_per_queue: Option<u32>,

    /// Workgroups in each kernel.
    #[arg(long)]
    pub wgs_per_kernel: Option<u32>,

    /// Fraction of a kernel's workgroups that must retire before the next
    /// kernel on its queue is requested.
    #[arg(long)]
    pub threshold: Option<f64>,

    /// Dispatch kernels of equal priority newest first.
    #[arg(long)]
    pub lifo: Option<bool>,

    /// Count a completion report that jumps past the threshold as reaching
    /// it.
    #[arg(long)]
    pub crossing: Option<bool>,

    /// Level of log message to display.
    #[arg(long)]
    pub stdout_level: Option<log::Level>,

    /// Regular expression selecting the entities logged at `--stdout-level`.
    /// Others only log errors.
    #[arg(long)]
    pub stdout_filter_regex: Option<String>,

    /// Also write the log to this file.
    #[arg(long)]
    pub log_file: Option<String>,

    /// Path to a TOML configuration file.
    #[arg(long)]
    pub conf_file: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            num_cus: Some(4),
            slots_per_cu: Some(8),
            clock_mhz: Some(1000.0),
            wg_cycles: Some(200),
            mem_sync_cycles: Some(50),
            acquire_invalidate: Some(false),
            invalidate_flush: Some(false),
            writeback: Some(false),
            release_at_end: Some(false),
            num_queues: Some(2),
            kernels_per_queue: Some(4),
            wgs_per_kernel: Some(40),
            threshold: Some(0.8),
            lifo: Some(false),
            crossing: Some(false),
            stdout_level: Some(log::Level::Warn),
            stdout_filter_regex: Some(String::new()),
            log_file: None,
            conf_file: None,
        }
    }
}

/// Overwrite fields of `$config` with those that `$cli` was given.
macro_rules! take_given {
    ($config:ident, $cli:ident ; $($field:ident),* $(,)?) => {
        $(
            if $cli.$field.is_some() {
                $config.$field = $cli.$field;
            }
        )*
    };
}

impl Config {
    /// Merge every configuration source, with `cli` taking precedence.
    pub fn load(cli: Config) -> Result<Self, figment::Error> {
        let mut config: Config = Self::figment(cli.conf_file.as_deref())?.extract()?;
        take_given!(config, cli ;
            num_cus,
            slots_per_cu,
            clock_mhz,
            wg_cycles,
            mem_sync_cycles,
            acquire_invalidate,
            invalidate_flush,
            writeback,
            release_at_end,
            num_queues,
            kernels_per_queue,
            wgs_per_kernel,
            threshold,
            lifo,
            crossing,
            stdout_level,
            stdout_filter_regex,
            log_file,
            conf_file,
        );
        Ok(config)
    }

    /// The defaults, configuration file and environment layered together.
    pub fn figment(conf_file: Option<&Path>) -> Result<Figment, figment::Error> {
        let mut figment = Figment::from(Serialized::defaults(Config::default()));
        if let Some(conf_file) = conf_file {
            if !conf_file.is_file() {
                return Err(figment::Error::from(format!(
                    "{} is not a configuration file",
                    conf_file.display()
                )));
            }
            figment = figment.merge(Toml::file(conf_file));
        }
        Ok(figment.merge(Env::prefixed(ENV_PREFIX)))
    }

    /// Resolve into concrete parameters, checking that they make sense.
    pub fn params(&self) -> Result<Params, SimError> {
        let params = Params {
            num_cus: given(self.num_cus, "num_cus")?,
            slots_per_cu: given(self.slots_per_cu, "slots_per_cu")?,
            clock_mhz: given(self.clock_mhz, "clock_mhz")?,
            wg_cycles: given(self.wg_cycles, "wg_cycles")?,
            mem_sync_cycles: given(self.mem_sync_cycles, "mem_sync_cycles")?,
            acquire_invalidate: given(self.acquire_invalidate, "acquire_invalidate")?,
            invalidate_flush: given(self.invalidate_flush, "invalidate_flush")?,
            writeback: given(self.writeback, "writeback")?,
            release_at_end: given(self.release_at_end, "release_at_end")?,
            num_queues: given(self.num_queues, "num_queues")?,
            kernels_per_queue: given(self.kernels_per_queue, "kernels_per_queue")?,
            wgs_per_kernel: given(self.wgs_per_kernel, "wgs_per_kernel")?,
            dispatcher: DispatcherConfig {
                threshold: given(self.threshold, "threshold")?,
                tie_break: if given(self.lifo, "lifo")? {
                    TieBreak::Lifo
                } else {
                    TieBreak::Fifo
                },
                near_completion: if given(self.crossing, "crossing")? {
                    NearCompletionMode::Crossing
                } else {
                    NearCompletionMode::Exact
                },
                ..DispatcherConfig::default()
            },
        };
        params.validate()?;
        Ok(params)
    }
}

fn given<T>(value: Option<T>, name: &str) -> Result<T, SimError> {
    match value {
        Some(value) => Ok(value),
        None => sim_error!(format!("no value given for {name}")),
    }
}

/// Fully resolved simulation parameters.
#[derive(Clone, Debug, PartialEq)]
pub struct Params {
    pub num_cus: u32,
    pub slots_per_cu: u32,
    pub clock_mhz: f64,
    pub wg_cycles: u64,
    pub mem_sync_cycles: u64,
    pub acquire_invalidate: bool,
    pub invalidate_flush: bool,
    pub writeback: bool,
    pub release_at_end: bool,
    pub num_queues: u32,
    pub kernels_per_queue: u32,
    pub wgs_per_kernel: u32,
    pub dispatcher: DispatcherConfig,
}

impl Params {
    pub fn validate(&self) -> Result<(), SimError> {
        for (name, value) in [
            ("num_cus", self.num_cus),
            ("slots_per_cu", self.slots_per_cu),
            ("num_queues", self.num_queues),
            ("wgs_per_kernel", self.wgs_per_kernel),
        ] {
            if value == 0 {
                return sim_error!(format!("{name} must be at least 1"));
            }
        }
        if self.wg_cycles == 0 {
            return sim_error!("wg_cycles must be at least 1");
        }
        self.dispatcher.validate()
    }

    #[must_use]
    pub fn total_kernels(&self) -> u32 {
        self.num_queues * self.kernels_per_queue
    }

    #[must_use]
    pub fn total_wgs(&self) -> u64 {
        u64::from(self.total_kernels()) * u64::from(self.wgs_per_kernel)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_resolve() {
        let params = Config::default().params().unwrap();
        assert_eq!(params.num_cus, 4);
        assert_eq!(params.total_kernels(), 8);
        assert_eq!(params.total_wgs(), 320);
        assert_eq!(params.dispatcher.tie_break, TieBreak::Fifo);
        assert_eq!(params.dispatcher.near_completion, NearCompletionMode::Exact);
    }

    #[test]
    fn missing_value() {
        let config = Config {
            num_cus: None,
            ..Default::default()
        };
        assert_eq!(
            config.params(),
            Err(SimError("no value given for num_cus".to_string()))
        );
    }

    #[test]
    fn zero_sizes_rejected() {
        let config = Config {
            slots_per_cu: Some(0),
            ..Default::default()
        };
        assert!(config.params().is_err());

        let config = Config {
            wg_cycles: Some(0),
            ..Default::default()
        };
        assert!(config.params().is_err());
    }

    #[test]
    fn dispatcher_options() {
        let config = Config {
            threshold: Some(0.5),
            lifo: Some(true),
            crossing: Some(true),
            ..Default::default()
        };
        let params = config.params().unwrap();
        assert_eq!(params.dispatcher.threshold, 0.5);
        assert_eq!(params.dispatcher.tie_break, TieBreak::Lifo);
        assert_eq!(
            params.dispatcher.near_completion,
            NearCompletionMode::Crossing
        );

        let config = Config {
            threshold: Some(1.5),
            ..Default::default()
        };
        assert!(config.params().is_err());
    }
}
