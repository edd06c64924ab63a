// Copyright (c) 2025 Graphcore Ltd. All rights reserved.

use std::path::PathBuf;

use clap::Parser;
use figment::Jail;
use sim_dispatch::config::Config;

fn cli(args: &[&str]) -> Config {
    Config::parse_from(std::iter::once("sim-dispatch").chain(args.iter().copied()))
}

#[test]
fn flags_are_optional() {
    let config = cli(&["--num-cus", "4", "--lifo", "true"]);
    assert_eq!(config.num_cus, Some(4));
    assert_eq!(config.lifo, Some(true));
    assert_eq!(config.slots_per_cu, None);
    assert_eq!(config.conf_file, None);
}

#[test]
fn defaults_without_sources() {
    Jail::expect_with(|_jail| {
        let config = Config::load(cli(&[]))?;
        assert_eq!(config, Config::default());
        Ok(())
    });
}

#[test]
fn file_overrides_defaults() {
    Jail::expect_with(|jail| {
        jail.create_file(
            "sim.toml",
            r#"
                num_cus = 3
                threshold = 0.5
                stdout_level = "debug"
            "#,
        )?;
        let config = Config::load(cli(&["--conf-file", "sim.toml"]))?;
        assert_eq!(config.num_cus, Some(3));
        assert_eq!(config.threshold, Some(0.5));
        assert_eq!(config.stdout_level, Some(log::Level::Debug));
        assert_eq!(config.slots_per_cu, Config::default().slots_per_cu);
        assert_eq!(config.conf_file, Some(PathBuf::from("sim.toml")));
        Ok(())
    });
}

#[test]
fn environment_overrides_file() {
    Jail::expect_with(|jail| {
        jail.create_file("sim.toml", "num_cus = 3\nwgs_per_kernel = 7")?;
        jail.set_env("HSA_NUM_CUS", "5");
        let config = Config::load(cli(&["--conf-file", "sim.toml"]))?;
        assert_eq!(config.num_cus, Some(5));
        assert_eq!(config.wgs_per_kernel, Some(7));
        Ok(())
    });
}

#[test]
fn flags_override_environment() {
    Jail::expect_with(|jail| {
        jail.set_env("HSA_NUM_CUS", "5");
        jail.set_env("HSA_WRITEBACK", "true");
        let config = Config::load(cli(&["--num-cus", "7"]))?;
        assert_eq!(config.num_cus, Some(7));
        assert_eq!(config.writeback, Some(true));
        Ok(())
    });
}

#[test]
fn missing_conf_file_is_an_error() {
    Jail::expect_with(|_jail| {
        assert!(Config::load(cli(&["--conf-file", "missing.toml"])).is_err());
        Ok(())
    });
}

#[test]
fn bad_values_are_rejected() {
    Jail::expect_with(|jail| {
        jail.create_file("sim.toml", "num_cus = \"many\"")?;
        assert!(Config::load(cli(&["--conf-file", "sim.toml"])).is_err());

        jail.create_file("zero.toml", "num_queues = 0")?;
        let config = Config::load(cli(&["--conf-file", "zero.toml"]))?;
        assert!(config.params().is_err());
        Ok(())
    });
}
