//! Shared helpers for the integration tests

use std::path::{Path, PathBuf};

use crate::config::RunConfig;
use crate::output::{BinaryEncoding, ChannelTable, write_binary};

/// Uniformly sampled table with `Wind1VelX` and `GenPwr` channels
pub(crate) fn synthetic_table(samples: usize, rated_power: f64) -> ChannelTable {
    let time: Vec<f64> = (0..samples).map(|i| i as f64 * 0.05).collect();
    let wind: Vec<f64> = time.iter().map(|t| 12.0 + 0.5 * (t * 0.7).sin()).collect();
    let power: Vec<f64> = time
        .iter()
        .map(|t| rated_power * (1.0 - (-t).exp()))
        .collect();
    ChannelTable::new("Time", "s", time)
        .with_description("synthetic turbine response")
        .with_channel("Wind1VelX", "m/s", wind)
        .unwrap()
        .with_channel("GenPwr", "kW", power)
        .unwrap()
}

/// Write a synthetic packed-binary artifact and return its path
pub(crate) fn write_fixture(dir: &Path, name: &str, rated_power: f64) -> PathBuf {
    let path = dir.join(name);
    write_binary(
        &synthetic_table(200, rated_power),
        &path,
        BinaryEncoding::WithoutTime,
    )
    .unwrap();
    path
}

/// Run configuration that drives `script` through `/bin/sh`.
///
/// The script receives the input file name as `$1`, relative to the output
/// directory it runs in.
pub(crate) fn shell_config(root: &Path, model: &str, script: &str) -> RunConfig {
    let script_path = root.join(format!("{model}_sim.sh"));
    std::fs::write(&script_path, script).unwrap();
    let mut config = RunConfig::new("/bin/sh", root.join("out"))
        .with_model_name(model)
        .with_args([script_path.to_string_lossy().into_owned()])
        .with_max_parallel(4);
    config.poll_interval_ms = 10;
    config
}
