//! Command-line front end for aerosweep: expand sweeps, run cases, and plot
//! their outputs in the terminal or export them.

pub mod chart;
pub mod commands;
pub mod logging;

pub use logging::{LogPolicy, default_log_dir};
