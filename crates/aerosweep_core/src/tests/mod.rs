//! Integration tests for the sweep engine
//!
//! Tests are organized by topic:
//! - `fixtures` - Synthetic output tables and shell-script simulators
//! - `sweep_matrix` - Sweep functions combined into full matrices
//! - `runner` - Process isolation, failures, timeouts and cancellation
//! - `end_to_end` - Build, run, load and select in one pass

mod fixtures;
mod sweep_matrix;

#[cfg(unix)]
mod runner;
