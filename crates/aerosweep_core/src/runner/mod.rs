//! Process-isolated execution of a case matrix against an external simulator.
//!
//! For every case the runner overlays the case's assignments onto the base
//! input, writes `<model>_<index>.<input ext>`, and launches
//! `executable <input file>` with the output directory as working directory.
//! Cases run on a bounded worker pool; a failing case is recorded in its own
//! [`RunResult`] and never stops its siblings.

mod case_runner;
mod manifest;
mod process;
mod progress;

pub use case_runner::*;
pub use manifest::*;
pub use progress::*;
