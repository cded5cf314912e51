//! Case-matrix generation and multi-run orchestration for external simulators
//!
//! This crate expands declarative parameter sweeps into discrete simulation
//! cases, runs an external executable once per case, and ingests the
//! resulting time-series outputs for channel selection and plotting.
//! It supports:
//! - Lock-step parameter groups combined by cross-product across groups
//! - Composable sweep functions (power curves, mode toggles, seed sweeps)
//! - Process-isolated runs with bounded parallelism, timeouts and cancellation
//! - Packed-binary (`.outb`) and ASCII tabular (`.out`) output ingestion
//! - Channel selection across cases, handed off to pluggable render sinks
//!
//! # Example
//!
//! ```ignore
//! use aerosweep_core::{CaseRunner, ParameterSpec, RunConfig, SimulationInput, SpecSet};
//! use aerosweep_core::sweeps::ModeToggle;
//!
//! let mut specs = SpecSet::new();
//! specs.push(ParameterSpec::new("ServoDyn", "Ptch_Cntrl", vec!["1".into()], 0)?)?;
//! specs.merge(&ModeToggle::new("DISCON_in", "TCIPC_ControlMode", vec![0.into(), 1.into()]))?;
//!
//! let matrix = specs.build()?;
//! let runner = CaseRunner::new(RunConfig::new("openfast", "out/tip_clearance"));
//! let results = runner.run(&matrix, &SimulationInput::default(), None)?;
//! ```

#![warn(clippy::all)]

// ============================================================================
// Core modules
// ============================================================================

pub mod config;
pub mod error;
pub mod matrix;
pub mod output;
pub mod runner;
pub mod select;
pub mod sweeps;

// ============================================================================
// Type definition modules
// ============================================================================

pub mod model;

// ============================================================================
// Test modules
// ============================================================================

#[cfg(test)]
mod tests;

// ============================================================================
// Public re-exports for convenience
// ============================================================================

pub use config::{RunConfig, SweepFile};
pub use error::{
    ChannelNotFoundError, ConfigError, IngestError, RunError, RunFailure, SelectError, SinkError,
    TableError,
};
pub use matrix::{Case, CaseMatrix, ParameterSpec, SpecSet, SweepFunction, build_cases};
pub use model::{CaseIndex, ParamKey, ParamValue, SimulationInput};
pub use output::{ChannelTable, load, load_all, load_one};
pub use runner::{CaseRunner, RunProgress, RunResult};
pub use select::{PlotData, PlotRequest, RenderSink, Series, select};
