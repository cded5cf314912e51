//! Run configuration
//!
//! `RunConfig` carries everything a run batch needs besides the cases and the
//! base input: where the executable lives, where artifacts go, and how many
//! processes may run at once. `SweepFile` is the YAML document that bundles a
//! run configuration with its base input and sweep definition.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::matrix::{CaseMatrix, ParameterSpec, SpecSet};
use crate::model::{CaseIndex, SimulationInput};
use crate::sweeps::{ModeToggle, PowerCurve, SeedSweep};

fn default_model_name() -> String {
    "model".to_string()
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("sweep_out")
}

fn default_max_parallel() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
}

fn default_input_extension() -> String {
    "yaml".to_string()
}

fn default_output_extension() -> String {
    "outb".to_string()
}

fn default_poll_interval_ms() -> u64 {
    50
}

fn default_true() -> bool {
    true
}

/// Configuration of one run batch.
///
/// Every per-case artifact is named `<model_name>_<index>.<ext>` inside
/// `output_dir`, so paths depend on the case index alone.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunConfig {
    /// Stem shared by all case artifacts
    #[serde(default = "default_model_name")]
    pub model_name: String,

    /// External simulator, invoked as `executable <input artifact>`
    pub executable: PathBuf,

    /// Arguments placed before the input artifact, e.g. a script for an interpreter
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub args: Vec<String>,

    /// Working directory for every case process and home of all artifacts
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,

    /// Upper bound on concurrently running processes (defaults to CPU count)
    #[serde(default = "default_max_parallel")]
    pub max_parallel: usize,

    /// Per-case wall-clock limit; `None` waits indefinitely
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_secs: Option<u64>,

    #[serde(default = "default_input_extension")]
    pub input_extension: String,

    #[serde(default = "default_output_extension")]
    pub output_extension: String,

    /// How often a waiting worker checks its process and the cancel flag
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,

    /// Write `case_matrix.yaml` and `run_summary.yaml` into `output_dir`
    #[serde(default = "default_true")]
    pub write_manifest: bool,
}

impl RunConfig {
    pub fn new(executable: impl Into<PathBuf>, output_dir: impl Into<PathBuf>) -> Self {
        Self {
            model_name: default_model_name(),
            executable: executable.into(),
            args: Vec::new(),
            output_dir: output_dir.into(),
            max_parallel: default_max_parallel(),
            timeout_secs: None,
            input_extension: default_input_extension(),
            output_extension: default_output_extension(),
            poll_interval_ms: default_poll_interval_ms(),
            write_manifest: true,
        }
    }

    #[must_use]
    pub fn with_model_name(mut self, name: impl Into<String>) -> Self {
        self.model_name = name.into();
        self
    }

    #[must_use]
    pub fn with_args<S: Into<String>>(mut self, args: impl IntoIterator<Item = S>) -> Self {
        self.args = args.into_iter().map(Into::into).collect();
        self
    }

    #[must_use]
    pub fn with_max_parallel(mut self, max_parallel: usize) -> Self {
        self.max_parallel = max_parallel;
        self
    }

    #[must_use]
    pub fn with_timeout(mut self, secs: u64) -> Self {
        self.timeout_secs = Some(secs);
        self
    }

    /// `<model_name>_<index>`
    pub fn case_stem(&self, index: CaseIndex) -> String {
        format!("{}_{}", self.model_name, index.0)
    }

    /// File name of the input artifact, relative to `output_dir`
    pub fn input_file_name(&self, index: CaseIndex) -> String {
        format!("{}.{}", self.case_stem(index), self.input_extension)
    }

    pub fn input_path(&self, index: CaseIndex) -> PathBuf {
        self.output_dir.join(self.input_file_name(index))
    }

    pub fn output_path(&self, index: CaseIndex) -> PathBuf {
        self.output_dir
            .join(format!("{}.{}", self.case_stem(index), self.output_extension))
    }

    /// Captured stdout/stderr of the case process
    pub fn log_path(&self, index: CaseIndex) -> PathBuf {
        self.output_dir
            .join(format!("{}.log", self.case_stem(index)))
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_secs.map(Duration::from_secs)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms.max(1))
    }

    /// Worker count actually used: at least one
    pub fn worker_count(&self) -> usize {
        self.max_parallel.max(1)
    }
}

/// A complete sweep definition as read from YAML.
///
/// ```yaml
/// run:
///   model_name: IEA15MW
///   executable: ../OpenFAST/install/bin/openfast
///   output_dir: examples_out/33_tip_clearance
/// base:
///   DISCON_in:
///     TCIPC_MaxTipDeflection: 10
/// parameters:
///   - { target: ElastoDyn, field: PtfmSgDOF, values: ["False"], group: 0 }
///   - { target: ServoDyn, field: Ptch_Cntrl, values: ["1"], group: 0 }
/// wind_case:
///   wind_speeds: [12]
///   tmax: 300
/// control_sweep:
///   target: DISCON_in
///   field: TCIPC_ControlMode
///   values: [0, 1]
/// ```
///
/// Sweep functions are merged after `parameters` in a fixed order: wind case,
/// control sweep, then seeds. Each starts at the next free group.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SweepFile {
    pub run: RunConfig,

    #[serde(default)]
    pub base: SimulationInput,

    #[serde(default)]
    pub parameters: Vec<ParameterSpec>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wind_case: Option<PowerCurve>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub control_sweep: Option<ModeToggle>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seeds: Option<SeedSweep>,

    /// Run the wind case for its full length instead of the short smoke-test length
    #[serde(default)]
    pub full_run: bool,
}

impl SweepFile {
    pub fn from_yaml(yaml: &str) -> Result<Self, ConfigError> {
        serde_saphyr::from_str(yaml).map_err(|e| ConfigError::Yaml(e.to_string()))
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Read {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        Self::from_yaml(&content)
    }

    /// Base parameters plus every configured sweep function
    pub fn spec_set(&self) -> Result<SpecSet, ConfigError> {
        let mut specs = SpecSet::from_specs(self.parameters.iter().cloned())?;

        if let Some(wind) = &self.wind_case {
            let wind = wind.clone().with_full_run(self.full_run || wind.full_run);
            specs.merge(&wind)?;
        }
        if let Some(toggle) = &self.control_sweep {
            specs.merge(toggle)?;
        }
        if let Some(seeds) = &self.seeds {
            specs.merge(seeds)?;
        }
        Ok(specs)
    }

    pub fn build(&self) -> Result<CaseMatrix, ConfigError> {
        self.spec_set()?.build()
    }
}
