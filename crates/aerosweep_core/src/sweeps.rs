//! Built-in sweep functions.
//!
//! Each sweep is a plain value holding its options; calling
//! [`SweepFunction::specs`] with a starting group produces the specs. Merge
//! them into a [`SpecSet`](crate::SpecSet) to extend a base sweep.

use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::matrix::{ParameterSpec, SweepFunction};
use crate::model::ParamValue;

/// Steady-wind power curve: one case per hub-height wind speed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PowerCurve {
    /// Hub-height wind speeds (m/s)
    pub wind_speeds: Vec<f64>,
    /// Simulation length for a full run (s)
    #[serde(default = "default_tmax")]
    pub tmax: f64,
    /// Simulation length when a short run is requested (s)
    #[serde(default = "default_short_tmax")]
    pub short_tmax: f64,
    /// Use `tmax` instead of `short_tmax`
    #[serde(default)]
    pub full_run: bool,
}

fn default_tmax() -> f64 {
    720.0
}

fn default_short_tmax() -> f64 {
    2.0
}

impl PowerCurve {
    pub fn new(wind_speeds: Vec<f64>, tmax: f64) -> Self {
        Self {
            wind_speeds,
            tmax,
            short_tmax: default_short_tmax(),
            full_run: false,
        }
    }

    /// Same sweep, shortened to `short_tmax` unless `full_run` is set
    #[must_use]
    pub fn with_full_run(mut self, full_run: bool) -> Self {
        self.full_run = full_run;
        self
    }

    /// Simulation length actually used
    pub fn run_length(&self) -> f64 {
        if self.full_run {
            self.tmax
        } else {
            self.short_tmax
        }
    }
}

impl SweepFunction for PowerCurve {
    fn specs(&self, start_group: usize) -> Vec<ParameterSpec> {
        if self.wind_speeds.is_empty() {
            return Vec::new();
        }
        vec![
            ParameterSpec {
                target: "InflowWind".to_string(),
                field: "HWindSpeed".to_string(),
                values: self
                    .wind_speeds
                    .iter()
                    .copied()
                    .map(ParamValue::Float)
                    .collect(),
                group: start_group,
            },
            ParameterSpec::constant("InflowWind", "WindType", 1, start_group + 1),
            ParameterSpec::constant("Fst", "TMax", self.run_length(), start_group + 1),
        ]
    }
}

/// Sweep a single field over a list of modes, e.g. a controller feature
/// switched off (0) and on (1).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModeToggle {
    pub target: String,
    pub field: String,
    pub values: Vec<ParamValue>,
}

impl ModeToggle {
    pub fn new(target: impl Into<String>, field: impl Into<String>, values: Vec<ParamValue>) -> Self {
        Self {
            target: target.into(),
            field: field.into(),
            values,
        }
    }
}

impl SweepFunction for ModeToggle {
    fn specs(&self, start_group: usize) -> Vec<ParameterSpec> {
        if self.values.is_empty() {
            return Vec::new();
        }
        vec![ParameterSpec {
            target: self.target.clone(),
            field: self.field.clone(),
            values: self.values.clone(),
            group: start_group,
        }]
    }
}

/// Turbulence seeds drawn from a seeded generator.
///
/// The same `rng_seed` always yields the same seed list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeedSweep {
    #[serde(default = "default_seed_target")]
    pub target: String,
    #[serde(default = "default_seed_field")]
    pub field: String,
    pub count: usize,
    #[serde(default)]
    pub rng_seed: u64,
}

fn default_seed_target() -> String {
    "TurbSim".to_string()
}

fn default_seed_field() -> String {
    "RandSeed1".to_string()
}

impl SeedSweep {
    pub fn new(count: usize, rng_seed: u64) -> Self {
        Self {
            target: default_seed_target(),
            field: default_seed_field(),
            count,
            rng_seed,
        }
    }

    /// The generated seed values
    pub fn seeds(&self) -> Vec<i64> {
        let mut rng = rand::rngs::SmallRng::seed_from_u64(self.rng_seed);
        (0..self.count)
            .map(|_| rng.random_range(-2_147_483_648_i64..=2_147_483_647))
            .collect()
    }
}

impl SweepFunction for SeedSweep {
    fn specs(&self, start_group: usize) -> Vec<ParameterSpec> {
        if self.count == 0 {
            return Vec::new();
        }
        vec![ParameterSpec {
            target: self.target.clone(),
            field: self.field.clone(),
            values: self.seeds().into_iter().map(ParamValue::Int).collect(),
            group: start_group,
        }]
    }
}
