//! Parameter specifications and sweep-function composition.

use rustc_hash::FxHashSet;
use serde::{Deserialize, Serialize};

use super::{CaseMatrix, build_cases};
use crate::error::ConfigError;
use crate::model::{ParamKey, ParamValue};

/// One declarative sweep entry: a (target, field) pair, its candidate values,
/// and the group it varies with.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParameterSpec {
    /// Configuration section (input file or subsystem) the field belongs to
    pub target: String,
    /// Field name within the section
    pub field: String,
    /// Candidate values in sweep order
    pub values: Vec<ParamValue>,
    /// Specs sharing a group vary in lock-step
    #[serde(default)]
    pub group: usize,
}

impl ParameterSpec {
    /// Create a spec, rejecting an empty value list
    pub fn new(
        target: impl Into<String>,
        field: impl Into<String>,
        values: Vec<ParamValue>,
        group: usize,
    ) -> Result<Self, ConfigError> {
        let spec = Self {
            target: target.into(),
            field: field.into(),
            values,
            group,
        };
        spec.validate()?;
        Ok(spec)
    }

    /// A fixed (non-swept) parameter
    pub fn constant(
        target: impl Into<String>,
        field: impl Into<String>,
        value: impl Into<ParamValue>,
        group: usize,
    ) -> Self {
        Self {
            target: target.into(),
            field: field.into(),
            values: vec![value.into()],
            group,
        }
    }

    #[must_use]
    pub fn key(&self) -> ParamKey {
        ParamKey::new(&self.target, &self.field)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub(crate) fn validate(&self) -> Result<(), ConfigError> {
        if self.values.is_empty() {
            return Err(ConfigError::EmptyValues { key: self.key() });
        }
        Ok(())
    }
}

/// A composable generator of additional parameter specs.
///
/// Implementations receive the first group index that is free in the caller's
/// base specs and must only use groups at or above it. They are pure: no side
/// effects and no access to the specs they are merged into.
pub trait SweepFunction {
    fn specs(&self, start_group: usize) -> Vec<ParameterSpec>;
}

impl<F> SweepFunction for F
where
    F: Fn(usize) -> Vec<ParameterSpec>,
{
    fn specs(&self, start_group: usize) -> Vec<ParameterSpec> {
        self(start_group)
    }
}

/// Caller-side collection of specs, checked for collisions as it grows.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SpecSet {
    specs: Vec<ParameterSpec>,
}

impl SpecSet {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Collect existing specs, validating each and rejecting duplicate keys
    pub fn from_specs(specs: impl IntoIterator<Item = ParameterSpec>) -> Result<Self, ConfigError> {
        let mut set = Self::new();
        for spec in specs {
            set.push(spec)?;
        }
        Ok(set)
    }

    pub fn push(&mut self, spec: ParameterSpec) -> Result<(), ConfigError> {
        spec.validate()?;
        let key = spec.key();
        if self.contains(&key) {
            return Err(ConfigError::DuplicateParameter { key });
        }
        self.specs.push(spec);
        Ok(())
    }

    /// Whether a spec for `key` is already present
    pub fn contains(&self, key: &ParamKey) -> bool {
        self.specs
            .iter()
            .any(|s| s.target == key.target && s.field == key.field)
    }

    /// One past the highest group in use, or 0 when empty
    #[must_use]
    pub fn next_group(&self) -> usize {
        self.specs
            .iter()
            .map(|s| s.group + 1)
            .max()
            .unwrap_or(0)
    }

    /// Call `sweep` with the next free group index and add what it returns.
    ///
    /// Returns the number of specs added. A key that is already configured is
    /// rejected rather than overridden.
    pub fn merge(&mut self, sweep: &dyn SweepFunction) -> Result<usize, ConfigError> {
        let start = self.next_group();
        let added = sweep.specs(start);

        let mut seen: FxHashSet<ParamKey> = FxHashSet::default();
        for spec in &added {
            spec.validate()?;
            if spec.group < start {
                return Err(ConfigError::GroupBelowStart {
                    key: spec.key(),
                    group: spec.group,
                    start,
                });
            }
            let key = spec.key();
            if self.contains(&key) || !seen.insert(key.clone()) {
                return Err(ConfigError::DuplicateParameter { key });
            }
        }

        let count = added.len();
        self.specs.extend(added);
        Ok(count)
    }

    pub fn specs(&self) -> &[ParameterSpec] {
        &self.specs
    }

    pub fn len(&self) -> usize {
        self.specs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.specs.is_empty()
    }

    /// Expand into the case matrix
    pub fn build(&self) -> Result<CaseMatrix, ConfigError> {
        build_cases(&self.specs)
    }
}
