//! Expansion of parameter specs into an ordered sequence of cases.

use std::collections::BTreeMap;

use rustc_hash::FxHashSet;
use serde::Serialize;

use super::{CaseGrid, ParameterSpec};
use crate::error::ConfigError;
use crate::model::{CaseIndex, ParamKey, ParamValue, SimulationInput};

/// One concrete point of the expanded matrix.
///
/// Immutable once built; consumed by the runner to materialize one input
/// artifact and launch one process.
#[derive(Debug, Clone, PartialEq)]
pub struct Case {
    pub index: CaseIndex,
    /// Exactly one value per parameter spec
    pub assignments: BTreeMap<ParamKey, ParamValue>,
    /// Chosen alternative in each group, in ascending group order
    positions: Vec<usize>,
}

impl Case {
    #[must_use]
    pub fn get(&self, target: &str, field: &str) -> Option<&ParamValue> {
        self.assignments.get(&ParamKey::new(target, field))
    }

    /// Alternative chosen in each group, ordered like `CaseMatrix::groups`
    pub fn positions(&self) -> &[usize] {
        &self.positions
    }

    /// The base configuration with this case's assignments applied
    #[must_use]
    pub fn materialize(&self, base: &SimulationInput) -> SimulationInput {
        base.overlay(&self.assignments)
    }
}

/// Summary of one lock-step group
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GroupInfo {
    pub group: usize,
    /// Number of alternatives the group contributes
    pub size: usize,
    pub keys: Vec<String>,
}

/// Result of expanding a spec collection.
#[derive(Debug, Clone, PartialEq)]
pub struct CaseMatrix {
    groups: Vec<GroupInfo>,
    grid: CaseGrid,
    cases: Vec<Case>,
}

impl CaseMatrix {
    pub fn len(&self) -> usize {
        self.cases.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cases.is_empty()
    }

    pub fn cases(&self) -> &[Case] {
        &self.cases
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Case> {
        self.cases.iter()
    }

    #[must_use]
    pub fn get(&self, index: CaseIndex) -> Option<&Case> {
        self.cases.get(index.0)
    }

    /// Groups in ascending group order
    pub fn groups(&self) -> &[GroupInfo] {
        &self.groups
    }

    /// Number of alternatives per group
    pub fn shape(&self) -> &[usize] {
        self.grid.shape()
    }

    /// Case located at the given per-group positions
    #[must_use]
    pub fn case_at(&self, positions: &[usize]) -> Option<&Case> {
        self.grid
            .flat_index(positions)
            .and_then(|flat| self.cases.get(flat))
    }

    /// Render the matrix as a YAML document, one entry per case
    pub fn to_yaml(&self) -> Result<String, serde_saphyr::ser::Error> {
        #[derive(Serialize)]
        struct CaseRecord {
            case: usize,
            values: BTreeMap<String, ParamValue>,
        }

        #[derive(Serialize)]
        struct MatrixRecord<'a> {
            groups: &'a [GroupInfo],
            cases: Vec<CaseRecord>,
        }

        let record = MatrixRecord {
            groups: &self.groups,
            cases: self
                .cases
                .iter()
                .map(|case| CaseRecord {
                    case: case.index.0,
                    values: case
                        .assignments
                        .iter()
                        .map(|(k, v)| (k.to_string(), v.clone()))
                        .collect(),
                })
                .collect(),
        };
        serde_saphyr::to_string(&record)
    }
}

impl<'a> IntoIterator for &'a CaseMatrix {
    type Item = &'a Case;
    type IntoIter = std::slice::Iter<'a, Case>;

    fn into_iter(self) -> Self::IntoIter {
        self.cases.iter()
    }
}

/// Expand `specs` into the full case matrix.
///
/// Specs are partitioned by group. Within a group the i-th case takes the i-th
/// value of every spec (lock-step); across groups the alternatives combine by
/// Cartesian product, enumerated in row-major order with the highest group
/// varying fastest. Indices are assigned in that order, so identical input
/// always yields identical cases.
///
/// An empty collection yields a single case with no assignments.
pub fn build_cases(specs: &[ParameterSpec]) -> Result<CaseMatrix, ConfigError> {
    let mut seen: FxHashSet<ParamKey> = FxHashSet::default();
    let mut by_group: BTreeMap<usize, Vec<&ParameterSpec>> = BTreeMap::new();

    for spec in specs {
        spec.validate()?;
        let key = spec.key();
        if !seen.insert(key.clone()) {
            return Err(ConfigError::DuplicateParameter { key });
        }
        by_group.entry(spec.group).or_default().push(spec);
    }

    let mut groups = Vec::with_capacity(by_group.len());
    for (&group, members) in &by_group {
        let expected = members[0].len();
        if let Some(bad) = members.iter().find(|s| s.len() != expected) {
            return Err(ConfigError::GroupLengthMismatch {
                group,
                key: bad.key(),
                expected,
                found: bad.len(),
            });
        }
        groups.push(GroupInfo {
            group,
            size: expected,
            keys: members.iter().map(|s| s.key().to_string()).collect(),
        });
    }

    let grid = CaseGrid::new(groups.iter().map(|g| g.size).collect());
    let members: Vec<&Vec<&ParameterSpec>> = by_group.values().collect();

    let cases = grid
        .indices()
        .enumerate()
        .map(|(flat, positions)| {
            let mut assignments = BTreeMap::new();
            for (dim, &pos) in positions.iter().enumerate() {
                for spec in members[dim] {
                    assignments.insert(spec.key(), spec.values[pos].clone());
                }
            }
            Case {
                index: CaseIndex(flat),
                assignments,
                positions,
            }
        })
        .collect();

    tracing::debug!(
        specs = specs.len(),
        groups = groups.len(),
        cases = grid.len(),
        "case matrix expanded"
    );

    Ok(CaseMatrix {
        groups,
        grid,
        cases,
    })
}
